//! Admin area gate: role lookup plus audit trail of refused attempts.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::error::{CkStyleError, Result};
use crate::session::SessionContext;
use crate::store::{AuditEntry, RecordStore};

pub const ADMIN_ROLES: [&str; 2] = ["admin", "super_admin"];
pub const AUDIT_DB_ERROR: &str = "SECURITY_BREACH_DB_ERROR";
pub const AUDIT_UNAUTHORIZED: &str = "UNAUTHORIZED_ACCESS_ATTEMPT";
const AUDIT_RESOURCE: &str = "admin_access";

pub fn is_admin_role(role: &str) -> bool {
    ADMIN_ROLES.contains(&role)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdminAccess {
    Granted { role: String, email: Option<String> },
    Denied { message: String },
}

/// Decide whether the current user may enter the admin area.
pub async fn check_access(session: &SessionContext, store: &dyn RecordStore) -> Result<AdminAccess> {
    let user = session.user().ok_or(CkStyleError::LoginRequired)?;
    info!("Checking admin role for {}", user.id);

    let role = match store.user_role(&user.id).await {
        Ok(role) => role,
        Err(e) => {
            error!("Role lookup failed for {}: {}", user.id, e);
            audit(store, &user.id, AUDIT_DB_ERROR, json!({ "error": e.to_string() })).await;
            return Ok(AdminAccess::Denied {
                message: format!(
                    "Access to this area is restricted and your attempt has been logged. Database error: {}",
                    e
                ),
            });
        }
    };

    match role {
        None => {
            warn!("No role row for {}", user.id);
            audit(store, &user.id, AUDIT_UNAUTHORIZED, json!({ "email": user.email })).await;
            Ok(AdminAccess::Denied {
                message: format!(
                    "Access denied. Identification failed for {}. Unauthorized access to the admin panel is monitored.",
                    user.email.as_deref().unwrap_or("this account")
                ),
            })
        }
        Some(role) if !is_admin_role(&role) => {
            warn!("Insufficient role '{}' for {}", role, user.id);
            Ok(AdminAccess::Denied {
                message: "You do not have access to the admin area.".to_string(),
            })
        }
        Some(role) => {
            info!("Admin access granted to {} as {}", user.id, role);
            Ok(AdminAccess::Granted {
                role,
                email: user.email,
            })
        }
    }
}

/// Lightweight flag for the navigation bar; lookup errors mean "not admin".
pub async fn is_admin(session: &SessionContext, store: &dyn RecordStore) -> bool {
    let Some(user) = session.user() else {
        return false;
    };
    match store.user_role(&user.id).await {
        Ok(role) => role.as_deref().map(is_admin_role).unwrap_or(false),
        Err(e) => {
            warn!("Role lookup for navigation failed: {}", e);
            false
        }
    }
}

async fn audit(store: &dyn RecordStore, user_id: &str, action: &str, details: Value) {
    let entry = AuditEntry {
        user_id: user_id.to_string(),
        action: action.to_string(),
        resource: AUDIT_RESOURCE.to_string(),
        details,
    };
    if let Err(e) = store.insert_audit_log(&entry).await {
        error!("Admin audit write failed: {}", e);
    }
}
