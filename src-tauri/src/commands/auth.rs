use chrono::Utc;
use serde::Serialize;
use tauri::{AppHandle, Manager};
use tracing::{info, warn};

use super::config::{apply_profile_theme, read_theme};
use crate::session::SessionContext;
use crate::state::AppState;
use crate::store::ProfileRow;
use crate::theme::Theme;

pub const AUTH_EVENT: &str = "auth-state-changed";

#[derive(Debug, Clone, Serialize)]
pub struct AuthView {
    pub signed_in: bool,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub theme: Theme,
}

impl AuthView {
    pub fn from_session(session: &SessionContext, theme: Theme) -> Self {
        let user = session.user();
        Self {
            signed_in: user.is_some(),
            user_id: user.as_ref().map(|u| u.id.clone()),
            email: user.as_ref().and_then(|u| u.email.clone()),
            display_name: user.as_ref().map(|u| u.display_name()),
            theme,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SignUpView {
    pub auth: AuthView,
    /// True when the provider wants the address confirmed before sign-in.
    pub confirmation_required: bool,
}

#[tauri::command]
pub async fn get_auth_state(app: AppHandle) -> Result<AuthView, String> {
    let state = app.state::<AppState>();
    // refreshes a stale token
    if let Err(e) = state.auth.get_session().await {
        warn!("Session check failed: {}", e);
    }
    Ok(AuthView::from_session(&state.session, read_theme(&app)))
}

#[tauri::command]
pub async fn sign_up(
    app: AppHandle,
    email: String,
    password: String,
    confirm_password: String,
) -> Result<SignUpView, String> {
    let state = app.state::<AppState>();
    let outcome = state
        .auth
        .sign_up(&email, &password, &confirm_password)
        .await?;

    let profile = ProfileRow {
        id: outcome.user.id.clone(),
        email: outcome.user.email.clone(),
        full_name: Some(String::new()),
        avatar_url: Some(String::new()),
        updated_at: Some(Utc::now().to_rfc3339()),
        theme: None,
    };
    match state.store() {
        Ok(store) => {
            if let Err(e) = store.upsert_profile(&profile).await {
                warn!("Profile row for {} not created: {}", outcome.user.id, e);
            }
        }
        Err(e) => warn!("Profile row for {} not created: {}", outcome.user.id, e),
    }

    info!("Account created for {}", outcome.user.id);
    Ok(SignUpView {
        auth: AuthView::from_session(&state.session, read_theme(&app)),
        confirmation_required: outcome.session.is_none(),
    })
}

#[tauri::command]
pub async fn sign_in(app: AppHandle, email: String, password: String) -> Result<AuthView, String> {
    let state = app.state::<AppState>();
    state.auth.sign_in(&email, &password).await?;
    let theme = apply_profile_theme(&app).await;
    Ok(AuthView::from_session(&state.session, theme))
}

#[tauri::command]
pub async fn sign_out(app: AppHandle) -> Result<AuthView, String> {
    let state = app.state::<AppState>();
    state.auth.sign_out().await?;
    Ok(AuthView::from_session(&state.session, read_theme(&app)))
}

#[tauri::command]
pub async fn request_password_reset(app: AppHandle, email: String) -> Result<String, String> {
    let state = app.state::<AppState>();
    let redirect = state.config.reset_redirect_url.clone();
    state
        .auth
        .request_password_reset(&email, redirect.as_deref())
        .await?;
    Ok("If an account exists for that email, you will receive a reset link. Check your inbox and spam folder.".to_string())
}

/// Sign in from the link in a password reset email.
#[tauri::command]
pub async fn open_recovery_link(app: AppHandle, link: String) -> Result<AuthView, String> {
    let state = app.state::<AppState>();
    let user = state.auth.set_session_from_link(&link).await?;
    info!("Recovery session established for {}", user.id);
    Ok(AuthView::from_session(&state.session, read_theme(&app)))
}

#[tauri::command]
pub async fn update_password(
    app: AppHandle,
    password: String,
    confirm_password: String,
) -> Result<String, String> {
    let state = app.state::<AppState>();
    state
        .auth
        .update_password(&password, &confirm_password)
        .await?;
    Ok("Password updated successfully.".to_string())
}
