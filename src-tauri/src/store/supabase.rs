use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use super::types::*;
use super::RecordStore;
use crate::error::{CkStyleError, Result};
use crate::supabase::{AuthProvider, RestClient};

/// [`RecordStore`] over PostgREST, acting as the signed-in user.
#[derive(Clone)]
pub struct SupabaseStore {
    rest: RestClient,
    auth: Arc<AuthProvider>,
}

impl SupabaseStore {
    pub fn new(rest: RestClient, auth: Arc<AuthProvider>) -> Self {
        Self { rest, auth }
    }

    /// Refreshes an expired session before the request goes out.
    async fn token(&self) -> Result<Option<String>> {
        self.auth.access_token().await
    }
}

#[async_trait]
impl RecordStore for SupabaseStore {
    async fn insert_measurement(&self, row: &NewMeasurement) -> Result<MeasurementRecord> {
        let token = self.token().await?;
        let mut rows: Vec<MeasurementRecord> = self
            .rest
            .from("measurements")
            .auth(token.as_deref())
            .insert(std::slice::from_ref(row))
            .await?;
        rows.pop()
            .ok_or_else(|| CkStyleError::Store("Insert returned no measurement row".to_string()))
    }

    async fn insert_measurement_items(&self, items: &[NewMeasurementItem]) -> Result<()> {
        let token = self.token().await?;
        self.rest
            .from("measurement_items")
            .auth(token.as_deref())
            .insert_silent(items)
            .await
    }

    async fn delete_measurement(&self, id: &str) -> Result<()> {
        let token = self.token().await?;
        self.rest
            .from("measurements")
            .auth(token.as_deref())
            .eq("id", id)
            .delete()
            .await
    }

    async fn list_measurements(&self, user_id: &str) -> Result<Vec<MeasurementRecord>> {
        let token = self.token().await?;
        self.rest
            .from("measurements")
            .auth(token.as_deref())
            .select("*")
            .eq("user_id", user_id)
            .order("created_at", false)
            .fetch()
            .await
    }

    async fn get_measurement(&self, id: &str) -> Result<MeasurementRecord> {
        let token = self.token().await?;
        self.rest
            .from("measurements")
            .auth(token.as_deref())
            .select("*")
            .eq("id", id)
            .single()
            .await
    }

    async fn list_measurement_items(&self, measurement_id: &str) -> Result<Vec<MeasurementItem>> {
        let token = self.token().await?;
        self.rest
            .from("measurement_items")
            .auth(token.as_deref())
            .select("*")
            .eq("measurement_id", measurement_id)
            .order("category", true)
            .fetch()
            .await
    }

    async fn user_role(&self, user_id: &str) -> Result<Option<String>> {
        #[derive(serde::Deserialize)]
        struct RoleRow {
            role: String,
        }
        let token = self.token().await?;
        let row: Option<RoleRow> = self
            .rest
            .from("user_roles")
            .auth(token.as_deref())
            .select("role")
            .eq("user_id", user_id)
            .maybe_single()
            .await?;
        Ok(row.map(|r| r.role))
    }

    async fn insert_audit_log(&self, entry: &AuditEntry) -> Result<()> {
        let token = self.token().await?;
        self.rest
            .from("admin_audit_logs")
            .auth(token.as_deref())
            .insert_silent(std::slice::from_ref(entry))
            .await
    }

    async fn upsert_profile(&self, profile: &ProfileRow) -> Result<()> {
        let token = self.token().await?;
        self.rest
            .from("profiles")
            .auth(token.as_deref())
            .on_conflict("id")
            .upsert(std::slice::from_ref(profile))
            .await
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<ProfileRow>> {
        let token = self.token().await?;
        self.rest
            .from("profiles")
            .auth(token.as_deref())
            .select("*")
            .eq("id", user_id)
            .maybe_single()
            .await
    }

    async fn update_profile_theme(&self, user_id: &str, theme: &str) -> Result<()> {
        let token = self.token().await?;
        self.rest
            .from("profiles")
            .auth(token.as_deref())
            .eq("id", user_id)
            .update(&json!({ "theme": theme, "updated_at": Utc::now().to_rfc3339() }))
            .await
    }

    async fn unread_notifications(&self, user_id: &str) -> Result<Vec<Notification>> {
        let token = self.token().await?;
        self.rest
            .from("notifications")
            .auth(token.as_deref())
            .select("*")
            .eq("user_id", user_id)
            .eq("is_read", false)
            .order("created_at", false)
            .fetch()
            .await
    }

    async fn all_notifications(&self, user_id: &str) -> Result<Vec<Notification>> {
        let token = self.token().await?;
        self.rest
            .from("notifications")
            .auth(token.as_deref())
            .select("*")
            .eq("user_id", user_id)
            .order("created_at", false)
            .fetch()
            .await
    }

    async fn mark_notification_read(&self, user_id: &str, id: &str) -> Result<()> {
        let token = self.token().await?;
        self.rest
            .from("notifications")
            .auth(token.as_deref())
            .eq("id", id)
            .eq("user_id", user_id)
            .update(&json!({ "is_read": true }))
            .await
    }

    async fn mark_all_notifications_read(&self, user_id: &str) -> Result<()> {
        let token = self.token().await?;
        self.rest
            .from("notifications")
            .auth(token.as_deref())
            .eq("user_id", user_id)
            .eq("is_read", false)
            .update(&json!({ "is_read": true }))
            .await
    }

    async fn published_collections(&self) -> Result<Vec<CollectionRow>> {
        // public feed: the anon key is enough when the session can't be refreshed
        let token = self.token().await.unwrap_or_default();
        self.rest
            .from("collections")
            .auth(token.as_deref())
            .select("*, collection_images(image_url)")
            .eq("visibility", "published")
            .order("created_at", false)
            .fetch()
            .await
    }
}
