//! The record store seam. Everything that reads or writes hosted rows goes
//! through [`RecordStore`] so the wizard and profile flows can be exercised
//! against [`MemoryStore`] in tests.

pub mod memory;
pub mod supabase;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;

pub use memory::MemoryStore;
pub use supabase::SupabaseStore;
pub use types::{
    AuditEntry, CollectionImage, CollectionRow, MeasurementItem, MeasurementRecord,
    NewMeasurement, NewMeasurementItem, Notification, ProfileRow,
};

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert the parent row and return it with its generated id.
    async fn insert_measurement(&self, row: &NewMeasurement) -> Result<MeasurementRecord>;
    async fn insert_measurement_items(&self, items: &[NewMeasurementItem]) -> Result<()>;
    async fn delete_measurement(&self, id: &str) -> Result<()>;
    /// Newest first.
    async fn list_measurements(&self, user_id: &str) -> Result<Vec<MeasurementRecord>>;
    async fn get_measurement(&self, id: &str) -> Result<MeasurementRecord>;
    /// Ordered by category.
    async fn list_measurement_items(&self, measurement_id: &str) -> Result<Vec<MeasurementItem>>;

    /// `None` when the user has no role row.
    async fn user_role(&self, user_id: &str) -> Result<Option<String>>;
    async fn insert_audit_log(&self, entry: &AuditEntry) -> Result<()>;

    async fn upsert_profile(&self, profile: &ProfileRow) -> Result<()>;
    async fn get_profile(&self, user_id: &str) -> Result<Option<ProfileRow>>;
    async fn update_profile_theme(&self, user_id: &str, theme: &str) -> Result<()>;

    /// Unread only, newest first.
    async fn unread_notifications(&self, user_id: &str) -> Result<Vec<Notification>>;
    async fn all_notifications(&self, user_id: &str) -> Result<Vec<Notification>>;
    async fn mark_notification_read(&self, user_id: &str, id: &str) -> Result<()>;
    async fn mark_all_notifications_read(&self, user_id: &str) -> Result<()>;

    /// Published collections, newest first.
    async fn published_collections(&self) -> Result<Vec<CollectionRow>>;
}
