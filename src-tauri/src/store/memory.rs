use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use uuid::Uuid;

use super::types::*;
use super::RecordStore;
use crate::error::{CkStyleError, Result};

/// Operations a [`MemoryStore`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailOn {
    InsertMeasurement,
    InsertItems,
    DeleteMeasurement,
    UserRole,
    AuditLog,
    Profile,
    Notifications,
    Collections,
}

#[derive(Default)]
struct Inner {
    measurements: Vec<MeasurementRecord>,
    items: Vec<MeasurementItem>,
    roles: HashMap<String, String>,
    audit_log: Vec<AuditEntry>,
    profiles: HashMap<String, ProfileRow>,
    notifications: Vec<Notification>,
    collections: Vec<CollectionRow>,
    failures: HashSet<FailOn>,
    measurement_reads: usize,
    seq: i64,
}

impl Inner {
    /// Strictly increasing timestamps so "newest first" is deterministic.
    fn next_timestamp(&mut self) -> String {
        self.seq += 1;
        let base = Utc
            .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        (base + Duration::seconds(self.seq)).to_rfc3339()
    }

    fn check(&self, op: FailOn) -> Result<()> {
        if self.failures.contains(&op) {
            Err(CkStyleError::Store(format!("simulated failure: {:?}", op)))
        } else {
            Ok(())
        }
    }
}

/// In-process [`RecordStore`] with failure injection.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| CkStyleError::Store("memory store lock poisoned".to_string()))
    }

    pub fn fail_on(&self, op: FailOn) {
        if let Ok(mut inner) = self.lock() {
            inner.failures.insert(op);
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut inner) = self.lock() {
            inner.failures.clear();
        }
    }

    pub fn set_role(&self, user_id: &str, role: &str) {
        if let Ok(mut inner) = self.lock() {
            inner.roles.insert(user_id.to_string(), role.to_string());
        }
    }

    /// Add an unread notification and return its id.
    pub fn push_notification(&self, user_id: &str, title: &str, message: &str) -> String {
        let Ok(mut inner) = self.lock() else {
            return String::new();
        };
        let id = Uuid::new_v4().to_string();
        let created_at = inner.next_timestamp();
        inner.notifications.push(Notification {
            id: id.clone(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            message: message.to_string(),
            kind: "info".to_string(),
            is_read: false,
            created_at: Some(created_at),
        });
        id
    }

    pub fn push_collection(&self, mut row: CollectionRow) {
        if let Ok(mut inner) = self.lock() {
            if row.created_at.is_none() {
                row.created_at = Some(inner.next_timestamp());
            }
            inner.collections.push(row);
        }
    }

    pub fn measurements(&self) -> Vec<MeasurementRecord> {
        self.lock().map(|i| i.measurements.clone()).unwrap_or_default()
    }

    pub fn items(&self) -> Vec<MeasurementItem> {
        self.lock().map(|i| i.items.clone()).unwrap_or_default()
    }

    pub fn audit_log(&self) -> Vec<AuditEntry> {
        self.lock().map(|i| i.audit_log.clone()).unwrap_or_default()
    }

    /// Calls made to the measurement read operations so far.
    pub fn measurement_reads(&self) -> usize {
        self.lock().map(|i| i.measurement_reads).unwrap_or_default()
    }

    pub fn profile(&self, user_id: &str) -> Option<ProfileRow> {
        self.lock().ok()?.profiles.get(user_id).cloned()
    }
}

fn newest_first<T, F>(rows: &mut [T], created_at: F)
where
    F: Fn(&T) -> Option<&String>,
{
    rows.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert_measurement(&self, row: &NewMeasurement) -> Result<MeasurementRecord> {
        let mut inner = self.lock()?;
        inner.check(FailOn::InsertMeasurement)?;
        let record = MeasurementRecord {
            id: Uuid::new_v4().to_string(),
            user_id: row.user_id.clone(),
            full_name: row.full_name.clone(),
            profile_name: row.profile_name.clone(),
            sex: row.sex.clone(),
            unit: row.unit.clone(),
            created_at: Some(inner.next_timestamp()),
        };
        inner.measurements.push(record.clone());
        Ok(record)
    }

    async fn insert_measurement_items(&self, items: &[NewMeasurementItem]) -> Result<()> {
        let mut inner = self.lock()?;
        inner.check(FailOn::InsertItems)?;
        if let Some(orphan) = items
            .iter()
            .find(|item| !inner.measurements.iter().any(|m| m.id == item.measurement_id))
        {
            return Err(CkStyleError::Store(format!(
                "insert or update on table \"measurement_items\" violates foreign key constraint ({})",
                orphan.measurement_id
            )));
        }
        let rows: Vec<MeasurementItem> = items
            .iter()
            .map(|item| MeasurementItem {
                id: Uuid::new_v4().to_string(),
                measurement_id: item.measurement_id.clone(),
                category: item.category.clone(),
                measurement_key: item.measurement_key.clone(),
                measurement_value: item.measurement_value,
                display_name: item.display_name.clone(),
            })
            .collect();
        inner.items.extend(rows);
        Ok(())
    }

    async fn delete_measurement(&self, id: &str) -> Result<()> {
        let mut inner = self.lock()?;
        inner.check(FailOn::DeleteMeasurement)?;
        inner.measurements.retain(|m| m.id != id);
        inner.items.retain(|i| i.measurement_id != id);
        Ok(())
    }

    async fn list_measurements(&self, user_id: &str) -> Result<Vec<MeasurementRecord>> {
        let mut inner = self.lock()?;
        inner.measurement_reads += 1;
        let mut rows: Vec<MeasurementRecord> = inner
            .measurements
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut rows, |m| m.created_at.as_ref());
        Ok(rows)
    }

    async fn get_measurement(&self, id: &str) -> Result<MeasurementRecord> {
        let mut inner = self.lock()?;
        inner.measurement_reads += 1;
        inner
            .measurements
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| {
                CkStyleError::Store("JSON object requested, multiple (or no) rows returned".to_string())
            })
    }

    async fn list_measurement_items(&self, measurement_id: &str) -> Result<Vec<MeasurementItem>> {
        let mut inner = self.lock()?;
        inner.measurement_reads += 1;
        let mut rows: Vec<MeasurementItem> = inner
            .items
            .iter()
            .filter(|i| i.measurement_id == measurement_id)
            .cloned()
            .collect();
        // stable, so template order survives within a category
        rows.sort_by(|a, b| a.category.cmp(&b.category));
        Ok(rows)
    }

    async fn user_role(&self, user_id: &str) -> Result<Option<String>> {
        let inner = self.lock()?;
        inner.check(FailOn::UserRole)?;
        Ok(inner.roles.get(user_id).cloned())
    }

    async fn insert_audit_log(&self, entry: &AuditEntry) -> Result<()> {
        let mut inner = self.lock()?;
        inner.check(FailOn::AuditLog)?;
        inner.audit_log.push(entry.clone());
        Ok(())
    }

    async fn upsert_profile(&self, profile: &ProfileRow) -> Result<()> {
        let mut inner = self.lock()?;
        inner.check(FailOn::Profile)?;
        let merged = match inner.profiles.get(&profile.id) {
            Some(existing) => ProfileRow {
                theme: profile.theme.clone().or_else(|| existing.theme.clone()),
                ..profile.clone()
            },
            None => profile.clone(),
        };
        inner.profiles.insert(profile.id.clone(), merged);
        Ok(())
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<ProfileRow>> {
        let inner = self.lock()?;
        inner.check(FailOn::Profile)?;
        Ok(inner.profiles.get(user_id).cloned())
    }

    async fn update_profile_theme(&self, user_id: &str, theme: &str) -> Result<()> {
        let mut inner = self.lock()?;
        inner.check(FailOn::Profile)?;
        if let Some(profile) = inner.profiles.get_mut(user_id) {
            profile.theme = Some(theme.to_string());
        }
        Ok(())
    }

    async fn unread_notifications(&self, user_id: &str) -> Result<Vec<Notification>> {
        let inner = self.lock()?;
        inner.check(FailOn::Notifications)?;
        let mut rows: Vec<Notification> = inner
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .cloned()
            .collect();
        newest_first(&mut rows, |n| n.created_at.as_ref());
        Ok(rows)
    }

    async fn all_notifications(&self, user_id: &str) -> Result<Vec<Notification>> {
        let inner = self.lock()?;
        inner.check(FailOn::Notifications)?;
        let mut rows: Vec<Notification> = inner
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut rows, |n| n.created_at.as_ref());
        Ok(rows)
    }

    async fn mark_notification_read(&self, user_id: &str, id: &str) -> Result<()> {
        let mut inner = self.lock()?;
        inner.check(FailOn::Notifications)?;
        for n in inner
            .notifications
            .iter_mut()
            .filter(|n| n.id == id && n.user_id == user_id)
        {
            n.is_read = true;
        }
        Ok(())
    }

    async fn mark_all_notifications_read(&self, user_id: &str) -> Result<()> {
        let mut inner = self.lock()?;
        inner.check(FailOn::Notifications)?;
        for n in inner.notifications.iter_mut().filter(|n| n.user_id == user_id) {
            n.is_read = true;
        }
        Ok(())
    }

    async fn published_collections(&self) -> Result<Vec<CollectionRow>> {
        let inner = self.lock()?;
        inner.check(FailOn::Collections)?;
        let mut rows: Vec<CollectionRow> = inner
            .collections
            .iter()
            .filter(|c| c.visibility.as_deref() == Some("published"))
            .cloned()
            .collect();
        newest_first(&mut rows, |c| c.created_at.as_ref());
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parent(user: &str) -> NewMeasurement {
        NewMeasurement {
            user_id: user.to_string(),
            full_name: "Ada".to_string(),
            profile_name: "Everyday".to_string(),
            sex: "male".to_string(),
            unit: "cm".to_string(),
        }
    }

    #[tokio::test]
    async fn test_listing_is_newest_first_and_per_user() {
        let store = MemoryStore::new();
        let first = store.insert_measurement(&parent("u1")).await.unwrap();
        let second = store.insert_measurement(&parent("u1")).await.unwrap();
        store.insert_measurement(&parent("u2")).await.unwrap();

        let listed = store.list_measurements("u1").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[tokio::test]
    async fn test_items_require_existing_parent() {
        let store = MemoryStore::new();
        let item = NewMeasurementItem {
            measurement_id: "missing".to_string(),
            category: "top".to_string(),
            measurement_key: "chest".to_string(),
            measurement_value: 90.0,
            display_name: "Chest".to_string(),
        };
        assert!(store.insert_measurement_items(&[item]).await.is_err());
        assert!(store.items().is_empty());
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = MemoryStore::new();
        store.fail_on(FailOn::InsertMeasurement);
        assert!(store.insert_measurement(&parent("u1")).await.is_err());
        store.clear_failures();
        assert!(store.insert_measurement(&parent("u1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_mark_all_read_only_touches_owner() {
        let store = MemoryStore::new();
        store.push_notification("u1", "a", "b");
        store.push_notification("u2", "c", "d");
        store.mark_all_notifications_read("u1").await.unwrap();
        assert!(store.unread_notifications("u1").await.unwrap().is_empty());
        assert_eq!(store.unread_notifications("u2").await.unwrap().len(), 1);
    }
}
