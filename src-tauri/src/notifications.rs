//! Unread notifications for the signed-in user, fetched on a fixed interval
//! by a single background task and pushed to the window as events.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::session::SessionContext;
use crate::store::{Notification, RecordStore};

pub const UPDATED_EVENT: &str = "notifications-updated";
/// Rows shown in the navigation dropdown.
pub const DROPDOWN_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationItem {
    pub id: String,
    pub title: String,
    pub message: String,
    pub kind: String,
    /// Colour class: `danger`, `gold` or `primary`.
    pub tone: &'static str,
    pub is_read: bool,
    pub time_label: String,
}

impl From<&Notification> for NotificationItem {
    fn from(n: &Notification) -> Self {
        let tone = match n.kind.as_str() {
            "danger" => "danger",
            "success" => "gold",
            _ => "primary",
        };
        let time_label = n
            .created_at
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|dt| dt.format("%H:%M").to_string())
            .unwrap_or_default();
        Self {
            id: n.id.clone(),
            title: n.title.clone(),
            message: n.message.clone(),
            kind: n.kind.clone(),
            tone,
            is_read: n.is_read,
            time_label,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NotificationSnapshot {
    pub unread_count: usize,
    /// Badge text; `None` hides the badge.
    pub badge: Option<String>,
    pub items: Vec<NotificationItem>,
    /// Newest unread, surfaced once per run.
    pub popup: Option<NotificationItem>,
}

pub struct NotificationCenter {
    store: Arc<dyn RecordStore>,
    session: SessionContext,
    popup_shown: AtomicBool,
}

impl NotificationCenter {
    pub fn new(store: Arc<dyn RecordStore>, session: SessionContext) -> Self {
        Self {
            store,
            session,
            popup_shown: AtomicBool::new(false),
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Fetch unread rows. Signed out yields an empty snapshot.
    pub async fn refresh(&self) -> Result<NotificationSnapshot> {
        let Some(user) = self.session.user() else {
            return Ok(NotificationSnapshot::default());
        };
        let unread = self.store.unread_notifications(&user.id).await?;
        Ok(self.snapshot(&unread))
    }

    pub async fn mark_read(&self, id: &str) -> Result<NotificationSnapshot> {
        if let Some(user) = self.session.user() {
            self.store.mark_notification_read(&user.id, id).await?;
            info!("Marked notification {} read", id);
        }
        self.refresh().await
    }

    pub async fn clear_all(&self) -> Result<NotificationSnapshot> {
        if let Some(user) = self.session.user() {
            self.store.mark_all_notifications_read(&user.id).await?;
            info!("Cleared all notifications for {}", user.id);
        }
        self.refresh().await
    }

    /// Every notification, read or not, for the profile page.
    pub async fn history(&self) -> Result<Vec<NotificationItem>> {
        let Some(user) = self.session.user() else {
            return Ok(Vec::new());
        };
        let rows = self.store.all_notifications(&user.id).await?;
        Ok(rows.iter().map(NotificationItem::from).collect())
    }

    fn snapshot(&self, unread: &[Notification]) -> NotificationSnapshot {
        let popup = unread.first().and_then(|newest| {
            if self.popup_shown.swap(true, Ordering::SeqCst) {
                None
            } else {
                Some(NotificationItem::from(newest))
            }
        });
        NotificationSnapshot {
            unread_count: unread.len(),
            badge: (!unread.is_empty()).then(|| unread.len().to_string()),
            items: unread
                .iter()
                .take(DROPDOWN_LIMIT)
                .map(NotificationItem::from)
                .collect(),
            popup,
        }
    }
}

/// Poll on `interval` (first tick immediately) and after every session
/// change, handing each snapshot to `emit`. A failed fetch skips that
/// update. Returns when the session writer is dropped.
pub async fn run_poller<F>(center: Arc<NotificationCenter>, interval: Duration, emit: F)
where
    F: Fn(NotificationSnapshot) + Send + 'static,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut session_changes = center.session().subscribe();
    info!("Notification poller started, every {:?}", interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = session_changes.changed() => {
                if changed.is_err() {
                    break;
                }
                ticker.reset();
            }
        }
        match center.refresh().await {
            Ok(snapshot) => emit(snapshot),
            Err(e) => warn!("Notification poll failed, keeping last state: {}", e),
        }
    }
    info!("Notification poller stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session;
    use crate::store::MemoryStore;
    use crate::supabase::{Session, User};

    fn sign_in(writer: &session::SessionWriter, id: &str) {
        writer.set(Some(Session {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_in: None,
            expires_at: None,
            user: User {
                id: id.to_string(),
                email: None,
            },
        }));
    }

    #[tokio::test]
    async fn test_dropdown_limited_to_five_and_popup_once() {
        let (writer, ctx) = session::channel();
        sign_in(&writer, "u1");
        let store = Arc::new(MemoryStore::new());
        for i in 0..7 {
            store.push_notification("u1", &format!("n{}", i), "msg");
        }
        let center = NotificationCenter::new(store.clone(), ctx);

        let first = center.refresh().await.unwrap();
        assert_eq!(first.unread_count, 7);
        assert_eq!(first.badge.as_deref(), Some("7"));
        assert_eq!(first.items.len(), DROPDOWN_LIMIT);
        assert_eq!(first.items[0].title, "n6");
        assert_eq!(first.popup.as_ref().unwrap().title, "n6");

        let second = center.refresh().await.unwrap();
        assert!(second.popup.is_none());
    }

    #[tokio::test]
    async fn test_mark_read_refetches() {
        let (writer, ctx) = session::channel();
        sign_in(&writer, "u1");
        let store = Arc::new(MemoryStore::new());
        let id = store.push_notification("u1", "Fitting", "Tomorrow at 10");
        store.push_notification("u1", "Paid", "Thanks");
        let center = NotificationCenter::new(store.clone(), ctx);

        let snap = center.mark_read(&id).await.unwrap();
        assert_eq!(snap.unread_count, 1);
        assert_eq!(center.history().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_signed_out_is_empty() {
        let (_writer, ctx) = session::channel();
        let center = NotificationCenter::new(Arc::new(MemoryStore::new()), ctx);
        let snap = center.refresh().await.unwrap();
        assert_eq!(snap, NotificationSnapshot::default());
    }

    #[test]
    fn test_tone_by_kind() {
        let mut n = Notification {
            id: "1".to_string(),
            user_id: "u".to_string(),
            title: "t".to_string(),
            message: "m".to_string(),
            kind: "danger".to_string(),
            is_read: false,
            created_at: Some("2026-02-03T14:05:00+00:00".to_string()),
        };
        let item = NotificationItem::from(&n);
        assert_eq!(item.tone, "danger");
        assert_eq!(item.time_label, "14:05");
        n.kind = "success".to_string();
        assert_eq!(NotificationItem::from(&n).tone, "gold");
        n.kind = "info".to_string();
        assert_eq!(NotificationItem::from(&n).tone, "primary");
    }
}
