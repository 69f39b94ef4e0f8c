use tracing::{error, info, warn};

use super::session::{Stage, WizardSession};
use crate::error::{CkStyleError, Result};
use crate::session::SessionContext;
use crate::store::{NewMeasurement, NewMeasurementItem, RecordStore};

/// One item row per template field, in template order. Fields without an
/// entry are written as skipped.
pub fn build_items(wizard: &WizardSession, measurement_id: &str) -> Result<Vec<NewMeasurementItem>> {
    let template = wizard
        .template()
        .ok_or_else(|| CkStyleError::Validation("No measurement template selected".to_string()))?;
    Ok(template
        .fields
        .iter()
        .map(|field| NewMeasurementItem {
            measurement_id: measurement_id.to_string(),
            category: field.category.to_string(),
            measurement_key: field.key.to_string(),
            measurement_value: wizard
                .value(field.key)
                .map(|v| v.stored_value())
                .unwrap_or(0.0),
            display_name: field.display_name.to_string(),
        })
        .collect())
}

/// Persist a reviewed wizard: parent row, then all items in one bulk insert.
///
/// A failed item insert removes the parent again. On success the wizard
/// moves to `complete` and the new record id is returned.
pub async fn save_measurements(
    wizard: &mut WizardSession,
    session: &SessionContext,
    store: &dyn RecordStore,
) -> Result<String> {
    if wizard.stage() != Stage::Review {
        return Err(CkStyleError::Validation(
            "Finish the measurements before saving".to_string(),
        ));
    }
    let user = session.user().ok_or(CkStyleError::LoginRequired)?;
    let intro = wizard
        .intro()
        .ok_or_else(|| CkStyleError::Validation("Missing profile details".to_string()))?;

    let parent = NewMeasurement {
        user_id: user.id.clone(),
        full_name: intro.subject_name.clone(),
        profile_name: intro.profile_label.clone(),
        sex: intro.sex.to_string(),
        unit: intro.unit.to_string(),
    };
    let record = store.insert_measurement(&parent).await.map_err(|e| {
        error!("Failed to save measurement profile: {}", e);
        e
    })?;

    let items = build_items(wizard, &record.id)?;
    if let Err(e) = store.insert_measurement_items(&items).await {
        error!(
            "Failed to save {} measurement items for {}: {}",
            items.len(),
            record.id,
            e
        );
        match store.delete_measurement(&record.id).await {
            Ok(()) => info!("Rolled back measurement profile {}", record.id),
            Err(cleanup) => warn!(
                "Orphaned measurement profile {} left behind: {}",
                record.id, cleanup
            ),
        }
        return Err(e);
    }

    wizard.mark_complete(record.id.clone())?;
    info!(
        "Saved measurement profile {} ({} items) for user {}",
        record.id,
        items.len(),
        user.id
    );
    Ok(record.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session;
    use crate::store::memory::FailOn;
    use crate::store::MemoryStore;
    use crate::supabase::{Session, User};
    use crate::wizard::validation::IntroForm;

    fn reviewed_wizard() -> WizardSession {
        let mut wizard = WizardSession::new();
        wizard
            .submit_intro(&IntroForm {
                subject_name: "Ama".to_string(),
                profile_label: "Kaba".to_string(),
                sex: "female".to_string(),
                unit: "inch".to_string(),
            })
            .unwrap();
        while wizard.stage() == Stage::Measuring {
            wizard.advance("12").unwrap();
        }
        wizard
    }

    fn signed_in() -> (session::SessionWriter, SessionContext) {
        let (writer, ctx) = session::channel();
        writer.set(Some(Session {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_in: None,
            expires_at: None,
            user: User {
                id: "user-1".to_string(),
                email: Some("ama@example.com".to_string()),
            },
        }));
        (writer, ctx)
    }

    #[test]
    fn test_build_items_covers_template() {
        let mut wizard = reviewed_wizard();
        wizard.edit(0).unwrap();
        wizard.skip().unwrap();
        while wizard.stage() == Stage::Measuring {
            wizard.advance("12").unwrap();
        }
        let items = build_items(&wizard, "m1").unwrap();
        assert_eq!(items.len(), 18);
        assert_eq!(items[0].measurement_value, 0.0);
        assert!(items[1..].iter().all(|i| i.measurement_value == 12.0));
        assert_eq!(items[8].category, "gown");
    }

    #[tokio::test]
    async fn test_save_writes_parent_and_items() {
        let (_writer, ctx) = signed_in();
        let store = MemoryStore::new();
        let mut wizard = reviewed_wizard();

        let id = save_measurements(&mut wizard, &ctx, &store).await.unwrap();
        assert_eq!(wizard.stage(), Stage::Complete);
        assert_eq!(wizard.saved_record_id(), Some(id.as_str()));

        let parents = store.measurements();
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].user_id, "user-1");
        assert_eq!(parents[0].unit, "inch");
        assert_eq!(store.items().len(), 18);
    }

    #[tokio::test]
    async fn test_save_without_session_writes_nothing() {
        let (_writer, ctx) = session::channel();
        let store = MemoryStore::new();
        let mut wizard = reviewed_wizard();

        let err = save_measurements(&mut wizard, &ctx, &store).await.unwrap_err();
        assert!(matches!(err, CkStyleError::LoginRequired));
        assert_eq!(wizard.stage(), Stage::Review);
        assert!(store.measurements().is_empty());
    }

    #[tokio::test]
    async fn test_failed_items_roll_back_parent() {
        let (_writer, ctx) = signed_in();
        let store = MemoryStore::new();
        store.fail_on(FailOn::InsertItems);
        let mut wizard = reviewed_wizard();

        assert!(save_measurements(&mut wizard, &ctx, &store).await.is_err());
        assert_eq!(wizard.stage(), Stage::Review);
        assert!(store.measurements().is_empty());
    }

    #[tokio::test]
    async fn test_failed_rollback_surfaces_original_error() {
        let (_writer, ctx) = signed_in();
        let store = MemoryStore::new();
        store.fail_on(FailOn::InsertItems);
        store.fail_on(FailOn::DeleteMeasurement);
        let mut wizard = reviewed_wizard();

        let err = save_measurements(&mut wizard, &ctx, &store).await.unwrap_err();
        assert!(err.to_string().contains("InsertItems"));
        assert_eq!(store.measurements().len(), 1);
    }

    #[tokio::test]
    async fn test_save_requires_review_stage() {
        let (_writer, ctx) = signed_in();
        let store = MemoryStore::new();
        let mut wizard = WizardSession::new();
        assert!(save_measurements(&mut wizard, &ctx, &store).await.is_err());
    }
}
