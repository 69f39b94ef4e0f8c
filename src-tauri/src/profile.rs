//! Saved measurement sets for the profile page: listing and grouped detail.

use chrono::DateTime;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{CkStyleError, Result};
use crate::session::SessionContext;
use crate::store::{MeasurementItem, MeasurementRecord, RecordStore};
use crate::wizard::{Category, FieldValue};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementSummary {
    pub id: String,
    pub profile_name: String,
    pub full_name: String,
    pub sex_label: String,
    pub unit: String,
    pub date_label: String,
}

impl From<&MeasurementRecord> for MeasurementSummary {
    fn from(record: &MeasurementRecord) -> Self {
        Self {
            id: record.id.clone(),
            profile_name: record.profile_name.clone(),
            full_name: record.full_name.clone(),
            sex_label: record.sex.to_uppercase(),
            unit: record.unit.clone(),
            date_label: format_date(record.created_at.as_deref()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailRow {
    pub key: String,
    pub display_name: String,
    pub value: FieldValue,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryGroup {
    pub category: Category,
    pub title: String,
    pub rows: Vec<DetailRow>,
}

/// A fetched measurement set, ready for display and export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementDetail {
    pub summary: MeasurementSummary,
    /// Items in fetch order (by category).
    pub items: Vec<MeasurementItem>,
    pub groups: Vec<CategoryGroup>,
}

impl MeasurementDetail {
    pub fn new(record: &MeasurementRecord, items: Vec<MeasurementItem>) -> Self {
        let groups = group_items(&items, &record.unit);
        Self {
            summary: MeasurementSummary::from(record),
            items,
            groups,
        }
    }
}

/// `"<v> <unit>"`, or `"Skipped"` for a stored zero.
pub fn value_label(value: f64, unit: &str) -> String {
    match FieldValue::from_stored(value) {
        FieldValue::Measured(v) => format!("{} {}", v, unit),
        FieldValue::Skipped => "Skipped".to_string(),
    }
}

/// Date shown for a record; empty when the timestamp is missing or bad.
pub fn format_date(created_at: Option<&str>) -> String {
    created_at
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|dt| dt.format("%d/%m/%Y").to_string())
        .unwrap_or_default()
}

/// Group items into top, gown, trousers. Empty groups are left out and
/// unknown categories ignored.
pub fn group_items(items: &[MeasurementItem], unit: &str) -> Vec<CategoryGroup> {
    Category::ALL
        .iter()
        .filter_map(|category| {
            let rows: Vec<DetailRow> = items
                .iter()
                .filter(|item| item.category == category.as_str())
                .map(|item| DetailRow {
                    key: item.measurement_key.clone(),
                    display_name: item.display_name.clone(),
                    value: FieldValue::from_stored(item.measurement_value),
                    display: value_label(item.measurement_value, unit),
                })
                .collect();
            (!rows.is_empty()).then(|| CategoryGroup {
                category: *category,
                title: category.as_str().to_uppercase(),
                rows,
            })
        })
        .collect()
}

pub async fn list_measurements(
    session: &SessionContext,
    store: &dyn RecordStore,
) -> Result<Vec<MeasurementSummary>> {
    let user = session.user().ok_or(CkStyleError::LoginRequired)?;
    let records = store.list_measurements(&user.id).await?;
    info!("Loaded {} measurement profiles for {}", records.len(), user.id);
    Ok(records.iter().map(MeasurementSummary::from).collect())
}

/// Parent row plus items. Records owned by another user are reported as
/// missing.
pub async fn load_detail(
    session: &SessionContext,
    store: &dyn RecordStore,
    measurement_id: &str,
) -> Result<MeasurementDetail> {
    let user = session.user().ok_or(CkStyleError::LoginRequired)?;
    let record = store.get_measurement(measurement_id).await?;
    if record.user_id != user.id {
        warn!(
            "User {} requested measurement {} owned by someone else",
            user.id, measurement_id
        );
        return Err(CkStyleError::Store("Measurement profile not found".to_string()));
    }
    let items = store.list_measurement_items(measurement_id).await?;
    Ok(MeasurementDetail::new(&record, items))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(category: &str, key: &str, value: f64) -> MeasurementItem {
        MeasurementItem {
            id: format!("i-{}", key),
            measurement_id: "m1".to_string(),
            category: category.to_string(),
            measurement_key: key.to_string(),
            measurement_value: value,
            display_name: key.to_string(),
        }
    }

    #[test]
    fn test_groups_in_fixed_order() {
        let items = vec![
            item("trousers", "waist", 80.0),
            item("gown", "gown_length", 0.0),
            item("top", "chest", 96.0),
            item("hat", "brim", 3.0),
        ];
        let groups = group_items(&items, "cm");
        let titles: Vec<&str> = groups.iter().map(|g| g.title.as_str()).collect();
        assert_eq!(titles, vec!["TOP", "GOWN", "TROUSERS"]);
        assert_eq!(groups[0].rows[0].display, "96 cm");
        assert_eq!(groups[1].rows[0].display, "Skipped");
        assert_eq!(groups[1].rows[0].value, FieldValue::Skipped);
    }

    #[test]
    fn test_empty_groups_omitted() {
        let groups = group_items(&[item("top", "neck", 38.5)], "inch");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].rows[0].display, "38.5 inch");
    }

    #[test]
    fn test_summary_labels() {
        let record = MeasurementRecord {
            id: "m1".to_string(),
            user_id: "u".to_string(),
            full_name: "Ama".to_string(),
            profile_name: "Kaba".to_string(),
            sex: "female".to_string(),
            unit: "cm".to_string(),
            created_at: Some("2026-03-09T08:30:00+00:00".to_string()),
        };
        let summary = MeasurementSummary::from(&record);
        assert_eq!(summary.sex_label, "FEMALE");
        assert_eq!(summary.date_label, "09/03/2026");
        assert_eq!(format_date(Some("yesterday")), "");
    }
}
