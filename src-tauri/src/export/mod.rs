//! Export a fetched measurement set as CSV, printable HTML or a PNG card.

pub mod csv;
pub mod image;
pub mod print;

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CkStyleError, Result};
use crate::files::write_atomic;
use crate::profile::MeasurementDetail;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Print,
    Image,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Print => "html",
            ExportFormat::Image => "png",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportedFile {
    pub path: String,
    pub file_name: String,
    /// Base64 PNG for the in-app preview (image exports only).
    pub preview_base64: Option<String>,
}

const RESERVED_IN_FILE_NAMES: &str = "/\\:*?\"<>|";

/// `<profile name with whitespace runs as _>_CK_STYLE.<ext>`. Reserved
/// characters are dropped and leading dots trimmed, so the file always lands
/// directly in the export folder.
pub fn export_file_name(profile_name: &str, format: ExportFormat) -> String {
    let cleaned: String = profile_name
        .chars()
        .filter(|c| !c.is_control() && !RESERVED_IN_FILE_NAMES.contains(*c))
        .collect();
    let stem = cleaned.split_whitespace().collect::<Vec<_>>().join("_");
    let stem = stem.trim_start_matches('.');
    let stem = if stem.is_empty() { "Measurements" } else { stem };
    format!("{}_CK_STYLE.{}", stem, format.extension())
}

pub fn render(detail: &MeasurementDetail, format: ExportFormat) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Csv => Ok(csv::render_csv(detail)?.into_bytes()),
        ExportFormat::Print => Ok(print::render_print_html(detail)?.into_bytes()),
        ExportFormat::Image => image::render_png(detail),
    }
}

/// Render and write into `dir`.
pub fn export_detail(detail: &MeasurementDetail, format: ExportFormat, dir: &Path) -> Result<ExportedFile> {
    let bytes = render(detail, format)?;
    let file_name = export_file_name(&detail.summary.profile_name, format);
    let path = dir.join(&file_name);
    write_atomic(&path, &bytes).map_err(|e| CkStyleError::Export(format!("{:#}", e)))?;
    info!("Exported {:?} for '{}' to {:?}", format, detail.summary.profile_name, path);

    Ok(ExportedFile {
        path: path.to_string_lossy().to_string(),
        file_name,
        preview_base64: (format == ExportFormat::Image).then(|| STANDARD.encode(&bytes)),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::store::{MeasurementItem, MeasurementRecord};
    use tempfile::TempDir;

    pub(crate) fn sample_detail() -> MeasurementDetail {
        let record = MeasurementRecord {
            id: "m1".to_string(),
            user_id: "u1".to_string(),
            full_name: "Kwame Mensah".to_string(),
            profile_name: "Wedding, Saturday".to_string(),
            sex: "male".to_string(),
            unit: "cm".to_string(),
            created_at: Some("2026-05-02T09:00:00+00:00".to_string()),
        };
        let item = |category: &str, key: &str, name: &str, value: f64| MeasurementItem {
            id: format!("i-{}", key),
            measurement_id: "m1".to_string(),
            category: category.to_string(),
            measurement_key: key.to_string(),
            measurement_value: value,
            display_name: name.to_string(),
        };
        MeasurementDetail::new(
            &record,
            vec![
                item("top", "chest", "Chest", 96.0),
                item("top", "neck", "Neck Round", 0.0),
                item("trousers", "lap", "Lap (Thigh)", 61.5),
            ],
        )
    }

    #[test]
    fn test_file_names() {
        assert_eq!(
            export_file_name("Wedding  Suit\tBlue", ExportFormat::Csv),
            "Wedding_Suit_Blue_CK_STYLE.csv"
        );
        assert_eq!(export_file_name("Kaba", ExportFormat::Print), "Kaba_CK_STYLE.html");
        assert_eq!(export_file_name("Kaba", ExportFormat::Image), "Kaba_CK_STYLE.png");
    }

    #[test]
    fn test_file_names_cannot_leave_the_folder() {
        assert_eq!(export_file_name("../../.ssh/keys", ExportFormat::Csv), "sshkeys_CK_STYLE.csv");
        assert_eq!(export_file_name("..\\Startup\\run", ExportFormat::Print), "Startuprun_CK_STYLE.html");
        assert_eq!(export_file_name("C:/x", ExportFormat::Image), "Cx_CK_STYLE.png");
        assert_eq!(export_file_name(" / ", ExportFormat::Csv), "Measurements_CK_STYLE.csv");
    }

    #[test]
    fn test_traversing_name_is_written_inside_dir() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("Downloads");
        let mut detail = sample_detail();
        detail.summary.profile_name = "../escaped".to_string();
        let exported = export_detail(&detail, ExportFormat::Csv, &dir).unwrap();
        let path = std::path::Path::new(&exported.path);
        assert_eq!(path.parent(), Some(dir.as_path()));
        assert_eq!(exported.file_name, "escaped_CK_STYLE.csv");
        assert!(!tmp.path().join("escaped_CK_STYLE.csv").exists());
    }

    #[test]
    fn test_export_writes_file() {
        let tmp = TempDir::new().unwrap();
        let exported = export_detail(&sample_detail(), ExportFormat::Csv, tmp.path()).unwrap();
        assert_eq!(exported.file_name, "Wedding,_Saturday_CK_STYLE.csv");
        assert!(exported.preview_base64.is_none());
        let written = std::fs::read_to_string(&exported.path).unwrap();
        assert!(written.starts_with(super::csv::CSV_TITLE));
    }

    #[test]
    fn test_image_export_has_preview() {
        let tmp = TempDir::new().unwrap();
        let exported = export_detail(&sample_detail(), ExportFormat::Image, tmp.path()).unwrap();
        let preview = exported.preview_base64.unwrap();
        let decoded = STANDARD.decode(preview).unwrap();
        assert_eq!(&decoded[1..4], b"PNG");
    }
}
