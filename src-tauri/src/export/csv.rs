use csv::{Terminator, WriterBuilder};

use crate::error::{CkStyleError, Result};
use crate::profile::{value_label, MeasurementDetail};

pub const CSV_TITLE: &str = "CK STYLE - Measurement Profile";

/// One block of same-width records, quoted where the data needs it.
fn write_block<R, I, F>(records: R) -> Result<String>
where
    R: IntoIterator<Item = I>,
    I: IntoIterator<Item = F>,
    F: AsRef<[u8]>,
{
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    for record in records {
        writer
            .write_record(record)
            .map_err(|e| CkStyleError::Export(format!("CSV write failed: {}", e)))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| CkStyleError::Export(format!("CSV flush failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| CkStyleError::Export(e.to_string()))
}

/// Title line, the set's details, then one row per measurement; blocks are
/// separated by a blank line.
pub fn render_csv(detail: &MeasurementDetail) -> Result<String> {
    let summary = &detail.summary;
    let info = write_block([
        ["Profile Name", summary.profile_name.as_str()],
        ["Full Name", summary.full_name.as_str()],
        ["Sex", summary.sex_label.as_str()],
        ["Unit", summary.unit.as_str()],
        ["Date", summary.date_label.as_str()],
    ])?;

    let header = [["Category", "Measurement", "Value"].map(String::from)];
    let rows = detail.items.iter().map(|item| {
        [
            item.category.clone(),
            item.display_name.clone(),
            value_label(item.measurement_value, &summary.unit),
        ]
    });
    let table = write_block(header.into_iter().chain(rows))?;

    Ok(format!("{}\n\n{}\n{}", CSV_TITLE, info, table))
}
