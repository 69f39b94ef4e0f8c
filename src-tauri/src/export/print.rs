use askama::Template;

use crate::error::{CkStyleError, Result};
use crate::profile::MeasurementDetail;

/// A standalone document for the system print dialog. Values are
/// HTML-escaped by the template.
#[derive(Template)]
#[template(path = "print.html")]
struct PrintTemplate<'a> {
    detail: &'a MeasurementDetail,
}

pub fn render_print_html(detail: &MeasurementDetail) -> Result<String> {
    PrintTemplate { detail }
        .render()
        .map_err(|e| CkStyleError::Export(format!("Print layout failed: {}", e)))
}
