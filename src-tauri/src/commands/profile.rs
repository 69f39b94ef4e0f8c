use tauri::{AppHandle, Manager};
use tracing::info;

use crate::export::{ExportFormat, ExportedFile};
use crate::files;
use crate::profile::{self, MeasurementDetail, MeasurementSummary};
use crate::state::AppState;

#[tauri::command]
pub async fn list_measurement_profiles(app: AppHandle) -> Result<Vec<MeasurementSummary>, String> {
    let state = app.state::<AppState>();
    let store = state.store()?;
    Ok(profile::list_measurements(&state.session, store).await?)
}

#[tauri::command]
pub async fn get_measurement_detail(app: AppHandle, id: String) -> Result<MeasurementDetail, String> {
    let state = app.state::<AppState>();
    Ok(state.open_measurement(&id).await?)
}

/// Write the opened set in the requested format to Downloads.
#[tauri::command]
pub async fn export_measurement(
    app: AppHandle,
    id: String,
    format: ExportFormat,
) -> Result<ExportedFile, String> {
    let state = app.state::<AppState>();
    let data_dir = app
        .path()
        .app_data_dir()
        .map_err(|e| format!("Failed to get data dir: {}", e))?;
    let dir = files::export_dir(&data_dir);

    let exported = state.export_opened(&id, format, &dir).await?;
    info!("Export ready at {}", exported.path);
    Ok(exported)
}
