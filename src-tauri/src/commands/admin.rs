use tauri::{AppHandle, Manager};

use crate::admin::{self, AdminAccess};
use crate::state::AppState;

#[tauri::command]
pub async fn check_admin_access(app: AppHandle) -> Result<AdminAccess, String> {
    let state = app.state::<AppState>();
    let store = state.store()?;
    Ok(admin::check_access(&state.session, store).await?)
}
