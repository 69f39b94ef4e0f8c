use tauri::{AppHandle, Manager};

use crate::catalog::{self, CollectionCard};
use crate::state::AppState;

#[tauri::command]
pub async fn get_collections(app: AppHandle) -> Result<Vec<CollectionCard>, String> {
    let state = app.state::<AppState>();
    let store = state.store()?;
    Ok(catalog::load_feed(store, &state.config.whatsapp_number).await?)
}
