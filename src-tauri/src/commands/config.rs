use tauri::{AppHandle, Manager};
use tauri_plugin_store::StoreExt;
use tracing::{info, warn};

use crate::state::AppState;
use crate::theme::{self, Theme, THEME_KEY};

pub const PREFERENCES_FILE: &str = "preferences.json";

fn load_preference(app: &AppHandle, key: &str) -> Result<Option<String>, String> {
    let store = app.store(PREFERENCES_FILE).map_err(|e| {
        warn!("Failed to open {}: {}", PREFERENCES_FILE, e);
        e.to_string()
    })?;
    Ok(store.get(key).and_then(|v| v.as_str().map(str::to_string)))
}

fn save_preference(app: &AppHandle, key: &str, value: &str) -> Result<(), String> {
    info!("Saving preference {} = {}", key, value);
    let store = app.store(PREFERENCES_FILE).map_err(|e| {
        warn!("Failed to open {}: {}", PREFERENCES_FILE, e);
        e.to_string()
    })?;
    store.set(key, serde_json::json!(value));
    store.save().map_err(|e| {
        warn!("Failed to write {}: {}", PREFERENCES_FILE, e);
        e.to_string()
    })
}

/// Locally stored theme; light when unset or unreadable.
pub(crate) fn read_theme(app: &AppHandle) -> Theme {
    let stored = load_preference(app, THEME_KEY).unwrap_or_else(|e| {
        warn!("Theme preference unreadable: {}", e);
        None
    });
    Theme::from_preference(stored.as_deref())
}

pub(crate) fn write_theme(app: &AppHandle, theme: Theme) -> Result<(), String> {
    save_preference(app, THEME_KEY, theme.as_str())
}

/// After sign-in, adopt the profile's theme if it differs from the local one.
pub(crate) async fn apply_profile_theme(app: &AppHandle) -> Theme {
    let state = app.state::<AppState>();
    let local = read_theme(app);
    let Ok(store) = state.store() else {
        return local;
    };
    match theme::profile_override(store, &state.session, local).await {
        Some(remote) => {
            if let Err(e) = write_theme(app, remote) {
                warn!("Failed to store profile theme locally: {}", e);
            }
            remote
        }
        None => local,
    }
}

#[tauri::command]
pub fn get_theme(app: AppHandle) -> Result<Theme, String> {
    Ok(read_theme(&app))
}

#[tauri::command]
pub async fn set_theme(app: AppHandle, theme: Theme) -> Result<Theme, String> {
    info!("Setting theme: {}", theme);
    write_theme(&app, theme)?;
    let state = app.state::<AppState>();
    if let Ok(store) = state.store() {
        theme::push_to_profile(store, &state.session, theme).await;
    }
    Ok(theme)
}

#[tauri::command]
pub async fn toggle_theme(app: AppHandle) -> Result<Theme, String> {
    let next = read_theme(&app).toggled();
    set_theme(app, next).await
}
