use tauri::{AppHandle, Emitter, Manager};
use tracing::warn;

use super::config::read_theme;
use crate::navigation::{self, NavState};
use crate::notifications::{NotificationItem, NotificationSnapshot, UPDATED_EVENT};
use crate::state::AppState;

fn broadcast(app: &AppHandle, snapshot: &NotificationSnapshot) {
    if let Err(e) = app.emit(UPDATED_EVENT, snapshot) {
        warn!("Failed to emit {}: {}", UPDATED_EVENT, e);
    }
}

#[tauri::command]
pub async fn get_nav_state(app: AppHandle) -> Result<NavState, String> {
    let state = app.state::<AppState>();
    let theme = read_theme(&app);
    Ok(navigation::nav_state(&state.session, state.store().ok(), theme).await)
}

#[tauri::command]
pub async fn get_notifications(app: AppHandle) -> Result<NotificationSnapshot, String> {
    let state = app.state::<AppState>();
    let center = state.notification_center()?;
    Ok(center.refresh().await?)
}

#[tauri::command]
pub async fn mark_notification_read(app: AppHandle, id: String) -> Result<NotificationSnapshot, String> {
    let state = app.state::<AppState>();
    let snapshot = state.notification_center()?.mark_read(&id).await?;
    broadcast(&app, &snapshot);
    Ok(snapshot)
}

#[tauri::command]
pub async fn clear_notifications(app: AppHandle) -> Result<NotificationSnapshot, String> {
    let state = app.state::<AppState>();
    let snapshot = state.notification_center()?.clear_all().await?;
    broadcast(&app, &snapshot);
    Ok(snapshot)
}

#[tauri::command]
pub async fn notification_history(app: AppHandle) -> Result<Vec<NotificationItem>, String> {
    let state = app.state::<AppState>();
    Ok(state.notification_center()?.history().await?)
}
