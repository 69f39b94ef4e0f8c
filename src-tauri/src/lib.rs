pub mod admin;
pub mod catalog;
mod commands;
pub mod config;
pub mod draft;
pub mod error;
pub mod export;
pub mod files;
pub mod navigation;
pub mod notifications;
pub mod profile;
pub mod session;
pub mod state;
pub mod store;
pub mod supabase;
pub mod theme;
pub mod wizard;

pub use error::{CkStyleError, Result};
pub use state::{AppState, SaveOutcome};

use tauri::{AppHandle, Emitter, Manager};
use tracing::{info, warn};

use crate::commands::auth::{AuthView, AUTH_EVENT};
use crate::commands::config::{apply_profile_theme, read_theme};

pub fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tauri::Builder::default()
        .plugin(tauri_plugin_store::Builder::new().build())
        .invoke_handler(tauri::generate_handler![
            commands::config::get_theme,
            commands::config::set_theme,
            commands::config::toggle_theme,
            commands::auth::get_auth_state,
            commands::auth::sign_up,
            commands::auth::sign_in,
            commands::auth::sign_out,
            commands::auth::request_password_reset,
            commands::auth::open_recovery_link,
            commands::auth::update_password,
            commands::wizard::wizard_state,
            commands::wizard::wizard_submit_intro,
            commands::wizard::wizard_advance,
            commands::wizard::wizard_skip,
            commands::wizard::wizard_back,
            commands::wizard::wizard_edit,
            commands::wizard::wizard_reset,
            commands::wizard::wizard_save,
            commands::wizard::stash_draft,
            commands::wizard::pending_draft,
            commands::wizard::resume_draft,
            commands::wizard::discard_draft,
            commands::notifications::get_nav_state,
            commands::notifications::get_notifications,
            commands::notifications::mark_notification_read,
            commands::notifications::clear_notifications,
            commands::notifications::notification_history,
            commands::profile::list_measurement_profiles,
            commands::profile::get_measurement_detail,
            commands::profile::export_measurement,
            commands::catalog::get_collections,
            commands::admin::check_admin_access,
        ])
        .setup(|app| {
            let data_dir = app.path().app_data_dir()?;
            app.manage(AppState::new(config::BackendConfig::from_env(), data_dir));

            let handle = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                restore_session(&handle).await;
                watch_session(handle).await;
            });

            let handle = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                poll_notifications(handle).await;
            });
            Ok(())
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}

async fn restore_session(app: &AppHandle) {
    let state = app.state::<AppState>();
    match state.auth.restore().await {
        Ok(Some(user)) => {
            info!("Signed in from stored session as {}", user.display_name());
            apply_profile_theme(app).await;
        }
        Ok(None) => info!("No stored session"),
        Err(e) => warn!("Session restore failed: {}", e),
    }
}

/// Tell the window about every sign-in and sign-out.
async fn watch_session(app: AppHandle) {
    let mut changes = app.state::<AppState>().session.subscribe();
    if let Err(e) = emit_auth_state(&app) {
        warn!("Failed to emit {}: {}", AUTH_EVENT, e);
    }
    while changes.changed().await.is_ok() {
        if let Err(e) = emit_auth_state(&app) {
            warn!("Failed to emit {}: {}", AUTH_EVENT, e);
        }
    }
}

fn emit_auth_state(app: &AppHandle) -> tauri::Result<()> {
    let state = app.state::<AppState>();
    let view = AuthView::from_session(&state.session, read_theme(app));
    app.emit(AUTH_EVENT, view)
}

async fn poll_notifications(app: AppHandle) {
    let state = app.state::<AppState>();
    let Some(center) = state.notifications.clone() else {
        warn!("Record store not configured; notifications disabled");
        return;
    };
    let interval = state.config.notification_poll_interval;
    let emitter = app.clone();
    notifications::run_poller(center, interval, move |snapshot| {
        if let Err(e) = emitter.emit(notifications::UPDATED_EVENT, &snapshot) {
            warn!("Failed to emit {}: {}", notifications::UPDATED_EVENT, e);
        }
    })
    .await;
}
