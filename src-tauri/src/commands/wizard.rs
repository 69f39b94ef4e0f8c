//! Tauri commands driving the measurement wizard.
//!
//! Each command returns a fresh [`WizardView`] so the window renders
//! straight from back-end state.

use serde::Serialize;
use tauri::{AppHandle, Manager};
use tracing::info;

use crate::draft::PendingDraft;
use crate::state::{AppState, SaveOutcome};
use crate::wizard::{IntroForm, WizardSession, WizardView};

#[derive(Debug, Clone, Serialize)]
pub struct DraftSummary {
    pub profile_label: String,
    pub subject_name: String,
    pub saved_at: String,
}

#[tauri::command]
pub async fn wizard_state(app: AppHandle) -> Result<WizardView, String> {
    let state = app.state::<AppState>();
    let session = state.wizard.session.lock().await;
    Ok(session.view())
}

#[tauri::command]
pub async fn wizard_submit_intro(app: AppHandle, form: IntroForm) -> Result<WizardView, String> {
    let state = app.state::<AppState>();
    let mut session = state.wizard.session.lock().await;
    session.submit_intro(&form)?;
    Ok(session.view())
}

#[tauri::command]
pub async fn wizard_advance(app: AppHandle, input: String) -> Result<WizardView, String> {
    let state = app.state::<AppState>();
    let mut session = state.wizard.session.lock().await;
    session.advance(&input)?;
    Ok(session.view())
}

#[tauri::command]
pub async fn wizard_skip(app: AppHandle) -> Result<WizardView, String> {
    let state = app.state::<AppState>();
    let mut session = state.wizard.session.lock().await;
    session.skip()?;
    Ok(session.view())
}

#[tauri::command]
pub async fn wizard_back(app: AppHandle) -> Result<WizardView, String> {
    let state = app.state::<AppState>();
    let mut session = state.wizard.session.lock().await;
    session.back()?;
    Ok(session.view())
}

#[tauri::command]
pub async fn wizard_edit(app: AppHandle, index: usize) -> Result<WizardView, String> {
    let state = app.state::<AppState>();
    let mut session = state.wizard.session.lock().await;
    session.edit(index)?;
    Ok(session.view())
}

/// Start a new measurement set.
#[tauri::command]
pub async fn wizard_reset(app: AppHandle) -> Result<WizardView, String> {
    let state = app.state::<AppState>();
    let mut session = state.wizard.session.lock().await;
    *session = WizardSession::new();
    info!("Wizard reset");
    Ok(session.view())
}

/// Persist the reviewed set. Without a session nothing is written and the
/// caller is told to log in.
#[tauri::command]
pub async fn wizard_save(app: AppHandle) -> Result<SaveOutcome, String> {
    let state = app.state::<AppState>();
    Ok(state.save_wizard().await?)
}

impl From<PendingDraft> for DraftSummary {
    fn from(d: PendingDraft) -> Self {
        Self {
            profile_label: d.intro.profile_label,
            subject_name: d.intro.subject_name,
            saved_at: d.saved_at,
        }
    }
}

/// Keep the reviewed set locally, on the user's request, until they sign in.
#[tauri::command]
pub async fn stash_draft(app: AppHandle) -> Result<DraftSummary, String> {
    let state = app.state::<AppState>();
    Ok(state.stash_draft().await?.into())
}

#[tauri::command]
pub async fn pending_draft(app: AppHandle) -> Result<Option<DraftSummary>, String> {
    let state = app.state::<AppState>();
    Ok(state.drafts.load().map(DraftSummary::from))
}

/// Restore the stashed draft at the review step. Saving stays explicit.
#[tauri::command]
pub async fn resume_draft(app: AppHandle) -> Result<WizardView, String> {
    let state = app.state::<AppState>();
    Ok(state.resume_draft().await?)
}

#[tauri::command]
pub async fn discard_draft(app: AppHandle) -> Result<(), String> {
    let state = app.state::<AppState>();
    state.drafts.clear()?;
    Ok(())
}
