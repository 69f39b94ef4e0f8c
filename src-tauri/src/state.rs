//! Long-lived back-end state handed to Tauri as managed state.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::BackendConfig;
use crate::draft::{DraftStore, PendingDraft};
use crate::error::{CkStyleError, Result};
use crate::export::{self, ExportFormat, ExportedFile};
use crate::notifications::NotificationCenter;
use crate::profile::{self, MeasurementDetail};
use crate::session::{self, SessionContext};
use crate::store::{RecordStore, SupabaseStore};
use crate::supabase::{self as provider, AuthClient, AuthProvider, KeychainVault, RestClient};
use crate::wizard::{self, Stage, WizardSession, WizardView};

/// The wizard plus its in-flight save flag.
#[derive(Default)]
pub struct WizardState {
    pub session: Mutex<WizardSession>,
    saving: AtomicBool,
}

/// Clears the saving flag when dropped.
pub struct SaveGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for SaveGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl WizardState {
    /// Claim the save slot, or fail if a save is already running.
    pub fn begin_save(&self) -> Result<SaveGuard<'_>> {
        if self.saving.swap(true, Ordering::SeqCst) {
            return Err(CkStyleError::Validation(
                "A save is already in progress".to_string(),
            ));
        }
        Ok(SaveGuard { flag: &self.saving })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SaveOutcome {
    Saved { view: WizardView, record_id: String },
    LoginRequired { view: WizardView, message: String },
}

/// The measurement set last opened on the profile page, tied to the user
/// who opened it. Exports are rendered from here.
struct OpenedDetail {
    user_id: String,
    detail: MeasurementDetail,
}

pub struct AppState {
    pub config: BackendConfig,
    pub auth: Arc<AuthProvider>,
    pub session: SessionContext,
    store: Option<Arc<dyn RecordStore>>,
    pub notifications: Option<Arc<NotificationCenter>>,
    pub wizard: WizardState,
    pub drafts: DraftStore,
    opened: Mutex<Option<OpenedDetail>>,
}

impl AppState {
    /// Wire the hosted services from `config`. A missing URL or key leaves
    /// the network-backed parts unset; their commands report the config error.
    pub fn new(config: BackendConfig, data_dir: PathBuf) -> Self {
        let (writer, _) = session::channel();

        let clients = provider::http_client().and_then(|http| {
            Ok((
                AuthClient::new(&config, http.clone())?,
                RestClient::new(&config, http)?,
            ))
        });
        let (auth_client, rest) = match clients {
            Ok((auth, rest)) => (Some(auth), Some(rest)),
            Err(e) => {
                warn!("Hosted backend unavailable: {}", e);
                (None, None)
            }
        };

        let auth = Arc::new(AuthProvider::new(
            auth_client,
            writer,
            Some(KeychainVault::default()),
        ));
        let store: Option<Arc<dyn RecordStore>> = rest
            .map(|rest| Arc::new(SupabaseStore::new(rest, auth.clone())) as Arc<dyn RecordStore>);
        Self::assemble(config, data_dir, auth, store)
    }

    /// State over an arbitrary record store and no auth service. Sessions
    /// are installed with [`AuthProvider::adopt`].
    pub fn with_store(
        config: BackendConfig,
        data_dir: PathBuf,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        let (writer, _) = session::channel();
        let auth = Arc::new(AuthProvider::new(None, writer, None));
        Self::assemble(config, data_dir, auth, Some(store))
    }

    fn assemble(
        config: BackendConfig,
        data_dir: PathBuf,
        auth: Arc<AuthProvider>,
        store: Option<Arc<dyn RecordStore>>,
    ) -> Self {
        let context = auth.context();
        let notifications = store
            .as_ref()
            .map(|s| Arc::new(NotificationCenter::new(s.clone(), context.clone())));
        Self {
            auth,
            session: context,
            store,
            notifications,
            wizard: WizardState::default(),
            drafts: DraftStore::new(&data_dir),
            opened: Mutex::new(None),
            config,
        }
    }

    pub fn store(&self) -> Result<&dyn RecordStore> {
        self.store
            .as_deref()
            .ok_or_else(|| CkStyleError::Config("The record store is not configured".to_string()))
    }

    /// Save the reviewed wizard. Signed out, nothing is written anywhere and
    /// the caller is told to log in. A successful save starts a new wizard.
    pub async fn save_wizard(&self) -> Result<SaveOutcome> {
        let _guard = self.wizard.begin_save()?;
        let mut wizard = self.wizard.session.lock().await;
        if wizard.stage() != Stage::Review {
            return Err(CkStyleError::Validation(
                "Finish the measurements before saving".to_string(),
            ));
        }

        // refreshes a stale token before writing
        if let Err(e) = self.auth.get_session().await {
            warn!("Session refresh before save failed: {}", e);
        }

        if !self.session.is_present() {
            info!("Save attempted while signed out");
            return Ok(SaveOutcome::LoginRequired {
                view: wizard.view(),
                message: CkStyleError::LoginRequired.to_string(),
            });
        }

        let store = self.store()?;
        let record_id = wizard::save_measurements(&mut wizard, &self.session, store).await?;
        let view = wizard.view();
        *wizard = WizardSession::new();
        if let Err(e) = self.drafts.clear() {
            warn!("Saved, but the old draft could not be removed: {}", e);
        }
        Ok(SaveOutcome::Saved { view, record_id })
    }

    /// Keep the reviewed set on disk so it can be saved after signing in.
    pub async fn stash_draft(&self) -> Result<PendingDraft> {
        let wizard = self.wizard.session.lock().await;
        if wizard.stage() != Stage::Review {
            return Err(CkStyleError::Validation(
                "Only a reviewed measurement set can be kept for later".to_string(),
            ));
        }
        let draft = PendingDraft::from_wizard(&wizard)
            .ok_or_else(|| CkStyleError::Validation("Missing profile details".to_string()))?;
        self.drafts.save(&draft)?;
        Ok(draft)
    }

    pub async fn resume_draft(&self) -> Result<WizardView> {
        let draft = self
            .drafts
            .load()
            .ok_or_else(|| CkStyleError::Validation("No saved draft to resume".to_string()))?;
        let restored = draft.into_wizard()?;
        let mut wizard = self.wizard.session.lock().await;
        *wizard = restored;
        info!("Resumed measurement draft");
        Ok(wizard.view())
    }

    /// Load one set for the profile page and keep it for export.
    pub async fn open_measurement(&self, id: &str) -> Result<MeasurementDetail> {
        let detail = profile::load_detail(&self.session, self.store()?, id).await?;
        let user_id = self.session.user().map(|u| u.id).unwrap_or_default();
        *self.opened.lock().await = Some(OpenedDetail {
            user_id,
            detail: detail.clone(),
        });
        Ok(detail)
    }

    /// Write the opened set to `dir`. No store access.
    pub async fn export_opened(
        &self,
        id: &str,
        format: ExportFormat,
        dir: &Path,
    ) -> Result<ExportedFile> {
        let user = self.session.user().ok_or(CkStyleError::LoginRequired)?;
        let opened = self.opened.lock().await;
        let detail = opened
            .as_ref()
            .filter(|o| o.user_id == user.id && o.detail.summary.id == id)
            .map(|o| &o.detail)
            .ok_or_else(|| {
                CkStyleError::Validation("Open the measurement set before exporting".to_string())
            })?;
        export::export_detail(detail, format, dir)
    }

    pub fn notification_center(&self) -> Result<&Arc<NotificationCenter>> {
        self.notifications
            .as_ref()
            .ok_or_else(|| CkStyleError::Config("The record store is not configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_save_rejected_while_first_in_flight() {
        let wizard = WizardState::default();
        let guard = wizard.begin_save().unwrap();
        assert!(wizard.begin_save().is_err());
        drop(guard);
        assert!(wizard.begin_save().is_ok());
    }

    #[test]
    fn test_unconfigured_state_reports_config_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = BackendConfig::from_lookup(|_| None);
        let state = AppState::new(config, tmp.path().to_path_buf());
        assert!(matches!(state.store(), Err(CkStyleError::Config(_))));
        assert!(state.notification_center().is_err());
    }
}
