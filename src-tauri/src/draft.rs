//! Measurement draft the user chose to keep while signed out.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CkStyleError, Result};
use crate::files::write_atomic;
use crate::wizard::validation::{validate_intro, IntroForm};
use crate::wizard::{FieldValue, WizardSession};

pub const DRAFT_FILE: &str = "pending_measurements.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingDraft {
    pub intro: IntroForm,
    pub values: BTreeMap<String, FieldValue>,
    pub saved_at: String,
}

impl PendingDraft {
    pub fn from_wizard(wizard: &WizardSession) -> Option<Self> {
        let intro = wizard.intro()?;
        Some(Self {
            intro: IntroForm::from(intro),
            values: wizard.collected().clone(),
            saved_at: Utc::now().to_rfc3339(),
        })
    }

    /// Rebuild the wizard at the review step.
    pub fn into_wizard(self) -> Result<WizardSession> {
        let details = validate_intro(&self.intro)?;
        Ok(WizardSession::restore_for_review(details, self.values))
    }
}

pub struct DraftStore {
    path: PathBuf,
}

impl DraftStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(DRAFT_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, draft: &PendingDraft) -> Result<()> {
        let json = serde_json::to_vec_pretty(draft)
            .map_err(|e| CkStyleError::Local(format!("Failed to encode draft: {}", e)))?;
        write_atomic(&self.path, &json).map_err(|e| CkStyleError::Local(format!("{:#}", e)))?;
        info!("Stashed measurement draft '{}'", draft.intro.profile_label);
        Ok(())
    }

    /// The stashed draft, if any. A corrupt file is treated as absent.
    pub fn load(&self) -> Option<PendingDraft> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&content) {
            Ok(draft) => Some(draft),
            Err(e) => {
                warn!("Ignoring unreadable draft at {:?}: {}", self.path, e);
                None
            }
        }
    }

    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Cleared measurement draft");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CkStyleError::Local(format!(
                "Failed to remove draft {:?}: {}",
                self.path, e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::Stage;
    use tempfile::TempDir;

    fn wizard_in_review() -> WizardSession {
        let mut wizard = WizardSession::new();
        wizard
            .submit_intro(&IntroForm {
                subject_name: "Kofi".to_string(),
                profile_label: "Agbada".to_string(),
                sex: "male".to_string(),
                unit: "cm".to_string(),
            })
            .unwrap();
        wizard.advance("55").unwrap();
        while wizard.stage() == Stage::Measuring {
            wizard.skip().unwrap();
        }
        wizard
    }

    #[test]
    fn test_draft_survives_reload() {
        let tmp = TempDir::new().unwrap();
        let store = DraftStore::new(tmp.path());
        assert!(store.load().is_none());

        let draft = PendingDraft::from_wizard(&wizard_in_review()).unwrap();
        store.save(&draft).unwrap();

        let restored = store.load().unwrap().into_wizard().unwrap();
        assert_eq!(restored.stage(), Stage::Review);
        assert_eq!(restored.value("hand_length"), Some(FieldValue::Measured(55.0)));
        assert_eq!(restored.value("hips"), Some(FieldValue::Skipped));

        store.clear().unwrap();
        assert!(store.load().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn test_corrupt_draft_is_ignored() {
        let tmp = TempDir::new().unwrap();
        let store = DraftStore::new(tmp.path());
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_no_draft_before_intro() {
        assert!(PendingDraft::from_wizard(&WizardSession::new()).is_none());
    }
}
