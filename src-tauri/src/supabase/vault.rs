use keyring::Entry;
use tracing::{info, warn};

pub const SESSION_SERVICE: &str = "ckstyle-session";
const ACCOUNT: &str = "ckstyle";

/// Keeps the refresh token in the OS keychain so a sign-in survives restarts.
#[derive(Debug, Clone)]
pub struct KeychainVault {
    service: String,
}

impl Default for KeychainVault {
    fn default() -> Self {
        Self::new(SESSION_SERVICE)
    }
}

impl KeychainVault {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    pub fn store(&self, refresh_token: &str) -> Result<(), String> {
        let entry = Entry::new(&self.service, ACCOUNT).map_err(|e| {
            warn!("Failed to create keyring entry for {}: {}", self.service, e);
            e.to_string()
        })?;
        entry.set_password(refresh_token).map_err(|e| {
            warn!("Failed to store refresh token: {}", e);
            e.to_string()
        })
    }

    pub fn load(&self) -> Result<Option<String>, String> {
        let entry = Entry::new(&self.service, ACCOUNT).map_err(|e| {
            warn!("Failed to create keyring entry for {}: {}", self.service, e);
            e.to_string()
        })?;
        match entry.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => {
                info!("No stored session in keychain");
                Ok(None)
            }
            Err(e) => {
                warn!("Failed to read refresh token: {}", e);
                Err(e.to_string())
            }
        }
    }

    pub fn clear(&self) -> Result<(), String> {
        let entry = Entry::new(&self.service, ACCOUNT).map_err(|e| e.to_string())?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => {
                warn!("Failed to delete refresh token: {}", e);
                Err(e.to_string())
            }
        }
    }
}
