use std::time::Duration;

use tracing::{info, warn};
use url::Url;

use crate::error::{CkStyleError, Result};

pub const ENV_SUPABASE_URL: &str = "CKSTYLE_SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "CKSTYLE_SUPABASE_ANON_KEY";
pub const ENV_RESET_REDIRECT_URL: &str = "CKSTYLE_RESET_REDIRECT_URL";
pub const ENV_POLL_SECS: &str = "CKSTYLE_NOTIFICATION_POLL_SECS";
pub const ENV_WHATSAPP_NUMBER: &str = "CKSTYLE_WHATSAPP_NUMBER";

pub const DEFAULT_POLL_SECS: u64 = 30;
pub const DEFAULT_WHATSAPP_NUMBER: &str = "237671002411";

/// Endpoint and key pairs for the hosted backend, read once at startup.
///
/// Only the publishable (anon) key belongs here; row-level security on the
/// server decides what each signed-in user can see.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub supabase_url: Option<Url>,
    pub anon_key: Option<String>,
    pub reset_redirect_url: Option<String>,
    pub notification_poll_interval: Duration,
    pub whatsapp_number: String,
}

impl BackendConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup so tests don't touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let supabase_url = get(ENV_SUPABASE_URL).and_then(|raw| match Url::parse(&raw) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("Ignoring invalid {}='{}': {}", ENV_SUPABASE_URL, raw, e);
                None
            }
        });

        let poll_secs = get(ENV_POLL_SECS)
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_POLL_SECS);

        let config = Self {
            supabase_url,
            anon_key: get(ENV_SUPABASE_ANON_KEY),
            reset_redirect_url: get(ENV_RESET_REDIRECT_URL),
            notification_poll_interval: Duration::from_secs(poll_secs),
            whatsapp_number: get(ENV_WHATSAPP_NUMBER)
                .unwrap_or_else(|| DEFAULT_WHATSAPP_NUMBER.to_string()),
        };
        info!(
            "Backend configured: url set: {}, anon key set: {}, poll every {:?}",
            config.supabase_url.is_some(),
            config.anon_key.is_some(),
            config.notification_poll_interval
        );
        config
    }

    /// Base URL and anon key, or a config error naming what is missing.
    pub fn endpoint(&self) -> Result<(&Url, &str)> {
        let url = self.supabase_url.as_ref().ok_or_else(|| {
            CkStyleError::Config(format!("{} is not set", ENV_SUPABASE_URL))
        })?;
        let key = self.anon_key.as_deref().ok_or_else(|| {
            CkStyleError::Config(format!("{} is not set", ENV_SUPABASE_ANON_KEY))
        })?;
        Ok((url, key))
    }

    /// Join a service path (e.g. `auth/v1/`) onto the project URL.
    pub fn service_url(&self, path: &str) -> Result<Url> {
        let (base, _) = self.endpoint()?;
        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let p = format!("{}/", base.path());
            base.set_path(&p);
        }
        base.join(path)
            .map_err(|e| CkStyleError::Config(format!("Bad service path '{}': {}", path, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> BackendConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BackendConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults_when_env_empty() {
        let config = config_from(&[]);
        assert!(config.supabase_url.is_none());
        assert!(config.anon_key.is_none());
        assert_eq!(config.notification_poll_interval, Duration::from_secs(30));
        assert_eq!(config.whatsapp_number, "237671002411");
        assert!(matches!(config.endpoint(), Err(CkStyleError::Config(_))));
    }

    #[test]
    fn test_service_url_joins_paths() {
        let config = config_from(&[
            (ENV_SUPABASE_URL, "https://demo.supabase.co"),
            (ENV_SUPABASE_ANON_KEY, "anon"),
        ]);
        let url = config.service_url("rest/v1/").unwrap();
        assert_eq!(url.as_str(), "https://demo.supabase.co/rest/v1/");
        let url = config.service_url("auth/v1/").unwrap();
        assert_eq!(url.as_str(), "https://demo.supabase.co/auth/v1/");
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[
            (ENV_SUPABASE_URL, "not a url"),
            (ENV_POLL_SECS, "0"),
            (ENV_WHATSAPP_NUMBER, "  "),
        ]);
        assert!(config.supabase_url.is_none());
        assert_eq!(config.notification_poll_interval, Duration::from_secs(30));
        assert_eq!(config.whatsapp_number, DEFAULT_WHATSAPP_NUMBER);
    }

    #[test]
    fn test_custom_poll_interval() {
        let config = config_from(&[(ENV_POLL_SECS, "5")]);
        assert_eq!(config.notification_poll_interval, Duration::from_secs(5));
    }
}
