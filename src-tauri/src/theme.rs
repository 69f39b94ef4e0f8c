use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::session::SessionContext;
use crate::store::RecordStore;

/// Preference key in `preferences.json`.
pub const THEME_KEY: &str = "ck-style-theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Read a stored preference; anything unrecognised means light.
    pub fn from_preference(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("Unknown theme: {}", other)),
        }
    }
}

/// Mirror a theme change to the signed-in user's profile. Failures are
/// logged; the local preference stays authoritative.
pub async fn push_to_profile(store: &dyn RecordStore, session: &SessionContext, theme: Theme) {
    let Some(user) = session.user() else {
        return;
    };
    if let Err(e) = store.update_profile_theme(&user.id, theme.as_str()).await {
        warn!("Failed to sync theme to profile for {}: {}", user.id, e);
    }
}

/// After sign-in the profile's theme wins over the local one. Returns the
/// theme to apply when it differs from `local`.
pub async fn profile_override(
    store: &dyn RecordStore,
    session: &SessionContext,
    local: Theme,
) -> Option<Theme> {
    let user = session.user()?;
    let profile = match store.get_profile(&user.id).await {
        Ok(profile) => profile?,
        Err(e) => {
            warn!("Could not read profile theme for {}: {}", user.id, e);
            return None;
        }
    };
    let remote: Theme = profile.theme.as_deref()?.parse().ok()?;
    if remote != local {
        info!("Applying profile theme '{}' for {}", remote, user.id);
        Some(remote)
    } else {
        None
    }
}
