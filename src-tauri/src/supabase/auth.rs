//! Session provider client (GoTrue REST API) and the app-side provider that
//! owns the shared session.

use chrono::Utc;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use url::Url;

use super::types::{Session, SignUpOutcome, User};
use super::vault::KeychainVault;
use crate::config::BackendConfig;
use crate::error::{CkStyleError, Result};
use crate::session::{SessionContext, SessionWriter};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Raw HTTP calls against the auth service. Stateless.
#[derive(Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    base: Url,
    anon_key: String,
}

impl AuthClient {
    pub fn new(config: &BackendConfig, http: reqwest::Client) -> Result<Self> {
        let (_, anon_key) = config.endpoint()?;
        Ok(Self {
            http,
            base: config.service_url("auth/v1/")?,
            anon_key: anon_key.to_string(),
        })
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
        let body: Value = self
            .call(
                Method::POST,
                "signup",
                &[],
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await?;

        // With auto-confirm the provider answers with a full session,
        // otherwise with the bare user.
        if body.get("access_token").is_some() {
            let session: Session = serde_json::from_value(body)
                .map_err(|e| CkStyleError::Auth(format!("Unexpected sign-up response: {}", e)))?;
            Ok(SignUpOutcome {
                user: session.user.clone(),
                session: Some(session.stamped(Utc::now())),
            })
        } else {
            let user: User = serde_json::from_value(body)
                .map_err(|_| CkStyleError::Auth("Signup failed".to_string()))?;
            Ok(SignUpOutcome { user, session: None })
        }
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let session: Session = self
            .call(
                Method::POST,
                "token",
                &[("grant_type", "password")],
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await?;
        Ok(session.stamped(Utc::now()))
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<Session> {
        let session: Session = self
            .call(
                Method::POST,
                "token",
                &[("grant_type", "refresh_token")],
                None,
                Some(json!({ "refresh_token": refresh_token })),
            )
            .await?;
        Ok(session.stamped(Utc::now()))
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<()> {
        self.call_empty(Method::POST, "logout", &[], Some(access_token), None)
            .await
    }

    pub async fn recover(&self, email: &str, redirect_to: Option<&str>) -> Result<()> {
        let query: Vec<(&str, &str)> = redirect_to
            .map(|r| vec![("redirect_to", r)])
            .unwrap_or_default();
        self.call_empty(
            Method::POST,
            "recover",
            &query,
            None,
            Some(json!({ "email": email })),
        )
        .await
    }

    pub async fn get_user(&self, access_token: &str) -> Result<User> {
        self.call(Method::GET, "user", &[], Some(access_token), None)
            .await
    }

    pub async fn update_password(&self, access_token: &str, password: &str) -> Result<User> {
        self.call(
            Method::PUT,
            "user",
            &[],
            Some(access_token),
            Some(json!({ "password": password })),
        )
        .await
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        access_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<RequestBuilder> {
        let url = self
            .base
            .join(path)
            .map_err(|e| CkStyleError::Config(format!("Bad auth path '{}': {}", path, e)))?;
        let bearer = access_token.unwrap_or(&self.anon_key);
        let mut request = self
            .http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
            .query(query);
        if let Some(body) = body {
            request = request.json(&body);
        }
        Ok(request)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        access_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T> {
        let response = self.send(method, path, query, access_token, body).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| CkStyleError::Auth(format!("Unexpected response from auth service: {}", e)))
    }

    async fn call_empty(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        access_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<()> {
        self.send(method, path, query, access_token, body)
            .await
            .map(|_| ())
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        access_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<reqwest::Response> {
        info!("Auth {} {}", method, path);
        let response = self
            .request(method.clone(), path, query, access_token, body)?
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let message = auth_error_message(status, &text);
        warn!("Auth {} {} failed ({}): {}", method, path, status, message);
        Err(CkStyleError::Auth(message))
    }
}

/// The provider's exact message: first of `msg`, `message`,
/// `error_description`, `error`; else the HTTP status.
pub fn auth_error_message(status: reqwest::StatusCode, body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let from_body = parsed.as_ref().and_then(|v| {
        ["msg", "message", "error_description", "error"]
            .iter()
            .filter_map(|k| v.get(*k).and_then(Value::as_str))
            .find(|s| !s.trim().is_empty())
            .map(str::to_string)
    });
    from_body.unwrap_or_else(|| {
        format!(
            "{} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Something went wrong.")
        )
    })
}

/// Tokens carried by a password-recovery link.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RecoveryTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: Option<i64>,
    pub expires_at: Option<i64>,
}

/// Extract recovery tokens from the link in the reset email. Tokens may sit
/// in the fragment or the query; `type` must be `recovery`.
pub fn parse_recovery_link(link: &str) -> Option<RecoveryTokens> {
    let url = Url::parse(link.trim()).ok()?;
    let fragment_pairs: Vec<(String, String)> = url
        .fragment()
        .map(|f| {
            url::form_urlencoded::parse(f.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default();
    let query_pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

    let get = |key: &str| {
        fragment_pairs
            .iter()
            .chain(query_pairs.iter())
            .find(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.clone())
    };

    if get("type").as_deref() != Some("recovery") {
        return None;
    }
    Some(RecoveryTokens {
        access_token: get("access_token")?,
        refresh_token: get("refresh_token")?,
        expires_in: get("expires_in").and_then(|v| v.parse().ok()),
        expires_at: get("expires_at").and_then(|v| v.parse().ok()),
    })
}

pub fn validate_signup(email: &str, password: &str, confirm: &str) -> Result<()> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(CkStyleError::Validation(
            "Please enter your email and password.".to_string(),
        ));
    }
    if password != confirm {
        return Err(CkStyleError::Validation("Passwords do not match!".to_string()));
    }
    Ok(())
}

pub fn validate_new_password(password: &str, confirm: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CkStyleError::Validation(format!(
            "Password must be at least {} characters.",
            MIN_PASSWORD_LEN
        )));
    }
    if password != confirm {
        return Err(CkStyleError::Validation("Passwords do not match.".to_string()));
    }
    Ok(())
}

/// The app's single session provider: wraps the HTTP client, owns the
/// session writer and mirrors the refresh token into the keychain.
pub struct AuthProvider {
    client: Option<AuthClient>,
    writer: SessionWriter,
    vault: Option<KeychainVault>,
    refreshing: Mutex<()>,
}

impl AuthProvider {
    /// `client` is `None` when the backend is not configured; every call then
    /// fails with the configuration error instead of panicking at startup.
    pub fn new(client: Option<AuthClient>, writer: SessionWriter, vault: Option<KeychainVault>) -> Self {
        Self {
            client,
            writer,
            vault,
            refreshing: Mutex::new(()),
        }
    }

    pub fn context(&self) -> SessionContext {
        self.writer.context()
    }

    fn client(&self) -> Result<&AuthClient> {
        self.client.as_ref().ok_or_else(|| {
            CkStyleError::Config("The account service is not configured".to_string())
        })
    }

    /// Make `session` current (or clear it) and mirror it to the keychain.
    pub fn adopt(&self, session: Option<Session>) {
        if let Some(vault) = &self.vault {
            let outcome = match &session {
                Some(s) => vault.store(&s.refresh_token),
                None => vault.clear(),
            };
            if let Err(e) = outcome {
                warn!("Keychain not updated: {}", e);
            }
        }
        self.writer.set(session);
    }

    /// Restore a session from the keychain at startup.
    pub async fn restore(&self) -> Result<Option<User>> {
        let Some(vault) = &self.vault else {
            return Ok(None);
        };
        let Some(refresh_token) = vault.load().map_err(CkStyleError::Local)? else {
            return Ok(None);
        };
        match self.client()?.refresh(&refresh_token).await {
            Ok(session) => {
                let user = session.user.clone();
                info!("Restored session for user {}", user.id);
                self.adopt(Some(session));
                Ok(Some(user))
            }
            Err(e) => {
                warn!("Stored session could not be refreshed: {}", e);
                self.adopt(None);
                Ok(None)
            }
        }
    }

    /// Current session, refreshed first when the access token is stale.
    /// A failed refresh signs out locally and is returned as the error, so
    /// a stale token is never handed out.
    pub async fn get_session(&self) -> Result<Option<Session>> {
        match self.writer.current() {
            Some(s) if s.is_expired(Utc::now()) => {}
            current => return Ok(current),
        }
        // refresh tokens are single-use; concurrent callers wait for the first
        let _refreshing = self.refreshing.lock().await;
        let session = match self.writer.current() {
            Some(s) if s.is_expired(Utc::now()) => s,
            current => return Ok(current),
        };
        info!("Access token expired, refreshing");
        match self.client()?.refresh(&session.refresh_token).await {
            Ok(fresh) => {
                self.adopt(Some(fresh.clone()));
                Ok(Some(fresh))
            }
            Err(e) => {
                warn!("Session refresh failed, signing out locally: {}", e);
                self.adopt(None);
                Err(e)
            }
        }
    }

    /// Bearer token for a record-store request, `None` when signed out.
    pub async fn access_token(&self) -> Result<Option<String>> {
        Ok(self.get_session().await?.map(|s| s.access_token))
    }

    pub async fn get_user(&self) -> Result<Option<User>> {
        Ok(self.get_session().await?.map(|s| s.user))
    }

    pub async fn sign_up(&self, email: &str, password: &str, confirm: &str) -> Result<SignUpOutcome> {
        validate_signup(email, password, confirm)?;
        let email = email.trim();
        info!("Signing up {}", email);
        let outcome = self.client()?.sign_up(email, password).await?;
        match &outcome.session {
            Some(session) => self.adopt(Some(session.clone())),
            None => warn!("Sign-up returned no session; email confirmation is enabled on the provider"),
        }
        Ok(outcome)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User> {
        let email = email.trim();
        info!("Signing in {}", email);
        let session = self.client()?.sign_in_with_password(email, password).await?;
        let user = session.user.clone();
        self.adopt(Some(session));
        Ok(user)
    }

    /// Sign out remotely; local state is cleared even if the provider call fails.
    pub async fn sign_out(&self) -> Result<()> {
        let session = self.writer.current();
        let remote = match (&session, self.client()) {
            (Some(s), Ok(client)) => client.sign_out(&s.access_token).await,
            _ => Ok(()),
        };
        if let Err(e) = &remote {
            error!("Sign out error, forcing local cleanup: {}", e);
        }
        self.adopt(None);
        info!("Signed out");
        Ok(())
    }

    pub async fn request_password_reset(&self, email: &str, redirect_to: Option<&str>) -> Result<()> {
        let email = email.trim();
        if email.is_empty() {
            return Err(CkStyleError::Validation(
                "Please enter your email address.".to_string(),
            ));
        }
        info!("Requesting password reset for {}", email);
        self.client()?.recover(email, redirect_to).await
    }

    /// Establish a session from the tokens in a recovery link.
    pub async fn set_session_from_link(&self, link: &str) -> Result<User> {
        let tokens = parse_recovery_link(link).ok_or_else(|| {
            CkStyleError::Validation(
                "Invalid or missing reset link. Use the link from your password reset email, or request a new one."
                    .to_string(),
            )
        })?;
        let user = self.client()?.get_user(&tokens.access_token).await?;
        let session = Session {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
            expires_at: tokens.expires_at,
            user: user.clone(),
        }
        .stamped(Utc::now());
        self.adopt(Some(session));
        Ok(user)
    }

    pub async fn update_password(&self, password: &str, confirm: &str) -> Result<()> {
        validate_new_password(password, confirm)?;
        let session = self.get_session().await?.ok_or(CkStyleError::LoginRequired)?;
        self.client()?
            .update_password(&session.access_token, password)
            .await?;
        info!("Password updated for user {}", session.user.id);
        Ok(())
    }
}
