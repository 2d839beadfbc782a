use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::backend::traits::Backend;
use crate::backend::types::{AuthChange, AuthEvent};
use crate::config::BackendConfig;
use crate::error::BackendError;
use crate::models::{Listing, Profile, Session, User, UserMetadata};
use crate::pipeline;
use crate::storage::{LocalStorage, SESSION_KEY};

const LISTINGS_TABLE: &str = "listings";
const PROFILES_TABLE: &str = "profiles";

/// Client for a Supabase project: GoTrue under `/auth/v1`, PostgREST under `/rest/v1`
pub struct SupabaseBackend {
    client: Client,
    base_url: String,
    anon_key: String,
    session: Mutex<Option<Session>>,
    /// Where the session survives between runs, if anywhere
    persistence: Option<LocalStorage>,
    events: broadcast::Sender<AuthChange>,
}

impl SupabaseBackend {
    pub fn new(config: &BackendConfig, persistence: Option<LocalStorage>) -> Result<Self> {
        let base_url = config
            .base_url()
            .context("Backend URL is not set")?
            .to_string();
        let anon_key = config
            .anon_key
            .clone()
            .context("Backend API key is not set")?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("pet-rentals/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        let restored = match &persistence {
            Some(storage) => storage.get_item::<Session>(SESSION_KEY).unwrap_or_else(|e| {
                warn!(error = %e, "Could not read saved session");
                None
            }),
            None => None,
        };
        if let Some(session) = &restored {
            debug!(user_id = %session.user.id, "Restored saved session");
        }

        let (events, _) = broadcast::channel(16);

        Ok(Self {
            client,
            base_url,
            anon_key,
            session: Mutex::new(restored),
            persistence,
            events,
        })
    }

    fn session_guard(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn access_token(&self) -> Option<String> {
        self.session_guard().as_ref().map(|s| s.access_token.clone())
    }

    fn set_session(&self, session: Option<Session>) {
        if let Some(storage) = &self.persistence {
            let saved = match &session {
                Some(s) => storage.set_item(SESSION_KEY, s),
                None => storage.remove_item(SESSION_KEY).map(|_| ()),
            };
            if let Err(e) = saved {
                warn!(error = %e, "Could not persist session");
            }
        }
        *self.session_guard() = session;
    }

    fn emit(&self, event: AuthEvent, session: Option<Session>) {
        debug!(%event, "Auth state change");
        // no receivers is fine
        let _ = self.events.send(AuthChange { event, session });
    }

    /// Request with the project key and the session token (or the key) as bearer
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let token = self.access_token().unwrap_or_else(|| self.anon_key.clone());
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
    }

    fn rest(&self, method: Method, table: &str) -> RequestBuilder {
        self.request(method, &format!("/rest/v1/{}", table))
            .header("Accept", "application/json")
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(BackendError::Status {
            status: status.as_u16(),
            message: error_message(&body).unwrap_or_else(|| status.to_string()),
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, BackendError> {
        let response = self.send(request).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn query_listings(
        &self,
        location_term: Option<&str>,
    ) -> Result<Vec<Listing>, BackendError> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("order", "Listed.desc".to_string()),
        ];
        if let Some(term) = location_term {
            query.push(("Location", format!("ilike.*{}*", escape_like(term))));
        }
        let rows: Vec<Value> = self
            .send_json(self.rest(Method::GET, LISTINGS_TABLE).query(&query))
            .await?;
        let mut listings = decode_listings(rows);
        if let Some(term) = location_term {
            // `_` stands in for `*` server-side, so narrow back to a plain substring match
            listings.retain(|l| pipeline::location_matches(l, term));
        }
        debug!(count = listings.len(), term = ?location_term, "Fetched listings");
        Ok(listings)
    }
}

/// Decode rows one at a time, skipping any that can't be read
fn decode_listings(rows: Vec<Value>) -> Vec<Listing> {
    rows.into_iter()
        .enumerate()
        .filter_map(|(index, row)| match serde_json::from_value::<Listing>(row) {
            Ok(listing) => Some(listing),
            Err(e) => {
                warn!(index, error = %e, "Skipping malformed listing row");
                None
            }
        })
        .collect()
}

#[async_trait]
impl Backend for SupabaseBackend {
    async fn fetch_listings(&self) -> Result<Vec<Listing>, BackendError> {
        self.query_listings(None).await
    }

    async fn search_listings_by_location(&self, term: &str) -> Result<Vec<Listing>, BackendError> {
        self.query_listings(Some(term)).await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
    ) -> Result<User, BackendError> {
        let body = json!({ "email": email, "password": password, "data": metadata });
        let value: Value = self
            .send_json(self.request(Method::POST, "/auth/v1/signup").json(&body))
            .await?;

        // With email confirmation off GoTrue returns a full session, otherwise just the user
        if value.get("access_token").is_some() {
            let session: Session = serde_json::from_value(value)?;
            let user = session.user.clone();
            self.set_session(Some(session.clone()));
            self.emit(AuthEvent::SignedIn, Some(session));
            info!(user_id = %user.id, "Signed up and signed in");
            Ok(user)
        } else {
            let user: User = serde_json::from_value(value)?;
            info!(user_id = %user.id, "Signed up, awaiting email confirmation");
            Ok(user)
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let body = json!({ "email": email, "password": password });
        let session: Session = self
            .send_json(
                self.request(Method::POST, "/auth/v1/token")
                    .query(&[("grant_type", "password")])
                    .json(&body),
            )
            .await?;
        self.set_session(Some(session.clone()));
        self.emit(AuthEvent::SignedIn, Some(session.clone()));
        info!(user_id = %session.user.id, "Signed in");
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        if self.access_token().is_none() {
            debug!("Sign-out without a session");
            return Ok(());
        }
        match self.send(self.request(Method::POST, "/auth/v1/logout")).await {
            Ok(_) => {}
            // token already revoked or expired: the local session is dead either way
            Err(BackendError::Status { status, .. })
                if status == StatusCode::UNAUTHORIZED.as_u16()
                    || status == StatusCode::NOT_FOUND.as_u16() => {}
            Err(e) => return Err(e),
        }
        self.set_session(None);
        self.emit(AuthEvent::SignedOut, None);
        info!("Signed out");
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<User>, BackendError> {
        if self.access_token().is_none() {
            return Ok(None);
        }
        match self.send_json::<User>(self.request(Method::GET, "/auth/v1/user")).await {
            Ok(user) => Ok(Some(user)),
            Err(BackendError::Status { status, .. })
                if status == StatusCode::UNAUTHORIZED.as_u16()
                    || status == StatusCode::FORBIDDEN.as_u16() =>
            {
                info!("Saved session is no longer valid");
                self.set_session(None);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), BackendError> {
        self.send(
            self.rest(Method::POST, PROFILES_TABLE)
                .header("Prefer", "resolution=merge-duplicates,return=minimal")
                .json(&[profile]),
        )
        .await?;
        debug!(user_id = %profile.id, "Upserted profile");
        Ok(())
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>, BackendError> {
        let rows: Vec<Profile> = self
            .send_json(
                self.rest(Method::GET, PROFILES_TABLE)
                    .query(&[("select", "*".to_string()), ("id", format!("eq.{}", user_id))]),
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    fn auth_changes(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }

    fn source_name(&self) -> &'static str {
        "Supabase"
    }
}

/// Pull the human-readable message out of a GoTrue/PostgREST error body
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Match `%` and `_` literally inside an `ilike` pattern. PostgREST turns
/// every `*` into `%` and offers no escape for it, so `*` becomes `_`.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.trim().chars() {
        match c {
            '%' | '_' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '*' => escaped.push('_'),
            _ => escaped.push(c),
        }
    }
    escaped
}
