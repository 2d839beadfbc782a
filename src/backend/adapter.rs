//! The one place that decides between the live backend and mock mode, and
//! what a failed call turns into.

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::backend::fixtures;
use crate::backend::supabase::SupabaseBackend;
use crate::backend::traits::Backend;
use crate::backend::types::{AuthEvent, AuthSubscription};
use crate::config::BackendConfig;
use crate::error::{AuthError, BackendError};
use crate::models::{Listing, Profile, Role, Session, User, UserMetadata};
use crate::pipeline::{self, SortKey};
use crate::storage::LocalStorage;

/// What a failed listing read degrades to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadFallback {
    Fixtures,
    Empty,
}

/// Front door to the hosted backend. Without credentials every operation
/// answers from fixtures or with a synthetic user.
#[derive(Clone)]
pub struct BackendAdapter {
    config: BackendConfig,
    backend: Option<Arc<dyn Backend>>,
}

impl BackendAdapter {
    /// Build from configuration; only creates an HTTP client when configured.
    /// `session_storage` keeps the live session across runs.
    pub fn from_config(
        config: BackendConfig,
        session_storage: Option<LocalStorage>,
    ) -> Result<Self> {
        let backend: Option<Arc<dyn Backend>> = if config.is_configured() {
            let live = SupabaseBackend::new(&config, session_storage)?;
            info!(url = ?config.base_url(), "Using hosted backend");
            Some(Arc::new(live))
        } else {
            info!("No backend credentials, running in mock mode");
            None
        };
        Ok(Self { config, backend })
    }

    /// Adapter over any backend implementation
    pub fn with_backend(config: BackendConfig, backend: Arc<dyn Backend>) -> Self {
        Self {
            config,
            backend: Some(backend),
        }
    }

    /// Adapter that always runs in mock mode
    pub fn mock() -> Self {
        Self {
            config: BackendConfig::default(),
            backend: None,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    fn live(&self) -> Option<&dyn Backend> {
        if self.is_configured() {
            self.backend.as_deref()
        } else {
            None
        }
    }

    /// Every listing, newest first. Never fails: mock mode and backend errors
    /// both yield the fixture set.
    pub async fn fetch_listings(&self) -> Vec<Listing> {
        let Some(backend) = self.live() else {
            return fixtures::mock_listings();
        };
        let result = backend.fetch_listings().await;
        Self::resolve_read("fetch_listings", result, ReadFallback::Fixtures)
    }

    /// Listings whose location contains `term`, newest first. A backend
    /// error yields an empty list, unlike `fetch_listings`.
    pub async fn search_listings_by_location(&self, term: &str) -> Vec<Listing> {
        let Some(backend) = self.live() else {
            let mut matches: Vec<Listing> = fixtures::mock_listings()
                .into_iter()
                .filter(|l| pipeline::location_matches(l, term))
                .collect();
            pipeline::sort_listings(&mut matches, SortKey::Newest);
            return matches;
        };
        let result = backend.search_listings_by_location(term).await;
        Self::resolve_read("search_listings_by_location", result, ReadFallback::Empty)
    }

    fn resolve_read(
        operation: &str,
        result: Result<Vec<Listing>, BackendError>,
        fallback: ReadFallback,
    ) -> Vec<Listing> {
        match result {
            Ok(listings) => {
                debug!(operation, count = listings.len(), "Listing read succeeded");
                listings
            }
            Err(e) => {
                warn!(operation, error = %e, ?fallback, "Listing read failed");
                match fallback {
                    ReadFallback::Fixtures => fixtures::mock_listings(),
                    ReadFallback::Empty => Vec::new(),
                }
            }
        }
    }

    /// Register a new account with `role` recorded in its metadata. Live
    /// sign-ups also get a `profiles` row; failing to write it is logged only.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        role: Role,
        metadata: UserMetadata,
    ) -> Result<User, AuthError> {
        let Some(backend) = self.live() else {
            info!(email, %role, "Mock sign-up");
            return Ok(fixtures::mock_sign_up_user(email, role, metadata));
        };

        let metadata = UserMetadata {
            role: Some(role.to_string()),
            ..metadata
        };
        let user = backend.sign_up(email, password, &metadata).await.map_err(|e| {
            warn!(email, error = %e, "Sign-up failed");
            AuthError::from(e)
        })?;

        let profile = Profile::for_new_user(&user, Utc::now());
        if let Err(e) = backend.upsert_profile(&profile).await {
            warn!(user_id = %user.id, error = %e, "Could not write profile row");
        }
        Ok(user)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let Some(backend) = self.live() else {
            info!(email, "Mock sign-in");
            return Ok(fixtures::mock_sign_in_user(email));
        };
        backend
            .sign_in(email, password)
            .await
            .map(|session| session.user)
            .map_err(|e| {
                warn!(email, error = %e, "Sign-in failed");
                AuthError::from(e)
            })
    }

    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let Some(backend) = self.live() else {
            debug!("Mock sign-out");
            return Ok(());
        };
        backend.sign_out().await.map_err(|e| {
            warn!(error = %e, "Sign-out failed");
            AuthError::from(e)
        })
    }

    /// User of the live session. Always none in mock mode; a backend error is
    /// logged and reads as signed out.
    pub async fn get_current_user(&self) -> Option<User> {
        let backend = self.live()?;
        match backend.current_user().await {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "Could not load current user");
                None
            }
        }
    }

    pub async fn fetch_profile(&self, user_id: &str) -> Option<Profile> {
        let backend = self.live()?;
        match backend.fetch_profile(user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(user_id, error = %e, "Could not load profile");
                None
            }
        }
    }

    /// Call `callback` for every session transition from now on. Must be
    /// called inside a Tokio runtime. Inert in mock mode.
    pub fn on_auth_state_change<F>(&self, callback: F) -> AuthSubscription
    where
        F: Fn(AuthEvent, Option<Session>) + Send + Sync + 'static,
    {
        let Some(backend) = self.live() else {
            return AuthSubscription::inert();
        };
        let source = backend.source_name();
        let mut changes = backend.auth_changes();
        let task = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => callback(change.event, change.session),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(source, skipped, "Auth listener fell behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        AuthSubscription::new(task)
    }
}
