//! In-memory backend for exercising the live-mode code paths in tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::broadcast;

use crate::backend::traits::Backend;
use crate::backend::types::{AuthChange, AuthEvent};
use crate::error::BackendError;
use crate::models::{Listing, Profile, Role, Session, User, UserMetadata};
use crate::pipeline;

pub struct FakeBackend {
    listings: Vec<Listing>,
    fail: bool,
    accounts: Mutex<HashMap<String, (String, User)>>,
    profiles: Mutex<HashMap<String, Profile>>,
    session: Mutex<Option<Session>>,
    calls: AtomicUsize,
    events: broadcast::Sender<AuthChange>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::with_listings(Vec::new())
    }
}

impl FakeBackend {
    pub fn with_listings(listings: Vec<Listing>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            listings,
            fail: false,
            accounts: Mutex::new(HashMap::new()),
            profiles: Mutex::new(HashMap::new()),
            session: Mutex::new(None),
            calls: AtomicUsize::new(0),
            events,
        }
    }

    /// Every call fails with a 503
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn add_account(&self, email: &str, password: &str, role: Role) -> User {
        let mut accounts = self.accounts.lock().unwrap();
        let user = User {
            id: format!("user-{}", accounts.len() + 1),
            email: Some(email.to_string()),
            metadata: UserMetadata {
                role: Some(role.to_string()),
                ..Default::default()
            },
        };
        accounts.insert(email.to_string(), (password.to_string(), user.clone()));
        user
    }

    /// Number of trait calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<(), BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(BackendError::Status {
                status: 503,
                message: "service unavailable".into(),
            });
        }
        Ok(())
    }

    fn start_session(&self, user: User) -> Session {
        let session = Session {
            access_token: format!("token-{}", user.id),
            refresh_token: None,
            expires_at: None,
            user,
        };
        *self.session.lock().unwrap() = Some(session.clone());
        let _ = self.events.send(AuthChange {
            event: AuthEvent::SignedIn,
            session: Some(session.clone()),
        });
        session
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn fetch_listings(&self) -> Result<Vec<Listing>, BackendError> {
        self.enter()?;
        let mut listings = self.listings.clone();
        pipeline::sort_listings(&mut listings, pipeline::SortKey::Newest);
        Ok(listings)
    }

    async fn search_listings_by_location(&self, term: &str) -> Result<Vec<Listing>, BackendError> {
        Ok(self
            .fetch_listings()
            .await?
            .into_iter()
            .filter(|l| pipeline::location_matches(l, term))
            .collect())
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
    ) -> Result<User, BackendError> {
        self.enter()?;
        let user = {
            let mut accounts = self.accounts.lock().unwrap();
            if accounts.contains_key(email) {
                return Err(BackendError::Status {
                    status: 422,
                    message: "User already registered".into(),
                });
            }
            let user = User {
                id: format!("user-{}", accounts.len() + 1),
                email: Some(email.to_string()),
                metadata: metadata.clone(),
            };
            accounts.insert(email.to_string(), (password.to_string(), user.clone()));
            user
        };
        self.start_session(user.clone());
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        self.enter()?;
        let user = {
            let accounts = self.accounts.lock().unwrap();
            match accounts.get(email) {
                Some((pw, user)) if pw == password => user.clone(),
                _ => {
                    return Err(BackendError::Status {
                        status: 400,
                        message: "Invalid login credentials".into(),
                    })
                }
            }
        };
        Ok(self.start_session(user))
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.enter()?;
        if self.session.lock().unwrap().take().is_some() {
            let _ = self.events.send(AuthChange {
                event: AuthEvent::SignedOut,
                session: None,
            });
        }
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<User>, BackendError> {
        self.enter()?;
        Ok(self.session.lock().unwrap().as_ref().map(|s| s.user.clone()))
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), BackendError> {
        self.enter()?;
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>, BackendError> {
        self.enter()?;
        Ok(self.profiles.lock().unwrap().get(user_id).cloned())
    }

    fn auth_changes(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }

    fn source_name(&self) -> &'static str {
        "Fake"
    }
}
