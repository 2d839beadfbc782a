//! Process-wide auth state.
//!
//! One writer (the [`SessionStore`]) owns a `watch` channel; everything else
//! reads snapshots or awaits changes through a receiver. Writes come only
//! from startup sync, the backend's auth-change callback and the mock-mode
//! setter.

use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backend::{AuthSubscription, BackendAdapter};
use crate::error::AuthError;
use crate::models::{Role, User, UserMetadata};
use crate::storage::{LocalStorage, MOCK_USER_KEY};

/// Current user, derived role and whether startup is still running
#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub user: Option<User>,
    pub role: Option<Role>,
    pub loading: bool,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            user: None,
            role: None,
            loading: true,
        }
    }
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }

    pub fn is_agent(&self) -> bool {
        self.role == Some(Role::Agent)
    }

    pub fn is_tenant(&self) -> bool {
        self.role == Some(Role::Tenant)
    }

    fn set_user(&mut self, user: Option<User>) {
        self.role = user.as_ref().map(User::role);
        self.user = user;
    }
}

pub struct SessionStore {
    adapter: BackendAdapter,
    storage: LocalStorage,
    state: Arc<watch::Sender<AuthState>>,
    subscription: Mutex<Option<AuthSubscription>>,
}

impl SessionStore {
    pub fn new(adapter: BackendAdapter, storage: LocalStorage) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self {
            adapter,
            storage,
            state: Arc::new(state),
            subscription: Mutex::new(None),
        }
    }

    pub fn adapter(&self) -> &BackendAdapter {
        &self.adapter
    }

    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Read-only handle that can await state changes
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Startup sync. `loading` stays true until this returns.
    pub async fn initialize(&self) {
        let user = self.adapter.get_current_user().await;
        debug!(found = user.is_some(), "Initial session check");
        self.state.send_modify(|s| s.set_user(user));

        if self.adapter.is_configured() {
            let state = Arc::clone(&self.state);
            let subscription = self.adapter.on_auth_state_change(move |event, session| {
                debug!(%event, "Session changed");
                state.send_modify(|s| s.set_user(session.map(|session| session.user)));
            });
            *self.subscription_slot() = Some(subscription);
        } else {
            self.restore_mock_user();
        }

        self.state.send_modify(|s| s.loading = false);
        let state = self.snapshot();
        info!(
            authenticated = state.is_authenticated(),
            role = ?state.role,
            "Session ready"
        );
    }

    fn restore_mock_user(&self) {
        if self.state.borrow().user.is_some() {
            return;
        }
        match self.storage.get_item::<User>(MOCK_USER_KEY) {
            Ok(Some(user)) => {
                debug!(user_id = %user.id, "Restored mock user");
                self.state.send_modify(|s| s.set_user(Some(user)));
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Could not read saved mock user"),
        }
    }

    fn subscription_slot(&self) -> std::sync::MutexGuard<'_, Option<AuthSubscription>> {
        self.subscription
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Set user and role together and mark startup done. Used where no
    /// change stream exists (mock mode).
    pub fn update_auth_state(&self, user: Option<User>, role: Option<Role>) {
        self.state.send_modify(|s| {
            s.user = user;
            s.role = role;
            s.loading = false;
        });
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let user = self.adapter.sign_in(email, password).await?;
        if !self.adapter.is_configured() {
            self.remember_mock_user(&user);
        }
        Ok(user)
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        role: Role,
        metadata: UserMetadata,
    ) -> Result<User, AuthError> {
        let user = self.adapter.sign_up(email, password, role, metadata).await?;
        if !self.adapter.is_configured() {
            self.remember_mock_user(&user);
        }
        Ok(user)
    }

    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.adapter.sign_out().await?;
        if !self.adapter.is_configured() {
            if let Err(e) = self.storage.remove_item(MOCK_USER_KEY) {
                warn!(error = %e, "Could not clear saved mock user");
            }
            self.update_auth_state(None, None);
        }
        Ok(())
    }

    fn remember_mock_user(&self, user: &User) {
        if let Err(e) = self.storage.set_item(MOCK_USER_KEY, user) {
            warn!(error = %e, "Could not save mock user");
        }
        self.update_auth_state(Some(user.clone()), Some(user.role()));
    }

    /// Stop listening for backend session changes
    pub fn shutdown(&self) {
        if let Some(subscription) = self.subscription_slot().take() {
            subscription.unsubscribe();
        }
    }
}
