use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::backend::types::AuthChange;
use crate::error::BackendError;
use crate::models::{Listing, Profile, Session, User, UserMetadata};

/// Hosted backend surface: the auth service plus the `listings` and
/// `profiles` tables. Implementations report failures; deciding what to do
/// about them is left to the adapter.
#[async_trait]
pub trait Backend: Send + Sync {
    /// All listings, newest first
    async fn fetch_listings(&self) -> Result<Vec<Listing>, BackendError>;

    /// Listings whose `Location` contains `term` (case-insensitive), newest first
    async fn search_listings_by_location(&self, term: &str) -> Result<Vec<Listing>, BackendError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
    ) -> Result<User, BackendError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError>;

    async fn sign_out(&self) -> Result<(), BackendError>;

    /// User of the current session, if there is one and it is still valid
    async fn current_user(&self) -> Result<Option<User>, BackendError>;

    /// Insert or merge a `profiles` row
    async fn upsert_profile(&self, profile: &Profile) -> Result<(), BackendError>;

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>, BackendError>;

    /// Receiver for session transitions made from now on
    fn auth_changes(&self) -> broadcast::Receiver<AuthChange>;

    /// Name of the backend, for logs
    fn source_name(&self) -> &'static str;
}
