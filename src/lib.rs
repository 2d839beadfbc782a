//! Pet-friendly rentals marketplace client.
//!
//! Browses listings from a hosted backend (or built-in fixtures when no
//! credentials are configured), runs them through the filter/sort pipeline,
//! and keeps the signed-in user and role.

pub mod backend;
pub mod config;
pub mod display;
pub mod enquiry;
pub mod error;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod search;
pub mod session;
pub mod storage;

pub use backend::BackendAdapter;
pub use config::{AppConfig, BackendConfig};
pub use models::{Enquiry, Listing, ListingId, Role, User};
pub use pipeline::{ListingQuery, ListingView, PropertyType, SortKey};
pub use session::{AuthState, SessionStore};
