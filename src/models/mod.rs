mod listing;
mod user;

pub use listing::{parse_timestamp, Listing, ListingId};
pub use user::{Profile, Role, Session, User, UserMetadata};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Contact request about one listing. Handed to the submission callback and
/// then dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enquiry {
    pub listing_id: ListingId,
    pub name: String,
    pub email: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}
