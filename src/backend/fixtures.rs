use chrono::{DateTime, TimeZone, Utc};
use tracing::info;

use crate::models::{Listing, ListingId, Role, User, UserMetadata};

/// Id of every user produced without a backend
pub const MOCK_USER_ID: &str = "mock-user";

fn listed(y: i32, m: u32, d: u32) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).single()
}

/// Fixed listing set served when no backend is configured or the backend fails
pub fn mock_listings() -> Vec<Listing> {
    info!("📋 Serving mock London listings");

    vec![
        Listing {
            id: ListingId::from("1"),
            title: Some("Bright two-bed flat by Camden Market".into()),
            rent: Some(2200),
            listed: listed(2024, 3, 10),
            bedrooms: Some(2),
            baths: Some(1),
            location: Some("Camden, NW1".into()),
            description: Some(
                "Second floor flat near the market. Landlord will consider a well-behaved pet."
                    .into(),
            ),
            furnished: Some(true),
            garden: Some(false),
            square_footage: Some(680),
            pet_parking_costs: Some(50),
            stair_free_access: Some(false),
            house_share: Some(false),
        },
        Listing {
            id: ListingId::from("2"),
            title: Some("Cosy one-bed off Upper Street".into()),
            rent: Some(1650),
            listed: listed(2024, 3, 8),
            bedrooms: Some(1),
            baths: Some(1),
            location: Some("Islington, N1".into()),
            description: Some(
                "Quiet conversion in a cat-friendly building, close to Highbury Fields.".into(),
            ),
            furnished: Some(false),
            garden: Some(true),
            square_footage: Some(450),
            pet_parking_costs: Some(0),
            stair_free_access: Some(true),
            house_share: Some(false),
        },
        Listing {
            id: ListingId::from("3"),
            title: Some("Family house with garden near the Common".into()),
            rent: Some(3400),
            listed: listed(2024, 3, 12),
            bedrooms: Some(3),
            baths: Some(2),
            location: Some("Clapham, SW4".into()),
            description: Some("Three bedrooms, south-facing garden and off-street parking.".into()),
            furnished: Some(false),
            garden: Some(true),
            square_footage: Some(1400),
            pet_parking_costs: Some(75),
            stair_free_access: Some(true),
            house_share: Some(false),
        },
        Listing {
            id: ListingId::from("4"),
            title: Some("Studio above a Shoreditch café".into()),
            rent: Some(1350),
            listed: listed(2024, 3, 5),
            bedrooms: Some(0),
            baths: Some(1),
            location: Some("Shoreditch, E1".into()),
            description: Some(
                "Compact studio with exposed brick. Small dogs welcome by arrangement.".into(),
            ),
            furnished: Some(true),
            garden: Some(false),
            square_footage: None,
            pet_parking_costs: Some(0),
            stair_free_access: Some(false),
            house_share: Some(false),
        },
        Listing {
            id: ListingId::from("5"),
            title: Some("Room in a friendly house share".into()),
            rent: Some(950),
            listed: listed(2024, 3, 1),
            bedrooms: Some(1),
            baths: Some(1),
            location: Some("Hackney, E8".into()),
            description: Some("Double room in a four-person house by London Fields.".into()),
            furnished: Some(true),
            garden: Some(true),
            square_footage: None,
            pet_parking_costs: Some(0),
            stair_free_access: Some(false),
            house_share: Some(true),
        },
    ]
}

/// Synthetic user for a sign-in without a backend. Role comes from the email.
pub fn mock_sign_in_user(email: &str) -> User {
    mock_user(
        email,
        UserMetadata {
            role: Some(Role::from_email(email).to_string()),
            ..Default::default()
        },
    )
}

/// Synthetic user for a sign-up without a backend. Keeps the requested role.
pub fn mock_sign_up_user(email: &str, role: Role, metadata: UserMetadata) -> User {
    mock_user(
        email,
        UserMetadata {
            role: Some(role.to_string()),
            ..metadata
        },
    )
}

fn mock_user(email: &str, metadata: UserMetadata) -> User {
    User {
        id: MOCK_USER_ID.to_string(),
        email: Some(email.to_string()),
        metadata,
    }
}
