//! End-to-end flows over the public API, mock mode and an unreachable backend.

use pet_rentals::backend::fixtures::{mock_listings, MOCK_USER_ID};
use pet_rentals::display::ListingCard;
use pet_rentals::pipeline::{self, ListingQuery, ListingView, PropertyType, SortKey};
use pet_rentals::storage::LocalStorage;
use pet_rentals::{BackendAdapter, BackendConfig, Role, SessionStore};
use std::sync::Arc;

fn ids(listings: &[pet_rentals::Listing]) -> Vec<&str> {
    listings.iter().map(|l| l.id.0.as_str()).collect()
}

/// Configured, but nothing listens on the port
fn unreachable_adapter() -> BackendAdapter {
    BackendAdapter::from_config(BackendConfig::new("http://127.0.0.1:9", "anon"), None).unwrap()
}

#[test]
fn two_bed_cheapest_over_fixtures() {
    let shown = pipeline::apply(
        &mock_listings(),
        Some(PropertyType::TwoBed),
        false,
        SortKey::Cheapest,
    );
    assert_eq!(ids(&shown), ["1"]);
}

#[test]
fn pet_friendly_by_bedrooms_descending() {
    let query = ListingQuery {
        property_type: None,
        pet_friendly_only: true,
        sort: SortKey::BedroomsDesc,
    };
    assert_eq!(ids(&query.apply(&mock_listings())), ["3", "1", "2", "5", "4"]);
}

#[test]
fn placeholder_credentials_mean_mock_mode() {
    assert!(!BackendConfig::default().is_configured());
    assert!(!BackendConfig::new("https://your-project.supabase.co", "real-key").is_configured());
    assert!(!BackendConfig::new("https://abc.supabase.co", "your-anon-key").is_configured());
    assert!(!BackendConfig::new("  ", "key").is_configured());
    assert!(BackendConfig::new("https://abc.supabase.co", "key").is_configured());
}

#[tokio::test]
async fn mock_mode_serves_fixtures_and_filters_search() {
    let adapter = BackendAdapter::mock();
    assert!(!adapter.is_configured());
    assert_eq!(adapter.fetch_listings().await.len(), 5);

    let hits = adapter.search_listings_by_location("hackney").await;
    assert_eq!(ids(&hits), ["5"]);
    assert!(adapter.get_current_user().await.is_none());
}

#[tokio::test]
async fn failed_reads_fall_back_differently() {
    let adapter = unreachable_adapter();
    assert!(adapter.is_configured());

    // the full list falls back to fixtures, a search does not
    assert_eq!(adapter.fetch_listings().await.len(), 5);
    assert!(adapter.search_listings_by_location("camden").await.is_empty());
}

#[tokio::test]
async fn failed_sign_in_is_an_error() {
    let adapter = unreachable_adapter();
    assert!(adapter.sign_in("kim@paws.test", "pw").await.is_err());
}

#[tokio::test]
async fn mock_session_lifecycle_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local_storage.json");

    let store = SessionStore::new(BackendAdapter::mock(), LocalStorage::new(&path));
    store.initialize().await;
    let user = store.sign_in("lettings.agent@paws.test", "anything").await.unwrap();
    assert_eq!(user.id, MOCK_USER_ID);
    assert_eq!(user.role(), Role::Agent);

    let restarted = SessionStore::new(BackendAdapter::mock(), LocalStorage::new(&path));
    restarted.initialize().await;
    assert!(restarted.snapshot().is_agent());

    restarted.sign_out().await.unwrap();
    let again = SessionStore::new(BackendAdapter::mock(), LocalStorage::new(&path));
    again.initialize().await;
    let state = again.snapshot();
    assert!(!state.loading);
    assert!(!state.is_authenticated());
    assert_eq!(state.role, None);
}

#[tokio::test]
async fn view_over_mock_results_renders_cards() {
    let adapter = BackendAdapter::mock();
    let source = Arc::new(adapter.fetch_listings().await);
    let mut view = ListingView::new(
        Arc::clone(&source),
        ListingQuery {
            property_type: Some(PropertyType::Studio),
            ..Default::default()
        },
    );

    let card = ListingCard(&view.listings()[0]).to_string();
    assert!(card.contains("Studio"));
    assert!(card.ends_with("ID: 4"));

    view.set_source(source);
    view.listings();
    assert_eq!(view.recomputations(), 1);
}
