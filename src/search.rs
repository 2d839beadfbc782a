//! Location search feeding the raw listing set.
//!
//! Keystrokes are debounced: each new input restarts the timer and only the
//! last one fires. An explicit submit fires at once. Restarting the timer
//! never cancels a query that already started, so a slow stale response can
//! still land after a newer one.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::backend::BackendAdapter;
use crate::models::Listing;

pub type ListingSet = Arc<Vec<Listing>>;

pub struct SearchController {
    adapter: BackendAdapter,
    listings: Arc<watch::Sender<ListingSet>>,
    debounce: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl SearchController {
    pub fn new(adapter: BackendAdapter, debounce: Duration) -> Self {
        let (listings, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            adapter,
            listings: Arc::new(listings),
            debounce,
            pending: Mutex::new(None),
        }
    }

    /// Receiver for the current raw listing set
    pub fn listings(&self) -> watch::Receiver<ListingSet> {
        self.listings.subscribe()
    }

    pub fn current(&self) -> ListingSet {
        self.listings.borrow().clone()
    }

    /// Load the full unfiltered set
    pub async fn load_all(&self) {
        run_query(self.adapter.clone(), Arc::clone(&self.listings), String::new()).await;
    }

    /// Debounced input. Must be called inside a Tokio runtime.
    pub fn input(&self, term: impl Into<String>) {
        let term = term.into();
        let adapter = self.adapter.clone();
        let listings = Arc::clone(&self.listings);
        let debounce = self.debounce;

        let mut pending = self.pending_slot();
        if let Some(timer) = pending.take() {
            timer.abort();
        }
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            // detached so a later keystroke can't cancel it
            let query = tokio::spawn(run_query(adapter, listings, term));
            let _ = query.await;
        }));
    }

    /// Wait until pending debounced input has fired and its query has landed
    pub async fn flush(&self) {
        let timer = self.pending_slot().take();
        if let Some(timer) = timer {
            let _ = timer.await;
        }
    }

    /// Run the search now, dropping any pending debounced input
    pub fn submit(&self, term: impl Into<String>) -> JoinHandle<()> {
        if let Some(timer) = self.pending_slot().take() {
            timer.abort();
        }
        tokio::spawn(run_query(
            self.adapter.clone(),
            Arc::clone(&self.listings),
            term.into(),
        ))
    }

    fn pending_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for SearchController {
    fn drop(&mut self) {
        if let Some(timer) = self.pending_slot().take() {
            timer.abort();
        }
    }
}

/// Empty term reloads everything, anything else searches by location
async fn run_query(
    adapter: BackendAdapter,
    listings: Arc<watch::Sender<ListingSet>>,
    term: String,
) {
    let term = term.trim();
    let results = if term.is_empty() {
        adapter.fetch_listings().await
    } else {
        adapter.search_listings_by_location(term).await
    };
    debug!(term, count = results.len(), "Search results");
    listings.send_replace(Arc::new(results));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::FakeBackend;
    use crate::config::BackendConfig;
    use crate::models::ListingId;

    fn fake_with_locations() -> Arc<FakeBackend> {
        let listing = |id: &str, location: &str| Listing {
            id: ListingId::from(id),
            location: Some(location.into()),
            ..Default::default()
        };
        Arc::new(FakeBackend::with_listings(vec![
            listing("1", "Camden, NW1"),
            listing("2", "Camberwell, SE5"),
            listing("3", "Hackney, E8"),
        ]))
    }

    fn controller(fake: Arc<FakeBackend>) -> SearchController {
        let config = BackendConfig::new("https://abc.supabase.co", "anon");
        let adapter = BackendAdapter::with_backend(config, fake);
        SearchController::new(adapter, Duration::from_millis(300))
    }

    fn ids(set: &ListingSet) -> Vec<String> {
        set.iter().map(|l| l.id.0.clone()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn only_the_last_keystroke_fires() {
        let fake = fake_with_locations();
        let search = controller(fake.clone());
        let mut rx = search.listings();

        search.input("cam");
        tokio::time::sleep(Duration::from_millis(100)).await;
        search.input("camd");
        tokio::time::sleep(Duration::from_millis(299)).await;
        assert_eq!(fake.calls(), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        rx.changed().await.unwrap();
        assert_eq!(fake.calls(), 1);
        assert_eq!(ids(&rx.borrow()), ["1"]);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fake.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn submit_fires_immediately_and_drops_pending_input() {
        let fake = fake_with_locations();
        let search = controller(fake.clone());

        search.input("hack");
        search.submit("cam").await.unwrap();
        assert_eq!(fake.calls(), 1);
        assert_eq!(ids(&search.current()), ["1", "2"]);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fake.calls(), 1);
        assert_eq!(ids(&search.current()), ["1", "2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_waits_for_the_debounced_query() {
        let fake = fake_with_locations();
        let search = controller(fake.clone());

        search.input("hack");
        search.flush().await;
        assert_eq!(fake.calls(), 1);
        assert_eq!(ids(&search.current()), ["3"]);

        // nothing pending is a no-op
        search.flush().await;
        assert_eq!(fake.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn later_input_does_not_cancel_a_fired_query() {
        let fake = fake_with_locations();
        let search = controller(fake.clone());

        search.input("cam");
        tokio::time::sleep(Duration::from_millis(301)).await;
        search.input("hack");
        search.flush().await;
        assert_eq!(fake.calls(), 2);
        assert_eq!(ids(&search.current()), ["3"]);
    }

    #[tokio::test]
    async fn clearing_the_term_reloads_everything() {
        let fake = fake_with_locations();
        let search = controller(fake);

        search.submit("hackney").await.unwrap();
        assert_eq!(ids(&search.current()), ["3"]);
        search.submit("   ").await.unwrap();
        assert_eq!(search.current().len(), 3);
    }

    #[tokio::test]
    async fn load_all_in_mock_mode_gives_fixtures() {
        let search = SearchController::new(BackendAdapter::mock(), Duration::from_millis(300));
        search.load_all().await;
        assert_eq!(search.current().len(), 5);
    }
}
