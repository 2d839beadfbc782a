//! Listing filter/sort pipeline.
//!
//! Takes the raw listing set (full or location-searched) and derives what
//! gets shown: property-type filter, then the pet-friendly filter, then a
//! stable sort.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::models::Listing;

/// Property-type filter values offered by the filter control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    Studio,
    OneBed,
    TwoBed,
    ThreeBed,
    HouseShare,
    Furnished,
    Unfurnished,
}

impl PropertyType {
    pub const ALL: [PropertyType; 7] = [
        PropertyType::Studio,
        PropertyType::OneBed,
        PropertyType::TwoBed,
        PropertyType::ThreeBed,
        PropertyType::HouseShare,
        PropertyType::Furnished,
        PropertyType::Unfurnished,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Studio => "studio",
            PropertyType::OneBed => "one-bed",
            PropertyType::TwoBed => "two-bed",
            PropertyType::ThreeBed => "three-bed",
            PropertyType::HouseShare => "house-share",
            PropertyType::Furnished => "furnished",
            PropertyType::Unfurnished => "unfurnished",
        }
    }

    pub fn matches(&self, listing: &Listing) -> bool {
        match self {
            PropertyType::Studio => listing.bedrooms_or_zero() == 0,
            PropertyType::OneBed => listing.bedrooms_or_zero() == 1,
            PropertyType::TwoBed => listing.bedrooms_or_zero() == 2,
            // three-bed means "three or more"
            PropertyType::ThreeBed => listing.bedrooms_or_zero() >= 3,
            PropertyType::HouseShare => listing.is_house_share(),
            PropertyType::Furnished => listing.is_furnished(),
            PropertyType::Unfurnished => !listing.is_furnished(),
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PropertyType::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| format!("unknown property type '{}'", s))
    }
}

/// Sort orders offered by the sort control
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortKey {
    #[default]
    Newest,
    Oldest,
    Cheapest,
    Expensive,
    BedroomsAsc,
    BedroomsDesc,
}

impl SortKey {
    pub const ALL: [SortKey; 6] = [
        SortKey::Newest,
        SortKey::Oldest,
        SortKey::Cheapest,
        SortKey::Expensive,
        SortKey::BedroomsAsc,
        SortKey::BedroomsDesc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Newest => "newest",
            SortKey::Oldest => "oldest",
            SortKey::Cheapest => "cheapest",
            SortKey::Expensive => "expensive",
            SortKey::BedroomsAsc => "bedrooms-asc",
            SortKey::BedroomsDesc => "bedrooms-desc",
        }
    }

    /// Missing numbers compare as 0, missing dates as the earliest instant
    pub fn compare(&self, a: &Listing, b: &Listing) -> Ordering {
        match self {
            SortKey::Newest => b.listed.cmp(&a.listed),
            SortKey::Oldest => a.listed.cmp(&b.listed),
            SortKey::Cheapest => a.rent_or_zero().cmp(&b.rent_or_zero()),
            SortKey::Expensive => b.rent_or_zero().cmp(&a.rent_or_zero()),
            SortKey::BedroomsAsc => a.bedrooms_or_zero().cmp(&b.bedrooms_or_zero()),
            SortKey::BedroomsDesc => b.bedrooms_or_zero().cmp(&a.bedrooms_or_zero()),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| format!("unknown sort key '{}'", s))
    }
}

const PET_WORDS: [&str; 3] = ["pet", "dog", "cat"];

/// Best-effort guess at whether a listing accepts pets: a pet/parking
/// charge, a garden, or a description mentioning pets. Substring matching,
/// so "category" counts and "no pets" counts too.
pub fn is_pet_friendly(listing: &Listing) -> bool {
    if listing.pet_parking_or_zero() > 0 || listing.has_garden() {
        return true;
    }
    let description = listing.description_text().to_lowercase();
    PET_WORDS.iter().any(|word| description.contains(word))
}

/// Case-insensitive substring match on `Location`, the same test the row
/// store's `ilike` applies.
pub fn location_matches(listing: &Listing, term: &str) -> bool {
    listing
        .location_text()
        .to_lowercase()
        .contains(&term.trim().to_lowercase())
}

/// Stable in-place sort
pub fn sort_listings(listings: &mut [Listing], sort: SortKey) {
    listings.sort_by(|a, b| sort.compare(a, b));
}

/// Parameters of the filter and sort controls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListingQuery {
    pub property_type: Option<PropertyType>,
    pub pet_friendly_only: bool,
    pub sort: SortKey,
}

impl ListingQuery {
    pub fn apply(&self, listings: &[Listing]) -> Vec<Listing> {
        apply(listings, self.property_type, self.pet_friendly_only, self.sort)
    }
}

/// Run the pipeline over `listings`, returning a new vector
pub fn apply(
    listings: &[Listing],
    property_type: Option<PropertyType>,
    pet_friendly_only: bool,
    sort: SortKey,
) -> Vec<Listing> {
    let mut shown: Vec<Listing> = listings
        .iter()
        .filter(|l| property_type.map_or(true, |t| t.matches(l)))
        .filter(|l| !pet_friendly_only || is_pet_friendly(l))
        .cloned()
        .collect();
    sort_listings(&mut shown, sort);
    shown
}

/// Memoized pipeline output. Recomputes only after the source set (by
/// identity) or the query changes.
#[derive(Debug)]
pub struct ListingView {
    source: Arc<Vec<Listing>>,
    query: ListingQuery,
    cached: Option<Vec<Listing>>,
    recomputations: u64,
}

impl ListingView {
    pub fn new(source: Arc<Vec<Listing>>, query: ListingQuery) -> Self {
        Self {
            source,
            query,
            cached: None,
            recomputations: 0,
        }
    }

    pub fn set_source(&mut self, source: Arc<Vec<Listing>>) {
        if !Arc::ptr_eq(&self.source, &source) {
            self.source = source;
            self.cached = None;
        }
    }

    pub fn set_query(&mut self, query: ListingQuery) {
        if query != self.query {
            self.query = query;
            self.cached = None;
        }
    }

    pub fn listings(&mut self) -> &[Listing] {
        if self.cached.is_none() {
            self.recomputations += 1;
            self.cached = Some(self.query.apply(&self.source));
        }
        self.cached.as_deref().unwrap_or_default()
    }

    /// How many times the pipeline has actually run
    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{parse_timestamp, ListingId};

    fn listing(id: &str) -> Listing {
        Listing {
            id: ListingId::from(id),
            ..Default::default()
        }
    }

    fn ids(listings: &[Listing]) -> Vec<&str> {
        listings.iter().map(|l| l.id.0.as_str()).collect()
    }

    fn sample() -> Vec<Listing> {
        let mut a = listing("a");
        a.bedrooms = Some(0);
        a.rent = Some(900);
        a.furnished = Some(true);
        a.listed = parse_timestamp("2024-02-01");

        let mut b = listing("b");
        b.bedrooms = Some(1);
        b.rent = Some(1200);
        b.furnished = Some(false);
        b.listed = parse_timestamp("2024-02-03");

        let mut c = listing("c");
        c.bedrooms = Some(4);
        c.house_share = Some(true);
        c.listed = parse_timestamp("2024-02-02");

        let mut d = listing("d");
        d.bedrooms = Some(2);
        d.rent = Some(1500);
        d.listed = None;

        let mut e = listing("e");
        e.bedrooms = Some(3);
        e.rent = Some(2000);
        e.furnished = Some(true);
        e.listed = parse_timestamp("2024-02-05");

        vec![a, b, c, d, e]
    }

    #[test]
    fn property_type_filters_keep_matching_subset_newest_first() {
        let all = sample();
        let cases: [(PropertyType, Vec<&str>); 7] = [
            (PropertyType::Studio, vec!["a"]),
            (PropertyType::OneBed, vec!["b"]),
            (PropertyType::TwoBed, vec!["d"]),
            (PropertyType::ThreeBed, vec!["e", "c"]),
            (PropertyType::HouseShare, vec!["c"]),
            (PropertyType::Furnished, vec!["e", "a"]),
            // absent Furnished counts as unfurnished; undated sorts last
            (PropertyType::Unfurnished, vec!["b", "c", "d"]),
        ];
        for (filter, expected) in cases {
            let shown = apply(&all, Some(filter), false, SortKey::Newest);
            assert_eq!(ids(&shown), expected, "filter {}", filter);
            assert!(shown.iter().all(|l| filter.matches(l)));
        }
    }

    #[test]
    fn no_filter_keeps_everything() {
        let all = sample();
        assert_eq!(apply(&all, None, false, SortKey::Newest).len(), all.len());
    }

    #[test]
    fn missing_bedrooms_counts_as_studio() {
        let all = vec![listing("x")];
        let shown = apply(&all, Some(PropertyType::Studio), false, SortKey::Newest);
        assert_eq!(ids(&shown), ["x"]);
    }

    #[test]
    fn pet_heuristic() {
        let mut charge = listing("charge");
        charge.pet_parking_costs = Some(30);
        let mut garden = listing("garden");
        garden.garden = Some(true);
        let mut dog = listing("dog");
        dog.description = Some("Small DOGS considered".into());
        let mut cat = listing("cat");
        cat.description = Some("Cattery nearby".into());
        let mut plain = listing("plain");
        plain.description = Some("Top floor flat".into());
        plain.pet_parking_costs = Some(0);
        plain.garden = Some(false);
        let bare = listing("bare");

        let all = vec![charge, garden, dog, cat, plain, bare];
        let shown = apply(&all, None, true, SortKey::Newest);
        assert_eq!(ids(&shown), ["charge", "garden", "dog", "cat"]);
        assert!(shown.iter().all(is_pet_friendly));
    }

    #[test]
    fn sort_orders() {
        let all = sample();
        let sorted = |key| ids(&apply(&all, None, false, key)).join(",");
        assert_eq!(sorted(SortKey::Newest), "e,b,c,a,d");
        assert_eq!(sorted(SortKey::Oldest), "d,a,c,b,e");
        // c has no rent: treated as 0
        assert_eq!(sorted(SortKey::Cheapest), "c,a,b,d,e");
        assert_eq!(sorted(SortKey::Expensive), "e,d,b,a,c");
        assert_eq!(sorted(SortKey::BedroomsAsc), "a,b,d,e,c");
        assert_eq!(sorted(SortKey::BedroomsDesc), "c,e,d,b,a");
    }

    #[test]
    fn sorting_is_stable_and_idempotent() {
        let mut all = sample();
        for l in &mut all {
            l.rent = Some(1000);
        }
        let once = apply(&all, None, false, SortKey::Cheapest);
        assert_eq!(ids(&once), ids(&all));
        for key in SortKey::ALL {
            let once = apply(&all, None, false, key);
            let twice = apply(&once, None, false, key);
            assert_eq!(once, twice, "sort {}", key);
        }
    }

    #[test]
    fn input_is_not_mutated() {
        let all = sample();
        let before = all.clone();
        let _ = apply(&all, Some(PropertyType::Furnished), true, SortKey::Expensive);
        assert_eq!(all, before);
    }

    #[test]
    fn parses_control_values() {
        for t in PropertyType::ALL {
            assert_eq!(t.as_str().parse::<PropertyType>().unwrap(), t);
        }
        for k in SortKey::ALL {
            assert_eq!(k.as_str().parse::<SortKey>().unwrap(), k);
        }
        assert!("penthouse".parse::<PropertyType>().is_err());
        assert!("random".parse::<SortKey>().is_err());
    }

    #[test]
    fn location_match_ignores_case() {
        let mut l = listing("x");
        l.location = Some("Camden, NW1".into());
        assert!(location_matches(&l, "camden"));
        assert!(location_matches(&l, "nw1"));
        assert!(!location_matches(&l, "hackney"));
        assert!(!location_matches(&listing("y"), "camden"));
    }

    #[test]
    fn view_recomputes_only_on_change() {
        let source = Arc::new(sample());
        let mut view = ListingView::new(source.clone(), ListingQuery::default());

        assert_eq!(view.listings().len(), 5);
        assert_eq!(view.listings().len(), 5);
        assert_eq!(view.recomputations(), 1);

        view.set_source(source.clone());
        view.set_query(ListingQuery::default());
        let _ = view.listings();
        assert_eq!(view.recomputations(), 1);

        view.set_query(ListingQuery {
            property_type: Some(PropertyType::Furnished),
            ..Default::default()
        });
        assert_eq!(ids(view.listings()), ["e", "a"]);
        assert_eq!(view.recomputations(), 2);

        view.set_source(Arc::new(sample()[..1].to_vec()));
        assert_eq!(ids(view.listings()), ["a"]);
        assert_eq!(view.recomputations(), 3);
    }
}
