//! Run-scoped deduplication and the "new since last run" diff.

use std::collections::HashSet;

use listingwatch_api::Listing;

/// Outcome of offering one listing to the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    /// Identifier already accepted earlier in this run.
    Duplicate,
    /// The run already holds the target number of listings.
    Full,
}

/// Listings accepted so far in one run, in discovery order.
#[derive(Debug, Default, Clone)]
pub struct RunState {
    listings: Vec<Listing>,
    seen: HashSet<String>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts `listing` unless the run is at `cap` or already has its
    /// identifier. The first listing seen with a given identifier wins.
    pub fn admit(&mut self, listing: Listing, cap: usize) -> Admission {
        if self.listings.len() >= cap {
            return Admission::Full;
        }
        if self.seen.contains(&listing.identifier) {
            return Admission::Duplicate;
        }
        self.seen.insert(listing.identifier.clone());
        self.listings.push(listing);
        Admission::Accepted
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.seen.contains(identifier)
    }

    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    pub fn identifiers(&self) -> &HashSet<String> {
        &self.seen
    }

    pub fn into_listings(self) -> Vec<Listing> {
        self.listings
    }
}

/// Identifiers in `current` that are not in `prior`.
pub fn new_identifiers<'a>(
    current: &'a HashSet<String>,
    prior: &'a HashSet<String>,
) -> HashSet<&'a str> {
    current
        .difference(prior)
        .map(String::as_str)
        .collect()
}

/// Listings of this run whose identifiers were not seen in the prior run,
/// in discovery order.
pub fn new_listings(run: &RunState, prior: &HashSet<String>) -> Vec<Listing> {
    let fresh = new_identifiers(run.identifiers(), prior);
    run.listings()
        .iter()
        .filter(|listing| fresh.contains(listing.identifier.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(id: &str) -> Listing {
        Listing {
            identifier: id.to_string(),
            title: Some(format!("Listing {}", id)),
            description: None,
            price: None,
            listing_url: format!("https://example.com/guns-for-sale-online/{}.cfm", id),
        }
    }

    fn set(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn run_of(ids: &[&str]) -> RunState {
        let mut run = RunState::new();
        for id in ids {
            run.admit(listing(id), usize::MAX);
        }
        run
    }

    #[test]
    fn first_seen_wins() {
        let mut run = RunState::new();
        let mut original = listing("1");
        original.price = Some("$100".into());
        assert_eq!(run.admit(original, 10), Admission::Accepted);
        assert_eq!(run.admit(listing("1"), 10), Admission::Duplicate);
        assert_eq!(run.len(), 1);
        assert_eq!(run.listings()[0].price.as_deref(), Some("$100"));
    }

    #[test]
    fn cap_checked_before_insert() {
        let mut run = RunState::new();
        assert_eq!(run.admit(listing("1"), 2), Admission::Accepted);
        assert_eq!(run.admit(listing("2"), 2), Admission::Accepted);
        assert_eq!(run.admit(listing("3"), 2), Admission::Full);
        assert_eq!(run.admit(listing("1"), 2), Admission::Full);
        assert_eq!(run.len(), 2);
        assert!(!run.contains("3"));
    }

    #[test]
    fn identifiers_are_unique() {
        let run = run_of(&["5", "6", "5", "7", "6"]);
        let ids: Vec<&str> = run.listings().iter().map(|l| l.identifier.as_str()).collect();
        assert_eq!(ids, vec!["5", "6", "7"]);
        assert_eq!(run.identifiers().len(), run.len());
    }

    #[test]
    fn new_since_prior_run_keeps_discovery_order() {
        let run = run_of(&["100", "102", "103"]);
        let prior = set(&["100", "101"]);
        let fresh: Vec<String> = new_listings(&run, &prior)
            .into_iter()
            .map(|l| l.identifier)
            .collect();
        assert_eq!(fresh, vec!["102", "103"]);
    }

    #[test]
    fn diff_is_set_difference() {
        let cases: &[(&[&str], &[&str])] = &[
            (&[], &[]),
            (&["1", "2", "3"], &[]),
            (&[], &["1", "2"]),
            (&["1", "2", "3"], &["1", "2", "3"]),
            (&["9", "3", "7", "1"], &["3", "4", "1"]),
        ];
        for (current, prior) in cases {
            let current = set(current);
            let prior = set(prior);
            let fresh = new_identifiers(&current, &prior);
            for id in &fresh {
                assert!(!prior.contains(*id));
                assert!(current.contains(*id));
            }
            for id in &current {
                if !prior.contains(id) {
                    assert!(fresh.contains(id.as_str()));
                }
            }
        }
    }

    #[test]
    fn order_follows_run_not_set_iteration() {
        let ids = ["50", "10", "40", "20", "30"];
        let run = run_of(&ids);
        let fresh: Vec<String> = new_listings(&run, &set(&["40"]))
            .into_iter()
            .map(|l| l.identifier)
            .collect();
        assert_eq!(fresh, vec!["50", "10", "20", "30"]);
    }

    #[test]
    fn nothing_new_is_empty() {
        let run = run_of(&["1", "2"]);
        assert!(new_listings(&run, &set(&["1", "2", "3"])).is_empty());
    }
}
