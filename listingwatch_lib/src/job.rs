//! One crawl-dedupe-notify-persist run, and the long-lived watcher that
//! repeats it.

use listingwatch_api::{Client, Listing};

use crate::config::Config;
use crate::crawl::{crawl, CrawlSettings, ResultsSource, StopReason};
use crate::dedup::new_listings;
use crate::error::WatchError;
use crate::notify::{AnyNotifier, Notifier, NotifyReport};
use crate::store::SeenStore;

#[derive(Debug, Clone, Copy)]
pub struct JobOptions {
    /// Write the run's identifier set back to the store.
    pub persist: bool,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self { persist: true }
    }
}

/// What one run did.
#[derive(Debug)]
pub struct RunSummary {
    pub accepted: usize,
    pub pages_fetched: usize,
    pub stop: StopReason,
    /// Listings not present in the previous run, in discovery order.
    pub new_listings: Vec<Listing>,
    /// `None` when there was nothing new to send.
    pub notification: Option<NotifyReport>,
    pub saved: bool,
}

/// Runs the pipeline once.
///
/// Nothing in here aborts the run: fetch failures end the crawl early,
/// notification failures are reported per recipient and a failed save is
/// logged. State is written only when at least one page was fetched, so a
/// run that never reached the site cannot erase the previous snapshot.
pub async fn run_once<S, N>(
    source: &S,
    settings: &CrawlSettings,
    store: &SeenStore,
    notifier: &N,
    options: JobOptions,
) -> RunSummary
where
    S: ResultsSource,
    N: Notifier,
{
    let prior = store.load();
    let outcome = crawl(source, settings).await;
    let fresh = new_listings(&outcome.run, &prior);
    tracing::info!(
        accepted = outcome.run.len(),
        new = fresh.len(),
        "Crawl finished: {}",
        outcome.stop
    );

    let notification = if fresh.is_empty() {
        None
    } else {
        let report = notifier.notify(&fresh).await;
        if report.all_failed() {
            tracing::error!("Notification failed for every recipient");
        }
        Some(report)
    };

    let saved = if !options.persist {
        tracing::debug!("Not persisting state");
        false
    } else if !outcome.any_page_succeeded() {
        tracing::warn!(
            "No page fetched; keeping previous state at {}",
            store.path().display()
        );
        false
    } else {
        match store.save(outcome.run.identifiers()) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("{}", e);
                false
            }
        }
    };

    RunSummary {
        accepted: outcome.run.len(),
        pages_fetched: outcome.pages_fetched,
        stop: outcome.stop,
        new_listings: fresh,
        notification,
        saved,
    }
}

/// Owns the HTTP session, store and notifier across repeated runs.
pub struct Watcher {
    client: Client,
    settings: CrawlSettings,
    store: SeenStore,
    notifier: AnyNotifier,
    options: JobOptions,
}

impl Watcher {
    /// In dry-run mode new listings go to the log and state is never saved.
    pub fn from_config(config: &Config, dry_run: bool) -> Result<Self, WatchError> {
        let client = Client::with_options(&config.crawl.base_url, config.request_timeout())?;
        let notifier = AnyNotifier::from_config(config.email.as_ref(), dry_run)?;
        Ok(Self {
            client,
            settings: config.crawl_settings(),
            store: SeenStore::new(&config.state.path),
            notifier,
            options: JobOptions { persist: !dry_run },
        })
    }

    pub fn store(&self) -> &SeenStore {
        &self.store
    }

    pub async fn run(&self) -> RunSummary {
        run_once(
            &self.client,
            &self.settings,
            &self.store,
            &self.notifier,
            self.options,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::tests::{results_html, FakeSource};
    use crate::notify::{Delivery, NotifyError};
    use listingwatch_api::SearchQuery;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeNotifier {
        fail: bool,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl Notifier for FakeNotifier {
        async fn notify(&self, listings: &[Listing]) -> NotifyReport {
            self.calls
                .lock()
                .unwrap()
                .push(listings.iter().map(|l| l.identifier.clone()).collect());
            let result = if self.fail {
                Err(NotifyError::Transport("connection refused".into()))
            } else {
                Ok(())
            };
            NotifyReport {
                deliveries: vec![Delivery {
                    recipient: "a@example.com".into(),
                    result,
                }],
            }
        }
    }

    fn settings() -> CrawlSettings {
        CrawlSettings::new(SearchQuery::new("smith", "Revolvers"), 50, 25)
    }

    fn set(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn ids(listings: &[Listing]) -> Vec<&str> {
        listings.iter().map(|l| l.identifier.as_str()).collect()
    }

    #[tokio::test]
    async fn notifies_only_new_and_saves_current_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeenStore::new(dir.path().join("seen.txt"));
        store.save(&set(&["100", "101"])).unwrap();

        let source = FakeSource::new()
            .page(1, results_html(&["100", "102", "103"]))
            .page(26, results_html(&[]));
        let notifier = FakeNotifier::default();
        let summary = run_once(&source, &settings(), &store, &notifier, JobOptions::default()).await;

        assert_eq!(ids(&summary.new_listings), vec!["102", "103"]);
        assert_eq!(*notifier.calls.lock().unwrap(), vec![vec!["102", "103"]]);
        assert!(summary.saved);
        assert_eq!(store.load(), set(&["100", "102", "103"]));
    }

    #[tokio::test]
    async fn nothing_new_skips_notification() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeenStore::new(dir.path().join("seen.txt"));
        store.save(&set(&["1", "2", "3"])).unwrap();

        let source = FakeSource::new()
            .page(1, results_html(&["1", "2"]))
            .page(26, results_html(&[]));
        let notifier = FakeNotifier::default();
        let summary = run_once(&source, &settings(), &store, &notifier, JobOptions::default()).await;

        assert!(summary.new_listings.is_empty());
        assert!(summary.notification.is_none());
        assert!(notifier.calls.lock().unwrap().is_empty());
        assert_eq!(store.load(), set(&["1", "2"]));
    }

    #[tokio::test]
    async fn first_run_reports_everything() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeenStore::new(dir.path().join("seen.txt"));
        let source = FakeSource::new()
            .page(1, results_html(&["7", "8"]))
            .page(26, results_html(&[]));
        let summary = run_once(
            &source,
            &settings(),
            &store,
            &FakeNotifier::default(),
            JobOptions::default(),
        )
        .await;
        assert_eq!(ids(&summary.new_listings), vec!["7", "8"]);
        assert_eq!(summary.stop, StopReason::EndOfResults { page: 2 });
    }

    #[tokio::test]
    async fn first_page_failure_keeps_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeenStore::new(dir.path().join("seen.txt"));
        store.save(&set(&["1", "2"])).unwrap();

        let notifier = FakeNotifier::default();
        let summary = run_once(
            &FakeSource::new(),
            &settings(),
            &store,
            &notifier,
            JobOptions::default(),
        )
        .await;

        assert!(matches!(summary.stop, StopReason::FetchFailed { page: 1, .. }));
        assert!(!summary.saved);
        assert!(notifier.calls.lock().unwrap().is_empty());
        assert_eq!(store.load(), set(&["1", "2"]));
    }

    #[tokio::test]
    async fn later_page_failure_saves_partial_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeenStore::new(dir.path().join("seen.txt"));
        let source = FakeSource::new().page(1, results_html(&["1", "2"]));
        let summary = run_once(
            &source,
            &settings(),
            &store,
            &FakeNotifier::default(),
            JobOptions::default(),
        )
        .await;

        assert!(matches!(summary.stop, StopReason::FetchFailed { page: 2, .. }));
        assert!(summary.saved);
        assert_eq!(store.load(), set(&["1", "2"]));
    }

    #[tokio::test]
    async fn notification_failure_does_not_block_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeenStore::new(dir.path().join("seen.txt"));
        let source = FakeSource::new()
            .page(1, results_html(&["5"]))
            .page(26, results_html(&[]));
        let notifier = FakeNotifier {
            fail: true,
            ..Default::default()
        };
        let summary = run_once(&source, &settings(), &store, &notifier, JobOptions::default()).await;

        assert!(summary.notification.as_ref().unwrap().all_failed());
        assert!(summary.saved);
        assert_eq!(store.load(), set(&["5"]));
    }

    #[tokio::test]
    async fn dry_run_leaves_store_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.txt");
        let store = SeenStore::new(&path);
        let source = FakeSource::new()
            .page(1, results_html(&["5"]))
            .page(26, results_html(&[]));
        let summary = run_once(
            &source,
            &settings(),
            &store,
            &FakeNotifier::default(),
            JobOptions { persist: false },
        )
        .await;

        assert_eq!(ids(&summary.new_listings), vec!["5"]);
        assert!(!summary.saved);
        assert!(!path.exists());
    }

    #[test]
    fn watcher_builds_from_config() {
        let config = Config::from_toml_str(
            "[search]\nkeyword = \"smith\"\n[state]\npath = \"state/seen.txt\"\n",
        )
        .unwrap();
        let watcher = Watcher::from_config(&config, true).unwrap();
        assert_eq!(watcher.store().path(), std::path::Path::new("state/seen.txt"));
        assert!(!watcher.options.persist);
        assert!(matches!(watcher.notifier, AnyNotifier::Log(_)));
    }
}
