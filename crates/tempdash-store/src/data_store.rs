//! Live temperature state.
//!
//! Two subscriptions feed the store: the most recent daily documents and the
//! all-time aggregate document. Each push is decoded, reshaped, and written
//! into a [`TemperatureState`] held in a `watch` channel, so UI code reads the
//! latest state and is woken when it changes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use parking_lot::Mutex;
use serde::Serialize;
use tempdash_core::{AppError, Config};
use tempdash_series::{
    build_day_entry, format_distance, hourly_values, wrap_hourly, DailyDocument, DayEntry,
    DocumentError, Extreme, OverallDocument,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error_mapping::document_error;
use crate::source::{Direction, DocumentSource, Query, QuerySnapshot, SourceError, Subscription};

/// Number of most recent days subscribed to by default
pub const FETCH_LIMIT: usize = 7;

/// Source of "now" in local time
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(|| Local::now().naive_local())
}

#[derive(Clone)]
pub struct StoreOptions {
    pub daily_collection: String,
    pub overall_collection: String,
    pub fetch_limit: usize,
    /// Period of the relative-time ticker; `None` disables it
    pub relative_time_refresh: Option<Duration>,
    pub clock: Clock,
}

impl std::fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreOptions")
            .field("daily_collection", &self.daily_collection)
            .field("overall_collection", &self.overall_collection)
            .field("fetch_limit", &self.fetch_limit)
            .field("relative_time_refresh", &self.relative_time_refresh)
            .finish_non_exhaustive()
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            daily_collection: "temperature".to_string(),
            overall_collection: "overall".to_string(),
            fetch_limit: FETCH_LIMIT,
            relative_time_refresh: Some(Duration::from_secs(30)),
            clock: system_clock(),
        }
    }
}

impl StoreOptions {
    pub fn from_config(config: &Config) -> Self {
        let refresh = config.dashboard.relative_time_refresh_secs;
        Self {
            daily_collection: config.database.daily_collection.clone(),
            overall_collection: config.database.overall_collection.clone(),
            fetch_limit: config.database.fetch_limit,
            relative_time_refresh: (refresh > 0).then(|| Duration::from_secs(refresh)),
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn daily_query(&self) -> Query {
        Query::collection(&self.daily_collection)
            .order_by("date", Direction::Descending)
            .limit(self.fetch_limit)
    }

    fn overall_query(&self) -> Query {
        Query::collection(&self.overall_collection)
    }
}

/// Everything the dashboard renders from the database
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TemperatureState {
    pub last_temperature: Option<f64>,
    pub last_humidity: Option<f64>,
    pub last_heat_index: Option<f64>,
    /// `HH:mm` of the newest sample
    pub last_entry_time: String,
    /// e.g. "3 minutes ago"
    pub relative_time: String,
    pub last_datetime: Option<NaiveDateTime>,
    pub today_high: Option<Extreme>,
    pub today_low: Option<Extreme>,
    /// Newest day first
    pub data_entries: Vec<DayEntry>,

    pub correlation_peak_low_temperature: f64,
    pub overall_hourly_average: Vec<f64>,
    /// `overall_hourly_average` closed into a 24-hour loop
    pub adj_overall_hourly_average: Vec<f64>,

    /// Count of document changes received from the daily subscription
    pub data_changes: u64,
    /// User-facing message for the most recent failure. A good snapshot
    /// clears only the failure its own feed raised.
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Feed {
    Daily,
    Overall,
}

impl std::fmt::Display for Feed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Feed::Daily => write!(f, "daily"),
            Feed::Overall => write!(f, "overall"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Push,
    Fetch,
}

/// Last user-facing failure of each feed
#[derive(Debug, Default)]
struct FeedErrors {
    daily: Option<String>,
    overall: Option<String>,
}

impl FeedErrors {
    fn slot(&mut self, feed: Feed) -> &mut Option<String> {
        match feed {
            Feed::Daily => &mut self.daily,
            Feed::Overall => &mut self.overall,
        }
    }

    /// Set or clear one feed's error and return the message to show.
    /// A cleared feed falls back to the other feed's error.
    fn update(&mut self, feed: Feed, message: Option<String>) -> Option<String> {
        *self.slot(feed) = message.clone();
        message.or_else(|| match feed {
            Feed::Daily => self.overall.clone(),
            Feed::Overall => self.daily.clone(),
        })
    }
}

struct Shared {
    state: watch::Sender<TemperatureState>,
    clock: Clock,
    // Only read or written while the watch lock is held.
    daily_pushed: AtomicBool,
    overall_pushed: AtomicBool,
    errors: Mutex<FeedErrors>,
}

impl Shared {
    fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }

    fn pushed(&self, feed: Feed) -> &AtomicBool {
        match feed {
            Feed::Daily => &self.daily_pushed,
            Feed::Overall => &self.overall_pushed,
        }
    }

    /// Skip a priming fetch if a push already landed; mark pushes.
    fn admit(&self, feed: Feed, origin: Origin) -> bool {
        let flag = self.pushed(feed);
        match origin {
            Origin::Push => {
                flag.store(true, Ordering::Relaxed);
                true
            }
            Origin::Fetch => !flag.load(Ordering::Relaxed),
        }
    }

    fn set_error(&self, state: &mut TemperatureState, feed: Feed, message: Option<String>) {
        state.error_message = self.errors.lock().update(feed, message);
    }

    /// Returns whether the snapshot was admitted into state
    fn apply(&self, feed: Feed, snapshot: &QuerySnapshot, origin: Origin) -> bool {
        let applied = match feed {
            Feed::Daily => self.apply_daily(snapshot, origin),
            Feed::Overall => self.apply_overall(snapshot, origin),
        };
        if applied {
            tracing::debug!(
                "Applied {} snapshot ({:?}): {} documents, {} changes",
                feed,
                origin,
                snapshot.docs.len(),
                snapshot.changes.len()
            );
        }
        applied
    }

    fn apply_daily(&self, snapshot: &QuerySnapshot, origin: Origin) -> bool {
        if snapshot.is_empty() {
            tracing::debug!("Daily snapshot is empty; keeping current state");
            return false;
        }

        let now = self.now();
        let anchor = now.date();

        let mut failure: Option<DocumentError> = None;
        let mut newest: Option<DailyDocument> = None;
        let mut entries = Vec::with_capacity(snapshot.docs.len());
        for doc in &snapshot.docs {
            match DailyDocument::from_value(&doc.id, &doc.data) {
                Ok(daily) => {
                    entries.push(build_day_entry(&daily, anchor));
                    newest.get_or_insert(daily);
                }
                Err(e) => {
                    tracing::warn!("Skipping daily document: {}", e);
                    failure = Some(e);
                }
            }
        }

        let latest = newest.as_ref().and_then(|doc| {
            let reading = doc.last_reading();
            if reading.is_none() {
                tracing::warn!("Newest daily document {} has no readings", doc.date);
                failure.get_or_insert(DocumentError::Empty(doc.date.clone()));
            }
            reading
        });
        let message =
            failure.map(|e| AppError::from(document_error(e)).user_message().to_string());

        self.state.send_if_modified(|state| {
            if !self.admit(Feed::Daily, origin) {
                tracing::debug!("Ignoring priming fetch; a live snapshot already arrived");
                return false;
            }

            state.data_changes += snapshot.changes.len() as u64;

            match &latest {
                Some(reading) => {
                    state.last_temperature = reading.temperature;
                    state.last_humidity = reading.humidity;
                    state.last_heat_index = reading.heat_index;
                    state.last_entry_time = reading.time.clone();
                    state.last_datetime = reading.datetime;
                    state.relative_time = match reading.datetime {
                        Some(dt) => format_distance(dt, now),
                        None => {
                            tracing::warn!(
                                "Could not parse time of newest reading {:?}",
                                reading.time
                            );
                            String::new()
                        }
                    };
                }
                None => {
                    state.last_temperature = None;
                    state.last_humidity = None;
                    state.last_heat_index = None;
                    state.last_entry_time.clear();
                    state.last_datetime = None;
                    state.relative_time.clear();
                }
            }
            state.today_high = newest.as_ref().and_then(|doc| doc.peak_temp.clone());
            state.today_low = newest.as_ref().and_then(|doc| doc.lowest_temp.clone());

            state.data_entries = entries;
            self.set_error(state, Feed::Daily, message);
            true
        })
    }

    fn apply_overall(&self, snapshot: &QuerySnapshot, origin: Origin) -> bool {
        let Some(doc) = snapshot.docs.first() else {
            tracing::warn!("Overall snapshot has no documents");
            return false;
        };

        let decoded = OverallDocument::from_value(&doc.id, &doc.data);

        self.state.send_if_modified(|state| {
            if !self.admit(Feed::Overall, origin) {
                return false;
            }
            match decoded {
                Ok(overall) => {
                    let hourly = hourly_values(&overall.overall_hourly_average);
                    state.adj_overall_hourly_average = wrap_hourly(&hourly);
                    state.overall_hourly_average = hourly;
                    state.correlation_peak_low_temperature =
                        overall.correlation_peak_low_temperature;
                    self.set_error(state, Feed::Overall, None);
                }
                Err(e) => {
                    tracing::warn!("Skipping overall document: {}", e);
                    let message = AppError::from(document_error(e)).user_message().to_string();
                    self.set_error(state, Feed::Overall, Some(message));
                }
            }
            true
        })
    }

    /// Surface a source failure. A failed priming fetch is dropped once a
    /// push has landed for the same feed.
    fn record_error(&self, feed: Feed, error: SourceError, origin: Origin) {
        self.state.send_if_modified(|state| {
            if origin == Origin::Fetch && self.pushed(feed).load(Ordering::Relaxed) {
                return false;
            }
            match origin {
                Origin::Push => tracing::error!("{} subscription error: {}", feed, error),
                Origin::Fetch => tracing::error!("{} priming fetch failed: {}", feed, error),
            }
            let message = AppError::from(error).user_message().to_string();
            self.set_error(state, feed, Some(message));
            true
        });
    }

    fn refresh_relative_time(&self) -> bool {
        let now = self.now();
        self.state.send_if_modified(|state| {
            let Some(dt) = state.last_datetime else {
                return false;
            };
            let relative = format_distance(dt, now);
            if relative == state.relative_time {
                return false;
            }
            state.relative_time = relative;
            true
        })
    }
}

/// Reactive store of dashboard readings
pub struct DataStore<S> {
    source: Arc<S>,
    options: StoreOptions,
    shared: Arc<Shared>,
}

impl<S: DocumentSource> DataStore<S> {
    pub fn new(source: S, options: StoreOptions) -> Self {
        Self::with_shared_source(Arc::new(source), options)
    }

    pub fn with_shared_source(source: Arc<S>, options: StoreOptions) -> Self {
        let (state, _) = watch::channel(TemperatureState::default());
        let shared = Arc::new(Shared {
            state,
            clock: options.clock.clone(),
            daily_pushed: AtomicBool::new(false),
            overall_pushed: AtomicBool::new(false),
            errors: Mutex::new(FeedErrors::default()),
        });
        Self {
            source,
            options,
            shared,
        }
    }

    /// Subscribe to daily and overall documents and keep state current.
    ///
    /// Listener tasks run until the returned handle is stopped or dropped.
    /// After subscribing, both queries are fetched once to prime state in
    /// case the first push is slow. A failed priming fetch is logged and
    /// recorded in `error_message`; the listeners keep running.
    ///
    /// # Errors
    ///
    /// Returns the source error if either subscription fails.
    pub async fn start(&self) -> Result<StoreHandle, SourceError> {
        let daily_query = self.options.daily_query();
        let overall_query = self.options.overall_query();

        let daily = self.source.subscribe(&daily_query)?;
        let overall = self.source.subscribe(&overall_query)?;

        let mut handle = StoreHandle::new();
        handle.spawn(listen(daily, Feed::Daily, self.shared.clone(), handle.cancel.clone()));
        handle.spawn(listen(overall, Feed::Overall, self.shared.clone(), handle.cancel.clone()));
        if let Some(period) = self.options.relative_time_refresh {
            handle.spawn(tick(period, self.shared.clone(), handle.cancel.clone()));
        }

        self.prime(Feed::Daily, &daily_query).await;
        self.prime(Feed::Overall, &overall_query).await;

        tracing::info!(
            "Listening to {} (last {} days) and {}",
            self.options.daily_collection,
            self.options.fetch_limit,
            self.options.overall_collection
        );
        Ok(handle)
    }

    async fn prime(&self, feed: Feed, query: &Query) {
        match self.source.fetch(query).await {
            Ok(snapshot) => {
                self.shared.apply(feed, &snapshot, Origin::Fetch);
            }
            Err(e) => self.shared.record_error(feed, e, Origin::Fetch),
        }
    }

    /// Like [`start`](Self::start), but logs failures instead of returning them
    pub async fn fetch_data(&self) -> Option<StoreHandle> {
        match self.start().await {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!("Failed to start temperature listeners: {}", e);
                let message = AppError::from(e).user_message().to_string();
                self.shared
                    .state
                    .send_modify(|state| self.shared.set_error(state, Feed::Daily, Some(message)));
                None
            }
        }
    }

    /// Fold a daily snapshot into state, counting its changes
    pub fn apply_daily_snapshot(&self, snapshot: &QuerySnapshot) {
        self.shared.apply(Feed::Daily, snapshot, Origin::Push);
    }

    pub fn apply_overall_snapshot(&self, snapshot: &QuerySnapshot) {
        self.shared.apply(Feed::Overall, snapshot, Origin::Push);
    }

    /// Recompute "time since last update"; returns whether it changed
    pub fn refresh_relative_time(&self) -> bool {
        self.shared.refresh_relative_time()
    }

    pub fn state(&self) -> TemperatureState {
        self.shared.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<TemperatureState> {
        self.shared.state.subscribe()
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }
}

async fn listen(
    mut subscription: Subscription,
    feed: Feed,
    shared: Arc<Shared>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            item = subscription.next() => match item {
                Some(Ok(snapshot)) => {
                    shared.apply(feed, &snapshot, Origin::Push);
                }
                Some(Err(e)) => shared.record_error(feed, e, Origin::Push),
                None => {
                    tracing::warn!("{} subscription closed by source", feed);
                    break;
                }
            },
        }
    }
    tracing::debug!("{} listener stopped", feed);
}

async fn tick(period: Duration, shared: Arc<Shared>, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                shared.refresh_relative_time();
            }
        }
    }
}

/// Running listeners. Dropping the handle cancels them.
#[derive(Debug)]
pub struct StoreHandle {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl StoreHandle {
    fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    fn spawn<F>(&mut self, task: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.tasks.push(tokio::spawn(task));
    }

    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|t| !t.is_finished())
    }

    /// Cancel listeners and wait for them to exit
    pub async fn stop(mut self) {
        self.cancel.cancel();
        for task in std::mem::take(&mut self.tasks) {
            if let Err(e) = task.await {
                tracing::error!("Listener task failed: {}", e);
            }
        }
    }
}

impl Drop for StoreHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ChangeKind, Document, DocumentChange};
    use crate::MemorySource;
    use chrono::NaiveDate;
    use serde_json::json;

    fn fixed_clock(h: u32, m: u32) -> Clock {
        Arc::new(move || {
            NaiveDate::from_ymd_opt(2024, 3, 10)
                .and_then(|d| d.and_hms_opt(h, m, 0))
                .unwrap()
        })
    }

    fn store() -> DataStore<MemorySource> {
        let options = StoreOptions {
            relative_time_refresh: None,
            ..StoreOptions::default()
        }
        .with_clock(fixed_clock(9, 13));
        DataStore::new(MemorySource::new(), options)
    }

    fn day_doc(date: &str) -> Document {
        Document {
            id: date.to_string(),
            data: json!({
                "date": date,
                "entries": {
                    "temp": [24.0, 24.4, 25.1],
                    "humid": [70.0, 69.0, 66.5],
                    "heat_index": [24.6, 25.0, 25.9],
                    "time": ["09:00", "09:05", "09:10"]
                },
                "peak_temp": { "value": 25.1, "time": "09:10" },
                "lowest_temp": { "value": 24.0, "time": "09:00" },
                "hourly_temp": { "9": 24.5 },
                "hourly_humid": { "9": 68.5 },
                "data_point_count": 3
            }),
        }
    }

    fn snapshot(docs: Vec<Document>, changes: usize) -> QuerySnapshot {
        let changes = docs
            .iter()
            .take(changes)
            .map(|d| DocumentChange {
                kind: ChangeKind::Added,
                id: d.id.clone(),
            })
            .collect();
        QuerySnapshot { docs, changes }
    }

    #[test]
    fn test_daily_snapshot_derives_latest_fields() {
        let store = store();
        store.apply_daily_snapshot(&snapshot(vec![day_doc("2024-03-10"), day_doc("2024-03-09")], 2));

        let state = store.state();
        assert_eq!(state.last_temperature, Some(25.1));
        assert_eq!(state.last_humidity, Some(66.5));
        assert_eq!(state.last_heat_index, Some(25.9));
        assert_eq!(state.last_entry_time, "09:10");
        assert_eq!(state.relative_time, "3 minutes ago");
        assert_eq!(state.today_high.as_ref().map(|e| e.value), Some(25.1));
        assert_eq!(state.today_low.as_ref().map(|e| e.time.as_str()), Some("09:00"));
        assert_eq!(state.data_entries.len(), 2);
        assert_eq!(state.data_entries[1].date, "2024-03-09");
        assert_eq!(state.data_changes, 2);
        assert!(state.error_message.is_none());
    }

    #[test]
    fn test_empty_daily_snapshot_keeps_state() {
        let store = store();
        store.apply_daily_snapshot(&snapshot(vec![day_doc("2024-03-10")], 1));
        store.apply_daily_snapshot(&QuerySnapshot::default());

        let state = store.state();
        assert_eq!(state.data_entries.len(), 1);
        assert_eq!(state.data_changes, 1);
    }

    #[test]
    fn test_malformed_document_is_skipped() {
        let store = store();
        let bad = Document {
            id: "broken".to_string(),
            data: json!({ "entries": "nope" }),
        };
        store.apply_daily_snapshot(&snapshot(vec![day_doc("2024-03-10"), bad], 2));

        let state = store.state();
        assert_eq!(state.data_entries.len(), 1);
        assert_eq!(state.last_temperature, Some(25.1));
        assert_eq!(state.data_changes, 2);
        assert!(state.error_message.is_some());
    }

    fn reading_doc(date: &str, temp: f64, time: &str) -> Document {
        Document {
            id: date.to_string(),
            data: json!({
                "date": date,
                "entries": { "temp": [temp], "humid": [60.0], "heat_index": [temp], "time": [time] },
                "peak_temp": { "value": temp, "time": time },
                "lowest_temp": { "value": temp, "time": time },
                "data_point_count": 1
            }),
        }
    }

    fn broken(id: &str) -> Document {
        Document {
            id: id.to_string(),
            data: json!({ "date": id, "entries": "nope" }),
        }
    }

    #[test]
    fn test_latest_reading_comes_from_first_decodable_document() {
        let store = store();
        store.apply_daily_snapshot(&snapshot(vec![reading_doc("2024-03-09", 20.0, "11:00")], 1));

        store.apply_daily_snapshot(&snapshot(
            vec![broken("2024-03-11"), reading_doc("2024-03-10", 30.0, "09:00")],
            2,
        ));

        let state = store.state();
        assert_eq!(state.data_entries.len(), 1);
        assert_eq!(state.data_entries[0].date, "2024-03-10");
        assert_eq!(state.last_temperature, Some(30.0));
        assert_eq!(state.last_datetime, NaiveDate::from_ymd_opt(2024, 3, 10).and_then(|d| d.and_hms_opt(9, 0, 0)));
        assert_eq!(state.relative_time, "13 minutes ago");
        assert_eq!(state.today_high.as_ref().map(|e| e.value), Some(30.0));
        assert!(state.error_message.is_some());
    }

    #[test]
    fn test_unparsable_latest_time_clears_datetime() {
        let store = store();
        store.apply_daily_snapshot(&snapshot(vec![reading_doc("2024-03-10", 20.0, "09:00")], 1));
        assert!(store.state().last_datetime.is_some());

        store.apply_daily_snapshot(&snapshot(vec![reading_doc("2024-03-10", 21.0, "9 o'clock")], 1));

        let state = store.state();
        assert_eq!(state.last_temperature, Some(21.0));
        assert_eq!(state.last_entry_time, "9 o'clock");
        assert_eq!(state.last_datetime, None);
        assert_eq!(state.relative_time, "");
        assert!(!store.refresh_relative_time());
    }

    #[test]
    fn test_newest_document_without_readings_is_reported() {
        let store = store();
        store.apply_daily_snapshot(&snapshot(vec![reading_doc("2024-03-09", 20.0, "11:00")], 1));

        let empty = Document {
            id: "2024-03-10".to_string(),
            data: json!({ "date": "2024-03-10" }),
        };
        store.apply_daily_snapshot(&snapshot(vec![empty, reading_doc("2024-03-09", 20.0, "11:00")], 1));

        let state = store.state();
        assert_eq!(state.data_entries.len(), 2);
        assert_eq!(state.last_temperature, None);
        assert_eq!(state.last_datetime, None);
        assert!(state.today_high.is_none());
        assert_eq!(state.error_message.as_deref(), Some("No readings recorded yet."));
    }

    #[test]
    fn test_good_snapshot_only_clears_its_own_feed_error() {
        let store = store();
        let bad_overall = QuerySnapshot {
            docs: vec![Document {
                id: "stats".to_string(),
                data: json!({ "correlation_peak_low_temperature": "high" }),
            }],
            changes: Vec::new(),
        };
        store.apply_overall_snapshot(&bad_overall);
        let overall_message = store.state().error_message;
        assert!(overall_message.is_some());

        store.apply_daily_snapshot(&snapshot(vec![day_doc("2024-03-10")], 1));
        assert_eq!(store.state().error_message, overall_message);

        let empty = Document {
            id: "2024-03-11".to_string(),
            data: json!({ "date": "2024-03-11" }),
        };
        store.apply_daily_snapshot(&snapshot(vec![empty, day_doc("2024-03-10")], 1));
        let daily_message = store.state().error_message;
        assert_eq!(daily_message.as_deref(), Some("No readings recorded yet."));
        assert_ne!(daily_message, overall_message);

        store.apply_overall_snapshot(&QuerySnapshot {
            docs: vec![Document {
                id: "stats".to_string(),
                data: json!({ "correlation_peak_low_temperature": 0.5 }),
            }],
            changes: Vec::new(),
        });
        assert_eq!(store.state().error_message, daily_message);

        store.apply_daily_snapshot(&snapshot(vec![day_doc("2024-03-10")], 1));
        assert!(store.state().error_message.is_none());
    }

    #[test]
    fn test_rejected_priming_fetch_leaves_state_alone() {
        let store = store();
        let pushed = QuerySnapshot {
            docs: vec![Document {
                id: "stats".to_string(),
                data: json!({ "correlation_peak_low_temperature": 0.5 }),
            }],
            changes: Vec::new(),
        };
        store.apply_overall_snapshot(&pushed);
        let rx = store.watch();

        let bad = QuerySnapshot {
            docs: vec![Document {
                id: "stats".to_string(),
                data: json!({ "correlation_peak_low_temperature": "high" }),
            }],
            changes: Vec::new(),
        };
        assert!(!store.shared.apply(Feed::Overall, &bad, Origin::Fetch));
        store
            .shared
            .record_error(Feed::Overall, SourceError::Unavailable("offline".into()), Origin::Fetch);

        assert!(!rx.has_changed().unwrap());
        assert!(store.state().error_message.is_none());
        assert_eq!(store.state().correlation_peak_low_temperature, 0.5);
    }

    #[test]
    fn test_overall_snapshot() {
        let store = store();
        store.apply_overall_snapshot(&QuerySnapshot {
            docs: vec![Document {
                id: "stats".to_string(),
                data: json!({
                    "correlation_peak_low_temperature": 0.82,
                    "overall_hourly_average": { "0": 24.0, "1": 23.5, "2": 23.1 }
                }),
            }],
            changes: Vec::new(),
        });

        let state = store.state();
        assert_eq!(state.correlation_peak_low_temperature, 0.82);
        assert_eq!(state.overall_hourly_average, vec![24.0, 23.5, 23.1]);
        assert_eq!(state.adj_overall_hourly_average, vec![24.0, 23.5, 23.1, 24.0]);
    }

    #[test]
    fn test_empty_overall_snapshot_is_ignored() {
        let store = store();
        store.apply_overall_snapshot(&QuerySnapshot::default());
        assert!(store.state().overall_hourly_average.is_empty());
    }

    #[test]
    fn test_priming_fetch_does_not_override_push() {
        let store = store();
        store.apply_daily_snapshot(&snapshot(vec![day_doc("2024-03-10")], 1));

        let stale = snapshot(vec![day_doc("2024-03-09")], 0);
        assert!(!store.shared.apply(Feed::Daily, &stale, Origin::Fetch));

        assert_eq!(store.state().data_entries[0].date, "2024-03-10");
    }

    #[test]
    fn test_refresh_relative_time() {
        let minute = Arc::new(parking_lot::Mutex::new(13u32));
        let clock_minute = minute.clone();
        let clock: Clock = Arc::new(move || {
            NaiveDate::from_ymd_opt(2024, 3, 10)
                .and_then(|d| d.and_hms_opt(9, *clock_minute.lock(), 0))
                .unwrap()
        });
        let options = StoreOptions {
            relative_time_refresh: None,
            ..StoreOptions::default()
        }
        .with_clock(clock);
        let store = DataStore::new(MemorySource::new(), options);

        assert!(!store.refresh_relative_time());
        store.apply_daily_snapshot(&snapshot(vec![day_doc("2024-03-10")], 1));
        assert_eq!(store.state().relative_time, "3 minutes ago");

        *minute.lock() = 30;
        assert!(store.refresh_relative_time());
        assert_eq!(store.state().relative_time, "20 minutes ago");
        assert!(!store.refresh_relative_time());
    }
}
