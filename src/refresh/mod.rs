//! Dashboard Refresh Loop
//!
//! Keeps the consumption, emissions and forecast charts in sync with the
//! dashboard API without reloading the page.
//!
//! On start the loop checks the current page path against the dashboard
//! route. Off the route nothing is scheduled. On the route a timer fires
//! every period (first tick one full period after start). Each tick walks the
//! host's element ids ending in `Chart`, fetches the payload for every id it
//! recognises and replaces trace 0 of that widget. A failure in one widget is
//! logged and recorded; it never affects the other widgets or the timer.

mod error;
mod monitor;
mod payload;

pub use error::{RefreshError, RefreshResult};
pub use monitor::{Connectivity, ConnectivityMonitor, OFFLINE_MESSAGE, RESTORED_MESSAGE};
pub use payload::{ChartData, Endpoint, Forecast, Series, WidgetKind, CHART_SUFFIX};

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::client::ChartApi;
use crate::widgets::{TraceUpdate, WidgetHost};

/// Trace replaced by every chart update
const PRIMARY_TRACE: [usize; 1] = [0];

/// What to do when a widget's previous update is still in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Issue the request anyway; the last response to land wins
    #[default]
    Allow,
    /// Skip that widget for this tick
    Skip,
}

/// Refresh loop configuration
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Page path the loop is active on
    pub route: String,
    /// Time between ticks
    pub interval: Duration,
    pub overlap: OverlapPolicy,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            route: "/dashboard".to_string(),
            interval: Duration::from_millis(300_000),
            overlap: OverlapPolicy::Allow,
        }
    }
}

/// Lifecycle of a refresh loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Not started, or started off the dashboard route
    Idle,
    /// Timer active
    Polling,
    /// Stopped for good
    Stopped,
}

/// Result of one widget update within a tick
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateStatus {
    Updated { points: usize },
    Failed(RefreshError),
    /// Previous update still in flight under [`OverlapPolicy::Skip`]
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WidgetOutcome {
    pub kind: WidgetKind,
    pub status: UpdateStatus,
}

/// Everything one tick did
#[derive(Debug, Clone)]
pub struct TickReport {
    /// 1-based tick number
    pub tick: u64,
    pub outcomes: Vec<WidgetOutcome>,
    pub finished_at: DateTime<Utc>,
}

impl TickReport {
    pub fn new(tick: u64, outcomes: Vec<WidgetOutcome>) -> Self {
        Self {
            tick,
            outcomes,
            finished_at: Utc::now(),
        }
    }

    pub fn updated(&self) -> usize {
        self.count(|s| matches!(s, UpdateStatus::Updated { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, UpdateStatus::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, UpdateStatus::Skipped))
    }

    /// True when at least one update ran and every one of them failed to
    /// reach the API.
    pub fn all_network_failures(&self) -> bool {
        let mut attempted = self
            .outcomes
            .iter()
            .filter(|o| o.status != UpdateStatus::Skipped)
            .peekable();

        attempted.peek().is_some()
            && attempted.all(|o| matches!(&o.status, UpdateStatus::Failed(e) if e.is_network()))
    }

    pub fn outcome(&self, kind: WidgetKind) -> Option<&UpdateStatus> {
        self.outcomes
            .iter()
            .find(|o| o.kind == kind)
            .map(|o| &o.status)
    }

    fn count(&self, pred: impl Fn(&UpdateStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

/// Periodic refresher for the dashboard charts.
///
/// Owns its timer task. Call [`RefreshLoop::stop`] to end it; dropping the
/// loop aborts the timer as well.
pub struct RefreshLoop {
    inner: Arc<Inner>,
    config: RefreshConfig,
    state: LoopState,
    timer: Option<JoinHandle<()>>,
    shutdown: Option<watch::Sender<bool>>,
}

impl RefreshLoop {
    pub fn new(api: Arc<dyn ChartApi>, host: Arc<dyn WidgetHost>, config: RefreshConfig) -> Self {
        let inner = Inner {
            api,
            host,
            overlap: config.overlap,
            ticks: AtomicU64::new(0),
            in_flight: std::sync::Mutex::new(HashSet::new()),
            monitor: Mutex::new(ConnectivityMonitor::new()),
            last_report: RwLock::new(None),
        };

        Self {
            inner: Arc::new(inner),
            config,
            state: LoopState::Idle,
            timer: None,
            shutdown: None,
        }
    }

    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Number of ticks started so far, timer-driven or manual
    pub fn tick_count(&self) -> u64 {
        self.inner.ticks.load(Ordering::SeqCst)
    }

    /// Report of the most recently finished tick
    pub async fn last_report(&self) -> Option<TickReport> {
        self.inner.last_report.read().await.clone()
    }

    pub async fn connectivity(&self) -> Connectivity {
        self.inner.monitor.lock().await.state()
    }

    /// Start polling if `current_path` is the dashboard route.
    ///
    /// Returns whether the loop is polling afterwards. Must be called from
    /// within a tokio runtime.
    pub fn start(&mut self, current_path: &str) -> bool {
        match self.state {
            LoopState::Polling => return true,
            LoopState::Stopped => {
                tracing::warn!("Refresh loop already stopped, not restarting");
                return false;
            }
            LoopState::Idle => {}
        }

        if current_path != self.config.route {
            tracing::debug!(
                path = %current_path,
                route = %self.config.route,
                "Not on the dashboard route, refresh loop stays idle"
            );
            return false;
        }

        // interval_at panics on a zero period
        let period = self.config.interval.max(Duration::from_millis(1));
        let (tx, rx) = watch::channel(false);
        self.timer = Some(spawn_timer(Arc::clone(&self.inner), period, rx));
        self.shutdown = Some(tx);
        self.state = LoopState::Polling;

        tracing::info!(
            interval_ms = period.as_millis() as u64,
            overlap = ?self.config.overlap,
            "Dashboard refresh loop started"
        );
        true
    }

    /// Run one tick right now, outside the timer schedule.
    pub async fn refresh_now(&self) -> TickReport {
        self.inner.run_tick().await
    }

    /// Stop the timer. Updates already in flight are left to finish.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(true);
        }

        if let Some(handle) = self.timer.take() {
            if let Err(e) = handle.await {
                tracing::warn!("Refresh timer ended abnormally: {}", e);
            }
        }

        if self.state != LoopState::Stopped {
            self.state = LoopState::Stopped;
            tracing::info!(ticks = self.tick_count(), "Dashboard refresh loop stopped");
        }
    }
}

impl Drop for RefreshLoop {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
    }
}

fn spawn_timer(
    inner: Arc<Inner>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.changed() => break,
                _ = interval.tick() => {
                    // Ticks run detached so a slow one never delays the next
                    let inner = Arc::clone(&inner);
                    tokio::spawn(async move {
                        inner.run_tick().await;
                    });
                }
            }
        }
    })
}

/// State shared between the loop handle, its timer and running ticks
struct Inner {
    api: Arc<dyn ChartApi>,
    host: Arc<dyn WidgetHost>,
    overlap: OverlapPolicy,
    ticks: AtomicU64,
    in_flight: std::sync::Mutex<HashSet<WidgetKind>>,
    monitor: Mutex<ConnectivityMonitor>,
    last_report: RwLock<Option<TickReport>>,
}

impl Inner {
    async fn run_tick(&self) -> TickReport {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;

        let mut updates = Vec::new();
        for id in self.host.element_ids().await {
            if !id.ends_with(CHART_SUFFIX) {
                continue;
            }
            match WidgetKind::from_id(&id) {
                Some(kind) => updates.push(self.update_widget(kind)),
                None => tracing::trace!(widget = %id, "No update routine for chart, skipping"),
            }
        }

        let report = TickReport::new(tick, join_all(updates).await);
        tracing::info!(
            tick,
            updated = report.updated(),
            failed = report.failed(),
            skipped = report.skipped(),
            "Dashboard refresh finished"
        );

        let banner = self.monitor.lock().await.observe(&report);
        if let Some(banner) = banner {
            self.host.show_banner(banner).await;
        }

        *self.last_report.write().await = Some(report.clone());
        report
    }

    async fn update_widget(&self, kind: WidgetKind) -> WidgetOutcome {
        let _guard = match self.overlap {
            OverlapPolicy::Allow => None,
            OverlapPolicy::Skip => match InFlightGuard::claim(&self.in_flight, kind) {
                Some(guard) => Some(guard),
                None => {
                    tracing::debug!(widget = %kind, "Previous update still in flight, skipping");
                    return WidgetOutcome {
                        kind,
                        status: UpdateStatus::Skipped,
                    };
                }
            },
        };

        let status = match self.fetch_and_apply(kind).await {
            Ok(points) => UpdateStatus::Updated { points },
            Err(e) => {
                tracing::warn!(widget = %kind, error = %e, "Error updating chart");
                UpdateStatus::Failed(e)
            }
        };

        WidgetOutcome { kind, status }
    }

    async fn fetch_and_apply(&self, kind: WidgetKind) -> RefreshResult<usize> {
        let series = match kind.endpoint() {
            Endpoint::DailyChartData => {
                let data = self.api.daily_chart_data().await?;
                match kind {
                    WidgetKind::Emissions => data.emissions_series(),
                    _ => data.consumption_series(),
                }
            }
            Endpoint::Forecast => self.api.forecast().await?.series(),
        };

        let points = series.len();
        self.host
            .restyle(kind.id(), TraceUpdate::single(series), &PRIMARY_TRACE)
            .await?;
        Ok(points)
    }
}

/// Marks a widget as having an update in flight until dropped
struct InFlightGuard<'a> {
    set: &'a std::sync::Mutex<HashSet<WidgetKind>>,
    kind: WidgetKind,
}

impl<'a> InFlightGuard<'a> {
    fn claim(set: &'a std::sync::Mutex<HashSet<WidgetKind>>, kind: WidgetKind) -> Option<Self> {
        let mut in_flight = set.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !in_flight.insert(kind) {
            return None;
        }
        // Release before the guard exists; its Drop takes the same lock.
        drop(in_flight);
        Some(Self { set, kind })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.set.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        in_flight.remove(&self.kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widgets::{BannerLevel, ChartBoard};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    const PERIOD: Duration = Duration::from_millis(300_000);

    /// Scripted API: queued responses are used first, then the defaults.
    struct MockApi {
        daily: std::sync::Mutex<VecDeque<RefreshResult<ChartData>>>,
        default_daily: RefreshResult<ChartData>,
        default_forecast: RefreshResult<Forecast>,
        delay: Option<Duration>,
        daily_calls: AtomicUsize,
        forecast_calls: AtomicUsize,
    }

    impl MockApi {
        fn new(daily: RefreshResult<ChartData>, forecast: RefreshResult<Forecast>) -> Self {
            Self {
                daily: std::sync::Mutex::new(VecDeque::new()),
                default_daily: daily,
                default_forecast: forecast,
                delay: None,
                daily_calls: AtomicUsize::new(0),
                forecast_calls: AtomicUsize::new(0),
            }
        }

        fn healthy() -> Self {
            Self::new(Ok(daily_payload()), Ok(forecast_payload()))
        }

        fn unreachable() -> Self {
            let down = RefreshError::Network("connection refused".to_string());
            Self::new(Err(down.clone()), Err(down))
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn queue_daily(&self, response: RefreshResult<ChartData>) {
            self.daily.lock().unwrap().push_back(response);
        }

        fn calls(&self) -> usize {
            self.daily_calls.load(Ordering::SeqCst) + self.forecast_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChartApi for MockApi {
        async fn daily_chart_data(&self) -> RefreshResult<ChartData> {
            self.daily_calls.fetch_add(1, Ordering::SeqCst);
            let queued = self.daily.lock().unwrap().pop_front();
            if let Some(delay) = self.delay {
                time::sleep(delay).await;
            }
            queued.unwrap_or_else(|| self.default_daily.clone())
        }

        async fn forecast(&self) -> RefreshResult<Forecast> {
            self.forecast_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                time::sleep(delay).await;
            }
            self.default_forecast.clone()
        }
    }

    fn daily_payload() -> ChartData {
        ChartData {
            labels: vec!["2024-03-01".into(), "2024-03-02".into()],
            consumption: vec![3.5, 4.25],
            emissions: vec![1.6, 1.9],
        }
    }

    fn forecast_payload() -> Forecast {
        Forecast {
            dates: vec!["2024-03-03".into(), "2024-03-04".into(), "2024-03-05".into()],
            forecast: vec![4.0, 4.1, 3.8],
            confidence: vec![0.85; 3],
        }
    }

    fn dashboard_board() -> Arc<ChartBoard> {
        Arc::new(ChartBoard::with_widgets(
            WidgetKind::ALL.iter().map(|k| k.id()),
        ))
    }

    fn refresh_loop(api: Arc<MockApi>, board: Arc<ChartBoard>, overlap: OverlapPolicy) -> RefreshLoop {
        RefreshLoop::new(
            api,
            board,
            RefreshConfig {
                overlap,
                ..RefreshConfig::default()
            },
        )
    }

    async fn series_of(board: &ChartBoard, id: &str) -> Series {
        board.widget(id).await.unwrap().primary_series().unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = RefreshConfig::default();
        assert_eq!(config.route, "/dashboard");
        assert_eq!(config.interval, PERIOD);
        assert_eq!(config.overlap, OverlapPolicy::Allow);
    }

    #[tokio::test]
    async fn test_tick_updates_all_three_charts() {
        let api = Arc::new(MockApi::healthy());
        let board = dashboard_board();
        let refresher = refresh_loop(api.clone(), board.clone(), OverlapPolicy::Allow);

        let report = refresher.refresh_now().await;
        assert_eq!(report.tick, 1);
        assert_eq!(report.updated(), 3);

        let payload = daily_payload();
        let consumption = series_of(&board, "consumptionChart").await;
        assert_eq!(consumption.x, payload.labels);
        assert_eq!(consumption.y, payload.consumption);
        assert_eq!(series_of(&board, "emissionsChart").await.y, payload.emissions);
        assert_eq!(
            series_of(&board, "forecastChart").await,
            forecast_payload().series()
        );

        // One independent request per widget, no sharing of the daily body
        assert_eq!(api.daily_calls.load(Ordering::SeqCst), 2);
        assert_eq!(api.forecast_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_isolated_to_one_widget() {
        let api = Arc::new(MockApi::healthy());
        // Widgets update in id order, so the second daily call is emissions
        api.queue_daily(Ok(daily_payload()));
        api.queue_daily(Err(RefreshError::Network("reset by peer".to_string())));

        let board = dashboard_board();
        let refresher = refresh_loop(api, board.clone(), OverlapPolicy::Allow);

        let report = refresher.refresh_now().await;
        assert_eq!(report.updated(), 2);
        assert!(matches!(
            report.outcome(WidgetKind::Emissions),
            Some(UpdateStatus::Failed(RefreshError::Network(_)))
        ));

        assert_eq!(series_of(&board, "consumptionChart").await.len(), 2);
        assert_eq!(series_of(&board, "forecastChart").await.len(), 3);
        assert!(series_of(&board, "emissionsChart").await.is_empty());
    }

    #[tokio::test]
    async fn test_unmatched_ids_are_skipped() {
        let api = Arc::new(MockApi::healthy());
        let board = Arc::new(ChartBoard::with_widgets([
            "consumptionChart",
            "somethingElseChart",
            "statsCard",
        ]));
        let refresher = refresh_loop(api.clone(), board.clone(), OverlapPolicy::Allow);

        let report = refresher.refresh_now().await;
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(api.calls(), 1);

        let other = board.widget("somethingElseChart").await.unwrap();
        assert_eq!(other.revision, 0);
        assert!(other.traces[0].x.is_empty());
    }

    #[tokio::test]
    async fn test_second_payload_replaces_first() {
        let api = Arc::new(MockApi::healthy());
        api.queue_daily(Ok(daily_payload()));
        api.queue_daily(Ok(ChartData {
            labels: vec!["2024-04-01".into()],
            consumption: vec![9.0],
            emissions: vec![4.5],
        }));

        let board = Arc::new(ChartBoard::with_widgets(["consumptionChart"]));
        let refresher = refresh_loop(api, board.clone(), OverlapPolicy::Allow);

        refresher.refresh_now().await;
        refresher.refresh_now().await;

        let series = series_of(&board, "consumptionChart").await;
        assert_eq!(series.x, vec!["2024-04-01"]);
        assert_eq!(series.y, vec![9.0]);
    }

    #[tokio::test]
    async fn test_same_payload_is_idempotent() {
        let api = Arc::new(MockApi::healthy());
        let board = dashboard_board();
        let refresher = refresh_loop(api, board.clone(), OverlapPolicy::Allow);

        refresher.refresh_now().await;
        let first = series_of(&board, "forecastChart").await;
        refresher.refresh_now().await;
        assert_eq!(series_of(&board, "forecastChart").await, first);
    }

    #[tokio::test]
    async fn test_restyle_failure_is_reported() {
        struct BrokenHost;

        #[async_trait]
        impl WidgetHost for BrokenHost {
            async fn element_ids(&self) -> Vec<String> {
                vec!["forecastChart".to_string()]
            }

            async fn restyle(
                &self,
                id: &str,
                _update: TraceUpdate,
                _traces: &[usize],
            ) -> RefreshResult<()> {
                Err(RefreshError::Widget(format!("{} detached", id)))
            }
        }

        let refresher = RefreshLoop::new(
            Arc::new(MockApi::healthy()),
            Arc::new(BrokenHost),
            RefreshConfig::default(),
        );
        let report = refresher.refresh_now().await;
        assert!(matches!(
            report.outcome(WidgetKind::Forecast),
            Some(UpdateStatus::Failed(RefreshError::Widget(_)))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_tick_before_interval() {
        let api = Arc::new(MockApi::healthy());
        let mut refresher = refresh_loop(api.clone(), dashboard_board(), OverlapPolicy::Allow);

        assert!(refresher.start("/dashboard"));
        assert_eq!(refresher.state(), LoopState::Polling);

        time::sleep(PERIOD - Duration::from_millis(1)).await;
        assert_eq!(refresher.tick_count(), 0);
        assert_eq!(api.calls(), 0);

        time::sleep(Duration::from_millis(2)).await;
        assert_eq!(refresher.tick_count(), 1);

        time::sleep(PERIOD - Duration::from_millis(2)).await;
        assert_eq!(refresher.tick_count(), 1);

        time::sleep(Duration::from_millis(2)).await;
        assert_eq!(refresher.tick_count(), 2);
        assert_eq!(api.calls(), 6);

        refresher.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_off_route_never_ticks() {
        let api = Arc::new(MockApi::healthy());
        let mut refresher = refresh_loop(api.clone(), dashboard_board(), OverlapPolicy::Allow);

        assert!(!refresher.start("/login"));
        assert_eq!(refresher.state(), LoopState::Idle);

        time::sleep(PERIOD * 10).await;
        assert_eq!(refresher.tick_count(), 0);
        assert_eq!(api.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_polling() {
        let api = Arc::new(MockApi::healthy());
        let mut refresher = refresh_loop(api, dashboard_board(), OverlapPolicy::Allow);

        refresher.start("/dashboard");
        time::sleep(PERIOD + Duration::from_millis(1)).await;
        assert_eq!(refresher.tick_count(), 1);

        refresher.stop().await;
        assert_eq!(refresher.state(), LoopState::Stopped);

        time::sleep(PERIOD * 5).await;
        assert_eq!(refresher.tick_count(), 1);

        // A stopped loop cannot be revived
        assert!(!refresher.start("/dashboard"));
        assert_eq!(refresher.state(), LoopState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_ticks_allowed_by_default() {
        let api = Arc::new(MockApi::healthy().with_delay(PERIOD + PERIOD / 3));
        let board = Arc::new(ChartBoard::with_widgets(["consumptionChart"]));
        let mut refresher = refresh_loop(api.clone(), board, OverlapPolicy::Allow);

        refresher.start("/dashboard");
        time::sleep(PERIOD * 2 + Duration::from_millis(1)).await;

        // Tick 1 still in flight when tick 2 fires; both issued a request
        assert_eq!(refresher.tick_count(), 2);
        assert_eq!(api.calls(), 2);

        refresher.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_policy_skips_in_flight_widget() {
        let api = Arc::new(MockApi::healthy().with_delay(PERIOD + PERIOD / 3));
        let board = Arc::new(ChartBoard::with_widgets(["consumptionChart"]));
        let mut refresher = refresh_loop(api.clone(), board.clone(), OverlapPolicy::Skip);

        refresher.start("/dashboard");
        time::sleep(PERIOD * 2 + Duration::from_millis(1)).await;

        assert_eq!(refresher.tick_count(), 2);
        assert_eq!(api.calls(), 1);
        let report = refresher.last_report().await.unwrap();
        assert_eq!(report.tick, 2);
        assert_eq!(report.outcome(WidgetKind::Consumption), Some(&UpdateStatus::Skipped));

        // Tick 1 lands at 1.33 periods; tick 3 can fetch again
        time::sleep(PERIOD).await;
        assert_eq!(api.calls(), 2);
        assert_eq!(board.widget("consumptionChart").await.unwrap().revision, 1);

        refresher.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_tick_keeps_timer_running() {
        let api = Arc::new(MockApi::healthy());
        api.queue_daily(Err(RefreshError::Network("connection reset".to_string())));
        let board = Arc::new(ChartBoard::with_widgets(["consumptionChart"]));
        let mut refresher = refresh_loop(api.clone(), board.clone(), OverlapPolicy::Allow);

        refresher.start("/dashboard");
        time::sleep(PERIOD + Duration::from_millis(1)).await;
        let first = refresher.last_report().await.unwrap();
        assert_eq!(first.failed(), 1);
        assert_eq!(board.widget("consumptionChart").await.unwrap().revision, 0);

        time::sleep(PERIOD * 2).await;
        assert_eq!(refresher.tick_count(), 3);
        assert_eq!(api.calls(), 3);

        let last = refresher.last_report().await.unwrap();
        assert_eq!(last.tick, 3);
        assert_eq!(
            last.outcome(WidgetKind::Consumption),
            Some(&UpdateStatus::Updated { points: 2 })
        );
        assert_eq!(series_of(&board, "consumptionChart").await.y, daily_payload().consumption);

        refresher.stop().await;
    }

    #[test]
    fn test_in_flight_guard_claim_release() {
        let set = std::sync::Mutex::new(HashSet::new());

        let first = InFlightGuard::claim(&set, WidgetKind::Consumption);
        assert!(first.is_some());
        assert!(InFlightGuard::claim(&set, WidgetKind::Consumption).is_none());

        // Other kinds are tracked separately
        let forecast = InFlightGuard::claim(&set, WidgetKind::Forecast);
        assert!(forecast.is_some());

        drop(first);
        assert!(!set.lock().unwrap().contains(&WidgetKind::Consumption));
        assert!(InFlightGuard::claim(&set, WidgetKind::Consumption).is_some());

        // The temporary guard above is already released
        assert_eq!(set.lock().unwrap().len(), 1);
        drop(forecast);
        assert!(set.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_connectivity_banners() {
        let board = dashboard_board();
        let refresher = refresh_loop(Arc::new(MockApi::unreachable()), board.clone(), OverlapPolicy::Allow);

        let report = refresher.refresh_now().await;
        assert!(report.all_network_failures());
        refresher.refresh_now().await;

        assert_eq!(refresher.connectivity().await, Connectivity::Offline);
        let banners = board.banners().await;
        assert_eq!(banners.len(), 1);
        assert_eq!(banners[0].level, BannerLevel::Error);
        assert_eq!(banners[0].message, OFFLINE_MESSAGE);
    }

    #[tokio::test]
    async fn test_connection_restored_banner() {
        let api = Arc::new(MockApi::healthy());
        let down = || Err(RefreshError::Network("unreachable".to_string()));
        api.queue_daily(down());
        api.queue_daily(down());

        // Only daily widgets, so the first tick fails completely
        let board = Arc::new(ChartBoard::with_widgets(["consumptionChart", "emissionsChart"]));
        let refresher = refresh_loop(api, board.clone(), OverlapPolicy::Allow);

        refresher.refresh_now().await;
        refresher.refresh_now().await;

        let banners = board.banners().await;
        let messages: Vec<_> = banners.iter().map(|b| b.message.as_str()).collect();
        assert_eq!(messages, vec![OFFLINE_MESSAGE, RESTORED_MESSAGE]);
        assert_eq!(refresher.connectivity().await, Connectivity::Online);
    }

    #[test]
    fn test_overlap_policy_serde() {
        let policy: OverlapPolicy = serde_json::from_str("\"skip\"").unwrap();
        assert_eq!(policy, OverlapPolicy::Skip);
        assert_eq!(serde_json::to_string(&OverlapPolicy::Allow).unwrap(), "\"allow\"");
    }
}
