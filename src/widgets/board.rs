//! In-memory chart board
//!
//! Keeps every widget's traces behind an async lock and records the
//! banners raised over it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, VecDeque};
use tokio::sync::RwLock;

use super::{Banner, TraceUpdate, WidgetHost};
use crate::refresh::{RefreshError, RefreshResult, Series};

/// Number of banners kept before the oldest is dropped
const DEFAULT_BANNER_HISTORY: usize = 16;

/// One data series of a chart
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trace {
    pub x: Vec<String>,
    pub y: Vec<f64>,
}

impl From<Trace> for Series {
    fn from(trace: Trace) -> Self {
        Series::new(trace.x, trace.y)
    }
}

/// A chart display surface addressed by id
#[derive(Debug, Clone)]
pub struct ChartWidget {
    pub id: String,
    pub traces: Vec<Trace>,
    /// Number of partial updates applied so far
    pub revision: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ChartWidget {
    /// Widget with a single empty trace
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            traces: vec![Trace::default()],
            revision: 0,
            updated_at: None,
        }
    }

    /// Trace 0 as a series, if present
    pub fn primary_series(&self) -> Option<Series> {
        self.traces.first().cloned().map(Series::from)
    }
}

/// Widget host backed by plain memory
pub struct ChartBoard {
    widgets: RwLock<BTreeMap<String, ChartWidget>>,
    banners: RwLock<VecDeque<Banner>>,
    banner_history: usize,
}

impl ChartBoard {
    pub fn new() -> Self {
        Self {
            widgets: RwLock::new(BTreeMap::new()),
            banners: RwLock::new(VecDeque::new()),
            banner_history: DEFAULT_BANNER_HISTORY,
        }
    }

    /// Board pre-populated with one empty widget per id
    pub fn with_widgets<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let widgets = ids
            .into_iter()
            .map(|id| {
                let widget = ChartWidget::new(id);
                (widget.id.clone(), widget)
            })
            .collect();

        Self {
            widgets: RwLock::new(widgets),
            ..Self::new()
        }
    }

    /// Add (or replace) a widget
    pub async fn insert(&self, widget: ChartWidget) {
        self.widgets.write().await.insert(widget.id.clone(), widget);
    }

    /// Snapshot of one widget
    pub async fn widget(&self, id: &str) -> Option<ChartWidget> {
        self.widgets.read().await.get(id).cloned()
    }

    /// Snapshot of every widget, ordered by id
    pub async fn widgets(&self) -> Vec<ChartWidget> {
        self.widgets.read().await.values().cloned().collect()
    }

    /// Banners raised so far, oldest first
    pub async fn banners(&self) -> Vec<Banner> {
        self.banners.read().await.iter().cloned().collect()
    }

    /// Banners still visible at `now`
    pub async fn active_banners(&self, now: DateTime<Utc>) -> Vec<Banner> {
        self.banners
            .read()
            .await
            .iter()
            .filter(|b| !b.is_expired(now))
            .cloned()
            .collect()
    }
}

impl Default for ChartBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WidgetHost for ChartBoard {
    async fn element_ids(&self) -> Vec<String> {
        self.widgets.read().await.keys().cloned().collect()
    }

    async fn restyle(&self, id: &str, update: TraceUpdate, traces: &[usize]) -> RefreshResult<()> {
        let mut widgets = self.widgets.write().await;
        let widget = widgets
            .get_mut(id)
            .ok_or_else(|| RefreshError::Widget(format!("unknown widget: {}", id)))?;

        // Check every index first so a bad one leaves the widget untouched
        if let Some(&bad) = traces.iter().find(|&&idx| idx >= widget.traces.len()) {
            return Err(RefreshError::Widget(format!(
                "{} has no trace {} ({} traces)",
                id,
                bad,
                widget.traces.len()
            )));
        }

        let TraceUpdate { x, y } = update;
        let mut xs = x.into_iter();
        let mut ys = y.into_iter();
        for &idx in traces {
            let trace = &mut widget.traces[idx];
            if let Some(x) = xs.next() {
                trace.x = x;
            }
            if let Some(y) = ys.next() {
                trace.y = y;
            }
        }

        widget.revision += 1;
        widget.updated_at = Some(Utc::now());
        tracing::debug!(widget = %id, revision = widget.revision, "Restyled widget");
        Ok(())
    }

    async fn show_banner(&self, banner: Banner) {
        tracing::info!(level = ?banner.level, "{}", banner.message);

        let mut banners = self.banners.write().await;
        if banners.len() == self.banner_history {
            banners.pop_front();
        }
        banners.push_back(banner);
    }
}
