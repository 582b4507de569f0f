//! Chart widgets
//!
//! The refresh loop never touches a page directly. It goes through a
//! [`WidgetHost`], which can enumerate element ids, replace trace data in
//! place, and show status banners.
//!
//! - [`ChartBoard`]: in-memory host used by the CLI and tests

mod board;

pub use board::{ChartBoard, ChartWidget, Trace};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use crate::refresh::{RefreshResult, Series};

/// Partial update for one or more traces of a widget.
///
/// `x[n]` and `y[n]` replace the arrays of the n-th trace index passed
/// alongside the update.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TraceUpdate {
    pub x: Vec<Vec<String>>,
    pub y: Vec<Vec<f64>>,
}

impl TraceUpdate {
    /// Update carrying a single series, meant for one trace index
    pub fn single(series: Series) -> Self {
        Self {
            x: vec![series.x],
            y: vec![series.y],
        }
    }
}

/// Severity of a status banner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BannerLevel {
    Success,
    Error,
}

/// Transient status message shown over the dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Banner {
    pub level: BannerLevel,
    pub message: String,
    /// How long the banner stays visible
    pub duration: Duration,
    pub raised_at: DateTime<Utc>,
}

impl Banner {
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(BannerLevel::Success, message, Duration::from_millis(3000))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(BannerLevel::Error, message, Duration::from_millis(5000))
    }

    fn new(level: BannerLevel, message: impl Into<String>, duration: Duration) -> Self {
        Self {
            level,
            message: message.into(),
            duration,
            raised_at: Utc::now(),
        }
    }

    /// Whether the banner should already have been dismissed at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let shown_for = now.signed_duration_since(self.raised_at);
        shown_for
            .to_std()
            .map(|elapsed| elapsed >= self.duration)
            .unwrap_or(false)
    }
}

/// Surface that owns the chart widgets
#[async_trait]
pub trait WidgetHost: Send + Sync {
    /// Ids of every element currently on the page
    async fn element_ids(&self) -> Vec<String>;

    /// Replace x/y data of the listed traces of widget `id`
    async fn restyle(&self, id: &str, update: TraceUpdate, traces: &[usize]) -> RefreshResult<()>;

    /// Show a status banner
    async fn show_banner(&self, banner: Banner) {
        tracing::info!(level = ?banner.level, "{}", banner.message);
    }
}
