//! # EcoDash
//!
//! Headless client for the energy dashboard. Keeps the consumption,
//! emissions and forecast charts in sync with the dashboard API on a fixed
//! schedule, without reloading anything.
//!
//! ## Modules
//!
//! - [`refresh`]: the periodic refresh loop and its payload types
//! - [`client`]: HTTP client for the chart endpoints
//! - [`widgets`]: widget host abstraction and the in-memory chart board
//! - [`prefs`]: client-local preferences (theme)
//! - [`export`]: CSV export of chart series
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ecodash::{ChartBoard, ClientConfig, HttpChartApi, RefreshConfig, RefreshLoop, WidgetKind};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let api = Arc::new(HttpChartApi::new(ClientConfig::default())?);
//!     let board = Arc::new(ChartBoard::with_widgets(WidgetKind::ALL.iter().map(|k| k.id())));
//!
//!     let mut refresher = RefreshLoop::new(api, board.clone(), RefreshConfig::default());
//!     refresher.start("/dashboard");
//!
//!     tokio::signal::ctrl_c().await?;
//!     refresher.stop().await;
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod export;
pub mod format;
pub mod prefs;
pub mod refresh;
pub mod widgets;

pub use refresh::{
    ChartData, Connectivity, Forecast, LoopState, OverlapPolicy, RefreshConfig, RefreshError,
    RefreshLoop, RefreshResult, Series, TickReport, UpdateStatus, WidgetKind, WidgetOutcome,
};

pub use client::{ChartApi, ClientConfig, HttpChartApi};

pub use widgets::{Banner, BannerLevel, ChartBoard, ChartWidget, Trace, TraceUpdate, WidgetHost};

pub use prefs::{PreferenceStore, PrefsError, Theme, ThemeManager};

pub use export::{export_widget_csv, ExportError};

pub use format::{format_currency, format_number};

pub use config::{generate_default_config, Config, ConfigError, LoggingConfig};
