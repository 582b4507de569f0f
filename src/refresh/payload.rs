//! Dashboard API payloads
//!
//! Typed bodies for the two endpoints the refresh loop reads, and the
//! mapping from chart widget ids to the series they display.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::{RefreshError, RefreshResult};

/// Suffix shared by every chart element id on the dashboard page
pub const CHART_SUFFIX: &str = "Chart";

/// Body of `GET /api/chart_data?type=daily`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    /// Day labels, `YYYY-MM-DD`
    pub labels: Vec<String>,
    /// Energy consumed per day (kWh)
    pub consumption: Vec<f64>,
    /// Carbon emitted per day (kg CO2)
    pub emissions: Vec<f64>,
}

impl ChartData {
    /// Reject bodies whose series do not line up with the labels.
    pub fn validate(self) -> RefreshResult<Self> {
        check_len("consumption", self.labels.len(), self.consumption.len())?;
        check_len("emissions", self.labels.len(), self.emissions.len())?;
        Ok(self)
    }

    pub fn consumption_series(&self) -> Series {
        Series::new(self.labels.clone(), self.consumption.clone())
    }

    pub fn emissions_series(&self) -> Series {
        Series::new(self.labels.clone(), self.emissions.clone())
    }
}

/// Body of `GET /api/forecast`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    /// Forecast days, `YYYY-MM-DD`
    pub dates: Vec<String>,
    /// Predicted consumption per day (kWh)
    pub forecast: Vec<f64>,
    /// Model confidence per day; not charted
    #[serde(default)]
    pub confidence: Vec<f64>,
}

impl Forecast {
    pub fn validate(self) -> RefreshResult<Self> {
        check_len("forecast", self.dates.len(), self.forecast.len())?;
        Ok(self)
    }

    pub fn series(&self) -> Series {
        Series::new(self.dates.clone(), self.forecast.clone())
    }
}

fn check_len(field: &str, expected: usize, actual: usize) -> RefreshResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(RefreshError::Parse(format!(
            "{} has {} values for {} labels",
            field, actual, expected
        )))
    }
}

/// One x/y series ready to be written into a chart trace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub x: Vec<String>,
    pub y: Vec<f64>,
}

impl Series {
    pub fn new(x: Vec<String>, y: Vec<f64>) -> Self {
        Self { x, y }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Which endpoint a widget reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    DailyChartData,
    Forecast,
}

impl Endpoint {
    /// Path and query relative to the API base URL
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::DailyChartData => "/api/chart_data?type=daily",
            Endpoint::Forecast => "/api/forecast",
        }
    }
}

/// The three chart widgets the refresh loop knows how to update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WidgetKind {
    Consumption,
    Emissions,
    Forecast,
}

impl WidgetKind {
    pub const ALL: [WidgetKind; 3] = [
        WidgetKind::Consumption,
        WidgetKind::Emissions,
        WidgetKind::Forecast,
    ];

    /// Exact id match; anything else is not ours to update.
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "consumptionChart" => Some(WidgetKind::Consumption),
            "emissionsChart" => Some(WidgetKind::Emissions),
            "forecastChart" => Some(WidgetKind::Forecast),
            _ => None,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            WidgetKind::Consumption => "consumptionChart",
            WidgetKind::Emissions => "emissionsChart",
            WidgetKind::Forecast => "forecastChart",
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        match self {
            WidgetKind::Consumption | WidgetKind::Emissions => Endpoint::DailyChartData,
            WidgetKind::Forecast => Endpoint::Forecast,
        }
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
