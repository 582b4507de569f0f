//! Connectivity monitor
//!
//! Turns tick outcomes into online/offline transitions and raises a banner
//! on each transition.

use super::TickReport;
use crate::widgets::Banner;

pub const OFFLINE_MESSAGE: &str = "Connection lost. Working in offline mode.";
pub const RESTORED_MESSAGE: &str = "Connection restored!";

/// Whether the dashboard API is currently reachable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Online,
    Offline,
}

#[derive(Debug)]
pub struct ConnectivityMonitor {
    state: Connectivity,
}

impl ConnectivityMonitor {
    /// Starts online, same as a freshly loaded page
    pub fn new() -> Self {
        Self {
            state: Connectivity::Online,
        }
    }

    pub fn state(&self) -> Connectivity {
        self.state
    }

    /// Feed one tick; returns a banner when the state flips.
    pub fn observe(&mut self, report: &TickReport) -> Option<Banner> {
        let next = if report.updated() > 0 {
            Connectivity::Online
        } else if report.all_network_failures() {
            Connectivity::Offline
        } else {
            return None;
        };

        if next == self.state {
            return None;
        }
        self.state = next;

        match next {
            Connectivity::Offline => {
                tracing::warn!("Dashboard API unreachable, keeping last known data");
                Some(Banner::error(OFFLINE_MESSAGE))
            }
            Connectivity::Online => {
                tracing::info!("Dashboard API reachable again");
                Some(Banner::success(RESTORED_MESSAGE))
            }
        }
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}
