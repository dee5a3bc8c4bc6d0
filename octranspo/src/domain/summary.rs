//! Route summary types.

use serde::{Deserialize, Serialize};

use super::{RouteNo, StopNo};

/// One route-direction serving a stop, as listed by
/// `GetRouteSummaryForStop`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteInfo {
    /// Route number, e.g. "95".
    pub route_no: RouteNo,

    /// Direction identifier (0 or 1).
    pub direction_id: u8,

    /// Direction name, e.g. "Eastbound". The feed sometimes leaves this
    /// empty.
    pub direction: String,

    /// Headsign for this direction, e.g. "Orléans".
    pub heading: String,
}

/// The set of routes serving a stop.
///
/// `routes` is non-empty by construction: a reply listing zero routes is
/// reported as [`crate::error::Error::NoRoutesFound`] and never becomes a
/// summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    /// The stop the summary describes.
    pub stop: StopNo,

    /// Human-readable stop name, e.g. "BANK / FIFTH".
    pub stop_description: String,

    /// Routes serving the stop, in feed order. A route appears once per
    /// direction.
    pub routes: Vec<RouteInfo>,
}
