//! Wire-shaped feed replies, before any cache handling.

use crate::domain::{RouteTrips, StopNo};

/// Reply to a next-trips request exactly as the feed answered it.
///
/// Every group has `cached` unset; the client layer decides what to merge
/// from the caches and assembles the final result.
#[derive(Debug, Clone, PartialEq)]
pub struct NextTripsData {
    /// Stop number echoed by the feed.
    pub stop: StopNo,

    /// Human-readable stop name (the feed's `StopLabel`).
    pub stop_description: String,

    /// One group per route direction the feed reported.
    pub routes: Vec<RouteTrips>,
}
