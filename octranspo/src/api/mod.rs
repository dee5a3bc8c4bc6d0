//! Live feed binding.
//!
//! The feed ("Live Next Bus Arrival Data Feed") answers two resources:
//! `GetRouteSummaryForStop` lists the routes serving a stop, and
//! `GetNextTripsForStop` lists the upcoming trips for one route at a stop.
//! Both take form-encoded credentials and identifiers and answer SOAP XML.
//!
//! The rest of the crate reaches the feed only through [`TransitApi`], so
//! the caching layer can be driven by [`MockApi`] fixtures instead of live
//! HTTP.

mod client;
mod mock;
mod types;
mod xml;

pub use client::{ApiClient, ApiConfig};
pub use mock::MockApi;
pub use types::NextTripsData;

use async_trait::async_trait;

use crate::domain::{RouteNo, RouteSummary, StopNo};
use crate::error::Error;

/// Access to the arrival feed.
///
/// This abstraction allows the caching layer to be tested with scripted
/// replies.
#[async_trait]
pub trait TransitApi: Send + Sync {
    /// Get the routes serving a stop.
    async fn get_route_summary(&self, stop: StopNo) -> Result<RouteSummary, Error>;

    /// Get the upcoming trips for one route at a stop, exactly as the feed
    /// reports them.
    async fn get_next_trips(&self, stop: StopNo, route: RouteNo) -> Result<NextTripsData, Error>;
}
