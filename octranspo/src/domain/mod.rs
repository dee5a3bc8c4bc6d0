//! Domain types for the OC Transpo client.
//!
//! This module contains the validated identifier types and the result
//! structures the client returns. Identifiers enforce their invariants at
//! construction time, so code that receives them can trust their validity.

mod route;
mod stop;
mod summary;
mod trips;

pub use route::{InvalidRouteNo, RouteNo};
pub use stop::{InvalidStopNo, StopNo};
pub use summary::{RouteInfo, RouteSummary};
pub use trips::{NextTripsResult, RouteTrips, TripAtStop, TripRecord};
