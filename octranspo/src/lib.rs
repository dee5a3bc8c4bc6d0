//! Client library for OC Transpo's live arrival feed.
//!
//! Wraps the "Live Next Bus Arrival Data Feed" (routes serving a stop,
//! upcoming trips for a route at a stop) with bounded caches and a
//! stale-data fallback: when the feed momentarily reports no trips for a
//! route that recently had some, the last cached trips are served
//! instead, with their arrival estimates aged to the present.

mod adjust;

pub mod api;
pub mod cache;
pub mod client;
pub mod domain;
pub mod error;
