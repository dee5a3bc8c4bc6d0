//! Time-decay adjustment for cached arrival data.
//!
//! Cached trips carry arrival estimates that were true when they were
//! fetched. When an entry is reused `Δt` later, the estimates are rewritten
//! so they are still expressed relative to now: minutes-to-arrival counts
//! down and the age of live estimates grows. Any bus that would already
//! have left is removed. The caller always passes a clone; the cached
//! original is never touched.

use std::time::Duration;

use crate::domain::{NextTripsResult, RouteTrips, TripRecord};

/// Elapsed time as whole minutes, rounding half away from zero.
fn whole_minutes(elapsed: Duration) -> i32 {
    (elapsed.as_secs_f64() / 60.0).round() as i32
}

/// Elapsed time as exact fractional minutes.
fn exact_minutes(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() / 60.0
}

fn delta(elapsed: Duration) -> chrono::Duration {
    chrono::Duration::from_std(elapsed).unwrap_or_else(|_| chrono::Duration::zero())
}

/// Adjust a trip list reused `elapsed` after it was stored.
///
/// Arrival estimates drop by the rounded elapsed minutes and trips whose
/// estimate goes negative are removed. Ages of live estimates grow by the
/// exact elapsed minutes; an age of 0 or less marks schedule-only data and
/// is left untouched.
pub(crate) fn adjust_trips(trips: &mut Vec<TripRecord>, elapsed: Duration) {
    let minutes = whole_minutes(elapsed);
    let age_minutes = exact_minutes(elapsed);

    for trip in trips.iter_mut() {
        trip.adjusted_schedule_time -= minutes;
        if trip.adjustment_age > 0.0 {
            trip.adjustment_age += age_minutes;
        }
    }

    trips.retain(|trip| trip.adjusted_schedule_time >= 0);
}

/// Reuse one cached route-direction group: adjust its trips, advance its
/// processing timestamp by the elapsed time, and flag it as cached.
pub(crate) fn reuse_group(group: &mut RouteTrips, elapsed: Duration) {
    adjust_trips(&mut group.trips, elapsed);
    group.request_processing_time += delta(elapsed);
    group.cached = true;
}

/// Reuse a whole cached result (the cache-first read path): every group is
/// reused and the fetch time advances with it.
pub(crate) fn reuse_result(result: &mut NextTripsResult, elapsed: Duration) {
    for group in result.routes.iter_mut() {
        reuse_group(group, elapsed);
    }
    result.fetch_time += delta(elapsed);
}
