//! Trip and arrival types.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{RouteNo, StopNo};

/// A single upcoming trip (one bus) on a route direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    /// Headsign of the trip, e.g. "Barrhaven Centre".
    pub destination: String,

    /// Scheduled start time of the trip at its first stop, exactly as the
    /// feed sends it. Kept as a raw string: the schedule uses GTFS-style
    /// times that can exceed 24:00 for trips past midnight.
    pub start_time: String,

    /// Estimated minutes until the bus reaches the stop. Counts down when
    /// cached data is reused; once it goes negative the bus has gone and
    /// the trip is filtered out.
    pub adjusted_schedule_time: i32,

    /// Minutes since the estimate was last corrected from GPS data.
    /// Greater than zero means a live estimate; the feed sends -1 (or 0)
    /// for schedule-only trips.
    pub adjustment_age: f64,

    /// Whether this is the last trip of the day on this route direction.
    pub last_trip: bool,

    /// Bus type code, e.g. "4LB - DD". Empty when the feed omits it.
    pub bus_type: String,

    /// Last reported speed, if the bus has a GPS fix.
    pub gps_speed: Option<f64>,

    /// Last reported latitude, if the bus has a GPS fix.
    pub latitude: Option<f64>,

    /// Last reported longitude, if the bus has a GPS fix.
    pub longitude: Option<f64>,
}

impl TripRecord {
    /// Whether the arrival estimate comes from live GPS data.
    pub fn live(&self) -> bool {
        self.adjustment_age > 0.0
    }
}

/// Trips for one direction of one route at a stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteTrips {
    /// True when this group was served from cache rather than the live
    /// reply.
    pub cached: bool,

    /// Route number, e.g. "95".
    pub route_no: RouteNo,

    /// Destination label of the direction, e.g. "Orléans".
    pub route_label: String,

    /// Direction name, e.g. "Eastbound". The feed sometimes leaves this
    /// empty.
    pub direction: String,

    /// Upstream processing timestamp, in Ottawa local time. Advanced by the
    /// elapsed age whenever cached data is reused.
    pub request_processing_time: NaiveDateTime,

    /// Upcoming trips, soonest first as sent by the feed.
    pub trips: Vec<TripRecord>,
}

/// Everything `get_next_trips_for_stop` returns for one stop and route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextTripsResult {
    /// The stop the result describes.
    pub stop: StopNo,

    /// Human-readable stop name.
    pub stop_description: String,

    /// One group per route direction.
    pub routes: Vec<RouteTrips>,

    /// When this client fetched the data. Advanced by the elapsed age
    /// whenever a cached result is reused.
    pub fetch_time: DateTime<Utc>,
}

/// One row of the flattened arrivals listing built by
/// `simple_get_next_trips_for_stop`: a trip merged with its stop and
/// route-direction context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripAtStop {
    pub stop: StopNo,
    pub stop_description: String,
    pub route_no: RouteNo,
    pub route_label: String,
    pub direction: String,
    pub destination: String,
    pub start_time: String,

    /// Minutes until arrival (the trip's adjusted schedule time).
    pub arrival_in_minutes: i32,

    /// True when the estimate comes from live GPS data.
    pub live: bool,

    /// True when the trips for this group came from cache.
    pub cached: bool,

    pub last_trip: bool,
    pub bus_type: String,
    pub gps_speed: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl TripAtStop {
    /// Flatten one trip with its stop and route-direction context.
    pub fn from_trip(
        stop: StopNo,
        stop_description: &str,
        group: &RouteTrips,
        trip: TripRecord,
    ) -> Self {
        Self {
            stop,
            stop_description: stop_description.to_string(),
            route_no: group.route_no,
            route_label: group.route_label.clone(),
            direction: group.direction.clone(),
            arrival_in_minutes: trip.adjusted_schedule_time,
            live: trip.live(),
            cached: group.cached,
            destination: trip.destination,
            start_time: trip.start_time,
            last_trip: trip.last_trip,
            bus_type: trip.bus_type,
            gps_speed: trip.gps_speed,
            latitude: trip.latitude,
            longitude: trip.longitude,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn make_trip(adjusted_schedule_time: i32, adjustment_age: f64) -> TripRecord {
        TripRecord {
            destination: "Orléans".to_string(),
            start_time: "21:00".to_string(),
            adjusted_schedule_time,
            adjustment_age,
            last_trip: false,
            bus_type: "4LB - DD".to_string(),
            gps_speed: Some(62.8),
            latitude: Some(45.423),
            longitude: Some(-75.698),
        }
    }

    fn make_group() -> RouteTrips {
        RouteTrips {
            cached: false,
            route_no: RouteNo::parse("95").unwrap(),
            route_label: "Orléans".to_string(),
            direction: "Eastbound".to_string(),
            request_processing_time: NaiveDate::from_ymd_opt(2013, 6, 14)
                .unwrap()
                .and_hms_opt(21, 15, 13)
                .unwrap(),
            trips: Vec::new(),
        }
    }

    #[test]
    fn live_requires_positive_age() {
        assert!(make_trip(5, 0.35).live());
        assert!(!make_trip(5, 0.0).live());
        assert!(!make_trip(5, -1.0).live());
    }

    #[test]
    fn flattening_merges_context_and_derives_fields() {
        let stop = StopNo::parse("3017").unwrap();
        let group = make_group();

        let flat = TripAtStop::from_trip(stop, "MACKENZIE KING", &group, make_trip(7, 2.5));

        assert_eq!(flat.stop, stop);
        assert_eq!(flat.stop_description, "MACKENZIE KING");
        assert_eq!(flat.route_no, group.route_no);
        assert_eq!(flat.route_label, "Orléans");
        assert_eq!(flat.direction, "Eastbound");
        assert_eq!(flat.arrival_in_minutes, 7);
        assert!(flat.live);
        assert!(!flat.cached);
        assert_eq!(flat.destination, "Orléans");
    }

    #[test]
    fn flattening_carries_the_cached_flag() {
        let mut group = make_group();
        group.cached = true;

        let flat = TripAtStop::from_trip(
            StopNo::parse("3017").unwrap(),
            "MACKENZIE KING",
            &group,
            make_trip(7, -1.0),
        );

        assert!(flat.cached);
        assert!(!flat.live);
    }
}
