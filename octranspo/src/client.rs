//! The cached arrival client.
//!
//! `OcTranspo` wraps a `TransitApi` with three bounded caches: route
//! summaries per stop, the last full next-trips result per (stop, route),
//! and the last non-empty trip group per (stop, route, direction).
//!
//! The full-result cache short-circuits the feed while an entry is fresh
//! enough. The per-direction cache covers a different failure: the feed
//! intermittently reports zero trips for a route that is otherwise running,
//! and a recent cached group, with its arrival estimates aged to the
//! present, masks that gap. Stale substitutes are marked `cached` so
//! callers can tell relayed estimates from live ones.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, warn};

use crate::adjust;
use crate::api::{ApiClient, ApiConfig, TransitApi};
use crate::cache::{CacheConfig, CacheStats, Caches};
use crate::domain::{NextTripsResult, RouteNo, RouteSummary, StopNo, TripAtStop};
use crate::error::Error;

/// Client for the arrival feed with caching and stale-data fallback.
///
/// All state lives in the instance: independent clients never share
/// caches or counters. Methods take `&self`, so one client can serve
/// concurrent callers behind an `Arc`.
pub struct OcTranspo<A = ApiClient> {
    api: A,
    caches: Caches,
    config: CacheConfig,
    requests: AtomicU64,
}

impl OcTranspo<ApiClient> {
    /// Create a client for the production feed with default cache settings.
    pub fn new(app_id: impl Into<String>, app_key: impl Into<String>) -> Result<Self, Error> {
        Self::with_config(ApiConfig::new(app_id, app_key), CacheConfig::default())
    }

    /// Create a client with tuned feed and cache settings.
    pub fn with_config(api: ApiConfig, cache: CacheConfig) -> Result<Self, Error> {
        Ok(Self::with_api(ApiClient::new(api)?, cache))
    }
}

impl<A: TransitApi> OcTranspo<A> {
    /// Create a client over any `TransitApi` implementation.
    pub fn with_api(api: A, config: CacheConfig) -> Self {
        Self {
            api,
            caches: Caches::new(&config),
            config,
            requests: AtomicU64::new(0),
        }
    }

    /// Cumulative number of feed requests attempted by this client.
    ///
    /// Counted before each call, so failed requests are included.
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Hit and miss counts summed over all caches.
    pub fn cache_stats(&self) -> CacheStats {
        self.caches.stats()
    }

    /// Empty every cache. Request and hit/miss counters keep their values.
    pub fn clear_cache(&self) {
        debug!(
            summaries = self.caches.summaries.entry_count(),
            groups = self.caches.groups.entry_count(),
            results = self.caches.results.entry_count(),
            "clearing caches"
        );
        self.caches.clear();
    }

    /// Get the routes serving a stop.
    ///
    /// Served from cache while the stored summary is younger than
    /// `route_summary_max_age`. A reply listing zero routes is an error
    /// (`NoRoutesFound`) and is never cached.
    pub async fn get_route_summary_for_stop(&self, stop: StopNo) -> Result<RouteSummary, Error> {
        if self.config.route_summary_max_age > Duration::ZERO {
            let now = Instant::now();
            if let Some((summary, age)) = self
                .caches
                .summaries
                .get_fresh(&stop, now, self.config.route_summary_max_age)
                .await
            {
                debug!(stop = %stop, age_secs = age.as_secs(), "route summary served from cache");
                return Ok(summary);
            }
        }

        self.requests.fetch_add(1, Ordering::Relaxed);
        let summary = self.api.get_route_summary(stop).await?;

        if summary.routes.is_empty() {
            return Err(Error::NoRoutesFound(stop));
        }

        self.caches
            .summaries
            .insert(stop, summary.clone(), Instant::now())
            .await;
        Ok(summary)
    }

    /// Get the upcoming trips for one route at a stop.
    ///
    /// If the last full result for this (stop, route) is younger than
    /// `trip_max_age`, a time-adjusted copy of it is returned without
    /// querying the feed. Otherwise the feed is queried, and any direction
    /// group the feed left empty is filled from the per-direction cache
    /// when a previous fetch stored trips for it; the substitute is
    /// time-adjusted and marked `cached`. A group with no live and no
    /// cached trips stays empty, which is not an error.
    pub async fn get_next_trips_for_stop(
        &self,
        stop: StopNo,
        route: RouteNo,
    ) -> Result<NextTripsResult, Error> {
        if self.config.trip_max_age > Duration::ZERO {
            let now = Instant::now();
            if let Some((mut result, age)) = self
                .caches
                .results
                .get_fresh(&(stop, route), now, self.config.trip_max_age)
                .await
            {
                debug!(
                    stop = %stop,
                    route = %route,
                    age_secs = age.as_secs(),
                    "next trips served from cache"
                );
                adjust::reuse_result(&mut result, age);
                return Ok(result);
            }
        }

        self.requests.fetch_add(1, Ordering::Relaxed);
        let data = self.api.get_next_trips(stop, route).await?;
        let fetched_at = Instant::now();

        let mut routes = Vec::with_capacity(data.routes.len());
        for mut group in data.routes {
            if group.trips.is_empty() {
                let key = (stop, route, group.direction.clone());
                if let Some((cached, age)) = self.caches.groups.get_any(&key, fetched_at).await {
                    warn!(
                        stop = %stop,
                        route = %route,
                        direction = %group.direction,
                        age_secs = age.as_secs(),
                        "feed reported no trips, substituting cached data"
                    );
                    let mut fallback = cached;
                    adjust::reuse_group(&mut fallback, age);
                    group = fallback;
                }
            } else {
                let key = (stop, route, group.direction.clone());
                self.caches.groups.insert(key, group.clone(), fetched_at).await;
            }
            routes.push(group);
        }

        let result = NextTripsResult {
            stop: data.stop,
            stop_description: data.stop_description,
            routes,
            fetch_time: Utc::now(),
        };

        // Only a result that actually holds trips is worth replaying later.
        if result.routes.iter().any(|group| !group.trips.is_empty()) {
            self.caches
                .results
                .insert((stop, route), result.clone(), fetched_at)
                .await;
        }

        Ok(result)
    }

    /// Get a flat, sorted list of upcoming trips at a stop.
    ///
    /// # Arguments
    ///
    /// * `stop` - Stop to query
    /// * `route_nos` - Routes to include; `None` queries every route the
    ///   stop's summary lists
    /// * `route_label` - When set, keep only groups with this label
    ///
    /// Duplicate route numbers are queried once, first occurrence winning.
    /// Trips are sorted ascending by `arrival_in_minutes`; equal arrivals
    /// keep their discovery order. Any feed error aborts the whole call.
    pub async fn simple_get_next_trips_for_stop(
        &self,
        stop: StopNo,
        route_nos: Option<&[RouteNo]>,
        route_label: Option<&str>,
    ) -> Result<Vec<TripAtStop>, Error> {
        let routes = match route_nos {
            Some(routes) => dedup_routes(routes),
            None => {
                let summary = self.get_route_summary_for_stop(stop).await?;
                let all: Vec<RouteNo> = summary.routes.iter().map(|r| r.route_no).collect();
                dedup_routes(&all)
            }
        };

        let mut trips = Vec::new();
        for route in routes {
            let result = self.get_next_trips_for_stop(stop, route).await?;
            for group in &result.routes {
                if route_label.is_some_and(|label| label != group.route_label) {
                    continue;
                }
                for trip in &group.trips {
                    trips.push(TripAtStop::from_trip(
                        result.stop,
                        &result.stop_description,
                        group,
                        trip.clone(),
                    ));
                }
            }
        }

        trips.sort_by_key(|trip| trip.arrival_in_minutes);
        Ok(trips)
    }
}

/// Keep the first occurrence of each route number, preserving order.
fn dedup_routes(routes: &[RouteNo]) -> Vec<RouteNo> {
    let mut seen = Vec::with_capacity(routes.len());
    for &route in routes {
        if !seen.contains(&route) {
            seen.push(route);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::api::{MockApi, NextTripsData};
    use crate::domain::{RouteInfo, RouteTrips, TripRecord};

    use super::*;

    fn stop() -> StopNo {
        StopNo::parse("3017").unwrap()
    }

    fn route(no: &str) -> RouteNo {
        RouteNo::parse(no).unwrap()
    }

    fn make_summary(stop: StopNo, routes: &[(&str, &str)]) -> RouteSummary {
        RouteSummary {
            stop,
            stop_description: "LAURIER / WALLER".to_string(),
            routes: routes
                .iter()
                .enumerate()
                .map(|(i, (no, heading))| RouteInfo {
                    route_no: route(no),
                    direction_id: i as u8,
                    direction: "Eastbound".to_string(),
                    heading: heading.to_string(),
                })
                .collect(),
        }
    }

    fn make_trip(destination: &str, adjusted: i32, age: f64) -> TripRecord {
        TripRecord {
            destination: destination.to_string(),
            start_time: "21:00".to_string(),
            adjusted_schedule_time: adjusted,
            adjustment_age: age,
            last_trip: false,
            bus_type: "4LB - DD".to_string(),
            gps_speed: None,
            latitude: None,
            longitude: None,
        }
    }

    fn make_group(no: &str, label: &str, direction: &str, trips: Vec<TripRecord>) -> RouteTrips {
        RouteTrips {
            cached: false,
            route_no: route(no),
            route_label: label.to_string(),
            direction: direction.to_string(),
            request_processing_time: NaiveDate::from_ymd_opt(2013, 6, 22)
                .unwrap()
                .and_hms_opt(21, 29, 13)
                .unwrap(),
            trips,
        }
    }

    fn make_reply(groups: Vec<RouteTrips>) -> NextTripsData {
        NextTripsData {
            stop: stop(),
            stop_description: "LAURIER / WALLER".to_string(),
            routes: groups,
        }
    }

    /// Config whose trip cache never satisfies a read, so every next-trips
    /// call reaches the feed and exercises the per-group merge.
    fn always_fetch() -> CacheConfig {
        CacheConfig::new().with_trip_max_age(Duration::ZERO)
    }

    #[tokio::test]
    async fn summary_is_fetched_once_then_served_from_cache() {
        let api = MockApi::new();
        api.add_summary(make_summary(stop(), &[("95", "Orleans")])).await;
        let client = OcTranspo::with_api(api, CacheConfig::default());

        let first = client.get_route_summary_for_stop(stop()).await.unwrap();
        let second = client.get_route_summary_for_stop(stop()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(client.requests(), 1);
        assert_eq!(client.cache_stats(), CacheStats { hits: 1, misses: 1 });
    }

    #[tokio::test]
    async fn empty_summary_is_an_error_and_is_not_cached() {
        let api = MockApi::new();
        api.add_summary(make_summary(stop(), &[])).await;
        let client = OcTranspo::with_api(api, CacheConfig::default());

        let error = client.get_route_summary_for_stop(stop()).await.unwrap_err();
        assert!(matches!(error, Error::NoRoutesFound(s) if s == stop()));

        // Not cached: the next call queries the feed again.
        let _ = client.get_route_summary_for_stop(stop()).await;
        assert_eq!(client.requests(), 2);
    }

    #[tokio::test]
    async fn zero_summary_max_age_disables_the_cache() {
        let api = MockApi::new();
        api.add_summary(make_summary(stop(), &[("95", "Orleans")])).await;
        let config = CacheConfig::new().with_route_summary_max_age(Duration::ZERO);
        let client = OcTranspo::with_api(api, config);

        client.get_route_summary_for_stop(stop()).await.unwrap();
        client.get_route_summary_for_stop(stop()).await.unwrap();

        assert_eq!(client.requests(), 2);
    }

    #[tokio::test]
    async fn fresh_result_short_circuits_the_feed() {
        let api = MockApi::new();
        api.queue_next_trips(
            stop(),
            route("95"),
            Ok(make_reply(vec![make_group(
                "95",
                "Orleans",
                "Eastbound",
                vec![make_trip("Orleans", 13, 0.4)],
            )])),
        )
        .await;
        let handle = api.clone();
        let client = OcTranspo::with_api(api, CacheConfig::default());

        let first = client.get_next_trips_for_stop(stop(), route("95")).await.unwrap();
        let second = client.get_next_trips_for_stop(stop(), route("95")).await.unwrap();

        assert!(!first.routes[0].cached);
        assert!(second.routes[0].cached);
        // Reused immediately, so the arrival estimate has not decayed.
        assert_eq!(second.routes[0].trips[0].adjusted_schedule_time, 13);
        assert_eq!(client.requests(), 1);
        assert_eq!(handle.remaining_replies().await, 0);
        assert_eq!(client.cache_stats(), CacheStats { hits: 1, misses: 1 });
    }

    #[tokio::test]
    async fn zero_trip_max_age_always_queries_the_feed() {
        let api = MockApi::new();
        api.queue_next_trips(
            stop(),
            route("95"),
            Ok(make_reply(vec![make_group(
                "95",
                "Orleans",
                "Eastbound",
                vec![make_trip("first", 13, 0.4)],
            )])),
        )
        .await;
        api.queue_next_trips(
            stop(),
            route("95"),
            Ok(make_reply(vec![make_group(
                "95",
                "Orleans",
                "Eastbound",
                vec![make_trip("second", 10, 0.2)],
            )])),
        )
        .await;
        let client = OcTranspo::with_api(api, always_fetch());

        let first = client.get_next_trips_for_stop(stop(), route("95")).await.unwrap();
        let second = client.get_next_trips_for_stop(stop(), route("95")).await.unwrap();

        assert_eq!(first.routes[0].trips[0].destination, "first");
        assert_eq!(second.routes[0].trips[0].destination, "second");
        assert_eq!(client.requests(), 2);
    }

    #[tokio::test]
    async fn empty_group_substitutes_cached_trips() {
        let api = MockApi::new();
        api.queue_next_trips(
            stop(),
            route("95"),
            Ok(make_reply(vec![make_group(
                "95",
                "Orleans",
                "Eastbound",
                vec![
                    make_trip("Orleans", 13, 0.4),
                    make_trip("Orleans", 28, -1.0),
                    make_trip("Orleans", 43, -1.0),
                ],
            )])),
        )
        .await;
        api.queue_next_trips(
            stop(),
            route("95"),
            Ok(make_reply(vec![make_group("95", "Orleans", "Eastbound", vec![])])),
        )
        .await;
        let client = OcTranspo::with_api(api, always_fetch());

        let first = client.get_next_trips_for_stop(stop(), route("95")).await.unwrap();
        assert_eq!(first.routes[0].trips.len(), 3);
        assert!(!first.routes[0].cached);

        let second = client.get_next_trips_for_stop(stop(), route("95")).await.unwrap();
        assert!(second.routes[0].cached);
        assert_eq!(second.routes[0].trips.len(), 3);
        // Reused immediately, so the estimates are unchanged.
        assert_eq!(second.routes[0].trips[0].adjusted_schedule_time, 13);
        assert_eq!(client.requests(), 2);
    }

    #[tokio::test]
    async fn empty_group_with_no_cached_data_stays_empty() {
        let api = MockApi::new();
        api.queue_next_trips(
            stop(),
            route("95"),
            Ok(make_reply(vec![make_group("95", "Orleans", "Eastbound", vec![])])),
        )
        .await;
        let client = OcTranspo::with_api(api, always_fetch());

        let result = client.get_next_trips_for_stop(stop(), route("95")).await.unwrap();

        assert_eq!(result.routes.len(), 1);
        assert!(result.routes[0].trips.is_empty());
        assert!(!result.routes[0].cached);
    }

    #[tokio::test]
    async fn fallback_fills_each_direction_independently() {
        let api = MockApi::new();
        api.queue_next_trips(
            stop(),
            route("95"),
            Ok(make_reply(vec![
                make_group(
                    "95",
                    "Orleans",
                    "Eastbound",
                    vec![make_trip("Orleans", 13, 0.4), make_trip("Orleans", 28, -1.0)],
                ),
                make_group("95", "Barrhaven", "Westbound", vec![make_trip("Barrhaven", 7, 0.2)]),
            ])),
        )
        .await;
        api.queue_next_trips(
            stop(),
            route("95"),
            Ok(make_reply(vec![
                make_group("95", "Orleans", "Eastbound", vec![]),
                make_group("95", "Barrhaven", "Westbound", vec![make_trip("Barrhaven", 21, 0.1)]),
            ])),
        )
        .await;
        let client = OcTranspo::with_api(api, always_fetch());

        client.get_next_trips_for_stop(stop(), route("95")).await.unwrap();
        let second = client.get_next_trips_for_stop(stop(), route("95")).await.unwrap();

        let east = &second.routes[0];
        assert!(east.cached);
        assert_eq!(east.trips.len(), 2);

        let west = &second.routes[1];
        assert!(!west.cached);
        assert_eq!(west.trips.len(), 1);
        assert_eq!(west.trips[0].adjusted_schedule_time, 21);
    }

    #[tokio::test]
    async fn upstream_errors_propagate_despite_cached_data() {
        let api = MockApi::new();
        api.queue_next_trips(
            stop(),
            route("95"),
            Ok(make_reply(vec![make_group(
                "95",
                "Orleans",
                "Eastbound",
                vec![make_trip("Orleans", 13, 0.4)],
            )])),
        )
        .await;
        api.queue_next_trips(
            stop(),
            route("95"),
            Err(Error::Upstream {
                code: 11,
                message: "Invalid route number".to_string(),
            }),
        )
        .await;
        let client = OcTranspo::with_api(api, always_fetch());

        client.get_next_trips_for_stop(stop(), route("95")).await.unwrap();
        let error = client.get_next_trips_for_stop(stop(), route("95")).await.unwrap_err();

        assert!(matches!(
            error,
            Error::Upstream { code: 11, ref message } if message == "Invalid route number"
        ));
    }

    #[tokio::test]
    async fn failed_requests_still_count() {
        let api = MockApi::new();
        let client = OcTranspo::with_api(api, always_fetch());

        // Nothing queued: the mock answers NoReply.
        let error = client.get_next_trips_for_stop(stop(), route("95")).await.unwrap_err();
        assert!(matches!(error, Error::NoReply(_)));
        assert_eq!(client.requests(), 1);
    }

    #[tokio::test]
    async fn clear_cache_forces_one_new_request() {
        let api = MockApi::new();
        for _ in 0..2 {
            api.queue_next_trips(
                stop(),
                route("95"),
                Ok(make_reply(vec![make_group(
                    "95",
                    "Orleans",
                    "Eastbound",
                    vec![make_trip("Orleans", 13, 0.4)],
                )])),
            )
            .await;
        }
        let client = OcTranspo::with_api(api, CacheConfig::default());

        client.get_next_trips_for_stop(stop(), route("95")).await.unwrap();
        client.get_next_trips_for_stop(stop(), route("95")).await.unwrap();
        assert_eq!(client.requests(), 1);

        client.clear_cache();

        client.get_next_trips_for_stop(stop(), route("95")).await.unwrap();
        assert_eq!(client.requests(), 2);
    }

    #[tokio::test]
    async fn aggregator_resolves_routes_flattens_and_sorts() {
        let api = MockApi::new();
        api.add_summary(make_summary(stop(), &[("95", "Orleans"), ("97", "Bayshore")])).await;
        api.queue_next_trips(
            stop(),
            route("95"),
            Ok(make_reply(vec![make_group(
                "95",
                "Orleans",
                "Eastbound",
                vec![make_trip("Orleans", 10, 0.4), make_trip("Orleans", 3, -1.0)],
            )])),
        )
        .await;
        api.queue_next_trips(
            stop(),
            route("97"),
            Ok(make_reply(vec![make_group(
                "97",
                "Bayshore",
                "Westbound",
                vec![make_trip("Bayshore", 7, 0.2)],
            )])),
        )
        .await;
        let client = OcTranspo::with_api(api, CacheConfig::default());

        let trips = client
            .simple_get_next_trips_for_stop(stop(), None, None)
            .await
            .unwrap();

        let arrivals: Vec<i32> = trips.iter().map(|t| t.arrival_in_minutes).collect();
        assert_eq!(arrivals, vec![3, 7, 10]);

        let soonest = &trips[0];
        assert_eq!(soonest.stop, stop());
        assert_eq!(soonest.route_no, route("95"));
        assert_eq!(soonest.direction, "Eastbound");
        assert_eq!(soonest.destination, "Orleans");
        assert!(!soonest.live);
        assert!(trips[1].live);

        // One summary request plus one per route.
        assert_eq!(client.requests(), 3);
    }

    #[tokio::test]
    async fn aggregator_queries_duplicate_routes_once() {
        let api = MockApi::new();
        api.queue_next_trips(
            stop(),
            route("95"),
            Ok(make_reply(vec![make_group(
                "95",
                "Orleans",
                "Eastbound",
                vec![make_trip("Orleans", 13, 0.4)],
            )])),
        )
        .await;
        let client = OcTranspo::with_api(api, always_fetch());

        // A second fetch for 95 would exhaust the queue and fail.
        let requested = [route("95"), route("95")];
        let trips = client
            .simple_get_next_trips_for_stop(stop(), Some(&requested), None)
            .await
            .unwrap();

        assert_eq!(trips.len(), 1);
        assert_eq!(client.requests(), 1);
    }

    #[tokio::test]
    async fn aggregator_filters_by_route_label() {
        let api = MockApi::new();
        api.queue_next_trips(
            stop(),
            route("95"),
            Ok(make_reply(vec![
                make_group("95", "Orleans", "Eastbound", vec![make_trip("Orleans", 13, 0.4)]),
                make_group("95", "Barrhaven", "Westbound", vec![make_trip("Barrhaven", 7, 0.2)]),
            ])),
        )
        .await;
        let client = OcTranspo::with_api(api, CacheConfig::default());

        let requested = [route("95")];
        let trips = client
            .simple_get_next_trips_for_stop(stop(), Some(&requested), Some("Orleans"))
            .await
            .unwrap();

        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].route_label, "Orleans");
    }

    #[tokio::test]
    async fn equal_arrivals_keep_discovery_order() {
        let api = MockApi::new();
        api.queue_next_trips(
            stop(),
            route("95"),
            Ok(make_reply(vec![make_group(
                "95",
                "Orleans",
                "Eastbound",
                vec![make_trip("discovered first", 5, 0.4)],
            )])),
        )
        .await;
        api.queue_next_trips(
            stop(),
            route("97"),
            Ok(make_reply(vec![make_group(
                "97",
                "Bayshore",
                "Westbound",
                vec![make_trip("discovered second", 5, 0.2)],
            )])),
        )
        .await;
        let client = OcTranspo::with_api(api, CacheConfig::default());

        let requested = [route("95"), route("97")];
        let trips = client
            .simple_get_next_trips_for_stop(stop(), Some(&requested), None)
            .await
            .unwrap();

        assert_eq!(trips[0].destination, "discovered first");
        assert_eq!(trips[1].destination, "discovered second");
    }

    #[tokio::test]
    async fn aggregator_propagates_feed_errors() {
        let api = MockApi::new();
        api.add_summary(make_summary(stop(), &[("95", "Orleans"), ("97", "Bayshore")])).await;
        api.queue_next_trips(
            stop(),
            route("95"),
            Err(Error::Upstream {
                code: 2,
                message: "Unable to query data source".to_string(),
            }),
        )
        .await;
        let client = OcTranspo::with_api(api, CacheConfig::default());

        let error = client
            .simple_get_next_trips_for_stop(stop(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(error, Error::Upstream { code: 2, .. }));
    }

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        let routes = [route("95"), route("4"), route("95"), route("97"), route("4")];
        let deduped = dedup_routes(&routes);
        assert_eq!(deduped, vec![route("95"), route("4"), route("97")]);
    }
}
