//! Scripted feed for testing without API credentials.
//!
//! Serves fixtures as if they were live replies: summaries keyed by stop,
//! next-trips replies queued per (stop, route) and consumed in order.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{RouteNo, RouteSummary, StopNo};
use crate::error::{self, Error};

use super::TransitApi;
use super::types::NextTripsData;

/// Scripted `TransitApi` implementation.
///
/// A stop without a summary fixture answers with upstream error code 10,
/// the same as the live feed for an unknown stop. Each next-trips fetch
/// consumes one queued reply; an exhausted queue answers `NoReply`, so a
/// fetch the test did not script is visible as a failure.
///
/// Clones share the underlying fixtures, so a test can keep a handle for
/// queueing more replies after the client under test has taken ownership.
#[derive(Clone, Default)]
pub struct MockApi {
    summaries: Arc<RwLock<HashMap<StopNo, RouteSummary>>>,
    replies: Arc<RwLock<HashMap<(StopNo, RouteNo), VecDeque<Result<NextTripsData, Error>>>>>,
}

impl MockApi {
    /// Create an empty mock with no fixtures.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the summary served for its stop.
    pub async fn add_summary(&self, summary: RouteSummary) {
        self.summaries.write().await.insert(summary.stop, summary);
    }

    /// Append one scripted next-trips reply for (stop, route).
    pub async fn queue_next_trips(
        &self,
        stop: StopNo,
        route: RouteNo,
        reply: Result<NextTripsData, Error>,
    ) {
        self.replies
            .write()
            .await
            .entry((stop, route))
            .or_default()
            .push_back(reply);
    }

    /// Number of scripted replies not yet consumed.
    pub async fn remaining_replies(&self) -> usize {
        self.replies.read().await.values().map(VecDeque::len).sum()
    }
}

#[async_trait]
impl TransitApi for MockApi {
    async fn get_route_summary(&self, stop: StopNo) -> Result<RouteSummary, Error> {
        match self.summaries.read().await.get(&stop) {
            Some(summary) => Ok(summary.clone()),
            None => Err(Error::Upstream {
                code: 10,
                message: error::upstream_message(10, "10"),
            }),
        }
    }

    async fn get_next_trips(&self, stop: StopNo, route: RouteNo) -> Result<NextTripsData, Error> {
        self.replies
            .write()
            .await
            .get_mut(&(stop, route))
            .and_then(VecDeque::pop_front)
            .unwrap_or(Err(Error::NoReply("GetNextTripsForStop")))
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::RouteInfo;

    use super::*;

    fn stop() -> StopNo {
        StopNo::parse("3017").unwrap()
    }

    fn route() -> RouteNo {
        RouteNo::parse("95").unwrap()
    }

    fn summary() -> RouteSummary {
        RouteSummary {
            stop: stop(),
            stop_description: "LAURIER / WALLER".to_string(),
            routes: vec![RouteInfo {
                route_no: route(),
                direction_id: 1,
                direction: "Eastbound".to_string(),
                heading: "Orleans".to_string(),
            }],
        }
    }

    fn empty_reply() -> NextTripsData {
        NextTripsData {
            stop: stop(),
            stop_description: "LAURIER / WALLER".to_string(),
            routes: Vec::new(),
        }
    }

    #[tokio::test]
    async fn serves_registered_summary() {
        let api = MockApi::new();
        api.add_summary(summary()).await;

        let reply = api.get_route_summary(stop()).await.unwrap();
        assert_eq!(reply, summary());
    }

    #[tokio::test]
    async fn unknown_stop_answers_code_10() {
        let api = MockApi::new();
        let error = api.get_route_summary(stop()).await.unwrap_err();
        assert!(matches!(
            error,
            Error::Upstream { code: 10, ref message } if message == "Invalid stop number"
        ));
    }

    #[tokio::test]
    async fn replies_are_consumed_in_order() {
        let api = MockApi::new();
        let mut first = empty_reply();
        first.stop_description = "first".to_string();
        let mut second = empty_reply();
        second.stop_description = "second".to_string();

        api.queue_next_trips(stop(), route(), Ok(first)).await;
        api.queue_next_trips(stop(), route(), Ok(second)).await;
        assert_eq!(api.remaining_replies().await, 2);

        let a = api.get_next_trips(stop(), route()).await.unwrap();
        let b = api.get_next_trips(stop(), route()).await.unwrap();
        assert_eq!(a.stop_description, "first");
        assert_eq!(b.stop_description, "second");
        assert_eq!(api.remaining_replies().await, 0);
    }

    #[tokio::test]
    async fn exhausted_queue_answers_no_reply() {
        let api = MockApi::new();
        let error = api.get_next_trips(stop(), route()).await.unwrap_err();
        assert!(matches!(error, Error::NoReply("GetNextTripsForStop")));
    }

    #[tokio::test]
    async fn clones_share_fixtures() {
        let api = MockApi::new();
        let handle = api.clone();
        handle.queue_next_trips(stop(), route(), Ok(empty_reply())).await;

        assert!(api.get_next_trips(stop(), route()).await.is_ok());
    }
}
