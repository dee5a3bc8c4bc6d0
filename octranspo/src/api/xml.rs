//! Parsers for the feed's SOAP XML reply bodies.
//!
//! The feed wraps each reply in a `{resource}Result` element in the `oct`
//! namespace; the data elements inside it live in the `t` namespace. A
//! reply without the result element (including an unparseable body) reads
//! as no reply at all. A non-empty `Error` element, at the result level or
//! inside a route direction, carries a numeric upstream error code.

use chrono::NaiveDateTime;
use roxmltree::{Document, Node};

use crate::domain::{RouteInfo, RouteNo, RouteSummary, RouteTrips, StopNo, TripRecord};
use crate::error::{self, Error};

use super::types::NextTripsData;

/// Namespace of the `{resource}Result` wrapper elements.
const OCT_NS: &str = "http://octranspo.com";

/// Namespace of the data elements inside a result.
const T_NS: &str = "http://www.octranspo1.com/";

/// Timestamp format of `RequestProcessingTime` values.
const PROCESSING_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// Parse a `GetRouteSummaryForStop` reply body.
///
/// An absent `Routes` element parses to an empty route list; deciding
/// whether that is an error is left to the caller.
pub(super) fn parse_route_summary(body: &str) -> Result<RouteSummary, Error> {
    let resource = "GetRouteSummaryForStop";
    let doc = Document::parse(body).map_err(|_| Error::NoReply(resource))?;
    let result = find_result(&doc, "GetRouteSummaryForStopResult")
        .ok_or(Error::NoReply(resource))?;
    check_error(result)?;

    let stop = parse_stop(result)?;
    let stop_description = required_text(result, "StopDescription")?;

    let mut routes = Vec::new();
    if let Some(list) = child(result, "Routes") {
        for node in children(list, "Route") {
            routes.push(parse_route_info(node)?);
        }
    }

    Ok(RouteSummary {
        stop,
        stop_description,
        routes,
    })
}

/// Parse a `GetNextTripsForStop` reply body.
pub(super) fn parse_next_trips(body: &str) -> Result<NextTripsData, Error> {
    let resource = "GetNextTripsForStop";
    let doc = Document::parse(body).map_err(|_| Error::NoReply(resource))?;
    let result =
        find_result(&doc, "GetNextTripsForStopResult").ok_or(Error::NoReply(resource))?;
    check_error(result)?;

    let stop = parse_stop(result)?;
    let stop_description = required_text(result, "StopLabel")?;

    let mut routes = Vec::new();
    if let Some(route) = child(result, "Route") {
        let directions: Vec<_> = children(route, "RouteDirection").collect();
        if directions.is_empty() {
            // Single-direction replies put the direction fields directly on
            // `Route` instead of nesting a `RouteDirection` element.
            routes.push(parse_direction(route)?);
        } else {
            for node in directions {
                routes.push(parse_direction(node)?);
            }
        }
    }

    Ok(NextTripsData {
        stop,
        stop_description,
        routes,
    })
}

fn parse_route_info(node: Node<'_, '_>) -> Result<RouteInfo, Error> {
    Ok(RouteInfo {
        route_no: parse_route_no(node)?,
        direction_id: required_parse(node, "DirectionID")?,
        direction: required_text(node, "Direction")?,
        heading: required_text(node, "RouteHeading")?,
    })
}

/// Parse one route-direction group, whether it came from a `RouteDirection`
/// element or from an inline single-direction `Route`.
fn parse_direction(node: Node<'_, '_>) -> Result<RouteTrips, Error> {
    check_error(node)?;

    let raw_time = required_text(node, "RequestProcessingTime")?;
    let request_processing_time = NaiveDateTime::parse_from_str(&raw_time, PROCESSING_TIME_FORMAT)
        .map_err(|_| Error::MissingField("RequestProcessingTime".to_string()))?;

    let mut trips = Vec::new();
    if let Some(list) = child(node, "Trips") {
        for trip in children(list, "Trip") {
            trips.push(parse_trip(trip)?);
        }
    }

    Ok(RouteTrips {
        cached: false,
        route_no: parse_route_no(node)?,
        route_label: required_text(node, "RouteLabel")?,
        direction: required_text(node, "Direction")?,
        request_processing_time,
        trips,
    })
}

fn parse_trip(node: Node<'_, '_>) -> Result<TripRecord, Error> {
    Ok(TripRecord {
        destination: required_text(node, "TripDestination")?,
        start_time: required_text(node, "TripStartTime")?,
        adjusted_schedule_time: required_parse(node, "AdjustedScheduleTime")?,
        adjustment_age: required_parse(node, "AdjustmentAge")?,
        last_trip: required_parse(node, "LastTripOfSchedule")?,
        bus_type: optional_text(node, "BusType"),
        gps_speed: optional_float(node, "GPSSpeed"),
        latitude: optional_float(node, "Latitude"),
        longitude: optional_float(node, "Longitude"),
    })
}

fn find_result<'a, 'input>(doc: &'a Document<'input>, name: &str) -> Option<Node<'a, 'input>> {
    doc.descendants().find(|n| n.has_tag_name((OCT_NS, name)))
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &'static str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name((T_NS, name)))
}

fn children<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(move |n| n.has_tag_name((T_NS, name)))
}

/// Non-empty `Error` elements carry an upstream error code.
fn check_error(node: Node<'_, '_>) -> Result<(), Error> {
    if let Some(element) = child(node, "Error") {
        let text = element.text().unwrap_or("").trim();
        if !text.is_empty() {
            let code = text.parse::<u16>().unwrap_or(0);
            return Err(Error::Upstream {
                code,
                message: error::upstream_message(code, text),
            });
        }
    }
    Ok(())
}

fn parse_stop(node: Node<'_, '_>) -> Result<StopNo, Error> {
    StopNo::parse(&required_text(node, "StopNo")?)
        .map_err(|_| Error::MissingField("StopNo".to_string()))
}

fn parse_route_no(node: Node<'_, '_>) -> Result<RouteNo, Error> {
    RouteNo::parse(&required_text(node, "RouteNo")?)
        .map_err(|_| Error::MissingField("RouteNo".to_string()))
}

/// Text of a required element. The element must be present; empty text is
/// allowed, matching feeds that transmit empty-but-present fields.
fn required_text(node: Node<'_, '_>, name: &'static str) -> Result<String, Error> {
    child(node, name)
        .map(|n| n.text().unwrap_or("").trim().to_string())
        .ok_or_else(|| Error::MissingField(name.to_string()))
}

/// Parsed value of a required element; unparseable text reads as schema
/// drift, the same as an absent element.
fn required_parse<T: std::str::FromStr>(
    node: Node<'_, '_>,
    name: &'static str,
) -> Result<T, Error> {
    required_text(node, name)?
        .parse()
        .map_err(|_| Error::MissingField(name.to_string()))
}

fn optional_text(node: Node<'_, '_>, name: &'static str) -> String {
    child(node, name)
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string())
        .unwrap_or_default()
}

fn optional_float(node: Node<'_, '_>, name: &'static str) -> Option<f64> {
    child(node, name)
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .and_then(|t| t.parse().ok())
}
