//! A CLI tool and library for sampling flight routes along great circles.
//!
//! Builds on [GeographicLib](https://geographiclib.sourceforge.io/)'s
//! geodesic routines, via its pure Rust port, to turn a table of routes
//! between airports into densely sampled waypoints along the geodesic (the
//! shortest path on the WGS84 ellipsoid) for each route. Routes that cross
//! the anti-meridian are split in two so that map renderers don't draw a
//! line across the whole map.
//!
//! See the [`convert_routes`] function, which is used by the CLI, for the
//! main entry point into the library, and [`convert_tables_to_geojson`] for
//! producing GeoJSON from its output.
//!
//! # Feature flags
//!
//! - `cli` enables the additional dependencies needed by the CLI

pub mod geographic;
pub mod geojson;
pub mod measure;
pub mod sampler;
pub mod split;
pub mod table;
pub mod types;

use std::io::{Read, Write};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::geographic::LongitudeMode;
use crate::geojson::GeoJsonError;
use crate::measure::Degrees;
use crate::sampler::{SampleError, SampleStep, sample_geodesic};
use crate::split::{ANTI_MERIDIAN, Segment, SplitError, Splitter, initial_direction, split_index};
use crate::table::{
    AirportTable, MissingAirportPolicy, Route, RouteTable, TableError, Waypoint, WaypointWriter,
    write_airport_points,
};
use crate::types::TypeError;

/// File name of the airport point table.
pub const AIRPORT_POINTS_CSV: &str = "airport_points.csv";
/// File name of the route waypoint table.
pub const ROUTE_POINTS_CSV: &str = "route_points.csv";
/// File name of the airport point GeoJSON.
pub const AIRPORT_POINTS_GEOJSON: &str = "airport_points.geojson";
/// File name of the route line GeoJSON.
pub const ROUTE_POINTS_GEOJSON: &str = "route_points.geojson";

#[derive(Error, Debug)]
pub enum RouteArcError {
    #[error("I/O error")]
    Io(#[from] std::io::Error),
    #[error("Table processing error")]
    Table(#[from] TableError),
    #[error("Sampling error")]
    Sample(#[from] SampleError),
    #[error("Anti-meridian split error")]
    Split(#[from] SplitError),
    #[error("GeoJSON error")]
    GeoJson(#[from] GeoJsonError),
    #[error("Core type error")]
    Type(#[from] TypeError),
}

pub type Result<T> = std::result::Result<T, RouteArcError>;

impl RouteArcError {
    /// Whether the error concerns only the route being processed, so that
    /// the route can be skipped and the conversion carry on.
    pub fn is_route_local(&self) -> bool {
        matches!(
            self,
            Self::Sample(SampleError::Geographic(_)) | Self::Split(SplitError::Geographic(_))
        )
    }
}

/// Options for [`convert_routes`].
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct RouteOptions {
    /// Spacing of samples along each route.
    pub step: SampleStep,

    /// Longitude representation used while sampling and splitting.
    pub longitude_mode: LongitudeMode,

    /// Longitude at which routes are split, or `None` to never split.
    pub split_longitude: Option<Degrees<f64>>,

    pub missing_airport: MissingAirportPolicy,

    /// Write longitudes as sampled instead of reducing them to
    /// [-180°, 180°].
    pub unrolled_output: bool,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            step: SampleStep::default(),
            longitude_mode: LongitudeMode::default(),
            split_longitude: Some(ANTI_MERIDIAN),
            missing_airport: MissingAirportPolicy::default(),
            unrolled_output: false,
        }
    }
}

impl RouteOptions {
    pub fn with_step(self, step: SampleStep) -> Self {
        Self { step, ..self }
    }

    pub fn with_longitude_mode(self, longitude_mode: LongitudeMode) -> Self {
        Self {
            longitude_mode,
            ..self
        }
    }

    pub fn with_split_longitude(self, split_longitude: Option<Degrees<f64>>) -> Self {
        Self {
            split_longitude,
            ..self
        }
    }

    pub fn with_missing_airport(self, missing_airport: MissingAirportPolicy) -> Self {
        Self {
            missing_airport,
            ..self
        }
    }

    pub fn with_unrolled_output(self, unrolled_output: bool) -> Self {
        Self {
            unrolled_output,
            ..self
        }
    }
}

/// Summary of a conversion run.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct ConversionInfo {
    pub airports_written: usize,
    pub routes_processed: usize,
    pub routes_skipped: usize,
    pub routes_split: usize,
    pub waypoints_written: usize,
}

/// Summary of a GeoJSON conversion.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct GeoJsonInfo {
    pub lines_written: usize,
    pub points_written: usize,
}

/// Sample one route and label its waypoints.
///
/// Returns the waypoints in order of travel, and the index of the first one
/// past the split longitude if the route was split.
#[instrument(level = "trace", skip_all, fields(route = %route.id))]
pub fn route_waypoints(
    route: &Route,
    options: &RouteOptions,
) -> Result<(Vec<Waypoint>, Option<usize>)> {
    let sampled = sample_geodesic(
        &route.origin,
        &route.destination,
        options.step,
        options.longitude_mode,
    )?;

    let segments = match options.split_longitude {
        Some(threshold) => {
            let direction = initial_direction(&sampled.path)?;
            let splitter = Splitter::new(direction, threshold);
            debug!(
                "Route {} travels {}, splitting past {}",
                route.id,
                direction,
                splitter.threshold()
            );
            splitter.assign(route.origin.lon(), sampled.points.iter().map(|p| p.lon))
        }
        None => vec![Segment::Base; sampled.points.len()],
    };

    let waypoints = sampled
        .points
        .iter()
        .zip(&segments)
        .map(|(p, segment)| Waypoint {
            route: segment.label(&route.id),
            lat: p.lat,
            lon: if options.unrolled_output {
                p.lon
            } else {
                p.lon.normalized()
            },
        })
        .collect();

    Ok((waypoints, split_index(&segments)))
}

/// Convert airport and route tables into airport point and route waypoint
/// tables.
///
/// Routes referencing unknown airports are skipped with a warning, or abort
/// the conversion, depending on [`RouteOptions::missing_airport`]. A route
/// whose geodesic can't be computed is likewise skipped without affecting
/// the others.
#[instrument(level = "trace", skip_all)]
pub fn convert_routes<A, R, WA, WP>(
    airports_csv: A,
    routes_csv: R,
    airport_points_out: WA,
    route_points_out: WP,
    options: &RouteOptions,
) -> Result<ConversionInfo>
where
    A: Read,
    R: Read,
    WA: Write,
    WP: Write,
{
    // Reject a bad step before doing any work.
    options.step.validate()?;
    debug!(
        "Sampling with step {}, missing airport policy {}",
        options.step, options.missing_airport
    );

    let airports = AirportTable::from_reader(airports_csv)?;
    info!("Loaded {} airports", airports.len());
    let routes = RouteTable::resolve(routes_csv, &airports, options.missing_airport)?;

    let mut info = ConversionInfo {
        airports_written: write_airport_points(airport_points_out, &airports, &routes)?,
        routes_skipped: routes.skipped.len(),
        ..ConversionInfo::default()
    };

    let mut writer = WaypointWriter::new(route_points_out)?;
    for route in &routes.routes {
        info!("Calculating {}", route.id);
        let (waypoints, split_at) = match route_waypoints(route, options) {
            Ok(result) => result,
            Err(e) if e.is_route_local() => {
                warn!("Skipping route {}: {}", route.id, e);
                info.routes_skipped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };
        if let Some(i) = split_at {
            debug!("Split {} at waypoint {}", route.id, i);
            info.routes_split += 1;
        }
        for waypoint in &waypoints {
            writer.write(waypoint)?;
        }
        info.routes_processed += 1;
    }
    info.waypoints_written = writer.finish()?;

    Ok(info)
}

/// Convert route waypoint and airport point tables, as written by
/// [`convert_routes`], into GeoJSON feature collections.
#[instrument(level = "trace", skip_all)]
pub fn convert_tables_to_geojson<P, A, WL, WA>(
    route_points_csv: P,
    airport_points_csv: A,
    lines_out: WL,
    points_out: WA,
) -> Result<GeoJsonInfo>
where
    P: Read,
    A: Read,
    WL: Write,
    WA: Write,
{
    Ok(GeoJsonInfo {
        lines_written: geojson::convert_route_points(route_points_csv, lines_out)?,
        points_written: geojson::convert_airport_points(airport_points_csv, points_out)?,
    })
}
