//! Airport, route and waypoint tables
//!
//! Reads the airport reference table and the route table, resolves each
//! route's endpoints against the airports, and writes the airport point and
//! route waypoint tables. All tables are UTF-8 CSV with a header row.
//!
//! The airport reference table follows the OurAirports layout: rows are read
//! by the `iata_code`, `name`, `municipality`, `latitude_deg` and
//! `longitude_deg` columns, and other columns are ignored. Rows without an
//! IATA code are skipped.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::io::{Read, Write};

use serde::Deserialize;
use strum::{Display, EnumString};
use thiserror::Error;
use tracing::{debug, warn};

use crate::measure::Degrees;
use crate::types::{GeoPoint, TypeError};

#[derive(Error, Debug)]
pub enum TableError {
    #[error("I/O error")]
    Io(#[from] std::io::Error),
    #[error("CSV processing error")]
    Csv(#[from] csv::Error),
    #[error("invalid {column} {value:?} for airport {code}")]
    Coordinate {
        code: String,
        column: &'static str,
        value: String,
    },
    #[error("type invariant error")]
    Type(#[from] TypeError),
    #[error("route {route} references unknown airport {code}")]
    MissingAirport { route: String, code: String },
}

type Result<T> = std::result::Result<T, TableError>;

/// An airport from the reference table.
#[derive(Clone, PartialEq, Debug)]
pub struct Airport {
    pub iata_code: String,

    /// Display name, e.g. "John F Kennedy International Airport".
    pub name: String,

    /// Locality the airport serves.
    pub loc_name: String,

    pub point: GeoPoint,
}

#[derive(Deserialize)]
struct ReferenceRow {
    #[serde(default)]
    iata_code: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    municipality: String,
    latitude_deg: String,
    longitude_deg: String,
}

fn parse_coordinate(code: &str, column: &'static str, value: &str) -> Result<Degrees<f64>> {
    value
        .trim()
        .parse::<f64>()
        .map(Degrees)
        .map_err(|_| TableError::Coordinate {
            code: code.to_owned(),
            column,
            value: value.to_owned(),
        })
}

/// Airports keyed by IATA code. Read-only once built.
#[derive(Default, Debug)]
pub struct AirportTable {
    airports: HashMap<String, Airport>,
}

impl AirportTable {
    /// Read the airport reference table.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut airports = HashMap::new();
        let mut rdr = csv::Reader::from_reader(reader);
        let mut num_uncoded = 0usize;
        for row in rdr.deserialize() {
            let row: ReferenceRow = row?;
            let code = row.iata_code.trim();
            if code.is_empty() {
                num_uncoded += 1;
                continue;
            }

            let lat = parse_coordinate(code, "latitude_deg", &row.latitude_deg)?;
            let lon = parse_coordinate(code, "longitude_deg", &row.longitude_deg)?;
            airports.insert(
                code.to_owned(),
                Airport {
                    iata_code: code.to_owned(),
                    name: row.name,
                    loc_name: row.municipality,
                    point: GeoPoint::new(lat, lon)?,
                },
            );
        }
        debug!(
            "Read {} airports, ignoring {} rows without an IATA code",
            airports.len(),
            num_uncoded
        );
        Ok(Self { airports })
    }

    pub fn get(&self, code: &str) -> Option<&Airport> {
        self.airports.get(code)
    }

    pub fn len(&self) -> usize {
        self.airports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.airports.is_empty()
    }
}

/// What to do with a route that references an airport missing from the
/// reference table.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum MissingAirportPolicy {
    /// Log a warning and leave the route out.
    #[default]
    Skip,
    /// Abort the conversion.
    Fail,
}

/// A route with both endpoints resolved.
#[derive(Clone, PartialEq, Debug)]
pub struct Route {
    /// `<from>-<to>`.
    pub id: String,
    pub from: String,
    pub to: String,
    pub origin: GeoPoint,
    pub destination: GeoPoint,
}

#[derive(Deserialize)]
struct RouteRow {
    from: String,
    to: String,
}

/// Routes resolved against an [`AirportTable`], in input order.
#[derive(Default, Debug)]
pub struct RouteTable {
    pub routes: Vec<Route>,

    /// Ids of routes left out for referencing unknown airports.
    pub skipped: Vec<String>,

    /// Codes of known airports referenced by any route, including routes
    /// that were skipped for their other endpoint.
    pub referenced: BTreeSet<String>,
}

impl RouteTable {
    /// Read the route table and resolve each route's endpoints.
    ///
    /// A route listed more than once is kept only at its first appearance.
    pub fn resolve<R: Read>(
        reader: R,
        airports: &AirportTable,
        policy: MissingAirportPolicy,
    ) -> Result<Self> {
        let mut table = RouteTable::default();
        let mut seen = HashSet::new();
        let mut rdr = csv::Reader::from_reader(reader);
        for row in rdr.deserialize() {
            let row: RouteRow = row?;
            let from = row.from.trim();
            let to = row.to.trim();
            let id = format!("{from}-{to}");
            if !seen.insert(id.clone()) {
                debug!("Ignoring repeated route {}", id);
                continue;
            }

            let endpoints = (airports.get(from), airports.get(to));
            for airport in [endpoints.0, endpoints.1].into_iter().flatten() {
                table.referenced.insert(airport.iata_code.clone());
            }

            match endpoints {
                (Some(origin), Some(destination)) => table.routes.push(Route {
                    id,
                    from: from.to_owned(),
                    to: to.to_owned(),
                    origin: origin.point,
                    destination: destination.point,
                }),

                (origin, _) => {
                    let code = if origin.is_none() { from } else { to };
                    match policy {
                        MissingAirportPolicy::Fail => {
                            return Err(TableError::MissingAirport {
                                route: id,
                                code: code.to_owned(),
                            });
                        }
                        MissingAirportPolicy::Skip => {
                            warn!("Skipping route {}: unknown airport {}", id, code);
                            table.skipped.push(id);
                        }
                    }
                }
            }
        }
        Ok(table)
    }

    /// Codes of all known airports referenced by the route table, sorted.
    pub fn airport_codes(&self) -> impl Iterator<Item = &str> {
        self.referenced.iter().map(String::as_str)
    }
}

const AIRPORT_POINTS_HEADER: [&str; 5] = ["iata_code", "name", "loc_name", "latitude", "longitude"];
const WAYPOINTS_HEADER: [&str; 3] = ["route", "latitude", "longitude"];

/// Write the airport point table for every known airport referenced by
/// `routes`, sorted by code. Returns the number of airports written.
pub fn write_airport_points<W: Write>(
    writer: W,
    airports: &AirportTable,
    routes: &RouteTable,
) -> Result<usize> {
    let mut w = csv::Writer::from_writer(writer);
    w.write_record(AIRPORT_POINTS_HEADER)?;
    let mut count = 0usize;
    for code in routes.airport_codes() {
        let Some(airport) = airports.get(code) else {
            continue;
        };
        let lat = airport.point.lat().0.to_string();
        let lon = airport.point.lon().0.to_string();
        w.write_record([
            airport.iata_code.as_str(),
            airport.name.as_str(),
            airport.loc_name.as_str(),
            lat.as_str(),
            lon.as_str(),
        ])?;
        count += 1;
    }
    w.flush()?;
    Ok(count)
}

#[derive(Deserialize)]
struct AirportPointRow {
    iata_code: String,
    name: String,
    loc_name: String,
    latitude: f64,
    longitude: f64,
}

/// Read back an airport point table written by [`write_airport_points`].
pub fn read_airport_points<R: Read>(reader: R) -> Result<Vec<Airport>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut airports = Vec::new();
    for row in rdr.deserialize() {
        let row: AirportPointRow = row?;
        airports.push(Airport {
            point: GeoPoint::new(Degrees(row.latitude), Degrees(row.longitude))?,
            iata_code: row.iata_code,
            name: row.name,
            loc_name: row.loc_name,
        });
    }
    Ok(airports)
}

/// One sample of a route, labeled with its route segment.
#[derive(Clone, PartialEq, Debug)]
pub struct Waypoint {
    /// Route id, with a `_1` suffix for the piece after an anti-meridian
    /// split.
    pub route: String,
    pub lat: Degrees<f64>,
    pub lon: Degrees<f64>,
}

/// Writes the route waypoint table, with coordinates to five decimal places.
pub struct WaypointWriter<W: Write> {
    writer: csv::Writer<W>,
    count: usize,
}

impl<W: Write> WaypointWriter<W> {
    /// Wrap `writer` and write the header row.
    pub fn new(writer: W) -> Result<Self> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(WAYPOINTS_HEADER)?;
        Ok(Self { writer, count: 0 })
    }

    pub fn write(&mut self, waypoint: &Waypoint) -> Result<()> {
        let lat = format!("{:.5}", waypoint.lat.0);
        let lon = format!("{:.5}", waypoint.lon.0);
        self.writer
            .write_record([waypoint.route.as_str(), lat.as_str(), lon.as_str()])?;
        self.count += 1;
        Ok(())
    }

    /// Flush the table, returning the number of waypoints written.
    pub fn finish(mut self) -> Result<usize> {
        self.writer.flush()?;
        Ok(self.count)
    }
}

#[derive(Deserialize)]
struct WaypointRow {
    route: String,
    latitude: f64,
    longitude: f64,
}

/// Read back a route waypoint table, preserving row order.
pub fn read_waypoints<R: Read>(reader: R) -> Result<Vec<Waypoint>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut waypoints = Vec::new();
    for row in rdr.deserialize() {
        let row: WaypointRow = row?;
        waypoints.push(Waypoint {
            route: row.route,
            lat: Degrees(row.latitude),
            lon: Degrees(row.longitude),
        });
    }
    Ok(waypoints)
}
