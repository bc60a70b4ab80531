//! GeoJSON output
//!
//! Builds GeoJSON feature collections from the route waypoint and airport
//! point tables. Waypoints are grouped by their route segment label into
//! `LineString` features, in the order each label first appears in the
//! table, and each airport becomes a `Point` feature.

use std::collections::HashMap;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::table::{Airport, TableError, Waypoint, read_airport_points, read_waypoints};

#[derive(Error, Debug)]
pub enum GeoJsonError {
    #[error("Reading table")]
    Table(#[from] TableError),
    #[error("JSON serialization error")]
    Json(#[from] serde_json::Error),
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

type Result<T> = std::result::Result<T, GeoJsonError>;

/// A GeoJSON position, `[longitude, latitude]`.
pub type Position = [f64; 2];

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    LineString(Vec<Position>),
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct Feature<P> {
    pub geometry: Geometry,
    pub properties: P,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct FeatureCollection<P> {
    pub features: Vec<Feature<P>>,
}

impl<P: Serialize> FeatureCollection<P> {
    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct RouteProperties {
    pub route: String,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct AirportProperties {
    /// Map label for the point; the IATA code.
    pub name: String,
    pub iata_code: String,
    pub airport_name: String,
    pub loc_name: String,
}

/// Group waypoints into one `LineString` per route segment label.
pub fn route_lines(waypoints: &[Waypoint]) -> FeatureCollection<RouteProperties> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut lines: Vec<(&str, Vec<Position>)> = Vec::new();
    for waypoint in waypoints {
        let i = *index.entry(waypoint.route.as_str()).or_insert_with(|| {
            lines.push((waypoint.route.as_str(), Vec::new()));
            lines.len() - 1
        });
        lines[i].1.push([waypoint.lon.0, waypoint.lat.0]);
    }

    FeatureCollection {
        features: lines
            .into_iter()
            .map(|(route, coordinates)| Feature {
                geometry: Geometry::LineString(coordinates),
                properties: RouteProperties {
                    route: route.to_owned(),
                },
            })
            .collect(),
    }
}

/// One `Point` per airport.
pub fn airport_points(airports: &[Airport]) -> FeatureCollection<AirportProperties> {
    FeatureCollection {
        features: airports
            .iter()
            .map(|a| Feature {
                geometry: Geometry::Point([a.point.lon().0, a.point.lat().0]),
                properties: AirportProperties {
                    name: a.iata_code.clone(),
                    iata_code: a.iata_code.clone(),
                    airport_name: a.name.clone(),
                    loc_name: a.loc_name.clone(),
                },
            })
            .collect(),
    }
}

/// Read a route waypoint table and write it as a GeoJSON feature
/// collection. Returns the number of line features.
pub fn convert_route_points<R: Read, W: Write>(route_points_csv: R, output: W) -> Result<usize> {
    let waypoints = read_waypoints(route_points_csv)?;
    let collection = route_lines(&waypoints);
    debug!(
        "Grouped {} waypoints into {} lines",
        waypoints.len(),
        collection.features.len()
    );
    collection.write(output)?;
    Ok(collection.features.len())
}

/// Read an airport point table and write it as a GeoJSON feature
/// collection. Returns the number of point features.
pub fn convert_airport_points<R: Read, W: Write>(
    airport_points_csv: R,
    output: W,
) -> Result<usize> {
    let airports = read_airport_points(airport_points_csv)?;
    let collection = airport_points(&airports);
    collection.write(output)?;
    Ok(collection.features.len())
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde_json::{Value, json};

    use super::{
        FeatureCollection, Geometry, RouteProperties, convert_airport_points, convert_route_points,
    };

    const ROUTE_POINTS: &str = "\
route,latitude,longitude
NRT-SFO,35.76470,140.38640
NRT-SFO,42.10000,160.20000
NRT-SFO,47.00000,179.50000
NRT-SFO_1,48.20000,-176.40000
NRT-SFO_1,37.61900,-122.37500
JFK-LHR,40.64130,-73.77810
JFK-LHR,51.47000,-0.45430
";

    #[test]
    fn test_route_lines_grouped_in_order() -> Result<()> {
        let mut out = Vec::new();
        let count = convert_route_points(ROUTE_POINTS.as_bytes(), &mut out)?;
        assert_eq!(count, 3);

        let collection: FeatureCollection<RouteProperties> = serde_json::from_slice(&out)?;
        let routes = collection
            .features
            .iter()
            .map(|f| f.properties.route.as_str())
            .collect::<Vec<_>>();
        assert_eq!(routes, vec!["NRT-SFO", "NRT-SFO_1", "JFK-LHR"]);
        assert_eq!(
            collection.features[1].geometry,
            Geometry::LineString(vec![[-176.4, 48.2], [-122.375, 37.619]])
        );
        Ok(())
    }

    #[test]
    fn test_every_waypoint_in_one_line() -> Result<()> {
        let mut out = Vec::new();
        convert_route_points(ROUTE_POINTS.as_bytes(), &mut out)?;
        let collection: FeatureCollection<RouteProperties> = serde_json::from_slice(&out)?;

        let table = crate::table::read_waypoints(ROUTE_POINTS.as_bytes())?;
        let mut seen = 0usize;
        for feature in &collection.features {
            let Geometry::LineString(coords) = &feature.geometry else {
                panic!("expected a LineString");
            };
            let rows = table
                .iter()
                .filter(|w| w.route == feature.properties.route)
                .map(|w| [w.lon.0, w.lat.0])
                .collect::<Vec<_>>();
            assert_eq!(coords, &rows);
            seen += coords.len();
        }
        assert_eq!(seen, table.len());
        Ok(())
    }

    #[test]
    fn test_airport_point_properties() -> Result<()> {
        let input = "\
iata_code,name,loc_name,latitude,longitude
JFK,John F Kennedy International Airport,New York,40.6413,-73.7781
";
        let mut out = Vec::new();
        assert_eq!(convert_airport_points(input.as_bytes(), &mut out)?, 1);

        let value: Value = serde_json::from_slice(&out)?;
        assert_eq!(
            value,
            json!({
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "geometry": {"type": "Point", "coordinates": [-73.7781, 40.6413]},
                    "properties": {
                        "name": "JFK",
                        "iata_code": "JFK",
                        "airport_name": "John F Kennedy International Airport",
                        "loc_name": "New York"
                    }
                }]
            })
        );
        Ok(())
    }
}
