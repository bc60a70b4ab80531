use thiserror::Error;

use crate::measure::Degrees;

#[derive(Error, Debug)]
pub enum TypeError {
    #[error("geographic point invariant: invalid value {1:?} for {0:?}")]
    GeoPointInvariant(GeoPointDimension, Degrees<f64>),
}

type Result<T> = std::result::Result<T, TypeError>;

/// A point on the surface of the WGS84 ellipsoid.
///
/// Enforces valid latitude and longitude values as type invariants.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct GeoPoint {
    lat: Degrees<f64>,
    lon: Degrees<f64>,
}

#[derive(Debug)]
pub enum GeoPointDimension {
    Latitude,
    Longitude,
}

impl GeoPoint {
    pub fn new(lat: Degrees<f64>, lon: Degrees<f64>) -> Result<GeoPoint> {
        if !(-90.0..=90.0).contains(&lat.0) {
            return Err(TypeError::GeoPointInvariant(
                GeoPointDimension::Latitude,
                lat,
            ));
        }
        if !(-180.0..=180.0).contains(&lon.0) {
            return Err(TypeError::GeoPointInvariant(
                GeoPointDimension::Longitude,
                lon,
            ));
        }
        Ok(Self { lat, lon })
    }

    /// Get point latitude
    pub fn lat(&self) -> Degrees<f64> {
        self.lat
    }

    /// Get point longitude
    pub fn lon(&self) -> Degrees<f64> {
        self.lon
    }
}

/// Instantiate a `GeoPoint` with a tuple-like syntax.
#[macro_export]
macro_rules! geo_point {
    ( $lat:expr, $lon:expr ) => {
        $crate::types::GeoPoint::new(
            $crate::measure::Degrees($lat),
            $crate::measure::Degrees($lon),
        )?
    };
}
