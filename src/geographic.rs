//! Functions from GeographicLib
//!
//! Wraps the pure Rust port of GeographicLib's geodesic routines in a
//! friendlier interface, all on the WGS84 ellipsoid.

use std::sync::LazyLock;

use geographiclib_rs::geodesic_capability as caps;
use geographiclib_rs::{Geodesic, InverseGeodesic};
use thiserror::Error;

use crate::measure::{Degrees, Meters};
use crate::types::GeoPoint;

#[derive(Error, Debug)]
pub enum GeographicError {
    #[error("non-finite {0} in geodesic solution")]
    NonFinite(&'static str),
}

type Result<T> = std::result::Result<T, GeographicError>;

static WGS84: LazyLock<Geodesic> = LazyLock::new(Geodesic::wgs84);

/// Whether positions along a path report longitude wrapped to [-180°, 180°]
/// or as a continuous ("unrolled") value that may leave that range.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum LongitudeMode {
    #[default]
    Unrolled,
    Wrapped,
}

/// A solution to the inverse problem in geodesy.
#[derive(Clone, Copy, Debug)]
pub struct InverseSolution {
    /// Arc distance between the points.
    pub arc_distance: Degrees<f64>,

    /// Geodesic distance between the points.
    pub geo_distance: Meters<f64>,

    /// Azimuth of the geodesic as measured at point1.
    pub azimuth1: Degrees<f64>,

    /// Azimuth of the geodesic as measured at point2.
    pub azimuth2: Degrees<f64>,
}

/// Calculate a solution to the inverse geodesic problem.
///
/// Finds the shortest geodesic between two points on the surface of WGS84.
pub fn geodesic_inverse(point1: &GeoPoint, point2: &GeoPoint) -> Result<InverseSolution> {
    let (s12, azi1, azi2, a12): (f64, f64, f64, f64) =
        WGS84.inverse(point1.lat().0, point1.lon().0, point2.lat().0, point2.lon().0);
    if !a12.is_finite() || !s12.is_finite() {
        return Err(GeographicError::NonFinite("distance"));
    }
    if !azi1.is_finite() || !azi2.is_finite() {
        return Err(GeographicError::NonFinite("azimuth"));
    }

    Ok(InverseSolution {
        arc_distance: Degrees(a12),
        geo_distance: Meters(s12),
        azimuth1: Degrees(azi1),
        azimuth2: Degrees(azi2),
    })
}

/// A position along a [`GeodesicPath`].
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct PathPosition {
    /// Arc distance from the start of the path.
    pub arc_offset: Degrees<f64>,

    pub lat: Degrees<f64>,

    /// Longitude, unrolled or wrapped according to the requested
    /// [`LongitudeMode`].
    pub lon: Degrees<f64>,

    /// Forward azimuth of the path at this position.
    pub azimuth: Degrees<f64>,
}

/// The geodesic between two points.
///
/// Holds the solution to the inverse problem and evaluates positions along
/// the geodesic by solving the direct problem from the start point, either
/// by arc length or by distance.
#[derive(Clone, Copy, Debug)]
pub struct GeodesicPath {
    origin: GeoPoint,
    inverse: InverseSolution,
}

impl GeodesicPath {
    pub fn between(origin: &GeoPoint, destination: &GeoPoint) -> Result<Self> {
        Ok(Self {
            origin: *origin,
            inverse: geodesic_inverse(origin, destination)?,
        })
    }

    /// Total arc length of the path (a13).
    pub fn arc_length(&self) -> Degrees<f64> {
        self.inverse.arc_distance
    }

    /// Total length of the path.
    pub fn distance(&self) -> Meters<f64> {
        self.inverse.geo_distance
    }

    /// Evaluate the position at an arc distance from the start point.
    pub fn arc_position(&self, offset: Degrees<f64>, mode: LongitudeMode) -> Result<PathPosition> {
        self.position(true, offset.0, mode)
    }

    /// Evaluate the position at a geodesic distance from the start point.
    pub fn distance_position(
        &self,
        offset: Meters<f64>,
        mode: LongitudeMode,
    ) -> Result<PathPosition> {
        self.position(false, offset.0, mode)
    }

    fn position(&self, arcmode: bool, s12_a12: f64, mode: LongitudeMode) -> Result<PathPosition> {
        let mut outmask = caps::LATITUDE | caps::LONGITUDE | caps::AZIMUTH;
        if mode == LongitudeMode::Unrolled {
            outmask |= caps::LONG_UNROLL;
        }
        let (a12, lat2, lon2, azi2, _s12, _m12, _mm12, _mm21, _ss12) = WGS84._gen_direct(
            self.origin.lat().0,
            self.origin.lon().0,
            self.inverse.azimuth1.0,
            arcmode,
            s12_a12,
            outmask,
        );
        if !lat2.is_finite() || !lon2.is_finite() {
            return Err(GeographicError::NonFinite("position"));
        }
        if !azi2.is_finite() {
            return Err(GeographicError::NonFinite("azimuth"));
        }

        Ok(PathPosition {
            arc_offset: Degrees(a12),
            lat: Degrees(lat2),
            lon: Degrees(lon2),
            azimuth: Degrees(azi2),
        })
    }
}
