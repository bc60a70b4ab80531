//! Waypoint sampling along a geodesic
//!
//! Turns an origin/destination pair into an ordered sequence of positions
//! along the geodesic between them. Positions are spaced evenly in arc
//! length (or in distance, for [`SampleStep::Distance`]), so the spacing in
//! longitude varies along the path.
//!
//! The requested step is a target: the number of segments `n` is the
//! smallest that keeps each step no longer than requested, and the step
//! actually used is the total length divided by `n`. Both endpoints are
//! always included.

use std::fmt::{Display, Formatter};

use thiserror::Error;
use tracing::{debug, instrument};

use crate::geographic::{GeodesicPath, GeographicError, LongitudeMode, PathPosition};
use crate::measure::{Degrees, Meters};
use crate::types::GeoPoint;

#[derive(Error, Debug)]
pub enum SampleError {
    #[error("Geographic computation")]
    Geographic(#[from] GeographicError),
    #[error("sampling step must be positive and finite, got {0}")]
    InvalidStep(SampleStep),
}

type Result<T> = std::result::Result<T, SampleError>;

/// Spacing between consecutive samples along a geodesic.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum SampleStep {
    /// Angular spacing, in degrees of arc on the auxiliary sphere.
    Arc(Degrees<f64>),

    /// Linear spacing along the ellipsoid surface.
    Distance(Meters<f64>),
}

impl Default for SampleStep {
    fn default() -> Self {
        Self::Arc(Degrees(1.0))
    }
}

impl Display for SampleStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Arc(a) => write!(f, "{a} of arc"),
            Self::Distance(d) => write!(f, "{d}"),
        }
    }
}

impl SampleStep {
    fn magnitude(self) -> f64 {
        match self {
            Self::Arc(a) => a.0,
            Self::Distance(d) => d.0,
        }
    }

    /// Reject steps that are not positive and finite.
    pub fn validate(self) -> Result<Self> {
        let m = self.magnitude();
        if m.is_finite() && m > 0.0 {
            Ok(self)
        } else {
            Err(SampleError::InvalidStep(self))
        }
    }
}

/// The samples taken along one geodesic.
#[derive(Clone, Debug)]
pub struct SampledPath {
    /// The geodesic that was sampled.
    pub path: GeodesicPath,

    /// The step actually used, which evenly divides the path.
    pub step: SampleStep,

    /// Samples in order of increasing offset from the origin. There are
    /// always `segments + 1` of them.
    pub points: Vec<PathPosition>,
}

impl SampledPath {
    /// The number of equal segments the path was divided into.
    pub fn segments(&self) -> usize {
        self.points.len() - 1
    }
}

/// Number of equal segments needed so that none is longer than `step`.
///
/// Never less than one, so that coincident endpoints still produce a start
/// and an end sample.
pub fn segment_count(total: f64, step: f64) -> usize {
    let n = (total / step).ceil();
    if n.is_finite() && n >= 1.0 {
        n as usize
    } else {
        1
    }
}

/// Sample positions along the geodesic from `origin` to `destination`.
#[instrument(level = "trace", skip_all)]
pub fn sample_geodesic(
    origin: &GeoPoint,
    destination: &GeoPoint,
    step: SampleStep,
    mode: LongitudeMode,
) -> Result<SampledPath> {
    let step = step.validate()?;
    let path = GeodesicPath::between(origin, destination)?;

    let (actual, points) = match step {
        SampleStep::Arc(da) => {
            let n = segment_count(path.arc_length().0, da.0);
            let da = path.arc_length() / n as f64;
            let points = (0..=n)
                .map(|i| path.arc_position(da * i as f64, mode))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            (SampleStep::Arc(da), points)
        }

        SampleStep::Distance(ds) => {
            let n = segment_count(path.distance().0, ds.0);
            let ds = path.distance() / n as f64;
            let points = (0..=n)
                .map(|i| path.distance_position(ds * i as f64, mode))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            (SampleStep::Distance(ds), points)
        }
    };

    debug!(
        "Sampled {} points over {} ({}) with step {}",
        points.len(),
        path.arc_length(),
        path.distance(),
        actual
    );

    Ok(SampledPath {
        path,
        step: actual,
        points,
    })
}
