//! Anti-meridian splitting
//!
//! Map renderers draw a line between consecutive coordinates, so a route
//! whose longitudes jump from +179° to -179° appears to cross the whole map.
//! [`Splitter`] walks a route's samples in order and labels each with a
//! [`Segment`], starting a continuation segment at the first sample past the
//! split longitude.
//!
//! A route is split at most once. Once the continuation segment starts, all
//! later samples stay in it.
//!
//! The crossing test depends on the direction of travel, which is fixed per
//! route from the initial heading (see [`initial_direction`]). With unrolled
//! longitudes the threshold comparison alone finds the crossing. With
//! wrapped longitudes the crossing shows up as a sign flip between two
//! samples whose magnitudes together exceed 350°, which tells it apart from
//! an ordinary crossing of the prime meridian.

use strum::{Display, EnumString};
use thiserror::Error;

use crate::geographic::{GeodesicPath, GeographicError, LongitudeMode};
use crate::measure::Degrees;

#[derive(Error, Debug)]
pub enum SplitError {
    #[error("invalid travel direction: {0}")]
    InvalidDirection(String),
    #[error("Geographic computation")]
    Geographic(#[from] GeographicError),
}

type Result<T> = std::result::Result<T, SplitError>;

/// The default split longitude: the anti-meridian.
pub const ANTI_MERIDIAN: Degrees<f64> = Degrees(180.0);

/// Arc offset from the origin at which the initial heading is measured.
pub const DIRECTION_PROBE: Degrees<f64> = Degrees(0.01);

/// Sum of absolute longitudes above which a sign flip counts as a crossing.
const WRAP_SUM: f64 = 350.0;

/// Direction of travel in longitude.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    East,
    West,
}

impl Direction {
    /// Classify a forward azimuth: negative headings travel west.
    pub fn from_azimuth(azimuth: Degrees<f64>) -> Result<Self> {
        if azimuth.0.is_nan() {
            return Err(SplitError::InvalidDirection(format!(
                "azimuth {azimuth}"
            )));
        }
        if azimuth.0 < 0.0 {
            Ok(Self::West)
        } else {
            Ok(Self::East)
        }
    }

    /// Parse a direction name, failing on anything but `east` or `west`.
    pub fn parse(name: &str) -> Result<Self> {
        name.parse()
            .map_err(|_| SplitError::InvalidDirection(name.to_owned()))
    }
}

/// Determine a path's direction of travel from its heading just past the
/// origin.
pub fn initial_direction(path: &GeodesicPath) -> Result<Direction> {
    let probe = path.arc_position(DIRECTION_PROBE, LongitudeMode::Unrolled)?;
    Direction::from_azimuth(probe.azimuth)
}

/// Which piece of a route a sample belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Segment {
    /// Before any split, labeled with the route id.
    Base,
    /// From the split onward, labeled with the route id plus `_1`.
    Continuation,
}

impl Segment {
    pub fn label(self, route_id: &str) -> String {
        match self {
            Self::Base => route_id.to_owned(),
            Self::Continuation => format!("{route_id}_1"),
        }
    }
}

/// Accumulated state while labeling one route's samples.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct SplitState {
    /// Segment of the most recent sample.
    pub segment: Segment,

    /// False once the route has split.
    pub still_splittable: bool,

    /// Longitude of the most recent sample, or of the origin before the
    /// first sample.
    pub prev_longitude: Degrees<f64>,
}

/// Labels samples of a route travelling in a fixed direction.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Splitter {
    direction: Direction,
    threshold: Degrees<f64>,
}

impl Splitter {
    /// Create a splitter for the given direction of travel and split
    /// longitude.
    ///
    /// For westbound routes a positive threshold is taken 360° down, so that
    /// the default of 180° is compared as -180°.
    pub fn new(direction: Direction, threshold: Degrees<f64>) -> Self {
        let threshold = match direction {
            Direction::East => threshold,
            Direction::West if threshold.0 > 0.0 => threshold - Degrees(360.0),
            Direction::West => threshold,
        };
        Self {
            direction,
            threshold,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The threshold as compared against, after normalization.
    pub fn threshold(&self) -> Degrees<f64> {
        self.threshold
    }

    pub fn initial_state(&self, origin_lon: Degrees<f64>) -> SplitState {
        SplitState {
            segment: Segment::Base,
            still_splittable: true,
            prev_longitude: origin_lon,
        }
    }

    /// Whether moving from `prev` to `lon` crosses the split longitude.
    pub fn crosses(&self, prev: Degrees<f64>, lon: Degrees<f64>) -> bool {
        let past_threshold = match self.direction {
            Direction::East => lon > self.threshold,
            Direction::West => lon < self.threshold,
        };
        let wrapped = lon.0 * prev.0 < 0.0 && lon.0.abs() + prev.0.abs() > WRAP_SUM;
        past_threshold || wrapped
    }

    /// Advance the state by one sample. The returned state's segment is the
    /// one the sample belongs to.
    pub fn step(&self, state: SplitState, lon: Degrees<f64>) -> SplitState {
        if state.still_splittable && self.crosses(state.prev_longitude, lon) {
            SplitState {
                segment: Segment::Continuation,
                still_splittable: false,
                prev_longitude: lon,
            }
        } else {
            SplitState {
                prev_longitude: lon,
                ..state
            }
        }
    }

    /// Label a route's sample longitudes, given in order of travel.
    pub fn assign<I>(&self, origin_lon: Degrees<f64>, lons: I) -> Vec<Segment>
    where
        I: IntoIterator<Item = Degrees<f64>>,
    {
        lons.into_iter()
            .scan(self.initial_state(origin_lon), |state, lon| {
                *state = self.step(*state, lon);
                Some(state.segment)
            })
            .collect()
    }
}

/// Index of the first sample in the continuation segment, if any.
pub fn split_index(segments: &[Segment]) -> Option<usize> {
    segments.iter().position(|s| *s == Segment::Continuation)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::{
        ANTI_MERIDIAN, Direction, Segment, SplitError, Splitter, initial_direction, split_index,
    };
    use crate::geo_point;
    use crate::geographic::{GeodesicPath, LongitudeMode};
    use crate::measure::Degrees;
    use crate::sampler::{SampleStep, sample_geodesic};

    fn degs(lons: &[f64]) -> Vec<Degrees<f64>> {
        lons.iter().map(|&l| Degrees(l)).collect()
    }

    #[test]
    fn test_east_unrolled_threshold() {
        let splitter = Splitter::new(Direction::East, ANTI_MERIDIAN);
        let lons = degs(&[170.0, 175.0, 179.5, 183.0, 187.0]);
        let segments = splitter.assign(Degrees(170.0), lons);
        assert_eq!(split_index(&segments), Some(3));
        assert_eq!(
            segments,
            vec![
                Segment::Base,
                Segment::Base,
                Segment::Base,
                Segment::Continuation,
                Segment::Continuation,
            ]
        );
    }

    #[test]
    fn test_east_wrapped_sign_flip() {
        let splitter = Splitter::new(Direction::East, ANTI_MERIDIAN);
        let lons = degs(&[170.0, 175.0, 179.5, -177.0, -173.0]);
        let segments = splitter.assign(Degrees(170.0), lons);
        assert_eq!(split_index(&segments), Some(3));
    }

    #[test]
    fn test_prime_meridian_is_not_a_crossing() {
        for direction in [Direction::East, Direction::West] {
            let splitter = Splitter::new(direction, ANTI_MERIDIAN);
            let lons = degs(&[-5.0, -1.0, 3.0, 8.0]);
            let segments = splitter.assign(Degrees(-5.0), lons);
            assert_eq!(split_index(&segments), None);
        }
    }

    #[test]
    fn test_west_threshold_normalized() {
        let splitter = Splitter::new(Direction::West, ANTI_MERIDIAN);
        assert_eq!(splitter.threshold(), Degrees(-180.0));

        let lons = degs(&[-170.0, -178.0, -182.0, -190.0]);
        let segments = splitter.assign(Degrees(-170.0), lons);
        assert_eq!(split_index(&segments), Some(2));
    }

    #[test]
    fn test_west_wrapped_sign_flip() {
        let splitter = Splitter::new(Direction::West, ANTI_MERIDIAN);
        let lons = degs(&[-170.0, -178.0, 178.0, 170.0]);
        let segments = splitter.assign(Degrees(-170.0), lons);
        assert_eq!(split_index(&segments), Some(2));
    }

    #[test]
    fn test_never_reverts_after_split() {
        let splitter = Splitter::new(Direction::East, ANTI_MERIDIAN);
        // Back under the threshold, and another large sign flip: neither
        // starts a new segment.
        let lons = degs(&[179.0, 181.0, 175.0, -178.0, 179.0]);
        let segments = splitter.assign(Degrees(179.0), lons);
        assert_eq!(segments[0], Segment::Base);
        assert!(segments[1..].iter().all(|s| *s == Segment::Continuation));
    }

    #[test]
    fn test_first_point_can_split() {
        let splitter = Splitter::new(Direction::East, Degrees(170.0));
        let lons = degs(&[175.0, 178.0]);
        let segments = splitter.assign(Degrees(175.0), lons);
        assert_eq!(segments, vec![Segment::Continuation, Segment::Continuation]);
    }

    #[test]
    fn test_segment_labels() {
        assert_eq!(Segment::Base.label("NRT-SFO"), "NRT-SFO");
        assert_eq!(Segment::Continuation.label("NRT-SFO"), "NRT-SFO_1");
    }

    #[test]
    fn test_direction_parse() -> Result<()> {
        assert_eq!(Direction::parse("east")?, Direction::East);
        assert_eq!(Direction::parse("west")?, Direction::West);
        assert!(matches!(
            Direction::parse("north"),
            Err(SplitError::InvalidDirection(_))
        ));
        Ok(())
    }

    #[test]
    fn test_direction_from_azimuth() -> Result<()> {
        assert_eq!(Direction::from_azimuth(Degrees(45.0))?, Direction::East);
        assert_eq!(Direction::from_azimuth(Degrees(0.0))?, Direction::East);
        assert_eq!(Direction::from_azimuth(Degrees(-0.5))?, Direction::West);
        assert!(Direction::from_azimuth(Degrees(f64::NAN)).is_err());
        Ok(())
    }

    #[test]
    fn test_initial_direction() -> Result<()> {
        let nrt = geo_point!(35.7647, 140.3864);
        let sfo = geo_point!(37.6190, -122.3750);
        assert_eq!(
            initial_direction(&GeodesicPath::between(&nrt, &sfo)?)?,
            Direction::East
        );
        assert_eq!(
            initial_direction(&GeodesicPath::between(&sfo, &nrt)?)?,
            Direction::West
        );
        Ok(())
    }

    fn split_route(
        origin: crate::types::GeoPoint,
        destination: crate::types::GeoPoint,
        mode: LongitudeMode,
    ) -> Result<(Vec<Degrees<f64>>, Vec<Segment>, Direction)> {
        let sampled = sample_geodesic(&origin, &destination, SampleStep::default(), mode)?;
        let direction = initial_direction(&sampled.path)?;
        let splitter = Splitter::new(direction, ANTI_MERIDIAN);
        let lons = sampled.points.iter().map(|p| p.lon).collect::<Vec<_>>();
        let segments = splitter.assign(origin.lon(), lons.iter().copied());
        Ok((lons, segments, direction))
    }

    #[test]
    fn test_transpacific_eastbound() -> Result<()> {
        let nrt = geo_point!(35.7647, 140.3864);
        let sfo = geo_point!(37.6190, -122.3750);
        let (lons, segments, direction) = split_route(nrt, sfo, LongitudeMode::Unrolled)?;
        assert_eq!(direction, Direction::East);

        let expected = lons.iter().position(|l| l.0 > 180.0);
        assert!(expected.is_some());
        assert_eq!(split_index(&segments), expected);
        Ok(())
    }

    #[test]
    fn test_transpacific_westbound() -> Result<()> {
        let nrt = geo_point!(35.7647, 140.3864);
        let sfo = geo_point!(37.6190, -122.3750);
        let (lons, segments, direction) = split_route(sfo, nrt, LongitudeMode::Unrolled)?;
        assert_eq!(direction, Direction::West);

        let expected = lons.iter().position(|l| l.0 < -180.0);
        assert!(expected.is_some());
        assert_eq!(split_index(&segments), expected);
        Ok(())
    }

    #[test]
    fn test_wrapped_and_unrolled_agree() -> Result<()> {
        let nrt = geo_point!(35.7647, 140.3864);
        let sfo = geo_point!(37.6190, -122.3750);
        let (_, unrolled, _) = split_route(nrt, sfo, LongitudeMode::Unrolled)?;
        let (_, wrapped, _) = split_route(nrt, sfo, LongitudeMode::Wrapped)?;
        assert_eq!(split_index(&unrolled), split_index(&wrapped));
        Ok(())
    }

    #[test]
    fn test_atlantic_route_not_split() -> Result<()> {
        let jfk = geo_point!(40.6413, -73.7781);
        let lhr = geo_point!(51.4700, -0.4543);
        let (_, segments, direction) = split_route(jfk, lhr, LongitudeMode::Unrolled)?;
        assert_eq!(direction, Direction::East);
        assert_eq!(split_index(&segments), None);
        Ok(())
    }

    #[test]
    fn test_antipodal_route_splits_at_most_once() -> Result<()> {
        let a = geo_point!(0.0, 0.0);
        let b = geo_point!(0.0, 180.0);
        for mode in [LongitudeMode::Unrolled, LongitudeMode::Wrapped] {
            let (lons, segments, _) = split_route(a, b, mode)?;
            assert_eq!(segments.len(), lons.len());
            let continuation = segments
                .iter()
                .skip_while(|s| **s == Segment::Base)
                .collect::<Vec<_>>();
            assert!(continuation.iter().all(|s| **s == Segment::Continuation));
        }
        Ok(())
    }

    #[test]
    fn test_split_is_deterministic() -> Result<()> {
        let syd = geo_point!(-33.9461, 151.1772);
        let lax = geo_point!(33.9425, -118.4081);
        let (_, first, _) = split_route(syd, lax, LongitudeMode::Unrolled)?;
        for _ in 0..3 {
            let (_, again, _) = split_route(syd, lax, LongitudeMode::Unrolled)?;
            assert_eq!(again, first);
        }
        assert!(split_index(&first).is_some());
        Ok(())
    }

    #[cfg(not(target_arch = "wasm32"))]
    mod properties {
        use quickcheck_macros::quickcheck;

        use super::super::{ANTI_MERIDIAN, Direction, Segment, Splitter};
        use crate::measure::Degrees;

        #[quickcheck]
        fn qc_at_most_one_split(origin: f64, lons: Vec<f64>, west: bool) -> bool {
            let direction = if west { Direction::West } else { Direction::East };
            let splitter = Splitter::new(direction, ANTI_MERIDIAN);
            let segments = splitter.assign(Degrees(origin), lons.iter().map(|&l| Degrees(l)));

            // Base labels, if any, all precede continuation labels.
            segments.len() == lons.len()
                && segments
                    .windows(2)
                    .all(|w| !(w[0] == Segment::Continuation && w[1] == Segment::Base))
        }

        #[quickcheck]
        fn qc_split_at_first_crossing(origin: f64, lons: Vec<f64>, west: bool) -> bool {
            let direction = if west { Direction::West } else { Direction::East };
            let splitter = Splitter::new(direction, ANTI_MERIDIAN);
            let lons = lons.into_iter().map(Degrees).collect::<Vec<_>>();
            let segments = splitter.assign(Degrees(origin), lons.iter().copied());

            let mut prev = Degrees(origin);
            let mut expected = None;
            for (i, &lon) in lons.iter().enumerate() {
                if splitter.crosses(prev, lon) {
                    expected = Some(i);
                    break;
                }
                prev = lon;
            }
            super::split_index(&segments) == expected
        }
    }
}
