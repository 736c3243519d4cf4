//! Named body landmarks produced by a pose detector.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use nalgebra::Point2;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// The 17 COCO body landmarks, in model output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Landmark {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl Landmark {
    /// Every landmark in COCO order.
    pub const ALL: [Landmark; 17] = [
        Landmark::Nose,
        Landmark::LeftEye,
        Landmark::RightEye,
        Landmark::LeftEar,
        Landmark::RightEar,
        Landmark::LeftShoulder,
        Landmark::RightShoulder,
        Landmark::LeftElbow,
        Landmark::RightElbow,
        Landmark::LeftWrist,
        Landmark::RightWrist,
        Landmark::LeftHip,
        Landmark::RightHip,
        Landmark::LeftKnee,
        Landmark::RightKnee,
        Landmark::LeftAnkle,
        Landmark::RightAnkle,
    ];

    /// Index of this landmark in COCO keypoint order.
    #[inline]
    pub fn coco_index(self) -> usize {
        self as usize
    }

    /// Upper snake case name, e.g. `LEFT_SHOULDER`.
    pub fn name(self) -> &'static str {
        match self {
            Landmark::Nose => "NOSE",
            Landmark::LeftEye => "LEFT_EYE",
            Landmark::RightEye => "RIGHT_EYE",
            Landmark::LeftEar => "LEFT_EAR",
            Landmark::RightEar => "RIGHT_EAR",
            Landmark::LeftShoulder => "LEFT_SHOULDER",
            Landmark::RightShoulder => "RIGHT_SHOULDER",
            Landmark::LeftElbow => "LEFT_ELBOW",
            Landmark::RightElbow => "RIGHT_ELBOW",
            Landmark::LeftWrist => "LEFT_WRIST",
            Landmark::RightWrist => "RIGHT_WRIST",
            Landmark::LeftHip => "LEFT_HIP",
            Landmark::RightHip => "RIGHT_HIP",
            Landmark::LeftKnee => "LEFT_KNEE",
            Landmark::RightKnee => "RIGHT_KNEE",
            Landmark::LeftAnkle => "LEFT_ANKLE",
            Landmark::RightAnkle => "RIGHT_ANKLE",
        }
    }
}

impl fmt::Display for Landmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown landmark name: {0}")]
pub struct UnknownLandmark(pub String);

impl FromStr for Landmark {
    type Err = UnknownLandmark;

    /// Case-insensitive; accepts `LEFT_SHOULDER`, `left_shoulder` and
    /// `left-shoulder`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Landmark::ALL
            .into_iter()
            .find(|l| l.name() == normalized)
            .ok_or_else(|| UnknownLandmark(s.to_string()))
    }
}

/// A 2D landmark position with the detector's visibility score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub position: Point2<f32>,
    pub confidence: f32,
}

impl Keypoint {
    /// Stand-in for a landmark the detector did not report.
    pub fn sentinel() -> Self {
        Self {
            position: Point2::origin(),
            confidence: 0.0,
        }
    }

    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            position: Point2::new(x, y),
            confidence: 1.0,
        }
    }

    /// Set the detector visibility score.
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.position.x
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.position.y
    }

    /// True when the point sits on the origin, i.e. carries no data.
    #[inline]
    pub fn is_sentinel(&self) -> bool {
        self.position.x == 0.0 && self.position.y == 0.0
    }

    /// True when both coordinates are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.position.x.is_finite() && self.position.y.is_finite()
    }
}

/// Landmark → keypoint lookup where absent landmarks read as
/// [`Keypoint::sentinel`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeypointMap {
    points: BTreeMap<Landmark, Keypoint>,
}

impl KeypointMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from string-named points, skipping names that are not
    /// COCO landmarks.
    pub fn from_named<I, S>(points: I) -> Self
    where
        I: IntoIterator<Item = (S, Keypoint)>,
        S: AsRef<str>,
    {
        let mut map = Self::new();
        for (name, kp) in points {
            match name.as_ref().parse::<Landmark>() {
                Ok(landmark) => {
                    map.insert(landmark, kp);
                }
                Err(e) => debug!("ignoring keypoint: {e}"),
            }
        }
        map
    }

    /// Insert a keypoint, returning the previous one for that landmark.
    pub fn insert(&mut self, landmark: Landmark, keypoint: Keypoint) -> Option<Keypoint> {
        self.points.insert(landmark, keypoint)
    }

    /// Builder form of [`insert`](Self::insert) with full confidence.
    pub fn with(mut self, landmark: Landmark, x: f32, y: f32) -> Self {
        self.insert(landmark, Keypoint::new(x, y));
        self
    }

    /// Keypoint for `landmark`, or the sentinel when it was not reported or
    /// has a non-finite coordinate.
    pub fn get(&self, landmark: Landmark) -> Keypoint {
        self.points
            .get(&landmark)
            .copied()
            .filter(Keypoint::is_finite)
            .unwrap_or_else(Keypoint::sentinel)
    }

    /// Landmarks among `required` that are absent or at the sentinel.
    pub fn missing(&self, required: &[Landmark]) -> Vec<Landmark> {
        required
            .iter()
            .copied()
            .filter(|&l| self.get(l).is_sentinel())
            .collect()
    }

    /// Number of stored landmarks.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Stored landmarks in COCO order.
    pub fn iter(&self) -> impl Iterator<Item = (Landmark, Keypoint)> + '_ {
        self.points.iter().map(|(&l, &k)| (l, k))
    }
}

impl FromIterator<(Landmark, Keypoint)> for KeypointMap {
    fn from_iter<T: IntoIterator<Item = (Landmark, Keypoint)>>(iter: T) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}
