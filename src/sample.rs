//! Sample model for the metrics engine
//!
//! This module defines the typed per-tick payloads injected by the external
//! sample source (poses, gaze rays, controller input) plus the small vector
//! math they need. Samples are copied into metric-owned history; the engine
//! never mutates the source payload.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// 3D vector in world coordinates (meters)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };
    pub const UP: Vec3 = Vec3 { x: 0.0, y: 1.0, z: 0.0 };
    pub const FORWARD: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 1.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn length_squared(self) -> f64 {
        self.dot(self)
    }

    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    pub fn distance(self, other: Vec3) -> f64 {
        (self - other).length()
    }

    /// Unit-length copy; zero-length vectors normalize to zero
    pub fn normalized(self) -> Vec3 {
        let len = self.length();
        if len > 1e-12 {
            self * (1.0 / len)
        } else {
            Vec3::ZERO
        }
    }

    /// Angle between two directions in degrees; zero if either is degenerate
    pub fn angle_between_deg(self, other: Vec3) -> f64 {
        let denom = self.length() * other.length();
        if denom <= 1e-12 {
            return 0.0;
        }
        let cos = (self.dot(other) / denom).clamp(-1.0, 1.0);
        cos.acos().to_degrees()
    }

    /// Horizontal view angle in degrees, in [-180, 180)
    pub fn yaw_deg(self) -> f64 {
        self.x.atan2(self.z).to_degrees()
    }

    /// Vertical view angle in degrees, in [-90, 90]
    pub fn pitch_deg(self) -> f64 {
        let len = self.length();
        if len <= 1e-12 {
            return 0.0;
        }
        (self.y / len).clamp(-1.0, 1.0).asin().to_degrees()
    }
}

impl std::ops::Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Mul<f64> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Unit quaternion rotation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    pub const IDENTITY: Quat = Quat { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };

    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Rotation about an axis by an angle in degrees
    pub fn from_axis_angle_deg(axis: Vec3, angle_deg: f64) -> Self {
        let axis = axis.normalized();
        let half = angle_deg.to_radians() * 0.5;
        let s = half.sin();
        Self {
            x: axis.x * s,
            y: axis.y * s,
            z: axis.z * s,
            w: half.cos(),
        }
    }

    /// Rotate a vector by this quaternion
    pub fn rotate(self, v: Vec3) -> Vec3 {
        // v' = v + 2 * q_vec x (q_vec x v + w * v)
        let q = Vec3::new(self.x, self.y, self.z);
        let t = cross(q, v) * 2.0;
        v + t * self.w + cross(q, t)
    }

    /// Shortest rotation angle to another orientation, in degrees
    pub fn angle_to_deg(self, other: Quat) -> f64 {
        let dot = (self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w)
            .abs()
            .clamp(0.0, 1.0);
        (2.0 * dot.acos()).to_degrees()
    }

    /// Forward direction of this orientation
    pub fn forward(self) -> Vec3 {
        self.rotate(Vec3::FORWARD)
    }
}

fn cross(a: Vec3, b: Vec3) -> Vec3 {
    Vec3::new(
        a.y * b.z - a.z * b.y,
        a.z * b.x - a.x * b.z,
        a.x * b.y - a.y * b.x,
    )
}

/// Rigid pose of a tracked device
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation.forward()
    }
}

/// Which hand a controller sample belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Hand::Left => "left",
            Hand::Right => "right",
        }
    }
}

/// Opaque scene-assigned entity identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity-{}", self.0)
    }
}

/// Ground-truth category of a scene entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    Hostile,
    Friendly,
    Unknown,
}

impl EntityCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityCategory::Hostile => "hostile",
            EntityCategory::Friendly => "friendly",
            EntityCategory::Unknown => "unknown",
        }
    }
}

/// Entity found under a gaze or aim raycast
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RaycastEntity {
    pub id: EntityId,
    pub category: EntityCategory,
    /// Whether the entity participates in attention/threat tracking
    pub trackable: bool,
}

/// Raycast result supplied by the external scene
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RaycastHit {
    /// World-space intersection point
    pub point: Vec3,
    /// Entity under the ray, if any ("nothing hit" is a normal outcome)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<RaycastEntity>,
}

/// Per-tick gaze sample
///
/// Eye-tracking data may be absent (device not present or eyes closed); the
/// head pose is always available and serves as the silent fallback direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeSample {
    /// Head pose in world space
    pub head: Pose,
    /// Eye gaze direction in world space, when eye tracking provides one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eye_direction: Option<Vec3>,
    /// Combined eye openness (0-1)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eye_openness: Option<f64>,
    /// Scene raycast along the effective gaze direction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hit: Option<RaycastHit>,
}

impl GazeSample {
    /// Effective gaze origin
    pub fn origin(&self) -> Vec3 {
        self.head.position
    }

    /// Effective gaze direction: eye tracking when available, head forward otherwise
    pub fn direction(&self) -> Vec3 {
        match self.eye_direction {
            Some(dir) if dir.length_squared() > 1e-12 => dir.normalized(),
            _ => self.head.forward(),
        }
    }
}

/// Per-tick hand-controller sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerSample {
    pub hand: Hand,
    pub pose: Pose,
    /// Trigger axis (0-1)
    pub trigger: f64,
    /// Grip axis (0-1)
    pub grip: f64,
    /// Entity under the controller's forward ray, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pointed_at: Option<RaycastEntity>,
}

/// Per-tick head sample for view-direction analytics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadSample {
    pub pose: Pose,
}

/// A raw data point retained in a metric's capped history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDataPoint<T> {
    /// Simulation time of capture (seconds)
    pub timestamp: f64,
    /// Seconds since recording started
    pub relative_time: f64,
    pub payload: T,
}

/// Bounded, monotonically timestamped sample history with FIFO eviction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleHistory<T> {
    points: VecDeque<RawDataPoint<T>>,
    cap: usize,
}

impl<T> SampleHistory<T> {
    pub fn new(cap: usize) -> Self {
        Self {
            points: VecDeque::new(),
            cap: cap.max(1),
        }
    }

    /// Append a point, evicting the oldest once the cap is exceeded
    pub fn push(&mut self, timestamp: f64, relative_time: f64, payload: T) {
        self.points.push_back(RawDataPoint {
            timestamp,
            relative_time,
            payload,
        });
        while self.points.len() > self.cap {
            self.points.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Replace the cap, evicting oldest points if the new cap is smaller
    pub fn set_cap(&mut self, cap: usize) {
        self.cap = cap.max(1);
        while self.points.len() > self.cap {
            self.points.pop_front();
        }
    }

    pub fn latest(&self) -> Option<&RawDataPoint<T>> {
        self.points.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RawDataPoint<T>> {
        self.points.iter()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_angle_between() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 1.0, 0.0);
        assert!((a.angle_between_deg(b) - 90.0).abs() < 1e-9);
        assert!((a.angle_between_deg(a) - 0.0).abs() < 1e-9);
        assert_eq!(Vec3::ZERO.angle_between_deg(a), 0.0);
    }

    #[test]
    fn test_yaw_pitch_extraction() {
        assert!((Vec3::FORWARD.yaw_deg() - 0.0).abs() < 1e-9);
        assert!((Vec3::new(1.0, 0.0, 0.0).yaw_deg() - 90.0).abs() < 1e-9);
        assert!((Vec3::UP.pitch_deg() - 90.0).abs() < 1e-9);
        let level = Vec3::new(0.3, 0.0, 0.7);
        assert!((level.pitch_deg() - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_quat_rotate_yaw() {
        let quarter_turn = Quat::from_axis_angle_deg(Vec3::UP, 90.0);
        let rotated = quarter_turn.rotate(Vec3::FORWARD);
        assert!((rotated.x - 1.0).abs() < 1e-9);
        assert!(rotated.z.abs() < 1e-9);
    }

    #[test]
    fn test_quat_angle_to() {
        let a = Quat::IDENTITY;
        let b = Quat::from_axis_angle_deg(Vec3::UP, 30.0);
        assert!((a.angle_to_deg(b) - 30.0).abs() < 1e-6);
        assert!((a.angle_to_deg(a) - 0.0).abs() < 1e-6);
    }

    #[test]
    fn test_gaze_direction_fallback_is_silent() {
        let head = Pose::new(Vec3::ZERO, Quat::from_axis_angle_deg(Vec3::UP, 90.0));
        let sample = GazeSample {
            head,
            eye_direction: None,
            eye_openness: None,
            hit: None,
        };
        let dir = sample.direction();
        assert!((dir.x - 1.0).abs() < 1e-9);

        let tracked = GazeSample {
            eye_direction: Some(Vec3::FORWARD),
            ..sample
        };
        assert!((tracked.direction().z - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_history_fifo_eviction_preserves_order() {
        let mut history = SampleHistory::new(10_000);
        for i in 0..10_050u64 {
            history.push(i as f64 * 0.01, i as f64 * 0.01, i);
        }
        assert_eq!(history.len(), 10_000);

        let payloads: Vec<u64> = history.iter().map(|p| p.payload).collect();
        assert_eq!(payloads[0], 50);
        assert_eq!(*payloads.last().unwrap(), 10_049);
        assert!(payloads.windows(2).all(|w| w[1] == w[0] + 1));
    }

    #[test]
    fn test_history_set_cap_shrinks() {
        let mut history = SampleHistory::new(100);
        for i in 0..100u64 {
            history.push(i as f64, i as f64, i);
        }
        history.set_cap(10);
        assert_eq!(history.len(), 10);
        assert_eq!(history.iter().next().unwrap().payload, 90);
    }
}
