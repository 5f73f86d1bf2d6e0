use std::fmt;
use std::str::FromStr;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{LocomotionError, LocomotionResult};

/// Tuning values for the locomotion controller.
///
/// Defaults reproduce the booth scene: a 0.2 s cross-fade, walking at
/// 2 units/s, running at 5 units/s and snapping at most 0.2 rad per tick
/// towards the desired facing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocomotionConfig {
    pub fade_duration: f32,
    pub walk_velocity: f32,
    pub run_velocity: f32,
    /// Maximum rotation per update, in radians. Not scaled by frame time.
    pub turn_step: f32,
    pub eye_height: f32,
    pub run_by_default: bool,
    /// Upper bound applied to the frame delta before integration.
    pub max_frame_delta: f32,
    pub bounds: Bounds,
    pub bounds_policy: BoundsPolicy,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            fade_duration: 0.2,
            walk_velocity: 2.0,
            run_velocity: 5.0,
            turn_step: 0.2,
            eye_height: 1.0,
            run_by_default: true,
            max_frame_delta: 1.0,
            bounds: Bounds::default(),
            bounds_policy: BoundsPolicy::default(),
        }
    }
}

impl LocomotionConfig {
    pub fn validate(&self) -> LocomotionResult<()> {
        let positive = [
            ("fade_duration", self.fade_duration),
            ("walk_velocity", self.walk_velocity),
            ("run_velocity", self.run_velocity),
            ("turn_step", self.turn_step),
            ("max_frame_delta", self.max_frame_delta),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(LocomotionError::InvalidConfig(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        if !self.eye_height.is_finite() {
            return Err(LocomotionError::InvalidConfig(
                "eye_height must be finite".into(),
            ));
        }
        self.bounds.validate()
    }

    /// Offset from the avatar origin to the point the orbit camera looks at.
    pub fn eye_offset(&self) -> Vec3 {
        Vec3::new(0.0, self.eye_height, 0.0)
    }
}

/// Axis-aligned rectangle on the horizontal (XZ) plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_z: f32,
    pub max_z: f32,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min_x: -1.1,
            max_x: 1.1,
            min_z: -0.6,
            max_z: 0.6,
        }
    }
}

impl Bounds {
    pub fn new(min_x: f32, min_z: f32, max_x: f32, max_z: f32) -> Self {
        Self {
            min_x,
            max_x,
            min_z,
            max_z,
        }
    }

    /// Boundary points count as inside.
    pub fn contains(&self, point: Vec3) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.z >= self.min_z
            && point.z <= self.max_z
    }

    fn validate(&self) -> LocomotionResult<()> {
        let values = [self.min_x, self.max_x, self.min_z, self.max_z];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(LocomotionError::InvalidConfig(
                "bounds must be finite".into(),
            ));
        }
        if self.min_x > self.max_x || self.min_z > self.max_z {
            return Err(LocomotionError::InvalidConfig(format!(
                "bounds are inverted: x [{}, {}], z [{}, {}]",
                self.min_x, self.max_x, self.min_z, self.max_z
            )));
        }
        Ok(())
    }
}

/// How the bounds rectangle gates a candidate move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoundsPolicy {
    /// Moves commit only outside the rectangle and the camera is shifted
    /// once more after the gate, so a committed move drags the camera by
    /// twice the displacement and a blocked one still drags it once.
    #[default]
    Legacy,
    /// The rectangle is an obstacle; camera follows the avatar exactly.
    KeepOut,
    /// The rectangle is the walkable area; camera follows the avatar exactly.
    KeepIn,
}

impl BoundsPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::KeepOut => "keep-out",
            Self::KeepIn => "keep-in",
        }
    }
}

impl fmt::Display for BoundsPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoundsPolicy {
    type Err = LocomotionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(Self::Legacy),
            "keep-out" | "keepout" => Ok(Self::KeepOut),
            "keep-in" | "keepin" => Ok(Self::KeepIn),
            other => Err(LocomotionError::InvalidConfig(format!(
                "unknown bounds policy `{other}`"
            ))),
        }
    }
}
