//! Shared physics enums and flags

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// How a force or torque is applied to a dynamic body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ForceMode {
    /// Continuous force, integrated over the next step and scaled by mass
    #[default]
    Force,
    /// Instantaneous change in momentum
    Impulse,
    /// Instantaneous change in velocity, independent of mass
    VelocityChange,
    /// Continuous acceleration over the next step, independent of mass
    Acceleration,
}

bitflags! {
    /// Locked translation and rotation axes.
    ///
    /// Bit layout matches `rapier3d::dynamics::LockedAxes`.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct PhysicsAxis: u8 {
        const TRANSLATION_X = 1 << 0;
        const TRANSLATION_Y = 1 << 1;
        const TRANSLATION_Z = 1 << 2;
        const TRANSLATION = Self::TRANSLATION_X.bits() | Self::TRANSLATION_Y.bits() | Self::TRANSLATION_Z.bits();
        const ROTATION_X = 1 << 3;
        const ROTATION_Y = 1 << 4;
        const ROTATION_Z = 1 << 5;
        const ROTATION = Self::ROTATION_X.bits() | Self::ROTATION_Y.bits() | Self::ROTATION_Z.bits();
    }
}

/// Collider primitive kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeType {
    Box,
    Sphere,
    Capsule,
}

impl fmt::Display for ShapeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Box => write!(f, "Box"),
            Self::Sphere => write!(f, "Sphere"),
            Self::Capsule => write!(f, "Capsule"),
        }
    }
}

/// Kind of resolved collision or trigger event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicsEventType {
    CollisionEnter,
    CollisionExit,
    TriggerEnter,
    TriggerExit,
}

/// Bitmask of collision layers used to narrow scene queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerMask {
    pub bit_value: u32,
}

impl LayerMask {
    /// Mask matching every layer
    pub const ALL: Self = Self {
        bit_value: u32::MAX,
    };

    #[must_use]
    pub const fn new(bit_value: u32) -> Self {
        Self { bit_value }
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::ALL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapier3d::prelude::LockedAxes;

    #[test]
    fn test_axis_bits_match_locked_axes() {
        assert_eq!(
            PhysicsAxis::TRANSLATION.bits(),
            LockedAxes::TRANSLATION_LOCKED.bits()
        );
        assert_eq!(PhysicsAxis::ROTATION.bits(), LockedAxes::ROTATION_LOCKED.bits());
        assert_eq!(
            PhysicsAxis::ROTATION_Y.bits(),
            LockedAxes::ROTATION_LOCKED_Y.bits()
        );
    }

    #[test]
    fn test_shape_type_display() {
        assert_eq!(ShapeType::Capsule.to_string(), "Capsule");
    }
}
