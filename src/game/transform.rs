//! Transform Component
//!
//! Local 2D transform. Parent/child relations are stored separately in the
//! `Hierarchy` component as a parent UUID, so a transform is always
//! expressed in world space here; composing through the hierarchy is left
//! to rendering code.

use serde::{Serialize, Deserialize};
use crate::math::Vec2;

/// Position, rotation and scale of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub position: Vec2,
    /// Rotation in radians, counter-clockwise
    pub rotation: f32,
    pub scale: Vec2,
}

impl Transform {
    /// Identity transform (origin, no rotation, scale 1)
    pub const IDENTITY: Transform = Transform {
        position: Vec2::ZERO,
        rotation: 0.0,
        scale: Vec2::ONE,
    };

    /// Create transform at a position
    pub fn from_position(position: Vec2) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Translate by an offset
    pub fn translate(&mut self, offset: Vec2) {
        self.position += offset;
    }

    /// Rotate by an angle (radians)
    pub fn rotate(&mut self, angle: f32) {
        self.rotation += angle;
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
