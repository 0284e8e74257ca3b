//! Game Components
//!
//! The built-in component types. Components are plain data structs -
//! behavior lives in systems and pools.
//!
//! Entities follow one of two physics policies, by convention:
//! - heavy: `Rigidbody2D` + `BoxCollider2D`, moved by the external physics world
//! - light: `Velocity` only, advanced by `systems::integrate_velocities`

use serde::{Serialize, Deserialize};
use crate::math::Vec2;
use crate::physics::BodyHandle;
use super::uuid::Uuid;

// =============================================================================
// Identity
// =============================================================================

/// Human-readable name of an entity
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tag(pub String);

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Parent link, stored by UUID rather than by handle.
///
/// Resolve with `Scene::find_entity_by_uuid` at the point of use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Hierarchy {
    pub parent_uuid: Option<Uuid>,
}

impl Hierarchy {
    pub fn child_of(parent: Uuid) -> Self {
        Self { parent_uuid: Some(parent) }
    }
}

// =============================================================================
// Movement / Physics
// =============================================================================

/// Velocity for light entities (explicit Euler, no collision response)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Velocity {
    /// Units per second
    pub velocity: Vec2,
    /// Radians per second
    pub angular: f32,
}

impl Velocity {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            velocity: Vec2::new(x, y),
            angular: 0.0,
        }
    }
}

/// How the physics world treats a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyType {
    Static,
    #[default]
    Dynamic,
    Kinematic,
}

/// Rigid body owned by the external physics world (heavy entities).
///
/// The body handle is runtime-only: it is never persisted and never copied.
/// Destroying the entity releases the body through the destruction hook
/// installed by `physics::install_destruction_hook`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Rigidbody2D {
    pub body_type: BodyType,
    pub fixed_rotation: bool,
    #[serde(skip)]
    pub body: Option<BodyHandle>,
}

impl Rigidbody2D {
    pub fn new(body_type: BodyType) -> Self {
        Self {
            body_type,
            fixed_rotation: false,
            body: None,
        }
    }
}

/// Box collider attached to a rigid body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxCollider2D {
    pub offset: Vec2,
    /// Half extents
    pub size: Vec2,
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
}

impl Default for BoxCollider2D {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            size: Vec2::new(0.5, 0.5),
            density: 1.0,
            friction: 0.5,
            restitution: 0.0,
        }
    }
}

// =============================================================================
// Rendering
// =============================================================================

/// Colored (optionally textured) quad
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpriteRenderer {
    /// RGBA 0-255
    pub color: [u8; 4],
    /// Asset-relative texture path
    pub texture: Option<String>,
    pub layer: i32,
    pub visible: bool,
}

impl Default for SpriteRenderer {
    fn default() -> Self {
        Self {
            color: [255, 255, 255, 255],
            texture: None,
            layer: 0,
            visible: true,
        }
    }
}

// =============================================================================
// Pooled gameplay objects
// =============================================================================

/// Marks projectile entities owned by a `BulletPool`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bullet {
    pub damage: f32,
    /// Seconds before the bullet expires
    pub lifetime: f32,
    /// Seconds since spawn
    pub age: f32,
    pub active: bool,
}

impl Default for Bullet {
    fn default() -> Self {
        Self {
            damage: 0.0,
            lifetime: 0.0,
            age: 0.0,
            active: false,
        }
    }
}

impl Bullet {
    pub fn is_expired(&self) -> bool {
        self.age >= self.lifetime
    }
}

/// A single pooled particle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Particle {
    /// Remaining life in seconds
    pub life: f32,
    /// Total lifetime (for interpolation)
    pub max_life: f32,
    /// RGBA at spawn
    pub color_start: [u8; 4],
    /// RGBA at death
    pub color_end: [u8; 4],
    /// Gravity multiplier (1.0 = normal gravity, -1.0 = floats up)
    pub gravity: f32,
    pub size: f32,
    pub active: bool,
}

impl Default for Particle {
    fn default() -> Self {
        Self {
            life: 0.0,
            max_life: 1.0,
            color_start: [255, 255, 255, 255],
            color_end: [128, 128, 128, 0],
            gravity: 0.0,
            size: 1.0,
            active: false,
        }
    }
}

impl Particle {
    /// 0 = just spawned, 1 = about to die
    pub fn progress(&self) -> f32 {
        if self.max_life <= 0.0 {
            return 1.0;
        }
        (1.0 - self.life / self.max_life).clamp(0.0, 1.0)
    }

    /// Current color, interpolated between start and end by progress
    pub fn current_color(&self) -> [u8; 4] {
        let t = self.progress();
        let mut out = [0u8; 4];
        for (i, c) in out.iter_mut().enumerate() {
            *c = lerp_u8(self.color_start[i], self.color_end[i], t);
        }
        out
    }
}

/// Lerp between two u8 values
pub(crate) fn lerp_u8(a: u8, b: u8, t: f32) -> u8 {
    let result = a as f32 * (1.0 - t) + b as f32 * t;
    result.clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rigidbody_handle_not_persisted() {
        let rb = Rigidbody2D {
            body_type: BodyType::Kinematic,
            fixed_rotation: true,
            body: Some(BodyHandle(7)),
        };
        let json = serde_json::to_value(&rb).unwrap();
        assert_eq!(json, serde_json::json!({"body_type": "kinematic", "fixed_rotation": true}));

        let back: Rigidbody2D = serde_json::from_value(json).unwrap();
        assert_eq!(back.body, None);
        assert_eq!(back.body_type, BodyType::Kinematic);
    }

    #[test]
    fn test_velocity_json_shape() {
        let json = serde_json::to_value(Velocity::new(2.0, 0.0)).unwrap();
        assert_eq!(json["velocity"], serde_json::json!([2.0, 0.0]));
    }

    #[test]
    fn test_particle_color_fade() {
        let mut p = Particle {
            life: 1.0,
            max_life: 1.0,
            color_start: [200, 0, 0, 255],
            color_end: [0, 0, 200, 0],
            ..Particle::default()
        };
        assert_eq!(p.current_color(), [200, 0, 0, 255]);
        p.life = 0.5;
        assert_eq!(p.current_color(), [100, 0, 100, 127]);
        p.life = 0.0;
        assert_eq!(p.current_color(), [0, 0, 200, 0]);
    }

    #[test]
    fn test_bullet_expiry() {
        let mut b = Bullet { lifetime: 1.0, active: true, ..Bullet::default() };
        assert!(!b.is_expired());
        b.age = 1.0;
        assert!(b.is_expired());
    }
}
