//! Spatial Hash Grid
//!
//! Uniform-grid broad phase for light entities. Positions are quantized to
//! integer cells (`floor(pos / cell_size)`) and each cell keeps a bucket of
//! ids. The grid is meant to be rebuilt wholesale every tick; `remove` is
//! there for callers that do track movement.
//!
//! Queries are conservative: they return every id in every touched cell.
//! Exact distance checks are up to the caller (or `query_within`).

use std::collections::HashMap;

use crate::config::SpatialConfig;
use crate::game::component::Component;
use crate::game::entity::Entity;
use crate::game::scene::Scene;
use crate::game::transform::Transform;
use crate::math::Vec2;

/// Integer cell coordinate
pub type Cell = (i32, i32);

pub struct SpatialHashGrid<T = Entity> {
    cell_size: f32,
    cells: HashMap<Cell, Vec<T>>,
    len: usize,
}

impl<T: Copy + PartialEq> SpatialHashGrid<T> {
    /// Panics if `cell_size` is not a positive finite number.
    pub fn new(cell_size: f32) -> Self {
        assert!(cell_size.is_finite() && cell_size > 0.0, "cell size must be positive, got {}", cell_size);
        Self {
            cell_size,
            cells: HashMap::new(),
            len: 0,
        }
    }

    pub fn from_config(config: &SpatialConfig) -> Self {
        Self::new(config.cell_size)
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn cell_of(&self, position: Vec2) -> Cell {
        (
            (position.x / self.cell_size).floor() as i32,
            (position.y / self.cell_size).floor() as i32,
        )
    }

    pub fn insert(&mut self, id: T, position: Vec2) {
        let cell = self.cell_of(position);
        self.cells.entry(cell).or_default().push(id);
        self.len += 1;
    }

    /// Remove `id` from the cell `position` falls in. The position must map
    /// to the same cell used on insert. Empty buckets are dropped.
    pub fn remove(&mut self, id: T, position: Vec2) -> bool {
        let cell = self.cell_of(position);
        let Some(bucket) = self.cells.get_mut(&cell) else {
            return false;
        };
        let Some(i) = bucket.iter().position(|&other| other == id) else {
            return false;
        };
        bucket.swap_remove(i);
        if bucket.is_empty() {
            self.cells.remove(&cell);
        }
        self.len -= 1;
        true
    }

    /// Ids in every cell overlapped by the circle's bounding box.
    pub fn query(&self, center: Vec2, radius: f32) -> Vec<T> {
        let r = radius.max(0.0);
        self.query_aabb(Vec2::new(center.x - r, center.y - r), Vec2::new(center.x + r, center.y + r))
    }

    /// Ids in every cell overlapped by the box `min..=max`.
    pub fn query_aabb(&self, min: Vec2, max: Vec2) -> Vec<T> {
        let (x0, y0) = self.cell_of(min);
        let (x1, y1) = self.cell_of(max);
        let mut out = Vec::new();
        if x1 < x0 || y1 < y0 {
            return out;
        }

        let span = (x1 as i64 - x0 as i64 + 1) * (y1 as i64 - y0 as i64 + 1);
        if span > self.cells.len() as i64 {
            // Sparse grid under a large box: scan occupied cells instead
            for (&(cx, cy), bucket) in &self.cells {
                if (x0..=x1).contains(&cx) && (y0..=y1).contains(&cy) {
                    out.extend_from_slice(bucket);
                }
            }
        } else {
            for cx in x0..=x1 {
                for cy in y0..=y1 {
                    if let Some(bucket) = self.cells.get(&(cx, cy)) {
                        out.extend_from_slice(bucket);
                    }
                }
            }
        }
        out
    }

    /// Exact-radius query. `position_of` supplies each candidate's current
    /// position; candidates it can't place are dropped.
    pub fn query_within(&self, center: Vec2, radius: f32, position_of: impl Fn(T) -> Option<Vec2>) -> Vec<T> {
        let r2 = radius.max(0.0) * radius.max(0.0);
        self.query(center, radius)
            .into_iter()
            .filter(|&id| position_of(id).is_some_and(|p| p.distance_squared(center) <= r2))
            .collect()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.len = 0;
    }

    /// Clear, then insert every `(id, position)` pair.
    pub fn rebuild(&mut self, items: impl IntoIterator<Item = (T, Vec2)>) {
        self.clear();
        for (id, position) in items {
            self.insert(id, position);
        }
    }

    /// Number of occupied cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Number of inserted ids
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl SpatialHashGrid<Entity> {
    /// Rebuild from every entity carrying a `C`, at its transform position.
    pub fn rebuild_from_scene<C: Component>(&mut self, scene: &Scene) {
        let items: Vec<(Entity, Vec2)> = scene
            .view::<C>()
            .filter_map(|(e, _)| scene.get_component::<Transform>(e).map(|t| (e, t.position)))
            .collect();
        self.rebuild(items);
    }
}
