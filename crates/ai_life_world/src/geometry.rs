use serde::{Deserialize, Serialize};

pub const TILE_SIZE: f64 = 16.0;
pub const MAP_WIDTH_TILES: i64 = 50;
pub const MAP_HEIGHT_TILES: i64 = 40;

/// Continuous world position, in world units (one tile is `TILE_SIZE` units).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: f64,
    pub y: f64,
}

impl WorldPos {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn from_tile(tile: TilePos) -> Self {
        Self {
            x: tile.x as f64 * TILE_SIZE,
            y: tile.y as f64 * TILE_SIZE,
        }
    }

    pub fn tile(self) -> TilePos {
        TilePos {
            x: (self.x / TILE_SIZE).floor() as i64,
            y: (self.y / TILE_SIZE).floor() as i64,
        }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Quantized position on the tile grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TilePos {
    pub x: i64,
    pub y: i64,
}

impl TilePos {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: f64,
    pub vy: f64,
}

impl Velocity {
    pub const ZERO: Velocity = Velocity { vx: 0.0, vy: 0.0 };

    pub fn new(vx: f64, vy: f64) -> Self {
        Self { vx, vy }
    }

    pub fn speed(self) -> f64 {
        (self.vx * self.vx + self.vy * self.vy).sqrt()
    }

    pub fn is_zero(self) -> bool {
        self.vx == 0.0 && self.vy == 0.0
    }
}

/// Axis-aligned world rectangle used to clamp positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldBounds {
    pub min: WorldPos,
    pub max: WorldPos,
}

impl WorldBounds {
    pub fn from_tiles(width_tiles: i64, height_tiles: i64) -> Self {
        Self {
            min: WorldPos::new(0.0, 0.0),
            max: WorldPos::new(
                width_tiles as f64 * TILE_SIZE,
                height_tiles as f64 * TILE_SIZE,
            ),
        }
    }

    pub fn clamp(&self, pos: WorldPos) -> WorldPos {
        WorldPos {
            x: pos.x.clamp(self.min.x, self.max.x),
            y: pos.y.clamp(self.min.y, self.max.y),
        }
    }

    pub fn contains(&self, pos: WorldPos) -> bool {
        pos.x >= self.min.x && pos.x <= self.max.x && pos.y >= self.min.y && pos.y <= self.max.y
    }
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self::from_tiles(MAP_WIDTH_TILES, MAP_HEIGHT_TILES)
    }
}

pub fn distance(a: WorldPos, b: WorldPos) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    (dx * dx + dy * dy).sqrt()
}

/// Unit vector pointing from `from` towards `to`.
///
/// Coincident points have no direction; `(1, 0)` is returned so callers that
/// push bodies apart still separate them.
pub fn unit_vector(from: WorldPos, to: WorldPos) -> (f64, f64) {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len <= f64::EPSILON {
        return (1.0, 0.0);
    }
    (dx / len, dy / len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_quantization_floors() {
        assert_eq!(WorldPos::new(100.0, 100.0).tile(), TilePos::new(6, 6));
        assert_eq!(WorldPos::new(15.9, 16.0).tile(), TilePos::new(0, 1));
        assert_eq!(WorldPos::new(-0.5, 0.0).tile(), TilePos::new(-1, 0));
    }

    #[test]
    fn unit_vector_is_normalized() {
        let (ux, uy) = unit_vector(WorldPos::new(0.0, 0.0), WorldPos::new(3.0, 4.0));
        assert!((ux - 0.6).abs() < 1e-9);
        assert!((uy - 0.8).abs() < 1e-9);
        assert_eq!(
            unit_vector(WorldPos::new(5.0, 5.0), WorldPos::new(5.0, 5.0)),
            (1.0, 0.0)
        );
    }

    #[test]
    fn bounds_clamp_positions() {
        let bounds = WorldBounds::default();
        assert_eq!(bounds.max, WorldPos::new(800.0, 640.0));
        assert_eq!(
            bounds.clamp(WorldPos::new(-10.0, 900.0)),
            WorldPos::new(0.0, 640.0)
        );
    }
}
