//! Arena layout constants: spawn anchors and static collision surfaces.

use glam::Vec3;

/// Half-extent of the playable square.
pub const ARENA_EXTENT: f32 = 30.0;

/// Wall height.
pub const WALL_HEIGHT: f32 = 8.0;

/// The four mirrored corner spawn points. Entities drop in slightly above
/// the ground and settle.
pub const SPAWN_ANCHORS: [Vec3; 4] = [
    Vec3::new(12.0, 5.0, 10.0),
    Vec3::new(-12.0, 5.0, 10.0),
    Vec3::new(12.0, 5.0, -10.0),
    Vec3::new(-12.0, 5.0, -10.0),
];

/// Pick a spawn anchor by index, wrapping around.
pub fn spawn_anchor(index: usize) -> Vec3 {
    SPAWN_ANCHORS[index % SPAWN_ANCHORS.len()]
}

/// An axis-aligned static surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub min: Vec3,
    pub max: Vec3,
}

/// Ground slab plus four boundary walls. Hitscan rays stop here when they
/// miss every combatant.
pub const SURFACES: [Surface; 5] = [
    // ground
    Surface {
        min: Vec3::new(-ARENA_EXTENT, -1.0, -ARENA_EXTENT),
        max: Vec3::new(ARENA_EXTENT, 0.0, ARENA_EXTENT),
    },
    // +x / -x walls
    Surface {
        min: Vec3::new(ARENA_EXTENT, 0.0, -ARENA_EXTENT),
        max: Vec3::new(ARENA_EXTENT + 1.0, WALL_HEIGHT, ARENA_EXTENT),
    },
    Surface {
        min: Vec3::new(-ARENA_EXTENT - 1.0, 0.0, -ARENA_EXTENT),
        max: Vec3::new(-ARENA_EXTENT, WALL_HEIGHT, ARENA_EXTENT),
    },
    // +z / -z walls
    Surface {
        min: Vec3::new(-ARENA_EXTENT, 0.0, ARENA_EXTENT),
        max: Vec3::new(ARENA_EXTENT, WALL_HEIGHT, ARENA_EXTENT + 1.0),
    },
    Surface {
        min: Vec3::new(-ARENA_EXTENT, 0.0, -ARENA_EXTENT - 1.0),
        max: Vec3::new(ARENA_EXTENT, WALL_HEIGHT, -ARENA_EXTENT),
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchors_are_mirrored_corners() {
        for anchor in SPAWN_ANCHORS {
            assert_eq!(anchor.x.abs(), 12.0);
            assert_eq!(anchor.y, 5.0);
            assert_eq!(anchor.z.abs(), 10.0);
        }
    }

    #[test]
    fn anchor_index_wraps() {
        assert_eq!(spawn_anchor(0), spawn_anchor(4));
    }
}
