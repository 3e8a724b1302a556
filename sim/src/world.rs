//! Static arena geometry plus per-combatant hit capsules for hitscan queries.

use bevy::prelude::*;

use ricochet_shared::arena::{self, Surface};
use ricochet_shared::combat::{self, Ray, defaults};

use crate::SimSet;
use crate::models::PlayerId;

/// Capsule dimensions shared by every combatant body.
pub const CAPSULE_RADIUS: f32 = 0.4;
const CAPSULE_BOTTOM: f32 = 0.4;
const CAPSULE_TOP: f32 = 1.4;

pub fn plugin(app: &mut App) {
    app.init_resource::<WorldGeometry>()
        .add_systems(Update, refresh_combatant_colliders.in_set(SimSet::World));
}

/// A combatant's hit capsule, refreshed from its transform each tick.
#[derive(Debug, Clone, Copy)]
pub struct CombatantCollider {
    pub entity: Entity,
    pub bottom: Vec3,
    pub top: Vec3,
    pub radius: f32,
}

/// Nearest thing a hitscan ray touched.
#[derive(Debug, Clone, Copy)]
pub enum RayHit {
    Combatant { entity: Entity, distance: f32, point: Vec3 },
    Surface { distance: f32, point: Vec3, normal: Vec3 },
}

impl RayHit {
    pub fn distance(&self) -> f32 {
        match self {
            RayHit::Combatant { distance, .. } | RayHit::Surface { distance, .. } => *distance,
        }
    }
}

/// Everything a hitscan ray can intersect: the static arena surfaces and the
/// current set of combatant capsules. Capsules carry the owning entity so a
/// hit resolves back to a target without walking any scene hierarchy.
#[derive(Resource)]
pub struct WorldGeometry {
    pub surfaces: Vec<Surface>,
    pub colliders: Vec<CombatantCollider>,
}

impl Default for WorldGeometry {
    fn default() -> Self {
        Self {
            surfaces: arena::SURFACES.to_vec(),
            colliders: Vec::new(),
        }
    }
}

impl WorldGeometry {
    /// Nearest hit along `ray` within [`defaults::MAX_RAY_DISTANCE`],
    /// excluding the firer's own capsule. Combatants win ties by strict
    /// distance ordering, same as surfaces.
    pub fn raycast(&self, ray: &Ray, exclude: Entity) -> Option<RayHit> {
        let mut nearest: Option<RayHit> = None;

        for collider in &self.colliders {
            if collider.entity == exclude {
                continue;
            }
            if let Some(t) = combat::ray_capsule(ray, collider.bottom, collider.top, collider.radius) {
                if t <= defaults::MAX_RAY_DISTANCE && nearest.is_none_or(|hit| t < hit.distance()) {
                    nearest = Some(RayHit::Combatant {
                        entity: collider.entity,
                        distance: t,
                        point: ray.point_at(t),
                    });
                }
            }
        }

        for surface in &self.surfaces {
            if let Some((t, normal)) = combat::ray_aabb(ray, surface.min, surface.max) {
                if t <= defaults::MAX_RAY_DISTANCE && nearest.is_none_or(|hit| t < hit.distance()) {
                    nearest = Some(RayHit::Surface {
                        distance: t,
                        point: ray.point_at(t),
                        normal,
                    });
                }
            }
        }

        nearest
    }
}

/// Rebuild the capsule list from combatant transforms. Dead bodies keep
/// their capsule; the damage contract already ignores hits on them.
fn refresh_combatant_colliders(
    mut geometry: ResMut<WorldGeometry>,
    combatants: Query<(Entity, &Transform), With<PlayerId>>,
) {
    geometry.colliders.clear();
    for (entity, transform) in &combatants {
        let base = transform.translation;
        geometry.colliders.push(CombatantCollider {
            entity,
            bottom: base + Vec3::Y * CAPSULE_BOTTOM,
            top: base + Vec3::Y * CAPSULE_TOP,
            radius: CAPSULE_RADIUS,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capsule_at(entity: Entity, position: Vec3) -> CombatantCollider {
        CombatantCollider {
            entity,
            bottom: position + Vec3::Y * CAPSULE_BOTTOM,
            top: position + Vec3::Y * CAPSULE_TOP,
            radius: CAPSULE_RADIUS,
        }
    }

    fn fresh_entities<const N: usize>() -> [Entity; N] {
        let mut world = World::new();
        std::array::from_fn(|_| world.spawn_empty().id())
    }

    #[test]
    fn firer_capsule_is_excluded() {
        let [firer, target] = fresh_entities();
        let mut geometry = WorldGeometry {
            surfaces: Vec::new(),
            colliders: Vec::new(),
        };
        geometry.colliders.push(capsule_at(firer, Vec3::ZERO));
        geometry.colliders.push(capsule_at(target, Vec3::new(0.0, 0.0, 5.0)));

        let ray = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::Z);
        match geometry.raycast(&ray, firer) {
            Some(RayHit::Combatant { entity, .. }) => assert_eq!(entity, target),
            other => panic!("expected combatant hit, got {other:?}"),
        }
    }

    #[test]
    fn nearest_hit_wins() {
        let [near, far, outsider] = fresh_entities();
        let mut geometry = WorldGeometry::default();
        geometry.colliders.push(capsule_at(far, Vec3::new(0.0, 1.0, 10.0)));
        geometry.colliders.push(capsule_at(near, Vec3::new(0.0, 1.0, 4.0)));

        let ray = Ray::new(Vec3::new(0.0, 2.0, 0.0), Vec3::Z);
        match geometry.raycast(&ray, outsider) {
            Some(RayHit::Combatant { entity, .. }) => assert_eq!(entity, near),
            other => panic!("expected combatant hit, got {other:?}"),
        }
    }

    #[test]
    fn miss_lands_on_arena_wall() {
        let [firer] = fresh_entities();
        let geometry = WorldGeometry::default();
        let ray = Ray::new(Vec3::new(0.0, 2.0, 0.0), Vec3::Z);
        match geometry.raycast(&ray, firer) {
            Some(RayHit::Surface { normal, .. }) => {
                assert_eq!(normal, Vec3::new(0.0, 0.0, -1.0));
            }
            other => panic!("expected surface hit, got {other:?}"),
        }
    }
}
