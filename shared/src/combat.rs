//! Shared combat logic: constants, recoil, damage variance, hit geometry.
//!
//! Everything here is deterministic: random rolls are computed by the caller
//! and passed in, so client and server produce identical results from
//! identical inputs.

use glam::{Quat, Vec3};

/// Default combat stats, shared by client and server.
pub mod defaults {
    pub const MAX_HP: i32 = 100;
    pub const ATTACK_POWER: i32 = 10;

    /// Hitscan rays are clipped at this distance.
    pub const MAX_RAY_DISTANCE: f32 = 1000.0;
    /// Per-entity minimum interval between shots, independent of the weapon
    /// fire interval. Catches duplicated fire events, not balance.
    pub const FIRE_GUARD_MS: u64 = 50;

    pub const RECOIL_HORIZONTAL: f32 = 0.2;
    pub const RECOIL_VERTICAL: f32 = 0.2;
    /// Vertical recoil roll is biased upward: the roll lands in
    /// `MIN_VERTICAL_ROLL..=1.0` of the vertical intensity.
    pub const MIN_VERTICAL_ROLL: f32 = 0.2;

    /// Damage variance half-width. Final damage never drops below 1.
    pub const DAMAGE_VARIANCE: i32 = 5;

    pub const SWITCH_COOLDOWN_MS: u64 = 300;
    pub const RELOAD_PROGRESS_STEP_MS: u64 = 50;

    pub const RESPAWN_COUNTDOWN_SECS: f32 = 5.0;
    /// Rebirth relocates the body one beat after reviving it, giving the
    /// movement layer a frame to settle at the old position first.
    pub const RELOCATION_DELAY_MS: u64 = 50;
}

/// Muzzle model for entities without a camera rig: local-space offsets on the
/// body, rotated by pitch then yaw.
pub mod muzzle {
    use glam::Vec3;

    pub const ORIGIN_OFFSET: Vec3 = Vec3::new(0.0, 0.7, 1.2);
    pub const TARGET_OFFSET: Vec3 = Vec3::new(0.0, 0.7, 12.0);
}

/// A hitscan ray. Direction is normalized at construction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Ray through two points (aim target model).
    pub fn between(origin: Vec3, target: Vec3) -> Self {
        Self::new(origin, target - origin)
    }

    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Build the muzzle ray for a body at `position` facing `yaw` with vertical
/// aim `pitch`: both local offsets are pitched about X, then yawed about Y,
/// then translated to the body.
pub fn muzzle_ray(position: Vec3, yaw: f32, pitch: f32) -> Ray {
    let rotation = Quat::from_rotation_y(yaw) * Quat::from_rotation_x(pitch);
    let origin = position + rotation * muzzle::ORIGIN_OFFSET;
    let target = position + rotation * muzzle::TARGET_OFFSET;
    Ray::between(origin, target)
}

/// Perturb an aim target by recoil. `horizontal_roll` is in `-1.0..=1.0`
/// (symmetric), `vertical_roll` in `MIN_VERTICAL_ROLL..=1.0` (upward bias).
/// The caller rolls; this stays deterministic.
pub fn perturb_aim(target: Vec3, right: Vec3, up: Vec3, horizontal_roll: f32, vertical_roll: f32) -> Vec3 {
    target
        + right * horizontal_roll * defaults::RECOIL_HORIZONTAL
        + up * vertical_roll * defaults::RECOIL_VERTICAL
}

/// Final damage for a hit: base weapon damage plus a variance roll in
/// `-DAMAGE_VARIANCE..=DAMAGE_VARIANCE`, floored at 1.
pub fn damage_with_variance(base: i32, variance_roll: i32) -> i32 {
    (base + variance_roll).max(1)
}

/// Ray vs axis-aligned box (slab method). Returns entry distance and surface
/// normal, or `None` when the ray misses or the box lies behind the origin.
pub fn ray_aabb(ray: &Ray, min: Vec3, max: Vec3) -> Option<(f32, Vec3)> {
    let inv = ray.direction.recip();
    let t1 = (min - ray.origin) * inv;
    let t2 = (max - ray.origin) * inv;

    let t_near = t1.min(t2);
    let t_far = t1.max(t2);

    let t_entry = t_near.max_element().max(0.0);
    let t_exit = t_far.min_element();

    if t_exit < t_entry {
        return None;
    }

    // Normal comes from the slab that produced the entry distance. A ray
    // starting inside the box reports the exit face instead, which is fine
    // for impact feedback.
    let normal = if t_entry == t_near.x {
        Vec3::new(-ray.direction.x.signum(), 0.0, 0.0)
    } else if t_entry == t_near.y {
        Vec3::new(0.0, -ray.direction.y.signum(), 0.0)
    } else {
        Vec3::new(0.0, 0.0, -ray.direction.z.signum())
    };

    Some((t_entry, normal))
}

/// Ray vs capsule with axis segment `a..b` and the given radius. Returns the
/// entry distance, or `None` on a miss or when the capsule is behind the ray.
pub fn ray_capsule(ray: &Ray, a: Vec3, b: Vec3, radius: f32) -> Option<f32> {
    let ba = b - a;
    let oa = ray.origin - a;

    let baba = ba.dot(ba);
    let bard = ba.dot(ray.direction);
    let baoa = ba.dot(oa);
    let rdoa = ray.direction.dot(oa);
    let oaoa = oa.dot(oa);

    let body_a = baba - bard * bard;

    // Cylindrical body, skipped when the ray runs parallel to the axis.
    if body_a > 1e-6 {
        let body_b = baba * rdoa - baoa * bard;
        let body_c = baba * oaoa - baoa * baoa - radius * radius * baba;
        let h = body_b * body_b - body_a * body_c;
        if h >= 0.0 {
            let t = (-body_b - h.sqrt()) / body_a;
            let y = baoa + t * bard;
            if t >= 0.0 && y > 0.0 && y < baba {
                return Some(t);
            }
        }
    }

    // Spherical caps.
    let mut best: Option<f32> = None;
    for center in [a, b] {
        let oc = ray.origin - center;
        let half_b = ray.direction.dot(oc);
        let c = oc.dot(oc) - radius * radius;
        let h = half_b * half_b - c;
        if h >= 0.0 {
            let t = -half_b - h.sqrt();
            if t >= 0.0 && best.is_none_or(|cur| t < cur) {
                best = Some(t);
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variance_floors_at_one() {
        assert_eq!(damage_with_variance(2, -5), 1);
        assert_eq!(damage_with_variance(10, -5), 5);
        assert_eq!(damage_with_variance(10, 5), 15);
    }

    #[test]
    fn recoil_offsets_stay_within_intensity() {
        let target = Vec3::new(0.0, 0.0, 10.0);
        let perturbed = perturb_aim(target, Vec3::X, Vec3::Y, 1.0, 1.0);
        assert!((perturbed - target).length() <= defaults::RECOIL_HORIZONTAL + defaults::RECOIL_VERTICAL + 1e-6);

        // Upward bias: the minimum vertical roll still lifts the target.
        let low = perturb_aim(target, Vec3::X, Vec3::Y, 0.0, defaults::MIN_VERTICAL_ROLL);
        assert!(low.y > target.y);
    }

    #[test]
    fn aabb_hit_reports_entry_face() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, -10.0), Vec3::Z);
        let (t, normal) = ray_aabb(&ray, Vec3::new(-1.0, -1.0, -1.0), Vec3::ONE).unwrap();
        assert!((t - 9.0).abs() < 1e-4);
        assert_eq!(normal, Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn aabb_behind_origin_misses() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::Z);
        assert!(ray_aabb(&ray, Vec3::new(-1.0, -1.0, -1.0), Vec3::ONE).is_none());
    }

    #[test]
    fn capsule_body_hit() {
        let ray = Ray::new(Vec3::new(-10.0, 1.0, 0.0), Vec3::X);
        let t = ray_capsule(&ray, Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.0, 2.0, 0.0), 0.5).unwrap();
        assert!((t - 9.5).abs() < 1e-4);
    }

    #[test]
    fn capsule_cap_hit_along_axis() {
        // Straight down onto the top cap, parallel to the axis.
        let ray = Ray::new(Vec3::new(0.0, 10.0, 0.0), Vec3::NEG_Y);
        let t = ray_capsule(&ray, Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.0, 2.0, 0.0), 0.5).unwrap();
        assert!((t - 7.5).abs() < 1e-4);
    }

    #[test]
    fn capsule_miss() {
        let ray = Ray::new(Vec3::new(-10.0, 1.0, 5.0), Vec3::X);
        assert!(ray_capsule(&ray, Vec3::ZERO, Vec3::new(0.0, 2.0, 0.0), 0.5).is_none());
    }

    #[test]
    fn muzzle_ray_points_forward_from_offset() {
        let ray = muzzle_ray(Vec3::ZERO, 0.0, 0.0);
        assert!((ray.origin - Vec3::new(0.0, 0.7, 1.2)).length() < 1e-5);
        assert!((ray.direction - Vec3::Z).length() < 1e-5);
    }
}
