use bevy::prelude::*;
use std::collections::HashMap;
use std::time::Duration;

use ricochet_shared::combat::defaults;
use ricochet_shared::weapons::WeaponKind;

/// Ammo for one weapon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmmoState {
    pub current: u32,
    pub max: u32,
}

impl AmmoState {
    pub fn full(max: u32) -> Self {
        Self { current: max, max }
    }

    pub fn is_empty(&self) -> bool {
        self.current == 0
    }
}

/// Per-combatant ammo, one pool per catalog weapon. Pools spawn full and are
/// all refilled on rebirth.
#[derive(Component, Debug, Clone)]
pub struct AmmoPool(HashMap<WeaponKind, AmmoState>);

impl AmmoPool {
    pub fn full() -> Self {
        let pools = WeaponKind::ALL
            .into_iter()
            .map(|kind| (kind, AmmoState::full(kind.attributes().max_ammo)))
            .collect();
        Self(pools)
    }

    pub fn ammo(&self, kind: WeaponKind) -> AmmoState {
        self.0
            .get(&kind)
            .copied()
            .unwrap_or_else(|| AmmoState::full(kind.attributes().max_ammo))
    }

    /// Spend one round. Returns false when the pool is already empty.
    pub fn try_consume(&mut self, kind: WeaponKind) -> bool {
        let state = self
            .0
            .entry(kind)
            .or_insert_with(|| AmmoState::full(kind.attributes().max_ammo));
        if state.current == 0 {
            return false;
        }
        state.current -= 1;
        true
    }

    pub fn refill(&mut self, kind: WeaponKind) {
        self.0.insert(kind, AmmoState::full(kind.attributes().max_ammo));
    }

    pub fn refill_all(&mut self) {
        for kind in WeaponKind::ALL {
            self.refill(kind);
        }
    }
}

impl Default for AmmoPool {
    fn default() -> Self {
        Self::full()
    }
}

/// Reload in progress. Present only while reloading; its presence blocks
/// firing and weapon switches. Bound to the weapon that was active when the
/// reload began, so a stray switch can never refill the wrong pool.
#[derive(Component, Debug, Clone)]
pub struct ReloadState {
    pub weapon: WeaponKind,
    pub timer: Timer,
    /// Last progress percent emitted, to step events at a fixed cadence.
    pub last_percent: u8,
}

impl ReloadState {
    pub fn new(weapon: WeaponKind) -> Self {
        Self {
            weapon,
            timer: Timer::new(
                Duration::from_millis(weapon.attributes().reload_ms),
                TimerMode::Once,
            ),
            last_percent: 0,
        }
    }

    /// Progress in whole percent, stepped at the 50 ms reporting cadence.
    pub fn percent(&self) -> u8 {
        let step = defaults::RELOAD_PROGRESS_STEP_MS;
        let elapsed = self.timer.elapsed().as_millis() as u64;
        let total = self.timer.duration().as_millis() as u64;
        let stepped = (elapsed / step) * step;
        ((stepped * 100) / total.max(1)).min(100) as u8
    }
}

/// Per-entity anti-spam guard, independent of the weapon fire interval.
/// Catches duplicated fire events from a misbehaving input or peer.
#[derive(Component, Debug, Clone)]
pub struct FireControl {
    guard: Timer,
}

impl Default for FireControl {
    fn default() -> Self {
        let mut guard = Timer::new(
            Duration::from_millis(defaults::FIRE_GUARD_MS),
            TimerMode::Once,
        );
        // Start expired so the first shot is never swallowed.
        guard.tick(Duration::from_millis(defaults::FIRE_GUARD_MS));
        Self { guard }
    }
}

impl FireControl {
    pub fn tick(&mut self, delta: Duration) {
        self.guard.tick(delta);
    }

    pub fn can_fire(&self) -> bool {
        self.guard.is_finished()
    }

    pub fn mark_fired(&mut self) {
        self.guard.reset();
    }
}

/// Leading-edge rate limiter for weapon switches: the first request passes
/// and starts the cooldown, requests inside the window are rejected.
#[derive(Component, Debug, Clone)]
pub struct SwitchThrottle {
    cooldown: Timer,
}

impl Default for SwitchThrottle {
    fn default() -> Self {
        let mut cooldown = Timer::new(
            Duration::from_millis(defaults::SWITCH_COOLDOWN_MS),
            TimerMode::Once,
        );
        cooldown.tick(Duration::from_millis(defaults::SWITCH_COOLDOWN_MS));
        Self { cooldown }
    }
}

impl SwitchThrottle {
    pub fn tick(&mut self, delta: Duration) {
        self.cooldown.tick(delta);
    }

    /// Accept the request if outside the cooldown window, starting a new
    /// window on acceptance.
    pub fn try_accept(&mut self) -> bool {
        if self.cooldown.is_finished() {
            self.cooldown.reset();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pools_spawn_full_and_consume_to_empty() {
        let mut pool = AmmoPool::full();
        let kind = WeaponKind::Ak48;
        let max = kind.attributes().max_ammo;
        assert_eq!(pool.ammo(kind).current, max);

        for _ in 0..max {
            assert!(pool.try_consume(kind));
        }
        assert!(pool.ammo(kind).is_empty());
        assert!(!pool.try_consume(kind));

        pool.refill(kind);
        assert_eq!(pool.ammo(kind).current, max);
    }

    #[test]
    fn consuming_one_pool_leaves_others_untouched() {
        let mut pool = AmmoPool::full();
        assert!(pool.try_consume(WeaponKind::Ak47));
        assert_eq!(
            pool.ammo(WeaponKind::Ak49).current,
            WeaponKind::Ak49.attributes().max_ammo
        );
    }

    #[test]
    fn switch_throttle_is_leading_edge() {
        let mut throttle = SwitchThrottle::default();
        assert!(throttle.try_accept());
        assert!(!throttle.try_accept());

        throttle.tick(Duration::from_millis(defaults::SWITCH_COOLDOWN_MS - 1));
        assert!(!throttle.try_accept());

        throttle.tick(Duration::from_millis(2));
        assert!(throttle.try_accept());
    }

    #[test]
    fn reload_progress_steps_at_report_cadence() {
        let mut state = ReloadState::new(WeaponKind::Ak47);
        assert_eq!(state.percent(), 0);

        // 70 ms into a 2000 ms reload: progress reports the last full step.
        state.timer.tick(Duration::from_millis(70));
        assert_eq!(state.percent(), 2);

        state.timer.tick(Duration::from_millis(930));
        assert_eq!(state.percent(), 50);

        state.timer.tick(Duration::from_millis(1000));
        assert_eq!(state.percent(), 100);
    }

    #[test]
    fn fire_guard_swallows_rapid_duplicates() {
        let mut control = FireControl::default();
        assert!(control.can_fire());
        control.mark_fired();
        assert!(!control.can_fire());
        control.tick(Duration::from_millis(defaults::FIRE_GUARD_MS));
        assert!(control.can_fire());
    }
}
