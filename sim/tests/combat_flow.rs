//! Combat and weapon lifecycle against a headless app with a manually
//! advanced clock. No transport: everything here is locally owned.

use std::time::Duration;

use bevy::prelude::*;

use ricochet::combat::{DamageTaken, RebirthIntent};
use ricochet::models::{CurrentAction, CurrentWeapon, Dead, Health, LastAttacker, Score};
use ricochet::player::LocalInput;
use ricochet::weapons::{AmmoPool, ReloadIntent, ReloadState, SwitchIntent};
use ricochet::{Controller, SimSettings, create_headless_app, spawn_combatant};
use ricochet_shared::arena::SPAWN_ANCHORS;
use ricochet_shared::snapshot::{ActionKind, PlayerStats};
use ricochet_shared::weapons::WeaponKind;

fn harness() -> App {
    let mut app = create_headless_app(SimSettings::default());
    app.update();
    app
}

fn tick(app: &mut App, millis: u64) {
    app.world_mut()
        .resource_mut::<Time>()
        .advance_by(Duration::from_millis(millis));
    app.update();
}

fn spawn_bot(app: &mut App, id: &str, position: Vec3) -> Entity {
    spawn_combatant(
        app.world_mut(),
        id,
        Controller::Bot,
        PlayerStats::default(),
        position,
    )
}

fn hp(app: &App, entity: Entity) -> i32 {
    app.world().get::<Health>(entity).map(|h| h.current).unwrap()
}

fn is_dead(app: &App, entity: Entity) -> bool {
    app.world().get::<Dead>(entity).is_some()
}

fn hit(app: &mut App, target: Entity, amount: i32, attacker: &str, from: Vec3) {
    app.world_mut().trigger(DamageTaken {
        target,
        amount,
        attacker_id: attacker.into(),
        attacker_position: from,
    });
    tick(app, 1);
}

#[test]
fn lethal_damage_clamps_latches_and_records_the_attacker() {
    let mut app = harness();
    let victim = spawn_bot(&mut app, "victim", Vec3::ZERO);
    let _rival = spawn_bot(&mut app, "rival", Vec3::new(5.0, 0.0, 0.0));

    hit(&mut app, victim, 150, "rival", Vec3::new(5.0, 0.0, 0.0));

    assert_eq!(hp(&app, victim), 0, "health never goes negative");
    assert!(is_dead(&app, victim));
    assert_eq!(
        app.world().get::<CurrentAction>(victim).unwrap().0,
        ActionKind::Die
    );
    let attacker = app.world().get::<LastAttacker>(victim).unwrap();
    assert_eq!(attacker.id.as_str(), "rival");
    assert_eq!(attacker.position, Vec3::new(5.0, 0.0, 0.0));
}

#[test]
fn damage_on_a_dead_body_is_ignored() {
    let mut app = harness();
    let victim = spawn_bot(&mut app, "victim", Vec3::ZERO);
    let rival = spawn_bot(&mut app, "rival", Vec3::new(5.0, 0.0, 0.0));

    hit(&mut app, victim, 100, "rival", Vec3::ZERO);
    assert!(is_dead(&app, victim));
    assert_eq!(app.world().get::<Score>(rival).unwrap().0, 1);

    // Late packets for an already-dead body change nothing.
    hit(&mut app, victim, 40, "rival", Vec3::ZERO);
    assert_eq!(hp(&app, victim), 0);
    assert_eq!(app.world().get::<Score>(rival).unwrap().0, 1);
}

#[test]
fn self_kills_earn_no_score() {
    let mut app = harness();
    let victim = spawn_bot(&mut app, "victim", Vec3::ZERO);

    hit(&mut app, victim, 100, "victim", Vec3::ZERO);

    assert!(is_dead(&app, victim));
    assert_eq!(app.world().get::<Score>(victim).unwrap().0, 0);
}

#[test]
fn rebirth_resets_state_and_relocates_to_an_anchor() {
    let mut app = harness();
    let bot = spawn_bot(&mut app, "bot", Vec3::new(1.0, 0.0, 1.0));

    {
        let mut ammo = app.world_mut().get_mut::<AmmoPool>(bot).unwrap();
        for _ in 0..7 {
            ammo.try_consume(WeaponKind::Ak47);
        }
    }
    hit(&mut app, bot, 100, "someone", Vec3::ZERO);
    assert!(is_dead(&app, bot));

    app.world_mut().trigger(RebirthIntent { entity: bot });
    tick(&mut app, 1);

    assert!(!is_dead(&app, bot));
    assert_eq!(hp(&app, bot), 100);
    assert_eq!(
        app.world().get::<AmmoPool>(bot).unwrap().ammo(WeaponKind::Ak47).current,
        30
    );
    assert_eq!(
        app.world().get::<CurrentAction>(bot).unwrap().0,
        ActionKind::Idle
    );

    // Relocation lands shortly after the revive, on one of the anchors.
    tick(&mut app, 60);
    let position = app.world().get::<Transform>(bot).unwrap().translation;
    assert!(SPAWN_ANCHORS.contains(&position), "landed at {position:?}");
}

#[test]
fn rebirth_on_a_living_body_is_a_no_op() {
    let mut app = harness();
    let bot = spawn_bot(&mut app, "bot", Vec3::new(1.0, 0.0, 1.0));

    hit(&mut app, bot, 30, "someone", Vec3::ZERO);
    assert_eq!(hp(&app, bot), 70);

    app.world_mut().trigger(RebirthIntent { entity: bot });
    tick(&mut app, 1);

    assert_eq!(hp(&app, bot), 70);
    assert_eq!(
        app.world().get::<Transform>(bot).unwrap().translation,
        Vec3::new(1.0, 0.0, 1.0)
    );
}

#[test]
fn reload_refills_the_bound_magazine() {
    let mut app = harness();
    let player = spawn_combatant(
        app.world_mut(),
        "pilot",
        Controller::Local,
        PlayerStats::default(),
        Vec3::ZERO,
    );

    {
        let mut ammo = app.world_mut().get_mut::<AmmoPool>(player).unwrap();
        for _ in 0..12 {
            ammo.try_consume(WeaponKind::Ak47);
        }
    }

    app.world_mut().trigger(ReloadIntent { entity: player });
    tick(&mut app, 1);
    assert!(app.world().get::<ReloadState>(player).is_some());

    for _ in 0..4 {
        tick(&mut app, 500);
    }
    tick(&mut app, 50);

    assert!(app.world().get::<ReloadState>(player).is_none());
    assert_eq!(
        app.world().get::<AmmoPool>(player).unwrap().ammo(WeaponKind::Ak47).current,
        30
    );
}

#[test]
fn reload_with_a_full_magazine_is_rejected() {
    let mut app = harness();
    let player = spawn_combatant(
        app.world_mut(),
        "pilot",
        Controller::Local,
        PlayerStats::default(),
        Vec3::ZERO,
    );

    app.world_mut().trigger(ReloadIntent { entity: player });
    tick(&mut app, 1);

    assert!(app.world().get::<ReloadState>(player).is_none());
    // Nothing is locked: a switch goes through right away.
    app.world_mut().trigger(SwitchIntent {
        entity: player,
        weapon: WeaponKind::Ak48,
    });
    tick(&mut app, 1);
    assert_eq!(
        app.world().get::<CurrentWeapon>(player).unwrap().0,
        WeaponKind::Ak48
    );
}

#[test]
fn switching_to_the_current_weapon_is_a_no_op() {
    let mut app = harness();
    let player = spawn_combatant(
        app.world_mut(),
        "pilot",
        Controller::Local,
        PlayerStats::default(),
        Vec3::ZERO,
    );

    app.world_mut().trigger(SwitchIntent {
        entity: player,
        weapon: WeaponKind::Ak47,
    });
    tick(&mut app, 1);
    assert_eq!(
        app.world().get::<CurrentWeapon>(player).unwrap().0,
        WeaponKind::Ak47
    );

    // The no-op left the throttle window untouched, so a real switch is
    // accepted immediately.
    app.world_mut().trigger(SwitchIntent {
        entity: player,
        weapon: WeaponKind::Ak49,
    });
    tick(&mut app, 1);
    assert_eq!(
        app.world().get::<CurrentWeapon>(player).unwrap().0,
        WeaponKind::Ak49
    );
}

#[test]
fn switching_is_blocked_during_reload_and_throttled_after() {
    let mut app = harness();
    let player = spawn_combatant(
        app.world_mut(),
        "pilot",
        Controller::Local,
        PlayerStats::default(),
        Vec3::ZERO,
    );

    {
        let mut ammo = app.world_mut().get_mut::<AmmoPool>(player).unwrap();
        for _ in 0..5 {
            ammo.try_consume(WeaponKind::Ak47);
        }
    }
    app.world_mut().trigger(ReloadIntent { entity: player });
    tick(&mut app, 1);

    app.world_mut().trigger(SwitchIntent {
        entity: player,
        weapon: WeaponKind::Ak48,
    });
    tick(&mut app, 1);
    assert_eq!(
        app.world().get::<CurrentWeapon>(player).unwrap().0,
        WeaponKind::Ak47,
        "switch must wait out the reload"
    );

    // Finish the reload, then the same request goes through.
    for _ in 0..5 {
        tick(&mut app, 500);
    }
    app.world_mut().trigger(SwitchIntent {
        entity: player,
        weapon: WeaponKind::Ak48,
    });
    tick(&mut app, 1);
    assert_eq!(
        app.world().get::<CurrentWeapon>(player).unwrap().0,
        WeaponKind::Ak48
    );

    // An immediate follow-up is throttled.
    app.world_mut().trigger(SwitchIntent {
        entity: player,
        weapon: WeaponKind::Ak49,
    });
    tick(&mut app, 1);
    assert_eq!(
        app.world().get::<CurrentWeapon>(player).unwrap().0,
        WeaponKind::Ak48
    );

    tick(&mut app, 350);
    app.world_mut().trigger(SwitchIntent {
        entity: player,
        weapon: WeaponKind::Ak49,
    });
    tick(&mut app, 1);
    assert_eq!(
        app.world().get::<CurrentWeapon>(player).unwrap().0,
        WeaponKind::Ak49
    );
}

#[test]
fn holding_the_trigger_empties_the_magazine_and_auto_reloads() {
    let mut app = harness();
    let player = spawn_combatant(
        app.world_mut(),
        "pilot",
        Controller::Local,
        PlayerStats::default(),
        Vec3::new(0.0, 0.0, 0.0),
    );

    app.world_mut().resource_mut::<LocalInput>().trigger_held = true;

    let mut saw_empty = false;
    let mut reloading = false;
    for _ in 0..200 {
        tick(&mut app, 50);
        let remaining = app
            .world()
            .get::<AmmoPool>(player)
            .unwrap()
            .ammo(WeaponKind::Ak47)
            .current;
        if remaining == 0 {
            saw_empty = true;
        }
        if app.world().get::<ReloadState>(player).is_some() {
            reloading = true;
            break;
        }
    }
    assert!(saw_empty, "held trigger never emptied the magazine");
    assert!(reloading, "empty magazine did not start a reload");

    // Release and let the reload run out.
    app.world_mut().resource_mut::<LocalInput>().trigger_held = false;
    for _ in 0..50 {
        tick(&mut app, 50);
        if app.world().get::<ReloadState>(player).is_none() {
            break;
        }
    }
    assert_eq!(
        app.world().get::<AmmoPool>(player).unwrap().ammo(WeaponKind::Ak47).current,
        30
    );
}
