#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-slot weapon targeting, aiming and firing.
//!
//! A weapon slot is either idle or attacking. Idle slots pick up the first
//! enemy in range unless a commanded target suppresses that. Attacking slots
//! launch the slot's aim script, wait for it to finish on later ticks, check
//! the aim still holds within tolerance and then fire once reloaded.

use glam::Vec3;
use log::{debug, trace};
use skirmish_core::{
    heading_and_pitch, to_script_angle, wrap_angle, AimInfo, AttackTarget, Command, GameTime,
    UnitId, UnitWeapon, UpdateError, WeaponSlot, WeaponState,
};
use skirmish_world::{query, Unit, World};

/// System that updates one weapon slot of one unit in place per call and
/// defers projectiles, effects and sounds as commands.
#[derive(Debug, Default)]
pub struct WeaponControl;

impl WeaponControl {
    /// Creates a new weapon control system.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Updates the weapon mounted in `slot` of `unit`.
    ///
    /// Empty slots and vanished units are ignored.
    pub fn handle(
        &mut self,
        world: &mut World,
        unit: UnitId,
        slot: WeaponSlot,
        out: &mut Vec<Command>,
    ) -> Result<(), UpdateError> {
        let now = query::game_time(world);
        let Some(weapon) = query::unit(world, unit).and_then(|state| state.weapon(slot)) else {
            return Ok(());
        };

        match weapon.state {
            WeaponState::Idle => {
                if !weapon.command_fire {
                    acquire_target(world, unit, slot);
                }
                Ok(())
            }
            WeaponState::Attacking { target, aim } => {
                engage(world, unit, slot, target, aim, now, out)
            }
        }
    }
}

/// Picks the first enemy in range, scanning units in ascending id order.
fn acquire_target(world: &mut World, id: UnitId, slot: WeaponSlot) {
    let Some(unit) = query::unit(world, id) else {
        return;
    };
    let Some(range_squared) = unit.weapon(slot).map(UnitWeapon::max_range_squared) else {
        return;
    };

    let owner = unit.owner;
    let position = unit.position;
    let enemy = query::units(world)
        .find(|other| {
            !other.is_owned_by(owner)
                && !other.is_dead()
                && other.position.distance_squared(position) <= range_squared
        })
        .map(|other| other.id);

    if let Some(enemy) = enemy {
        if let Some(weapon) = world.unit_mut(id).and_then(|unit| unit.weapon_mut(slot)) {
            debug!(
                "unit {} {:?} weapon acquired unit {}",
                id.get(),
                slot,
                enemy.get()
            );
            weapon.acquire(enemy);
        }
    }
}

fn engage(
    world: &mut World,
    id: UnitId,
    slot: WeaponSlot,
    target: AttackTarget,
    aim: Option<AimInfo>,
    now: GameTime,
    out: &mut Vec<Command>,
) -> Result<(), UpdateError> {
    let target_position = world.target_position(target)?;
    let Some(unit) = world.unit_mut(id) else {
        return Ok(());
    };
    let Some(range_squared) = unit.weapon(slot).map(UnitWeapon::max_range_squared) else {
        return Ok(());
    };

    let position = unit.position;
    let Some(target_position) = target_position
        .filter(|point| point.distance_squared(position) <= range_squared)
    else {
        debug!("unit {} {:?} weapon lost its target", id.get(), slot);
        if let Some(weapon) = unit.weapon_mut(slot) {
            weapon.clear_target();
        }
        return Ok(());
    };

    let Some(info) = aim else {
        return start_aiming(unit, slot, target_position, now, out);
    };

    let Some(success) = unit.poll_script(info.thread) else {
        return Ok(());
    };
    set_aim(unit, slot, None);
    if !success {
        return Ok(());
    }

    let Some(target_position) = world.target_position(target)? else {
        return Ok(());
    };
    let Some(unit) = world.unit_mut(id) else {
        return Ok(());
    };
    let Some((tolerance, pitch_tolerance)) = unit.weapon(slot).map(|weapon| {
        (
            weapon.definition.tolerance,
            weapon.definition.pitch_tolerance,
        )
    }) else {
        return Ok(());
    };

    let aiming_point = unit.aiming_point(slot)?;
    let (heading, pitch) = heading_and_pitch(unit.rotation, aiming_point, target_position);
    if wrap_angle(heading - info.heading).abs() <= tolerance
        && (pitch - info.pitch).abs() <= pitch_tolerance
    {
        try_fire(unit, slot, target_position, now, out)?;
    } else {
        trace!("unit {} {:?} weapon aim drifted", id.get(), slot);
    }

    Ok(())
}

fn start_aiming(
    unit: &mut Unit,
    slot: WeaponSlot,
    target_position: Vec3,
    now: GameTime,
    out: &mut Vec<Command>,
) -> Result<(), UpdateError> {
    let aiming_point = unit.aiming_point(slot)?;
    let (heading, pitch) = heading_and_pitch(unit.rotation, aiming_point, target_position);
    let args = [to_script_angle(heading), to_script_angle(pitch)];

    match unit.launch_script(slot.aim_script(), &args) {
        Some(thread) => {
            set_aim(
                unit,
                slot,
                Some(AimInfo {
                    thread,
                    heading,
                    pitch,
                }),
            );
            Ok(())
        }
        None => try_fire(unit, slot, target_position, now, out),
    }
}

fn set_aim(unit: &mut Unit, slot: WeaponSlot, info: Option<AimInfo>) {
    if let Some(weapon) = unit.weapon_mut(slot) {
        if let WeaponState::Attacking { aim, .. } = &mut weapon.state {
            *aim = info;
        }
    }
}

/// Fires at `target` if the weapon has reloaded.
fn try_fire(
    unit: &mut Unit,
    slot: WeaponSlot,
    target: Vec3,
    now: GameTime,
    out: &mut Vec<Command>,
) -> Result<(), UpdateError> {
    match unit.weapon(slot) {
        Some(weapon) if weapon.is_ready(now) => {}
        _ => return Ok(()),
    }

    let firing_point = unit.firing_point(slot)?;
    let direction = (target - firing_point).normalize_or_zero();
    let Some(weapon) = unit.weapon_mut(slot) else {
        return Ok(());
    };
    let definition = weapon.definition.clone();
    weapon.ready_time = now + definition.reload_ticks();

    if definition.start_smoke {
        out.push(Command::CreateLightSmoke {
            position: firing_point,
        });
    }
    let sound = definition.sound_start;
    out.push(Command::SpawnProjectile {
        owner: unit.owner,
        weapon: definition,
        origin: firing_point,
        direction,
    });
    if let Some(sound) = sound {
        out.push(Command::PlayUnitSound {
            unit: unit.id,
            sound,
        });
    }
    let _ = unit.launch_script(slot.fire_script(), &[]);
    debug!("unit {} fired {:?} weapon", unit.id.get(), slot);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::{
        GameTimeDelta, PlayerId, SoundId, Tuning, UnitBlueprint, WeaponDefinition,
    };
    use skirmish_world::{apply, GridTerrain, ScriptBehavior, ScriptJournal, ScriptTable};

    fn cannon() -> WeaponDefinition {
        WeaponDefinition {
            name: "ARM_LIGHTCANNON".to_owned(),
            max_range: 120.0,
            reload_time: 1.0,
            tolerance: 0.2,
            pitch_tolerance: 0.2,
            velocity: 12.0,
            duration: 15,
            start_smoke: true,
            sound_start: Some(SoundId::new(7)),
        }
    }

    fn blueprint(weapon: Option<WeaponDefinition>) -> UnitBlueprint {
        UnitBlueprint {
            unit_type: "ARMSTUMP".to_owned(),
            turn_rate: 0.1,
            max_speed: 2.0,
            acceleration: 0.5,
            brake_rate: 0.5,
            footprint_x: 2,
            footprint_z: 2,
            max_slope: 10,
            max_water_slope: 10,
            min_water_depth: 0,
            max_water_depth: 20,
            max_hit_points: 100,
            weapons: [weapon, None, None],
            explosion_weapon: None,
            arrived_sound: None,
        }
    }

    fn world() -> World {
        World::new(GridTerrain::flat(64, 64, 0.0, -10.0), Tuning::default())
    }

    fn spawn(world: &mut World, owner: u32, x: f32, armed: bool, scripts: ScriptTable) -> UnitId {
        world
            .spawn_unit(
                &blueprint(armed.then(cannon)),
                PlayerId::new(owner),
                Vec3::new(x, 0.0, 300.0),
                0.0,
                Box::new(scripts),
            )
            .expect("spawn")
    }

    fn state(world: &World, id: UnitId) -> WeaponState {
        query::unit(world, id)
            .and_then(|unit| unit.weapon(WeaponSlot::Primary))
            .expect("weapon")
            .state
    }

    fn projectiles(out: &[Command]) -> usize {
        out.iter()
            .filter(|command| matches!(command, Command::SpawnProjectile { .. }))
            .count()
    }

    #[test]
    fn idle_weapons_acquire_the_first_enemy_in_id_order() {
        let mut world = world();
        let shooter = spawn(&mut world, 1, 300.0, true, ScriptTable::new());
        let _friend = spawn(&mut world, 1, 340.0, false, ScriptTable::new());
        let first = spawn(&mut world, 2, 380.0, false, ScriptTable::new());
        let _closer = spawn(&mut world, 2, 260.0, false, ScriptTable::new());
        let mut out = Vec::new();

        WeaponControl::new()
            .handle(&mut world, shooter, WeaponSlot::Primary, &mut out)
            .expect("update");

        assert_eq!(
            state(&world, shooter),
            WeaponState::Attacking {
                target: AttackTarget::Unit(first),
                aim: None
            }
        );
        assert!(out.is_empty());
    }

    #[test]
    fn commanded_fire_suppresses_acquisition() {
        let mut world = world();
        let shooter = spawn(&mut world, 1, 300.0, true, ScriptTable::new());
        let _enemy = spawn(&mut world, 2, 340.0, false, ScriptTable::new());
        world
            .unit_mut(shooter)
            .and_then(|unit| unit.weapon_mut(WeaponSlot::Primary))
            .expect("weapon")
            .command_fire = true;
        let mut out = Vec::new();

        WeaponControl::new()
            .handle(&mut world, shooter, WeaponSlot::Primary, &mut out)
            .expect("update");

        assert_eq!(state(&world, shooter), WeaponState::Idle);
    }

    #[test]
    fn weapons_without_aim_scripts_fire_once_per_reload() {
        let mut world = world();
        let journal = ScriptJournal::new();
        let scripts = ScriptTable::new()
            .with_script("FirePrimary", ScriptBehavior::Returns(0))
            .with_journal(journal.clone());
        let shooter = spawn(&mut world, 1, 300.0, true, scripts);
        let target = Vec3::new(350.0, 0.0, 300.0);
        world
            .unit_mut(shooter)
            .expect("unit")
            .command_weapon_target(WeaponSlot::Primary, AttackTarget::Point(target));
        let mut system = WeaponControl::new();
        let mut out = Vec::new();

        system
            .handle(&mut world, shooter, WeaponSlot::Primary, &mut out)
            .expect("update");
        system
            .handle(&mut world, shooter, WeaponSlot::Primary, &mut out)
            .expect("update");

        assert_eq!(projectiles(&out), 1);
        assert_eq!(journal.count("FirePrimary"), 1);
        assert_eq!(
            out,
            vec![
                Command::CreateLightSmoke {
                    position: Vec3::new(300.0, 0.0, 300.0)
                },
                Command::SpawnProjectile {
                    owner: PlayerId::new(1),
                    weapon: cannon(),
                    origin: Vec3::new(300.0, 0.0, 300.0),
                    direction: Vec3::X,
                },
                Command::PlayUnitSound {
                    unit: shooter,
                    sound: SoundId::new(7)
                },
            ]
        );
        let weapon = query::unit(&world, shooter)
            .and_then(|unit| unit.weapon(WeaponSlot::Primary))
            .expect("weapon");
        assert_eq!(weapon.ready_time, GameTime::new(0) + GameTimeDelta::new(30));
    }

    #[test]
    fn aimed_weapons_fire_after_the_aim_script_finishes() {
        let mut world = world();
        let journal = ScriptJournal::new();
        let scripts = ScriptTable::new()
            .with_script(
                "AimPrimary",
                ScriptBehavior::Timed {
                    ticks: 2,
                    success: true,
                },
            )
            .with_journal(journal.clone());
        let shooter = spawn(&mut world, 1, 300.0, true, scripts);
        let target = Vec3::new(300.0, 0.0, 400.0);
        world
            .unit_mut(shooter)
            .expect("unit")
            .command_weapon_target(WeaponSlot::Primary, AttackTarget::Point(target));
        let mut system = WeaponControl::new();
        let mut out = Vec::new();

        system
            .handle(&mut world, shooter, WeaponSlot::Primary, &mut out)
            .expect("launch aim");
        assert!(matches!(
            state(&world, shooter),
            WeaponState::Attacking { aim: Some(_), .. }
        ));
        assert_eq!(journal.launches()[0].args, vec![0, 0]);

        system
            .handle(&mut world, shooter, WeaponSlot::Primary, &mut out)
            .expect("aim in flight");
        assert_eq!(projectiles(&out), 0);

        system
            .handle(&mut world, shooter, WeaponSlot::Primary, &mut out)
            .expect("aim finished");
        assert_eq!(projectiles(&out), 1);
        assert_eq!(
            state(&world, shooter),
            WeaponState::Attacking {
                target: AttackTarget::Point(target),
                aim: None
            }
        );
    }

    #[test]
    fn failed_aims_do_not_fire() {
        let mut world = world();
        let scripts = ScriptTable::new().with_script(
            "AimPrimary",
            ScriptBehavior::Timed {
                ticks: 1,
                success: false,
            },
        );
        let shooter = spawn(&mut world, 1, 300.0, true, scripts);
        world
            .unit_mut(shooter)
            .expect("unit")
            .command_weapon_target(
                WeaponSlot::Primary,
                AttackTarget::Point(Vec3::new(300.0, 0.0, 380.0)),
            );
        let mut system = WeaponControl::new();
        let mut out = Vec::new();

        for _ in 0..2 {
            system
                .handle(&mut world, shooter, WeaponSlot::Primary, &mut out)
                .expect("update");
        }

        assert_eq!(projectiles(&out), 0);
    }

    #[test]
    fn targets_leaving_range_are_dropped() {
        let mut world = world();
        let shooter = spawn(&mut world, 1, 300.0, true, ScriptTable::new());
        let enemy = spawn(&mut world, 2, 360.0, false, ScriptTable::new());
        let mut system = WeaponControl::new();
        let mut out = Vec::new();
        system
            .handle(&mut world, shooter, WeaponSlot::Primary, &mut out)
            .expect("acquire");

        world.unit_mut(enemy).expect("enemy").position = Vec3::new(800.0, 0.0, 300.0);
        system
            .handle(&mut world, shooter, WeaponSlot::Primary, &mut out)
            .expect("engage");

        assert_eq!(state(&world, shooter), WeaponState::Idle);
        assert!(out.is_empty());
    }

    #[test]
    fn dead_targets_return_the_weapon_to_idle() {
        let mut world = world();
        let shooter = spawn(&mut world, 1, 300.0, true, ScriptTable::new());
        let enemy = spawn(&mut world, 2, 360.0, false, ScriptTable::new());
        let mut system = WeaponControl::new();
        let mut out = Vec::new();
        let mut events = Vec::new();
        system
            .handle(&mut world, shooter, WeaponSlot::Primary, &mut out)
            .expect("acquire");

        apply(
            &mut world,
            Command::DamageUnit {
                unit: enemy,
                amount: 1_000,
            },
            &mut events,
        );
        system
            .handle(&mut world, shooter, WeaponSlot::Primary, &mut out)
            .expect("engage");

        assert_eq!(state(&world, shooter), WeaponState::Idle);
    }

    #[test]
    fn blocked_sweet_spot_queries_are_fatal() {
        let mut world = world();
        let shooter = spawn(&mut world, 1, 300.0, true, ScriptTable::new());
        let scripts = ScriptTable::new().with_script("SweetSpot", ScriptBehavior::Suspends);
        let _enemy = spawn(&mut world, 2, 360.0, false, scripts);
        let mut system = WeaponControl::new();
        let mut out = Vec::new();
        system
            .handle(&mut world, shooter, WeaponSlot::Primary, &mut out)
            .expect("acquire");

        let result = system.handle(&mut world, shooter, WeaponSlot::Primary, &mut out);
        assert!(matches!(result, Err(UpdateError::QueryBlocked { .. })));
    }
}
