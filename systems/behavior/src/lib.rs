#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Order interpreter that drives units between idle and moving.
//!
//! Each tick the front order of a unit decides its desired heading and speed.
//! Move orders request paths and follow them, attack orders close the distance
//! to a target and then hand it to the first two weapon slots. Every other
//! order is popped and forwarded to the world untouched.

use log::debug;
use skirmish_core::{
    AttackTarget, BehaviorState, Command, GameTime, MovingGoal, MovingState, Order, Tuning,
    UnitId, UnitWeapon, UpdateError, WeaponSlot,
};
use skirmish_world::{query, Unit, World};

mod path_follower;

pub use path_follower::{
    braking_distance, follow_path, is_within_turning_circle, Kinematics, PathProgress,
};

/// Weapon slots an attack order commands once the target is in range.
const ATTACK_ORDER_SLOTS: [WeaponSlot; 2] = [WeaponSlot::Primary, WeaponSlot::Secondary];

/// System that runs the order queue of one unit in place and defers side
/// effects as commands.
#[derive(Debug, Default)]
pub struct Behavior;

impl Behavior {
    /// Creates a new behavior system.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Processes the front order of `unit` for the current tick.
    ///
    /// Steering inputs are reset to hold position before the order runs, so a
    /// unit without orders always converges to a standstill.
    pub fn handle(
        &mut self,
        world: &mut World,
        unit: UnitId,
        out: &mut Vec<Command>,
    ) -> Result<(), UpdateError> {
        let tuning = *query::tuning(world);
        let now = query::game_time(world);
        let Some(state) = world.unit_mut(unit) else {
            return Ok(());
        };

        state.target_angle = state.rotation;
        state.target_speed = 0.0;

        let Some(order) = state.orders.front().cloned() else {
            return Ok(());
        };

        if order.is_pass_through() {
            let _ = state.orders.pop_front();
            out.push(Command::ApplyOrder { unit, order });
            return Ok(());
        }

        match order {
            Order::Move { destination } => {
                handle_move(state, destination, &tuning, now, out);
                Ok(())
            }
            Order::Attack { target } => handle_attack(world, unit, target, &tuning, now, out),
            Order::Stop
            | Order::SetFireOrders { .. }
            | Order::SetOnOff { .. }
            | Order::ModifyBuildQueue { .. } => Ok(()),
        }
    }
}

fn handle_move(
    unit: &mut Unit,
    destination: MovingGoal,
    tuning: &Tuning,
    now: GameTime,
    out: &mut Vec<Command>,
) {
    let kinematics = Kinematics::of(unit);
    match unit.behavior {
        BehaviorState::Idle => {
            debug!("unit {} requesting path for move order", unit.id.get());
            unit.behavior = BehaviorState::Moving(MovingState::awaiting_path(destination));
            out.push(Command::RequestPath { unit: unit.id });
        }
        BehaviorState::Moving(ref mut moving) => {
            refresh_path(unit.id, unit.in_collision, moving, tuning, now, out);
            let Some(path) = moving.path.as_mut() else {
                return;
            };

            match follow_path(path, &kinematics, tuning.waypoint_arrival_distance) {
                PathProgress::Completed => {
                    debug!("unit {} completed move order", unit.id.get());
                    let _ = unit.orders.pop_front();
                    unit.behavior = BehaviorState::Idle;
                    if let Some(sound) = unit.arrived_sound {
                        out.push(Command::PlaySound { sound });
                    }
                }
                PathProgress::Advanced => {}
                PathProgress::Steering {
                    target_angle,
                    target_speed,
                } => {
                    unit.target_angle = target_angle;
                    unit.target_speed = target_speed;
                }
            }
        }
    }
}

fn handle_attack(
    world: &mut World,
    id: UnitId,
    target: AttackTarget,
    tuning: &Tuning,
    now: GameTime,
    out: &mut Vec<Command>,
) -> Result<(), UpdateError> {
    let Some(range_squared) = query::unit(world, id)
        .and_then(|unit| unit.weapon(WeaponSlot::Primary))
        .map(UnitWeapon::max_range_squared)
    else {
        if let Some(unit) = world.unit_mut(id) {
            complete_attack(unit);
        }
        return Ok(());
    };

    let target_position = world.target_position(target)?;
    let goal = match target {
        AttackTarget::Point(point) => MovingGoal::Point(point),
        AttackTarget::Unit(other) => world
            .footprint_of(other)
            .map_or(MovingGoal::Point(target_position.unwrap_or_default()), MovingGoal::Region),
    };

    let Some(unit) = world.unit_mut(id) else {
        return Ok(());
    };
    let Some(target_position) = target_position else {
        debug!("unit {} discarding attack on a vanished target", id.get());
        complete_attack(unit);
        return Ok(());
    };

    let in_range = unit.position.distance_squared(target_position) <= range_squared;
    let kinematics = Kinematics::of(unit);
    match unit.behavior {
        BehaviorState::Idle if in_range => {
            for slot in ATTACK_ORDER_SLOTS {
                unit.command_weapon_target(slot, AttackTarget::Point(target_position));
            }
        }
        BehaviorState::Idle => {
            debug!("unit {} closing in on attack target", id.get());
            unit.behavior = BehaviorState::Moving(MovingState::awaiting_path(goal));
            out.push(Command::RequestPath { unit: id });
        }
        BehaviorState::Moving(_) if in_range => {
            unit.behavior = BehaviorState::Idle;
        }
        BehaviorState::Moving(ref mut moving) => {
            refresh_path(id, unit.in_collision, moving, tuning, now, out);
            let Some(path) = moving.path.as_mut() else {
                return Ok(());
            };

            match follow_path(path, &kinematics, tuning.waypoint_arrival_distance) {
                PathProgress::Completed => unit.behavior = BehaviorState::Idle,
                PathProgress::Advanced => {}
                PathProgress::Steering {
                    target_angle,
                    target_speed,
                } => {
                    unit.target_angle = target_angle;
                    unit.target_speed = target_speed;
                }
            }
        }
    }

    Ok(())
}

fn complete_attack(unit: &mut Unit) {
    let _ = unit.orders.pop_front();
    unit.behavior = BehaviorState::Idle;
}

/// Requests a fresh path for a blocked unit once the current one is old enough.
fn refresh_path(
    unit: UnitId,
    in_collision: bool,
    moving: &mut MovingState,
    tuning: &Tuning,
    now: GameTime,
    out: &mut Vec<Command>,
) {
    if !in_collision || moving.path_requested {
        return;
    }

    let stale = moving
        .path
        .as_ref()
        .map_or(true, |path| now - path.created_at() >= tuning.path_refresh_cooldown);
    if stale {
        debug!("unit {} blocked, requesting a new path", unit.get());
        out.push(Command::RequestPath { unit });
        moving.path_requested = true;
    }
}
