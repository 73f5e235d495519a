#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-unit update orchestration and the fixed-tick driver.
//!
//! A unit update runs the behavior system, then every weapon slot, then
//! steering. The tick driver advances time and updates every live unit in
//! ascending id order, applying the deferred commands of each unit before the
//! next one runs.

use log::debug;
use skirmish_core::{Command, Event, PathRequest, Pathfinder, UnitId, UpdateError, WeaponSlot};
use skirmish_system_behavior::Behavior;
use skirmish_system_steering::Steering;
use skirmish_system_weapons::WeaponControl;
use skirmish_world::{apply, query, Unit, World};

/// Script launched when a unit starts moving.
const START_MOVING_SCRIPT: &str = "StartMoving";
/// Script launched when a unit comes to a halt.
const STOP_MOVING_SCRIPT: &str = "StopMoving";

/// Drives the behavior, weapon and steering systems for every unit.
#[derive(Debug, Default)]
pub struct UnitUpdate {
    behavior: Behavior,
    weapons: WeaponControl,
    steering: Steering,
    commands: Vec<Command>,
}

impl UnitUpdate {
    /// Creates a driver with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates a single unit for the current tick.
    ///
    /// Deferred side effects are pushed into `out`; occupancy and position
    /// changes are committed immediately. Vanished units are skipped.
    pub fn update(
        &mut self,
        world: &mut World,
        unit: UnitId,
        out: &mut Vec<Command>,
    ) -> Result<(), UpdateError> {
        let Some(previous_speed) = query::unit(world, unit).map(|state| state.current_speed)
        else {
            return Ok(());
        };

        self.behavior.handle(world, unit, out)?;
        for slot in WeaponSlot::ALL {
            self.weapons.handle(world, unit, slot, out)?;
        }

        self.steering.steer(world, unit);
        if let Some(state) = world.unit_mut(unit) {
            launch_movement_scripts(state, previous_speed);
        }
        self.steering.advance(world, unit);

        Ok(())
    }

    /// Advances the simulation by one tick.
    ///
    /// Does nothing while the world is paused.
    pub fn tick(&mut self, world: &mut World, out_events: &mut Vec<Event>) -> Result<(), UpdateError> {
        if query::is_paused(world) {
            return Ok(());
        }

        apply(world, Command::Tick, out_events);
        for unit in query::unit_ids(world) {
            let mut commands = std::mem::take(&mut self.commands);
            let result = self.update(world, unit, &mut commands);
            for command in commands.drain(..) {
                apply(world, command, out_events);
            }
            self.commands = commands;
            result?;
        }

        Ok(())
    }
}

fn launch_movement_scripts(unit: &mut Unit, previous_speed: f32) {
    let moving_now = unit.current_speed > 0.0;
    let was_moving = previous_speed > 0.0;

    if moving_now && !was_moving {
        let _ = unit.launch_script(START_MOVING_SCRIPT, &[]);
    } else if was_moving && !moving_now {
        let _ = unit.launch_script(STOP_MOVING_SCRIPT, &[]);
    }
}

/// Hands queued path requests to `pathfinder` and delivers the results.
///
/// Requests the service cannot answer yet are queued again for the next call.
pub fn service_path_requests<P: Pathfinder>(
    world: &mut World,
    pathfinder: &mut P,
    out_events: &mut Vec<Event>,
) {
    let requests: Vec<PathRequest> = world.take_path_requests();
    for request in requests {
        match pathfinder.find_path(&request) {
            Some(path) => {
                debug!(
                    "delivering {} waypoints to unit {}",
                    path.waypoints.len(),
                    request.unit.get()
                );
                apply(
                    world,
                    Command::DeliverPath {
                        unit: request.unit,
                        path,
                    },
                    out_events,
                );
            }
            None => apply(
                world,
                Command::RequestPath { unit: request.unit },
                out_events,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use skirmish_core::{PlayerId, Tuning, UnitBlueprint};
    use skirmish_world::{GridTerrain, ScriptBehavior, ScriptJournal, ScriptTable};

    fn blueprint() -> UnitBlueprint {
        UnitBlueprint {
            unit_type: "ARMJETH".to_owned(),
            turn_rate: 0.1,
            max_speed: 2.0,
            acceleration: 1.0,
            brake_rate: 1.0,
            footprint_x: 2,
            footprint_z: 2,
            max_slope: 10,
            max_water_slope: 10,
            min_water_depth: 0,
            max_water_depth: 20,
            max_hit_points: 100,
            weapons: [None, None, None],
            explosion_weapon: None,
            arrived_sound: None,
        }
    }

    #[test]
    fn speed_transitions_launch_movement_scripts() {
        let mut world = World::new(GridTerrain::flat(32, 32, 0.0, -10.0), Tuning::default());
        let journal = ScriptJournal::new();
        let scripts = ScriptTable::new()
            .with_script(START_MOVING_SCRIPT, ScriptBehavior::Returns(0))
            .with_script(STOP_MOVING_SCRIPT, ScriptBehavior::Returns(0))
            .with_journal(journal.clone());
        let id = world
            .spawn_unit(
                &blueprint(),
                PlayerId::new(1),
                Vec3::new(200.0, 0.0, 200.0),
                0.0,
                Box::new(scripts),
            )
            .expect("spawn");
        let unit = world.unit_mut(id).expect("unit");

        unit.current_speed = 1.0;
        launch_movement_scripts(unit, 0.0);
        launch_movement_scripts(unit, 1.0);
        unit.current_speed = 0.0;
        launch_movement_scripts(unit, 1.0);
        launch_movement_scripts(unit, 0.0);

        assert_eq!(journal.count(START_MOVING_SCRIPT), 1);
        assert_eq!(journal.count(STOP_MOVING_SCRIPT), 1);
    }
}
