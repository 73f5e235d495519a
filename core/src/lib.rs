#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Skirmish simulation.
//!
//! This crate defines the message surface that connects the host, the
//! authoritative world, and the per-unit systems. Hosts submit [`Command`]
//! values describing desired mutations, the world executes those commands via
//! its `apply` entry point, and then broadcasts [`Event`] values describing what
//! happened. Systems run once per unit per tick, mutate the unit they were
//! handed, and respond with new command batches for everything that must be
//! deferred (path requests, projectiles, audio and visual cues).
//!
//! The collaborator contracts the core consumes from its host (terrain,
//! occupancy, scripting and pathfinding) are expressed as traits in this crate
//! so that systems can be exercised against lightweight doubles.

use std::ops::{Add, Sub};

use glam::Vec3;
use serde::{Deserialize, Serialize};

mod blueprint;
mod error;
mod math;
mod order;
mod services;
mod tuning;
mod weapon;

pub use blueprint::UnitBlueprint;
pub use error::UpdateError;
pub use math::{heading_and_pitch, to_direction, to_rotation, to_script_angle, wrap_angle};
pub use order::{
    AttackTarget, BehaviorState, FireOrders, IssueKind, MovingGoal, MovingState, Order,
    PathFollowingInfo, PlayerCommand, UnitCommand, UnitPath,
};
pub use services::{
    MovementProfile, Occupancy, PathRequest, Pathfinder, ScriptEnvironment, Terrain,
    ThreadStatus,
};
pub use tuning::Tuning;
pub use weapon::{AimInfo, UnitWeapon, WeaponDefinition, WeaponSlot, WeaponState};

/// Number of simulation ticks that elapse per second of game time.
pub const TICKS_PER_SECOND: u32 = 30;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by a single tick.
    Tick,
    /// Appends an order to a unit's queue.
    IssueOrder {
        /// Unit receiving the order.
        unit: UnitId,
        /// Order to enqueue.
        order: Order,
        /// Whether the order replaces the queue or is appended to it.
        kind: IssueKind,
    },
    /// Discards every order of a unit and returns it to idle.
    StopUnit {
        /// Unit that should stop.
        unit: UnitId,
    },
    /// Suspends or resumes the per-tick driver.
    SetPaused {
        /// Whether the simulation should be paused.
        paused: bool,
    },
    /// Asks the pathfinding service to compute a path for a unit.
    RequestPath {
        /// Unit that needs a path toward its current moving goal.
        unit: UnitId,
    },
    /// Hands a computed path to a unit awaiting one.
    DeliverPath {
        /// Unit that requested the path.
        unit: UnitId,
        /// Waypoints the unit should follow.
        path: UnitPath,
    },
    /// Spawns a projectile travelling from `origin` along `direction`.
    SpawnProjectile {
        /// Player owning the firing unit.
        owner: PlayerId,
        /// Definition of the weapon that fired.
        weapon: WeaponDefinition,
        /// World-space point the projectile leaves from.
        origin: Vec3,
        /// Normalized direction of travel.
        direction: Vec3,
    },
    /// Plays an audio cue on the selection channel.
    PlaySound {
        /// Sound to play.
        sound: SoundId,
    },
    /// Plays an audio cue positioned at a unit.
    PlayUnitSound {
        /// Unit emitting the sound.
        unit: UnitId,
        /// Sound to play.
        sound: SoundId,
    },
    /// Spawns a puff of light smoke at a world position.
    CreateLightSmoke {
        /// Position of the effect.
        position: Vec3,
    },
    /// Applies an order that the behavior machine does not interpret itself.
    ApplyOrder {
        /// Unit the order belongs to.
        unit: UnitId,
        /// Pass-through order popped from the front of the queue.
        order: Order,
    },
    /// Removes hit points from a unit, killing it when none remain.
    DamageUnit {
        /// Unit receiving the damage.
        unit: UnitId,
        /// Amount of hit points removed.
        amount: u32,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Game time after the tick.
        time: GameTime,
    },
    /// Announces that the simulation was paused or resumed.
    PauseChanged {
        /// Whether the simulation is now paused.
        paused: bool,
    },
    /// Confirms that an order was added to a unit's queue.
    OrderIssued {
        /// Unit that received the order.
        unit: UnitId,
        /// How the order was enqueued.
        kind: IssueKind,
    },
    /// Confirms that a unit discarded its orders.
    UnitStopped {
        /// Unit that stopped.
        unit: UnitId,
    },
    /// Reports that a path request was queued for the pathfinding service.
    PathRequested {
        /// Unit awaiting the path.
        unit: UnitId,
    },
    /// Reports that a path was installed on a moving unit.
    PathAssigned {
        /// Unit that received the path.
        unit: UnitId,
        /// Number of waypoints in the path.
        waypoints: usize,
    },
    /// Reports that a delivered path could not be used.
    PathDropped {
        /// Unit the path was meant for.
        unit: UnitId,
    },
    /// Confirms that a projectile entered the simulation.
    ProjectileSpawned {
        /// Player owning the projectile.
        owner: PlayerId,
        /// Name of the weapon that fired it.
        weapon: String,
        /// Launch position.
        origin: Vec3,
        /// Normalized direction of travel.
        direction: Vec3,
    },
    /// Reports that a selection-channel sound was triggered.
    SoundPlayed {
        /// Sound that was played.
        sound: SoundId,
    },
    /// Reports that a unit-positioned sound was triggered.
    UnitSoundPlayed {
        /// Unit emitting the sound.
        unit: UnitId,
        /// Sound that was played.
        sound: SoundId,
    },
    /// Reports that light smoke was created.
    LightSmokeCreated {
        /// Position of the effect.
        position: Vec3,
    },
    /// Confirms that a pass-through order changed a unit's settings.
    OrderApplied {
        /// Unit whose settings changed.
        unit: UnitId,
        /// Order that was applied.
        order: Order,
    },
    /// Reports that a unit lost hit points but survived.
    UnitDamaged {
        /// Unit that was damaged.
        unit: UnitId,
        /// Hit points remaining.
        hit_points: u32,
    },
    /// Reports that a unit died and was removed from the simulation.
    UnitDied {
        /// Unit that died.
        unit: UnitId,
    },
}

/// Unique identifier assigned to a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(u32);

impl UnitId {
    /// Creates a new unit identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of the player that owns a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(u32);

impl PlayerId {
    /// Creates a new player identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Opaque handle to a script thread, scoped to the environment that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(u32);

impl ThreadId {
    /// Wraps a raw thread index issued by a script environment.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the raw thread index.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of an audio cue known to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SoundId(u32);

impl SoundId {
    /// Creates a new sound identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Absolute simulation time measured in ticks.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct GameTime(u64);

impl GameTime {
    /// Creates a time stamp from a raw tick count.
    #[must_use]
    pub const fn new(ticks: u64) -> Self {
        Self(ticks)
    }

    /// Number of ticks since the start of the simulation.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Returns the time one tick later.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl Add<GameTimeDelta> for GameTime {
    type Output = GameTime;

    fn add(self, rhs: GameTimeDelta) -> GameTime {
        GameTime(self.0.saturating_add(rhs.0))
    }
}

impl Sub for GameTime {
    type Output = GameTimeDelta;

    fn sub(self, rhs: GameTime) -> GameTimeDelta {
        GameTimeDelta(self.0.saturating_sub(rhs.0))
    }
}

/// Span of simulation time measured in ticks.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct GameTimeDelta(u64);

impl GameTimeDelta {
    /// Creates a span from a raw tick count.
    #[must_use]
    pub const fn new(ticks: u64) -> Self {
        Self(ticks)
    }

    /// Number of ticks spanned.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Converts a duration authored in seconds into whole ticks, rounding up.
    ///
    /// Negative and non-finite inputs produce an empty span.
    #[must_use]
    pub fn from_seconds(seconds: f32) -> Self {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Self(0);
        }

        let ticks = (seconds * TICKS_PER_SECOND as f32).ceil();
        Self(ticks as u64)
    }
}

/// Axis-aligned rectangle on the discrete terrain cell grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscreteRect {
    /// Column of the upper-left cell. May be negative near the map edge.
    pub x: i32,
    /// Row of the upper-left cell. May be negative near the map edge.
    pub y: i32,
    /// Width measured in cells.
    pub width: u32,
    /// Height measured in cells.
    pub height: u32,
}

impl DiscreteRect {
    /// Creates a rectangle from its upper-left cell and size.
    #[must_use]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Iterates the cells covered by the rectangle in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> {
        let DiscreteRect {
            x,
            y,
            width,
            height,
        } = *self;
        (0..height as i32).flat_map(move |row| (0..width as i32).map(move |col| (x + col, y + row)))
    }

    /// Reports whether the rectangle covers the provided cell.
    #[must_use]
    pub fn contains(&self, column: i32, row: i32) -> bool {
        column >= self.x
            && row >= self.y
            && i64::from(column) < i64::from(self.x) + i64::from(self.width)
            && i64::from(row) < i64::from(self.y) + i64::from(self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reload_seconds_round_up_to_whole_ticks() {
        assert_eq!(GameTimeDelta::from_seconds(1.0), GameTimeDelta::new(30));
        assert_eq!(GameTimeDelta::from_seconds(0.01), GameTimeDelta::new(1));
        assert_eq!(GameTimeDelta::from_seconds(-2.0), GameTimeDelta::new(0));
        assert_eq!(GameTimeDelta::from_seconds(f32::NAN), GameTimeDelta::new(0));
    }

    #[test]
    fn time_arithmetic_saturates() {
        let early = GameTime::new(5);
        let late = GameTime::new(65);
        assert_eq!(late - early, GameTimeDelta::new(60));
        assert_eq!(early - late, GameTimeDelta::new(0));
        assert_eq!(early + GameTimeDelta::new(10), GameTime::new(15));
        assert_eq!(GameTime::new(u64::MAX).next(), GameTime::new(u64::MAX));
    }

    #[test]
    fn rect_cells_cover_the_whole_area() {
        let rect = DiscreteRect::new(-1, 2, 2, 3);
        let cells: Vec<_> = rect.cells().collect();
        assert_eq!(
            cells,
            vec![(-1, 2), (0, 2), (-1, 3), (0, 3), (-1, 4), (0, 4)]
        );
        assert!(rect.contains(0, 4));
        assert!(!rect.contains(1, 4));
        assert!(!rect.contains(0, 5));
    }

    #[test]
    fn player_command_round_trips_through_bincode() {
        let command = PlayerCommand::Unit {
            unit: UnitId::new(7),
            command: UnitCommand::IssueOrder {
                order: Order::Attack {
                    target: AttackTarget::Point(Vec3::new(1.0, 2.0, 3.0)),
                },
                kind: IssueKind::Queued,
            },
        };

        let bytes = bincode::serialize(&command).expect("serialize");
        let restored: PlayerCommand = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, command);
    }
}
