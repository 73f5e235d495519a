//! Orders, behavior states and the player command surface.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{Command, DiscreteRect, GameTime, UnitId};

/// Instruction queued on a unit and processed strictly in FIFO order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Order {
    /// Drive to a point or into a footprint region.
    Move {
        /// Where the unit should end up.
        destination: MovingGoal,
    },
    /// Engage a point on the ground or another unit.
    Attack {
        /// What to attack.
        target: AttackTarget,
    },
    /// Discard the remaining queue once this order is reached.
    Stop,
    /// Change how eagerly the unit engages on its own.
    SetFireOrders {
        /// New fire orders.
        orders: FireOrders,
    },
    /// Switch the unit's activation state.
    SetOnOff {
        /// Whether the unit should be active.
        active: bool,
    },
    /// Adjust the number of queued builds of a unit type.
    ModifyBuildQueue {
        /// Unit type whose count changes.
        unit_type: String,
        /// Signed change to the queued count.
        delta: i32,
    },
}

impl Order {
    /// Reports whether the order is handed on untouched by the behavior machine.
    #[must_use]
    pub const fn is_pass_through(&self) -> bool {
        !matches!(self, Self::Move { .. } | Self::Attack { .. })
    }
}

/// Target of an attack, either a fixed point or a unit that may die.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum AttackTarget {
    /// A fixed point on the ground.
    Point(Vec3),
    /// Another unit, resolved through its sweet spot each tick.
    Unit(UnitId),
}

/// Destination of a moving unit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum MovingGoal {
    /// A single world position.
    Point(Vec3),
    /// Any cell of a footprint region.
    Region(DiscreteRect),
}

/// Engagement policy set by [`Order::SetFireOrders`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FireOrders {
    /// Never fire without an explicit command.
    HoldFire,
    /// Fire only at units that attacked first.
    ReturnFire,
    /// Engage anything in range.
    #[default]
    FireAtWill,
}

/// How a newly issued order interacts with the existing queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueKind {
    /// Replace the queue with the new order.
    Immediate,
    /// Append the new order after the existing ones.
    Queued,
}

/// Command issued by a player or replay stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PlayerCommand {
    /// Command addressed to a single unit.
    Unit {
        /// Unit receiving the command.
        unit: UnitId,
        /// What the unit should do.
        command: UnitCommand,
    },
    /// Pause the simulation.
    PauseGame,
    /// Resume the simulation.
    UnpauseGame,
}

impl PlayerCommand {
    /// Translates the player command into the world command it requests.
    #[must_use]
    pub fn into_command(self) -> Command {
        match self {
            Self::Unit {
                unit,
                command: UnitCommand::IssueOrder { order, kind },
            } => Command::IssueOrder { unit, order, kind },
            Self::Unit {
                unit,
                command: UnitCommand::Stop,
            } => Command::StopUnit { unit },
            Self::PauseGame => Command::SetPaused { paused: true },
            Self::UnpauseGame => Command::SetPaused { paused: false },
        }
    }
}

/// Per-unit part of a [`PlayerCommand`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum UnitCommand {
    /// Enqueue an order.
    IssueOrder {
        /// Order to enqueue.
        order: Order,
        /// Whether to replace or append.
        kind: IssueKind,
    },
    /// Drop every order and go idle.
    Stop,
}

/// High-level state of a unit's behavior machine.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum BehaviorState {
    /// Not driving anywhere.
    #[default]
    Idle,
    /// Driving toward a goal.
    Moving(MovingState),
}

/// Bookkeeping for a unit that is driving toward a goal.
#[derive(Clone, Debug, PartialEq)]
pub struct MovingState {
    /// Destination of the move.
    pub goal: MovingGoal,
    /// Path being followed, once the pathfinding service delivered one.
    pub path: Option<PathFollowingInfo>,
    /// Whether a path request is outstanding.
    pub path_requested: bool,
}

impl MovingState {
    /// Creates the state entered right after requesting a path to `goal`.
    #[must_use]
    pub const fn awaiting_path(goal: MovingGoal) -> Self {
        Self {
            goal,
            path: None,
            path_requested: true,
        }
    }
}

/// Waypoints produced by the pathfinding service.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitPath {
    /// Positions to visit in order.
    pub waypoints: Vec<Vec3>,
}

impl UnitPath {
    /// Creates a path from its waypoints.
    #[must_use]
    pub fn new(waypoints: Vec<Vec3>) -> Self {
        Self { waypoints }
    }
}

/// A path being followed together with a forward-only cursor.
#[derive(Clone, Debug, PartialEq)]
pub struct PathFollowingInfo {
    path: UnitPath,
    created_at: GameTime,
    cursor: usize,
}

impl PathFollowingInfo {
    /// Starts following `path` at its first waypoint.
    ///
    /// Returns `None` for a path without waypoints.
    #[must_use]
    pub fn new(path: UnitPath, created_at: GameTime) -> Option<Self> {
        if path.waypoints.is_empty() {
            return None;
        }

        Some(Self {
            path,
            created_at,
            cursor: 0,
        })
    }

    /// Waypoint currently being driven toward.
    #[must_use]
    pub fn current_waypoint(&self) -> Vec3 {
        self.path.waypoints[self.cursor]
    }

    /// Reports whether the cursor sits on the last waypoint.
    #[must_use]
    pub fn is_final_waypoint(&self) -> bool {
        self.cursor + 1 == self.path.waypoints.len()
    }

    /// Moves the cursor one waypoint forward.
    ///
    /// The cursor never passes the final waypoint; advancing from it is a no-op
    /// that returns `false`.
    pub fn advance(&mut self) -> bool {
        if self.is_final_waypoint() {
            return false;
        }

        self.cursor += 1;
        true
    }

    /// Index of the current waypoint.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Time at which the path was installed.
    #[must_use]
    pub const fn created_at(&self) -> GameTime {
        self.created_at
    }

    /// Waypoints of the underlying path.
    #[must_use]
    pub fn waypoints(&self) -> &[Vec3] {
        &self.path.waypoints
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_paths_cannot_be_followed() {
        assert!(PathFollowingInfo::new(UnitPath::default(), GameTime::new(3)).is_none());
    }

    #[test]
    fn cursor_only_moves_forward_and_stops_at_the_end() {
        let path = UnitPath::new(vec![Vec3::ZERO, Vec3::X, Vec3::Z]);
        let mut info = PathFollowingInfo::new(path, GameTime::new(0)).expect("non-empty");

        assert_eq!(info.current_waypoint(), Vec3::ZERO);
        assert!(info.advance());
        assert!(info.advance());
        assert!(info.is_final_waypoint());
        assert!(!info.advance());
        assert_eq!(info.cursor(), 2);
        assert_eq!(info.current_waypoint(), Vec3::Z);
    }

    #[test]
    fn only_move_and_attack_reach_the_behavior_machine() {
        assert!(!Order::Move {
            destination: MovingGoal::Point(Vec3::ZERO)
        }
        .is_pass_through());
        assert!(!Order::Attack {
            target: AttackTarget::Unit(UnitId::new(1))
        }
        .is_pass_through());
        assert!(Order::Stop.is_pass_through());
        assert!(Order::SetOnOff { active: false }.is_pass_through());
    }

    #[test]
    fn player_commands_translate_to_world_commands() {
        assert_eq!(
            PlayerCommand::PauseGame.into_command(),
            Command::SetPaused { paused: true }
        );
        assert_eq!(
            PlayerCommand::Unit {
                unit: UnitId::new(4),
                command: UnitCommand::Stop,
            }
            .into_command(),
            Command::StopUnit {
                unit: UnitId::new(4)
            }
        );
    }
}
