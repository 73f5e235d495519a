//! Weapon slots, definitions and the per-slot targeting state.

use serde::{Deserialize, Serialize};

use crate::{AttackTarget, GameTime, GameTimeDelta, SoundId, ThreadId, UnitId, UpdateError};

/// One of the three fixed weapon mounts of a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WeaponSlot {
    /// First weapon, also used to decide attack ranges.
    Primary,
    /// Second weapon.
    Secondary,
    /// Third weapon.
    Tertiary,
}

impl WeaponSlot {
    /// Every slot in update order.
    pub const ALL: [WeaponSlot; 3] = [Self::Primary, Self::Secondary, Self::Tertiary];

    /// Zero-based index of the slot.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Primary => 0,
            Self::Secondary => 1,
            Self::Tertiary => 2,
        }
    }

    /// Script that turns the weapon toward a heading and pitch.
    #[must_use]
    pub const fn aim_script(self) -> &'static str {
        match self {
            Self::Primary => "AimPrimary",
            Self::Secondary => "AimSecondary",
            Self::Tertiary => "AimTertiary",
        }
    }

    /// Query script naming the piece aiming is measured from.
    #[must_use]
    pub const fn aim_from_script(self) -> &'static str {
        match self {
            Self::Primary => "AimFromPrimary",
            Self::Secondary => "AimFromSecondary",
            Self::Tertiary => "AimFromTertiary",
        }
    }

    /// Script that plays the firing animation.
    #[must_use]
    pub const fn fire_script(self) -> &'static str {
        match self {
            Self::Primary => "FirePrimary",
            Self::Secondary => "FireSecondary",
            Self::Tertiary => "FireTertiary",
        }
    }

    /// Query script naming the piece projectiles leave from.
    #[must_use]
    pub const fn query_script(self) -> &'static str {
        match self {
            Self::Primary => "QueryPrimary",
            Self::Secondary => "QuerySecondary",
            Self::Tertiary => "QueryTertiary",
        }
    }
}

impl TryFrom<u32> for WeaponSlot {
    type Error = UpdateError;

    fn try_from(index: u32) -> Result<Self, Self::Error> {
        match index {
            0 => Ok(Self::Primary),
            1 => Ok(Self::Secondary),
            2 => Ok(Self::Tertiary),
            _ => Err(UpdateError::InvalidWeaponSlot { index }),
        }
    }
}

/// Static description of a weapon type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeaponDefinition {
    /// Name of the weapon type.
    pub name: String,
    /// Maximum engagement distance in world units.
    pub max_range: f32,
    /// Time between shots in seconds.
    pub reload_time: f32,
    /// Largest heading drift, in radians, that still permits firing after aiming.
    pub tolerance: f32,
    /// Largest pitch drift, in radians, that still permits firing after aiming.
    pub pitch_tolerance: f32,
    /// Projectile speed in world units per tick.
    pub velocity: f32,
    /// Projectile lifetime in ticks.
    pub duration: u32,
    /// Whether firing puffs light smoke at the firing point.
    #[serde(default)]
    pub start_smoke: bool,
    /// Sound played at the unit when firing.
    #[serde(default)]
    pub sound_start: Option<SoundId>,
}

impl WeaponDefinition {
    /// Reload duration converted to ticks.
    #[must_use]
    pub fn reload_ticks(&self) -> GameTimeDelta {
        GameTimeDelta::from_seconds(self.reload_time)
    }
}

/// Targeting state of a single weapon slot.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum WeaponState {
    /// No target; the weapon may acquire one automatically.
    #[default]
    Idle,
    /// Engaging a target.
    Attacking {
        /// What the weapon is engaging.
        target: AttackTarget,
        /// In-flight aiming script, if one was launched.
        aim: Option<AimInfo>,
    },
}

/// Record linking a launched aiming script to the angles it was commanded with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AimInfo {
    /// Script thread running the aim animation.
    pub thread: ThreadId,
    /// Heading passed to the script, in radians relative to the unit.
    pub heading: f32,
    /// Pitch passed to the script, in radians.
    pub pitch: f32,
}

/// Weapon mounted in a unit slot together with its runtime state.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitWeapon {
    /// Static description of the weapon.
    pub definition: WeaponDefinition,
    /// Current targeting state.
    pub state: WeaponState,
    /// Earliest time the weapon may fire again.
    pub ready_time: GameTime,
    /// Set while the target was commanded, suppressing automatic acquisition.
    pub command_fire: bool,
}

impl UnitWeapon {
    /// Mounts an idle, loaded weapon.
    #[must_use]
    pub fn new(definition: WeaponDefinition) -> Self {
        Self {
            definition,
            state: WeaponState::Idle,
            ready_time: GameTime::default(),
            command_fire: false,
        }
    }

    /// Squared maximum range, for comparison against squared distances.
    #[must_use]
    pub fn max_range_squared(&self) -> f32 {
        self.definition.max_range * self.definition.max_range
    }

    /// Reports whether the weapon has finished reloading at `now`.
    #[must_use]
    pub fn is_ready(&self, now: GameTime) -> bool {
        self.ready_time <= now
    }

    /// Points the weapon at a commanded target.
    ///
    /// A weapon already attacking keeps its in-flight aim; the aim result is
    /// checked against the new target when it completes.
    pub fn command_target(&mut self, target: AttackTarget) {
        self.command_fire = true;
        self.state = match self.state {
            WeaponState::Attacking { aim, .. } => WeaponState::Attacking { target, aim },
            WeaponState::Idle => WeaponState::Attacking { target, aim: None },
        };
    }

    /// Starts engaging an automatically acquired unit.
    pub fn acquire(&mut self, unit: UnitId) {
        self.state = WeaponState::Attacking {
            target: AttackTarget::Unit(unit),
            aim: None,
        };
    }

    /// Drops the current target and any commanded fire.
    pub fn clear_target(&mut self) {
        self.state = WeaponState::Idle;
        self.command_fire = false;
    }
}
