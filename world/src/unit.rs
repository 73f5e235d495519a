//! Live unit record and its script-backed pose queries.

use std::collections::{BTreeMap, VecDeque};

use glam::{Quat, Vec3};
use skirmish_core::{
    to_direction, AttackTarget, BehaviorState, FireOrders, MovementProfile, Order, PlayerId,
    ScriptEnvironment, SoundId, ThreadId, ThreadStatus, UnitBlueprint, UnitId, UnitWeapon,
    UpdateError, WeaponDefinition, WeaponSlot,
};

/// Simulated unit owned by the world.
#[derive(Debug)]
pub struct Unit {
    /// Identifier of the unit.
    pub id: UnitId,
    /// Player controlling the unit.
    pub owner: PlayerId,
    /// Name of the unit type it was spawned from.
    pub unit_type: String,
    /// World position; `y` follows the terrain surface.
    pub position: Vec3,
    /// Rotation around the Y axis in radians, zero facing +Z.
    pub rotation: f32,
    /// Turn rate in radians per tick.
    pub turn_rate: f32,
    /// Current forward speed in world units per tick.
    pub current_speed: f32,
    /// Top speed in world units per tick.
    pub max_speed: f32,
    /// Speed gained per tick.
    pub acceleration: f32,
    /// Speed lost per tick.
    pub brake_rate: f32,
    /// Rotation the steering integrator turns toward this tick.
    pub target_angle: f32,
    /// Speed the steering integrator converges to this tick.
    pub target_speed: f32,
    /// Footprint width in cells.
    pub footprint_x: u32,
    /// Footprint depth in cells.
    pub footprint_z: u32,
    /// Steepest land slope permitted.
    pub max_slope: u32,
    /// Steepest underwater slope permitted.
    pub max_water_slope: u32,
    /// Shallowest water permitted.
    pub min_water_depth: u32,
    /// Deepest water permitted.
    pub max_water_depth: u32,
    /// Remaining hit points.
    pub hit_points: u32,
    /// Hit points of an undamaged unit.
    pub max_hit_points: u32,
    /// Pending orders, front first.
    pub orders: VecDeque<Order>,
    /// State of the behavior machine.
    pub behavior: BehaviorState,
    /// Weapons mounted in the three slots.
    pub weapons: [Option<UnitWeapon>; 3],
    /// Weapon detonated on death.
    pub explosion_weapon: Option<WeaponDefinition>,
    /// Whether the last movement attempt was blocked.
    pub in_collision: bool,
    /// Cue played when a move order completes.
    pub arrived_sound: Option<SoundId>,
    /// Engagement policy.
    pub fire_orders: FireOrders,
    /// Activation state toggled by on/off orders.
    pub active: bool,
    /// Queued build counts per unit type.
    pub build_queue: BTreeMap<String, u32>,
    scripts: Box<dyn ScriptEnvironment>,
}

impl Unit {
    pub(crate) fn from_blueprint(
        id: UnitId,
        blueprint: &UnitBlueprint,
        owner: PlayerId,
        position: Vec3,
        rotation: f32,
        scripts: Box<dyn ScriptEnvironment>,
    ) -> Self {
        Self {
            id,
            owner,
            unit_type: blueprint.unit_type.clone(),
            position,
            rotation,
            turn_rate: blueprint.turn_rate,
            current_speed: 0.0,
            max_speed: blueprint.max_speed,
            acceleration: blueprint.acceleration,
            brake_rate: blueprint.brake_rate,
            target_angle: rotation,
            target_speed: 0.0,
            footprint_x: blueprint.footprint_x,
            footprint_z: blueprint.footprint_z,
            max_slope: blueprint.max_slope,
            max_water_slope: blueprint.max_water_slope,
            min_water_depth: blueprint.min_water_depth,
            max_water_depth: blueprint.max_water_depth,
            hit_points: blueprint.max_hit_points,
            max_hit_points: blueprint.max_hit_points,
            orders: VecDeque::new(),
            behavior: BehaviorState::Idle,
            weapons: blueprint
                .weapons
                .clone()
                .map(|definition| definition.map(UnitWeapon::new)),
            explosion_weapon: blueprint.explosion_weapon.clone(),
            in_collision: false,
            arrived_sound: blueprint.arrived_sound,
            fire_orders: FireOrders::default(),
            active: true,
            build_queue: BTreeMap::new(),
            scripts,
        }
    }

    /// Reports whether the unit belongs to `player`.
    #[must_use]
    pub fn is_owned_by(&self, player: PlayerId) -> bool {
        self.owner == player
    }

    /// Reports whether the unit has run out of hit points.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.hit_points == 0
    }

    /// Unit vector the unit is facing on the XZ plane.
    #[must_use]
    pub fn direction(&self) -> Vec3 {
        to_direction(self.rotation)
    }

    /// Walkability limits built from the unit's own attributes.
    #[must_use]
    pub fn movement_profile(&self) -> MovementProfile {
        MovementProfile {
            footprint_x: self.footprint_x,
            footprint_z: self.footprint_z,
            max_slope: self.max_slope,
            max_water_slope: self.max_water_slope,
            min_water_depth: self.min_water_depth,
            max_water_depth: self.max_water_depth,
        }
    }

    /// Weapon mounted in `slot`, if any.
    #[must_use]
    pub fn weapon(&self, slot: WeaponSlot) -> Option<&UnitWeapon> {
        self.weapons[slot.index()].as_ref()
    }

    /// Mutable access to the weapon mounted in `slot`.
    pub fn weapon_mut(&mut self, slot: WeaponSlot) -> Option<&mut UnitWeapon> {
        self.weapons[slot.index()].as_mut()
    }

    /// Commands the weapon in `slot` onto `target`; empty slots ignore it.
    pub fn command_weapon_target(&mut self, slot: WeaponSlot, target: AttackTarget) {
        if let Some(weapon) = self.weapon_mut(slot) {
            weapon.command_target(target);
        }
    }

    /// Returns every weapon to idle.
    pub fn clear_weapon_targets(&mut self) {
        for weapon in self.weapons.iter_mut().flatten() {
            weapon.clear_target();
        }
    }

    /// Empties the order queue and returns the unit to idle.
    pub fn clear_orders(&mut self) {
        self.orders.clear();
        self.behavior = BehaviorState::Idle;
        self.clear_weapon_targets();
    }

    /// Appends an order to the back of the queue.
    pub fn add_order(&mut self, order: Order) {
        self.orders.push_back(order);
    }

    /// Launches a schedulable script thread.
    pub fn launch_script(&mut self, script: &str, args: &[i32]) -> Option<ThreadId> {
        self.scripts.launch(script, args)
    }

    /// Reaps a schedulable script thread.
    pub fn poll_script(&mut self, thread: ThreadId) -> Option<bool> {
        self.scripts.poll(thread)
    }

    /// Runs a synchronous query script and returns its first local.
    ///
    /// A missing script yields `Ok(None)`. A query that does not finish in one
    /// step breaks the script contract and is reported as an error.
    pub fn run_query(&mut self, script: &str) -> Result<Option<i32>, UpdateError> {
        let Some(thread) = self.scripts.launch_query(script, &[0]) else {
            return Ok(None);
        };

        match self.scripts.run_to_completion(thread) {
            ThreadStatus::Finished { value } => Ok(Some(value)),
            ThreadStatus::Suspended => Err(UpdateError::QueryBlocked {
                unit: self.id,
                script: script.to_owned(),
            }),
        }
    }

    /// World-space position of a model piece under the current pose.
    pub fn piece_position(&self, piece: i32) -> Result<Vec3, UpdateError> {
        let offset = self
            .scripts
            .piece_offset(piece)
            .ok_or(UpdateError::UnknownPiece {
                unit: self.id,
                piece,
            })?;
        Ok(self.position + Quat::from_rotation_y(self.rotation) * offset)
    }

    /// Point other units aim at, defaulting to the unit position.
    pub fn sweet_spot(&mut self) -> Result<Vec3, UpdateError> {
        self.query_piece_position("SweetSpot")
            .map(|point| point.unwrap_or(self.position))
    }

    /// Point projectiles leave from, defaulting to the unit position.
    pub fn firing_point(&mut self, slot: WeaponSlot) -> Result<Vec3, UpdateError> {
        self.query_piece_position(slot.query_script())
            .map(|point| point.unwrap_or(self.position))
    }

    /// Point aiming angles are measured from, defaulting to the firing point.
    pub fn aiming_point(&mut self, slot: WeaponSlot) -> Result<Vec3, UpdateError> {
        match self.query_piece_position(slot.aim_from_script())? {
            Some(point) => Ok(point),
            None => self.firing_point(slot),
        }
    }

    fn query_piece_position(&mut self, script: &str) -> Result<Option<Vec3>, UpdateError> {
        match self.run_query(script)? {
            Some(piece) => self.piece_position(piece).map(Some),
            None => Ok(None),
        }
    }
}
