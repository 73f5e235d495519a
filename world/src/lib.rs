#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for the Skirmish simulation.
//!
//! The world owns every live unit (kept in ascending id order), the terrain,
//! the occupancy index, in-flight projectiles and the queue of path requests
//! waiting for the host's pathfinding service. Mutations arrive as
//! [`Command`] values through [`apply`]; systems additionally borrow a single
//! unit together with the terrain and occupancy index through
//! [`World::unit_parts`] so that movement commits are visible to later units in
//! the same tick.

use std::collections::BTreeMap;

use glam::Vec3;
use log::{debug, warn};
use skirmish_core::{
    AttackTarget, BehaviorState, Command, DiscreteRect, Event, GameTime, IssueKind, Occupancy,
    Order, PathFollowingInfo, PathRequest, PlayerId, ScriptEnvironment, Terrain, Tuning,
    UnitBlueprint, UnitId, UnitPath, UpdateError, WeaponDefinition,
};
use thiserror::Error;

mod occupancy;
mod pathfinder;
mod script_table;
mod terrain;
mod unit;

pub use occupancy::{Occupant, OccupancyGrid};
pub use pathfinder::DirectPathfinder;
pub use script_table::{ScriptBehavior, ScriptJournal, ScriptLaunch, ScriptTable};
pub use terrain::{GridTerrain, CELL_SIZE};
pub use unit::Unit;

/// Reasons a unit could not be placed into the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SpawnError {
    /// The footprint extends beyond the terrain grid.
    #[error("footprint {0:?} lies outside the terrain")]
    OutOfBounds(DiscreteRect),
    /// The terrain under the footprint is impassable for the unit.
    #[error("footprint {0:?} is not walkable for the unit")]
    NotWalkable(DiscreteRect),
    /// Another unit or a feature already stands on the footprint.
    #[error("footprint {0:?} is occupied")]
    Occupied(DiscreteRect),
}

/// Projectile travelling through the world.
#[derive(Clone, Debug, PartialEq)]
pub struct Projectile {
    /// Player that fired the projectile.
    pub owner: PlayerId,
    /// Name of the weapon that fired it.
    pub weapon: String,
    /// Point it was launched from.
    pub origin: Vec3,
    /// Current position.
    pub position: Vec3,
    /// Displacement per tick.
    pub velocity: Vec3,
    /// Ticks left before it expires.
    pub remaining_ticks: u32,
}

impl Projectile {
    fn launch(owner: PlayerId, weapon: &WeaponDefinition, origin: Vec3, direction: Vec3) -> Self {
        Self {
            owner,
            weapon: weapon.name.clone(),
            origin,
            position: origin,
            velocity: direction * weapon.velocity,
            remaining_ticks: weapon.duration,
        }
    }
}

/// Mutable borrow of one unit alongside the shared movement collaborators.
#[derive(Debug)]
pub struct UnitParts<'a> {
    /// Unit being updated.
    pub unit: &'a mut Unit,
    /// Terrain the unit moves over.
    pub terrain: &'a GridTerrain,
    /// Occupancy index updated by movement commits.
    pub occupancy: &'a mut OccupancyGrid,
    /// Shared tuning parameters.
    pub tuning: &'a Tuning,
    /// Current simulation time.
    pub game_time: GameTime,
}

/// Represents the authoritative simulation state.
#[derive(Debug)]
pub struct World {
    tuning: Tuning,
    terrain: GridTerrain,
    occupancy: OccupancyGrid,
    units: BTreeMap<UnitId, Unit>,
    next_unit_id: u32,
    projectiles: Vec<Projectile>,
    path_requests: Vec<PathRequest>,
    game_time: GameTime,
    paused: bool,
}

impl World {
    /// Creates an empty world over the provided terrain.
    #[must_use]
    pub fn new(terrain: GridTerrain, tuning: Tuning) -> Self {
        let occupancy = OccupancyGrid::new(terrain.columns(), terrain.rows());
        Self {
            tuning,
            terrain,
            occupancy,
            units: BTreeMap::new(),
            next_unit_id: 1,
            projectiles: Vec::new(),
            path_requests: Vec::new(),
            game_time: GameTime::default(),
            paused: false,
        }
    }

    /// Places a new idle unit with an empty order queue.
    ///
    /// The unit is dropped onto the terrain surface at the planar coordinates
    /// of `position`.
    pub fn spawn_unit(
        &mut self,
        blueprint: &UnitBlueprint,
        owner: PlayerId,
        position: Vec3,
        rotation: f32,
        scripts: Box<dyn ScriptEnvironment>,
    ) -> Result<UnitId, SpawnError> {
        let id = UnitId::new(self.next_unit_id);
        let grounded = Vec3::new(
            position.x,
            self.terrain.height_at(position.x, position.z),
            position.z,
        );
        let unit = Unit::from_blueprint(id, blueprint, owner, grounded, rotation, scripts);

        let region =
            self.terrain
                .footprint_region(grounded, blueprint.footprint_x, blueprint.footprint_z);
        if !self.terrain.contains_region(region) {
            return Err(SpawnError::OutOfBounds(region));
        }
        if !self.terrain.is_walkable(&unit.movement_profile(), region) {
            return Err(SpawnError::NotWalkable(region));
        }
        if self.occupancy.is_collision_at(region, id) {
            return Err(SpawnError::Occupied(region));
        }

        self.occupancy.stamp_unit(region, id);
        self.next_unit_id = self.next_unit_id.saturating_add(1);
        let _ = self.units.insert(id, unit);
        debug!("spawned unit {} for player {}", id.get(), owner.get());
        Ok(id)
    }

    /// Marks a footprint as permanently blocked by a map feature.
    pub fn place_feature(&mut self, region: DiscreteRect) -> Result<(), SpawnError> {
        if !self.terrain.contains_region(region) {
            return Err(SpawnError::OutOfBounds(region));
        }
        if region
            .cells()
            .any(|(column, row)| self.occupancy.occupant(column, row).is_some())
        {
            return Err(SpawnError::Occupied(region));
        }

        self.occupancy.stamp_feature(region);
        Ok(())
    }

    /// Mutable access to a live unit.
    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// Borrows a live unit together with the terrain and occupancy index.
    pub fn unit_parts(&mut self, id: UnitId) -> Option<UnitParts<'_>> {
        let unit = self.units.get_mut(&id)?;
        Some(UnitParts {
            unit,
            terrain: &self.terrain,
            occupancy: &mut self.occupancy,
            tuning: &self.tuning,
            game_time: self.game_time,
        })
    }

    /// Resolves an attack target into a world position.
    ///
    /// Points resolve to themselves. Units resolve to their sweet spot, or to
    /// `None` once they no longer exist.
    pub fn target_position(&mut self, target: AttackTarget) -> Result<Option<Vec3>, UpdateError> {
        match target {
            AttackTarget::Point(point) => Ok(Some(point)),
            AttackTarget::Unit(id) => match self.units.get_mut(&id) {
                Some(unit) => unit.sweet_spot().map(Some),
                None => Ok(None),
            },
        }
    }

    /// Footprint region currently covered by a live unit.
    #[must_use]
    pub fn footprint_of(&self, id: UnitId) -> Option<DiscreteRect> {
        let unit = self.units.get(&id)?;
        Some(
            self.terrain
                .footprint_region(unit.position, unit.footprint_x, unit.footprint_z),
        )
    }

    /// Hands every queued path request to the caller, oldest first.
    pub fn take_path_requests(&mut self) -> Vec<PathRequest> {
        std::mem::take(&mut self.path_requests)
    }

    fn queue_path_request(&mut self, unit_id: UnitId, out_events: &mut Vec<Event>) {
        let Some(unit) = self.units.get(&unit_id) else {
            return;
        };
        let BehaviorState::Moving(moving) = &unit.behavior else {
            return;
        };

        let request = PathRequest {
            unit: unit_id,
            start: unit.position,
            goal: moving.goal,
        };
        self.path_requests.retain(|pending| pending.unit != unit_id);
        self.path_requests.push(request);
        out_events.push(Event::PathRequested { unit: unit_id });
    }

    fn deliver_path(&mut self, unit_id: UnitId, path: UnitPath, out_events: &mut Vec<Event>) {
        let now = self.game_time;
        let Some(unit) = self.units.get_mut(&unit_id) else {
            warn!("dropping path for vanished unit {}", unit_id.get());
            out_events.push(Event::PathDropped { unit: unit_id });
            return;
        };
        let BehaviorState::Moving(moving) = &mut unit.behavior else {
            warn!("dropping path for unit {} that is no longer moving", unit_id.get());
            out_events.push(Event::PathDropped { unit: unit_id });
            return;
        };

        moving.path_requested = false;
        match PathFollowingInfo::new(path, now) {
            Some(info) => {
                let waypoints = info.waypoints().len();
                moving.path = Some(info);
                out_events.push(Event::PathAssigned {
                    unit: unit_id,
                    waypoints,
                });
            }
            None => {
                warn!("unit {} received an empty path", unit_id.get());
                out_events.push(Event::PathDropped { unit: unit_id });
            }
        }
    }

    fn apply_pass_through(&mut self, unit_id: UnitId, order: Order, out_events: &mut Vec<Event>) {
        let Some(unit) = self.units.get_mut(&unit_id) else {
            return;
        };

        match &order {
            Order::Stop => unit.clear_orders(),
            Order::SetFireOrders { orders } => unit.fire_orders = *orders,
            Order::SetOnOff { active } => unit.active = *active,
            Order::ModifyBuildQueue { unit_type, delta } => {
                let count = unit.build_queue.entry(unit_type.clone()).or_insert(0);
                *count = count.saturating_add_signed(*delta);
                if *count == 0 {
                    let _ = unit.build_queue.remove(unit_type);
                }
            }
            Order::Move { .. } | Order::Attack { .. } => return,
        }

        out_events.push(Event::OrderApplied {
            unit: unit_id,
            order,
        });
    }

    fn damage_unit(&mut self, unit_id: UnitId, amount: u32, out_events: &mut Vec<Event>) {
        let Some(unit) = self.units.get_mut(&unit_id) else {
            return;
        };

        unit.hit_points = unit.hit_points.saturating_sub(amount);
        if !unit.is_dead() {
            out_events.push(Event::UnitDamaged {
                unit: unit_id,
                hit_points: unit.hit_points,
            });
            return;
        }

        if let Some(region) = self.footprint_of(unit_id) {
            self.occupancy.vacate_unit(region, unit_id);
        }
        let _ = self.units.remove(&unit_id);
        self.path_requests.retain(|pending| pending.unit != unit_id);
        debug!("unit {} died", unit_id.get());
        out_events.push(Event::UnitDied { unit: unit_id });
    }

    fn advance_projectiles(&mut self) {
        for projectile in &mut self.projectiles {
            projectile.position += projectile.velocity;
            projectile.remaining_ticks = projectile.remaining_ticks.saturating_sub(1);
        }
        self.projectiles
            .retain(|projectile| projectile.remaining_ticks > 0);
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick => {
            if world.paused {
                return;
            }
            world.game_time = world.game_time.next();
            world.advance_projectiles();
            out_events.push(Event::TimeAdvanced {
                time: world.game_time,
            });
        }
        Command::IssueOrder { unit, order, kind } => {
            if let Some(target) = world.units.get_mut(&unit) {
                if kind == IssueKind::Immediate {
                    target.clear_orders();
                }
                target.add_order(order);
                out_events.push(Event::OrderIssued { unit, kind });
            }
        }
        Command::StopUnit { unit } => {
            if let Some(target) = world.units.get_mut(&unit) {
                target.clear_orders();
                out_events.push(Event::UnitStopped { unit });
            }
        }
        Command::SetPaused { paused } => {
            if world.paused != paused {
                world.paused = paused;
                out_events.push(Event::PauseChanged { paused });
            }
        }
        Command::RequestPath { unit } => world.queue_path_request(unit, out_events),
        Command::DeliverPath { unit, path } => world.deliver_path(unit, path, out_events),
        Command::SpawnProjectile {
            owner,
            weapon,
            origin,
            direction,
        } => {
            world
                .projectiles
                .push(Projectile::launch(owner, &weapon, origin, direction));
            out_events.push(Event::ProjectileSpawned {
                owner,
                weapon: weapon.name,
                origin,
                direction,
            });
        }
        Command::PlaySound { sound } => out_events.push(Event::SoundPlayed { sound }),
        Command::PlayUnitSound { unit, sound } => {
            if world.units.contains_key(&unit) {
                out_events.push(Event::UnitSoundPlayed { unit, sound });
            }
        }
        Command::CreateLightSmoke { position } => {
            out_events.push(Event::LightSmokeCreated { position });
        }
        Command::ApplyOrder { unit, order } => world.apply_pass_through(unit, order, out_events),
        Command::DamageUnit { unit, amount } => world.damage_unit(unit, amount, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use glam::Vec3;
    use skirmish_core::{BehaviorState, GameTime, PlayerId, Tuning, UnitId, WeaponSlot, WeaponState};

    use super::{GridTerrain, OccupancyGrid, Projectile, Unit, World};

    /// Shared tuning parameters.
    #[must_use]
    pub fn tuning(world: &World) -> &Tuning {
        &world.tuning
    }

    /// Current simulation time.
    #[must_use]
    pub fn game_time(world: &World) -> GameTime {
        world.game_time
    }

    /// Reports whether the per-tick driver is suspended.
    #[must_use]
    pub fn is_paused(world: &World) -> bool {
        world.paused
    }

    /// Terrain the units move over.
    #[must_use]
    pub fn terrain(world: &World) -> &GridTerrain {
        &world.terrain
    }

    /// Occupancy index of the terrain cells.
    #[must_use]
    pub fn occupancy(world: &World) -> &OccupancyGrid {
        &world.occupancy
    }

    /// Looks up a live unit.
    #[must_use]
    pub fn unit(world: &World, id: UnitId) -> Option<&Unit> {
        world.units.get(&id)
    }

    /// Identifiers of every live unit in ascending order.
    #[must_use]
    pub fn unit_ids(world: &World) -> Vec<UnitId> {
        world.units.keys().copied().collect()
    }

    /// Iterates live units in ascending id order.
    pub fn units(world: &World) -> impl Iterator<Item = &Unit> {
        world.units.values()
    }

    /// Projectiles currently in flight.
    #[must_use]
    pub fn projectiles(world: &World) -> &[Projectile] {
        &world.projectiles
    }

    /// Captures a read-only view of every live unit.
    #[must_use]
    pub fn unit_view(world: &World) -> UnitView {
        let snapshots = world
            .units
            .values()
            .map(|unit| UnitSnapshot {
                id: unit.id,
                owner: unit.owner,
                position: unit.position,
                rotation: unit.rotation,
                current_speed: unit.current_speed,
                hit_points: unit.hit_points,
                moving: matches!(unit.behavior, BehaviorState::Moving(_)),
                queued_orders: unit.orders.len(),
                in_collision: unit.in_collision,
                attacking: WeaponSlot::ALL.map(|slot| {
                    unit.weapon(slot).map_or(false, |weapon| {
                        matches!(weapon.state, WeaponState::Attacking { .. })
                    })
                }),
            })
            .collect();
        UnitView { snapshots }
    }

    /// Read-only snapshot describing all live units.
    #[derive(Clone, Debug, Default)]
    pub struct UnitView {
        snapshots: Vec<UnitSnapshot>,
    }

    impl UnitView {
        /// Iterator over the captured snapshots in ascending id order.
        pub fn iter(&self) -> impl Iterator<Item = &UnitSnapshot> {
            self.snapshots.iter()
        }

        /// Consumes the view, yielding the underlying snapshots.
        #[must_use]
        pub fn into_vec(self) -> Vec<UnitSnapshot> {
            self.snapshots
        }
    }

    /// Immutable representation of a single unit's state used for queries.
    #[derive(Clone, Debug, PartialEq)]
    pub struct UnitSnapshot {
        /// Identifier of the unit.
        pub id: UnitId,
        /// Owning player.
        pub owner: PlayerId,
        /// World position.
        pub position: Vec3,
        /// Rotation around the Y axis.
        pub rotation: f32,
        /// Current forward speed.
        pub current_speed: f32,
        /// Remaining hit points.
        pub hit_points: u32,
        /// Whether the behavior machine is in the moving state.
        pub moving: bool,
        /// Number of queued orders.
        pub queued_orders: usize,
        /// Whether the last movement attempt collided.
        pub in_collision: bool,
        /// Whether each weapon slot is engaging a target.
        pub attacking: [bool; 3],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::{MovingGoal, SoundId};

    fn blueprint() -> UnitBlueprint {
        UnitBlueprint {
            unit_type: "ARMFLASH".to_owned(),
            turn_rate: 0.1,
            max_speed: 4.0,
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
            arrived_sound: Some(SoundId::new(4)),
        }
    }

    fn world() -> World {
        World::new(GridTerrain::flat(32, 32, 0.0, -10.0), Tuning::default())
    }

    fn spawn(world: &mut World, x: f32, z: f32) -> UnitId {
        world
            .spawn_unit(
                &blueprint(),
                PlayerId::new(1),
                Vec3::new(x, 0.0, z),
                0.0,
                Box::new(ScriptTable::new()),
            )
            .expect("spawn")
    }

    #[test]
    fn spawned_units_start_idle_with_stamped_footprint() {
        let mut world = world();
        let id = spawn(&mut world, 100.0, 100.0);

        let unit = query::unit(&world, id).expect("unit");
        assert_eq!(unit.behavior, BehaviorState::Idle);
        assert!(unit.orders.is_empty());

        let region = world.footprint_of(id).expect("footprint");
        for (column, row) in region.cells() {
            assert_eq!(
                query::occupancy(&world).occupant(column, row),
                Some(Occupant::Unit(id))
            );
        }
    }

    #[test]
    fn overlapping_spawns_are_rejected() {
        let mut world = world();
        let _ = spawn(&mut world, 100.0, 100.0);

        let result = world.spawn_unit(
            &blueprint(),
            PlayerId::new(2),
            Vec3::new(104.0, 0.0, 100.0),
            0.0,
            Box::new(ScriptTable::new()),
        );
        assert!(matches!(result, Err(SpawnError::Occupied(_))));
    }

    #[test]
    fn immediate_orders_replace_the_queue() {
        let mut world = world();
        let id = spawn(&mut world, 100.0, 100.0);
        let mut events = Vec::new();

        let first = Order::Move {
            destination: MovingGoal::Point(Vec3::new(200.0, 0.0, 200.0)),
        };
        let second = Order::SetOnOff { active: false };
        apply(
            &mut world,
            Command::IssueOrder {
                unit: id,
                order: first,
                kind: IssueKind::Queued,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::IssueOrder {
                unit: id,
                order: second.clone(),
                kind: IssueKind::Immediate,
            },
            &mut events,
        );

        let unit = query::unit(&world, id).expect("unit");
        assert_eq!(unit.orders.len(), 1);
        assert_eq!(unit.orders.front(), Some(&second));
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn paths_are_installed_only_on_moving_units() {
        let mut world = world();
        let id = spawn(&mut world, 100.0, 100.0);
        let mut events = Vec::new();
        let path = UnitPath::new(vec![Vec3::new(150.0, 0.0, 100.0)]);

        apply(
            &mut world,
            Command::DeliverPath {
                unit: id,
                path: path.clone(),
            },
            &mut events,
        );
        assert_eq!(events, vec![Event::PathDropped { unit: id }]);

        let goal = MovingGoal::Point(Vec3::new(150.0, 0.0, 100.0));
        world.unit_mut(id).expect("unit").behavior =
            BehaviorState::Moving(skirmish_core::MovingState::awaiting_path(goal));
        events.clear();
        apply(&mut world, Command::RequestPath { unit: id }, &mut events);
        assert_eq!(world.take_path_requests().len(), 1);

        apply(&mut world, Command::DeliverPath { unit: id, path }, &mut events);
        let BehaviorState::Moving(moving) = &query::unit(&world, id).expect("unit").behavior else {
            panic!("unit should still be moving");
        };
        assert!(!moving.path_requested);
        assert!(moving.path.is_some());
    }

    #[test]
    fn lethal_damage_removes_the_unit_and_frees_its_cells() {
        let mut world = world();
        let id = spawn(&mut world, 100.0, 100.0);
        let region = world.footprint_of(id).expect("footprint");
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::DamageUnit {
                unit: id,
                amount: 40,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::DamageUnit {
                unit: id,
                amount: 400,
            },
            &mut events,
        );

        assert_eq!(
            events,
            vec![
                Event::UnitDamaged {
                    unit: id,
                    hit_points: 60
                },
                Event::UnitDied { unit: id },
            ]
        );
        assert!(query::unit(&world, id).is_none());
        assert!(region
            .cells()
            .all(|(column, row)| query::occupancy(&world).occupant(column, row).is_none()));
        assert_eq!(world.target_position(AttackTarget::Unit(id)), Ok(None));
    }

    #[test]
    fn ticks_advance_time_and_expire_projectiles() {
        let mut world = world();
        let mut events = Vec::new();
        let weapon = WeaponDefinition {
            name: "EMG".to_owned(),
            max_range: 100.0,
            reload_time: 1.0,
            tolerance: 0.1,
            pitch_tolerance: 0.1,
            velocity: 5.0,
            duration: 2,
            start_smoke: false,
            sound_start: None,
        };
        apply(
            &mut world,
            Command::SpawnProjectile {
                owner: PlayerId::new(1),
                weapon,
                origin: Vec3::ZERO,
                direction: Vec3::X,
            },
            &mut events,
        );

        apply(&mut world, Command::Tick, &mut events);
        assert_eq!(query::projectiles(&world)[0].position, Vec3::new(5.0, 0.0, 0.0));
        apply(&mut world, Command::Tick, &mut events);
        assert!(query::projectiles(&world).is_empty());
        assert_eq!(query::game_time(&world), GameTime::new(2));

        apply(&mut world, Command::SetPaused { paused: true }, &mut events);
        apply(&mut world, Command::Tick, &mut events);
        assert_eq!(query::game_time(&world), GameTime::new(2));
    }

    #[test]
    fn build_queue_orders_adjust_counts() {
        let mut world = world();
        let id = spawn(&mut world, 100.0, 100.0);
        let mut events = Vec::new();

        for delta in [3, -1] {
            apply(
                &mut world,
                Command::ApplyOrder {
                    unit: id,
                    order: Order::ModifyBuildQueue {
                        unit_type: "ARMPW".to_owned(),
                        delta,
                    },
                },
                &mut events,
            );
        }
        let unit = query::unit(&world, id).expect("unit");
        assert_eq!(unit.build_queue.get("ARMPW"), Some(&2));
        assert_eq!(events.len(), 2);
    }
}
