//! RON scenario files describing a skirmish to simulate headlessly.

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use log::debug;
use serde::{Deserialize, Serialize};
use skirmish_core::{DiscreteRect, PlayerCommand, PlayerId, Tuning, UnitBlueprint, UnitId};
use skirmish_world::{GridTerrain, ScriptBehavior, ScriptTable, World};

/// Complete description of a headless run.
///
/// Units receive ids in the order they are listed, starting at 1, so
/// scheduled commands can address them by position in the file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct Scenario {
    /// Simulation constants shared by every unit.
    #[serde(default)]
    pub(crate) tuning: Tuning,
    /// Heightmap the units stand on.
    pub(crate) terrain: TerrainSpec,
    /// Blocking map features stamped before any unit spawns.
    #[serde(default)]
    pub(crate) features: Vec<DiscreteRect>,
    /// Unit types available to the scenario, keyed by name.
    pub(crate) blueprints: BTreeMap<String, UnitBlueprint>,
    /// Script environments available to the scenario, keyed by name.
    #[serde(default)]
    pub(crate) script_sets: BTreeMap<String, ScriptSet>,
    /// Units present at the start of the run.
    pub(crate) units: Vec<UnitSpec>,
    /// Player commands applied before the listed tick runs.
    #[serde(default)]
    pub(crate) commands: Vec<ScheduledCommand>,
    /// Number of ticks to simulate.
    pub(crate) ticks: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct TerrainSpec {
    pub(crate) columns: u32,
    pub(crate) rows: u32,
    pub(crate) base_height: f32,
    pub(crate) sea_level: f32,
    #[serde(default)]
    pub(crate) heights: Vec<HeightOverride>,
}

/// Height of a single heightmap vertex.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub(crate) struct HeightOverride {
    pub(crate) x: u32,
    pub(crate) z: u32,
    pub(crate) height: f32,
}

/// Scripts and model pieces a unit's script environment answers with.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct ScriptSet {
    #[serde(default)]
    pub(crate) scripts: BTreeMap<String, ScriptBehavior>,
    #[serde(default)]
    pub(crate) pieces: Vec<Vec3>,
}

impl ScriptSet {
    fn environment(&self) -> ScriptTable {
        let table = self
            .scripts
            .iter()
            .fold(ScriptTable::new(), |table, (name, behavior)| {
                table.with_script(name.clone(), behavior.clone())
            });
        self.pieces
            .iter()
            .fold(table, |table, &offset| table.with_piece(offset))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct UnitSpec {
    pub(crate) blueprint: String,
    pub(crate) owner: PlayerId,
    pub(crate) position: Vec3,
    #[serde(default)]
    pub(crate) rotation: f32,
    /// Name of the script set; units without one run no scripts.
    #[serde(default)]
    pub(crate) scripts: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct ScheduledCommand {
    pub(crate) tick: u64,
    pub(crate) command: PlayerCommand,
}

impl Scenario {
    /// Reads and parses the scenario stored at `path`.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::parse(&source).with_context(|| format!("failed to parse scenario {}", path.display()))
    }

    /// Parses a scenario from RON text.
    pub(crate) fn parse(source: &str) -> Result<Self> {
        Ok(ron::from_str(source)?)
    }

    /// Builds the terrain described by the scenario.
    pub(crate) fn terrain(&self) -> Result<GridTerrain> {
        let spec = &self.terrain;
        let mut terrain =
            GridTerrain::flat(spec.columns, spec.rows, spec.base_height, spec.sea_level);
        for vertex in &spec.heights {
            if !terrain.set_vertex_height(vertex.x, vertex.z, vertex.height) {
                return Err(anyhow!(
                    "height override ({}, {}) lies outside the terrain",
                    vertex.x,
                    vertex.z
                ));
            }
        }
        Ok(terrain)
    }

    /// Creates the starting world: terrain, features, then units in file order.
    pub(crate) fn build_world(&self) -> Result<World> {
        let mut world = World::new(self.terrain()?, self.tuning);

        for &feature in &self.features {
            world
                .place_feature(feature)
                .with_context(|| format!("failed to place feature {feature:?}"))?;
        }

        for (index, spec) in self.units.iter().enumerate() {
            let blueprint = self
                .blueprints
                .get(&spec.blueprint)
                .ok_or_else(|| anyhow!("unit {index} uses unknown blueprint {}", spec.blueprint))?;
            let scripts = match &spec.scripts {
                Some(name) => self
                    .script_sets
                    .get(name)
                    .ok_or_else(|| anyhow!("unit {index} uses unknown script set {name}"))?
                    .environment(),
                None => ScriptTable::new(),
            };
            let id: UnitId = world
                .spawn_unit(
                    blueprint,
                    spec.owner,
                    spec.position,
                    spec.rotation,
                    Box::new(scripts),
                )
                .with_context(|| format!("failed to spawn unit {index} ({})", spec.blueprint))?;
            debug!("spawned {} as unit {}", spec.blueprint, id.get());
        }

        Ok(world)
    }

    /// Groups the scheduled commands by the tick they apply to.
    pub(crate) fn schedule(&self) -> BTreeMap<u64, Vec<PlayerCommand>> {
        let mut schedule: BTreeMap<u64, Vec<PlayerCommand>> = BTreeMap::new();
        for scheduled in &self.commands {
            schedule
                .entry(scheduled.tick)
                .or_default()
                .push(scheduled.command.clone());
        }
        schedule
    }
}
