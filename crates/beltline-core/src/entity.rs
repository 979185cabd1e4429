//! Entities and kind dispatch.
//!
//! Every placed thing on the grid is an [`Entity`]: a position, a facing,
//! a footprint, and one variant of kind-specific state. The kind set is
//! closed and dispatch is a plain `match`, so adding a capability means
//! the compiler walks every kind for you. Two capabilities cross kind
//! boundaries:
//!
//! - insertion: can an item be pushed into this entity, and doing so;
//! - extraction: can an item be pulled back out by an inserter.
//!
//! Everything else about a kind stays in its own module; the engine layer
//! matches on [`EntityState`] directly when it needs more than the shared
//! capabilities.

use crate::conveyor::Conveyor;
use crate::id::{ItemTypeId, RecipeId};
use crate::inserter::Inserter;
use crate::junction::Junction;
use crate::producer::Producer;
use crate::registry::Registry;
use crate::storage::{LaunchPad, Storage};
use crate::underground::Underground;
use beltline_spatial::{Direction, Footprint, Position};
use serde::{Deserialize, Serialize};

/// Tiles on a side of a launch pad.
pub const LAUNCH_PAD_SIDE: u32 = 3;

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

/// Flat discriminant for queries and counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Conveyor,
    Junction,
    Underground,
    Producer,
    Storage,
    LaunchPad,
    Inserter,
}

/// Kind-specific state. Variants match [`EntityKind`] one-to-one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityState {
    Conveyor(Conveyor),
    Junction(Junction),
    Underground(Underground),
    Producer(Producer),
    Storage(Storage),
    LaunchPad(LaunchPad),
    Inserter(Inserter),
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Anchor cell. Multi-tile footprints extend toward +x and +y.
    pub position: Position,
    pub facing: Direction,
    pub footprint: Footprint,
    pub state: EntityState,
}

impl Entity {
    pub fn new(position: Position, facing: Direction, state: EntityState) -> Self {
        let footprint = match &state {
            EntityState::LaunchPad(_) => Footprint::new(LAUNCH_PAD_SIDE, LAUNCH_PAD_SIDE, 1),
            _ => Footprint::single(),
        };
        Self {
            position,
            facing,
            footprint,
            state,
        }
    }

    pub fn conveyor(position: Position, facing: Direction) -> Self {
        Self::new(position, facing, EntityState::Conveyor(Conveyor::straight()))
    }

    pub fn junction(position: Position) -> Self {
        Self::new(position, Direction::Up, EntityState::Junction(Junction::new()))
    }

    pub fn underground(position: Position, facing: Direction) -> Self {
        Self::new(position, facing, EntityState::Underground(Underground::new()))
    }

    pub fn producer(position: Position, facing: Direction, recipe: RecipeId) -> Self {
        Self::new(position, facing, EntityState::Producer(Producer::new(recipe)))
    }

    pub fn storage(position: Position) -> Self {
        Self::new(position, Direction::Up, EntityState::Storage(Storage::new()))
    }

    pub fn launch_pad(position: Position) -> Self {
        Self::new(position, Direction::Up, EntityState::LaunchPad(LaunchPad::new()))
    }

    pub fn inserter(position: Position, facing: Direction) -> Self {
        Self::new(position, facing, EntityState::Inserter(Inserter::new()))
    }

    pub fn kind(&self) -> EntityKind {
        match &self.state {
            EntityState::Conveyor(_) => EntityKind::Conveyor,
            EntityState::Junction(_) => EntityKind::Junction,
            EntityState::Underground(_) => EntityKind::Underground,
            EntityState::Producer(_) => EntityKind::Producer,
            EntityState::Storage(_) => EntityKind::Storage,
            EntityState::LaunchPad(_) => EntityKind::LaunchPad,
            EntityState::Inserter(_) => EntityKind::Inserter,
        }
    }

    /// The cell one step along the facing.
    pub fn forward_position(&self) -> Position {
        self.position.step(self.facing)
    }

    /// The cell one step against the facing.
    pub fn behind_position(&self) -> Position {
        self.position.step(self.facing.opposite())
    }

    // -----------------------------------------------------------------------
    // Capabilities
    // -----------------------------------------------------------------------

    /// Whether pushed items can ever land here. Inserters only pull.
    pub fn supports_insertion(&self) -> bool {
        !matches!(self.state, EntityState::Inserter(_))
    }

    /// Push one item in. The lane hint picks a conveyor channel; other
    /// kinds ignore it. A refusal leaves the entity untouched.
    pub fn try_insert(&mut self, registry: &Registry, item_type: ItemTypeId, lane: usize) -> bool {
        match &mut self.state {
            EntityState::Conveyor(conveyor) => conveyor.accept(item_type, lane),
            EntityState::Junction(junction) => junction.accept(item_type),
            EntityState::Underground(tunnel) => tunnel.accept(item_type),
            EntityState::Producer(producer) => producer.accept_input(registry, item_type),
            EntityState::Storage(storage) => storage.accept(item_type),
            EntityState::LaunchPad(pad) => {
                pad.accept(item_type);
                true
            }
            EntityState::Inserter(_) => false,
        }
    }

    /// Pull one item out, the way an inserter reaches into the entity
    /// behind it.
    pub fn try_extract(&mut self) -> Option<ItemTypeId> {
        match &mut self.state {
            EntityState::Conveyor(conveyor) => conveyor.take_any_head_item(),
            EntityState::Storage(storage) => storage.take_any(),
            EntityState::Producer(producer) => producer.take_output(),
            EntityState::Junction(_)
            | EntityState::Underground(_)
            | EntityState::LaunchPad(_)
            | EntityState::Inserter(_) => None,
        }
    }

    /// Items riding on or buffered in this entity. Launched items have
    /// left the network and no longer count.
    pub fn item_count(&self) -> u32 {
        match &self.state {
            EntityState::Conveyor(conveyor) => conveyor.item_count(),
            EntityState::Junction(junction) => junction.item.is_some() as u32,
            EntityState::Underground(tunnel) => tunnel.item_count(),
            EntityState::Producer(producer) => producer.item_count(),
            EntityState::Storage(storage) => storage.item_count(),
            EntityState::LaunchPad(_) => 0,
            EntityState::Inserter(inserter) => inserter.item_count(),
        }
    }

    // -----------------------------------------------------------------------
    // Typed accessors
    // -----------------------------------------------------------------------

    pub fn as_conveyor(&self) -> Option<&Conveyor> {
        match &self.state {
            EntityState::Conveyor(conveyor) => Some(conveyor),
            _ => None,
        }
    }

    pub fn as_conveyor_mut(&mut self) -> Option<&mut Conveyor> {
        match &mut self.state {
            EntityState::Conveyor(conveyor) => Some(conveyor),
            _ => None,
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
