//! The world: entity arena plus the spatial index.
//!
//! Entities live in a slotmap arena and are located through the cell
//! grid, one claimed tile per footprint cell. Placement is atomic: either
//! every tile is claimed and the entity exists, or nothing changed.
//!
//! Placement is also where derived structure is kept current:
//!
//! - a new conveyor re-assesses its own corner state and that of the
//!   conveyor it feeds, since feeder priority may have shifted;
//! - a new underground resolves its exit link and re-points the nearest
//!   same-facing underground behind it when the new one is closer;
//! - any conveyor placement marks the sequence partition dirty so the
//!   engine rebuilds it before the next tick.

use crate::entity::{Entity, EntityKind, EntityState};
use crate::id::EntityId;
use crate::underground::{ExitLink, Underground, UNDERGROUND_RANGE};
use beltline_spatial::{CellGrid, Direction, Position, RelativeDirection, SpatialError};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

/// Errors from entity placement.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PlacementError {
    #[error("cell {0:?} is outside the world")]
    OutOfBounds(Position),
    #[error("cell {0:?} is already occupied")]
    Occupied(Position),
}

impl PlacementError {
    fn from_spatial(err: SpatialError, position: Position) -> Self {
        match err {
            SpatialError::OutOfBounds => PlacementError::OutOfBounds(position),
            SpatialError::Occupied => PlacementError::Occupied(position),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct World {
    entities: SlotMap<EntityId, Entity>,
    grid: CellGrid<EntityId>,
    /// Entity ids in the order they were placed. Drives the standalone
    /// tick phase and sequence discovery, so iteration is deterministic.
    placement_order: Vec<EntityId>,
    sequences_dirty: bool,
    /// Items that fell off a conveyor when a corner re-assessment shrank
    /// its slot count. Kept so item accounting still balances.
    crushed_items: u64,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Placement
    // -----------------------------------------------------------------------

    /// Place an entity, claiming every tile of its footprint. On failure
    /// the world is left exactly as it was.
    pub fn place_entity(&mut self, entity: Entity) -> Result<EntityId, PlacementError> {
        let anchor = entity.position;
        let footprint = entity.footprint;
        let id = self.entities.insert(entity);

        let mut claimed: Vec<Position> = Vec::new();
        for tile in footprint.tiles(anchor) {
            match self.grid.claim(tile, id) {
                Ok(()) => claimed.push(tile),
                Err(err) => {
                    for done in claimed {
                        self.grid.release(done);
                    }
                    self.entities.remove(id);
                    return Err(PlacementError::from_spatial(err, tile));
                }
            }
        }

        self.placement_order.push(id);
        self.after_place(id);
        Ok(id)
    }

    fn after_place(&mut self, id: EntityId) {
        let Some(entity) = self.entities.get(id) else {
            return;
        };
        let position = entity.position;
        let facing = entity.facing;
        match entity.kind() {
            EntityKind::Conveyor => {
                self.sequences_dirty = true;
                self.assess_conveyor(id);
                if let Some(ahead) = self.conveyor_at(position.step(facing)) {
                    self.assess_conveyor(ahead);
                }
            }
            EntityKind::Underground => self.pair_underground(id),
            _ => {}
        }
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    pub fn entity_at(&self, position: Position) -> Option<EntityId> {
        self.grid.get(position)
    }

    /// The conveyor occupying `position`, if any.
    pub fn conveyor_at(&self, position: Position) -> Option<EntityId> {
        let id = self.grid.get(position)?;
        (self.entities.get(id)?.kind() == EntityKind::Conveyor).then_some(id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    /// Mutable access to two distinct entities at once.
    pub fn get_pair_mut(&mut self, a: EntityId, b: EntityId) -> Option<[&mut Entity; 2]> {
        self.entities.get_disjoint_mut([a, b])
    }

    pub fn placement_order(&self) -> &[EntityId] {
        &self.placement_order
    }

    /// Conveyor ids in placement order.
    pub fn conveyors(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.placement_order
            .iter()
            .copied()
            .filter(|&id| self.entities.get(id).map(Entity::kind) == Some(EntityKind::Conveyor))
    }

    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities.iter()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Items riding the network right now, across every entity.
    pub fn items_on_network(&self) -> u64 {
        self.entities
            .values()
            .map(|entity| u64::from(entity.item_count()))
            .sum()
    }

    pub fn crushed_items(&self) -> u64 {
        self.crushed_items
    }

    /// Read and clear the rebuild flag.
    pub fn take_sequences_dirty(&mut self) -> bool {
        std::mem::take(&mut self.sequences_dirty)
    }

    // -----------------------------------------------------------------------
    // Conveyor adjacency
    // -----------------------------------------------------------------------

    /// The conveyor that feeds the conveyor at `position`, by priority:
    /// behind first, then the right side, then the left. A conveyor feeds
    /// this one when its forward cell is `position`. Head-on conveyors
    /// (facing each other) never count.
    pub fn primary_feeder_at(&self, position: Position, facing: Direction) -> Option<EntityId> {
        const PRIORITY: [RelativeDirection; 3] = [
            RelativeDirection::Backward,
            RelativeDirection::RightOf,
            RelativeDirection::LeftOf,
        ];
        for rel in PRIORITY {
            let side = position.step(facing.relative(rel));
            if let Some(id) = self.conveyor_at(side) {
                let feeder = &self.entities[id];
                if feeder.forward_position() == position {
                    return Some(id);
                }
            }
        }
        None
    }

    /// The primary feeder of conveyor `id`.
    pub fn primary_feeder(&self, id: EntityId) -> Option<EntityId> {
        let entity = self.entities.get(id)?;
        self.primary_feeder_at(entity.position, entity.facing)
    }

    /// The conveyor one cell along `direction` from `from` that carries
    /// flow further away, i.e. faces `direction` itself. This is what a
    /// junction probes when it dispatches.
    pub fn conveyor_outflow(&self, from: Position, direction: Direction) -> Option<EntityId> {
        let id = self.conveyor_at(from.step(direction))?;
        (self.entities[id].facing == direction).then_some(id)
    }

    // -----------------------------------------------------------------------
    // Corner assessment
    // -----------------------------------------------------------------------

    /// Recompute a conveyor's corner state from its primary feeder. A side
    /// feeder turns the conveyor into a corner whose inner channel hugs
    /// the feeder's side of the turn; a rear feeder (or none) keeps it
    /// straight. Items on board are re-seated; any that no longer fit are
    /// counted as crushed.
    fn assess_conveyor(&mut self, id: EntityId) {
        let Some(entity) = self.entities.get(id) else {
            return;
        };
        if entity.kind() != EntityKind::Conveyor {
            return;
        }
        let position = entity.position;
        let facing = entity.facing;

        let (corner, inner_channel) = match self.primary_feeder_at(position, facing) {
            None => (false, 0),
            Some(feeder_id) => {
                let feeder_position = self.entities[feeder_id].position;
                if feeder_position == position.step(facing.relative(RelativeDirection::RightOf)) {
                    (true, 1)
                } else if feeder_position
                    == position.step(facing.relative(RelativeDirection::LeftOf))
                {
                    (true, 0)
                } else {
                    (false, 0)
                }
            }
        };

        if let Some(conveyor) = self.entities.get_mut(id).and_then(Entity::as_conveyor_mut) {
            let overflow = conveyor.reshape(corner, inner_channel);
            self.crushed_items += overflow.len() as u64;
        }
    }

    // -----------------------------------------------------------------------
    // Underground pairing
    // -----------------------------------------------------------------------

    /// Resolve the exit link for a fresh underground and re-point the
    /// nearest same-facing underground behind it when this one is closer.
    /// The scan passes over unrelated entities; tunnels run beneath them.
    fn pair_underground(&mut self, id: EntityId) {
        let Some(entity) = self.entities.get(id) else {
            return;
        };
        let position = entity.position;
        let facing = entity.facing;

        let exit = self.find_counterpart(position, facing, facing);
        if let Some(tunnel) = self.underground_mut(id) {
            tunnel.exit = exit.map(|(cell, distance)| ExitLink { cell, distance });
        }

        if let Some((cell, distance)) = self.find_counterpart(position, facing.opposite(), facing) {
            let link = ExitLink {
                cell: position,
                distance,
            };
            if let Some(behind) = self.entity_at(cell).and_then(|b| self.underground_mut(b)) {
                if behind.exit.is_none_or(|e| e.distance > distance) {
                    behind.exit = Some(link);
                }
            }
        }
    }

    /// The nearest underground within range along `scan`, facing `facing`.
    fn find_counterpart(
        &self,
        from: Position,
        scan: Direction,
        facing: Direction,
    ) -> Option<(Position, u32)> {
        for distance in 1..=UNDERGROUND_RANGE {
            let cell = from.step_by(scan, distance as i32);
            if let Some(other) = self.entity_at(cell) {
                let entity = &self.entities[other];
                if entity.kind() == EntityKind::Underground && entity.facing == facing {
                    return Some((cell, distance));
                }
            }
        }
        None
    }

    fn underground_mut(&mut self, id: EntityId) -> Option<&mut Underground> {
        match &mut self.entities.get_mut(id)?.state {
            EntityState::Underground(tunnel) => Some(tunnel),
            _ => None,
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
