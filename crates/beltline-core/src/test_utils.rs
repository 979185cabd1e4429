//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::entity::Entity;
use crate::id::{EntityId, ItemTypeId, RecipeId};
use crate::registry::{RecipeEntry, Registry, RegistryBuilder};
use crate::sim::Sim;
use crate::world::World;
use beltline_spatial::{Direction, Position};

// ===========================================================================
// Position helper
// ===========================================================================

/// Ground-floor position shorthand.
pub fn at(x: i32, y: i32) -> Position {
    Position::new(x, y, 0)
}

// ===========================================================================
// Item and recipe constructors
// ===========================================================================

// Ids match the registration order in `standard_registry`.

pub fn ore() -> ItemTypeId {
    ItemTypeId(0)
}
pub fn plate() -> ItemTypeId {
    ItemTypeId(1)
}
pub fn gear() -> ItemTypeId {
    ItemTypeId(2)
}
pub fn circuit() -> ItemTypeId {
    ItemTypeId(3)
}

pub fn extract_ore() -> RecipeId {
    RecipeId(0)
}
pub fn smelt_plate() -> RecipeId {
    RecipeId(1)
}
pub fn assemble_gear() -> RecipeId {
    RecipeId(2)
}

/// A registry with the standard test items and recipes.
pub fn standard_registry() -> Registry {
    let mut builder = RegistryBuilder::new();
    let ore = builder.register_item("ore").unwrap();
    let plate = builder.register_item("plate").unwrap();
    let gear = builder.register_item("gear").unwrap();
    builder.register_item("circuit").unwrap();

    builder
        .register_recipe(
            "extract-ore",
            Vec::new(),
            vec![RecipeEntry {
                item: ore,
                quantity: 1,
            }],
            4,
        )
        .unwrap();
    builder
        .register_recipe(
            "smelt-plate",
            vec![RecipeEntry {
                item: ore,
                quantity: 1,
            }],
            vec![RecipeEntry {
                item: plate,
                quantity: 1,
            }],
            6,
        )
        .unwrap();
    builder
        .register_recipe(
            "assemble-gear",
            vec![RecipeEntry {
                item: plate,
                quantity: 2,
            }],
            vec![RecipeEntry {
                item: gear,
                quantity: 1,
            }],
            8,
        )
        .unwrap();

    builder.build().unwrap()
}

// ===========================================================================
// Belt builders
// ===========================================================================

/// Place `count` conveyors in a row from `start`, all facing `direction`.
/// Returns ids in placement order (tail first).
pub fn belt_row(
    world: &mut World,
    start: Position,
    direction: Direction,
    count: i32,
) -> Vec<EntityId> {
    (0..count)
        .map(|i| {
            world
                .place_entity(Entity::conveyor(start.step_by(direction, i), direction))
                .unwrap()
        })
        .collect()
}

/// Place a rectangular clockwise loop with its north-west corner at (x, y).
pub fn belt_loop(world: &mut World, x: i32, y: i32, width: i32, height: i32) -> Vec<EntityId> {
    let mut ids = Vec::new();
    for i in 0..width - 1 {
        ids.push(
            world
                .place_entity(Entity::conveyor(at(x + i, y), Direction::Right))
                .unwrap(),
        );
    }
    for i in 0..height - 1 {
        ids.push(
            world
                .place_entity(Entity::conveyor(at(x + width - 1, y + i), Direction::Down))
                .unwrap(),
        );
    }
    for i in 0..width - 1 {
        ids.push(
            world
                .place_entity(Entity::conveyor(
                    at(x + width - 1 - i, y + height - 1),
                    Direction::Left,
                ))
                .unwrap(),
        );
    }
    for i in 0..height - 1 {
        ids.push(
            world
                .place_entity(Entity::conveyor(at(x, y + height - 1 - i), Direction::Up))
                .unwrap(),
        );
    }
    ids
}

// ===========================================================================
// Query helpers
// ===========================================================================

/// Items held by a single entity, zero if the id is stale.
pub fn stored_total(sim: &Sim, id: EntityId) -> u32 {
    sim.world().get(id).map(|e| e.item_count()).unwrap_or(0)
}

// ===========================================================================
// World builders (for benchmarks, stress tests, and proptests)
// ===========================================================================

/// Build `rows` parallel belt lines of the given length, each with one item
/// on its tail and a storage chest at its head.
pub fn build_belt_grid(rows: i32, length: i32) -> Sim {
    let mut sim = Sim::new(standard_registry());
    for row in 0..rows {
        belt_row(sim.world_mut(), at(0, row * 2), Direction::Right, length);
        sim.world_mut()
            .place_entity(Entity::storage(at(length, row * 2)))
            .unwrap();
        assert!(sim.insert_item(at(0, row * 2), ore(), 0));
    }
    sim
}

/// Build a closed square loop of the given side with items seeded along
/// the top edge.
pub fn build_ring_world(side: i32) -> Sim {
    let mut sim = Sim::new(standard_registry());
    belt_loop(sim.world_mut(), 0, 0, side, side);
    for i in 0..side - 1 {
        assert!(sim.insert_item(at(i, 0), ore(), 0));
    }
    sim
}

/// Build a full production line: extractor, belts, smelter feed via
/// inserter, and a storage chest for the output.
pub fn build_production_line(belt_length: i32) -> Sim {
    let mut sim = Sim::new(standard_registry());
    sim.world_mut()
        .place_entity(Entity::producer(at(0, 0), Direction::Right, extract_ore()))
        .unwrap();
    belt_row(sim.world_mut(), at(1, 0), Direction::Right, belt_length);
    sim.world_mut()
        .place_entity(Entity::inserter(at(1 + belt_length, 0), Direction::Right))
        .unwrap();
    sim.world_mut()
        .place_entity(Entity::producer(
            at(2 + belt_length, 0),
            Direction::Right,
            smelt_plate(),
        ))
        .unwrap();
    sim.world_mut()
        .place_entity(Entity::storage(at(3 + belt_length, 0)))
        .unwrap();
    sim
}
