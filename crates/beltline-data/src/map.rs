//! The textual map grid format.
//!
//! One character per cell, row by row, with y growing downward:
//!
//! | Symbols           | Entity                                  |
//! |-------------------|-----------------------------------------|
//! | `>` `<` `^` `v`   | conveyor facing right/left/up/down      |
//! | `J`               | junction                                |
//! | `o` `i` `y` `u`   | underground facing right/left/up/down   |
//! | `Y` `T` `U` `I`   | inserter facing right/left/up/down      |
//! | `A` `D` `G` `F`   | extractor facing right/left/up/down     |
//! | `C`               | smelter facing right                    |
//! | `S`               | storage                                 |
//! | `L`               | launch pad (3x3)                        |
//! | `.` and space     | empty cell                              |
//!
//! Anything else produces no entity and is reported back with its
//! position, never as an error.

use beltline_core::entity::Entity;
use beltline_core::id::{EntityId, RecipeId};
use beltline_core::world::World;
use beltline_spatial::{Direction, Position};

/// What one map character stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntitySpec {
    Conveyor(Direction),
    Junction,
    Underground(Direction),
    Inserter(Direction),
    Extractor(Direction),
    Smelter(Direction),
    Storage,
    LaunchPad,
}

/// One parsed entity, before placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapEntity {
    pub position: Position,
    pub spec: EntitySpec,
}

/// The outcome of parsing a map text: the entities it describes, plus
/// every character the table does not cover.
#[derive(Debug, Clone, Default)]
pub struct MapParse {
    pub entities: Vec<MapEntity>,
    pub unrecognized: Vec<(Position, char)>,
}

/// Parse a map text into entity descriptors, row-major from (0, 0).
pub fn parse_map(text: &str) -> MapParse {
    let mut parse = MapParse::default();
    for (row, line) in text.lines().enumerate() {
        for (column, symbol) in line.chars().enumerate() {
            let position = Position::new(column as i32, row as i32, 0);
            let spec = match symbol {
                '.' | ' ' => continue,
                '>' => EntitySpec::Conveyor(Direction::Right),
                '<' => EntitySpec::Conveyor(Direction::Left),
                '^' => EntitySpec::Conveyor(Direction::Up),
                'v' => EntitySpec::Conveyor(Direction::Down),
                'J' => EntitySpec::Junction,
                'o' => EntitySpec::Underground(Direction::Right),
                'i' => EntitySpec::Underground(Direction::Left),
                'y' => EntitySpec::Underground(Direction::Up),
                'u' => EntitySpec::Underground(Direction::Down),
                'Y' => EntitySpec::Inserter(Direction::Right),
                'T' => EntitySpec::Inserter(Direction::Left),
                'U' => EntitySpec::Inserter(Direction::Up),
                'I' => EntitySpec::Inserter(Direction::Down),
                'A' => EntitySpec::Extractor(Direction::Right),
                'D' => EntitySpec::Extractor(Direction::Left),
                'G' => EntitySpec::Extractor(Direction::Up),
                'F' => EntitySpec::Extractor(Direction::Down),
                'C' => EntitySpec::Smelter(Direction::Right),
                'S' => EntitySpec::Storage,
                'L' => EntitySpec::LaunchPad,
                other => {
                    parse.unrecognized.push((position, other));
                    continue;
                }
            };
            parse.entities.push(MapEntity { position, spec });
        }
    }
    parse
}

/// Recipe bindings for the producer map characters.
#[derive(Debug, Clone, Copy)]
pub struct ProducerBindings {
    pub extractor: RecipeId,
    pub smelter: RecipeId,
}

/// Place every parsed entity into the world, in map order. Placements a
/// multi-tile footprint already blocked are skipped; the returned ids
/// cover what actually landed.
pub fn populate_world(
    world: &mut World,
    parse: &MapParse,
    bindings: ProducerBindings,
) -> Vec<EntityId> {
    let mut placed = Vec::with_capacity(parse.entities.len());
    for map_entity in &parse.entities {
        let position = map_entity.position;
        let entity = match map_entity.spec {
            EntitySpec::Conveyor(facing) => Entity::conveyor(position, facing),
            EntitySpec::Junction => Entity::junction(position),
            EntitySpec::Underground(facing) => Entity::underground(position, facing),
            EntitySpec::Inserter(facing) => Entity::inserter(position, facing),
            EntitySpec::Extractor(facing) => {
                Entity::producer(position, facing, bindings.extractor)
            }
            EntitySpec::Smelter(facing) => Entity::producer(position, facing, bindings.smelter),
            EntitySpec::Storage => Entity::storage(position),
            EntitySpec::LaunchPad => Entity::launch_pad(position),
        };
        if let Ok(id) = world.place_entity(entity) {
            placed.push(id);
        }
    }
    placed
}

// ===========================================================================
// Tests
// ===========================================================================
