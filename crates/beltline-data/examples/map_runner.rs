//! Map runner: parses a text map, populates a world, and watches traffic
//! split at a junction, one branch passing through an underground tunnel.
//!
//! Run with: `cargo run -p beltline-data --example map_runner`

use beltline_core::registry::{RecipeEntry, Registry, RegistryBuilder};
use beltline_core::sim::Sim;
use beltline_core::world::World;
use beltline_data::{parse_map, populate_world, ProducerBindings};
use beltline_spatial::Position;

/// An extractor feeding a junction. Half the ore runs straight into the
/// upper chest; the rest turns down and tunnels under a gap into the
/// lower chest.
const MAP: &str = "\
A>>J>>>>S
...v.....
...>o.o>S
";

const TICKS: u64 = 200;

fn build_registry() -> Registry {
    let mut builder = RegistryBuilder::new();
    let ore = builder.register_item("iron_ore").unwrap();
    let plate = builder.register_item("iron_plate").unwrap();
    builder
        .register_recipe(
            "mine_iron",
            vec![],
            vec![RecipeEntry {
                item: ore,
                quantity: 1,
            }],
            4,
        )
        .unwrap();
    builder
        .register_recipe(
            "smelt_iron",
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
    builder.build().unwrap()
}

fn main() {
    let registry = build_registry();
    let bindings = ProducerBindings {
        extractor: registry.recipe_id("mine_iron").unwrap(),
        smelter: registry.recipe_id("smelt_iron").unwrap(),
    };

    println!("=== Map ===\n\n{MAP}");

    let parse = parse_map(MAP);
    let mut world = World::new();
    let placed = populate_world(&mut world, &parse, bindings);
    println!("Parsed {} entities, placed {}.", parse.entities.len(), placed.len());
    for (position, symbol) in &parse.unrecognized {
        println!("  Unrecognized {symbol:?} at {position:?}");
    }

    let upper = world.entity_at(Position::new(8, 0, 0)).unwrap();
    let lower = world.entity_at(Position::new(8, 2, 0)).unwrap();

    let mut sim = Sim::with_world(world, registry);

    println!("\n=== Running ===\n");
    for _ in 0..TICKS {
        sim.tick();
        if sim.tick_count() % 50 == 0 {
            let upper_stored = sim.world().get(upper).unwrap().item_count();
            let lower_stored = sim.world().get(lower).unwrap().item_count();
            println!(
                "Tick {:>3}: belts={}, upper chest={}, lower chest={}",
                sim.tick_count(),
                sim.world().items_on_network(),
                upper_stored,
                lower_stored
            );
        }
    }

    let upper_stored = sim.world().get(upper).unwrap().item_count();
    let lower_stored = sim.world().get(lower).unwrap().item_count();
    println!(
        "\nAfter {TICKS} ticks the junction split {} deliveries {upper_stored}/{lower_stored}.",
        upper_stored + lower_stored
    );
}
