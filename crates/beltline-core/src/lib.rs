//! Beltline Core -- the simulation engine for conveyor transport networks.
//!
//! This crate provides the entity world, conveyor sequence tracing, the
//! per-tick simulator, transport behaviors, versioned snapshots, and
//! deterministic fixed-point arithmetic that every Beltline frontend
//! depends on.
//!
//! # Three-Phase Tick Pipeline
//!
//! Each call to [`sim::Sim::tick`] advances the simulation by one tick
//! through the following phases:
//!
//! 1. **Sequence** -- Traced conveyor runs move their items tail to head:
//!    settled items age, head items hand off downstream, the rest shift.
//! 2. **Standalone** -- Junctions, undergrounds, producers, and inserters
//!    run in placement order.
//! 3. **Realize** -- Pending slot writes promote to settled, realized item
//!    views rebuild, and the state hash refreshes.
//!
//! # Sequence Tracing Pattern
//!
//! Conveyor placement marks the world dirty; the next tick retraces before
//! the phases run, so topology edits never invalidate a tick in flight:
//!
//! ```rust,ignore
//! sim.world_mut().place_entity(Entity::conveyor(position, Direction::Right))?;
//! sim.tick(); // sequences are rebuilt here, then items move
//! ```
//!
//! # Key Types
//!
//! - [`sim::Sim`] -- Main simulator and tick pipeline orchestrator.
//! - [`world::World`] -- Entity arena plus the floor-stacked spatial grid.
//! - [`sequence::Sequence`] -- A maximal tail-to-head run of linked
//!   conveyors, with circularity classification and realized item views.
//! - [`conveyor::Conveyor`] -- The slotted, two-channel transport surface.
//! - [`fixed::Fixed32`] -- Q16.16 fixed-point type for deterministic
//!   interpolation fractions.
//! - [`registry::Registry`] -- Immutable registry of item types and recipes
//!   (frozen at startup).
//! - [`snapshot`] -- Versioned serialization and snapshot support via
//!   bitcode.

pub mod conveyor;
pub mod entity;
pub mod fixed;
pub mod id;
pub mod inserter;
pub mod item;
pub mod junction;
pub mod producer;
pub mod registry;
pub mod rng;
pub mod sequence;
pub mod sim;
pub mod snapshot;
pub mod storage;
pub mod underground;
pub mod world;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
