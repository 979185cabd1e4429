//! The sequence simulator: owns the world and drives the tick pipeline.
//!
//! # Architecture
//!
//! The `Sim` owns:
//! - A [`World`] (entity arena plus the spatial index)
//! - A [`Registry`] of item and recipe definitions
//! - The traced [`Sequence`] list, rebuilt whenever placement changed the
//!   conveyor topology
//! - The tick counter and the most recent [`StateHash`]
//!
//! # Three-Phase Tick
//!
//! Each `tick()` runs:
//! 1. **Sequence** -- member conveyors tail to head: settled items age, the
//!    head item hands off downstream, remaining items shift one slot
//! 2. **Standalone** -- junctions, undergrounds, producers, and inserters
//!    run in placement order
//! 3. **Realize** -- pending slot writes promote to settled, realized views
//!    rebuild, the tick counter advances, the state hash refreshes
//!
//! All intra-tick slot writes land in pending buffers and promote in the
//! realize phase, so no slot is written twice in one tick regardless of
//! processing order.

use crate::entity::{Entity, EntityKind, EntityState};
use crate::fixed::Ticks;
use crate::id::{EntityId, ItemTypeId};
use crate::item::{Item, ItemContainer};
use crate::producer::ProducerState;
use crate::registry::Registry;
use crate::sequence::{Sequence, build_sequences, realize_view};
use crate::world::World;
use beltline_spatial::Position;

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// A simple deterministic hash of simulation state for desync detection.
///
/// Uses FNV-1a (64-bit) for speed and simplicity. Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    /// Start a new hash.
    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    /// Feed bytes into the hash.
    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    /// Feed a u64 into the hash.
    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    /// Feed a u32 into the hash.
    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    /// Feed an i32 into the hash.
    pub fn write_i32(&mut self, v: i32) {
        self.write(&v.to_le_bytes());
    }

    /// Finalize and return the hash value.
    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Sim
// ---------------------------------------------------------------------------

/// The simulator. Orchestrates the world through the three-phase pipeline.
#[derive(Debug)]
pub struct Sim {
    pub(crate) world: World,
    pub(crate) registry: Registry,
    pub(crate) sequences: Vec<Sequence>,
    pub(crate) tick: Ticks,
    pub(crate) last_state_hash: u64,
}

impl Sim {
    /// Create a simulator over an empty world.
    pub fn new(registry: Registry) -> Self {
        Self::with_world(World::new(), registry)
    }

    /// Create a simulator over a pre-built world, tracing its sequences.
    pub fn with_world(world: World, registry: Registry) -> Self {
        let mut sim = Self {
            world,
            registry,
            sequences: Vec::new(),
            tick: 0,
            last_state_hash: 0,
        };
        if sim.world.take_sequences_dirty() {
            sim.sequences = build_sequences(&mut sim.world);
        }
        sim
    }

    // -----------------------------------------------------------------------
    // Access
    // -----------------------------------------------------------------------

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable world access for placement. Topology changes are picked up
    /// at the start of the next tick.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The traced sequences as of the last rebuild.
    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    pub fn tick_count(&self) -> Ticks {
        self.tick
    }

    /// The most recently computed state hash.
    pub fn state_hash(&self) -> u64 {
        self.last_state_hash
    }

    /// Push an item into whatever entity covers `position`. The write obeys
    /// the entity's insertion rules; conveyor writes stay pending until the
    /// next tick's realize phase.
    pub fn insert_item(&mut self, position: Position, item_type: ItemTypeId, lane: usize) -> bool {
        let Some(id) = self.world.entity_at(position) else {
            return false;
        };
        let registry = &self.registry;
        match self.world.get_mut(id) {
            Some(entity) => entity.try_insert(registry, item_type, lane),
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Run one discrete simulation step.
    pub fn tick(&mut self) {
        if self.world.take_sequences_dirty() {
            self.sequences = build_sequences(&mut self.world);
        }
        self.phase_sequences();
        self.phase_standalone();
        self.phase_realize();
    }

    // -----------------------------------------------------------------------
    // Phase 1: Sequences
    // -----------------------------------------------------------------------

    fn phase_sequences(&mut self) {
        // Take the list out so member processing can borrow the world
        // mutably.
        let sequences = std::mem::take(&mut self.sequences);
        for sequence in &sequences {
            self.tick_sequence(sequence);
        }
        self.sequences = sequences;
    }

    fn tick_sequence(&mut self, sequence: &Sequence) {
        for (index, &member) in sequence.members.iter().enumerate() {
            {
                let Some(conveyor) = self.world.get_mut(member).and_then(|e| e.as_conveyor_mut())
                else {
                    continue;
                };
                if !conveyor.has_work {
                    continue;
                }
                for channel in &mut conveyor.channels {
                    channel.age_items();
                }
            }

            // The next member is the hand-off target; the head instead
            // offers to whatever entity sits one cell ahead of it.
            let target = match sequence.members.get(index + 1) {
                Some(&next) => Some(next),
                None => self
                    .world
                    .get(member)
                    .map(Entity::forward_position)
                    .and_then(|ahead| self.world.entity_at(ahead)),
            };
            if let Some(target_id) = target {
                self.hand_off(member, target_id);
            }

            if let Some(conveyor) = self.world.get_mut(member).and_then(|e| e.as_conveyor_mut()) {
                for channel in &mut conveyor.channels {
                    channel.advance_items();
                }
            }
        }
    }

    /// Offer every eligible head item of `from` to `to`, lane-aligned.
    fn hand_off(&mut self, from: EntityId, to: EntityId) {
        let registry = &self.registry;
        let Some([source, target]) = self.world.get_pair_mut(from, to) else {
            return;
        };
        let Some(conveyor) = source.as_conveyor_mut() else {
            return;
        };
        for lane in 0..conveyor.channels.len() {
            let Some(item) = conveyor.channels[lane].ready_head_item() else {
                continue;
            };
            if target.try_insert(registry, item.item_type, lane) {
                conveyor.channels[lane].take_head_item();
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase 2: Standalone entities
    // -----------------------------------------------------------------------

    fn phase_standalone(&mut self) {
        let order: Vec<EntityId> = self.world.placement_order().to_vec();
        for id in order {
            let Some(entity) = self.world.get(id) else {
                continue;
            };
            match entity.kind() {
                EntityKind::Junction => self.tick_junction(id),
                EntityKind::Underground => self.tick_underground(id),
                EntityKind::Producer => self.tick_producer(id),
                EntityKind::Inserter => self.tick_inserter(id),
                EntityKind::Conveyor | EntityKind::Storage | EntityKind::LaunchPad => {}
            }
        }
    }

    /// Probe the four neighbor directions in shuffled order and push the
    /// held item into the first conveyor carrying flow away.
    fn tick_junction(&mut self, id: EntityId) {
        let (position, item_type, order) = {
            let Some(entity) = self.world.get_mut(id) else {
                return;
            };
            let position = entity.position;
            let EntityState::Junction(junction) = &mut entity.state else {
                return;
            };
            let Some(item_type) = junction.item else {
                return;
            };
            (position, item_type, junction.next_probe_order())
        };

        for direction in order {
            let Some(target_id) = self.world.conveyor_outflow(position, direction) else {
                continue;
            };
            let Some([source, target]) = self.world.get_pair_mut(id, target_id) else {
                continue;
            };
            let (EntityState::Junction(junction), Some(conveyor)) =
                (&mut source.state, target.as_conveyor_mut())
            else {
                continue;
            };
            if conveyor.accept_any(item_type) {
                junction.take();
                break;
            }
        }
    }

    /// Age the transit item and surface it one cell past the exit once its
    /// travel time has elapsed.
    fn tick_underground(&mut self, id: EntityId) {
        let arrival = {
            let Some(entity) = self.world.get_mut(id) else {
                return;
            };
            let facing = entity.facing;
            let EntityState::Underground(tunnel) = &mut entity.state else {
                return;
            };
            tunnel.age();
            tunnel
                .arrived()
                .map(|transit| (transit.item.item_type, transit.exit.step(facing)))
        };
        let Some((item_type, surface)) = arrival else {
            return;
        };
        let Some(target_id) = self.world.entity_at(surface) else {
            return;
        };

        let registry = &self.registry;
        let Some([source, target]) = self.world.get_pair_mut(id, target_id) else {
            return;
        };
        let EntityState::Underground(tunnel) = &mut source.state else {
            return;
        };
        if target.try_insert(registry, item_type, 0) {
            tunnel.take();
        }
    }

    /// Run the crafting state machine, then dispense one finished item into
    /// the entity ahead.
    fn tick_producer(&mut self, id: EntityId) {
        let ahead = {
            let registry = &self.registry;
            let Some(entity) = self.world.get_mut(id) else {
                return;
            };
            let ahead = entity.forward_position();
            let EntityState::Producer(producer) = &mut entity.state else {
                return;
            };
            producer.tick(registry);
            ahead
        };

        let Some(target_id) = self.world.entity_at(ahead) else {
            return;
        };
        let registry = &self.registry;
        let Some([source, target]) = self.world.get_pair_mut(id, target_id) else {
            return;
        };
        let EntityState::Producer(producer) = &mut source.state else {
            return;
        };
        let Some(item_type) = producer.peek_output() else {
            return;
        };
        if target.try_insert(registry, item_type, 0) {
            producer.consume_output(item_type);
        }
    }

    /// Pull from the entity behind when the arm is free, then offer the
    /// held item to the entity ahead.
    fn tick_inserter(&mut self, id: EntityId) {
        let (behind, ahead) = {
            let Some(entity) = self.world.get(id) else {
                return;
            };
            (entity.behind_position(), entity.forward_position())
        };

        {
            let Some(entity) = self.world.get_mut(id) else {
                return;
            };
            let EntityState::Inserter(inserter) = &mut entity.state else {
                return;
            };
            inserter.tick_cooldown();
        }

        let can_pick = matches!(
            self.world.get(id).map(|e| &e.state),
            Some(EntityState::Inserter(inserter)) if inserter.can_pick_up()
        );
        if can_pick
            && let Some(source_id) = self.world.entity_at(behind)
            && let Some([arm, source]) = self.world.get_pair_mut(id, source_id)
            && let EntityState::Inserter(inserter) = &mut arm.state
            && let Some(item_type) = source.try_extract()
        {
            inserter.pick_up(item_type);
        }

        let held = match self.world.get(id).map(|e| &e.state) {
            Some(EntityState::Inserter(inserter)) => inserter.held,
            _ => None,
        };
        let Some(item_type) = held else {
            return;
        };
        let Some(target_id) = self.world.entity_at(ahead) else {
            return;
        };
        let registry = &self.registry;
        let Some([arm, target]) = self.world.get_pair_mut(id, target_id) else {
            return;
        };
        let EntityState::Inserter(inserter) = &mut arm.state else {
            return;
        };
        if target.try_insert(registry, item_type, 0) {
            inserter.deliver();
        }
    }

    // -----------------------------------------------------------------------
    // Phase 3: Realize
    // -----------------------------------------------------------------------

    fn phase_realize(&mut self) {
        let conveyors: Vec<EntityId> = self.world.conveyors().collect();
        for id in conveyors {
            if let Some(conveyor) = self.world.get_mut(id).and_then(|e| e.as_conveyor_mut()) {
                conveyor.realize();
            }
        }

        let mut sequences = std::mem::take(&mut self.sequences);
        for sequence in &mut sequences {
            sequence.realized = realize_view(&self.world, sequence);
        }
        self.sequences = sequences;

        self.tick += 1;
        self.last_state_hash = self.compute_state_hash();
    }

    /// Compute a deterministic hash of the current simulation state.
    fn compute_state_hash(&self) -> u64 {
        let mut hasher = StateHash::new();
        hasher.write_u64(self.tick);
        hasher.write_u64(self.world.crushed_items());

        // Placement order is stable, so iteration is deterministic.
        for &id in self.world.placement_order() {
            let Some(entity) = self.world.get(id) else {
                continue;
            };
            hasher.write_u32(entity.kind() as u32);
            hasher.write_i32(entity.position.x);
            hasher.write_i32(entity.position.y);
            hasher.write_i32(entity.position.depth);

            match &entity.state {
                EntityState::Conveyor(conveyor) => {
                    for channel in &conveyor.channels {
                        for slot in &channel.slots {
                            hash_slot(&mut hasher, slot.settled);
                            hash_slot(&mut hasher, slot.pending);
                        }
                    }
                }
                EntityState::Junction(junction) => {
                    hash_item_type(&mut hasher, junction.item);
                    hasher.write_u64(junction.attempt_counter);
                }
                EntityState::Underground(tunnel) => match tunnel.in_transit {
                    Some(transit) => {
                        hasher.write_u32(1);
                        hasher.write_u32(transit.item.item_type.0);
                        hasher.write_u64(transit.item.progress_tick);
                        hasher.write_u64(transit.item.target_tick);
                        hasher.write_i32(transit.exit.x);
                        hasher.write_i32(transit.exit.y);
                        hasher.write_i32(transit.exit.depth);
                    }
                    None => hasher.write_u32(0),
                },
                EntityState::Producer(producer) => {
                    hash_container(&mut hasher, &producer.input);
                    hash_container(&mut hasher, &producer.output);
                    match &producer.state {
                        ProducerState::Idle => hasher.write_u32(0),
                        ProducerState::Working { progress } => {
                            hasher.write_u32(1);
                            hasher.write_u64(*progress);
                        }
                        ProducerState::Stalled { reason } => {
                            hasher.write_u32(2);
                            hasher.write_u32(*reason as u32);
                        }
                    }
                }
                EntityState::Storage(storage) => {
                    hash_container(&mut hasher, &storage.container);
                }
                EntityState::LaunchPad(pad) => {
                    for &(item_type, count) in &pad.launched {
                        hasher.write_u32(item_type.0);
                        hasher.write_u64(count);
                    }
                }
                EntityState::Inserter(inserter) => {
                    hash_item_type(&mut hasher, inserter.held);
                    hasher.write_u64(inserter.cooldown);
                }
            }
        }

        hasher.finish()
    }
}

// ---------------------------------------------------------------------------
// Hash helpers (free functions, not public API)
// ---------------------------------------------------------------------------

fn hash_slot(hasher: &mut StateHash, item: Option<Item>) {
    match item {
        Some(item) => {
            hasher.write_u32(1);
            hasher.write_u32(item.item_type.0);
            hasher.write_u64(item.progress_tick);
            hasher.write_u64(item.target_tick);
        }
        None => hasher.write_u32(0),
    }
}

fn hash_item_type(hasher: &mut StateHash, item: Option<ItemTypeId>) {
    match item {
        Some(item_type) => {
            hasher.write_u32(1);
            hasher.write_u32(item_type.0);
        }
        None => hasher.write_u32(0),
    }
}

fn hash_container(hasher: &mut StateHash, container: &ItemContainer) {
    for stack in &container.stacks {
        hasher.write_u32(stack.item_type.0);
        hasher.write_u32(stack.quantity);
    }
}

// ===========================================================================
// Tests
// ===========================================================================
