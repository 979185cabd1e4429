//! Sequence discovery over the conveyor graph.
//!
//! A sequence is a maximal non-branching run of conveyors, ordered tail
//! to head, that the engine ticks as one unit. Discovery walks the graph
//! through the feeder relation: conveyor B follows conveyor A exactly
//! when A is B's primary feeder, so a side line merging into a busier
//! lane ends its own sequence at the merge instead of splicing in.
//!
//! Tracing is claim-aware. Conveyors already assigned to a sequence stop
//! both the forward and the backward walk, which keeps the partition a
//! partition: every conveyor lands in exactly one sequence no matter
//! where discovery starts. Walks are also capped, so a single sequence
//! never exceeds [`MAX_SEQUENCE_LENGTH`] members and pathological loops
//! cannot spin the tracer forever.

use crate::fixed::Fixed32;
use crate::id::{EntityId, ItemTypeId, SequenceId};
use crate::world::World;
use beltline_spatial::Position;
use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;

/// Upper bound on conveyors per sequence.
pub const MAX_SEQUENCE_LENGTH: usize = 64;

/// Upper bound on sequence hops when probing for a circle.
pub const MAX_CIRCULARITY_DEPTH: usize = 64;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Whether a sequence feeds back into itself.
///
/// The probe follows head-to-tail links between sequences and gives up
/// after [`MAX_CIRCULARITY_DEPTH`] hops, so the answer is honest about
/// what it checked instead of mistaking a deep chain for a circle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Circularity {
    Circular,
    NotCircular,
    Inconclusive,
}

/// A settled item projected into world space for consumers outside the
/// engine, with its slot dwell expressed as a unit fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealizedItem {
    pub conveyor: EntityId,
    pub position: Position,
    pub channel: u8,
    pub slot: u8,
    pub item_type: ItemTypeId,
    pub fraction: Fixed32,
}

/// One maximal non-branching conveyor run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub id: SequenceId,
    /// Member conveyors, tail first, head last.
    pub members: Vec<EntityId>,
    pub circularity: Circularity,
    /// Rebuilt in the realize phase of every tick.
    pub realized: Vec<RealizedItem>,
}

impl Sequence {
    pub fn tail(&self) -> Option<EntityId> {
        self.members.first().copied()
    }

    pub fn head(&self) -> Option<EntityId> {
        self.members.last().copied()
    }
}

/// Conveyors already assigned to a sequence during a rebuild.
pub type ClaimSet = SecondaryMap<EntityId, ()>;

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Walk forward from `start` to the head of its run: the last conveyor
/// this flow passes before a gap, a merge it does not dominate, a claimed
/// conveyor, a closed loop, or the length cap.
pub fn trace_head(world: &World, start: EntityId, claimed: &ClaimSet) -> EntityId {
    let mut current = start;
    for _ in 0..MAX_SEQUENCE_LENGTH {
        let Some(entity) = world.get(current) else {
            return current;
        };
        let Some(next) = world.conveyor_at(entity.forward_position()) else {
            return current;
        };
        if world.primary_feeder(next) != Some(current) {
            return current;
        }
        if next == start || claimed.contains_key(next) {
            return current;
        }
        current = next;
    }
    current
}

/// Walk backward from `head` through primary feeders, collecting the full
/// membership tail to head. Stops at a missing feeder, the head itself
/// closing a loop, a claimed conveyor, or the length cap.
pub fn trace_tail(world: &World, head: EntityId, claimed: &ClaimSet) -> Vec<EntityId> {
    let mut members = vec![head];
    let mut current = head;
    while members.len() < MAX_SEQUENCE_LENGTH {
        let Some(feeder) = world.primary_feeder(current) else {
            break;
        };
        if feeder == head || claimed.contains_key(feeder) {
            break;
        }
        members.push(feeder);
        current = feeder;
    }
    members.reverse();
    members
}

// ---------------------------------------------------------------------------
// Partition build
// ---------------------------------------------------------------------------

/// Partition every conveyor into sequences and stamp each one with its
/// sequence id. Discovery order follows placement order, so rebuilds are
/// deterministic.
pub fn build_sequences(world: &mut World) -> Vec<Sequence> {
    let conveyor_ids: Vec<EntityId> = world.conveyors().collect();
    for &id in &conveyor_ids {
        if let Some(conveyor) = world.get_mut(id).and_then(|e| e.as_conveyor_mut()) {
            conveyor.sequence = None;
        }
    }

    let mut claimed: ClaimSet = SecondaryMap::new();
    let mut sequences: Vec<Sequence> = Vec::new();

    for &start in &conveyor_ids {
        // When both walks hit the length cap the trace can close without
        // reaching `start`; retrace until the start itself is claimed.
        // Every trace claims at least its head, so this terminates.
        while !claimed.contains_key(start) {
            let head = trace_head(world, start, &claimed);
            let members = trace_tail(world, head, &claimed);
            let sequence_id = SequenceId(sequences.len() as u32);

            for &member in &members {
                claimed.insert(member, ());
                if let Some(conveyor) = world.get_mut(member).and_then(|e| e.as_conveyor_mut()) {
                    conveyor.sequence = Some(sequence_id);
                }
            }
            sequences.push(Sequence {
                id: sequence_id,
                members,
                circularity: Circularity::NotCircular,
                realized: Vec::new(),
            });
        }
    }

    for index in 0..sequences.len() {
        sequences[index].circularity = circularity(world, &sequences, sequences[index].id);
    }
    sequences
}

// ---------------------------------------------------------------------------
// Circularity
// ---------------------------------------------------------------------------

/// Probe whether `start` feeds back into itself through head-to-tail
/// links. A link exists when a sequence's head pushes straight into the
/// tail conveyor of another sequence; feeding into the middle of a run
/// merges flow but does not close a circle.
pub fn circularity(world: &World, sequences: &[Sequence], start: SequenceId) -> Circularity {
    let mut current = start;
    for _ in 0..MAX_CIRCULARITY_DEPTH {
        let Some(sequence) = sequences.get(current.0 as usize) else {
            return Circularity::NotCircular;
        };
        let Some(head) = sequence.head() else {
            return Circularity::NotCircular;
        };
        let Some(head_entity) = world.get(head) else {
            return Circularity::NotCircular;
        };
        let Some(next) = world.conveyor_at(head_entity.forward_position()) else {
            return Circularity::NotCircular;
        };
        let Some(next_sequence) = world.get(next).and_then(|e| e.as_conveyor()).and_then(|c| c.sequence)
        else {
            return Circularity::NotCircular;
        };
        let Some(target) = sequences.get(next_sequence.0 as usize) else {
            return Circularity::NotCircular;
        };
        if target.tail() != Some(next) {
            return Circularity::NotCircular;
        }
        if next_sequence == start {
            return Circularity::Circular;
        }
        current = next_sequence;
    }
    Circularity::Inconclusive
}

// ---------------------------------------------------------------------------
// Realized view
// ---------------------------------------------------------------------------

/// Project a sequence's settled items into world space.
pub fn realize_view(world: &World, sequence: &Sequence) -> Vec<RealizedItem> {
    let mut view = Vec::new();
    for &member in &sequence.members {
        let Some(entity) = world.get(member) else {
            continue;
        };
        let Some(conveyor) = entity.as_conveyor() else {
            continue;
        };
        for (channel_index, channel) in conveyor.channels.iter().enumerate() {
            for (slot_index, slot) in channel.slots.iter().enumerate() {
                if let Some(item) = slot.settled {
                    view.push(RealizedItem {
                        conveyor: member,
                        position: entity.position,
                        channel: channel_index as u8,
                        slot: slot_index as u8,
                        item_type: item.item_type,
                        fraction: item.progress_fraction(),
                    });
                }
            }
        }
    }
    view
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use beltline_spatial::Direction;

    fn at(x: i32, y: i32) -> Position {
        Position::new(x, y, 0)
    }

    fn belt_row(world: &mut World, y: i32, from_x: i32, count: i32) -> Vec<EntityId> {
        (0..count)
            .map(|i| {
                world
                    .place_entity(Entity::conveyor(at(from_x + i, y), Direction::Right))
                    .unwrap()
            })
            .collect()
    }

    /// A rectangular clockwise loop with its north-west corner at (x, y).
    fn belt_loop(world: &mut World, x: i32, y: i32, width: i32, height: i32) -> Vec<EntityId> {
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

    // -----------------------------------------------------------------------
    // Test 1: A straight row forms one sequence, tail to head
    // -----------------------------------------------------------------------
    #[test]
    fn straight_row_is_one_sequence() {
        let mut world = World::new();
        let ids = belt_row(&mut world, 0, 0, 4);

        let sequences = build_sequences(&mut world);
        assert_eq!(sequences.len(), 1);
        assert_eq!(sequences[0].members, ids);
        assert_eq!(sequences[0].circularity, Circularity::NotCircular);

        for &id in &ids {
            let conveyor = world.get(id).unwrap().as_conveyor().unwrap();
            assert_eq!(conveyor.sequence, Some(sequences[0].id));
        }
    }

    // -----------------------------------------------------------------------
    // Test 2: Tracing from any interior member finds the same head
    // -----------------------------------------------------------------------
    #[test]
    fn interior_traces_agree_on_head() {
        let mut world = World::new();
        let ids = belt_row(&mut world, 0, 0, 6);
        let claimed = ClaimSet::new();

        let head = *ids.last().unwrap();
        for &id in &ids {
            assert_eq!(trace_head(&world, id, &claimed), head);
        }
        assert_eq!(trace_tail(&world, head, &claimed), ids);
    }

    // -----------------------------------------------------------------------
    // Test 3: A gap splits the row into two sequences
    // -----------------------------------------------------------------------
    #[test]
    fn gap_splits_sequences() {
        let mut world = World::new();
        let west = belt_row(&mut world, 0, 0, 3);
        let east = belt_row(&mut world, 0, 5, 3);

        let sequences = build_sequences(&mut world);
        assert_eq!(sequences.len(), 2);
        assert_eq!(sequences[0].members, west);
        assert_eq!(sequences[1].members, east);
    }

    // -----------------------------------------------------------------------
    // Test 4: A side line ends at a merge it does not dominate
    // -----------------------------------------------------------------------
    #[test]
    fn side_merge_ends_side_sequence() {
        let mut world = World::new();
        let main = belt_row(&mut world, 1, 0, 4);
        // A side feeder pointing down into the second main conveyor.
        let side = world
            .place_entity(Entity::conveyor(at(1, 0), Direction::Down))
            .unwrap();

        let sequences = build_sequences(&mut world);
        assert_eq!(sequences.len(), 2);
        assert_eq!(sequences[0].members, main);
        assert_eq!(sequences[1].members, vec![side]);

        // The merge target stays a corner-free member of the main run; its
        // rear feeder outranks the side line.
        assert_eq!(world.primary_feeder(main[1]), Some(main[0]));
    }

    // -----------------------------------------------------------------------
    // Test 5: A closed loop is one circular sequence
    // -----------------------------------------------------------------------
    #[test]
    fn closed_loop_is_circular() {
        let mut world = World::new();
        let ids = belt_loop(&mut world, 0, 0, 4, 4);

        let sequences = build_sequences(&mut world);
        assert_eq!(sequences.len(), 1);
        assert_eq!(sequences[0].members.len(), ids.len());
        assert_eq!(sequences[0].circularity, Circularity::Circular);
    }

    // -----------------------------------------------------------------------
    // Test 6: An external feeder into a loop breaks the circle
    // -----------------------------------------------------------------------
    #[test]
    fn fed_loop_is_not_circular() {
        let mut world = World::new();
        let _loop_ids = belt_loop(&mut world, 0, 0, 3, 3);
        // Feed the east-going top edge from behind its first corner.
        let _feeder = world
            .place_entity(Entity::conveyor(at(2, -1), Direction::Down))
            .unwrap();

        let sequences = build_sequences(&mut world);
        for sequence in &sequences {
            assert_eq!(sequence.circularity, Circularity::NotCircular);
        }
    }

    // -----------------------------------------------------------------------
    // Test 7: The length cap splits an oversized loop, still circular
    // -----------------------------------------------------------------------
    #[test]
    fn oversized_loop_splits_but_stays_circular() {
        let mut world = World::new();
        // Perimeter 2*(20+15) - 4 = 66 conveyors, above the length cap.
        let ids = belt_loop(&mut world, 0, 0, 20, 15);
        assert_eq!(ids.len(), 66);

        let sequences = build_sequences(&mut world);
        assert!(sequences.len() >= 2);
        let total: usize = sequences.iter().map(|s| s.members.len()).sum();
        assert_eq!(total, 66);
        for sequence in &sequences {
            assert!(sequence.members.len() <= MAX_SEQUENCE_LENGTH);
            assert_eq!(sequence.circularity, Circularity::Circular);
        }
    }

    // -----------------------------------------------------------------------
    // Test 8: Every conveyor lands in exactly one sequence
    // -----------------------------------------------------------------------
    #[test]
    fn partition_covers_every_conveyor_once() {
        let mut world = World::new();
        let _a = belt_row(&mut world, 0, 0, 5);
        let _b = belt_loop(&mut world, 10, 10, 4, 3);
        let _c = world
            .place_entity(Entity::conveyor(at(0, 5), Direction::Up))
            .unwrap();

        let sequences = build_sequences(&mut world);
        let mut seen: ClaimSet = SecondaryMap::new();
        for sequence in &sequences {
            for &member in &sequence.members {
                assert!(seen.insert(member, ()).is_none(), "conveyor in two sequences");
            }
        }
        assert_eq!(seen.len(), world.conveyors().count());
    }

    // -----------------------------------------------------------------------
    // Test 9: The realized view projects settled items with fractions
    // -----------------------------------------------------------------------
    #[test]
    fn realized_view_projects_settled_items() {
        use crate::conveyor::SLOT_TRAVERSAL_TICKS;
        use crate::item::Item;

        let mut world = World::new();
        let ids = belt_row(&mut world, 0, 0, 2);
        let sequences = build_sequences(&mut world);

        {
            let conveyor = world.get_mut(ids[0]).unwrap().as_conveyor_mut().unwrap();
            let mut item = Item::new(ItemTypeId(3), SLOT_TRAVERSAL_TICKS);
            for _ in 0..SLOT_TRAVERSAL_TICKS / 2 {
                item.age();
            }
            conveyor.channels[0].slots[0].settled = Some(item);
            // A pending item must not appear in the view.
            conveyor.channels[0].slots[0].pending = None;
        }
        {
            let conveyor = world.get_mut(ids[1]).unwrap().as_conveyor_mut().unwrap();
            conveyor.channels[0].slots[0].pending =
                Some(Item::new(ItemTypeId(4), SLOT_TRAVERSAL_TICKS));
        }

        let view = realize_view(&world, &sequences[0]);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].item_type, ItemTypeId(3));
        assert_eq!(view[0].position, at(0, 0));
        assert_eq!(view[0].channel, 0);
        assert_eq!(view[0].slot, 0);
        assert_eq!(view[0].fraction, Fixed32::from_num(0.5));
    }

    // -----------------------------------------------------------------------
    // Test 10: Deep sequence chains come back inconclusive
    // -----------------------------------------------------------------------
    #[test]
    fn very_deep_ring_is_inconclusive() {
        let mut world = World::new();
        // Perimeter 2*(1060 + 1050) - 4 = 4216 conveyors. Splitting at the
        // length cap leaves far more chained sequences than the probe depth.
        let ids = belt_loop(&mut world, -1000, -1000, 1060, 1050);
        assert_eq!(ids.len(), 4216);

        let sequences = build_sequences(&mut world);
        assert!(sequences.len() > MAX_CIRCULARITY_DEPTH);
        let total: usize = sequences.iter().map(|s| s.members.len()).sum();
        assert_eq!(total, 4216);
        for sequence in &sequences {
            assert_eq!(sequence.circularity, Circularity::Inconclusive);
        }
    }
}
