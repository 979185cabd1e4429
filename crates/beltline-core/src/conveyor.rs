//! Conveyor slot and channel mechanics.
//!
//! A conveyor carries items through ordered slots grouped into channels.
//! Straight conveyors have a single one-slot channel; corners run two
//! channels of differing length, the inner one exactly one slot shorter
//! than the outer, so items keep a constant visual rate around the turn.
//!
//! Every write that happens while a tick is in flight lands in a slot's
//! pending buffer; the realize phase at the end of the tick promotes
//! pending items to settled. That double buffer is what makes the tick
//! atomic: no slot can be filled twice no matter which order conveyors,
//! junctions, and external inserters run in.

use crate::fixed::Ticks;
use crate::id::{ItemTypeId, SequenceId};
use crate::item::Item;
use serde::{Deserialize, Serialize};

/// Ticks an item dwells in one slot before it may advance.
pub const SLOT_TRAVERSAL_TICKS: Ticks = 10;

/// Slots in a corner's outer channel. The inner channel has one fewer.
pub const CORNER_OUTER_SLOTS: usize = 2;

// ---------------------------------------------------------------------------
// Slot
// ---------------------------------------------------------------------------

/// One fixed position in a channel: a settled item plus a pending write
/// buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub settled: Option<Item>,
    pub pending: Option<Item>,
}

impl Slot {
    /// Whether both buffers are empty; only then may a writer claim the
    /// slot.
    pub fn is_free(&self) -> bool {
        self.settled.is_none() && self.pending.is_none()
    }

    /// Promote the pending item to settled.
    pub fn realize(&mut self) {
        debug_assert!(self.settled.is_none() || self.pending.is_none());
        if self.settled.is_none() {
            self.settled = self.pending.take();
        }
    }

    /// Items in this slot, counting both buffers.
    pub fn item_count(&self) -> u32 {
        self.settled.is_some() as u32 + self.pending.is_some() as u32
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// An ordered run of slots from tail (index 0) to head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub slots: Vec<Slot>,
}

impl Channel {
    pub fn new(len: usize) -> Self {
        Self {
            slots: vec![Slot::default(); len],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn head_index(&self) -> usize {
        self.slots.len() - 1
    }

    /// The head item when it is settled and has dwelled long enough.
    pub fn ready_head_item(&self) -> Option<Item> {
        self.slots[self.head_index()]
            .settled
            .filter(|item| item.is_eligible())
    }

    /// Remove the settled head item.
    pub fn take_head_item(&mut self) -> Option<Item> {
        let head = self.head_index();
        self.slots[head].settled.take()
    }

    /// Advance settled item dwell counters by one tick.
    pub fn age_items(&mut self) {
        for slot in &mut self.slots {
            if let Some(item) = &mut slot.settled {
                item.age();
            }
        }
    }

    /// Shift eligible items one slot toward the head, tail to head. Moves
    /// land in the destination's pending buffer, so a moved item cannot be
    /// moved again this tick and two items can never meet in one slot. A
    /// slot vacated earlier in the pass (including the head, after a
    /// hand-off) is immediately reusable, so packed runs advance together.
    pub fn advance_items(&mut self) {
        for i in 0..self.head_index() {
            if !self.slots[i + 1].is_free() {
                continue;
            }
            let eligible = self.slots[i]
                .settled
                .as_ref()
                .is_some_and(|item| item.is_eligible());
            if !eligible {
                continue;
            }
            if let Some(mut item) = self.slots[i].settled.take() {
                item.restart(SLOT_TRAVERSAL_TICKS);
                self.slots[i + 1].pending = Some(item);
            }
        }
    }

    /// Promote pending items in every slot.
    pub fn realize(&mut self) {
        for slot in &mut self.slots {
            slot.realize();
        }
    }

    /// Items in this channel, counting both buffers.
    pub fn item_count(&self) -> u32 {
        self.slots.iter().map(Slot::item_count).sum()
    }
}

// ---------------------------------------------------------------------------
// Conveyor
// ---------------------------------------------------------------------------

/// Per-conveyor transport state. Facing and position live on the entity;
/// this is the channel machinery plus the sequence assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conveyor {
    pub corner: bool,
    /// Which channel is the short inner track. Meaningful only on corners.
    pub inner_channel: usize,
    pub channels: Vec<Channel>,
    /// True iff any slot holds an item, settled or pending.
    pub has_work: bool,
    pub sequence: Option<SequenceId>,
}

impl Conveyor {
    /// A straight conveyor: one channel, one slot.
    pub fn straight() -> Self {
        Self {
            corner: false,
            inner_channel: 0,
            channels: vec![Channel::new(1)],
            has_work: false,
            sequence: None,
        }
    }

    /// A corner conveyor: two channels, the inner one slot shorter.
    pub fn corner(inner_channel: usize) -> Self {
        debug_assert!(inner_channel < 2);
        let channels = (0..2)
            .map(|i| {
                if i == inner_channel {
                    Channel::new(CORNER_OUTER_SLOTS - 1)
                } else {
                    Channel::new(CORNER_OUTER_SLOTS)
                }
            })
            .collect();
        Self {
            corner: true,
            inner_channel,
            channels,
            has_work: false,
            sequence: None,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Resolve a lane hint from an upstream entity to a channel index.
    pub fn channel_for_lane(&self, lane: usize) -> usize {
        lane.min(self.channels.len() - 1)
    }

    /// Accept an item into the entry slot of the channel matching `lane`.
    /// The write is pending; it settles in the realize phase.
    pub fn accept(&mut self, item_type: ItemTypeId, lane: usize) -> bool {
        let channel = self.channel_for_lane(lane);
        let entry = &mut self.channels[channel].slots[0];
        if !entry.is_free() {
            return false;
        }
        entry.pending = Some(Item::new(item_type, SLOT_TRAVERSAL_TICKS));
        self.has_work = true;
        true
    }

    /// Accept an item into the entry slot of the first channel with room.
    /// Used by feeders with no lane of their own, such as junctions.
    pub fn accept_any(&mut self, item_type: ItemTypeId) -> bool {
        for channel in &mut self.channels {
            let entry = &mut channel.slots[0];
            if entry.is_free() {
                entry.pending = Some(Item::new(item_type, SLOT_TRAVERSAL_TICKS));
                self.has_work = true;
                return true;
            }
        }
        false
    }

    /// Items on this conveyor, counting both buffers.
    pub fn item_count(&self) -> u32 {
        self.channels.iter().map(Channel::item_count).sum()
    }

    /// Lift the settled item off the first occupied head slot, dwell time
    /// notwithstanding. Used by inserters pulling from the conveyor.
    pub fn take_any_head_item(&mut self) -> Option<ItemTypeId> {
        for channel in &mut self.channels {
            let head = channel.head_index();
            if let Some(item) = channel.slots[head].settled.take() {
                self.refresh_has_work();
                return Some(item.item_type);
            }
        }
        None
    }

    /// Promote pending writes and refresh the has-work flag.
    pub fn realize(&mut self) {
        for channel in &mut self.channels {
            channel.realize();
        }
        self.refresh_has_work();
    }

    pub fn refresh_has_work(&mut self) {
        self.has_work = self.channels.iter().any(|c| c.item_count() > 0);
    }

    /// Swap in the channel layout for a new corner state, re-seating the
    /// items currently on the conveyor head-first. Items that no longer
    /// fit are returned to the caller.
    pub fn reshape(&mut self, corner: bool, inner_channel: usize) -> Vec<Item> {
        if corner == self.corner && (!corner || inner_channel == self.inner_channel) {
            return Vec::new();
        }

        let mut carried: Vec<Item> = Vec::new();
        for channel in &self.channels {
            for slot in channel.slots.iter().rev() {
                carried.extend(slot.settled);
                carried.extend(slot.pending);
            }
        }

        *self = if corner {
            Self::corner(inner_channel)
        } else {
            Self::straight()
        };

        let mut overflow = Vec::new();
        'place: for item in carried {
            for channel in &mut self.channels {
                for slot in channel.slots.iter_mut().rev() {
                    if slot.settled.is_none() {
                        slot.settled = Some(item);
                        continue 'place;
                    }
                }
            }
            overflow.push(item);
        }
        self.refresh_has_work();
        overflow
    }
}

// ===========================================================================
// Tests
// ===========================================================================
