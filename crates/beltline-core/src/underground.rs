//! Underground transit state.
//!
//! An underground carries one item at a time below the floor to a paired
//! exit up to [`UNDERGROUND_RANGE`] cells ahead along its facing. The
//! pair link is resolved when undergrounds are placed: each one points at
//! the nearest same-facing counterpart ahead, and placing a new
//! counterpart between an existing pair re-points the entry behind it.
//! An item commits to the exit current at insertion time; re-pairing does
//! not redirect items already below the floor. Travel time is the cell
//! distance times the per-slot traversal cost, tracked through the item's
//! own progress pair.

use crate::conveyor::SLOT_TRAVERSAL_TICKS;
use crate::fixed::Ticks;
use crate::id::ItemTypeId;
use crate::item::Item;
use beltline_spatial::Position;
use serde::{Deserialize, Serialize};

/// Cells an underground may scan ahead for its exit.
pub const UNDERGROUND_RANGE: u32 = 10;

/// A resolved link to the paired exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitLink {
    pub cell: Position,
    pub distance: u32,
}

/// An item below the floor, bound for the exit that was paired when it
/// entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitItem {
    pub item: Item,
    pub exit: Position,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Underground {
    pub exit: Option<ExitLink>,
    pub in_transit: Option<TransitItem>,
}

impl Underground {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the tunnel can take another item right now.
    pub fn has_room(&self) -> bool {
        self.exit.is_some() && self.in_transit.is_none()
    }

    /// Start an item on its way to the paired exit. Refused while unpaired
    /// or occupied.
    pub fn accept(&mut self, item_type: ItemTypeId) -> bool {
        let Some(link) = self.exit else {
            return false;
        };
        if self.in_transit.is_some() {
            return false;
        }
        let travel = Ticks::from(link.distance) * SLOT_TRAVERSAL_TICKS;
        self.in_transit = Some(TransitItem {
            item: Item::new(item_type, travel),
            exit: link.cell,
        });
        true
    }

    /// Advance the transit item's travel counter by one tick.
    pub fn age(&mut self) {
        if let Some(transit) = &mut self.in_transit {
            transit.item.age();
        }
    }

    /// The transit item once its travel time has elapsed.
    pub fn arrived(&self) -> Option<TransitItem> {
        self.in_transit.filter(|t| t.item.is_eligible())
    }

    /// Remove the transit item after it surfaced.
    pub fn take(&mut self) -> Option<TransitItem> {
        self.in_transit.take()
    }

    pub fn item_count(&self) -> u32 {
        self.in_transit.is_some() as u32
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ore() -> ItemTypeId {
        ItemTypeId(0)
    }

    fn paired(distance: u32) -> Underground {
        Underground {
            exit: Some(ExitLink {
                cell: Position::new(distance as i32, 0, 0),
                distance,
            }),
            in_transit: None,
        }
    }

    // -----------------------------------------------------------------------
    // Test 1: Unpaired tunnels refuse items
    // -----------------------------------------------------------------------
    #[test]
    fn unpaired_refuses_items() {
        let mut tunnel = Underground::new();
        assert!(!tunnel.has_room());
        assert!(!tunnel.accept(ore()));
        assert_eq!(tunnel.item_count(), 0);
    }

    // -----------------------------------------------------------------------
    // Test 2: Accept sets travel time from the pair distance
    // -----------------------------------------------------------------------
    #[test]
    fn accept_scales_travel_by_distance() {
        let mut tunnel = paired(3);
        assert!(tunnel.accept(ore()));
        let transit = tunnel.in_transit.expect("item in transit");
        assert_eq!(transit.item.target_tick, 3 * SLOT_TRAVERSAL_TICKS);
        assert_eq!(transit.item.progress_tick, 0);
        assert_eq!(transit.exit, Position::new(3, 0, 0));
    }

    // -----------------------------------------------------------------------
    // Test 3: One item at a time
    // -----------------------------------------------------------------------
    #[test]
    fn accept_refuses_while_occupied() {
        let mut tunnel = paired(1);
        assert!(tunnel.accept(ore()));
        assert!(!tunnel.accept(ore()));
        assert_eq!(tunnel.item_count(), 1);
    }

    // -----------------------------------------------------------------------
    // Test 4: Arrival happens exactly at distance times traversal cost
    // -----------------------------------------------------------------------
    #[test]
    fn arrival_after_full_travel_time() {
        let mut tunnel = paired(2);
        assert!(tunnel.accept(ore()));

        for _ in 0..(2 * SLOT_TRAVERSAL_TICKS - 1) {
            tunnel.age();
            assert!(tunnel.arrived().is_none());
        }
        tunnel.age();
        assert!(tunnel.arrived().is_some());
    }

    // -----------------------------------------------------------------------
    // Test 5: Take frees the tunnel for the next item
    // -----------------------------------------------------------------------
    #[test]
    fn take_frees_tunnel() {
        let mut tunnel = paired(1);
        assert!(tunnel.accept(ore()));
        let transit = tunnel.take().expect("item was in transit");
        assert_eq!(transit.exit, Position::new(1, 0, 0));
        assert!(tunnel.has_room());
        assert!(tunnel.accept(ore()));
    }

    // -----------------------------------------------------------------------
    // Test 6: Re-pairing does not redirect an item in transit
    // -----------------------------------------------------------------------
    #[test]
    fn repairing_keeps_committed_exit() {
        let mut tunnel = paired(4);
        assert!(tunnel.accept(ore()));
        tunnel.exit = Some(ExitLink {
            cell: Position::new(2, 0, 0),
            distance: 2,
        });

        let transit = tunnel.in_transit.expect("item in transit");
        assert_eq!(transit.exit, Position::new(4, 0, 0));
        assert_eq!(transit.item.target_tick, 4 * SLOT_TRAVERSAL_TICKS);
    }

    // -----------------------------------------------------------------------
    // Test 7: The committed exit survives serialization
    // -----------------------------------------------------------------------
    #[test]
    fn serde_roundtrip_keeps_exit() {
        let mut tunnel = paired(5);
        assert!(tunnel.accept(ore()));
        tunnel.age();

        let data = bitcode::serialize(&tunnel).expect("serialize tunnel");
        let restored: Underground = bitcode::deserialize(&data).expect("deserialize tunnel");
        assert_eq!(tunnel, restored);
    }
}
