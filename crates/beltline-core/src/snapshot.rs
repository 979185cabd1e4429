//! Snapshot support for the simulator.
//!
//! Provides binary serialization via `bitcode` with a versioned header,
//! plus a fixed-capacity ring buffer of snapshots for undo and replay.
//! Restoring a snapshot reproduces the exact simulation state, so a
//! restored run hashes identically to the original from that tick on.

use crate::registry::Registry;
use crate::sequence::Sequence;
use crate::sim::Sim;
use crate::world::World;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a beltline snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0xBE17_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur while saving or restoring a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
}

// ---------------------------------------------------------------------------
// Snapshot header
// ---------------------------------------------------------------------------

/// Header prepended to every serialized snapshot. Enables format detection
/// and version checking before the payload is trusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotHeader {
    /// Magic number for format detection.
    pub magic: u32,
    /// Format version for forward compatibility.
    pub version: u32,
    /// Tick count at the time the snapshot was taken.
    pub tick: u64,
}

impl SnapshotHeader {
    /// Create a header for the current format version.
    pub fn new(tick: u64) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            tick,
        }
    }

    /// Validate the header. Returns `Ok(())` if valid.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(SnapshotError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(SnapshotError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

/// Read just the snapshot header from serialized data.
///
/// Bitcode does not support partial deserialization, so this decodes the
/// full snapshot and returns only the header. Useful for version probing.
pub fn read_snapshot_header(data: &[u8]) -> Result<SnapshotHeader, SnapshotError> {
    let snapshot: WorldSnapshot =
        bitcode::deserialize(data).map_err(|e| SnapshotError::Decode(e.to_string()))?;
    Ok(snapshot.header)
}

// ---------------------------------------------------------------------------
// Serializable simulator state
// ---------------------------------------------------------------------------

/// The full serializable simulator state. The traced sequences ride along
/// so a restore does not force a retrace.
#[derive(Debug, Serialize, Deserialize)]
struct WorldSnapshot {
    header: SnapshotHeader,
    world: World,
    registry: Registry,
    sequences: Vec<Sequence>,
    last_state_hash: u64,
}

// ---------------------------------------------------------------------------
// Sim snapshot methods
// ---------------------------------------------------------------------------

impl Sim {
    /// Serialize the full simulator state to a binary blob via bitcode.
    pub fn save(&self) -> Result<Vec<u8>, SnapshotError> {
        let snapshot = WorldSnapshot {
            header: SnapshotHeader::new(self.tick),
            world: self.world.clone(),
            registry: self.registry.clone(),
            sequences: self.sequences.clone(),
            last_state_hash: self.last_state_hash,
        };
        bitcode::serialize(&snapshot).map_err(|e| SnapshotError::Encode(e.to_string()))
    }

    /// Restore a simulator from a binary blob.
    ///
    /// Validates the header (magic number, version) before accepting the
    /// payload. Returns an error, never panics, on malformed input.
    pub fn restore(data: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: WorldSnapshot =
            bitcode::deserialize(data).map_err(|e| SnapshotError::Decode(e.to_string()))?;
        snapshot.header.validate()?;

        Ok(Self {
            world: snapshot.world,
            registry: snapshot.registry,
            sequences: snapshot.sequences,
            tick: snapshot.header.tick,
            last_state_hash: snapshot.last_state_hash,
        })
    }

    /// Take a snapshot and store it in the provided ring buffer.
    pub fn take_snapshot(&self, buffer: &mut SnapshotRingBuffer) -> Result<(), SnapshotError> {
        let data = self.save()?;
        buffer.push(SnapshotEntry {
            tick: self.tick,
            data,
        });
        Ok(())
    }

    /// Restore a simulator from a snapshot in the ring buffer.
    ///
    /// `index` is 0-based from oldest (0) to newest (len-1).
    /// Returns `Ok(None)` if the index is out of range.
    pub fn restore_snapshot(
        buffer: &SnapshotRingBuffer,
        index: usize,
    ) -> Result<Option<Sim>, SnapshotError> {
        let Some(entry) = buffer.get(index) else {
            return Ok(None);
        };
        let sim = Sim::restore(&entry.data)?;
        Ok(Some(sim))
    }
}

// ---------------------------------------------------------------------------
// SnapshotRingBuffer
// ---------------------------------------------------------------------------

/// A fixed-capacity ring buffer of serialized snapshots.
///
/// When the buffer is full, the oldest snapshot is evicted. Each entry
/// stores the serialized bytes and the tick at which it was taken.
#[derive(Debug)]
pub struct SnapshotRingBuffer {
    entries: Vec<Option<SnapshotEntry>>,
    /// Write position (wraps around).
    head: usize,
    len: usize,
    total_taken: u64,
}

/// A single entry in the snapshot ring buffer.
#[derive(Debug, Clone)]
pub struct SnapshotEntry {
    /// Tick at which the snapshot was taken.
    pub tick: u64,
    /// Serialized simulator state (bitcode bytes).
    pub data: Vec<u8>,
}

impl SnapshotRingBuffer {
    /// Create a new ring buffer with the given capacity.
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_taken: 0,
        }
    }

    /// Push a snapshot. If full, the oldest entry is evicted.
    pub fn push(&mut self, entry: SnapshotEntry) {
        self.entries[self.head] = Some(entry);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        self.total_taken += 1;
    }

    /// The maximum number of snapshots this buffer can hold.
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Number of snapshots currently stored.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total snapshots ever taken (including evicted).
    pub fn total_taken(&self) -> u64 {
        self.total_taken
    }

    /// Get a snapshot by index (0 = oldest, len-1 = newest).
    /// Returns `None` if the index is out of range.
    pub fn get(&self, index: usize) -> Option<&SnapshotEntry> {
        if index >= self.len {
            return None;
        }
        let start = if self.len < self.capacity() {
            0
        } else {
            self.head
        };
        let actual_index = (start + index) % self.capacity();
        self.entries[actual_index].as_ref()
    }

    /// Get the most recent snapshot.
    pub fn latest(&self) -> Option<&SnapshotEntry> {
        if self.len == 0 {
            return None;
        }
        self.get(self.len - 1)
    }

    /// Clear all snapshots.
    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            *entry = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::id::ItemTypeId;
    use beltline_spatial::{Direction, Position};

    fn sample_sim() -> Sim {
        let mut sim = Sim::new(Registry::default());
        for i in 0..4 {
            sim.world_mut()
                .place_entity(Entity::conveyor(Position::new(i, 0, 0), Direction::Right))
                .unwrap();
        }
        assert!(sim.insert_item(Position::new(0, 0, 0), ItemTypeId(3), 0));
        for _ in 0..7 {
            sim.tick();
        }
        sim
    }

    // -----------------------------------------------------------------------
    // Test 1: Round-trip preserves state and future evolution
    // -----------------------------------------------------------------------
    #[test]
    fn round_trip_preserves_state_and_hash() {
        let mut original = sample_sim();
        let data = original.save().unwrap();
        let mut restored = Sim::restore(&data).unwrap();

        assert_eq!(restored.tick_count(), original.tick_count());
        assert_eq!(restored.state_hash(), original.state_hash());
        assert_eq!(restored.sequences().len(), original.sequences().len());

        for _ in 0..30 {
            original.tick();
            restored.tick();
            assert_eq!(restored.state_hash(), original.state_hash());
        }
    }

    // -----------------------------------------------------------------------
    // Test 2: Header carries the save tick
    // -----------------------------------------------------------------------
    #[test]
    fn header_carries_save_tick() {
        let sim = sample_sim();
        let data = sim.save().unwrap();
        let header = read_snapshot_header(&data).unwrap();
        assert_eq!(header.magic, SNAPSHOT_MAGIC);
        assert_eq!(header.version, FORMAT_VERSION);
        assert_eq!(header.tick, 7);
    }

    // -----------------------------------------------------------------------
    // Test 3: Magic and version mismatches are rejected
    // -----------------------------------------------------------------------
    #[test]
    fn rejects_bad_magic_and_future_version() {
        let make = |magic: u32, version: u32| {
            let snapshot = WorldSnapshot {
                header: SnapshotHeader {
                    magic,
                    version,
                    tick: 0,
                },
                world: World::new(),
                registry: Registry::default(),
                sequences: Vec::new(),
                last_state_hash: 0,
            };
            bitcode::serialize(&snapshot).unwrap()
        };

        let bad_magic = make(0xDEAD_BEEF, FORMAT_VERSION);
        assert!(matches!(
            Sim::restore(&bad_magic),
            Err(SnapshotError::InvalidMagic(0xDEAD_BEEF))
        ));

        let future = make(SNAPSHOT_MAGIC, FORMAT_VERSION + 1);
        assert!(matches!(
            Sim::restore(&future),
            Err(SnapshotError::FutureVersion(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Test 4: Garbage bytes fail with a decode error
    // -----------------------------------------------------------------------
    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(matches!(
            Sim::restore(&[0x01, 0x02, 0x03]),
            Err(SnapshotError::Decode(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Test 5: Ring buffer evicts oldest and keeps order
    // -----------------------------------------------------------------------
    #[test]
    fn ring_buffer_evicts_oldest() {
        let mut sim = sample_sim();
        let mut buffer = SnapshotRingBuffer::new(2);

        sim.take_snapshot(&mut buffer).unwrap();
        sim.tick();
        sim.take_snapshot(&mut buffer).unwrap();
        sim.tick();
        sim.take_snapshot(&mut buffer).unwrap();

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.total_taken(), 3);
        assert_eq!(buffer.get(0).unwrap().tick, 8);
        assert_eq!(buffer.latest().unwrap().tick, 9);
        assert!(buffer.get(2).is_none());

        let restored = Sim::restore_snapshot(&buffer, 1).unwrap().unwrap();
        assert_eq!(restored.tick_count(), 9);
        assert!(Sim::restore_snapshot(&buffer, 5).unwrap().is_none());

        buffer.clear();
        assert!(buffer.is_empty());
        assert!(buffer.latest().is_none());
    }
}
