//! Fixed-capacity ring of timestamped records built over [`Item`] and [`Map`].
//! Once the ring is full, pushing a new record evicts the oldest one, so the
//! buffer always holds the most recent `capacity` checkpoints. Records can be
//! looked up by timestamp in `O(log capacity)`.
//!
//! # Example
//! ```
//! use cosmwasm_schema::cw_serde;
//! use cosmwasm_std::testing::MockStorage;
//! use futarchy_checkpoint_buffer::{CheckpointBuffer, Timestamped};
//!
//! #[cw_serde]
//! struct Sample {
//!     ts: u64,
//! }
//!
//! impl Timestamped for Sample {
//!     fn timestamp_ms(&self) -> u64 {
//!         self.ts
//!     }
//! }
//!
//! const BUFFER: CheckpointBuffer<Sample> = CheckpointBuffer::new("ring_state", "ring");
//!
//! let mut store = MockStorage::new();
//! BUFFER.init(&mut store, 8).unwrap();
//! BUFFER.push(&mut store, &Sample { ts: 100 }).unwrap();
//! let found = BUFFER.find_at_or_before(&store, 150).unwrap();
//! ```

use std::marker::PhantomData;

use cosmwasm_schema::cw_serde;
use cosmwasm_schema::serde::de::DeserializeOwned;
use cosmwasm_schema::serde::Serialize;
use cosmwasm_std::Storage;
use cw_storage_plus::{Item, Map};

use crate::error::{BufferError, BufferResult};

pub mod error;

/// Records stored in a [`CheckpointBuffer`] must expose the timestamp they
/// were taken at; the buffer keeps them ordered by it.
pub trait Timestamped {
    fn timestamp_ms(&self) -> u64;
}

#[cw_serde]
pub struct BufferState {
    capacity: u32,
    /// Physical index of the oldest record
    head: u32,
    /// Number of records currently stored
    len: u32,
}

pub struct CheckpointBuffer<'a, V> {
    state_key: &'a str,
    items_namespace: &'a str,
    data_type: PhantomData<V>,
}

impl<'a, V> CheckpointBuffer<'a, V> {
    pub const fn new(state_key: &'a str, items_namespace: &'a str) -> Self {
        Self {
            state_key,
            items_namespace,
            data_type: PhantomData,
        }
    }

    const fn state(&self) -> Item<'a, BufferState> {
        Item::new(self.state_key)
    }
}

impl<'a, V> CheckpointBuffer<'a, V>
where
    V: Serialize + DeserializeOwned + Timestamped,
{
    const fn items(&self) -> Map<'a, u32, V> {
        Map::new(self.items_namespace)
    }

    /// Initializes the ring in storage. Intended to be called once during
    /// contract instantiation.
    pub fn init(&self, store: &mut dyn Storage, capacity: u32) -> BufferResult<()> {
        if capacity == 0 {
            return Err(BufferError::ZeroCapacity {});
        }
        if self.state().may_load(store)?.is_some() {
            return Err(BufferError::BufferAlreadyInitialized {});
        }

        self.state().save(
            store,
            &BufferState {
                capacity,
                head: 0,
                len: 0,
            },
        )?;

        Ok(())
    }

    fn load_state(&self, store: &dyn Storage) -> BufferResult<BufferState> {
        self.state()
            .may_load(store)?
            .ok_or(BufferError::BufferNotInitialized {})
    }

    /// Appends a record, evicting the oldest one when the ring is full.
    /// Timestamps must not decrease between consecutive pushes.
    pub fn push(&self, store: &mut dyn Storage, value: &V) -> BufferResult<()> {
        let mut state = self.load_state(store)?;

        if state.len > 0 {
            let newest = self.read_logical(store, &state, state.len - 1)?;
            if value.timestamp_ms() < newest.timestamp_ms() {
                return Err(BufferError::NonMonotonicTimestamp {});
            }
        }

        if state.len < state.capacity {
            let physical = (state.head + state.len) % state.capacity;
            self.items().save(store, physical, value)?;
            state.len += 1;
        } else {
            self.items().save(store, state.head, value)?;
            state.head = (state.head + 1) % state.capacity;
        }

        self.state().save(store, &state)?;

        Ok(())
    }

    /// Number of records currently stored.
    pub fn len(&self, store: &dyn Storage) -> BufferResult<u32> {
        Ok(self.load_state(store)?.len)
    }

    pub fn is_empty(&self, store: &dyn Storage) -> BufferResult<bool> {
        Ok(self.len(store)? == 0)
    }

    /// The most recent record, if any.
    pub fn newest(&self, store: &dyn Storage) -> BufferResult<Option<V>> {
        let state = self.load_state(store)?;
        if state.len == 0 {
            return Ok(None);
        }
        self.read_logical(store, &state, state.len - 1).map(Some)
    }

    /// The oldest record still retained, if any.
    pub fn oldest(&self, store: &dyn Storage) -> BufferResult<Option<V>> {
        let state = self.load_state(store)?;
        if state.len == 0 {
            return Ok(None);
        }
        self.read_logical(store, &state, 0).map(Some)
    }

    /// Returns the most recent record whose timestamp is `<= target_ms`, or
    /// `None` when every retained record is newer than the target. Runs a
    /// binary search over the ring.
    pub fn find_at_or_before(
        &self,
        store: &dyn Storage,
        target_ms: u64,
    ) -> BufferResult<Option<V>> {
        let state = self.load_state(store)?;
        if state.len == 0 {
            return Ok(None);
        }

        let oldest = self.read_logical(store, &state, 0)?;
        if oldest.timestamp_ms() > target_ms {
            return Ok(None);
        }

        // Largest logical index with timestamp <= target.
        let mut lo = 0u32;
        let mut hi = state.len - 1;
        while lo < hi {
            let mid = (lo + hi + 1) / 2;
            let record = self.read_logical(store, &state, mid)?;
            if record.timestamp_ms() <= target_ms {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }

        self.read_logical(store, &state, lo).map(Some)
    }

    fn read_logical(
        &self,
        store: &dyn Storage,
        state: &BufferState,
        logical: u32,
    ) -> BufferResult<V> {
        let physical = (state.head + logical) % state.capacity;
        self.items().load(store, physical).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use cosmwasm_schema::cw_serde;
    use cosmwasm_std::testing::MockStorage;

    use super::*;

    #[cw_serde]
    struct Point {
        ts: u64,
        value: u64,
    }

    impl Timestamped for Point {
        fn timestamp_ms(&self) -> u64 {
            self.ts
        }
    }

    const RING: CheckpointBuffer<Point> = CheckpointBuffer::new("state", "items");

    fn point(ts: u64) -> Point {
        Point { ts, value: ts * 10 }
    }

    #[test]
    fn init_twice_fails() {
        let mut store = MockStorage::new();
        RING.init(&mut store, 4).unwrap();
        assert_eq!(
            RING.init(&mut store, 4).unwrap_err(),
            BufferError::BufferAlreadyInitialized {}
        );
    }

    #[test]
    fn zero_capacity_rejected() {
        let mut store = MockStorage::new();
        assert_eq!(
            RING.init(&mut store, 0).unwrap_err(),
            BufferError::ZeroCapacity {}
        );
    }

    #[test]
    fn push_evicts_oldest_when_full() {
        let mut store = MockStorage::new();
        RING.init(&mut store, 3).unwrap();

        for ts in [10, 20, 30, 40, 50] {
            RING.push(&mut store, &point(ts)).unwrap();
        }

        assert_eq!(RING.len(&store).unwrap(), 3);
        assert_eq!(RING.oldest(&store).unwrap(), Some(point(30)));
        assert_eq!(RING.newest(&store).unwrap(), Some(point(50)));
    }

    #[test]
    fn rejects_decreasing_timestamps() {
        let mut store = MockStorage::new();
        RING.init(&mut store, 3).unwrap();
        RING.push(&mut store, &point(100)).unwrap();
        assert_eq!(
            RING.push(&mut store, &point(99)).unwrap_err(),
            BufferError::NonMonotonicTimestamp {}
        );
        // Equal timestamps are allowed
        RING.push(&mut store, &point(100)).unwrap();
    }

    #[test]
    fn find_at_or_before_hits_and_bounds() {
        let mut store = MockStorage::new();
        RING.init(&mut store, 8).unwrap();
        for ts in [10, 20, 30, 40, 50] {
            RING.push(&mut store, &point(ts)).unwrap();
        }

        assert_eq!(RING.find_at_or_before(&store, 5).unwrap(), None);
        assert_eq!(RING.find_at_or_before(&store, 10).unwrap(), Some(point(10)));
        assert_eq!(RING.find_at_or_before(&store, 34).unwrap(), Some(point(30)));
        assert_eq!(RING.find_at_or_before(&store, 50).unwrap(), Some(point(50)));
        assert_eq!(
            RING.find_at_or_before(&store, 9999).unwrap(),
            Some(point(50))
        );
    }

    #[test]
    fn find_works_after_wraparound() {
        let mut store = MockStorage::new();
        RING.init(&mut store, 4).unwrap();
        for ts in [10, 20, 30, 40, 50, 60] {
            RING.push(&mut store, &point(ts)).unwrap();
        }

        // 10 and 20 were evicted
        assert_eq!(RING.find_at_or_before(&store, 25).unwrap(), None);
        assert_eq!(RING.find_at_or_before(&store, 45).unwrap(), Some(point(40)));
        assert_eq!(RING.find_at_or_before(&store, 60).unwrap(), Some(point(60)));
    }
}
