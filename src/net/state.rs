//! Mutable half of a simulation: marking plus firing history.
use std::fmt;
use std::sync::Arc as Shared;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::net::ids::TransitionId;
use crate::net::structure::Marking;

/// One successful firing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiringRecord {
    /// 1-based position in the firing sequence.
    pub seq: u64,
    pub transition: TransitionId,
    pub key: String,
    pub name: String,
    /// Milliseconds since the Unix epoch.
    pub fired_at: u64,
}

struct Entry {
    record: FiringRecord,
    prev: Option<Shared<Entry>>,
}

/// Append-only firing log.
///
/// Stored newest-first as a shared chain: appending allocates one entry and
/// links it to the existing prefix, so a state and the states derived from it
/// share every earlier record. Cloning is O(1).
#[derive(Clone, Default)]
pub struct History {
    head: Option<Shared<Entry>>,
    len: usize,
}

impl History {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The most recent record.
    pub fn last(&self) -> Option<&FiringRecord> {
        self.head.as_deref().map(|entry| &entry.record)
    }

    /// Records newest first, without allocating.
    pub fn iter_rev(&self) -> impl Iterator<Item = &FiringRecord> {
        let mut cursor = self.head.as_deref();
        std::iter::from_fn(move || {
            let entry = cursor?;
            cursor = entry.prev.as_deref();
            Some(&entry.record)
        })
    }

    /// Records in firing order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &FiringRecord> + ExactSizeIterator {
        let mut records = Vec::with_capacity(self.len);
        records.extend(self.iter_rev());
        records.reverse();
        records.into_iter()
    }

    /// Record at `index` in firing order.
    pub fn get(&self, index: usize) -> Option<&FiringRecord> {
        let from_head = self.len.checked_sub(index + 1)?;
        self.iter_rev().nth(from_head)
    }

    pub fn to_vec(&self) -> Vec<FiringRecord> {
        self.iter().cloned().collect()
    }

    fn pushed(&self, record: FiringRecord) -> Self {
        Self {
            head: Some(Shared::new(Entry {
                record,
                prev: self.head.clone(),
            })),
            len: self.len + 1,
        }
    }
}

impl Drop for History {
    // Unlinks uniquely owned entries one at a time; dropping a long chain
    // recursively would exhaust the stack.
    fn drop(&mut self) {
        let mut cursor = self.head.take();
        while let Some(entry) = cursor {
            match Shared::try_unwrap(entry) {
                Ok(mut entry) => cursor = entry.prev.take(),
                Err(_) => break,
            }
        }
    }
}

impl PartialEq for History {
    fn eq(&self, other: &Self) -> bool {
        if self.len != other.len {
            return false;
        }
        let same_head = match (&self.head, &other.head) {
            (Some(a), Some(b)) => Shared::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_head || self.iter_rev().eq(other.iter_rev())
    }
}

impl Eq for History {}

impl fmt::Debug for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl Serialize for History {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

/// Marking and append-only history. Values are replaced, never patched: every
/// engine operation returns a fresh `NetState`. States are only built by
/// [`PetriNetEngine`](crate::net::PetriNetEngine), so the marking always
/// matches the engine's net.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetState {
    marking: Marking,
    history: History,
}

impl NetState {
    pub(crate) fn new(marking: Marking) -> Self {
        Self {
            marking,
            history: History::default(),
        }
    }

    pub fn marking(&self) -> &Marking {
        &self.marking
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn last_firing(&self) -> Option<&FiringRecord> {
        self.history.last()
    }

    /// Sequence number the next firing will receive.
    pub fn next_seq(&self) -> u64 {
        self.history.last().map_or(1, |record| record.seq + 1)
    }

    pub(crate) fn with_firing(
        &self,
        marking: Marking,
        transition: TransitionId,
        key: &str,
        name: &str,
        fired_at: u64,
    ) -> Self {
        let history = self.history.pushed(FiringRecord {
            seq: self.next_seq(),
            transition,
            key: key.to_string(),
            name: name.to_string(),
            fired_at,
        });
        Self { marking, history }
    }

    pub(crate) fn with_marking(&self, marking: Marking) -> Self {
        Self {
            marking,
            history: self.history.clone(),
        }
    }
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::index_vec::IndexVec;

    fn single_place(tokens: u64) -> NetState {
        NetState::new(Marking::new(IndexVec::from(vec![tokens])))
    }

    fn fire(state: &NetState, fired_at: u64) -> NetState {
        state.with_firing(
            state.marking().clone(),
            TransitionId::new(0),
            "T1",
            "Assigner Ouvrier",
            fired_at,
        )
    }

    #[test]
    fn firing_appends_without_touching_source() {
        let state = single_place(1);
        let next = state.with_firing(
            Marking::new(IndexVec::from(vec![0])),
            TransitionId::new(0),
            "T1",
            "Assigner Ouvrier",
            42,
        );
        let after = fire(&next, 43);

        assert!(state.history().is_empty());
        assert_eq!(next.history().len(), 1);
        assert_eq!(after.history().len(), 2);
        assert_eq!(after.history().get(1).map(|r| r.seq), Some(2));
        assert_eq!(after.history().get(2), None);
        assert_eq!(after.next_seq(), 3);
        assert_eq!(after.last_firing().map(|r| r.fired_at), Some(43));
        assert_eq!(next.marking().tokens(crate::net::PlaceId::new(0)), 0);
    }

    #[test]
    fn derived_states_share_earlier_records() {
        let mut state = single_place(0);
        for at in 0..50 {
            state = fire(&state, at);
        }
        let left = fire(&state, 100);
        let right = state.with_marking(Marking::new(IndexVec::from(vec![9])));

        let base = state.history().head.as_ref().unwrap();
        assert!(Shared::ptr_eq(left.history().head.as_ref().unwrap().prev.as_ref().unwrap(), base));
        assert!(Shared::ptr_eq(right.history().head.as_ref().unwrap(), base));
        assert_eq!(right.history(), state.history());
        assert_ne!(left.history(), state.history());
    }

    #[test]
    fn iteration_is_in_firing_order() {
        let mut state = single_place(0);
        for at in 10..15 {
            state = fire(&state, at);
        }
        let stamps = state.history().iter().map(|r| r.fired_at).collect::<Vec<_>>();
        assert_eq!(stamps, vec![10, 11, 12, 13, 14]);
        let seqs = state.history().iter_rev().map(|r| r.seq).collect::<Vec<_>>();
        assert_eq!(seqs, vec![5, 4, 3, 2, 1]);
        assert_eq!(state.history().to_vec().len(), 5);
        assert_eq!(
            serde_json::to_value(state.history()).unwrap()[0]["fired_at"],
            10
        );
    }

    #[test]
    fn equal_contents_compare_equal_across_chains() {
        let a = fire(&single_place(0), 1);
        let b = fire(&single_place(0), 1);
        assert_eq!(a.history(), b.history());
        assert_eq!(a, b);
    }

    #[test]
    fn long_histories_drop_without_recursion() {
        let mut state = single_place(0);
        for at in 0..200_000 {
            state = fire(&state, at);
        }
        let kept = state.clone();
        drop(state);
        assert_eq!(kept.history().len(), 200_000);
        drop(kept);
    }
}
