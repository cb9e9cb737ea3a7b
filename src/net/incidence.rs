//! Place × transition weight matrices (`Pre` and `Post`).
//!
//! Rows are places, columns are transitions. Parallel arcs between the same
//! place and transition accumulate into a single entry, so a column gives the
//! total number of tokens a firing consumes from (or produces into) each place.
//!
//! A [`Net`](crate::net::Net) keeps one matrix per direction and grows both in
//! lock-step with its place and transition lists; the matrices are never
//! handed out, so their shape always matches the topology.
use std::fmt;

use smallvec::SmallVec;

use crate::net::ids::{PlaceId, TransitionId};
use crate::net::index_vec::{Idx, IndexVec};
use crate::net::structure::Weight;

/// One row of weights, indexed by transition. The workshop net has six
/// transitions, so rows stay inline.
type SmallRow = SmallVec<[Weight; 8]>;

/// Dense `|P| × |T|` weight matrix.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Incidence {
    /// One row per place; every row has `cols` entries.
    rows: IndexVec<PlaceId, SmallRow>,
    /// Number of transitions.
    cols: usize,
}

impl Incidence {
    /// A zero matrix of the given shape.
    pub fn new(places: usize, transitions: usize) -> Self {
        let rows = (0..places)
            .map(|_| SmallRow::from_elem(0, transitions))
            .collect();
        Self {
            rows,
            cols: transitions,
        }
    }

    pub fn places(&self) -> usize {
        self.rows.len()
    }

    pub fn transitions(&self) -> usize {
        self.cols
    }

    /// Appends a zero row and returns the handle of the new place.
    pub fn push_place(&mut self) -> PlaceId {
        self.rows.push(SmallRow::from_elem(0, self.cols))
    }

    /// Appends a zero column and returns the handle of the new transition.
    pub fn push_transition(&mut self) -> TransitionId {
        let next = self.cols;
        for row in self.rows.iter_mut() {
            row.push(0);
        }
        self.cols += 1;
        TransitionId::from_usize(next)
    }

    /// Entry at (`place`, `transition`); 0 outside the matrix.
    pub fn get(&self, place: PlaceId, transition: TransitionId) -> Weight {
        self.rows
            .get(place)
            .and_then(|row| row.get(transition.index()))
            .copied()
            .unwrap_or(0)
    }

    /// Adds `weight` to the entry, merging parallel arcs. Both handles must
    /// come from `push_place`/`push_transition` on this matrix.
    pub fn accumulate(&mut self, place: PlaceId, transition: TransitionId, weight: Weight) {
        let entry = &mut self.rows[place][transition.index()];
        *entry = entry.saturating_add(weight);
    }

    /// Non-zero entries of one transition column, in place order.
    pub fn column(&self, transition: TransitionId) -> impl Iterator<Item = (PlaceId, Weight)> + '_ {
        let col = transition.index();
        self.rows
            .iter_enumerated()
            .filter_map(move |(place, row)| match row.get(col).copied().unwrap_or(0) {
                0 => None,
                weight => Some((place, weight)),
            })
    }

    /// Whether the place has a non-zero entry in any column.
    pub fn touches_place(&self, place: PlaceId) -> bool {
        self.rows
            .get(place)
            .is_some_and(|row| row.iter().any(|w| *w > 0))
    }

    /// Whether the transition has a non-zero entry in any row.
    pub fn touches_transition(&self, transition: TransitionId) -> bool {
        self.column(transition).next().is_some()
    }
}

impl fmt::Debug for Incidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Incidence")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .finish()
    }
}
