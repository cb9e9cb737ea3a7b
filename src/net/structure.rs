//! Static net elements (places, transitions, arcs) and markings.
//!
//! Places and transitions are plain values until they are handed to
//! [`Net`](crate::net::Net); from then on the net owns them and only lends
//! them out by shared reference. Arcs live on the transition that owns them,
//! in declaration order, and are mirrored into the net's `Pre`/`Post`
//! matrices when the transition is added.
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::net::ids::PlaceId;
use crate::net::index_vec::IndexVec;

/// Token counts and arc weights.
pub type Weight = u64;

/// Presentation tag of a place. Firing never looks at it.
#[derive(Debug, Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PlaceCategory {
    /// Pool of reusable resources (workers, machines).
    Resource,
    /// Work waiting to be picked up.
    Queue,
    /// A resource bound to a job but not yet producing.
    Assignment,
    /// Work in progress.
    Process,
    /// Finished goods; tokens only accumulate here.
    Output,
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Debug)]
pub struct Place {
    /// Unique key the engine API addresses the place by, e.g. `P1`.
    pub key: String,
    /// Display name, only used by exports.
    pub name: String,
    /// Tokens in the initial marking.
    pub tokens: Weight,
    pub category: PlaceCategory,
}

impl Place {
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        tokens: Weight,
        category: PlaceCategory,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            tokens,
            category,
        }
    }
}

/// One weighted arc. The direction is given by the list holding it.
#[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Arc {
    /// Place on the other end of the arc.
    pub place: PlaceId,
    /// Tokens moved per firing; the builder rejects 0.
    pub weight: Weight,
}

impl Arc {
    pub fn new(place: PlaceId, weight: Weight) -> Self {
        Self { place, weight }
    }
}

impl fmt::Debug for Arc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}×{}", self.place, self.weight)
    }
}

pub type ArcList = SmallVec<[Arc; 4]>;

/// A transition and its arcs.
///
/// Arcs can be attached to a detached value with [`with_input`] and
/// [`with_output`]; [`Net::add_transition`] validates them. Once the net owns
/// the transition, arcs are only added through
/// [`Net::add_input_arc`]/[`Net::add_output_arc`], which keep the arc lists
/// and the incidence matrices in step.
///
/// [`with_input`]: Transition::with_input
/// [`with_output`]: Transition::with_output
/// [`Net::add_transition`]: crate::net::Net::add_transition
/// [`Net::add_input_arc`]: crate::net::Net::add_input_arc
/// [`Net::add_output_arc`]: crate::net::Net::add_output_arc
#[derive(Clone, Serialize, PartialEq, Eq, Hash)]
pub struct Transition {
    /// Unique key the engine API addresses the transition by, e.g. `T1`.
    pub key: String,
    /// Display name, copied into firing records.
    pub name: String,
    /// Input arcs (place -> transition) in declaration order.
    inputs: ArcList,
    /// Output arcs (transition -> place) in declaration order.
    outputs: ArcList,
}

impl Transition {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            inputs: ArcList::new(),
            outputs: ArcList::new(),
        }
    }

    pub fn with_input(mut self, place: PlaceId, weight: Weight) -> Self {
        self.inputs.push(Arc::new(place, weight));
        self
    }

    pub fn with_output(mut self, place: PlaceId, weight: Weight) -> Self {
        self.outputs.push(Arc::new(place, weight));
        self
    }

    pub fn inputs(&self) -> &[Arc] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Arc] {
        &self.outputs
    }

    /// Source transitions have no input arcs and are always enabled.
    pub fn is_source(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Detaches the arc lists so the net can validate them before taking
    /// ownership of the transition.
    pub(crate) fn take_arcs(&mut self) -> (ArcList, ArcList) {
        (
            std::mem::take(&mut self.inputs),
            std::mem::take(&mut self.outputs),
        )
    }

    pub(crate) fn push_input(&mut self, arc: Arc) {
        self.inputs.push(arc);
    }

    pub(crate) fn push_output(&mut self, arc: Arc) {
        self.outputs.push(arc);
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("key", &self.key)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish()
    }
}

/// Token count per place. `u64` entries make negative counts unrepresentable.
///
/// Markings are produced by a [`Net`](crate::net::Net) and always have one
/// entry per place of that net.
#[derive(Clone, Serialize, PartialEq, Eq, Hash)]
pub struct Marking(IndexVec<PlaceId, Weight>);

impl Marking {
    pub(crate) fn new(initial: IndexVec<PlaceId, Weight>) -> Self {
        Self(initial)
    }

    /// Number of places covered.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlaceId, &Weight)> {
        self.0.iter_enumerated()
    }

    /// Tokens on `place`. A place this marking does not cover holds none.
    pub fn tokens(&self, place: PlaceId) -> Weight {
        self.0.get(place).copied().unwrap_or(0)
    }

    /// Callers check `place` against [`len`](Self::len) first.
    pub(crate) fn tokens_mut(&mut self, place: PlaceId) -> &mut Weight {
        &mut self.0[place]
    }

    pub fn total(&self) -> Weight {
        self.0.iter().sum()
    }
}

impl fmt::Debug for Marking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (place, tokens) in self.iter() {
            map.entry(&place, tokens);
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marking_total_and_lookup() {
        let marking = Marking::new(IndexVec::from(vec![3, 0, 2]));
        assert_eq!(marking.total(), 5);
        assert_eq!(marking.tokens(PlaceId::new(2)), 2);
        assert_eq!(marking.tokens(PlaceId::new(3)), 0);
        assert_eq!(format!("{marking:?}"), "{p#0: 3, p#1: 0, p#2: 2}");
    }

    #[test]
    fn transition_without_inputs_is_source() {
        let transition = Transition::new("T5", "Ajouter Tâche");
        assert!(transition.is_source());
        let transition = transition.with_input(PlaceId::new(0), 1);
        assert!(!transition.is_source());
        assert_eq!(transition.inputs(), &[Arc::new(PlaceId::new(0), 1)]);
        assert!(transition.outputs().is_empty());
    }

    #[test]
    fn taking_arcs_leaves_a_bare_transition() {
        let mut transition = Transition::new("T4", "Terminer Production")
            .with_input(PlaceId::new(5), 1)
            .with_output(PlaceId::new(6), 1)
            .with_output(PlaceId::new(0), 1);
        let (inputs, outputs) = transition.take_arcs();
        assert_eq!(inputs.len(), 1);
        assert_eq!(outputs.len(), 2);
        assert!(transition.inputs().is_empty());
        assert!(transition.outputs().is_empty());
    }
}
