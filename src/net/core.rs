//! Topology, enablement and firing over plain markings.
use std::fmt::{self, Write as FmtWrite};

use indexmap::IndexMap;
use thiserror::Error;

use crate::net::ids::{PlaceId, TransitionId};
use crate::net::incidence::Incidence;
use crate::net::index_vec::{Idx, IndexVec};
use crate::net::structure::{Arc, Marking, Place, PlaceCategory, Transition, Weight};

/// Failures of runtime operations. All of them leave the caller's state as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("unknown transition `{0}`")]
    UnknownTransition(String),
    #[error("transition `{0}` is not enabled under the current marking")]
    NotEnabled(String),
    #[error("place `{0}` holds no token to remove")]
    NothingToRemove(String),
    #[error("unknown place `{0}`")]
    UnknownPlace(String),
    #[error("marking covers {found} places but the net has {expected}")]
    MarkingMismatch { expected: usize, found: usize },
}

/// Failures while assembling a topology.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetError {
    #[error("place key `{0}` declared twice")]
    DuplicatePlace(String),
    #[error("transition key `{0}` declared twice")]
    DuplicateTransition(String),
    #[error("arc of transition `{transition}` references unknown place `{place}`")]
    UnknownPlace { transition: String, place: String },
    #[error("arc references unknown transition {0:?}")]
    UnknownTransition(TransitionId),
    #[error("arc between `{place}` and `{transition}` has weight 0")]
    ZeroWeight { place: String, transition: String },
}

/// Structural findings about a topology.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticReport {
    /// Places without any arc.
    pub isolated_places: Vec<(PlaceId, String)>,
    /// Transitions without any arc.
    pub isolated_transitions: Vec<(TransitionId, String)>,
    /// Places that nothing consumes from; tokens only accumulate there.
    pub sinks: Vec<(PlaceId, String)>,
    pub warnings: Vec<String>,
    pub total_places: usize,
    pub total_transitions: usize,
}

impl DiagnosticReport {
    pub fn has_issues(&self) -> bool {
        !self.isolated_places.is_empty()
            || !self.isolated_transitions.is_empty()
            || !self.warnings.is_empty()
    }
}

/// A place/transition net. The topology is append-only: places, transitions
/// and arcs can be added but never removed, so handles stay valid.
///
/// Every mutation goes through the builder methods, which keep the place and
/// transition lists, the arc lists and the `Pre`/`Post` matrices in step.
#[derive(Clone)]
pub struct Net {
    places: IndexVec<PlaceId, Place>,
    transitions: IndexVec<TransitionId, Transition>,
    pre: Incidence,
    post: Incidence,
    place_keys: IndexMap<String, PlaceId>,
    transition_keys: IndexMap<String, TransitionId>,
}

impl fmt::Debug for Net {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Net")
            .field("places", &self.places)
            .field("transitions", &self.transitions)
            .field("pre", &self.pre)
            .field("post", &self.post)
            .finish()
    }
}

impl Net {
    pub fn empty() -> Self {
        Self {
            places: IndexVec::new(),
            transitions: IndexVec::new(),
            pre: Incidence::new(0, 0),
            post: Incidence::new(0, 0),
            place_keys: IndexMap::new(),
            transition_keys: IndexMap::new(),
        }
    }

    pub fn add_place(&mut self, place: Place) -> Result<PlaceId, NetError> {
        if self.place_keys.contains_key(&place.key) {
            return Err(NetError::DuplicatePlace(place.key));
        }
        let key = place.key.clone();
        let place_id = self.places.push(place);
        self.pre.push_place();
        self.post.push_place();
        self.place_keys.insert(key, place_id);
        Ok(place_id)
    }

    pub fn add_transition(&mut self, transition: Transition) -> Result<TransitionId, NetError> {
        if self.transition_keys.contains_key(&transition.key) {
            return Err(NetError::DuplicateTransition(transition.key));
        }
        let mut bare = transition;
        let (inputs, outputs) = bare.take_arcs();
        for arc in inputs.iter().chain(outputs.iter()) {
            let Some(place) = self.places.get(arc.place) else {
                return Err(NetError::UnknownPlace {
                    transition: bare.key,
                    place: format!("{:?}", arc.place),
                });
            };
            if arc.weight == 0 {
                return Err(NetError::ZeroWeight {
                    place: place.key.clone(),
                    transition: bare.key,
                });
            }
        }

        let key = bare.key.clone();
        let transition_id = self.transitions.push(bare);
        self.pre.push_transition();
        self.post.push_transition();
        self.transition_keys.insert(key, transition_id);

        for arc in inputs {
            self.push_arc(transition_id, arc, ArcSide::Input)?;
        }
        for arc in outputs {
            self.push_arc(transition_id, arc, ArcSide::Output)?;
        }
        Ok(transition_id)
    }

    /// Input arc: place -> transition.
    pub fn add_input_arc(
        &mut self,
        transition: TransitionId,
        place_key: &str,
        weight: Weight,
    ) -> Result<(), NetError> {
        let place = self.resolve_arc_place(transition, place_key)?;
        self.push_arc(transition, Arc::new(place, weight), ArcSide::Input)
    }

    /// Output arc: transition -> place.
    pub fn add_output_arc(
        &mut self,
        transition: TransitionId,
        place_key: &str,
        weight: Weight,
    ) -> Result<(), NetError> {
        let place = self.resolve_arc_place(transition, place_key)?;
        self.push_arc(transition, Arc::new(place, weight), ArcSide::Output)
    }

    fn resolve_arc_place(
        &self,
        transition: TransitionId,
        place_key: &str,
    ) -> Result<PlaceId, NetError> {
        let owner = self
            .transitions
            .get(transition)
            .ok_or(NetError::UnknownTransition(transition))?;
        self.place_id(place_key)
            .ok_or_else(|| NetError::UnknownPlace {
                transition: owner.key.clone(),
                place: place_key.to_string(),
            })
    }

    fn push_arc(&mut self, transition: TransitionId, arc: Arc, side: ArcSide) -> Result<(), NetError> {
        let Some(owner) = self.transitions.get(transition) else {
            return Err(NetError::UnknownTransition(transition));
        };
        let Some(place) = self.places.get(arc.place) else {
            return Err(NetError::UnknownPlace {
                transition: owner.key.clone(),
                place: format!("{:?}", arc.place),
            });
        };
        if arc.weight == 0 {
            return Err(NetError::ZeroWeight {
                place: place.key.clone(),
                transition: owner.key.clone(),
            });
        }

        let owner = &mut self.transitions[transition];
        match side {
            ArcSide::Input => {
                owner.push_input(arc);
                self.pre.accumulate(arc.place, transition, arc.weight);
            }
            ArcSide::Output => {
                owner.push_output(arc);
                self.post.accumulate(arc.place, transition, arc.weight);
            }
        }
        Ok(())
    }

    pub fn place_id(&self, key: &str) -> Option<PlaceId> {
        self.place_keys.get(key).copied()
    }

    pub fn transition_id(&self, key: &str) -> Option<TransitionId> {
        self.transition_keys.get(key).copied()
    }

    pub fn places(&self) -> &IndexVec<PlaceId, Place> {
        &self.places
    }

    pub fn transitions(&self) -> &IndexVec<TransitionId, Transition> {
        &self.transitions
    }

    pub fn get_place(&self, place: PlaceId) -> Option<&Place> {
        self.places.get(place)
    }

    pub fn get_transition(&self, transition: TransitionId) -> Option<&Transition> {
        self.transitions.get(transition)
    }

    pub fn places_len(&self) -> usize {
        self.places.len()
    }

    pub fn transitions_len(&self) -> usize {
        self.transitions.len()
    }

    pub fn initial_marking(&self) -> Marking {
        Marking::new(self.places.iter().map(|p| p.tokens).collect())
    }

    /// Total weight consumed from `place` by one firing of `transition`.
    pub fn input_weight(&self, place: PlaceId, transition: TransitionId) -> Weight {
        self.pre.get(place, transition)
    }

    /// Total weight produced into `place` by one firing of `transition`.
    pub fn output_weight(&self, place: PlaceId, transition: TransitionId) -> Weight {
        self.post.get(place, transition)
    }

    /// Whether `marking` has exactly one entry per place of this net.
    pub fn covers(&self, marking: &Marking) -> bool {
        marking.len() == self.places.len()
    }

    pub(crate) fn check_marking(&self, marking: &Marking) -> Result<(), EngineError> {
        if self.covers(marking) {
            Ok(())
        } else {
            Err(EngineError::MarkingMismatch {
                expected: self.places.len(),
                found: marking.len(),
            })
        }
    }

    /// `t` is enabled iff `M[p] ≥ Pre[p, t]` for every place. Handles and
    /// markings from another net are never enabled.
    pub fn is_transition_enabled(&self, transition: TransitionId, marking: &Marking) -> bool {
        if !self.transitions.contains(transition) || !self.covers(marking) {
            return false;
        }
        self.pre
            .column(transition)
            .all(|(place, weight)| marking.tokens(place) >= weight)
    }

    /// Enabled transitions in declaration order.
    pub fn enabled_transitions(&self, marking: &Marking) -> Vec<TransitionId> {
        let enabled = self
            .transitions
            .indices()
            .filter(|t| self.is_transition_enabled(*t, marking))
            .collect::<Vec<_>>();
        log::trace!("enabled under {:?}: {:?}", marking, enabled);
        enabled
    }

    /// Computes `M' = M - Pre[:, t] + Post[:, t]` from the unmodified input
    /// marking. The input is never touched, so a failed firing changes nothing.
    pub fn fire_transition(
        &self,
        marking: &Marking,
        transition: TransitionId,
    ) -> Result<Marking, EngineError> {
        let Some(data) = self.transitions.get(transition) else {
            return Err(EngineError::UnknownTransition(format!("{transition:?}")));
        };
        self.check_marking(marking)?;
        if !self.is_transition_enabled(transition, marking) {
            return Err(EngineError::NotEnabled(data.key.clone()));
        }

        let mut next = marking.clone();
        for place in self.places.indices() {
            let before = marking.tokens(place);
            let consumed = self.pre.get(place, transition);
            let produced = self.post.get(place, transition);
            if consumed == 0 && produced == 0 {
                continue;
            }
            // Enablement guarantees `before >= consumed`.
            let after = (before - consumed).saturating_add(produced);
            *next.tokens_mut(place) = after;
        }
        Ok(next)
    }

    pub fn to_dot(&self, marking: &Marking) -> String {
        let mut dot = String::new();
        let _ = writeln!(&mut dot, "digraph PetriNet {{");
        let _ = writeln!(&mut dot, "    rankdir=LR;");
        let _ = writeln!(&mut dot, "    node [fontname=\"Helvetica\"];");

        for (place_id, place) in self.places.iter_enumerated() {
            let tokens = marking.tokens(place_id);
            let label = format!(
                "{}\\n{}\\n{}",
                escape_label(&place.key),
                escape_label(&place.name),
                tokens
            );
            let _ = writeln!(
                &mut dot,
                "    place_{} [label=\"{}\", shape=circle, style=filled, fillcolor=\"{}\"];",
                place_id.index(),
                label,
                category_fill(place.category)
            );
        }

        let enabled = self.enabled_transitions(marking);
        for (transition_id, transition) in self.transitions.iter_enumerated() {
            let fill = if enabled.contains(&transition_id) {
                "#c8e6c9"
            } else {
                "#eeeeee"
            };
            let _ = writeln!(
                &mut dot,
                "    trans_{} [label=\"{}\\n{}\", shape=box, style=filled, fillcolor=\"{}\"];",
                transition_id.index(),
                escape_label(&transition.key),
                escape_label(&transition.name),
                fill
            );
        }

        for (transition_id, transition) in self.transitions.iter_enumerated() {
            for arc in transition.inputs() {
                write_edge(
                    &mut dot,
                    &format!("place_{}", arc.place.index()),
                    &format!("trans_{}", transition_id.index()),
                    arc.weight,
                );
            }
            for arc in transition.outputs() {
                write_edge(
                    &mut dot,
                    &format!("trans_{}", transition_id.index()),
                    &format!("place_{}", arc.place.index()),
                    arc.weight,
                );
            }
        }

        let _ = writeln!(&mut dot, "}}");
        dot
    }

    pub fn diagnose_connectivity(&self) -> DiagnosticReport {
        let mut report = DiagnosticReport {
            total_places: self.places_len(),
            total_transitions: self.transitions_len(),
            ..DiagnosticReport::default()
        };

        for (place_id, place) in self.places.iter_enumerated() {
            let consumed = self.pre.touches_place(place_id);
            let produced = self.post.touches_place(place_id);

            if !consumed && !produced {
                report.isolated_places.push((place_id, place.key.clone()));
                continue;
            }
            if !produced && place.tokens == 0 {
                report.warnings.push(format!(
                    "place `{}` has no producer and starts empty, it can never hold a token",
                    place.key
                ));
            }
            if !consumed {
                report.sinks.push((place_id, place.key.clone()));
            }
        }

        for (transition_id, transition) in self.transitions.iter_enumerated() {
            let consumes = self.pre.touches_transition(transition_id);
            let produces = self.post.touches_transition(transition_id);
            if !consumes && !produces {
                report
                    .isolated_transitions
                    .push((transition_id, transition.key.clone()));
            } else if !produces {
                report.warnings.push(format!(
                    "transition `{}` only consumes tokens",
                    transition.key
                ));
            }
        }

        report
    }

    pub fn log_diagnostics(&self) {
        let report = self.diagnose_connectivity();

        if !report.sinks.is_empty() {
            let keys = report
                .sinks
                .iter()
                .map(|(_, key)| key.as_str())
                .collect::<Vec<_>>();
            log::info!("sink places (tokens accumulate): {}", keys.join(", "));
        }

        if report.has_issues() {
            log::warn!(
                "net connectivity: {} places, {} transitions",
                report.total_places,
                report.total_transitions
            );
            for (id, key) in &report.isolated_places {
                log::warn!("  isolated place [{}] {}", id.index(), key);
            }
            for (id, key) in &report.isolated_transitions {
                log::warn!("  isolated transition [{}] {}", id.index(), key);
            }
            for warning in &report.warnings {
                log::warn!("  {}", warning);
            }
        } else {
            log::info!(
                "net connectivity check passed ({} places, {} transitions)",
                report.total_places,
                report.total_transitions
            );
        }
    }
}

impl Default for Net {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Clone, Copy)]
enum ArcSide {
    Input,
    Output,
}

fn write_edge(dot: &mut String, from: &str, to: &str, weight: Weight) {
    if weight == 1 {
        let _ = writeln!(dot, "    {} -> {};", from, to);
    } else {
        let _ = writeln!(dot, "    {} -> {} [label=\"{}\"];", from, to, weight);
    }
}

fn category_fill(category: PlaceCategory) -> &'static str {
    match category {
        PlaceCategory::Resource => "#e3f2fd",
        PlaceCategory::Queue => "#fff3e0",
        PlaceCategory::Assignment => "#ede7f6",
        PlaceCategory::Process => "#ffe0b2",
        PlaceCategory::Output => "#e8f5e9",
    }
}

fn escape_label(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(key: &str, tokens: Weight) -> Place {
        Place::new(key, key, tokens, PlaceCategory::Resource)
    }

    #[test]
    fn add_place_and_transition_updates_incidence() {
        let mut net = Net::empty();
        let p = net.add_place(place("p", 1)).unwrap();
        let t = net.add_transition(Transition::new("t", "t")).unwrap();

        net.add_input_arc(t, "p", 1).unwrap();
        net.add_output_arc(t, "p", 2).unwrap();

        assert_eq!(net.places_len(), 1);
        assert_eq!(net.transitions_len(), 1);
        assert_eq!(net.input_weight(p, t), 1);
        assert_eq!(net.output_weight(p, t), 2);
        assert_eq!(net.transitions()[t].inputs(), &[Arc::new(p, 1)]);
        assert_eq!(net.transitions()[t].outputs(), &[Arc::new(p, 2)]);
    }

    #[test]
    fn arcs_added_after_insertion_drive_enablement() {
        let mut net = Net::empty();
        let p = net.add_place(place("p", 0)).unwrap();
        let t = net.add_transition(Transition::new("t", "t")).unwrap();
        assert!(net.is_transition_enabled(t, &net.initial_marking()));

        net.add_input_arc(t, "p", 5).unwrap();
        let declared = net.get_transition(t).unwrap();
        assert_eq!(declared.inputs(), &[Arc::new(p, 5)]);
        assert_eq!(net.input_weight(p, t), 5);
        assert!(!net.is_transition_enabled(t, &net.initial_marking()));
    }

    #[test]
    fn every_declared_arc_is_mirrored_in_the_matrices() {
        let mut net = Net::empty();
        let a = net.add_place(place("a", 0)).unwrap();
        let b = net.add_place(place("b", 0)).unwrap();
        let t = net
            .add_transition(Transition::new("t", "t").with_input(a, 1).with_output(b, 2))
            .unwrap();
        net.add_input_arc(t, "a", 2).unwrap();
        net.add_output_arc(t, "a", 1).unwrap();

        for (id, transition) in net.transitions().iter_enumerated() {
            for place in net.places().indices() {
                let declared_in: Weight = transition
                    .inputs()
                    .iter()
                    .filter(|arc| arc.place == place)
                    .map(|arc| arc.weight)
                    .sum();
                let declared_out: Weight = transition
                    .outputs()
                    .iter()
                    .filter(|arc| arc.place == place)
                    .map(|arc| arc.weight)
                    .sum();
                assert_eq!(net.input_weight(place, id), declared_in);
                assert_eq!(net.output_weight(place, id), declared_out);
            }
        }
        assert_eq!(net.input_weight(a, t), 3);
    }

    #[test]
    fn markings_of_another_net_are_refused() {
        let mut small = Net::empty();
        small.add_place(place("p", 1)).unwrap();
        let mut large = small.clone();
        large.add_place(place("q", 0)).unwrap();
        let t = large
            .add_transition(Transition::new("t", "t").with_output(PlaceId::new(1), 1))
            .unwrap();

        let foreign = small.initial_marking();
        assert!(!large.covers(&foreign));
        assert!(!large.is_transition_enabled(t, &foreign));
        assert_eq!(
            large.fire_transition(&foreign, t),
            Err(EngineError::MarkingMismatch {
                expected: 2,
                found: 1
            })
        );
        assert!(large.enabled_transitions(&foreign).is_empty());
    }

    #[test]
    fn self_loop_nets_from_pre_firing_snapshot() {
        let mut net = Net::empty();
        let p = net.add_place(place("p", 2)).unwrap();
        let t = net.add_transition(Transition::new("t", "t")).unwrap();
        net.add_input_arc(t, "p", 2).unwrap();
        net.add_output_arc(t, "p", 3).unwrap();

        let next = net.fire_transition(&net.initial_marking(), t).unwrap();
        assert_eq!(next.tokens(p), 3);
    }

    #[test]
    fn parallel_input_arcs_require_their_sum() {
        let mut net = Net::empty();
        let p = net.add_place(place("p", 1)).unwrap();
        let t = net.add_transition(Transition::new("t", "t")).unwrap();
        net.add_input_arc(t, "p", 1).unwrap();
        net.add_input_arc(t, "p", 1).unwrap();

        let marking = net.initial_marking();
        assert!(!net.is_transition_enabled(t, &marking));
        assert_eq!(
            net.fire_transition(&marking, t),
            Err(EngineError::NotEnabled("t".into()))
        );
        assert_eq!(marking.tokens(p), 1);
    }

    #[test]
    fn builder_rejects_malformed_topology() {
        let mut net = Net::empty();
        net.add_place(place("p", 0)).unwrap();
        assert_eq!(
            net.add_place(place("p", 1)),
            Err(NetError::DuplicatePlace("p".into()))
        );

        let t = net.add_transition(Transition::new("t", "t")).unwrap();
        assert_eq!(
            net.add_transition(Transition::new("t", "again")),
            Err(NetError::DuplicateTransition("t".into()))
        );
        assert_eq!(
            net.add_input_arc(t, "missing", 1),
            Err(NetError::UnknownPlace {
                transition: "t".into(),
                place: "missing".into()
            })
        );
        assert_eq!(
            net.add_output_arc(t, "p", 0),
            Err(NetError::ZeroWeight {
                place: "p".into(),
                transition: "t".into()
            })
        );
        assert_eq!(
            net.add_output_arc(TransitionId::new(9), "p", 1),
            Err(NetError::UnknownTransition(TransitionId::new(9)))
        );
    }

    #[test]
    fn transition_value_arcs_are_validated() {
        let mut net = Net::empty();
        let p = net.add_place(place("p", 0)).unwrap();
        let t = net
            .add_transition(Transition::new("t", "t").with_output(p, 2))
            .unwrap();
        assert_eq!(net.output_weight(p, t), 2);

        let bad = Transition::new("u", "u").with_input(PlaceId::new(7), 1);
        assert!(matches!(
            net.add_transition(bad),
            Err(NetError::UnknownPlace { .. })
        ));
    }

    #[test]
    fn rejected_transition_leaves_net_untouched() {
        let mut net = Net::empty();
        let p = net.add_place(place("p", 0)).unwrap();
        let bad = Transition::new("t", "t").with_input(p, 1).with_output(p, 0);
        assert!(matches!(
            net.add_transition(bad),
            Err(NetError::ZeroWeight { .. })
        ));
        assert_eq!(net.transitions_len(), 0);
        assert_eq!(net.transition_id("t"), None);
    }

    #[test]
    fn foreign_handles_are_unknown() {
        let net = Net::empty();
        let marking = net.initial_marking();
        assert!(!net.is_transition_enabled(TransitionId::new(0), &marking));
        assert!(matches!(
            net.fire_transition(&marking, TransitionId::new(0)),
            Err(EngineError::UnknownTransition(_))
        ));
    }

    #[test]
    fn diagnostics_flag_isolated_and_unreachable_places() {
        let mut net = Net::empty();
        net.add_place(place("lonely", 0)).unwrap();
        net.add_place(place("starved", 0)).unwrap();
        net.add_place(place("sink", 0)).unwrap();
        let t = net.add_transition(Transition::new("t", "t")).unwrap();
        net.add_input_arc(t, "starved", 1).unwrap();
        net.add_output_arc(t, "sink", 1).unwrap();
        net.add_transition(Transition::new("idle", "idle")).unwrap();

        let report = net.diagnose_connectivity();
        assert!(report.has_issues());
        assert_eq!(report.isolated_places, vec![(PlaceId::new(0), "lonely".to_string())]);
        assert_eq!(
            report.isolated_transitions,
            vec![(TransitionId::new(1), "idle".to_string())]
        );
        assert_eq!(report.sinks, vec![(PlaceId::new(2), "sink".to_string())]);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("starved"));
    }

    #[test]
    fn dot_lists_weights_and_tokens() {
        let mut net = Net::empty();
        net.add_place(place("a", 2)).unwrap();
        net.add_place(place("b", 0)).unwrap();
        let t = net.add_transition(Transition::new("t", "move \"two\"")).unwrap();
        net.add_input_arc(t, "a", 2).unwrap();
        net.add_output_arc(t, "b", 1).unwrap();

        let dot = net.to_dot(&net.initial_marking());
        assert!(dot.starts_with("digraph PetriNet {"));
        assert!(dot.contains("place_0 -> trans_0 [label=\"2\"];"));
        assert!(dot.contains("trans_0 -> place_1;"));
        assert!(dot.contains("move \\\"two\\\""));
        assert!(dot.contains("#c8e6c9"));
    }
}
