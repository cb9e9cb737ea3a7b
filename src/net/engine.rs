//! State-level operations over a fixed topology.
use crate::net::core::{EngineError, Net};
use crate::net::ids::{PlaceId, TransitionId};
use crate::net::state::{NetState, now_millis};
use crate::net::structure::{Transition, Weight};

/// Owns an immutable topology and its initial state. Every operation takes
/// the caller's state by reference and returns a new one; the engine keeps
/// no reference to states it hands out.
#[derive(Debug, Clone)]
pub struct PetriNetEngine {
    net: Net,
    initial: NetState,
}

impl PetriNetEngine {
    pub fn new(net: Net) -> Self {
        let initial = NetState::new(net.initial_marking());
        Self { net, initial }
    }

    pub fn net(&self) -> &Net {
        &self.net
    }

    pub fn place_id(&self, key: &str) -> Option<PlaceId> {
        self.net.place_id(key)
    }

    pub fn transition_id(&self, key: &str) -> Option<TransitionId> {
        self.net.transition_id(key)
    }

    pub fn tokens(&self, place_key: &str, state: &NetState) -> Result<Weight, EngineError> {
        let place = self.resolve_place(place_key)?;
        Ok(state.marking().tokens(place))
    }

    pub fn is_enabled(&self, transition: TransitionId, state: &NetState) -> bool {
        self.net.is_transition_enabled(transition, state.marking())
    }

    /// Enabled transitions in declaration order, evaluated against `state`.
    pub fn enabled_transitions(&self, state: &NetState) -> Vec<(TransitionId, &Transition)> {
        self.net
            .enabled_transitions(state.marking())
            .into_iter()
            .map(|id| (id, &self.net.transitions()[id]))
            .collect()
    }

    pub fn fire(&self, transition_key: &str, state: &NetState) -> Result<NetState, EngineError> {
        self.fire_at(transition_key, state, now_millis())
    }

    /// [`fire`](Self::fire) with an explicit timestamp for the history record.
    pub fn fire_at(
        &self,
        transition_key: &str,
        state: &NetState,
        fired_at: u64,
    ) -> Result<NetState, EngineError> {
        let transition = self
            .transition_id(transition_key)
            .ok_or_else(|| EngineError::UnknownTransition(transition_key.to_string()))?;
        let marking = self.net.fire_transition(state.marking(), transition)?;
        let data = &self.net.transitions()[transition];
        let next = state.with_firing(marking, transition, &data.key, &data.name, fired_at);
        log::debug!(
            "fired {} ({}) as #{}: {:?}",
            data.key,
            data.name,
            next.history().len(),
            next.marking()
        );
        Ok(next)
    }

    /// Adds one token. No upper bound is enforced here.
    pub fn add_token(&self, place_key: &str, state: &NetState) -> Result<NetState, EngineError> {
        let place = self.resolve_place(place_key)?;
        self.net.check_marking(state.marking())?;
        let mut marking = state.marking().clone();
        let tokens = marking.tokens_mut(place);
        *tokens = tokens.saturating_add(1);
        log::debug!("added token to {place_key}: now {}", *tokens);
        Ok(state.with_marking(marking))
    }

    /// Removes one token. An empty place yields `NothingToRemove` and the
    /// caller keeps its state.
    pub fn remove_token(&self, place_key: &str, state: &NetState) -> Result<NetState, EngineError> {
        let place = self.resolve_place(place_key)?;
        self.net.check_marking(state.marking())?;
        let mut marking = state.marking().clone();
        let tokens = marking.tokens_mut(place);
        let Some(after) = tokens.checked_sub(1) else {
            return Err(EngineError::NothingToRemove(place_key.to_string()));
        };
        *tokens = after;
        log::debug!("removed token from {place_key}: now {after}");
        Ok(state.with_marking(marking))
    }

    pub fn reset(&self) -> NetState {
        self.initial.clone()
    }

    fn resolve_place(&self, key: &str) -> Result<PlaceId, EngineError> {
        self.place_id(key)
            .ok_or_else(|| EngineError::UnknownPlace(key.to_string()))
    }
}
