//! # Place/transition net core
//!
//! Let `P` be the set of places and `T` the set of transitions. Arcs define
//! the input and output matrices `Pre, Post ∈ ℕ^{|P|×|T|}` (parallel arcs
//! add up). For a marking `M ∈ ℕ^{|P|}`:
//!
//! * `t ∈ T` is **enabled** iff `∀p ∈ P: M[p] ≥ Pre[p, t]`; a transition
//!   without input arcs is always enabled;
//! * **firing** an enabled `t` yields `M' = M - Pre[:, t] + Post[:, t]`,
//!   computed from `M` as a whole, so a place on both sides of `t` ends at
//!   `M[p] - Pre[p, t] + Post[p, t]`.
//!
//! [`Net`] works on bare markings. [`PetriNetEngine`] wraps a fixed net and
//! works on [`NetState`] values (marking plus firing history), addressing
//! places and transitions by their string keys.
//!
//! ## Example
//!
//! ```rust
//! use workshop_pn::net::*;
//!
//! let mut net = Net::empty();
//! net.add_place(Place::new("idle", "Idle", 1, PlaceCategory::Resource)).unwrap();
//! net.add_place(Place::new("busy", "Busy", 0, PlaceCategory::Process)).unwrap();
//! let start = net.add_transition(Transition::new("start", "Start")).unwrap();
//! net.add_input_arc(start, "idle", 1).unwrap();
//! net.add_output_arc(start, "busy", 1).unwrap();
//!
//! let engine = PetriNetEngine::new(net);
//! let state = engine.reset();
//! let next = engine.fire("start", &state).unwrap();
//! assert_eq!(engine.tokens("idle", &next), Ok(0));
//! assert_eq!(engine.tokens("busy", &next), Ok(1));
//! assert_eq!(next.history().len(), 1);
//! assert!(engine.fire("start", &next).is_err());
//! ```

pub mod core;
pub mod engine;
pub mod ids;
pub mod incidence;
pub mod index_vec;
pub mod io;
pub mod state;
pub mod structure;

pub use self::core::{DiagnosticReport, EngineError, Net, NetError};
pub use engine::PetriNetEngine;
pub use ids::{PlaceId, TransitionId};
pub use incidence::Incidence;
pub use index_vec::{Idx, IndexVec};
pub use state::{FiringRecord, History, NetState};
pub use structure::{Arc, ArcList, Marking, Place, PlaceCategory, Transition, Weight};
