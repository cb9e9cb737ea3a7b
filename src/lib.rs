//! Workshop Petri net simulator: a weighted place/transition net engine, the
//! hard-coded workshop production net, and a timer-driven controller that
//! auto-fires randomly chosen enabled transitions.
#![warn(non_snake_case)]

pub mod config;
pub mod controller;
pub mod net;
pub mod options;
pub mod workshop;
