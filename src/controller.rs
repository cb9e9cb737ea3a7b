//! Owner of the live simulation state and the auto-run timer loop.
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::net::{
    EngineError, FiringRecord, NetState, PetriNetEngine, Transition, TransitionId, Weight,
};

/// Auto-run speeds offered to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TickPreset {
    Slow,
    #[default]
    Normal,
    Fast,
    VeryFast,
}

impl TickPreset {
    pub const ALL: [TickPreset; 4] = [Self::Slow, Self::Normal, Self::Fast, Self::VeryFast];

    pub fn interval(self) -> Duration {
        match self {
            Self::Slow => Duration::from_millis(2000),
            Self::Normal => Duration::from_millis(1000),
            Self::Fast => Duration::from_millis(500),
            Self::VeryFast => Duration::from_millis(250),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Slow => "slow",
            Self::Normal => "normal",
            Self::Fast => "fast",
            Self::VeryFast => "very-fast",
        }
    }
}

impl fmt::Display for TickPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TickPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.as_str() == s)
            .ok_or_else(|| format!("unknown speed `{s}`"))
    }
}

/// Outcome of one [`SimulationController::run`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: usize,
    pub fired: usize,
    /// Ticks that found nothing to fire.
    pub idle: usize,
    pub cancelled: bool,
}

pub struct SimulationController {
    engine: PetriNetEngine,
    state: NetState,
    rng: StdRng,
    preset: TickPreset,
    stop_when_dead: bool,
}

impl SimulationController {
    /// A `seed` makes the random choice of auto-run reproducible.
    pub fn new(engine: PetriNetEngine, preset: TickPreset, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let state = engine.reset();
        Self {
            engine,
            state,
            rng,
            preset,
            stop_when_dead: false,
        }
    }

    /// End [`run`](Self::run) early once no transition is enabled.
    pub fn stop_when_dead(mut self, stop: bool) -> Self {
        self.stop_when_dead = stop;
        self
    }

    pub fn engine(&self) -> &PetriNetEngine {
        &self.engine
    }

    pub fn state(&self) -> &NetState {
        &self.state
    }

    pub fn preset(&self) -> TickPreset {
        self.preset
    }

    /// Takes effect on the next [`run`](Self::run).
    pub fn set_preset(&mut self, preset: TickPreset) {
        self.preset = preset;
    }

    pub fn enabled(&self) -> Vec<(TransitionId, &Transition)> {
        self.engine.enabled_transitions(&self.state)
    }

    /// On error the current state is kept as it was.
    pub fn fire(&mut self, transition_key: &str) -> Result<&NetState, EngineError> {
        self.state = self.engine.fire(transition_key, &self.state)?;
        Ok(&self.state)
    }

    /// Returns the new token count.
    pub fn add_token(&mut self, place_key: &str) -> Result<Weight, EngineError> {
        self.state = self.engine.add_token(place_key, &self.state)?;
        self.engine.tokens(place_key, &self.state)
    }

    /// Returns the new token count.
    pub fn remove_token(&mut self, place_key: &str) -> Result<Weight, EngineError> {
        self.state = self.engine.remove_token(place_key, &self.state)?;
        self.engine.tokens(place_key, &self.state)
    }

    pub fn reset(&mut self) {
        log::debug!("reset to initial marking");
        self.state = self.engine.reset();
    }

    /// One auto-run step: pick an enabled transition uniformly at random and
    /// fire it. `None` when nothing is enabled or the firing was refused.
    pub fn tick(&mut self) -> Option<FiringRecord> {
        let enabled = self.engine.enabled_transitions(&self.state);
        let Some((_, transition)) = enabled.choose(&mut self.rng) else {
            log::debug!("tick: no enabled transition");
            return None;
        };
        let key = transition.key.clone();

        match self.engine.fire(&key, &self.state) {
            Ok(next) => {
                self.state = next;
                self.state.last_firing().cloned()
            }
            Err(err) => {
                log::warn!("tick: {err}");
                None
            }
        }
    }

    /// Ticks at a fixed interval until `max_ticks` ticks have elapsed, the
    /// token is cancelled, or (with `stop_when_dead`) the net is dead. Firings
    /// do not restart the interval.
    pub async fn run(&mut self, cancel: CancellationToken, max_ticks: Option<usize>) -> RunSummary {
        let mut summary = RunSummary::default();
        let period = self.preset.interval();
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        log::info!("auto-run started ({}, every {:?})", self.preset, period);

        loop {
            if max_ticks.is_some_and(|max| summary.ticks >= max) {
                break;
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    summary.cancelled = true;
                    break;
                }
                _ = interval.tick() => {}
            }

            summary.ticks += 1;
            match self.tick() {
                Some(record) => {
                    summary.fired += 1;
                    log::debug!("tick {}: fired {}", summary.ticks, record.key);
                }
                None => {
                    summary.idle += 1;
                    if self.stop_when_dead && self.enabled().is_empty() {
                        log::info!("auto-run stopped: no transition enabled");
                        break;
                    }
                }
            }
        }

        log::info!(
            "auto-run finished: {} ticks, {} firings{}",
            summary.ticks,
            summary.fired,
            if summary.cancelled { ", cancelled" } else { "" }
        );
        summary
    }
}
