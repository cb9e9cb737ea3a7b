//! Write-only snapshot export: JSON, RON and Graphviz DOT.
use std::fs;
use std::path::Path;
use std::str::FromStr;

use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::net::engine::PetriNetEngine;
use crate::net::state::{FiringRecord, NetState};
use crate::net::structure::{PlaceCategory, Weight};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("ron error: {0}")]
    Ron(#[from] ron::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    #[default]
    Json,
    Ron,
    Dot,
}

impl FromStr for SnapshotFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "ron" => Ok(Self::Ron),
            "dot" => Ok(Self::Dot),
            other => Err(format!("unsupported snapshot format `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceView {
    pub key: String,
    pub name: String,
    pub category: PlaceCategory,
    pub tokens: Weight,
}

/// Flattened, self-describing view of a state for display or export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub places: Vec<PlaceView>,
    pub enabled: Vec<String>,
    pub history: Vec<FiringRecord>,
}

impl Snapshot {
    pub fn capture(engine: &PetriNetEngine, state: &NetState) -> Self {
        let net = engine.net();
        let places = net
            .places()
            .iter_enumerated()
            .map(|(id, place)| PlaceView {
                key: place.key.clone(),
                name: place.name.clone(),
                category: place.category,
                tokens: state.marking().tokens(id),
            })
            .collect();
        let enabled = engine
            .enabled_transitions(state)
            .into_iter()
            .map(|(_, t)| t.key.clone())
            .collect();
        Self {
            places,
            enabled,
            history: state.history().to_vec(),
        }
    }
}

pub fn to_json_string<T: Serialize>(value: &T) -> Result<String, IoError> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn to_ron_string<T: Serialize>(value: &T) -> Result<String, IoError> {
    let pretty = PrettyConfig::default().new_line("\n".to_string());
    Ok(ron::ser::to_string_pretty(value, pretty)?)
}

pub fn render(
    engine: &PetriNetEngine,
    state: &NetState,
    format: SnapshotFormat,
) -> Result<String, IoError> {
    match format {
        SnapshotFormat::Json => to_json_string(&Snapshot::capture(engine, state)),
        SnapshotFormat::Ron => to_ron_string(&Snapshot::capture(engine, state)),
        SnapshotFormat::Dot => Ok(engine.net().to_dot(state.marking())),
    }
}

pub fn write_snapshot<P: AsRef<Path>>(
    path: P,
    engine: &PetriNetEngine,
    state: &NetState,
    format: SnapshotFormat,
) -> Result<(), IoError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, render(engine, state, format)?)?;
    Ok(())
}
