//! Parsing options.
//! Flags come from `PN_FLAGS` first, then the command line; a later
//! single-valued flag overrides an earlier one, `--fire` lists accumulate.

use clap::{Arg, ArgAction, Command, value_parser};
use thiserror::Error;

use crate::controller::TickPreset;
use crate::net::io::SnapshotFormat;

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("cannot split flags: {0}")]
    Split(#[from] shellwords::MismatchedQuotes),
    #[error(transparent)]
    Clap(#[from] clap::Error),
}

fn make_options_parser() -> clap::Command {
    Command::new("pn-sim")
        .no_binary_name(true)
        .about("Workshop Petri net simulator")
        .version(env!("CARGO_PKG_VERSION"))
        .args_override_self(true)
        .arg(
            Arg::new("speed")
                .short('s')
                .long("speed")
                .help("Auto-run tick interval preset")
                .value_parser(TickPreset::ALL.map(TickPreset::as_str)),
        )
        .arg(
            Arg::new("ticks")
                .short('n')
                .long("ticks")
                .help("Number of auto-run ticks (0 disables auto-run)")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .help("Seed for the random choice of transitions")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("fire")
                .short('f')
                .long("fire")
                .value_name("T1,T2,...")
                .help("Transitions to fire, in order, before auto-run")
                .value_delimiter(',')
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("stop-when-dead")
                .long("stop-when-dead")
                .help("End auto-run once no transition is enabled")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Write the final snapshot to FILE instead of stdout"),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .help("Snapshot format")
                .value_parser(["json", "ron", "dot"]),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file"),
        )
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Options {
    pub speed: Option<TickPreset>,
    pub ticks: Option<usize>,
    pub seed: Option<u64>,
    pub fire: Vec<String>,
    pub stop_when_dead: bool,
    pub output: Option<String>,
    pub format: Option<SnapshotFormat>,
    pub config: Option<String>,
}

impl Options {
    pub fn parse_from_str(s: &str) -> Result<Self, OptionsError> {
        let flags = shellwords::split(s)?;
        Self::parse_from_args(&flags)
    }

    pub fn parse_from_args(flags: &[String]) -> Result<Self, OptionsError> {
        let matches = make_options_parser().try_get_matches_from(flags.iter())?;

        // Both parsers only admit values listed in `value_parser` above.
        let speed = matches
            .get_one::<String>("speed")
            .and_then(|s| s.parse::<TickPreset>().ok());
        let format = matches
            .get_one::<String>("format")
            .and_then(|s| s.parse::<SnapshotFormat>().ok());

        let fire = matches
            .get_many::<String>("fire")
            .map(|keys| {
                keys.map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Options {
            speed,
            ticks: matches.get_one::<usize>("ticks").copied(),
            seed: matches.get_one::<u64>("seed").copied(),
            fire,
            stop_when_dead: matches.get_flag("stop-when-dead"),
            output: matches.get_one::<String>("output").cloned(),
            format,
            config: matches.get_one::<String>("config").cloned(),
        })
    }
}
