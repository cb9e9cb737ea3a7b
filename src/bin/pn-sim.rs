use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use workshop_pn::config::{DEFAULT_CONFIG_FILE, SimConfig};
use workshop_pn::controller::SimulationController;
use workshop_pn::net::io;
use workshop_pn::options::{Options, OptionsError};
use workshop_pn::workshop;

fn init_logger() {
    if std::env::var("PN_LOG").is_ok() {
        let e = env_logger::Env::new()
            .filter("PN_LOG")
            .write_style("PN_LOG_STYLE");
        env_logger::init_from_env(e);
    }
}

fn collect_flags() -> Result<Vec<String>> {
    let env_flags = std::env::var("PN_FLAGS").unwrap_or_default();
    let mut flags = shellwords::split(&env_flags).context("Failed to split PN_FLAGS")?;
    flags.extend(std::env::args().skip(1));
    Ok(flags)
}

fn main() -> Result<()> {
    init_logger();

    let flags = collect_flags()?;
    let options = match Options::parse_from_args(&flags) {
        Ok(options) => options,
        // Covers --help and --version as well as usage errors.
        Err(OptionsError::Clap(err)) => err.exit(),
        Err(err) => return Err(err.into()),
    };
    debug!("PN options: {:?}", options);

    let config_path = options.config.as_deref().unwrap_or(DEFAULT_CONFIG_FILE);
    let mut config = SimConfig::load_from_file(config_path)?;
    config.apply(&options);
    debug!("PN config: {:?}", config);

    let engine = workshop::engine().context("Failed to build the workshop net")?;
    engine.net().log_diagnostics();

    let mut controller =
        SimulationController::new(engine, config.speed, config.seed).stop_when_dead(config.stop_when_dead);

    for key in &options.fire {
        match controller.fire(key) {
            Ok(state) => info!("fired {key}: {:?}", state.marking()),
            Err(err) => warn!("skipped {key}: {err}"),
        }
    }

    if config.ticks > 0 {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .enable_io()
            .build()
            .context("Failed to start the timer runtime")?;
        let ticks = config.ticks;
        let summary = runtime.block_on(async {
            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_interrupt.cancel();
                }
            });
            controller.run(cancel, Some(ticks)).await
        });
        info!(
            "{} ticks, {} firings, {} idle",
            summary.ticks, summary.fired, summary.idle
        );
    }

    match options.output.as_deref() {
        Some(path) => {
            io::write_snapshot(Path::new(path), controller.engine(), controller.state(), config.format)
                .with_context(|| format!("Failed to write snapshot to {path}"))?;
            info!("snapshot written to {path}");
        }
        None => println!(
            "{}",
            io::render(controller.engine(), controller.state(), config.format)?
        ),
    }

    Ok(())
}
