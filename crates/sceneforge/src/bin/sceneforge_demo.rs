//! # SCENEFORGE Demo
//!
//! Walks a controller through a typical session on the simulated host:
//! boot into the main menu, layer a lobby and HUD on top, swap everything
//! for the arena, then drop the HUD.
//!
//! ## Usage
//!
//! ```bash
//! sceneforge_demo --catalog data/units.toml --latency-ms 40
//! ```

use std::path::PathBuf;
use std::time::Duration;

use sceneforge::{
    logging, App, AppConfig, AppError, AppResult, TokioHostConfig, Transition, TransitionWatcher,
};
use sceneforge_core::{ControllerError, UnitController, UnitId};

const STEP_TIMEOUT: Duration = Duration::from_secs(5);

fn main() {
    logging::init("info");

    // Parse command line arguments (simple parsing, no external deps)
    let args: Vec<String> = std::env::args().collect();
    let mut config = AppConfig::default();
    let mut latency_ms = 50u64;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--catalog" | "-c" => {
                if i + 1 < args.len() {
                    config.catalog_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--latency-ms" | "-l" => {
                if i + 1 < args.len() {
                    latency_ms = args[i + 1].parse().unwrap_or(50);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Usage: sceneforge_demo [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --catalog <PATH>       Unit catalog TOML (default: bundled)");
                println!("  -l, --latency-ms <MS>      Simulated load latency (default: 50)");
                println!("  -h, --help                 Show this help");
                return;
            }
            other => tracing::warn!("ignoring unknown argument {other:?}"),
        }
        i += 1;
    }

    config.host = TokioHostConfig {
        load_latency: Duration::from_millis(latency_ms),
        unload_latency: Duration::from_millis(latency_ms / 2),
        ..TokioHostConfig::default()
    };

    if let Err(err) = run(config) {
        tracing::error!("demo failed: {err}");
        std::process::exit(1);
    }
}

fn run(config: AppConfig) -> AppResult<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("sceneforge-host")
        .enable_time()
        .build()
        .map_err(AppError::Runtime)?;

    let app = App::build(config, runtime.handle().clone())?;
    runtime.block_on(session(app.controller()))
}

fn unit(controller: &UnitController, name: &str) -> AppResult<UnitId> {
    controller
        .catalog()
        .id_of(name)
        .ok_or_else(|| ControllerError::UnknownUnitName(name.to_string()).into())
}

async fn session(controller: UnitController) -> AppResult<()> {
    let events = controller.events();
    for (label, channel) in [
        ("before_load  ", &events.before_load),
        ("before_unload", &events.before_unload),
        ("after_unload ", &events.after_unload),
        ("after_load   ", &events.after_load),
    ] {
        let catalog = controller.catalog().clone();
        channel.subscribe(move |u: &UnitId| {
            tracing::info!("  {label} {}", catalog.name_of(*u).unwrap_or("?"));
        });
    }

    let mut watcher = TransitionWatcher::attach(&controller);
    let menu = unit(&controller, "MainMenu")?;
    let lobby = unit(&controller, "Lobby")?;
    let hud = unit(&controller, "Hud")?;
    let arena = unit(&controller, "Arena")?;

    tracing::info!("boot: exclusive MainMenu");
    controller.load_exclusive(menu)?;
    // Redundant; dispatches nothing.
    controller.load_exclusive(menu)?;
    watcher.wait_for(Transition::Loaded(menu), STEP_TIMEOUT).await?;

    tracing::info!("layer: additive Lobby + Hud");
    controller.load_additive(lobby)?;
    controller.load_additive(hud)?;
    watcher.wait_for(Transition::Loaded(lobby), STEP_TIMEOUT).await?;
    if controller.is_loading(hud) {
        watcher.wait_for(Transition::Loaded(hud), STEP_TIMEOUT).await?;
    }
    report(&controller);

    tracing::info!("swap: exclusive Arena");
    controller.load_exclusive(arena)?;
    watcher.wait_for(Transition::Loaded(arena), STEP_TIMEOUT).await?;
    report(&controller);

    tracing::info!("layer: additive Hud, then unload it");
    controller.load_additive(hud)?;
    watcher.wait_for(Transition::Loaded(hud), STEP_TIMEOUT).await?;
    controller.unload(hud)?;
    watcher.wait_for(Transition::Unloaded(hud), STEP_TIMEOUT).await?;
    report(&controller);

    Ok(())
}

fn report(controller: &UnitController) {
    let names: Vec<&str> = controller
        .active_units()
        .into_iter()
        .filter_map(|u| controller.catalog().name_of(u))
        .collect();
    tracing::info!("active: {names:?}");
}
