#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a scripted battle and prints its log.

mod config;
mod level;
mod log;
mod script;

use std::{
    fs,
    io::{self, Read},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::Parser;
use tactics_core::{Command, Event};
use tactics_system_battle::BattleController;
use tactics_world::{self as world, query, World};

use crate::{config::Config, log::BattleLog};

/// Plays a turn-based tactics battle headlessly.
#[derive(Debug, Parser)]
#[command(name = "tactics", version, about)]
struct Cli {
    /// Level text file to load.
    #[arg(long)]
    level: PathBuf,
    /// Optional TOML file overriding battle timing and character stats.
    #[arg(long)]
    config: Option<PathBuf>,
    /// File with one `click X Y` or `end` per line. Reads stdin when omitted.
    #[arg(long)]
    script: Option<PathBuf>,
}

/// Entry point for the tactics command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    let level_text = fs::read_to_string(&cli.level)
        .with_context(|| format!("failed to read level {}", cli.level.display()))?;
    let layout = level::parse(&level_text, config.stats())
        .with_context(|| format!("failed to parse level {}", cli.level.display()))?;
    let mut world = World::from_layout(&layout)
        .with_context(|| format!("level {} is not playable", cli.level.display()))?;
    let (columns, rows) = query::dimensions(&world);
    tracing::info!(
        columns,
        rows,
        units = layout.placements.len(),
        "level loaded"
    );

    let script = match &cli.script {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            let _ = io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read script from stdin")?;
            buffer
        }
    };

    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::ConfigureStepDuration {
            step_duration: config.step_duration(),
        },
        &mut events,
    );
    let log = BattleLog::new(&query::unit_view(&world));
    let mut controller = BattleController::new(world, &mut events);
    print_events(&log, &mut events);

    for (index, line) in script.lines().enumerate() {
        let Some(intent) = script::parse_line(index + 1, line)? else {
            continue;
        };
        tracing::debug!(?intent, "intent");
        controller.handle(intent, &mut events);
        while controller.is_busy() {
            controller.advance(config.tick(), &mut events);
        }
        print_events(&log, &mut events);
    }

    match controller.outcome() {
        Some(outcome) => tracing::info!(player_won = outcome.player_won(), "battle finished"),
        None => tracing::info!("script ended before the battle was decided"),
    }
    Ok(())
}

fn print_events(log: &BattleLog, events: &mut Vec<Event>) {
    for event in events.drain(..) {
        if let Some(line) = log.describe(&event) {
            println!("{line}");
        }
    }
}
