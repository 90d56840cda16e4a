#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs the Endless Runway generator headlessly.

mod logging;
mod simulation;

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use endless_runway_core::{
    Event, GenerationConfig, SegmentName, SegmentType, SimulationStatus, SpawnKind, Vec2,
};
use endless_runway_system_generation::GenerationLoop;
use endless_runway_world::query::{self, GenerationSnapshot};
use serde::Serialize;

use crate::{
    logging::LogFormat,
    simulation::{MemoryPooler, Runner, Track},
};

/// Headless runner for the endless level generator.
#[derive(Debug, Parser)]
#[command(about = "Headless runner for the endless level generator")]
struct Cli {
    /// Level configuration in TOML
    #[arg(long, default_value = "config/level.toml")]
    config: PathBuf,

    /// Number of simulation ticks to run
    #[arg(long, default_value_t = 600)]
    ticks: u32,

    /// Simulated milliseconds per tick
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,

    /// Overrides the seed from the configuration
    #[arg(long)]
    seed: Option<u64>,

    /// Horizontal scroll speed in world units per second
    #[arg(long, default_value_t = 8.0)]
    scroll_speed: f32,

    /// Airborne time of a normal jump in seconds
    #[arg(long, default_value_t = 0.6)]
    jump_time: f32,

    /// Distance kept visible ahead of the viewpoint
    #[arg(long, default_value_t = 60.0)]
    window_ahead: f32,

    /// Distance kept visible behind the viewpoint
    #[arg(long, default_value_t = 20.0)]
    window_behind: f32,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Prints the run report as JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct PlacedSegment {
    name: SegmentName,
    segment_type: SegmentType,
    kind: SpawnKind,
    position: Vec2,
    gap_distance: f32,
}

#[derive(Debug, Serialize)]
struct RunReport {
    ticks: u32,
    distance_traveled: f32,
    placements: Vec<PlacedSegment>,
    recycled: usize,
    instances_created: u32,
    instances_live: usize,
    stages_advanced: usize,
    snapshot: GenerationSnapshot,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_format, "info");

    let mut config = load_config(&cli.config)?;
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    let report = run(&cli, config)?;
    if cli.json {
        let rendered =
            serde_json::to_string_pretty(&report).context("failed to serialize run report")?;
        println!("{rendered}");
    } else {
        print_report(&report);
    }
    Ok(())
}

fn load_config(path: &Path) -> Result<GenerationConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read level configuration {}", path.display()))?;
    GenerationConfig::from_toml_str(&contents)
        .with_context(|| format!("failed to parse level configuration {}", path.display()))
}

fn run(cli: &Cli, config: GenerationConfig) -> Result<RunReport> {
    let runner = Runner {
        jump_time: cli.jump_time,
        scroll_speed: cli.scroll_speed,
    };
    let mut track = Track::new(cli.scroll_speed, cli.window_ahead, cli.window_behind);
    let mut pooler = MemoryPooler::from_config(&config);
    tracing::info!(seed = config.seed, segments = config.segments.len(), "starting run");

    let mut generation =
        GenerationLoop::new(config, &runner).context("failed to build generation loop")?;
    let dt = Duration::from_millis(cli.tick_ms);
    let mut events = Vec::new();
    let mut inside_checkpoint = false;

    for tick in 0..cli.ticks {
        generation
            .tick(dt, &track, &mut pooler, &runner, &mut events)
            .with_context(|| format!("generation failed on tick {tick}"))?;
        track.advance(dt.as_secs_f32());

        for instance in pooler.release_behind(track.near_edge()) {
            generation.on_instance_exited_window(instance, &mut events)?;
        }

        if !query::is_spawning_blocked(generation.level()) {
            continue;
        }
        let Some(checkpoint) = query::current_segment(generation.level()) else {
            continue;
        };
        let (entry, exit) = (checkpoint.entry_position().x, checkpoint.exit_position().x);
        if !inside_checkpoint && track.distance_traveled() >= entry {
            inside_checkpoint = true;
            generation.enter_checkpoint(track.distance_traveled(), &mut events)?;
        } else if inside_checkpoint && track.distance_traveled() >= exit {
            inside_checkpoint = false;
            generation.exit_checkpoint(&mut events)?;
        }
    }

    Ok(summarize(cli.ticks, &track, &pooler, &generation, &events))
}

fn summarize(
    ticks: u32,
    track: &Track,
    pooler: &MemoryPooler,
    generation: &GenerationLoop,
    events: &[Event],
) -> RunReport {
    let mut placements = Vec::new();
    let mut recycled = 0;
    let mut stages_advanced = 0;
    for event in events {
        match event {
            Event::SegmentPlaced {
                name,
                segment_type,
                placement,
                kind,
                ..
            } => placements.push(PlacedSegment {
                name: name.clone(),
                segment_type: *segment_type,
                kind: *kind,
                position: placement.position,
                gap_distance: placement.gap_distance,
            }),
            Event::SegmentRecycled { .. } => recycled += 1,
            Event::StageAdvanced { .. } => stages_advanced += 1,
            _ => {}
        }
    }

    RunReport {
        ticks,
        distance_traveled: track.distance_traveled(),
        placements,
        recycled,
        instances_created: pooler.created(),
        instances_live: pooler.live_count(),
        stages_advanced,
        snapshot: query::snapshot(generation.level()),
    }
}

fn print_report(report: &RunReport) {
    println!(
        "{} ticks, {:.1} units traveled",
        report.ticks, report.distance_traveled
    );
    for placed in &report.placements {
        println!(
            "  {:<10} {:<16} {:?} x={:.2} y={:.2} gap={:.2}",
            format!("{:?}", placed.kind).to_lowercase(),
            placed.name.as_str(),
            placed.segment_type,
            placed.position.x,
            placed.position.y,
            placed.gap_distance,
        );
    }

    let snapshot = &report.snapshot;
    println!(
        "placed {} segments, recycled {}, {} instances created, {} live",
        report.placements.len(),
        report.recycled,
        report.instances_created,
        report.instances_live
    );
    println!(
        "stage {} (length {:.1}, advanced {} times), difficulty {}, active {}/{}",
        snapshot.stage.get(),
        snapshot.stage_length,
        report.stages_advanced,
        snapshot.difficulty.get(),
        snapshot.active_segments,
        snapshot.max_active_segments
    );
    println!(
        "height level {}, last gap {:?}, medium gap {:.2}, spawning blocked: {}",
        snapshot.height_level.get(),
        snapshot.gap,
        snapshot.medium_gap,
        snapshot.spawning_blocked
    );
}
