//! Meteorite Dashboard
//!
//! CLI commands:
//! - gui: Native dashboard window (animated map, bar chart, heatmap)
//! - map: Fetch one year of map/bar data and print a summary
//! - heatmap: Fetch the composition heatmap and print it
//! - animate: Run the animation headless for a number of ticks

mod animation;
mod chart;
mod client;
mod config;
mod controller;
mod debounce;
mod error;
mod gui;
mod logging;
mod model;
mod state;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use chart::{build_heatmap_spec, build_map_and_bar, ChartSink, ChartSpec, Container};
use client::{ApiClient, DataSource};
use controller::{Controller, ControllerSettings, Event};
use model::{Drilldown, HeatmapGroup, Year};
use state::ViewState;

#[derive(Parser)]
#[command(name = "meteorite_dashboard")]
#[command(about = "Meteorite landing statistics: animated map, categories and composition")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to dashboard.yaml config
    #[arg(short, long, default_value = "dashboard.yaml")]
    config: PathBuf,

    /// Override the API base URL
    #[arg(long)]
    api_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the native dashboard (default)
    Gui,

    /// Print the map and bar data for one year
    Map {
        #[arg(short, long, default_value_t = Year::MIN_VALUE)]
        year: i32,

        /// superclass, megaclass or recclass
        #[arg(short, long)]
        drilldown: Option<Drilldown>,
    },

    /// Print the composition heatmap
    Heatmap {
        /// megaclass or superclass
        #[arg(short, long)]
        group: Option<HeatmapGroup>,
    },

    /// Play the animation without a window
    Animate {
        /// Number of animation ticks before pausing
        #[arg(short, long, default_value = "10")]
        ticks: u32,

        #[arg(short = 'y', long)]
        start_year: Option<i32>,

        #[arg(short, long)]
        drilldown: Option<Drilldown>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = config::Env::load();
    logging::init_logging(&env.log_dir)?;
    tracing::info!("Meteorite Dashboard starting up");

    let cli = Cli::parse();
    tracing::debug!("CLI args parsed: config={:?}", cli.config);

    let mut config = config::Config::load_or_default(&cli.config)?;
    config.apply_env(&env);
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }
    tracing::info!(
        "Config loaded: api={} tick={}ms debounce={}ms",
        config.api.base_url,
        config.timing.tick_ms,
        config.timing.debounce_ms
    );

    match cli.command.unwrap_or(Commands::Gui) {
        Commands::Gui => {
            tracing::info!("Launching native dashboard");
            gui::run_viewer(config)?;
        }

        Commands::Map { year, drilldown } => {
            let drilldown = drilldown.unwrap_or(config.defaults.drilldown);
            print_map(&config, Year::clamped(year), drilldown).await?;
        }

        Commands::Heatmap { group } => {
            let group = group.unwrap_or(config.defaults.heatmap_group);
            print_heatmap(&config, group).await?;
        }

        Commands::Animate {
            ticks,
            start_year,
            drilldown,
        } => {
            if let Some(year) = start_year {
                config.defaults.year = Year::clamped(year);
            }
            if let Some(drilldown) = drilldown {
                config.defaults.drilldown = drilldown;
            }
            animate(&config, ticks).await?;
        }
    }

    Ok(())
}

/// Fetch one year and print the bar chart with its colours
async fn print_map(config: &config::Config, year: Year, drilldown: Drilldown) -> anyhow::Result<()> {
    let client = ApiClient::from_config(&config.api)?;
    let response = client.fetch_map_data(year, drilldown).await?;
    let (map, bar) = build_map_and_bar(year, &response);

    println!("{} ({} landings, by {})", map.title, map.point_count(), drilldown.label());
    println!();
    println!("{}:", bar.title);
    for entry in &bar.bars {
        println!("  {} {:<24} {:>5}", entry.color, entry.label, entry.count);
    }
    println!();
    for trace in &map.traces {
        println!("## {} [{}] - {} markers", trace.name, trace.color, trace.markers.len());
        for marker in &trace.markers {
            println!(
                "  {:<28} {:>8.2},{:>8.2}  {:>10}g  size {:.1}",
                marker.info.name, marker.lat, marker.lon, marker.info.mass, marker.size
            );
        }
    }
    Ok(())
}

/// Fetch and print the heatmap as a table
async fn print_heatmap(config: &config::Config, group: HeatmapGroup) -> anyhow::Result<()> {
    let client = ApiClient::from_config(&config.api)?;
    let heatmap = build_heatmap_spec(&client.fetch_heatmap_data(group).await?);

    println!("{} ({} x {})", heatmap.title, heatmap.rows(), heatmap.columns());
    println!();
    print!("{:<20}", heatmap.y_title);
    for element in &heatmap.x_labels {
        print!(" {:>7}", element);
    }
    println!();
    for (label, row) in heatmap.y_labels.iter().zip(&heatmap.z) {
        print!("{:<20}", label);
        for value in row {
            print!(" {:>7.2}", value);
        }
        println!();
    }
    Ok(())
}

/// Sink for headless runs: renders become log lines
struct LogSink;

impl ChartSink for LogSink {
    fn render(&mut self, container: Container, spec: ChartSpec) {
        match spec {
            ChartSpec::Map(map) => {
                println!("{}: {} landings in {} categories", map.title, map.point_count(), map.traces.len());
            }
            ChartSpec::Bar(bar) => {
                let summary: Vec<String> = bar.bars.iter().map(|b| format!("{}={}", b.label, b.count)).collect();
                println!("  {}", summary.join(", "));
            }
            ChartSpec::Heatmap(heatmap) => {
                println!("{}: {}x{}", heatmap.title, heatmap.rows(), heatmap.columns());
            }
        }
        tracing::debug!("Rendered {:?}", container);
    }
}

/// Run the controller headless: play for `ticks` ticks, then pause and drain
async fn animate(config: &config::Config, ticks: u32) -> anyhow::Result<()> {
    let client = ApiClient::from_config(&config.api)?;
    let settings = ControllerSettings::from_config(config);
    let view = ViewState::from_defaults(&config.defaults);
    let (controller, handle) = Controller::new(settings, view, client, LogSink);
    let task = tokio::spawn(controller.run());

    println!("Animating {} ticks from {} ({})", ticks, view.current_year, view.drilldown.label());
    handle.send(Event::Play);

    let mut snapshots = handle.subscribe();
    let mut seen = 0;
    let mut last_year = view.current_year;
    while seen < ticks {
        if snapshots.changed().await.is_err() {
            break;
        }
        let year = snapshots.borrow_and_update().view.current_year;
        if year != last_year {
            last_year = year;
            seen += 1;
        }
    }

    handle.send(Event::Pause);
    drop(snapshots);
    drop(handle);
    tokio::time::timeout(Duration::from_secs(config.api.timeout_secs + 1), task).await??;
    Ok(())
}
