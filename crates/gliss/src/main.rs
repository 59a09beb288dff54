//! gliss - play, render and inspect partition notation
//!
//! Subcommands:
//! - `gliss check [partition]` - Parse and list chords
//! - `gliss schedule [partition]` - Print the timeline of one pass
//! - `gliss render [partition] -o out.wav` - Render passes to a WAV file
//! - `gliss play [partition]` - Drive the transport on a virtual output
//! - `gliss config` - Show the effective configuration
//!
//! With no partition argument and no `--file`, the built-in demo melody is
//! used.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glissconf::{ConfigSources, GlissConfig};

mod commands;
mod demo;

#[derive(Parser)]
#[command(name = "gliss")]
#[command(about = "Schedule and play compact chord/glide notation")]
#[command(version)]
struct Cli {
    /// Config file to use instead of ./glissando.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Read the partition from a file
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    /// Tempo in quarter-note beats per minute
    #[arg(long, global = true)]
    tempo: Option<f64>,

    /// Seconds of silence before the first chord
    #[arg(long, global = true)]
    lead_in: Option<f64>,

    /// Play the partition once instead of looping
    #[arg(long, global = true)]
    no_loop: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a partition and list its chords
    Check {
        /// Partition text (e.g. "c,d,(e,g)*2")
        partition: Option<String>,
    },

    /// Print the scheduled timeline of one pass
    Schedule {
        partition: Option<String>,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Render one or more passes to a WAV file
    Render {
        partition: Option<String>,

        /// Output WAV path
        #[arg(short, long)]
        output: PathBuf,

        /// Number of back-to-back passes
        #[arg(short, long, default_value = "1")]
        passes: usize,
    },

    /// Play on a virtual output device, logging chords as they sound
    Play {
        partition: Option<String>,

        /// Seconds of device clock time to play
        #[arg(short, long, default_value = "10")]
        seconds: f64,

        /// Schedule pass by pass instead of looping a rendered buffer
        #[arg(long)]
        live: bool,
    },

    /// Show the effective configuration and where it came from
    Config,
}

impl Cli {
    fn load_config(&self) -> Result<(GlissConfig, ConfigSources)> {
        let (mut config, sources) = GlissConfig::load_with_sources_from(self.config.as_deref())
            .context("Failed to load configuration")?;

        if let Some(tempo) = self.tempo {
            config.playback.tempo = tempo;
        }
        if let Some(lead_in) = self.lead_in {
            config.playback.lead_in_seconds = lead_in;
        }
        if self.no_loop {
            config.playback.looping = false;
        }
        config.validate().context("Invalid command-line override")?;

        Ok((config, sources))
    }

    /// Partition text from the argument, `--file`, or the demo.
    fn partition_text(&self, argument: Option<&str>) -> Result<String> {
        if let Some(text) = argument {
            return Ok(text.to_string());
        }
        if let Some(path) = &self.file {
            return std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read partition file {}", path.display()));
        }
        Ok(demo::DEMO_PARTITION.to_string())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (mut config, sources) = cli.load_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&config.telemetry.log_level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match &cli.command {
        Commands::Check { partition } => {
            let text = cli.partition_text(partition.as_deref())?;
            commands::check(&text, &config)?;
        }
        Commands::Schedule { partition, json } => {
            let text = cli.partition_text(partition.as_deref())?;
            commands::schedule(&text, &config, *json)?;
        }
        Commands::Render {
            partition,
            output,
            passes,
        } => {
            let text = cli.partition_text(partition.as_deref())?;
            commands::render(&text, &config, output, *passes).await?;
        }
        Commands::Play {
            partition,
            seconds,
            live,
        } => {
            let text = cli.partition_text(partition.as_deref())?;
            if *live {
                config.playback.mode = glissconf::PlaybackMode::Live;
            }
            commands::play(&text, config, *seconds).await?;
        }
        Commands::Config => {
            commands::show_config(&config, &sources);
        }
    }

    Ok(())
}
