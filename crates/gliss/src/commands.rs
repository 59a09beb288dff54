//! Subcommand implementations.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use glissando::{
    emit_timeline, BackendError, EnvelopeShape, OfflineContext, OfflineRenderer, PlaybackMode,
    Scheduler, SineRenderer, Timeline, TransportController, VirtualOutput,
};
use glissconf::{ConfigSources, GlissConfig};
use partition::Partition;
use tracing::info;

/// How often `play` samples the device clock.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

fn parse(text: &str, config: &GlissConfig) -> Result<Partition> {
    partition::parse(text, config.playback.tempo).context("Failed to parse partition")
}

fn scheduler(config: &GlissConfig) -> Scheduler {
    Scheduler::new(EnvelopeShape::from(&config.envelope))
}

fn format_stages(stages: &[Vec<f64>]) -> String {
    stages
        .iter()
        .map(|stage| {
            let notes: Vec<String> = stage.iter().map(|f| format!("{:.2}", f)).collect();
            format!("({})", notes.join(", "))
        })
        .collect::<Vec<_>>()
        .join(" -> ")
}

pub fn check(text: &str, config: &GlissConfig) -> Result<()> {
    let partition = parse(text, config)?;

    for (index, chord) in partition.iter().enumerate() {
        let sound = if chord.is_rest() {
            "rest".to_string()
        } else {
            format_stages(&chord.frequency_stages)
        };
        println!(
            "{:>4}  {:<24} {:>7.3}s  {}",
            index, chord.source, chord.duration_seconds, sound
        );
    }
    println!(
        "{} chords, {:.3}s per pass at {} bpm",
        partition.len(),
        partition.total_duration(),
        partition.tempo
    );
    Ok(())
}

pub fn schedule(text: &str, config: &GlissConfig, json: bool) -> Result<()> {
    let partition = parse(text, config)?;
    let timeline = scheduler(config).timeline(&partition, config.playback.lead_in_seconds);

    if json {
        println!("{}", serde_json::to_string_pretty(&timeline)?);
        return Ok(());
    }

    for event in &timeline.events {
        let path: Vec<String> = event
            .frequency_path
            .points
            .iter()
            .map(|p| format!("{:.2}@{:.3}", p.frequency, p.time))
            .collect();
        println!(
            "chord {:>3}  {:>8.3} - {:>8.3}  amp {:.3}  {}",
            event.chord_index,
            event.start_time,
            event.end_time,
            event.amplitude,
            path.join(" ")
        );
    }
    println!(
        "{} events over {:.3}s ({:.3} - {:.3})",
        timeline.events.len(),
        timeline.duration(),
        timeline.start,
        timeline.end
    );
    Ok(())
}

pub async fn render(text: &str, config: &GlissConfig, output: &Path, passes: usize) -> Result<()> {
    if passes == 0 {
        bail!("--passes must be at least 1");
    }

    let partition = parse(text, config)?;
    let timeline = scheduler(config).timeline(&partition, 0.0);

    let mut context = OfflineContext::new(partition.total_duration());
    emit_timeline(&timeline, &mut context)?;

    let renderer = SineRenderer::new(config.playback.sample_rate);
    let pass = renderer.render_offline(context).await?;
    let buffer = pass.repeated(passes);

    buffer
        .write_wav(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!(
        "Rendered {} pass(es), {} frames at {} Hz, peak {:.3} -> {}",
        passes,
        buffer.frames(),
        buffer.sample_rate,
        buffer.peak(),
        output.display()
    );
    Ok(())
}

pub async fn play(text: &str, config: GlissConfig, seconds: f64) -> Result<()> {
    let sample_rate = config.playback.sample_rate;
    let provider = move || -> std::result::Result<VirtualOutput, BackendError> {
        Ok(VirtualOutput::new(sample_rate))
    };

    let mode = config.playback.mode;
    let pass = scheduler(&config).timeline(&parse(text, &config)?, 0.0);
    let mut transport = TransportController::new(provider, config, text);
    transport.start().await?;

    let device = transport
        .device()
        .ok_or_else(|| anyhow!("Transport started without an output device"))?;

    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    let mut last = 0.0;
    let mut current_slot = None;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            _ = ticker.tick() => {}
        }

        let now = transport.now();
        match mode {
            PlaybackMode::Live => log_fired_tones(&device, last, now)?,
            PlaybackMode::Rendered => {
                current_slot = log_slot_change(&device, &pass, now, current_slot)?;
            }
        }
        last = now;

        if transport.poll_live().await?.is_some() {
            break;
        }
        if now >= seconds {
            break;
        }
    }

    transport.stop();
    Ok(())
}

fn log_fired_tones(device: &Arc<Mutex<VirtualOutput>>, from: f64, to: f64) -> Result<()> {
    let output = device
        .lock()
        .map_err(|_| anyhow!("Output device lock poisoned"))?;
    for tone in output.tones_starting_between(from, to) {
        info!(
            "{:>8.3}s  tone {:?}  {:.2} Hz{}",
            tone.start,
            tone.id,
            tone.path.initial_frequency(),
            if tone.path.is_glide() {
                format!(" -> {:.2} Hz", tone.path.final_frequency())
            } else {
                String::new()
            }
        );
    }
    Ok(())
}

fn log_slot_change(
    device: &Arc<Mutex<VirtualOutput>>,
    pass: &Timeline,
    now: f64,
    current: Option<usize>,
) -> Result<Option<usize>> {
    let output = device
        .lock()
        .map_err(|_| anyhow!("Output device lock poisoned"))?;
    let Some(position) = output.buffer().and_then(|b| b.position_at(now)) else {
        return Ok(current);
    };

    let slot = pass.slot_at(position).copied();
    let index = slot.map(|s| s.index);
    if index != current {
        if let Some(slot) = slot {
            let what = if slot.rest { "rest" } else { "chord" };
            info!("{:>8.3}s  {} {} ({:.3}s into pass)", now, what, slot.index, position);
        }
    }
    Ok(index)
}

pub fn show_config(config: &GlissConfig, sources: &ConfigSources) {
    if sources.files.is_empty() {
        println!("# no config files loaded");
    }
    for file in &sources.files {
        println!("# loaded: {}", file.display());
    }
    for var in &sources.env_overrides {
        println!("# env override: {}", var);
    }
    println!();
    print!("{}", config.to_toml());
}
