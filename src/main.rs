//! sensorflow demo runner
//!
//! Loads an experiment (or the bundled damped-oscillator demo), feeds its
//! source buffers from a synthetic producer thread, and logs the derived
//! buffers once the run is over.

use anyhow::{Context, Result};
use sensorflow::pipeline::SchedulerEvent;
use sensorflow::{DataBuffer, ExperimentConfig, Session};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEMO_EXPERIMENT: &str = include_str!("../demos/damped_oscillator.toml");

const SAMPLE_RATE_HZ: f64 = 1000.0;
const BATCH_SIZE: usize = 10;
const RUNTIME: Duration = Duration::from_secs(2);

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sensorflow=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => ExperimentConfig::load(&path)
            .with_context(|| format!("Failed to load experiment {path}"))?,
        None => ExperimentConfig::from_toml_str(DEMO_EXPERIMENT)
            .context("Bundled demo experiment is invalid")?,
    };

    let mut session = Session::from_config(&config)?;
    tracing::info!(
        "Running '{}' for {:?}",
        session.title().unwrap_or("untitled"),
        RUNTIME
    );

    let sources: Vec<Arc<DataBuffer>> = session
        .pipeline()
        .map(|pipeline| {
            pipeline
                .plan()
                .sources
                .iter()
                .filter_map(|&id| session.registry().shared(id))
                .filter(|buffer| !buffer.is_static())
                .collect()
        })
        .unwrap_or_default();
    if sources.is_empty() {
        tracing::warn!("Experiment has no source buffers to feed");
    }

    session.start()?;
    let producer = std::thread::Builder::new()
        .name("producer".into())
        .spawn(move || produce(&sources, RUNTIME))
        .context("Failed to spawn producer thread")?;

    let mut waves = 0usize;
    let mut executed = 0usize;
    while !producer.is_finished() {
        for event in session.events() {
            if let SchedulerEvent::WaveComplete(stats) = event {
                waves += 1;
                executed += stats.executed;
            }
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    let samples = producer
        .join()
        .map_err(|_| anyhow::anyhow!("Producer thread panicked"))?;

    // Pick up whatever the last frame left behind.
    session.evaluate_now();
    std::thread::sleep(Duration::from_millis(50));
    session.stop()?;

    tracing::info!(
        "Produced {} samples; {} waves ran {} modules",
        samples,
        waves,
        executed
    );
    for buffer in session.registry().iter() {
        tracing::info!(
            "{:>14}: {:>5} samples, last = {:?}, range = {:?}",
            buffer.name(),
            buffer.len(),
            buffer.last(),
            buffer.extrema().map(|e| (e.min, e.max))
        );
    }

    Ok(())
}

/// Write a damped oscillation into `sources` in real time.
///
/// A buffer named `time` receives timestamps; every other source receives
/// the signal. Returns the number of samples written per buffer.
fn produce(sources: &[Arc<DataBuffer>], runtime: Duration) -> usize {
    let start = Instant::now();
    let period = Duration::from_secs_f64(BATCH_SIZE as f64 / SAMPLE_RATE_HZ);
    let mut n = 0usize;

    while start.elapsed() < runtime {
        let times: Vec<f64> = (n..n + BATCH_SIZE)
            .map(|i| i as f64 / SAMPLE_RATE_HZ)
            .collect();
        let signal: Vec<f64> = times
            .iter()
            .map(|t| (-0.5 * t).exp() * (std::f64::consts::TAU * 1.5 * t).sin())
            .collect();
        n += BATCH_SIZE;

        for buffer in sources {
            let values = if buffer.name() == "time" {
                times.clone()
            } else {
                signal.clone()
            };
            buffer.append_all_deferred(values);
        }
        std::thread::sleep(period);
    }

    for buffer in sources {
        buffer.flush();
    }
    n
}
