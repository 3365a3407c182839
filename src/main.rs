use std::io::{self, BufRead};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use audiovis::audio::devices::input_device_names;
use audiovis::config::RING_BUFFER_SIZE;
use audiovis::{CaptureStream, Config, FrameDriver, Renderer, SampleRing, SampleSink};

#[derive(Parser, Debug)]
#[command(name = "audiovis", about = "Live audio spectrum bars", version)]
struct Cli {
    /// Input device name, or "auto" for the default device
    #[arg(long)]
    source: Option<String>,
    #[arg(long)]
    sample_rate: Option<u32>,
    /// Capture buffer and FFT size in samples
    #[arg(long)]
    buffer_size: Option<usize>,
    #[arg(long)]
    bars: Option<usize>,
    #[arg(long)]
    fps: Option<u32>,
    #[arg(long)]
    sensitivity: Option<f32>,
    /// Temporal smoothing, 0.0-1.0
    #[arg(long)]
    smoothing: Option<f32>,
    #[arg(long)]
    bass_boost: Option<f32>,
    #[arg(long)]
    min_freq: Option<f32>,
    #[arg(long)]
    max_freq: Option<f32>,
    /// Stop after this many seconds instead of waiting for `q` or EOF on stdin
    #[arg(long)]
    duration: Option<f64>,
    /// Print input device names and exit
    #[arg(long)]
    list_devices: bool,
}

impl Cli {
    fn to_config(&self) -> Config {
        let defaults = Config::default();

        Config {
            audio_source: self.source.clone().unwrap_or(defaults.audio_source),
            sample_rate: self.sample_rate.unwrap_or(defaults.sample_rate),
            buffer_size: self.buffer_size.unwrap_or(defaults.buffer_size),
            bar_count: self.bars.unwrap_or(defaults.bar_count),
            sensitivity: self.sensitivity.unwrap_or(defaults.sensitivity),
            smoothing: self.smoothing.unwrap_or(defaults.smoothing),
            bass_boost: self.bass_boost.unwrap_or(defaults.bass_boost),
            min_freq: self.min_freq.unwrap_or(defaults.min_freq),
            max_freq: self.max_freq.unwrap_or(defaults.max_freq),
            fps: self.fps.unwrap_or(defaults.fps),
        }
    }
}

/// Stands in for a screen: reports the loudest bar and the mean level about once a second.
struct LevelLog {
    last_report: Instant,
    frames: u32,
}

impl LevelLog {
    fn new() -> Self {
        Self {
            last_report: Instant::now(),
            frames: 0,
        }
    }
}

impl Renderer for LevelLog {
    fn render(&mut self, magnitudes: &[f32]) {
        self.frames += 1;
        if self.last_report.elapsed() < Duration::from_secs(1) {
            return;
        }

        let (peak_bar, peak) = magnitudes
            .iter()
            .copied()
            .enumerate()
            .fold((0, 0.0f32), |best, (i, m)| if m > best.1 { (i, m) } else { best });
        let mean = magnitudes.iter().sum::<f32>() / magnitudes.len().max(1) as f32;

        info!(fps = self.frames, peak_bar, peak, mean, "levels");
        self.frames = 0;
        self.last_report = Instant::now();
    }
}

fn spawn_stop_trigger(running: Arc<AtomicBool>, duration: Option<f64>) {
    match duration {
        Some(secs) => {
            thread::spawn(move || {
                thread::sleep(Duration::from_secs_f64(secs.max(0.0)));
                running.store(false, Ordering::Release);
            });
        }
        None => {
            thread::spawn(move || {
                for line in io::stdin().lock().lines() {
                    match line {
                        Ok(line) if !line.trim().eq_ignore_ascii_case("q") => continue,
                        _ => break,
                    }
                }
                running.store(false, Ordering::Release);
            });
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let host = cpal::default_host();

    if cli.list_devices {
        for name in input_device_names(&host).context("Failed to list input devices")? {
            println!("{}", name);
        }
        return Ok(());
    }

    let config = cli.to_config();
    config.validate().context("Invalid configuration")?;

    let ring = Arc::new(SampleRing::new(RING_BUFFER_SIZE));
    let mut driver =
        FrameDriver::from_config(Arc::clone(&ring), &config).context("Failed to initialize FFT")?;

    let sink: Arc<dyn SampleSink> = ring.clone();
    let capture =
        CaptureStream::start(&host, &config, sink).context("Failed to initialize audio capture")?;

    let running = Arc::new(AtomicBool::new(true));
    spawn_stop_trigger(Arc::clone(&running), cli.duration);

    info!(
        device = capture.device_name(),
        bars = config.bar_count,
        fps = config.fps,
        "visualizer running"
    );
    let summary = driver.run(&mut LevelLog::new(), &running);

    // Callbacks stop before the ring goes away
    capture.stop();
    info!(
        frames = summary.frames,
        overwritten = ring.overwritten(),
        underruns = ring.underruns(),
        "session ended"
    );

    Ok(())
}
