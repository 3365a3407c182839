use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace};

use crate::audio::processor::SpectrumAnalyzer;
use crate::audio::ring::SampleRing;
use crate::config::Config;
use crate::error::ConfigError;

/// Receives one frame of bar magnitudes, lowest frequency first, each in `[0, 1]`.
///
/// The slice is only valid for the duration of the call.
pub trait Renderer {
    fn render(&mut self, magnitudes: &[f32]);
}

impl<F: FnMut(&[f32])> Renderer for F {
    fn render(&mut self, magnitudes: &[f32]) {
        self(magnitudes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    /// Real samples pulled from the ring; the rest of the window was silence
    pub samples_read: usize,
    pub processing: Duration,
    pub overran: bool,
}

impl FrameStats {
    pub fn underfilled(&self, window_len: usize) -> bool {
        self.samples_read < window_len
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub underrun_frames: u64,
    pub overruns: u64,
}

/// Pulls a window from the ring, analyzes it and hands the bars to a renderer at a steady rate.
pub struct FrameDriver {
    ring: Arc<SampleRing>,
    analyzer: SpectrumAnalyzer,
    window: Vec<f32>,
    magnitudes: Vec<f32>,
    frame_interval: Duration,
}

impl FrameDriver {
    pub fn new(ring: Arc<SampleRing>, analyzer: SpectrumAnalyzer, frame_interval: Duration) -> Self {
        let window = vec![0.0; analyzer.window_len()];
        let magnitudes = vec![0.0; analyzer.bar_count()];

        Self {
            ring,
            analyzer,
            window,
            magnitudes,
            frame_interval,
        }
    }

    pub fn from_config(ring: Arc<SampleRing>, config: &Config) -> Result<Self, ConfigError> {
        let analyzer = SpectrumAnalyzer::new(config)?;
        Ok(Self::new(ring, analyzer, config.frame_interval()))
    }

    /// Run one frame without sleeping.
    pub fn tick<R: Renderer + ?Sized>(&mut self, renderer: &mut R) -> FrameStats {
        let start = Instant::now();

        let samples_read = self.ring.read(&mut self.window);
        self.analyzer.analyze_into(&self.window, &mut self.magnitudes);
        renderer.render(&self.magnitudes);

        let processing = start.elapsed();
        trace!(samples_read, ?processing, "frame");

        FrameStats {
            samples_read,
            processing,
            overran: processing > self.frame_interval,
        }
    }

    /// Tick until `running` is cleared, sleeping out the rest of each frame interval.
    ///
    /// The flag is only checked between frames. A frame that overruns its budget is
    /// followed immediately by the next one; nothing is skipped or caught up.
    pub fn run<R: Renderer + ?Sized>(&mut self, renderer: &mut R, running: &AtomicBool) -> RunSummary {
        let mut summary = RunSummary::default();
        let window_len = self.window.len();

        while running.load(Ordering::Acquire) {
            let stats = self.tick(renderer);

            summary.frames += 1;
            if stats.underfilled(window_len) {
                summary.underrun_frames += 1;
            }

            match self.frame_interval.checked_sub(stats.processing) {
                Some(remaining) if !remaining.is_zero() => thread::sleep(remaining),
                _ => {
                    summary.overruns += 1;
                    debug!(processing = ?stats.processing, budget = ?self.frame_interval, "frame overran");
                }
            }
        }

        info!(
            frames = summary.frames,
            underrun_frames = summary.underrun_frames,
            overruns = summary.overruns,
            overwritten = self.ring.overwritten(),
            "frame driver stopped"
        );

        summary
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }

    pub fn analyzer(&self) -> &SpectrumAnalyzer {
        &self.analyzer
    }

    pub fn analyzer_mut(&mut self) -> &mut SpectrumAnalyzer {
        &mut self.analyzer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn test_config() -> Config {
        Config {
            sample_rate: 44100,
            buffer_size: 1024,
            bar_count: 8,
            smoothing: 0.0,
            bass_boost: 1.0,
            fps: 100,
            ..Config::default()
        }
    }

    fn stereo_sine(freq: f32, frames: usize, sample_rate: u32) -> Vec<f32> {
        (0..frames)
            .flat_map(|i| {
                let s = (2.0 * PI * freq * i as f32 / sample_rate as f32).sin();
                [s, s]
            })
            .collect()
    }

    #[test]
    fn test_tick_on_empty_ring_renders_silence() {
        let config = test_config();
        let ring = Arc::new(SampleRing::new(4096));
        let mut driver = FrameDriver::from_config(ring, &config).unwrap();

        let mut frames: Vec<Vec<f32>> = Vec::new();
        let stats = driver.tick(&mut |bars: &[f32]| frames.push(bars.to_vec()));

        assert_eq!(stats.samples_read, 0);
        assert!(stats.underfilled(config.buffer_size));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), 8);
        assert!(frames[0].iter().all(|b| b.abs() < 1e-6));
    }

    #[test]
    fn test_tick_consumes_one_window() {
        let config = test_config();
        let ring = Arc::new(SampleRing::new(4096));
        ring.write(&stereo_sine(1000.0, 1500, config.sample_rate), 2);

        let mut driver = FrameDriver::from_config(Arc::clone(&ring), &config).unwrap();
        let mut peak = 0.0f32;
        let stats = driver.tick(&mut |bars: &[f32]| {
            peak = bars.iter().copied().fold(0.0, f32::max);
        });

        assert_eq!(stats.samples_read, 1024);
        assert!(!stats.underfilled(1024));
        assert_eq!(ring.available(), 1500 - 1024);
        assert!(peak > 0.0);
        assert_eq!(driver.magnitudes().len(), 8);
    }

    #[test]
    fn test_run_stops_when_flag_clears() {
        let config = test_config();
        let ring = Arc::new(SampleRing::new(4096));
        let mut driver = FrameDriver::from_config(ring, &config).unwrap();

        let running = AtomicBool::new(true);
        let mut rendered = 0;
        let started = Instant::now();
        let summary = driver.run(
            &mut |_: &[f32]| {
                rendered += 1;
                if rendered == 3 {
                    running.store(false, Ordering::Release);
                }
            },
            &running,
        );

        assert_eq!(summary.frames, 3);
        assert_eq!(summary.underrun_frames, 3);
        assert_eq!(rendered, 3);
        // Every frame sleeps out its budget
        assert!(started.elapsed() >= driver.frame_interval() * 2);
    }

    #[test]
    fn test_run_does_not_start_when_stopped() {
        let ring = Arc::new(SampleRing::new(4096));
        let mut driver = FrameDriver::from_config(ring, &test_config()).unwrap();

        let running = AtomicBool::new(false);
        let mut rendered = 0;
        let summary = driver.run(&mut |_: &[f32]| rendered += 1, &running);
        assert_eq!(summary, RunSummary::default());
        assert_eq!(rendered, 0);
    }

    #[test]
    fn test_invalid_config_fails_construction() {
        let config = Config {
            bar_count: 0,
            ..test_config()
        };
        let ring = Arc::new(SampleRing::new(4096));
        assert!(FrameDriver::from_config(ring, &config).is_err());
    }
}
