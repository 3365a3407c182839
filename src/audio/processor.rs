use std::ops::RangeInclusive;
use std::sync::Arc;

use apodize::hanning_iter;
use rustfft::{Fft, FftPlanner, num_complex::Complex32};
use tracing::debug;

use crate::config::{BASS_CUTOFF, Config, NORMALIZE_DIVISOR};
use crate::error::ConfigError;

/// Turns fixed-size sample windows into log-spaced, smoothed bar magnitudes in `[0, 1]`.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    fft_buffer: Vec<Complex32>,
    fft_scratch: Vec<Complex32>,
    window: Vec<f32>,
    bar_bins: Vec<RangeInclusive<usize>>,
    band_edges: Vec<(f32, f32)>,
    bass_cutoff: f32,
    prev_magnitudes: Vec<f32>,
    sample_rate: u32,
    sensitivity: f32,
    smoothing: f32,
    bass_boost: f32,
}

impl SpectrumAnalyzer {
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let fft_size = config.buffer_size;
        let fft = FftPlanner::new().plan_fft_forward(fft_size);
        let scratch_len = fft.get_inplace_scratch_len();

        let (bar_bins, band_edges) = Self::create_log_bars(config);
        let num_bins = fft_size / 2 + 1;

        debug!(
            fft_size,
            bars = config.bar_count,
            min_freq = config.min_freq,
            max_freq = config.max_freq,
            "spectrum analyzer ready"
        );
        for (bar, bins) in bar_bins.iter().enumerate() {
            debug!(bar, start = *bins.start(), end = *bins.end(), "bar bins");
        }

        Ok(Self {
            fft,
            fft_buffer: vec![Complex32::new(0.0, 0.0); fft_size],
            fft_scratch: vec![Complex32::new(0.0, 0.0); scratch_len],
            window: hanning_iter(fft_size).map(|x| x as f32).collect(),
            bar_bins,
            band_edges,
            bass_cutoff: num_bins as f32 * BASS_CUTOFF,
            prev_magnitudes: vec![0.0; config.bar_count],
            sample_rate: config.sample_rate,
            sensitivity: config.sensitivity,
            smoothing: config.smoothing,
            bass_boost: config.bass_boost,
        })
    }

    /// Split `[min_freq, max_freq]` into equal-width bands in log-frequency space and
    /// map each band to an inclusive range of FFT bins. Every range holds at least one bin.
    fn create_log_bars(config: &Config) -> (Vec<RangeInclusive<usize>>, Vec<(f32, f32)>) {
        let fft_size = config.buffer_size;
        let bar_count = config.bar_count;
        let freq_per_bin = config.sample_rate as f32 / fft_size as f32;
        let num_bins = fft_size / 2 + 1;

        let min_bin = (config.min_freq / freq_per_bin) as usize;
        let max_bin = ((config.max_freq / freq_per_bin) as usize).min(num_bins - 1);

        let log_min = config.min_freq.max(1.0).ln();
        let log_max = config.max_freq.ln();
        let log_range = log_max - log_min;

        let mut bins = Vec::with_capacity(bar_count);
        let mut edges = Vec::with_capacity(bar_count);
        for bar in 0..bar_count {
            let low = (log_min + log_range * bar as f32 / bar_count as f32).exp();
            let high = (log_min + log_range * (bar + 1) as f32 / bar_count as f32).exp();

            let mut start_bin = ((low / freq_per_bin) as usize).max(min_bin);
            let end_bin = ((high / freq_per_bin) as usize).min(max_bin);

            // Narrow bands can collapse below one bin
            if start_bin >= end_bin {
                start_bin = end_bin.saturating_sub(1);
            }

            bins.push(start_bin..=end_bin);
            edges.push((low, high));
        }

        (bins, edges)
    }

    /// Analyze one window and return a freshly allocated magnitude per bar.
    pub fn analyze(&mut self, window: &[f32]) -> Vec<f32> {
        let mut magnitudes = vec![0.0; self.bar_count()];
        self.analyze_into(window, &mut magnitudes);
        magnitudes
    }

    /// Analyze one window into `magnitudes` without allocating.
    ///
    /// # Panics
    /// If `window` is not exactly the FFT size or `magnitudes` is not exactly the bar count.
    pub fn analyze_into(&mut self, window: &[f32], magnitudes: &mut [f32]) {
        assert_eq!(
            window.len(),
            self.window.len(),
            "analysis window must match the FFT size"
        );
        assert_eq!(
            magnitudes.len(),
            self.prev_magnitudes.len(),
            "magnitude output must match the bar count"
        );

        // Apply Hann window
        for ((slot, &sample), &coeff) in self.fft_buffer.iter_mut().zip(window).zip(&self.window) {
            *slot = Complex32::new(sample * coeff, 0.0);
        }

        // Perform FFT
        self.fft
            .process_with_scratch(&mut self.fft_buffer, &mut self.fft_scratch);

        for (bar, bins) in self.bar_bins.iter().enumerate() {
            let mut sum = 0.0;
            let mut count = 0;

            for bin in bins.clone() {
                let mut mag = self.fft_buffer[bin].norm();
                if (bin as f32) < self.bass_cutoff {
                    mag *= self.bass_boost;
                }
                sum += mag;
                count += 1;
            }

            let mut magnitude = if count > 0 { sum / count as f32 } else { 0.0 };

            magnitude *= self.sensitivity;
            magnitude = (magnitude.sqrt() / NORMALIZE_DIVISOR).clamp(0.0, 1.0);

            // Exponential moving average per bar
            let smoothed =
                self.prev_magnitudes[bar] * self.smoothing + magnitude * (1.0 - self.smoothing);
            self.prev_magnitudes[bar] = smoothed;
            magnitudes[bar] = smoothed;
        }
    }

    /// Forget the smoothing history.
    pub fn reset(&mut self) {
        self.prev_magnitudes.fill(0.0);
    }

    pub fn bar_count(&self) -> usize {
        self.prev_magnitudes.len()
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frequency edges (Hz) of a bar's log band.
    pub fn band_range(&self, bar: usize) -> Option<(f32, f32)> {
        self.band_edges.get(bar).copied()
    }

    /// Inclusive FFT bin range averaged into a bar.
    pub fn bar_bins(&self, bar: usize) -> Option<RangeInclusive<usize>> {
        self.bar_bins.get(bar).cloned()
    }
}
