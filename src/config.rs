use std::time::Duration;

use crate::error::ConfigError;

pub const RING_BUFFER_SIZE: usize = 8192;

pub const SAMPLE_RATE: u32 = 44100;
pub const BUFFER_SIZE: usize = 2048;
pub const BAR_COUNT: usize = 32;

pub const SENSITIVITY: f32 = 1.5;
pub const SMOOTHING: f32 = 0.7;
pub const BASS_BOOST: f32 = 1.2;
pub const MIN_FREQ: f32 = 20.0;
pub const MAX_FREQ: f32 = 20000.0;

pub const FPS: u32 = 60;
pub const AUTO_SOURCE: &str = "auto";

/// Bins below this fraction of the bin count get the bass boost.
pub const BASS_CUTOFF: f32 = 0.1;
/// Divisor applied after the square-root compression.
pub const NORMALIZE_DIVISOR: f32 = 100.0;

/// Snapshot of everything the capture/analysis pipeline consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// `"auto"` or the exact name of an input device
    pub audio_source: String,
    pub sample_rate: u32,
    /// Capture buffer size and FFT size
    pub buffer_size: usize,
    pub bar_count: usize,
    pub sensitivity: f32,
    /// 0.0 = no smoothing, 1.0 = frozen bars
    pub smoothing: f32,
    pub bass_boost: f32,
    pub min_freq: f32,
    pub max_freq: f32,
    pub fps: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            audio_source: AUTO_SOURCE.to_string(),
            sample_rate: SAMPLE_RATE,
            buffer_size: BUFFER_SIZE,
            bar_count: BAR_COUNT,
            sensitivity: SENSITIVITY,
            smoothing: SMOOTHING,
            bass_boost: BASS_BOOST,
            min_freq: MIN_FREQ,
            max_freq: MAX_FREQ,
            fps: FPS,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::SampleRate);
        }
        if self.buffer_size < 2 {
            return Err(ConfigError::BufferSize(self.buffer_size));
        }
        if self.buffer_size > RING_BUFFER_SIZE {
            return Err(ConfigError::BufferExceedsRing {
                buffer_size: self.buffer_size,
                ring_size: RING_BUFFER_SIZE,
            });
        }
        if self.bar_count == 0 {
            return Err(ConfigError::BarCount);
        }
        if self.fps == 0 {
            return Err(ConfigError::Fps);
        }
        if !self.min_freq.is_finite() || self.min_freq <= 0.0 {
            return Err(ConfigError::MinFreq(self.min_freq));
        }

        let nyquist = self.sample_rate as f32 / 2.0;
        if !self.max_freq.is_finite() || self.max_freq <= self.min_freq || self.max_freq > nyquist {
            return Err(ConfigError::MaxFreq {
                min: self.min_freq,
                max: self.max_freq,
                nyquist,
            });
        }
        if !(0.0..=1.0).contains(&self.smoothing) {
            return Err(ConfigError::Smoothing(self.smoothing));
        }
        if !self.sensitivity.is_finite() || self.sensitivity < 0.0 {
            return Err(ConfigError::Sensitivity(self.sensitivity));
        }
        if !self.bass_boost.is_finite() || self.bass_boost < 0.0 {
            return Err(ConfigError::BassBoost(self.bass_boost));
        }

        Ok(())
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / self.fps.max(1) as u64)
    }

    pub fn uses_default_source(&self) -> bool {
        self.audio_source.eq_ignore_ascii_case(AUTO_SOURCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(config.uses_default_source());
        assert_eq!(config.bar_count, 32);
        assert_eq!(config.buffer_size, 2048);
    }

    #[test]
    fn test_frame_interval() {
        let config = Config {
            fps: 50,
            ..Config::default()
        };
        assert_eq!(config.frame_interval(), Duration::from_millis(20));
    }

    #[test]
    fn test_rejects_inverted_range() {
        let config = Config {
            min_freq: 5000.0,
            max_freq: 1000.0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::MaxFreq { .. })));
    }

    #[test]
    fn test_rejects_max_above_nyquist() {
        let config = Config {
            sample_rate: 16000,
            max_freq: 9000.0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::MaxFreq { .. })));
    }

    #[test]
    fn test_rejects_bad_values() {
        let zero_bars = Config {
            bar_count: 0,
            ..Config::default()
        };
        assert_eq!(zero_bars.validate(), Err(ConfigError::BarCount));

        let smoothing = Config {
            smoothing: 1.5,
            ..Config::default()
        };
        assert_eq!(smoothing.validate(), Err(ConfigError::Smoothing(1.5)));

        let min_freq = Config {
            min_freq: 0.0,
            ..Config::default()
        };
        assert_eq!(min_freq.validate(), Err(ConfigError::MinFreq(0.0)));

        let buffer = Config {
            buffer_size: 1,
            ..Config::default()
        };
        assert_eq!(buffer.validate(), Err(ConfigError::BufferSize(1)));

        let fps = Config {
            fps: 0,
            ..Config::default()
        };
        assert_eq!(fps.validate(), Err(ConfigError::Fps));
    }
}
