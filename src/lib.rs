//! Real-time audio-to-spectrum pipeline for terminal visualizers.
//!
//! The capture backend writes interleaved samples into a [`SampleRing`], the
//! [`FrameDriver`] pulls one window per frame, runs it through the
//! [`SpectrumAnalyzer`] and hands the bar magnitudes to a [`Renderer`].

pub mod audio;
pub mod config;
pub mod error;

pub use audio::{CaptureStream, FrameDriver, Renderer, SampleRing, SampleSink, SpectrumAnalyzer};
pub use config::Config;
pub use error::{CaptureError, ConfigError, Error};
