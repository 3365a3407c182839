use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("sample rate must be greater than zero")]
    SampleRate,
    #[error("buffer size must be at least 2 samples, got {0}")]
    BufferSize(usize),
    #[error("buffer size {buffer_size} does not fit in the {ring_size}-sample ring buffer")]
    BufferExceedsRing { buffer_size: usize, ring_size: usize },
    #[error("bar count must be greater than zero")]
    BarCount,
    #[error("fps must be greater than zero")]
    Fps,
    #[error("minimum frequency must be positive, got {0} Hz")]
    MinFreq(f32),
    #[error("maximum frequency {max} Hz must be above {min} Hz and at most Nyquist ({nyquist} Hz)")]
    MaxFreq { min: f32, max: f32, nyquist: f32 },
    #[error("smoothing must be within 0.0..=1.0, got {0}")]
    Smoothing(f32),
    #[error("sensitivity must be a non-negative number, got {0}")]
    Sensitivity(f32),
    #[error("bass boost must be a non-negative number, got {0}")]
    BassBoost(f32),
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device available")]
    NoDevice,
    #[error("input device '{0}' not found")]
    DeviceNotFound(String),
    #[error("failed to enumerate input devices: {0}")]
    Devices(#[from] cpal::DevicesError),
    #[error("failed to get input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),
    #[error("input device doesn't support F32 format (got {0:?})")]
    SampleFormat(cpal::SampleFormat),
    #[error("failed to build input stream: {0}")]
    Build(#[from] cpal::BuildStreamError),
    #[error("failed to start input stream: {0}")]
    Play(#[from] cpal::PlayStreamError),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
}
