pub mod devices;
pub mod driver;
pub mod processor;
pub mod ring;

pub use devices::{CaptureStream, SampleSink};
pub use driver::{FrameDriver, FrameStats, Renderer, RunSummary};
pub use processor::SpectrumAnalyzer;
pub use ring::SampleRing;
