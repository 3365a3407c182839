use std::sync::{Mutex, MutexGuard, PoisonError};

use ringbuf::HeapRb;
use ringbuf::traits::{Consumer, Observer, RingBuffer};

use crate::config::RING_BUFFER_SIZE;

struct RingState {
    samples: HeapRb<f32>,
    overwritten: u64,
    underruns: u64,
}

/// Fixed-capacity mono sample store shared by the capture callback and the frame driver.
///
/// Writes never block on a full buffer: the oldest unread sample is overwritten.
/// Reads never wait for data: missing samples are padded with silence.
pub struct SampleRing {
    state: Mutex<RingState>,
    capacity: usize,
}

impl SampleRing {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be non-zero");

        Self {
            state: Mutex::new(RingState {
                samples: HeapRb::new(capacity),
                overwritten: 0,
                underruns: 0,
            }),
            capacity,
        }
    }

    // A panic on another thread must not stop audio from flowing.
    fn lock(&self) -> MutexGuard<'_, RingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Downmix interleaved frames to mono and append them.
    ///
    /// At most the first two channels of each frame are summed, the sum is divided
    /// by `channel_count`. A trailing partial frame is ignored.
    pub fn write(&self, samples: &[f32], channel_count: usize) {
        assert!(channel_count > 0, "channel count must be non-zero");
        let mixed = channel_count.min(2);

        let mut state = self.lock();
        for frame in samples.chunks_exact(channel_count) {
            let sample = frame[..mixed].iter().sum::<f32>() / channel_count as f32;

            if state.samples.push_overwrite(sample).is_some() {
                state.overwritten += 1;
            }
        }
    }

    /// Move up to `out.len()` samples into `out`, oldest first.
    ///
    /// Returns how many samples were really available; the rest of `out` is zeroed.
    pub fn read(&self, out: &mut [f32]) -> usize {
        let read = {
            let mut state = self.lock();
            let read = state.samples.pop_slice(out);
            if read < out.len() {
                state.underruns += 1;
            }
            read
        };

        out[read..].fill(0.0);
        read
    }

    pub fn available(&self) -> usize {
        self.lock().samples.occupied_len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        while state.samples.try_pop().is_some() {}
    }

    /// Samples dropped by the drop-oldest policy since creation.
    pub fn overwritten(&self) -> u64 {
        self.lock().overwritten
    }

    /// Reads that had to be padded with silence.
    pub fn underruns(&self) -> u64 {
        self.lock().underruns
    }
}

impl Default for SampleRing {
    fn default() -> Self {
        Self::new(RING_BUFFER_SIZE)
    }
}
