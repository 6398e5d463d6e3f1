//! Audio source trait and the shared capture buffer

use super::types::AudioBuffer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Trait for audio input sources
pub trait AudioSource {
    /// Human-readable display name
    fn display_name(&self) -> String;

    fn sample_rate(&self) -> u32;

    fn channels(&self) -> u32;

    /// Check if source is currently capturing
    fn is_active(&self) -> bool;

    /// Copy the most recent `frames` frames without consuming them.
    /// Returns None when the buffer cannot be read.
    fn snapshot(&self, frames: usize) -> Option<AudioBuffer>;

    fn stop(&self);
}

/// State shared between a capture thread and the frame loop
pub struct AudioSourceState {
    /// Whether the capture callback should store samples
    pub running: AtomicBool,
    /// Whether source is actively receiving data
    pub active: AtomicBool,
    pub buffer: Mutex<AudioRingBuffer>,
}

impl AudioSourceState {
    pub fn new(buffer_size: usize, sample_rate: u32, channels: u32) -> Self {
        Self {
            running: AtomicBool::new(false),
            active: AtomicBool::new(false),
            buffer: Mutex::new(AudioRingBuffer::new(buffer_size, sample_rate, channels)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }

    /// Store samples from a capture callback
    pub fn push(&self, samples: &[f32]) {
        if !self.is_running() {
            return;
        }
        if let Ok(mut buffer) = self.buffer.lock() {
            buffer.write(samples);
        }
    }

    /// Copy the latest frames out under the lock
    pub fn snapshot(&self, frames: usize) -> Option<AudioBuffer> {
        let guard = self.buffer.lock().ok()?;
        let channels = guard.channels().max(1);
        let mut buffer = AudioBuffer::new(guard.sample_rate(), channels);
        guard.latest(frames * channels as usize, &mut buffer.samples);
        Some(buffer)
    }
}

/// Source fed from another thread through [`AudioSourceState::push`]
pub struct BufferedAudioSource {
    name: String,
    state: Arc<AudioSourceState>,
}

impl BufferedAudioSource {
    pub fn new(name: impl Into<String>, capacity: usize, sample_rate: u32, channels: u32) -> Self {
        let state = Arc::new(AudioSourceState::new(capacity, sample_rate, channels));
        state.set_running(true);
        state.set_active(true);
        Self {
            name: name.into(),
            state,
        }
    }

    /// Get the shared state for passing to producer threads
    pub fn state(&self) -> Arc<AudioSourceState> {
        Arc::clone(&self.state)
    }
}

impl AudioSource for BufferedAudioSource {
    fn display_name(&self) -> String {
        self.name.clone()
    }

    fn sample_rate(&self) -> u32 {
        self.state
            .buffer
            .lock()
            .map(|b| b.sample_rate())
            .unwrap_or(48000)
    }

    fn channels(&self) -> u32 {
        self.state.buffer.lock().map(|b| b.channels()).unwrap_or(1)
    }

    fn is_active(&self) -> bool {
        self.state.is_active()
    }

    fn snapshot(&self, frames: usize) -> Option<AudioBuffer> {
        self.state.snapshot(frames)
    }

    fn stop(&self) {
        self.state.set_running(false);
        self.state.set_active(false);
        if let Ok(mut buffer) = self.state.buffer.lock() {
            buffer.clear();
        }
    }
}

/// Simple ring buffer for audio samples
pub struct AudioRingBuffer {
    data: Vec<f32>,
    write_pos: usize,
    capacity: usize,
    sample_rate: u32,
    channels: u32,
    /// Samples written so far, capped at capacity
    filled: usize,
}

impl AudioRingBuffer {
    pub fn new(capacity: usize, sample_rate: u32, channels: u32) -> Self {
        let capacity = capacity.max(1);
        Self {
            data: vec![0.0; capacity],
            write_pos: 0,
            capacity,
            sample_rate,
            channels,
            filled: 0,
        }
    }

    /// Write samples, overwriting the oldest when full
    pub fn write(&mut self, samples: &[f32]) {
        for &sample in samples {
            self.data[self.write_pos] = sample;
            self.write_pos = (self.write_pos + 1) % self.capacity;
        }
        self.filled = (self.filled + samples.len()).min(self.capacity);
    }

    /// Copy the newest `count` samples, oldest first. Missing history is
    /// padded with leading zeros so the output always has `count` samples.
    pub fn latest(&self, count: usize, output: &mut Vec<f32>) {
        output.clear();
        output.reserve(count);

        let available = count.min(self.filled);
        output.resize(count - available, 0.0);

        let start = (self.write_pos + self.capacity - available) % self.capacity;
        for i in 0..available {
            output.push(self.data[(start + i) % self.capacity]);
        }
    }

    /// Samples held in the buffer
    pub fn available(&self) -> usize {
        self.filled
    }

    pub fn clear(&mut self) {
        self.write_pos = 0;
        self.filled = 0;
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }
}
