//! Audio types shared across the audio module

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Audio capture failures. None of these stop the installation; the
/// analyser falls back to a silent spectrum.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no default input device")]
    NoDefaultDevice,

    #[error("input device '{0}' not found")]
    DeviceNotFound(String),

    #[error("failed to enumerate input devices: {0}")]
    Enumerate(#[from] cpal::DevicesError),

    #[error("failed to query input config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start input stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),
}

/// Frequency analyser settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyserConfig {
    /// Samples per FFT; the spectrum has half as many bins
    pub fft_size: usize,
    /// Time smoothing constant in 0.0-1.0
    pub smoothing: f32,
    /// Level mapped to byte 0
    pub min_db: f32,
    /// Level mapped to byte 255
    pub max_db: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: 64,
            smoothing: 0.89,
            min_db: -100.0,
            max_db: -10.0,
        }
    }
}

impl AnalyserConfig {
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }
}

/// Audio sample buffer for processing
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Interleaved f32 samples
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u32,
}

impl AudioBuffer {
    pub fn new(sample_rate: u32, channels: u32) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate,
            channels,
        }
    }

    /// Downmix to mono if stereo/multi-channel
    pub fn to_mono(&self) -> Vec<f32> {
        if self.channels <= 1 {
            return self.samples.clone();
        }

        let channels = self.channels as usize;
        self.samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }
}
