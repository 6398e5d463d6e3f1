//! Audio input and spectrum analysis
//!
//! Captures the default (or named) input device and reduces it to a short
//! byte spectrum each frame for the scene animation.

mod analyser;
mod monitor;
mod source;
mod system_input;
mod types;

pub use analyser::{db_to_byte, FrequencyAnalyser};
pub use monitor::AudioMonitor;
pub use source::{AudioRingBuffer, AudioSource, AudioSourceState, BufferedAudioSource};
pub use system_input::SystemAudioInput;
pub use types::{AnalyserConfig, AudioBuffer, AudioError};
