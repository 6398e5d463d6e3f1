//! Microphone capture through cpal

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};

use super::source::{AudioSource, AudioSourceState};
use super::types::{AudioBuffer, AudioError};

/// Ring capacity in samples (~100ms at 48kHz stereo)
const RING_CAPACITY: usize = 48000 * 2 / 10;

/// Input device feeding interleaved f32 samples into a shared ring
pub struct SystemAudioInput {
    state: Arc<AudioSourceState>,
    device: cpal::Device,
    config: cpal::SupportedStreamConfig,
    stream: Option<cpal::Stream>,
    device_name: String,
}

impl SystemAudioInput {
    /// Open an input device by name, or the host default for None
    pub fn open(device_name: Option<&str>) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = match device_name {
            Some(name) => find_device(&host, name)?,
            None => host.default_input_device().ok_or(AudioError::NoDefaultDevice)?,
        };

        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let config = device.default_input_config()?;
        let sample_rate = config.sample_rate().0;
        let channels = u32::from(config.channels());

        tracing::info!(
            device = %device_name,
            sample_rate,
            channels,
            format = ?config.sample_format(),
            "Opened audio input"
        );

        Ok(Self {
            state: Arc::new(AudioSourceState::new(RING_CAPACITY, sample_rate, channels)),
            device,
            config,
            stream: None,
            device_name,
        })
    }

    /// Names of every input device on the default host
    pub fn list_devices() -> Vec<String> {
        cpal::default_host()
            .input_devices()
            .map(|devices| devices.filter_map(|d| d.name().ok()).collect())
            .unwrap_or_default()
    }

    /// Build the input stream and start capturing. Calling it twice is a no-op.
    pub fn start_capture(&mut self) -> Result<(), AudioError> {
        if self.stream.is_some() {
            return Ok(());
        }

        let stream = match self.config.sample_format() {
            cpal::SampleFormat::F32 => self.build_stream::<f32>()?,
            cpal::SampleFormat::I16 => self.build_stream::<i16>()?,
            cpal::SampleFormat::U16 => self.build_stream::<u16>()?,
            cpal::SampleFormat::I32 => self.build_stream::<i32>()?,
            other => return Err(AudioError::UnsupportedFormat(format!("{:?}", other))),
        };

        self.state.set_running(true);
        stream.play()?;
        self.state.set_active(true);
        self.stream = Some(stream);
        Ok(())
    }

    /// Stream converting samples of type `T` to f32 before pushing them
    fn build_stream<T>(&self) -> Result<cpal::Stream, AudioError>
    where
        T: SizedSample,
        f32: FromSample<T>,
    {
        let state = Arc::clone(&self.state);
        let mut scratch: Vec<f32> = Vec::new();

        let stream = self.device.build_input_stream(
            &self.config.config(),
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                scratch.clear();
                scratch.extend(data.iter().map(|&s| s.to_sample::<f32>()));
                state.push(&scratch);
            },
            |err| tracing::error!("Audio input error: {}", err),
            None,
        )?;
        Ok(stream)
    }
}

fn find_device(host: &cpal::Host, name: &str) -> Result<cpal::Device, AudioError> {
    let found = host
        .input_devices()?
        .find(|d| d.name().map(|n| n == name).unwrap_or(false));

    found.ok_or_else(|| {
        tracing::warn!(
            "Input device '{}' not found; available: {:?}",
            name,
            SystemAudioInput::list_devices()
        );
        AudioError::DeviceNotFound(name.to_string())
    })
}

impl AudioSource for SystemAudioInput {
    fn display_name(&self) -> String {
        format!("System: {}", self.device_name)
    }

    fn sample_rate(&self) -> u32 {
        self.config.sample_rate().0
    }

    fn channels(&self) -> u32 {
        u32::from(self.config.channels())
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

        if let Some(stream) = &self.stream {
            if let Err(e) = stream.pause() {
                tracing::debug!("Pausing audio stream failed: {}", e);
            }
        }
    }
}

impl Drop for SystemAudioInput {
    fn drop(&mut self) {
        self.stop();
    }
}
