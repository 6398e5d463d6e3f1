//! Per-frame spectrum from the active input

use super::analyser::FrequencyAnalyser;
use super::source::AudioSource;
use super::system_input::SystemAudioInput;
use super::types::{AnalyserConfig, AudioError};

/// Owns the capture source and turns its latest samples into a byte spectrum
/// once per frame. Without a source the spectrum stays silent.
pub struct AudioMonitor {
    source: Option<Box<dyn AudioSource>>,
    analyser: FrequencyAnalyser,
    silence: Vec<u8>,
}

impl AudioMonitor {
    /// Monitor with no input; the spectrum is all zeros
    pub fn silent(config: AnalyserConfig) -> Self {
        let analyser = FrequencyAnalyser::new(config);
        let silence = vec![0; analyser.bin_count()];
        Self {
            source: None,
            analyser,
            silence,
        }
    }

    pub fn with_source(source: Box<dyn AudioSource>, config: AnalyserConfig) -> Self {
        let mut monitor = Self::silent(config);
        monitor.source = Some(source);
        monitor
    }

    /// Open the system input. A missing or failing device is logged and the
    /// monitor stays silent.
    pub fn open_system(device_name: Option<&str>, config: AnalyserConfig) -> Self {
        match Self::try_open_system(device_name) {
            Ok(input) => {
                tracing::info!("Audio input started: {}", input.display_name());
                Self::with_source(Box::new(input), config)
            }
            Err(e) => {
                tracing::warn!("Audio input unavailable, using silence: {}", e);
                Self::silent(config)
            }
        }
    }

    fn try_open_system(device_name: Option<&str>) -> Result<SystemAudioInput, AudioError> {
        let mut input = SystemAudioInput::open(device_name)?;
        input.start_capture()?;
        Ok(input)
    }

    pub fn has_input(&self) -> bool {
        self.source.as_ref().map(|s| s.is_active()).unwrap_or(false)
    }

    pub fn source_name(&self) -> Option<String> {
        self.source.as_ref().map(|s| s.display_name())
    }

    /// Analyse the newest samples (call once per frame)
    pub fn update(&mut self) -> &[u8] {
        let fft_size = self.analyser.fft_size();
        let snapshot = self
            .source
            .as_ref()
            .filter(|s| s.is_active())
            .and_then(|s| s.snapshot(fft_size));

        match snapshot {
            Some(buffer) => self.analyser.analyse(&buffer.to_mono()),
            None => &self.silence,
        }
    }

    /// Spectrum from the last update
    pub fn spectrum(&self) -> &[u8] {
        if self.has_input() {
            self.analyser.spectrum()
        } else {
            &self.silence
        }
    }

    pub fn stop(&mut self) {
        if let Some(source) = self.source.take() {
            source.stop();
        }
        self.analyser.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::source::BufferedAudioSource;

    #[test]
    fn test_silent_monitor() {
        let mut monitor = AudioMonitor::silent(AnalyserConfig::default());
        assert!(!monitor.has_input());
        assert_eq!(monitor.update().len(), 32);
        assert!(monitor.spectrum().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_monitor_analyses_source() {
        let source = BufferedAudioSource::new("test", 1024, 48000, 1);
        let state = source.state();
        let tone: Vec<f32> = (0..256)
            .map(|i| (std::f32::consts::TAU * 8.0 * i as f32 / 64.0).sin())
            .collect();
        state.push(&tone);

        let config = AnalyserConfig {
            smoothing: 0.0,
            ..Default::default()
        };
        let mut monitor = AudioMonitor::with_source(Box::new(source), config);
        assert!(monitor.has_input());
        assert_eq!(monitor.source_name().as_deref(), Some("test"));

        let spectrum = monitor.update().to_vec();
        assert!(spectrum[8] > 200);
        assert_eq!(monitor.spectrum(), spectrum.as_slice());
    }

    #[test]
    fn test_stopped_monitor_goes_silent() {
        let source = BufferedAudioSource::new("test", 1024, 48000, 1);
        source.state().push(&[0.5; 128]);
        let mut monitor = AudioMonitor::with_source(Box::new(source), AnalyserConfig::default());
        monitor.update();
        monitor.stop();
        assert!(!monitor.has_input());
        assert!(monitor.update().iter().all(|&b| b == 0));
    }
}
