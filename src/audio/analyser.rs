//! Byte frequency spectrum for audio-reactive animation

use super::types::AnalyserConfig;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Short FFT analyser producing one byte per frequency bin.
///
/// Blackman window, per-bin exponential smoothing of the normalized
/// magnitude, then a linear map of decibels onto `0..=255`.
pub struct FrequencyAnalyser {
    config: AnalyserConfig,
    fft: Arc<dyn Fft<f32>>,
    input_buffer: Vec<Complex<f32>>,
    window: Vec<f32>,
    /// Smoothed magnitudes carried between frames
    smoothed: Vec<f32>,
    bytes: Vec<u8>,
}

impl FrequencyAnalyser {
    pub fn new(config: AnalyserConfig) -> Self {
        let config = AnalyserConfig {
            fft_size: config.fft_size.max(2) & !1,
            smoothing: config.smoothing.clamp(0.0, 1.0),
            ..config
        };
        let size = config.fft_size;

        let fft = FftPlanner::new().plan_fft_forward(size);
        let window = blackman_window(size);

        Self {
            config,
            fft,
            input_buffer: vec![Complex::new(0.0, 0.0); size],
            window,
            smoothed: vec![0.0; size / 2],
            bytes: vec![0; size / 2],
        }
    }

    pub fn config(&self) -> &AnalyserConfig {
        &self.config
    }

    pub fn fft_size(&self) -> usize {
        self.config.fft_size
    }

    pub fn bin_count(&self) -> usize {
        self.bytes.len()
    }

    /// Analyse the newest `fft_size` mono samples. Shorter input is treated
    /// as preceded by silence.
    pub fn analyse(&mut self, mono: &[f32]) -> &[u8] {
        let size = self.config.fft_size;
        let start = mono.len().saturating_sub(size);
        let samples = &mono[start..];
        let padding = size - samples.len();

        for (i, slot) in self.input_buffer.iter_mut().enumerate() {
            let sample = if i < padding { 0.0 } else { samples[i - padding] };
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process(&mut self.input_buffer);

        let tau = self.config.smoothing;
        let scale = 1.0 / size as f32;
        for (smoothed, bin) in self.smoothed.iter_mut().zip(self.input_buffer.iter()) {
            let magnitude = bin.norm() * scale;
            let next = tau * *smoothed + (1.0 - tau) * magnitude;
            *smoothed = if next.is_finite() { next } else { 0.0 };
        }

        for (byte, &magnitude) in self.bytes.iter_mut().zip(self.smoothed.iter()) {
            *byte = db_to_byte(magnitude, self.config.min_db, self.config.max_db);
        }

        &self.bytes
    }

    /// Last computed spectrum
    pub fn spectrum(&self) -> &[u8] {
        &self.bytes
    }

    /// Forget smoothing history
    pub fn reset(&mut self) {
        self.smoothed.iter_mut().for_each(|s| *s = 0.0);
        self.bytes.iter_mut().for_each(|b| *b = 0);
    }
}

/// Map a linear magnitude onto a byte over the decibel window
pub fn db_to_byte(magnitude: f32, min_db: f32, max_db: f32) -> u8 {
    if magnitude <= 0.0 || max_db <= min_db {
        return 0;
    }
    let db = 20.0 * magnitude.log10();
    let scaled = 255.0 * (db - min_db) / (max_db - min_db);
    scaled.clamp(0.0, 255.0) as u8
}

fn blackman_window(size: usize) -> Vec<f32> {
    const A0: f32 = 0.42;
    const A1: f32 = 0.5;
    const A2: f32 = 0.08;
    let n = size as f32;
    (0..size)
        .map(|i| {
            let x = std::f32::consts::TAU * i as f32 / n;
            A0 - A1 * x.cos() + A2 * (2.0 * x).cos()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(bin: usize, size: usize, amplitude: f32) -> Vec<f32> {
        (0..size)
            .map(|i| amplitude * (std::f32::consts::TAU * bin as f32 * i as f32 / size as f32).sin())
            .collect()
    }

    fn unsmoothed() -> FrequencyAnalyser {
        FrequencyAnalyser::new(AnalyserConfig {
            smoothing: 0.0,
            ..Default::default()
        })
    }

    #[test]
    fn test_bin_count() {
        let analyser = FrequencyAnalyser::new(AnalyserConfig::default());
        assert_eq!(analyser.fft_size(), 64);
        assert_eq!(analyser.bin_count(), 32);
    }

    #[test]
    fn test_silence_is_zero() {
        let mut analyser = FrequencyAnalyser::new(AnalyserConfig::default());
        assert!(analyser.analyse(&[0.0; 64]).iter().all(|&b| b == 0));
        assert!(analyser.analyse(&[]).iter().all(|&b| b == 0));
    }

    #[test]
    fn test_sine_peaks_at_its_bin() {
        let mut analyser = unsmoothed();
        let spectrum = analyser.analyse(&sine(4, 64, 1.0)).to_vec();

        let peak = spectrum
            .iter()
            .enumerate()
            .max_by_key(|&(_, b)| *b)
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 4);
        // |X| / N is about 0.21 for a full-scale windowed sine: near -13.5 dB
        assert!(spectrum[4] > 230, "peak byte {}", spectrum[4]);
        // Far bins are well below the peak
        assert!(spectrum[20] < spectrum[4] / 2);
    }

    #[test]
    fn test_smoothing_rises_gradually() {
        let mut analyser = FrequencyAnalyser::new(AnalyserConfig::default());
        let signal = sine(4, 64, 1.0);

        let first = analyser.analyse(&signal)[4];
        let second = analyser.analyse(&signal)[4];
        let mut settled = second;
        for _ in 0..100 {
            settled = analyser.analyse(&signal)[4];
        }

        assert!(first < second);
        assert!(second < settled);

        let mut direct = unsmoothed();
        let target = direct.analyse(&signal)[4];
        assert!(settled.abs_diff(target) <= 1);
    }

    #[test]
    fn test_db_to_byte_window() {
        assert_eq!(db_to_byte(0.0, -100.0, -10.0), 0);
        // -10 dB and above saturate
        assert_eq!(db_to_byte(1.0, -100.0, -10.0), 255);
        // -100 dB and below floor
        assert_eq!(db_to_byte(1e-6, -100.0, -10.0), 0);
        // -55 dB sits mid-window
        let mid = db_to_byte(10f32.powf(-55.0 / 20.0), -100.0, -10.0);
        assert!((126..=128).contains(&mid));
    }

    #[test]
    fn test_reset_clears_history() {
        let mut analyser = FrequencyAnalyser::new(AnalyserConfig::default());
        analyser.analyse(&sine(4, 64, 1.0));
        analyser.reset();
        assert!(analyser.spectrum().iter().all(|&b| b == 0));
    }
}
