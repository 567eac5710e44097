use realfft::RealFftPlanner;

use crate::error::FeatureError;
use crate::frames::{PadMode, frames, pad_center};

/// FFT pipeline: windowed real FFT using realfft.
///
/// Pre-allocates the FFT plan and scratch buffers; one instance serves every
/// frame of a spectrogram.
///
/// # Example
/// ```
/// use vs_audio::fft::FftPipeline;
/// let fft = FftPipeline::new(2048);
/// assert_eq!(fft.num_bins(), 1025);
/// ```
pub struct FftPipeline {
    fft_size: usize,
    input_buf: Vec<f32>,
    spectrum_buf: Vec<realfft::num_complex::Complex<f32>>,
    scratch: Vec<realfft::num_complex::Complex<f32>>,
    plan: std::sync::Arc<dyn realfft::RealToComplex<f32>>,
    /// Periodic Hann window coefficients.
    window: Vec<f32>,
}

impl FftPipeline {
    /// Create a new FFT pipeline with the given window size.
    ///
    /// # Panics
    /// Panics if `size` is 0.
    #[must_use]
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "FFT size must be > 0");

        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(size);

        let input_buf = plan.make_input_vec();
        let spectrum_buf = plan.make_output_vec();
        let scratch = plan.make_scratch_vec();

        // Periodic Hann (spectral analysis convention)
        let window: Vec<f32> = (0..size)
            .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / size as f32).cos()))
            .collect();

        Self {
            fft_size: size,
            input_buf,
            spectrum_buf,
            scratch,
            plan,
            window,
        }
    }

    /// Window `samples` (zero-padded or truncated to the FFT size) and write
    /// the magnitude spectrum (N/2+1 bins) into `out`.
    ///
    /// # Errors
    /// Returns [`FeatureError::Fft`] if the backend rejects the buffers.
    ///
    /// # Example
    /// ```
    /// use vs_audio::fft::FftPipeline;
    /// let mut fft = FftPipeline::new(256);
    /// let mut out = vec![0.0; fft.num_bins()];
    /// fft.magnitudes_into(&[0.0; 256], &mut out).unwrap();
    /// assert!(out.iter().all(|m| *m == 0.0));
    /// ```
    pub fn magnitudes_into(
        &mut self,
        samples: &[f32],
        out: &mut [f32],
    ) -> Result<(), FeatureError> {
        let n = self.fft_size.min(samples.len());

        // Copy and window
        for (i, slot) in self.input_buf.iter_mut().enumerate() {
            *slot = if i < n { samples[i] * self.window[i] } else { 0.0 };
        }

        self.plan
            .process_with_scratch(
                &mut self.input_buf,
                &mut self.spectrum_buf,
                &mut self.scratch,
            )
            .map_err(|e| FeatureError::Fft(e.to_string()))?;

        for (slot, c) in out.iter_mut().zip(&self.spectrum_buf) {
            *slot = (c.re * c.re + c.im * c.im).sqrt();
        }
        Ok(())
    }

    /// Number of magnitude bins produced per frame.
    #[must_use]
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }
}

/// Magnitude STFT of a whole buffer, frame-major.
///
/// Computed once per buffer and shared read-only by every spectral feature.
#[derive(Clone, Debug)]
pub struct Spectrogram {
    data: Vec<f32>,
    num_bins: usize,
    num_frames: usize,
    sample_rate: u32,
    n_fft: usize,
}

impl Spectrogram {
    /// Centered, Hann-windowed STFT.
    ///
    /// # Errors
    /// Empty signal, zero sample rate, or unusable `n_fft`/`hop`.
    ///
    /// # Example
    /// ```
    /// use vs_audio::fft::Spectrogram;
    /// let spec = Spectrogram::compute(&vec![0.0; 22050], 22050, 2048, 512).unwrap();
    /// assert_eq!(spec.num_frames(), 1 + 22050 / 512);
    /// assert_eq!(spec.num_bins(), 1025);
    /// ```
    pub fn compute(
        signal: &[f32],
        sample_rate: u32,
        n_fft: usize,
        hop: usize,
    ) -> Result<Self, FeatureError> {
        if signal.is_empty() {
            return Err(FeatureError::EmptySignal);
        }
        if sample_rate == 0 {
            return Err(FeatureError::InvalidSampleRate(sample_rate));
        }
        if n_fft < 2 || hop == 0 {
            return Err(FeatureError::InvalidParameter("n_fft >= 2 et hop > 0"));
        }

        let mut fft = FftPipeline::new(n_fft);
        let num_bins = fft.num_bins();
        let padded = pad_center(signal, n_fft, PadMode::Zero);

        let mut data = Vec::new();
        let mut column = vec![0.0f32; num_bins];
        let mut num_frames = 0;
        for frame in frames(&padded, n_fft, hop) {
            fft.magnitudes_into(frame, &mut column)?;
            data.extend_from_slice(&column);
            num_frames += 1;
        }
        if num_frames == 0 {
            return Err(FeatureError::NoFrames);
        }

        Ok(Self {
            data,
            num_bins,
            num_frames,
            sample_rate,
            n_fft,
        })
    }

    /// Magnitude frames, in time order.
    pub fn frames(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.num_bins)
    }

    /// Centre frequency of each bin, Hz.
    #[must_use]
    pub fn frequencies(&self) -> Vec<f32> {
        (0..self.num_bins).map(|k| self.bin_hz(k)).collect()
    }

    /// Centre frequency of bin `k`, Hz.
    #[inline]
    #[must_use]
    pub fn bin_hz(&self, k: usize) -> f32 {
        k as f32 * self.sample_rate as f32 / self.n_fft as f32
    }

    #[must_use]
    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    #[must_use]
    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[must_use]
    pub fn n_fft(&self) -> usize {
        self.n_fft
    }

    /// Frames per second of the STFT grid.
    #[must_use]
    pub fn frame_rate(&self, hop: usize) -> f32 {
        self.sample_rate as f32 / hop.max(1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sr: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin())
            .collect()
    }

    #[test]
    fn sine_peaks_at_its_bin() {
        let sr = 22050;
        let spec = Spectrogram::compute(&sine(1000.0, sr, 8192), sr, 2048, 512).unwrap();
        let mid = spec.frames().nth(spec.num_frames() / 2).unwrap();
        let (peak, _) = mid
            .iter()
            .enumerate()
            .fold((0, 0.0f32), |acc, (i, &m)| if m > acc.1 { (i, m) } else { acc });
        let expected = (1000.0 * 2048.0 / sr as f32).round() as usize;
        assert!(peak.abs_diff(expected) <= 1, "peak bin {peak}, expected {expected}");
    }

    #[test]
    fn rejects_degenerate_inputs() {
        assert_eq!(
            Spectrogram::compute(&[], 22050, 2048, 512).unwrap_err(),
            FeatureError::EmptySignal
        );
        assert_eq!(
            Spectrogram::compute(&[0.1; 100], 0, 2048, 512).unwrap_err(),
            FeatureError::InvalidSampleRate(0)
        );
    }

    #[test]
    fn short_signal_gives_single_frame() {
        let spec = Spectrogram::compute(&[0.3; 100], 22050, 2048, 512).unwrap();
        assert_eq!(spec.num_frames(), 1);
    }

    #[test]
    fn bin_frequencies_span_to_nyquist() {
        let spec = Spectrogram::compute(&[0.0; 4096], 22050, 2048, 512).unwrap();
        let freqs = spec.frequencies();
        assert!((freqs[freqs.len() - 1] - 11025.0).abs() < 1e-3);
    }
}
