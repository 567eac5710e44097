use crate::mel::MelSpectrogram;

/// Onset-strength envelope sampled on the STFT frame grid.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OnsetEnvelope {
    /// One value per frame; the first is always 0.
    pub values: Vec<f32>,
    /// Envelope samples per second (`sample_rate / hop`).
    pub frame_rate: f32,
}

impl OnsetEnvelope {
    /// Positive log-mel spectral flux, averaged over the mel bands.
    ///
    /// # Example
    /// ```
    /// use vs_audio::fft::Spectrogram;
    /// use vs_audio::mel::MelSpectrogram;
    /// use vs_audio::onset::OnsetEnvelope;
    ///
    /// let spec = Spectrogram::compute(&vec![0.0; 22050], 22050, 2048, 512).unwrap();
    /// let mel = MelSpectrogram::from_spectrogram(&spec, 64).unwrap();
    /// let env = OnsetEnvelope::from_mel(&mel, spec.frame_rate(512));
    /// assert_eq!(env.len(), spec.num_frames());
    /// assert!(env.values.iter().all(|v| *v == 0.0));
    /// ```
    #[must_use]
    pub fn from_mel(mel: &MelSpectrogram, frame_rate: f32) -> Self {
        let n_mels = mel.n_mels().max(1) as f32;
        let mut values = Vec::with_capacity(mel.num_frames());
        let mut prev: Option<&[f32]> = None;
        for frame in mel.frames() {
            let flux = prev.map_or(0.0, |p| {
                frame
                    .iter()
                    .zip(p)
                    .map(|(cur, old)| (cur - old).max(0.0))
                    .sum::<f32>()
                    / n_mels
            });
            values.push(flux);
            prev = Some(frame);
        }
        Self { values, frame_rate }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fft::Spectrogram;

    #[test]
    fn click_produces_a_peak() {
        let mut signal = vec![0.0f32; 22050];
        for s in &mut signal[11025..11025 + 64] {
            *s = 0.8;
        }
        let spec = Spectrogram::compute(&signal, 22050, 2048, 512).unwrap();
        let mel = MelSpectrogram::from_spectrogram(&spec, 64).unwrap();
        let env = OnsetEnvelope::from_mel(&mel, spec.frame_rate(512));

        let (peak_frame, _) = env
            .values
            .iter()
            .enumerate()
            .fold((0, 0.0f32), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc });
        // Click at 0.5 s; the window reaches it up to n_fft/2 samples early.
        let t = peak_frame as f32 / env.frame_rate;
        assert!((0.4..=0.55).contains(&t), "peak at {t}s");
    }

    #[test]
    fn first_value_is_zero() {
        let spec = Spectrogram::compute(&vec![0.3; 8192], 22050, 2048, 512).unwrap();
        let mel = MelSpectrogram::from_spectrogram(&spec, 64).unwrap();
        let env = OnsetEnvelope::from_mel(&mel, 43.0);
        assert_eq!(env.values[0], 0.0);
        assert!(env.values.iter().all(|v| *v >= 0.0));
    }
}
