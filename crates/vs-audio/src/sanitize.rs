use vs_core::buffer::AudioBuffer;

/// Replace NaN and ±inf with 0, in place.
///
/// # Example
/// ```
/// use vs_audio::sanitize::zero_non_finite;
/// let mut s = vec![0.5, f32::NAN, f32::INFINITY, -0.25];
/// zero_non_finite(&mut s);
/// assert_eq!(s, vec![0.5, 0.0, 0.0, -0.25]);
/// ```
pub fn zero_non_finite(samples: &mut [f32]) {
    for s in samples.iter_mut() {
        if !s.is_finite() {
            *s = 0.0;
        }
    }
}

/// Average interleaved channels into a single mono track.
///
/// Trailing samples that do not form a complete frame are dropped.
///
/// # Example
/// ```
/// use vs_audio::sanitize::downmix;
/// let mono = downmix(&[0.2, 0.4, -1.0, 1.0, 0.9], 2);
/// assert_eq!(mono.len(), 2);
/// assert!((mono[0] - 0.3).abs() < 1e-6);
/// assert!(mono[1].abs() < 1e-6);
/// ```
#[must_use]
pub fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
    let channels = usize::from(channels.max(1));
    if channels == 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Sanitize then downmix: the signal every feature is computed from.
///
/// Sanitation happens first so a single non-finite channel cannot poison the
/// averaged frame.
#[must_use]
pub fn prepare(buffer: &AudioBuffer) -> Vec<f32> {
    let mut samples = buffer.samples.clone();
    zero_non_finite(&mut samples);
    downmix(&samples, buffer.channels)
}
