/// How the signal is extended on both sides before framing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PadMode {
    /// Zeros (STFT, RMS).
    Zero,
    /// Repeat the first/last sample (zero-crossing rate).
    Edge,
}

/// Pad `signal` by `frame_length / 2` on both sides so frame `i` is centered on sample `i * hop`.
///
/// # Example
/// ```
/// use vs_audio::frames::{pad_center, PadMode};
/// let padded = pad_center(&[1.0, 2.0], 4, PadMode::Edge);
/// assert_eq!(padded, vec![1.0, 1.0, 1.0, 2.0, 2.0, 2.0]);
/// ```
#[must_use]
pub fn pad_center(signal: &[f32], frame_length: usize, mode: PadMode) -> Vec<f32> {
    let pad = frame_length / 2;
    let (head, tail) = match mode {
        PadMode::Zero => (0.0, 0.0),
        PadMode::Edge => (
            signal.first().copied().unwrap_or(0.0),
            signal.last().copied().unwrap_or(0.0),
        ),
    };
    let mut out = Vec::with_capacity(signal.len() + 2 * pad);
    out.resize(pad, head);
    out.extend_from_slice(signal);
    out.resize(out.len() + pad, tail);
    out
}

/// Overlapping frames of `frame_length` samples, `hop` apart.
///
/// Returns nothing when `padded` is shorter than one frame or `hop` is 0.
///
/// # Example
/// ```
/// use vs_audio::frames::{frames, pad_center, PadMode};
/// let signal = vec![0.0f32; 2048];
/// let padded = pad_center(&signal, 512, PadMode::Zero);
/// assert_eq!(frames(&padded, 512, 128).count(), 1 + 2048 / 128);
/// ```
pub fn frames(padded: &[f32], frame_length: usize, hop: usize) -> impl Iterator<Item = &[f32]> {
    let usable = frame_length > 0 && hop > 0 && padded.len() >= frame_length;
    let step = hop.max(1);
    padded
        .windows(frame_length.max(1))
        .step_by(step)
        .take_while(move |_| usable)
}

/// Arithmetic mean, `None` for an empty iterator.
pub(crate) fn mean(values: impl Iterator<Item = f32>) -> Option<f32> {
    let (sum, count) = values.fold((0.0f64, 0usize), |(s, n), v| (s + f64::from(v), n + 1));
    if count == 0 {
        None
    } else {
        Some((sum / count as f64) as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_pad_keeps_signal_centered() {
        let padded = pad_center(&[1.0, 2.0, 3.0], 4, PadMode::Zero);
        assert_eq!(padded, vec![0.0, 0.0, 1.0, 2.0, 3.0, 0.0, 0.0]);
    }

    #[test]
    fn short_signal_still_gives_one_frame() {
        let padded = pad_center(&[0.5; 10], 2048, PadMode::Zero);
        assert_eq!(frames(&padded, 2048, 512).count(), 1);
    }

    #[test]
    fn zero_hop_yields_nothing() {
        let padded = vec![0.0; 64];
        assert_eq!(frames(&padded, 16, 0).count(), 0);
    }

    #[test]
    fn mean_of_nothing() {
        assert!(mean(std::iter::empty()).is_none());
        assert_eq!(mean([1.0, 2.0, 3.0].into_iter()), Some(2.0));
    }
}
