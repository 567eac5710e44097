// Mel filterbank, log-mel spectrogram and MFCC.

use vs_core::features::MFCC_COUNT;

use crate::error::FeatureError;
use crate::fft::Spectrogram;

/// Floor applied to power before taking the logarithm.
const AMIN: f32 = 1e-10;
/// Dynamic range kept below the loudest cell, dB.
const TOP_DB: f32 = 80.0;

/// HTK mel scale.
#[inline]
fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

#[inline]
fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filters over the magnitude bins of one STFT frame.
///
/// Each filter is area-normalized (`2 / (f_right − f_left)`) so that wide
/// high-frequency bands do not dominate.
///
/// # Example
/// ```
/// use vs_audio::mel::MelFilterbank;
/// let bank = MelFilterbank::new(40, 2048, 22050);
/// assert_eq!(bank.n_mels(), 40);
/// assert_eq!(bank.num_bins(), 1025);
/// ```
#[derive(Clone, Debug)]
pub struct MelFilterbank {
    /// Row-major `[n_mels][num_bins]`.
    weights: Vec<f32>,
    n_mels: usize,
    num_bins: usize,
}

impl MelFilterbank {
    /// Filters spanning 0 Hz to Nyquist.
    #[must_use]
    pub fn new(n_mels: usize, n_fft: usize, sample_rate: u32) -> Self {
        let num_bins = n_fft / 2 + 1;
        let nyquist = sample_rate as f32 / 2.0;
        let top = hz_to_mel(nyquist);

        // n_mels + 2 edges, evenly spaced on the mel axis
        let edges: Vec<f32> = (0..n_mels + 2)
            .map(|i| mel_to_hz(top * i as f32 / (n_mels + 1) as f32))
            .collect();

        let bin_hz = sample_rate as f32 / n_fft.max(1) as f32;
        let mut weights = vec![0.0f32; n_mels * num_bins];
        for (m, row) in weights
            .chunks_exact_mut(num_bins.max(1))
            .enumerate()
            .take(n_mels)
        {
            let (left, center, right) = (edges[m], edges[m + 1], edges[m + 2]);
            let rising = (center - left).max(f32::EPSILON);
            let falling = (right - center).max(f32::EPSILON);
            let norm = 2.0 / (right - left).max(f32::EPSILON);
            for (k, w) in row.iter_mut().enumerate() {
                let f = k as f32 * bin_hz;
                let up = (f - left) / rising;
                let down = (right - f) / falling;
                *w = up.min(down).max(0.0) * norm;
            }
        }

        Self {
            weights,
            n_mels,
            num_bins,
        }
    }

    /// Project one power frame onto the mel bands.
    pub fn apply(&self, power: &[f32], out: &mut [f32]) {
        for (slot, row) in out
            .iter_mut()
            .zip(self.weights.chunks_exact(self.num_bins.max(1)))
        {
            *slot = row.iter().zip(power).map(|(w, p)| w * p).sum();
        }
    }

    #[must_use]
    pub fn n_mels(&self) -> usize {
        self.n_mels
    }

    #[must_use]
    pub fn num_bins(&self) -> usize {
        self.num_bins
    }
}

/// Log-power mel spectrogram, frame-major, in dB.
///
/// Shared by MFCC and the onset-strength envelope.
#[derive(Clone, Debug)]
pub struct MelSpectrogram {
    data: Vec<f32>,
    n_mels: usize,
    num_frames: usize,
}

impl MelSpectrogram {
    /// Power (|X|²) through the mel filterbank, then converted to dB with a
    /// floor of `max − 80 dB`.
    ///
    /// # Errors
    /// [`FeatureError::InvalidParameter`] when `n_mels` is 0.
    pub fn from_spectrogram(spec: &Spectrogram, n_mels: usize) -> Result<Self, FeatureError> {
        if n_mels == 0 {
            return Err(FeatureError::InvalidParameter("n_mels > 0"));
        }
        let bank = MelFilterbank::new(n_mels, spec.n_fft(), spec.sample_rate());
        let mut power = vec![0.0f32; spec.num_bins()];
        let mut data = vec![0.0f32; n_mels * spec.num_frames()];

        for (frame, out) in spec.frames().zip(data.chunks_exact_mut(n_mels)) {
            for (p, m) in power.iter_mut().zip(frame) {
                *p = m * m;
            }
            bank.apply(&power, out);
        }

        power_to_db(&mut data);
        Ok(Self {
            data,
            n_mels,
            num_frames: spec.num_frames(),
        })
    }

    /// dB frames, in time order.
    pub fn frames(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.n_mels)
    }

    #[must_use]
    pub fn n_mels(&self) -> usize {
        self.n_mels
    }

    #[must_use]
    pub fn num_frames(&self) -> usize {
        self.num_frames
    }
}

/// `10·log10(max(amin, x))`, then clip everything below `max − top_db`.
///
/// # Example
/// ```
/// use vs_audio::mel::power_to_db;
/// let mut v = vec![1.0, 0.1, 0.0];
/// power_to_db(&mut v);
/// assert!(v[0].abs() < 1e-6);
/// assert!((v[1] + 10.0).abs() < 1e-4);
/// assert!((v[2] + 80.0).abs() < 1e-4);
/// ```
pub fn power_to_db(values: &mut [f32]) {
    let mut peak = f32::NEG_INFINITY;
    for v in values.iter_mut() {
        *v = 10.0 * v.max(AMIN).log10();
        peak = peak.max(*v);
    }
    let floor = peak - TOP_DB;
    for v in values.iter_mut() {
        *v = v.max(floor);
    }
}

/// Frame-averaged MFCCs: orthonormal DCT-II of each dB frame, first
/// [`MFCC_COUNT`] coefficients.
///
/// # Errors
/// [`FeatureError::NoFrames`] for an empty mel spectrogram,
/// [`FeatureError::InvalidParameter`] when there are fewer mel bands than
/// coefficients.
pub fn mfcc_means(mel: &MelSpectrogram) -> Result<[f32; MFCC_COUNT], FeatureError> {
    let n = mel.n_mels();
    if n < MFCC_COUNT {
        return Err(FeatureError::InvalidParameter("n_mels >= 13"));
    }
    if mel.num_frames() == 0 {
        return Err(FeatureError::NoFrames);
    }

    let basis = dct_basis(n, MFCC_COUNT);
    let mut sums = [0.0f64; MFCC_COUNT];
    for frame in mel.frames() {
        for (sum, row) in sums.iter_mut().zip(basis.chunks_exact(n)) {
            let c: f32 = row.iter().zip(frame).map(|(b, x)| b * x).sum();
            *sum += f64::from(c);
        }
    }

    let count = mel.num_frames() as f64;
    let mut out = [0.0f32; MFCC_COUNT];
    for (o, s) in out.iter_mut().zip(sums) {
        *o = (s / count) as f32;
    }
    Ok(out)
}

/// Rows of the orthonormal DCT-II matrix, `[n_coeffs][n]`.
fn dct_basis(n: usize, n_coeffs: usize) -> Vec<f32> {
    let nf = n as f32;
    let mut basis = Vec::with_capacity(n * n_coeffs);
    for k in 0..n_coeffs {
        let scale = if k == 0 { (1.0 / nf).sqrt() } else { (2.0 / nf).sqrt() };
        basis.extend((0..n).map(|i| {
            scale * (std::f32::consts::PI * k as f32 * (2.0 * i as f32 + 1.0) / (2.0 * nf)).cos()
        }));
    }
    basis
}
