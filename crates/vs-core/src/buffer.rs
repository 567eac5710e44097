use crate::error::CoreError;

/// Un enregistrement audio de durée fixe, produit par un `Recorder`.
///
/// Samples are interleaved when `channels > 1`. The buffer is owned by a
/// single capture/analysis cycle and dropped afterwards.
///
/// # Example
/// ```
/// use vs_core::buffer::AudioBuffer;
/// let buf = AudioBuffer::mono(vec![0.0; 22050], 22050);
/// assert_eq!(buf.frames(), 22050);
/// assert!((buf.duration_secs() - 1.0).abs() < f32::EPSILON);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AudioBuffer {
    /// Échantillons f32, entrelacés si multi-canal.
    pub samples: Vec<f32>,
    /// Nombre de canaux (>= 1).
    pub channels: u16,
    /// Fréquence d'échantillonnage en Hz.
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Build a single-channel buffer.
    #[must_use]
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            channels: 1,
            sample_rate,
        }
    }

    /// Build an interleaved multi-channel buffer.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidBuffer`] if `channels` is 0 or the sample
    /// count is not a multiple of it.
    ///
    /// # Example
    /// ```
    /// use vs_core::buffer::AudioBuffer;
    /// let stereo = AudioBuffer::interleaved(vec![0.1, 0.3, 0.1, 0.3], 2, 22050).unwrap();
    /// assert_eq!(stereo.frames(), 2);
    /// assert!(AudioBuffer::interleaved(vec![0.0; 4], 0, 22050).is_err());
    /// assert!(AudioBuffer::interleaved(vec![0.0; 5], 2, 22050).is_err());
    /// ```
    pub fn interleaved(
        samples: Vec<f32>,
        channels: u16,
        sample_rate: u32,
    ) -> Result<Self, CoreError> {
        if channels == 0 || samples.len() % usize::from(channels) != 0 {
            return Err(CoreError::InvalidBuffer {
                samples: samples.len(),
                channels,
            });
        }
        Ok(Self {
            samples,
            channels,
            sample_rate,
        })
    }

    /// Number of complete frames (one sample per channel).
    #[must_use]
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }

    /// Duration in seconds, 0 when the sample rate is unknown.
    #[must_use]
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f32 / self.sample_rate as f32
    }

    /// `true` if the buffer holds no complete frame.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }
}
