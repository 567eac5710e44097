use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use vs_core::buffer::AudioBuffer;
use vs_core::config::CaptureConfig;
use vs_core::error::CoreError;
use vs_core::traits::Recorder;

use crate::error::AudioError;
use crate::sanitize::downmix;

/// Decode an audio file into a mono buffer at the file's own sample rate.
///
/// Supports WAV, MP3, FLAC, OGG, AAC via symphonia.
///
/// # Errors
/// Returns an error if the file cannot be opened or decoded.
///
/// # Example
/// ```no_run
/// use vs_audio::decode::decode_file;
/// let buffer = decode_file("speech.wav").unwrap();
/// println!("{:.1} s", buffer.duration_secs());
/// ```
pub fn decode_file(path: impl AsRef<Path>) -> Result<AudioBuffer> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(CoreError::FileNotFound {
            path: path.display().to_string(),
        }
        .into());
    }
    let file = File::open(path)
        .with_context(|| format!("Impossible d'ouvrir le fichier audio : {}", path.display()))?;
    let mss = MediaSourceStream::new(
        Box::new(file),
        symphonia::core::io::MediaSourceStreamOptions::default(),
    );

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AudioError::UnsupportedFormat(e.to_string()))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| AudioError::DecodeError("aucune piste audio".into()))?;

    let sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
    let channels = track
        .codec_params
        .channels
        .map_or(1, symphonia::core::audio::Channels::count);
    let channels = u16::try_from(channels).unwrap_or(u16::MAX);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::DecodeError(e.to_string()))?;

    let track_id = track.id;
    let mut interleaved: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut max_sample_frames: usize = 0;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                log::warn!("Erreur de lecture de paquet : {e}");
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("Erreur de décodage de trame : {e}");
                continue;
            }
        };

        let spec = *decoded.spec();
        let num_frames = decoded.capacity();
        // Reuse SampleBuffer: only reallocate if this packet is bigger than current capacity
        if sample_buf.is_none() || num_frames > max_sample_frames {
            sample_buf = Some(SampleBuffer::<f32>::new(num_frames as u64, spec));
            max_sample_frames = num_frames;
        }
        let Some(buf) = sample_buf.as_mut() else {
            continue;
        };
        buf.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(buf.samples());
    }

    let mono = downmix(&interleaved, channels);
    log::info!(
        "Décodé {} échantillons @ {sample_rate} Hz depuis {}",
        mono.len(),
        path.display()
    );

    Ok(AudioBuffer::mono(mono, sample_rate))
}

/// Replays a decoded file as consecutive, non-overlapping recordings.
///
/// Each capture returns `duration_secs` of audio at the file's own rate; the
/// last one may be shorter.
///
/// # Example
/// ```
/// use vs_audio::decode::FileRecorder;
/// use vs_core::buffer::AudioBuffer;
/// use vs_core::config::CaptureConfig;
/// use vs_core::traits::Recorder;
///
/// let mut rec = FileRecorder::from_buffer(AudioBuffer::mono(vec![0.0; 100_000], 22050));
/// let config = CaptureConfig::default();
/// assert_eq!(rec.capture(&config).unwrap().frames(), 66150);
/// assert_eq!(rec.capture(&config).unwrap().frames(), 100_000 - 66150);
/// assert!(!rec.has_more());
/// assert!(rec.capture(&config).is_err());
/// ```
pub struct FileRecorder {
    samples: Vec<f32>,
    sample_rate: u32,
    cursor: usize,
}

impl FileRecorder {
    /// Decode `path` up front.
    ///
    /// # Errors
    /// See [`decode_file`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        decode_file(path).map(Self::from_buffer)
    }

    /// Replay an already decoded buffer (downmixed to mono if needed).
    #[must_use]
    pub fn from_buffer(buffer: AudioBuffer) -> Self {
        let samples = if buffer.channels > 1 {
            downmix(&buffer.samples, buffer.channels)
        } else {
            buffer.samples
        };
        Self {
            samples,
            sample_rate: buffer.sample_rate,
            cursor: 0,
        }
    }

    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of recordings this source yields for `config`.
    #[must_use]
    pub fn segment_count(&self, config: &CaptureConfig) -> usize {
        self.samples.len().div_ceil(self.segment_len(config))
    }

    fn segment_len(&self, config: &CaptureConfig) -> usize {
        ((self.sample_rate as f32 * config.duration_secs).round() as usize).max(1)
    }
}

impl Recorder for FileRecorder {
    fn capture(&mut self, config: &CaptureConfig) -> Result<AudioBuffer> {
        if self.cursor >= self.samples.len() {
            return Err(AudioError::EndOfStream.into());
        }
        let end = (self.cursor + self.segment_len(config)).min(self.samples.len());
        let segment = self.samples[self.cursor..end].to_vec();
        self.cursor = end;
        Ok(AudioBuffer::mono(segment, self.sample_rate))
    }

    fn has_more(&self) -> bool {
        self.cursor < self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_reported() {
        let err = decode_file("/nonexistent/voice.wav").unwrap_err();
        assert!(err.downcast_ref::<CoreError>().is_some());
    }

    #[test]
    fn stereo_buffer_is_downmixed() {
        let rec = FileRecorder::from_buffer(
            AudioBuffer::interleaved(vec![0.2, 0.4, 0.6, 0.8], 2, 16000).unwrap(),
        );
        assert_eq!(rec.samples.len(), 2);
        assert_eq!(rec.sample_rate(), 16000);
    }

    #[test]
    fn segments_cover_the_file() {
        let mut rec = FileRecorder::from_buffer(AudioBuffer::mono(vec![0.1; 50_000], 10_000));
        let config = CaptureConfig {
            duration_secs: 2.0,
            ..CaptureConfig::default()
        };
        assert_eq!(rec.segment_count(&config), 3);
        let mut total = 0;
        while rec.has_more() {
            total += rec.capture(&config).unwrap().frames();
        }
        assert_eq!(total, 50_000);
        let err = rec.capture(&config).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AudioError>(),
            Some(AudioError::EndOfStream)
        ));
    }

    #[test]
    fn empty_buffer_has_nothing() {
        let rec = FileRecorder::from_buffer(AudioBuffer::default());
        assert!(!rec.has_more());
    }
}
