use std::time::{Duration, Instant};

use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Consumer, RingBuffer};
use vs_core::buffer::AudioBuffer;
use vs_core::config::CaptureConfig;
use vs_core::traits::Recorder;

use crate::error::AudioError;

/// Ring buffer length, in seconds of audio at the stream rate.
const RING_SECONDS: usize = 2;
/// Poll interval while waiting for the device.
const POLL: Duration = Duration::from_millis(10);
/// Extra time granted to a slow device beyond the recording length.
const GRACE: Duration = Duration::from_secs(2);

/// Microphone recorder via cpal.
///
/// The device callback pushes interleaved f32 samples into a lock-free ring
/// buffer; [`Recorder::capture`] drains stale audio, then blocks until a full
/// recording is available.
///
/// The stream is not `Send` on every backend: build the recorder on the
/// thread that uses it.
///
/// # Example
/// ```no_run
/// use vs_audio::capture::MicRecorder;
/// use vs_core::config::CaptureConfig;
/// use vs_core::traits::Recorder;
///
/// let mut mic = MicRecorder::open(&CaptureConfig::default()).unwrap();
/// let buffer = mic.capture(&CaptureConfig::default()).unwrap();
/// ```
pub struct MicRecorder {
    /// Kept alive for the callback to keep running.
    _stream: cpal::Stream,
    consumer: Consumer<f32>,
    sample_rate: u32,
    channels: u16,
    /// What the config asked for; a change triggers a reopen.
    requested: (u32, u16),
}

impl MicRecorder {
    /// Open the default input device.
    ///
    /// Uses the requested rate and channel count when the device supports
    /// them, otherwise the device's default input configuration.
    ///
    /// # Errors
    /// Returns an error if no input device exists or the stream cannot start.
    pub fn open(config: &CaptureConfig) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(AudioError::NoInputDevice)?;

        let stream_config = match requested_config(&device, config) {
            Some(c) => c,
            None => {
                let default = device
                    .default_input_config()
                    .map_err(|e| AudioError::UnsupportedFormat(e.to_string()))?;
                log::warn!(
                    "{} Hz / {} canal(aux) non supporté, utilisation de {} Hz / {}",
                    config.sample_rate,
                    config.channels,
                    default.sample_rate().0,
                    default.channels()
                );
                default.into()
            }
        };

        let sample_rate = stream_config.sample_rate.0;
        let channels = stream_config.channels;

        let capacity = sample_rate as usize * usize::from(channels) * RING_SECONDS;
        let (mut producer, consumer) = RingBuffer::new(capacity);

        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    for &sample in data {
                        // Full ring: the reader is late and will drain anyway.
                        let _ = producer.push(sample);
                    }
                },
                |err| {
                    log::error!("Erreur du stream audio : {err}");
                },
                None,
            )
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        log::info!(
            "Capture micro : {} ({sample_rate} Hz, {channels} canal(aux))",
            device.name().unwrap_or_else(|_| "inconnu".into())
        );

        Ok(Self {
            _stream: stream,
            consumer,
            sample_rate,
            channels,
            requested: (config.sample_rate, config.channels),
        })
    }

    /// Actual stream sample rate.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Actual stream channel count.
    #[must_use]
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Discard everything recorded before now.
    fn drain(&mut self) {
        while self.consumer.pop().is_ok() {}
    }
}

impl Recorder for MicRecorder {
    fn capture(&mut self, config: &CaptureConfig) -> Result<AudioBuffer> {
        if self.requested != (config.sample_rate, config.channels) {
            log::info!("Paramètres de capture modifiés, réouverture du périphérique");
            *self = Self::open(config)?;
        }

        self.drain();

        let frames = (self.sample_rate as f32 * config.duration_secs).round() as usize;
        let wanted = frames * usize::from(self.channels);
        let mut samples = Vec::with_capacity(wanted);

        let started = Instant::now();
        let deadline = Duration::from_secs_f32(config.duration_secs.max(0.0)) + GRACE;
        loop {
            while samples.len() < wanted {
                match self.consumer.pop() {
                    Ok(s) => samples.push(s),
                    Err(_) => break,
                }
            }
            if samples.len() >= wanted {
                break;
            }
            let waited = started.elapsed();
            if waited > deadline {
                return Err(AudioError::CaptureTimeout {
                    got: samples.len(),
                    wanted,
                    waited,
                }
                .into());
            }
            std::thread::sleep(POLL);
        }

        AudioBuffer::interleaved(samples, self.channels, self.sample_rate).map_err(Into::into)
    }
}

/// The requested rate/channels as an f32 stream config, if the device offers it.
fn requested_config(device: &cpal::Device, config: &CaptureConfig) -> Option<cpal::StreamConfig> {
    let rate = cpal::SampleRate(config.sample_rate);
    device
        .supported_input_configs()
        .ok()?
        .filter(|range| {
            range.channels() == config.channels
                && range.sample_format() == cpal::SampleFormat::F32
        })
        .find_map(|range| range.try_with_sample_rate(rate))
        .map(|supported| supported.config())
}
