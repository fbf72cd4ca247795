//! Audio capture from the microphone
//!
//! A press-and-hold gesture maps to `begin()`/`end()`: frames are buffered
//! in memory between the two and returned as a single WAV clip. The cpal
//! input stream is owned by the recorder; `end()` (or dropping the recorder)
//! releases the device on every exit path.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};

use crate::voice::AudioIn;
use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// Soft maximum clip duration; longer clips are delivered as-is
pub const SOFT_MAX_CLIP_SECS: u64 = 15;

/// A bounded-duration binary audio recording
#[derive(Debug, Clone)]
pub struct Clip {
    /// Encoded audio bytes (WAV container)
    pub bytes: Vec<u8>,
    /// MIME tag for the container, informational for the receiving service
    pub mime: &'static str,
    /// Measured duration of the recording
    pub duration: Duration,
}

impl Clip {
    /// Whether the clip runs past the soft duration cap
    ///
    /// This never blocks delivery; the transcription service decides what
    /// to do with an overlong clip.
    #[must_use]
    pub fn exceeds_soft_cap(&self) -> bool {
        self.duration > Duration::from_secs(SOFT_MAX_CLIP_SECS)
    }
}

/// Records microphone audio between `begin()` and `end()`
pub struct Recorder {
    config: StreamConfig,
    buffer: Arc<Mutex<Vec<f32>>>,
    stream: Option<Stream>,
}

impl Recorder {
    /// Create a new recorder bound to the default input device
    ///
    /// # Errors
    ///
    /// Returns error if no input device is present or no suitable
    /// configuration is supported
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Device("no input device available".to_string()))?;

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::Device(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
            .ok_or_else(|| Error::Device("no suitable input config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            channels = config.channels,
            "recorder initialized"
        );

        Ok(Self {
            config,
            buffer: Arc::new(Mutex::new(Vec::new())),
            stream: None,
        })
    }

    /// Whether a recording is in progress
    #[must_use]
    pub const fn is_recording(&self) -> bool {
        self.stream.is_some()
    }
}

impl AudioIn for Recorder {
    /// Open the microphone and start buffering frames
    ///
    /// Any frames left over from a previous recording are discarded.
    /// Calling `begin()` while already recording is a no-op.
    fn begin(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        if let Ok(mut buf) = self.buffer.lock() {
            buf.clear();
        }

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Device("no input device".to_string()))?;

        let buffer = Arc::clone(&self.buffer);
        let config = self.config.clone();

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend_from_slice(data);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(map_build_error)?;

        stream.play().map_err(|e| Error::Device(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("recording started");
        Ok(())
    }

    /// Stop buffering, release the microphone, and return the clip
    ///
    /// Returns `None` when no recording is in progress. The device is
    /// released before this returns, whatever the caller does with the clip.
    fn end(&mut self) -> Option<Clip> {
        let stream = self.stream.take()?;
        drop(stream);

        let samples = self
            .buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default();

        let duration =
            Duration::from_secs_f64(f64::from(samples.len() as u32) / f64::from(SAMPLE_RATE));

        let bytes = match samples_to_wav(&samples, SAMPLE_RATE) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode clip");
                return None;
            }
        };

        let clip = Clip {
            bytes,
            mime: "audio/wav",
            duration,
        };

        if clip.exceeds_soft_cap() {
            tracing::warn!(
                secs = clip.duration.as_secs(),
                cap = SOFT_MAX_CLIP_SECS,
                "clip exceeds soft duration cap, delivering as-is"
            );
        }

        tracing::debug!(
            bytes = clip.bytes.len(),
            ms = clip.duration.as_millis(),
            "recording stopped"
        );
        Some(clip)
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        // Release the device even on abrupt teardown mid-recording
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("recorder dropped mid-recording, microphone released");
        }
    }
}

/// Map cpal stream-build failures onto the gateway taxonomy
///
/// OS permission denials surface as backend-specific errors on every
/// host API cpal supports.
fn map_build_error(e: cpal::BuildStreamError) -> Error {
    match e {
        cpal::BuildStreamError::DeviceNotAvailable => {
            Error::Device("input device disappeared".to_string())
        }
        cpal::BuildStreamError::BackendSpecific { err } => Error::Permission(err.description),
        other => Error::Audio(other.to_string()),
    }
}

/// Convert f32 samples to WAV bytes for the transcription service
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            // Convert f32 [-1.0, 1.0] to i16
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}
