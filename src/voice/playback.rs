//! Audio playback to speakers
//!
//! Playback is fire-and-forget: `start()` decodes the synthesized MP3,
//! spawns a dedicated thread that owns the cpal output stream (streams are
//! not `Send`), and returns a handle immediately. The thread drops the
//! stream when playback completes or the handle asks it to stop, so the
//! device is released on every path including a leaked handle.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use crate::voice::{AudioOut, PlaybackControl};
use crate::{Error, Result};

/// Fallback playback sample rate when the decoder reports none
const DEFAULT_PLAYBACK_RATE: u32 = 24000;

/// Handle to an in-flight playback
///
/// `stop()` is idempotent; dropping the handle also stops playback.
/// `is_finished()` transitions false to true exactly once per handle.
pub struct PlaybackHandle {
    stop: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl PlaybackControl for PlaybackHandle {
    fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

impl Drop for PlaybackHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            // The playback loop polls the stop flag every 20ms
            let _ = thread.join();
        }
    }
}

/// Plays synthesized audio on the default output device
pub struct SpeakerOut;

impl SpeakerOut {
    /// Create a new playback instance
    ///
    /// # Errors
    ///
    /// Returns error if no output device is present
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Device("no output device available".to_string()))?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            "playback initialized"
        );
        Ok(Self)
    }

    /// Play raw PCM samples at the given rate multiplier
    ///
    /// Used by the speaker self-test; `start()` goes through the same path
    /// after decoding.
    ///
    /// # Errors
    ///
    /// Returns error if the sample buffer is empty
    pub fn start_pcm(
        &mut self,
        samples: Vec<f32>,
        sample_rate: u32,
        speed: f32,
    ) -> Result<PlaybackHandle> {
        if samples.is_empty() {
            return Err(Error::Decode("no audio samples to play".to_string()));
        }

        let stop = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));

        let thread = spawn_playback_thread(
            samples,
            sample_rate,
            speed,
            Arc::clone(&stop),
            Arc::clone(&finished),
        );

        Ok(PlaybackHandle {
            stop,
            finished,
            thread: Some(thread),
        })
    }
}

impl AudioOut for SpeakerOut {
    /// Decode MP3 bytes and start asynchronous playback
    fn start(&mut self, mp3: &[u8], speed: f32) -> Result<Box<dyn PlaybackControl>> {
        let (samples, sample_rate) = decode_playable(mp3)?;
        let handle = self.start_pcm(samples, sample_rate, speed)?;
        Ok(Box::new(handle))
    }
}

/// Run the output stream on its own thread until done or stopped
fn spawn_playback_thread(
    samples: Vec<f32>,
    sample_rate: u32,
    speed: f32,
    stop: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        if let Err(e) = run_playback(samples, sample_rate, speed, &stop, &finished) {
            tracing::error!(error = %e, "playback failed");
        }
        // Completion fires exactly once: nothing resets this flag
        finished.store(true, Ordering::SeqCst);
    })
}

fn run_playback(
    samples: Vec<f32>,
    sample_rate: u32,
    speed: f32,
    stop: &Arc<AtomicBool>,
    finished: &Arc<AtomicBool>,
) -> Result<()> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Device("no output device".to_string()))?;

    let supported_config = device
        .supported_output_configs()
        .map_err(|e| Error::Device(e.to_string()))?
        .find(|c| {
            c.channels() == 1
                && c.min_sample_rate() <= SampleRate(sample_rate)
                && c.max_sample_rate() >= SampleRate(sample_rate)
        })
        .or_else(|| {
            // Fallback: try stereo
            device.supported_output_configs().ok()?.find(|c| {
                c.channels() == 2
                    && c.min_sample_rate() <= SampleRate(sample_rate)
                    && c.max_sample_rate() >= SampleRate(sample_rate)
            })
        })
        .ok_or_else(|| Error::Device("no suitable output config found".to_string()))?;

    let config: StreamConfig = supported_config.with_sample_rate(SampleRate(sample_rate)).config();
    let channels = config.channels as usize;

    let source: Arc<Vec<f32>> = Arc::new(samples);
    let source_cb = Arc::clone(&source);
    let finished_cb = Arc::clone(finished);
    // Fractional read position; stepping by `speed` changes the playback rate
    let mut position: f64 = 0.0;
    let step = f64::from(speed);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels) {
                    let idx = position as usize;
                    let sample = if idx + 1 < source_cb.len() {
                        // Linear interpolation between neighbouring samples
                        let frac = (position - idx as f64) as f32;
                        source_cb[idx] * (1.0 - frac) + source_cb[idx + 1] * frac
                    } else {
                        finished_cb.store(true, Ordering::SeqCst);
                        0.0
                    };

                    for out in frame.iter_mut() {
                        *out = sample;
                    }

                    if idx + 1 < source_cb.len() {
                        position += step;
                    }
                }
            },
            |err| {
                tracing::error!(error = %err, "audio playback error");
            },
            None,
        )
        .map_err(|e| Error::Device(e.to_string()))?;

    stream.play().map_err(|e| Error::Device(e.to_string()))?;

    let duration_ms = (source.len() as u64 * 1000) / u64::from(sample_rate);
    let scaled_ms = (duration_ms as f64 / f64::from(speed)) as u64;
    let deadline = Instant::now() + Duration::from_millis(scaled_ms + 500);

    while !finished.load(Ordering::SeqCst) && !stop.load(Ordering::SeqCst) {
        if Instant::now() > deadline {
            tracing::warn!("playback overran its expected duration");
            break;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    drop(stream);
    tracing::debug!(samples = source.len(), "playback stream released");
    Ok(())
}

/// Decode MP3 bytes to playable f32 samples
///
/// # Errors
///
/// Returns [`Error::Decode`] when the bytes contain no decodable audio
pub fn decode_playable(mp3: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3));
    let mut samples = Vec::new();
    let mut sample_rate = DEFAULT_PLAYBACK_RATE;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                match u32::try_from(frame.sample_rate) {
                    Ok(rate) if rate > 0 => sample_rate = rate,
                    _ => {}
                }

                // Convert i16 samples to f32, folding stereo down to mono
                let frame_samples: Vec<f32> = if frame.channels == 2 {
                    frame
                        .data
                        .chunks(2)
                        .map(|chunk| {
                            let left = f32::from(chunk[0]) / 32768.0;
                            let right =
                                f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                            (left + right) * 0.5
                        })
                        .collect()
                } else {
                    frame.data.iter().map(|&s| f32::from(s) / 32768.0).collect()
                };

                samples.extend(frame_samples);
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Decode(format!("MP3 decode error: {e}"))),
        }
    }

    if samples.is_empty() {
        return Err(Error::Decode("no decodable audio frames".to_string()));
    }

    Ok((samples, sample_rate))
}
