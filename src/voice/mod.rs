//! Voice I/O module
//!
//! Owns the microphone and speaker devices. The `AudioIn`/`AudioOut` traits
//! are the seams the session controller is written against, so the state
//! machine can be exercised without audio hardware.

mod capture;
mod playback;

pub use capture::{samples_to_wav, Clip, Recorder, SAMPLE_RATE, SOFT_MAX_CLIP_SECS};
pub use playback::{decode_playable, PlaybackHandle, SpeakerOut};

use crate::Result;

/// Microphone capture seam
///
/// `begin()` acquires the device and starts buffering; `end()` releases it
/// and returns the accumulated clip. A fresh `begin()` discards whatever a
/// previous recording buffered.
pub trait AudioIn {
    /// Acquire the microphone and start buffering frames
    ///
    /// # Errors
    ///
    /// Returns error if the device is unavailable or permission is denied
    fn begin(&mut self) -> Result<()>;

    /// Stop buffering and return the clip; `None` when nothing was recording
    fn end(&mut self) -> Option<Clip>;
}

/// Speaker output seam
pub trait AudioOut {
    /// Start asynchronous playback of encoded audio at a rate multiplier
    ///
    /// Returns immediately once playback has started; the handle releases
    /// the underlying device when playback completes or is stopped.
    ///
    /// # Errors
    ///
    /// Returns error if the audio cannot be decoded or no device is usable
    fn start(&mut self, audio: &[u8], speed: f32) -> Result<Box<dyn PlaybackControl>>;
}

/// Control surface of an in-flight playback
pub trait PlaybackControl: Send {
    /// Stop playback and release the device; idempotent
    fn stop(&mut self);

    /// Whether playback has completed; fires exactly once per handle
    fn is_finished(&self) -> bool;
}
