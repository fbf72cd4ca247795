//! Tutor Gateway - voice session controller for a remote AI tutor
//!
//! This library provides the core of a press-and-hold voice tutor client:
//! capture a short clip, transcribe it, get a tutor reply, synthesize
//! speech, and play it back — with one always-known interaction phase
//! preventing overlapping operations.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                 User triggers                     │
//! │  hold/release │ typed text │ scenario │ clear    │
//! └───────────────────────┬──────────────────────────┘
//!                         │
//! ┌───────────────────────▼──────────────────────────┐
//! │              Session Controller                   │
//! │  Idle → Recording → Transcribing → Thinking →    │
//! │  Speaking → Idle  (any failure → Idle)           │
//! └───────┬───────────────┬───────────────┬──────────┘
//!         │               │               │
//! ┌───────▼──────┐ ┌──────▼───────┐ ┌─────▼────────┐
//! │  Mic/Speaker │ │ Tutor backend│ │  Transcript  │
//! │  (cpal)      │ │ (/stt /chat  │ │  log         │
//! │              │ │  /tts)       │ │              │
//! └──────────────┘ └──────────────┘ └──────────────┘
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod session;
pub mod transcript;
pub mod voice;

pub use client::{HealthInfo, HttpTutorClient, TutorBackend, DEFAULT_API_BASE};
pub use config::{Config, DEFAULT_PLAYBACK_SPEED};
pub use error::{Error, Result};
pub use session::{Phase, Scenario, Session};
pub use transcript::{Speaker, TranscriptLog, Utterance};
pub use voice::{
    samples_to_wav, AudioIn, AudioOut, Clip, PlaybackControl, Recorder, SpeakerOut, SAMPLE_RATE,
    SOFT_MAX_CLIP_SECS,
};
