//! Voice-interaction session controller
//!
//! One session drives the capture → transcribe → converse → synthesize →
//! playback pipeline. A single `Phase` value is the mutual-exclusion guard:
//! user triggers are accepted only from `Idle` (and `press_end` only from
//! `Recording`), so no two phases and no two remote calls ever overlap.
//! Every failure inside a phase is converted into one fixed diagnostic
//! utterance and the session returns to `Idle`; nothing is fatal.

use crate::client::TutorBackend;
use crate::transcript::{Speaker, TranscriptLog, Utterance};
use crate::voice::{AudioIn, AudioOut, PlaybackControl};

/// Diagnostic spoken when the microphone cannot be acquired
pub const DIAG_MIC: &str =
    "I can't access your microphone. Please allow mic permissions and try again.";

/// Diagnostic spoken when transcription returns no speech
pub const DIAG_EMPTY_TRANSCRIPT: &str =
    "I didn't catch that. Try again with a short clip (<= 15s).";

/// Diagnostic spoken when transcription fails outright
pub const DIAG_TRANSCRIBE_FAILED: &str =
    "Hmm, transcription failed. Please try again with a 4-8s clip and speak near the mic.";

/// Diagnostic spoken when the dialogue or synthesis call fails
pub const DIAG_TURN_FAILED: &str =
    "Sorry, something went wrong on my side. Please try again.";

/// Reply used when the dialogue service returns an empty reply
pub const FALLBACK_REPLY: &str = "Let's keep practicing!";

/// Current step of the voice-interaction state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Ready for a new user action
    #[default]
    Idle,
    /// Microphone open, buffering a clip
    Recording,
    /// Clip submitted to the transcription service
    Transcribing,
    /// Waiting on the dialogue service
    Thinking,
    /// Waiting on synthesis; playback starts before leaving this phase
    Speaking,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Transcribing => "transcribing",
            Self::Thinking => "thinking",
            Self::Speaking => "speaking",
        };
        write!(f, "{s}")
    }
}

/// Roleplay context sent to the dialogue service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scenario {
    /// Default tutor mode, sent as an empty scenario string
    #[default]
    Tutor,
    /// School roleplay (teacher persona)
    School,
    /// Store roleplay (shopkeeper persona)
    Store,
    /// Home roleplay (parent persona)
    Home,
}

impl Scenario {
    /// Wire representation expected by the dialogue service
    #[must_use]
    pub const fn as_wire(self) -> &'static str {
        match self {
            Self::Tutor => "",
            Self::School => "School",
            Self::Store => "Store",
            Self::Home => "Home",
        }
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Tutor => "tutor",
            Self::School => "school",
            Self::Store => "store",
            Self::Home => "home",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "tutor" => Ok(Self::Tutor),
            "school" => Ok(Self::School),
            "store" => Ok(Self::Store),
            "home" => Ok(Self::Home),
            other => Err(format!(
                "unknown scenario '{other}' (expected tutor, school, store, or home)"
            )),
        }
    }
}

/// The single voice-interaction session
///
/// Owns the transcript, the audio seams, and at most one in-flight playback
/// handle. All mutation happens through the trigger methods below; callers
/// observe state via [`Session::phase`] and [`Session::transcript`].
pub struct Session<B, I, O> {
    backend: B,
    mic: I,
    speaker: O,
    phase: Phase,
    scenario: Scenario,
    transcript: TranscriptLog,
    playback: Option<Box<dyn PlaybackControl>>,
    playback_speed: f32,
}

impl<B, I, O> Session<B, I, O>
where
    B: TutorBackend,
    I: AudioIn,
    O: AudioOut,
{
    /// Create an idle session
    pub fn new(backend: B, mic: I, speaker: O, playback_speed: f32) -> Self {
        Self {
            backend,
            mic,
            speaker,
            phase: Phase::Idle,
            scenario: Scenario::default(),
            transcript: TranscriptLog::new(),
            playback: None,
            playback_speed,
        }
    }

    /// Current phase of the state machine
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Active roleplay scenario
    #[must_use]
    pub const fn scenario(&self) -> Scenario {
        self.scenario
    }

    /// Read access to the conversation log
    #[must_use]
    pub const fn transcript(&self) -> &TranscriptLog {
        &self.transcript
    }

    /// Select the roleplay scenario for subsequent turns
    pub fn set_scenario(&mut self, scenario: Scenario) {
        tracing::info!(%scenario, "scenario selected");
        self.scenario = scenario;
    }

    /// Clear the conversation log and restart sequencing
    pub fn clear_log(&mut self) {
        self.transcript.clear();
    }

    /// Hold gesture started: begin recording
    ///
    /// No-op unless the session is idle. A microphone failure appends the
    /// fixed diagnostic and leaves the session idle.
    pub fn press_start(&mut self) {
        if self.phase != Phase::Idle {
            tracing::debug!(phase = %self.phase, "recording trigger ignored, session busy");
            return;
        }
        self.reap_playback();

        self.phase = Phase::Recording;
        if let Err(e) = self.mic.begin() {
            tracing::warn!(error = %e, "microphone acquisition failed");
            self.fail_turn(DIAG_MIC);
            return;
        }
        tracing::info!("recording");
    }

    /// Hold gesture ended: stop recording and run the turn to completion
    ///
    /// No-op unless currently recording. The microphone is released before
    /// the clip is submitted, on success and failure alike.
    pub async fn press_end(&mut self) {
        if self.phase != Phase::Recording {
            tracing::debug!(phase = %self.phase, "stop trigger ignored, not recording");
            return;
        }

        self.phase = Phase::Transcribing;
        let Some(clip) = self.mic.end() else {
            // Recorder had nothing; abandon the turn quietly
            self.phase = Phase::Idle;
            return;
        };

        match self.backend.transcribe(clip).await {
            Ok(text) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    tracing::info!("no speech detected in clip");
                    self.fail_turn(DIAG_EMPTY_TRANSCRIPT);
                    return;
                }
                self.transcript.append(Speaker::User, text.as_str());
                self.think_and_speak(&text).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "transcription failed");
                self.fail_turn(DIAG_TRANSCRIBE_FAILED);
            }
        }
    }

    /// Typed submit: skip capture and run the turn from the given text
    ///
    /// No-op unless the session is idle and the text is non-empty.
    pub async fn send_text(&mut self, text: &str) {
        if self.phase != Phase::Idle {
            tracing::debug!(phase = %self.phase, "send trigger ignored, session busy");
            return;
        }
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        self.reap_playback();

        self.transcript.append(Speaker::User, text);
        self.think_and_speak(text).await;
    }

    /// Converse then synthesize then start playback, ending idle
    async fn think_and_speak(&mut self, text: &str) {
        self.phase = Phase::Thinking;
        let reply = match self.backend.converse(text, self.scenario).await {
            Ok(reply) => {
                let reply = reply.trim().to_string();
                if reply.is_empty() {
                    tracing::warn!("dialogue service returned an empty reply");
                    FALLBACK_REPLY.to_string()
                } else {
                    reply
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "dialogue request failed");
                self.fail_turn(DIAG_TURN_FAILED);
                return;
            }
        };
        self.transcript.append(Speaker::Tutor, reply.as_str());

        self.phase = Phase::Speaking;
        match self.backend.synthesize(&reply).await {
            Ok(audio) => {
                // Playback is fire-and-forget: the phase does not wait for
                // the audio to finish, only for it to start.
                match self.speaker.start(&audio, self.playback_speed) {
                    Ok(handle) => {
                        self.replace_playback(handle);
                        self.phase = Phase::Idle;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "playback failed to start");
                        self.fail_turn(DIAG_TURN_FAILED);
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "synthesis failed");
                self.fail_turn(DIAG_TURN_FAILED);
            }
        }
    }

    /// Append a diagnostic utterance and return to idle
    fn fail_turn(&mut self, diagnostic: &str) {
        self.transcript.append(Speaker::Tutor, diagnostic);
        self.phase = Phase::Idle;
    }

    /// Install a new playback handle, stopping any previous one first
    fn replace_playback(&mut self, handle: Box<dyn PlaybackControl>) {
        if let Some(mut previous) = self.playback.take() {
            previous.stop();
        }
        self.playback = Some(handle);
    }

    /// Drop a playback handle whose audio has finished
    ///
    /// The device itself was already released when playback completed; this
    /// only frees the handle.
    fn reap_playback(&mut self) {
        if self.playback.as_ref().is_some_and(|p| p.is_finished()) {
            self.playback = None;
        }
    }

    /// Utterances appended after the given sequence number
    ///
    /// Convenience for incremental rendering by a front end.
    pub fn entries_after(&self, sequence: u64) -> impl Iterator<Item = &Utterance> {
        self.transcript.entries().filter(move |u| u.sequence > sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_wire_values() {
        assert_eq!(Scenario::Tutor.as_wire(), "");
        assert_eq!(Scenario::School.as_wire(), "School");
        assert_eq!(Scenario::Store.as_wire(), "Store");
        assert_eq!(Scenario::Home.as_wire(), "Home");
    }

    #[test]
    fn scenario_parsing() {
        assert_eq!("store".parse::<Scenario>().unwrap(), Scenario::Store);
        assert_eq!("  School ".parse::<Scenario>().unwrap(), Scenario::School);
        assert_eq!("".parse::<Scenario>().unwrap(), Scenario::Tutor);
        assert!("mall".parse::<Scenario>().is_err());
    }

    #[test]
    fn phase_starts_idle() {
        assert_eq!(Phase::default(), Phase::Idle);
    }
}
