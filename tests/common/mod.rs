//! Shared test doubles for the session controller
//!
//! The session is written against the `TutorBackend`, `AudioIn`, and
//! `AudioOut` seams, so the whole state machine runs here without audio
//! hardware or a network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tutor_gateway::voice::{AudioIn, AudioOut, PlaybackControl};
use tutor_gateway::{Clip, Error, Result, Scenario, TutorBackend};

/// One observed backend call, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Transcribe,
    Converse { text: String, scenario: String },
    Synthesize { text: String },
}

/// Scripted tutor backend: queued results are popped per call
#[derive(Default)]
pub struct MockBackend {
    transcribe: Mutex<VecDeque<Result<String>>>,
    converse: Mutex<VecDeque<Result<String>>>,
    synthesize: Mutex<VecDeque<Result<Vec<u8>>>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for inspecting calls after the backend moves into the session
    pub fn calls(&self) -> Arc<Mutex<Vec<Call>>> {
        Arc::clone(&self.calls)
    }

    pub fn on_transcribe(self, result: Result<String>) -> Self {
        self.transcribe.lock().unwrap().push_back(result);
        self
    }

    pub fn on_converse(self, result: Result<String>) -> Self {
        self.converse.lock().unwrap().push_back(result);
        self
    }

    pub fn on_synthesize(self, result: Result<Vec<u8>>) -> Self {
        self.synthesize.lock().unwrap().push_back(result);
        self
    }
}

/// A 500-equivalent service failure
pub fn remote_failure() -> Error {
    Error::Remote {
        status: 500,
        body: "internal error".to_string(),
    }
}

#[async_trait]
impl TutorBackend for MockBackend {
    async fn transcribe(&self, _clip: Clip) -> Result<String> {
        self.calls.lock().unwrap().push(Call::Transcribe);
        self.transcribe
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected transcribe call")
    }

    async fn converse(&self, text: &str, scenario: Scenario) -> Result<String> {
        self.calls.lock().unwrap().push(Call::Converse {
            text: text.to_string(),
            scenario: scenario.as_wire().to_string(),
        });
        self.converse
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected converse call")
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push(Call::Synthesize {
            text: text.to_string(),
        });
        self.synthesize
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected synthesize call")
    }
}

/// Observable microphone state: acquire/release accounting
#[derive(Debug, Default)]
pub struct MicState {
    /// Successful acquisitions
    pub begins: usize,
    /// Releases
    pub ends: usize,
    /// Device currently held
    pub live: bool,
}

/// Mock microphone; a successful `begin()` acquires, `end()` releases
#[derive(Default)]
pub struct MockMic {
    state: Arc<Mutex<MicState>>,
    begin_error: Mutex<Option<Error>>,
}

impl MockMic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(error: Error) -> Self {
        let mic = Self::default();
        *mic.begin_error.lock().unwrap() = Some(error);
        mic
    }

    pub fn state(&self) -> Arc<Mutex<MicState>> {
        Arc::clone(&self.state)
    }
}

impl AudioIn for MockMic {
    fn begin(&mut self) -> Result<()> {
        if let Some(e) = self.begin_error.lock().unwrap().take() {
            return Err(e);
        }
        let mut state = self.state.lock().unwrap();
        state.begins += 1;
        state.live = true;
        Ok(())
    }

    fn end(&mut self) -> Option<Clip> {
        let mut state = self.state.lock().unwrap();
        if !state.live {
            return None;
        }
        state.live = false;
        state.ends += 1;
        Some(Clip {
            bytes: vec![0u8; 64],
            mime: "audio/wav",
            duration: Duration::from_secs(1),
        })
    }
}

/// State shared between a mock playback handle and the test
#[derive(Debug, Default)]
pub struct HandleState {
    pub stopped: AtomicBool,
    pub finished: AtomicBool,
}

struct MockHandle(Arc<HandleState>);

impl PlaybackControl for MockHandle {
    fn stop(&mut self) {
        self.0.stopped.store(true, Ordering::SeqCst);
    }

    fn is_finished(&self) -> bool {
        self.0.finished.load(Ordering::SeqCst)
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        // Mirrors the real handle: dropping releases the device
        self.0.stopped.store(true, Ordering::SeqCst);
    }
}

/// Mock speaker recording every playback start
#[derive(Default)]
pub struct MockSpeaker {
    plays: Arc<Mutex<Vec<f32>>>,
    handles: Arc<Mutex<Vec<Arc<HandleState>>>>,
    start_error: Mutex<Option<Error>>,
}

impl MockSpeaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(error: Error) -> Self {
        let speaker = Self::default();
        *speaker.start_error.lock().unwrap() = Some(error);
        speaker
    }

    /// Speeds passed to each playback start
    pub fn plays(&self) -> Arc<Mutex<Vec<f32>>> {
        Arc::clone(&self.plays)
    }

    /// State of every handle issued, in issue order
    pub fn handles(&self) -> Arc<Mutex<Vec<Arc<HandleState>>>> {
        Arc::clone(&self.handles)
    }
}

impl AudioOut for MockSpeaker {
    fn start(&mut self, _audio: &[u8], speed: f32) -> Result<Box<dyn PlaybackControl>> {
        if let Some(e) = self.start_error.lock().unwrap().take() {
            return Err(e);
        }
        self.plays.lock().unwrap().push(speed);
        let state = Arc::new(HandleState::default());
        self.handles.lock().unwrap().push(Arc::clone(&state));
        Ok(Box::new(MockHandle(state)))
    }
}
