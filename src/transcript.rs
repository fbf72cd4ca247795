//! Transcript log
//!
//! Append-only ordered record of the conversation. Written only by the
//! session controller; read by whatever renders the conversation.

use serde::Serialize;

/// Who produced an utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// The human learner
    User,
    /// The AI tutor
    Tutor,
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Tutor => write!(f, "tutor"),
        }
    }
}

/// One logged turn of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Utterance {
    /// Who said it
    pub speaker: Speaker,
    /// What was said
    pub text: String,
    /// Append order, starting at 1
    pub sequence: u64,
}

/// Ordered log of utterances with monotonically increasing sequence numbers
#[derive(Debug)]
pub struct TranscriptLog {
    entries: Vec<Utterance>,
    next_sequence: u64,
}

impl Default for TranscriptLog {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptLog {
    /// Create an empty log
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_sequence: 1,
        }
    }

    /// Append an utterance, assigning the next sequence number
    ///
    /// Returns the assigned sequence number.
    pub fn append(&mut self, speaker: Speaker, text: impl Into<String>) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let text = text.into();
        tracing::debug!(%speaker, sequence, %text, "transcript append");
        self.entries.push(Utterance {
            speaker,
            text,
            sequence,
        });
        sequence
    }

    /// Iterate over all utterances in append order
    pub fn entries(&self) -> impl Iterator<Item = &Utterance> {
        self.entries.iter()
    }

    /// The most recently appended utterance
    #[must_use]
    pub fn last(&self) -> Option<&Utterance> {
        self.entries.last()
    }

    /// Number of logged utterances
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove all utterances and restart sequencing from 1
    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_sequence = 1;
        tracing::debug!("transcript cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_log_sequences_from_one() {
        let mut log = TranscriptLog::default();
        assert_eq!(log.append(Speaker::User, "hi"), 1);
    }

    #[test]
    fn sequences_start_at_one_and_increase() {
        let mut log = TranscriptLog::new();
        assert_eq!(log.append(Speaker::User, "hi"), 1);
        assert_eq!(log.append(Speaker::Tutor, "hello"), 2);
        assert_eq!(log.append(Speaker::User, "bye"), 3);

        let seqs: Vec<u64> = log.entries().map(|u| u.sequence).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn clear_resets_sequencing() {
        let mut log = TranscriptLog::new();
        log.append(Speaker::User, "one");
        log.append(Speaker::Tutor, "two");

        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.append(Speaker::User, "again"), 1);
    }

    #[test]
    fn entries_iteration_is_restartable() {
        let mut log = TranscriptLog::new();
        log.append(Speaker::User, "a");
        log.append(Speaker::Tutor, "b");

        assert_eq!(log.entries().count(), 2);
        // A second pass sees the same contents
        assert_eq!(log.entries().count(), 2);
        assert_eq!(log.last().map(|u| u.text.as_str()), Some("b"));
    }
}
