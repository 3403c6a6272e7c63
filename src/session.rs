use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Lifecycle of one attempt. Transitions only move forward; a fresh attempt
/// means a fresh `TypingSession`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// The challenge has no target text at all.
    EmptyTarget,
    /// Submission with zero typed characters; never recorded.
    EmptyAttempt,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::EmptyTarget => write!(f, "challenge has no target text"),
            SessionError::EmptyAttempt => write!(f, "cannot submit an empty attempt"),
        }
    }
}

impl std::error::Error for SessionError {}

/// Finalized metrics for one attempt, ready to hand to an attempt store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptResult {
    pub challenge_id: String,
    pub wpm: u32,
    pub accuracy_percent: u8,
    pub elapsed_secs: u32,
    /// True when the typed text matched the target exactly at finalization.
    pub completed: bool,
}

/// Evaluates a live input stream against a fixed target text.
///
/// Every call to `on_input` recomputes error positions and accuracy from
/// scratch, so the session is insensitive to how the host batches edits
/// (per keystroke, per buffered editor change, etc.).
#[derive(Debug, Clone)]
pub struct TypingSession {
    challenge_id: String,
    target: String,
    typed: String,
    error_positions: BTreeSet<usize>,
    accuracy_percent: u8,
    wpm: u32,
    state: SessionState,
    started_at_ms: Option<i64>,
    completed_at_ms: Option<i64>,
    result: Option<AttemptResult>,
}

/// Integer division with round-half-up. Both metrics in this module use it.
fn round_div(num: u64, den: u64) -> u64 {
    (2 * num + den) / (2 * den)
}

impl TypingSession {
    /// Start evaluating against `target`. A challenge with no content is
    /// rejected here rather than treated as instantly complete.
    pub fn begin(
        challenge_id: impl Into<String>,
        target: impl Into<String>,
    ) -> Result<Self, SessionError> {
        let target = target.into();
        if target.is_empty() {
            return Err(SessionError::EmptyTarget);
        }
        Ok(Self {
            challenge_id: challenge_id.into(),
            target,
            typed: String::new(),
            error_positions: BTreeSet::new(),
            accuracy_percent: 0,
            wpm: 0,
            state: SessionState::InProgress,
            started_at_ms: Some(Utc::now().timestamp_millis()),
            completed_at_ms: None,
            result: None,
        })
    }

    /// Re-evaluate the full typed text.
    ///
    /// `clock_elapsed_secs` is only consulted when this input completes the
    /// session (exact match against the target), in which case the finalized
    /// result is returned. Calling with unchanged input is harmless, and a
    /// completed session ignores further input.
    pub fn on_input(&mut self, typed: &str, clock_elapsed_secs: u32) -> Option<AttemptResult> {
        if self.state != SessionState::InProgress {
            return None;
        }

        self.typed.clear();
        self.typed.push_str(typed);
        self.error_positions.clear();

        let mut expected = self.target.chars();
        let mut typed_len: u64 = 0;
        let mut correct: u64 = 0;
        for (idx, ch) in typed.chars().enumerate() {
            typed_len += 1;
            // anything beyond the end of the target is an error by definition
            match expected.next() {
                Some(want) if want == ch => correct += 1,
                _ => {
                    self.error_positions.insert(idx);
                }
            }
        }

        self.accuracy_percent = if typed_len == 0 {
            0
        } else {
            round_div(100 * correct, typed_len) as u8
        };

        if self.typed == self.target {
            // a non-empty target just matched, so the attempt is non-empty
            // and complete() cannot reject it
            return self.complete(clock_elapsed_secs).ok();
        }
        None
    }

    /// Finalize the attempt and derive its metrics.
    ///
    /// Words-per-minute uses the 5-characters-per-word convention over what
    /// was actually typed, with elapsed time floored at one second.
    /// Idempotent: a second call returns the result computed by the first,
    /// which settles the race between timer expiry and an exact match
    /// landing at the same moment.
    pub fn complete(&mut self, clock_elapsed_secs: u32) -> Result<AttemptResult, SessionError> {
        if let Some(result) = &self.result {
            return Ok(result.clone());
        }
        if self.typed.is_empty() {
            return Err(SessionError::EmptyAttempt);
        }

        let elapsed_secs = clock_elapsed_secs.max(1);
        let typed_len = self.typed.chars().count() as u64;
        // (chars / 5) words over (elapsed / 60) minutes
        self.wpm = round_div(typed_len * 12, elapsed_secs as u64) as u32;
        self.state = SessionState::Completed;
        self.completed_at_ms = Some(Utc::now().timestamp_millis());

        let result = AttemptResult {
            challenge_id: self.challenge_id.clone(),
            wpm: self.wpm,
            accuracy_percent: self.accuracy_percent,
            elapsed_secs,
            completed: self.typed == self.target,
        };
        self.result = Some(result.clone());
        Ok(result)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_completed(&self) -> bool {
        self.state == SessionState::Completed
    }

    pub fn challenge_id(&self) -> &str {
        &self.challenge_id
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn typed(&self) -> &str {
        &self.typed
    }

    pub fn error_positions(&self) -> &BTreeSet<usize> {
        &self.error_positions
    }

    pub fn accuracy_percent(&self) -> u8 {
        self.accuracy_percent
    }

    pub fn wpm(&self) -> u32 {
        self.wpm
    }

    pub fn started_at_ms(&self) -> Option<i64> {
        self.started_at_ms
    }

    pub fn completed_at_ms(&self) -> Option<i64> {
        self.completed_at_ms
    }

    /// Portion of the target covered by typed input, for progress display.
    pub fn progress_percent(&self) -> u8 {
        let target_len = self.target.chars().count();
        if target_len == 0 {
            return 100;
        }
        let typed_len = self.typed.chars().count().min(target_len);
        round_div(100 * typed_len as u64, target_len as u64) as u8
    }

    /// The previously finalized result, retained so a failed store insert can
    /// be retried without re-typing.
    pub fn result(&self) -> Option<&AttemptResult> {
        self.result.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn begin_rejects_empty_target() {
        assert_matches!(TypingSession::begin("c1", ""), Err(SessionError::EmptyTarget));
    }

    #[test]
    fn begin_starts_in_progress() {
        let session = TypingSession::begin("c1", "abc").unwrap();
        assert_eq!(session.state(), SessionState::InProgress);
        assert_eq!(session.typed(), "");
        assert_eq!(session.accuracy_percent(), 0);
        assert!(session.started_at_ms().is_some());
        assert!(session.completed_at_ms().is_none());
    }

    #[test]
    fn input_sequence_tracks_errors_and_accuracy() {
        let mut session = TypingSession::begin("c1", "abc").unwrap();

        assert!(session.on_input("a", 1).is_none());
        assert!(session.error_positions().is_empty());
        assert_eq!(session.accuracy_percent(), 100);

        assert!(session.on_input("ab", 2).is_none());
        assert!(session.error_positions().is_empty());
        assert_eq!(session.accuracy_percent(), 100);

        assert!(session.on_input("abx", 3).is_none());
        assert_eq!(
            session.error_positions().iter().copied().collect::<Vec<_>>(),
            vec![2]
        );
        // 2 of 3 correct, rounded
        assert_eq!(session.accuracy_percent(), 67);

        let result = session.on_input("abc", 4).expect("exact match completes");
        assert!(session.error_positions().is_empty());
        assert_eq!(session.accuracy_percent(), 100);
        assert_eq!(session.state(), SessionState::Completed);
        assert!(result.completed);
    }

    #[test]
    fn overflow_typing_is_all_errors() {
        let mut session = TypingSession::begin("c1", "ab").unwrap();
        session.on_input("abxy", 1);
        assert_eq!(
            session.error_positions().iter().copied().collect::<Vec<_>>(),
            vec![2, 3]
        );
        assert_eq!(session.accuracy_percent(), 50);
    }

    #[test]
    fn error_positions_match_differing_indices() {
        let mut session = TypingSession::begin("c1", "hello world").unwrap();
        session.on_input("hxllo_w", 1);
        assert_eq!(
            session.error_positions().iter().copied().collect::<Vec<_>>(),
            vec![1, 5]
        );
    }

    #[test]
    fn accuracy_is_zero_for_empty_input() {
        let mut session = TypingSession::begin("c1", "abc").unwrap();
        session.on_input("a", 1);
        session.on_input("", 1);
        assert_eq!(session.accuracy_percent(), 0);
        assert!(session.error_positions().is_empty());
    }

    #[test]
    fn repeated_input_is_idempotent() {
        let mut session = TypingSession::begin("c1", "abc").unwrap();
        session.on_input("ax", 1);
        let errors_first: Vec<_> = session.error_positions().iter().copied().collect();
        let accuracy_first = session.accuracy_percent();
        session.on_input("ax", 2);
        assert_eq!(
            session.error_positions().iter().copied().collect::<Vec<_>>(),
            errors_first
        );
        assert_eq!(session.accuracy_percent(), accuracy_first);
    }

    #[test]
    fn complete_rejects_empty_attempt() {
        let mut session = TypingSession::begin("c1", "hello").unwrap();
        assert_matches!(session.complete(0), Err(SessionError::EmptyAttempt));
        // rejection leaves the session untouched
        assert_eq!(session.state(), SessionState::InProgress);
        assert!(session.completed_at_ms().is_none());
    }

    #[test]
    fn complete_floors_elapsed_at_one_second() {
        let mut session = TypingSession::begin("c1", "hello").unwrap();
        session.on_input("he", 0);
        let result = session.complete(0).unwrap();
        assert_eq!(result.elapsed_secs, 1);
    }

    #[test]
    fn wpm_uses_five_char_words_over_typed_length() {
        // 50 chars in 30s -> (50/5) words / 0.5 min = 20 wpm
        let target = "x".repeat(60);
        let mut session = TypingSession::begin("c1", target).unwrap();
        session.on_input(&"x".repeat(50), 30);
        let result = session.complete(30).unwrap();
        assert_eq!(result.wpm, 20);
        assert!(!result.completed);
    }

    #[test]
    fn complete_is_idempotent() {
        let mut session = TypingSession::begin("c1", "abc").unwrap();
        session.on_input("abx", 9);
        let first = session.complete(9).unwrap();
        // a second completion (e.g. expiry racing a submit) returns the
        // first result wins even with a different elapsed time
        let second = session.complete(99).unwrap();
        assert_eq!(first, second);
        assert_eq!(session.result(), Some(&first));
    }

    #[test]
    fn match_then_expiry_keeps_first_result() {
        let mut session = TypingSession::begin("c1", "ab").unwrap();
        let matched = session.on_input("ab", 5).expect("match completes");
        assert!(matched.completed);
        let replay = session.complete(120).unwrap();
        assert_eq!(matched, replay);
    }

    #[test]
    fn input_after_completion_is_ignored() {
        let mut session = TypingSession::begin("c1", "ab").unwrap();
        session.on_input("ab", 1);
        assert!(session.on_input("abzzz", 2).is_none());
        assert_eq!(session.typed(), "ab");
        assert_eq!(session.accuracy_percent(), 100);
    }

    #[test]
    fn accuracy_stays_within_bounds() {
        let mut session = TypingSession::begin("c1", "abcd").unwrap();
        for input in ["z", "zz", "azz", "abcz", "abcdzz"] {
            session.on_input(input, 1);
            assert!(session.accuracy_percent() <= 100);
        }
    }

    #[test]
    fn full_accuracy_only_without_errors() {
        let mut session = TypingSession::begin("c1", "abc").unwrap();
        session.on_input("ab", 1);
        assert_eq!(session.accuracy_percent(), 100);
        assert!(session.error_positions().is_empty());

        session.on_input("abx", 1);
        assert!(session.accuracy_percent() < 100);
    }

    #[test]
    fn progress_caps_at_target_length() {
        let mut session = TypingSession::begin("c1", "abcd").unwrap();
        session.on_input("ab", 1);
        assert_eq!(session.progress_percent(), 50);
        session.on_input("abcdxx", 1);
        assert_eq!(session.progress_percent(), 100);
    }

    #[test]
    fn round_div_rounds_half_up() {
        assert_eq!(round_div(403, 6), 67);
        assert_eq!(round_div(1, 2), 1);
        assert_eq!(round_div(5, 2), 3);
        assert_eq!(round_div(600, 30), 20);
    }
}
