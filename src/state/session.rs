use crate::models::settings::leaderboard_name;
use crate::models::{GameMode, POINTS_PER_CORRECT, RoundImage};
use crate::services::image_set::{ImageSetProvider, ImageSetWarning, RoundSet};
use crate::storage::ScoreRecorder;
use std::sync::Arc;

/// Default countdown of a hard-mode round, in seconds.
pub const HARD_TIME_LIMIT_SECS: u32 = 30;

/// Why a session ended in failure
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureCause {
    /// The player picked a distractor; `target` is the flagged image's id
    WrongPick { picked: u32, target: Option<u32> },

    /// The hard-mode countdown reached zero
    TimedOut,
}

/// Terminal result of a session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Every round of a capped mode was answered correctly
    Completed,
    Failed(FailureCause),
}

/// Where a session stands.
///
/// Leaving [`RoundPhase::Correct`] is the round-advance step: either the next
/// round starts in [`RoundPhase::AwaitingInput`] or the session is over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundPhase {
    AwaitingInput,
    /// Correct pick shown; waiting for the advance delay
    Correct,
    SessionOver(SessionOutcome),
}

/// What a call into [`RoundSession`] did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Session (re)created and waiting for the first pick
    Started,

    /// The call didn't apply to the current phase
    Ignored,

    Correct { score: u32 },

    Ticked { time_left: u32 },

    NextRound { round: u32 },

    Over {
        outcome: SessionOutcome,
        score: u32,
        /// Whether this transition wrote the score to the leaderboard
        recorded: bool,
    },
}

/// Read-only view of a session for rendering.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSnapshot {
    pub mode: GameMode,
    pub round: u32,
    pub max_rounds: Option<u32>,
    pub score: u32,
    pub time_left: Option<u32>,
    pub phase: RoundPhase,
    pub images: Vec<RoundImage>,
    pub warning: Option<ImageSetWarning>,
}

/// One play-through of a mode.
///
/// Every input goes through a phase check first, so only the first terminal
/// event of a round (pick or timeout) has any effect. The score is written to
/// the [`ScoreRecorder`] at most once per play-through and only when positive.
///
/// The session is synchronous and owns no timers; see
/// [`SessionDriver`](crate::state::SessionDriver) for the timed wrapper.
pub struct RoundSession {
    mode: GameMode,
    player_name: String,
    round: u32,
    score: u32,
    time_limit: u32,
    time_left: Option<u32>,
    phase: RoundPhase,
    set: RoundSet,
    score_recorded: bool,
    provider: Arc<ImageSetProvider>,
    recorder: Arc<dyn ScoreRecorder>,
}

impl RoundSession {
    /// Start a session in round 1 with a fresh image set.
    ///
    /// A blank `player_name` is recorded as "Anonymous".
    pub fn new(
        mode: GameMode,
        player_name: &str,
        provider: Arc<ImageSetProvider>,
        recorder: Arc<dyn ScoreRecorder>,
    ) -> Self {
        let set = provider.build_set(mode);
        let mut session = Self {
            mode,
            player_name: leaderboard_name(player_name).to_string(),
            round: 1,
            score: 0,
            time_limit: HARD_TIME_LIMIT_SECS,
            time_left: None,
            phase: RoundPhase::AwaitingInput,
            set,
            score_recorded: false,
            provider,
            recorder,
        };
        session.time_left = session.full_time();
        tracing::info!("Session started: mode={}, player={:?}", mode, session.player_name);
        session
    }

    /// Override the per-round countdown (hard mode only).
    pub fn with_time_limit(mut self, secs: u32) -> Self {
        self.time_limit = secs.max(1);
        self.time_left = self.full_time();
        self
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn time_left(&self) -> Option<u32> {
        self.time_left
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn images(&self) -> &[RoundImage] {
        &self.set.images
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, RoundPhase::SessionOver(_))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            mode: self.mode,
            round: self.round,
            max_rounds: self.mode.max_rounds(),
            score: self.score,
            time_left: self.time_left,
            phase: self.phase,
            images: self.set.images.clone(),
            warning: self.set.warning,
        }
    }

    /// The player picked image `id`.
    ///
    /// Unknown ids count as a wrong pick. Ignored unless awaiting input.
    pub fn select(&mut self, id: u32) -> Transition {
        if self.phase != RoundPhase::AwaitingInput {
            tracing::debug!("Ignoring pick {} in phase {:?}", id, self.phase);
            return Transition::Ignored;
        }

        let correct = self.set.images.iter().any(|img| img.id == id && img.is_target);
        if correct {
            self.score += POINTS_PER_CORRECT;
            self.phase = RoundPhase::Correct;
            tracing::info!("Round {}: correct pick, score {}", self.round, self.score);
            return Transition::Correct { score: self.score };
        }

        let target = self.set.target().map(|img| img.id);
        tracing::info!("Round {}: wrong pick {} (flagged was {:?})", self.round, id, target);
        self.finish(SessionOutcome::Failed(FailureCause::WrongPick { picked: id, target }))
    }

    /// One countdown second elapsed.
    ///
    /// Only counts in timed modes while awaiting input; reaching zero ends the
    /// session.
    pub fn tick(&mut self) -> Transition {
        if self.phase != RoundPhase::AwaitingInput {
            return Transition::Ignored;
        }
        let Some(left) = self.time_left else {
            return Transition::Ignored;
        };

        let left = left.saturating_sub(1);
        self.time_left = Some(left);
        if left == 0 {
            tracing::info!("Round {}: time is up", self.round);
            return self.finish(SessionOutcome::Failed(FailureCause::TimedOut));
        }
        Transition::Ticked { time_left: left }
    }

    /// Leave the correct-pick display: next round, or completion at the cap.
    pub fn advance(&mut self) -> Transition {
        if self.phase != RoundPhase::Correct {
            return Transition::Ignored;
        }

        if self.mode.max_rounds().is_some_and(|max| self.round >= max) {
            tracing::info!("All {} rounds cleared with {} points", self.round, self.score);
            return self.finish(SessionOutcome::Completed);
        }

        self.round += 1;
        self.start_round();
        Transition::NextRound { round: self.round }
    }

    /// Throw the play-through away and start over from round 1.
    pub fn retry(&mut self) -> Transition {
        tracing::info!("Session reset: mode={}", self.mode);
        self.round = 1;
        self.score = 0;
        self.score_recorded = false;
        self.start_round();
        Transition::Started
    }

    fn start_round(&mut self) {
        self.set = self.provider.build_set(self.mode);
        self.time_left = self.full_time();
        self.phase = RoundPhase::AwaitingInput;
    }

    fn full_time(&self) -> Option<u32> {
        self.mode.is_timed().then_some(self.time_limit)
    }

    fn finish(&mut self, outcome: SessionOutcome) -> Transition {
        self.phase = RoundPhase::SessionOver(outcome);

        let recorded = self.score > 0 && !self.score_recorded;
        if recorded {
            self.recorder.record_score(self.mode, &self.player_name, self.score);
            self.score_recorded = true;
        }

        Transition::Over {
            outcome,
            score: self.score,
            recorded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::image_set::FlaggedPool;
    use crate::storage::leaderboard::MockScoreRecorder;
    use mockall::predicate::eq;

    fn provider() -> Arc<ImageSetProvider> {
        Arc::new(ImageSetProvider::new(
            FlaggedPool::from_refs(vec!["ai/1.png".to_string()]),
            "https://example.com/{seed}.jpg",
        ))
    }

    fn session(mode: GameMode, recorder: MockScoreRecorder) -> RoundSession {
        RoundSession::new(mode, "Ada", provider(), Arc::new(recorder))
    }

    fn target_id(session: &RoundSession) -> u32 {
        session.images().iter().find(|i| i.is_target).unwrap().id
    }

    fn wrong_id(session: &RoundSession) -> u32 {
        session.images().iter().find(|i| !i.is_target).unwrap().id
    }

    #[test]
    fn test_initial_state() {
        let hard = session(GameMode::Hard, MockScoreRecorder::new());
        assert_eq!(hard.round(), 1);
        assert_eq!(hard.score(), 0);
        assert_eq!(hard.time_left(), Some(30));
        assert_eq!(hard.phase(), RoundPhase::AwaitingInput);

        let easy = session(GameMode::Easy, MockScoreRecorder::new());
        assert_eq!(easy.time_left(), None);
        assert_eq!(easy.images().len(), 3);
    }

    #[test]
    fn test_correct_pick_then_advance() {
        let mut s = session(GameMode::Normal, MockScoreRecorder::new());
        let target = target_id(&s);

        assert_eq!(s.select(target), Transition::Correct { score: 50 });
        assert_eq!(s.phase(), RoundPhase::Correct);
        // Double-submit is a no-op
        assert_eq!(s.select(target), Transition::Ignored);

        assert_eq!(s.advance(), Transition::NextRound { round: 2 });
        assert_eq!(s.phase(), RoundPhase::AwaitingInput);
        assert_eq!(s.score(), 50);
    }

    #[test]
    fn test_wrong_first_pick_records_nothing() {
        let mut recorder = MockScoreRecorder::new();
        recorder.expect_record_score().never();

        let mut s = session(GameMode::Easy, recorder);
        let wrong = wrong_id(&s);
        let target = target_id(&s);

        let t = s.select(wrong);
        assert_eq!(
            t,
            Transition::Over {
                outcome: SessionOutcome::Failed(FailureCause::WrongPick {
                    picked: wrong,
                    target: Some(target)
                }),
                score: 0,
                recorded: false,
            }
        );
        assert!(s.is_over());
    }

    #[test]
    fn test_wrong_pick_after_points_records_once() {
        let mut recorder = MockScoreRecorder::new();
        recorder
            .expect_record_score()
            .with(eq(GameMode::Easy), eq("Ada"), eq(100))
            .times(1)
            .return_const(());

        let mut s = session(GameMode::Easy, recorder);
        for _ in 0..2 {
            let target = target_id(&s);
            s.select(target);
            s.advance();
        }
        let wrong = wrong_id(&s);
        assert!(matches!(s.select(wrong), Transition::Over { recorded: true, score: 100, .. }));
        assert_eq!(s.select(wrong), Transition::Ignored);
        assert_eq!(s.tick(), Transition::Ignored);
    }

    #[test]
    fn test_blank_name_records_as_anonymous() {
        let mut recorder = MockScoreRecorder::new();
        recorder
            .expect_record_score()
            .with(eq(GameMode::Normal), eq("Anonymous"), eq(50))
            .times(1)
            .return_const(());

        let mut s = RoundSession::new(GameMode::Normal, "  ", provider(), Arc::new(recorder));
        let target = target_id(&s);
        s.select(target);
        s.advance();
        let wrong = wrong_id(&s);
        assert!(matches!(s.select(wrong), Transition::Over { recorded: true, .. }));
    }

    #[test]
    fn test_easy_mode_has_no_round_cap() {
        let mut s = session(GameMode::Easy, MockScoreRecorder::new());
        for round in 2..=8 {
            let target = target_id(&s);
            s.select(target);
            assert_eq!(s.advance(), Transition::NextRound { round });
        }
        assert_eq!(s.score(), 350);
    }

    #[test]
    fn test_hard_mode_completes_with_250() {
        let mut recorder = MockScoreRecorder::new();
        recorder
            .expect_record_score()
            .with(eq(GameMode::Hard), eq("Ada"), eq(250))
            .times(1)
            .return_const(());

        let mut s = session(GameMode::Hard, recorder);
        for _ in 0..5 {
            s.tick();
            let target = target_id(&s);
            assert!(matches!(s.select(target), Transition::Correct { .. }));
            s.advance();
        }
        assert_eq!(s.phase(), RoundPhase::SessionOver(SessionOutcome::Completed));
        assert_eq!(s.score(), 250);
        assert_eq!(s.round(), 5);
    }

    #[test]
    fn test_timer_resets_each_round() {
        let mut s = session(GameMode::Hard, MockScoreRecorder::new()).with_time_limit(10);
        for _ in 0..4 {
            s.tick();
        }
        assert_eq!(s.time_left(), Some(6));

        let target = target_id(&s);
        s.select(target);
        // Countdown is frozen while the correct pick is shown
        assert_eq!(s.tick(), Transition::Ignored);
        s.advance();
        assert_eq!(s.time_left(), Some(10));
    }

    #[test]
    fn test_timeout_wins_over_late_click() {
        let mut recorder = MockScoreRecorder::new();
        recorder.expect_record_score().times(1).return_const(());

        let mut s = session(GameMode::Hard, recorder).with_time_limit(3);
        let target = target_id(&s);
        s.select(target);
        s.advance();

        assert_eq!(s.tick(), Transition::Ticked { time_left: 2 });
        assert_eq!(s.tick(), Transition::Ticked { time_left: 1 });
        assert!(matches!(
            s.tick(),
            Transition::Over {
                outcome: SessionOutcome::Failed(FailureCause::TimedOut),
                recorded: true,
                ..
            }
        ));

        let target = target_id(&s);
        assert_eq!(s.select(target), Transition::Ignored);
        assert_eq!(s.tick(), Transition::Ignored);
    }

    #[test]
    fn test_untimed_modes_ignore_ticks() {
        let mut s = session(GameMode::Normal, MockScoreRecorder::new());
        assert_eq!(s.tick(), Transition::Ignored);
    }

    #[test]
    fn test_retry_resets_everything() {
        let mut recorder = MockScoreRecorder::new();
        recorder.expect_record_score().times(2).return_const(());

        let mut s = session(GameMode::Hard, recorder);
        let target = target_id(&s);
        s.select(target);
        s.advance();
        s.tick();
        let wrong = wrong_id(&s);
        s.select(wrong);
        assert!(s.is_over());

        assert_eq!(s.retry(), Transition::Started);
        assert_eq!(s.round(), 1);
        assert_eq!(s.score(), 0);
        assert_eq!(s.time_left(), Some(30));
        assert_eq!(s.phase(), RoundPhase::AwaitingInput);

        // A new play-through records its own score again
        let target = target_id(&s);
        s.select(target);
        s.advance();
        let wrong = wrong_id(&s);
        assert!(matches!(s.select(wrong), Transition::Over { recorded: true, .. }));
    }

    #[test]
    fn test_unknown_id_is_wrong_pick() {
        let mut s = session(GameMode::Easy, MockScoreRecorder::new());
        assert!(matches!(
            s.select(99),
            Transition::Over {
                outcome: SessionOutcome::Failed(FailureCause::WrongPick { picked: 99, .. }),
                ..
            }
        ));
    }
}
