//! Turns a stream of visibility samples into a monotonic "new words seen"
//! counter and decides when a learning task should fire.

use serde::Serialize;

use crate::error::CoreError;
use crate::sample::Sample;

/// Counter state owned by a single [`WordAccumulator`].
///
/// `cumulative_word_count >= last_trigger_count` always holds.
#[derive(Debug, Clone, Default)]
pub struct AccumulatorState {
    pub cumulative_word_count: u64,
    pub last_trigger_count: u64,
    pub previous_sample: Sample,
    pub is_active: bool,
    pub has_pending_task: bool,
}

/// Emitted by the sample that crosses the threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerEvent {
    pub sequence: u64,
    pub cumulative_count: u64,
    pub visible_count: u64,
    pub threshold: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Paused,
    TaskPending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleOutcome {
    Ignored(IgnoreReason),
    Counted {
        new_words: u64,
        progress: Progress,
        /// Set when progress crossed a multiple of the milestone step
        milestone: Option<u64>,
    },
    Triggered(TriggerEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub current: u64,
    pub threshold: u64,
    pub percentage: u64,
}

/// What `on_task_completed` did besides resuming
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resumed {
    pub consecutive_failures: u32,
    pub progress_reset: bool,
}

/// Snapshot persisted after each counted sample
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterSnapshot {
    pub current_visible: u64,
    pub cumulative: u64,
    pub new_words: u64,
    pub next_trigger_at: u64,
    pub progress: u64,
    pub threshold: u64,
    pub percentage: u64,
    pub session_quiz_count: u64,
    pub error_count: u32,
    pub is_active: bool,
}

#[derive(Debug)]
pub struct WordAccumulator {
    state: AccumulatorState,
    threshold: u64,
    slack: u64,
    failure_reset_after: u32,
    milestone_step: u64,
    consecutive_failures: u32,
    trigger_sequence: u64,
    last_new_words: u64,
}

impl WordAccumulator {
    pub fn new(threshold: u64, slack: u64, failure_reset_after: u32) -> Result<Self, CoreError> {
        if threshold == 0 {
            return Err(CoreError::InvalidThreshold);
        }

        Ok(Self {
            state: AccumulatorState {
                is_active: true,
                ..AccumulatorState::default()
            },
            threshold,
            slack,
            failure_reset_after,
            milestone_step: 50,
            consecutive_failures: 0,
            trigger_sequence: 0,
            last_new_words: 0,
        })
    }

    pub fn from_config(config: &parrot_config::counter::CounterConfig) -> Result<Self, CoreError> {
        let mut accumulator = Self::new(
            config.word_threshold,
            config.new_word_slack,
            config.failure_reset_after,
        )?;
        accumulator.milestone_step = config.milestone_words;
        Ok(accumulator)
    }

    pub fn state(&self) -> &AccumulatorState {
        &self.state
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn session_quiz_count(&self) -> u64 {
        self.trigger_sequence
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Samples are only counted while active and no task is pending
    pub fn accepts_samples(&self) -> bool {
        self.state.is_active && !self.state.has_pending_task
    }

    /// Update the trigger threshold. Nothing is re-evaluated until the next sample.
    pub fn configure(&mut self, threshold: u64) -> Result<(), CoreError> {
        if threshold == 0 {
            return Err(CoreError::InvalidThreshold);
        }

        let old = self.threshold;
        self.threshold = threshold;

        let progress = self.progress();
        tracing::info!(
            old,
            new = threshold,
            current = progress.current,
            percentage = progress.percentage,
            "word threshold updated"
        );
        Ok(())
    }

    pub fn on_sample(&mut self, sample: Sample) -> SampleOutcome {
        if self.state.has_pending_task {
            return SampleOutcome::Ignored(IgnoreReason::TaskPending);
        }
        if !self.state.is_active {
            return SampleOutcome::Ignored(IgnoreReason::Paused);
        }

        let new_words = self.bounded_new_words(&sample);
        let previous_progress = self.progress().current;

        self.state.cumulative_word_count += new_words;
        self.state.previous_sample = sample;
        self.last_new_words = new_words;

        let progress = self.progress();

        if progress.current >= self.threshold {
            self.state.last_trigger_count = self.state.cumulative_word_count;
            self.state.has_pending_task = true;
            self.state.is_active = false;
            self.trigger_sequence += 1;

            let event = TriggerEvent {
                sequence: self.trigger_sequence,
                cumulative_count: self.state.cumulative_word_count,
                visible_count: self.state.previous_sample.len() as u64,
                threshold: self.threshold,
            };
            tracing::info!(
                sequence = event.sequence,
                cumulative = event.cumulative_count,
                threshold = event.threshold,
                "threshold reached, triggering task"
            );
            return SampleOutcome::Triggered(event);
        }

        let milestone = self.crossed_milestone(previous_progress, progress.current);

        SampleOutcome::Counted {
            new_words,
            progress,
            milestone,
        }
    }

    /// Clears the pending flag and resumes counting regardless of `success`.
    pub fn on_task_completed(&mut self, success: bool) -> Resumed {
        if !self.state.has_pending_task {
            tracing::debug!("task completion without pending task");
        }

        self.state.has_pending_task = false;
        self.state.is_active = true;

        let mut progress_reset = false;
        if success {
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures += 1;
            if self.failure_reset_after > 0 && self.consecutive_failures >= self.failure_reset_after
            {
                tracing::warn!(
                    failures = self.consecutive_failures,
                    "repeated task failures, discarding pending progress"
                );
                self.consume_progress();
                progress_reset = true;
            }
        }

        Resumed {
            consecutive_failures: self.consecutive_failures,
            progress_reset,
        }
    }

    /// The task was dropped before it could succeed or fail. Resumes counting
    /// and leaves the failure streak as it was.
    pub fn on_task_aborted(&mut self) {
        self.state.has_pending_task = false;
        self.state.is_active = true;
    }

    /// Treat everything counted so far as already used by a trigger
    pub fn consume_progress(&mut self) {
        self.state.last_trigger_count = self.state.cumulative_word_count;
    }

    pub fn pause(&mut self) {
        self.state.is_active = false;
    }

    pub fn resume(&mut self) {
        self.state.is_active = true;
    }

    /// Forget the previous sample, e.g. after navigating to another document
    pub fn reset_document(&mut self) {
        self.state.previous_sample = Sample::empty();
    }

    pub fn progress(&self) -> Progress {
        let current = self.state.cumulative_word_count - self.state.last_trigger_count;
        Progress {
            current,
            threshold: self.threshold,
            // Rounded half up
            percentage: (current * 200 + self.threshold) / (2 * self.threshold),
        }
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        let progress = self.progress();
        CounterSnapshot {
            current_visible: self.state.previous_sample.len() as u64,
            cumulative: self.state.cumulative_word_count,
            new_words: self.last_new_words,
            next_trigger_at: self.state.last_trigger_count + self.threshold,
            progress: progress.current,
            threshold: self.threshold,
            percentage: progress.percentage,
            session_quiz_count: self.trigger_sequence,
            error_count: self.consecutive_failures,
            is_active: self.state.is_active,
        }
    }

    /// New words in `sample`, clamped to the growth over the previous sample
    /// plus slack so that reflowed content is not counted twice.
    fn bounded_new_words(&self, sample: &Sample) -> u64 {
        let previous = &self.state.previous_sample;
        let new_words = sample.count_new_against(previous) as u64;
        let growth = (sample.len() as u64).saturating_sub(previous.len() as u64);
        new_words.min(growth + self.slack)
    }

    fn crossed_milestone(&self, before: u64, after: u64) -> Option<u64> {
        if self.milestone_step == 0 {
            return None;
        }
        let step = self.milestone_step;
        (before / step < after / step).then_some(after / step * step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sample of `n` distinct words w0..w(n-1)
    fn words(n: usize) -> Sample {
        Sample::new((0..n).map(|i| format!("w{i}")))
    }

    fn words_range(start: usize, end: usize) -> Sample {
        Sample::new((start..end).map(|i| format!("w{i}")))
    }

    #[test]
    fn rejects_zero_threshold() {
        assert!(WordAccumulator::new(0, 5, 3).is_err());
        let mut acc = WordAccumulator::new(10, 5, 3).unwrap();
        assert!(acc.configure(0).is_err());
        assert_eq!(acc.threshold(), 10);
    }

    #[test]
    fn triggers_once_after_crossing_sample() {
        let mut acc = WordAccumulator::new(100, 5, 3).unwrap();

        assert!(matches!(
            acc.on_sample(words(40)),
            SampleOutcome::Counted { new_words: 40, .. }
        ));
        assert!(matches!(
            acc.on_sample(words(80)),
            SampleOutcome::Counted { new_words: 40, .. }
        ));

        match acc.on_sample(words(110)) {
            SampleOutcome::Triggered(event) => {
                assert_eq!(event.sequence, 1);
                assert_eq!(event.cumulative_count, 110);
            }
            other => panic!("expected trigger, got {other:?}"),
        }

        assert_eq!(acc.state().last_trigger_count, 110);
        assert!(acc.state().has_pending_task);
        assert_eq!(acc.progress().current, 0);
    }

    #[test]
    fn new_words_are_clamped_to_growth_plus_slack() {
        let mut acc = WordAccumulator::new(1000, 5, 3).unwrap();
        acc.on_sample(words(50));

        // Same size, completely different words: reflow, not reading.
        match acc.on_sample(words_range(100, 150)) {
            SampleOutcome::Counted { new_words, .. } => assert_eq!(new_words, 5),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn ignores_samples_while_pending_or_paused() {
        let mut acc = WordAccumulator::new(10, 5, 3).unwrap();
        assert!(matches!(acc.on_sample(words(10)), SampleOutcome::Triggered(_)));
        assert_eq!(
            acc.on_sample(words(50)),
            SampleOutcome::Ignored(IgnoreReason::TaskPending)
        );
        assert_eq!(acc.state().cumulative_word_count, 10);

        acc.on_task_completed(true);
        acc.pause();
        assert_eq!(
            acc.on_sample(words(50)),
            SampleOutcome::Ignored(IgnoreReason::Paused)
        );
        acc.resume();
        assert!(acc.accepts_samples());
        assert_eq!(acc.state().cumulative_word_count, 10);
    }

    #[test]
    fn completion_always_resumes() {
        for success in [true, false] {
            let mut acc = WordAccumulator::new(5, 5, 3).unwrap();
            acc.on_sample(words(5));
            assert!(!acc.accepts_samples());

            acc.on_task_completed(success);
            assert!(acc.state().is_active);
            assert!(!acc.state().has_pending_task);
        }
    }

    #[test]
    fn repeated_failures_reset_progress() {
        let mut acc = WordAccumulator::new(10, 5, 3).unwrap();
        let mut next = 0;
        for round in 1..=3 {
            next += 10;
            assert!(matches!(
                acc.on_sample(words(next)),
                SampleOutcome::Triggered(_)
            ));
            let resumed = acc.on_task_completed(false);
            assert_eq!(resumed.consecutive_failures, round);
            assert_eq!(resumed.progress_reset, round == 3);
        }
        assert_eq!(
            acc.state().last_trigger_count,
            acc.state().cumulative_word_count
        );

        acc.on_sample(words(next + 10));
        acc.on_task_completed(true);
        assert_eq!(acc.consecutive_failures(), 0);
    }

    #[test]
    fn abort_keeps_failure_streak() {
        let mut acc = WordAccumulator::new(10, 5, 3).unwrap();
        let mut next = 0;
        let mut trigger = |acc: &mut WordAccumulator| {
            next += 10;
            assert!(matches!(
                acc.on_sample(words(next)),
                SampleOutcome::Triggered(_)
            ));
        };

        trigger(&mut acc);
        acc.on_task_completed(false);
        trigger(&mut acc);
        acc.on_task_completed(false);

        trigger(&mut acc);
        acc.on_task_aborted();
        assert!(acc.accepts_samples());
        assert_eq!(acc.consecutive_failures(), 2);

        trigger(&mut acc);
        let resumed = acc.on_task_completed(false);
        assert_eq!(resumed.consecutive_failures, 3);
        assert!(resumed.progress_reset);
    }

    #[test]
    fn percentage_is_rounded() {
        let mut acc = WordAccumulator::new(3, 5, 3).unwrap();
        acc.on_sample(words(2));
        assert_eq!(acc.progress().percentage, 67);

        let mut acc = WordAccumulator::new(8, 5, 3).unwrap();
        acc.on_sample(words(1));
        assert_eq!(acc.progress().percentage, 13);

        acc.configure(300).unwrap();
        assert_eq!(acc.progress().percentage, 0);
    }

    #[test]
    fn threshold_change_applies_on_next_sample() {
        let mut acc = WordAccumulator::new(100, 5, 3).unwrap();
        acc.on_sample(words(40));
        acc.configure(30).unwrap();
        assert!(acc.state().is_active);
        assert!(!acc.state().has_pending_task);

        // Crossing is only evaluated on the next sample, even with no new words.
        assert!(matches!(acc.on_sample(words(40)), SampleOutcome::Triggered(_)));
    }

    #[test]
    fn cumulative_count_never_decreases() {
        let mut acc = WordAccumulator::new(25, 5, 3).unwrap();
        let sizes = [3, 30, 10, 0, 60, 61, 5, 90, 90, 12];
        let mut last = 0;
        for (i, size) in sizes.into_iter().enumerate() {
            let outcome = acc.on_sample(words_range(i * 7, i * 7 + size));
            let state = acc.state();
            assert!(state.cumulative_word_count >= last);
            assert!(state.cumulative_word_count >= state.last_trigger_count);
            if let SampleOutcome::Triggered(_) = outcome {
                assert_eq!(state.cumulative_word_count, state.last_trigger_count);
                acc.on_task_completed(true);
            }
            last = acc.state().cumulative_word_count;
        }
    }

    #[test]
    fn reports_milestones() {
        let mut acc = WordAccumulator::new(300, 5, 3).unwrap();
        match acc.on_sample(words(60)) {
            SampleOutcome::Counted { milestone, .. } => assert_eq!(milestone, Some(50)),
            other => panic!("unexpected {other:?}"),
        }
        match acc.on_sample(words(70)) {
            SampleOutcome::Counted { milestone, .. } => assert_eq!(milestone, None),
            other => panic!("unexpected {other:?}"),
        }
    }
}
