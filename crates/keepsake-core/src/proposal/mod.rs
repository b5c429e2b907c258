//! Proposal letter sequencer.
//!
//! A linear, timer-driven state machine:
//! `Closed → Opened → QuestionRevealed → ChoiceOffered → Celebrating`.
//! Only `open` and `choose_yes` are user driven; the middle transitions fire
//! after a delay proportional to the length of the text being revealed.
//! Every pending timer belongs to the sequencer and is aborted on
//! [`Proposal::teardown`] or drop.

mod script;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub use self::script::{ProposalScript, DEFAULT_CELEBRATION, DEFAULT_HEADING, DEFAULT_QUESTION};

/// Hearts released when the letter is opened.
pub const OPEN_BURST: usize = 10;
/// Hearts released when the question appears.
pub const QUESTION_BURST: usize = 15;
/// Hearts released on the affirmative answer.
pub const FINAL_BURST: usize = 30;

/// Stages in the order the sequencer moves through them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProposalStage {
    #[default]
    Closed,
    Opened,
    QuestionRevealed,
    ChoiceOffered,
    Celebrating,
}

/// Delays driving the automatic transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProposalTimings {
    pub letter_char_delay: Duration,
    pub letter_pause: Duration,
    pub question_char_delay: Duration,
    pub question_pause: Duration,
    /// How long an ordinary heart burst stays on screen
    pub burst_linger: Duration,
    pub final_burst_linger: Duration,
}

impl Default for ProposalTimings {
    fn default() -> Self {
        Self {
            letter_char_delay: Duration::from_millis(25),
            letter_pause: Duration::from_millis(1500),
            question_char_delay: Duration::from_millis(100),
            question_pause: Duration::from_millis(1000),
            burst_linger: Duration::from_secs(3),
            final_burst_linger: Duration::from_secs(5),
        }
    }
}

impl ProposalTimings {
    /// Time from opening the letter until the question appears.
    pub fn letter_reveal(&self, letter_chars: usize) -> Duration {
        per_char(self.letter_char_delay, letter_chars).saturating_add(self.letter_pause)
    }

    /// Time from the question appearing until the choice is offered.
    pub fn question_reveal(&self, question_chars: usize) -> Duration {
        per_char(self.question_char_delay, question_chars).saturating_add(self.question_pause)
    }
}

fn per_char(delay: Duration, chars: usize) -> Duration {
    delay.saturating_mul(u32::try_from(chars).unwrap_or(u32::MAX))
}

/// One floating heart. Positions are percentages of the stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Heart {
    /// Burst this heart belongs to, in release order
    pub burst: u32,
    pub x_percent: f64,
    pub y_percent: f64,
    pub size_px: f64,
    pub delay: Duration,
    pub duration: Duration,
}

impl Heart {
    fn random<R: Rng + ?Sized>(rng: &mut R, burst: u32, is_final: bool) -> Self {
        let (size_span, size_min, delay_span, duration_min) = if is_final {
            (50.0, 25.0, 0.3, 1.5)
        } else {
            (30.0, 15.0, 0.5, 1.0)
        };
        Self {
            burst,
            x_percent: rng.random_range(0.0..100.0),
            y_percent: rng.random_range(10.0..90.0),
            size_px: rng.random_range(0.0..size_span) + size_min,
            delay: Duration::from_secs_f64(rng.random_range(0.0..delay_span)),
            duration: Duration::from_secs_f64(rng.random_range(0.0..2.0) + duration_min),
        }
    }
}

/// Snapshot published to observers on every change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProposalState {
    pub stage: ProposalStage,
    pub hearts: Vec<Heart>,
    /// Number of bursts released so far
    pub bursts: u32,
}

impl ProposalState {
    fn release_burst(&mut self, count: usize, is_final: bool) -> u32 {
        let burst = self.bursts;
        self.bursts += 1;
        let mut rng = rand::rng();
        self.hearts
            .extend((0..count).map(|_| Heart::random(&mut rng, burst, is_final)));
        burst
    }

    fn clear_burst(&mut self, burst: u32) -> bool {
        let before = self.hearts.len();
        self.hearts.retain(|heart| heart.burst != burst);
        before != self.hearts.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Offset of a control from its container's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Timers owned by one sequencer; aborted together.
#[derive(Debug, Default)]
struct TimerScope {
    handles: Vec<JoinHandle<()>>,
}

impl TimerScope {
    fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handles.retain(|handle| !handle.is_finished());
        self.handles.push(tokio::spawn(task));
    }

    fn cancel_all(&mut self) -> usize {
        let pending = self
            .handles
            .iter()
            .filter(|handle| !handle.is_finished())
            .count();
        for handle in self.handles.drain(..) {
            handle.abort();
        }
        pending
    }
}

impl Drop for TimerScope {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

/// The proposal sequence. Must be driven from inside a tokio runtime.
#[derive(Debug)]
pub struct Proposal {
    script: ProposalScript,
    timings: ProposalTimings,
    state: Arc<watch::Sender<ProposalState>>,
    timers: TimerScope,
}

impl Default for Proposal {
    fn default() -> Self {
        Self::new(ProposalScript::default(), ProposalTimings::default())
    }
}

impl Proposal {
    pub fn new(script: ProposalScript, timings: ProposalTimings) -> Self {
        let (state, _) = watch::channel(ProposalState::default());
        Self {
            script,
            timings,
            state: Arc::new(state),
            timers: TimerScope::default(),
        }
    }

    pub const fn script(&self) -> &ProposalScript {
        &self.script
    }

    pub const fn timings(&self) -> &ProposalTimings {
        &self.timings
    }

    pub fn stage(&self) -> ProposalStage {
        self.state.borrow().stage
    }

    pub fn snapshot(&self) -> ProposalState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProposalState> {
        self.state.subscribe()
    }

    /// Open the letter. Returns `false` unless the letter was still closed.
    pub fn open(&mut self) -> bool {
        let mut opened = None;
        self.state.send_if_modified(|state| {
            if state.stage != ProposalStage::Closed {
                return false;
            }
            state.stage = ProposalStage::Opened;
            opened = Some(state.release_burst(OPEN_BURST, false));
            true
        });
        let Some(open_burst) = opened else {
            return false;
        };
        tracing::debug!("Proposal letter opened");

        let letter = self.timings.letter_reveal(self.script.letter_chars());
        let question = self.timings.question_reveal(self.script.question_chars());
        let linger = self.timings.burst_linger;

        self.schedule_clear(open_burst, linger);

        let state = Arc::clone(&self.state);
        self.timers.spawn(async move {
            tokio::time::sleep(letter).await;
            let mut revealed = None;
            state.send_if_modified(|state| {
                if state.stage != ProposalStage::Opened {
                    return false;
                }
                state.stage = ProposalStage::QuestionRevealed;
                revealed = Some(state.release_burst(QUESTION_BURST, false));
                true
            });
            let Some(burst) = revealed else {
                return;
            };
            tracing::debug!("Proposal question revealed");

            let offer = async {
                tokio::time::sleep(question).await;
                let offered = state.send_if_modified(|state| {
                    if state.stage != ProposalStage::QuestionRevealed {
                        return false;
                    }
                    state.stage = ProposalStage::ChoiceOffered;
                    true
                });
                if offered {
                    tracing::debug!("Proposal choice offered");
                }
            };
            let fade = async {
                tokio::time::sleep(linger).await;
                state.send_if_modified(|state| state.clear_burst(burst));
            };
            tokio::join!(offer, fade);
        });

        true
    }

    /// Accept. Only valid once the choice is offered.
    pub fn choose_yes(&mut self) -> bool {
        let mut accepted = None;
        self.state.send_if_modified(|state| {
            if state.stage != ProposalStage::ChoiceOffered {
                return false;
            }
            state.stage = ProposalStage::Celebrating;
            accepted = Some(state.release_burst(FINAL_BURST, true));
            true
        });
        let Some(final_burst) = accepted else {
            return false;
        };
        tracing::info!("Proposal accepted");
        self.schedule_clear(final_burst, self.timings.final_burst_linger);
        true
    }

    /// The declining control never changes the stage. While the choice is
    /// offered it hops to a random spot inside its container instead.
    pub fn choose_no(&self, container: Size, control: Size) -> Option<Position> {
        if self.stage() != ProposalStage::ChoiceOffered {
            return None;
        }
        let max_x = (container.width - control.width).max(0.0);
        let max_y = (container.height - control.height).max(0.0);
        let mut rng = rand::rng();
        Some(Position {
            x: rng.random_range(0.0..=max_x),
            y: rng.random_range(0.0..=max_y),
        })
    }

    /// Abort every pending timer. State stays where it is.
    pub fn teardown(&mut self) {
        let cancelled = self.timers.cancel_all();
        if cancelled > 0 {
            tracing::debug!(cancelled, "Cancelled pending proposal timers");
        }
    }

    fn schedule_clear(&mut self, burst: u32, after: Duration) {
        let state = Arc::clone(&self.state);
        self.timers.spawn(async move {
            tokio::time::sleep(after).await;
            state.send_if_modified(|state| state.clear_burst(burst));
        });
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn short_proposal() -> Proposal {
        // Letter reveal 4 * 25 + 1500 = 1600ms, question 3 * 100 + 1000 = 1300ms
        Proposal::new(
            ProposalScript::default()
                .with_letter("abcd")
                .with_question("ok?"),
            ProposalTimings::default(),
        )
    }

    async fn advance(millis: u64) {
        tokio::time::sleep(Duration::from_millis(millis)).await;
        tokio::task::yield_now().await;
    }

    #[test]
    fn default_timings_scale_with_text_length() {
        let timings = ProposalTimings::default();
        assert_eq!(timings.letter_reveal(100), Duration::from_millis(4000));
        assert_eq!(timings.question_reveal(18), Duration::from_millis(2800));
    }

    #[tokio::test(start_paused = true)]
    async fn follows_the_timeline() {
        let mut proposal = short_proposal();
        assert_eq!(proposal.stage(), ProposalStage::Closed);

        assert!(proposal.open());
        assert!(!proposal.open());
        assert_eq!(proposal.stage(), ProposalStage::Opened);
        assert_eq!(proposal.snapshot().hearts.len(), OPEN_BURST);

        advance(1599).await;
        assert_eq!(proposal.stage(), ProposalStage::Opened);

        advance(2).await;
        assert_eq!(proposal.stage(), ProposalStage::QuestionRevealed);
        assert_eq!(proposal.snapshot().hearts.len(), OPEN_BURST + QUESTION_BURST);

        advance(1300).await;
        assert_eq!(proposal.stage(), ProposalStage::ChoiceOffered);

        // t = 3001ms: the opening burst has faded
        advance(100).await;
        assert_eq!(proposal.snapshot().hearts.len(), QUESTION_BURST);

        // t = 4601ms: so has the question burst
        advance(1600).await;
        assert!(proposal.snapshot().hearts.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn yes_is_only_accepted_once_offered() {
        let mut proposal = short_proposal();
        assert!(!proposal.choose_yes());

        proposal.open();
        assert!(!proposal.choose_yes());
        advance(2901).await;
        assert_eq!(proposal.stage(), ProposalStage::ChoiceOffered);

        assert!(proposal.choose_yes());
        assert_eq!(proposal.stage(), ProposalStage::Celebrating);
        let hearts = proposal.snapshot().hearts;
        assert_eq!(
            hearts.iter().filter(|heart| heart.burst == 2).count(),
            FINAL_BURST
        );
        assert!(hearts.iter().all(|heart| heart.size_px >= 15.0));

        advance(5001).await;
        assert!(proposal.snapshot().hearts.is_empty());
        assert_eq!(proposal.stage(), ProposalStage::Celebrating);
    }

    #[tokio::test(start_paused = true)]
    async fn no_moves_within_the_container_without_transitioning() {
        let mut proposal = short_proposal();
        let container = Size {
            width: 300.0,
            height: 100.0,
        };
        let control = Size {
            width: 80.0,
            height: 40.0,
        };
        assert_eq!(proposal.choose_no(container, control), None);

        proposal.open();
        advance(2901).await;
        for _ in 0..50 {
            let position = proposal.choose_no(container, control).unwrap();
            assert!((0.0..=220.0).contains(&position.x));
            assert!((0.0..=60.0).contains(&position.y));
        }
        assert_eq!(proposal.stage(), ProposalStage::ChoiceOffered);

        let cramped = proposal.choose_no(control, container).unwrap();
        assert_eq!(cramped, Position { x: 0.0, y: 0.0 });
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_cancels_pending_timers() {
        let mut proposal = short_proposal();
        proposal.open();
        advance(100).await;
        proposal.teardown();

        advance(10_000).await;
        let state = proposal.snapshot();
        assert_eq!(state.stage, ProposalStage::Opened);
        assert_eq!(state.hearts.len(), OPEN_BURST);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_sequencer_stops_state_changes() {
        let mut proposal = short_proposal();
        let mut observer = proposal.subscribe();
        proposal.open();
        observer.borrow_and_update();
        drop(proposal);

        advance(10_000).await;
        assert!(!observer.has_changed().unwrap_or(false));
        assert_eq!(observer.borrow().stage, ProposalStage::Opened);
    }

    #[tokio::test(start_paused = true)]
    async fn observers_see_each_stage() {
        let mut proposal = short_proposal();
        let mut observer = proposal.subscribe();
        proposal.open();

        let mut seen = vec![observer.borrow_and_update().stage];
        while seen.last() != Some(&ProposalStage::ChoiceOffered) {
            observer.changed().await.unwrap();
            let stage = observer.borrow_and_update().stage;
            if seen.last() != Some(&stage) {
                seen.push(stage);
            }
        }
        assert_eq!(
            seen,
            vec![
                ProposalStage::Opened,
                ProposalStage::QuestionRevealed,
                ProposalStage::ChoiceOffered,
            ]
        );
    }

    #[test]
    fn stages_order_along_the_timeline() {
        assert!(ProposalStage::Closed < ProposalStage::Opened);
        assert!(ProposalStage::QuestionRevealed < ProposalStage::ChoiceOffered);
        assert!(ProposalStage::ChoiceOffered < ProposalStage::Celebrating);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn zero_question_reveal_still_offers_the_choice() {
        let timings = ProposalTimings {
            letter_char_delay: Duration::ZERO,
            letter_pause: Duration::from_millis(1),
            question_char_delay: Duration::ZERO,
            question_pause: Duration::ZERO,
            ..ProposalTimings::default()
        };
        for _ in 0..20 {
            let mut proposal = Proposal::new(ProposalScript::default(), timings);
            let mut observer = proposal.subscribe();
            assert!(proposal.open());

            let offered = tokio::time::timeout(
                Duration::from_secs(5),
                observer.wait_for(|state| state.stage == ProposalStage::ChoiceOffered),
            )
            .await
            .is_ok_and(|seen| seen.is_ok());
            assert!(offered);
            proposal.teardown();
        }
    }
}
