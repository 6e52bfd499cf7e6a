use super::session::{FailureCause, RoundSession, SessionOutcome, SessionSnapshot, Transition};
use crate::metrics::Metrics;
use crate::models::TimingConfig;
use anyhow::{Context, Result, anyhow};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};

/// Broadcast buffer for session events.
const EVENT_BUFFER: usize = 64;

/// Command buffer between the handle and the session task.
const COMMAND_BUFFER: usize = 32;

/// Emitted after every transition that changed the session
#[derive(Clone, Debug, PartialEq)]
pub struct SessionEvent {
    pub transition: Transition,
    pub snapshot: SessionSnapshot,
}

#[derive(Debug)]
enum SessionCommand {
    Select(u32),
    Tick { generation: u64 },
    AdvanceDue { generation: u64 },
    Retry,
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Exit,
}

/// Runs a [`RoundSession`] on a tokio task together with its timers.
///
/// Picks, countdown ticks, advance deadlines, retry and exit are all
/// serialized through one command channel, so the session sees them one at a
/// time and the first terminal event of a round wins.
///
/// The countdown tick task and the advance delay are tagged with a generation
/// number. Every terminal transition, retry and exit aborts them and bumps the
/// generation; a command already queued by an aborted timer no longer matches
/// and is dropped.
///
/// # Usage
///
/// ```ignore
/// let (driver, mut events) = SessionDriver::spawn(session, timing, metrics);
/// driver.select(3).await?;
/// while let Ok(event) = events.recv().await { /* render event.snapshot */ }
/// driver.exit().await?;
/// ```
pub struct SessionDriver {
    cmd_tx: mpsc::Sender<SessionCommand>,
    task: Option<JoinHandle<()>>,
}

impl SessionDriver {
    /// Spawn the session task on the current runtime.
    ///
    /// # Returns
    /// The driver and a receiver already subscribed, so the `Started` event is
    /// never missed
    pub fn spawn(
        session: RoundSession,
        timing: TimingConfig,
        metrics: Arc<Metrics>,
    ) -> (Self, broadcast::Receiver<SessionEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
        let (events_tx, events_rx) = broadcast::channel(EVENT_BUFFER);

        let session_loop = SessionLoop {
            session,
            timing,
            metrics,
            cmd_tx: cmd_tx.downgrade(),
            events_tx,
            generation: 0,
            tick_task: None,
            advance_task: None,
        };
        let task = tokio::spawn(session_loop.run(cmd_rx));

        let driver = Self {
            cmd_tx,
            task: Some(task),
        };
        (driver, events_rx)
    }

    /// Pick image `id` in the current round.
    pub async fn select(&self, id: u32) -> Result<()> {
        self.send(SessionCommand::Select(id)).await
    }

    /// Restart from round 1, cancelling any pending timer.
    pub async fn retry(&self) -> Result<()> {
        self.send(SessionCommand::Retry).await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Snapshot(tx)).await?;
        rx.await.context("Session task dropped the snapshot request")
    }

    /// Tear the session down and wait for its task to finish.
    pub async fn exit(mut self) -> Result<()> {
        self.send(SessionCommand::Exit).await?;
        if let Some(task) = self.task.take() {
            task.await.context("Session task panicked")?;
        }
        Ok(())
    }

    async fn send(&self, cmd: SessionCommand) -> Result<()> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| anyhow!("Session task is no longer running"))
    }
}

impl Drop for SessionDriver {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct SessionLoop {
    session: RoundSession,
    timing: TimingConfig,
    metrics: Arc<Metrics>,
    /// Weak so the channel closes once the driver is gone
    cmd_tx: mpsc::WeakSender<SessionCommand>,
    events_tx: broadcast::Sender<SessionEvent>,
    generation: u64,
    tick_task: Option<JoinHandle<()>>,
    advance_task: Option<JoinHandle<()>>,
}

impl SessionLoop {
    async fn run(mut self, mut cmd_rx: mpsc::Receiver<SessionCommand>) {
        self.metrics.record_session_started();
        self.arm_countdown();
        self.publish(Transition::Started);

        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                SessionCommand::Select(id) => {
                    let transition = self.session.select(id);
                    self.apply(transition);
                }
                SessionCommand::Tick { generation } if generation == self.generation => {
                    let transition = self.session.tick();
                    self.apply(transition);
                }
                SessionCommand::AdvanceDue { generation } if generation == self.generation => {
                    let transition = self.session.advance();
                    self.apply(transition);
                }
                SessionCommand::Tick { .. } | SessionCommand::AdvanceDue { .. } => {
                    tracing::trace!("Dropping stale timer command");
                }
                SessionCommand::Retry => {
                    self.cancel_timers();
                    let transition = self.session.retry();
                    self.metrics.record_session_started();
                    self.arm_countdown();
                    self.publish(transition);
                }
                SessionCommand::Snapshot(reply) => {
                    let _ = reply.send(self.session.snapshot());
                }
                SessionCommand::Exit => break,
            }
        }

        self.cancel_timers();
        tracing::info!(
            "Session closed: mode={}, round={}, score={}",
            self.session.mode(),
            self.session.round(),
            self.session.score()
        );
    }

    /// React to a transition: schedule or cancel timers, count, publish.
    fn apply(&mut self, transition: Transition) {
        match &transition {
            Transition::Ignored => return,
            Transition::Correct { .. } => {
                self.metrics.record_correct_pick();
                self.arm_advance();
            }
            Transition::NextRound { .. } => self.arm_countdown(),
            Transition::Over { outcome, recorded, .. } => {
                self.cancel_timers();
                match outcome {
                    SessionOutcome::Completed => self.metrics.record_session_completed(),
                    SessionOutcome::Failed(FailureCause::TimedOut) => self.metrics.record_timeout(),
                    SessionOutcome::Failed(FailureCause::WrongPick { .. }) => {
                        self.metrics.record_wrong_pick()
                    }
                }
                if *recorded {
                    self.metrics.record_score_recorded();
                }
            }
            Transition::Started | Transition::Ticked { .. } => {}
        }
        self.publish(transition);
    }

    fn publish(&self, transition: Transition) {
        let event = SessionEvent {
            transition,
            snapshot: self.session.snapshot(),
        };
        // Nobody listening is fine
        let _ = self.events_tx.send(event);
    }

    fn cancel_timers(&mut self) {
        self.generation += 1;
        if let Some(task) = self.tick_task.take() {
            task.abort();
        }
        if let Some(task) = self.advance_task.take() {
            task.abort();
        }
    }

    /// Start the per-second countdown for the current round (timed modes only).
    fn arm_countdown(&mut self) {
        self.cancel_timers();
        if !self.session.mode().is_timed() {
            return;
        }
        let Some(tx) = self.cmd_tx.upgrade() else { return };

        let generation = self.generation;
        let period = self.timing.tick_interval();
        self.tick_task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                if tx.send(SessionCommand::Tick { generation }).await.is_err() {
                    break;
                }
            }
        }));
    }

    /// Schedule the step out of the correct-pick display.
    fn arm_advance(&mut self) {
        self.cancel_timers();
        let Some(tx) = self.cmd_tx.upgrade() else { return };

        let generation = self.generation;
        let delay = self.timing.advance_delay(self.session.mode());
        self.advance_task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(SessionCommand::AdvanceDue { generation }).await;
        }));
    }
}

impl Drop for SessionLoop {
    fn drop(&mut self) {
        if let Some(task) = self.tick_task.take() {
            task.abort();
        }
        if let Some(task) = self.advance_task.take() {
            task.abort();
        }
    }
}
