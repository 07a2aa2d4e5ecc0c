//! Step controller — runs one step script against the timeline.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::FlowError;
use crate::script::StepScript;
use crate::timeline::{Timeline, TurnKind, TurnPatch, WidgetKind};

/// The user's answer when resolving an interactive turn.
///
/// A skip is a resolution with both fields empty.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ResolveChoice {
    /// The picked option, for widgets with an option list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_id: Option<String>,
    /// Free-form widget data (address text, slider value, kept listing ids).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ResolveChoice {
    pub fn option(id: impl Into<String>) -> Self {
        Self {
            option_id: Some(id.into()),
            data: None,
        }
    }

    pub fn data(data: serde_json::Value) -> Self {
        Self {
            option_id: None,
            data: Some(data),
        }
    }

    /// The sentinel empty choice used when the user skips a widget.
    pub fn skip() -> Self {
        Self::default()
    }
}

/// What a resolution did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// The turn was already resolved — double-submit guard, nothing happened.
    Duplicate,
    /// The next stage of the chain was scheduled.
    Scheduled,
    /// A `Confirmation` turn was resolved — the wizard should advance.
    StepComplete,
    /// The chain is exhausted; nothing further will appear.
    ChainEnd,
}

impl ResolveOutcome {
    /// Wire label for status responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Duplicate => "duplicate",
            Self::Scheduled => "scheduled",
            Self::StepComplete => "step_complete",
            Self::ChainEnd => "chain_end",
        }
    }
}

/// The interactive turn currently holding the chain.
#[derive(Debug, Clone)]
pub struct PendingTurn {
    pub turn_id: String,
    pub widget: WidgetKind,
}

struct ControllerInner {
    /// Index of the next stage to materialize.
    next_stage: usize,
    /// The unresolved interactive turn the chain is waiting on.
    pending: Option<PendingTurn>,
    /// Set while a resolution's remote call is in flight; the sole
    /// re-entrancy gate for that turn.
    in_flight: bool,
    started: bool,
    disposed: bool,
}

/// Drives one [`StepScript`] against one [`Timeline`], respecting the
/// scripted delays.
///
/// All timed appends carry the epoch captured at construction, so a
/// timer that outlives a reset appends nothing. `dispose` additionally
/// aborts every pending timer task.
pub struct StepController {
    script: StepScript,
    timeline: Arc<Timeline>,
    epoch: u64,
    inner: Mutex<ControllerInner>,
    timers: Mutex<Vec<JoinHandle<()>>>,
}

impl StepController {
    /// Create a controller bound to the timeline's current epoch.
    pub async fn new(script: StepScript, timeline: Arc<Timeline>) -> Arc<Self> {
        let epoch = timeline.epoch().await;
        Arc::new(Self {
            script,
            timeline,
            epoch,
            inner: Mutex::new(ControllerInner {
                next_stage: 0,
                pending: None,
                in_flight: false,
                started: false,
                disposed: false,
            }),
            timers: Mutex::new(Vec::new()),
        })
    }

    /// Fire the chain's first entry. Idempotent: a second call, or a call
    /// against an already-populated timeline, does nothing.
    pub async fn start(self: &Arc<Self>) {
        {
            let mut inner = self.inner.lock().await;
            if inner.disposed || inner.started {
                return;
            }
            if !self.timeline.is_empty().await {
                debug!(step = self.script.name, "start() on non-empty timeline ignored");
                inner.started = true;
                return;
            }
            inner.started = true;
        }
        info!(step = self.script.name, "Starting step script");
        self.run_chain(0).await;
    }

    /// Resolve an interactive turn with the user's choice.
    ///
    /// Only the first resolution of a turn has effect; later calls are
    /// no-ops reported as [`ResolveOutcome::Duplicate`].
    pub async fn resolve(
        self: &Arc<Self>,
        turn_id: &str,
        choice: ResolveChoice,
    ) -> Result<ResolveOutcome, FlowError> {
        let turn = self
            .timeline
            .get(turn_id)
            .await
            .ok_or_else(|| FlowError::UnknownTurn {
                id: turn_id.to_string(),
            })?;
        let widget = turn.kind.widget().ok_or_else(|| FlowError::NotInteractive {
            id: turn_id.to_string(),
        })?;

        let next = {
            let mut inner = self.inner.lock().await;
            if inner.disposed {
                return Err(FlowError::Disposed);
            }
            let is_pending = inner
                .pending
                .as_ref()
                .map(|p| p.turn_id == turn_id)
                .unwrap_or(false);
            if !is_pending {
                debug!(turn_id = %turn_id, "Repeated resolution ignored");
                return Ok(ResolveOutcome::Duplicate);
            }
            inner.pending = None;
            inner.in_flight = false;
            inner.next_stage
        };

        self.timeline
            .update(
                turn_id,
                TurnPatch {
                    is_selected: true,
                    selected_option_id: choice.option_id.clone(),
                },
            )
            .await;

        info!(
            turn_id = %turn_id,
            widget = %widget,
            option = choice.option_id.as_deref().unwrap_or("<skip>"),
            "Turn resolved"
        );

        if widget == WidgetKind::Confirmation {
            return Ok(ResolveOutcome::StepComplete);
        }
        if next >= self.script.stages.len() {
            return Ok(ResolveOutcome::ChainEnd);
        }
        self.run_chain(next).await;
        Ok(ResolveOutcome::Scheduled)
    }

    /// Mark a pending turn's resolution as in flight (a remote call is
    /// running). Rejects when the turn is not pending or a submission is
    /// already in flight, so a double-tap cannot fire two network calls.
    pub async fn begin_submission(&self, turn_id: &str) -> Result<(), FlowError> {
        let mut inner = self.inner.lock().await;
        if inner.disposed {
            return Err(FlowError::Disposed);
        }
        let is_pending = inner
            .pending
            .as_ref()
            .map(|p| p.turn_id == turn_id)
            .unwrap_or(false);
        if !is_pending {
            return Err(FlowError::AlreadyResolved {
                id: turn_id.to_string(),
            });
        }
        if inner.in_flight {
            return Err(FlowError::SubmissionInFlight {
                id: turn_id.to_string(),
            });
        }
        inner.in_flight = true;
        Ok(())
    }

    /// Clear the in-flight flag after a failed remote call, leaving the
    /// turn unresolved and resubmittable. The script does not advance.
    pub async fn abort_submission(&self, turn_id: &str) {
        let mut inner = self.inner.lock().await;
        if inner
            .pending
            .as_ref()
            .map(|p| p.turn_id == turn_id)
            .unwrap_or(false)
        {
            inner.in_flight = false;
            warn!(turn_id = %turn_id, "Submission failed — turn left resubmittable");
        }
    }

    /// The interactive turn currently holding the chain, if any.
    pub async fn pending_turn(&self) -> Option<PendingTurn> {
        self.inner.lock().await.pending.clone()
    }

    /// Index of the next stage the chain will materialize.
    pub async fn next_stage(&self) -> usize {
        self.inner.lock().await.next_stage
    }

    /// Cancel all pending timers. Any timer that already fired but lost
    /// the race is stopped by the epoch check instead.
    pub async fn dispose(&self) {
        {
            let mut inner = self.inner.lock().await;
            inner.disposed = true;
            inner.pending = None;
        }
        let mut timers = self.timers.lock().await;
        for handle in timers.drain(..) {
            handle.abort();
        }
        debug!(step = self.script.name, "Controller disposed");
    }

    /// Run stages from `start_idx` until the chain hits an interactive
    /// turn or exhausts. Each stage sleeps its configured delay first.
    async fn run_chain(self: &Arc<Self>, start_idx: usize) {
        let ctrl = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut idx = start_idx;
            while idx < ctrl.script.stages.len() {
                let stage = &ctrl.script.stages[idx];
                tokio::time::sleep(stage.delay).await;

                let Some(turn) = ctrl
                    .timeline
                    .append_if_epoch(ctrl.epoch, stage.turn.clone())
                    .await
                else {
                    // Timeline reset since this chain was scheduled.
                    return;
                };
                idx += 1;

                if let TurnKind::Interactive { widget } = turn.kind {
                    let mut inner = ctrl.inner.lock().await;
                    if inner.disposed {
                        return;
                    }
                    inner.pending = Some(PendingTurn {
                        turn_id: turn.id,
                        widget,
                    });
                    inner.next_stage = idx;
                    return;
                }
            }
            ctrl.inner.lock().await.next_stage = idx;
        });
        self.timers.lock().await.push(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::StepScript;
    use crate::timeline::WidgetKind;
    use std::time::Duration;

    /// Script mirroring the step-1 opening: two agent turns, then an
    /// address input, then an acknowledgement.
    fn intro_script() -> StepScript {
        StepScript::new("test_intro", "Test")
            .agent(10, "welcome")
            .agent(10, "what's the address?")
            .widget(10, WidgetKind::AddressInput, serde_json::json!({}))
            .agent(10, "address received")
            .widget(10, WidgetKind::Confirmation, serde_json::json!({}))
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(120)).await;
    }

    #[tokio::test]
    async fn happy_path_runs_intro_then_waits() {
        let timeline = Timeline::new();
        let ctrl = StepController::new(intro_script(), Arc::clone(&timeline)).await;

        ctrl.start().await;
        settle().await;

        let turns = timeline.snapshot().await;
        assert_eq!(turns.len(), 3, "chain must pause at the interactive turn");
        assert_eq!(turns[0].kind, TurnKind::AgentText);
        assert!(turns[0].show_avatar);
        assert!(!turns[1].show_avatar);
        assert_eq!(
            turns[2].kind,
            TurnKind::Interactive {
                widget: WidgetKind::AddressInput
            }
        );

        // Nothing further appears while unresolved.
        settle().await;
        assert_eq!(timeline.len().await, 3);

        let pending = ctrl.pending_turn().await.unwrap();
        assert_eq!(pending.widget, WidgetKind::AddressInput);

        // Resolving produces the acknowledgement after its delay.
        let outcome = ctrl
            .resolve(
                &pending.turn_id,
                ResolveChoice::data(serde_json::json!({"address": "9 Elm St"})),
            )
            .await
            .unwrap();
        assert_eq!(outcome, ResolveOutcome::Scheduled);
        settle().await;

        let turns = timeline.snapshot().await;
        assert_eq!(turns.len(), 5);
        assert_eq!(turns[3].kind, TurnKind::AgentText);
        assert!(turns[2].is_selected);
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let timeline = Timeline::new();
        let ctrl = StepController::new(intro_script(), Arc::clone(&timeline)).await;

        ctrl.start().await;
        ctrl.start().await;
        settle().await;
        ctrl.start().await;
        settle().await;

        assert_eq!(timeline.len().await, 3, "no duplicate intro turns");
    }

    #[tokio::test]
    async fn double_resolution_is_a_noop() {
        let timeline = Timeline::new();
        let ctrl = StepController::new(intro_script(), Arc::clone(&timeline)).await;
        ctrl.start().await;
        settle().await;

        let pending = ctrl.pending_turn().await.unwrap();
        let first = ctrl
            .resolve(&pending.turn_id, ResolveChoice::skip())
            .await
            .unwrap();
        let second = ctrl
            .resolve(&pending.turn_id, ResolveChoice::skip())
            .await
            .unwrap();
        assert_eq!(first, ResolveOutcome::Scheduled);
        assert_eq!(second, ResolveOutcome::Duplicate);

        settle().await;
        // Exactly one acknowledgement + one confirmation scheduled.
        assert_eq!(timeline.len().await, 5);
    }

    #[tokio::test]
    async fn confirmation_reports_step_complete() {
        let timeline = Timeline::new();
        let ctrl = StepController::new(intro_script(), Arc::clone(&timeline)).await;
        ctrl.start().await;
        settle().await;

        let address = ctrl.pending_turn().await.unwrap();
        ctrl.resolve(&address.turn_id, ResolveChoice::skip())
            .await
            .unwrap();
        settle().await;

        let confirm = ctrl.pending_turn().await.unwrap();
        assert_eq!(confirm.widget, WidgetKind::Confirmation);
        let outcome = ctrl
            .resolve(&confirm.turn_id, ResolveChoice::option("accept"))
            .await
            .unwrap();
        assert_eq!(outcome, ResolveOutcome::StepComplete);
    }

    #[tokio::test]
    async fn resolve_unknown_turn_errors() {
        let timeline = Timeline::new();
        let ctrl = StepController::new(intro_script(), Arc::clone(&timeline)).await;
        ctrl.start().await;
        settle().await;

        let err = ctrl
            .resolve("t99-0", ResolveChoice::skip())
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::UnknownTurn { .. }));
    }

    #[tokio::test]
    async fn resolve_agent_turn_errors() {
        let timeline = Timeline::new();
        let ctrl = StepController::new(intro_script(), Arc::clone(&timeline)).await;
        ctrl.start().await;
        settle().await;

        let agent_turn_id = timeline.snapshot().await[0].id.clone();
        let err = ctrl
            .resolve(&agent_turn_id, ResolveChoice::skip())
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::NotInteractive { .. }));
    }

    #[tokio::test]
    async fn dispose_cancels_pending_timers() {
        let timeline = Timeline::new();
        let script = StepScript::new("slow", "Slow").agent(60, "late arrival");
        let ctrl = StepController::new(script, Arc::clone(&timeline)).await;

        ctrl.start().await;
        ctrl.dispose().await;
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(timeline.is_empty().await, "aborted timer must not append");
    }

    #[tokio::test]
    async fn stale_timer_after_reset_appends_nothing() {
        let timeline = Timeline::new();
        let script = StepScript::new("slow", "Slow").agent(60, "from a dead step");
        let ctrl = StepController::new(script, Arc::clone(&timeline)).await;

        ctrl.start().await;
        // Reset without disposing — the timer fires but loses the epoch check.
        timeline.reset().await;
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(timeline.is_empty().await);
    }

    #[tokio::test]
    async fn submission_gate_is_exclusive_and_resubmittable() {
        let timeline = Timeline::new();
        let ctrl = StepController::new(intro_script(), Arc::clone(&timeline)).await;
        ctrl.start().await;
        settle().await;

        let pending = ctrl.pending_turn().await.unwrap();
        ctrl.begin_submission(&pending.turn_id).await.unwrap();

        // Second submission while in flight is rejected.
        let err = ctrl.begin_submission(&pending.turn_id).await.unwrap_err();
        assert!(matches!(err, FlowError::SubmissionInFlight { .. }));

        // A failed remote call leaves the turn resubmittable.
        ctrl.abort_submission(&pending.turn_id).await;
        ctrl.begin_submission(&pending.turn_id).await.unwrap();

        // The timeline gained nothing from any of this.
        assert_eq!(timeline.len().await, 3);
        assert!(!timeline.get(&pending.turn_id).await.unwrap().is_selected);
    }

    #[tokio::test]
    async fn resolve_after_dispose_errors() {
        let timeline = Timeline::new();
        let ctrl = StepController::new(intro_script(), Arc::clone(&timeline)).await;
        ctrl.start().await;
        settle().await;

        let pending = ctrl.pending_turn().await.unwrap();
        ctrl.dispose().await;

        let err = ctrl
            .resolve(&pending.turn_id, ResolveChoice::skip())
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Disposed));
    }
}
