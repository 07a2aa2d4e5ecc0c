//! Wizard orchestrator — owns the active step and its lifecycle.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast};
use tracing::{info, warn};

use crate::error::FlowError;
use crate::script::WizardFlow;
use crate::timeline::Timeline;

use super::controller::{ResolveChoice, ResolveOutcome, StepController};

/// Default broadcast channel capacity for wizard events.
const DEFAULT_BROADCAST_CAPACITY: usize = 64;

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Events emitted by the orchestrator, alongside the timeline's own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WizardEvent {
    /// The active step changed (navigation, restart, or confirmation).
    StepChanged { step: usize, name: String, title: String },
    /// Transient user-facing notification (e.g. a failed backend call).
    Notice { level: NoticeLevel, message: String },
}

/// Snapshot of the wizard's position, for status endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardStatus {
    pub step: usize,
    pub step_count: usize,
    pub name: String,
    pub title: String,
    pub timeline_len: usize,
}

struct OrchestratorInner {
    current_step: usize,
    controller: Arc<StepController>,
}

/// Owner of `current_step` and the step transition lifecycle.
///
/// Every transition disposes the outgoing controller, resets the
/// timeline, and creates a fresh controller bound to the new epoch, so
/// steps never leak turns or pending timers into each other.
pub struct WizardOrchestrator {
    flow: WizardFlow,
    timeline: Arc<Timeline>,
    inner: RwLock<OrchestratorInner>,
    tx: broadcast::Sender<WizardEvent>,
}

impl WizardOrchestrator {
    /// Create an orchestrator positioned at step 1, not yet started.
    pub async fn new(
        flow: WizardFlow,
        timeline: Arc<Timeline>,
    ) -> Result<Arc<Self>, FlowError> {
        let script = flow
            .script(1)
            .cloned()
            .ok_or(FlowError::NoScript { step: 1 })?;
        let controller = StepController::new(script, Arc::clone(&timeline)).await;
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Ok(Arc::new(Self {
            flow,
            timeline,
            inner: RwLock::new(OrchestratorInner {
                current_step: 1,
                controller,
            }),
            tx,
        }))
    }

    /// Subscribe to step changes and notices.
    pub fn subscribe(&self) -> broadcast::Receiver<WizardEvent> {
        self.tx.subscribe()
    }

    /// The active 1-based step number.
    pub async fn current_step(&self) -> usize {
        self.inner.read().await.current_step
    }

    /// Position snapshot for the status endpoint.
    pub async fn status(&self) -> WizardStatus {
        let inner = self.inner.read().await;
        let step = inner.current_step;
        drop(inner);
        let script = self.flow.script(step);
        WizardStatus {
            step,
            step_count: self.flow.step_count(),
            name: script.map(|s| s.name.to_string()).unwrap_or_default(),
            title: script.map(|s| s.title.to_string()).unwrap_or_default(),
            timeline_len: self.timeline.len().await,
        }
    }

    /// Run the active step's intro chain. Idempotent.
    pub async fn start(&self) {
        let controller = Arc::clone(&self.inner.read().await.controller);
        controller.start().await;
    }

    /// Navigate to a step. Out-of-range requests redirect to step 1,
    /// mirroring invalid deep links. Returns the step actually entered.
    ///
    /// Navigating to the current step restarts it from scratch.
    pub async fn goto(&self, step: usize) -> usize {
        let target = if (1..=self.flow.step_count()).contains(&step) {
            step
        } else {
            warn!(requested = step, "Out-of-range step — redirecting to step 1");
            1
        };

        let mut inner = self.inner.write().await;
        inner.controller.dispose().await;
        self.timeline.reset().await;

        let Some(script) = self.flow.script(target).cloned() else {
            // Unreachable while the flow is non-empty; hold position.
            return inner.current_step;
        };
        let name = script.name.to_string();
        let title = script.title.to_string();
        let controller = StepController::new(script, Arc::clone(&self.timeline)).await;
        inner.current_step = target;
        inner.controller = Arc::clone(&controller);
        drop(inner);

        info!(step = target, name = %name, "Entered wizard step");
        let _ = self.tx.send(WizardEvent::StepChanged {
            step: target,
            name,
            title,
        });

        controller.start().await;
        target
    }

    /// Advance one step. A no-op at the last step.
    pub async fn next(&self) -> usize {
        let current = self.inner.read().await.current_step;
        if current >= self.flow.step_count() {
            return current;
        }
        self.goto(current + 1).await
    }

    /// Resolve an interactive turn on the active step. Resolving the
    /// terminal `Confirmation` advances the wizard.
    pub async fn resolve(
        &self,
        turn_id: &str,
        choice: ResolveChoice,
    ) -> Result<ResolveOutcome, FlowError> {
        let controller = Arc::clone(&self.inner.read().await.controller);
        let outcome = controller.resolve(turn_id, choice).await?;
        if outcome == ResolveOutcome::StepComplete {
            self.next().await;
        }
        Ok(outcome)
    }

    /// Gate a resolution that requires a remote call. See
    /// [`StepController::begin_submission`].
    pub async fn begin_submission(&self, turn_id: &str) -> Result<(), FlowError> {
        let controller = Arc::clone(&self.inner.read().await.controller);
        controller.begin_submission(turn_id).await
    }

    /// Release the gate after a failed remote call; the turn stays
    /// resubmittable and the script does not advance.
    pub async fn abort_submission(&self, turn_id: &str) {
        let controller = Arc::clone(&self.inner.read().await.controller);
        controller.abort_submission(turn_id).await;
    }

    /// The widget currently waiting for the user, if any.
    pub async fn pending_turn(&self) -> Option<super::controller::PendingTurn> {
        let controller = Arc::clone(&self.inner.read().await.controller);
        controller.pending_turn().await
    }

    /// Emit a transient user-facing notice (toast).
    pub fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        let _ = self.tx.send(WizardEvent::Notice {
            level,
            message: message.into(),
        });
    }
}
