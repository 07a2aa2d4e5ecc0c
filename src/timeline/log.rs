//! Message timeline — append-only turn log with broadcast to observers.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{RwLock, broadcast};
use tracing::debug;

use super::model::{TimelineEvent, Turn, TurnKind, TurnPatch, TurnSpec};

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 256;

struct TimelineInner {
    turns: Vec<Turn>,
    /// Bumped on every reset. Timer callbacks capture the epoch they were
    /// scheduled under; an append against an older epoch is dropped.
    epoch: u64,
    next_seq: u64,
}

/// Ordered log of turns for the active wizard step.
///
/// Turns are only ever appended or, on step change, cleared wholesale.
/// The one in-place mutation is the selection annotation applied by
/// [`Timeline::update`].
pub struct Timeline {
    inner: RwLock<TimelineInner>,
    tx: broadcast::Sender<TimelineEvent>,
}

impl Timeline {
    pub fn new() -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Arc::new(Self {
            inner: RwLock::new(TimelineInner {
                turns: Vec::new(),
                epoch: 0,
                next_seq: 0,
            }),
            tx,
        })
    }

    /// Subscribe to change events. Each observer calls this.
    pub fn subscribe(&self) -> broadcast::Receiver<TimelineEvent> {
        self.tx.subscribe()
    }

    /// The current epoch. Controllers capture this at creation and pass
    /// it back on every timed append.
    pub async fn epoch(&self) -> u64 {
        self.inner.read().await.epoch
    }

    /// Append a turn if `epoch` still matches the live epoch.
    ///
    /// Returns the materialized turn, or `None` when the timeline has
    /// been reset since the caller's timer was scheduled — the expected
    /// stale-timer race, suppressed rather than reported.
    pub async fn append_if_epoch(&self, epoch: u64, spec: TurnSpec) -> Option<Turn> {
        let mut inner = self.inner.write().await;
        if inner.epoch != epoch {
            debug!(
                scheduled_epoch = epoch,
                live_epoch = inner.epoch,
                "Dropping stale append from a reset step"
            );
            return None;
        }

        // Avatar rule: only the first of a consecutive run of agent
        // turns shows the avatar.
        let show_avatar = match spec.kind {
            TurnKind::AgentText => !matches!(
                inner.turns.last().map(|t| t.kind),
                Some(TurnKind::AgentText)
            ),
            TurnKind::Interactive { .. } => false,
        };

        let seq = inner.next_seq;
        inner.next_seq += 1;
        let now = Utc::now();
        let turn = Turn {
            id: format!("t{}-{}", seq, now.timestamp_millis()),
            kind: spec.kind,
            payload: spec.payload,
            show_avatar,
            is_selected: false,
            selected_option_id: None,
            created_at: now,
        };
        inner.turns.push(turn.clone());
        drop(inner);

        debug!(turn_id = %turn.id, kind = ?turn.kind, "Turn appended");

        // Broadcast — ok if no receivers are listening yet
        let _ = self.tx.send(TimelineEvent::TurnAppended { turn: turn.clone() });
        Some(turn)
    }

    /// Append unconditionally under whatever epoch is live.
    pub async fn append(&self, spec: TurnSpec) -> Turn {
        loop {
            let epoch = self.epoch().await;
            if let Some(turn) = self.append_if_epoch(epoch, spec.clone()).await {
                return turn;
            }
        }
    }

    /// Merge a selection patch into the turn with `id`.
    ///
    /// A missing id is a silent no-op: the turn may belong to a step
    /// that reset before the patch arrived.
    pub async fn update(&self, id: &str, patch: TurnPatch) {
        let mut inner = self.inner.write().await;
        let Some(turn) = inner.turns.iter_mut().find(|t| t.id == id) else {
            debug!(turn_id = %id, "Update for unknown turn ignored");
            return;
        };
        turn.is_selected = patch.is_selected;
        if patch.selected_option_id.is_some() {
            turn.selected_option_id = patch.selected_option_id;
        }
        let updated = turn.clone();
        drop(inner);

        let _ = self.tx.send(TimelineEvent::TurnUpdated { turn: updated });
    }

    /// Clear the log and bump the epoch. Called on every step change.
    pub async fn reset(&self) {
        let mut inner = self.inner.write().await;
        inner.turns.clear();
        inner.epoch += 1;
        drop(inner);

        let _ = self.tx.send(TimelineEvent::TimelineReset);
    }

    /// The full ordered turn list.
    pub async fn snapshot(&self) -> Vec<Turn> {
        self.inner.read().await.turns.clone()
    }

    /// Look up a turn by id.
    pub async fn get(&self, id: &str) -> Option<Turn> {
        self.inner.read().await.turns.iter().find(|t| t.id == id).cloned()
    }

    /// Number of turns in the log.
    pub async fn len(&self) -> usize {
        self.inner.read().await.turns.len()
    }

    /// Whether the log is empty.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::model::WidgetKind;

    #[tokio::test]
    async fn append_assigns_monotonic_ids() {
        let timeline = Timeline::new();
        let a = timeline.append(TurnSpec::agent_text("one")).await;
        let b = timeline.append(TurnSpec::agent_text("two")).await;

        assert!(a.id.starts_with("t0-"));
        assert!(b.id.starts_with("t1-"));
        assert_ne!(a.id, b.id);
        assert_eq!(timeline.len().await, 2);
    }

    #[tokio::test]
    async fn avatar_shown_only_on_first_of_agent_run() {
        let timeline = Timeline::new();
        let a = timeline.append(TurnSpec::agent_text("hello")).await;
        let b = timeline.append(TurnSpec::agent_text("again")).await;
        let w = timeline
            .append(TurnSpec::widget(
                WidgetKind::OptionChoice,
                serde_json::json!({"options": []}),
            ))
            .await;
        let c = timeline.append(TurnSpec::agent_text("after widget")).await;

        assert!(a.show_avatar);
        assert!(!b.show_avatar);
        assert!(!w.show_avatar);
        assert!(c.show_avatar, "run restarts after a non-agent turn");
    }

    #[tokio::test]
    async fn avatar_invariant_holds_over_snapshot() {
        let timeline = Timeline::new();
        for i in 0..5 {
            timeline.append(TurnSpec::agent_text(format!("m{i}"))).await;
        }
        let turns = timeline.snapshot().await;
        for pair in turns.windows(2) {
            if pair[0].kind == TurnKind::AgentText && pair[1].kind == TurnKind::AgentText {
                assert!(!(pair[0].show_avatar && pair[1].show_avatar));
            }
        }
        assert!(turns[0].show_avatar);
    }

    #[tokio::test]
    async fn stale_epoch_append_is_dropped() {
        let timeline = Timeline::new();
        let old_epoch = timeline.epoch().await;
        timeline.reset().await;

        let result = timeline
            .append_if_epoch(old_epoch, TurnSpec::agent_text("stale"))
            .await;
        assert!(result.is_none());
        assert!(timeline.is_empty().await);
    }

    #[tokio::test]
    async fn update_patches_selection_in_place() {
        let timeline = Timeline::new();
        let turn = timeline
            .append(TurnSpec::widget(
                WidgetKind::OptionChoice,
                serde_json::json!({"options": []}),
            ))
            .await;

        timeline
            .update(
                &turn.id,
                TurnPatch {
                    is_selected: true,
                    selected_option_id: Some("opt_a".to_string()),
                },
            )
            .await;

        let patched = timeline.get(&turn.id).await.unwrap();
        assert!(patched.is_selected);
        assert_eq!(patched.selected_option_id.as_deref(), Some("opt_a"));
    }

    #[tokio::test]
    async fn update_unknown_id_is_noop() {
        let timeline = Timeline::new();
        timeline.append(TurnSpec::agent_text("only")).await;

        timeline
            .update(
                "t99-0",
                TurnPatch {
                    is_selected: true,
                    selected_option_id: None,
                },
            )
            .await;

        let turns = timeline.snapshot().await;
        assert_eq!(turns.len(), 1);
        assert!(!turns[0].is_selected);
    }

    #[tokio::test]
    async fn reset_clears_and_bumps_epoch() {
        let timeline = Timeline::new();
        timeline.append(TurnSpec::agent_text("gone soon")).await;
        let before = timeline.epoch().await;

        timeline.reset().await;

        assert!(timeline.is_empty().await);
        assert_eq!(timeline.epoch().await, before + 1);
    }

    #[tokio::test]
    async fn broadcast_emits_append_update_reset() {
        let timeline = Timeline::new();
        let mut rx = timeline.subscribe();

        let turn = timeline.append(TurnSpec::agent_text("hi")).await;
        match rx.recv().await.unwrap() {
            TimelineEvent::TurnAppended { turn: t } => assert_eq!(t.id, turn.id),
            other => panic!("expected TurnAppended, got {other:?}"),
        }

        timeline
            .update(
                &turn.id,
                TurnPatch {
                    is_selected: true,
                    selected_option_id: None,
                },
            )
            .await;
        match rx.recv().await.unwrap() {
            TimelineEvent::TurnUpdated { turn: t } => assert!(t.is_selected),
            other => panic!("expected TurnUpdated, got {other:?}"),
        }

        timeline.reset().await;
        match rx.recv().await.unwrap() {
            TimelineEvent::TimelineReset => {}
            other => panic!("expected TimelineReset, got {other:?}"),
        }
    }
}
