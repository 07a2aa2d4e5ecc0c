//! Step script model — the fixed chain of turns and delays for one step.

use std::time::Duration;

use crate::timeline::{TurnKind, TurnSpec, WidgetKind};

/// One link in a step's chain.
///
/// A stage materializes exactly one turn after `delay` has elapsed from
/// its trigger. The trigger is implicit in the chain position: the first
/// stage fires on mount, a stage after an agent turn fires off the
/// internal timer, and a stage after an interactive turn fires when that
/// turn is resolved.
#[derive(Debug, Clone)]
pub struct Stage {
    /// Delay between the trigger firing and the turn appearing. Models
    /// "agent is typing" pacing, not real asynchronous work.
    pub delay: Duration,
    /// The turn this stage produces.
    pub turn: TurnSpec,
}

/// The scripted sequence for one wizard step: a directed chain, not a
/// general graph. Each interactive turn has exactly one successor, fired
/// by its resolution.
#[derive(Debug, Clone)]
pub struct StepScript {
    /// Short machine name, e.g. `"verify_property"`.
    pub name: &'static str,
    /// Title shown by presentation adapters.
    pub title: &'static str,
    pub stages: Vec<Stage>,
}

impl StepScript {
    pub fn new(name: &'static str, title: &'static str) -> Self {
        Self {
            name,
            title,
            stages: Vec::new(),
        }
    }

    /// Chain an agent utterance.
    pub fn agent(mut self, delay_ms: u64, text: impl Into<String>) -> Self {
        self.stages.push(Stage {
            delay: Duration::from_millis(delay_ms),
            turn: TurnSpec::agent_text(text),
        });
        self
    }

    /// Chain an interactive widget.
    pub fn widget(
        mut self,
        delay_ms: u64,
        widget: WidgetKind,
        payload: serde_json::Value,
    ) -> Self {
        self.stages.push(Stage {
            delay: Duration::from_millis(delay_ms),
            turn: TurnSpec::widget(widget, payload),
        });
        self
    }

    /// The widget kinds this script produces, in chain order.
    pub fn widget_kinds(&self) -> Vec<WidgetKind> {
        self.stages
            .iter()
            .filter_map(|s| s.turn.kind.widget())
            .collect()
    }

    /// Whether the chain ends in a `Confirmation` widget — the terminal
    /// turn whose resolution advances the wizard.
    pub fn ends_with_confirmation(&self) -> bool {
        self.stages
            .last()
            .map(|s| {
                s.turn.kind
                    == TurnKind::Interactive {
                        widget: WidgetKind::Confirmation,
                    }
            })
            .unwrap_or(false)
    }
}

/// The ordered collection of step scripts making up the wizard.
#[derive(Debug, Clone)]
pub struct WizardFlow {
    steps: Vec<StepScript>,
}

impl WizardFlow {
    pub fn new(steps: Vec<StepScript>) -> Self {
        Self { steps }
    }

    /// Number of steps.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// The script for a 1-based step number.
    pub fn script(&self, step: usize) -> Option<&StepScript> {
        if step == 0 {
            return None;
        }
        self.steps.get(step - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_stage_script() -> StepScript {
        StepScript::new("test", "Test")
            .agent(100, "hello")
            .widget(200, WidgetKind::Confirmation, serde_json::json!({}))
    }

    #[test]
    fn builder_chains_stages_in_order() {
        let script = two_stage_script();
        assert_eq!(script.stages.len(), 2);
        assert_eq!(script.stages[0].delay, Duration::from_millis(100));
        assert_eq!(script.stages[0].turn.kind, TurnKind::AgentText);
        assert_eq!(
            script.stages[1].turn.kind,
            TurnKind::Interactive {
                widget: WidgetKind::Confirmation
            }
        );
    }

    #[test]
    fn ends_with_confirmation() {
        assert!(two_stage_script().ends_with_confirmation());
        let open_ended = StepScript::new("open", "Open").agent(0, "just text");
        assert!(!open_ended.ends_with_confirmation());
    }

    #[test]
    fn flow_script_lookup_is_one_based() {
        let flow = WizardFlow::new(vec![two_stage_script(), two_stage_script()]);
        assert_eq!(flow.step_count(), 2);
        assert!(flow.script(0).is_none());
        assert!(flow.script(1).is_some());
        assert!(flow.script(2).is_some());
        assert!(flow.script(3).is_none());
    }

    #[test]
    fn widget_kinds_in_chain_order() {
        let script = StepScript::new("w", "W")
            .agent(0, "a")
            .widget(0, WidgetKind::Slider, serde_json::json!({}))
            .agent(0, "b")
            .widget(0, WidgetKind::Confirmation, serde_json::json!({}));
        assert_eq!(
            script.widget_kinds(),
            vec![WidgetKind::Slider, WidgetKind::Confirmation]
        );
    }
}
