//! Turn data model — the entries of a step's scripted conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The closed set of interactive widgets a step script may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    /// Free-form address entry (step 1).
    AddressInput,
    /// Single choice among a fixed option list.
    OptionChoice,
    /// Reviewable/removable list of comparable listings.
    FilterList,
    /// Photo/document upload form.
    UploadForm,
    /// Range selection (e.g. preferred closing timeline).
    Slider,
    /// Terminal confirmation — resolving it advances the wizard.
    Confirmation,
}

impl std::fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AddressInput => write!(f, "address_input"),
            Self::OptionChoice => write!(f, "option_choice"),
            Self::FilterList => write!(f, "filter_list"),
            Self::UploadForm => write!(f, "upload_form"),
            Self::Slider => write!(f, "slider"),
            Self::Confirmation => write!(f, "confirmation"),
        }
    }
}

impl std::str::FromStr for WidgetKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "address_input" => Ok(Self::AddressInput),
            "option_choice" => Ok(Self::OptionChoice),
            "filter_list" => Ok(Self::FilterList),
            "upload_form" => Ok(Self::UploadForm),
            "slider" => Ok(Self::Slider),
            "confirmation" => Ok(Self::Confirmation),
            _ => Err(format!("Unknown widget kind: {}", s)),
        }
    }
}

/// What a turn is: scripted agent speech or an interactive widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnKind {
    /// A scripted agent utterance.
    AgentText,
    /// An interactive widget awaiting user resolution.
    Interactive { widget: WidgetKind },
}

impl TurnKind {
    /// The widget kind, if this turn is interactive.
    pub fn widget(&self) -> Option<WidgetKind> {
        match self {
            Self::AgentText => None,
            Self::Interactive { widget } => Some(*widget),
        }
    }

    /// Whether this turn waits for user resolution.
    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Interactive { .. })
    }
}

/// One entry in a step's conversation.
///
/// Turns are append-only: once in the timeline they are never mutated,
/// with one exception — the selection annotation stamped when the user
/// resolves an interactive turn (see [`TurnPatch`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Unique id: monotonic sequence number plus a millisecond timestamp,
    /// unique across rapid appends.
    pub id: String,
    /// Agent text or interactive widget.
    #[serde(flatten)]
    pub kind: TurnKind,
    /// Kind-specific data — opaque to the flow engine, interpreted only
    /// by the rendering layer.
    pub payload: serde_json::Value,
    /// True only for the first of a consecutive run of agent turns.
    pub show_avatar: bool,
    /// Set when the user resolves this turn's widget.
    #[serde(default)]
    pub is_selected: bool,
    /// The option the user picked, if the widget carried options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_option_id: Option<String>,
    /// When the turn was appended.
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// Whether this turn is an unresolved interactive widget.
    pub fn is_resolvable(&self) -> bool {
        self.kind.is_interactive() && !self.is_selected
    }
}

/// The single allowed post-append mutation: stamping selection state
/// onto a resolved interactive turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnPatch {
    pub is_selected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_option_id: Option<String>,
}

/// Blueprint for a turn, as carried by a step script stage. The id,
/// avatar flag, and timestamp are assigned by the timeline at append.
#[derive(Debug, Clone)]
pub struct TurnSpec {
    pub kind: TurnKind,
    pub payload: serde_json::Value,
}

impl TurnSpec {
    /// A scripted agent utterance.
    pub fn agent_text(text: impl Into<String>) -> Self {
        Self {
            kind: TurnKind::AgentText,
            payload: serde_json::json!({ "text": text.into() }),
        }
    }

    /// An interactive widget with a kind-specific payload.
    pub fn widget(widget: WidgetKind, payload: serde_json::Value) -> Self {
        Self {
            kind: TurnKind::Interactive { widget },
            payload,
        }
    }
}

/// Change notifications emitted by the timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimelineEvent {
    /// A turn was appended.
    TurnAppended { turn: Turn },
    /// A turn's selection annotation changed.
    TurnUpdated { turn: Turn },
    /// The timeline was cleared (step change or restart).
    TimelineReset,
}
