use std::fmt;

use serde::{Deserialize, Serialize};

use crate::backend::BackendStatus;

/// Appended to the badge text when a backend update is available.
pub const UPDATE_SUFFIX: &str = "+";

const LOCK_GLYPH: &str = "\u{1F512}\u{FE0E}";

/// What the toolbar indicator communicates for a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorState {
    /// Login fields on the page are waiting for a fill decision.
    QuestionMark,
    /// Backend reachable, credential store locked.
    Locked,
    /// Backend unreachable or not configured.
    Cross,
    Normal,
}

impl IndicatorState {
    pub const ALL: [IndicatorState; 4] = [
        IndicatorState::QuestionMark,
        IndicatorState::Locked,
        IndicatorState::Cross,
        IndicatorState::Normal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IndicatorState::QuestionMark => "questionmark",
            IndicatorState::Locked => "locked",
            IndicatorState::Cross => "cross",
            IndicatorState::Normal => "normal",
        }
    }

    fn badge_text(self) -> &'static str {
        match self {
            IndicatorState::QuestionMark => "?",
            IndicatorState::Locked => LOCK_GLYPH,
            IndicatorState::Cross => "!",
            IndicatorState::Normal => "",
        }
    }

    fn badge_color(self) -> Option<&'static str> {
        match self {
            IndicatorState::QuestionMark => Some("#9DD9D2"),
            IndicatorState::Locked => Some("#FC7A57"),
            IndicatorState::Cross => Some("#FFCC00"),
            IndicatorState::Normal => None,
        }
    }

    pub fn popup(self) -> PopupView {
        match self {
            IndicatorState::QuestionMark => PopupView::Login,
            _ => PopupView::Default,
        }
    }
}

impl fmt::Display for IndicatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Popup view presented when the indicator is clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopupView {
    Default,
    Login,
}

impl PopupView {
    pub fn id(self) -> &'static str {
        match self {
            PopupView::Default => "popup",
            PopupView::Login => "popup_login",
        }
    }

    pub fn path(self) -> String {
        format!("popups/{}.html", self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub text: String,
    pub color: Option<&'static str>,
}

impl Badge {
    pub fn for_state(state: IndicatorState, update_available: bool) -> Self {
        let mut text = state.badge_text().to_string();
        if update_available {
            text.push_str(UPDATE_SUFFIX);
        }
        Self {
            text,
            color: state.badge_color(),
        }
    }
}

/// Everything the indicator is a function of.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndicatorInputs {
    pub backend: BackendStatus,
    /// Candidate login fields detected on the tab's current page.
    pub candidate_fields: usize,
    /// Stored entries whose site pattern authorizes the page. Only known
    /// while the backend is reachable and unlocked.
    pub matched_entries: usize,
}

impl IndicatorInputs {
    /// Fields await a fill decision only when the backend can answer and
    /// holds at least one entry authorized for the page.
    pub fn has_pending_candidates(&self) -> bool {
        self.backend.reachable && self.candidate_fields > 0 && self.matched_entries > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Indicator {
    pub state: IndicatorState,
    pub badge: Badge,
    pub popup: PopupView,
}

/// Fold backend status and detected fields into one indicator.
///
/// First matching rule wins: pending candidates (fields plus an authorized
/// entry), then locked, then unreachable, then normal.
pub fn resolve_indicator(inputs: &IndicatorInputs) -> Indicator {
    let state = if inputs.has_pending_candidates() {
        IndicatorState::QuestionMark
    } else if inputs.backend.reachable && inputs.backend.locked {
        IndicatorState::Locked
    } else if !inputs.backend.reachable {
        IndicatorState::Cross
    } else {
        IndicatorState::Normal
    };

    Indicator {
        state,
        badge: Badge::for_state(state, inputs.backend.update_available),
        popup: state.popup(),
    }
}
