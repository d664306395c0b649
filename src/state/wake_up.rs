//! Wake-up naming
//!
//! Every tracked tab owns at most two wake-ups, `closeTab_<id>` and
//! `warnTab_<id>`. The names are what the scheduler persists, so they must
//! stay stable across releases.

use super::TabId;

const CLOSE_PREFIX: &str = "closeTab_";
const WARN_PREFIX: &str = "warnTab_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeUp {
    Warning(TabId),
    Close(TabId),
}

impl WakeUp {
    pub fn name(&self) -> String {
        match self {
            WakeUp::Warning(tab_id) => format!("{}{}", WARN_PREFIX, tab_id),
            WakeUp::Close(tab_id) => format!("{}{}", CLOSE_PREFIX, tab_id),
        }
    }

    /// Decode a scheduler name; names owned by anything else yield `None`
    pub fn parse(name: &str) -> Option<Self> {
        if let Some(id) = name.strip_prefix(CLOSE_PREFIX) {
            return id.parse().ok().map(|id| WakeUp::Close(TabId(id)));
        }
        if let Some(id) = name.strip_prefix(WARN_PREFIX) {
            return id.parse().ok().map(|id| WakeUp::Warning(TabId(id)));
        }
        None
    }
}
