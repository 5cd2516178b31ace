//! ==============================================================================
//! selection.rs - active sensor state machine
//! ==============================================================================
//!
//! states:
//!     Unselected  --default(first discovered) / pick(id)-->  Selected(id)
//!     Selected(a) --pick(b), b != a-->                       Selected(b)
//!     Selected(a) --pick(a)-->  Unselected   (toggle policy)
//!                               Selected(a)  (single-select policy)
//!
//! the default is offered once per view: after the first default or the
//! first pick, only picks move the state. nothing leaves Selected on its
//! own, not even the sensor vanishing from discovery, and a toggled-off
//! view stays Unselected while readings keep arriving.
//!
//! ==============================================================================

use crate::domain::SensorId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// what re-picking the selected sensor does
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionPolicy {
    /// re-pick clears the selection (device drill-down)
    Toggle,
    /// re-pick keeps it (overview, statistics)
    Single,
}

/// the dashboard tabs, each with its own selection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Principal,
    Devices,
    Statistics,
}

impl View {
    pub const ALL: [View; 3] = [View::Principal, View::Devices, View::Statistics];

    pub fn default_policy(self) -> SelectionPolicy {
        match self {
            View::Devices => SelectionPolicy::Toggle,
            View::Principal | View::Statistics => SelectionPolicy::Single,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            View::Principal => "principal",
            View::Devices => "devices",
            View::Statistics => "statistics",
        }
    }
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "principal" | "main" | "overview" => Ok(View::Principal),
            "devices" | "dispositivos" => Ok(View::Devices),
            "statistics" | "estadisticas" => Ok(View::Statistics),
            other => Err(format!("unknown view '{}'", other)),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "sensor", rename_all = "lowercase")]
pub enum SelectionState {
    #[default]
    Unselected,
    Selected(SensorId),
}

#[derive(Clone, Debug)]
pub struct Selection {
    policy: SelectionPolicy,
    state: SelectionState,
    // set by the first default or pick; after that only picks move the state
    settled: bool,
}

impl Selection {
    pub fn new(policy: SelectionPolicy) -> Self {
        Self { policy, state: SelectionState::Unselected, settled: false }
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn active(&self) -> Option<&SensorId> {
        match &self.state {
            SelectionState::Selected(id) => Some(id),
            SelectionState::Unselected => None,
        }
    }

    /// first-discovery default; fills the selection at most once, and never
    /// after the user has picked (a toggled-off view stays unselected)
    pub fn offer_default(&mut self, discovered: &[SensorId]) -> bool {
        if self.settled {
            return false;
        }
        match (&self.state, discovered.first()) {
            (SelectionState::Unselected, Some(first)) => {
                self.state = SelectionState::Selected(first.clone());
                self.settled = true;
                true
            }
            _ => false,
        }
    }

    /// explicit user pick; the caller has already checked `id` is known
    pub fn pick(&mut self, id: &str) -> &SelectionState {
        self.settled = true;
        let reselect = self.active().is_some_and(|current| current == id);
        self.state = match (reselect, self.policy) {
            (true, SelectionPolicy::Toggle) => SelectionState::Unselected,
            (true, SelectionPolicy::Single) => SelectionState::Selected(id.to_string()),
            (false, _) => SelectionState::Selected(id.to_string()),
        };
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<SensorId> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn default_is_first_discovered_not_smallest() {
        let mut sel = Selection::new(SelectionPolicy::Single);
        assert!(sel.offer_default(&ids(&["s2", "s1"])));
        assert_eq!(sel.active().map(String::as_str), Some("s2"));
    }

    #[test]
    fn default_never_overrides() {
        let mut sel = Selection::new(SelectionPolicy::Single);
        sel.pick("s9");
        assert!(!sel.offer_default(&ids(&["s1"])));
        assert_eq!(sel.active().map(String::as_str), Some("s9"));
    }

    #[test]
    fn empty_discovery_keeps_unselected() {
        let mut sel = Selection::new(SelectionPolicy::Toggle);
        assert!(!sel.offer_default(&[]));
        assert_eq!(sel.state(), &SelectionState::Unselected);
    }

    #[test]
    fn toggle_repick_clears() {
        let mut sel = Selection::new(SelectionPolicy::Toggle);
        sel.pick("a");
        assert_eq!(sel.pick("a"), &SelectionState::Unselected);
        assert_eq!(sel.pick("a"), &SelectionState::Selected("a".into()));
    }

    #[test]
    fn toggled_off_is_not_defaulted_again() {
        let mut sel = Selection::new(SelectionPolicy::Toggle);
        assert!(sel.offer_default(&ids(&["a", "b"])));
        assert_eq!(sel.pick("a"), &SelectionState::Unselected);
        assert!(!sel.offer_default(&ids(&["a", "b"])));
        assert_eq!(sel.state(), &SelectionState::Unselected);
    }

    #[test]
    fn pick_before_discovery_blocks_default() {
        let mut sel = Selection::new(SelectionPolicy::Toggle);
        sel.pick("a");
        sel.pick("a");
        assert!(!sel.offer_default(&ids(&["b"])));
        assert_eq!(sel.active(), None);
    }

    #[test]
    fn single_repick_keeps() {
        let mut sel = Selection::new(SelectionPolicy::Single);
        sel.pick("a");
        assert_eq!(sel.pick("a"), &SelectionState::Selected("a".into()));
    }

    #[test]
    fn pick_other_switches_under_both_policies() {
        for policy in [SelectionPolicy::Toggle, SelectionPolicy::Single] {
            let mut sel = Selection::new(policy);
            sel.pick("a");
            assert_eq!(sel.pick("b"), &SelectionState::Selected("b".into()));
        }
    }

    #[test]
    fn views_parse_and_have_policies() {
        assert_eq!("Devices".parse::<View>(), Ok(View::Devices));
        assert_eq!("estadisticas".parse::<View>(), Ok(View::Statistics));
        assert!("settings".parse::<View>().is_err());
        assert_eq!(View::Devices.default_policy(), SelectionPolicy::Toggle);
        assert_eq!(View::Principal.default_policy(), SelectionPolicy::Single);
    }
}
