//! humidity -> pot state

use crate::i18n::Translations;
use serde::Serialize;

/// below this the soil needs watering
pub const DRY_BELOW: f64 = 40.0;
/// above this the pot is waterlogged
pub const WET_ABOVE: f64 = 70.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HumidityState {
    Dry,
    Optimal,
    Wet,
}

impl HumidityState {
    pub fn classify(humidity: f64) -> Self {
        if humidity < DRY_BELOW {
            HumidityState::Dry
        } else if humidity > WET_ABOVE {
            HumidityState::Wet
        } else {
            HumidityState::Optimal
        }
    }

    pub fn label(self, t: &Translations) -> &'static str {
        match self {
            HumidityState::Dry => t.dry,
            HumidityState::Optimal => t.optimal,
            HumidityState::Wet => t.wet,
        }
    }

    /// css class used by the dashboard badges
    pub fn css(self) -> &'static str {
        match self {
            HumidityState::Dry => "state-dry",
            HumidityState::Optimal => "state-optimal",
            HumidityState::Wet => "state-wet",
        }
    }
}
