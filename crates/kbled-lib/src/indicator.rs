//! Indicator catalog — indicator indices, names, states, and the request array.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Number of indicators modeled (Num, Caps, Scroll Lock).
pub const MAX_LEDS: usize = 3;

const LED_NAMES: [&str; MAX_LEDS] = ["num", "caps", "scroll"];

/// A keyboard indicator light, indexed `0..MAX_LEDS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Indicator {
    Num = 0,
    Caps = 1,
    Scroll = 2,
}

impl Indicator {
    pub const ALL: [Indicator; MAX_LEDS] = [Indicator::Num, Indicator::Caps, Indicator::Scroll];

    /// Map an indicator index to its indicator. Indices `>= MAX_LEDS` have none.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        LED_NAMES[self.index()]
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Indicator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "num" | "numlock" => Ok(Indicator::Num),
            "caps" | "capslock" => Ok(Indicator::Caps),
            "scroll" | "scrolllock" => Ok(Indicator::Scroll),
            other => Err(format!(
                "unknown indicator '{other}' (expected num, caps or scroll)"
            )),
        }
    }
}

/// Requested (or observed) state of one indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LedState {
    #[default]
    NoChange,
    Off,
    On,
}

impl LedState {
    /// Interpret a raw element value. Any non-zero value counts as on.
    pub fn from_value(value: i32) -> Self {
        if value == 0 { LedState::Off } else { LedState::On }
    }

    /// Raw element value to write, or `None` for `NoChange`.
    pub fn value(self) -> Option<i32> {
        match self {
            LedState::NoChange => None,
            LedState::Off => Some(0),
            LedState::On => Some(1),
        }
    }

    /// Report symbol: `-` for off, `+` for on, empty for `NoChange`.
    pub fn symbol(self) -> &'static str {
        match self {
            LedState::NoChange => "",
            LedState::Off => "-",
            LedState::On => "+",
        }
    }
}

impl From<bool> for LedState {
    fn from(on: bool) -> Self {
        if on { LedState::On } else { LedState::Off }
    }
}

impl FromStr for LedState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on" | "1" => Ok(LedState::On),
            "off" | "0" => Ok(LedState::Off),
            other => Err(format!("unknown state '{other}' (expected on or off)")),
        }
    }
}

/// One requested state per indicator index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndicatorRequest([LedState; MAX_LEDS]);

impl IndicatorRequest {
    /// Change nothing; reconciling with this request is a pure status read.
    pub fn none() -> Self {
        IndicatorRequest([LedState::NoChange; MAX_LEDS])
    }

    /// Set exactly one indicator, leave the others untouched.
    pub fn single(indicator: Indicator, state: LedState) -> Self {
        let mut request = Self::none();
        request.0[indicator.index()] = state;
        request
    }

    pub fn get(&self, indicator: Indicator) -> LedState {
        self.0[indicator.index()]
    }

    /// True if no slot requests a change.
    pub fn is_read_only(&self) -> bool {
        self.0.iter().all(|s| *s == LedState::NoChange)
    }
}
