//! kbled — read and set keyboard indicator LEDs (Num, Caps, Scroll Lock) on
//! every attached keyboard.

pub mod config;
pub mod enumerate;
pub mod error;
pub mod filter;
pub mod hid;
pub mod indicator;
pub mod reconcile;
pub mod report;

pub use enumerate::{RunOptions, RunOutcome, set_all_keyboards, set_indicator};
pub use error::KbledError;
pub use indicator::{Indicator, IndicatorRequest, LedState};
