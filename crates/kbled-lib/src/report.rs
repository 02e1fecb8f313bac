//! Per-device outcome lines.

use std::fmt;
use std::io::{self, Write};

use serde::Serialize;

use crate::indicator::{Indicator, LedState};

/// Outcome for one indicator of one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub indicator: Indicator,
    /// State after the pass (the requested state if a write happened).
    pub on: bool,
    /// True if this pass wrote the indicator.
    pub changed: bool,
}

impl Annotation {
    pub fn state(&self) -> LedState {
        LedState::from(self.on)
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.state().symbol(), self.indicator.name())
    }
}

/// Outcome for one reconciled device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceReport {
    pub name: String,
    #[serde(rename = "indicators")]
    pub annotations: Vec<Annotation>,
}

impl DeviceReport {
    pub fn new(name: impl Into<String>) -> Self {
        DeviceReport {
            name: name.into(),
            annotations: Vec::new(),
        }
    }

    /// Number of indicators written during the pass.
    pub fn changed_count(&self) -> usize {
        self.annotations.iter().filter(|a| a.changed).count()
    }

    pub fn get(&self, indicator: Indicator) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.indicator == indicator)
    }
}

/// ` "<name>" -num +caps -scroll`
pub fn format_device_line(report: &DeviceReport) -> String {
    let mut line = format!(" \"{}\"", report.name);
    for a in &report.annotations {
        line.push(' ');
        line.push_str(&a.to_string());
    }
    line
}

pub fn write_device_line(out: &mut impl Write, report: &DeviceReport) -> io::Result<()> {
    writeln!(out, "{}", format_device_line(report))
}
