//! Device matching — the keyboard-class host query and the device-name glob.

use crate::error::{KbledError, Result};

/// HID usage page: Generic Desktop.
pub const PAGE_GENERIC_DESKTOP: u32 = 0x01;
/// HID usage (Generic Desktop page): Keyboard.
pub const USAGE_KEYBOARD: u32 = 0x06;
/// HID usage page: LEDs.
pub const PAGE_LEDS: u32 = 0x08;

/// Device-level query handed to the host manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceMatching {
    pub usage_page: u32,
    pub usage: u32,
}

impl DeviceMatching {
    /// Any input device exposing the generic-desktop keyboard usage.
    pub fn keyboard() -> Self {
        DeviceMatching {
            usage_page: PAGE_GENERIC_DESKTOP,
            usage: USAGE_KEYBOARD,
        }
    }
}

/// Element-level query: restricts a device's elements to one usage page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementMatching {
    pub usage_page: u32,
}

impl ElementMatching {
    pub fn leds() -> Self {
        ElementMatching {
            usage_page: PAGE_LEDS,
        }
    }
}

/// Shell-glob filter on device display names, matched with `fnmatch(3)`
/// and no flags.
///
/// Case-sensitive; `*` and `?` also match `/` and leading dots. A bracket
/// expression that never closes is matched literally, so the only pattern
/// that cannot be built is one holding a NUL byte.
#[derive(Debug, Clone)]
pub struct NameFilter {
    source: String,
    compiled: imp::Compiled,
}

impl NameFilter {
    pub fn new(pattern: &str) -> Result<Self> {
        let compiled = imp::compile(pattern)
            .map_err(|e| KbledError::Pattern(format!("'{}': {e}", pattern.escape_debug())))?;
        Ok(NameFilter {
            source: pattern.to_string(),
            compiled,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, name: &str) -> bool {
        imp::matches(&self.compiled, &self.source, name)
    }
}

#[cfg(unix)]
mod imp {
    use std::ffi::CString;

    pub(super) type Compiled = CString;

    pub(super) fn compile(pattern: &str) -> Result<CString, &'static str> {
        CString::new(pattern).map_err(|_| "contains a NUL byte")
    }

    pub(super) fn matches(pattern: &CString, _source: &str, name: &str) -> bool {
        // Names come from C strings; one with a NUL cannot be a device name.
        let Ok(name) = CString::new(name) else {
            return false;
        };
        // SAFETY: both pointers are NUL-terminated and outlive the call.
        unsafe { libc::fnmatch(pattern.as_ptr(), name.as_ptr(), 0) == 0 }
    }
}

// No fnmatch in the C runtime here. The platform host never yields devices
// on these targets, so this only has to agree on plain wildcards.
#[cfg(not(unix))]
mod imp {
    use glob::{MatchOptions, Pattern};

    /// `None` when glob rejects the pattern; it is then compared literally.
    pub(super) type Compiled = Option<Pattern>;

    pub(super) fn compile(pattern: &str) -> Result<Option<Pattern>, &'static str> {
        if pattern.contains('\0') {
            return Err("contains a NUL byte");
        }
        Ok(Pattern::new(pattern).ok())
    }

    pub(super) fn matches(pattern: &Option<Pattern>, source: &str, name: &str) -> bool {
        match pattern {
            Some(p) => p.matches_with(name, MatchOptions::new()),
            None => source == name,
        }
    }
}

/// Decide whether a device should be processed.
///
/// No filter accepts everything. With a filter, a device without a name is
/// always rejected.
pub fn name_matches(name: Option<&str>, filter: Option<&NameFilter>) -> bool {
    match (filter, name) {
        (None, _) => true,
        (Some(filter), Some(name)) => filter.matches(name),
        (Some(_), None) => false,
    }
}
