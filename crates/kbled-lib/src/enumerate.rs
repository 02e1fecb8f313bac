//! Keyboard enumeration — open the host manager, snapshot matching devices,
//! reconcile every keyboard with the same request.

use std::io::{self, Write};

use crate::error::{KbledError, Result};
use crate::filter::{
    DeviceMatching, ElementMatching, NameFilter, PAGE_GENERIC_DESKTOP, USAGE_KEYBOARD,
};
use crate::hid::{HidDevice, HidHost, HidManager};
use crate::indicator::{Indicator, IndicatorRequest, LedState};
use crate::reconcile::reconcile_keyboard;
use crate::report::{DeviceReport, write_device_line};

/// Per-run options, passed explicitly down to every device pass.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub name_filter: Option<NameFilter>,
    /// Write one state line per reconciled keyboard.
    pub verbose: bool,
}

/// Result of a run that did not hit a fatal error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The host returned an empty device set. Informational, not an error.
    NoKeyboardsFound,
    /// One report per keyboard that passed the name filter, in host order.
    Completed(Vec<DeviceReport>),
}

impl RunOutcome {
    pub fn reports(&self) -> &[DeviceReport] {
        match self {
            RunOutcome::NoKeyboardsFound => &[],
            RunOutcome::Completed(reports) => reports,
        }
    }
}

/// Apply `request` to every attached keyboard.
///
/// Fails only if the manager cannot be opened, the keyboard filter cannot be
/// installed, or the device set cannot be queried. Per-device and
/// per-indicator failures are logged and skipped. Verbose lines go to `out`;
/// once `out` fails, later lines are dropped but every keyboard is still
/// reconciled.
pub fn set_all_keyboards<H: HidHost>(
    host: &H,
    request: &IndicatorRequest,
    options: &RunOptions,
    out: &mut impl Write,
) -> Result<RunOutcome> {
    let mut manager = host
        .open_manager()
        .map_err(|e| KbledError::HostManagerUnavailable(e.detail().to_string()))?;

    manager
        .set_device_matching(&DeviceMatching::keyboard())
        .map_err(|e| KbledError::FilterConstructionFailed(e.detail().to_string()))?;

    let devices = manager.copy_devices()?;
    if devices.is_empty() {
        return Ok(RunOutcome::NoKeyboardsFound);
    }
    log::debug!("{} device(s) matched the keyboard filter", devices.len());
    if request.is_read_only() {
        log::debug!("read-only pass, no indicator will be written");
    }
    if let Some(filter) = &options.name_filter {
        log::debug!("name filter: '{}'", filter.as_str());
    }

    let elements = ElementMatching::leds();
    let mut reports = Vec::new();
    let mut out_open = options.verbose;
    for mut device in devices {
        if !device.conforms_to(PAGE_GENERIC_DESKTOP, USAGE_KEYBOARD) {
            continue;
        }
        let Some(report) =
            reconcile_keyboard(&mut device, &elements, request, options.name_filter.as_ref())
        else {
            continue;
        };
        if out_open && let Err(e) = write_device_line(out, &report) {
            log::debug!("state line for \"{}\" not written: {e}", report.name);
            out_open = false;
        }
        reports.push(report);
    }

    Ok(RunOutcome::Completed(reports))
}

/// Switch one indicator on every keyboard, quietly.
pub fn set_indicator<H: HidHost>(host: &H, indicator: Indicator, on: bool) -> Result<RunOutcome> {
    let request = IndicatorRequest::single(indicator, LedState::from(on));
    set_all_keyboards(host, &request, &RunOptions::default(), &mut io::sink())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::mock::{MockHost, MockKeyboard};

    fn run(
        host: &MockHost,
        request: IndicatorRequest,
        options: &RunOptions,
    ) -> (Result<RunOutcome>, String) {
        let mut out = Vec::new();
        let result = set_all_keyboards(host, &request, options, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    fn verbose() -> RunOptions {
        RunOptions {
            name_filter: None,
            verbose: true,
        }
    }

    #[test]
    fn manager_failure_touches_no_device() {
        let kb = MockKeyboard::new("K", [0, 0, 0]);
        let host = MockHost {
            devices: vec![kb.clone()],
            fail_open: Some("denied".into()),
            ..Default::default()
        };
        let caps_on = IndicatorRequest::single(Indicator::Caps, LedState::On);
        let (result, out) = run(&host, caps_on, &verbose());
        match result {
            Err(KbledError::HostManagerUnavailable(msg)) => assert_eq!(msg, "denied"),
            other => panic!("expected HostManagerUnavailable, got {other:?}"),
        }
        assert!(out.is_empty());
        assert!(kb.reads().is_empty());
        assert!(kb.writes().is_empty());
    }

    #[test]
    fn filter_failure_aborts_and_releases_manager() {
        let kb = MockKeyboard::new("K", [0, 0, 0]);
        let host = MockHost {
            devices: vec![kb.clone()],
            fail_matching: true,
            ..Default::default()
        };
        let (result, _) = run(&host, IndicatorRequest::none(), &verbose());
        assert!(matches!(result, Err(KbledError::FilterConstructionFailed(_))));
        assert_eq!(host.stats.opened.get(), 1);
        assert_eq!(host.stats.released.get(), 1);
        assert!(kb.reads().is_empty());
    }

    #[test]
    fn query_failure_is_host_error() {
        let host = MockHost {
            fail_copy: true,
            ..Default::default()
        };
        let (result, _) = run(&host, IndicatorRequest::none(), &verbose());
        assert!(matches!(result, Err(KbledError::Host(_))));
        assert_eq!(host.stats.released.get(), 1);
    }

    #[test]
    fn empty_device_set_is_not_an_error() {
        let host = MockHost::new(vec![]);
        let (result, out) = run(&host, IndicatorRequest::none(), &verbose());
        assert_eq!(result.unwrap(), RunOutcome::NoKeyboardsFound);
        assert!(out.is_empty());
        assert_eq!(host.stats.released.get(), 1);
    }

    #[test]
    fn keyboard_matching_installed() {
        let host = MockHost::new(vec![]);
        run(&host, IndicatorRequest::none(), &RunOptions::default()).0.unwrap();
        assert_eq!(
            *host.stats.matching.borrow(),
            Some(DeviceMatching::keyboard())
        );
    }

    #[test]
    fn non_keyboards_skipped_silently() {
        let mouse = MockKeyboard::non_keyboard("LED Mouse");
        let kb = MockKeyboard::new("K", [0, 0, 0]);
        let host = MockHost::new(vec![mouse.clone(), kb.clone()]);
        let num_on = IndicatorRequest::single(Indicator::Num, LedState::On);
        let (result, out) = run(&host, num_on, &verbose());
        let outcome = result.unwrap();
        assert_eq!(outcome.reports().len(), 1);
        assert_eq!(out, " \"K\" +num -caps -scroll\n");
        assert!(mouse.reads().is_empty());
        assert_eq!(kb.writes(), vec![(1, 1)]);
    }

    #[test]
    fn quiet_run_writes_nothing() {
        let kb = MockKeyboard::new("K", [0, 0, 0]);
        let host = MockHost::new(vec![kb.clone()]);
        let (result, out) = run(
            &host,
            IndicatorRequest::single(Indicator::Caps, LedState::On),
            &RunOptions::default(),
        );
        assert!(out.is_empty());
        assert_eq!(result.unwrap().reports()[0].changed_count(), 1);
        assert_eq!(kb.value(2), Some(1));
    }

    #[test]
    fn name_filter_restricts_devices() {
        let apple = MockKeyboard::new("Apple Internal Keyboard", [0, 0, 0]);
        let logi = MockKeyboard::new("Logitech K380", [0, 0, 0]);
        let host = MockHost::new(vec![apple.clone(), logi.clone()]);
        let options = RunOptions {
            name_filter: Some(NameFilter::new("Apple*").unwrap()),
            verbose: true,
        };
        let caps_on = IndicatorRequest::single(Indicator::Caps, LedState::On);
        let (result, out) = run(&host, caps_on, &options);
        assert_eq!(result.unwrap().reports().len(), 1);
        assert_eq!(out, " \"Apple Internal Keyboard\" -num +caps -scroll\n");
        assert_eq!(apple.writes(), vec![(2, 1)]);
        assert!(logi.writes().is_empty());
    }

    #[test]
    fn set_indicator_applies_to_all() {
        let a = MockKeyboard::new("A", [0, 0, 0]);
        let b = MockKeyboard::new("B", [0, 1, 0]);
        let host = MockHost::new(vec![a.clone(), b.clone()]);
        set_indicator(&host, Indicator::Caps, true).unwrap();
        assert_eq!(a.writes(), vec![(2, 1)]);
        assert!(b.writes().is_empty());
    }

    /// Writer whose reader went away.
    struct BrokenPipe {
        attempts: usize,
    }

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            self.attempts += 1;
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn closed_output_still_reconciles_every_keyboard() {
        let a = MockKeyboard::new("A", [0, 0, 0]);
        let b = MockKeyboard::new("B", [0, 0, 0]);
        let host = MockHost::new(vec![a.clone(), b.clone()]);
        let mut out = BrokenPipe { attempts: 0 };
        let caps_on = IndicatorRequest::single(Indicator::Caps, LedState::On);

        let outcome = set_all_keyboards(&host, &caps_on, &verbose(), &mut out).unwrap();

        assert_eq!(outcome.reports().len(), 2);
        assert_eq!(a.writes(), vec![(2, 1)]);
        assert_eq!(b.writes(), vec![(2, 1)]);
        assert_eq!(out.attempts, 1);
    }
}
