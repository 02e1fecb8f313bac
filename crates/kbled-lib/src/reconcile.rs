//! Per-device reconciliation — read each indicator, write it only if it
//! differs from the request, record what the device ends up showing.

use crate::filter::{ElementMatching, NameFilter, name_matches};
use crate::hid::HidDevice;
use crate::indicator::{Indicator, IndicatorRequest, LedState};
use crate::report::{Annotation, DeviceReport};

/// Reconcile one keyboard against `request`.
///
/// Returns `None` when the device has no name or the name filter rejects
/// it. Read and write failures only drop the affected indicator from the
/// report.
pub fn reconcile_keyboard<D: HidDevice>(
    device: &mut D,
    elements: &ElementMatching,
    request: &IndicatorRequest,
    name_filter: Option<&NameFilter>,
) -> Option<DeviceReport> {
    let Some(name) = device.display_name() else {
        log::debug!("skipping keyboard without a product name");
        return None;
    };
    if !name_matches(Some(&name), name_filter) {
        log::debug!("\"{name}\": rejected by name filter");
        return None;
    }

    let mut report = DeviceReport::new(name);

    for element in device.matching_elements(elements) {
        let Some(index) = element.indicator_index() else {
            continue;
        };
        // Index >= MAX_LEDS: Compose, Kana, ... are not modeled. Hosts list
        // LEDs in usage order, so nothing after this one is either.
        let Some(indicator) = Indicator::from_index(index) else {
            break;
        };

        let current = match device.get_value(&element) {
            Ok(v) => LedState::from_value(v),
            Err(e) => {
                log::debug!("\"{}\": {indicator}: {e}", report.name);
                continue;
            }
        };

        let wanted = request.get(indicator);
        match wanted.value() {
            Some(value) if wanted != current => match device.set_value(&element, value) {
                Ok(()) => {
                    log::info!(
                        "\"{}\": {indicator} {}",
                        report.name,
                        if value != 0 { "on" } else { "off" }
                    );
                    report.annotations.push(Annotation {
                        indicator,
                        on: value != 0,
                        changed: true,
                    });
                }
                Err(e) => log::debug!("\"{}\": {indicator}: {e}", report.name),
            },
            _ => report.annotations.push(Annotation {
                indicator,
                on: current == LedState::On,
                changed: false,
            }),
        }
    }

    Some(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::Element;
    use crate::hid::mock::MockKeyboard;
    use std::collections::HashMap;

    fn run(kb: &MockKeyboard, request: IndicatorRequest) -> Option<DeviceReport> {
        let mut dev = kb.clone();
        reconcile_keyboard(&mut dev, &ElementMatching::leds(), &request, None)
    }

    #[test]
    fn no_write_when_already_in_requested_state() {
        let kb = MockKeyboard::new("K", [0, 1, 0]);
        let report = run(&kb, IndicatorRequest::single(Indicator::Caps, LedState::On)).unwrap();
        assert!(kb.writes().is_empty());
        assert_eq!(report.changed_count(), 0);
        assert!(report.get(Indicator::Caps).unwrap().on);
    }

    #[test]
    fn every_indicator_and_state_writes_exactly_once() {
        for indicator in Indicator::ALL {
            for (state, value) in [(LedState::Off, 0), (LedState::On, 1)] {
                let mut leds = [0, 0, 0];
                leds[indicator.index()] = 1 - value;
                let kb = MockKeyboard::new("K", leds);

                let report = run(&kb, IndicatorRequest::single(indicator, state)).unwrap();

                let usage = indicator.index() as u32 + 1;
                assert_eq!(kb.writes(), vec![(usage, value)], "{indicator} -> {state:?}");
                assert_eq!(kb.value(usage), Some(value));
                let a = report.get(indicator).unwrap();
                assert!(a.changed);
                assert_eq!(a.state(), state);
            }
        }
    }

    #[test]
    fn read_only_request_reports_current_state() {
        let kb = MockKeyboard::new("K", [1, 0, 1]);
        let report = run(&kb, IndicatorRequest::none()).unwrap();
        assert!(kb.writes().is_empty());
        assert_eq!(kb.reads(), vec![1, 2, 3]);
        let states: Vec<bool> = report.annotations.iter().map(|a| a.on).collect();
        assert_eq!(states, [true, false, true]);
    }

    #[test]
    fn nameless_device_is_skipped() {
        let kb = MockKeyboard::with_elements(None, vec![Element::led(2)], HashMap::new());
        assert!(run(&kb, IndicatorRequest::single(Indicator::Caps, LedState::On)).is_none());
        assert!(kb.reads().is_empty());
        assert_eq!(kb.state().element_queries.get(), 0);
    }

    #[test]
    fn name_filter_rejection_touches_nothing() {
        let kb = MockKeyboard::new("Logitech K380", [0, 0, 0]);
        let filter = NameFilter::new("Apple*").unwrap();
        let mut dev = kb.clone();
        let report = reconcile_keyboard(
            &mut dev,
            &ElementMatching::leds(),
            &IndicatorRequest::single(Indicator::Caps, LedState::On),
            Some(&filter),
        );
        assert!(report.is_none());
        assert!(kb.reads().is_empty());
        assert!(kb.writes().is_empty());
    }

    #[test]
    fn out_of_range_usage_stops_element_scan() {
        let elements = vec![Element::led(1), Element::led(4), Element::led(2)];
        let values = HashMap::from([(1, 0), (2, 0), (4, 0)]);
        let kb = MockKeyboard::with_elements(Some("K"), elements, values);

        let report = run(&kb, IndicatorRequest::single(Indicator::Caps, LedState::On)).unwrap();

        assert_eq!(kb.reads(), vec![1]);
        assert!(kb.writes().is_empty());
        assert_eq!(report.annotations.len(), 1);
    }

    #[test]
    fn undefined_usage_zero_is_skipped() {
        let elements = vec![Element::led(0), Element::led(1)];
        let kb = MockKeyboard::with_elements(Some("K"), elements, HashMap::from([(1, 1)]));
        let report = run(&kb, IndicatorRequest::none()).unwrap();
        assert_eq!(kb.reads(), vec![1]);
        assert_eq!(report.annotations.len(), 1);
    }

    #[test]
    fn write_failure_drops_only_that_annotation() {
        let kb = MockKeyboard::new("K", [0, 0, 0]);
        kb.state().fail_write.set(true);
        let report = run(&kb, IndicatorRequest::single(Indicator::Caps, LedState::On)).unwrap();
        assert!(kb.writes().is_empty());
        assert_eq!(kb.value(2), Some(0));
        let names: Vec<Indicator> = report.annotations.iter().map(|a| a.indicator).collect();
        assert_eq!(names, [Indicator::Num, Indicator::Scroll]);
    }

    #[test]
    fn read_failure_skips_indicator_and_continues() {
        let kb = MockKeyboard::new("K", [1, 0, 0]);
        kb.state().fail_read.borrow_mut().push(1);
        let report = run(&kb, IndicatorRequest::single(Indicator::Num, LedState::Off)).unwrap();
        assert!(kb.writes().is_empty());
        assert_eq!(kb.reads(), vec![1, 2, 3]);
        assert!(report.get(Indicator::Num).is_none());
        assert_eq!(report.annotations.len(), 2);
    }

    #[test]
    fn other_indicators_untouched() {
        let kb = MockKeyboard::new("K", [1, 1, 1]);
        run(&kb, IndicatorRequest::single(Indicator::Scroll, LedState::Off)).unwrap();
        assert_eq!(kb.writes(), vec![(3, 0)]);
        assert_eq!(kb.value(1), Some(1));
        assert_eq!(kb.value(2), Some(1));
    }
}
