//! Host HID access — capability traits + Linux evdev backend.
//!
//! The reconciler never talks to the OS directly. It goes through
//! [`HidHost`] → [`HidManager`] → [`HidDevice`], so tests can substitute the
//! in-memory [`mock`] host. Every handle is an owned value: dropping the
//! manager or the device snapshot releases the underlying OS resources.

use std::fmt;

use crate::filter::{DeviceMatching, ElementMatching, PAGE_LEDS};

// ── Error type ──

/// Host HID errors.
///
/// String payloads follow the convention **"context: details"**, e.g.
/// `"/dev/input: permission denied"`.
#[derive(Debug)]
pub enum HostError {
    /// The host HID manager could not be opened.
    Unavailable(String),
    /// The host cannot express the requested matching criteria.
    Unsupported(String),
    /// Device set query failed.
    Query(String),
    /// Reading an element value failed.
    Read(String),
    /// Writing an element value failed.
    Write(String),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::Unavailable(e) => write!(f, "HID manager unavailable: {e}"),
            HostError::Unsupported(e) => write!(f, "Unsupported matching criteria: {e}"),
            HostError::Query(e) => write!(f, "Device query failed: {e}"),
            HostError::Read(e) => write!(f, "Read failed: {e}"),
            HostError::Write(e) => write!(f, "Write failed: {e}"),
        }
    }
}

impl std::error::Error for HostError {}

impl HostError {
    /// The payload without the variant prefix.
    pub fn detail(&self) -> &str {
        match self {
            HostError::Unavailable(e)
            | HostError::Unsupported(e)
            | HostError::Query(e)
            | HostError::Read(e)
            | HostError::Write(e) => e,
        }
    }
}

pub type Result<T> = std::result::Result<T, HostError>;

// ── Elements ──

/// One HID element of a device (an indicator LED when `usage_page` is the
/// LED page).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element {
    pub usage_page: u32,
    pub usage: u32,
}

impl Element {
    /// An LED-page element. Usage ids: 1 = Num Lock, 2 = Caps Lock,
    /// 3 = Scroll Lock, 4 = Compose, 5 = Kana, ...
    pub fn led(usage: u32) -> Self {
        Element {
            usage_page: PAGE_LEDS,
            usage,
        }
    }

    /// Zero-based indicator index (`usage - 1`). `None` for the undefined
    /// usage 0.
    pub fn indicator_index(&self) -> Option<usize> {
        self.usage.checked_sub(1).map(|i| i as usize)
    }
}

// ── Traits ──

/// Entry point to the host HID subsystem.
pub trait HidHost {
    type Manager: HidManager;

    /// Acquire a manager handle. Released when the returned value is dropped.
    fn open_manager(&self) -> Result<Self::Manager>;
}

/// An open HID manager.
pub trait HidManager {
    type Device: HidDevice;

    /// Install the device matching criteria used by [`copy_devices`](Self::copy_devices).
    fn set_device_matching(&mut self, matching: &DeviceMatching) -> Result<()>;

    /// Snapshot of the devices currently matching. Order is host-defined.
    fn copy_devices(&mut self) -> Result<Vec<Self::Device>>;
}

/// One device from a manager snapshot.
pub trait HidDevice {
    /// Product name, if the device reports one.
    fn display_name(&self) -> Option<String>;

    /// True if the device really advertises `usage_page`/`usage`, independent
    /// of how coarse the manager's matching was.
    fn conforms_to(&self, usage_page: u32, usage: u32) -> bool;

    /// Elements matching `matching`, in host order.
    fn matching_elements(&self, matching: &ElementMatching) -> Vec<Element>;

    fn get_value(&self, element: &Element) -> Result<i32>;

    fn set_value(&mut self, element: &Element, value: i32) -> Result<()>;
}

// ── Linux implementation ──

#[cfg(target_os = "linux")]
mod linux_impl {
    use super::*;
    use std::path::PathBuf;

    use evdev::{Device, EventType, InputEvent, Key, LedType};

    use crate::filter::{PAGE_GENERIC_DESKTOP, USAGE_KEYBOARD};

    const INPUT_DIR: &str = "/dev/input";

    /// Keys every real keyboard has. Used to tell keyboards apart from
    /// power buttons, media remotes and the like that also report EV_KEY.
    const KEYBOARD_KEYS: [Key; 4] = [Key::KEY_A, Key::KEY_Z, Key::KEY_ENTER, Key::KEY_SPACE];

    pub struct EvdevHost;

    pub struct EvdevManager {
        matching: Option<DeviceMatching>,
    }

    pub struct EvdevKeyboard {
        path: PathBuf,
        device: Device,
    }

    impl EvdevKeyboard {
        fn led_code(element: &Element) -> Result<u16> {
            if element.usage_page != PAGE_LEDS {
                return Err(HostError::Unsupported(format!(
                    "element page 0x{:02X}: not an LED",
                    element.usage_page
                )));
            }
            element
                .indicator_index()
                .and_then(|i| u16::try_from(i).ok())
                .ok_or_else(|| HostError::Unsupported(format!("LED usage {}", element.usage)))
        }
    }

    impl HidHost for EvdevHost {
        type Manager = EvdevManager;

        fn open_manager(&self) -> Result<EvdevManager> {
            std::fs::read_dir(INPUT_DIR)
                .map_err(|e| HostError::Unavailable(format!("{INPUT_DIR}: {e}")))?;
            Ok(EvdevManager { matching: None })
        }
    }

    impl HidManager for EvdevManager {
        type Device = EvdevKeyboard;

        fn set_device_matching(&mut self, matching: &DeviceMatching) -> Result<()> {
            // evdev has no usage tables; only the keyboard pair can be expressed.
            if matching.usage_page != PAGE_GENERIC_DESKTOP || matching.usage != USAGE_KEYBOARD {
                return Err(HostError::Unsupported(format!(
                    "usage page 0x{:02X} usage 0x{:02X}",
                    matching.usage_page, matching.usage
                )));
            }
            self.matching = Some(*matching);
            Ok(())
        }

        fn copy_devices(&mut self) -> Result<Vec<EvdevKeyboard>> {
            if self.matching.is_none() {
                return Err(HostError::Query("copy_devices: no matching criteria set".into()));
            }
            let devices: Vec<EvdevKeyboard> = evdev::enumerate()
                .filter(|(_, dev)| {
                    let events = dev.supported_events();
                    events.contains(EventType::KEY) && events.contains(EventType::LED)
                })
                .map(|(path, device)| EvdevKeyboard { path, device })
                .collect();
            log::debug!("evdev: {} candidate device(s) with keys and LEDs", devices.len());
            Ok(devices)
        }
    }

    impl HidDevice for EvdevKeyboard {
        fn display_name(&self) -> Option<String> {
            self.device.name().map(|s| s.to_string())
        }

        fn conforms_to(&self, usage_page: u32, usage: u32) -> bool {
            if usage_page != PAGE_GENERIC_DESKTOP || usage != USAGE_KEYBOARD {
                return false;
            }
            self.device
                .supported_keys()
                .is_some_and(|keys| KEYBOARD_KEYS.iter().all(|k| keys.contains(*k)))
        }

        fn matching_elements(&self, matching: &ElementMatching) -> Vec<Element> {
            if matching.usage_page != PAGE_LEDS {
                return Vec::new();
            }
            self.device
                .supported_leds()
                .map(|leds| leds.iter().map(|led| Element::led(u32::from(led.0) + 1)).collect())
                .unwrap_or_default()
        }

        fn get_value(&self, element: &Element) -> Result<i32> {
            let code = Self::led_code(element)?;
            let state = self
                .device
                .get_led_state()
                .map_err(|e| HostError::Read(format!("{}: {e}", self.path.display())))?;
            Ok(i32::from(state.contains(LedType(code))))
        }

        fn set_value(&mut self, element: &Element, value: i32) -> Result<()> {
            let code = Self::led_code(element)?;
            self.device
                .send_events(&[InputEvent::new(EventType::LED, code, value)])
                .map_err(|e| HostError::Write(format!("{}: {e}", self.path.display())))
        }
    }
}

#[cfg(target_os = "linux")]
pub use linux_impl::{EvdevHost, EvdevKeyboard, EvdevManager};

// ── Stub for unsupported platforms ──

#[cfg(not(target_os = "linux"))]
pub struct StubHost;

#[cfg(not(target_os = "linux"))]
pub struct StubManager;

#[cfg(not(target_os = "linux"))]
pub struct StubDevice;

#[cfg(not(target_os = "linux"))]
impl HidHost for StubHost {
    type Manager = StubManager;

    fn open_manager(&self) -> Result<StubManager> {
        Err(HostError::Unavailable(
            "keyboard LED control is not yet supported on this platform".into(),
        ))
    }
}

#[cfg(not(target_os = "linux"))]
impl HidManager for StubManager {
    type Device = StubDevice;

    fn set_device_matching(&mut self, _matching: &DeviceMatching) -> Result<()> {
        unreachable!()
    }
    fn copy_devices(&mut self) -> Result<Vec<StubDevice>> {
        unreachable!()
    }
}

#[cfg(not(target_os = "linux"))]
impl HidDevice for StubDevice {
    fn display_name(&self) -> Option<String> {
        unreachable!()
    }
    fn conforms_to(&self, _usage_page: u32, _usage: u32) -> bool {
        unreachable!()
    }
    fn matching_elements(&self, _matching: &ElementMatching) -> Vec<Element> {
        unreachable!()
    }
    fn get_value(&self, _element: &Element) -> Result<i32> {
        unreachable!()
    }
    fn set_value(&mut self, _element: &Element, _value: i32) -> Result<()> {
        unreachable!()
    }
}

/// Concrete host type for the current platform.
#[cfg(target_os = "linux")]
pub type PlatformHost = EvdevHost;
#[cfg(not(target_os = "linux"))]
pub type PlatformHost = StubHost;

/// The platform-appropriate host.
pub fn platform_host() -> PlatformHost {
    #[cfg(target_os = "linux")]
    {
        EvdevHost
    }
    #[cfg(not(target_os = "linux"))]
    {
        StubHost
    }
}

// ── Mock host for testing ──

/// In-memory mock host for unit and integration tests.
///
/// Always compiled (zero runtime cost), hidden from public docs.
#[doc(hidden)]
pub mod mock {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::rc::Rc;

    use crate::filter::{PAGE_GENERIC_DESKTOP, USAGE_KEYBOARD};

    /// Shared state behind a [`MockKeyboard`] handle. Every snapshot handed
    /// out by [`MockManager::copy_devices`] points at the same state, so a
    /// test can inspect reads and writes after the run.
    pub struct MockKeyboardState {
        pub name: Option<String>,
        pub keyboard_class: bool,
        pub elements: Vec<Element>,
        /// Current value per LED usage.
        pub values: RefCell<HashMap<u32, i32>>,
        /// Recorded `get_value` calls (usage).
        pub reads: RefCell<Vec<u32>>,
        /// Recorded successful `set_value` calls: (usage, value).
        pub writes: RefCell<Vec<(u32, i32)>>,
        /// Number of `matching_elements` queries.
        pub element_queries: Cell<usize>,
        /// If true, `set_value` returns an error.
        pub fail_write: Cell<bool>,
        /// Usages whose `get_value` returns an error.
        pub fail_read: RefCell<Vec<u32>>,
    }

    #[derive(Clone)]
    pub struct MockKeyboard(Rc<MockKeyboardState>);

    impl MockKeyboard {
        /// A keyboard with Num/Caps/Scroll elements set to `[num, caps, scroll]`.
        pub fn new(name: &str, leds: [i32; 3]) -> Self {
            let elements = (1..=3).map(Element::led).collect();
            let values = (1..=3).zip(leds).collect();
            Self::with_elements(Some(name), elements, values)
        }

        pub fn with_elements(
            name: Option<&str>,
            elements: Vec<Element>,
            values: HashMap<u32, i32>,
        ) -> Self {
            Self::build(name, true, elements, values)
        }

        /// A device that does not advertise the keyboard usage (a mouse with
        /// LEDs, say).
        pub fn non_keyboard(name: &str) -> Self {
            let elements = (1..=3).map(Element::led).collect();
            Self::build(Some(name), false, elements, HashMap::new())
        }

        fn build(
            name: Option<&str>,
            keyboard_class: bool,
            elements: Vec<Element>,
            values: HashMap<u32, i32>,
        ) -> Self {
            MockKeyboard(Rc::new(MockKeyboardState {
                name: name.map(|s| s.to_string()),
                keyboard_class,
                elements,
                values: RefCell::new(values),
                reads: RefCell::new(Vec::new()),
                writes: RefCell::new(Vec::new()),
                element_queries: Cell::new(0),
                fail_write: Cell::new(false),
                fail_read: RefCell::new(Vec::new()),
            }))
        }

        pub fn state(&self) -> &MockKeyboardState {
            &self.0
        }

        /// Current value of the LED with `usage`.
        pub fn value(&self, usage: u32) -> Option<i32> {
            self.0.values.borrow().get(&usage).copied()
        }

        pub fn writes(&self) -> Vec<(u32, i32)> {
            self.0.writes.borrow().clone()
        }

        pub fn reads(&self) -> Vec<u32> {
            self.0.reads.borrow().clone()
        }
    }

    impl HidDevice for MockKeyboard {
        fn display_name(&self) -> Option<String> {
            self.0.name.clone()
        }

        fn conforms_to(&self, usage_page: u32, usage: u32) -> bool {
            self.0.keyboard_class && usage_page == PAGE_GENERIC_DESKTOP && usage == USAGE_KEYBOARD
        }

        fn matching_elements(&self, matching: &ElementMatching) -> Vec<Element> {
            self.0.element_queries.set(self.0.element_queries.get() + 1);
            self.0
                .elements
                .iter()
                .filter(|e| e.usage_page == matching.usage_page)
                .copied()
                .collect()
        }

        fn get_value(&self, element: &Element) -> Result<i32> {
            self.0.reads.borrow_mut().push(element.usage);
            if self.0.fail_read.borrow().contains(&element.usage) {
                return Err(HostError::Read(format!(
                    "mock: read failure injected for usage {}",
                    element.usage
                )));
            }
            Ok(self.value(element.usage).unwrap_or(0))
        }

        fn set_value(&mut self, element: &Element, value: i32) -> Result<()> {
            if self.0.fail_write.get() {
                return Err(HostError::Write("mock: set_value failure injected".into()));
            }
            self.0.writes.borrow_mut().push((element.usage, value));
            self.0.values.borrow_mut().insert(element.usage, value);
            Ok(())
        }
    }

    /// Counters shared between a [`MockHost`] and the managers it opens.
    #[derive(Default)]
    pub struct ManagerStats {
        pub opened: Cell<usize>,
        pub released: Cell<usize>,
        pub matching: RefCell<Option<DeviceMatching>>,
    }

    pub struct MockManager {
        devices: Vec<MockKeyboard>,
        stats: Rc<ManagerStats>,
        fail_matching: bool,
        fail_copy: bool,
    }

    impl Drop for MockManager {
        fn drop(&mut self) {
            self.stats.released.set(self.stats.released.get() + 1);
        }
    }

    impl HidManager for MockManager {
        type Device = MockKeyboard;

        fn set_device_matching(&mut self, matching: &DeviceMatching) -> Result<()> {
            if self.fail_matching {
                return Err(HostError::Unsupported(
                    "mock: matching failure injected".into(),
                ));
            }
            *self.stats.matching.borrow_mut() = Some(*matching);
            Ok(())
        }

        fn copy_devices(&mut self) -> Result<Vec<MockKeyboard>> {
            if self.fail_copy {
                return Err(HostError::Query("mock: copy_devices failure injected".into()));
            }
            Ok(self.devices.clone())
        }
    }

    /// In-memory host. Device order is the order keyboards were added.
    #[derive(Default)]
    pub struct MockHost {
        pub devices: Vec<MockKeyboard>,
        pub stats: Rc<ManagerStats>,
        /// If set, `open_manager` fails with this message.
        pub fail_open: Option<String>,
        pub fail_matching: bool,
        pub fail_copy: bool,
    }

    impl MockHost {
        pub fn new(devices: Vec<MockKeyboard>) -> Self {
            MockHost {
                devices,
                ..Default::default()
            }
        }
    }

    impl HidHost for MockHost {
        type Manager = MockManager;

        fn open_manager(&self) -> Result<MockManager> {
            if let Some(ref msg) = self.fail_open {
                return Err(HostError::Unavailable(msg.clone()));
            }
            self.stats.opened.set(self.stats.opened.get() + 1);
            Ok(MockManager {
                devices: self.devices.clone(),
                stats: Rc::clone(&self.stats),
                fail_matching: self.fail_matching,
                fail_copy: self.fail_copy,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::*;
    use super::*;
    use crate::filter::{PAGE_GENERIC_DESKTOP, USAGE_KEYBOARD};

    #[test]
    fn element_indicator_index() {
        assert_eq!(Element::led(1).indicator_index(), Some(0));
        assert_eq!(Element::led(3).indicator_index(), Some(2));
        assert_eq!(Element::led(5).indicator_index(), Some(4));
        assert_eq!(Element::led(0).indicator_index(), None);
    }

    #[test]
    fn display_host_errors() {
        let e = HostError::Unavailable("/dev/input: denied".into());
        assert_eq!(e.to_string(), "HID manager unavailable: /dev/input: denied");
        let e = HostError::Write("event7: EBADF".into());
        assert_eq!(e.to_string(), "Write failed: event7: EBADF");
    }

    #[test]
    fn mock_manager_released_on_drop() {
        let host = MockHost::new(vec![]);
        {
            let _manager = host.open_manager().unwrap();
            assert_eq!(host.stats.opened.get(), 1);
            assert_eq!(host.stats.released.get(), 0);
        }
        assert_eq!(host.stats.released.get(), 1);
    }

    #[test]
    fn mock_open_failure() {
        let host = MockHost {
            fail_open: Some("no manager".into()),
            ..Default::default()
        };
        assert!(matches!(host.open_manager(), Err(HostError::Unavailable(_))));
        assert_eq!(host.stats.opened.get(), 0);
    }

    #[test]
    fn mock_snapshot_shares_state() {
        let kb = MockKeyboard::new("K", [0, 0, 0]);
        let host = MockHost::new(vec![kb.clone()]);
        let mut manager = host.open_manager().unwrap();
        manager
            .set_device_matching(&DeviceMatching::keyboard())
            .unwrap();
        let mut devices = manager.copy_devices().unwrap();
        devices[0].set_value(&Element::led(2), 1).unwrap();
        assert_eq!(kb.value(2), Some(1));
        assert_eq!(kb.writes(), vec![(2, 1)]);
    }

    #[test]
    fn mock_non_keyboard_does_not_conform() {
        let dev = MockKeyboard::non_keyboard("Mouse");
        assert!(!dev.conforms_to(PAGE_GENERIC_DESKTOP, USAGE_KEYBOARD));
        let kb = MockKeyboard::new("K", [0, 0, 0]);
        assert!(kb.conforms_to(PAGE_GENERIC_DESKTOP, USAGE_KEYBOARD));
        assert!(!kb.conforms_to(PAGE_GENERIC_DESKTOP, 0x02));
    }

    #[test]
    fn mock_matching_elements_filters_page() {
        let mut values = std::collections::HashMap::new();
        values.insert(1, 1);
        let kb = MockKeyboard::with_elements(
            Some("K"),
            vec![
                Element::led(1),
                Element {
                    usage_page: 0x07,
                    usage: 4,
                },
            ],
            values,
        );
        let elems = kb.matching_elements(&ElementMatching::leds());
        assert_eq!(elems, vec![Element::led(1)]);
    }
}
