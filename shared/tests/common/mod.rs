#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use blackout_shared::{
    AppConfig, BlackoutError, BlackoutService, DescriptorSource, Display, DisplayId,
    DisplayTopology, MonitorDescriptor, OverlaySurface, Rect, Result, Selection, SettingsStore,
    StableKey, SurfaceFactory,
};

pub fn display(id: isize, x: i32, primary: bool) -> Display {
    Display {
        id: DisplayId(id),
        bounds: Rect::new(x, 0, 1920, 1080),
        is_primary: primary,
    }
}

pub fn monitor(interface_id: &str, model: &str) -> MonitorDescriptor {
    MonitorDescriptor {
        interface_id: interface_id.into(),
        hardware_id: format!("MONITOR\\{model}"),
        display_name: "Generic PnP Monitor".into(),
    }
}

pub fn keys(keys: &[&str]) -> Selection {
    Some(keys.iter().map(|k| StableKey::new(*k)).collect::<BTreeSet<_>>())
}

#[derive(Clone, Default)]
pub struct FakeTopology {
    pub displays: Rc<RefCell<Vec<Display>>>,
}

impl FakeTopology {
    pub fn new(displays: Vec<Display>) -> Self {
        Self {
            displays: Rc::new(RefCell::new(displays)),
        }
    }

    pub fn set(&self, displays: Vec<Display>) {
        *self.displays.borrow_mut() = displays;
    }
}

impl DisplayTopology for FakeTopology {
    fn list_displays(&self) -> Vec<Display> {
        self.displays.borrow().clone()
    }
}

#[derive(Default)]
pub struct Hardware {
    pub monitors: Vec<MonitorDescriptor>,
    pub enumeration_fails: bool,
    pub unreadable: Vec<String>,
    pub enumerations: usize,
}

#[derive(Clone, Default)]
pub struct FakeDescriptors {
    pub hardware: Rc<RefCell<Hardware>>,
}

impl FakeDescriptors {
    pub fn new(monitors: Vec<MonitorDescriptor>) -> Self {
        let hardware = Hardware {
            monitors,
            ..Default::default()
        };
        Self {
            hardware: Rc::new(RefCell::new(hardware)),
        }
    }
}

impl DescriptorSource for FakeDescriptors {
    fn interface_ids(&mut self) -> Result<Vec<String>> {
        let mut hardware = self.hardware.borrow_mut();
        hardware.enumerations += 1;
        if hardware.enumeration_fails {
            return Err(BlackoutError::Enumeration("device query failed".into()));
        }
        Ok(hardware
            .monitors
            .iter()
            .map(|m| m.interface_id.clone())
            .collect())
    }

    fn describe(&mut self, interface_id: &str) -> Result<MonitorDescriptor> {
        let hardware = self.hardware.borrow();
        if hardware.unreadable.iter().any(|id| id == interface_id) {
            return Err(BlackoutError::Enumeration(format!("{interface_id} vanished")));
        }
        hardware
            .monitors
            .iter()
            .find(|m| m.interface_id == interface_id)
            .cloned()
            .ok_or_else(|| BlackoutError::Enumeration(format!("{interface_id} unknown")))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Created { serial: usize, bounds: Rect },
    Destroyed(usize),
    Opacity(usize, u8),
    ClickThrough(usize, bool),
}

#[derive(Default)]
pub struct Journal {
    pub events: Vec<Event>,
    pub next_serial: usize,
    pub fail_on_create: Option<usize>,
    pub creates_attempted: usize,
}

impl Journal {
    pub fn created(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::Created { .. }))
            .count()
    }

    pub fn destroyed(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::Destroyed(_)))
            .count()
    }
}

#[derive(Clone, Default)]
pub struct FakeFactory {
    pub journal: Rc<RefCell<Journal>>,
}

pub struct FakeSurface {
    pub serial: usize,
    journal: Rc<RefCell<Journal>>,
    destroyed: bool,
}

impl OverlaySurface for FakeSurface {
    fn set_opacity(&mut self, percent: u8) {
        self.journal
            .borrow_mut()
            .events
            .push(Event::Opacity(self.serial, percent));
    }

    fn set_click_through(&mut self, enabled: bool) {
        self.journal
            .borrow_mut()
            .events
            .push(Event::ClickThrough(self.serial, enabled));
    }

    fn bring_to_front(&self) {}

    fn destroy(&mut self) {
        if !self.destroyed {
            self.destroyed = true;
            self.journal
                .borrow_mut()
                .events
                .push(Event::Destroyed(self.serial));
        }
    }
}

impl SurfaceFactory for FakeFactory {
    type Surface = FakeSurface;

    fn create(&mut self, bounds: Rect, _opacity: u8, _click_through: bool) -> Result<FakeSurface> {
        let mut journal = self.journal.borrow_mut();
        journal.creates_attempted += 1;
        if journal.fail_on_create == Some(journal.creates_attempted) {
            return Err(BlackoutError::platform("CreateWindowExW", 0x8007_0008_u32 as i32));
        }
        let serial = journal.next_serial;
        journal.next_serial += 1;
        journal.events.push(Event::Created { serial, bounds });
        Ok(FakeSurface {
            serial,
            journal: self.journal.clone(),
            destroyed: false,
        })
    }
}

#[derive(Clone, Default)]
pub struct MemorySettings {
    pub config: Rc<RefCell<AppConfig>>,
}

impl SettingsStore for MemorySettings {
    fn load_selection(&self) -> Selection {
        self.config.borrow().selected_monitors.clone()
    }

    fn save_selection(&mut self, selection: &Selection) {
        self.config.borrow_mut().selected_monitors = selection.clone();
    }

    fn load_opacity(&self) -> i32 {
        i32::from(self.config.borrow().opacity)
    }

    fn save_opacity(&mut self, percent: i32) {
        self.config.borrow_mut().opacity = percent as u8;
    }

    fn load_click_through(&self) -> bool {
        self.config.borrow().click_through
    }

    fn save_click_through(&mut self, enabled: bool) {
        self.config.borrow_mut().click_through = enabled;
    }
}

pub struct Harness {
    pub service: BlackoutService<FakeFactory>,
    pub topology: FakeTopology,
    pub hardware: FakeDescriptors,
    pub factory: FakeFactory,
    pub settings: MemorySettings,
    pub transitions: Rc<RefCell<Vec<bool>>>,
}

impl Harness {
    pub fn new(displays: Vec<Display>, monitors: Vec<MonitorDescriptor>) -> Self {
        Self::with_settings(displays, monitors, MemorySettings::default())
    }

    pub fn with_settings(
        displays: Vec<Display>,
        monitors: Vec<MonitorDescriptor>,
        settings: MemorySettings,
    ) -> Self {
        let topology = FakeTopology::new(displays);
        let hardware = FakeDescriptors::new(monitors);
        let factory = FakeFactory::default();
        let mut service = BlackoutService::new(
            Box::new(topology.clone()),
            Box::new(hardware.clone()),
            factory.clone(),
            Box::new(settings.clone()),
        );
        let transitions = Rc::new(RefCell::new(Vec::new()));
        let sink = transitions.clone();
        service.on_state_changed(move |state| sink.borrow_mut().push(state));
        Self {
            service,
            topology,
            hardware,
            factory,
            settings,
            transitions,
        }
    }

    pub fn journal(&self) -> std::cell::Ref<'_, Journal> {
        self.factory.journal.borrow()
    }

    pub fn events_since(&self, mark: usize) -> Vec<Event> {
        self.journal().events[mark..].to_vec()
    }

    pub fn mark(&self) -> usize {
        self.journal().events.len()
    }
}
