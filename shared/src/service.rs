// Blackout service: owns the desired selection and every overlay surface,
// and reconciles the two against the live display topology.
//
// Invariant: at most one overlay per live display id. Every path that
// creates a surface first checks `overlays`, and every path that finds a
// display gone or deselected destroys its entry.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{debug, info};

use crate::config::{Selection, SettingsStore};
use crate::display::{sort_left_to_right, Display, DisplayId, DisplayTopology, Rect};
use crate::error::Result;
use crate::identity::{DescriptorSource, MonitorIdentityResolver, StableKey};
use crate::surface::{OverlaySurface, SurfaceFactory};

struct OverlayEntry<S> {
    bounds: Rect,
    surface: S,
}

/// One display as presented to a monitor picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorStatus {
    pub display: Display,
    pub key: StableKey,
    pub selected: bool,
}

type StateListener = Box<dyn FnMut(bool)>;

pub struct BlackoutService<F: SurfaceFactory> {
    topology: Box<dyn DisplayTopology>,
    resolver: MonitorIdentityResolver,
    settings: Box<dyn SettingsStore>,
    factory: F,
    selection: Selection,
    opacity: u8,
    click_through: bool,
    blacked_out: bool,
    overlays: BTreeMap<DisplayId, OverlayEntry<F::Surface>>,
    listeners: Vec<StateListener>,
}

impl<F: SurfaceFactory> BlackoutService<F> {
    pub fn new(
        topology: Box<dyn DisplayTopology>,
        descriptors: Box<dyn DescriptorSource>,
        factory: F,
        settings: Box<dyn SettingsStore>,
    ) -> Self {
        let mut resolver = MonitorIdentityResolver::new(descriptors);
        resolver.refresh(&topology.list_displays());

        let selection = settings.load_selection();
        let opacity = settings.load_opacity().clamp(0, 100) as u8;
        let click_through = settings.load_click_through();

        Self {
            topology,
            resolver,
            settings,
            factory,
            selection,
            opacity,
            click_through,
            blacked_out: false,
            overlays: BTreeMap::new(),
            listeners: Vec::new(),
        }
    }

    pub fn on_state_changed(&mut self, listener: impl FnMut(bool) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn is_blacked_out(&self) -> bool {
        self.blacked_out
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn opacity(&self) -> u8 {
        self.opacity
    }

    pub fn click_through(&self) -> bool {
        self.click_through
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    pub fn covered_displays(&self) -> Vec<DisplayId> {
        self.overlays.keys().copied().collect()
    }

    pub fn identity_keys(&self) -> &HashMap<DisplayId, StableKey> {
        self.resolver.keys()
    }

    /// Re-enumerate monitor hardware even if the topology looks unchanged.
    pub fn refresh_identities(&mut self) {
        let displays = self.topology.list_displays();
        self.resolver.refresh(&displays);
    }

    /// Live displays with their keys and whether each one is selected.
    pub fn monitors(&mut self) -> Vec<MonitorStatus> {
        let (displays, primary) = self.snapshot();
        displays
            .into_iter()
            .map(|display| {
                let key = self.resolver.key_for(&display);
                let selected = self.should_black_out(&display, &key, primary);
                MonitorStatus {
                    display,
                    key,
                    selected,
                }
            })
            .collect()
    }

    pub fn toggle(&mut self) -> Result<()> {
        if self.blacked_out {
            self.restore();
            Ok(())
        } else {
            self.black_out()
        }
    }

    /// Cover every display the selection asks for. On a creation failure
    /// the overlays made so far stay up and the error is returned; the
    /// state only becomes blacked out if at least one overlay exists.
    pub fn black_out(&mut self) -> Result<()> {
        if self.blacked_out {
            return Ok(());
        }

        let result = self.reconcile();
        if result.is_ok() || !self.overlays.is_empty() {
            self.blacked_out = true;
            info!(overlays = self.overlays.len(), "blacked out");
            self.notify();
        }
        result
    }

    pub fn restore(&mut self) {
        if !self.blacked_out {
            return;
        }
        self.destroy_all();
        self.blacked_out = false;
        info!("restored");
        self.notify();
    }

    /// Re-diff against the current topology, e.g. after a display change.
    pub fn refresh(&mut self) -> Result<()> {
        if !self.blacked_out {
            return Ok(());
        }
        self.reconcile()
    }

    pub fn update_selected_monitors(&mut self, selection: Selection) -> Result<()> {
        self.settings.save_selection(&selection);
        self.selection = selection;
        if !self.blacked_out {
            return Ok(());
        }
        self.reconcile()
    }

    /// Flip one monitor in the selection. A default (absent) selection is
    /// first made explicit as the current non-primary displays.
    pub fn toggle_monitor(&mut self, key: &StableKey) -> Result<()> {
        let mut keys: BTreeSet<StableKey> = match self.selection.clone() {
            Some(keys) => keys,
            None => self
                .monitors()
                .into_iter()
                .filter(|m| m.selected)
                .map(|m| m.key)
                .collect(),
        };
        if !keys.remove(key) {
            keys.insert(key.clone());
        }
        self.update_selected_monitors(Some(keys))
    }

    pub fn update_opacity(&mut self, percent: i32) {
        let percent = percent.clamp(0, 100);
        self.settings.save_opacity(percent);
        self.opacity = percent as u8;
        for entry in self.overlays.values_mut() {
            entry.surface.set_opacity(self.opacity);
        }
    }

    pub fn update_click_through(&mut self, enabled: bool) {
        self.settings.save_click_through(enabled);
        self.click_through = enabled;
        for entry in self.overlays.values_mut() {
            entry.surface.set_click_through(enabled);
        }
    }

    /// Restore all displays. Called once at process exit; `Drop` covers the
    /// case where it never runs.
    pub fn shutdown(&mut self) {
        self.restore();
        self.destroy_all();
    }

    fn snapshot(&mut self) -> (Vec<Display>, Option<DisplayId>) {
        let mut displays = self.topology.list_displays();
        sort_left_to_right(&mut displays);
        let primary = self.topology.primary_display_id();
        self.resolver.ensure_current(&displays);
        (displays, primary)
    }

    fn should_black_out(
        &self,
        display: &Display,
        key: &StableKey,
        primary: Option<DisplayId>,
    ) -> bool {
        match &self.selection {
            Some(keys) => keys.contains(key),
            None => Some(display.id) != primary,
        }
    }

    fn reconcile(&mut self) -> Result<()> {
        let (displays, primary) = self.snapshot();

        let wanted: Vec<&Display> = displays
            .iter()
            .filter(|d| {
                let key = self.resolver.key_for(d);
                self.should_black_out(d, &key, primary)
            })
            .collect();

        let stale: Vec<DisplayId> = self
            .overlays
            .iter()
            .filter(|(id, entry)| {
                !wanted
                    .iter()
                    .any(|d| d.id == **id && d.bounds == entry.bounds)
            })
            .map(|(id, _)| *id)
            .collect();
        for id in stale {
            if let Some(mut entry) = self.overlays.remove(&id) {
                debug!(display = %id, "removing overlay");
                entry.surface.destroy();
            }
        }

        for display in wanted {
            if self.overlays.contains_key(&display.id) {
                continue;
            }
            let (id, bounds) = (display.id, display.bounds);
            let surface = self
                .factory
                .create(bounds, self.opacity, self.click_through)?;
            debug!(display = %id, bounds = ?bounds, "created overlay");
            self.overlays.insert(id, OverlayEntry { bounds, surface });
        }
        Ok(())
    }

    fn destroy_all(&mut self) {
        for (_, mut entry) in std::mem::take(&mut self.overlays) {
            entry.surface.destroy();
        }
    }

    fn notify(&mut self) {
        let state = self.blacked_out;
        for listener in &mut self.listeners {
            listener(state);
        }
    }
}

impl<F: SurfaceFactory> Drop for BlackoutService<F> {
    fn drop(&mut self) {
        self.destroy_all();
    }
}
