// Monitor identity resolution.
//
// Windows hands out a fresh display handle every session, so anything the
// user selects has to be keyed on something that survives reboots and
// monitor reordering. The only hardware data available is the monitor's
// PnP model code, and there is no API that ties a hardware descriptor to a
// live display rectangle. The correlation below is positional and only
// attempted when the descriptor count equals the display count:
//   • descriptors sorted by interface id, displays sorted by X
//   • identical models get `:0`, `:1`, … in left-to-right order
//   • anything else falls back to a bounds-encoded key
// The positional match is a best-effort heuristic. Two monitors whose
// interface ids sort opposite to their X order will swap keys.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::display::{sort_left_to_right, Display, DisplayId, Rect};
use crate::error::Result;

/// Persistent, best-effort identifier for one physical monitor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StableKey(String);

impl StableKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Fallback key used when hardware correlation is not possible.
    pub fn from_bounds(bounds: &Rect) -> Self {
        Self(format!(
            "BOUNDS:{},{},{},{}",
            bounds.x, bounds.y, bounds.width, bounds.height
        ))
    }

    pub fn is_bounds_fallback(&self) -> bool {
        self.0.starts_with("BOUNDS:")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hardware metadata for one connected monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorDescriptor {
    /// Device interface path. Only unique within the current session.
    pub interface_id: String,
    /// PnP hardware id, e.g. `MONITOR\DEL40F4`.
    pub hardware_id: String,
    /// Human readable name; only hashed when the hardware id is unusable.
    pub display_name: String,
}

impl MonitorDescriptor {
    /// The vendor+product part of the hardware id, or a hash of the display
    /// name when the id has no second path segment.
    pub fn base_key(&self) -> String {
        match self
            .hardware_id
            .split(['\\', '/'])
            .nth(1)
            .filter(|segment| !segment.is_empty())
        {
            Some(model) => model.to_string(),
            None => {
                let digest = Sha256::digest(self.display_name.as_bytes());
                format!("UNKNOWN-{}", hex::encode_upper(&digest[..4]))
            }
        }
    }
}

/// PnP hardware id from a monitor device interface path such as
/// `\\?\DISPLAY#DEL40F4#5&2a8c&0&UID4353#{e6f07b5f-...}`. The second `#`
/// field is the model; an empty string is returned when it is missing.
pub fn hardware_id_from_interface_path(path: &str) -> String {
    match path.split('#').nth(1).filter(|model| !model.is_empty()) {
        Some(model) => format!("MONITOR\\{model}"),
        None => String::new(),
    }
}

/// Hardware monitor enumeration, split in two phases so a monitor that
/// disappears mid-enumeration only drops itself.
pub trait DescriptorSource {
    /// Interface ids of every connected monitor.
    fn interface_ids(&mut self) -> Result<Vec<String>>;

    /// Full metadata for one interface id from the last enumeration.
    fn describe(&mut self, interface_id: &str) -> Result<MonitorDescriptor>;
}

pub struct MonitorIdentityResolver {
    source: Box<dyn DescriptorSource>,
    keys: HashMap<DisplayId, StableKey>,
    snapshot: Vec<Display>,
}

impl MonitorIdentityResolver {
    pub fn new(source: Box<dyn DescriptorSource>) -> Self {
        Self {
            source,
            keys: HashMap::new(),
            snapshot: Vec::new(),
        }
    }

    /// Recompute keys for `displays`. Never fails: any enumeration problem
    /// degrades to bounds keys.
    pub fn refresh(&mut self, displays: &[Display]) -> &HashMap<DisplayId, StableKey> {
        let descriptors = self.collect_descriptors();
        self.keys = correlate(descriptors, displays);
        self.snapshot = displays.to_vec();
        &self.keys
    }

    /// Refresh only if `displays` differs from the snapshot the cache was
    /// built for.
    pub fn ensure_current(&mut self, displays: &[Display]) {
        let same = self.snapshot.len() == displays.len()
            && displays.iter().all(|d| {
                self.snapshot
                    .iter()
                    .any(|s| s.id == d.id && s.bounds == d.bounds)
            });
        if !same {
            self.refresh(displays);
        }
    }

    pub fn key_for(&self, display: &Display) -> StableKey {
        self.keys
            .get(&display.id)
            .cloned()
            .unwrap_or_else(|| StableKey::from_bounds(&display.bounds))
    }

    pub fn keys(&self) -> &HashMap<DisplayId, StableKey> {
        &self.keys
    }

    fn collect_descriptors(&mut self) -> Vec<MonitorDescriptor> {
        let ids = match self.source.interface_ids() {
            Ok(ids) => ids,
            Err(e) => {
                warn!("monitor descriptor enumeration failed, using bounds keys: {e}");
                return Vec::new();
            }
        };

        ids.iter()
            .filter_map(|id| match self.source.describe(id) {
                Ok(descriptor) => Some(descriptor),
                Err(e) => {
                    debug!("skipping monitor {id}: {e}");
                    None
                }
            })
            .collect()
    }
}

fn correlate(
    mut descriptors: Vec<MonitorDescriptor>,
    displays: &[Display],
) -> HashMap<DisplayId, StableKey> {
    let mut ordered = displays.to_vec();
    sort_left_to_right(&mut ordered);

    if descriptors.is_empty() || descriptors.len() != displays.len() {
        debug!(
            descriptors = descriptors.len(),
            displays = displays.len(),
            "cannot correlate hardware with displays, using bounds keys"
        );
        return ordered
            .iter()
            .map(|d| (d.id, StableKey::from_bounds(&d.bounds)))
            .collect();
    }

    descriptors.sort_by(|a, b| a.interface_id.cmp(&b.interface_id));
    let bases: Vec<String> = descriptors.iter().map(MonitorDescriptor::base_key).collect();

    let mut totals: HashMap<&str, usize> = HashMap::new();
    for base in &bases {
        *totals.entry(base.as_str()).or_default() += 1;
    }

    let mut next: HashMap<&str, usize> = HashMap::new();
    let mut keys = HashMap::with_capacity(ordered.len());
    for (monitor, base) in ordered.iter().zip(&bases) {
        let key = if totals[base.as_str()] > 1 {
            let n = next.entry(base.as_str()).or_default();
            let key = format!("{base}:{n}");
            *n += 1;
            key
        } else {
            base.clone()
        };
        debug!(display = %monitor.id, key = %key, "resolved monitor identity");
        keys.insert(monitor.id, StableKey(key));
    }
    keys
}
