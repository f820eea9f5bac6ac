// Hardware monitor descriptors via EnumDisplayDevicesW.
//
// Adapters are walked first (`\\.\DISPLAY1`, ...), then the monitors on
// each attached adapter with EDD_GET_DEVICE_INTERFACE_NAME so DeviceID holds
// the device interface path instead of the registry-style id.

use blackout_shared::identity::hardware_id_from_interface_path;
use blackout_shared::{BlackoutError, DescriptorSource, MonitorDescriptor, Result};
use tracing::debug;
use windows::core::PCWSTR;
use windows::Win32::Graphics::Gdi::{
    EnumDisplayDevicesW, DISPLAY_DEVICEW, DISPLAY_DEVICE_ACTIVE, DISPLAY_DEVICE_ATTACHED_TO_DESKTOP,
};

const EDD_GET_DEVICE_INTERFACE_NAME: u32 = 0x0000_0001;

/// One monitor as seen during the last enumeration. `device_path` is empty
/// when the driver did not report an interface path.
struct RawMonitor {
    interface_id: String,
    device_path: String,
    name: String,
}

#[derive(Default)]
pub struct Win32Descriptors {
    last: Vec<RawMonitor>,
}

fn from_wide(buf: &[u16]) -> String {
    let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..len])
}

fn blank_device() -> DISPLAY_DEVICEW {
    DISPLAY_DEVICEW {
        cb: std::mem::size_of::<DISPLAY_DEVICEW>() as u32,
        ..Default::default()
    }
}

fn enumerate_monitors() -> Result<Vec<RawMonitor>> {
    let mut monitors = Vec::new();
    let mut adapter_index = 0;

    loop {
        let mut adapter = blank_device();
        let found =
            unsafe { EnumDisplayDevicesW(PCWSTR::null(), adapter_index, &mut adapter, 0) };
        if !found.as_bool() {
            break;
        }
        adapter_index += 1;

        if !adapter.StateFlags.contains(DISPLAY_DEVICE_ATTACHED_TO_DESKTOP) {
            continue;
        }

        let adapter_name: Vec<u16> = adapter
            .DeviceName
            .iter()
            .copied()
            .take_while(|&c| c != 0)
            .chain(std::iter::once(0))
            .collect();

        let mut monitor_index = 0;
        loop {
            let mut monitor = blank_device();
            let found = unsafe {
                EnumDisplayDevicesW(
                    PCWSTR(adapter_name.as_ptr()),
                    monitor_index,
                    &mut monitor,
                    EDD_GET_DEVICE_INTERFACE_NAME,
                )
            };
            if !found.as_bool() {
                break;
            }
            monitor_index += 1;

            if !monitor.StateFlags.contains(DISPLAY_DEVICE_ACTIVE) {
                continue;
            }

            let device_path = from_wide(&monitor.DeviceID);
            let interface_id = if device_path.is_empty() {
                from_wide(&monitor.DeviceName)
            } else {
                device_path.clone()
            };
            monitors.push(RawMonitor {
                interface_id,
                device_path,
                name: from_wide(&monitor.DeviceString),
            });
        }
    }

    if adapter_index == 0 {
        return Err(BlackoutError::Enumeration(
            "EnumDisplayDevicesW reported no display adapters".into(),
        ));
    }
    debug!(monitors = monitors.len(), "enumerated monitor devices");
    Ok(monitors)
}

impl DescriptorSource for Win32Descriptors {
    fn interface_ids(&mut self) -> Result<Vec<String>> {
        self.last = enumerate_monitors()?;
        Ok(self.last.iter().map(|m| m.interface_id.clone()).collect())
    }

    fn describe(&mut self, interface_id: &str) -> Result<MonitorDescriptor> {
        let monitor = self
            .last
            .iter()
            .find(|m| m.interface_id == interface_id)
            .ok_or_else(|| BlackoutError::Enumeration(format!("{interface_id} disappeared")))?;

        if monitor.device_path.is_empty() {
            return Err(BlackoutError::Enumeration(format!(
                "{interface_id} has no device interface path"
            )));
        }

        Ok(MonitorDescriptor {
            interface_id: monitor.interface_id.clone(),
            hardware_id: hardware_id_from_interface_path(&monitor.device_path),
            display_name: monitor.name.clone(),
        })
    }
}
