// Live display topology via EnumDisplayMonitors.

use blackout_shared::{Display, DisplayId, DisplayTopology, Rect};
use windows::Win32::Foundation::{LPARAM, RECT};
use windows::Win32::Graphics::Gdi::{
    EnumDisplayMonitors, GetMonitorInfoW, HDC, HMONITOR, MONITORINFO,
};

const MONITORINFOF_PRIMARY: u32 = 0x0000_0001;

pub struct Win32Topology;

impl DisplayTopology for Win32Topology {
    fn list_displays(&self) -> Vec<Display> {
        let mut displays: Vec<Display> = Vec::new();
        unsafe {
            let _ = EnumDisplayMonitors(
                None,
                None,
                Some(collect_display),
                LPARAM(&mut displays as *mut Vec<Display> as isize),
            );
        }
        displays
    }
}

/// Callback for `EnumDisplayMonitors` that records each monitor's full
/// rectangle (`rcMonitor`, taskbar included).
unsafe extern "system" fn collect_display(
    hmonitor: HMONITOR,
    _hdc: HDC,
    _rect: *mut RECT,
    lparam: LPARAM,
) -> windows::core::BOOL {
    let displays = &mut *(lparam.0 as *mut Vec<Display>);

    let mut info = MONITORINFO {
        cbSize: std::mem::size_of::<MONITORINFO>() as u32,
        ..Default::default()
    };
    if GetMonitorInfoW(hmonitor, &mut info).as_bool() {
        let rc = info.rcMonitor;
        displays.push(Display {
            id: DisplayId(hmonitor.0 as isize),
            bounds: Rect::new(rc.left, rc.top, rc.right - rc.left, rc.bottom - rc.top),
            is_primary: info.dwFlags & MONITORINFOF_PRIMARY != 0,
        });
    }

    windows::core::BOOL::from(true)
}
