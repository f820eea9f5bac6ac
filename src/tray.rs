// System tray icon with a context menu doubling as the monitor picker

use windows::core::PCWSTR;
use windows::Win32::Foundation::{HWND, POINT};
use windows::Win32::UI::Shell::{
    Shell_NotifyIconW, NIF_ICON, NIF_MESSAGE, NIF_TIP, NIM_ADD, NIM_DELETE, NIM_MODIFY,
    NOTIFYICONDATAW,
};
use windows::Win32::UI::WindowsAndMessaging::{
    AppendMenuW, CreatePopupMenu, DestroyMenu, GetCursorPos, LoadIconW, SetForegroundWindow,
    TrackPopupMenu, HMENU, IDI_APPLICATION, MF_CHECKED, MF_SEPARATOR, MF_STRING,
    TPM_BOTTOMALIGN, TPM_LEFTALIGN,
};

/// Custom message ID for tray icon callbacks
pub const WM_TRAY_ICON: u32 = 0x0401; // WM_USER + 1

/// Menu item IDs
pub const IDM_TOGGLE: u32 = 1001;
pub const IDM_DEFAULT_SELECTION: u32 = 1002;
pub const IDM_CLICK_THROUGH: u32 = 1003;
pub const IDM_QUIT: u32 = 1004;
const IDM_OPACITY_BASE: u32 = 1100;
const IDM_MONITOR_BASE: u32 = 1200;

pub const OPACITY_PRESETS: [u8; 4] = [100, 90, 75, 50];

/// Snapshot of service state the menu is drawn from.
pub struct MenuModel {
    pub blacked_out: bool,
    pub monitors: Vec<(String, bool)>,
    pub default_selection: bool,
    pub click_through: bool,
    pub opacity: u8,
}

pub fn opacity_preset(id: u32) -> Option<u8> {
    let index = id.checked_sub(IDM_OPACITY_BASE)? as usize;
    OPACITY_PRESETS.get(index).copied()
}

pub fn monitor_index(id: u32) -> Option<usize> {
    id.checked_sub(IDM_MONITOR_BASE).map(|index| index as usize)
}

fn wide_str(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn set_tip(nid: &mut NOTIFYICONDATAW, text: &str) {
    let tip = wide_str(text);
    let len = tip.len().min(nid.szTip.len());
    nid.szTip[..len].copy_from_slice(&tip[..len]);
}

fn tip_for(blacked_out: bool) -> &'static str {
    if blacked_out {
        "Blackout (active)"
    } else {
        "Blackout"
    }
}

/// Add the system tray icon
pub fn add_tray_icon(hwnd: HWND) -> bool {
    unsafe {
        let mut nid = NOTIFYICONDATAW {
            cbSize: std::mem::size_of::<NOTIFYICONDATAW>() as u32,
            hWnd: hwnd,
            uID: 1,
            uFlags: NIF_ICON | NIF_MESSAGE | NIF_TIP,
            uCallbackMessage: WM_TRAY_ICON,
            ..Default::default()
        };

        if let Ok(icon) = LoadIconW(None, IDI_APPLICATION) {
            nid.hIcon = icon;
        }
        set_tip(&mut nid, tip_for(false));

        Shell_NotifyIconW(NIM_ADD, &nid).as_bool()
    }
}

/// Reflect the blackout state in the tooltip
pub fn set_state(hwnd: HWND, blacked_out: bool) {
    let mut nid = NOTIFYICONDATAW {
        cbSize: std::mem::size_of::<NOTIFYICONDATAW>() as u32,
        hWnd: hwnd,
        uID: 1,
        uFlags: NIF_TIP,
        ..Default::default()
    };
    set_tip(&mut nid, tip_for(blacked_out));
    unsafe {
        let _ = Shell_NotifyIconW(NIM_MODIFY, &nid);
    }
}

/// Remove the system tray icon
pub fn remove_tray_icon(hwnd: HWND) {
    unsafe {
        let nid = NOTIFYICONDATAW {
            cbSize: std::mem::size_of::<NOTIFYICONDATAW>() as u32,
            hWnd: hwnd,
            uID: 1,
            ..Default::default()
        };
        let _ = Shell_NotifyIconW(NIM_DELETE, &nid);
    }
}

fn append(menu: HMENU, id: u32, text: &str, checked: bool) {
    let text = wide_str(text);
    let flags = if checked {
        MF_STRING | MF_CHECKED
    } else {
        MF_STRING
    };
    unsafe {
        let _ = AppendMenuW(menu, flags, id as usize, PCWSTR(text.as_ptr()));
    }
}

fn separator(menu: HMENU) {
    unsafe {
        let _ = AppendMenuW(menu, MF_SEPARATOR, 0, PCWSTR::null());
    }
}

/// Show the tray context menu. The chosen item arrives as WM_COMMAND.
pub fn show_context_menu(hwnd: HWND, model: &MenuModel) {
    unsafe {
        let Ok(menu) = CreatePopupMenu() else {
            return;
        };

        let toggle = if model.blacked_out {
            "Restore displays"
        } else {
            "Black out displays"
        };
        append(menu, IDM_TOGGLE, toggle, false);
        separator(menu);

        for (index, (label, selected)) in model.monitors.iter().enumerate() {
            append(menu, IDM_MONITOR_BASE + index as u32, label, *selected);
        }
        append(
            menu,
            IDM_DEFAULT_SELECTION,
            "All non-primary displays (default)",
            model.default_selection,
        );
        separator(menu);

        append(menu, IDM_CLICK_THROUGH, "Click-through", model.click_through);
        for (index, percent) in OPACITY_PRESETS.iter().enumerate() {
            append(
                menu,
                IDM_OPACITY_BASE + index as u32,
                &format!("Opacity {percent}%"),
                *percent == model.opacity,
            );
        }
        separator(menu);
        append(menu, IDM_QUIT, "Quit", false);

        let mut pt = POINT::default();
        let _ = GetCursorPos(&mut pt);

        // Required for TrackPopupMenu to work correctly with tray icons
        let _ = SetForegroundWindow(hwnd);

        let _ = TrackPopupMenu(
            menu,
            TPM_LEFTALIGN | TPM_BOTTOMALIGN,
            pt.x,
            pt.y,
            Some(0),
            hwnd,
            None,
        );

        let _ = DestroyMenu(menu);
    }
}
