// Global hotkey using Win32 RegisterHotKey API

use windows::Win32::Foundation::HWND;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    RegisterHotKey, UnregisterHotKey, HOT_KEY_MODIFIERS, MOD_ALT, MOD_CONTROL, MOD_NOREPEAT, VK_B,
};

/// Hotkey IDs (must be unique within the application)
pub const HOTKEY_TOGGLE: i32 = 1;

/// Register Ctrl+Alt+B. Returns false if another application owns it.
pub fn register_all(hwnd: HWND) -> bool {
    let mods = HOT_KEY_MODIFIERS(MOD_CONTROL.0 | MOD_ALT.0 | MOD_NOREPEAT.0);
    unsafe { RegisterHotKey(Some(hwnd), HOTKEY_TOGGLE, mods, VK_B.0 as u32).is_ok() }
}

pub fn unregister_all(hwnd: HWND) {
    unsafe {
        let _ = UnregisterHotKey(Some(hwnd), HOTKEY_TOGGLE);
    }
}
