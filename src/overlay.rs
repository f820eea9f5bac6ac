// Overlay surfaces backed by layered popup windows.
//
// Each surface is a pair of half-height windows (see
// blackout_shared::surface for the Focus Assist reason). Windows are:
//   • layered, with a solid black class brush and LWA_ALPHA opacity
//   • topmost, tool windows (no taskbar or Alt+Tab entry)
//   • non-activating, disabled, and answering WM_MOUSEACTIVATE with
//     MA_NOACTIVATE so a click never takes focus
//   • click-through only while WS_EX_TRANSPARENT is set
//
// Z-order: a WinEvent hook on EVENT_SYSTEM_FOREGROUND re-asserts
// HWND_TOPMOST on every live surface. The hook is owned by the foreground
// watch below and only exists while at least one surface does.

use std::ffi::c_void;
use std::sync::{Mutex, PoisonError};

use blackout_shared::surface::{alpha_from_percent, split_halves};
use blackout_shared::{
    BlackoutError, ForegroundWatch, HookBackend, OverlaySurface, Rect, Result, SurfaceFactory,
};
use windows::core::PCWSTR;
use windows::Win32::Foundation::{GetLastError, COLORREF, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::Graphics::Gdi::CreateSolidBrush;
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Accessibility::{SetWinEventHook, UnhookWinEvent, HWINEVENTHOOK};
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, GetWindowLongW, IsWindow, RegisterClassW,
    SetLayeredWindowAttributes, SetWindowLongW, SetWindowPos, ShowWindow, CS_HREDRAW,
    CS_VREDRAW, GWL_EXSTYLE, HWND_TOPMOST, LWA_ALPHA, SWP_FRAMECHANGED, SWP_NOACTIVATE,
    SWP_NOMOVE, SWP_NOSENDCHANGING, SWP_NOSIZE, SW_HIDE, SW_SHOWNOACTIVATE, WINDOW_EX_STYLE,
    WM_MOUSEACTIVATE, WNDCLASSW, WS_DISABLED, WS_EX_LAYERED, WS_EX_NOACTIVATE,
    WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_EX_TRANSPARENT, WS_POPUP,
};

const CLASS_NAME: &str = "BlackoutOverlay\0";

// WinEvent constants
const EVENT_SYSTEM_FOREGROUND: u32 = 0x0003;
const WINEVENT_OUTOFCONTEXT: u32 = 0x0000;
const WINEVENT_SKIPOWNPROCESS: u32 = 0x0002;

const MA_NOACTIVATE: isize = 3;
const ERROR_CLASS_ALREADY_EXISTS: i32 = 1410;

/// Class atom, 0 until the first surface registers the class. The class and
/// its window procedure stay registered for the rest of the process. Never
/// held across a window call.
static CLASS_ATOM: Mutex<u16> = Mutex::new(0);

static WATCH: ForegroundWatch<WinEventHook, SurfaceHandles> = ForegroundWatch::new(WinEventHook);

/// Raw handles of both halves of one surface, kept as integers so the
/// registry can be shared across threads.
#[derive(Clone, Copy, PartialEq, Eq)]
struct SurfaceHandles([isize; 2]);

fn hwnd(raw: isize) -> HWND {
    HWND(raw as *mut c_void)
}

fn last_error() -> i32 {
    unsafe { GetLastError().0 as i32 }
}

unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if msg == WM_MOUSEACTIVATE {
        return LRESULT(MA_NOACTIVATE);
    }
    DefWindowProcW(hwnd, msg, wparam, lparam)
}

fn register_class() -> Result<()> {
    if *CLASS_ATOM.lock().unwrap_or_else(PoisonError::into_inner) != 0 {
        return Ok(());
    }

    let registered = unsafe {
        let hinstance = GetModuleHandleW(PCWSTR::null())
            .map_err(|e| BlackoutError::platform("GetModuleHandleW", e.code().0))?;
        let class_name: Vec<u16> = CLASS_NAME.encode_utf16().collect();

        let wc = WNDCLASSW {
            style: CS_HREDRAW | CS_VREDRAW,
            lpfnWndProc: Some(window_proc),
            hInstance: hinstance.into(),
            lpszClassName: PCWSTR(class_name.as_ptr()),
            hbrBackground: CreateSolidBrush(COLORREF(0)),
            ..Default::default()
        };
        RegisterClassW(&wc)
    };

    if registered == 0 {
        let code = last_error();
        if code != ERROR_CLASS_ALREADY_EXISTS {
            return Err(BlackoutError::platform("RegisterClassW", code));
        }
    }

    let mut atom = CLASS_ATOM.lock().unwrap_or_else(PoisonError::into_inner);
    if *atom == 0 {
        *atom = registered.max(1);
    }
    Ok(())
}

fn ex_style(click_through: bool) -> WINDOW_EX_STYLE {
    let style = WS_EX_LAYERED | WS_EX_TOPMOST | WS_EX_TOOLWINDOW | WS_EX_NOACTIVATE;
    if click_through {
        style | WS_EX_TRANSPARENT
    } else {
        style
    }
}

/// Re-assert topmost without moving, resizing or activating.
fn reassert_topmost(handles: SurfaceHandles) {
    for raw in handles.0 {
        unsafe {
            let window = hwnd(raw);
            if IsWindow(Some(window)).as_bool() {
                let _ = SetWindowPos(
                    window,
                    Some(HWND_TOPMOST),
                    0,
                    0,
                    0,
                    0,
                    SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE | SWP_NOSENDCHANGING,
                );
            }
        }
    }
}

/// A created window, destroyed when the guard drops.
struct OwnedWindow(isize);

impl OwnedWindow {
    fn create(bounds: Rect, click_through: bool) -> Result<Self> {
        let class_name: Vec<u16> = CLASS_NAME.encode_utf16().collect();
        unsafe {
            let hinstance = GetModuleHandleW(PCWSTR::null())
                .map_err(|e| BlackoutError::platform("GetModuleHandleW", e.code().0))?;
            let window = CreateWindowExW(
                ex_style(click_through),
                PCWSTR(class_name.as_ptr()),
                PCWSTR::null(),
                WS_POPUP | WS_DISABLED,
                bounds.x,
                bounds.y,
                bounds.width,
                bounds.height,
                None,
                None,
                Some(hinstance.into()),
                None,
            )
            .map_err(|e| BlackoutError::platform("CreateWindowExW", e.code().0))?;
            Ok(Self(window.0 as isize))
        }
    }

    fn hwnd(&self) -> HWND {
        hwnd(self.0)
    }
}

impl Drop for OwnedWindow {
    fn drop(&mut self) {
        unsafe {
            let _ = ShowWindow(self.hwnd(), SW_HIDE);
            let _ = DestroyWindow(self.hwnd());
        }
    }
}

pub struct Win32Surface {
    halves: Option<[OwnedWindow; 2]>,
    handles: SurfaceHandles,
}

impl Win32Surface {
    fn each_half(&self, mut f: impl FnMut(HWND)) {
        for half in self.halves.iter().flatten() {
            f(half.hwnd());
        }
    }

    fn apply_alpha(&self, percent: u8) {
        let alpha = alpha_from_percent(percent);
        self.each_half(|window| unsafe {
            let _ = SetLayeredWindowAttributes(window, COLORREF(0), alpha, LWA_ALPHA);
        });
    }

    fn show(&self) {
        self.each_half(|window| unsafe {
            let _ = ShowWindow(window, SW_SHOWNOACTIVATE);
        });
        self.bring_to_front();
    }
}

impl OverlaySurface for Win32Surface {
    fn set_opacity(&mut self, percent: u8) {
        self.apply_alpha(percent);
    }

    fn set_click_through(&mut self, enabled: bool) {
        let transparent = WS_EX_TRANSPARENT.0 as i32;
        self.each_half(|window| unsafe {
            let style = GetWindowLongW(window, GWL_EXSTYLE);
            let style = if enabled {
                style | transparent
            } else {
                style & !transparent
            };
            let _ = SetWindowLongW(window, GWL_EXSTYLE, style);
            let _ = SetWindowPos(
                window,
                Some(HWND_TOPMOST),
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE | SWP_FRAMECHANGED,
            );
        });
    }

    fn bring_to_front(&self) {
        if self.halves.is_some() {
            reassert_topmost(self.handles);
        }
    }

    fn destroy(&mut self) {
        if let Some(halves) = self.halves.take() {
            WATCH.unregister(self.handles);
            drop(halves);
        }
    }
}

impl Drop for Win32Surface {
    fn drop(&mut self) {
        self.destroy();
    }
}

pub struct Win32SurfaceFactory;

impl SurfaceFactory for Win32SurfaceFactory {
    type Surface = Win32Surface;

    fn create(&mut self, bounds: Rect, opacity: u8, click_through: bool) -> Result<Win32Surface> {
        register_class()?;

        let [top, bottom] = split_halves(bounds);
        let halves = [
            OwnedWindow::create(top, click_through)?,
            OwnedWindow::create(bottom, click_through)?,
        ];
        let handles = SurfaceHandles([halves[0].0, halves[1].0]);
        WATCH.register(handles)?;

        let surface = Win32Surface {
            halves: Some(halves),
            handles,
        };
        surface.apply_alpha(opacity);
        surface.show();
        Ok(surface)
    }
}

struct HookHandle(isize);

struct WinEventHook;

impl HookBackend for WinEventHook {
    type Hook = HookHandle;

    fn install(&self) -> Result<HookHandle> {
        let hook = unsafe {
            SetWinEventHook(
                EVENT_SYSTEM_FOREGROUND,
                EVENT_SYSTEM_FOREGROUND,
                None,
                Some(win_event_proc),
                0,
                0,
                WINEVENT_OUTOFCONTEXT | WINEVENT_SKIPOWNPROCESS,
            )
        };
        if hook.is_invalid() {
            return Err(BlackoutError::platform("SetWinEventHook", last_error()));
        }
        Ok(HookHandle(hook.0 as isize))
    }

    fn uninstall(&self, hook: HookHandle) {
        unsafe {
            let _ = UnhookWinEvent(HWINEVENTHOOK(hook.0 as *mut c_void));
        }
    }
}

/// Fired on the UI thread when another process's window takes the
/// foreground.
unsafe extern "system" fn win_event_proc(
    _hook: HWINEVENTHOOK,
    _event: u32,
    _hwnd: HWND,
    _id_object: i32,
    _id_child: i32,
    _id_event_thread: u32,
    _event_time: u32,
) {
    WATCH.notify(reassert_topmost);
}
