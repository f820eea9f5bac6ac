// Tray application: a hidden control window owns the hotkey, the tray icon
// and display-change notifications, and drives the blackout service from
// its window procedure.

use std::cell::RefCell;

use blackout_shared::config::{config_dir, config_path, load_config};
use blackout_shared::{
    BlackoutError, BlackoutService, JsonSettingsStore, MonitorStatus, Result, StableKey,
};
use tracing::{debug, error, info, warn};
use windows::core::PCWSTR;
use windows::Win32::Foundation::{GetLastError, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::Threading::{CreateMutexW, OpenMutexW, SYNCHRONIZATION_ACCESS_RIGHTS};
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetMessageW,
    PostQuitMessage, RegisterClassW, TranslateMessage, MSG, WINDOW_EX_STYLE, WM_COMMAND,
    WM_DESTROY, WM_DISPLAYCHANGE, WM_HOTKEY, WM_LBUTTONUP, WM_RBUTTONUP, WNDCLASSW,
    WS_OVERLAPPED,
};

use crate::descriptors::Win32Descriptors;
use crate::displays::Win32Topology;
use crate::overlay::Win32SurfaceFactory;
use crate::tray::{self, MenuModel};
use crate::{hotkeys, logging};

const CLASS_NAME: &str = "BlackoutControlWnd\0";
const SINGLE_INSTANCE_MUTEX: &str = "BlackoutSingleInstanceMutex\0";

struct App {
    service: BlackoutService<Win32SurfaceFactory>,
    /// Keys behind the monitor items of the last menu shown, by position.
    menu_monitors: Vec<StableKey>,
}

thread_local! {
    static APP: RefCell<Option<App>> = const { RefCell::new(None) };
}

/// Run `f` against the app state. Messages dispatched while the state is
/// already borrowed are dropped.
fn with_app<R>(f: impl FnOnce(&mut App) -> R) -> Option<R> {
    APP.with(|cell| match cell.try_borrow_mut() {
        Ok(mut app) => app.as_mut().map(f),
        Err(_) => {
            debug!("re-entrant message ignored");
            None
        }
    })
}

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn report(action: &str, result: Result<()>) {
    if let Err(e) = result {
        error!("{action} failed: {e}");
    }
}

pub fn run() -> Result<()> {
    if is_already_running() {
        return Ok(());
    }

    let path = config_path();
    let debug_logging = load_config(&path)
        .map(|config| config.debug_logging)
        .unwrap_or_default();
    let _log_guard = logging::init(debug_logging, &config_dir());
    info!("starting blackout v{}", env!("CARGO_PKG_VERSION"));

    let settings = JsonSettingsStore::open(path);
    let hwnd = create_control_window()?;

    let mut service = BlackoutService::new(
        Box::new(Win32Topology),
        Box::new(Win32Descriptors::default()),
        Win32SurfaceFactory,
        Box::new(settings),
    );
    service.on_state_changed(move |blacked_out| tray::set_state(hwnd, blacked_out));

    APP.with(|cell| {
        *cell.borrow_mut() = Some(App {
            service,
            menu_monitors: Vec::new(),
        })
    });

    if !tray::add_tray_icon(hwnd) {
        warn!("could not add the tray icon");
    }
    if !hotkeys::register_all(hwnd) {
        warn!("Ctrl+Alt+B is already registered by another application");
    }

    // Win32 message loop
    unsafe {
        let mut msg = MSG::default();
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }

    if let Some(mut app) = APP.with(|cell| cell.borrow_mut().take()) {
        app.service.shutdown();
    }
    info!("blackout stopped");
    Ok(())
}

/// Check if another instance is already running
fn is_already_running() -> bool {
    let name = wide(SINGLE_INSTANCE_MUTEX);

    unsafe {
        let existing = OpenMutexW(
            SYNCHRONIZATION_ACCESS_RIGHTS(0x001F0001), // MUTEX_ALL_ACCESS
            false,
            PCWSTR(name.as_ptr()),
        );
        if existing.is_ok() {
            return true;
        }

        // Held for the lifetime of the process
        let _ = CreateMutexW(None, true, PCWSTR(name.as_ptr()));
        false
    }
}

/// Hidden top-level window. It is never shown, but unlike a message-only
/// window it receives the WM_DISPLAYCHANGE broadcast.
fn create_control_window() -> Result<HWND> {
    let class_name = wide(CLASS_NAME);
    let title = wide("Blackout");

    unsafe {
        let hinstance = GetModuleHandleW(PCWSTR::null())
            .map_err(|e| BlackoutError::platform("GetModuleHandleW", e.code().0))?;

        let wc = WNDCLASSW {
            lpfnWndProc: Some(wnd_proc),
            hInstance: hinstance.into(),
            lpszClassName: PCWSTR(class_name.as_ptr()),
            ..Default::default()
        };
        if RegisterClassW(&wc) == 0 {
            return Err(BlackoutError::platform(
                "RegisterClassW",
                GetLastError().0 as i32,
            ));
        }

        CreateWindowExW(
            WINDOW_EX_STYLE::default(),
            PCWSTR(class_name.as_ptr()),
            PCWSTR(title.as_ptr()),
            WS_OVERLAPPED,
            0,
            0,
            0,
            0,
            None,
            None,
            Some(hinstance.into()),
            None,
        )
        .map_err(|e| BlackoutError::platform("CreateWindowExW", e.code().0))
    }
}

impl App {
    fn toggle(&mut self) {
        report("toggle", self.service.toggle());
    }

    fn menu_model(&mut self) -> MenuModel {
        // Hardware can be swapped without the topology changing.
        self.service.refresh_identities();
        let monitors = self.service.monitors();
        self.menu_monitors = monitors.iter().map(|m| m.key.clone()).collect();

        MenuModel {
            blacked_out: self.service.is_blacked_out(),
            monitors: monitors
                .iter()
                .enumerate()
                .map(|(index, status)| (monitor_label(index, status), status.selected))
                .collect(),
            default_selection: self.service.selection().is_none(),
            click_through: self.service.click_through(),
            opacity: self.service.opacity(),
        }
    }

    fn toggle_menu_monitor(&mut self, index: usize) {
        match self.menu_monitors.get(index).cloned() {
            Some(key) => report("monitor selection", self.service.toggle_monitor(&key)),
            None => debug!(index, "stale monitor menu item"),
        }
    }
}

fn monitor_label(index: usize, status: &MonitorStatus) -> String {
    let bounds = &status.display.bounds;
    let primary = if status.display.is_primary {
        ", primary"
    } else {
        ""
    };
    format!(
        "Display {} ({}x{}{primary}): {}",
        index + 1,
        bounds.width,
        bounds.height,
        status.key
    )
}

fn on_command(hwnd: HWND, id: u32) {
    match id {
        tray::IDM_TOGGLE => {
            with_app(App::toggle);
        }
        tray::IDM_DEFAULT_SELECTION => {
            with_app(|app| {
                report(
                    "monitor selection",
                    app.service.update_selected_monitors(None),
                )
            });
        }
        tray::IDM_CLICK_THROUGH => {
            with_app(|app| {
                let enabled = !app.service.click_through();
                app.service.update_click_through(enabled);
            });
        }
        tray::IDM_QUIT => unsafe {
            let _ = DestroyWindow(hwnd);
        },
        _ => {
            if let Some(percent) = tray::opacity_preset(id) {
                with_app(|app| app.service.update_opacity(i32::from(percent)));
            } else if let Some(index) = tray::monitor_index(id) {
                with_app(|app| app.toggle_menu_monitor(index));
            }
        }
    }
}

unsafe extern "system" fn wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_HOTKEY => {
            if wparam.0 as i32 == hotkeys::HOTKEY_TOGGLE {
                with_app(App::toggle);
            }
            LRESULT(0)
        }

        tray::WM_TRAY_ICON => {
            match (lparam.0 & 0xFFFF) as u32 {
                WM_LBUTTONUP => {
                    with_app(App::toggle);
                }
                WM_RBUTTONUP => {
                    // The menu runs its own modal loop, so the state must
                    // not stay borrowed while it is open.
                    if let Some(model) = with_app(App::menu_model) {
                        tray::show_context_menu(hwnd, &model);
                    }
                }
                _ => {}
            }
            LRESULT(0)
        }

        WM_COMMAND => {
            on_command(hwnd, (wparam.0 & 0xFFFF) as u32);
            LRESULT(0)
        }

        WM_DISPLAYCHANGE => {
            debug!("display configuration changed");
            with_app(|app| report("display refresh", app.service.refresh()));
            LRESULT(0)
        }

        WM_DESTROY => {
            hotkeys::unregister_all(hwnd);
            tray::remove_tray_icon(hwnd);
            PostQuitMessage(0);
            LRESULT(0)
        }

        _ => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}
