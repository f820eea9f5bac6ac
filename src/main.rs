// Prevents console window in release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

#[cfg(windows)]
mod app;
#[cfg(windows)]
mod descriptors;
#[cfg(windows)]
mod displays;
#[cfg(windows)]
mod hotkeys;
#[cfg(windows)]
mod logging;
#[cfg(windows)]
mod overlay;
#[cfg(windows)]
mod tray;

#[cfg(windows)]
fn main() {
    if let Err(e) = app::run() {
        tracing::error!("blackout exited with an error: {e}");
        std::process::exit(1);
    }
}

#[cfg(not(windows))]
fn main() {
    eprintln!("Blackout only runs on Windows.");
    std::process::exit(1);
}
