use crate::{Result, ScreenshotError};
use std::path::PathBuf;

/// Locates a Chrome/Chromium binary in the well-known install locations,
/// then on `PATH`. An explicit path from the configuration skips this lookup.
pub fn find_chrome_executable() -> Result<PathBuf> {
    standard_locations()
        .into_iter()
        .find(|p| p.exists())
        .or_else(find_in_path)
        .ok_or(ScreenshotError::ChromeNotFound)
}

#[cfg(target_os = "macos")]
fn standard_locations() -> Vec<PathBuf> {
    [
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/Applications/Google Chrome Canary.app/Contents/MacOS/Google Chrome Canary",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect()
}

#[cfg(target_os = "linux")]
fn standard_locations() -> Vec<PathBuf> {
    [
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect()
}

#[cfg(target_os = "windows")]
fn standard_locations() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = [
        r"C:\Program Files\Google\Chrome\Application\chrome.exe",
        r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        r"C:\Program Files\Chromium\Application\chrome.exe",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect();

    if let Ok(local_app_data) = std::env::var("LOCALAPPDATA") {
        paths.push(
            PathBuf::from(local_app_data)
                .join("Google")
                .join("Chrome")
                .join("Application")
                .join("chrome.exe"),
        );
    }

    paths
}

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
fn standard_locations() -> Vec<PathBuf> {
    Vec::new()
}

fn find_in_path() -> Option<PathBuf> {
    let binaries: &[&str] = if cfg!(windows) {
        &["chrome.exe", "chromium.exe"]
    } else {
        &["google-chrome", "chromium", "chromium-browser", "chrome"]
    };

    binaries.iter().find_map(|b| which::which(b).ok())
}

/// Process-wide stop request. The runner checks it between tasks so an
/// interrupted run still closes its browser.
pub mod signal {
    use std::sync::atomic::{AtomicBool, Ordering};

    static SHUTDOWN: AtomicBool = AtomicBool::new(false);

    pub fn is_shutdown() -> bool {
        SHUTDOWN.load(Ordering::Relaxed)
    }

    pub fn set_shutdown() {
        SHUTDOWN.store(true, Ordering::Relaxed);
    }

    pub async fn setup_handlers() -> crate::Result<()> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            let mut sigint = signal(SignalKind::interrupt())?;
            let mut sigterm = signal(SignalKind::terminate())?;

            tokio::spawn(async move {
                tokio::select! {
                    _ = sigint.recv() => tracing::warn!("Received SIGINT, finishing current task..."),
                    _ = sigterm.recv() => tracing::warn!("Received SIGTERM, finishing current task..."),
                }
                set_shutdown();
            });
        }

        #[cfg(windows)]
        {
            use tokio::signal::windows;

            let mut ctrl_c = windows::ctrl_c()?;
            let mut ctrl_break = windows::ctrl_break()?;

            tokio::spawn(async move {
                tokio::select! {
                    _ = ctrl_c.recv() => tracing::warn!("Received Ctrl+C, finishing current task..."),
                    _ = ctrl_break.recv() => tracing::warn!("Received Ctrl+Break, finishing current task..."),
                }
                set_shutdown();
            });
        }

        Ok(())
    }
}
