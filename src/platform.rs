//! Host platform detection.
//!
//! Distinguishes native Windows from the Linux subsystem for Windows, which
//! reports itself as Linux but carries `Microsoft` in `/proc/version`.

use once_cell::sync::Lazy;

static PROC_VERSION: Lazy<Option<String>> =
    Lazy::new(|| std::fs::read_to_string("/proc/version").ok());

fn proc_version() -> Option<&'static str> {
    PROC_VERSION.as_deref()
}

fn is_microsoft_kernel(version: Option<&str>) -> bool {
    version.is_some_and(|v| v.to_lowercase().contains("microsoft"))
}

/// Native Windows: a Windows target and no `/proc/version`.
pub fn vanilla_windows() -> bool {
    cfg!(windows) && proc_version().is_none()
}

/// Linux running under the Windows subsystem.
pub fn bash_on_windows() -> bool {
    std::env::consts::OS == "linux" && is_microsoft_kernel(proc_version())
}

pub fn windows() -> bool {
    vanilla_windows() || bash_on_windows()
}

/// Linux that is not the Windows subsystem.
pub fn linux() -> bool {
    std::env::consts::OS == "linux" && !is_microsoft_kernel(proc_version())
}

pub fn osx() -> bool {
    std::env::consts::OS == "macos"
}

/// BSD family and Solaris.
pub fn unix() -> bool {
    matches!(
        std::env::consts::OS,
        "freebsd" | "openbsd" | "netbsd" | "dragonfly" | "solaris" | "illumos"
    )
}

/// Short name of the detected platform, for diagnostics.
pub fn name() -> &'static str {
    if bash_on_windows() {
        "bash-on-windows"
    } else if vanilla_windows() {
        "windows"
    } else if linux() {
        "linux"
    } else if osx() {
        "macos"
    } else if unix() {
        "unix"
    } else {
        std::env::consts::OS
    }
}
