//! Window-title sources for the process table, one per desktop platform.
//! Elsewhere titles are always empty and project names come from the
//! editor history file.

#[cfg(windows)]
mod win32;
#[cfg(target_os = "linux")]
mod x11;

#[cfg(target_os = "linux")]
pub fn system_titles() -> x11::X11WindowTitles {
    x11::X11WindowTitles::connect()
}

#[cfg(windows)]
pub fn system_titles() -> win32::Win32WindowTitles {
    win32::Win32WindowTitles
}

#[cfg(not(any(target_os = "linux", windows)))]
pub fn system_titles() -> presence_core::NoWindowTitles {
    presence_core::NoWindowTitles
}
