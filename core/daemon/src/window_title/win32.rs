//! Main window titles from Win32.
//!
//! The main window of a process is its first visible, unowned top-level
//! window, the same one Task Manager shows.

use presence_core::WindowTitleSource;
use tracing::debug;
use windows_sys::Win32::Foundation::{BOOL, HWND, LPARAM};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetWindow, GetWindowTextLengthW, GetWindowTextW, GetWindowThreadProcessId,
    IsWindowVisible, GW_OWNER,
};

#[derive(Debug, Default)]
pub struct Win32WindowTitles;

impl WindowTitleSource for Win32WindowTitles {
    fn window_title(&mut self, pid: u32) -> presence_core::Result<Option<String>> {
        let mut search = TitleSearch { pid, title: None };
        // EnumWindows reports failure when the callback stops early, so its
        // return value says nothing about whether a title was found.
        // SAFETY: `search` outlives the call and `visit_window` is the only
        // code that dereferences the pointer.
        unsafe {
            EnumWindows(Some(visit_window), &mut search as *mut TitleSearch as LPARAM);
        }
        if let Some(title) = &search.title {
            debug!(pid, title = %title, "Found window title");
        }
        Ok(search.title)
    }
}

struct TitleSearch {
    pid: u32,
    title: Option<String>,
}

unsafe extern "system" fn visit_window(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let search = &mut *(lparam as *mut TitleSearch);

    let mut owner_pid = 0u32;
    GetWindowThreadProcessId(hwnd, &mut owner_pid);
    if owner_pid != search.pid || IsWindowVisible(hwnd) == 0 || !GetWindow(hwnd, GW_OWNER).is_null()
    {
        return 1;
    }

    let len = GetWindowTextLengthW(hwnd);
    if len <= 0 {
        return 1;
    }
    let mut buf = vec![0u16; len as usize + 1];
    let copied = GetWindowTextW(hwnd, buf.as_mut_ptr(), buf.len() as i32);
    if copied <= 0 {
        return 1;
    }

    let title = String::from_utf16_lossy(&buf[..copied as usize]);
    let title = title.trim();
    if title.is_empty() {
        return 1;
    }
    search.title = Some(title.to_string());
    0
}
