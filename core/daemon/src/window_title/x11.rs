//! Window titles from X11.
//!
//! Walks the window manager's `_NET_CLIENT_LIST`, keeps the windows whose
//! `_NET_WM_PID` is the editor's pid, and returns the first non-empty
//! `_NET_WM_NAME` (falling back to the legacy `WM_NAME`). Without an X
//! display every lookup returns no title.

use presence_core::{PresenceError, WindowTitleSource};
use tracing::{debug, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{self, Atom, AtomEnum, Window};
use x11rb::rust_connection::RustConnection;

/// Pre-interned X11 atoms for property queries.
struct Atoms {
    net_client_list: Atom,
    net_wm_pid: Atom,
    net_wm_name: Atom,
}

pub struct X11WindowTitles {
    display: Option<Display>,
}

struct Display {
    conn: RustConnection,
    root: Window,
    atoms: Atoms,
}

impl X11WindowTitles {
    /// Connects to `$DISPLAY`. A missing display is not an error: titles
    /// are then always empty and names come from the history file.
    pub fn connect() -> Self {
        match Display::connect() {
            Ok(display) => Self {
                display: Some(display),
            },
            Err(err) => {
                warn!(error = %err, "X11 unavailable; window titles disabled");
                Self { display: None }
            }
        }
    }
}

impl WindowTitleSource for X11WindowTitles {
    fn window_title(&mut self, pid: u32) -> presence_core::Result<Option<String>> {
        match &self.display {
            Some(display) => display.window_title(pid),
            None => Ok(None),
        }
    }
}

impl Display {
    fn connect() -> Result<Self, PresenceError> {
        let (conn, screen_num) = RustConnection::connect(None)
            .map_err(|e| PresenceError::WindowTitle(format!("connect failed: {e}")))?;
        let root = conn.setup().roots[screen_num].root;

        let atoms = Atoms {
            net_client_list: intern(&conn, b"_NET_CLIENT_LIST")?,
            net_wm_pid: intern(&conn, b"_NET_WM_PID")?,
            net_wm_name: intern(&conn, b"_NET_WM_NAME")?,
        };

        Ok(Self { conn, root, atoms })
    }

    fn window_title(&self, pid: u32) -> presence_core::Result<Option<String>> {
        let windows = self.property_u32s(self.root, self.atoms.net_client_list, AtomEnum::WINDOW)?;

        for window in windows {
            let owner = self.property_u32s(window, self.atoms.net_wm_pid, AtomEnum::CARDINAL)?;
            if owner.first() != Some(&pid) {
                continue;
            }

            let title = match self.property_text(window, self.atoms.net_wm_name)? {
                Some(title) => Some(title),
                None => self.property_text(window, AtomEnum::WM_NAME.into())?,
            };
            if let Some(title) = title {
                debug!(pid, window, title = %title, "Found window title");
                return Ok(Some(title));
            }
        }

        Ok(None)
    }

    fn property_u32s(
        &self,
        window: Window,
        property: Atom,
        kind: AtomEnum,
    ) -> presence_core::Result<Vec<u32>> {
        let reply = xproto::get_property(&self.conn, false, window, property, kind, 0, u32::MAX)
            .map_err(|e| PresenceError::WindowTitle(format!("get_property: {e}")))?
            .reply()
            .map_err(|e| PresenceError::WindowTitle(format!("get_property reply: {e}")))?;

        Ok(reply
            .value32()
            .map(|values| values.collect())
            .unwrap_or_default())
    }

    fn property_text(&self, window: Window, property: Atom) -> presence_core::Result<Option<String>> {
        let reply = xproto::get_property(
            &self.conn,
            false,
            window,
            property,
            AtomEnum::ANY,
            0,
            u32::MAX,
        )
        .map_err(|e| PresenceError::WindowTitle(format!("get_property: {e}")))?
        .reply()
        .map_err(|e| PresenceError::WindowTitle(format!("get_property reply: {e}")))?;

        if reply.format != 8 || reply.value.is_empty() {
            return Ok(None);
        }
        let title = String::from_utf8_lossy(&reply.value).trim().to_string();
        Ok(if title.is_empty() { None } else { Some(title) })
    }
}

fn intern(conn: &RustConnection, name: &[u8]) -> Result<Atom, PresenceError> {
    Ok(xproto::intern_atom(conn, false, name)
        .map_err(|e| PresenceError::WindowTitle(format!("intern_atom: {e}")))?
        .reply()
        .map_err(|e| PresenceError::WindowTitle(format!("intern_atom reply: {e}")))?
        .atom)
}
