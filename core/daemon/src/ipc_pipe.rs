//! Byte transport to the local Discord client.
//!
//! Discord listens on `discord-ipc-0` through `discord-ipc-9`: Unix sockets
//! under the runtime directory, or `\\.\pipe\` named pipes on Windows. Both
//! carry the same frames; only opening and non-blocking reads differ.

use std::io::{self, Read, Write};
use std::path::Path;

const PIPE_PREFIX: &str = "discord-ipc-";
const PIPE_SLOTS: u8 = 10;

pub trait IpcPipe: Read + Write + Sized {
    fn open(path: &Path) -> io::Result<Self>;

    /// Reads bytes that have already arrived. `WouldBlock` means nothing is
    /// waiting; `Ok(0)` means Discord closed the pipe.
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

fn slot_names() -> impl Iterator<Item = String> {
    (0..PIPE_SLOTS).map(|slot| format!("{}{}", PIPE_PREFIX, slot))
}

#[cfg(unix)]
pub use unix::{candidate_paths, SystemPipe};

#[cfg(windows)]
pub use windows::{candidate_paths, SystemPipe};

#[cfg(unix)]
mod unix {
    use std::env;
    use std::io::{self, Read};
    use std::os::unix::net::UnixStream;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use super::{slot_names, IpcPipe};

    const SOCKET_DIR_ENV_KEYS: [&str; 4] = ["XDG_RUNTIME_DIR", "TMPDIR", "TMP", "TEMP"];
    /// Flatpak and Snap builds put the socket one level down.
    pub(crate) const SANDBOX_SUBDIRS: [&str; 3] = ["", "app/com.discordapp.Discord", "snap.discord"];
    const WRITE_TIMEOUT_MS: u64 = 600;

    pub type SystemPipe = UnixStream;

    impl IpcPipe for UnixStream {
        fn open(path: &Path) -> io::Result<Self> {
            let stream = UnixStream::connect(path)?;
            stream.set_write_timeout(Some(Duration::from_millis(WRITE_TIMEOUT_MS)))?;
            Ok(stream)
        }

        fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.set_nonblocking(true)?;
            let read = self.read(buf);
            self.set_nonblocking(false)?;
            read
        }
    }

    pub fn candidate_paths() -> Vec<PathBuf> {
        let base = SOCKET_DIR_ENV_KEYS
            .iter()
            .find_map(|key| env::var_os(key))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/tmp"));

        let mut paths = Vec::new();
        for subdir in SANDBOX_SUBDIRS {
            let dir = if subdir.is_empty() {
                base.clone()
            } else {
                base.join(subdir)
            };
            paths.extend(slot_names().map(|name| dir.join(name)));
        }
        paths
    }
}

#[cfg(windows)]
mod windows {
    use std::fs::{File, OpenOptions};
    use std::io::{self, Read, Write};
    use std::os::windows::io::AsRawHandle;
    use std::path::{Path, PathBuf};
    use std::ptr;

    use windows_sys::Win32::Foundation::HANDLE;
    use windows_sys::Win32::System::Pipes::PeekNamedPipe;

    use super::{slot_names, IpcPipe};

    const PIPE_DIR: &str = r"\\.\pipe\";

    /// Client end of a Discord named pipe.
    pub struct SystemPipe {
        file: File,
    }

    impl Read for SystemPipe {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.file.read(buf)
        }
    }

    impl Write for SystemPipe {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.file.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.file.flush()
        }
    }

    impl IpcPipe for SystemPipe {
        fn open(path: &Path) -> io::Result<Self> {
            let file = OpenOptions::new().read(true).write(true).open(path)?;
            Ok(Self { file })
        }

        fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let mut available: u32 = 0;
            // SAFETY: the handle is owned by `self.file` and outlives the call;
            // no buffer is passed, only the byte count is written.
            let ok = unsafe {
                PeekNamedPipe(
                    self.file.as_raw_handle() as HANDLE,
                    ptr::null_mut(),
                    0,
                    ptr::null_mut(),
                    &mut available,
                    ptr::null_mut(),
                )
            };
            if ok == 0 {
                return Err(io::Error::last_os_error());
            }
            if available == 0 {
                return Err(io::ErrorKind::WouldBlock.into());
            }
            let len = buf.len().min(available as usize);
            self.file.read(&mut buf[..len])
        }
    }

    pub fn candidate_paths() -> Vec<PathBuf> {
        slot_names()
            .map(|name| PathBuf::from(format!("{}{}", PIPE_DIR, name)))
            .collect()
    }
}
