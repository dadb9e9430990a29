//! Process probe: is the editor (or Discord) running, and what does its
//! window title say?
//!
//! The OS is reached through two small traits so the reconciler can be
//! driven by fakes in tests. `SystemProcessTable` is the production table,
//! backed by `sysinfo`; window titles come from whatever
//! [`WindowTitleSource`] the binary plugs in.

use sysinfo::{ProcessRefreshKind, System};
use tracing::debug;

use crate::error::Result;

/// One running process as reported by the process table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub window_title: String,
}

/// The editor process chosen for this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessHandle {
    /// The candidate name that matched.
    pub name: String,
    pub pid: u32,
    /// May be empty while the editor is still opening its window.
    pub window_title: String,
}

pub trait ProcessTable {
    /// Re-reads the OS process list. Called once per probe.
    fn refresh(&mut self) -> Result<()>;

    /// Running instances named `name`, in the order the table reports them.
    fn processes_by_name(&mut self, name: &str) -> Result<Vec<ProcessEntry>>;

    /// Current main window title of `pid`, empty if it has none.
    fn window_title(&mut self, pid: u32) -> Result<String>;
}

pub trait WindowTitleSource {
    fn window_title(&mut self, pid: u32) -> Result<Option<String>>;
}

/// For platforms where the daemon cannot read window titles; project names
/// then come from the history file.
#[derive(Debug, Default)]
pub struct NoWindowTitles;

impl WindowTitleSource for NoWindowTitles {
    fn window_title(&mut self, _pid: u32) -> Result<Option<String>> {
        Ok(None)
    }
}

pub struct ProcessProbe<T> {
    table: T,
    host_process_names: Vec<String>,
}

impl<T: ProcessTable> ProcessProbe<T> {
    pub fn new(table: T, host_process_names: Vec<String>) -> Self {
        Self {
            table,
            host_process_names,
        }
    }

    /// Returns the first running instance of the first candidate name that
    /// has one. Later candidates are not examined once a name matches.
    pub fn find_process(&mut self, candidate_names: &[String]) -> Result<Option<ProcessHandle>> {
        self.table.refresh()?;

        for name in candidate_names {
            let mut instances = self.table.processes_by_name(name)?;
            if instances.is_empty() {
                continue;
            }
            let first = instances.remove(0);
            debug!(process = %name, pid = first.pid, "Found editor process");
            return Ok(Some(ProcessHandle {
                name: name.clone(),
                pid: first.pid,
                window_title: first.window_title,
            }));
        }

        Ok(None)
    }

    pub fn is_host_running(&mut self) -> Result<bool> {
        self.table.refresh()?;

        for name in &self.host_process_names {
            if !self.table.processes_by_name(name)?.is_empty() {
                debug!(process = %name, "Found host process");
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn window_title(&mut self, pid: u32) -> Result<String> {
        self.table.window_title(pid)
    }
}

/// Process table backed by `sysinfo`.
pub struct SystemProcessTable<W> {
    system: System,
    titles: W,
}

impl<W: WindowTitleSource> SystemProcessTable<W> {
    pub fn new(titles: W) -> Self {
        Self {
            system: System::new(),
            titles,
        }
    }
}

impl<W: WindowTitleSource> ProcessTable for SystemProcessTable<W> {
    fn refresh(&mut self) -> Result<()> {
        self.system
            .refresh_processes_specifics(ProcessRefreshKind::new());
        Ok(())
    }

    fn processes_by_name(&mut self, name: &str) -> Result<Vec<ProcessEntry>> {
        let mut pids: Vec<u32> = self
            .system
            .processes()
            .iter()
            .filter(|(_, process)| process_name_matches(process.name(), name))
            .map(|(pid, _)| pid.as_u32())
            .collect();
        // sysinfo iterates a hash map; lowest pid keeps "first instance" stable.
        pids.sort_unstable();

        let mut entries = Vec::with_capacity(pids.len());
        for pid in pids {
            let window_title = self.titles.window_title(pid)?.unwrap_or_default();
            entries.push(ProcessEntry { pid, window_title });
        }
        Ok(entries)
    }

    fn window_title(&mut self, pid: u32) -> Result<String> {
        Ok(self.titles.window_title(pid)?.unwrap_or_default())
    }
}

/// Exact match, also accepting a Windows image name (`Unity.exe`) for the
/// plain candidate (`Unity`).
pub fn process_name_matches(actual: &str, candidate: &str) -> bool {
    actual == candidate || actual.strip_suffix(".exe") == Some(candidate)
}
