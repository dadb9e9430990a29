//! End-to-end tick tests with fake OS, Discord and clock.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use presence_core::{
    connect, ActivityResult, HistoryConfig, PresenceActivity, PresenceClient, PresenceConfig,
    PresenceError, ProcessEntry, ProcessProbe, ProcessTable, ProjectIdentity,
    ProjectNameResolver, ProjectNameSource, Reconciler, ResultCallback, Session, Sleeper,
    StartupError, TickOutcome,
};

const START: i64 = 1_717_000_000;

// ─────────────────────────────────────────────────────────────────────
// Fakes
// ─────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeTable {
    processes: HashMap<String, Vec<ProcessEntry>>,
    /// Titles returned by `window_title`, consumed front to back.
    title_rereads: RefCell<Vec<String>>,
    failing_refreshes: usize,
}

impl FakeTable {
    fn with(mut self, name: &str, pid: u32, title: &str) -> Self {
        self.processes
            .entry(name.to_string())
            .or_default()
            .push(ProcessEntry {
                pid,
                window_title: title.to_string(),
            });
        self
    }
}

impl ProcessTable for FakeTable {
    fn refresh(&mut self) -> presence_core::Result<()> {
        if self.failing_refreshes > 0 {
            self.failing_refreshes -= 1;
            return Err(PresenceError::ProcessQuery("process table unavailable".into()));
        }
        Ok(())
    }

    fn processes_by_name(&mut self, name: &str) -> presence_core::Result<Vec<ProcessEntry>> {
        Ok(self.processes.get(name).cloned().unwrap_or_default())
    }

    fn window_title(&mut self, _pid: u32) -> presence_core::Result<String> {
        let mut rereads = self.title_rereads.borrow_mut();
        if rereads.is_empty() {
            return Ok(String::new());
        }
        Ok(rereads.remove(0))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Call {
    RunCallbacks,
    Update(PresenceActivity),
    Clear,
}

#[derive(Default)]
struct FakeClient {
    calls: Vec<Call>,
    pending: Vec<ResultCallback>,
    failing_updates: usize,
}

impl PresenceClient for FakeClient {
    fn run_callbacks(&mut self) -> presence_core::Result<()> {
        self.calls.push(Call::RunCallbacks);
        for callback in self.pending.drain(..) {
            callback(ActivityResult::Ok);
        }
        Ok(())
    }

    fn update_activity(
        &mut self,
        activity: &PresenceActivity,
        on_result: ResultCallback,
    ) -> presence_core::Result<()> {
        if self.failing_updates > 0 {
            self.failing_updates -= 1;
            return Err(PresenceError::ConnectionClosed("pipe closed".into()));
        }
        self.calls.push(Call::Update(activity.clone()));
        self.pending.push(on_result);
        Ok(())
    }

    fn clear_activity(&mut self, on_result: ResultCallback) -> presence_core::Result<()> {
        self.calls.push(Call::Clear);
        self.pending.push(on_result);
        Ok(())
    }
}

struct CountingResolver {
    inner: ProjectNameResolver,
    calls: Rc<Cell<usize>>,
}

impl ProjectNameSource for CountingResolver {
    fn resolve(&self, window_title: &str) -> ProjectIdentity {
        self.calls.set(self.calls.get() + 1);
        self.inner.resolve(window_title)
    }
}

#[derive(Default)]
struct RecordingSleeper {
    sleeps: Vec<Duration>,
}

impl Sleeper for RecordingSleeper {
    fn sleep(&mut self, duration: Duration) {
        self.sleeps.push(duration);
    }
}

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

fn test_config() -> PresenceConfig {
    PresenceConfig {
        history: HistoryConfig {
            app_data_dir: None,
            ..HistoryConfig::default()
        },
        ..PresenceConfig::default()
    }
}

type TestReconciler = Reconciler<FakeClient, FakeTable, CountingResolver, RecordingSleeper>;

fn reconciler(table: FakeTable, client: FakeClient) -> (TestReconciler, Rc<Cell<usize>>) {
    let config = test_config();
    let calls = Rc::new(Cell::new(0));
    let resolver = CountingResolver {
        inner: ProjectNameResolver::from_config(&config),
        calls: Rc::clone(&calls),
    };
    let probe = ProcessProbe::new(table, config.host_process_names.clone());
    let reconciler = Reconciler::new(
        Session::new(client, START),
        probe,
        resolver,
        RecordingSleeper::default(),
        &config,
    );
    (reconciler, calls)
}

fn updates(reconciler: &TestReconciler) -> Vec<PresenceActivity> {
    reconciler
        .session()
        .client()
        .calls
        .iter()
        .filter_map(|call| match call {
            Call::Update(activity) => Some(activity.clone()),
            _ => None,
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────
// Tick behaviour
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_no_editor_clears_without_resolving() {
    let (mut reconciler, resolver_calls) = reconciler(FakeTable::default(), FakeClient::default());

    let outcome = reconciler.tick();

    assert!(matches!(outcome, TickOutcome::Cleared));
    assert_eq!(
        reconciler.session().client().calls,
        vec![Call::RunCallbacks, Call::Clear]
    );
    assert_eq!(resolver_calls.get(), 0);
}

#[test]
fn test_editor_title_drives_update() {
    let table = FakeTable::default().with(
        "Unity",
        4242,
        "Physics Playground - Unity 2021.3.5f1 - Scene1.unity",
    );
    let (mut reconciler, resolver_calls) = reconciler(table, FakeClient::default());

    let outcome = reconciler.tick();

    match outcome {
        TickOutcome::Updated { project } => assert_eq!(project.name(), "Physics Playground"),
        other => panic!("expected update, got {:?}", other),
    }
    let sent = updates(&reconciler);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].details, "Editing: Physics Playground");
    assert_eq!(sent[0].timestamps.start, START);
    assert_eq!(resolver_calls.get(), 1);
    assert!(reconciler.sleeper().sleeps.is_empty());
}

#[test]
fn test_long_project_name_still_publishes_valid_activity() {
    let title = format!("{} - Unity 2022.3.1f1", "A".repeat(125));
    let table = FakeTable::default().with("Unity", 4242, &title);
    let (mut reconciler, _) = reconciler(table, FakeClient::default());

    assert!(matches!(reconciler.tick(), TickOutcome::Updated { .. }));

    let sent = updates(&reconciler);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].details.chars().count(), 128);
    assert!(sent[0].validate().is_ok());
}

#[test]
fn test_start_timestamp_constant_across_ticks() {
    let table = FakeTable::default().with("Unity", 1, "Orbit - Unity 6000.0.1f1");
    let (mut reconciler, _) = reconciler(table, FakeClient::default());

    reconciler.step();
    reconciler.step();
    reconciler.step();

    let sent = updates(&reconciler);
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|activity| activity.timestamps.start == START));
}

#[test]
fn test_later_candidate_used_when_editor_absent() {
    let table = FakeTable::default().with("Unity Hub", 7, "Unity Hub - Projects");
    let (mut reconciler, _) = reconciler(table, FakeClient::default());

    match reconciler.tick() {
        TickOutcome::Updated { project } => assert_eq!(project.name(), "Projects"),
        other => panic!("expected update, got {:?}", other),
    }
}

#[test]
fn test_blank_title_waits_once_then_rereads() {
    let table = FakeTable::default().with("Unity", 9, "");
    table
        .title_rereads
        .borrow_mut()
        .push("Late Title - Unity 2022.3.1f1".to_string());
    let (mut reconciler, _) = reconciler(table, FakeClient::default());

    let outcome = reconciler.tick();

    match outcome {
        TickOutcome::Updated { project } => assert_eq!(project.name(), "Late Title"),
        other => panic!("expected update, got {:?}", other),
    }
    assert_eq!(reconciler.sleeper().sleeps, vec![Duration::from_secs(1)]);
}

#[test]
fn test_title_still_blank_resolves_to_sentinel() {
    let table = FakeTable::default().with("Unity", 9, "");
    let (mut reconciler, _) = reconciler(table, FakeClient::default());

    match reconciler.tick() {
        TickOutcome::Updated { project } => {
            assert_eq!(project.name(), "Unknown Project");
            assert!(project.is_unknown());
        }
        other => panic!("expected update, got {:?}", other),
    }
    assert_eq!(updates(&reconciler)[0].details, "Editing: Unknown Project");
}

#[test]
fn test_failed_client_call_does_not_stop_loop() {
    let table = FakeTable::default().with("Unity", 3, "Arena - Unity 2022.3.1f1");
    let client = FakeClient {
        failing_updates: 1,
        ..FakeClient::default()
    };
    let (mut reconciler, _) = reconciler(table, client);

    let first = reconciler.step();
    let second = reconciler.step();

    assert!(matches!(
        first,
        TickOutcome::Failed {
            error: PresenceError::ConnectionClosed(_)
        }
    ));
    assert!(matches!(second, TickOutcome::Updated { .. }));
    assert_eq!(
        reconciler.sleeper().sleeps,
        vec![Duration::from_secs(5), Duration::from_secs(5)]
    );
}

#[test]
fn test_probe_failure_is_a_no_op_tick() {
    let table = FakeTable {
        failing_refreshes: 1,
        ..FakeTable::default()
    };
    let (mut reconciler, resolver_calls) = reconciler(table, FakeClient::default());

    let first = reconciler.step();
    let second = reconciler.step();

    assert!(matches!(
        first,
        TickOutcome::Failed {
            error: PresenceError::ProcessQuery(_)
        }
    ));
    assert!(matches!(second, TickOutcome::Cleared));
    assert_eq!(resolver_calls.get(), 0);
    assert_eq!(reconciler.sleeper().sleeps.len(), 2);
}

#[test]
fn test_callbacks_pumped_at_start_of_every_tick() {
    let (mut reconciler, _) = reconciler(FakeTable::default(), FakeClient::default());

    reconciler.tick();
    assert_eq!(reconciler.session().client().pending.len(), 1);

    reconciler.tick();
    let client = reconciler.session().client();
    assert_eq!(
        client.calls,
        vec![
            Call::RunCallbacks,
            Call::Clear,
            Call::RunCallbacks,
            Call::Clear
        ]
    );
    assert_eq!(client.pending.len(), 1);
}

// ─────────────────────────────────────────────────────────────────────
// Startup
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_startup_without_discord_is_fatal_and_skips_client() {
    let config = test_config();
    let mut probe = ProcessProbe::new(FakeTable::default(), config.host_process_names.clone());
    let constructed = Cell::new(false);

    let result = connect(&mut probe, || {
        constructed.set(true);
        Ok(FakeClient::default())
    });

    assert!(matches!(result, Err(StartupError::HostNotRunning)));
    assert!(!constructed.get());
}

#[test]
fn test_startup_client_failure_is_fatal() {
    let config = test_config();
    let table = FakeTable::default().with("Discord", 100, "");
    let mut probe = ProcessProbe::new(table, config.host_process_names.clone());

    let result = connect::<_, FakeClient, _>(&mut probe, || {
        Err(PresenceError::ConnectionClosed("no ipc socket".into()))
    });

    assert!(matches!(result, Err(StartupError::Client(_))));
}

#[test]
fn test_startup_captures_launch_time() {
    let config = test_config();
    let table = FakeTable::default().with("discord", 100, "");
    let mut probe = ProcessProbe::new(table, config.host_process_names.clone());

    let before = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;
    let session = connect(&mut probe, || Ok(FakeClient::default())).unwrap();

    assert!(session.start_timestamp() >= before);
    assert!(session.start_timestamp() <= before + 5);
    assert!(session.client().calls.is_empty());
}
