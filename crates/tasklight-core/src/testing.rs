//! Test doubles for the OS and toolkit seams.

use crate::backend::{HotkeyBackend, HotkeyEvent, HotkeyId};
use crate::main_thread::{MainThreadInvoker, MainThreadTask};
use crate::windows::NativeWindow;
use crate::{Error, HotkeySpec, Result};
use crossbeam_channel::{Receiver, Sender, TrySendError, unbounded};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};

/// Route `tracing` output through the test harness. `RUST_LOG` picks the level.
pub(crate) fn init_logs() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(EnvFilter::from_default_env())
        .try_init();
}

/// Holds main-thread tasks until the test runs them.
#[derive(Default)]
pub(crate) struct QueuedInvoker {
    tasks: Mutex<VecDeque<MainThreadTask>>,
}

impl QueuedInvoker {
    pub fn pending(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn run_pending(&self) {
        loop {
            // Pop before running so a task may queue more work.
            let Some(task) = self.tasks.lock().pop_front() else {
                break;
            };
            task();
        }
    }
}

impl MainThreadInvoker for QueuedInvoker {
    fn run_on_main_thread(&self, task: MainThreadTask) {
        self.tasks.lock().push_back(task);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NativeOp {
    Show,
    Hide,
    Focus,
}

/// Records every native call made on it.
#[derive(Default)]
pub(crate) struct CountingWindow {
    ops: Mutex<Vec<NativeOp>>,
}

impl CountingWindow {
    pub fn ops(&self) -> Vec<NativeOp> {
        self.ops.lock().clone()
    }
}

impl NativeWindow for CountingWindow {
    fn show(&self) {
        self.ops.lock().push(NativeOp::Show);
    }

    fn hide(&self) {
        self.ops.lock().push(NativeOp::Hide);
    }

    fn focus(&self) {
        self.ops.lock().push(NativeOp::Focus);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BackendOp {
    Register(HotkeySpec),
    /// `listener_alive` is true if someone was still receiving events for the
    /// registration at the moment it was released.
    Unregister {
        spec: HotkeySpec,
        listener_alive: bool,
    },
}

#[derive(Default)]
struct FakeState {
    next_id: HotkeyId,
    live: HashMap<HotkeyId, (HotkeySpec, Sender<HotkeyEvent>, Option<Receiver<HotkeyEvent>>)>,
    taken: HashSet<HotkeySpec>,
    ops: Vec<BackendOp>,
}

/// An in-memory OS hotkey table.
#[derive(Default)]
pub(crate) struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    /// Pretend another application holds `spec`.
    pub fn occupy(&self, spec: HotkeySpec) {
        self.state.lock().taken.insert(spec);
    }

    pub fn ops(&self) -> Vec<BackendOp> {
        self.state.lock().ops.clone()
    }

    pub fn live_count(&self) -> usize {
        self.state.lock().live.len()
    }

    /// Simulate a physical key press. Returns false if no registration for
    /// `spec` is live, in which case the press goes nowhere.
    pub fn press(&self, spec: &HotkeySpec) -> bool {
        let state = self.state.lock();
        state
            .live
            .iter()
            .filter(|(_, (s, _, _))| s == spec)
            .any(|(id, (_, tx, _))| tx.send(HotkeyEvent { id: *id }).is_ok())
    }

    /// Close the event channel of a live registration without unregistering it.
    pub fn break_source(&self, spec: &HotkeySpec) {
        for (s, tx, _) in self.state.lock().live.values_mut() {
            if s == spec {
                *tx = unbounded().0;
            }
        }
    }
}

impl HotkeyBackend for FakeBackend {
    fn register(&self, spec: &HotkeySpec) -> Result<HotkeyId> {
        spec.validate()?;
        let mut state = self.state.lock();
        if state.taken.contains(spec) || state.live.values().any(|(s, _, _)| s == spec) {
            return Err(Error::HotkeyConflict(spec.to_string()));
        }
        state.next_id += 1;
        let id = state.next_id;
        let (tx, rx) = unbounded();
        state.live.insert(id, (spec.clone(), tx, Some(rx)));
        state.ops.push(BackendOp::Register(spec.clone()));
        Ok(id)
    }

    fn unregister(&self, id: HotkeyId) -> Result<()> {
        let mut state = self.state.lock();
        let Some((spec, tx, _)) = state.live.remove(&id) else {
            return Ok(());
        };
        // A disconnected channel means every receiver, i.e. the listener, is gone.
        let listener_alive = !matches!(
            tx.try_send(HotkeyEvent { id: 0 }),
            Err(TrySendError::Disconnected(_))
        );
        state.ops.push(BackendOp::Unregister {
            spec,
            listener_alive,
        });
        Ok(())
    }

    fn key_down_events(&self, id: HotkeyId) -> Result<Receiver<HotkeyEvent>> {
        // Hand out the only receiver so its lifetime tracks the listener.
        self.state
            .lock()
            .live
            .get_mut(&id)
            .and_then(|(_, _, rx)| rx.take())
            .ok_or_else(|| Error::HotkeyOperation(format!("no events for {id}")))
    }
}
