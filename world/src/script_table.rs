//! Table-driven script environment.
//!
//! Units loaded by the scenario runner and by tests do not carry a bytecode
//! interpreter. Instead every script name maps to a fixed [`ScriptBehavior`]
//! that decides what the launch/poll contract reports.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use skirmish_core::{ScriptEnvironment, ThreadId, ThreadStatus};

/// Scripted outcome of one named script.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ScriptBehavior {
    /// Finishes immediately. Queries report `value`; scheduled threads succeed.
    Returns(i32),
    /// Scheduled threads finish on the `ticks`-th poll (at least the first)
    /// and report `success`.
    Timed {
        /// Polls needed before the thread finishes.
        ticks: u32,
        /// Success flag reported on completion.
        success: bool,
    },
    /// Never finishes when run synchronously.
    Suspends,
}

/// Record of one scheduled script launch.
#[derive(Clone, Debug, PartialEq)]
pub struct ScriptLaunch {
    /// Name of the launched script.
    pub script: String,
    /// Arguments passed to it.
    pub args: Vec<i32>,
}

/// Shared log of scheduled launches, readable after the table is boxed into a unit.
#[derive(Clone, Debug, Default)]
pub struct ScriptJournal {
    launches: Rc<RefCell<Vec<ScriptLaunch>>>,
}

impl ScriptJournal {
    /// Creates an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies every launch recorded so far.
    #[must_use]
    pub fn launches(&self) -> Vec<ScriptLaunch> {
        self.launches.borrow().clone()
    }

    /// Number of recorded launches of `script`.
    #[must_use]
    pub fn count(&self, script: &str) -> usize {
        self.launches
            .borrow()
            .iter()
            .filter(|launch| launch.script == script)
            .count()
    }

    fn record(&self, script: &str, args: &[i32]) {
        self.launches.borrow_mut().push(ScriptLaunch {
            script: script.to_owned(),
            args: args.to_vec(),
        });
    }
}

#[derive(Clone, Copy, Debug)]
struct PendingThread {
    remaining: u32,
    success: bool,
}

/// Script environment answering from a fixed table.
#[derive(Debug, Default)]
pub struct ScriptTable {
    scripts: BTreeMap<String, ScriptBehavior>,
    pieces: Vec<Vec3>,
    scheduled: BTreeMap<ThreadId, PendingThread>,
    queries: BTreeMap<ThreadId, String>,
    next_thread: u32,
    journal: Option<ScriptJournal>,
}

impl ScriptTable {
    /// Creates a table without scripts or pieces.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the behavior of a named script.
    #[must_use]
    pub fn with_script(mut self, name: impl Into<String>, behavior: ScriptBehavior) -> Self {
        let _ = self.scripts.insert(name.into(), behavior);
        self
    }

    /// Appends a model piece; pieces are indexed in insertion order from zero.
    #[must_use]
    pub fn with_piece(mut self, offset: Vec3) -> Self {
        self.pieces.push(offset);
        self
    }

    /// Records every scheduled launch into `journal`.
    #[must_use]
    pub fn with_journal(mut self, journal: ScriptJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    fn allocate_thread(&mut self) -> ThreadId {
        let thread = ThreadId::new(self.next_thread);
        self.next_thread = self.next_thread.wrapping_add(1);
        thread
    }
}

impl ScriptEnvironment for ScriptTable {
    fn launch(&mut self, script: &str, args: &[i32]) -> Option<ThreadId> {
        let behavior = self.scripts.get(script)?.clone();
        if let Some(journal) = &self.journal {
            journal.record(script, args);
        }

        let thread = self.allocate_thread();
        if let ScriptBehavior::Timed { ticks, success } = behavior {
            let _ = self.scheduled.insert(
                thread,
                PendingThread {
                    remaining: ticks,
                    success,
                },
            );
        }
        Some(thread)
    }

    fn launch_query(&mut self, script: &str, _args: &[i32]) -> Option<ThreadId> {
        if !self.scripts.contains_key(script) {
            return None;
        }

        let thread = self.allocate_thread();
        let _ = self.queries.insert(thread, script.to_owned());
        Some(thread)
    }

    fn run_to_completion(&mut self, thread: ThreadId) -> ThreadStatus {
        let behavior = self
            .queries
            .remove(&thread)
            .and_then(|script| self.scripts.get(&script));
        match behavior {
            Some(ScriptBehavior::Returns(value)) => ThreadStatus::Finished { value: *value },
            Some(ScriptBehavior::Timed { ticks: 0, success }) => ThreadStatus::Finished {
                value: i32::from(*success),
            },
            Some(ScriptBehavior::Timed { .. } | ScriptBehavior::Suspends) | None => {
                ThreadStatus::Suspended
            }
        }
    }

    fn poll(&mut self, thread: ThreadId) -> Option<bool> {
        let Some(pending) = self.scheduled.get_mut(&thread) else {
            return Some(true);
        };

        pending.remaining = pending.remaining.saturating_sub(1);
        if pending.remaining > 0 {
            return None;
        }

        let success = pending.success;
        let _ = self.scheduled.remove(&thread);
        Some(success)
    }

    fn piece_offset(&self, piece: i32) -> Option<Vec3> {
        let index = usize::try_from(piece).ok()?;
        self.pieces.get(index).copied()
    }
}
