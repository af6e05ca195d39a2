//! Cross-thread control handle for a running simulation.
//!
//! `pause`, `resume` and `stop` are idempotent and may be called at any
//! time; the simulator observes them at the next step boundary. Stop also
//! interrupts pacing and paused waits.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use ts_attacks::AttackRecord;

/// Change requested while a run is in progress.
#[derive(Debug, Clone, PartialEq)]
pub enum RunCommand {
    ArmAttack(AttackRecord),
    DisarmAttack(String),
    ResetController,
    SetSetpoint(f64),
}

#[derive(Debug, Default)]
struct Flags {
    paused: bool,
    stopped: bool,
    commands: VecDeque<RunCommand>,
}

#[derive(Debug, Default)]
struct Shared {
    flags: Mutex<Flags>,
    wake: Condvar,
}

/// Cloneable handle; all clones control the same run.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    shared: Arc<Shared>,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a pause. Returns `false` if already paused or stopped.
    pub fn pause(&self) -> bool {
        let mut flags = self.lock();
        if flags.paused || flags.stopped {
            return false;
        }
        flags.paused = true;
        true
    }

    /// Clear a pause. Returns `false` if not paused.
    pub fn resume(&self) -> bool {
        let mut flags = self.lock();
        if !flags.paused {
            return false;
        }
        flags.paused = false;
        self.shared.wake.notify_all();
        true
    }

    /// Request termination. Returns `false` if already requested.
    pub fn stop(&self) -> bool {
        let mut flags = self.lock();
        if flags.stopped {
            return false;
        }
        flags.stopped = true;
        self.shared.wake.notify_all();
        true
    }

    pub fn is_paused(&self) -> bool {
        self.lock().paused
    }

    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    /// Queue a new attack; registered at the next step boundary.
    pub fn arm_attack(&self, record: AttackRecord) {
        self.lock().commands.push_back(RunCommand::ArmAttack(record));
    }

    /// Queue removal of an attack by id.
    pub fn disarm_attack(&self, attack_id: impl Into<String>) {
        self.lock()
            .commands
            .push_back(RunCommand::DisarmAttack(attack_id.into()));
    }

    /// Queue a controller reset (integral and previous error cleared).
    pub fn reset_controller(&self) {
        self.lock().commands.push_back(RunCommand::ResetController);
    }

    /// Queue a new controller setpoint.
    pub fn set_setpoint(&self, setpoint: f64) {
        self.lock()
            .commands
            .push_back(RunCommand::SetSetpoint(setpoint));
    }

    pub(crate) fn take_commands(&self) -> Vec<RunCommand> {
        self.lock().commands.drain(..).collect()
    }

    /// Block while paused. Returns `true` if the run was stopped.
    pub(crate) fn wait_while_paused(&self) -> bool {
        let mut flags = self.lock();
        while flags.paused && !flags.stopped {
            flags = self
                .shared
                .wake
                .wait(flags)
                .unwrap_or_else(PoisonError::into_inner);
        }
        flags.stopped
    }

    /// Sleep for up to `interval`, returning early on stop.
    pub(crate) fn sleep(&self, interval: Duration) -> bool {
        let deadline = Instant::now() + interval;
        let mut flags = self.lock();
        while !flags.stopped {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let (guard, _) = self
                .shared
                .wake
                .wait_timeout(flags, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            flags = guard;
        }
        flags.stopped
    }

    fn lock(&self) -> MutexGuard<'_, Flags> {
        self.shared
            .flags
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
