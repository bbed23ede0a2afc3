use std::fmt::Display;

use crate::{storage::backup::BackupRecord, utils::time::format_elapsed};

use super::TimerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Created but never started.
    Stopped,
    Running,
    Paused,
}

impl Display for TimerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TimerState::Stopped => "stopped",
            TimerState::Running => "running",
            TimerState::Paused => "paused",
        };
        f.pad(name)
    }
}

/// A single project counter. Transitions are only reachable through
/// [TimerCollection](super::collection::TimerCollection), which keeps at most one timer running.
#[derive(Debug, Clone)]
pub struct ProjectTimer {
    id: TimerId,
    project_name: String,
    project_id: String,
    elapsed_seconds: u64,
    notes: String,
    state: TimerState,
}

impl ProjectTimer {
    pub(super) fn new(id: TimerId, project_name: String, project_id: String, notes: String) -> Self {
        Self {
            id,
            project_name,
            project_id,
            elapsed_seconds: 0,
            notes,
            state: TimerState::Stopped,
        }
    }

    pub(super) fn with_elapsed(self, elapsed_seconds: u64) -> Self {
        Self {
            elapsed_seconds,
            ..self
        }
    }

    pub fn id(&self) -> TimerId {
        self.id
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn display_time(&self) -> String {
        format_elapsed(self.elapsed_seconds)
    }

    /// Text of the start/pause button for this timer.
    pub fn action_label(&self) -> &'static str {
        match self.state {
            TimerState::Stopped => "Start",
            TimerState::Running => "Pause",
            TimerState::Paused => "Resume",
        }
    }

    /// Returns true if the timer was not running before.
    pub(super) fn start(&mut self) -> bool {
        let changed = self.state != TimerState::Running;
        self.state = TimerState::Running;
        changed
    }

    /// Only a running timer can be paused. Returns true if the state changed.
    pub(super) fn pause(&mut self) -> bool {
        if self.state == TimerState::Running {
            self.state = TimerState::Paused;
            true
        } else {
            false
        }
    }

    /// Advances the counter by a second if running. Returns true if the counter changed.
    pub(super) fn tick(&mut self) -> bool {
        if self.state == TimerState::Running {
            self.elapsed_seconds += 1;
            true
        } else {
            false
        }
    }

    pub(super) fn set_notes(&mut self, notes: String) {
        self.notes = notes;
    }

    pub fn to_record(&self) -> BackupRecord {
        BackupRecord {
            project_name: self.project_name.clone(),
            elapsed_time: self.elapsed_seconds,
            notes: self.notes.clone(),
        }
    }
}
