use anyhow::Result;
use tracing::{debug, error, info, warn};

use crate::storage::backup::{BackupSnapshot, BackupStore};

use super::{
    summary::SummaryRow,
    timer::{ProjectTimer, TimerState},
    TimerId,
};

/// Result of delivering a tick to a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The timer was removed, nothing should be scheduled for it anymore.
    Gone,
    /// The timer exists but isn't running. It still needs the next tick.
    Idle,
    /// The counter advanced to the contained value and the backup was written.
    Advanced(u64),
}

/// Owns all timers in creation order and is the unit of persistence.
///
/// Every method that starts a timer pauses all the others first, so at most one timer is running
/// at any point. Methods that persist state do it on a best-effort basis: a failed backup write is
/// logged and the in-memory state stays as is.
pub struct TimerCollection<S> {
    timers: Vec<ProjectTimer>,
    next_id: u64,
    store: S,
}

impl<S: BackupStore> TimerCollection<S> {
    pub fn new(store: S) -> Self {
        Self {
            timers: Vec::new(),
            next_id: 0,
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn allocate_id(&mut self) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        id
    }

    fn position(&self, id: TimerId) -> Option<usize> {
        self.timers.iter().position(|timer| timer.id() == id)
    }

    fn get_mut(&mut self, id: TimerId) -> Option<&mut ProjectTimer> {
        self.timers.iter_mut().find(|timer| timer.id() == id)
    }

    pub fn get(&self, id: TimerId) -> Option<&ProjectTimer> {
        self.timers.iter().find(|timer| timer.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProjectTimer> {
        self.timers.iter()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Handle of the timer at a 0-based display position.
    pub fn id_at(&self, position: usize) -> Option<TimerId> {
        self.timers.get(position).map(ProjectTimer::id)
    }

    /// Creates a timer, starts it and writes the backup.
    ///
    /// Project ids are not checked for uniqueness. Two timers with the same project id share a
    /// single backup entry and only the later one in the collection survives a restart.
    pub async fn create(
        &mut self,
        project_name: impl Into<String>,
        project_id: impl Into<String>,
        notes: impl Into<String>,
    ) -> TimerId {
        let project_id = project_id.into();
        if self.timers.iter().any(|timer| timer.project_id() == project_id) {
            warn!("Project id {project_id} is already in use, backup will only keep one of them");
        }

        let id = self.allocate_id();
        self.timers.push(ProjectTimer::new(
            id,
            project_name.into(),
            project_id,
            notes.into(),
        ));
        self.start(id);
        info!("Created timer {id}");
        self.persist().await;
        id
    }

    /// Starts or resumes a timer, pausing every other one. Returns false if the timer doesn't
    /// exist.
    pub fn start(&mut self, id: TimerId) -> bool {
        let Some(timer) = self.get_mut(id) else {
            return false;
        };
        if timer.start() {
            debug!("Timer {id} is running");
        }
        self.pause_all_except(id);
        true
    }

    /// Returns false if the timer doesn't exist.
    pub fn pause(&mut self, id: TimerId) -> bool {
        let Some(timer) = self.get_mut(id) else {
            return false;
        };
        if timer.pause() {
            debug!("Timer {id} paused");
        }
        true
    }

    /// Behaves like the start/pause button of a timer. Returns the new state.
    pub fn toggle(&mut self, id: TimerId) -> Option<TimerState> {
        let state = self.get(id)?.state();
        match state {
            TimerState::Running => {
                self.pause(id);
            }
            TimerState::Stopped | TimerState::Paused => {
                self.start(id);
            }
        }
        self.get(id).map(ProjectTimer::state)
    }

    /// Pauses every running timer except `active`.
    pub fn pause_all_except(&mut self, active: TimerId) {
        for timer in self.timers.iter_mut().filter(|timer| timer.id() != active) {
            if timer.pause() {
                debug!("Timer {} paused in favour of {active}", timer.id());
            }
        }
    }

    pub fn any_running(&self) -> bool {
        self.timers.iter().any(ProjectTimer::is_running)
    }

    /// Removes a timer if the user confirmed it. Returns true if the timer was removed.
    pub async fn remove(&mut self, id: TimerId, confirmed: bool) -> bool {
        if !confirmed {
            debug!("Removal of {id} was not confirmed");
            return false;
        }
        let Some(position) = self.position(id) else {
            return false;
        };
        let timer = self.timers.remove(position);
        info!(
            "Removed timer {id} for {} at {}",
            timer.project_id(),
            timer.display_time()
        );
        self.persist().await;
        true
    }

    /// Recreates timers from a backup in the order they were saved. Each one is started as it is
    /// restored, so only the last one ends up running. Returns handles of restored timers.
    pub fn restore_from_backup(&mut self, records: BackupSnapshot) -> Vec<TimerId> {
        let mut restored = Vec::with_capacity(records.len());
        for (project_id, record) in records {
            let id = self.allocate_id();
            self.timers.push(
                ProjectTimer::new(id, record.project_name, project_id, record.notes)
                    .with_elapsed(record.elapsed_time),
            );
            self.start(id);
            restored.push(id);
        }
        info!("Restored {} timers", restored.len());
        restored
    }

    /// Replaces notes of a timer and writes the backup. Returns false if the timer doesn't exist.
    pub async fn set_notes(&mut self, id: TimerId, notes: impl Into<String>) -> bool {
        let Some(timer) = self.get_mut(id) else {
            return false;
        };
        timer.set_notes(notes.into());
        self.persist().await;
        true
    }

    /// Delivers one tick. Only a running timer advances, and only then is the backup written.
    pub async fn tick(&mut self, id: TimerId) -> TickOutcome {
        let Some(timer) = self.get_mut(id) else {
            return TickOutcome::Gone;
        };
        if !timer.tick() {
            return TickOutcome::Idle;
        }
        let elapsed = timer.elapsed_seconds();
        debug!("Timer {id} at {}", timer.display_time());
        self.persist().await;
        TickOutcome::Advanced(elapsed)
    }

    /// State of every timer keyed by project id.
    pub fn snapshot(&self) -> BackupSnapshot {
        self.timers
            .iter()
            .map(|timer| (timer.project_id().to_string(), timer.to_record()))
            .collect()
    }

    pub async fn write_backup(&self) -> Result<()> {
        self.store.save(&self.snapshot()).await
    }

    async fn persist(&self) {
        if let Err(e) = self.write_backup().await {
            error!("Failed to write backup {e:?}");
        }
    }

    pub fn export_summary(&self) -> Vec<SummaryRow> {
        self.timers
            .iter()
            .map(|timer| {
                SummaryRow::new(
                    timer.project_id(),
                    timer.project_name(),
                    timer.elapsed_seconds(),
                )
            })
            .collect()
    }
}
