//! The job store — authoritative collection of pending reminder jobs.
//!
//! Jobs live in an id-indexed map plus a queue of ids sorted ascending by
//! next occurrence (ties keep insertion order). Every mutation writes a
//! full snapshot through the brain before it reports success; a failed
//! write rolls the in-memory state back so memory and disk never diverge.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;

use crate::brain::Brain;
use crate::reminder::error::ReminderError;
use crate::reminder::parse;
use crate::reminder::types::{Job, PersistedJob};

pub struct JobStore {
    next_id: u64,
    jobs: HashMap<u64, PersistedJob>,
    /// Job ids sorted ascending by `next`, stable on ties.
    order: Vec<u64>,
    brain: Box<dyn Brain>,
    store_key: String,
}

impl JobStore {
    /// Open the store, loading whatever the brain has under `store_key`.
    pub fn open(brain: Box<dyn Brain>, store_key: &str) -> Result<Self, ReminderError> {
        let loaded = brain
            .load(store_key)
            .map_err(ReminderError::Persistence)?
            .unwrap_or_default();
        let mut store = Self {
            next_id: 1,
            jobs: HashMap::new(),
            order: Vec::new(),
            brain,
            store_key: store_key.to_string(),
        };
        for job in loaded {
            store.next_id = store.next_id.max(job.id + 1);
            store.insert_sorted(job);
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&PersistedJob> {
        self.jobs.get(&id)
    }

    /// Next occurrence of the earliest pending job.
    pub fn front_next(&self) -> Option<DateTime<Utc>> {
        self.order
            .first()
            .and_then(|id| self.jobs.get(id))
            .map(|j| j.job.next)
    }

    /// Admit a new job: allocate its id, insert in order, persist.
    pub fn add_job(&mut self, job: Job) -> Result<PersistedJob, ReminderError> {
        let id = self.next_id;
        self.next_id += 1;
        let persisted = PersistedJob { id, job };
        self.insert_sorted(persisted.clone());
        if let Err(err) = self.persist() {
            self.take(id);
            self.next_id = id;
            return Err(err);
        }
        Ok(persisted)
    }

    pub fn remove_job(&mut self, id: u64) -> Result<PersistedJob, ReminderError> {
        let job = self.take(id).ok_or(ReminderError::JobNotFound(id))?;
        if let Err(err) = self.persist() {
            self.insert_sorted(job);
            return Err(err);
        }
        Ok(job)
    }

    pub fn update_message(&mut self, id: u64, message: &str) -> Result<PersistedJob, ReminderError> {
        let job = self
            .jobs
            .get_mut(&id)
            .ok_or(ReminderError::JobNotFound(id))?;
        let previous = std::mem::replace(&mut job.job.message_info.message, message.to_string());
        let updated = job.clone();
        if let Err(err) = self.persist() {
            if let Some(job) = self.jobs.get_mut(&id) {
                job.job.message_info.message = previous;
            }
            return Err(err);
        }
        Ok(updated)
    }

    /// Replace a job's schedule from free text. The new spec is parsed
    /// before anything is touched; on a parse failure the job is left
    /// exactly as it was.
    pub fn update_spec(
        &mut self,
        id: u64,
        spec_text: &str,
        tz: Tz,
        now: DateTime<Utc>,
    ) -> Result<PersistedJob, ReminderError> {
        if !self.jobs.contains_key(&id) {
            return Err(ReminderError::JobNotFound(id));
        }
        let definition = parse::parse_spec(spec_text, tz, now)?;

        let Some(original) = self.take(id) else {
            return Err(ReminderError::JobNotFound(id));
        };
        let mut updated = original.clone();
        updated.job.kind = definition.kind;
        updated.job.spec = definition.spec;
        updated.job.next = definition.next;
        self.insert_sorted(updated.clone());

        if let Err(err) = self.persist() {
            self.take(id);
            self.insert_sorted(original);
            return Err(err);
        }
        Ok(updated)
    }

    /// Jobs for the given rooms, ascending by next occurrence. An empty
    /// room list means all jobs.
    pub fn jobs_for_rooms(&self, rooms: &[String]) -> Vec<PersistedJob> {
        self.order
            .iter()
            .filter_map(|id| self.jobs.get(id))
            .filter(|j| rooms.is_empty() || rooms.contains(&j.job.message_info.room))
            .cloned()
            .collect()
    }

    /// Atomically remove and return the prefix of jobs due at `now`
    /// (queue order preserved). The caller is responsible for re-adding
    /// recurring jobs and persisting afterwards.
    pub fn claim_due(&mut self, now: DateTime<Utc>) -> Vec<PersistedJob> {
        let mut due = Vec::new();
        while let Some(&id) = self.order.first() {
            match self.jobs.get(&id) {
                Some(job) if job.job.next <= now => {
                    self.order.remove(0);
                    if let Some(job) = self.jobs.remove(&id) {
                        due.push(job);
                    }
                }
                _ => break,
            }
        }
        due
    }

    /// Put a claimed job back (with a recomputed `next`). Keeps the job's
    /// existing id.
    pub fn reinsert(&mut self, job: PersistedJob) {
        self.take(job.id);
        self.insert_sorted(job);
    }

    /// Write the full job snapshot through the brain.
    pub fn persist(&self) -> Result<(), ReminderError> {
        let snapshot = self.jobs_for_rooms(&[]);
        self.brain
            .save(&self.store_key, &snapshot)
            .map_err(ReminderError::Persistence)
    }

    fn insert_sorted(&mut self, job: PersistedJob) {
        let pos = self.order.partition_point(|id| {
            self.jobs
                .get(id)
                .map(|j| j.job.next <= job.job.next)
                .unwrap_or(false)
        });
        self.order.insert(pos, job.id);
        self.jobs.insert(job.id, job);
    }

    fn take(&mut self, id: u64) -> Option<PersistedJob> {
        let job = self.jobs.remove(&id)?;
        self.order.retain(|other| *other != id);
        Some(job)
    }
}
