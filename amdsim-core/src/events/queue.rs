//! Priority queue of scheduled events.
//!
//! A binary min-heap keyed on the event ordering. The queue remembers the
//! date of the last event it handed out and refuses to accept events
//! scheduled before it, so simulated time can only move forward.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use chrono::NaiveDate;
use thiserror::Error;

use super::ScheduledEvent;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("Event for {patient} on {date} is earlier than current time {now}")]
    ScheduledInPast {
        patient: crate::patient::PatientId,
        date: NaiveDate,
        now: NaiveDate,
    },
}

#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<ScheduledEvent>>,
    now: Option<NaiveDate>,
    processed: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity),
            now: None,
            processed: 0,
        }
    }

    /// Schedules an event.
    #[inline]
    pub fn push(&mut self, event: ScheduledEvent) -> Result<(), EventError> {
        if let Some(now) = self.now {
            if event.date < now {
                return Err(EventError::ScheduledInPast {
                    patient: event.patient,
                    date: event.date,
                    now,
                });
            }
        }
        self.heap.push(Reverse(event));
        Ok(())
    }

    /// Removes the earliest event and advances current time to it.
    #[inline]
    pub fn pop(&mut self) -> Option<ScheduledEvent> {
        let Reverse(event) = self.heap.pop()?;
        self.now = Some(event.date);
        self.processed += 1;
        Some(event)
    }

    /// Date of the most recently popped event.
    pub fn now(&self) -> Option<NaiveDate> {
        self.now
    }

    /// Number of events popped so far.
    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
