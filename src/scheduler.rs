//! Delayed-task queue over a virtual millisecond clock.
//!
//! The engine never sleeps. Continuations are queued with a delay and run when the caller
//! advances the clock past their due time, one at a time, earliest first and in scheduling
//! order for equal due times. Tests drive the clock with plain numbers.

/// Milliseconds on the engine clock.
pub type Millis = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

#[derive(Debug)]
struct Scheduled<T> {
    id: TaskId,
    due: Millis,
    task: T,
}

#[derive(Debug)]
pub struct Scheduler<T> {
    now: Millis,
    next_id: u64,
    queue: Vec<Scheduled<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now: 0,
            next_id: 0,
            queue: Vec::new(),
        }
    }

    pub fn now(&self) -> Millis {
        self.now
    }

    pub fn schedule(&mut self, delay: Millis, task: T) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.queue.push(Scheduled {
            id,
            due: self.now.saturating_add(delay),
            task,
        });
        id
    }

    /// Drop a pending task. Returns false if it already ran or was cancelled.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.queue.len();
        self.queue.retain(|s| s.id != id);
        self.queue.len() != before
    }

    /// Next task due at or before `until`. The clock moves to that task's due time.
    pub fn pop_due(&mut self, until: Millis) -> Option<T> {
        let idx = self
            .queue
            .iter()
            .enumerate()
            .filter(|(_, s)| s.due <= until)
            .min_by_key(|(_, s)| (s.due, s.id.0))
            .map(|(i, _)| i)?;
        let scheduled = self.queue.swap_remove(idx);
        self.now = self.now.max(scheduled.due);
        Some(scheduled.task)
    }

    /// Move the clock forward without running anything. Never moves backwards.
    pub fn advance_to(&mut self, now: Millis) {
        self.now = self.now.max(now);
    }
}
