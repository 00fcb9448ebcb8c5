//! Cancellable delayed tasks for the control thread
//!
//! Recurring events (sirens, thunder, rain droplets) are modelled as one-shot
//! tasks that reschedule themselves when they fire. Every task gets a
//! [`TaskHandle`] that can be revoked; a revoked task never fires.

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Revocable handle to a scheduled task
    pub struct TaskHandle;
}

/// A pending task
#[derive(Debug)]
struct Task<T> {
    due: f64,
    seq: u64,
    payload: T,
}

/// Control-thread timer queue driven by `advance(dt)`
#[derive(Debug)]
pub struct Scheduler<T> {
    tasks: SlotMap<TaskHandle, Task<T>>,
    now: f64,
    next_seq: u64,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    /// Create an empty scheduler at time zero
    pub fn new() -> Self {
        Self {
            tasks: SlotMap::with_key(),
            now: 0.0,
            next_seq: 0,
        }
    }

    /// Current scheduler time in seconds
    pub const fn now(&self) -> f64 {
        self.now
    }

    /// Run `payload` after `delay` seconds
    pub fn schedule(&mut self, delay: f32, payload: T) -> TaskHandle {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.tasks.insert(Task {
            due: self.now + f64::from(delay.max(0.0)),
            seq,
            payload,
        })
    }

    /// Revoke a task; returns its payload if it had not fired yet
    pub fn cancel(&mut self, handle: TaskHandle) -> Option<T> {
        self.tasks.remove(handle).map(|task| task.payload)
    }

    /// Revoke every pending task
    pub fn cancel_all(&mut self) {
        self.tasks.clear();
    }

    /// Whether `handle` is still waiting to fire
    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.tasks.contains_key(handle)
    }

    /// Number of tasks waiting to fire
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Seconds until `handle` fires
    pub fn remaining(&self, handle: TaskHandle) -> Option<f32> {
        self.tasks.get(handle).map(|task| (task.due - self.now).max(0.0) as f32)
    }

    /// Move time forward and take every task that became due, oldest first
    pub fn advance(&mut self, delta_time: f32) -> Vec<(TaskHandle, T)> {
        self.now += f64::from(delta_time.max(0.0));
        let now = self.now;

        let mut due: Vec<(TaskHandle, f64, u64)> = self
            .tasks
            .iter()
            .filter(|(_, task)| task.due <= now)
            .map(|(handle, task)| (handle, task.due, task.seq))
            .collect();
        due.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.2.cmp(&b.2)));

        due.into_iter()
            .filter_map(|(handle, _, _)| self.tasks.remove(handle).map(|task| (handle, task.payload)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tasks_fire_when_due() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(1.0, "a");
        scheduler.schedule(0.5, "b");
        assert!(scheduler.advance(0.4).is_empty());

        let fired: Vec<_> = scheduler.advance(0.2).into_iter().map(|(_, p)| p).collect();
        assert_eq!(fired, vec!["b"]);
        assert_eq!(scheduler.pending(), 1);

        let fired: Vec<_> = scheduler.advance(1.0).into_iter().map(|(_, p)| p).collect();
        assert_eq!(fired, vec!["a"]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_due_tasks_come_out_in_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(3.0, 3);
        scheduler.schedule(1.0, 1);
        scheduler.schedule(2.0, 2);
        scheduler.schedule(1.0, 4);
        let fired: Vec<_> = scheduler.advance(5.0).into_iter().map(|(_, p)| p).collect();
        assert_eq!(fired, vec![1, 4, 2, 3]);
    }

    #[test]
    fn test_cancelled_task_never_fires() {
        let mut scheduler = Scheduler::new();
        let handle = scheduler.schedule(1.0, ());
        assert!(scheduler.is_pending(handle));
        assert_eq!(scheduler.cancel(handle), Some(()));
        assert!(!scheduler.is_pending(handle));
        assert!(scheduler.advance(10.0).is_empty());
        assert_eq!(scheduler.cancel(handle), None);
    }

    #[test]
    fn test_stale_handle_does_not_cancel_new_task() {
        let mut scheduler = Scheduler::new();
        let old = scheduler.schedule(1.0, "old");
        scheduler.cancel(old);
        let new = scheduler.schedule(1.0, "new");
        assert_eq!(scheduler.cancel(old), None);
        assert!(scheduler.is_pending(new));
    }

    #[test]
    fn test_cancel_all() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(1.0, 1);
        scheduler.schedule(2.0, 2);
        scheduler.cancel_all();
        assert_eq!(scheduler.pending(), 0);
        assert!(scheduler.advance(5.0).is_empty());
    }

    #[test]
    fn test_remaining() {
        let mut scheduler = Scheduler::new();
        let handle = scheduler.schedule(2.0, ());
        scheduler.advance(0.5);
        assert_eq!(scheduler.remaining(handle), Some(1.5));
    }
}
