/*!
 * Scheduler Queues
 *
 * Both queues hold job ids only; the jobs themselves stay in the
 * dispatcher's arena.
 */

use crate::core::types::{JobId, Tick};
use crate::process::Job;
use std::collections::VecDeque;

/// Jobs that have not arrived yet, ordered by (arrival, id)
#[derive(Debug, Clone, Default)]
pub struct AdmissionQueue {
    pending: VecDeque<(Tick, JobId)>,
}

impl AdmissionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue every job, sorted by arrival then id
    pub fn from_jobs<'a>(jobs: impl IntoIterator<Item = &'a Job>) -> Self {
        let mut pending: Vec<(Tick, JobId)> = jobs.into_iter().map(|j| (j.arrival, j.id)).collect();
        pending.sort_unstable();
        Self {
            pending: pending.into(),
        }
    }

    /// Remove and return, in order, every job whose arrival is `<= tick`
    ///
    /// Only the sorted prefix is scanned; the first future arrival stops it.
    pub fn admit(&mut self, tick: Tick) -> Vec<JobId> {
        let mut admitted = Vec::new();
        while let Some(&(arrival, id)) = self.pending.front() {
            if arrival > tick {
                break;
            }
            self.pending.pop_front();
            admitted.push(id);
        }
        admitted
    }

    /// Arrival of the next job to be admitted
    pub fn next_arrival(&self) -> Option<Tick> {
        self.pending.front().map(|(arrival, _)| *arrival)
    }

    pub fn ids(&self) -> impl Iterator<Item = JobId> + '_ {
        self.pending.iter().map(|(_, id)| *id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// FIFO rotation of jobs eligible to run
#[derive(Debug, Clone, Default)]
pub struct ReadyQueue {
    queue: VecDeque<JobId>,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue at the tail
    pub fn push(&mut self, id: JobId) {
        debug_assert!(!self.contains(id), "job {id} queued twice");
        self.queue.push_back(id);
    }

    /// Dequeue the head
    pub fn pop(&mut self) -> Option<JobId> {
        self.queue.pop_front()
    }

    pub fn front(&self) -> Option<JobId> {
        self.queue.front().copied()
    }

    pub fn contains(&self, id: JobId) -> bool {
        self.queue.contains(&id)
    }

    /// Drain every queued id, head first
    pub fn drain(&mut self) -> impl Iterator<Item = JobId> + '_ {
        self.queue.drain(..)
    }

    pub fn ids(&self) -> impl Iterator<Item = JobId> + '_ {
        self.queue.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: JobId, arrival: Tick) -> Job {
        Job::new(id, arrival, 0, 1).unwrap()
    }

    #[test]
    fn test_admission_sorted_by_arrival_then_id() {
        let jobs = vec![job(3, 2), job(1, 2), job(2, 0), job(4, 5)];
        let mut queue = AdmissionQueue::from_jobs(&jobs);

        assert_eq!(queue.ids().collect::<Vec<_>>(), vec![2, 1, 3, 4]);
        assert_eq!(queue.admit(0), vec![2]);
        assert_eq!(queue.admit(1), Vec::<JobId>::new());
        assert_eq!(queue.admit(3), vec![1, 3]);
        assert_eq!(queue.next_arrival(), Some(5));
    }

    #[test]
    fn test_admission_is_idempotent() {
        let jobs = vec![job(1, 0), job(2, 1)];
        let mut queue = AdmissionQueue::from_jobs(&jobs);

        assert_eq!(queue.admit(1), vec![1, 2]);
        assert!(queue.admit(1).is_empty());
        assert!(queue.admit(100).is_empty());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_late_tick_admits_everything_due() {
        let jobs = vec![job(1, 0), job(2, 3), job(3, 7)];
        let mut queue = AdmissionQueue::from_jobs(&jobs);
        assert_eq!(queue.admit(10), vec![1, 2, 3]);
    }

    #[test]
    fn test_ready_queue_fifo() {
        let mut ready = ReadyQueue::new();
        ready.push(1);
        ready.push(2);
        ready.push(3);

        assert_eq!(ready.pop(), Some(1));
        ready.push(1);
        assert_eq!(ready.ids().collect::<Vec<_>>(), vec![2, 3, 1]);
        assert_eq!(ready.front(), Some(2));
        assert_eq!(ready.len(), 3);
    }

    #[test]
    fn test_ready_queue_drain() {
        let mut ready = ReadyQueue::new();
        ready.push(5);
        ready.push(6);
        assert_eq!(ready.drain().collect::<Vec<_>>(), vec![5, 6]);
        assert!(ready.is_empty());
        assert_eq!(ready.pop(), None);
    }
}
