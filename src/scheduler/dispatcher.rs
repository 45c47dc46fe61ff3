/*!
 * Round-Robin Dispatcher
 *
 * Single-queue, fixed-quantum (one tick) round robin over real workloads.
 * Every tick runs to completion, in this order:
 *
 * 1. Admission: jobs whose arrival time has been reached join the ready queue
 * 2. Advance: the running job is charged one tick; it terminates at zero
 *    remaining time, or is suspended and re-queued if another job is waiting
 * 3. Dispatch: an idle CPU takes the head of the ready queue, starting or
 *    resuming its workload
 * 4. Clock: sleep one tick interval, then advance the tick counter
 *
 * The loop ends once nothing is pending, ready or running. Remaining time is
 * pure bookkeeping: the dispatcher assumes, without checking, that a
 * workload does one tick of work for every tick it is marked running.
 */

use super::queue::{AdmissionQueue, ReadyQueue};
use super::stats::{DispatchStats, RunOutcome};
use crate::core::config::DispatcherConfig;
use crate::core::types::{JobId, Tick};
use crate::monitoring::{Action, EventSink};
use crate::process::{control, Job, JobState, ProcessControl, ProcessError, ProcessResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

/// Round-robin dispatcher over a fixed job set
pub struct Dispatcher<C: ProcessControl> {
    /// Job arena, sorted by id
    jobs: Vec<Job>,
    admission: AdmissionQueue,
    ready: ReadyQueue,
    current: Option<JobId>,
    control: C,
    sink: Arc<dyn EventSink>,
    tick: Tick,
    tick_interval: Duration,
    shutdown: Option<Arc<AtomicBool>>,
    stats: DispatchStats,
    run_id: Uuid,
}

impl<C: ProcessControl> Dispatcher<C> {
    /// Create a dispatcher; every job must be pending and have a unique id
    pub fn new(mut jobs: Vec<Job>, control: C, sink: Arc<dyn EventSink>) -> ProcessResult<Self> {
        jobs.sort_by_key(|job| job.id);

        if let Some(pair) = jobs.windows(2).find(|pair| pair[0].id == pair[1].id) {
            return Err(ProcessError::InvalidJob(format!(
                "duplicate job id {}",
                pair[0].id
            )));
        }
        if let Some(job) = jobs.iter().find(|job| job.state() != JobState::Pending) {
            return Err(ProcessError::InvalidJob(format!(
                "job {} is {:?}, expected Pending",
                job.id,
                job.state()
            )));
        }

        let admission = AdmissionQueue::from_jobs(&jobs);

        Ok(Self {
            jobs,
            admission,
            ready: ReadyQueue::new(),
            current: None,
            control,
            sink,
            tick: 0,
            tick_interval: Duration::ZERO,
            shutdown: None,
            stats: DispatchStats::default(),
            run_id: Uuid::new_v4(),
        })
    }

    /// Wall-clock pacing per tick (default: none)
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Flag polled once per tick; setting it stops every workload and ends the run
    pub fn with_shutdown(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = Some(flag);
        self
    }

    /// Apply pacing from the configuration
    pub fn with_config(self, config: &DispatcherConfig) -> Self {
        self.with_tick_interval(config.tick_interval)
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Current tick
    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Job occupying the CPU
    pub fn current(&self) -> Option<JobId> {
        self.current
    }

    /// Ready queue, head first
    pub fn ready_ids(&self) -> Vec<JobId> {
        self.ready.ids().collect()
    }

    /// Jobs still waiting for their arrival time
    pub fn pending_ids(&self) -> Vec<JobId> {
        self.admission.ids().collect()
    }

    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.slot(id).map(|idx| &self.jobs[idx])
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    pub fn control(&self) -> &C {
        &self.control
    }

    pub fn into_control(self) -> C {
        self.control
    }

    /// Anything left pending, ready or running
    pub fn has_work(&self) -> bool {
        !self.admission.is_empty() || !self.ready.is_empty() || self.current.is_some()
    }

    /// Run until every job has terminated (or failed), or shutdown is requested
    pub fn run(&mut self) -> RunOutcome {
        let span = info_span!("dispatch", run_id = %self.run_id);
        let _entered = span.enter();

        info!(
            jobs = self.jobs.len(),
            tick_interval_ms = self.tick_interval.as_millis() as u64,
            "Dispatcher starting"
        );

        let mut interrupted = false;
        while self.has_work() {
            if self.shutdown_requested() {
                warn!("Shutdown requested at tick {}, stopping workloads", self.tick);
                self.abort();
                interrupted = true;
                break;
            }
            self.step();
        }

        self.control.reap();

        info!(
            ticks = self.stats.ticks,
            dispatches = self.stats.dispatches,
            preemptions = self.stats.preemptions,
            completed = self.stats.completed,
            failed = self.stats.failed.len(),
            interrupted,
            "Dispatcher finished"
        );

        RunOutcome {
            run_id: self.run_id,
            stats: self.stats.clone(),
            interrupted,
            jobs: self.jobs.clone(),
        }
    }

    /// Execute exactly one tick
    pub fn step(&mut self) {
        self.admit();
        self.advance();
        self.dispatch();

        debug!(
            tick = self.tick,
            current = ?self.current,
            ready = self.ready.len(),
            pending = self.admission.len(),
            "tick complete"
        );

        if !self.tick_interval.is_zero() {
            thread::sleep(self.tick_interval);
        }
        self.tick += 1;
        self.stats.ticks = self.tick;
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    fn slot(&self, id: JobId) -> Option<usize> {
        self.jobs.binary_search_by_key(&id, |job| job.id).ok()
    }

    fn admit(&mut self) {
        for id in self.admission.admit(self.tick) {
            let Some(idx) = self.slot(id) else {
                error!("Admitted unknown job {}", id);
                continue;
            };
            set_state(&mut self.jobs[idx], JobState::Ready);
            self.ready.push(id);
            debug!("Job {} admitted at tick {}", id, self.tick);
        }
    }

    fn advance(&mut self) {
        let tick = self.tick;

        let Some(idx) = self.current.and_then(|id| self.slot(id)) else {
            self.current = None;
            self.sink.record(tick, None);
            return;
        };

        let job = &mut self.jobs[idx];
        let id = job.id;
        let remaining = match job.consume_tick() {
            Ok(remaining) => remaining,
            Err(e) => {
                error!("{}", e);
                self.current = None;
                self.sink.record(tick, None);
                return;
            }
        };
        self.sink.record(tick, Some(id));

        if remaining == 0 {
            self.sink.record_event(tick, id, Action::Terminated, 0);
            if let Err(e) = control::terminate(&mut self.control, job) {
                warn!("Terminate request for job {} failed: {}", id, e);
            }
            set_state(job, JobState::Terminated);
            job.note_completion(tick);
            self.current = None;
            self.stats.completed += 1;
        } else if !self.ready.is_empty() {
            self.sink.record_event(tick, id, Action::Suspended, remaining);
            if let Err(e) = control::suspend(&mut self.control, job) {
                warn!("Suspend request for job {} failed: {}", id, e);
            }
            set_state(job, JobState::Ready);
            self.ready.push(id);
            self.current = None;
            self.stats.preemptions += 1;
        }
    }

    fn dispatch(&mut self) {
        let tick = self.tick;

        while self.current.is_none() {
            let Some(id) = self.ready.pop() else {
                break;
            };
            let Some(idx) = self.slot(id) else {
                error!("Dequeued unknown job {}", id);
                continue;
            };
            let job = &mut self.jobs[idx];

            if job.is_started() {
                self.sink.record_event(tick, id, Action::Resumed, job.remaining());
                if let Err(e) = control::resume(&mut self.control, job) {
                    warn!("Resume request for job {} failed: {}", id, e);
                }
                set_state(job, JobState::Running);
            } else {
                match control::start(&mut self.control, job) {
                    Ok(os_pid) => {
                        self.sink.record_event(tick, id, Action::Started, job.remaining());
                        set_state(job, JobState::Running);
                        job.note_dispatch(tick);
                        debug!("Job {} bound to OS PID {}", id, os_pid);
                    }
                    Err(e) => {
                        // Never retried and never re-queued
                        warn!("Job {} failed to start: {}", id, e);
                        self.sink.record_event(tick, id, Action::Failed, job.remaining());
                        set_state(job, JobState::Failed);
                        self.stats.failed.push(id);
                        continue;
                    }
                }
            }

            self.current = Some(id);
            self.stats.dispatches += 1;
        }
    }

    /// Stop every live workload and empty all queues
    fn abort(&mut self) {
        let tick = self.tick;
        let active: Vec<JobId> = self
            .current
            .take()
            .into_iter()
            .chain(self.ready.drain())
            .collect();

        for id in active {
            let Some(idx) = self.slot(id) else {
                continue;
            };
            let job = &mut self.jobs[idx];
            if job.live_handle().is_none() {
                continue;
            }

            // A stopped workload only acts on the interrupt once continued
            if job.state() == JobState::Ready {
                if let Err(e) = control::resume(&mut self.control, job) {
                    warn!("Resume before shutdown failed for job {}: {}", id, e);
                }
            }
            if let Err(e) = control::terminate(&mut self.control, job) {
                warn!("Terminate on shutdown failed for job {}: {}", id, e);
            }
            self.sink.record_event(tick, id, Action::Interrupted, job.remaining());
        }

        self.admission = AdmissionQueue::new();
    }
}

fn set_state(job: &mut Job, to: JobState) {
    if let Err(e) = job.transition(to) {
        error!("{}", e);
    }
}
