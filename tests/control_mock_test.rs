/*!
 * Process Control Ordering Tests
 * Verifies the exact control requests the dispatcher issues, in order
 */

use mockall::{mock, predicate::eq, Sequence};
use rr_dispatcher::core::types::{JobId, OsPid};
use rr_dispatcher::monitoring::NullSink;
use rr_dispatcher::process::{Job, ProcessControl, ProcessError, ProcessResult};
use rr_dispatcher::scheduler::Dispatcher;
use std::sync::Arc;

mock! {
    pub Control {}

    impl ProcessControl for Control {
        fn start(&mut self, job: &Job) -> ProcessResult<OsPid>;
        fn suspend(&mut self, job: JobId, os_pid: OsPid) -> ProcessResult<()>;
        fn resume(&mut self, job: JobId, os_pid: OsPid) -> ProcessResult<()>;
        fn terminate(&mut self, job: JobId, os_pid: OsPid) -> ProcessResult<()>;
        fn reap(&mut self);
    }
}

fn expect_start(control: &mut MockControl, seq: &mut Sequence, id: JobId, os_pid: OsPid) {
    control
        .expect_start()
        .withf(move |job: &Job| job.id == id)
        .times(1)
        .in_sequence(seq)
        .returning(move |_| Ok(os_pid));
}

#[test]
fn test_alternating_jobs_call_order() {
    let mut control = MockControl::new();
    let mut seq = Sequence::new();

    expect_start(&mut control, &mut seq, 1, 501);
    control.expect_suspend().with(eq(1), eq(501)).times(1).in_sequence(&mut seq).returning(|_, _| Ok(()));
    expect_start(&mut control, &mut seq, 2, 502);
    control.expect_terminate().with(eq(2), eq(502)).times(1).in_sequence(&mut seq).returning(|_, _| Ok(()));
    control.expect_resume().with(eq(1), eq(501)).times(1).in_sequence(&mut seq).returning(|_, _| Ok(()));
    control.expect_terminate().with(eq(1), eq(501)).times(1).in_sequence(&mut seq).returning(|_, _| Ok(()));
    control.expect_reap().times(1).in_sequence(&mut seq).return_const(());

    let jobs = vec![Job::new(1, 0, 0, 2).unwrap(), Job::new(2, 0, 0, 1).unwrap()];
    let mut dispatcher = Dispatcher::new(jobs, control, Arc::new(NullSink)).unwrap();
    let outcome = dispatcher.run();

    assert!(outcome.all_settled());
    assert_eq!(outcome.stats.preemptions, 1);
}

#[test]
fn test_failed_start_never_signalled() {
    let mut control = MockControl::new();
    let mut seq = Sequence::new();

    control
        .expect_start()
        .withf(|job: &Job| job.id == 1)
        .times(1)
        .in_sequence(&mut seq)
        .returning(|job| {
            Err(ProcessError::SpawnFailed {
                job: job.id,
                reason: "no such file".to_string(),
            })
        });
    expect_start(&mut control, &mut seq, 2, 700);
    control.expect_terminate().with(eq(2), eq(700)).times(1).in_sequence(&mut seq).returning(|_, _| Ok(()));
    control.expect_reap().times(1).return_const(());
    control.expect_suspend().never();
    control.expect_resume().never();

    let jobs = vec![Job::new(1, 0, 0, 3).unwrap(), Job::new(2, 0, 0, 1).unwrap()];
    let mut dispatcher = Dispatcher::new(jobs, control, Arc::new(NullSink)).unwrap();
    let outcome = dispatcher.run();

    assert_eq!(outcome.stats.failed, vec![1]);
}

#[test]
fn test_signal_errors_do_not_stop_the_loop() {
    let mut control = MockControl::new();

    control.expect_start().returning(|job| Ok(900 + job.id));
    control.expect_suspend().returning(|job, os_pid| {
        Err(ProcessError::SignalFailed {
            job,
            os_pid,
            reason: "ESRCH".to_string(),
        })
    });
    control.expect_resume().returning(|_, _| Ok(()));
    control.expect_terminate().times(2).returning(|_, _| Ok(()));
    control.expect_reap().times(1).return_const(());

    let jobs = vec![Job::new(1, 0, 0, 3).unwrap(), Job::new(2, 1, 0, 2).unwrap()];
    let mut dispatcher = Dispatcher::new(jobs, control, Arc::new(NullSink)).unwrap();
    let outcome = dispatcher.run();

    assert!(outcome.all_settled());
    assert_eq!(outcome.stats.completed, 2);
}
