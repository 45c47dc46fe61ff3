/*!
 * Process Tests
 * Real workloads driven by signals; serialized since they burn CPU
 */

#![cfg(unix)]

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use pretty_assertions::assert_eq;
use rr_dispatcher::monitoring::{Action, MemorySink};
use rr_dispatcher::process::execution::READY_LINE;
use rr_dispatcher::process::{Job, OsProcessControl, ProcessControl, ReadinessMode};
use rr_dispatcher::scheduler::Dispatcher;
use serial_test::serial;
use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const BURNER: &str = env!("CARGO_BIN_EXE_cpu-burner");

fn burner_control() -> OsProcessControl {
    OsProcessControl::new(BURNER)
        .unwrap()
        .with_readiness(ReadinessMode::Handshake, Duration::from_secs(5))
        .with_reap_grace(Duration::from_secs(2))
}

fn is_alive(os_pid: u32) -> bool {
    kill(Pid::from_raw(os_pid as i32), None).is_ok()
}

#[cfg(target_os = "linux")]
fn proc_state(os_pid: u32) -> Option<char> {
    let stat = std::fs::read_to_string(format!("/proc/{}/stat", os_pid)).ok()?;
    // Field 3, after the parenthesised command name
    stat.rsplit_once(')')?.1.trim_start().chars().next()
}

#[cfg(target_os = "linux")]
fn wait_for_state(os_pid: u32, wanted: impl Fn(char) -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if proc_state(os_pid).map_or(false, &wanted) {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
#[serial]
fn test_burner_handshake_and_clean_exit() {
    let mut child = Command::new(BURNER)
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();

    let mut line = String::new();
    BufReader::new(child.stdout.take().unwrap())
        .read_line(&mut line)
        .unwrap();
    assert_eq!(line.trim(), READY_LINE);

    kill(Pid::from_raw(child.id() as i32), Signal::SIGINT).unwrap();
    let status = child.wait().unwrap();
    assert!(status.success());
}

#[test]
#[serial]
#[cfg(target_os = "linux")]
fn test_burner_ignores_terminal_stop() {
    let mut control = burner_control();
    let job = Job::new(1, 0, 0, 1).unwrap();
    let os_pid = control.start(&job).unwrap();

    kill(Pid::from_raw(os_pid as i32), Signal::SIGTSTP).unwrap();
    thread::sleep(Duration::from_millis(100));
    assert_ne!(proc_state(os_pid), Some('T'));

    control.terminate(1, os_pid).unwrap();
    control.reap();
    assert!(!is_alive(os_pid));
}

#[test]
#[serial]
#[cfg(target_os = "linux")]
fn test_suspend_and_resume_reach_the_process() {
    let mut control = burner_control();
    let job = Job::new(1, 0, 0, 1).unwrap();
    let os_pid = control.start(&job).unwrap();

    control.suspend(1, os_pid).unwrap();
    assert!(wait_for_state(os_pid, |s| s == 'T'));

    control.resume(1, os_pid).unwrap();
    assert!(wait_for_state(os_pid, |s| s != 'T'));

    control.terminate(1, os_pid).unwrap();
    control.reap();
    assert!(!is_alive(os_pid));
}

#[test]
#[serial]
fn test_dispatch_real_workloads() {
    let jobs = vec![
        Job::new(1, 0, 0, 3).unwrap(),
        Job::new(2, 0, 0, 2).unwrap(),
    ];
    let sink = Arc::new(MemorySink::new());
    let mut dispatcher = Dispatcher::new(jobs, burner_control(), sink.clone())
        .unwrap()
        .with_tick_interval(Duration::from_millis(20));

    let outcome = dispatcher.run();

    assert!(outcome.all_settled());
    assert_eq!(sink.busy_sequence(), vec![1, 2, 1, 2, 1]);
    assert_eq!(dispatcher.control().count(), 0);
    for job in &outcome.jobs {
        let os_pid = job.os_pid().unwrap();
        assert!(!is_alive(os_pid), "job {} workload still alive", job.id);
    }
}

#[test]
#[serial]
fn test_finished_workloads_collected_while_running() {
    let jobs = (1..=4).map(|id| Job::new(id, 0, 0, 1).unwrap()).collect();
    let sink = Arc::new(MemorySink::new());
    let mut dispatcher = Dispatcher::new(jobs, burner_control(), sink.clone())
        .unwrap()
        .with_tick_interval(Duration::from_millis(150));

    while dispatcher.has_work() {
        dispatcher.step();
    }

    // Only the last termination is still outstanding before reaping
    assert_eq!(dispatcher.control().count(), 1);
    for id in 1..=3 {
        let os_pid = dispatcher.job(id).unwrap().os_pid().unwrap();
        assert!(!is_alive(os_pid), "job {} workload left unreaped", id);
        #[cfg(target_os = "linux")]
        assert_eq!(proc_state(os_pid), None);
    }
}

#[test]
#[serial]
fn test_shutdown_interrupts_real_workloads() {
    let jobs = vec![
        Job::new(1, 0, 0, 500).unwrap(),
        Job::new(2, 0, 0, 500).unwrap(),
    ];
    let sink = Arc::new(MemorySink::new());
    let shutdown = Arc::new(AtomicBool::new(false));
    let mut dispatcher = Dispatcher::new(jobs, burner_control(), sink.clone())
        .unwrap()
        .with_tick_interval(Duration::from_millis(20))
        .with_shutdown(Arc::clone(&shutdown));

    let flag = Arc::clone(&shutdown);
    let trigger = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        flag.store(true, Ordering::SeqCst);
    });

    let started = Instant::now();
    let outcome = dispatcher.run();
    trigger.join().unwrap();

    assert!(outcome.interrupted);
    assert!(started.elapsed() < Duration::from_secs(5));

    let interrupted: Vec<_> = sink
        .events()
        .iter()
        .filter(|e| e.action == Action::Interrupted)
        .map(|e| e.job)
        .collect();
    assert_eq!(interrupted.len(), 2);

    for job in &outcome.jobs {
        assert!(!is_alive(job.os_pid().unwrap()));
    }
}

#[test]
#[serial]
fn test_missing_workload_marks_job_failed() {
    let control = OsProcessControl::new("/nonexistent/rr-workload")
        .unwrap()
        .with_readiness(ReadinessMode::None, Duration::ZERO);
    let sink = Arc::new(MemorySink::new());
    let mut dispatcher =
        Dispatcher::new(vec![Job::new(1, 0, 0, 2).unwrap()], control, sink.clone()).unwrap();

    let outcome = dispatcher.run();

    assert_eq!(outcome.stats.failed, vec![1]);
    assert!(sink.busy_sequence().is_empty());
}
