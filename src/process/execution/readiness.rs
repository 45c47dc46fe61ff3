/*!
 * Workload Readiness
 *
 * A freshly spawned workload must actually be executing before the
 * dispatcher charges it for CPU time or sends it control signals. Instead of
 * sleeping for a guessed settle delay, the default mode waits for the
 * workload to announce itself with a single `ready` line on stdout.
 */

use crate::core::config::ConfigError;
use crate::core::types::JobId;
use std::io::{self, BufRead, BufReader};
use std::process::Child;
use std::str::FromStr;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Line a workload prints once its signal dispositions are in place
pub const READY_LINE: &str = "ready";

/// How `start` waits for a spawned workload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessMode {
    /// Block until the workload prints [`READY_LINE`] (bounded by a timeout)
    Handshake,
    /// Sleep for a fixed settle delay
    Delay(Duration),
    /// Return immediately after spawning
    None,
}

impl ReadinessMode {
    /// Whether the workload's stdout has to be piped back to us
    #[inline]
    #[must_use]
    pub const fn needs_stdout(self) -> bool {
        matches!(self, ReadinessMode::Handshake)
    }
}

impl FromStr for ReadinessMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        match value {
            "handshake" => Ok(ReadinessMode::Handshake),
            "none" => Ok(ReadinessMode::None),
            _ => value
                .strip_prefix("delay:")
                .and_then(|ms| ms.trim().parse::<u64>().ok())
                .map(|ms| ReadinessMode::Delay(Duration::from_millis(ms)))
                .ok_or_else(|| ConfigError::InvalidReadiness(value.to_string())),
        }
    }
}

/// Result of waiting on a workload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The workload announced itself
    Ready,
    /// Fixed delay elapsed
    Settled,
    /// No wait requested
    Skipped,
    /// Nothing arrived within the timeout
    TimedOut,
    /// The workload printed something other than the ready line
    Unexpected,
    /// The workload closed stdout (most likely exited) before announcing itself
    Closed,
}

/// Wait for `child` according to `mode`
///
/// Never fails: a workload that does not complete the handshake is still
/// considered started, and the outcome is only logged.
pub(crate) fn await_ready(
    child: &mut Child,
    job: JobId,
    mode: ReadinessMode,
    timeout: Duration,
) -> Readiness {
    match mode {
        ReadinessMode::None => Readiness::Skipped,
        ReadinessMode::Delay(delay) => {
            thread::sleep(delay);
            Readiness::Settled
        }
        ReadinessMode::Handshake => handshake(child, job, timeout),
    }
}

fn handshake(child: &mut Child, job: JobId, timeout: Duration) -> Readiness {
    let Some(stdout) = child.stdout.take() else {
        warn!("Job {} spawned without a stdout pipe, skipping handshake", job);
        return Readiness::Skipped;
    };

    let (tx, rx) = flume::bounded(1);

    // The reader keeps draining after the first line so later output can
    // never block the workload on a full pipe.
    let spawned = thread::Builder::new()
        .name(format!("job-{}-stdout", job))
        .spawn(move || {
            let mut reader = BufReader::new(stdout);
            let mut first = String::new();
            if matches!(reader.read_line(&mut first), Ok(n) if n > 0) {
                let _ = tx.send(first.trim() == READY_LINE);
            }
            drop(tx);
            let _ = io::copy(&mut reader, &mut io::sink());
        });

    if let Err(e) = spawned {
        warn!("Could not start readiness reader for job {}: {}", job, e);
        return Readiness::Skipped;
    }

    let outcome = match rx.recv_timeout(timeout) {
        Ok(true) => Readiness::Ready,
        Ok(false) => Readiness::Unexpected,
        Err(flume::RecvTimeoutError::Timeout) => Readiness::TimedOut,
        Err(flume::RecvTimeoutError::Disconnected) => Readiness::Closed,
    };

    match outcome {
        Readiness::Ready => debug!("Job {} workload ready", job),
        other => warn!("Job {} workload readiness: {:?}", job, other),
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::{Command, Stdio};

    #[test]
    fn test_parse_modes() {
        assert_eq!("handshake".parse(), Ok(ReadinessMode::Handshake));
        assert_eq!(" none ".parse(), Ok(ReadinessMode::None));
        assert_eq!(
            "delay:200".parse(),
            Ok(ReadinessMode::Delay(Duration::from_millis(200)))
        );
        assert!("delay:soon".parse::<ReadinessMode>().is_err());
        assert!("eventually".parse::<ReadinessMode>().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_handshake_ready() {
        let mut child = Command::new("sh")
            .args(["-c", "echo ready; sleep 5"])
            .stdout(Stdio::piped())
            .spawn()
            .unwrap();

        let outcome = await_ready(&mut child, 1, ReadinessMode::Handshake, Duration::from_secs(5));
        assert_eq!(outcome, Readiness::Ready);
        child.kill().ok();
        child.wait().ok();
    }

    #[cfg(unix)]
    #[test]
    fn test_handshake_unexpected_line() {
        let mut child = Command::new("sh")
            .args(["-c", "echo hello; sleep 5"])
            .stdout(Stdio::piped())
            .spawn()
            .unwrap();

        let outcome = await_ready(&mut child, 1, ReadinessMode::Handshake, Duration::from_secs(5));
        assert_eq!(outcome, Readiness::Unexpected);
        child.kill().ok();
        child.wait().ok();
    }

    #[cfg(unix)]
    #[test]
    fn test_handshake_timeout() {
        let mut child = Command::new("sleep")
            .arg("5")
            .stdout(Stdio::piped())
            .spawn()
            .unwrap();

        let outcome = await_ready(
            &mut child,
            1,
            ReadinessMode::Handshake,
            Duration::from_millis(50),
        );
        assert_eq!(outcome, Readiness::TimedOut);
        child.kill().ok();
        child.wait().ok();
    }

    #[cfg(unix)]
    #[test]
    fn test_handshake_closed() {
        let mut child = Command::new("true").stdout(Stdio::piped()).spawn().unwrap();

        let outcome = await_ready(&mut child, 1, ReadinessMode::Handshake, Duration::from_secs(5));
        assert_eq!(outcome, Readiness::Closed);
        child.wait().ok();
    }

    #[test]
    fn test_no_pipe_is_skipped() {
        let mut child = Command::new("true").stdout(Stdio::null()).spawn().unwrap();

        let outcome = await_ready(&mut child, 1, ReadinessMode::Handshake, Duration::from_secs(1));
        assert_eq!(outcome, Readiness::Skipped);
        child.wait().ok();
    }
}
