/*!
 * CPU Burner
 *
 * Workload spawned once per job. Spins until SIGINT, then exits cleanly.
 * SIGTSTP and SIGCONT are ignored so only the dispatcher's SIGSTOP can pause
 * it. Prints a single `ready` line once its signal dispositions are in place.
 */

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

static EXIT: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn on_interrupt(_signal: nix::libc::c_int) {
    EXIT.store(true, Ordering::SeqCst);
}

#[cfg(unix)]
fn install_handlers() -> anyhow::Result<()> {
    use nix::sys::signal::{sigaction, signal, SaFlags, SigAction, SigHandler, SigSet, Signal};

    let interrupt = SigAction::new(
        SigHandler::Handler(on_interrupt),
        SaFlags::empty(),
        SigSet::empty(),
    );
    // SAFETY: the handler only stores to an atomic
    unsafe {
        sigaction(Signal::SIGINT, &interrupt)?;
        signal(Signal::SIGTSTP, SigHandler::SigIgn)?;
        signal(Signal::SIGCONT, SigHandler::SigIgn)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn install_handlers() -> anyhow::Result<()> {
    anyhow::bail!("cpu-burner requires Unix signals")
}

fn main() -> anyhow::Result<()> {
    install_handlers()?;

    // The dispatcher may have closed the pipe already; nothing to do about it
    let mut stdout = std::io::stdout().lock();
    let _ = writeln!(stdout, "{}", rr_dispatcher::process::execution::READY_LINE);
    let _ = stdout.flush();
    drop(stdout);

    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    while !EXIT.load(Ordering::Relaxed) {
        state = std::hint::black_box(
            state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407),
        );
    }

    Ok(())
}
