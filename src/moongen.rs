//! Driving MoonGen on the traffic generator.

use std::path::{Path, PathBuf};

use spurs::{cmd, Execute, SshShell, SshSpawnHandle};

use failure_derive::Fail;

use crate::{output::write_output, paths::*, rsync_from_remote, Login};

/// MoonGen device to transmit from.
const TX_DEV: usize = 0;

/// MoonGen device to receive on.
const RX_DEV: usize = 1;

/// Printed after MoonGen exits, followed by its exit status.
const EXIT_MARKER: &str = "MoonGen exit status: ";

#[derive(Debug, Fail, PartialEq, Eq)]
#[fail(display = "MoonGen exited with status {}; its output is in {}", exit, log)]
pub struct MoonGenFailed {
    pub exit: i32,
    pub log: String,
}

/// The command that replays the generated pcap at the given offered load and timestamps packets
/// in hardware. It leaves `HISTOGRAM_FILE` in the remote home.
///
/// - `moongen_path` is the path of the MoonGen checkout on the remote.
/// - `p4bench_path` is the path of the p4benchmark checkout on the remote.
pub fn run_cmd(moongen_path: &str, p4bench_path: &str, load: usize) -> String {
    format!(
        "sudo {} {} {} {} {} -l {}",
        dir!(moongen_path, MOONGEN_BINARY),
        dir!(p4bench_path, MOONGEN_TIMESTAMP_SCRIPT),
        TX_DEV,
        RX_DEV,
        GENERATED_PCAP,
        load
    )
}

/// Start MoonGen on a spawned shell at the given offered load. MoonGen exits on its own; join the
/// handle and pass it to `save_moongen_output`. The pcap must already have been generated on this
/// host by `gen_p4_program`.
///
/// A failing MoonGen does not fail the spawned command, so that its output can still be saved.
pub fn run_moongen(
    shell: &SshShell,
    moongen_path: &str,
    p4bench_path: &str,
    load: usize,
) -> Result<SshSpawnHandle, failure::Error> {
    Ok(shell.spawn(
        cmd!(
            "{} ; echo \"{}$?\"",
            run_cmd(moongen_path, p4bench_path, load),
            EXIT_MARKER
        )
        .use_bash()
        .allow_error(),
    )?)
}

/// The exit status `run_moongen` printed at the end of `stdout`, if any. Dry runs print nothing.
fn exit_status(stdout: &str) -> Option<i32> {
    stdout
        .lines()
        .rev()
        .find_map(|line| line.trim().strip_prefix(EXIT_MARKER))
        .and_then(|status| status.trim().parse().ok())
}

/// Wait for MoonGen to exit and record its output in `<output_dir>/MoonGen.txt`. The output is
/// recorded even if MoonGen failed, in which case `MoonGenFailed` is returned afterwards.
pub fn save_moongen_output(
    handle: SshSpawnHandle,
    output_dir: &Path,
) -> Result<PathBuf, failure::Error> {
    let (_shell, output) = handle.join();
    let output = output?;
    let log = write_output(
        output_dir,
        results::MOONGEN_LOG,
        &output.stdout,
        &output.stderr,
    )?;

    check_exit(&output.stdout, &log)?;

    Ok(log)
}

fn check_exit(stdout: &str, log: &Path) -> Result<(), MoonGenFailed> {
    match exit_status(stdout) {
        Some(exit) if exit != 0 => Err(MoonGenFailed {
            exit,
            log: log.display().to_string(),
        }),
        _ => Ok(()),
    }
}

/// Copy the histogram of the last MoonGen run into `output_dir`. Nothing is copied in a dry run.
pub fn copy_histogram<A>(
    login: &Login<A>,
    output_dir: &Path,
    dry_run: bool,
) -> Result<(), failure::Error>
where
    A: std::net::ToSocketAddrs + std::fmt::Display + Clone,
{
    if dry_run {
        log::info!(
            "Dry run: not copying {}:{} to {}",
            login.hostname,
            HISTOGRAM_FILE,
            output_dir.display()
        );
        return Ok(());
    }

    rsync_from_remote(login, HISTOGRAM_FILE, output_dir)
}
