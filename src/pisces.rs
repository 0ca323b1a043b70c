//! Controlling the PISCES switch: compiling the generated program into it, running it, inspecting
//! it with `ovs-ofctl`, and stopping it.
//!
//! The switch runs on a spawned shell. Its output is only available once the spawned command
//! exits, which happens after `stop_pisces`.

use std::path::{Path, PathBuf};

use spurs::{cmd, Execute, SshShell, SshSpawnHandle};

use crate::{output::write_output, paths::*};

/// The OpenFlow version used when talking to the switch.
const OPENFLOW_PROTOCOL: &str = "OpenFlow15";

/// The command that compiles `GENERATED_P4_PROGRAM` into the switch. Runs in `REMOTE_WORK_DIR`.
pub fn compile_cmd(p4bench_path: &str) -> String {
    format!(
        "python {} -p {} -c",
        dir!(p4bench_path, PISCES_SCRIPT),
        GENERATED_P4_PROGRAM
    )
}

/// The command that starts the switch and installs the given rules. Runs in `REMOTE_WORK_DIR`.
pub fn run_cmd(p4bench_path: &str, rule_file: &str) -> String {
    format!("python {} -r {}", dir!(p4bench_path, PISCES_SCRIPT), rule_file)
}

/// The command that kills a running switch.
pub fn stop_cmd(p4bench_path: &str) -> String {
    format!("python {} -k", dir!(p4bench_path, PISCES_SCRIPT))
}

/// The default rules file for the given p4benchmark checkout.
pub fn default_rule_file(p4bench_path: &str) -> String {
    dir!(p4bench_path, PISCES_RULES)
}

/// A piece of switch state that can be dumped with `ovs-ofctl`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OfctlDump {
    Flows,
    Ports,
}

impl OfctlDump {
    fn subcommand(&self) -> &'static str {
        match self {
            OfctlDump::Flows => "dump-flows",
            OfctlDump::Ports => "dump-ports",
        }
    }

    /// The name of the local file the dump is written to.
    pub fn file_name(&self) -> &'static str {
        match self {
            OfctlDump::Flows => results::DUMP_FLOWS,
            OfctlDump::Ports => results::DUMP_PORTS,
        }
    }

    /// The command that prints this dump for `OVS_BRIDGE`. Runs in the remote home.
    pub fn cmd(&self) -> String {
        format!(
            "sudo {} --protocols={} {} {}",
            OVS_OFCTL,
            OPENFLOW_PROTOCOL,
            self.subcommand(),
            OVS_BRIDGE
        )
    }
}

/// Compile the generated P4 program into the switch. `gen_p4_program` must have run first.
pub fn compile_p4_program(shell: &SshShell, p4bench_path: &str) -> Result<(), failure::Error> {
    shell.run(cmd!("{}", compile_cmd(p4bench_path)).cwd(REMOTE_WORK_DIR))?;
    Ok(())
}

/// Start the switch on a spawned shell and return immediately. The switch keeps running until
/// `stop_pisces` is called; join the handle after that and pass the result to
/// `save_switch_output`.
///
/// The exit status of the switch is ignored, since stopping it may kill it.
pub fn run_pisces(
    shell: &SshShell,
    p4bench_path: &str,
    rule_file: &str,
) -> Result<SshSpawnHandle, failure::Error> {
    let handle = shell.spawn(
        cmd!("{}", run_cmd(p4bench_path, rule_file))
            .cwd(REMOTE_WORK_DIR)
            .allow_error(),
    )?;

    Ok(handle)
}

/// Wait for a switch started by `run_pisces` to exit and record its output in
/// `<output_dir>/switch.txt`.
pub fn save_switch_output(
    handle: SshSpawnHandle,
    output_dir: &Path,
) -> Result<PathBuf, failure::Error> {
    let (_shell, output) = handle.join();
    let output = output?;
    write_output(
        output_dir,
        results::SWITCH_LOG,
        &output.stdout,
        &output.stderr,
    )
}

/// Kill the running switch, if any.
pub fn stop_pisces(shell: &SshShell, p4bench_path: &str) -> Result<(), failure::Error> {
    shell.run(cmd!("{}", stop_cmd(p4bench_path)).allow_error())?;
    Ok(())
}

/// Dump the given switch state into `<output_dir>/<dump.file_name()>`. `sudo` needs a terminal,
/// which the shell allocates for every command.
pub fn dump_ofctl(
    shell: &SshShell,
    dump: OfctlDump,
    output_dir: &Path,
) -> Result<PathBuf, failure::Error> {
    let output = shell.run(cmd!("{}", dump.cmd()).allow_error())?;
    write_output(output_dir, dump.file_name(), &output.stdout, &output.stderr)
}

/// Dump the installed flows into `<output_dir>/dump_flows.txt`.
pub fn dump_flows(shell: &SshShell, output_dir: &Path) -> Result<PathBuf, failure::Error> {
    dump_ofctl(shell, OfctlDump::Flows, output_dir)
}

/// Dump port counters into `<output_dir>/dump_ports.txt`.
pub fn dump_ports(shell: &SshShell, output_dir: &Path) -> Result<PathBuf, failure::Error> {
    dump_ofctl(shell, OfctlDump::Ports, output_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    const P4BENCH: &str = "/home/user/p4benchmark";

    #[test]
    fn switch_commands() {
        assert_eq!(
            compile_cmd(P4BENCH),
            "python /home/user/p4benchmark/pisces/P4vSwitch.py -p ./output/main.p4 -c"
        );
        assert_eq!(
            run_cmd(P4BENCH, &default_rule_file(P4BENCH)),
            "python /home/user/p4benchmark/pisces/P4vSwitch.py \
             -r /home/user/p4benchmark/pisces/commands.txt"
        );
        assert_eq!(
            stop_cmd(P4BENCH),
            "python /home/user/p4benchmark/pisces/P4vSwitch.py -k"
        );
    }

    #[test]
    fn ofctl_dumps() {
        assert_eq!(
            OfctlDump::Flows.cmd(),
            "sudo temp/utilities/ovs-ofctl --protocols=OpenFlow15 dump-flows br0"
        );
        assert_eq!(
            OfctlDump::Ports.cmd(),
            "sudo temp/utilities/ovs-ofctl --protocols=OpenFlow15 dump-ports br0"
        );
        assert_eq!(OfctlDump::Flows.file_name(), "dump_flows.txt");
        assert_eq!(OfctlDump::Ports.file_name(), "dump_ports.txt");
    }
}
