//! A library of routines for benchmarking P4 programs on a PISCES software switch, with MoonGen
//! generating traffic from a second machine.

// Must be imported first because the other submodules use the macros defined therein.
#[macro_use]
mod macros;

pub mod output;

pub mod cleanup;
pub mod cli;
pub mod exp00000;
pub mod feature;
pub mod moongen;
pub mod p4gen;
pub mod pisces;
pub mod sweep;

use std::net::IpAddr;
use std::path::Path;
use std::process::Command;

use failure::ResultExt;

use spurs::{cmd, Execute, SshShell};

///////////////////////////////////////////////////////////////////////////////

/// Information needed to log into a remote machine.
#[derive(Clone, Debug)]
pub struct Login<'u, 'h, A: std::net::ToSocketAddrs + std::fmt::Display + Clone> {
    /// A network address for the host.
    pub host: A,
    /// A human-readable address for the host. Often, this is the same as `host`.
    pub hostname: &'h str,
    /// The username to log in as.
    pub username: &'u str,
}

impl<'u, 'h> Login<'u, 'h, String> {
    /// Log into `hostname` as `username`, using port 22 unless `hostname` names another one.
    pub fn with_default_port(username: &'u str, hostname: &'h str) -> Self {
        Login {
            host: with_default_port(hostname),
            hostname,
            username,
        }
    }
}

/// Append `:22` to the given host unless it already has a port.
pub fn with_default_port(host: &str) -> String {
    if host.contains(':') {
        host.to_owned()
    } else {
        format!("{}:22", host)
    }
}

/// Common paths.
pub mod paths {
    /// Where p4benchmark is checked out on both remotes, unless overridden.
    pub const DEFAULT_P4BENCH_PATH: &str = "/home/danghu/workspace/p4benchmark";

    /// Where MoonGen is built on the traffic generator, unless overridden.
    pub const DEFAULT_MOONGEN_PATH: &str = "/home/danghu/MoonGen";

    /// The machine running the switch, unless overridden.
    pub const DEFAULT_SWITCH_HOST: &str = "node97";

    /// The machine running MoonGen, unless overridden.
    pub const DEFAULT_GENERATOR_HOST: &str = "node98";

    /// Scratch directory (relative to the remote home) in which programs are generated and built.
    pub const REMOTE_WORK_DIR: &str = "temp";

    /// The P4 program generator, relative to the p4benchmark checkout.
    pub const P4_PROGRAM_GENERATOR: &str = "generate_p4_program.py";

    /// The PISCES control script, relative to the p4benchmark checkout.
    pub const PISCES_SCRIPT: &str = "pisces/P4vSwitch.py";

    /// Default switch rules, relative to the p4benchmark checkout.
    pub const PISCES_RULES: &str = "pisces/commands.txt";

    /// The program produced by the generator, relative to `REMOTE_WORK_DIR`.
    pub const GENERATED_P4_PROGRAM: &str = "./output/main.p4";

    /// The pcap produced by the generator, relative to the remote home.
    pub const GENERATED_PCAP: &str = "temp/output/test.pcap";

    /// `ovs-ofctl` as built by PISCES, relative to the remote home.
    pub const OVS_OFCTL: &str = "temp/utilities/ovs-ofctl";

    /// The bridge PISCES sets up.
    pub const OVS_BRIDGE: &str = "br0";

    /// The MoonGen binary, relative to the MoonGen checkout.
    pub const MOONGEN_BINARY: &str = "build/MoonGen";

    /// The MoonGen script that replays a pcap and timestamps packets in hardware, relative to the
    /// p4benchmark checkout.
    pub const MOONGEN_TIMESTAMP_SCRIPT: &str = "pktgen/lua_config/hardware-timestamping.lua";

    /// The latency histogram MoonGen leaves in the remote home.
    pub const HISTOGRAM_FILE: &str = "histogram.csv";

    /// Names of files written to each local results directory.
    pub mod results {
        pub const DUMP_FLOWS: &str = "dump_flows.txt";
        pub const DUMP_PORTS: &str = "dump_ports.txt";
        pub const SWITCH_LOG: &str = "switch.txt";
        pub const MOONGEN_LOG: &str = "MoonGen.txt";
        pub const TIMINGS: &str = "timings.txt";
    }
}

/// Given an array of timings, generate a human-readable string.
pub fn timings_str(timings: &[(&str, std::time::Duration)]) -> String {
    let mut s = String::new();
    for (label, d) in timings.iter() {
        s.push_str(&format!("{}: {:?}\n", label, d));
    }
    s
}

/// Build the `rsync` invocation that copies `from` on the remote into the local directory `to`.
fn rsync_from_remote_cmd<A>(
    login: &Login<A>,
    from: &str,
    to: &Path,
) -> Result<Command, failure::Error>
where
    A: std::net::ToSocketAddrs + std::fmt::Display + Clone,
{
    let addr = login
        .host
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| failure::format_err!("{} did not resolve to any address", login.host))?;
    let (ip, port) = spurs_util::get_host_ip(addr);

    // rsync needs brackets around IPv6 addresses to tell them apart from the path.
    let remote = match ip {
        IpAddr::V4(ip) => format!("{}@{}:{}", login.username, ip, from),
        IpAddr::V6(ip) => format!("{}@[{}]:{}", login.username, ip, from),
    };

    let mut cmd = Command::new("rsync");
    cmd.arg("-vvzP")
        .arg("-e")
        .arg(format!("ssh -p {} -o StrictHostKeyChecking=yes", port))
        .arg(&remote)
        .arg(to.as_os_str());

    Ok(cmd)
}

/// Copy the given file from the given remote into the given local directory. This uses rsync via
/// SSH. It will fail if the remote is not in known_hosts.
pub fn rsync_from_remote<A>(login: &Login<A>, from: &str, to: &Path) -> Result<(), failure::Error>
where
    A: std::net::ToSocketAddrs + std::fmt::Display + Clone,
{
    println!(
        "Using rsync to copy files. If this fails, make sure your host is in \
         known_hosts and retry."
    );

    let mut cmd = rsync_from_remote_cmd(login, from, to)?;

    println!("{:?}", cmd);

    let status = cmd.status().context("running rsync")?;

    // If failure, exit with an Err(..).
    if !status.success() {
        failure::bail!("rsync failed. Exit code: {:?}", status.code());
    }

    Ok(())
}

/// Connect to the given remote. If `dry_run` is set, commands run on the returned shell are only
/// printed.
pub fn connect<A>(login: &Login<A>, dry_run: bool) -> Result<SshShell, failure::Error>
where
    A: std::net::ToSocketAddrs + std::fmt::Display + std::fmt::Debug + Clone,
{
    let mut shell = SshShell::with_default_key(login.username, &login.host)?;
    if dry_run {
        shell.set_dry_run(true);
    }
    Ok(shell)
}

/// Get the git hash of the local workspace from which the runner is run. Returns `"dirty"` if the
/// workspace has uncommitted changes, or `"unknown"` if it is not a git checkout.
pub fn local_git_hash() -> Result<String, failure::Error> {
    let is_dirty = Command::new("git")
        .args(&["diff", "--quiet"])
        .status()
        .context("running git diff")?
        .code()
        == Some(1);

    if is_dirty {
        return Ok("dirty".into());
    }

    let output = Command::new("git")
        .args(&["rev-parse", "HEAD"])
        .output()
        .context("running git rev-parse")?;
    git_hash_from_output(&output)
}

fn git_hash_from_output(output: &std::process::Output) -> Result<String, failure::Error> {
    if !output.status.success() {
        return Ok("unknown".into());
    }

    let hash =
        std::str::from_utf8(&output.stdout).context("converting git hash string to UTF-8")?;
    Ok(hash.trim().into())
}

/// Get the git hash of the repository at `path` on the remote, or `"unknown"` if it is not a git
/// repository.
pub fn remote_git_hash(shell: &SshShell, path: &str) -> Result<String, failure::Error> {
    let hash = shell.run(
        cmd!("git -C {} rev-parse HEAD 2>/dev/null || echo unknown", path).use_bash(),
    )?;
    Ok(hash.stdout.trim().into())
}

/// Dump some basic machine info into the command log.
pub fn dump_sys_info(shell: &SshShell) -> Result<(), failure::Error> {
    with_shell! { shell =>
        cmd!("uname -a"),
        cmd!("free -h"),
    }

    Ok(())
}
