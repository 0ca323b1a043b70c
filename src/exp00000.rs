//! Benchmark a family of generated P4 programs on PISCES, with MoonGen measuring latency from a
//! second machine.
//!
//! For each value of the sweep variable, the variant of the chosen feature is generated on both
//! machines and compiled into the switch. Then, for each offered load, the switch is started,
//! MoonGen replays the generated pcap through it, and the MoonGen output, latency histogram, and
//! switch state are collected into `<OUTPUT>/<variable>/<load>/`.
//!
//! Synchronization is by fixed sleeps only: nothing checks that the switch is actually up before
//! traffic starts.
//!
//! Requires `sudo` on both machines.

use std::path::Path;
use std::time::Duration;

use clap::clap_app;

use serde::{Deserialize, Serialize};

use spurs::{SshShell, SshSpawnHandle};

use crate::{
    cli, connect, dump_sys_info,
    feature::Feature,
    moongen,
    output::{self, Parametrize, Timestamp},
    p4gen,
    paths::*,
    pisces,
    sweep::LoadSweep,
    timings_str, Login,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Config {
    exp: (usize, String),

    feature: Feature,
    variables: Vec<usize>,
    loads: LoadSweep,
    settle_secs: u64,

    output: String,
    dry_run: bool,

    username: String,
    switch_host: String,
    generator_host: String,

    p4bench_path: String,
    moongen_path: String,
    rule_file: String,

    local_git_hash: String,
    switch_git_hash: String,
    generator_git_hash: String,

    timestamp: Timestamp,
}

impl Parametrize for Config {
    fn name_parts(&self) -> Vec<(&'static str, String)> {
        vec![
            ("exp", format!("{:05}", self.exp.0)),
            ("", self.exp.1.clone()),
            ("", self.feature.to_str().into()),
        ]
    }

    fn timestamp(&self) -> &Timestamp {
        &self.timestamp
    }
}

pub fn cli_options() -> clap::App<'static, 'static> {
    let app = clap_app! { exp00000 =>
        (about: "Run the P4 benchmark: sweep the given feature over PISCES, generating traffic \
                 with MoonGen. Requires `sudo` on both remotes.")
        (@setting ArgRequiredElseHelp)
        (@setting DisableVersion)
        (@arg OUTPUT: +required +takes_value
         "output directory of the experiment")
    };

    let app = cli::remote::add_cli_options(app);
    let app = cli::remote::add_generator_cli_options(app);
    cli::bench::add_cli_options(app)
}

pub fn run(sub_m: &clap::ArgMatches<'_>) -> Result<(), failure::Error> {
    let switch = cli::remote::parse_cli_options(sub_m)?;
    let generator = cli::remote::parse_generator_cli_options(sub_m);
    let bench = cli::bench::parse_cli_options(sub_m)?;
    let output = sub_m.value_of("OUTPUT").unwrap();

    let switch_login = Login::with_default_port(&switch.username, switch.host);
    let generator_login = Login::with_default_port(&switch.username, generator.host);

    let switch_shell = connect(&switch_login, switch.dry_run)?;
    let generator_shell = connect(&generator_login, switch.dry_run)?;

    let cfg = Config {
        exp: (0, "p4bench".into()),

        feature: bench.feature,
        variables: bench.variables,
        loads: bench.loads,
        settle_secs: bench.settle_secs,

        output: output.into(),
        dry_run: switch.dry_run,

        username: switch.username.clone(),
        switch_host: switch.host.into(),
        generator_host: generator.host.into(),

        p4bench_path: switch.p4bench_path.into(),
        moongen_path: generator.moongen_path.into(),
        rule_file: bench
            .rule_file
            .map(Into::into)
            .unwrap_or_else(|| pisces::default_rule_file(switch.p4bench_path)),

        local_git_hash: crate::local_git_hash()?,
        switch_git_hash: crate::remote_git_hash(&switch_shell, switch.p4bench_path)?,
        generator_git_hash: crate::remote_git_hash(&generator_shell, switch.p4bench_path)?,

        timestamp: Timestamp::now(),
    };

    run_inner(&switch_shell, &generator_login, &generator_shell, &cfg)
}

fn run_inner<A>(
    switch_shell: &SshShell,
    generator_login: &Login<A>,
    generator_shell: &SshShell,
    cfg: &Config,
) -> Result<(), failure::Error>
where
    A: std::net::ToSocketAddrs + std::fmt::Display + Clone,
{
    let output_root = Path::new(&cfg.output);
    output::ensure_dir(output_root)?;

    let params_file = cfg.write_params(output_root)?;
    log::info!("Parameters written to {}", params_file.display());

    dump_sys_info(switch_shell)?;
    dump_sys_info(generator_shell)?;

    for &variable in cfg.variables.iter() {
        log::info!("Benchmarking {} with variable {}", cfg.feature, variable);

        let variable_dir = output::variable_dir(output_root, variable);
        output::ensure_dir(&variable_dir)?;

        // The switch needs the program, and the generator needs the matching pcap.
        p4gen::gen_p4_program(switch_shell, &cfg.p4bench_path, cfg.feature, variable)?;
        p4gen::gen_p4_program(generator_shell, &cfg.p4bench_path, cfg.feature, variable)?;

        pisces::compile_p4_program(switch_shell, &cfg.p4bench_path)?;

        let mut testbed = Remotes {
            cfg,
            switch_shell,
            generator_login,
            generator_shell,
            switch: None,
        };
        run_experiment_with_moongen(&mut testbed, &cfg.loads, &variable_dir)?;
    }

    println!("RESULTS: {}", output_root.display());

    Ok(())
}

/// The remote steps of a single run, in the order `run_once` performs them.
trait Testbed {
    /// Start the switch with the compiled program and its rules.
    fn start_switch(&mut self) -> Result<(), failure::Error>;

    /// Replay the pcap at the given load, saving `MoonGen.txt`.
    fn run_moongen(&mut self, load: usize, output_dir: &Path) -> Result<(), failure::Error>;

    fn copy_histogram(&mut self, output_dir: &Path) -> Result<(), failure::Error>;

    /// Save `dump_flows.txt` and `dump_ports.txt`.
    fn dump_switch_state(&mut self, output_dir: &Path) -> Result<(), failure::Error>;

    /// Stop the switch started by `start_switch`, saving `switch.txt`.
    fn stop_switch(&mut self, output_dir: &Path) -> Result<(), failure::Error>;

    /// Wait for the switch to come up, or to go down.
    fn settle(&mut self);
}

/// The switch and traffic generator of the experiment.
struct Remotes<'a, A: std::net::ToSocketAddrs + std::fmt::Display + Clone> {
    cfg: &'a Config,
    switch_shell: &'a SshShell,
    generator_login: &'a Login<'a, 'a, A>,
    generator_shell: &'a SshShell,

    /// The running switch, if any.
    switch: Option<SshSpawnHandle>,
}

impl<A> Testbed for Remotes<'_, A>
where
    A: std::net::ToSocketAddrs + std::fmt::Display + Clone,
{
    fn start_switch(&mut self) -> Result<(), failure::Error> {
        let handle =
            pisces::run_pisces(self.switch_shell, &self.cfg.p4bench_path, &self.cfg.rule_file)?;
        self.switch = Some(handle);
        Ok(())
    }

    fn run_moongen(&mut self, load: usize, output_dir: &Path) -> Result<(), failure::Error> {
        let handle = moongen::run_moongen(
            self.generator_shell,
            &self.cfg.moongen_path,
            &self.cfg.p4bench_path,
            load,
        )?;
        moongen::save_moongen_output(handle, output_dir)?;
        Ok(())
    }

    fn copy_histogram(&mut self, output_dir: &Path) -> Result<(), failure::Error> {
        moongen::copy_histogram(self.generator_login, output_dir, self.cfg.dry_run)
    }

    fn dump_switch_state(&mut self, output_dir: &Path) -> Result<(), failure::Error> {
        pisces::dump_flows(self.switch_shell, output_dir)?;
        pisces::dump_ports(self.switch_shell, output_dir)?;
        Ok(())
    }

    fn stop_switch(&mut self, output_dir: &Path) -> Result<(), failure::Error> {
        pisces::stop_pisces(self.switch_shell, &self.cfg.p4bench_path)?;
        if let Some(handle) = self.switch.take() {
            pisces::save_switch_output(handle, output_dir)?;
        }
        Ok(())
    }

    fn settle(&mut self) {
        if !self.cfg.dry_run {
            std::thread::sleep(Duration::from_secs(self.cfg.settle_secs));
        }
    }
}

/// Run the compiled program once per offered load, collecting results under `variable_dir`.
fn run_experiment_with_moongen<T: Testbed>(
    testbed: &mut T,
    loads: &LoadSweep,
    variable_dir: &Path,
) -> Result<(), failure::Error> {
    for load in loads.loads() {
        log::info!("Offered load {}", load);

        let output_dir = output::load_dir(variable_dir, load);
        output::ensure_dir(&output_dir)?;

        run_once(testbed, load, &output_dir)?;

        // Let the switch shut down completely before the next run.
        testbed.settle();
    }

    Ok(())
}

/// One run at the given load. The switch is stopped and `timings.txt` written even if collecting
/// the results fails; the first error is returned afterwards.
fn run_once<T: Testbed>(
    testbed: &mut T,
    load: usize,
    output_dir: &Path,
) -> Result<(), failure::Error> {
    let mut timers = vec![];

    testbed.start_switch()?;

    // Wait for the switch to come up.
    time!(timers, "Switch settle", testbed.settle());

    let collected = collect_results(testbed, load, output_dir, &mut timers);

    let stopped = time!(timers, "Stop switch", testbed.stop_switch(output_dir));

    output::write_output(
        output_dir,
        results::TIMINGS,
        &timings_str(timers.as_slice()),
        "",
    )?;

    collected.and(stopped)
}

fn collect_results<T: Testbed>(
    testbed: &mut T,
    load: usize,
    output_dir: &Path,
    timers: &mut Vec<(&'static str, Duration)>,
) -> Result<(), failure::Error> {
    time!(timers, "MoonGen", testbed.run_moongen(load, output_dir)?);
    time!(timers, "Copy histogram", testbed.copy_histogram(output_dir)?);
    time!(
        timers,
        "Dump switch state",
        testbed.dump_switch_state(output_dir)?
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            exp: (0, "p4bench".into()),
            feature: Feature::SetField,
            variables: vec![1, 2],
            loads: LoadSweep::default(),
            settle_secs: 0,
            output: "out".into(),
            dry_run: true,
            username: "user".into(),
            switch_host: "node97".into(),
            generator_host: "node98".into(),
            p4bench_path: DEFAULT_P4BENCH_PATH.into(),
            moongen_path: DEFAULT_MOONGEN_PATH.into(),
            rule_file: pisces::default_rule_file(DEFAULT_P4BENCH_PATH),
            local_git_hash: "dirty".into(),
            switch_git_hash: "unknown".into(),
            generator_git_hash: "unknown".into(),
            timestamp: Timestamp::now(),
        }
    }

    /// Records the steps it is asked to perform and writes the files the real ones would.
    #[derive(Default)]
    struct RecordingTestbed {
        steps: Vec<&'static str>,
        fail_moongen: bool,
    }

    impl Testbed for RecordingTestbed {
        fn start_switch(&mut self) -> Result<(), failure::Error> {
            self.steps.push("start switch");
            Ok(())
        }

        fn run_moongen(&mut self, load: usize, output_dir: &Path) -> Result<(), failure::Error> {
            self.steps.push("moongen");
            output::write_output(output_dir, results::MOONGEN_LOG, &load.to_string(), "")?;
            if self.fail_moongen {
                failure::bail!("MoonGen failed");
            }
            Ok(())
        }

        fn copy_histogram(&mut self, output_dir: &Path) -> Result<(), failure::Error> {
            self.steps.push("copy histogram");
            output::write_output(output_dir, HISTOGRAM_FILE, "", "")?;
            Ok(())
        }

        fn dump_switch_state(&mut self, output_dir: &Path) -> Result<(), failure::Error> {
            self.steps.push("dump switch state");
            output::write_output(output_dir, results::DUMP_FLOWS, "", "")?;
            output::write_output(output_dir, results::DUMP_PORTS, "", "")?;
            Ok(())
        }

        fn stop_switch(&mut self, output_dir: &Path) -> Result<(), failure::Error> {
            self.steps.push("stop switch");
            output::write_output(output_dir, results::SWITCH_LOG, "", "")?;
            Ok(())
        }

        fn settle(&mut self) {
            self.steps.push("settle");
        }
    }

    #[test]
    fn each_load_runs_in_order_into_its_own_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let mut testbed = RecordingTestbed::default();
        let loads = LoadSweep::new(10000, 11000, 1000).unwrap();

        run_experiment_with_moongen(&mut testbed, &loads, tmp.path()).unwrap();

        let one_run = [
            "start switch",
            "settle",
            "moongen",
            "copy histogram",
            "dump switch state",
            "stop switch",
            "settle",
        ];
        assert_eq!(testbed.steps, [one_run, one_run].concat());

        for load in &[10000, 11000] {
            let dir = output::load_dir(tmp.path(), *load);
            for file in &[
                results::MOONGEN_LOG,
                HISTOGRAM_FILE,
                results::DUMP_FLOWS,
                results::DUMP_PORTS,
                results::SWITCH_LOG,
                results::TIMINGS,
            ] {
                assert!(dir.join(file).is_file(), "{} missing in {}", file, dir.display());
            }
            assert_eq!(
                std::fs::read_to_string(dir.join(results::MOONGEN_LOG)).unwrap(),
                load.to_string()
            );
        }

        let timings =
            std::fs::read_to_string(output::load_dir(tmp.path(), 10000).join(results::TIMINGS))
                .unwrap();
        let labels: Vec<_> = timings
            .lines()
            .map(|line| line.split(':').next().unwrap())
            .collect();
        assert_eq!(
            labels,
            [
                "Switch settle",
                "MoonGen",
                "Copy histogram",
                "Dump switch state",
                "Stop switch"
            ]
        );
    }

    #[test]
    fn moongen_failure_still_stops_the_switch() {
        let tmp = tempfile::tempdir().unwrap();
        let mut testbed = RecordingTestbed {
            fail_moongen: true,
            ..Default::default()
        };

        let result = run_experiment_with_moongen(&mut testbed, &LoadSweep::default(), tmp.path());
        assert!(result.is_err());

        assert_eq!(
            testbed.steps,
            ["start switch", "settle", "moongen", "stop switch"]
        );

        let dir = output::load_dir(tmp.path(), 10000);
        assert!(dir.join(results::MOONGEN_LOG).is_file());
        assert!(dir.join(results::SWITCH_LOG).is_file());
        assert!(dir.join(results::TIMINGS).is_file());
        assert!(!dir.join(results::DUMP_FLOWS).exists());
    }

    #[test]
    fn params_file_name() {
        let cfg = config();
        assert_eq!(
            cfg.gen_file_name("params"),
            format!("exp00000-p4bench-set-field-{}.params", cfg.timestamp)
        );
    }

    #[test]
    fn params_round_trip_through_json() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config();
        let path = cfg.write_params(tmp.path()).unwrap();

        let read: Config =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(read.feature, Feature::SetField);
        assert_eq!(read.variables, vec![1, 2]);
        assert_eq!(read.loads, LoadSweep::default());
        assert_eq!(read.rule_file, "/home/danghu/workspace/p4benchmark/pisces/commands.txt");
    }

    #[test]
    fn cli_requires_output_and_feature() {
        assert!(cli_options()
            .get_matches_from_safe(vec!["exp00000", "--feature", "modify"])
            .is_err());
        assert!(cli_options()
            .get_matches_from_safe(vec!["exp00000", "out"])
            .is_err());

        let matches = cli_options()
            .get_matches_from_safe(vec!["exp00000", "out", "--feature", "modify"])
            .unwrap();
        assert_eq!(matches.value_of("OUTPUT"), Some("out"));
        assert_eq!(
            cli::bench::parse_cli_options(&matches).unwrap().feature,
            Feature::Modify
        );
    }
}
