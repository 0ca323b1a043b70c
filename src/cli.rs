//! Some routines for adding common CLI options in a consistent, less boilerplatey way.

/// `validator` for integer options.
fn is_usize(s: String) -> Result<(), String> {
    s.as_str()
        .parse::<usize>()
        .map(|_| ())
        .map_err(|e| format!("{:?}", e))
}

/// CLI options for reaching the machines of the testbed.
pub mod remote {
    use clap::{App, Arg, ArgMatches};

    use failure_derive::Fail;

    use crate::paths::*;

    #[derive(Debug, Fail)]
    #[fail(display = "no --username was given and $USER is not set")]
    pub struct MissingUsername;

    /// The switch host and how to log into it.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct SwitchOptions<'a> {
        pub username: String,
        pub host: &'a str,
        pub p4bench_path: &'a str,
        pub dry_run: bool,
    }

    /// The traffic generator host.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct GeneratorOptions<'a> {
        pub host: &'a str,
        pub moongen_path: &'a str,
    }

    /// Options needed by anything that talks to the switch host.
    pub fn add_cli_options<'a, 'b>(app: App<'a, 'b>) -> App<'a, 'b> {
        app.arg(
            Arg::with_name("SWITCH_HOST")
                .long("switch-host")
                .takes_value(true)
                .default_value(DEFAULT_SWITCH_HOST)
                .help("The machine that runs the switch (e.g. node97 or node97:22)"),
        )
        .arg(
            Arg::with_name("USERNAME")
                .long("username")
                .takes_value(true)
                .help("The username on the remotes (defaults to $USER)"),
        )
        .arg(
            Arg::with_name("P4BENCH_PATH")
                .long("path")
                .takes_value(true)
                .default_value(DEFAULT_P4BENCH_PATH)
                .help("path to p4benchmark on the remote server"),
        )
        .arg(
            Arg::with_name("DRY_RUN")
                .long("dry-run")
                .help("Print the remote commands without running them or copying any results."),
        )
    }

    /// Options needed by anything that talks to the traffic generator.
    pub fn add_generator_cli_options<'a, 'b>(app: App<'a, 'b>) -> App<'a, 'b> {
        app.arg(
            Arg::with_name("GENERATOR_HOST")
                .long("generator-host")
                .takes_value(true)
                .default_value(DEFAULT_GENERATOR_HOST)
                .help("The machine that runs MoonGen (e.g. node98 or node98:22)"),
        )
        .arg(
            Arg::with_name("MOONGEN_PATH")
                .long("moongen-path")
                .takes_value(true)
                .default_value(DEFAULT_MOONGEN_PATH)
                .help("path to MoonGen on the remote server"),
        )
    }

    /// Parse the values added by `add_cli_options`.
    pub fn parse_cli_options<'a>(
        sub_m: &'a ArgMatches<'a>,
    ) -> Result<SwitchOptions<'a>, failure::Error> {
        let username = match sub_m.value_of("USERNAME") {
            Some(username) => username.to_owned(),
            None => std::env::var("USER").map_err(|_| MissingUsername)?,
        };

        Ok(SwitchOptions {
            username,
            host: sub_m.value_of("SWITCH_HOST").unwrap(),
            p4bench_path: sub_m.value_of("P4BENCH_PATH").unwrap(),
            dry_run: sub_m.is_present("DRY_RUN"),
        })
    }

    /// Parse the values added by `add_generator_cli_options`.
    pub fn parse_generator_cli_options<'a>(sub_m: &'a ArgMatches<'a>) -> GeneratorOptions<'a> {
        GeneratorOptions {
            host: sub_m.value_of("GENERATOR_HOST").unwrap(),
            moongen_path: sub_m.value_of("MOONGEN_PATH").unwrap(),
        }
    }
}

/// CLI options describing what to benchmark.
pub mod bench {
    use clap::{App, Arg, ArgMatches};

    use crate::{
        feature::Feature,
        sweep::{
            check_variables, LoadSweep, DEFAULT_LOAD_END, DEFAULT_LOAD_START, DEFAULT_LOAD_STEP,
            DEFAULT_VARIABLES,
        },
    };

    /// Seconds to wait for the switch to come up, and between runs.
    pub const DEFAULT_SETTLE_SECS: u64 = 5;

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct BenchOptions<'a> {
        pub feature: Feature,
        pub variables: Vec<usize>,
        pub loads: LoadSweep,
        pub settle_secs: u64,
        /// Overrides the switch rules shipped with p4benchmark.
        pub rule_file: Option<&'a str>,
    }

    pub fn add_cli_options<'a, 'b>(app: App<'a, 'b>) -> App<'a, 'b> {
        app.arg(
            Arg::with_name("FEATURE")
                .long("feature")
                .takes_value(true)
                .required(true)
                .possible_values(&Feature::NAMES)
                .help("select a feature for benchmarking"),
        )
        .arg(
            Arg::with_name("VARIABLES")
                .long("variables")
                .takes_value(true)
                .validator(validate_variables)
                .help(
                    "Comma separated values of the sweep variable, i.e. the number of headers, \
                     operations or tables (defaults to 1,2,4,8,16)",
                ),
        )
        .arg(
            Arg::with_name("LOAD_START")
                .long("load-start")
                .takes_value(true)
                .validator(super::is_usize)
                .help("The first offered load passed to MoonGen (defaults to 10000)"),
        )
        .arg(
            Arg::with_name("LOAD_END")
                .long("load-end")
                .takes_value(true)
                .validator(super::is_usize)
                .help("The last offered load passed to MoonGen, inclusive (defaults to 10000)"),
        )
        .arg(
            Arg::with_name("LOAD_STEP")
                .long("load-step")
                .takes_value(true)
                .validator(super::is_usize)
                .help("The increment between offered loads (defaults to 1000)"),
        )
        .arg(
            Arg::with_name("SETTLE")
                .long("settle")
                .takes_value(true)
                .validator(super::is_usize)
                .help(
                    "Seconds to wait for the switch to come up, and between runs \
                     (defaults to 5)",
                ),
        )
        .arg(
            Arg::with_name("RULES")
                .long("rules")
                .takes_value(true)
                .help(
                    "The switch rules file on the remote \
                     (defaults to pisces/commands.txt in the p4benchmark path)",
                ),
        )
    }

    /// Parse and check the values added by `add_cli_options`.
    pub fn parse_cli_options<'a>(
        sub_m: &'a ArgMatches<'a>,
    ) -> Result<BenchOptions<'a>, failure::Error> {
        fn usize_or(sub_m: &ArgMatches<'_>, name: &str, default: usize) -> usize {
            sub_m
                .value_of(name)
                .map(|value| value.parse::<usize>().unwrap())
                .unwrap_or(default)
        }

        let feature = sub_m.value_of("FEATURE").unwrap().parse::<Feature>()?;

        let variables = if let Some(variables) = sub_m.value_of("VARIABLES") {
            parse_variables(variables)?
        } else {
            DEFAULT_VARIABLES.to_vec()
        };
        check_variables(&variables)?;

        let loads = LoadSweep::new(
            usize_or(sub_m, "LOAD_START", DEFAULT_LOAD_START),
            usize_or(sub_m, "LOAD_END", DEFAULT_LOAD_END),
            usize_or(sub_m, "LOAD_STEP", DEFAULT_LOAD_STEP),
        )?;

        let settle_secs = sub_m
            .value_of("SETTLE")
            .map(|value| value.parse::<u64>().unwrap())
            .unwrap_or(DEFAULT_SETTLE_SECS);

        Ok(BenchOptions {
            feature,
            variables,
            loads,
            settle_secs,
            rule_file: sub_m.value_of("RULES"),
        })
    }

    fn validate_variables(opt: String) -> Result<(), String> {
        parse_variables(&opt)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    /// Parse a comma separated list of sweep variables, e.g. `1,2,4`.
    pub fn parse_variables(opt: &str) -> Result<Vec<usize>, failure::Error> {
        opt.split(',')
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| {
                value.parse::<usize>().map_err(|e| {
                    failure::format_err!("Invalid sweep variable \"{}\": {}", value, e)
                })
            })
            .collect()
    }
}
