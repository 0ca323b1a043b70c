//! This program benchmarks generated P4 programs on a PISCES switch, driving both the switch and
//! the MoonGen traffic generator remotely. Which routine is chosen by passing different command
//! line arguments.

fn run() -> Result<(), failure::Error> {
    let matches = clap::App::new("runner")
        .about(
            "This program benchmarks generated P4 programs on a PISCES switch, driving both the \
             switch and the MoonGen traffic generator remotely.",
        )
        .subcommand(runner::exp00000::cli_options())
        .subcommand(runner::cleanup::cli_options())
        .setting(clap::AppSettings::SubcommandRequiredElseHelp)
        .setting(clap::AppSettings::DisableVersion)
        .get_matches();

    match matches.subcommand() {
        ("exp00000", Some(sub_m)) => runner::exp00000::run(sub_m),
        ("cleanup", Some(sub_m)) => runner::cleanup::run(sub_m),

        _ => {
            unreachable!();
        }
    }
}

fn main() {
    use console::style;

    env_logger::init();

    // Always get backtraces.
    std::env::set_var("RUST_BACKTRACE", "1");

    // If an error occurred, try to print something helpful.
    if let Err(err) = run() {
        const MESSAGE: &str = r#"== ERROR ==================================================================================
`runner` encountered an error. The command log above may offer clues. If the error pertains to SSH,
you may be able to get useful information by setting the RUST_LOG=debug environment variable. If a
switch was left running, `runner cleanup` stops it.
"#;

        println!("{}", style(MESSAGE).red().bold());

        // Errors from SSH commands
        if err.downcast_ref::<spurs::SshError>().is_some() {
            println!("An error occurred while attempting to run a command over SSH");
        }

        // Print error and backtrace
        println!(
            "`runner` encountered the following error:\n{}\n{}",
            err.as_fail(),
            err.backtrace(),
        );

        std::process::exit(101);
    }
}
