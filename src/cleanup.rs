//! Stop a switch that was left running, e.g. by an interrupted `exp00000`.

use std::path::Path;

use clap::clap_app;

use crate::{cli, connect, output, pisces, Login};

pub fn cli_options() -> clap::App<'static, 'static> {
    let app = clap_app! { cleanup =>
        (about: "Stop the switch on the switch host, optionally saving its state first.")
        (@setting DisableVersion)
        (@arg OUTPUT: +takes_value
         "If given, dump the switch flows and ports into this directory before stopping it")
    };

    cli::remote::add_cli_options(app)
}

pub fn run(sub_m: &clap::ArgMatches<'_>) -> Result<(), failure::Error> {
    let switch = cli::remote::parse_cli_options(sub_m)?;
    let login = Login::with_default_port(&switch.username, switch.host);
    let shell = connect(&login, switch.dry_run)?;

    if let Some(output_dir) = sub_m.value_of("OUTPUT") {
        let output_dir = Path::new(output_dir);
        output::ensure_dir(output_dir)?;
        pisces::dump_flows(&shell, output_dir)?;
        pisces::dump_ports(&shell, output_dir)?;
    }

    pisces::stop_pisces(&shell, switch.p4bench_path)?;

    log::info!("Stopped the switch on {}", login.hostname);

    Ok(())
}
