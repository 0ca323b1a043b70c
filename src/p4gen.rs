//! Generating P4 program variants with p4benchmark's program generator.

use spurs::{cmd, Execute, SshShell};

use crate::{feature::Feature, paths::*};

/// The command that generates the variant of `feature` for the given sweep variable. It is meant
/// to run inside `REMOTE_WORK_DIR`, where it leaves the program in `output/`.
///
/// `p4bench_path` is the path of the p4benchmark checkout on the remote.
pub fn gen_cmd(p4bench_path: &str, feature: Feature, variable: usize) -> String {
    format!(
        "python {} {}",
        dir!(p4bench_path, P4_PROGRAM_GENERATOR),
        feature.generator_args(variable)
    )
}

/// Generate the P4 program (and the matching pcap) for `feature` at the given sweep variable on
/// the remote. Any previous output in `REMOTE_WORK_DIR` is overwritten.
pub fn gen_p4_program(
    shell: &SshShell,
    p4bench_path: &str,
    feature: Feature,
    variable: usize,
) -> Result<(), failure::Error> {
    shell.run(cmd!("mkdir -p {}", REMOTE_WORK_DIR))?;

    with_shell! { shell in REMOTE_WORK_DIR =>
        cmd!("{}", gen_cmd(p4bench_path, feature, variable)),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gen_cmd_per_feature() {
        let path = "/home/user/p4benchmark";

        assert_eq!(
            gen_cmd(path, Feature::ParseField, 1),
            "python /home/user/p4benchmark/generate_p4_program.py --parser-header --headers 1"
        );
        assert_eq!(
            gen_cmd(path, Feature::SetField, 2),
            "python /home/user/p4benchmark/generate_p4_program.py \
             --action-complexity --nb-operation 2"
        );
        assert_eq!(
            gen_cmd(path, Feature::Modify, 4),
            "python /home/user/p4benchmark/generate_p4_program.py \
             --mod-packet --mod-type add --headers 4"
        );
        assert_eq!(
            gen_cmd(path, Feature::Processing, 16),
            "python /home/user/p4benchmark/generate_p4_program.py --pipeline --tables 16"
        );
    }
}
