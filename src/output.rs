//! Naming and layout of experiment output on the local machine.
//!
//! Results are laid out as `<output>/<variable>/<load>/<file>`. The parameters of the whole run
//! are recorded in the output root under a name generated by `Parametrize`.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use failure::ResultExt;

use serde::{Deserialize, Serialize};

/// A timestamp used to make output file names unique.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp(String);

impl Timestamp {
    pub fn now() -> Self {
        Timestamp(
            chrono::offset::Local::now()
                .format("%Y-%m-%d-%H-%M-%S")
                .to_string(),
        )
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An experiment configuration that can name its own output files.
pub trait Parametrize: Serialize {
    /// The `(key, value)` pairs that identify this configuration, in order. An empty key means
    /// the value is used on its own.
    fn name_parts(&self) -> Vec<(&'static str, String)>;

    /// The time at which this configuration was created.
    fn timestamp(&self) -> &Timestamp;

    /// Generate a file name of the form `<parts>-<timestamp>.<ext>`.
    fn gen_file_name(&self, ext: &str) -> String {
        let base = self
            .name_parts()
            .into_iter()
            .map(|(key, value)| {
                if key.is_empty() {
                    value
                } else {
                    format!("{}{}", key, value)
                }
            })
            .collect::<Vec<_>>()
            .join("-");

        format!("{}-{}.{}", base, self.timestamp(), ext)
    }

    /// Serialize the configuration as JSON into `<dir>/<gen_file_name("params")>`. Returns the
    /// path of the file.
    fn write_params(&self, dir: &Path) -> Result<PathBuf, failure::Error> {
        let path = dir.join(self.gen_file_name("params"));
        let params = serde_json::to_string_pretty(self)?;
        fs::write(&path, params)
            .with_context(|_| format!("writing parameters to {}", path.display()))?;
        Ok(path)
    }
}

/// The directory holding all results for one value of the sweep variable.
pub fn variable_dir(output: &Path, variable: usize) -> PathBuf {
    output.join(variable.to_string())
}

/// The directory holding the results of a single run at the given offered load.
pub fn load_dir(variable_dir: &Path, load: usize) -> PathBuf {
    variable_dir.join(load.to_string())
}

/// Create the given directory and its parents if they do not exist yet.
pub fn ensure_dir(path: &Path) -> Result<(), failure::Error> {
    fs::create_dir_all(path).with_context(|_| format!("creating {}", path.display()))?;
    Ok(())
}

/// Write the captured output of a remote command to `<dir>/<file>`, stdout first, then stderr.
/// Any existing file is truncated. Returns the path of the file.
pub fn write_output(
    dir: &Path,
    file: &str,
    stdout: &str,
    stderr: &str,
) -> Result<PathBuf, failure::Error> {
    let path = dir.join(file);
    let mut out =
        fs::File::create(&path).with_context(|_| format!("creating {}", path.display()))?;
    out.write_all(stdout.as_bytes())?;
    out.write_all(stderr.as_bytes())?;

    log::debug!("Wrote {}", path.display());

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Dummy {
        feature: String,
        variable: usize,
        timestamp: Timestamp,
    }

    impl Parametrize for Dummy {
        fn name_parts(&self) -> Vec<(&'static str, String)> {
            vec![
                ("", "p4bench".into()),
                ("", self.feature.clone()),
                ("variable", self.variable.to_string()),
            ]
        }

        fn timestamp(&self) -> &Timestamp {
            &self.timestamp
        }
    }

    fn dummy() -> Dummy {
        Dummy {
            feature: "modify".into(),
            variable: 4,
            timestamp: Timestamp("2020-01-02-03-04-05".into()),
        }
    }

    #[test]
    fn file_name_from_parts() {
        assert_eq!(
            dummy().gen_file_name("params"),
            "p4bench-modify-variable4-2020-01-02-03-04-05.params"
        );
    }

    #[test]
    fn params_are_json() {
        let tmp = tempfile::tempdir().unwrap();
        let path = dummy().write_params(tmp.path()).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value["feature"], "modify");
        assert_eq!(value["variable"], 4);
    }

    #[test]
    fn layout_is_variable_then_load() {
        let vdir = variable_dir(Path::new("out"), 8);
        assert_eq!(load_dir(&vdir, 10000), Path::new("out/8/10000"));
    }

    #[test]
    fn output_is_written_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = load_dir(&variable_dir(tmp.path(), 2), 10000);
        ensure_dir(&dir).unwrap();
        // Creating it again is fine.
        ensure_dir(&dir).unwrap();

        let path = write_output(&dir, "switch.txt", "out\n", "err\n").unwrap();
        assert_eq!(path, dir.join("switch.txt"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "out\nerr\n");

        write_output(&dir, "switch.txt", "again\n", "").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "again\n");
    }

    #[test]
    fn timestamp_shape() {
        let ts = Timestamp::now().to_string();
        assert_eq!(ts.len(), "2020-01-02-03-04-05".len());
        assert_eq!(ts.matches('-').count(), 5);
    }
}
