//! The dimensions along which the generated P4 program can be made more expensive.

use std::fmt;
use std::str::FromStr;

use failure_derive::Fail;

use serde::{Deserialize, Serialize};

/// Returned when a feature name is not one of `Feature::ALL`.
#[derive(Debug, Fail)]
#[fail(display = "{} is not a valid benchmarking feature", _0)]
pub struct InvalidFeature(pub String);

/// A benchmarking feature. Each one maps a sweep variable onto a different knob of the program
/// generator.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Feature {
    /// Parse `variable` extra headers.
    ParseField,
    /// Perform `variable` set-field operations in a single action.
    SetField,
    /// Add `variable` headers to each packet.
    Modify,
    /// Push each packet through a pipeline of `variable` tables.
    Processing,
}

impl Feature {
    pub const ALL: [Feature; 4] = [
        Feature::ParseField,
        Feature::SetField,
        Feature::Modify,
        Feature::Processing,
    ];

    /// The names accepted on the command line, in the same order as `ALL`.
    pub const NAMES: [&'static str; 4] = ["parse-field", "set-field", "modify", "processing"];

    pub fn to_str(&self) -> &'static str {
        match self {
            Feature::ParseField => Self::NAMES[0],
            Feature::SetField => Self::NAMES[1],
            Feature::Modify => Self::NAMES[2],
            Feature::Processing => Self::NAMES[3],
        }
    }

    /// The arguments to pass to `generate_p4_program.py` to produce the variant of this feature
    /// with the given value of the sweep variable.
    pub fn generator_args(&self, variable: usize) -> String {
        match self {
            Feature::ParseField => format!("--parser-header --headers {}", variable),
            Feature::SetField => format!("--action-complexity --nb-operation {}", variable),
            Feature::Modify => format!("--mod-packet --mod-type add --headers {}", variable),
            Feature::Processing => format!("--pipeline --tables {}", variable),
        }
    }
}

impl FromStr for Feature {
    type Err = InvalidFeature;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::ALL
            .iter()
            .copied()
            .find(|feature| feature.to_str() == s)
            .ok_or_else(|| InvalidFeature(s.to_owned()))
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_args_per_feature() {
        assert_eq!(
            Feature::ParseField.generator_args(4),
            "--parser-header --headers 4"
        );
        assert_eq!(
            Feature::SetField.generator_args(8),
            "--action-complexity --nb-operation 8"
        );
        assert_eq!(
            Feature::Modify.generator_args(2),
            "--mod-packet --mod-type add --headers 2"
        );
        assert_eq!(
            Feature::Processing.generator_args(16),
            "--pipeline --tables 16"
        );
    }

    #[test]
    fn names_parse_back() {
        for (feature, name) in Feature::ALL.iter().zip(Feature::NAMES.iter()) {
            assert_eq!(feature.to_str(), *name);
            assert_eq!(name.parse::<Feature>().unwrap(), *feature);
        }
    }

    #[test]
    fn unknown_feature_is_rejected() {
        let err = "parse_field".parse::<Feature>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "parse_field is not a valid benchmarking feature"
        );
    }

    #[test]
    fn serializes_as_cli_name() {
        assert_eq!(
            serde_json::to_string(&Feature::SetField).unwrap(),
            "\"set-field\""
        );
    }
}
