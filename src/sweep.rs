//! The two axes of the benchmark: the sweep variable handed to the program generator, and the
//! offered load handed to MoonGen.

use failure_derive::Fail;

use serde::{Deserialize, Serialize};

/// Values of the sweep variable used when none are given.
pub const DEFAULT_VARIABLES: &[usize] = &[1, 2, 4, 8, 16];

/// Default offered load sweep (MoonGen `-l`). Only a single load is run by default.
pub const DEFAULT_LOAD_START: usize = 10000;
pub const DEFAULT_LOAD_END: usize = 10000;
pub const DEFAULT_LOAD_STEP: usize = 1000;

#[derive(Debug, Fail, PartialEq, Eq)]
pub enum SweepError {
    #[fail(display = "the load step must be greater than zero")]
    ZeroStep,

    #[fail(display = "the first load ({}) is greater than the last load ({})", start, end)]
    Reversed { start: usize, end: usize },

    #[fail(display = "at least one sweep variable is required")]
    NoVariables,
}

/// An inclusive range of offered loads, walked in fixed steps.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSweep {
    pub start: usize,
    pub end: usize,
    pub step: usize,
}

impl Default for LoadSweep {
    fn default() -> Self {
        LoadSweep {
            start: DEFAULT_LOAD_START,
            end: DEFAULT_LOAD_END,
            step: DEFAULT_LOAD_STEP,
        }
    }
}

impl LoadSweep {
    pub fn new(start: usize, end: usize, step: usize) -> Result<Self, SweepError> {
        if step == 0 {
            Err(SweepError::ZeroStep)
        } else if start > end {
            Err(SweepError::Reversed { start, end })
        } else {
            Ok(LoadSweep { start, end, step })
        }
    }

    /// Every load in the sweep, starting at `start` and ending at the last value `<= end`.
    pub fn loads(&self) -> impl Iterator<Item = usize> {
        (self.start..=self.end).step_by(self.step)
    }
}

/// Check that a list of sweep variables is usable.
pub fn check_variables(variables: &[usize]) -> Result<(), SweepError> {
    if variables.is_empty() {
        Err(SweepError::NoVariables)
    } else {
        Ok(())
    }
}
