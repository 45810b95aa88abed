//! Age-based reading addition.
//!
//! The table is a step function: the add for an age is the value of the last
//! entry whose age does not exceed it. Entries must be sorted by age with a
//! non-decreasing add.

use crate::error::{RefractionError, Result};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AddStep {
    pub age: u32,
    pub add: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<AddStep>", into = "Vec<AddStep>")]
pub struct AddTable {
    steps: Vec<AddStep>,
}

const DEFAULT_STEPS: [(u32, f32); 8] = [
    (40, 0.75),
    (43, 1.00),
    (45, 1.25),
    (48, 1.50),
    (50, 1.75),
    (53, 2.00),
    (55, 2.25),
    (58, 2.50),
];

impl Default for AddTable {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEPS
                .iter()
                .map(|&(age, add)| AddStep { age, add })
                .collect(),
        }
    }
}

impl AddTable {
    pub fn new(steps: Vec<AddStep>) -> Result<Self> {
        for pair in steps.windows(2) {
            if pair[1].age <= pair[0].age {
                return Err(RefractionError::InvalidParams(format!(
                    "presbyopia ages not increasing at {}",
                    pair[1].age
                )));
            }
            if pair[1].add < pair[0].add {
                return Err(RefractionError::InvalidParams(format!(
                    "presbyopia add decreases at age {}",
                    pair[1].age
                )));
            }
        }
        if let Some(bad) = steps.iter().find(|s| !s.add.is_finite() || s.add < 0.0) {
            return Err(RefractionError::InvalidParams(format!(
                "invalid add {} at age {}",
                bad.add, bad.age
            )));
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[AddStep] {
        &self.steps
    }

    /// Add power for `age`, or `None` below the first entry.
    pub fn add_for_age(&self, age: u32) -> Option<f32> {
        self.steps
            .iter()
            .take_while(|s| s.age <= age)
            .last()
            .map(|s| s.add)
    }
}

impl TryFrom<Vec<AddStep>> for AddTable {
    type Error = RefractionError;

    fn try_from(steps: Vec<AddStep>) -> Result<Self> {
        Self::new(steps)
    }
}

impl From<AddTable> for Vec<AddStep> {
    fn from(table: AddTable) -> Self {
        table.steps
    }
}
