pub mod presets;
pub mod runner;

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::common::{Point, Region};
use crate::control::SelectionBoard;
use crate::emulator::actions::DEFAULT_SWIPE_MS;
use crate::engine::RetryPolicy;

pub use runner::{CycleOutcome, WorkflowRunner};

/// A named list of steps run once per cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default)]
    pub description: String,
    /// Selection slots that must be set before a cycle starts.
    #[serde(default)]
    pub requires: Vec<String>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    Sequence {
        templates: Vec<PathBuf>,
        #[serde(default = "RetryPolicy::sequence")]
        retry: RetryPolicy,
        #[serde(default)]
        region: Option<Region>,
    },
    FindAndClick {
        template: PathBuf,
        #[serde(default = "RetryPolicy::find_and_click")]
        retry: RetryPolicy,
        #[serde(default)]
        region: Option<Region>,
        #[serde(default)]
        optional: bool,
    },
    ClickUntil {
        at: Point,
        template: PathBuf,
        #[serde(default = "RetryPolicy::click_until")]
        retry: RetryPolicy,
        #[serde(default)]
        region: Option<Region>,
        #[serde(default)]
        optional: bool,
    },
    /// Checks once; on a miss keeps tapping `fallback` until the template shows.
    Confirm {
        template: PathBuf,
        #[serde(default)]
        region: Option<Region>,
        #[serde(default)]
        fallback: Option<Point>,
        #[serde(default = "RetryPolicy::click_until")]
        retry: RetryPolicy,
    },
    Tap {
        at: Point,
    },
    Swipe {
        from: Point,
        to: Point,
        #[serde(default = "default_swipe_ms")]
        duration_ms: u64,
    },
    Text {
        text: String,
    },
    Wait {
        ms: u64,
    },
    /// Runs the arm keyed by the slot's current value, or `otherwise`.
    Branch {
        slot: String,
        #[serde(default)]
        arms: IndexMap<String, Vec<Step>>,
        #[serde(default)]
        otherwise: Vec<Step>,
    },
    Stop,
}

fn default_swipe_ms() -> u64 {
    DEFAULT_SWIPE_MS
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Sequence { .. } => "sequence",
            Step::FindAndClick { .. } => "find_and_click",
            Step::ClickUntil { .. } => "click_until",
            Step::Confirm { .. } => "confirm",
            Step::Tap { .. } => "tap",
            Step::Swipe { .. } => "swipe",
            Step::Text { .. } => "text",
            Step::Wait { .. } => "wait",
            Step::Branch { .. } => "branch",
            Step::Stop => "stop",
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            Step::Sequence { templates, .. } if templates.is_empty() => {
                Err("sequence step has no templates".to_string())
            }
            Step::Branch { slot, arms, otherwise } => {
                if slot.is_empty() {
                    return Err("branch step has no slot".to_string());
                }
                arms.values()
                    .chain(std::iter::once(otherwise))
                    .flatten()
                    .try_for_each(Step::validate)
            }
            _ => Ok(()),
        }
    }
}

impl Workflow {
    pub fn new(description: impl Into<String>, requires: &[&str], steps: Vec<Step>) -> Self {
        Self {
            description: description.into(),
            requires: requires.iter().map(|slot| slot.to_string()).collect(),
            steps,
        }
    }

    /// First required slot the operator has not filled yet.
    pub fn missing_selection(&self, selections: &SelectionBoard) -> Option<&str> {
        self.requires
            .iter()
            .find(|slot| selections.get(slot).is_none())
            .map(String::as_str)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.steps.is_empty() {
            return Err("workflow has no steps".to_string());
        }
        self.steps.iter().try_for_each(Step::validate)
    }
}
