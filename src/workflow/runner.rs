use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::control::SelectionBoard;
use crate::engine::{Outcome, RetryEngine};
use crate::workflow::{Step, Workflow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed,
    /// A gating step failed; the rest of the cycle was skipped.
    Aborted { step: &'static str },
    Stopped,
}

/// Executes one cycle of a workflow against a retry engine.
pub struct WorkflowRunner<'a> {
    engine: &'a mut RetryEngine,
    selections: &'a SelectionBoard,
    assets_dir: &'a Path,
}

impl<'a> WorkflowRunner<'a> {
    pub fn new(
        engine: &'a mut RetryEngine,
        selections: &'a SelectionBoard,
        assets_dir: &'a Path,
    ) -> Self {
        Self {
            engine,
            selections,
            assets_dir,
        }
    }

    pub fn run(&mut self, workflow: &Workflow) -> CycleOutcome {
        self.run_steps(&workflow.steps)
    }

    fn run_steps(&mut self, steps: &[Step]) -> CycleOutcome {
        for step in steps {
            if !self.engine.run_state().is_running() {
                return CycleOutcome::Stopped;
            }
            match self.run_step(step) {
                CycleOutcome::Completed => {}
                other => return other,
            }
        }
        CycleOutcome::Completed
    }

    fn run_step(&mut self, step: &Step) -> CycleOutcome {
        debug!("Running {} step", step.name());
        match step {
            Step::Sequence {
                templates,
                retry,
                region,
            } => {
                let paths: Vec<PathBuf> = templates.iter().map(|t| self.resolve(t)).collect();
                let report = self.engine.click_sequence(&paths, *retry, *region);
                if report.stopped {
                    return CycleOutcome::Stopped;
                }
                info!(
                    "Sequence finished: {} clicked, {} failed, {} skipped",
                    report.clicked, report.failed, report.skipped
                );
                CycleOutcome::Completed
            }
            Step::FindAndClick {
                template,
                retry,
                region,
                optional,
            } => {
                let path = self.resolve(template);
                let outcome = self.engine.find_and_click(&path, *retry, *region);
                gate(step.name(), outcome, *optional)
            }
            Step::ClickUntil {
                at,
                template,
                retry,
                region,
                optional,
            } => {
                let path = self.resolve(template);
                let outcome = self.engine.click_until_next(*at, &path, *retry, *region);
                gate(step.name(), outcome, *optional)
            }
            Step::Confirm {
                template,
                region,
                fallback,
                retry,
            } => {
                let path = self.resolve(template);
                if self.engine.check(&path, *region).found {
                    info!("Confirmed {}", path.display());
                    return CycleOutcome::Completed;
                }
                let Some(fallback) = fallback else {
                    warn!("{} not on screen, continuing", path.display());
                    return CycleOutcome::Completed;
                };
                info!("{} not on screen, tapping {}", path.display(), fallback);
                match self.engine.click_until_next(*fallback, &path, *retry, *region) {
                    Outcome::Stopped => CycleOutcome::Stopped,
                    _ => CycleOutcome::Completed,
                }
            }
            Step::Tap { at } => {
                self.engine.actions().tap(at.x, at.y);
                CycleOutcome::Completed
            }
            Step::Swipe {
                from,
                to,
                duration_ms,
            } => {
                self.engine
                    .actions()
                    .swipe(from.x, from.y, to.x, to.y, *duration_ms);
                CycleOutcome::Completed
            }
            Step::Text { text } => {
                self.engine.actions().input_text(text);
                CycleOutcome::Completed
            }
            Step::Wait { ms } => {
                if self.engine.run_state().pause(Duration::from_millis(*ms)) {
                    CycleOutcome::Completed
                } else {
                    CycleOutcome::Stopped
                }
            }
            Step::Branch {
                slot,
                arms,
                otherwise,
            } => {
                let value = self.selections.get(slot);
                let arm = match value.as_deref().and_then(|v| arms.get(v)) {
                    Some(arm) => arm,
                    None => {
                        debug!("No arm for {} = {:?}, taking the default", slot, value);
                        otherwise
                    }
                };
                self.run_steps(arm)
            }
            Step::Stop => {
                info!("Workflow asked to stop");
                self.engine.run_state().stop();
                CycleOutcome::Stopped
            }
        }
    }

    fn resolve(&self, template: &Path) -> PathBuf {
        self.assets_dir.join(template)
    }
}

fn gate(step: &'static str, outcome: Outcome, optional: bool) -> CycleOutcome {
    match outcome {
        Outcome::Success => CycleOutcome::Completed,
        Outcome::Stopped => CycleOutcome::Stopped,
        Outcome::Exhausted | Outcome::Skipped if optional => {
            info!("Optional {} step did not succeed, continuing", step);
            CycleOutcome::Completed
        }
        Outcome::Exhausted | Outcome::Skipped => {
            warn!("{} step failed, abandoning this cycle", step);
            CycleOutcome::Aborted { step }
        }
    }
}
