use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    common::RunState,
    config::Configuration,
    control::SelectionBoard,
    emulator::DeviceChannel,
    engine::RetryEngine,
    error::AppError,
    vision::{Matcher, TemplateStore},
    workflow::{CycleOutcome, Workflow, WorkflowRunner},
};

/// Runs one workflow in a loop until the run is stopped.
pub struct Coordinator {
    engine: RetryEngine,
    workflow_name: String,
    workflow: Workflow,
    selections: SelectionBoard,
    assets_dir: PathBuf,
    idle_delay: Duration,
}

impl Coordinator {
    pub fn run_state(&self) -> &RunState {
        self.engine.run_state()
    }

    pub fn selections(&self) -> &SelectionBoard {
        &self.selections
    }

    /// Blocks until stopped and returns the number of completed cycles.
    pub fn run(&mut self) -> usize {
        tracing::info!("Running workflow '{}'", self.workflow_name);
        let mut completed = 0;
        let mut waiting_on: Option<String> = None;

        while self.run_state().is_running() {
            if let Some(slot) = self.workflow.missing_selection(&self.selections) {
                if waiting_on.as_deref() != Some(slot) {
                    tracing::info!("Waiting for a selection: set {} <value>", slot);
                    waiting_on = Some(slot.to_string());
                }
                self.run_state().pause(self.idle_delay);
                continue;
            }
            waiting_on = None;

            match self.run_cycle() {
                CycleOutcome::Completed => {
                    completed += 1;
                    tracing::info!("Cycle {} of '{}' complete", completed, self.workflow_name);
                }
                CycleOutcome::Aborted { step } => {
                    tracing::warn!("Cycle abandoned at {} step, starting over", step);
                }
                CycleOutcome::Stopped => break,
            }
            self.run_state().pause(self.idle_delay);
        }

        tracing::info!(
            "Workflow '{}' stopped after {} completed cycles",
            self.workflow_name,
            completed
        );
        completed
    }

    pub fn run_cycle(&mut self) -> CycleOutcome {
        WorkflowRunner::new(&mut self.engine, &self.selections, &self.assets_dir).run(&self.workflow)
    }

    pub fn stop(&self) {
        self.run_state().stop();
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

pub struct CoordinatorBuilder {
    configuration: Configuration,
    channel: Option<Arc<dyn DeviceChannel>>,
    run_state: Option<RunState>,
    selections: Option<SelectionBoard>,
}

impl CoordinatorBuilder {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            channel: None,
            run_state: None,
            selections: None,
        }
    }

    // Picks the workflow to run, this will override the default configuration.
    pub fn workflow(mut self, workflow: impl Into<String>) -> Self {
        self.configuration.workflow = workflow.into();
        self
    }

    // Sets the assets directory, this will override the default configuration.
    pub fn assets_dir(mut self, assets_dir: impl Into<PathBuf>) -> Self {
        self.configuration.assets_dir = assets_dir.into();
        self
    }

    // Adjusts the pause between cycles, this will override the default configuration.
    pub fn idle_delay_ms(mut self, idle_delay_ms: u64) -> Self {
        self.configuration.idle_delay_ms = idle_delay_ms;
        self
    }

    pub fn channel(mut self, channel: Arc<dyn DeviceChannel>) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn run_state(mut self, run_state: RunState) -> Self {
        self.run_state = Some(run_state);
        self
    }

    pub fn selections(mut self, selections: SelectionBoard) -> Self {
        self.selections = Some(selections);
        self
    }

    pub fn build(self) -> Result<Coordinator, AppError> {
        let channel = self
            .channel
            .ok_or(AppError::Setup("Device channel not set".to_string()))?;
        self.configuration.validate()?;

        let name = self.configuration.workflow.clone();
        let workflow = self
            .configuration
            .resolve_workflow(&name)
            .ok_or_else(|| AppError::Workflow(format!("Unknown workflow '{}'", name)))?;

        let engine = RetryEngine::new(
            channel,
            TemplateStore::new(self.configuration.template_cache_capacity),
            Matcher::new(self.configuration.matching.clone()),
            self.run_state.unwrap_or_default(),
        );

        Ok(Coordinator {
            engine,
            workflow_name: name,
            workflow,
            selections: self.selections.unwrap_or_default(),
            assets_dir: self.configuration.assets_dir,
            idle_delay: Duration::from_millis(self.configuration.idle_delay_ms),
        })
    }
}
