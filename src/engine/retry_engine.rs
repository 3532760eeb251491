use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::common::{Point, Region, RunState};
use crate::emulator::{Actions, DeviceChannel, FrameSource};
use crate::engine::{Outcome, RetryPolicy, SequenceReport};
use crate::vision::{MatchResult, Matcher, Template, TemplateStore};

/// Polls the screen and acts on what it finds.
///
/// No method returns an error: capture, template and match failures are
/// logged and count as "not found" so the caller can always carry on.
pub struct RetryEngine {
    frames: FrameSource,
    actions: Actions,
    templates: TemplateStore,
    matcher: Matcher,
    run_state: RunState,
}

impl RetryEngine {
    pub fn new(
        channel: Arc<dyn DeviceChannel>,
        templates: TemplateStore,
        matcher: Matcher,
        run_state: RunState,
    ) -> Self {
        Self {
            frames: FrameSource::new(Arc::clone(&channel)),
            actions: Actions::new(channel),
            templates,
            matcher,
            run_state,
        }
    }

    pub fn actions(&self) -> &Actions {
        &self.actions
    }

    pub fn run_state(&self) -> &RunState {
        &self.run_state
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    /// One capture and match, without acting.
    pub fn check(&mut self, template: &Path, region: Option<Region>) -> MatchResult {
        match self.templates.load(template) {
            Ok(loaded) => self.check_loaded(&loaded, region),
            Err(e) => {
                warn!("Cannot check {}: {}", template.display(), e);
                MatchResult::not_found()
            }
        }
    }

    fn check_loaded(&self, template: &Template, region: Option<Region>) -> MatchResult {
        let frame = match self.frames.capture() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("No screen available: {}", e);
                return MatchResult::not_found();
            }
        };
        match self.matcher.match_template(&frame, template, region) {
            Ok(result) => result,
            Err(e) => {
                warn!("Cannot match {}: {}", template.path().display(), e);
                MatchResult::not_found()
            }
        }
    }

    /// Taps the centre of `template` once it shows up.
    pub fn find_and_click(
        &mut self,
        template: &Path,
        policy: RetryPolicy,
        region: Option<Region>,
    ) -> Outcome {
        match self.templates.load(template) {
            Ok(loaded) => self.find_and_click_loaded(&loaded, policy, region),
            Err(e) => {
                warn!("Skipping {}: {}", template.display(), e);
                Outcome::Skipped
            }
        }
    }

    fn find_and_click_loaded(
        &mut self,
        loaded: &Template,
        policy: RetryPolicy,
        region: Option<Region>,
    ) -> Outcome {
        let template = loaded.path();
        for attempt in 1..=policy.max_attempts {
            if !self.run_state.is_running() {
                info!("Stopping, abandoning search for {}", template.display());
                return Outcome::Stopped;
            }

            let result = self.check_loaded(loaded, region);
            if let (true, Some(center)) = (result.found, result.center()) {
                self.actions.tap(center.x, center.y);
                info!(
                    "Found and tapped {} at {} (score {:.3})",
                    template.display(),
                    center,
                    result.score
                );
                self.run_state.pause(policy.delay());
                return Outcome::Success;
            }

            info!(
                "{} not found, attempt {}/{}",
                template.display(),
                attempt,
                policy.max_attempts
            );
            self.run_state.pause(policy.delay());
        }

        if !self.run_state.is_running() {
            return Outcome::Stopped;
        }
        error!(
            "Gave up on {} after {} attempts",
            template.display(),
            policy.max_attempts
        );
        Outcome::Exhausted
    }

    /// Runs `find_and_click` over `templates` in order.
    ///
    /// Missing assets and failed steps are logged and skipped; only a stop
    /// leaves the sequence incomplete.
    pub fn click_sequence(
        &mut self,
        templates: &[PathBuf],
        policy: RetryPolicy,
        region: Option<Region>,
    ) -> SequenceReport {
        let mut report = SequenceReport::default();
        let total = templates.len();

        for (index, template) in templates.iter().enumerate() {
            let step = index + 1;
            if !self.run_state.is_running() {
                info!("Stopping sequence before step {}/{}", step, total);
                report.stopped = true;
                return report;
            }

            let loaded = match self.templates.load(template) {
                Ok(loaded) => loaded,
                Err(e) => {
                    warn!("Skipping step {}/{}: {}", step, total, e);
                    report.skipped += 1;
                    continue;
                }
            };

            info!("Step {}/{}: looking for {}", step, total, template.display());
            match self.find_and_click_loaded(&loaded, policy, region) {
                Outcome::Success => {
                    info!("Step {}/{} done: {}", step, total, template.display());
                    report.clicked += 1;
                }
                Outcome::Stopped => {
                    report.stopped = true;
                    return report;
                }
                Outcome::Exhausted | Outcome::Skipped => {
                    warn!(
                        "Step {}/{} failed: {}, moving on",
                        step,
                        total,
                        template.display()
                    );
                    report.failed += 1;
                }
            }
            self.run_state.pause(policy.delay());
        }

        report
    }

    /// Taps `coords` until `template` becomes visible.
    pub fn click_until_next(
        &mut self,
        coords: Point,
        template: &Path,
        policy: RetryPolicy,
        region: Option<Region>,
    ) -> Outcome {
        let loaded = match self.templates.load(template) {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!("Skipping wait for {}: {}", template.display(), e);
                return Outcome::Skipped;
            }
        };

        for attempt in 1..=policy.max_attempts {
            if !self.run_state.is_running() {
                info!("Stopping, abandoning wait for {}", template.display());
                return Outcome::Stopped;
            }

            self.actions.tap(coords.x, coords.y);
            info!(
                "Waiting for {}, attempt {}/{}",
                template.display(),
                attempt,
                policy.max_attempts
            );
            if self.check_loaded(&loaded, region).found {
                info!("Detected {}", template.display());
                return Outcome::Success;
            }
            self.run_state.pause(policy.delay());
        }

        if !self.run_state.is_running() {
            return Outcome::Stopped;
        }
        error!(
            "{} never appeared after {} attempts",
            template.display(),
            policy.max_attempts
        );
        Outcome::Exhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::DeviceCommand;
    use crate::testing::{noise_image, FakeDevice};
    use crate::vision::MatchConfig;
    use image::{imageops, RgbImage};
    use tempfile::TempDir;

    const NO_DELAY: RetryPolicy = RetryPolicy {
        max_attempts: 5,
        delay_ms: 0,
    };

    struct Fixture {
        dir: TempDir,
        screen: RgbImage,
        blank: RgbImage,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
                screen: noise_image(64, 48, 3),
                blank: noise_image(64, 48, 77),
            }
        }

        /// Saves the part of the screen at (x, y) as a template file.
        fn template(&self, name: &str, x: u32, y: u32) -> PathBuf {
            let path = self.dir.path().join(name);
            imageops::crop_imm(&self.screen, x, y, 10, 8)
                .to_image()
                .save(&path)
                .unwrap();
            path
        }

        fn missing(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }
    }

    fn engine(device: &Arc<FakeDevice>, run_state: RunState) -> RetryEngine {
        RetryEngine::new(
            device.clone(),
            TemplateStore::default(),
            Matcher::new(MatchConfig::default()),
            run_state,
        )
    }

    #[test]
    fn never_matching_template_polls_exactly_n_times() {
        let fixture = Fixture::new();
        let template = fixture.template("button.png", 20, 10);
        let device = Arc::new(FakeDevice::new().with_screen(&fixture.blank));
        let mut engine = engine(&device, RunState::new());

        let outcome = engine.find_and_click(&template, NO_DELAY, None);

        assert_eq!(outcome, Outcome::Exhausted);
        assert_eq!(device.screencaps(), 5);
        assert!(device.taps().is_empty());
    }

    #[test]
    fn immediate_match_taps_once_at_center() {
        let fixture = Fixture::new();
        let template = fixture.template("button.png", 20, 10);
        let device = Arc::new(FakeDevice::new().with_screen(&fixture.screen));
        let mut engine = engine(&device, RunState::new());

        let outcome = engine.find_and_click(&template, NO_DELAY, None);

        assert_eq!(outcome, Outcome::Success);
        assert_eq!(device.screencaps(), 1);
        assert_eq!(device.taps(), vec![(25, 14)]);
    }

    #[test]
    fn region_match_taps_in_frame_coordinates() {
        let fixture = Fixture::new();
        let template = fixture.template("button.png", 40, 30);
        let device = Arc::new(FakeDevice::new().with_screen(&fixture.screen));
        let mut engine = engine(&device, RunState::new());

        let outcome = engine.find_and_click(&template, NO_DELAY, Some(Region::new(32, 24, 32, 24)));

        assert_eq!(outcome, Outcome::Success);
        assert_eq!(device.taps(), vec![(45, 34)]);
    }

    #[test]
    fn out_of_bounds_region_never_crashes() {
        let fixture = Fixture::new();
        let template = fixture.template("button.png", 20, 10);
        let device = Arc::new(FakeDevice::new().with_screen(&fixture.screen));
        let mut engine = engine(&device, RunState::new());

        let outcome = engine.find_and_click(&template, NO_DELAY, Some(Region::new(776, 111, 148, 165)));

        assert_eq!(outcome, Outcome::Exhausted);
        assert!(device.taps().is_empty());
    }

    #[test]
    fn capture_failures_count_as_misses() {
        let fixture = Fixture::new();
        let template = fixture.template("button.png", 20, 10);
        let device = Arc::new(
            FakeDevice::new()
                .with_screen(&fixture.screen)
                .failing_on(|c| matches!(c, DeviceCommand::Screencap)),
        );
        let mut engine = engine(&device, RunState::new());

        assert_eq!(engine.find_and_click(&template, NO_DELAY, None), Outcome::Exhausted);
        assert_eq!(device.screencaps(), 5);
        assert!(device.taps().is_empty());
    }

    #[test]
    fn missing_template_is_skipped_without_polling() {
        let fixture = Fixture::new();
        let device = Arc::new(FakeDevice::new().with_screen(&fixture.screen));
        let mut engine = engine(&device, RunState::new());

        let outcome = engine.find_and_click(&fixture.missing("gone.png"), NO_DELAY, None);

        assert_eq!(outcome, Outcome::Skipped);
        assert!(device.commands().is_empty());
    }

    #[test]
    fn stopped_engine_does_nothing() {
        let fixture = Fixture::new();
        let template = fixture.template("button.png", 20, 10);
        let device = Arc::new(FakeDevice::new().with_screen(&fixture.screen));
        let run_state = RunState::new();
        run_state.stop();
        let mut engine = engine(&device, run_state);

        assert_eq!(engine.find_and_click(&template, NO_DELAY, None), Outcome::Stopped);
        assert_eq!(
            engine.click_until_next(Point::new(1, 1), &template, NO_DELAY, None),
            Outcome::Stopped
        );
        assert!(device.commands().is_empty());
    }

    #[test]
    fn sequence_skips_missing_asset_and_continues() {
        let fixture = Fixture::new();
        let missing = fixture.missing("a.png");
        let present = fixture.template("b.png", 20, 10);
        let device = Arc::new(FakeDevice::new().with_screen(&fixture.screen));
        let mut engine = engine(&device, RunState::new());

        let report = engine.click_sequence(&[missing, present], NO_DELAY, None);

        assert!(report.is_complete());
        assert_eq!(report.skipped, 1);
        assert_eq!(report.clicked, 1);
        assert_eq!(device.taps(), vec![(25, 14)]);
    }

    #[test]
    fn sequence_decodes_each_template_once() {
        let fixture = Fixture::new();
        let steps = vec![
            fixture.template("1.png", 20, 10),
            fixture.template("2.png", 40, 30),
        ];
        let device = Arc::new(FakeDevice::new().with_screen(&fixture.screen));
        let mut engine = RetryEngine::new(
            device.clone(),
            TemplateStore::new(0),
            Matcher::new(MatchConfig::default()),
            RunState::new(),
        );

        let report = engine.click_sequence(&steps, NO_DELAY, None);

        assert_eq!(report.clicked, 2);
        assert_eq!(engine.templates().decode_count(), 2);
    }

    #[test]
    fn sequence_carries_on_after_failed_step() {
        let fixture = Fixture::new();
        let unmatched = fixture.dir.path().join("unmatched.png");
        noise_image(10, 8, 500).save(&unmatched).unwrap();
        let present = fixture.template("b.png", 20, 10);
        let device = Arc::new(FakeDevice::new().with_screen(&fixture.screen));
        let mut engine = engine(&device, RunState::new());

        let report = engine.click_sequence(&[unmatched, present], NO_DELAY, None);

        assert!(report.is_complete());
        assert_eq!(report.failed, 1);
        assert_eq!(report.clicked, 1);
        assert_eq!(device.screencaps(), 6);
        assert_eq!(device.taps().len(), 1);
    }

    #[test]
    fn stop_mid_sequence_skips_remaining_steps() {
        let fixture = Fixture::new();
        let steps = vec![
            fixture.template("1.png", 20, 10),
            fixture.template("2.png", 40, 30),
            fixture.template("3.png", 0, 0),
        ];
        let run_state = RunState::new();
        let device = Arc::new(
            FakeDevice::new()
                .with_screen(&fixture.screen)
                .stop_after_taps(1, run_state.clone()),
        );
        let mut engine = engine(&device, run_state);

        let report = engine.click_sequence(&steps, NO_DELAY, None);

        assert!(!report.is_complete());
        assert_eq!(report.clicked, 1);
        assert_eq!(device.taps().len(), 1);
        assert_eq!(device.screencaps(), 1);
    }

    #[test]
    fn click_until_next_taps_until_target_appears() {
        let fixture = Fixture::new();
        let target = fixture.template("boss.png", 30, 20);
        let device = Arc::new(
            FakeDevice::new()
                .with_screen(&fixture.blank)
                .with_screen(&fixture.blank)
                .with_screen(&fixture.screen),
        );
        let mut engine = engine(&device, RunState::new());

        let outcome = engine.click_until_next(Point::new(704, 350), &target, NO_DELAY, None);

        assert_eq!(outcome, Outcome::Success);
        assert_eq!(device.taps(), vec![(704, 350); 3]);
        assert_eq!(device.screencaps(), 3);
    }

    #[test]
    fn click_until_next_gives_up_after_budget() {
        let fixture = Fixture::new();
        let target = fixture.template("boss.png", 30, 20);
        let device = Arc::new(FakeDevice::new().with_screen(&fixture.blank));
        let mut engine = engine(&device, RunState::new());

        let outcome = engine.click_until_next(Point::new(1146, 52), &target, NO_DELAY, None);

        assert_eq!(outcome, Outcome::Exhausted);
        assert_eq!(device.taps().len(), 5);
    }

    #[test]
    fn check_maps_failures_to_not_found() {
        let fixture = Fixture::new();
        let device = Arc::new(FakeDevice::new().with_screen_bytes(b"garbage".to_vec()));
        let template = fixture.template("teeth.png", 5, 5);
        let mut engine = engine(&device, RunState::new());

        assert!(!engine.check(&template, None).found);
        assert!(!engine.check(&fixture.missing("nope.png"), None).found);
        assert_eq!(device.screencaps(), 1);
    }
}
