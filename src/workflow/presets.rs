//! Workflows that ship with the binary. Template paths are relative to the
//! configured assets directory.
use indexmap::IndexMap;

use crate::common::{Point, Region};
use crate::engine::RetryPolicy;
use crate::workflow::{Step, Workflow};

pub const FARMING: &str = "farming";
pub const RELIC: &str = "relic";

/// Centre of the screen, tapped to advance dialogue.
const ADVANCE: Point = Point { x: 704, y: 350 };

/// Send buttons of the three visible domain rows.
const SEND_SLOTS: [Region; 3] = [
    Region { x: 1004, y: 335, width: 166, height: 98 },
    Region { x: 1010, y: 430, width: 162, height: 104 },
    Region { x: 1008, y: 534, width: 162, height: 92 },
];

pub fn builtin() -> IndexMap<String, Workflow> {
    let mut workflows = IndexMap::new();
    workflows.insert(FARMING.to_string(), farming());
    workflows.insert(RELIC.to_string(), relic());
    workflows
}

pub fn farming() -> Workflow {
    Workflow::new(
        "Login, tooth region, submenu, monster and boss, then collect",
        &[],
        vec![
            sequence(&["farming/1.png", "farming/2.png"]),
            tap(961, 257),
            Step::Confirm {
                template: "farming/teeth.png".into(),
                region: Some(Region::new(776, 111, 148, 165)),
                fallback: Some(Point::new(1146, 52)),
                retry: RetryPolicy::click_until(),
            },
            swipe((841, 166), (420, 251), 500),
            wait(1000),
            tap(92, 50),
            wait(1000),
            sequence(&["farming/3.png", "farming/4.png", "farming/5.png"]),
            click_until(ADVANCE, "farming/monster.png"),
            find_and_click("farming/monster.png"),
            click_until(ADVANCE, "farming/boss.png"),
            sequence(&[
                "farming/7.png",
                "farming/8.png",
                "farming/9.png",
                "farming/10.png",
                "farming/11.png",
                "farming/12.png",
            ]),
        ],
    )
}

/// Driven by the `domain` slot (1 to 9, three per page) and the optional
/// `after_run` slot (`again` or `exit`).
pub fn relic() -> Workflow {
    let mut arms = IndexMap::new();
    for (page, scroll) in [Vec::new(), second_page(), third_page()].into_iter().enumerate() {
        for (row, region) in SEND_SLOTS.iter().enumerate() {
            let mut steps = scroll.clone();
            // A missed send button still moves on to the start button.
            steps.push(Step::FindAndClick {
                template: "relic/send.png".into(),
                retry: RetryPolicy::find_and_click(),
                region: Some(*region),
                optional: true,
            });
            arms.insert((page * 3 + row + 1).to_string(), steps);
        }
    }

    let mut follow_up = IndexMap::new();
    follow_up.insert("again".to_string(), vec![find_and_click("relic/again.png")]);
    follow_up.insert(
        "exit".to_string(),
        vec![find_and_click("relic/exit.png"), Step::Stop],
    );

    Workflow::new(
        "Pick a domain, run it, then go again or exit",
        &["domain"],
        vec![
            find_and_click("relic/first.png"),
            Step::Branch {
                slot: "domain".to_string(),
                arms,
                otherwise: Vec::new(),
            },
            find_and_click("relic/startTo.png"),
            wait(3000),
            Step::Confirm {
                template: "relic/universe.png".into(),
                region: None,
                fallback: Some(ADVANCE),
                retry: RetryPolicy::click_until(),
            },
            swipe((246, 561), (246, 422), 3000),
            tap(1064, 552),
            Step::Confirm {
                template: "relic/exit.png".into(),
                region: None,
                fallback: Some(Point::new(1094, 334)),
                retry: RetryPolicy::click_until(),
            },
            Step::Branch {
                slot: "after_run".to_string(),
                arms: follow_up,
                otherwise: Vec::new(),
            },
        ],
    )
}

fn second_page() -> Vec<Step> {
    vec![swipe((657, 583), (657, 308), 3100), wait(1000)]
}

// The third page is reached by scrolling on from the second.
fn third_page() -> Vec<Step> {
    let mut steps = second_page();
    steps.extend([swipe((657, 583), (657, 300), 2800), wait(1000)]);
    steps
}

fn sequence(templates: &[&str]) -> Step {
    Step::Sequence {
        templates: templates.iter().map(Into::into).collect(),
        retry: RetryPolicy::sequence(),
        region: None,
    }
}

fn find_and_click(template: &str) -> Step {
    Step::FindAndClick {
        template: template.into(),
        retry: RetryPolicy::find_and_click(),
        region: None,
        optional: false,
    }
}

fn click_until(at: Point, template: &str) -> Step {
    Step::ClickUntil {
        at,
        template: template.into(),
        retry: RetryPolicy::click_until(),
        region: None,
        optional: false,
    }
}

fn tap(x: u32, y: u32) -> Step {
    Step::Tap { at: Point::new(x, y) }
}

fn swipe(from: (u32, u32), to: (u32, u32), duration_ms: u64) -> Step {
    Step::Swipe {
        from: Point::new(from.0, from.1),
        to: Point::new(to.0, to.1),
        duration_ms,
    }
}

fn wait(ms: u64) -> Step {
    Step::Wait { ms }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_workflows_are_valid() {
        for (name, workflow) in builtin() {
            assert!(workflow.validate().is_ok(), "{} is invalid", name);
        }
    }

    #[test]
    fn relic_has_an_arm_per_domain() {
        let workflow = relic();
        let Step::Branch { slot, arms, otherwise } = &workflow.steps[1] else {
            panic!("second relic step should branch on the domain");
        };
        assert_eq!(slot, "domain");
        assert!(otherwise.is_empty());
        let keys: Vec<_> = arms.keys().map(String::as_str).collect();
        assert_eq!(keys, ["1", "2", "3", "4", "5", "6", "7", "8", "9"]);

        assert!(matches!(
            arms["8"].last(),
            Some(Step::FindAndClick { region: Some(region), .. }) if *region == SEND_SLOTS[1]
        ));
    }

    fn swipes(steps: &[Step]) -> Vec<(u32, u64)> {
        steps
            .iter()
            .filter_map(|step| match step {
                Step::Swipe { to, duration_ms, .. } => Some((to.y, *duration_ms)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn later_domains_scroll_page_by_page() {
        let workflow = relic();
        let Step::Branch { arms, .. } = &workflow.steps[1] else {
            panic!("second relic step should branch on the domain");
        };

        for domain in ["1", "2", "3"] {
            assert!(swipes(&arms[domain]).is_empty());
        }
        for domain in ["4", "5", "6"] {
            assert_eq!(swipes(&arms[domain]), vec![(308, 3100)]);
        }
        for domain in ["7", "8", "9"] {
            assert_eq!(swipes(&arms[domain]), vec![(308, 3100), (300, 2800)]);
        }
    }

    #[test]
    fn missed_send_button_does_not_end_the_cycle() {
        let workflow = relic();
        let Step::Branch { arms, .. } = &workflow.steps[1] else {
            panic!("second relic step should branch on the domain");
        };
        for steps in arms.values() {
            assert!(matches!(
                steps.last(),
                Some(Step::FindAndClick { optional: true, .. })
            ));
        }
        assert!(matches!(
            &workflow.steps[2],
            Step::FindAndClick { template, optional: false, .. } if template.ends_with("startTo.png")
        ));
    }

    #[test]
    fn builtin_workflows_survive_json() {
        for (name, workflow) in builtin() {
            let json = serde_json::to_string(&workflow).unwrap();
            let parsed: Workflow = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, workflow, "{} changed through json", name);
        }
    }
}
