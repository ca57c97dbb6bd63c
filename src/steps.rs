//! The guided step sequence and the table that drives it.
//!
//! A click completes a step: the clicked name is resolved to an
//! [`Identity`], whose [`Transition`] says which step it completes and what
//! to hide. The progress tracker then acknowledges the step the learner has
//! reached, and only that acknowledgment reveals the next interactable
//! ([`Step::reveals`]).
//!
//! | Clicked            | Matched on | Completes | Hides        | Acknowledged step reveals |
//! |--------------------|------------|-----------|--------------|---------------------------|
//! | either glove       | object     | `step1`   | gloves       | `step2`: flint striker    |
//! | flint striker      | parent     | `step2`   | flint striker| `step3`: toothpick        |
//! | toothpick          | parent     | `step3`   | toothpick    | `step4`: petri dish swab  |
//! | petri dish swab    | object     | `step4`   | toothpick    | `complete`: result        |

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{LabError, UnknownStep};
use crate::scene::SceneGraph;
use crate::tracker::{Acknowledger, ProgressTracker};

/// Object names shared by the step table and the default bench manifest.
pub mod names {
    pub const GLOVES: &str = "Gloves";
    pub const GLOVE_LEFT: &str = "Glove_Left";
    pub const GLOVE_RIGHT: &str = "Glove_Right";
    pub const FLINT_STRIKER: &str = "FlintStriker";
    pub const FLINT_STRIKER_BODY: &str = "FlintStriker_Body";
    pub const FLINT_STRIKER_ROD: &str = "FlintStriker_Rod";
    pub const TOOTHPICK: &str = "Toothpick";
    pub const TOOTHPICK_STICK: &str = "Toothpick_Stick";
    pub const PETRI_DISH: &str = "PetriDish";
    pub const PETRI_DISH_BASE: &str = "PetriDish_Base";
    pub const PETRI_DISH_SWAB: &str = "PetriDish_Swab";
    pub const RESULT: &str = "Result";
    pub const RESULT_COLONIES: &str = "Result_Colonies";
    pub const BENCH: &str = "Bench";
    pub const BENCH_TOP: &str = "Bench_Top";
}

/// One stage of the tutorial, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    Step1,
    Step2,
    Step3,
    Step4,
    Complete,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::Step1,
        Step::Step2,
        Step::Step3,
        Step::Step4,
        Step::Complete,
    ];

    /// The tag exchanged with the progress tracker.
    pub fn as_tag(self) -> &'static str {
        match self {
            Step::Step1 => "step1",
            Step::Step2 => "step2",
            Step::Step3 => "step3",
            Step::Step4 => "step4",
            Step::Complete => "complete",
        }
    }

    /// The following step; `Complete` is terminal.
    pub fn next(self) -> Step {
        match self {
            Step::Step1 => Step::Step2,
            Step::Step2 => Step::Step3,
            Step::Step3 => Step::Step4,
            Step::Step4 | Step::Complete => Step::Complete,
        }
    }

    /// Objects revealed once the learner has reached this step.
    pub fn reveals(self) -> &'static [&'static str] {
        match self {
            Step::Step1 => &[],
            Step::Step2 => &[names::FLINT_STRIKER],
            Step::Step3 => &[names::TOOTHPICK],
            Step::Step4 => &[names::PETRI_DISH_SWAB],
            Step::Complete => &[names::RESULT],
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl FromStr for Step {
    type Err = UnknownStep;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Step::ALL
            .into_iter()
            .find(|step| step.as_tag() == s)
            .ok_or_else(|| UnknownStep(s.to_string()))
    }
}

/// Every clickable thing that moves the tutorial forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Identity {
    Gloves,
    FlintStriker,
    Toothpick,
    PetriDishSwab,
}

/// What completing an identity's interaction does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub step: Step,
    /// Names hidden immediately on click (group roots hide their parts).
    pub hides: &'static [&'static str],
}

impl Identity {
    pub fn transition(self) -> Transition {
        match self {
            Identity::Gloves => Transition {
                step: Step::Step1,
                hides: &[names::GLOVES],
            },
            Identity::FlintStriker => Transition {
                step: Step::Step2,
                hides: &[names::FLINT_STRIKER],
            },
            Identity::Toothpick => Transition {
                step: Step::Step3,
                hides: &[names::TOOTHPICK],
            },
            // The toothpick is already hidden by step3; hiding it again is a no-op
            Identity::PetriDishSwab => Transition {
                step: Step::Step4,
                hides: &[names::TOOTHPICK],
            },
        }
    }
}

/// Which name of a clicked part a rule compares against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MatchOn {
    /// The part's own name.
    Object,
    /// The name of the part's group root.
    Parent,
}

/// Binds a name to an identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameRule {
    pub name: String,
    pub match_on: MatchOn,
    pub identity: Identity,
}

impl NameRule {
    pub fn new(name: impl Into<String>, match_on: MatchOn, identity: Identity) -> Self {
        Self {
            name: name.into(),
            match_on,
            identity,
        }
    }
}

/// The names of a clicked part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClickTarget {
    pub object: String,
    pub parent: Option<String>,
}

impl ClickTarget {
    pub fn new(object: impl Into<String>, parent: Option<&str>) -> Self {
        Self {
            object: object.into(),
            parent: parent.map(str::to_string),
        }
    }
}

/// Validated name → identity lookup.
#[derive(Clone, Debug)]
pub struct StepTable {
    rules: Vec<NameRule>,
}

impl StepTable {
    /// Builds a table, rejecting empty names and names bound twice.
    pub fn new(rules: Vec<NameRule>) -> Result<Self, LabError> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if rule.name.is_empty() {
                return Err(LabError::EmptyRuleName);
            }
            if !seen.insert((rule.name.as_str(), rule.match_on)) {
                return Err(LabError::DuplicateRule(rule.name.clone()));
            }
        }
        Ok(Self { rules })
    }

    /// The bench's fixed table.
    pub fn standard() -> Self {
        Self {
            rules: standard_rules(),
        }
    }

    pub fn rules(&self) -> &[NameRule] {
        &self.rules
    }

    /// Resolves the object name first, then the parent name.
    pub fn resolve(&self, target: &ClickTarget) -> Option<Identity> {
        let by = |match_on: MatchOn, name: &str| {
            self.rules
                .iter()
                .find(|r| r.match_on == match_on && r.name == name)
                .map(|r| r.identity)
        };

        by(MatchOn::Object, &target.object)
            .or_else(|| target.parent.as_deref().and_then(|p| by(MatchOn::Parent, p)))
    }
}

impl Default for StepTable {
    fn default() -> Self {
        Self::standard()
    }
}

fn standard_rules() -> Vec<NameRule> {
    vec![
        NameRule::new(names::GLOVE_LEFT, MatchOn::Object, Identity::Gloves),
        NameRule::new(names::GLOVE_RIGHT, MatchOn::Object, Identity::Gloves),
        NameRule::new(names::FLINT_STRIKER, MatchOn::Parent, Identity::FlintStriker),
        NameRule::new(names::TOOTHPICK, MatchOn::Parent, Identity::Toothpick),
        NameRule::new(names::PETRI_DISH_SWAB, MatchOn::Object, Identity::PetriDishSwab),
    ]
}

/// Owns the current step and applies transitions to the scene.
pub struct StepController {
    table: StepTable,
    last_completed: Option<Step>,
    reached: Step,
    emitted: Vec<Step>,
}

impl Default for StepController {
    fn default() -> Self {
        Self::new(StepTable::standard())
    }
}

impl StepController {
    pub fn new(table: StepTable) -> Self {
        Self {
            table,
            last_completed: None,
            reached: Step::Step1,
            emitted: Vec::new(),
        }
    }

    pub fn table(&self) -> &StepTable {
        &self.table
    }

    /// The most recent step completed by a click; `None` while idle.
    pub fn last_completed(&self) -> Option<Step> {
        self.last_completed
    }

    /// The furthest step the tracker has acknowledged.
    pub fn reached(&self) -> Step {
        self.reached
    }

    /// Every step emitted to the tracker, in order.
    pub fn emitted(&self) -> &[Step] {
        &self.emitted
    }

    pub fn is_complete(&self) -> bool {
        self.reached == Step::Complete
    }

    /// Completes the step `target` maps to.
    ///
    /// Hides the objects of the finished interaction and notifies the
    /// tracker. Unmapped targets and steps earlier than the last completed
    /// one change nothing.
    ///
    /// Clicking the last completed step again reaches the tracker only while
    /// that step is still unacknowledged, so a tracker that failed to record
    /// it gets another attempt. Once acknowledged, the repeat returns `None`.
    pub fn advance(
        &mut self,
        scene: &mut SceneGraph,
        target: &ClickTarget,
        tracker: &mut dyn ProgressTracker,
        ack: &Acknowledger,
    ) -> Option<Step> {
        let Some(identity) = self.table.resolve(target) else {
            log::info!(
                "no step mapped to '{}' (parent {:?})",
                target.object,
                target.parent
            );
            return None;
        };

        let transition = identity.transition();
        if let Some(last) = self.last_completed {
            if transition.step < last {
                log::warn!(
                    "ignoring click on '{}': {} is before already completed {}",
                    target.object,
                    transition.step,
                    last
                );
                return None;
            }
            if transition.step == last && self.reached > last {
                log::debug!(
                    "'{}' repeats acknowledged {}; not re-recorded",
                    target.object,
                    last
                );
                return None;
            }
        }

        for name in transition.hides {
            let hidden = scene.set_visible_by_name(name, false);
            log::debug!("hid '{}' ({} entities changed)", name, hidden);
        }

        log::info!("'{}' completed {}", target.object, transition.step);
        self.last_completed = Some(transition.step);
        self.emitted.push(transition.step);
        tracker.record(transition.step, ack);
        Some(transition.step)
    }

    /// Applies an acknowledgment: reveals what `tag`'s step gates.
    pub fn on_step_complete(&mut self, scene: &mut SceneGraph, tag: &str) -> Option<Step> {
        let step = match tag.parse::<Step>() {
            Ok(step) => step,
            Err(e) => {
                log::warn!("{}", e);
                return None;
            }
        };

        for name in step.reveals() {
            let shown = scene.set_visible_by_name(name, true);
            if shown == 0 && scene.find(name).is_none() {
                log::warn!("{} reveals '{}', which has not loaded", step, name);
            }
        }

        self.reached = self.reached.max(step);
        log::info!("reached {}", step);
        Some(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::acknowledgement_channel;

    #[test]
    fn tags_parse_and_order() {
        for step in Step::ALL {
            assert_eq!(step.as_tag().parse::<Step>().unwrap(), step);
        }
        assert!(Step::Step1 < Step::Step4 && Step::Step4 < Step::Complete);
        assert_eq!(Step::Complete.next(), Step::Complete);
        assert!("step9".parse::<Step>().is_err());
    }

    #[test]
    fn standard_rules_pass_validation() {
        assert!(StepTable::new(standard_rules()).is_ok());
    }

    #[test]
    fn duplicate_and_empty_rules_are_rejected() {
        let dup = vec![
            NameRule::new("Glove_Left", MatchOn::Object, Identity::Gloves),
            NameRule::new("Glove_Left", MatchOn::Object, Identity::Toothpick),
        ];
        assert!(matches!(StepTable::new(dup), Err(LabError::DuplicateRule(n)) if n == "Glove_Left"));

        let empty = vec![NameRule::new("", MatchOn::Parent, Identity::Gloves)];
        assert!(matches!(StepTable::new(empty), Err(LabError::EmptyRuleName)));

        // Same name on different sides is fine
        let split = vec![
            NameRule::new("Toothpick", MatchOn::Object, Identity::Toothpick),
            NameRule::new("Toothpick", MatchOn::Parent, Identity::Toothpick),
        ];
        assert!(StepTable::new(split).is_ok());
    }

    #[test]
    fn resolves_by_object_then_parent() {
        let table = StepTable::standard();
        let glove = ClickTarget::new(names::GLOVE_RIGHT, Some(names::GLOVES));
        let rod = ClickTarget::new(names::FLINT_STRIKER_ROD, Some(names::FLINT_STRIKER));
        let stick = ClickTarget::new(names::TOOTHPICK_STICK, Some(names::TOOTHPICK));
        let swab = ClickTarget::new(names::PETRI_DISH_SWAB, Some(names::PETRI_DISH));
        let base = ClickTarget::new(names::PETRI_DISH_BASE, Some(names::PETRI_DISH));

        assert_eq!(table.resolve(&glove), Some(Identity::Gloves));
        assert_eq!(table.resolve(&rod), Some(Identity::FlintStriker));
        assert_eq!(table.resolve(&stick), Some(Identity::Toothpick));
        assert_eq!(table.resolve(&swab), Some(Identity::PetriDishSwab));
        assert_eq!(table.resolve(&base), None);

        // A part named like a parent-matched group does not match on its own name
        let bare = ClickTarget::new(names::TOOTHPICK, None);
        assert_eq!(table.resolve(&bare), None);
    }

    #[test]
    fn every_identity_completes_a_distinct_step() {
        let steps: HashSet<Step> = [
            Identity::Gloves,
            Identity::FlintStriker,
            Identity::Toothpick,
            Identity::PetriDishSwab,
        ]
        .into_iter()
        .map(|i| i.transition().step)
        .collect();
        assert_eq!(steps.len(), 4);
    }

    #[test]
    fn regressing_clicks_are_ignored() {
        let mut scene = SceneGraph::new();
        let gloves = scene.spawn_model(names::GLOVES, true);
        let mut controller = StepController::default();
        let (ack, _acks) = acknowledgement_channel();
        let mut recorded = Vec::new();
        let mut tracker = |step: Step, _: &Acknowledger| recorded.push(step);

        let stick = ClickTarget::new(names::TOOTHPICK_STICK, Some(names::TOOTHPICK));
        let glove = ClickTarget::new(names::GLOVE_LEFT, Some(names::GLOVES));

        assert_eq!(
            controller.advance(&mut scene, &stick, &mut tracker, &ack),
            Some(Step::Step3)
        );
        assert_eq!(controller.advance(&mut scene, &glove, &mut tracker, &ack), None);
        assert!(scene.is_visible(gloves));
        assert_eq!(controller.emitted(), &[Step::Step3]);
        assert_eq!(recorded, vec![Step::Step3]);
    }

    #[test]
    fn repeats_are_recorded_again_only_until_acknowledged() {
        let mut scene = SceneGraph::new();
        scene.spawn_model(names::GLOVES, true);
        let mut controller = StepController::default();
        let (ack, _acks) = acknowledgement_channel();
        let mut recorded = Vec::new();
        let mut tracker = |step: Step, _: &Acknowledger| recorded.push(step);
        let glove = ClickTarget::new(names::GLOVE_LEFT, Some(names::GLOVES));

        let first = controller.advance(&mut scene, &glove, &mut tracker, &ack);
        let retry = controller.advance(&mut scene, &glove, &mut tracker, &ack);
        assert_eq!((first, retry), (Some(Step::Step1), Some(Step::Step1)));

        controller.on_step_complete(&mut scene, "step2");
        assert_eq!(controller.advance(&mut scene, &glove, &mut tracker, &ack), None);
        assert_eq!(recorded, vec![Step::Step1, Step::Step1]);
        assert_eq!(controller.last_completed(), Some(Step::Step1));
    }

    #[test]
    fn unknown_tags_change_nothing() {
        let mut scene = SceneGraph::new();
        let flint = scene.spawn_model(names::FLINT_STRIKER, false);
        let mut controller = StepController::default();

        assert_eq!(controller.on_step_complete(&mut scene, "step7"), None);
        assert!(!scene.is_visible(flint));
        assert_eq!(controller.reached(), Step::Step1);
    }

    #[test]
    fn reached_never_regresses() {
        let mut scene = SceneGraph::new();
        let mut controller = StepController::default();
        controller.on_step_complete(&mut scene, "step4");
        controller.on_step_complete(&mut scene, "step2");
        assert_eq!(controller.reached(), Step::Step4);
        controller.on_step_complete(&mut scene, "complete");
        assert!(controller.is_complete());
    }
}
