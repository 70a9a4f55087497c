//! Build phase state machine

use serde::{Deserialize, Serialize};
use std::fmt;

/// One discrete, ordered stage of the build pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Uploading,
    Extracting,
    Validating,
    Generating,
    Installing,
    Building,
    Distributing,
    Completed,
    Failed,
}

impl Phase {
    /// Every phase in pipeline order, with the failure sink last
    pub const ALL: [Phase; 9] = [
        Phase::Uploading,
        Phase::Extracting,
        Phase::Validating,
        Phase::Generating,
        Phase::Installing,
        Phase::Building,
        Phase::Distributing,
        Phase::Completed,
        Phase::Failed,
    ];

    /// Label reported for identifiers the tracker has never seen.
    /// Never stored on a record.
    pub const NOT_FOUND: &'static str = "NOT_FOUND";

    /// The phase that follows this one on the success path
    #[must_use]
    pub const fn next(self) -> Option<Phase> {
        match self {
            Phase::Uploading => Some(Phase::Extracting),
            Phase::Extracting => Some(Phase::Validating),
            Phase::Validating => Some(Phase::Generating),
            Phase::Generating => Some(Phase::Installing),
            Phase::Installing => Some(Phase::Building),
            Phase::Building => Some(Phase::Distributing),
            Phase::Distributing => Some(Phase::Completed),
            Phase::Completed | Phase::Failed => None,
        }
    }

    /// Transition table: a phase advances only to its successor, and any
    /// non-terminal phase may drop into `Failed`.
    #[must_use]
    pub const fn can_transition_to(self, target: Phase) -> bool {
        match (self, target) {
            (Phase::Completed | Phase::Failed, _) => false,
            (_, Phase::Failed) => true,
            (Phase::Uploading, Phase::Extracting)
            | (Phase::Extracting, Phase::Validating)
            | (Phase::Validating, Phase::Generating)
            | (Phase::Generating, Phase::Installing)
            | (Phase::Installing, Phase::Building)
            | (Phase::Building, Phase::Distributing)
            | (Phase::Distributing, Phase::Completed) => true,
            _ => false,
        }
    }

    /// Whether no further transitions are possible
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed)
    }

    /// Position along the success path; `Failed` sorts after everything.
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        match self {
            Phase::Uploading => 0,
            Phase::Extracting => 1,
            Phase::Validating => 2,
            Phase::Generating => 3,
            Phase::Installing => 4,
            Phase::Building => 5,
            Phase::Distributing => 6,
            Phase::Completed => 7,
            Phase::Failed => 8,
        }
    }

    /// Wire label, matching the serialized form
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Phase::Uploading => "UPLOADING",
            Phase::Extracting => "EXTRACTING",
            Phase::Validating => "VALIDATING",
            Phase::Generating => "GENERATING",
            Phase::Installing => "INSTALLING",
            Phase::Building => "BUILDING",
            Phase::Distributing => "DISTRIBUTING",
            Phase::Completed => "COMPLETED",
            Phase::Failed => "FAILED",
        }
    }

    /// Human-readable description recorded alongside each transition
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Phase::Uploading => "Receiving upload",
            Phase::Extracting => "Extracting archive",
            Phase::Validating => "Validating web content",
            Phase::Generating => "Generating desktop project",
            Phase::Installing => "Installing build dependencies",
            Phase::Building => "Building desktop executable",
            Phase::Distributing => "Publishing build artifacts",
            Phase::Completed => "Build completed",
            Phase::Failed => "Build failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// The success path must be walkable through the transition table, and no
// phase may move backwards or out of a terminal state.
const _: () = {
    let mut i = 0;
    while i < Phase::ALL.len() {
        let phase = Phase::ALL[i];
        if let Some(next) = phase.next() {
            assert!(phase.can_transition_to(next));
            assert!(next.ordinal() == phase.ordinal() + 1);
        }
        if !phase.is_terminal() {
            assert!(phase.can_transition_to(Phase::Failed));
        }
        let mut j = 0;
        while j < Phase::ALL.len() {
            let target = Phase::ALL[j];
            if phase.can_transition_to(target) {
                assert!(target.ordinal() > phase.ordinal());
            }
            j += 1;
        }
        i += 1;
    }
    assert!(!Phase::Completed.can_transition_to(Phase::Failed));
    assert!(!Phase::Uploading.can_transition_to(Phase::Building));
};
