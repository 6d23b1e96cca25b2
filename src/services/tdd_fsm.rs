//! Per-story TDD cycle state machine.

use crate::domain::models::{Command, TddState};

/// Result of a transition attempt. `next_suggested` is a hint string for
/// interactive clients, mirroring the ScrumFSM's `hint` contract.
#[derive(Debug, Clone)]
pub struct TddTransition {
    pub ok: bool,
    pub new_state: Option<TddState>,
    pub next_suggested: String,
    /// Set when `run_tests` was invoked in `CODE_GREEN` but failed, or in
    /// `REFACTOR` and a regression was detected.
    pub regressed: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TddFsm;

impl TddFsm {
    /// Maps a command to the explicit TDD phase it requests, if any.
    fn requested_phase(command: &Command) -> Option<TddState> {
        match command {
            Command::TddDesign { .. } => Some(TddState::Design),
            Command::TddTest { .. } => Some(TddState::TestRed),
            Command::TddCode { .. } => Some(TddState::CodeGreen),
            Command::TddRefactor { .. } => Some(TddState::Refactor),
            Command::TddCommit { .. } => Some(TddState::Commit),
            _ => None,
        }
    }

    /// Advances one TDD state along the canonical path, per the per-state
    /// transition rules below.
    pub fn transition(
        state: TddState,
        command: &Command,
        tests_passed: Option<bool>,
    ) -> TddTransition {
        use TddState::{CodeGreen, Commit, Design, Refactor, TestRed};

        if let Command::TddNext { .. } = command {
            return Self::next(state);
        }

        if let Command::TddRunTests { .. } = command {
            return match state {
                TestRed => TddTransition {
                    ok: tests_passed == Some(false),
                    new_state: Some(TestRed),
                    next_suggested: "/tdd code".to_string(),
                    regressed: false,
                },
                CodeGreen => {
                    let passed = tests_passed == Some(true);
                    TddTransition {
                        ok: passed,
                        new_state: Some(if passed { Refactor } else { CodeGreen }),
                        next_suggested: "/tdd refactor".to_string(),
                        regressed: false,
                    }
                }
                Refactor => {
                    let passed = tests_passed.unwrap_or(false);
                    TddTransition {
                        ok: true,
                        new_state: Some(if passed { Refactor } else { TestRed }),
                        next_suggested: if passed { "/tdd commit".to_string() } else { "/tdd test".to_string() },
                        regressed: !passed,
                    }
                }
                _ => Self::rejection(state),
            };
        }

        if let Some(requested) = Self::requested_phase(command) {
            return Self::explicit(state, requested);
        }

        Self::rejection(state)
    }

    fn explicit(state: TddState, requested: TddState) -> TddTransition {
        use TddState::{CodeGreen, Commit, Design, Refactor, TestRed};

        let advances = matches!(
            (state, requested),
            (Design, TestRed) | (TestRed, CodeGreen) | (CodeGreen, Refactor) | (Refactor, Commit)
        );
        let idempotent_refactor = state == Refactor && requested == Refactor;

        if advances {
            return TddTransition {
                ok: true,
                new_state: Some(requested),
                next_suggested: Self::suggest(requested),
                regressed: false,
            };
        }
        if idempotent_refactor {
            return TddTransition {
                ok: true,
                new_state: Some(Refactor),
                next_suggested: "/tdd commit".to_string(),
                regressed: false,
            };
        }
        Self::rejection(state)
    }

    fn next(state: TddState) -> TddTransition {
        use TddState::{CodeGreen, Commit, Design, Refactor, TestRed};
        let new_state = match state {
            Design => Some(TestRed),
            TestRed => Some(CodeGreen),
            CodeGreen => Some(Refactor),
            Refactor => Some(Commit),
            Commit => None,
        };
        match new_state {
            Some(s) => TddTransition {
                ok: true,
                new_state: Some(s),
                next_suggested: Self::suggest(s),
                regressed: false,
            },
            None => Self::rejection(state),
        }
    }

    fn suggest(state: TddState) -> String {
        match state {
            TddState::Design => "/tdd test".to_string(),
            TddState::TestRed => "/tdd run_tests".to_string(),
            TddState::CodeGreen => "/tdd run_tests".to_string(),
            TddState::Refactor => "/tdd commit".to_string(),
            TddState::Commit => String::new(),
        }
    }

    fn rejection(state: TddState) -> TddTransition {
        TddTransition {
            ok: false,
            new_state: None,
            next_suggested: format!("cannot transition from {state}"),
            regressed: false,
        }
    }

    /// `/tdd abort` forces the cycle to terminal regardless of current
    /// state; callers set `test_status = aborted` on the cycle themselves.
    pub const fn abort() -> TddState {
        TddState::Commit
    }
}
