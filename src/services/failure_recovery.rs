//! Failure-recovery policy table.

use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoffBuilder;

use crate::domain::errors::AgentFailureKind;

/// The action the Orchestrator takes in response to a failed task, keyed
/// by [`AgentFailureKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Revert to the last known good snapshot and retry.
    RevertAndRetry,
    /// Check dependencies, then retry.
    DependencyCheckAndRetry,
    /// Retry with an increased timeout.
    IncreaseTimeoutAndRetry,
    /// Reset the agent's internal state, then retry.
    ResetAgentAndRetry,
}

/// Outcome of consulting the recovery table for one failed attempt.
#[derive(Debug, Clone, Copy)]
pub enum RecoveryDecision {
    Retry(RecoveryAction),
    /// `retry_count` reached `max_retries`; escalate to a human via an
    /// `ApprovalRequest` tagged `human_intervention`.
    Escalate,
}

pub fn recovery_action_for(kind: AgentFailureKind) -> RecoveryAction {
    match kind {
        AgentFailureKind::TestFailure => RecoveryAction::RevertAndRetry,
        AgentFailureKind::BuildFailure => RecoveryAction::DependencyCheckAndRetry,
        AgentFailureKind::Timeout => RecoveryAction::IncreaseTimeoutAndRetry,
        AgentFailureKind::AgentError => RecoveryAction::ResetAgentAndRetry,
    }
}

/// Decides whether to retry or escalate, given the retry count *after*
/// this failure has already been counted.
pub fn decide(kind: AgentFailureKind, retry_count: u32, max_retries: u32) -> RecoveryDecision {
    if retry_count >= max_retries {
        RecoveryDecision::Escalate
    } else {
        RecoveryDecision::Retry(recovery_action_for(kind))
    }
}

/// Exponential backoff delay before the `retry_count`-th retry attempt,
/// capped at 30s so a flaky agent can't stall a project indefinitely.
pub fn retry_delay_for(retry_count: u32) -> Duration {
    let mut backoff = ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(500))
        .with_max_interval(Duration::from_secs(30))
        .with_max_elapsed_time(None)
        .build();

    let mut delay = Duration::from_millis(500);
    for _ in 0..retry_count {
        delay = backoff.next_backoff().unwrap_or(delay);
    }
    delay
}
