//! Core types for reconciliation

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a single cluster
///
/// `Absent -> Creating -> Present -> Deleting -> Absent`. `Creating` and
/// `Deleting` only exist while a backend call is in flight; a failure in
/// either leaves `Unknown`, which needs a fresh read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusterState {
    Absent,
    Creating,
    Present,
    Deleting,
    Unknown,
}

impl ClusterState {
    /// Enter `Creating`; only an absent or unknown cluster can be created
    pub fn begin_create(self) -> Self {
        match self {
            Self::Absent | Self::Unknown => Self::Creating,
            other => other,
        }
    }

    /// Enter `Deleting`; only a present or unknown cluster can be deleted
    pub fn begin_delete(self) -> Self {
        match self {
            Self::Present | Self::Unknown => Self::Deleting,
            other => other,
        }
    }

    /// State after a transient state completes
    pub fn finish(self, succeeded: bool) -> Self {
        match (self, succeeded) {
            (Self::Creating, true) => Self::Present,
            (Self::Deleting, true) => Self::Absent,
            (Self::Creating | Self::Deleting, false) => Self::Unknown,
            (other, _) => other,
        }
    }
}

impl fmt::Display for ClusterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Absent => "absent",
            Self::Creating => "creating",
            Self::Present => "present",
            Self::Deleting => "deleting",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// Result of executing one action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionResult {
    /// Nothing needed doing
    NoChange,
    /// Cluster or namespace was created
    Created,
    /// Cluster or manifest was removed
    Removed,
    /// Manifest was applied; carries the backend output
    Applied { output: String },
    /// Action was not executed
    Skipped { reason: String },
}

impl ExecutionResult {
    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Created | Self::Removed | Self::Applied { .. })
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub applied: usize,
    pub removed: usize,
    pub skipped: usize,
    pub no_change: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.applied + self.removed
    }

    /// Total number of actions processed
    pub fn total(&self) -> usize {
        self.total_changes() + self.skipped + self.no_change
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &ExecuteSummary) {
        self.created += other.created;
        self.applied += other.applied;
        self.removed += other.removed;
        self.skipped += other.skipped;
        self.no_change += other.no_change;
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ExecutionResult) {
        match result {
            ExecutionResult::NoChange => self.no_change += 1,
            ExecutionResult::Created => self.created += 1,
            ExecutionResult::Applied { .. } => self.applied += 1,
            ExecutionResult::Removed => self.removed += 1,
            ExecutionResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Options for execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Verbose output
    pub verbose: bool,
}

/// Output from one manifest backend invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Command line, for messages
    pub command: String,
    /// Whether the process exited zero
    pub success: bool,
    /// Whether the backend reported that the object already exists
    pub already_exists: bool,
    /// Combined stdout/stderr
    pub output: String,
}

impl CommandOutput {
    /// Successful output with the given text
    pub fn ok(command: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            success: true,
            already_exists: false,
            output: output.into(),
        }
    }

    /// Failed output with the given text
    pub fn failed(command: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            success: false,
            already_exists: false,
            output: output.into(),
        }
    }
}
