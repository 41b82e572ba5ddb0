use crate::error::Result;
use crate::types::CommandOutput;

pub mod kubectl;

/// Backend trait for kubectl invocations.
///
/// This trait abstracts process execution, allowing us to:
/// - Shell out to the real `kubectl`
/// - Substitute a fake that records invocations in tests
pub trait Backend: Send + Sync {
    /// Check if the executable can be run at all.
    fn is_available(&self) -> bool;

    /// Run kubectl with the given arguments and capture combined output.
    ///
    /// Returns `Ok` for any exit status; only a failure to start the
    /// process is an error.
    fn run(&self, args: &[&str]) -> Result<CommandOutput>;
}
