//! # kubectlkit
//!
//! A Rust library for applying Kubernetes manifests through `kubectl`.
//!
//! Manifests are handed to kubectl either as a single file (`-f`) or as a
//! kustomize overlay directory (`-k`). Every invocation captures combined
//! stdout/stderr and the exit status; interpreting a failure is up to the
//! caller.
//!
//! ## Example
//!
//! ```no_run
//! use kubectlkit::{ApplyMode, Client};
//! use std::path::Path;
//!
//! let client = Client::with_target("kubectl", None, Some("kind-dev".to_string()));
//!
//! let ns = client.create_namespace("app").expect("kubectl not available");
//! if !ns.success() && !ns.is_already_exists() {
//!     eprintln!("{}", ns.text());
//! }
//!
//! let applied = client
//!     .apply(Path::new("/srv/app.yaml"), ApplyMode::Plain)
//!     .expect("kubectl not available");
//! assert!(applied.success());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

/// Backend implementations for kubectl invocations.
pub mod backend;
/// Error types for kubectl operations.
pub mod error;
/// Common types for manifest application.
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use types::{ApplyMode, CommandOutput};

use backend::Backend;
use backend::kubectl::KubectlBackend;
use std::path::{Path, PathBuf};

/// High-level client for manifest operations.
pub struct Client {
    backend: Box<dyn Backend>,
}

impl Client {
    /// Create a client for the given executable, kubeconfig and context.
    pub fn with_target(
        kubectl_path: impl Into<String>,
        kubeconfig: Option<PathBuf>,
        context: Option<String>,
    ) -> Self {
        let backend = KubectlBackend::new(kubectl_path)
            .with_kubeconfig(kubeconfig)
            .with_context(context);
        Self {
            backend: Box::new(backend),
        }
    }

    /// Create a client with a custom backend (useful for testing).
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Check if kubectl is available.
    pub fn is_available(&self) -> bool {
        self.backend.is_available()
    }

    /// `kubectl apply -f|-k <path>`
    pub fn apply(&self, path: &Path, mode: ApplyMode) -> Result<CommandOutput> {
        let path = path.to_string_lossy();
        self.backend.run(&["apply", mode.flag(), path.as_ref()])
    }

    /// `kubectl delete -f|-k <path>`
    pub fn delete(&self, path: &Path, mode: ApplyMode) -> Result<CommandOutput> {
        let path = path.to_string_lossy();
        self.backend.run(&["delete", mode.flag(), path.as_ref()])
    }

    /// `kubectl create ns <name> --save-config`
    pub fn create_namespace(&self, name: &str) -> Result<CommandOutput> {
        self.backend.run(&["create", "ns", name, "--save-config"])
    }
}
