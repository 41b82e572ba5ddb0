//! kubectl backend - shells out to the `kubectl` executable.

use std::path::PathBuf;
use std::process::Command;

use super::Backend;
use crate::error::{Error, Result};
use crate::types::CommandOutput;

/// Default executable name.
pub const DEFAULT_KUBECTL: &str = "kubectl";

/// Backend running a kubectl executable with optional global flags.
#[derive(Debug, Clone)]
pub struct KubectlBackend {
    kubectl_path: String,
    kubeconfig: Option<PathBuf>,
    context: Option<String>,
}

impl KubectlBackend {
    /// Create a backend for the given executable.
    pub fn new(kubectl_path: impl Into<String>) -> Self {
        Self {
            kubectl_path: kubectl_path.into(),
            kubeconfig: None,
            context: None,
        }
    }

    /// Pass `--kubeconfig <path>` on every invocation.
    pub fn with_kubeconfig(mut self, kubeconfig: Option<PathBuf>) -> Self {
        self.kubeconfig = kubeconfig;
        self
    }

    /// Pass `--context <name>` on every invocation.
    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context;
        self
    }

    /// Global flags followed by the subcommand arguments.
    fn full_args(&self, args: &[&str]) -> Vec<String> {
        let mut full = Vec::with_capacity(args.len() + 4);
        if let Some(kubeconfig) = &self.kubeconfig {
            full.push("--kubeconfig".to_string());
            full.push(kubeconfig.to_string_lossy().to_string());
        }
        if let Some(context) = &self.context {
            full.push("--context".to_string());
            full.push(context.clone());
        }
        full.extend(args.iter().map(|a| (*a).to_string()));
        full
    }
}

impl Default for KubectlBackend {
    fn default() -> Self {
        Self::new(DEFAULT_KUBECTL)
    }
}

impl Backend for KubectlBackend {
    fn is_available(&self) -> bool {
        Command::new(&self.kubectl_path)
            .args(["version", "--client"])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        let full = self.full_args(args);
        let command = format!("{} {}", self.kubectl_path, full.join(" "));
        log::debug!("Running: {command}");

        let output = Command::new(&self.kubectl_path)
            .args(&full)
            .output()
            .map_err(|source| {
                if source.kind() == std::io::ErrorKind::NotFound {
                    Error::KubectlNotFound(self.kubectl_path.clone())
                } else {
                    Error::Spawn {
                        command: command.clone(),
                        source,
                    }
                }
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CommandOutput {
            command,
            code: output.status.code(),
            combined,
        })
    }
}
