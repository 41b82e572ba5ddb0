//! Real kind CLI backend using `kind` commands.

use crate::backend::{Backend, NodeHandle};
use crate::error::{Error, Result};
use crate::types::{ClusterConfig, ROLE_LABEL};
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

/// Default container runtime used to inspect node containers.
pub const DEFAULT_RUNTIME: &str = "docker";

/// Backend that executes real `kind` commands.
#[derive(Debug, Clone)]
pub struct KindBackend {
    /// Path to the kind executable
    kind_path: String,
    /// Container runtime executable (docker or podman)
    runtime: String,
}

impl KindBackend {
    /// Create a backend with explicit executables.
    pub fn with_paths(kind_path: impl Into<String>, runtime: impl Into<String>) -> Self {
        Self {
            kind_path: kind_path.into(),
            runtime: runtime.into(),
        }
    }

    /// Run a kind command and return output.
    fn run_kind(&self, args: &[&str]) -> Result<Output> {
        log::debug!("Running: {} {}", self.kind_path, args.join(" "));
        Command::new(&self.kind_path)
            .args(args)
            .output()
            .map_err(|e| spawn_error(&self.kind_path, e))
    }

    /// Run a kind command and check for success.
    fn run_kind_checked(&self, args: &[&str], cluster: Option<&str>) -> Result<String> {
        let output = self.run_kind(args)?;

        if !output.status.success() {
            return Err(Error::from_kind_output(&combined(&output), cluster));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl Backend for KindBackend {
    fn is_available(&self) -> bool {
        self.run_kind(&["version"])
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn create(&self, config: &ClusterConfig) -> Result<()> {
        let document = config.render()?;
        log::debug!(
            "Running: {} create cluster --name {} --config -",
            self.kind_path,
            config.name
        );

        let mut child = Command::new(&self.kind_path)
            .args(["create", "cluster", "--name", config.name.as_str(), "--config", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(&self.kind_path, e))?;

        // stdin is closed at the end of this block so kind sees EOF
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(document.as_bytes()),
            None => Ok(()),
        };

        // Reap the child before surfacing a write error
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(Error::from_kind_output(&combined(&output), Some(&config.name)));
        }
        written?;

        Ok(())
    }

    fn delete(&self, name: &str, kubeconfig: Option<&Path>) -> Result<()> {
        let kubeconfig = kubeconfig.map(|p| p.to_string_lossy().to_string());
        let mut args = vec!["delete", "cluster", "--name", name];
        if let Some(path) = kubeconfig.as_deref() {
            args.push("--kubeconfig");
            args.push(path);
        }

        self.run_kind_checked(&args, Some(name))?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        let stdout = self.run_kind_checked(&["get", "clusters"], None)?;
        Ok(parse_names(&stdout))
    }

    fn list_nodes(&self, name: &str) -> Result<Vec<Box<dyn NodeHandle>>> {
        let stdout = self.run_kind_checked(&["get", "nodes", "--name", name], Some(name))?;
        Ok(parse_names(&stdout)
            .into_iter()
            .map(|node| {
                Box::new(KindNode {
                    name: node,
                    runtime: self.runtime.clone(),
                }) as Box<dyn NodeHandle>
            })
            .collect())
    }
}

/// A node container of a kind cluster.
#[derive(Debug, Clone)]
pub struct KindNode {
    name: String,
    runtime: String,
}

impl NodeHandle for KindNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> Result<String> {
        let format = format!("{{{{ index .Config.Labels \"{ROLE_LABEL}\" }}}}");
        let output = Command::new(&self.runtime)
            .args(["inspect", "--format", format.as_str(), self.name.as_str()])
            .output()?;

        if !output.status.success() {
            return Err(Error::from_kind_output(&combined(&output), None));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

fn spawn_error(program: &str, err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::NotFound {
        Error::KindNotFound(program.to_string())
    } else {
        Error::CommandFailed {
            message: format!("failed to execute {program}: {err}"),
            stderr: String::new(),
        }
    }
}

/// stdout followed by stderr, as one string.
fn combined(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).to_string();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text
}

/// Parse one name per line, skipping kind's "No ... found" notices.
fn parse_names(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("No kind "))
        .map(str::to_string)
        .collect()
}
