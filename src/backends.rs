//! Adapters from the kind and kubectl clients to the reconciler's providers

use converge::{
    BackendError, ClusterProvider, ClusterSpec, CommandOutput, ManifestMode, ManifestProvider,
    NodeHandle, NodeRole,
};
use std::path::{Path, PathBuf};

use crate::config::BackendConfig;

/// Render a validated cluster as a kind cluster document
pub fn cluster_config(spec: &ClusterSpec) -> kindkit::ClusterConfig {
    let mut config = kindkit::ClusterConfig::new(&spec.name);
    for patch in &spec.containerd_config_patches {
        config = config.with_containerd_patch(patch);
    }

    for node in &spec.nodes {
        let role = match node.role {
            NodeRole::ControlPlane => kindkit::NodeRole::ControlPlane,
            NodeRole::Worker => kindkit::NodeRole::Worker,
        };
        let mut n = kindkit::Node::new(role);
        for mount in &node.extra_mounts {
            n = n.with_mount(&mount.host_path, &mount.container_path);
        }
        if let Some(patch) = &node.kubeadm_config_patch {
            n = n.with_kubeadm_patch(patch);
        }
        config = config.with_node(n);
    }

    config
}

fn backend_error(err: &kindkit::Error) -> BackendError {
    // Keep kind's own words when there are any
    let message = err.output().map_or_else(|| err.to_string(), str::to_string);
    if err.category().is_ignorable_on_delete() {
        return BackendError::NotFound(message);
    }
    BackendError::Failed(message)
}

// ============================================================================
// kind
// ============================================================================

/// Cluster provider backed by the kind CLI
///
/// Holds the kubeconfig kind should clean up on delete.
pub struct KindProvider {
    client: kindkit::Client,
    kubeconfig: Option<PathBuf>,
}

impl KindProvider {
    pub fn new(client: kindkit::Client, kubeconfig: Option<PathBuf>) -> Self {
        Self { client, kubeconfig }
    }

    pub fn is_available(&self) -> bool {
        self.client.is_available()
    }
}

#[derive(Debug)]
struct KindNode(Box<dyn kindkit::NodeHandle>);

impl NodeHandle for KindNode {
    fn name(&self) -> String {
        self.0.name().to_string()
    }

    fn role(&self) -> Result<String, BackendError> {
        self.0.role().map_err(|e| backend_error(&e))
    }
}

impl ClusterProvider for KindProvider {
    fn create(&self, spec: &ClusterSpec) -> Result<(), BackendError> {
        self.client
            .create(&cluster_config(spec))
            .map_err(|e| backend_error(&e))
    }

    fn delete(&self, name: &str) -> Result<(), BackendError> {
        self.client
            .delete(name, self.kubeconfig.as_deref())
            .map_err(|e| backend_error(&e))
    }

    fn list(&self) -> Result<Vec<String>, BackendError> {
        self.client.list().map_err(|e| backend_error(&e))
    }

    fn list_nodes(&self, name: &str) -> Result<Vec<Box<dyn NodeHandle>>, BackendError> {
        let nodes = self.client.list_nodes(name).map_err(|e| backend_error(&e))?;
        Ok(nodes
            .into_iter()
            .map(|n| Box::new(KindNode(n)) as Box<dyn NodeHandle>)
            .collect())
    }
}

// ============================================================================
// kubectl
// ============================================================================

/// Manifest provider backed by kubectl
pub struct KubectlProvider {
    client: kubectlkit::Client,
}

impl KubectlProvider {
    pub fn new(client: kubectlkit::Client) -> Self {
        Self { client }
    }

    pub fn is_available(&self) -> bool {
        self.client.is_available()
    }
}

fn apply_mode(mode: ManifestMode) -> kubectlkit::ApplyMode {
    match mode {
        ManifestMode::Plain => kubectlkit::ApplyMode::Plain,
        ManifestMode::Overlay => kubectlkit::ApplyMode::Overlay,
    }
}

fn command_output(
    result: kubectlkit::Result<kubectlkit::CommandOutput>,
) -> Result<CommandOutput, BackendError> {
    let out = result.map_err(|e| BackendError::Failed(e.to_string()))?;
    Ok(CommandOutput {
        success: out.success(),
        already_exists: out.is_already_exists(),
        output: out.text().to_string(),
        command: out.command,
    })
}

impl ManifestProvider for KubectlProvider {
    fn apply(&self, path: &Path, mode: ManifestMode) -> Result<CommandOutput, BackendError> {
        command_output(self.client.apply(path, apply_mode(mode)))
    }

    fn delete(&self, path: &Path, mode: ManifestMode) -> Result<CommandOutput, BackendError> {
        command_output(self.client.delete(path, apply_mode(mode)))
    }

    fn create_namespace(&self, name: &str) -> Result<CommandOutput, BackendError> {
        command_output(self.client.create_namespace(name))
    }
}

// ============================================================================
// Construction
// ============================================================================

/// Both providers, built from the document's `[backend]` table
pub struct Backends {
    pub clusters: KindProvider,
    pub manifests: KubectlProvider,
}

impl Backends {
    pub fn from_config(config: &BackendConfig) -> Self {
        let kubeconfig = config.kubeconfig();

        let kind = kindkit::Client::with_paths(&config.kind, &config.node_runtime);
        let kubectl = kubectlkit::Client::with_target(
            &config.kubectl,
            kubeconfig.clone(),
            config.context.clone(),
        );

        Self {
            clusters: KindProvider::new(kind, kubeconfig),
            manifests: KubectlProvider::new(kubectl),
        }
    }

    /// Warn about executables that cannot be run
    pub fn check(&self, config: &BackendConfig) {
        if !self.clusters.is_available() {
            log::warn!("{} is not available", config.kind);
        }
        if !self.manifests.is_available() {
            log::warn!("{} is not available", config.kubectl);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use converge::{ExtraMount, NodeSpec};
    use std::sync::{Arc, Mutex};

    fn spec() -> ClusterSpec {
        ClusterSpec {
            name: "dev".into(),
            nodes: vec![
                NodeSpec {
                    role: NodeRole::ControlPlane,
                    extra_mounts: vec![ExtraMount {
                        host_path: PathBuf::from("/srv/data"),
                        container_path: "/data".into(),
                    }],
                    kubeadm_config_patch: Some("kind: InitConfiguration".into()),
                },
                NodeSpec {
                    role: NodeRole::Worker,
                    extra_mounts: Vec::new(),
                    kubeadm_config_patch: None,
                },
            ],
            containerd_config_patches: vec!["[plugins]".into()],
        }
    }

    #[test]
    fn test_cluster_config_mapping() {
        let config = cluster_config(&spec());
        assert_eq!(config.name, "dev");
        assert_eq!(config.containerd_config_patches, vec!["[plugins]"]);
        assert_eq!(config.nodes.len(), 2);
        assert_eq!(config.nodes[0].role, kindkit::NodeRole::ControlPlane);
        assert_eq!(config.nodes[0].extra_mounts[0].host_path, PathBuf::from("/srv/data"));
        assert_eq!(config.nodes[0].kubeadm_config_patches, vec!["kind: InitConfiguration"]);
        assert_eq!(config.nodes[1].role, kindkit::NodeRole::Worker);
        assert!(config.nodes[1].kubeadm_config_patches.is_empty());
    }

    #[test]
    fn test_not_found_maps_to_not_found() {
        let err = kindkit::Error::from_kind_output("ERROR: unknown cluster \"dev\"", Some("dev"));
        assert!(backend_error(&err).is_not_found());

        let err = kindkit::Error::from_kind_output("ERROR: node(s) failed to start", Some("dev"));
        let mapped = backend_error(&err);
        assert!(!mapped.is_not_found());
        assert_eq!(mapped.to_string(), "ERROR: node(s) failed to start");
    }

    #[test]
    fn test_name_clash_keeps_kind_output() {
        let output = "ERROR: failed to create cluster: node(s) already exist for a cluster with the name \"dev\"";
        let err = kindkit::Error::from_kind_output(output, Some("dev"));
        let mapped = backend_error(&err);
        assert!(!mapped.is_not_found());
        assert_eq!(mapped.to_string(), output);
    }

    #[derive(Clone)]
    struct ScriptedKubectl {
        calls: Arc<Mutex<Vec<String>>>,
        code: i32,
        combined: String,
    }

    impl kubectlkit::backend::Backend for ScriptedKubectl {
        fn is_available(&self) -> bool {
            true
        }

        fn run(&self, args: &[&str]) -> kubectlkit::Result<kubectlkit::CommandOutput> {
            let command = format!("kubectl {}", args.join(" "));
            self.calls.lock().unwrap().push(command.clone());
            Ok(kubectlkit::CommandOutput {
                command,
                code: Some(self.code),
                combined: self.combined.clone(),
            })
        }
    }

    #[test]
    fn test_kubectl_already_exists_is_flagged() {
        let backend = ScriptedKubectl {
            calls: Arc::default(),
            code: 1,
            combined: "Error from server (AlreadyExists): namespaces \"app-ns\" already exists"
                .into(),
        };
        let calls = Arc::clone(&backend.calls);
        let provider =
            KubectlProvider::new(kubectlkit::Client::with_backend(Box::new(backend)));

        let out = provider.create_namespace("app-ns").unwrap();
        assert!(!out.success);
        assert!(out.already_exists);
        assert_eq!(*calls.lock().unwrap(), vec!["kubectl create ns app-ns --save-config"]);
    }

    #[test]
    fn test_kubectl_overlay_uses_kustomize_flag() {
        let backend = ScriptedKubectl {
            calls: Arc::default(),
            code: 0,
            combined: "configmap/app created".into(),
        };
        let calls = Arc::clone(&backend.calls);
        let provider =
            KubectlProvider::new(kubectlkit::Client::with_backend(Box::new(backend)));

        let out = provider
            .apply(Path::new("/srv/overlay"), ManifestMode::Overlay)
            .unwrap();
        assert!(out.success);
        assert_eq!(out.output, "configmap/app created");
        assert_eq!(*calls.lock().unwrap(), vec!["kubectl apply -k /srv/overlay"]);
    }
}
