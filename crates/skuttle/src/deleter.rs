//! Kubernetes-backed node deletion

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use kube::api::{Api, DeleteParams};
use skuttle_core::{DeleteError, NodeDeleter};

/// Deletes node objects through the API server
pub struct KubeNodeDeleter {
    api: Api<Node>,
}

impl KubeNodeDeleter {
    pub fn new(api: Api<Node>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl NodeDeleter for KubeNodeDeleter {
    async fn delete(&self, name: &str) -> Result<(), DeleteError> {
        match self.api.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(err) if is_not_found(&err) => {
                tracing::debug!("node {} already deleted", name);
                Ok(())
            }
            Err(err) => Err(DeleteError::new(err.to_string())),
        }
    }
}

fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(response) if response.code == 404)
}
