//! Source of the credential bundle pushed to a terminal without credentials.

use async_trait::async_trait;

use sibs_core::error::{Result, SibsError};
use sibs_core::protocol::messages::{Fields, SetAuthCredentialRequest};

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn credentials(&self) -> Result<SetAuthCredentialRequest>;
}

/// Reads a JSON object from disk on every use, so a rotated file is picked
/// up without a restart.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: String,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn credentials(&self) -> Result<SetAuthCredentialRequest> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| SibsError::Config(format!("read credentials failed ({}): {e}", self.path)))?;
        parse_bundle(&raw)
    }
}

/// Fixed bundle held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialStore {
    bundle: Fields,
}

impl StaticCredentialStore {
    pub fn new(bundle: Fields) -> Self {
        Self { bundle }
    }
}

#[async_trait]
impl CredentialStore for StaticCredentialStore {
    async fn credentials(&self) -> Result<SetAuthCredentialRequest> {
        Ok(SetAuthCredentialRequest {
            credentials: self.bundle.clone(),
        })
    }
}

fn parse_bundle(raw: &str) -> Result<SetAuthCredentialRequest> {
    let mut credentials: Fields = serde_json::from_str(raw)
        .map_err(|e| SibsError::Config(format!("credential bundle must be a JSON object: {e}")))?;
    // The codec owns the envelope.
    credentials.remove("version");
    credentials.remove("type");
    Ok(SetAuthCredentialRequest { credentials })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundle_is_carried_opaquely() {
        let req = parse_bundle(r#"{"type":"X","clientId":"c-1","secret":{"k":"v"}}"#).unwrap();
        assert_eq!(req.credentials["clientId"], "c-1");
        assert_eq!(req.credentials["secret"]["k"], "v");
        assert!(!req.credentials.contains_key("type"));
    }

    #[test]
    fn non_object_bundle_is_a_config_error() {
        let err = parse_bundle("[1]").unwrap_err();
        assert_eq!(err.code().as_str(), "CONFIG");
    }

    #[tokio::test]
    async fn missing_file_is_a_config_error() {
        let store = FileCredentialStore::new("/nonexistent/sibs/credentials.json");
        let err = store.credentials().await.unwrap_err();
        assert_eq!(err.code().as_str(), "CONFIG");
    }

    #[tokio::test]
    async fn file_bundle_is_read_without_blocking() {
        let path = std::env::temp_dir().join(format!("sibs-creds-{}.json", std::process::id()));
        tokio::fs::write(&path, r#"{"clientId":"c-2"}"#).await.unwrap();

        let store = FileCredentialStore::new(path.to_string_lossy().into_owned());
        let req = store.credentials().await.unwrap();
        assert_eq!(req.credentials["clientId"], "c-2");

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
