//! API identity for outgoing calls and the identity of the connected MCP client.

use tokio::sync::RwLock;

use crate::config::Config;

#[derive(Clone, PartialEq, Eq)]
pub struct ApiCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug)]
pub struct Session {
    api_base_url: String,
    credentials: Option<ApiCredentials>,
    client: RwLock<Option<ClientInfo>>,
}

impl Session {
    pub fn new(api_base_url: impl Into<String>, credentials: Option<ApiCredentials>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            credentials,
            client: RwLock::new(None),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let credentials = match (&config.api_client_id, &config.api_client_secret) {
            (Some(client_id), Some(client_secret)) => Some(ApiCredentials {
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
            }),
            _ => None,
        };
        Self::new(config.api_base_url.clone(), credentials)
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn credentials(&self) -> Option<&ApiCredentials> {
        self.credentials.as_ref()
    }

    pub async fn set_client_info(&self, client: ClientInfo) {
        *self.client.write().await = Some(client);
    }

    pub async fn client_info(&self) -> Option<ClientInfo> {
        self.client.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn remembers_last_client() {
        let session = Session::new("https://api.example.com/", None);
        assert!(session.client_info().await.is_none());

        session
            .set_client_info(ClientInfo {
                name: "inspector".to_string(),
                version: "0.1.0".to_string(),
            })
            .await;

        let client = session.client_info().await.expect("client info");
        assert_eq!(client.name, "inspector");
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let session = Session::new(
            "https://api.example.com/",
            Some(ApiCredentials {
                client_id: "id".to_string(),
                client_secret: "hunter2".to_string(),
            }),
        );

        assert!(!format!("{session:?}").contains("hunter2"));
        assert_eq!(
            session.credentials().map(|c| c.client_id.as_str()),
            Some("id")
        );
    }
}
