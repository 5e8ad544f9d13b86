use super::{into_result, parse_body, Backend};
use crate::config::AppConfig;
use crate::error::ClientError;
use async_trait::async_trait;
use log::{error, info};
use reqwest::{Client, Response};
use serde_json::Value;

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &AppConfig) -> Result<Self, ClientError> {
        let client = Client::builder().user_agent(APP_USER_AGENT).build()?;
        Ok(Self {
            client,
            base_url: config.backend_base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn finish(&self, method: &str, url: &str, response: Response) -> Result<Value, ClientError> {
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        let body = parse_body(&bytes);
        info!("{} {} -> {}", method, url, status);

        into_result(status, body).map_err(|e| {
            error!("{} {} failed: {}", method, url, e);
            e
        })
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn get(&self, path: &str) -> Result<Value, ClientError> {
        let url = self.url(path);
        let response = self.client.get(&url).send().await.map_err(|e| {
            error!("GET {} could not complete: {}", url, e);
            ClientError::Network(e)
        })?;
        self.finish("GET", &url, response).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, ClientError> {
        let url = self.url(path);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("POST {} could not complete: {}", url, e);
                ClientError::Network(e)
            })?;
        self.finish("POST", &url, response).await
    }
}
