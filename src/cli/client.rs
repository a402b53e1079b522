use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::cli::config::EnvironmentConfig;
use crate::middleware::tenant::TENANT_HEADER;

/// Thin HTTP client that unwraps the `{"success": true, "data": ...}` envelope
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    tenant: Option<String>,
}

impl ApiClient {
    pub fn from_env(env: &EnvironmentConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            http,
            base_url: env.server_url().trim_end_matches('/').to_string(),
            token: env.token.clone(),
            tenant: env.current_tenant.map(|t| t.to_string()),
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> anyhow::Result<T> {
        self.send(self.request(Method::GET, path)).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> anyhow::Result<T> {
        self.send(self.request(Method::POST, path).json(body)).await
    }

    /// GET returning the raw body whatever the status, for health probes
    pub async fn get_raw(&self, path: &str) -> anyhow::Result<(reqwest::StatusCode, Value)> {
        let response = self.request(Method::GET, path).send().await?;
        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut request = self.http.request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(tenant) = &self.tenant {
            request = request.header(TENANT_HEADER, tenant);
        }
        request
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> anyhow::Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let body: Value = response.json().await?;

        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        let data = body.get("data").cloned().unwrap_or(Value::Null);
        Ok(serde_json::from_value(data)?)
    }
}

fn api_error(status: reqwest::StatusCode, body: &Value) -> anyhow::Error {
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("request failed");
    match body.get("code").and_then(Value::as_str) {
        Some(code) => anyhow::anyhow!("{} ({}): {}", status.as_u16(), code, message),
        None => anyhow::anyhow!("{}: {}", status.as_u16(), message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_body_includes_code() {
        let err = api_error(
            reqwest::StatusCode::FORBIDDEN,
            &json!({"error": true, "message": "No organization", "code": "NEEDS_ONBOARDING"}),
        );
        assert_eq!(err.to_string(), "403 (NEEDS_ONBOARDING): No organization");

        let err = api_error(reqwest::StatusCode::BAD_GATEWAY, &Value::Null);
        assert_eq!(err.to_string(), "502: request failed");
    }
}
