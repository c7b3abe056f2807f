//! Shared HTTP plumbing for provider clients.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ProviderError;
use crate::llm::registry::ProviderFamily;

use super::ProviderSettings;

/// Build a `reqwest` client honoring the configured timeout.
pub(crate) fn build_client(settings: &ProviderSettings) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(settings.timeout)
        .build()
        .map_err(ProviderError::ClientBuild)
}

/// POST a JSON body and decode a JSON response.
///
/// Non-2xx responses become `ProviderError::Api` carrying the response body.
pub(crate) async fn post_json<B, R>(
    provider: ProviderFamily,
    client: &reqwest::Client,
    url: &str,
    headers: &[(&str, &str)],
    body: &B,
) -> Result<R, ProviderError>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    debug!(%provider, url, "sending request");

    let mut request = client.post(url).json(body);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }

    let response = request
        .send()
        .await
        .map_err(|source| ProviderError::Request { provider, source })?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|source| ProviderError::Request { provider, source })?;

    if !status.is_success() {
        return Err(ProviderError::Api {
            provider,
            status: status.as_u16(),
            body: text,
        });
    }

    serde_json::from_str(&text).map_err(|e| ProviderError::InvalidJson {
        provider,
        message: format!("Failed to decode response body: {}. Body: {}", e, text),
    })
}
