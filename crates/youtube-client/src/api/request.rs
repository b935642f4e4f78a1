use serde::de::DeserializeOwned;

use super::*;
use crate::models::GoogleErrorResponse;

impl YouTubeApiClient {
    pub(super) fn endpoint_url(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<url::Url, YouTubeError> {
        let base = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let url = url::Url::parse_with_params(
            &base,
            params.iter().copied().chain([("key", self.api_key.as_str())]),
        )?;
        Ok(url)
    }

    /// Execute a GET request and decode the JSON body.
    pub(super) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, YouTubeError> {
        let url = self.endpoint_url(path, params)?;
        let resp = self.http.get(url).send().await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            let err = api_error_from_body(status.as_u16(), &body);
            tracing::debug!(path, status = status.as_u16(), error = %err, "YouTube API request failed");
            return Err(err);
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Map a non-2xx response body onto [`YouTubeError::ApiError`].
pub(super) fn api_error_from_body(status: u16, body: &str) -> YouTubeError {
    let parsed = serde_json::from_str::<GoogleErrorResponse>(body).unwrap_or_default();
    let reason = parsed
        .error
        .errors
        .iter()
        .map(|e| e.reason.trim())
        .find(|r| !r.is_empty())
        .unwrap_or_default()
        .to_string();
    let message = if parsed.error.message.is_empty() {
        body.chars().take(200).collect()
    } else {
        parsed.error.message
    };
    YouTubeError::ApiError {
        status,
        reason,
        message,
    }
}
