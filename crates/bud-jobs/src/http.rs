use serde::de::DeserializeOwned;

use crate::JobError;

/// Decode a JSON body, turning non-2xx answers into [`JobError::Http`].
pub(crate) async fn read_json<T>(response: reqwest::Response) -> Result<T, JobError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(JobError::Http {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        JobError::InvalidResponse(format!("failed to parse response: {}, body: {}", e, body))
    })
}

/// Accept any 2xx answer and discard its body.
pub(crate) async fn expect_success(response: reqwest::Response) -> Result<(), JobError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    Err(JobError::Http {
        status: status.as_u16(),
        body: response.text().await?,
    })
}
