use futures::StreamExt;
use thiserror::Error;

/// Failures while reading a size-limited response body.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Response too large (exceeds {0} bytes)")]
    TooLarge(usize),
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    Incomplete { expected: u64, received: usize },
}

/// Reads a response body as a stream, failing once `limit` bytes are exceeded.
///
/// A `Content-Length` above the limit is rejected before any body is read,
/// and a body shorter than its declared length is reported as incomplete.
pub async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, BodyError> {
    let expected_length = response.content_length();

    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(BodyError::TooLarge(limit));
        }
    }

    let mut bytes = Vec::with_capacity(expected_length.unwrap_or(0).min(limit as u64) as usize);
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(BodyError::TooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(BodyError::Incomplete {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}

/// True if the `Content-Type` header's media type matches `expected`,
/// ignoring parameters such as `charset`.
pub fn has_media_type(response: &reqwest::Response, expected: &str) -> bool {
    media_type(response).is_some_and(|m| m.eq_ignore_ascii_case(expected))
}

/// The `Content-Type` media type without parameters, if present.
pub fn media_type(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|m| m.trim().to_ascii_lowercase())
        .filter(|m| !m.is_empty())
}
