use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Errors from URL policy checks.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// Plain HTTP to a non-loopback host would send the API key in the clear.
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
    /// The URL cannot carry path segments (e.g. `mailto:`).
    #[error("URL cannot be used as a base: {0}")]
    CannotBeABase(String),
}

/// Validates the API base URL.
///
/// The API key travels in the query string, so HTTPS is required. Plain
/// HTTP is accepted only for loopback hosts, which is what mock servers in
/// tests bind to.
///
/// ```
/// use toplists::util::validate_base_url;
///
/// assert!(validate_base_url("https://api.example.com/svc/v2").is_ok());
/// assert!(validate_base_url("http://127.0.0.1:8080").is_ok());
/// assert!(validate_base_url("http://api.example.com").is_err());
/// ```
pub fn validate_base_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "https" => {}
        "http" if is_loopback_host(&url) => {
            tracing::warn!(base_url = %url, "Using non-HTTPS API base URL (localhost only)");
        }
        "http" => {
            tracing::error!(base_url = %url, "Rejecting non-HTTPS base URL");
            return Err(UrlValidationError::InsecureBaseUrl);
        }
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    if url.cannot_be_a_base() {
        return Err(UrlValidationError::CannotBeABase(url.to_string()));
    }

    Ok(url)
}

/// Validates an article or media URL before it is requested or handed to
/// the system browser.
pub fn validate_web_url(url: &Url) -> Result<(), UrlValidationError> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }
}

fn is_loopback_host(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    if host == "localhost" {
        return true;
    }
    let bare = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    bare.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}
