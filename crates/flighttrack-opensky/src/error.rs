use thiserror::Error;

/// Errors from the credential manager.
///
/// These are the one loud failure mode of the core: without a valid token
/// every downstream call is meaningless, so refresh failures propagate to
/// the caller instead of degrading.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("token endpoint returned status {0}")]
    Status(u16),

    #[error("token response missing or malformed access_token: {0}")]
    MalformedResponse(String),
}

/// Errors from the upstream state-vector fetch.
///
/// Callers of [`crate::OpenSkyProvider`] never see these; the provider's
/// public surface converts them to an empty snapshot. They exist so the
/// internal fetch path can use `?` and log a single meaningful cause.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("states request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("states endpoint returned status {0}")]
    Status(u16),
}
