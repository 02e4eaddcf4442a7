use aws_credential_types::provider::error::CredentialsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    /// No credentials could be resolved. Harness code skips the run instead
    /// of failing it.
    #[error("no AWS credentials available: {0}")]
    CredentialsUnavailable(String),

    #[error("rds:DescribeDBEngineVersions failed: {0}")]
    Ping(String),

    #[error("rds:DescribeDBSnapshots failed for {identifier}: {message}")]
    DescribeSnapshot { identifier: String, message: String },

    #[error("rds:DeleteDBSnapshot failed for {identifier}: {message}")]
    DeleteSnapshot { identifier: String, message: String },
}

impl BackendError {
    pub fn is_credentials_unavailable(&self) -> bool {
        matches!(self, BackendError::CredentialsUnavailable(_))
    }
}

/// Walk the full error chain and join all causes into one string.
///
/// AWS SDK errors often have terse `Display` impls (e.g. "dispatch failure")
/// with the useful detail further down the source chain.
pub fn format_err_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}

/// Markers the credential providers put in their errors when nothing in the
/// chain produced credentials.
const MISSING_CREDENTIAL_MARKERS: [&str; 3] = [
    "no providers in chain provided credentials",
    "the credential provider was not enabled",
    "NoCredentialProviders",
];

/// True when `err` (or anything in its source chain) says credentials were
/// never loaded, as opposed to being rejected by the service.
pub fn is_missing_credentials(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if matches!(
            e.downcast_ref::<CredentialsError>(),
            Some(CredentialsError::CredentialsNotLoaded { .. })
        ) {
            return true;
        }
        current = e.source();
    }

    let chain = format_err_chain(err);
    MISSING_CREDENTIAL_MARKERS
        .iter()
        .any(|marker| chain.contains(marker))
}
