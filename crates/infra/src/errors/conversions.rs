//! Conversions from external infrastructure errors into domain errors.

use delayq_domain::DelayqError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub DelayqError);

impl From<InfraError> for DelayqError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<DelayqError> for InfraError {
    fn from(value: DelayqError) -> Self {
        InfraError(value)
    }
}

/* -------------------------------------------------------------------------- */
/* Config file errors → DelayqError */
/* -------------------------------------------------------------------------- */

impl From<std::io::Error> for InfraError {
    fn from(err: std::io::Error) -> Self {
        InfraError(DelayqError::Config(format!("Failed to read config file: {err}")))
    }
}

impl From<toml::de::Error> for InfraError {
    fn from(err: toml::de::Error) -> Self {
        InfraError(DelayqError::Config(format!("Invalid TOML format: {err}")))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(err: serde_json::Error) -> Self {
        InfraError(DelayqError::Config(format!("Invalid JSON format: {err}")))
    }
}

/* -------------------------------------------------------------------------- */
/* aws_sdk_sqs errors → DelayqError */
/* -------------------------------------------------------------------------- */

#[cfg(feature = "sqs")]
impl<E, R> From<aws_sdk_sqs::error::SdkError<E, R>> for InfraError
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    fn from(err: aws_sdk_sqs::error::SdkError<E, R>) -> Self {
        let detail = aws_sdk_sqs::error::DisplayErrorContext(&err).to_string();
        InfraError(DelayqError::Queue(detail))
    }
}
