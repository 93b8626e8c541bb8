//! Conversions from external infrastructure errors into domain errors.

use cdnbulk_domain::BulkError;
use reqwest::Error as HttpError;
use url::ParseError as UrlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub BulkError);

impl From<InfraError> for BulkError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<BulkError> for InfraError {
    fn from(value: BulkError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoBulkError {
    fn into_bulk(self) -> BulkError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → BulkError */
/* -------------------------------------------------------------------------- */

impl IntoBulkError for HttpError {
    fn into_bulk(self) -> BulkError {
        if self.is_timeout() {
            return BulkError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return BulkError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => BulkError::Auth(message),
                404 => BulkError::NotFound(message),
                429 => BulkError::Network(message),
                400..=499 => BulkError::InvalidInput(message),
                _ => BulkError::Network(message),
            };
        }

        if self.is_decode() {
            return BulkError::Remote(format!("undecodable response: {self}"));
        }

        BulkError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_bulk())
    }
}

/* -------------------------------------------------------------------------- */
/* url::ParseError → BulkError */
/* -------------------------------------------------------------------------- */

impl IntoBulkError for UrlError {
    fn into_bulk(self) -> BulkError {
        BulkError::Config(format!("invalid URL: {self}"))
    }
}

impl From<UrlError> for InfraError {
    fn from(value: UrlError) -> Self {
        InfraError(value.into_bulk())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
