use crate::places::PlacesStatus;
use thiserror::Error;

/// Encapsulates all errors that can end a pipeline run.
///
/// The `Display` text of each variant is the message shown on the
/// status surface when the run fails.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    /// The platform offers no location service at all.
    #[error("Geolocation not supported.")]
    LocationUnsupported,
    /// The user or platform refused access to the location.
    #[error("Location permission denied.")]
    LocationDenied,
    /// The location service could not determine a position.
    #[error("Location information is unavailable.")]
    LocationUnavailable,
    /// The location service did not answer within the configured timeout.
    #[error("Location request timed out.")]
    LocationTimeout,
    /// The location service failed for an unclassified reason.
    #[error("Unable to retrieve location: {0}")]
    LocationUnknown(String),
    /// The places provider answered with a status other than `OK` or
    /// `ZERO_RESULTS`.
    #[error("Places API error: {0}")]
    QueryFailed(PlacesStatus),
    /// The places provider call itself failed before producing a status.
    #[error("Places API error: {0}")]
    QueryThrew(String),
    /// A failure which escaped the pipeline's own handling.
    #[error("Error: {0}")]
    Unhandled(String),
}

impl Error {
    /// Return true if this error was raised while resolving the location.
    pub fn is_location(&self) -> bool {
        matches!(
            self,
            Self::LocationUnsupported
                | Self::LocationDenied
                | Self::LocationUnavailable
                | Self::LocationTimeout
                | Self::LocationUnknown(_)
        )
    }

    /// Return true if this error was raised by the nearby query.
    pub fn is_query(&self) -> bool {
        matches!(self, Self::QueryFailed(_) | Self::QueryThrew(_))
    }

    /// Return the provider status code, if this error was caused by a
    /// non-OK places status.
    pub fn status(&self) -> Option<&PlacesStatus> {
        match self {
            Self::QueryFailed(status) => Some(status),
            _ => None,
        }
    }
}

/// The classified failures a `LocationProvider` can report.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum LocationError {
    #[error("location services are not supported")]
    Unsupported,
    #[error("permission to read the location was denied")]
    PermissionDenied,
    #[error("position unavailable: {0}")]
    PositionUnavailable(String),
    #[error("location request timed out")]
    Timeout,
    #[error("unknown location error: {0}")]
    Unknown(String),
}

impl From<reqwest::Error> for LocationError {
    fn from(err: reqwest::Error) -> Self {
        use reqwest::StatusCode;

        if err.is_timeout() {
            return Self::Timeout;
        }

        match err.status() {
            Some(StatusCode::UNAUTHORIZED) | Some(StatusCode::FORBIDDEN) => {
                Self::PermissionDenied
            }
            Some(status) => {
                Self::PositionUnavailable(format!("HTTP status {}", status))
            }
            None if err.is_decode() => Self::Unknown(err.to_string()),
            None => Self::PositionUnavailable(err.to_string()),
        }
    }
}

impl From<LocationError> for Error {
    fn from(err: LocationError) -> Self {
        match err {
            LocationError::Unsupported => Self::LocationUnsupported,
            LocationError::PermissionDenied => Self::LocationDenied,
            LocationError::PositionUnavailable(_) => Self::LocationUnavailable,
            LocationError::Timeout => Self::LocationTimeout,
            LocationError::Unknown(msg) => Self::LocationUnknown(msg),
        }
    }
}

/// Errors raised by a `PlacesProvider` before it could report a status.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Could not decode the places response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Could not parse a URL: {0}")]
    UrlParse(#[from] url::ParseError),
    /// The provider call failed synchronously, or its completion was
    /// never delivered.
    #[error("{0}")]
    Thrown(String),
}

impl ProviderError {
    pub(crate) fn thrown<T: Into<String>>(msg: T) -> Self {
        Self::Thrown(msg.into())
    }
}

impl From<ProviderError> for Error {
    fn from(err: ProviderError) -> Self {
        Self::QueryThrew(err.to_string())
    }
}

/// Errors that can occur when creating a new places client.
#[derive(Debug, Error)]
pub enum NewClientError {
    /// A required environment variable was not set.
    #[error("Environment variable {0} is not set")]
    MissingEnvVar(&'static str),
    #[error("Could not parse a URL: {0}")]
    UrlParse(#[from] url::ParseError),
    /// An error originating in the underlying HTTP client.
    #[error("Error occurred in the underlying HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[cfg(test)]
mod test {
    use super::{Error, LocationError, ProviderError};
    use crate::places::PlacesStatus;

    #[test]
    fn location_errors_are_classified() {
        assert_eq!(
            Error::from(LocationError::PermissionDenied),
            Error::LocationDenied
        );
        assert_eq!(
            Error::from(LocationError::PositionUnavailable("gps".to_owned())),
            Error::LocationUnavailable
        );
        assert_eq!(Error::from(LocationError::Timeout), Error::LocationTimeout);
        assert!(Error::from(LocationError::Unsupported).is_location());
    }

    #[test]
    fn query_failed_display_includes_status() {
        let err = Error::QueryFailed(PlacesStatus::from_code("OVER_QUERY_LIMIT"));
        assert_eq!(err.to_string(), "Places API error: OVER_QUERY_LIMIT");
        assert!(err.is_query());
        assert!(err.status().is_some());
    }

    #[test]
    fn thrown_provider_error_keeps_message() {
        let err: Error = ProviderError::thrown("service not loaded").into();
        assert_eq!(err, Error::QueryThrew("service not loaded".to_owned()));
        assert_eq!(err.to_string(), "Places API error: service not loaded");
        assert!(err.status().is_none());
    }
}
