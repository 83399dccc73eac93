use std::{fmt::Display, path::PathBuf};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("missing required fields: {}", .missing.join(", "))]
    Validation { missing: Vec<&'static str> },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("nothing to save, generate a story first")]
    EmptyResult,

    #[error("prompt render failed: {0}")]
    Template(#[from] handlebars::RenderError),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// A next step for the user when the failure points at one.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Error::Api(api) => match api.status()? {
                401 | 403 => Some("the API key was rejected, check it in the settings"),
                404 => Some("the endpoint was not found, check the url and model"),
                429 => Some("rate limited, wait a moment and try again"),
                _ => None,
            },
            _ => None,
        }
    }

    /// The message with its hint, if any, on a line of its own.
    pub fn report(&self) -> String {
        match self.hint() {
            Some(hint) => format!("{self}\n{hint}"),
            None => self.to_string(),
        }
    }
}

#[derive(Debug)]
pub enum ApiErrorKind {
    Transport(reqwest::Error),
    Status { status: u16, body: String },
    Malformed(String),
}

/// A failed completion call. Holds what was sent (without the credential) so
/// the message shown to the user is enough to diagnose the endpoint.
#[derive(Debug)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub endpoint: String,
    pub request: String,
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match &self.kind {
            ApiErrorKind::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ApiErrorKind::Transport(e) => write!(f, "API request failed: {e}")?,
            ApiErrorKind::Status { status, body } => {
                write!(f, "API request failed: {status}\nresponse: {body}")?
            }
            ApiErrorKind::Malformed(reason) => {
                write!(f, "API response malformed: {reason}")?
            }
        }
        write!(
            f,
            "\nrequest: POST {}\nheaders: Authorization: Bearer ***, Content-Type: application/json\nbody: {}",
            self.endpoint, self.request
        )
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ApiErrorKind::Transport(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(status: u16) -> Error {
        Error::Api(ApiError {
            kind: ApiErrorKind::Status {
                status,
                body: "{}".to_string(),
            },
            endpoint: "https://api.deepseek.com/chat/completions".to_string(),
            request: "{}".to_string(),
        })
    }

    #[test]
    fn rejected_key_gets_a_hint() {
        let report = status_error(401).report();
        assert!(report.contains("401"));
        assert!(report.ends_with("check it in the settings"));
    }

    #[test]
    fn other_failures_have_no_hint() {
        assert_eq!(status_error(500).hint(), None);
        assert_eq!(Error::EmptyResult.hint(), None);
        assert_eq!(Error::EmptyResult.report(), Error::EmptyResult.to_string());
    }
}
