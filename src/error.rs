use std::fmt;

/// Failures that abort a single poll cycle.
///
/// Every variant is recoverable: the poll loop reports it to the chat once
/// and tries again after the retry period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotError {
    /// Transport failure talking to the review API.
    Http(String),
    /// The review API did not answer within the configured timeout.
    Timeout,
    /// The review API answered with something other than 200.
    UnexpectedStatus(u16),
    /// The body was not valid JSON.
    Decode(String),
    /// A field of the response has the wrong JSON type.
    TypeMismatch(String),
    /// Required top-level keys are absent from the response.
    MissingKeys(Vec<String>),
    /// A homework record lacks a required field.
    MissingField(&'static str),
    /// A homework record carries a status we have no verdict for.
    UnknownStatus(String),
}

impl BotError {
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Timeout | Self::UnexpectedStatus(_) | Self::Decode(_)
        )
    }

    pub fn is_schema(&self) -> bool {
        matches!(self, Self::TypeMismatch(_) | Self::MissingKeys(_))
    }

    pub fn is_domain(&self) -> bool {
        matches!(self, Self::MissingField(_) | Self::UnknownStatus(_))
    }
}

impl fmt::Display for BotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "review API unreachable: {e}"),
            Self::Timeout => write!(f, "review API request timed out"),
            Self::UnexpectedStatus(code) => write!(f, "review API returned status {code}"),
            Self::Decode(e) => write!(f, "review API returned invalid JSON: {e}"),
            Self::TypeMismatch(what) => write!(f, "unexpected response type: {what}"),
            Self::MissingKeys(keys) => {
                write!(f, "response is missing expected keys: {}", keys.join(", "))
            }
            Self::MissingField(field) => write!(f, "homework record has no '{field}' field"),
            Self::UnknownStatus(status) => write!(f, "undocumented homework status '{status}'"),
        }
    }
}

impl std::error::Error for BotError {}

impl From<reqwest::Error> for BotError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Http(e.to_string())
        }
    }
}
