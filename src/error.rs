use thiserror::Error;

/// Failure talking to a single load balancer host.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid url for host {host}: {source}")]
    InvalidUrl {
        host: String,
        #[source]
        source: url::ParseError,
    },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("stats report has no header line")]
    MissingHeader,

    #[error("stats report header has no `{0}` column")]
    MissingColumn(&'static str),

    #[error("malformed stats row {line}: {reason}")]
    MalformedRow { line: usize, reason: String },
}

/// Invalid caller-supplied settings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("retry policy needs at least one attempt")]
    ZeroAttempts,

    #[error("unknown target status `{0}`, expected `up` or `down`")]
    UnknownStatus(String),

    #[error("unknown action `{0}`, expected `enable` or `disable`")]
    UnknownAction(String),

    #[error("unknown verification policy `{0}`, expected `last-host` or `all-hosts`")]
    UnknownVerificationPolicy(String),

    #[error("proxy name must not be empty")]
    EmptyProxyName,
}
