use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    BadBindAddress(String),
    BadGeometry(String),
    NotInRange(String),
    DirectoryError(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::BadBindAddress(e) => write!(f, "Bind address error: {}", e),
            ConfigError::BadGeometry(e) => write!(f, "Geometry error: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
            ConfigError::DirectoryError(e) => write!(f, "Directory error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

/// One of the four external resources a session depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Display,
    Browser,
    Encoder,
    Receiver,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Display => write!(f, "display"),
            ResourceKind::Browser => write!(f, "browser"),
            ResourceKind::Encoder => write!(f, "encoder"),
            ResourceKind::Receiver => write!(f, "receiver"),
        }
    }
}

/// A failure that moves a session into the `error` state.
///
/// The value is recorded on the session record and kept there for later
/// inspection through the status API, even after teardown has run.
#[derive(Debug, Clone)]
pub enum SessionFailure {
    Provisioning {
        resource: ResourceKind,
        message: String,
    },
    StaleOutput {
        age_ms: u64,
    },
    ProcessExit {
        resource: ResourceKind,
        status: Option<i32>,
    },
}

impl SessionFailure {
    /// Stable identifier exposed by the status API.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionFailure::Provisioning { .. } => "provisioning",
            SessionFailure::StaleOutput { .. } => "stale_output",
            SessionFailure::ProcessExit { .. } => "process_exit",
        }
    }
}

impl fmt::Display for SessionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionFailure::Provisioning { resource, message } => {
                write!(f, "failed to provision {}: {}", resource, message)
            }
            SessionFailure::StaleOutput { age_ms } => {
                write!(f, "output stale for {}ms", age_ms)
            }
            SessionFailure::ProcessExit { resource, status } => match status {
                Some(code) => write!(f, "{} process exited with status {}", resource, code),
                None => write!(f, "{} process exited unexpectedly", resource),
            },
        }
    }
}

impl std::error::Error for SessionFailure {}

/// Registry- and API-level session errors.
#[derive(Debug)]
pub enum SessionError {
    NotFound,
    LimitReached,
    ResourceExhaustion(std::io::Error),
    InvalidRequest(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotFound => write!(f, "Session not found"),
            SessionError::LimitReached => write!(f, "Session limit reached"),
            SessionError::ResourceExhaustion(e) => {
                write!(f, "Failed to allocate session resources: {}", e)
            }
            SessionError::InvalidRequest(e) => write!(f, "Invalid session request: {}", e),
        }
    }
}

impl std::error::Error for SessionError {}

/// Receiver-control failures. Always non-fatal for the session: the link is
/// best-effort and a failure only degrades it.
#[derive(Debug)]
pub enum ReceiverError {
    Unavailable,
    NoAddress(String),
    Connection(std::io::Error),
}

impl fmt::Display for ReceiverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReceiverError::Unavailable => write!(f, "receiver control is disabled"),
            ReceiverError::NoAddress(name) => {
                write!(f, "no address known for receiver '{}'", name)
            }
            ReceiverError::Connection(e) => write!(f, "receiver connection failed: {}", e),
        }
    }
}

impl std::error::Error for ReceiverError {}

impl From<std::io::Error> for ReceiverError {
    fn from(err: std::io::Error) -> Self {
        ReceiverError::Connection(err)
    }
}

/// A single non-fatal failure encountered while tearing a session down.
#[derive(Debug)]
pub enum TeardownError {
    Release {
        resource: ResourceKind,
        message: String,
    },
    RemoveDir {
        path: PathBuf,
        message: String,
    },
}

impl fmt::Display for TeardownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeardownError::Release { resource, message } => {
                write!(f, "failed to release {}: {}", resource, message)
            }
            TeardownError::RemoveDir { path, message } => {
                write!(f, "failed to remove {}: {}", path.display(), message)
            }
        }
    }
}

impl std::error::Error for TeardownError {}

/// Outcome of one teardown run. Teardown is best-effort by design, so the
/// report aggregates failures instead of aborting on the first one.
#[derive(Debug, Default)]
pub struct TeardownReport {
    pub errors: Vec<TeardownError>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn record(&mut self, error: TeardownError) {
        self.errors.push(error);
    }
}

#[derive(Debug)]
pub enum ControllerError {
    ConfigurationError(ConfigError),
    BindError(String),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::ConfigurationError(e) => write!(f, "Configuration error: {}", e),
            ControllerError::BindError(e) => write!(f, "Bind error: {}", e),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<ConfigError> for ControllerError {
    fn from(err: ConfigError) -> Self {
        ControllerError::ConfigurationError(err)
    }
}

/// Errors surfaced by the HTTP client subcommands.
#[derive(Debug)]
pub enum ClientError {
    Transport(reqwest::Error),
    Api { status: u16, message: String },
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Transport(e) => write!(f, "Request failed: {}", e),
            ClientError::Api { status, message } => {
                write!(f, "Server returned {}: {}", status, message)
            }
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err)
    }
}
