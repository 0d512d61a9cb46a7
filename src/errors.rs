//! Client Binding Error Hierarchy
//!
//! Two layers of errors live here:
//! - [`Error`]: the internal error produced by conversions, preconditions and
//!   the transport. Variants are grouped by the concern that produced them.
//! - [`ClientError`]: the structured, host-visible error. It carries a
//!   [`ResultCode`], a message and the optional `key` / `bin` annotations the
//!   host error object exposes.

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Value;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric status shared by the binding, the transport and the server
///
/// Negative codes are produced on the client side, positive codes come back
/// from the cluster.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultCode {
    AsyncQueueFull = -9,
    ClientAbort = -5,
    Param = -2,
    Client = -1,
    Server = 1,
    RecordNotFound = 2,
    RecordGeneration = 3,
    RecordExists = 5,
    Timeout = 9,
    Cluster = 11,
    RecordTooBig = 13,
    BinName = 21,
    FilteredOut = 27,
}

impl ResultCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Whether the code was reported by a cluster node rather than the client
    pub fn is_server(self) -> bool {
        self.as_i32() > 0
    }
}

/// Host error classes a [`ClientError`] maps onto
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed call-site arguments or an unusable client handle
    Param,
    /// Failure on the client side after argument validation
    Client,
    /// No established cluster connection
    Cluster,
    /// Record level failure reported by the server
    Record,
    /// Bin level failure reported by the server
    Bin,
    Timeout,
    /// Any other server failure
    Server,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid client object")]
    InvalidClient,

    #[error("No connection to cluster")]
    NotConnected,

    /// The caller's host guard belongs to a different runtime than the client
    #[error("Host guard does not belong to this client's runtime")]
    ForeignHostGuard,

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// Failure reported by the transport or a cluster node
    #[error(transparent)]
    Server(#[from] ServerError),

    /// The caller's continuation reported a failure
    #[error("put_async callback raised an exception: {0}")]
    Callback(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    pub fn code(&self) -> ResultCode {
        match self {
            Error::InvalidClient => ResultCode::Param,
            Error::NotConnected => ResultCode::Cluster,
            Error::ForeignHostGuard => ResultCode::Param,
            Error::Key(_) => ResultCode::Param,
            Error::Record(e) => e.code(),
            Error::Policy(_) => ResultCode::Param,
            Error::Server(e) => e.code,
            Error::Callback(_) => ResultCode::Client,
            Error::Config(_) => ResultCode::Param,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KeyError {
    #[error("key is invalid: expected tuple or dict, found {found}")]
    InvalidShape { found: &'static str },

    #[error("namespace must be a string")]
    Namespace,

    #[error("namespace exceeds {max} bytes: {len}")]
    NamespaceTooLong { len: usize, max: usize },

    #[error("set must be a string")]
    Set,

    #[error("set exceeds {max} bytes: {len}")]
    SetTooLong { len: usize, max: usize },

    #[error("key is invalid: unsupported user key type {found}")]
    UserKey { found: &'static str },

    #[error("digest is invalid: expected {expected} bytes")]
    Digest { expected: usize },

    #[error("either key or digest is required")]
    MissingKeyOrDigest,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("Record should be passed as bin-value pair, found {found}")]
    BinsNotMap { found: &'static str },

    #[error("A bin name should not exceed {max} characters limit: {name}")]
    BinNameTooLong { name: String, max: usize },

    #[error("Metadata should be of type dictionary")]
    MetaNotMap,

    #[error("TTL should be an int or long within range")]
    Ttl,

    #[error("Generation should be an int or long within range")]
    Generation,

    #[error("Bin {bin}: {type_name} values cannot be stored without a serializer")]
    Unserializable { bin: String, type_name: &'static str },

    #[error("Bin {bin}: no user serializer registered")]
    NoUserSerializer { bin: String },

    #[error("Bin {bin}: serialization failed: {reason}")]
    Serialize { bin: String, reason: String },
}

impl RecordError {
    pub fn code(&self) -> ResultCode {
        match self {
            RecordError::BinNameTooLong { .. } => ResultCode::BinName,
            RecordError::Serialize { .. } => ResultCode::Client,
            _ => ResultCode::Param,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolicyError {
    #[error("policy must be a dict, found {found}")]
    NotMap { found: &'static str },

    #[error("{name} is invalid")]
    Field { name: &'static str },

    #[error("{name} value {value} is out of range")]
    OutOfRange { name: &'static str, value: i64 },

    #[error("expressions are invalid: {0}")]
    Expression(String),
}

/// Failure reported through the transport, either synchronously on
/// submission or asynchronously on completion
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ServerError {
    pub code: ResultCode,
    pub message: String,
    /// The write may have been applied even though it failed
    pub in_doubt: bool,
}

impl ServerError {
    pub fn new(
        code: ResultCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            in_doubt: false,
        }
    }

    pub fn in_doubt(mut self) -> Self {
        self.in_doubt = true;
        self
    }

    pub fn record_not_found() -> Self {
        Self::new(ResultCode::RecordNotFound, "Record does not exist in database")
    }

    pub fn record_exists() -> Self {
        Self::new(ResultCode::RecordExists, "Record already exists")
    }

    pub fn generation() -> Self {
        Self::new(ResultCode::RecordGeneration, "Generation error")
    }

    pub fn timeout() -> Self {
        Self::new(ResultCode::Timeout, "Timeout")
    }

    pub fn client_abort() -> Self {
        Self::new(ResultCode::ClientAbort, "Command dropped before completion").in_doubt()
    }
}

/// Structured error delivered to the host
///
/// Synchronous rejections carry the caller's key and bins descriptors;
/// asynchronous failures carry the translated key and a `Nil` bin.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} (code {})", .code.as_i32())]
pub struct ClientError {
    pub code: ResultCode,
    pub message: String,
    pub in_doubt: bool,
    pub key: Option<Value>,
    pub bin: Option<Value>,
}

impl ClientError {
    pub fn new(
        code: ResultCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            in_doubt: false,
            key: None,
            bin: None,
        }
    }

    pub fn with_key(
        mut self,
        key: Value,
    ) -> Self {
        self.key = Some(key);
        self
    }

    pub fn with_bin(
        mut self,
        bin: Value,
    ) -> Self {
        self.bin = Some(bin);
        self
    }

    /// Host error class for this error
    pub fn kind(&self) -> ErrorKind {
        match self.code {
            ResultCode::Param => ErrorKind::Param,
            ResultCode::Cluster => ErrorKind::Cluster,
            ResultCode::Timeout => ErrorKind::Timeout,
            ResultCode::RecordNotFound
            | ResultCode::RecordGeneration
            | ResultCode::RecordExists
            | ResultCode::RecordTooBig
            | ResultCode::FilteredOut => ErrorKind::Record,
            ResultCode::BinName => ErrorKind::Bin,
            code if code.is_server() => ErrorKind::Server,
            _ => ErrorKind::Client,
        }
    }
}

impl From<Error> for ClientError {
    fn from(err: Error) -> Self {
        let in_doubt = matches!(&err, Error::Server(e) if e.in_doubt);
        let mut client_error = ClientError::new(err.code(), err.to_string());
        client_error.in_doubt = in_doubt;
        client_error
    }
}

impl From<ServerError> for ClientError {
    fn from(err: ServerError) -> Self {
        Error::Server(err).into()
    }
}
