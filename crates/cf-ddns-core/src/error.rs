//! Error types for the DDNS updater
//!
//! Every error maps onto one of the sysexits-style process statuses the
//! daemon reports to its supervisor, see [`Error::exit_code`].

use crate::domain::RecordType;
use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Command line usage error (EX_USAGE)
pub const EX_USAGE: u8 = 64;

/// Input data error (EX_DATAERR)
pub const EX_DATAERR: u8 = 65;

/// Internal software error (EX_SOFTWARE)
pub const EX_SOFTWARE: u8 = 70;

/// Core error type for the DDNS updater
#[derive(Error, Debug)]
pub enum Error {
    /// The delay could not be parsed or is not a positive number of seconds
    #[error("{0} isn't a valid duration")]
    InvalidDuration(String),

    /// The provider rejected the bearer token; carries the provider's messages
    #[error("Failed to validate bearer token: {0}")]
    CredentialInvalid(String),

    /// The command was invoked incorrectly
    #[error("{0}")]
    Usage(String),

    /// Every configuration problem found during validation
    #[error("Invalid configuration: {}", join_errors(.0))]
    Validation(Vec<Error>),

    /// A `TYPE:domain` spec named a type other than A or AAAA
    #[error("Invalid record type {0}. Must be one of A, AAAA.")]
    UnknownRecordType(String),

    /// No matching record exists in the provider account
    #[error("{}", describe_missing(.domain, .record_type))]
    RecordNotFound {
        /// Requested domain
        domain: String,
        /// Requested type, `None` when the spec left it open
        record_type: Option<RecordType>,
    },

    /// The provider answered with its own error envelope
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// `code: message` pairs joined with " / "
        message: String,
    },

    /// HTTP or network failure without a provider error envelope
    #[error("Transport error: {0}")]
    Transport(String),

    /// The public address could not be determined
    #[error("IP lookup failed: {0}")]
    IpLookup(String),

    /// The very first update pass failed
    #[error("Error while updating records for the first time: {0}")]
    FirstTick(#[source] Box<Error>),

    /// A later update pass failed; the job keeps running
    #[error("Error while updating records: {0}")]
    Tick(#[source] Box<Error>),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a usage error
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an IP lookup error
    pub fn ip_lookup(msg: impl Into<String>) -> Self {
        Self::IpLookup(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a "record not found" error
    pub fn not_found(domain: impl Into<String>, record_type: Option<RecordType>) -> Self {
        Self::RecordNotFound {
            domain: domain.into(),
            record_type,
        }
    }

    /// Process exit status for this error
    ///
    /// - 64: configuration-phase failures (duration, credential, no domains)
    /// - 65: resolution-phase failures (unknown type, missing record)
    /// - 70: first update pass failure, and anything unexpected
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::InvalidDuration(_)
            | Error::CredentialInvalid(_)
            | Error::Usage(_)
            | Error::Validation(_) => EX_USAGE,
            Error::UnknownRecordType(_) | Error::RecordNotFound { .. } => EX_DATAERR,
            _ => EX_SOFTWARE,
        }
    }
}

fn join_errors(errors: &[Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn describe_missing(domain: &str, record_type: &Option<RecordType>) -> String {
    match record_type {
        Some(record_type) => format!(
            "Cannot find an {record_type} record for the domain {domain} in your Cloudflare settings. \
             Have you defined this record yet?"
        ),
        None => format!(
            "Cannot find the domain {domain} in your Cloudflare settings. \
             Have you defined this record yet?"
        ),
    }
}
