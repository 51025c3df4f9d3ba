use std::io;

use thiserror::Error;

use crate::completion::CompletionCode;

/// Result type used across this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (socket, OS, etc.).
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Operation timed out.
    #[error("timeout waiting for response")]
    Timeout,

    /// A buffer could not be decoded into the expected message shape.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The BMC answered with a non-zero completion code.
    #[error("ipmi completion code {code}")]
    CompletionCode {
        /// Completion code returned by the BMC.
        code: CompletionCode,
    },

    /// None of the authentication types offered by the BMC is acceptable.
    #[error("no compatible authentication type (offered mask {offered:#04x})")]
    NoCompatibleAuth {
        /// AuthTypeSupport bitmask reported by the BMC.
        offered: u8,
    },

    /// An inbound session sequence number was not newer than the last accepted one.
    ///
    /// The message is dropped; the session itself stays usable.
    #[error("inbound sequence {received:#010x} not newer than {last_accepted:#010x}")]
    SequenceViolation {
        /// Sequence number carried by the dropped message.
        received: u32,
        /// Last sequence number accepted on this session.
        last_accepted: u32,
    },

    /// The session was never activated or has already been closed.
    #[error("no active session")]
    NoSession,

    /// An operation was attempted in a state that does not allow it.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// Authentication code verification failed.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(&'static str),

    /// Peer responded with an unexpected or invalid packet.
    #[error("protocol error: {0}")]
    Protocol(&'static str),

    /// Unsupported configuration or protocol feature.
    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    /// Invalid caller-supplied argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

impl From<CompletionCode> for Error {
    fn from(code: CompletionCode) -> Self {
        Self::CompletionCode { code }
    }
}

/// Errors produced while decoding fixed-layout messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Buffer shorter than the fixed layout of the message.
    #[error("short packet: expected {expected} bytes, got {actual}")]
    ShortPacket {
        /// Bytes required by the layout.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },

    /// The reserved authentication type value (3) was found on the wire.
    #[error("reserved authentication type")]
    ReservedAuthType,

    /// An authentication type outside the defined range was found.
    #[error("invalid authentication type {0:#04x}")]
    InvalidAuthType(u8),

    /// A privilege level outside the defined range was found.
    #[error("invalid privilege level {0:#04x}")]
    InvalidPrivilegeLevel(u8),

    /// No message shape is registered for this (NetFn, Command) pair.
    #[error("unknown command netfn {netfn:#04x} cmd {cmd:#04x}")]
    UnknownCommand {
        /// Network function.
        netfn: u8,
        /// Command number.
        cmd: u8,
    },

    /// Structurally invalid message.
    #[error("malformed message: {0}")]
    Malformed(&'static str),
}

impl DecodeError {
    /// Completion code a BMC would use to report the same condition.
    pub fn completion_code(&self) -> CompletionCode {
        match self {
            Self::ShortPacket { .. } => CompletionCode::SHORT_PACKET,
            _ => CompletionCode::INVALID_PACKET,
        }
    }
}
