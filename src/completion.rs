//! Completion codes (IPMI v1.5 section 5.2).
//!
//! Every response starts with a completion code. [`CompletionCode`] keeps the
//! raw byte so unnamed codes round-trip, and [`CompletionCode::classify`] is
//! the way callers decide between success and failure.

use core::fmt;

use crate::error::{Error, Result};

/// One-byte status attached to every IPMI response.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CompletionCode(u8);

/// Failure codes with a dedicated name in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Invalid command (0xC1).
    InvalidCommand,
    /// Request data length invalid / short packet (0xC7).
    ShortPacket,
    /// Invalid data field in request (0xCC).
    InvalidPacket,
    /// Destination unavailable (0xD3).
    DestinationUnavailable,
    /// Unspecified error (0xFF).
    Unspecified,
}

/// Outcome of classifying a completion code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Command completed normally (0x00).
    Success,
    /// A failure with a named kind.
    NamedFailure(FailureKind),
    /// Any other failure, carrying the raw byte.
    UnnamedFailure(u8),
}

impl CompletionCode {
    /// Command completed normally.
    pub const COMPLETED: Self = Self(0x00);
    /// Invalid command.
    pub const INVALID_COMMAND: Self = Self(0xC1);
    /// Request data length invalid.
    pub const SHORT_PACKET: Self = Self(0xC7);
    /// Invalid data field in request.
    pub const INVALID_PACKET: Self = Self(0xCC);
    /// Destination unavailable.
    pub const DESTINATION_UNAVAILABLE: Self = Self(0xD3);
    /// Unspecified error.
    pub const UNSPECIFIED: Self = Self(0xFF);

    /// Wrap a raw completion code byte.
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    /// Raw byte as it appears on the wire.
    pub const fn code(self) -> u8 {
        self.0
    }

    /// Classify the code.
    pub fn classify(self) -> Classification {
        classify(self.0)
    }

    /// Whether the command completed normally.
    pub fn is_success(self) -> bool {
        self.0 == 0x00
    }

    /// `Ok(())` on success, [`Error::CompletionCode`] otherwise.
    pub fn check(self) -> Result<()> {
        match self.classify() {
            Classification::Success => Ok(()),
            _ => Err(Error::CompletionCode { code: self }),
        }
    }

    /// Human-readable description, when the code is a well-known one.
    pub fn description(self) -> Option<&'static str> {
        let text = match self.0 {
            0x00 => "command completed normally",
            // Command-specific codes of the session management commands.
            0x81 => "no session slot available / invalid user name",
            0x82 => "no slot available for given user / null user name not enabled",
            0x83 => "no slot available to support user / username does not have access",
            0x84 => "session sequence number out of range",
            0x85 => "invalid session ID in request",
            0x86 => "requested maximum privilege level exceeds user or channel limit",
            0x87 => "invalid session ID",
            0xC0 => "node busy",
            0xC1 => "invalid command",
            0xC2 => "command invalid for given LUN",
            0xC3 => "timeout while processing command",
            0xC4 => "out of space",
            0xC5 => "reservation canceled or invalid reservation ID",
            0xC6 => "request data truncated",
            0xC7 => "request data length invalid",
            0xC8 => "request data field length limit exceeded",
            0xC9 => "parameter out of range",
            0xCA => "cannot return number of requested data bytes",
            0xCB => "requested sensor, data, or record not present",
            0xCC => "invalid data field in request",
            0xCD => "command illegal for specified sensor or record type",
            0xCE => "command response could not be provided",
            0xCF => "cannot execute duplicated request",
            0xD0 => "SDR repository in update mode",
            0xD1 => "device in firmware update mode",
            0xD2 => "BMC initialization in progress",
            0xD3 => "destination unavailable",
            0xD4 => "insufficient privilege level",
            0xD5 => "command not supported in present state",
            0xD6 => "command sub-function disabled or unavailable",
            0xFF => "unspecified error",
            _ => return None,
        };
        Some(text)
    }
}

/// Classify a raw completion code byte.
///
/// Total and side-effect free: 0x00 is success, the five named codes map to
/// their [`FailureKind`], every other byte is an unnamed failure.
pub fn classify(code: u8) -> Classification {
    match code {
        0x00 => Classification::Success,
        0xC1 => Classification::NamedFailure(FailureKind::InvalidCommand),
        0xC7 => Classification::NamedFailure(FailureKind::ShortPacket),
        0xCC => Classification::NamedFailure(FailureKind::InvalidPacket),
        0xD3 => Classification::NamedFailure(FailureKind::DestinationUnavailable),
        0xFF => Classification::NamedFailure(FailureKind::Unspecified),
        other => Classification::UnnamedFailure(other),
    }
}

impl From<u8> for CompletionCode {
    fn from(raw: u8) -> Self {
        Self(raw)
    }
}

impl From<CompletionCode> for u8 {
    fn from(code: CompletionCode) -> Self {
        code.0
    }
}

impl fmt::Debug for CompletionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompletionCode({:#04x})", self.0)
    }
}

impl fmt::Display for CompletionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.description() {
            Some(text) => write!(f, "{:#04x} ({text})", self.0),
            None => write!(f, "{:#04x} (unrecognized completion code)", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_covers_every_byte() {
        for raw in 0..=u8::MAX {
            let expected = match raw {
                0x00 => Classification::Success,
                0xC1 => Classification::NamedFailure(FailureKind::InvalidCommand),
                0xC7 => Classification::NamedFailure(FailureKind::ShortPacket),
                0xCC => Classification::NamedFailure(FailureKind::InvalidPacket),
                0xD3 => Classification::NamedFailure(FailureKind::DestinationUnavailable),
                0xFF => Classification::NamedFailure(FailureKind::Unspecified),
                other => Classification::UnnamedFailure(other),
            };
            assert_eq!(classify(raw), expected, "code {raw:#04x}");
        }
    }

    #[test]
    fn check_maps_failures_to_errors() {
        assert!(CompletionCode::COMPLETED.check().is_ok());

        let err = CompletionCode::new(0xC1).check().unwrap_err();
        assert!(matches!(
            err,
            Error::CompletionCode {
                code: CompletionCode::INVALID_COMMAND
            }
        ));
    }

    #[test]
    fn unnamed_codes_are_displayable() {
        let code = CompletionCode::new(0xD4);
        assert_eq!(code.classify(), Classification::UnnamedFailure(0xD4));
        assert_eq!(code.to_string(), "0xd4 (insufficient privilege level)");

        let code = CompletionCode::new(0x42);
        assert_eq!(code.to_string(), "0x42 (unrecognized completion code)");
        assert_eq!(u8::from(code), 0x42);
    }
}
