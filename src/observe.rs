use std::time::Duration;

use crate::completion::CompletionCode;
use crate::error::Error;
use crate::handshake::HandshakePhase;
use crate::types::AuthType;

pub(crate) fn record_ok(
    mode: &'static str,
    netfn: u8,
    cmd: u8,
    elapsed: Duration,
    completion_code: CompletionCode,
) {
    let _ = (mode, netfn, cmd, elapsed, completion_code);

    #[cfg(feature = "metrics")]
    {
        metrics::counter!("ipmi_requests_total", "mode" => mode, "outcome" => "ok").increment(1);
        metrics::histogram!("ipmi_request_seconds", "mode" => mode).record(elapsed.as_secs_f64());
    }

    #[cfg(feature = "tracing")]
    {
        tracing::debug!(
            mode,
            netfn,
            cmd,
            completion_code = completion_code.code(),
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "ipmi request ok"
        );
    }
}

pub(crate) fn record_err(mode: &'static str, netfn: u8, cmd: u8, elapsed: Duration, err: &Error) {
    let _ = (mode, netfn, cmd, elapsed, err);

    #[cfg(feature = "metrics")]
    {
        metrics::counter!("ipmi_requests_total", "mode" => mode, "outcome" => "err").increment(1);
        metrics::counter!(
            "ipmi_request_errors_total",
            "mode" => mode,
            "kind" => error_kind(err)
        )
        .increment(1);
        if failure_code(err).is_some() {
            metrics::counter!("ipmi_completion_code_nonzero_total", "mode" => mode).increment(1);
        }
        metrics::histogram!("ipmi_request_seconds", "mode" => mode).record(elapsed.as_secs_f64());
    }

    #[cfg(feature = "tracing")]
    {
        tracing::warn!(
            mode,
            netfn,
            cmd,
            completion_code = failure_code(err),
            error = %err,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "ipmi request failed"
        );
    }
}

/// Completion code carried by a failed request, if the BMC answered at all.
#[cfg_attr(not(any(feature = "tracing", feature = "metrics")), allow(dead_code))]
fn failure_code(err: &Error) -> Option<u8> {
    match err {
        Error::CompletionCode { code } => Some(code.code()),
        _ => None,
    }
}

pub(crate) fn negotiated(auth_type: AuthType, offered: u8) {
    let _ = (auth_type, offered);

    #[cfg(feature = "tracing")]
    tracing::debug!(?auth_type, offered, "negotiated authentication type");
}

pub(crate) fn handshake_phase(from: HandshakePhase, to: HandshakePhase) {
    let _ = (from, to);

    #[cfg(feature = "tracing")]
    tracing::trace!(%from, %to, "handshake phase");
}

pub(crate) fn handshake_failed(from: HandshakePhase, err: &Error) {
    let _ = (from, err);

    #[cfg(feature = "metrics")]
    metrics::counter!("ipmi_handshake_failures_total", "kind" => error_kind(err)).increment(1);

    #[cfg(feature = "tracing")]
    tracing::warn!(phase = %from, error = %err, "session handshake failed");
}

pub(crate) fn sequence_violation(session_id: u32, received: u32, last_accepted: u32) {
    let _ = (session_id, received, last_accepted);

    #[cfg(feature = "metrics")]
    metrics::counter!("ipmi_sequence_violations_total").increment(1);

    #[cfg(feature = "tracing")]
    tracing::warn!(
        session_id,
        received,
        last_accepted,
        "dropped inbound message with stale sequence number"
    );
}

pub(crate) fn stale_reply(skipped: u32, err: &Error) {
    let _ = (skipped, err);

    #[cfg(feature = "metrics")]
    metrics::counter!("ipmi_stale_replies_total").increment(1);

    #[cfg(feature = "tracing")]
    tracing::debug!(skipped, error = %err, "skipped stale reply");
}

pub(crate) fn retransmit(mode: &'static str, attempt: u32, attempts: u32) {
    let _ = (mode, attempt, attempts);

    #[cfg(feature = "metrics")]
    metrics::counter!("ipmi_timeouts_total", "mode" => mode).increment(1);

    #[cfg(feature = "tracing")]
    tracing::debug!(mode, attempt, attempts, "no answer before timeout");
}

#[cfg(feature = "metrics")]
fn error_kind(err: &Error) -> &'static str {
    match err {
        Error::Io(_) => "io",
        Error::Timeout => "timeout",
        Error::Decode(_) => "decode",
        Error::CompletionCode { .. } => "completion_code",
        Error::NoCompatibleAuth { .. } => "no_compatible_auth",
        Error::SequenceViolation { .. } => "sequence_violation",
        Error::NoSession => "no_session",
        Error::InvalidState(_) => "invalid_state",
        Error::AuthenticationFailed(_) => "authentication",
        Error::Protocol(_) => "protocol",
        Error::Unsupported(_) => "unsupported",
        Error::InvalidArgument(_) => "invalid_argument",
    }
}

fn debug_enabled() -> bool {
    std::env::var("IPMI_DEBUG")
        .map(|v| !v.is_empty())
        .unwrap_or(false)
}

/// Hex dump of a datagram when `IPMI_DEBUG` is set.
pub(crate) fn dump_hex(label: &str, bytes: &[u8]) {
    if !debug_enabled() {
        return;
    }
    let out = format_hex(label, bytes);

    #[cfg(feature = "tracing")]
    tracing::trace!("{out}");

    #[cfg(not(feature = "tracing"))]
    eprintln!("{out}");
}

fn format_hex(label: &str, bytes: &[u8]) -> String {
    use std::fmt::Write as _;

    let mut out = String::with_capacity(label.len() + bytes.len() * 3 + 8);
    let _ = write!(out, "{label} ({}):", bytes.len());
    for b in bytes {
        let _ = write!(out, " {b:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_dump_format() {
        assert_eq!(
            format_hex("rmcp", &[0x06, 0x00, 0xFF, 0x07]),
            "rmcp (4): 06 00 ff 07"
        );
        assert_eq!(format_hex("empty", &[]), "empty (0):");
    }

    #[test]
    fn failure_code_comes_from_completion_code_errors() {
        let err = Error::CompletionCode {
            code: CompletionCode::new(0xD4),
        };
        assert_eq!(failure_code(&err), Some(0xD4));
        assert_eq!(failure_code(&Error::Timeout), None);
        assert_eq!(failure_code(&Error::NoSession), None);
    }
}
