//! Live IPMI v1.5 session state.
//!
//! A [`Session`] is produced by the handshake and wraps every in-session
//! request: it owns the outbound session sequence, the 6-bit LAN request
//! sequence and the inbound replay window.

use crate::auth::{SecretBytes, ct_eq, message_auth_code};
use crate::codec::{ActivateSessionResponse, CloseSessionRequest, Request};
use crate::completion::CompletionCode;
use crate::error::{Error, Result};
#[cfg(any(feature = "blocking", feature = "async"))]
use crate::packet::answers_other_request;
use crate::packet::{
    SessionHeader, decode_lan_response, decode_session_packet, encode_lan_request,
    encode_session_packet,
};
#[cfg(feature = "async")]
use crate::transport::AsyncTransport;
#[cfg(feature = "blocking")]
use crate::transport::Transport;
use crate::types::{AuthType, CommandId, PrivilegeLevel, RawResponse};

/// An activated IPMI v1.5 session.
///
/// Methods take `&mut self`: a session carries one request at a time.
#[derive(Debug)]
pub struct Session {
    session_id: u32,
    auth_type: AuthType,
    password: SecretBytes,
    /// Last inbound session sequence number accepted.
    inbound_sequence: u32,
    /// Next outbound session sequence number.
    outbound_sequence: u32,
    privilege_level: PrivilegeLevel,
    max_privilege: PrivilegeLevel,
    /// Replies must carry a valid AuthCode. Cleared when the BMC reported
    /// per-message authentication as disabled.
    per_message_auth: bool,
    rq_seq: u8,
    closed: bool,
}

/// Bookkeeping for a request that has been wrapped but not yet answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRequest {
    netfn: u8,
    cmd: u8,
    rq_seq: u8,
    sequence: u32,
}

impl PendingRequest {
    /// Network function of the request.
    pub fn netfn(&self) -> u8 {
        self.netfn
    }

    /// Command number of the request.
    pub fn cmd(&self) -> u8 {
        self.cmd
    }

    /// 6-bit LAN request sequence the response must echo.
    pub fn rq_seq(&self) -> u8 {
        self.rq_seq
    }

    /// Session sequence number the request was sent with.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl Session {
    /// Build the session from a successful `Activate Session` response.
    ///
    /// Every v1.5 session starts at User privilege (or lower, when that is
    /// all the BMC grants). `per_message_auth` is false only when the
    /// capabilities answer had the "per-message authentication disabled" bit.
    pub(crate) fn activate(
        response: &ActivateSessionResponse,
        password: SecretBytes,
        initial_inbound_sequence: u32,
        per_message_auth: bool,
    ) -> Result<Self> {
        if response.session_id == 0 {
            return Err(Error::Protocol("BMC activated session with ID 0"));
        }
        Ok(Self {
            session_id: response.session_id,
            auth_type: response.auth_type,
            password,
            inbound_sequence: initial_inbound_sequence.wrapping_sub(1),
            outbound_sequence: nonzero(response.inbound_sequence),
            privilege_level: PrivilegeLevel::User.min(response.max_privilege),
            max_privilege: response.max_privilege,
            per_message_auth,
            rq_seq: 0,
            closed: false,
        })
    }

    /// Session ID assigned by the BMC.
    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    /// Authentication type used for per-message AuthCodes.
    pub fn auth_type(&self) -> AuthType {
        self.auth_type
    }

    /// Last inbound session sequence number accepted.
    pub fn inbound_sequence(&self) -> u32 {
        self.inbound_sequence
    }

    /// Session sequence number the next request will carry.
    pub fn outbound_sequence(&self) -> u32 {
        self.outbound_sequence
    }

    /// Currently active privilege level.
    pub fn privilege_level(&self) -> PrivilegeLevel {
        self.privilege_level
    }

    /// Maximum privilege level the BMC granted at activation.
    pub fn max_privilege(&self) -> PrivilegeLevel {
        self.max_privilege
    }

    /// Whether replies without an AuthCode are rejected.
    pub fn per_message_auth(&self) -> bool {
        self.per_message_auth
    }

    /// Whether `Close Session` has been issued on this session.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn set_privilege_level(&mut self, level: PrivilegeLevel) {
        self.privilege_level = level;
    }

    /// Wrap a typed request into a session datagram.
    pub fn wrap_request(&mut self, request: &Request) -> Result<(PendingRequest, Vec<u8>)> {
        let id = request.id();
        self.wrap(id.netfn.as_u8(), id.cmd, &request.encode())
    }

    /// Wrap a raw command into a session datagram.
    ///
    /// Attaches the current outbound sequence number and advances it.
    pub fn wrap(&mut self, netfn: u8, cmd: u8, data: &[u8]) -> Result<(PendingRequest, Vec<u8>)> {
        if self.closed || self.session_id == 0 {
            return Err(Error::NoSession);
        }
        self.wrap_unchecked(netfn, cmd, data)
    }

    fn wrap_unchecked(
        &mut self,
        netfn: u8,
        cmd: u8,
        data: &[u8],
    ) -> Result<(PendingRequest, Vec<u8>)> {
        let rq_seq = self.allocate_rq_seq();
        let message = encode_lan_request(netfn, cmd, rq_seq, data)?;

        let sequence = self.allocate_out_seq();
        let auth_code = message_auth_code(
            self.auth_type,
            &self.password,
            self.session_id,
            &message,
            sequence,
        )?;
        let header = SessionHeader {
            auth_type: self.auth_type,
            sequence,
            session_id: self.session_id,
            auth_code,
        };
        let packet = encode_session_packet(&header, &message)?;
        crate::observe::dump_hex("ipmi session request", &packet);

        let pending = PendingRequest {
            netfn,
            cmd,
            rq_seq,
            sequence,
        };
        Ok((pending, packet))
    }

    /// Validate and decode the response datagram for `pending`.
    ///
    /// A message whose sequence number is not newer than the last accepted
    /// one (compared modulo 2^32) is dropped with
    /// [`Error::SequenceViolation`]; the session stays usable. A failure
    /// completion code is returned as [`Error::CompletionCode`] and leaves
    /// the inbound sequence untouched.
    pub fn unwrap(&mut self, pending: &PendingRequest, datagram: &[u8]) -> Result<RawResponse> {
        if self.closed {
            return Err(Error::NoSession);
        }
        let (sequence, response) = self.open_envelope(pending, datagram)?;

        if !is_newer(sequence, self.inbound_sequence) {
            crate::observe::sequence_violation(self.session_id, sequence, self.inbound_sequence);
            return Err(Error::SequenceViolation {
                received: sequence,
                last_accepted: self.inbound_sequence,
            });
        }
        response.completion_code.check()?;
        self.inbound_sequence = sequence;
        Ok(response)
    }

    fn open_envelope(
        &self,
        pending: &PendingRequest,
        datagram: &[u8],
    ) -> Result<(u32, RawResponse)> {
        crate::observe::dump_hex("ipmi session response", datagram);
        let packet = decode_session_packet(datagram)?;
        let header = packet.header;

        if header.session_id != self.session_id {
            return Err(Error::Protocol("unexpected session id"));
        }

        match header.auth_code {
            Some(received) => {
                if header.auth_type != self.auth_type {
                    return Err(Error::Protocol("unexpected session auth type"));
                }
                let expected = message_auth_code(
                    self.auth_type,
                    &self.password,
                    self.session_id,
                    &packet.message,
                    header.sequence,
                )?
                .ok_or(Error::Protocol("unexpected auth code"))?;
                if !ct_eq(&expected, &received) {
                    return Err(Error::AuthenticationFailed("session auth code mismatch"));
                }
            }
            // Only BMCs with per-message authentication disabled may drop the AuthCode.
            None if self.auth_type == AuthType::None || !self.per_message_auth => {}
            None => return Err(Error::AuthenticationFailed("reply without auth code")),
        }

        let response =
            decode_lan_response(pending.netfn, pending.cmd, pending.rq_seq, &packet.message)?;
        Ok((header.sequence, response))
    }

    /// Precondition check and datagram for `Close Session`.
    ///
    /// Fails with [`Error::NoSession`] (and produces nothing to send) when the
    /// session was never activated or is already closed. On success the
    /// session is marked closed and accepts no further requests.
    pub fn begin_close(&mut self) -> Result<(PendingRequest, Vec<u8>)> {
        if self.session_id == 0 || self.closed {
            return Err(Error::NoSession);
        }
        let request = Request::CloseSession(CloseSessionRequest {
            session_id: self.session_id,
        });
        let id = request.id();
        let wrapped = self.wrap_unchecked(id.netfn.as_u8(), id.cmd, &request.encode())?;
        self.closed = true;
        Ok(wrapped)
    }

    /// Decode the `Close Session` response and report its completion code.
    ///
    /// Failure codes (including 0x87, invalid session ID) are returned, not
    /// raised: the session is gone either way.
    pub fn finish_close(&self, pending: &PendingRequest, datagram: &[u8]) -> Result<CompletionCode> {
        if pending.netfn != CommandId::CLOSE_SESSION.netfn.as_u8()
            || pending.cmd != CommandId::CLOSE_SESSION.cmd
        {
            return Err(Error::InvalidArgument("pending request is not Close Session"));
        }
        let (_, response) = self.open_envelope(pending, datagram)?;
        Ok(response.completion_code)
    }

    fn allocate_out_seq(&mut self) -> u32 {
        let current = self.outbound_sequence;
        self.outbound_sequence = nonzero(self.outbound_sequence.wrapping_add(1));
        current
    }

    fn allocate_rq_seq(&mut self) -> u8 {
        // rq_seq is 6-bit. We keep a u8 and wrap at 64.
        let current = self.rq_seq;
        self.rq_seq = (self.rq_seq + 1) & 0x3F;
        current
    }

    #[cfg(test)]
    pub(crate) fn new_test(session_id: u32, auth_type: AuthType, password: &[u8]) -> Self {
        Self {
            session_id,
            auth_type,
            password: SecretBytes::new(password.to_vec()),
            inbound_sequence: 0,
            outbound_sequence: 1,
            privilege_level: PrivilegeLevel::User,
            max_privilege: PrivilegeLevel::Administrator,
            per_message_auth: true,
            rq_seq: 0,
            closed: false,
        }
    }
}

/// Sequence number 0 is reserved for messages outside a session.
fn nonzero(sequence: u32) -> u32 {
    if sequence == 0 { 1 } else { sequence }
}

/// Serial-number comparison: `received` is ahead of `last_accepted` by less
/// than half the sequence space.
fn is_newer(received: u32, last_accepted: u32) -> bool {
    let distance = received.wrapping_sub(last_accepted);
    received != 0 && distance != 0 && distance < 1 << 31
}

/// Stale replies skipped for one request before the error is returned.
#[cfg(any(feature = "blocking", feature = "async"))]
const MAX_STALE_REPLIES: u32 = 8;

/// The datagram answered an earlier request (or repeated an answer); the
/// reply we wait for may still be on its way.
#[cfg(any(feature = "blocking", feature = "async"))]
fn is_stale_reply(err: &Error) -> bool {
    matches!(err, Error::SequenceViolation { .. }) || answers_other_request(err)
}

/// Send `packet` and feed answers to `accept` until one is not stale.
#[cfg(feature = "blocking")]
pub(crate) fn exchange<T, R>(
    transport: &T,
    packet: &[u8],
    mut accept: impl FnMut(&[u8]) -> Result<R>,
) -> Result<R>
where
    T: Transport + ?Sized,
{
    let mut datagram = transport.send_recv(packet)?;
    let mut skipped = 0;
    loop {
        match accept(&datagram) {
            Err(err) if skipped < MAX_STALE_REPLIES && is_stale_reply(&err) => {
                skipped += 1;
                crate::observe::stale_reply(skipped, &err);
                datagram = match transport.recv() {
                    Ok(next) => next,
                    Err(Error::Unsupported(_)) => return Err(err),
                    Err(recv_err) => return Err(recv_err),
                };
            }
            result => return result,
        }
    }
}

/// Async counterpart of [`exchange`].
#[cfg(feature = "async")]
pub(crate) async fn exchange_async<T, R>(
    transport: &T,
    packet: &[u8],
    mut accept: impl FnMut(&[u8]) -> Result<R>,
) -> Result<R>
where
    T: AsyncTransport + ?Sized,
{
    let mut datagram = transport.send_recv(packet).await?;
    let mut skipped = 0;
    loop {
        match accept(&datagram) {
            Err(err) if skipped < MAX_STALE_REPLIES && is_stale_reply(&err) => {
                skipped += 1;
                crate::observe::stale_reply(skipped, &err);
                datagram = match transport.recv().await {
                    Ok(next) => next,
                    Err(Error::Unsupported(_)) => return Err(err),
                    Err(recv_err) => return Err(recv_err),
                };
            }
            result => return result,
        }
    }
}

/// Close `session` over a blocking transport.
///
/// Returns whatever completion code the BMC answered with. The session is
/// consumed in every case.
#[cfg(feature = "blocking")]
pub fn close_session<T: Transport + ?Sized>(
    mut session: Session,
    transport: &T,
) -> Result<CompletionCode> {
    let (pending, packet) = session.begin_close()?;
    exchange(transport, &packet, |datagram| {
        session.finish_close(&pending, datagram)
    })
}

/// Close `session` over an async transport.
#[cfg(feature = "async")]
pub async fn close_session_async<T: AsyncTransport + ?Sized>(
    mut session: Session,
    transport: &T,
) -> Result<CompletionCode> {
    let (pending, packet) = session.begin_close()?;
    exchange_async(transport, &packet, |datagram| {
        session.finish_close(&pending, datagram)
    })
    .await
}
