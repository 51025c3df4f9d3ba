//! Session bring-up: capabilities, challenge, activation, privilege.
//!
//! [`Handshake`] performs no I/O. A driver feeds it the BMC's datagrams and
//! sends whatever it returns; [`establish_session`] and
//! [`establish_session_async`] are the drivers for this crate's transports.

use core::fmt;

use rand::RngCore;

use crate::auth::{SecretBytes, activation_auth_code, message_auth_code};
use crate::codec::{
    ActivateSessionRequest, ActivateSessionResponse, AuthCapabilitiesRequest,
    AuthCapabilitiesResponse, Request, SessionChallengeRequest, SessionChallengeResponse,
    SessionPrivilegeLevelRequest, SessionPrivilegeLevelResponse, WireResponse,
};
use crate::error::{Error, Result};
use crate::negotiate::Negotiator;
use crate::packet::{
    SessionHeader, decode_lan_response, decode_session_packet, encode_lan_request,
    encode_session_packet,
};
use crate::session::{PendingRequest, Session};
#[cfg(feature = "async")]
use crate::transport::AsyncTransport;
#[cfg(feature = "blocking")]
use crate::transport::Transport;
use crate::types::{AuthType, CommandId, PrivilegeLevel, RawResponse};

/// Channel number meaning "the channel this request arrives on".
pub const CURRENT_CHANNEL: u8 = 0x0E;

/// Parameters of a session attempt.
#[derive(Debug, Clone)]
pub struct SessionParams {
    channel: u8,
    username: Vec<u8>,
    password: SecretBytes,
    privilege_level: PrivilegeLevel,
    initial_inbound_sequence: u32,
    negotiator: Negotiator,
}

impl SessionParams {
    /// Parameters for `username`/`password` at Administrator privilege.
    ///
    /// The initial inbound sequence number is random and non-zero.
    pub fn new(username: impl Into<Vec<u8>>, password: impl Into<Vec<u8>>) -> Self {
        Self::with_secret(username.into(), SecretBytes::new(password.into()))
    }

    pub(crate) fn with_secret(username: Vec<u8>, password: SecretBytes) -> Self {
        Self {
            channel: CURRENT_CHANNEL,
            username,
            password,
            privilege_level: PrivilegeLevel::Administrator,
            initial_inbound_sequence: random_sequence(),
            negotiator: Negotiator::default(),
        }
    }

    /// Channel to query capabilities for (default [`CURRENT_CHANNEL`]).
    pub fn channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    /// Requested session privilege level.
    pub fn privilege_level(mut self, level: PrivilegeLevel) -> Self {
        self.privilege_level = level;
        self
    }

    /// First session sequence number the BMC will use toward us. Must be non-zero.
    pub fn initial_inbound_sequence(mut self, sequence: u32) -> Self {
        self.initial_inbound_sequence = sequence;
        self
    }

    /// Restrict the acceptable authentication types.
    pub fn negotiator(mut self, negotiator: Negotiator) -> Self {
        self.negotiator = negotiator;
        self
    }
}

fn random_sequence() -> u32 {
    let mut rng = rand::rng();
    loop {
        let value = rng.next_u32();
        if value != 0 {
            return value;
        }
    }
}

/// Observable phase of a [`Handshake`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakePhase {
    /// Nothing sent yet.
    Idle,
    /// Waiting for the capabilities response.
    CapabilitiesRequested,
    /// Capabilities received, negotiating. Transient.
    CapabilitiesReceived,
    /// Waiting for the challenge response.
    ChallengeRequested,
    /// Activation sent, waiting for the BMC to accept it.
    Authenticating,
    /// Session activated, waiting for the privilege level change.
    Activated,
    /// Session handed to the caller.
    Ready,
    /// Terminal failure.
    Failed,
}

impl fmt::Display for HandshakePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What the driver does next.
#[derive(Debug)]
pub enum Progress {
    /// Send this datagram and feed the answer back to [`Handshake::handle`].
    Send(Vec<u8>),
    /// The session is established.
    Ready(Session),
}

enum State {
    Idle,
    CapabilitiesRequested,
    ChallengeRequested {
        auth_type: AuthType,
        per_message_auth: bool,
    },
    Authenticating {
        auth_type: AuthType,
        per_message_auth: bool,
    },
    Activated {
        session: Session,
        pending: PendingRequest,
    },
    Ready,
    Failed,
}

impl State {
    fn phase(&self) -> HandshakePhase {
        match self {
            Self::Idle => HandshakePhase::Idle,
            Self::CapabilitiesRequested => HandshakePhase::CapabilitiesRequested,
            Self::ChallengeRequested { .. } => HandshakePhase::ChallengeRequested,
            Self::Authenticating { .. } => HandshakePhase::Authenticating,
            Self::Activated { .. } => HandshakePhase::Activated,
            Self::Ready => HandshakePhase::Ready,
            Self::Failed => HandshakePhase::Failed,
        }
    }
}

/// Sans-IO session establishment state machine.
pub struct Handshake {
    params: SessionParams,
    state: State,
}

impl fmt::Debug for Handshake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handshake")
            .field("params", &self.params)
            .field("phase", &self.phase())
            .finish()
    }
}

impl Handshake {
    /// Validate `params` and create an idle handshake.
    pub fn new(params: SessionParams) -> Result<Self> {
        if params.initial_inbound_sequence == 0 {
            return Err(Error::InvalidArgument(
                "initial inbound sequence number must be non-zero",
            ));
        }
        if params.privilege_level == PrivilegeLevel::None {
            return Err(Error::InvalidArgument("requested privilege level must not be None"));
        }
        Ok(Self {
            params,
            state: State::Idle,
        })
    }

    /// Current phase.
    pub fn phase(&self) -> HandshakePhase {
        self.state.phase()
    }

    /// Produce the `Get Channel Authentication Capabilities` datagram.
    pub fn start(&mut self) -> Result<Vec<u8>> {
        if !matches!(self.state, State::Idle) {
            return Err(self.fail(Error::InvalidState("handshake already started")));
        }
        let request = Request::GetAuthCapabilities(AuthCapabilitiesRequest {
            channel_number: self.params.channel,
            privilege_level: self.params.privilege_level,
        });
        match outside_session(&request) {
            Ok(packet) => {
                self.transition(State::CapabilitiesRequested);
                Ok(packet)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Feed the BMC's answer to the last datagram.
    pub fn handle(&mut self, datagram: &[u8]) -> Result<Progress> {
        let state = core::mem::replace(&mut self.state, State::Failed);
        let from = state.phase();
        match self.step(state, datagram) {
            Ok((next, progress)) => {
                self.state = next;
                crate::observe::handshake_phase(from, self.phase());
                Ok(progress)
            }
            Err(err) => {
                crate::observe::handshake_failed(from, &err);
                Err(err)
            }
        }
    }

    /// Record a failure that happened outside the state machine (for
    /// example a transport timeout) and hand the error back.
    pub fn fail(&mut self, err: Error) -> Error {
        let from = self.phase();
        self.state = State::Failed;
        crate::observe::handshake_failed(from, &err);
        err
    }

    fn transition(&mut self, next: State) {
        let from = self.phase();
        self.state = next;
        crate::observe::handshake_phase(from, self.phase());
    }

    fn step(&self, state: State, datagram: &[u8]) -> Result<(State, Progress)> {
        match state {
            State::CapabilitiesRequested => {
                let caps: AuthCapabilitiesResponse =
                    decode_outside_session(CommandId::GET_AUTH_CAPABILITIES, datagram)?;
                crate::observe::handshake_phase(
                    HandshakePhase::CapabilitiesRequested,
                    HandshakePhase::CapabilitiesReceived,
                );

                let auth_type = self
                    .params
                    .negotiator
                    .select(&caps, self.params.privilege_level)?;

                let request = Request::GetSessionChallenge(SessionChallengeRequest::new(
                    auth_type,
                    &self.params.username,
                ));
                let packet = outside_session(&request)?;
                let next = State::ChallengeRequested {
                    auth_type,
                    per_message_auth: !caps.per_message_auth_disabled(),
                };
                Ok((next, Progress::Send(packet)))
            }
            State::ChallengeRequested {
                auth_type,
                per_message_auth,
            } => {
                let challenge: SessionChallengeResponse =
                    decode_outside_session(CommandId::GET_SESSION_CHALLENGE, datagram)?;
                challenge.completion_code.check()?;
                if challenge.temporary_session_id == 0 {
                    return Err(Error::Protocol("BMC issued temporary session ID 0"));
                }

                let auth_code = activation_auth_code(
                    auth_type,
                    &self.params.password,
                    challenge.temporary_session_id,
                    &challenge.challenge,
                    self.params.initial_inbound_sequence,
                )?;
                let request = Request::ActivateSession(ActivateSessionRequest {
                    auth_type,
                    privilege_level: self.params.privilege_level,
                    auth_code,
                    inbound_sequence: self.params.initial_inbound_sequence,
                });

                let message = encode_lan_request(
                    CommandId::ACTIVATE_SESSION.netfn.as_u8(),
                    CommandId::ACTIVATE_SESSION.cmd,
                    0,
                    &request.encode(),
                )?;
                let header = SessionHeader {
                    auth_type,
                    sequence: 0,
                    session_id: challenge.temporary_session_id,
                    auth_code: message_auth_code(
                        auth_type,
                        &self.params.password,
                        challenge.temporary_session_id,
                        &message,
                        0,
                    )?,
                };
                let packet = encode_session_packet(&header, &message)?;
                crate::observe::dump_hex("ipmi activate session request", &packet);
                let next = State::Authenticating {
                    auth_type,
                    per_message_auth,
                };
                Ok((next, Progress::Send(packet)))
            }
            State::Authenticating {
                auth_type,
                per_message_auth,
            } => {
                let activated: ActivateSessionResponse =
                    decode_outside_session(CommandId::ACTIVATE_SESSION, datagram)?;
                activated.completion_code.check()?;
                if activated.auth_type != auth_type {
                    return Err(Error::Protocol("BMC activated a different auth type"));
                }

                let mut session = Session::activate(
                    &activated,
                    self.params.password.clone(),
                    self.params.initial_inbound_sequence,
                    per_message_auth,
                )?;
                crate::observe::handshake_phase(
                    HandshakePhase::Authenticating,
                    HandshakePhase::Activated,
                );

                if self.params.privilege_level == session.privilege_level() {
                    return Ok((State::Ready, Progress::Ready(session)));
                }

                let request = Request::SetSessionPrivilegeLevel(SessionPrivilegeLevelRequest {
                    privilege_level: self.params.privilege_level,
                });
                let (pending, packet) = session.wrap_request(&request)?;
                Ok((State::Activated { session, pending }, Progress::Send(packet)))
            }
            State::Activated {
                mut session,
                pending,
            } => {
                let raw = session.unwrap(&pending, datagram)?;
                let response = SessionPrivilegeLevelResponse::decode(&raw.to_wire())?;
                session.set_privilege_level(response.new_privilege_level);
                Ok((State::Ready, Progress::Ready(session)))
            }
            State::Idle => Err(Error::InvalidState("handshake not started")),
            State::Ready | State::Failed => Err(Error::InvalidState("handshake finished")),
        }
    }
}

fn outside_session(request: &Request) -> Result<Vec<u8>> {
    let id = request.id();
    let message = encode_lan_request(id.netfn.as_u8(), id.cmd, 0, &request.encode())?;
    let packet = encode_session_packet(&SessionHeader::outside_session(), &message)?;
    crate::observe::dump_hex("ipmi pre-session request", &packet);
    Ok(packet)
}

fn decode_outside_session<R: WireResponse>(id: CommandId, datagram: &[u8]) -> Result<R> {
    crate::observe::dump_hex("ipmi pre-session response", datagram);
    let packet = decode_session_packet(datagram)?;
    let raw: RawResponse = decode_lan_response(id.netfn.as_u8(), id.cmd, 0, &packet.message)?;
    Ok(R::decode(&raw.to_wire())?)
}

/// Establish a session over a blocking transport.
#[cfg(feature = "blocking")]
pub fn establish_session<T: Transport + ?Sized>(
    transport: &T,
    params: SessionParams,
) -> Result<Session> {
    let mut handshake = Handshake::new(params)?;
    let mut datagram = handshake.start()?;
    loop {
        let response = match transport.send_recv(&datagram) {
            Ok(response) => response,
            Err(err) => return Err(handshake.fail(err)),
        };
        match handshake.handle(&response)? {
            Progress::Send(next) => datagram = next,
            Progress::Ready(session) => return Ok(session),
        }
    }
}

/// Establish a session over an async transport.
#[cfg(feature = "async")]
pub async fn establish_session_async<T: AsyncTransport + ?Sized>(
    transport: &T,
    params: SessionParams,
) -> Result<Session> {
    let mut handshake = Handshake::new(params)?;
    let mut datagram = handshake.start()?;
    loop {
        let response = match transport.send_recv(&datagram).await {
            Ok(response) => response,
            Err(err) => return Err(handshake.fail(err)),
        };
        match handshake.handle(&response)? {
            Progress::Send(next) => datagram = next,
            Progress::Ready(session) => return Ok(session),
        }
    }
}
