//! A scripted BMC for driving sessions in unit tests.

use std::net::{SocketAddr, UdpSocket};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::auth::{SecretBytes, activation_auth_code, ct_eq, message_auth_code};
use crate::codec::{
    ActivateSessionRequest, ActivateSessionResponse, AuthCapabilitiesResponse,
    CloseSessionResponse, DeviceIdResponse, Request, SessionChallengeResponse,
    SessionPrivilegeLevelResponse, WireResponse,
};
use crate::completion::CompletionCode;
use crate::error::{Error, Result};
use crate::packet::{
    LanRequest, SessionHeader, decode_lan_request, decode_session_packet, encode_lan_response,
    encode_session_packet,
};
use crate::types::{AuthType, CommandId, NetFn, PrivilegeLevel};

/// Build an in-session reply datagram to `request`.
pub(crate) fn session_reply(
    auth_type: AuthType,
    password: &[u8],
    session_id: u32,
    sequence: u32,
    request: &LanRequest,
    body: &[u8],
) -> Vec<u8> {
    let message = encode_lan_response(request, body);
    let auth_code = message_auth_code(
        auth_type,
        &SecretBytes::new(password.to_vec()),
        session_id,
        &message,
        sequence,
    )
    .expect("auth code");
    let header = SessionHeader {
        auth_type,
        sequence,
        session_id,
        auth_code,
    };
    encode_session_packet(&header, &message).expect("reply packet")
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct BmcConfig {
    pub auth_type_support: u8,
    pub capabilities_completion_code: u8,
    pub challenge_completion_code: u8,
    pub privilege_completion_code: u8,
    pub temporary_session_id: u32,
    pub challenge: [u8; 16],
    pub session_id: u32,
    /// InboundSeq returned by Activate Session: what we expect the console to send first.
    pub first_outbound_sequence: u32,
    pub max_privilege: PrivilegeLevel,
    /// Advertise per-message authentication as disabled and answer in-session
    /// requests without an AuthCode.
    pub per_message_auth_disabled: bool,
}

impl Default for BmcConfig {
    fn default() -> Self {
        Self {
            auth_type_support: AuthType::Md5.support_bit() | AuthType::None.support_bit(),
            capabilities_completion_code: 0x00,
            challenge_completion_code: 0x00,
            privilege_completion_code: 0x00,
            temporary_session_id: 0x0BAD_F00D,
            challenge: [0xA5; 16],
            session_id: 0x0000_0042,
            first_outbound_sequence: 0x0000_0001,
            max_privilege: PrivilegeLevel::Administrator,
            per_message_auth_disabled: false,
        }
    }
}

#[derive(Debug, Default)]
struct BmcState {
    commands: Vec<CommandId>,
    activation: Option<ActivateSessionRequest>,
    active: Option<ActiveSession>,
    chassis_controls: Vec<u8>,
    boot_options: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, Copy)]
struct ActiveSession {
    auth_type: AuthType,
    /// Next sequence expected from the console.
    expected: u32,
    /// Next sequence the BMC sends.
    outbound: u32,
    closed: bool,
}

pub(crate) struct FakeBmc {
    config: BmcConfig,
    password: Vec<u8>,
    state: Mutex<BmcState>,
}

impl FakeBmc {
    pub(crate) fn new(config: BmcConfig, password: &[u8]) -> Self {
        Self {
            config,
            password: password.to_vec(),
            state: Mutex::new(BmcState::default()),
        }
    }

    pub(crate) fn commands(&self) -> Vec<CommandId> {
        self.lock().commands.clone()
    }

    pub(crate) fn last_activation(&self) -> Option<ActivateSessionRequest> {
        self.lock().activation
    }

    pub(crate) fn chassis_controls(&self) -> Vec<u8> {
        self.lock().chassis_controls.clone()
    }

    pub(crate) fn boot_options(&self) -> Vec<Vec<u8>> {
        self.lock().boot_options.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BmcState> {
        self.state.lock().expect("fake bmc lock")
    }

    /// Answer one datagram.
    pub(crate) fn respond(&self, datagram: &[u8]) -> Result<Vec<u8>> {
        let packet = decode_session_packet(datagram)?;
        let request = decode_lan_request(&packet.message)?;
        let netfn = NetFn::from_u8(request.netfn).ok_or(Error::Protocol("fake bmc: netfn"))?;
        let id = CommandId::new(netfn, request.cmd);
        // Unknown commands are answered inside the session with 0xC1.
        let decoded = Request::decode(id, &request.data).ok();

        let mut state = self.lock();
        state.commands.push(id);
        let password = SecretBytes::new(self.password.clone());

        let body = match decoded {
            Some(Request::GetAuthCapabilities(req)) => AuthCapabilitiesResponse {
                completion_code: self.config.capabilities_completion_code.into(),
                channel_number: if req.channel_number == 0x0E { 1 } else { req.channel_number },
                auth_type_support: self.config.auth_type_support,
                status: if self.config.per_message_auth_disabled { 0x14 } else { 0x04 },
                reserved: 0,
                oem_id: 0,
                oem_aux: 0,
            }
            .encode(),
            Some(Request::GetSessionChallenge(_)) => SessionChallengeResponse {
                completion_code: self.config.challenge_completion_code.into(),
                temporary_session_id: self.config.temporary_session_id,
                challenge: self.config.challenge,
            }
            .encode(),
            Some(Request::ActivateSession(req)) => {
                let expected = activation_auth_code(
                    req.auth_type,
                    &password,
                    self.config.temporary_session_id,
                    &self.config.challenge,
                    req.inbound_sequence,
                )?;
                let accepted = packet.header.session_id == self.config.temporary_session_id
                    && packet.header.auth_type == req.auth_type
                    && ct_eq(&expected, &req.auth_code);
                state.activation = Some(req);

                if accepted {
                    state.active = Some(ActiveSession {
                        auth_type: req.auth_type,
                        expected: self.config.first_outbound_sequence,
                        outbound: req.inbound_sequence,
                        closed: false,
                    });
                    ActivateSessionResponse {
                        completion_code: CompletionCode::COMPLETED,
                        auth_type: req.auth_type,
                        session_id: self.config.session_id,
                        inbound_sequence: self.config.first_outbound_sequence,
                        max_privilege: self.config.max_privilege,
                    }
                    .encode()
                } else {
                    vec![CompletionCode::INVALID_PACKET.code()]
                }
            }
            in_session => {
                let Some(mut active) = state.active else {
                    return Err(Error::Protocol("fake bmc: no session"));
                };
                if active.closed || packet.header.session_id != self.config.session_id {
                    return Err(Error::Protocol("fake bmc: unknown session"));
                }
                let code = message_auth_code(
                    active.auth_type,
                    &password,
                    self.config.session_id,
                    &packet.message,
                    packet.header.sequence,
                )?;
                if code != packet.header.auth_code {
                    return Err(Error::AuthenticationFailed("fake bmc: auth code"));
                }
                if packet.header.sequence != active.expected {
                    return Err(Error::Protocol("fake bmc: out of sequence"));
                }
                active.expected = active.expected.wrapping_add(1);

                let body = self.in_session_body(&mut state, &mut active, in_session);
                let sequence = active.outbound;
                active.outbound = active.outbound.wrapping_add(1);
                state.active = Some(active);

                let reply_auth_type = if self.config.per_message_auth_disabled {
                    AuthType::None
                } else {
                    active.auth_type
                };
                return Ok(session_reply(
                    reply_auth_type,
                    &self.password,
                    self.config.session_id,
                    sequence,
                    &request,
                    &body,
                ));
            }
        };

        let message = encode_lan_response(&request, &body);
        Ok(encode_session_packet(&SessionHeader::outside_session(), &message)?)
    }

    fn in_session_body(
        &self,
        state: &mut BmcState,
        active: &mut ActiveSession,
        request: Option<Request>,
    ) -> Vec<u8> {
        let Some(request) = request else {
            return vec![CompletionCode::INVALID_COMMAND.code()];
        };
        match request {
            Request::SetSessionPrivilegeLevel(req) => SessionPrivilegeLevelResponse {
                completion_code: self.config.privilege_completion_code.into(),
                new_privilege_level: req.privilege_level,
            }
            .encode(),
            Request::CloseSession(req) => {
                let code = if req.session_id == self.config.session_id {
                    active.closed = true;
                    CompletionCode::COMPLETED
                } else {
                    CompletionCode::new(0x87)
                };
                CloseSessionResponse {
                    completion_code: code,
                }
                .encode()
            }
            Request::GetDeviceId => DeviceIdResponse {
                completion_code: CompletionCode::COMPLETED,
                device_id: 0x20,
                device_revision: 0x81,
                firmware_revision_1: 0x02,
                firmware_revision_2: 0x15,
                ipmi_version: 0x51,
                additional_device_support: 0xBF,
                manufacturer_id: 0x1C4C,
                product_id: 0x0E01,
            }
            .encode(),
            Request::GetChassisStatus => vec![0x00, 0x21, 0x10, 0x00, 0x00],
            Request::ChassisControl(control) => {
                state.chassis_controls.push(control.as_u8());
                vec![0x00]
            }
            Request::SetSystemBootOptions(req) => {
                let mut stored = vec![req.parameter];
                stored.extend_from_slice(&req.data);
                state.boot_options.push(stored);
                vec![0x00]
            }
            Request::GetSystemBootOptions(req) => match state.boot_options.last() {
                Some(stored) if stored[0] & 0x7F == req.parameter => {
                    let mut body = vec![0x00, 0x01, req.parameter];
                    body.extend_from_slice(&stored[1..]);
                    body
                }
                _ => vec![0x80],
            },
            _ => vec![CompletionCode::INVALID_COMMAND.code()],
        }
    }
}

/// Serve `bmc` on a local UDP socket until it has been idle for a while.
///
/// From the `duplicate_from`-th datagram on (counting from 1) every answer is
/// sent twice, as a BMC does when it sees a retransmitted request.
pub(crate) fn serve_udp(bmc: Arc<FakeBmc>, duplicate_from: usize) -> (SocketAddr, JoinHandle<()>) {
    let socket = UdpSocket::bind("127.0.0.1:0").expect("bind fake bmc");
    socket
        .set_read_timeout(Some(Duration::from_millis(500)))
        .expect("fake bmc timeout");
    let addr = socket.local_addr().expect("fake bmc addr");

    let handle = std::thread::spawn(move || {
        let mut buf = [0u8; 1024];
        let mut received = 0;
        while let Ok((n, from)) = socket.recv_from(&mut buf) {
            received += 1;
            let Ok(answer) = bmc.respond(&buf[..n]) else {
                continue;
            };
            let copies = if received >= duplicate_from { 2 } else { 1 };
            for _ in 0..copies {
                if socket.send_to(&answer, from).is_err() {
                    return;
                }
            }
        }
    });
    (addr, handle)
}

#[cfg(feature = "blocking")]
impl crate::transport::Transport for FakeBmc {
    fn send_recv(&self, request: &[u8]) -> Result<Vec<u8>> {
        self.respond(request)
    }
}

#[cfg(feature = "async")]
impl crate::transport::AsyncTransport for FakeBmc {
    fn send_recv<'a>(
        &'a self,
        request: &'a [u8],
    ) -> core::pin::Pin<Box<dyn core::future::Future<Output = Result<Vec<u8>>> + Send + 'a>> {
        Box::pin(async move { self.respond(request) })
    }
}
