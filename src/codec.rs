//! Fixed-layout request and response bodies.
//!
//! Each message is the data part of an IPMI LAN message (after the command
//! byte). Responses start with the completion code. Multi-byte integers are
//! little-endian. Dispatch is keyed on [`CommandId`], never on the command
//! byte alone.

use std::borrow::Cow;

use crate::auth::pad16;
use crate::completion::CompletionCode;
use crate::error::DecodeError;
use crate::types::{AuthType, ChassisControl, CommandId, PrivilegeLevel, RawResponse};

/// A request body with a fixed wire layout.
pub trait WireRequest: Sized {
    /// Command this body belongs to.
    const ID: CommandId;
    /// Encoded length in bytes (minimum length for variable-size bodies).
    const LEN: usize;

    /// Append the encoded body to `out`.
    fn encode_into(&self, out: &mut Vec<u8>);

    /// Decode a body. The buffer must hold at least [`Self::LEN`] bytes.
    fn decode(bytes: &[u8]) -> Result<Self, DecodeError>;

    /// Encode into a fresh buffer.
    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::LEN);
        self.encode_into(&mut out);
        out
    }
}

/// A response body with a fixed wire layout, completion code first.
pub trait WireResponse: Sized {
    /// Command this body answers.
    const ID: CommandId;
    /// Encoded length in bytes, completion code included.
    const LEN: usize;

    /// Completion code of the response.
    fn completion_code(&self) -> CompletionCode;

    /// Append the encoded body to `out`.
    fn encode_into(&self, out: &mut Vec<u8>);

    /// Decode from a buffer of exactly [`Self::LEN`] bytes.
    #[doc(hidden)]
    fn decode_fixed(bytes: &[u8]) -> Result<Self, DecodeError>;

    /// Decode a response body.
    ///
    /// A buffer shorter than the layout is only accepted when its completion
    /// code reports a failure; the missing fields then decode as zero.
    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let layout = fixed_layout(bytes, Self::LEN)?;
        Self::decode_fixed(&layout)
    }

    /// Encode into a fresh buffer.
    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::LEN);
        self.encode_into(&mut out);
        out
    }
}

fn fixed_layout(bytes: &[u8], len: usize) -> Result<Cow<'_, [u8]>, DecodeError> {
    let Some(&code) = bytes.first() else {
        return Err(DecodeError::ShortPacket {
            expected: len,
            actual: 0,
        });
    };

    if bytes.len() >= len {
        return Ok(Cow::Borrowed(&bytes[..len]));
    }

    // Failure responses may omit their payload entirely.
    if code == 0x00 {
        return Err(DecodeError::ShortPacket {
            expected: len,
            actual: bytes.len(),
        });
    }

    let mut padded = bytes.to_vec();
    padded.resize(len, 0);
    Ok(Cow::Owned(padded))
}

/// Enum fields of a failure response fall back to `fallback` instead of
/// hiding the completion code behind a decode error.
fn field_or<T>(
    completion_code: CompletionCode,
    decoded: Result<T, DecodeError>,
    fallback: T,
) -> Result<T, DecodeError> {
    match decoded {
        Err(_) if !completion_code.is_success() => Ok(fallback),
        other => other,
    }
}

fn require_len(bytes: &[u8], len: usize) -> Result<(), DecodeError> {
    if bytes.len() < len {
        return Err(DecodeError::ShortPacket {
            expected: len,
            actual: bytes.len(),
        });
    }
    Ok(())
}

fn u16_le(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn u32_le(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn array16(bytes: &[u8], at: usize) -> [u8; 16] {
    let mut out = [0u8; 16];
    out.copy_from_slice(&bytes[at..at + 16]);
    out
}

/// `Get Channel Authentication Capabilities` request (section 22.13).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthCapabilitiesRequest {
    /// Channel number; 0x0E addresses the channel the request arrives on.
    pub channel_number: u8,
    /// Privilege level the capabilities are queried for.
    pub privilege_level: PrivilegeLevel,
}

impl WireRequest for AuthCapabilitiesRequest {
    const ID: CommandId = CommandId::GET_AUTH_CAPABILITIES;
    const LEN: usize = 2;

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(self.channel_number);
        out.push(self.privilege_level.as_u8());
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        require_len(bytes, Self::LEN)?;
        Ok(Self {
            channel_number: bytes[0],
            privilege_level: PrivilegeLevel::try_from(bytes[1])?,
        })
    }
}

/// `Get Channel Authentication Capabilities` response (section 22.13).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthCapabilitiesResponse {
    /// Completion code.
    pub completion_code: CompletionCode,
    /// Channel number the answer applies to.
    pub channel_number: u8,
    /// Bitmask of enabled authentication types (bit n = auth type n).
    pub auth_type_support: u8,
    /// Authentication status flags.
    pub status: u8,
    /// Reserved byte, kept verbatim.
    pub reserved: u8,
    /// OEM ID (low two bytes of the IANA number).
    pub oem_id: u16,
    /// OEM auxiliary data.
    pub oem_aux: u8,
}

impl AuthCapabilitiesResponse {
    /// Whether the BMC advertises `auth_type` for the queried privilege.
    pub fn supports(&self, auth_type: AuthType) -> bool {
        self.auth_type_support & auth_type.support_bit() != 0
    }

    /// Per-message authentication is disabled.
    pub fn per_message_auth_disabled(&self) -> bool {
        self.status & 0x10 != 0
    }

    /// User-level authentication is disabled.
    pub fn user_level_auth_disabled(&self) -> bool {
        self.status & 0x08 != 0
    }

    /// One or more non-null user names exist.
    pub fn non_null_usernames(&self) -> bool {
        self.status & 0x04 != 0
    }

    /// One or more null user names with non-null passwords exist.
    pub fn null_usernames(&self) -> bool {
        self.status & 0x02 != 0
    }

    /// Anonymous login (null user, null password) is enabled.
    pub fn anonymous_login_enabled(&self) -> bool {
        self.status & 0x01 != 0
    }
}

impl WireResponse for AuthCapabilitiesResponse {
    const ID: CommandId = CommandId::GET_AUTH_CAPABILITIES;
    const LEN: usize = 8;

    fn completion_code(&self) -> CompletionCode {
        self.completion_code
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(self.completion_code.code());
        out.push(self.channel_number);
        out.push(self.auth_type_support);
        out.push(self.status);
        out.push(self.reserved);
        out.extend_from_slice(&self.oem_id.to_le_bytes());
        out.push(self.oem_aux);
    }

    fn decode_fixed(bytes: &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            completion_code: CompletionCode::new(bytes[0]),
            channel_number: bytes[1],
            auth_type_support: bytes[2],
            status: bytes[3],
            reserved: bytes[4],
            oem_id: u16_le(bytes, 5),
            oem_aux: bytes[7],
        })
    }
}

/// `Get Session Challenge` request (section 22.16).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionChallengeRequest {
    /// Authentication type the session will use.
    pub auth_type: AuthType,
    /// User name, zero padded to 16 bytes.
    pub username: [u8; 16],
}

impl SessionChallengeRequest {
    /// Build a request; `username` is truncated or zero-padded to 16 bytes.
    pub fn new(auth_type: AuthType, username: &[u8]) -> Self {
        Self {
            auth_type,
            username: pad16(username),
        }
    }
}

impl WireRequest for SessionChallengeRequest {
    const ID: CommandId = CommandId::GET_SESSION_CHALLENGE;
    const LEN: usize = 17;

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(self.auth_type.as_u8());
        out.extend_from_slice(&self.username);
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        require_len(bytes, Self::LEN)?;
        Ok(Self {
            auth_type: AuthType::try_from(bytes[0])?,
            username: array16(bytes, 1),
        })
    }
}

/// `Get Session Challenge` response (section 22.16).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionChallengeResponse {
    /// Completion code.
    pub completion_code: CompletionCode,
    /// Temporary session ID used until activation.
    pub temporary_session_id: u32,
    /// Challenge string.
    pub challenge: [u8; 16],
}

impl WireResponse for SessionChallengeResponse {
    const ID: CommandId = CommandId::GET_SESSION_CHALLENGE;
    const LEN: usize = 21;

    fn completion_code(&self) -> CompletionCode {
        self.completion_code
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(self.completion_code.code());
        out.extend_from_slice(&self.temporary_session_id.to_le_bytes());
        out.extend_from_slice(&self.challenge);
    }

    fn decode_fixed(bytes: &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            completion_code: CompletionCode::new(bytes[0]),
            temporary_session_id: u32_le(bytes, 1),
            challenge: array16(bytes, 5),
        })
    }
}

/// `Activate Session` request (section 22.17).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivateSessionRequest {
    /// Authentication type for the session.
    pub auth_type: AuthType,
    /// Maximum privilege level requested for the session.
    pub privilege_level: PrivilegeLevel,
    /// Authentication code answering the challenge.
    pub auth_code: [u8; 16],
    /// Initial inbound sequence number chosen by the remote console.
    pub inbound_sequence: u32,
}

impl WireRequest for ActivateSessionRequest {
    const ID: CommandId = CommandId::ACTIVATE_SESSION;
    const LEN: usize = 22;

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(self.auth_type.as_u8());
        out.push(self.privilege_level.as_u8());
        out.extend_from_slice(&self.auth_code);
        out.extend_from_slice(&self.inbound_sequence.to_le_bytes());
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        require_len(bytes, Self::LEN)?;
        Ok(Self {
            auth_type: AuthType::try_from(bytes[0])?,
            privilege_level: PrivilegeLevel::try_from(bytes[1])?,
            auth_code: array16(bytes, 2),
            inbound_sequence: u32_le(bytes, 18),
        })
    }
}

/// `Activate Session` response (section 22.17).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivateSessionResponse {
    /// Completion code.
    pub completion_code: CompletionCode,
    /// Authentication type the BMC activated.
    pub auth_type: AuthType,
    /// Session ID for the rest of the session.
    pub session_id: u32,
    /// Initial inbound sequence number at the BMC.
    pub inbound_sequence: u32,
    /// Maximum privilege level the session may use.
    pub max_privilege: PrivilegeLevel,
}

impl WireResponse for ActivateSessionResponse {
    const ID: CommandId = CommandId::ACTIVATE_SESSION;
    const LEN: usize = 11;

    fn completion_code(&self) -> CompletionCode {
        self.completion_code
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(self.completion_code.code());
        out.push(self.auth_type.as_u8());
        out.extend_from_slice(&self.session_id.to_le_bytes());
        out.extend_from_slice(&self.inbound_sequence.to_le_bytes());
        out.push(self.max_privilege.as_u8());
    }

    fn decode_fixed(bytes: &[u8]) -> Result<Self, DecodeError> {
        let completion_code = CompletionCode::new(bytes[0]);
        Ok(Self {
            completion_code,
            auth_type: field_or(
                completion_code,
                AuthType::try_from(bytes[1] & 0x0F),
                AuthType::None,
            )?,
            session_id: u32_le(bytes, 2),
            inbound_sequence: u32_le(bytes, 6),
            max_privilege: field_or(
                completion_code,
                PrivilegeLevel::try_from(bytes[10]),
                PrivilegeLevel::None,
            )?,
        })
    }
}

/// `Set Session Privilege Level` request (section 22.18).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPrivilegeLevelRequest {
    /// Requested privilege level.
    pub privilege_level: PrivilegeLevel,
}

impl WireRequest for SessionPrivilegeLevelRequest {
    const ID: CommandId = CommandId::SET_SESSION_PRIVILEGE_LEVEL;
    const LEN: usize = 1;

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(self.privilege_level.as_u8());
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        require_len(bytes, Self::LEN)?;
        Ok(Self {
            privilege_level: PrivilegeLevel::try_from(bytes[0])?,
        })
    }
}

/// `Set Session Privilege Level` response (section 22.18).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPrivilegeLevelResponse {
    /// Completion code.
    pub completion_code: CompletionCode,
    /// Privilege level now active on the session.
    pub new_privilege_level: PrivilegeLevel,
}

impl WireResponse for SessionPrivilegeLevelResponse {
    const ID: CommandId = CommandId::SET_SESSION_PRIVILEGE_LEVEL;
    const LEN: usize = 2;

    fn completion_code(&self) -> CompletionCode {
        self.completion_code
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(self.completion_code.code());
        out.push(self.new_privilege_level.as_u8());
    }

    fn decode_fixed(bytes: &[u8]) -> Result<Self, DecodeError> {
        let completion_code = CompletionCode::new(bytes[0]);
        Ok(Self {
            completion_code,
            new_privilege_level: field_or(
                completion_code,
                PrivilegeLevel::try_from(bytes[1]),
                PrivilegeLevel::None,
            )?,
        })
    }
}

/// `Close Session` request (section 22.19).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseSessionRequest {
    /// Session to close.
    pub session_id: u32,
}

impl WireRequest for CloseSessionRequest {
    const ID: CommandId = CommandId::CLOSE_SESSION;
    const LEN: usize = 4;

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.session_id.to_le_bytes());
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        require_len(bytes, Self::LEN)?;
        Ok(Self {
            session_id: u32_le(bytes, 0),
        })
    }
}

/// `Close Session` response (section 22.19).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseSessionResponse {
    /// Completion code.
    pub completion_code: CompletionCode,
}

impl WireResponse for CloseSessionResponse {
    const ID: CommandId = CommandId::CLOSE_SESSION;
    const LEN: usize = 1;

    fn completion_code(&self) -> CompletionCode {
        self.completion_code
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(self.completion_code.code());
    }

    fn decode_fixed(bytes: &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            completion_code: CompletionCode::new(bytes[0]),
        })
    }
}

/// `Get Device ID` response (section 20.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdResponse {
    /// Completion code.
    pub completion_code: CompletionCode,
    /// Device ID.
    pub device_id: u8,
    /// Device revision (low nibble) and SDR support (bit 7).
    pub device_revision: u8,
    /// Major firmware revision (bits 6:0) and device availability (bit 7).
    pub firmware_revision_1: u8,
    /// Minor firmware revision, BCD.
    pub firmware_revision_2: u8,
    /// IPMI version, BCD with the minor digit in the high nibble (0x51 = 1.5).
    pub ipmi_version: u8,
    /// Additional device support bitmask.
    pub additional_device_support: u8,
    /// Manufacturer ID.
    pub manufacturer_id: u16,
    /// Product ID.
    pub product_id: u16,
}

impl WireResponse for DeviceIdResponse {
    const ID: CommandId = CommandId::GET_DEVICE_ID;
    const LEN: usize = 11;

    fn completion_code(&self) -> CompletionCode {
        self.completion_code
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(self.completion_code.code());
        out.push(self.device_id);
        out.push(self.device_revision);
        out.push(self.firmware_revision_1);
        out.push(self.firmware_revision_2);
        out.push(self.ipmi_version);
        out.push(self.additional_device_support);
        out.extend_from_slice(&self.manufacturer_id.to_le_bytes());
        out.extend_from_slice(&self.product_id.to_le_bytes());
    }

    fn decode_fixed(bytes: &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            completion_code: CompletionCode::new(bytes[0]),
            device_id: bytes[1],
            device_revision: bytes[2],
            firmware_revision_1: bytes[3],
            firmware_revision_2: bytes[4],
            ipmi_version: bytes[5],
            additional_device_support: bytes[6],
            manufacturer_id: u16_le(bytes, 7),
            product_id: u16_le(bytes, 9),
        })
    }
}

/// `Get System Boot Options` request (section 28.13).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetSystemBootOptionsRequest {
    /// Parameter selector.
    pub parameter: u8,
    /// Set selector.
    pub set_selector: u8,
    /// Block selector.
    pub block_selector: u8,
}

impl WireRequest for GetSystemBootOptionsRequest {
    const ID: CommandId = CommandId::GET_SYSTEM_BOOT_OPTIONS;
    const LEN: usize = 3;

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(self.parameter & 0x7F);
        out.push(self.set_selector);
        out.push(self.block_selector);
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        require_len(bytes, Self::LEN)?;
        Ok(Self {
            parameter: bytes[0] & 0x7F,
            set_selector: bytes[1],
            block_selector: bytes[2],
        })
    }
}

/// `Set System Boot Options` request (section 28.12).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetSystemBootOptionsRequest {
    /// Parameter selector (bit 7 marks the parameter invalid).
    pub parameter: u8,
    /// Parameter data.
    pub data: Vec<u8>,
}

impl WireRequest for SetSystemBootOptionsRequest {
    const ID: CommandId = CommandId::SET_SYSTEM_BOOT_OPTIONS;
    const LEN: usize = 1;

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(self.parameter);
        out.extend_from_slice(&self.data);
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        require_len(bytes, Self::LEN)?;
        Ok(Self {
            parameter: bytes[0],
            data: bytes[1..].to_vec(),
        })
    }
}

/// The closed set of requests this crate can encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `Get Device ID`.
    GetDeviceId,
    /// `Get Channel Authentication Capabilities`.
    GetAuthCapabilities(AuthCapabilitiesRequest),
    /// `Get Session Challenge`.
    GetSessionChallenge(SessionChallengeRequest),
    /// `Activate Session`.
    ActivateSession(ActivateSessionRequest),
    /// `Set Session Privilege Level`.
    SetSessionPrivilegeLevel(SessionPrivilegeLevelRequest),
    /// `Close Session`.
    CloseSession(CloseSessionRequest),
    /// `Get Chassis Status`.
    GetChassisStatus,
    /// `Chassis Control`.
    ChassisControl(ChassisControl),
    /// `Set System Boot Options`.
    SetSystemBootOptions(SetSystemBootOptionsRequest),
    /// `Get System Boot Options`.
    GetSystemBootOptions(GetSystemBootOptionsRequest),
}

impl Request {
    /// The (NetFn, Command) pair of this request.
    pub fn id(&self) -> CommandId {
        match self {
            Self::GetDeviceId => CommandId::GET_DEVICE_ID,
            Self::GetAuthCapabilities(_) => AuthCapabilitiesRequest::ID,
            Self::GetSessionChallenge(_) => SessionChallengeRequest::ID,
            Self::ActivateSession(_) => ActivateSessionRequest::ID,
            Self::SetSessionPrivilegeLevel(_) => SessionPrivilegeLevelRequest::ID,
            Self::CloseSession(_) => CloseSessionRequest::ID,
            Self::GetChassisStatus => CommandId::GET_CHASSIS_STATUS,
            Self::ChassisControl(_) => CommandId::CHASSIS_CONTROL,
            Self::SetSystemBootOptions(_) => SetSystemBootOptionsRequest::ID,
            Self::GetSystemBootOptions(_) => GetSystemBootOptionsRequest::ID,
        }
    }

    /// Encode the request data (everything after the command byte).
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            Self::GetDeviceId | Self::GetChassisStatus => {}
            Self::GetAuthCapabilities(r) => r.encode_into(&mut out),
            Self::GetSessionChallenge(r) => r.encode_into(&mut out),
            Self::ActivateSession(r) => r.encode_into(&mut out),
            Self::SetSessionPrivilegeLevel(r) => r.encode_into(&mut out),
            Self::CloseSession(r) => r.encode_into(&mut out),
            Self::ChassisControl(control) => out.push(control.as_u8()),
            Self::SetSystemBootOptions(r) => r.encode_into(&mut out),
            Self::GetSystemBootOptions(r) => r.encode_into(&mut out),
        }
        out
    }

    /// Decode request data received for `id`.
    pub fn decode(id: CommandId, bytes: &[u8]) -> Result<Self, DecodeError> {
        let request = match id {
            CommandId::GET_DEVICE_ID => Self::GetDeviceId,
            CommandId::GET_AUTH_CAPABILITIES => {
                Self::GetAuthCapabilities(AuthCapabilitiesRequest::decode(bytes)?)
            }
            CommandId::GET_SESSION_CHALLENGE => {
                Self::GetSessionChallenge(SessionChallengeRequest::decode(bytes)?)
            }
            CommandId::ACTIVATE_SESSION => {
                Self::ActivateSession(ActivateSessionRequest::decode(bytes)?)
            }
            CommandId::SET_SESSION_PRIVILEGE_LEVEL => {
                Self::SetSessionPrivilegeLevel(SessionPrivilegeLevelRequest::decode(bytes)?)
            }
            CommandId::CLOSE_SESSION => Self::CloseSession(CloseSessionRequest::decode(bytes)?),
            CommandId::GET_CHASSIS_STATUS => Self::GetChassisStatus,
            CommandId::CHASSIS_CONTROL => {
                require_len(bytes, 1)?;
                let control = ChassisControl::from_u8(bytes[0])
                    .ok_or(DecodeError::Malformed("unknown chassis control"))?;
                Self::ChassisControl(control)
            }
            CommandId::SET_SYSTEM_BOOT_OPTIONS => {
                Self::SetSystemBootOptions(SetSystemBootOptionsRequest::decode(bytes)?)
            }
            CommandId::GET_SYSTEM_BOOT_OPTIONS => {
                Self::GetSystemBootOptions(GetSystemBootOptionsRequest::decode(bytes)?)
            }
            other => {
                return Err(DecodeError::UnknownCommand {
                    netfn: other.netfn.as_u8(),
                    cmd: other.cmd,
                });
            }
        };
        Ok(request)
    }
}

/// The closed set of decoded responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `Get Device ID`.
    DeviceId(DeviceIdResponse),
    /// `Get Channel Authentication Capabilities`.
    AuthCapabilities(AuthCapabilitiesResponse),
    /// `Get Session Challenge`.
    SessionChallenge(SessionChallengeResponse),
    /// `Activate Session`.
    ActivateSession(ActivateSessionResponse),
    /// `Set Session Privilege Level`.
    SessionPrivilegeLevel(SessionPrivilegeLevelResponse),
    /// `Close Session`.
    CloseSession(CloseSessionResponse),
    /// Chassis and boot option commands; the payload is interpreted by
    /// [`crate::commands`].
    Chassis(CommandId, RawResponse),
}

impl Response {
    /// Completion code of the response.
    pub fn completion_code(&self) -> CompletionCode {
        match self {
            Self::DeviceId(r) => r.completion_code,
            Self::AuthCapabilities(r) => r.completion_code,
            Self::SessionChallenge(r) => r.completion_code,
            Self::ActivateSession(r) => r.completion_code,
            Self::SessionPrivilegeLevel(r) => r.completion_code,
            Self::CloseSession(r) => r.completion_code,
            Self::Chassis(_, raw) => raw.completion_code,
        }
    }

    /// Encode the response body, completion code first.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::DeviceId(r) => r.encode(),
            Self::AuthCapabilities(r) => r.encode(),
            Self::SessionChallenge(r) => r.encode(),
            Self::ActivateSession(r) => r.encode(),
            Self::SessionPrivilegeLevel(r) => r.encode(),
            Self::CloseSession(r) => r.encode(),
            Self::Chassis(_, raw) => raw.to_wire(),
        }
    }
}

/// Decode a response body received for `id`.
///
/// The first byte is always the completion code. Callers must check it
/// before trusting the other fields.
pub fn decode(id: CommandId, bytes: &[u8]) -> Result<Response, DecodeError> {
    let response = match id {
        CommandId::GET_DEVICE_ID => Response::DeviceId(DeviceIdResponse::decode(bytes)?),
        CommandId::GET_AUTH_CAPABILITIES => {
            Response::AuthCapabilities(AuthCapabilitiesResponse::decode(bytes)?)
        }
        CommandId::GET_SESSION_CHALLENGE => {
            Response::SessionChallenge(SessionChallengeResponse::decode(bytes)?)
        }
        CommandId::ACTIVATE_SESSION => {
            Response::ActivateSession(ActivateSessionResponse::decode(bytes)?)
        }
        CommandId::SET_SESSION_PRIVILEGE_LEVEL => {
            Response::SessionPrivilegeLevel(SessionPrivilegeLevelResponse::decode(bytes)?)
        }
        CommandId::CLOSE_SESSION => Response::CloseSession(CloseSessionResponse::decode(bytes)?),
        CommandId::GET_CHASSIS_STATUS
        | CommandId::CHASSIS_CONTROL
        | CommandId::SET_SYSTEM_BOOT_OPTIONS
        | CommandId::GET_SYSTEM_BOOT_OPTIONS => {
            let (&code, data) = bytes.split_first().ok_or(DecodeError::ShortPacket {
                expected: 1,
                actual: 0,
            })?;
            Response::Chassis(
                id,
                RawResponse {
                    completion_code: CompletionCode::new(code),
                    data: data.to_vec(),
                },
            )
        }
        other => {
            return Err(DecodeError::UnknownCommand {
                netfn: other.netfn.as_u8(),
                cmd: other.cmd,
            });
        }
    };
    Ok(response)
}
