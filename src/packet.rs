//! RMCP / IPMI v1.5 session framing and LAN message encoding.

use crate::auth::AUTH_CODE_LEN;
use crate::completion::CompletionCode;
use crate::error::{DecodeError, Error, Result};
use crate::types::{AuthType, RawResponse};

/// RMCP header values.
const RMCP_VERSION: u8 = 0x06;
const RMCP_RESERVED: u8 = 0x00;
const RMCP_SEQ_NO_ACK: u8 = 0xFF;
const RMCP_CLASS_IPMI: u8 = 0x07;

/// Session header AuthType value used by RMCP+ (IPMI v2.0) packets.
const RMCPPLUS_AUTH_TYPE: u8 = 0x06;

const RMCP_HEADER_LEN: usize = 4;

/// Responder address of the BMC.
pub(crate) const BMC_SLAVE_ADDR: u8 = 0x20;
/// Software ID of the remote console.
pub(crate) const REMOTE_SWID: u8 = 0x81;

/// Mismatch errors of a well-formed response that answers another request.
const UNEXPECTED_NETFN: &str = "unexpected requester or netfn";
const UNEXPECTED_RQ_SEQ: &str = "unexpected request sequence";
const UNEXPECTED_CMD: &str = "unexpected command";

/// Whether `err` came from a LAN response that belongs to a different request.
#[cfg(any(feature = "blocking", feature = "async", test))]
pub(crate) fn answers_other_request(err: &Error) -> bool {
    matches!(
        err,
        Error::Protocol(UNEXPECTED_NETFN | UNEXPECTED_RQ_SEQ | UNEXPECTED_CMD)
    )
}

/// IPMI v1.5 session header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SessionHeader {
    pub auth_type: AuthType,
    pub sequence: u32,
    pub session_id: u32,
    /// Present exactly when `auth_type` is not `None`.
    pub auth_code: Option<[u8; AUTH_CODE_LEN]>,
}

impl SessionHeader {
    /// Header for messages sent outside a session (sequence and ID zero).
    pub(crate) fn outside_session() -> Self {
        Self {
            auth_type: AuthType::None,
            sequence: 0,
            session_id: 0,
            auth_code: None,
        }
    }
}

/// A decoded RMCP/IPMI v1.5 datagram.
#[derive(Debug, Clone)]
pub(crate) struct SessionPacket {
    pub header: SessionHeader,
    pub message: Vec<u8>,
}

pub(crate) fn encode_session_packet(header: &SessionHeader, message: &[u8]) -> Result<Vec<u8>> {
    let message_len: u8 = message
        .len()
        .try_into()
        .map_err(|_| Error::Protocol("IPMI message too large"))?;

    if (header.auth_type == AuthType::None) != header.auth_code.is_none() {
        return Err(Error::Protocol(
            "auth code must be present exactly for authenticated sessions",
        ));
    }

    let mut packet = Vec::with_capacity(RMCP_HEADER_LEN + 10 + AUTH_CODE_LEN + message.len());

    // RMCP header.
    packet.push(RMCP_VERSION);
    packet.push(RMCP_RESERVED);
    packet.push(RMCP_SEQ_NO_ACK);
    packet.push(RMCP_CLASS_IPMI);

    // IPMI v1.5 session header.
    packet.push(header.auth_type.as_u8());
    packet.extend_from_slice(&header.sequence.to_le_bytes());
    packet.extend_from_slice(&header.session_id.to_le_bytes());
    if let Some(code) = &header.auth_code {
        packet.extend_from_slice(code);
    }
    packet.push(message_len);

    packet.extend_from_slice(message);
    Ok(packet)
}

pub(crate) fn decode_session_packet(bytes: &[u8]) -> Result<SessionPacket> {
    if bytes.len() < RMCP_HEADER_LEN + 10 {
        return Err(short(RMCP_HEADER_LEN + 10, bytes.len()));
    }

    if bytes[0] != RMCP_VERSION {
        return Err(Error::Protocol("unexpected RMCP version"));
    }
    if bytes[3] != RMCP_CLASS_IPMI {
        return Err(Error::Protocol("unexpected RMCP class"));
    }

    if bytes[4] == RMCPPLUS_AUTH_TYPE {
        return Err(Error::Unsupported("RMCP+ (IPMI v2.0) packets"));
    }
    let auth_type = AuthType::try_from(bytes[4])?;

    let sequence = u32::from_le_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]);
    let session_id = u32::from_le_bytes([bytes[9], bytes[10], bytes[11], bytes[12]]);

    let mut offset = 13;
    let auth_code = if auth_type == AuthType::None {
        None
    } else {
        let end = offset + AUTH_CODE_LEN;
        let code: [u8; AUTH_CODE_LEN] = bytes
            .get(offset..end)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| short(end + 1, bytes.len()))?;
        offset = end;
        Some(code)
    };

    let message_len = *bytes
        .get(offset)
        .ok_or_else(|| short(offset + 1, bytes.len()))? as usize;
    let start = offset + 1;
    let message = bytes
        .get(start..start + message_len)
        .ok_or_else(|| short(start + message_len, bytes.len()))?;

    Ok(SessionPacket {
        header: SessionHeader {
            auth_type,
            sequence,
            session_id,
            auth_code,
        },
        message: message.to_vec(),
    })
}

fn short(expected: usize, actual: usize) -> Error {
    Error::Decode(DecodeError::ShortPacket { expected, actual })
}

/// Compute the standard 2's complement checksum used by IPMI LAN messages.
pub(crate) fn ipmi_checksum(bytes: &[u8]) -> u8 {
    let sum = bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    (!sum).wrapping_add(1)
}

/// Encode an IPMI LAN request message.
pub(crate) fn encode_lan_request(netfn: u8, cmd: u8, rq_seq: u8, data: &[u8]) -> Result<Vec<u8>> {
    if rq_seq > 0x3F {
        return Err(Error::Protocol("rq_seq must be 6-bit"));
    }
    if netfn > 0x3F {
        return Err(Error::InvalidArgument("netfn must be 6-bit"));
    }

    let lun: u8 = 0;
    let netfn_lun = (netfn << 2) | (lun & 0x03);
    let rq_seq_lun = (rq_seq << 2) | (lun & 0x03);

    let mut msg = Vec::with_capacity(7 + data.len());
    msg.push(BMC_SLAVE_ADDR);
    msg.push(netfn_lun);
    msg.push(ipmi_checksum(&[BMC_SLAVE_ADDR, netfn_lun]));

    msg.push(REMOTE_SWID);
    msg.push(rq_seq_lun);
    msg.push(cmd);
    msg.extend_from_slice(data);

    let csum2 = ipmi_checksum(&msg[3..]);
    msg.push(csum2);

    Ok(msg)
}

/// Decode and validate an IPMI LAN response message.
pub(crate) fn decode_lan_response(
    expected_netfn: u8,
    expected_cmd: u8,
    expected_rq_seq: u8,
    msg: &[u8],
) -> Result<RawResponse> {
    if msg.len() < 8 {
        return Err(short(8, msg.len()));
    }

    let rq_addr = msg[0];
    let netfn_lun = msg[1];
    if ipmi_checksum(&msg[..2]) != msg[2] {
        return Err(Error::Protocol("invalid IPMI checksum1"));
    }

    let rs_addr = msg[3];
    let rq_seq_lun = msg[4];
    let cmd = msg[5];

    let (&csum2, body) = msg
        .split_last()
        .ok_or(Error::Protocol("missing checksum2"))?;
    if ipmi_checksum(&body[3..]) != csum2 {
        return Err(Error::Protocol("invalid IPMI checksum2"));
    }

    if rq_addr != REMOTE_SWID || netfn_lun >> 2 != expected_netfn + 1 {
        return Err(Error::Protocol(UNEXPECTED_NETFN));
    }
    if rs_addr != BMC_SLAVE_ADDR {
        return Err(Error::Protocol("unexpected responder address"));
    }
    if rq_seq_lun >> 2 != expected_rq_seq {
        return Err(Error::Protocol(UNEXPECTED_RQ_SEQ));
    }
    if cmd != expected_cmd {
        return Err(Error::Protocol(UNEXPECTED_CMD));
    }

    Ok(RawResponse {
        completion_code: CompletionCode::new(msg[6]),
        data: body[7..].to_vec(),
    })
}

/// Decoded LAN request, as seen by a responder.
#[cfg(test)]
#[derive(Debug, Clone)]
pub(crate) struct LanRequest {
    pub netfn: u8,
    pub cmd: u8,
    pub rq_seq: u8,
    pub data: Vec<u8>,
}

#[cfg(test)]
pub(crate) fn decode_lan_request(msg: &[u8]) -> Result<LanRequest> {
    if msg.len() < 7 {
        return Err(short(7, msg.len()));
    }
    if ipmi_checksum(&msg[..2]) != msg[2] {
        return Err(Error::Protocol("invalid IPMI checksum1"));
    }
    let (&csum2, body) = msg
        .split_last()
        .ok_or(Error::Protocol("missing checksum2"))?;
    if ipmi_checksum(&body[3..]) != csum2 {
        return Err(Error::Protocol("invalid IPMI checksum2"));
    }
    Ok(LanRequest {
        netfn: msg[1] >> 2,
        cmd: msg[5],
        rq_seq: msg[4] >> 2,
        data: body[6..].to_vec(),
    })
}

/// Encode a LAN response message answering `request`, as a BMC would.
#[cfg(test)]
pub(crate) fn encode_lan_response(request: &LanRequest, body: &[u8]) -> Vec<u8> {
    let netfn_lun = (request.netfn + 1) << 2;
    let mut msg = vec![REMOTE_SWID, netfn_lun, ipmi_checksum(&[REMOTE_SWID, netfn_lun])];
    msg.push(BMC_SLAVE_ADDR);
    msg.push(request.rq_seq << 2);
    msg.push(request.cmd);
    msg.extend_from_slice(body);
    let csum2 = ipmi_checksum(&msg[3..]);
    msg.push(csum2);
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lan_request_encoding_get_device_id_no_data() {
        let msg = encode_lan_request(0x06, 0x01, 0, &[]).expect("encode");
        assert_eq!(msg, vec![0x20, 0x18, 0xC8, 0x81, 0x00, 0x01, 0x7E]);
    }

    #[test]
    fn lan_response_decoding_basic() {
        let response = vec![
            0x81, 0x1C, 0x63, // rq_addr, netfn/lun, checksum1
            0x20, 0x00, 0x01, // rs_addr, rq_seq/lun, cmd
            0x00, // completion code
            0x20, 0x01, 0x02, // data (3 bytes)
            0xBC, // checksum2
        ];

        let decoded = decode_lan_response(0x06, 0x01, 0, &response).expect("decode");
        assert_eq!(decoded.completion_code, CompletionCode::COMPLETED);
        assert_eq!(decoded.data, vec![0x20, 0x01, 0x02]);
    }

    #[test]
    fn lan_response_decoding_detects_bad_checksum() {
        let mut response = vec![
            0x81, 0x1C, 0x63, 0x20, 0x00, 0x01, 0x00, 0x20, 0x01, 0x02, 0xBC,
        ];
        response[7] ^= 0xFF;

        let err = decode_lan_response(0x06, 0x01, 0, &response).unwrap_err();
        assert!(matches!(err, Error::Protocol("invalid IPMI checksum2")));
    }

    #[test]
    fn lan_response_rejects_other_request_sequence() {
        let request = LanRequest {
            netfn: 0x06,
            cmd: 0x3B,
            rq_seq: 5,
            data: vec![0x04],
        };
        let msg = encode_lan_response(&request, &[0x00, 0x04]);
        assert!(decode_lan_response(0x06, 0x3B, 5, &msg).is_ok());

        let err = decode_lan_response(0x06, 0x3B, 6, &msg).unwrap_err();
        assert!(matches!(err, Error::Protocol("unexpected request sequence")));
        assert!(answers_other_request(&err));

        let err = decode_lan_response(0x06, 0x01, 5, &msg).unwrap_err();
        assert!(answers_other_request(&err));
        let err = decode_lan_response(0x00, 0x3B, 5, &msg).unwrap_err();
        assert!(answers_other_request(&err));

        let mut corrupt = msg.clone();
        corrupt[2] ^= 0xFF;
        let err = decode_lan_response(0x06, 0x3B, 5, &corrupt).unwrap_err();
        assert!(!answers_other_request(&err));
    }

    #[test]
    fn session_packet_without_auth_code() {
        let msg = encode_lan_request(0x06, 0x38, 0, &[0x0E, 0x04]).expect("encode");
        let packet = encode_session_packet(&SessionHeader::outside_session(), &msg).expect("pkt");

        assert_eq!(&packet[..4], &[0x06, 0x00, 0xFF, 0x07]);
        assert_eq!(&packet[4..13], &[0x00; 9]);
        assert_eq!(packet[13] as usize, msg.len());
        assert_eq!(&packet[14..], &msg[..]);

        let decoded = decode_session_packet(&packet).expect("decode");
        assert_eq!(decoded.header, SessionHeader::outside_session());
        assert_eq!(decoded.message, msg);
    }

    #[test]
    fn session_packet_with_auth_code() {
        let header = SessionHeader {
            auth_type: AuthType::Md5,
            sequence: 0x0102_0304,
            session_id: 0x42,
            auth_code: Some([0x5A; 16]),
        };
        let packet = encode_session_packet(&header, &[0xAA, 0xBB]).expect("pkt");
        assert_eq!(packet.len(), 4 + 10 + 16 + 2);
        assert_eq!(&packet[5..9], &[0x04, 0x03, 0x02, 0x01]);

        let decoded = decode_session_packet(&packet).expect("decode");
        assert_eq!(decoded.header, header);
        assert_eq!(decoded.message, vec![0xAA, 0xBB]);

        let err = decode_session_packet(&packet[..packet.len() - 1]).unwrap_err();
        assert!(matches!(err, Error::Decode(DecodeError::ShortPacket { .. })));
    }

    #[test]
    fn session_packet_rejects_reserved_and_rmcpplus() {
        let mut packet =
            encode_session_packet(&SessionHeader::outside_session(), &[0x00]).expect("pkt");

        packet[4] = AuthType::RESERVED;
        let err = decode_session_packet(&packet).unwrap_err();
        assert!(matches!(err, Error::Decode(DecodeError::ReservedAuthType)));

        packet[4] = 0x06;
        let err = decode_session_packet(&packet).unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }

    #[test]
    fn mismatched_auth_code_presence_is_rejected() {
        let header = SessionHeader {
            auth_type: AuthType::Md5,
            sequence: 1,
            session_id: 1,
            auth_code: None,
        };
        assert!(encode_session_packet(&header, &[]).is_err());
    }
}
