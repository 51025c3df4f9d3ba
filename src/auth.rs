use core::fmt;

use md2::Md2;
use md5::{Digest, Md5};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::error::{Error, Result};
use crate::types::AuthType;

/// Length of an IPMI v1.5 authentication code.
pub const AUTH_CODE_LEN: usize = 16;

/// A minimal secret container that zeroizes its contents on drop.
///
/// Does not expose secrets via `Debug`.
#[derive(Clone)]
pub(crate) struct SecretBytes(Vec<u8>);

impl SecretBytes {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub(crate) fn expose(&self) -> &[u8] {
        &self.0
    }

    /// The password as the fixed 16-byte key IPMI v1.5 hashes over.
    pub(crate) fn to_key16(&self) -> [u8; AUTH_CODE_LEN] {
        pad16(self.expose())
    }
}

impl fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<secret>")
    }
}

impl Drop for SecretBytes {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Truncate or zero-pad to 16 bytes (user names and passwords).
pub(crate) fn pad16(bytes: &[u8]) -> [u8; AUTH_CODE_LEN] {
    let mut out = [0u8; AUTH_CODE_LEN];
    let n = bytes.len().min(out.len());
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

pub(crate) fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

fn digest<D: Digest>(parts: &[&[u8]]) -> [u8; AUTH_CODE_LEN] {
    let mut hasher = D::new();
    for part in parts {
        hasher.update(part);
    }
    let bytes = hasher.finalize();
    let mut out = [0u8; AUTH_CODE_LEN];
    out.copy_from_slice(&bytes[..AUTH_CODE_LEN]);
    out
}

fn hash_for(auth_type: AuthType, parts: &[&[u8]]) -> Result<[u8; AUTH_CODE_LEN]> {
    match auth_type {
        AuthType::Md5 => Ok(digest::<Md5>(parts)),
        AuthType::Md2 => Ok(digest::<Md2>(parts)),
        _ => Err(Error::InvalidArgument("auth type is not a digest type")),
    }
}

/// AuthCode carried in the body of `Activate Session`.
///
/// - `None`: all zeros.
/// - `Password`: the password, zero-padded.
/// - `Md2`/`Md5`: `H(password ‖ temporary session id ‖ challenge ‖ initial inbound seq)`,
///   integers little-endian.
pub(crate) fn activation_auth_code(
    auth_type: AuthType,
    password: &SecretBytes,
    temporary_session_id: u32,
    challenge: &[u8; 16],
    inbound_sequence: u32,
) -> Result<[u8; AUTH_CODE_LEN]> {
    match auth_type {
        AuthType::None => Ok([0u8; AUTH_CODE_LEN]),
        AuthType::Password => Ok(password.to_key16()),
        AuthType::Md2 | AuthType::Md5 => {
            let key = zeroize::Zeroizing::new(password.to_key16());
            hash_for(
                auth_type,
                &[
                    &key[..],
                    &temporary_session_id.to_le_bytes(),
                    challenge,
                    &inbound_sequence.to_le_bytes(),
                ],
            )
        }
        AuthType::Oem => Err(Error::Unsupported("OEM authentication")),
    }
}

/// Per-message AuthCode for the session header.
///
/// `Md2`/`Md5`: `H(password ‖ session id ‖ message ‖ session seq ‖ password)`.
/// `Password`: the password itself. `None` sessions carry no AuthCode.
pub(crate) fn message_auth_code(
    auth_type: AuthType,
    password: &SecretBytes,
    session_id: u32,
    message: &[u8],
    sequence: u32,
) -> Result<Option<[u8; AUTH_CODE_LEN]>> {
    match auth_type {
        AuthType::None => Ok(None),
        AuthType::Password => Ok(Some(password.to_key16())),
        AuthType::Md2 | AuthType::Md5 => {
            let key = zeroize::Zeroizing::new(password.to_key16());
            hash_for(
                auth_type,
                &[
                    &key[..],
                    &session_id.to_le_bytes(),
                    message,
                    &sequence.to_le_bytes(),
                    &key[..],
                ],
            )
            .map(Some)
        }
        AuthType::Oem => Err(Error::Unsupported("OEM authentication")),
    }
}
