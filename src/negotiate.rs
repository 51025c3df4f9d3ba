//! Authentication type selection.
//!
//! Policy: the strongest offered type wins, in the fixed order
//! MD5, straight password, MD2, none. The reserved type and OEM types are
//! never selected, whatever the BMC advertises.

use crate::codec::AuthCapabilitiesResponse;
use crate::error::{Error, Result};
use crate::types::{AuthType, PrivilegeLevel};

/// Preference order, strongest first.
pub const AUTH_PREFERENCE: [AuthType; 4] = [
    AuthType::Md5,
    AuthType::Password,
    AuthType::Md2,
    AuthType::None,
];

/// Picks an [`AuthType`] from a capabilities response.
///
/// By default every type in [`AUTH_PREFERENCE`] is acceptable. Callers that
/// refuse weak authentication narrow the set:
///
/// ```
/// use ipmi_lan::{AuthType, Negotiator};
///
/// let strict = Negotiator::accepting([AuthType::Md5]);
/// assert!(!strict.accepts(AuthType::None));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Negotiator {
    accepted: u8,
}

impl Default for Negotiator {
    fn default() -> Self {
        Self::accepting(AUTH_PREFERENCE)
    }
}

impl Negotiator {
    /// Accept exactly the given types. OEM is ignored.
    pub fn accepting(types: impl IntoIterator<Item = AuthType>) -> Self {
        let accepted = types
            .into_iter()
            .filter(|t| *t != AuthType::Oem)
            .fold(0u8, |mask, t| mask | t.support_bit());
        Self { accepted }
    }

    /// Remove one type from the accepted set.
    pub fn without(self, auth_type: AuthType) -> Self {
        Self {
            accepted: self.accepted & !auth_type.support_bit(),
        }
    }

    /// Whether `auth_type` may be selected.
    pub fn accepts(&self, auth_type: AuthType) -> bool {
        self.accepted & auth_type.support_bit() != 0
    }

    /// Select the authentication type for a session at `desired` privilege.
    ///
    /// The completion code of `caps` is checked first.
    pub fn select(&self, caps: &AuthCapabilitiesResponse, desired: PrivilegeLevel) -> Result<AuthType> {
        if desired == PrivilegeLevel::None {
            return Err(Error::InvalidArgument("requested privilege level must not be None"));
        }
        caps.completion_code.check()?;

        let chosen = AUTH_PREFERENCE
            .into_iter()
            .find(|t| self.accepts(*t) && caps.supports(*t));

        match chosen {
            Some(auth_type) => {
                crate::observe::negotiated(auth_type, caps.auth_type_support);
                Ok(auth_type)
            }
            None => Err(Error::NoCompatibleAuth {
                offered: caps.auth_type_support,
            }),
        }
    }
}

/// Select an authentication type with the default policy.
pub fn select_auth(caps: &AuthCapabilitiesResponse, desired: PrivilegeLevel) -> Result<AuthType> {
    Negotiator::default().select(caps, desired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionCode;

    fn caps(mask: u8) -> AuthCapabilitiesResponse {
        AuthCapabilitiesResponse {
            completion_code: CompletionCode::COMPLETED,
            channel_number: 1,
            auth_type_support: mask,
            status: 0,
            reserved: 0,
            oem_id: 0,
            oem_aux: 0,
        }
    }

    #[test]
    fn every_bitmask_follows_preference() {
        for mask in 0..=u8::MAX {
            let expected = if mask & 0x04 != 0 {
                Some(AuthType::Md5)
            } else if mask & 0x10 != 0 {
                Some(AuthType::Password)
            } else if mask & 0x02 != 0 {
                Some(AuthType::Md2)
            } else if mask & 0x01 != 0 {
                Some(AuthType::None)
            } else {
                None
            };

            match (select_auth(&caps(mask), PrivilegeLevel::Administrator), expected) {
                (Ok(got), Some(want)) => assert_eq!(got, want, "mask {mask:#04x}"),
                (Err(Error::NoCompatibleAuth { offered }), None) => assert_eq!(offered, mask),
                (got, want) => panic!("mask {mask:#04x}: got {got:?}, want {want:?}"),
            }
        }
    }

    #[test]
    fn reserved_and_oem_bits_are_never_chosen() {
        let err = select_auth(&caps(0x08 | 0x20), PrivilegeLevel::User).unwrap_err();
        assert!(matches!(err, Error::NoCompatibleAuth { offered: 0x28 }));
    }

    #[test]
    fn restricted_negotiator_skips_unaccepted_types() {
        let negotiator = Negotiator::default().without(AuthType::Md5);
        assert_eq!(
            negotiator.select(&caps(0x04 | 0x02), PrivilegeLevel::Operator).expect("md2"),
            AuthType::Md2
        );

        let strict = Negotiator::accepting([AuthType::Md5, AuthType::Oem]);
        assert!(!strict.accepts(AuthType::Oem));
        let err = strict.select(&caps(0x01 | 0x10), PrivilegeLevel::Operator).unwrap_err();
        assert!(matches!(err, Error::NoCompatibleAuth { offered: 0x11 }));
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let err = select_auth(&caps(0x04), PrivilegeLevel::None).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let mut failed = caps(0x04);
        failed.completion_code = CompletionCode::new(0xCC);
        let err = select_auth(&failed, PrivilegeLevel::User).unwrap_err();
        assert!(matches!(
            err,
            Error::CompletionCode {
                code: CompletionCode::INVALID_PACKET
            }
        ));
    }
}
