use core::fmt;

use crate::completion::CompletionCode;
use crate::error::DecodeError;

/// Authentication type of an IPMI v1.5 session.
///
/// The wire numbering has a gap at 3, which IPMI reserves. It is never
/// constructed; [`AuthType::try_from`] rejects it with
/// [`DecodeError::ReservedAuthType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AuthType {
    /// No authentication.
    None = 0x00,
    /// MD2 digest.
    Md2 = 0x01,
    /// MD5 digest.
    Md5 = 0x02,
    /// Straight password / key.
    Password = 0x04,
    /// OEM proprietary.
    Oem = 0x05,
}

impl AuthType {
    /// Wire value of the reserved authentication type.
    pub const RESERVED: u8 = 0x03;

    /// Raw wire value.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Bit for this type in an AuthTypeSupport mask.
    pub fn support_bit(self) -> u8 {
        1 << self.as_u8()
    }
}

impl TryFrom<u8> for AuthType {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::None),
            0x01 => Ok(Self::Md2),
            0x02 => Ok(Self::Md5),
            Self::RESERVED => Err(DecodeError::ReservedAuthType),
            0x04 => Ok(Self::Password),
            0x05 => Ok(Self::Oem),
            other => Err(DecodeError::InvalidAuthType(other)),
        }
    }
}

/// The privilege level of an IPMI session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum PrivilegeLevel {
    /// No access / unspecified.
    None = 0x00,
    /// Callback privilege.
    Callback = 0x01,
    /// User privilege.
    User = 0x02,
    /// Operator privilege.
    Operator = 0x03,
    /// Administrator privilege.
    Administrator = 0x04,
    /// OEM-defined privilege.
    Oem = 0x05,
}

impl PrivilegeLevel {
    /// Raw wire value.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for PrivilegeLevel {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value & 0x0F {
            0x00 => Ok(Self::None),
            0x01 => Ok(Self::Callback),
            0x02 => Ok(Self::User),
            0x03 => Ok(Self::Operator),
            0x04 => Ok(Self::Administrator),
            0x05 => Ok(Self::Oem),
            _ => Err(DecodeError::InvalidPrivilegeLevel(value)),
        }
    }
}

/// Network function codes (request side, even values).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NetFn {
    /// Chassis device requests.
    Chassis = 0x00,
    /// Bridge requests.
    Bridge = 0x02,
    /// Sensor/event requests.
    SensorEvent = 0x04,
    /// Application requests (device and session management).
    App = 0x06,
    /// Firmware transfer requests.
    Firmware = 0x08,
    /// Non-volatile storage requests.
    Storage = 0x0A,
    /// Media-specific transport requests.
    Transport = 0x0C,
}

impl NetFn {
    /// Raw 6-bit request value.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Look up a request network function by its raw value.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Chassis),
            0x02 => Some(Self::Bridge),
            0x04 => Some(Self::SensorEvent),
            0x06 => Some(Self::App),
            0x08 => Some(Self::Firmware),
            0x0A => Some(Self::Storage),
            0x0C => Some(Self::Transport),
            _ => None,
        }
    }
}

/// A command identity: the (NetFn, Command) pair.
///
/// Command numbers are only unique within a network function (`0x01` is both
/// `Get Device ID` and `Get Chassis Status`), so dispatch always uses the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId {
    /// Network function.
    pub netfn: NetFn,
    /// Command number within the network function.
    pub cmd: u8,
}

impl CommandId {
    /// `Get Device ID` (App, 0x01).
    pub const GET_DEVICE_ID: Self = Self::new(NetFn::App, 0x01);
    /// `Get Channel Authentication Capabilities` (App, 0x38).
    pub const GET_AUTH_CAPABILITIES: Self = Self::new(NetFn::App, 0x38);
    /// `Get Session Challenge` (App, 0x39).
    pub const GET_SESSION_CHALLENGE: Self = Self::new(NetFn::App, 0x39);
    /// `Activate Session` (App, 0x3A).
    pub const ACTIVATE_SESSION: Self = Self::new(NetFn::App, 0x3A);
    /// `Set Session Privilege Level` (App, 0x3B).
    pub const SET_SESSION_PRIVILEGE_LEVEL: Self = Self::new(NetFn::App, 0x3B);
    /// `Close Session` (App, 0x3C).
    pub const CLOSE_SESSION: Self = Self::new(NetFn::App, 0x3C);
    /// `Get Chassis Status` (Chassis, 0x01).
    pub const GET_CHASSIS_STATUS: Self = Self::new(NetFn::Chassis, 0x01);
    /// `Chassis Control` (Chassis, 0x02).
    pub const CHASSIS_CONTROL: Self = Self::new(NetFn::Chassis, 0x02);
    /// `Set System Boot Options` (Chassis, 0x08).
    pub const SET_SYSTEM_BOOT_OPTIONS: Self = Self::new(NetFn::Chassis, 0x08);
    /// `Get System Boot Options` (Chassis, 0x09).
    pub const GET_SYSTEM_BOOT_OPTIONS: Self = Self::new(NetFn::Chassis, 0x09);

    /// Build a command identity.
    pub const fn new(netfn: NetFn, cmd: u8) -> Self {
        Self { netfn, cmd }
    }

    /// Name of the command, if it is one this crate knows.
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::GET_DEVICE_ID => "Get Device ID",
            Self::GET_AUTH_CAPABILITIES => "Get Channel Authentication Capabilities",
            Self::GET_SESSION_CHALLENGE => "Get Session Challenge",
            Self::ACTIVATE_SESSION => "Activate Session",
            Self::SET_SESSION_PRIVILEGE_LEVEL => "Set Session Privilege Level",
            Self::CLOSE_SESSION => "Close Session",
            Self::GET_CHASSIS_STATUS => "Get Chassis Status",
            Self::CHASSIS_CONTROL => "Chassis Control",
            Self::SET_SYSTEM_BOOT_OPTIONS => "Set System Boot Options",
            Self::GET_SYSTEM_BOOT_OPTIONS => "Get System Boot Options",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "netfn {:#04x} cmd {:#04x}", self.netfn.as_u8(), self.cmd),
        }
    }
}

/// A raw IPMI response.
#[derive(Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// IPMI completion code.
    pub completion_code: CompletionCode,
    /// Payload bytes after the completion code.
    pub data: Vec<u8>,
}

impl RawResponse {
    /// The response as it appears in the LAN message: completion code followed by data.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.data.len());
        out.push(self.completion_code.code());
        out.extend_from_slice(&self.data);
        out
    }
}

impl fmt::Debug for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawResponse")
            .field("completion_code", &self.completion_code)
            .field("data_len", &self.data.len())
            .finish()
    }
}

/// Power restore policy reported by `Get Chassis Status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerRestorePolicy {
    /// Always remain off after AC loss.
    AlwaysOff,
    /// Restore previous power state after AC loss.
    Previous,
    /// Always power on after AC loss.
    AlwaysOn,
    /// Reserved or unknown value.
    Unknown(u8),
}

/// Last power event flags reported by `Get Chassis Status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastPowerEvent {
    /// AC failed.
    pub ac_failed: bool,
    /// Power overload.
    pub power_overload: bool,
    /// Power interlock activated.
    pub power_interlock: bool,
    /// Power fault.
    pub power_fault: bool,
    /// Power on command issued.
    pub power_on_command: bool,
}

/// Optional front panel controls (byte 4) from `Get Chassis Status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontPanelControls {
    /// Sleep button disable is allowed.
    pub sleep_button_disable_allowed: bool,
    /// Diagnostic button disable is allowed.
    pub diag_button_disable_allowed: bool,
    /// Reset button disable is allowed.
    pub reset_button_disable_allowed: bool,
    /// Power button disable is allowed.
    pub power_button_disable_allowed: bool,
    /// Sleep button is currently disabled.
    pub sleep_button_disabled: bool,
    /// Diagnostic button is currently disabled.
    pub diag_button_disabled: bool,
    /// Reset button is currently disabled.
    pub reset_button_disabled: bool,
    /// Power button is currently disabled.
    pub power_button_disabled: bool,
}

/// Parsed response for the `Get Chassis Status` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChassisStatus {
    /// System power state.
    pub system_power_on: bool,
    /// Power overload state.
    pub power_overload: bool,
    /// Power interlock state.
    pub power_interlock: bool,
    /// Main power fault state.
    pub main_power_fault: bool,
    /// Power control fault state.
    pub power_control_fault: bool,
    /// Power restore policy.
    pub power_restore_policy: PowerRestorePolicy,
    /// Last power event flags.
    pub last_power_event: LastPowerEvent,
    /// Chassis intrusion state.
    pub chassis_intrusion: bool,
    /// Front panel lockout state.
    pub front_panel_lockout: bool,
    /// Drive fault state.
    pub drive_fault: bool,
    /// Cooling/fan fault state.
    pub cooling_fan_fault: bool,
    /// Optional front panel control flags.
    pub front_panel_controls: Option<FrontPanelControls>,
}

/// Chassis control operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChassisControl {
    /// Power down the system.
    PowerDown,
    /// Power up the system.
    PowerUp,
    /// Power cycle the system.
    PowerCycle,
    /// Hard reset the system.
    HardReset,
    /// Pulse diagnostic interrupt.
    PulseDiagnostic,
    /// ACPI soft shutdown.
    AcpiSoft,
}

impl ChassisControl {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            Self::PowerDown => 0x00,
            Self::PowerUp => 0x01,
            Self::PowerCycle => 0x02,
            Self::HardReset => 0x03,
            Self::PulseDiagnostic => 0x04,
            Self::AcpiSoft => 0x05,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Option<Self> {
        match value & 0x0F {
            0x00 => Some(Self::PowerDown),
            0x01 => Some(Self::PowerUp),
            0x02 => Some(Self::PowerCycle),
            0x03 => Some(Self::HardReset),
            0x04 => Some(Self::PulseDiagnostic),
            0x05 => Some(Self::AcpiSoft),
            _ => None,
        }
    }
}

/// Boot device selector of the boot flags parameter.
///
/// Devices compare by the 4-bit selector they encode to, so `Other(0x2)`
/// equals `Disk`.
#[derive(Debug, Clone, Copy)]
pub enum BootDevice {
    /// No override.
    NoOverride,
    /// Force PXE boot.
    Pxe,
    /// Force boot from default hard drive.
    Disk,
    /// Force boot from default hard drive, safe mode.
    DiskSafeMode,
    /// Force boot from diagnostic partition.
    Diagnostic,
    /// Force boot from CD/DVD.
    Cdrom,
    /// Force boot into BIOS setup.
    BiosSetup,
    /// Force boot from remotely connected floppy/primary removable media.
    Floppy,
    /// Any other selector value (low nibble only).
    Other(u8),
}

impl PartialEq for BootDevice {
    fn eq(&self, other: &Self) -> bool {
        self.selector() == other.selector()
    }
}

impl Eq for BootDevice {}

impl BootDevice {
    pub(crate) fn selector(self) -> u8 {
        match self {
            Self::NoOverride => 0x0,
            Self::Pxe => 0x1,
            Self::Disk => 0x2,
            Self::DiskSafeMode => 0x3,
            Self::Diagnostic => 0x4,
            Self::Cdrom => 0x5,
            Self::BiosSetup => 0x6,
            Self::Floppy => 0xF,
            Self::Other(v) => v & 0x0F,
        }
    }

    /// Device for a raw selector; named selectors never come back as `Other`.
    pub fn from_selector(value: u8) -> Self {
        match value & 0x0F {
            0x0 => Self::NoOverride,
            0x1 => Self::Pxe,
            0x2 => Self::Disk,
            0x3 => Self::DiskSafeMode,
            0x4 => Self::Diagnostic,
            0x5 => Self::Cdrom,
            0x6 => Self::BiosSetup,
            0xF => Self::Floppy,
            other => Self::Other(other),
        }
    }
}

/// Boot flags (system boot options parameter 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootFlags {
    /// Flags are valid (applied on next boot).
    pub valid: bool,
    /// Apply to all future boots instead of the next one only.
    pub persistent: bool,
    /// Request an EFI boot instead of legacy BIOS.
    pub efi: bool,
    /// Boot device override.
    pub device: BootDevice,
}

impl BootFlags {
    /// Boot once from `device`.
    pub fn next_boot(device: BootDevice) -> Self {
        Self {
            valid: true,
            persistent: false,
            efi: false,
            device: BootDevice::from_selector(device.selector()),
        }
    }

    pub(crate) fn to_bytes(self) -> [u8; 5] {
        let mut b1 = 0u8;
        if self.valid {
            b1 |= 0x80;
        }
        if self.persistent {
            b1 |= 0x40;
        }
        if self.efi {
            b1 |= 0x20;
        }
        [b1, self.device.selector() << 2, 0x00, 0x00, 0x00]
    }

    pub(crate) fn from_bytes(data: &[u8]) -> Option<Self> {
        let &[b1, b2, ..] = data else {
            return None;
        };
        Some(Self {
            valid: b1 & 0x80 != 0,
            persistent: b1 & 0x40 != 0,
            efi: b1 & 0x20 != 0,
            device: BootDevice::from_selector(b2 >> 2),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_type_rejects_reserved_gap() {
        assert_eq!(AuthType::try_from(0x02), Ok(AuthType::Md5));
        assert_eq!(AuthType::try_from(0x04), Ok(AuthType::Password));
        assert_eq!(AuthType::try_from(0x03), Err(DecodeError::ReservedAuthType));
        assert_eq!(
            AuthType::try_from(0x06),
            Err(DecodeError::InvalidAuthType(0x06))
        );
        assert_eq!(AuthType::Password.support_bit(), 0x10);
    }

    #[test]
    fn command_ids_collide_only_within_pair() {
        assert_eq!(CommandId::GET_DEVICE_ID.cmd, CommandId::GET_CHASSIS_STATUS.cmd);
        assert_ne!(CommandId::GET_DEVICE_ID, CommandId::GET_CHASSIS_STATUS);
        assert_eq!(CommandId::GET_DEVICE_ID.to_string(), "Get Device ID");
        assert_eq!(
            CommandId::new(NetFn::Storage, 0x40).to_string(),
            "netfn 0x0a cmd 0x40"
        );
    }

    #[test]
    fn boot_flags_encode_device_selector() {
        let flags = BootFlags {
            valid: true,
            persistent: true,
            efi: false,
            device: BootDevice::Pxe,
        };
        assert_eq!(flags.to_bytes(), [0xC0, 0x04, 0x00, 0x00, 0x00]);
        assert_eq!(BootFlags::from_bytes(&flags.to_bytes()), Some(flags));
        assert_eq!(BootFlags::from_bytes(&[0x80]), None);
    }

    #[test]
    fn other_boot_device_matches_the_named_selector() {
        for selector in 0..=0x0F {
            let raw = BootDevice::Other(selector);
            let named = BootDevice::from_selector(selector);
            assert_eq!(raw, named);

            let flags = BootFlags::next_boot(raw);
            let decoded = BootFlags::from_bytes(&flags.to_bytes()).expect("decode");
            assert_eq!(decoded, flags);
            assert_eq!(decoded.device.selector(), selector);
        }

        assert!(matches!(BootDevice::from_selector(0x02), BootDevice::Disk));
        assert!(matches!(BootDevice::from_selector(0x0A), BootDevice::Other(0x0A)));
        assert_ne!(BootDevice::Other(0x0A), BootDevice::Other(0x0B));
        assert_ne!(BootDevice::Pxe, BootDevice::Disk);
    }
}
