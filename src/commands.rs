//! Typed application commands run through a session.

use crate::codec::{
    DeviceIdResponse, GetSystemBootOptionsRequest, Request, SessionPrivilegeLevelRequest,
    SessionPrivilegeLevelResponse, SetSystemBootOptionsRequest, WireResponse,
};
use crate::error::{Error, Result};
use crate::types::{
    BootFlags, ChassisControl, ChassisStatus, FrontPanelControls, LastPowerEvent,
    PowerRestorePolicy, PrivilegeLevel, RawResponse,
};

/// Boot options parameter selector of the boot flags.
pub const BOOT_FLAGS_PARAMETER: u8 = 0x05;

/// A typed IPMI command (single request/response).
pub trait Command {
    /// Parsed output type.
    type Output;

    /// The request to send.
    fn request(&self) -> Request;

    /// Parse a raw response into the typed output.
    fn parse_response(&self, response: RawResponse) -> Result<Self::Output>;
}

fn ok_data(response: &RawResponse) -> Result<&[u8]> {
    response.completion_code.check()?;
    Ok(&response.data)
}

/// `Get Device ID` (App NetFn, cmd 0x01).
#[derive(Debug, Clone, Copy)]
pub struct GetDeviceId;

impl Command for GetDeviceId {
    type Output = DeviceIdResponse;

    fn request(&self) -> Request {
        Request::GetDeviceId
    }

    fn parse_response(&self, response: RawResponse) -> Result<Self::Output> {
        response.completion_code.check()?;
        Ok(DeviceIdResponse::decode(&response.to_wire())?)
    }
}

/// `Get Chassis Status` (Chassis NetFn, cmd 0x01).
#[derive(Debug, Clone, Copy)]
pub struct GetChassisStatus;

impl Command for GetChassisStatus {
    type Output = ChassisStatus;

    fn request(&self) -> Request {
        Request::GetChassisStatus
    }

    fn parse_response(&self, response: RawResponse) -> Result<Self::Output> {
        parse_chassis_status(ok_data(&response)?)
    }
}

/// `Chassis Control` (Chassis NetFn, cmd 0x02).
#[derive(Debug, Clone, Copy)]
pub struct ChassisControlCommand {
    /// Control operation.
    pub control: ChassisControl,
}

impl Command for ChassisControlCommand {
    type Output = ();

    fn request(&self) -> Request {
        Request::ChassisControl(self.control)
    }

    fn parse_response(&self, response: RawResponse) -> Result<Self::Output> {
        let _ = ok_data(&response)?;
        Ok(())
    }
}

/// `Get System Boot Options`, boot flags parameter.
#[derive(Debug, Clone, Copy)]
pub struct GetBootFlags;

impl Command for GetBootFlags {
    type Output = BootFlags;

    fn request(&self) -> Request {
        Request::GetSystemBootOptions(GetSystemBootOptionsRequest {
            parameter: BOOT_FLAGS_PARAMETER,
            set_selector: 0,
            block_selector: 0,
        })
    }

    fn parse_response(&self, response: RawResponse) -> Result<Self::Output> {
        // Parameter version, parameter selector, then the parameter data.
        let data = ok_data(&response)?;
        let &[_version, selector, ref flags @ ..] = data else {
            return Err(Error::Protocol("Get System Boot Options response too short"));
        };
        if selector & 0x7F != BOOT_FLAGS_PARAMETER {
            return Err(Error::Protocol("unexpected boot options parameter"));
        }
        BootFlags::from_bytes(flags).ok_or(Error::Protocol("boot flags response too short"))
    }
}

/// `Set System Boot Options`, boot flags parameter.
#[derive(Debug, Clone, Copy)]
pub struct SetBootFlags {
    /// Flags to write.
    pub flags: BootFlags,
}

impl Command for SetBootFlags {
    type Output = ();

    fn request(&self) -> Request {
        Request::SetSystemBootOptions(SetSystemBootOptionsRequest {
            parameter: BOOT_FLAGS_PARAMETER,
            data: self.flags.to_bytes().to_vec(),
        })
    }

    fn parse_response(&self, response: RawResponse) -> Result<Self::Output> {
        let _ = ok_data(&response)?;
        Ok(())
    }
}

/// `Set Session Privilege Level` (App NetFn, cmd 0x3B).
#[derive(Debug, Clone, Copy)]
pub struct SetSessionPrivilege {
    /// Requested level.
    pub level: PrivilegeLevel,
}

impl Command for SetSessionPrivilege {
    type Output = PrivilegeLevel;

    fn request(&self) -> Request {
        Request::SetSessionPrivilegeLevel(SessionPrivilegeLevelRequest {
            privilege_level: self.level,
        })
    }

    fn parse_response(&self, response: RawResponse) -> Result<Self::Output> {
        response.completion_code.check()?;
        let parsed = SessionPrivilegeLevelResponse::decode(&response.to_wire())?;
        Ok(parsed.new_privilege_level)
    }
}

fn parse_chassis_status(data: &[u8]) -> Result<ChassisStatus> {
    let &[b1, b2, b3, ref rest @ ..] = data else {
        return Err(Error::Protocol("Get Chassis Status response too short"));
    };

    let power_restore_policy = match (b1 >> 5) & 0x03 {
        0x00 => PowerRestorePolicy::AlwaysOff,
        0x01 => PowerRestorePolicy::Previous,
        0x02 => PowerRestorePolicy::AlwaysOn,
        other => PowerRestorePolicy::Unknown(other),
    };

    let last_power_event = LastPowerEvent {
        ac_failed: b2 & 0x01 != 0,
        power_overload: b2 & 0x02 != 0,
        power_interlock: b2 & 0x04 != 0,
        power_fault: b2 & 0x08 != 0,
        power_on_command: b2 & 0x10 != 0,
    };

    let front_panel_controls = match rest.first() {
        Some(&b4) if b4 != 0 => Some(FrontPanelControls {
            sleep_button_disable_allowed: b4 & 0x80 != 0,
            diag_button_disable_allowed: b4 & 0x40 != 0,
            reset_button_disable_allowed: b4 & 0x20 != 0,
            power_button_disable_allowed: b4 & 0x10 != 0,
            sleep_button_disabled: b4 & 0x08 != 0,
            diag_button_disabled: b4 & 0x04 != 0,
            reset_button_disabled: b4 & 0x02 != 0,
            power_button_disabled: b4 & 0x01 != 0,
        }),
        _ => None,
    };

    Ok(ChassisStatus {
        system_power_on: b1 & 0x01 != 0,
        power_overload: b1 & 0x02 != 0,
        power_interlock: b1 & 0x04 != 0,
        main_power_fault: b1 & 0x08 != 0,
        power_control_fault: b1 & 0x10 != 0,
        power_restore_policy,
        last_power_event,
        chassis_intrusion: b3 & 0x01 != 0,
        front_panel_lockout: b3 & 0x02 != 0,
        drive_fault: b3 & 0x04 != 0,
        cooling_fan_fault: b3 & 0x08 != 0,
        front_panel_controls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionCode;
    use crate::types::BootDevice;

    fn ok(data: &[u8]) -> RawResponse {
        RawResponse {
            completion_code: CompletionCode::COMPLETED,
            data: data.to_vec(),
        }
    }

    #[test]
    fn parse_chassis_status_fields() {
        let data = [0x5F, 0x19, 0x0F, 0xFF];
        let status = parse_chassis_status(&data).expect("parse");

        assert!(status.system_power_on);
        assert!(status.power_overload);
        assert!(status.power_interlock);
        assert!(status.main_power_fault);
        assert!(status.power_control_fault);
        assert!(matches!(
            status.power_restore_policy,
            PowerRestorePolicy::AlwaysOn
        ));

        assert!(status.last_power_event.ac_failed);
        assert!(!status.last_power_event.power_overload);
        assert!(status.last_power_event.power_fault);
        assert!(status.last_power_event.power_on_command);

        assert!(status.chassis_intrusion);
        assert!(status.cooling_fan_fault);

        let controls = status.front_panel_controls.expect("controls");
        assert!(controls.sleep_button_disable_allowed);
        assert!(controls.power_button_disabled);
    }

    #[test]
    fn parse_chassis_status_without_front_panel_byte() {
        let status = parse_chassis_status(&[0x20, 0x00, 0x00]).expect("parse");
        assert!(!status.system_power_on);
        assert_eq!(status.power_restore_policy, PowerRestorePolicy::Previous);
        assert_eq!(status.front_panel_controls, None);

        let err = parse_chassis_status(&[0x01, 0x00]).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn boot_flags_round_trip_through_commands() {
        let flags = BootFlags::next_boot(BootDevice::Cdrom);
        let Request::SetSystemBootOptions(request) = (SetBootFlags { flags }).request() else {
            panic!("expected set boot options request");
        };
        assert_eq!(request.parameter, BOOT_FLAGS_PARAMETER);
        assert_eq!(request.data, vec![0x80, 0x14, 0x00, 0x00, 0x00]);

        let mut response = vec![0x01, BOOT_FLAGS_PARAMETER];
        response.extend_from_slice(&request.data);
        let parsed = GetBootFlags.parse_response(ok(&response)).expect("parse");
        assert_eq!(parsed, flags);
    }

    #[test]
    fn boot_flags_reject_other_parameters() {
        let err = GetBootFlags
            .parse_response(ok(&[0x01, 0x04, 0x00, 0x00]))
            .unwrap_err();
        assert!(matches!(err, Error::Protocol("unexpected boot options parameter")));

        let err = GetBootFlags.parse_response(ok(&[0x01])).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn privilege_response_reports_new_level() {
        let command = SetSessionPrivilege {
            level: PrivilegeLevel::Operator,
        };
        assert_eq!(command.request().encode(), vec![0x03]);
        let level = command.parse_response(ok(&[0x03])).expect("parse");
        assert_eq!(level, PrivilegeLevel::Operator);
    }
}
