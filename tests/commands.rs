use ipmi_lan::codec::Request;
use ipmi_lan::commands::{
    BOOT_FLAGS_PARAMETER, ChassisControlCommand, Command, GetBootFlags, GetChassisStatus,
    GetDeviceId, SetBootFlags, SetSessionPrivilege,
};
use ipmi_lan::{
    BootDevice, ChassisControl, CommandId, CompletionCode, Error, PowerRestorePolicy,
    PrivilegeLevel, RawResponse,
};

fn ok(data: &[u8]) -> RawResponse {
    RawResponse {
        completion_code: CompletionCode::COMPLETED,
        data: data.to_vec(),
    }
}

#[test]
fn get_device_id_parses_response() {
    let response = ok(&[0x20, 0x01, 0x02, 0x43, 0x51, 0x8F, 0xA2, 0x02, 0x00, 0x01]);

    let parsed = GetDeviceId.parse_response(response).expect("parse");
    assert_eq!(parsed.device_id, 0x20);
    assert_eq!(parsed.device_revision, 0x01);
    assert_eq!(parsed.firmware_revision_1, 0x02);
    assert_eq!(parsed.firmware_revision_2, 0x43);
    assert_eq!(parsed.ipmi_version, 0x51);
    assert_eq!(parsed.additional_device_support, 0x8F);
    assert_eq!(parsed.manufacturer_id, 0x02A2);
    assert_eq!(parsed.product_id, 0x0100);
}

#[test]
fn completion_code_is_reported() {
    let response = RawResponse {
        completion_code: CompletionCode::new(0xC1),
        data: vec![0xAA, 0xBB],
    };

    let err = GetChassisStatus
        .parse_response(response)
        .expect_err("expected error");
    assert!(matches!(
        err,
        Error::CompletionCode {
            code: CompletionCode::INVALID_COMMAND
        }
    ));
}

#[test]
fn get_chassis_status_parses_response() {
    let status = GetChassisStatus
        .parse_response(ok(&[0x5F, 0x19, 0x0F, 0xFF]))
        .expect("parse");
    assert!(status.system_power_on);
    assert!(status.power_overload);
    assert_eq!(status.power_restore_policy, PowerRestorePolicy::AlwaysOn);
    assert!(status.last_power_event.ac_failed);
    assert!(status.front_panel_controls.is_some());
}

#[test]
fn chassis_control_encodes_request_data() {
    let request = ChassisControlCommand {
        control: ChassisControl::PowerUp,
    }
    .request();
    assert_eq!(request.id(), CommandId::CHASSIS_CONTROL);
    assert_eq!(request.encode(), vec![0x01]);

    let request = ChassisControlCommand {
        control: ChassisControl::AcpiSoft,
    }
    .request();
    assert_eq!(request.encode(), vec![0x05]);
}

#[test]
fn boot_flags_requests() {
    let request = GetBootFlags.request();
    assert_eq!(request.id(), CommandId::GET_SYSTEM_BOOT_OPTIONS);
    assert_eq!(request.encode(), vec![BOOT_FLAGS_PARAMETER, 0x00, 0x00]);

    let request = SetBootFlags {
        flags: ipmi_lan::BootFlags::next_boot(BootDevice::Disk),
    }
    .request();
    assert_eq!(request.id(), CommandId::SET_SYSTEM_BOOT_OPTIONS);
    assert_eq!(
        request.encode(),
        vec![BOOT_FLAGS_PARAMETER, 0x80, 0x08, 0x00, 0x00, 0x00]
    );
    assert!(matches!(request, Request::SetSystemBootOptions(_)));
}

#[test]
fn set_session_privilege_reports_granted_level() {
    let command = SetSessionPrivilege {
        level: PrivilegeLevel::Administrator,
    };
    assert_eq!(command.request().id(), CommandId::SET_SESSION_PRIVILEGE_LEVEL);
    assert_eq!(command.request().encode(), vec![0x04]);

    let granted = command.parse_response(ok(&[0x04])).expect("parse");
    assert_eq!(granted, PrivilegeLevel::Administrator);

    let denied = RawResponse {
        completion_code: CompletionCode::new(0xD4),
        data: Vec::new(),
    };
    let err = command.parse_response(denied).unwrap_err();
    assert!(matches!(err, Error::CompletionCode { code } if code.code() == 0xD4));
}
