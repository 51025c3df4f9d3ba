use std::time::Duration;

use ipmi_lan::{BootDevice, Client, PrivilegeLevel};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Example:
    //   cargo run --example set_boot_device -- 192.168.1.10:623 admin password pxe
    let mut args = std::env::args().skip(1);
    let target = args.next().ok_or("missing <host:port>")?.parse()?;
    let username = args.next().ok_or("missing <username>")?;
    let password = args.next().ok_or("missing <password>")?;
    let device = args.next().ok_or("missing <device>")?;

    let device = match device.to_ascii_lowercase().as_str() {
        "none" => BootDevice::NoOverride,
        "pxe" => BootDevice::Pxe,
        "disk" => BootDevice::Disk,
        "safe" => BootDevice::DiskSafeMode,
        "diag" => BootDevice::Diagnostic,
        "cdrom" => BootDevice::Cdrom,
        "bios" => BootDevice::BiosSetup,
        "floppy" => BootDevice::Floppy,
        _ => return Err("invalid device (none|pxe|disk|safe|diag|cdrom|bios|floppy)".into()),
    };

    let client = Client::builder(target)
        .username(username)
        .password(password)
        .privilege_level(PrivilegeLevel::Operator)
        .timeout(Duration::from_secs(2))
        .retries(3)
        .build()?;

    client.set_boot_device(device)?;
    println!("Boot flags now: {:?}", client.get_boot_flags()?);

    client.close_session()?;
    Ok(())
}
