use std::time::Duration;

use ipmi_lan::{Client, PrivilegeLevel};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Example:
    //   cargo run --example get_device_id -- 192.168.1.10:623 admin password
    let mut args = std::env::args().skip(1);
    let target = args.next().ok_or("missing <host:port>")?.parse()?;
    let username = args.next().ok_or("missing <username>")?;
    let password = args.next().ok_or("missing <password>")?;

    let client = Client::builder(target)
        .username(username)
        .password(password)
        .privilege_level(PrivilegeLevel::User)
        .timeout(Duration::from_secs(2))
        .retries(3)
        .build()?;

    let device = client.get_device_id()?;
    println!("Session: {:#010x}", client.session_id());
    println!(
        "Device ID {:#04x}, firmware {}.{:02x}, IPMI {}.{}",
        device.device_id,
        device.firmware_revision_1 & 0x7F,
        device.firmware_revision_2,
        device.ipmi_version & 0x0F,
        device.ipmi_version >> 4,
    );
    println!(
        "Manufacturer {:#06x}, product {:#06x}",
        device.manufacturer_id, device.product_id
    );

    let code = client.close_session()?;
    if !code.is_success() {
        eprintln!("Close Session returned {code}");
    }
    Ok(())
}
