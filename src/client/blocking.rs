use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::client::ClientBuilder;
use crate::codec::DeviceIdResponse;
use crate::commands::{
    ChassisControlCommand, Command, GetBootFlags, GetChassisStatus, GetDeviceId, SetBootFlags,
    SetSessionPrivilege,
};
use crate::completion::CompletionCode;
use crate::error::{Error, Result};
use crate::handshake::establish_session;
use crate::session::{Session, close_session, exchange};
use crate::transport::Transport;
use crate::transport::blocking::UdpTransport;
use crate::types::{
    BootDevice, BootFlags, ChassisControl, ChassisStatus, CommandId, PrivilegeLevel, RawResponse,
};

/// A blocking IPMI v1.5 LAN client.
///
/// `Client` owns one authenticated session and issues IPMI commands over UDP
/// port 623. Clones share the session; requests are serialized.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Mutex<Inner>>,
    session_id: u32,
}

struct Inner {
    transport: Box<dyn Transport + Send>,
    /// `None` once the session has been closed.
    session: Option<Session>,
}

impl ClientBuilder {
    /// Connect over UDP, establish the session and build the [`Client`].
    pub fn build(self) -> Result<Client> {
        let transport = UdpTransport::connect(self.target, self.timeout, self.retries)?;
        self.build_with_transport(transport)
    }

    /// Establish the session over a caller-supplied transport.
    pub fn build_with_transport<T: Transport + Send + 'static>(self, transport: T) -> Result<Client> {
        let params = self.session_params()?;
        let session = establish_session(&transport, params)?;
        Ok(Client::from_parts(Box::new(transport), session))
    }
}

impl Client {
    /// Create a [`ClientBuilder`].
    pub fn builder(target: std::net::SocketAddr) -> ClientBuilder {
        ClientBuilder::new(target)
    }

    fn from_parts(transport: Box<dyn Transport + Send>, session: Session) -> Self {
        let session_id = session.session_id();
        Self {
            inner: Arc::new(Mutex::new(Inner {
                transport,
                session: Some(session),
            })),
            session_id,
        }
    }

    /// Execute a typed command (single request/response).
    pub fn execute<C: Command>(&self, command: C) -> Result<C::Output> {
        let request = command.request();
        let id = request.id();
        let response = self.send_raw(id.netfn.as_u8(), id.cmd, &request.encode())?;
        command.parse_response(response)
    }

    /// Send a raw IPMI request inside the session and return the raw response.
    ///
    /// This method uses LUN=0 and the usual LAN addresses
    /// (`rsAddr=0x20`, `rqAddr=0x81`). A failure completion code is
    /// returned as [`Error::CompletionCode`].
    pub fn send_raw(&self, netfn: u8, cmd: u8, data: &[u8]) -> Result<RawResponse> {
        let start = Instant::now();
        let result = {
            let mut inner = self.lock_inner()?;
            send_raw_locked(&mut inner, netfn, cmd, data)
        };
        let elapsed = start.elapsed();
        match &result {
            Ok(resp) => {
                crate::observe::record_ok("blocking", netfn, cmd, elapsed, resp.completion_code)
            }
            Err(err) => crate::observe::record_err("blocking", netfn, cmd, elapsed, err),
        }
        result
    }

    /// Convenience wrapper for `Get Device ID` (App NetFn, cmd 0x01).
    pub fn get_device_id(&self) -> Result<DeviceIdResponse> {
        self.execute(GetDeviceId)
    }

    /// Convenience wrapper for `Get Chassis Status` (Chassis NetFn, cmd 0x01).
    pub fn get_chassis_status(&self) -> Result<ChassisStatus> {
        self.execute(GetChassisStatus)
    }

    /// Run `Chassis Control` (Chassis NetFn, cmd 0x02).
    pub fn chassis_control(&self, control: ChassisControl) -> Result<()> {
        self.execute(ChassisControlCommand { control })
    }

    /// Read the boot flags (`Get System Boot Options`, parameter 5).
    pub fn get_boot_flags(&self) -> Result<BootFlags> {
        self.execute(GetBootFlags)
    }

    /// Write the boot flags (`Set System Boot Options`, parameter 5).
    pub fn set_boot_flags(&self, flags: BootFlags) -> Result<()> {
        self.execute(SetBootFlags { flags })
    }

    /// Boot from `device` on the next boot only.
    pub fn set_boot_device(&self, device: BootDevice) -> Result<()> {
        self.set_boot_flags(BootFlags::next_boot(device))
    }

    /// Change the session privilege level and return the level now in effect.
    pub fn set_session_privilege_level(&self, level: PrivilegeLevel) -> Result<PrivilegeLevel> {
        let granted = self.execute(SetSessionPrivilege { level })?;
        let mut inner = self.lock_inner()?;
        if let Some(session) = inner.session.as_mut() {
            session.set_privilege_level(granted);
        }
        Ok(granted)
    }

    /// Privilege level currently in effect, or `None` after close.
    pub fn privilege_level(&self) -> Option<PrivilegeLevel> {
        let inner = self.lock_inner().ok()?;
        inner.session.as_ref().map(Session::privilege_level)
    }

    /// Session ID assigned by the BMC.
    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    /// Close the session (App NetFn, cmd 0x3C) and return the BMC's completion code.
    ///
    /// The client is closed afterwards whatever the outcome: later requests
    /// fail with [`Error::NoSession`]. Transport errors are still reported.
    pub fn close_session(&self) -> Result<CompletionCode> {
        let id = CommandId::CLOSE_SESSION;
        let mut inner = self.lock_inner()?;
        let session = inner.session.take().ok_or(Error::NoSession)?;

        let start = Instant::now();
        let result = close_session(session, &*inner.transport);
        let elapsed = start.elapsed();
        match &result {
            Ok(code) => crate::observe::record_ok(
                "blocking",
                id.netfn.as_u8(),
                id.cmd,
                elapsed,
                *code,
            ),
            Err(err) => {
                crate::observe::record_err("blocking", id.netfn.as_u8(), id.cmd, elapsed, err)
            }
        }
        result
    }

    /// A service-style grouping for App netfn commands.
    pub fn app(&self) -> AppService {
        AppService {
            client: self.clone(),
        }
    }

    /// A service-style grouping for Chassis netfn commands.
    pub fn chassis(&self) -> ChassisService {
        ChassisService {
            client: self.clone(),
        }
    }

    fn lock_inner(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| Error::InvalidState("client lock poisoned"))
    }
}

fn send_raw_locked(inner: &mut Inner, netfn: u8, cmd: u8, data: &[u8]) -> Result<RawResponse> {
    let Inner { transport, session } = inner;
    let session = session.as_mut().ok_or(Error::NoSession)?;
    let (pending, packet) = session.wrap(netfn, cmd, data)?;
    exchange(&**transport, &packet, |datagram| {
        session.unwrap(&pending, datagram)
    })
}

/// App NetFn service.
#[derive(Clone)]
pub struct AppService {
    client: Client,
}

impl AppService {
    /// `Get Device ID` (App NetFn, cmd 0x01).
    pub fn get_device_id(&self) -> Result<DeviceIdResponse> {
        self.client.get_device_id()
    }

    /// `Set Session Privilege Level` (App NetFn, cmd 0x3B).
    pub fn set_session_privilege_level(&self, level: PrivilegeLevel) -> Result<PrivilegeLevel> {
        self.client.set_session_privilege_level(level)
    }

    /// `Close Session` (App NetFn, cmd 0x3C).
    pub fn close_session(&self) -> Result<CompletionCode> {
        self.client.close_session()
    }
}

/// Chassis NetFn service.
#[derive(Clone)]
pub struct ChassisService {
    client: Client,
}

impl ChassisService {
    /// `Get Chassis Status` (Chassis NetFn, cmd 0x01).
    pub fn get_chassis_status(&self) -> Result<ChassisStatus> {
        self.client.get_chassis_status()
    }

    /// `Chassis Control` (Chassis NetFn, cmd 0x02).
    pub fn chassis_control(&self, control: ChassisControl) -> Result<()> {
        self.client.chassis_control(control)
    }

    /// Boot flags (`Get System Boot Options`, parameter 5).
    pub fn get_boot_flags(&self) -> Result<BootFlags> {
        self.client.get_boot_flags()
    }

    /// Next-boot device override (`Set System Boot Options`, parameter 5).
    pub fn set_boot_device(&self, device: BootDevice) -> Result<()> {
        self.client.set_boot_device(device)
    }
}
