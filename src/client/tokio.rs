use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;

use crate::client::ClientBuilder;
use crate::codec::DeviceIdResponse;
use crate::commands::{
    ChassisControlCommand, Command, GetBootFlags, GetChassisStatus, GetDeviceId, SetBootFlags,
    SetSessionPrivilege,
};
use crate::completion::CompletionCode;
use crate::error::{Error, Result};
use crate::handshake::establish_session_async;
use crate::session::{Session, close_session_async, exchange_async};
use crate::transport::AsyncTransport;
use crate::transport::tokio::UdpTransport;
use crate::types::{
    BootDevice, BootFlags, ChassisControl, ChassisStatus, CommandId, PrivilegeLevel, RawResponse,
};

/// An async IPMI v1.5 LAN client on tokio.
///
/// Mirrors [`Client`](crate::Client). Clones share the session; requests
/// are serialized by an async mutex.
#[derive(Clone)]
pub struct AsyncClient {
    inner: Arc<Mutex<Inner>>,
    session_id: u32,
}

struct Inner {
    transport: Box<dyn AsyncTransport + Send + Sync>,
    session: Option<Session>,
}

impl ClientBuilder {
    /// Connect over UDP (tokio), establish the session and build an [`AsyncClient`].
    pub async fn build_async(self) -> Result<AsyncClient> {
        let transport = UdpTransport::connect(self.target, self.timeout, self.retries).await?;
        self.build_async_with_transport(transport).await
    }

    /// Establish the session over a caller-supplied async transport.
    pub async fn build_async_with_transport<T>(self, transport: T) -> Result<AsyncClient>
    where
        T: AsyncTransport + Send + Sync + 'static,
    {
        let params = self.session_params()?;
        let session = establish_session_async(&transport, params).await?;
        let session_id = session.session_id();
        Ok(AsyncClient {
            inner: Arc::new(Mutex::new(Inner {
                transport: Box::new(transport),
                session: Some(session),
            })),
            session_id,
        })
    }
}

impl AsyncClient {
    /// Execute a typed command (single request/response).
    pub async fn execute<C: Command>(&self, command: C) -> Result<C::Output> {
        let request = command.request();
        let id = request.id();
        let response = self
            .send_raw(id.netfn.as_u8(), id.cmd, &request.encode())
            .await?;
        command.parse_response(response)
    }

    /// Send a raw IPMI request inside the session and return the raw response.
    pub async fn send_raw(&self, netfn: u8, cmd: u8, data: &[u8]) -> Result<RawResponse> {
        let start = Instant::now();
        let result = {
            let mut guard = self.inner.lock().await;
            let Inner { transport, session } = &mut *guard;
            match session.as_mut() {
                Some(session) => exchange(&**transport, session, netfn, cmd, data).await,
                None => Err(Error::NoSession),
            }
        };
        let elapsed = start.elapsed();
        match &result {
            Ok(resp) => crate::observe::record_ok("async", netfn, cmd, elapsed, resp.completion_code),
            Err(err) => crate::observe::record_err("async", netfn, cmd, elapsed, err),
        }
        result
    }

    /// `Get Device ID` (App NetFn, cmd 0x01).
    pub async fn get_device_id(&self) -> Result<DeviceIdResponse> {
        self.execute(GetDeviceId).await
    }

    /// `Get Chassis Status` (Chassis NetFn, cmd 0x01).
    pub async fn get_chassis_status(&self) -> Result<ChassisStatus> {
        self.execute(GetChassisStatus).await
    }

    /// `Chassis Control` (Chassis NetFn, cmd 0x02).
    pub async fn chassis_control(&self, control: ChassisControl) -> Result<()> {
        self.execute(ChassisControlCommand { control }).await
    }

    /// Read the boot flags (`Get System Boot Options`, parameter 5).
    pub async fn get_boot_flags(&self) -> Result<BootFlags> {
        self.execute(GetBootFlags).await
    }

    /// Write the boot flags (`Set System Boot Options`, parameter 5).
    pub async fn set_boot_flags(&self, flags: BootFlags) -> Result<()> {
        self.execute(SetBootFlags { flags }).await
    }

    /// Boot from `device` on the next boot only.
    pub async fn set_boot_device(&self, device: BootDevice) -> Result<()> {
        self.set_boot_flags(BootFlags::next_boot(device)).await
    }

    /// Change the session privilege level and return the level now in effect.
    pub async fn set_session_privilege_level(
        &self,
        level: PrivilegeLevel,
    ) -> Result<PrivilegeLevel> {
        let granted = self.execute(SetSessionPrivilege { level }).await?;
        if let Some(session) = self.inner.lock().await.session.as_mut() {
            session.set_privilege_level(granted);
        }
        Ok(granted)
    }

    /// Privilege level currently in effect, or `None` after close.
    pub async fn privilege_level(&self) -> Option<PrivilegeLevel> {
        let guard = self.inner.lock().await;
        guard.session.as_ref().map(Session::privilege_level)
    }

    /// Session ID assigned by the BMC.
    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    /// Close the session and return the BMC's completion code.
    ///
    /// Later requests fail with [`Error::NoSession`].
    pub async fn close_session(&self) -> Result<CompletionCode> {
        let id = CommandId::CLOSE_SESSION;
        let mut guard = self.inner.lock().await;
        let session = guard.session.take().ok_or(Error::NoSession)?;

        let start = Instant::now();
        let result = close_session_async(session, &*guard.transport).await;
        let elapsed = start.elapsed();
        match &result {
            Ok(code) => {
                crate::observe::record_ok("async", id.netfn.as_u8(), id.cmd, elapsed, *code)
            }
            Err(err) => crate::observe::record_err("async", id.netfn.as_u8(), id.cmd, elapsed, err),
        }
        result
    }
}

async fn exchange(
    transport: &(dyn AsyncTransport + Send + Sync),
    session: &mut Session,
    netfn: u8,
    cmd: u8,
    data: &[u8],
) -> Result<RawResponse> {
    let (pending, packet) = session.wrap(netfn, cmd, data)?;
    exchange_async(transport, &packet, |datagram| {
        session.unwrap(&pending, datagram)
    })
    .await
}
