#![deny(unsafe_code)]
#![warn(missing_docs)]

//! An IPMI v1.5 LAN session client.
//!
//! The crate implements:
//! - the fixed-layout message codec and RMCP / IPMI v1.5 session framing
//! - authentication type negotiation (MD5, straight password, MD2, none)
//! - the challenge / activation handshake as a sans-IO state machine
//! - the session runtime: per-message AuthCodes, sequence numbers, replay rejection
//! - session teardown
//!
//! [`Client`] and [`AsyncClient`] wrap all of it behind a small API;
//! [`Handshake`] and [`Session`] are available for callers that bring
//! their own I/O.
//!
//! ```no_run
//! use ipmi_lan::{BootDevice, Client};
//!
//! # fn main() -> ipmi_lan::Result<()> {
//! let client = Client::builder("192.0.2.10:623".parse().expect("addr"))
//!     .username("admin")
//!     .password("secret")
//!     .build()?;
//! client.set_boot_device(BootDevice::Pxe)?;
//! client.close_session()?;
//! # Ok(())
//! # }
//! ```

mod auth;
mod client;
pub mod codec;
pub mod commands;
mod completion;
mod error;
mod handshake;
mod negotiate;
mod observe;
mod packet;
mod session;
mod transport;
mod types;

#[cfg(test)]
mod test_support;

pub use crate::client::ClientBuilder;
#[cfg(feature = "blocking")]
pub use crate::client::blocking::{AppService, ChassisService, Client};
#[cfg(feature = "async")]
pub use crate::client::tokio::AsyncClient;
pub use crate::completion::{Classification, CompletionCode, FailureKind, classify};
pub use crate::error::{DecodeError, Error, Result};
#[cfg(feature = "async")]
pub use crate::handshake::establish_session_async;
pub use crate::handshake::{CURRENT_CHANNEL, Handshake, HandshakePhase, Progress, SessionParams};
#[cfg(feature = "blocking")]
pub use crate::handshake::establish_session;
pub use crate::negotiate::{AUTH_PREFERENCE, Negotiator, select_auth};
#[cfg(feature = "async")]
pub use crate::session::close_session_async;
#[cfg(feature = "blocking")]
pub use crate::session::close_session;
pub use crate::session::{PendingRequest, Session};
pub use crate::transport::RMCP_PORT;
#[cfg(feature = "async")]
pub use crate::transport::AsyncTransport;
#[cfg(feature = "blocking")]
pub use crate::transport::Transport;
#[cfg(feature = "blocking")]
pub use crate::transport::blocking::UdpTransport;
#[cfg(feature = "async")]
pub use crate::transport::tokio::UdpTransport as AsyncUdpTransport;
pub use crate::types::{
    AuthType, BootDevice, BootFlags, ChassisControl, ChassisStatus, CommandId,
    FrontPanelControls, LastPowerEvent, NetFn, PowerRestorePolicy, PrivilegeLevel, RawResponse,
};
