//! Datagram transports.
//!
//! The session layer only needs "send this datagram, give me the answer".
//! Retransmission on timeout lives here, never in the protocol code.

#[cfg(feature = "blocking")]
use crate::error::{Error, Result};

/// Well-known UDP port of RMCP (ASF remote management).
pub const RMCP_PORT: u16 = 623;

/// A synchronous transport for exchanging RMCP/IPMI v1.5 datagrams.
#[cfg(feature = "blocking")]
pub trait Transport {
    /// Send a request datagram and wait for the corresponding response datagram.
    fn send_recv(&self, request: &[u8]) -> Result<Vec<u8>>;

    /// Wait for one more datagram without sending anything.
    ///
    /// Called after the answer from [`send_recv`](Self::send_recv) turned
    /// out to be a stale or duplicate reply. Transports that cannot read on
    /// their own keep the default, which reports [`Error::Unsupported`].
    fn recv(&self) -> Result<Vec<u8>> {
        Err(Error::Unsupported("receive without send"))
    }
}

#[cfg(feature = "async")]
mod async_support {
    use core::future::Future;
    use core::pin::Pin;

    use crate::error::{Error, Result};

    /// An asynchronous transport for exchanging RMCP/IPMI v1.5 datagrams.
    pub trait AsyncTransport {
        /// Send a request datagram and wait for the corresponding response datagram.
        fn send_recv<'a>(
            &'a self,
            request: &'a [u8],
        ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>>;

        /// Wait for one more datagram without sending anything.
        ///
        /// Called after a stale or duplicate reply; the default reports
        /// [`Error::Unsupported`].
        fn recv<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>> {
            Box::pin(async { Err(Error::Unsupported("receive without send")) })
        }
    }
}

#[cfg(feature = "async")]
pub use async_support::AsyncTransport;

#[cfg(feature = "blocking")]
pub(crate) mod blocking;

#[cfg(feature = "async")]
pub(crate) mod tokio;
