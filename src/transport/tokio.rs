use core::future::Future;
use core::pin::Pin;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;

use crate::error::{Error, Result};
use crate::transport::AsyncTransport;

/// Largest datagram we read. IPMI v1.5 LAN packets stay well below this.
const MAX_DATAGRAM_SIZE: usize = 1024;

/// Tokio UDP transport for RMCP/IPMI v1.5.
///
/// Same retransmission policy as the blocking transport.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    attempts: u32,
    timeout: Duration,
}

impl UdpTransport {
    /// Bind an ephemeral local port and connect it to `target`.
    pub async fn connect(target: SocketAddr, timeout: Duration, attempts: u32) -> Result<Self> {
        if timeout.is_zero() {
            return Err(Error::InvalidArgument("transport timeout must be non-zero"));
        }

        let bind_addr = match target {
            SocketAddr::V4(_) => "0.0.0.0:0",
            SocketAddr::V6(_) => "[::]:0",
        };

        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(target).await?;

        Ok(Self {
            socket,
            attempts: attempts.max(1),
            timeout,
        })
    }

    async fn exchange(&self, request: &[u8]) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

        for attempt in 1..=self.attempts {
            self.socket.send(request).await?;

            match tokio::time::timeout(self.timeout, self.socket.recv(&mut buf)).await {
                Ok(Ok(n)) => {
                    buf.truncate(n);
                    return Ok(buf);
                }
                Ok(Err(e)) => return Err(Error::Io(e)),
                Err(_elapsed) => crate::observe::retransmit("async", attempt, self.attempts),
            }
        }

        Err(Error::Timeout)
    }

    async fn receive(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        match tokio::time::timeout(self.timeout, self.socket.recv(&mut buf)).await {
            Ok(Ok(n)) => {
                buf.truncate(n);
                Ok(buf)
            }
            Ok(Err(e)) => Err(Error::Io(e)),
            Err(_elapsed) => Err(Error::Timeout),
        }
    }
}

impl AsyncTransport for UdpTransport {
    fn send_recv<'a>(
        &'a self,
        request: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>> {
        Box::pin(self.exchange(request))
    }

    fn recv<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>> {
        Box::pin(self.receive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn silent_peer_times_out() {
        let peer = UdpSocket::bind("127.0.0.1:0").await.expect("bind peer");
        let target = peer.local_addr().expect("peer addr");
        let transport = UdpTransport::connect(target, Duration::from_millis(20), 2)
            .await
            .expect("connect");

        let err = transport.send_recv(&[0x00]).await.unwrap_err();
        assert!(matches!(err, Error::Timeout));
    }

    #[tokio::test]
    async fn recv_reads_a_second_answer() {
        let peer = UdpSocket::bind("127.0.0.1:0").await.expect("bind peer");
        let target = peer.local_addr().expect("peer addr");
        let transport = UdpTransport::connect(target, Duration::from_secs(2), 1)
            .await
            .expect("connect");

        let peer_task = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (_, from) = peer.recv_from(&mut buf).await.expect("recv");
            peer.send_to(&[0x01], from).await.expect("send first");
            peer.send_to(&[0x02], from).await.expect("send second");
        });

        assert_eq!(transport.send_recv(&[0x00]).await.expect("first"), vec![0x01]);
        assert_eq!(transport.recv().await.expect("second"), vec![0x02]);
        peer_task.await.expect("peer task");
    }
}
