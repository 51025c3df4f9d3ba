use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::Transport;

/// Largest datagram we read. IPMI v1.5 LAN packets stay well below this.
const MAX_DATAGRAM_SIZE: usize = 1024;

/// Blocking UDP transport for RMCP/IPMI v1.5.
///
/// Each call sends the request and waits `timeout` for an answer, resending
/// the same bytes up to `attempts` times in total before reporting
/// [`Error::Timeout`].
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    attempts: u32,
}

impl UdpTransport {
    /// Bind an ephemeral local port and connect it to `target`.
    pub fn connect(target: SocketAddr, timeout: Duration, attempts: u32) -> Result<Self> {
        if timeout.is_zero() {
            return Err(Error::InvalidArgument("transport timeout must be non-zero"));
        }

        let bind_addr = match target {
            SocketAddr::V4(_) => "0.0.0.0:0",
            SocketAddr::V6(_) => "[::]:0",
        };

        let socket = UdpSocket::bind(bind_addr)?;
        socket.connect(target)?;
        socket.set_read_timeout(Some(timeout))?;

        Ok(Self {
            socket,
            attempts: attempts.max(1),
        })
    }

    /// Local address of the socket.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

impl Transport for UdpTransport {
    fn send_recv(&self, request: &[u8]) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

        for attempt in 1..=self.attempts {
            self.socket.send(request)?;

            match self.socket.recv(&mut buf) {
                Ok(n) => {
                    buf.truncate(n);
                    return Ok(buf);
                }
                Err(e) if is_timeout(&e) => {
                    crate::observe::retransmit("blocking", attempt, self.attempts);
                }
                Err(e) => return Err(Error::Io(e)),
            }
        }

        Err(Error::Timeout)
    }

    fn recv(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        match self.socket.recv(&mut buf) {
            Ok(n) => {
                buf.truncate(n);
                Ok(buf)
            }
            Err(e) if is_timeout(&e) => Err(Error::Timeout),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echoes_through_a_local_peer() {
        let peer = UdpSocket::bind("127.0.0.1:0").expect("bind peer");
        let target = peer.local_addr().expect("peer addr");
        let transport =
            UdpTransport::connect(target, Duration::from_secs(2), 1).expect("connect");

        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; 64];
            let (n, from) = peer.recv_from(&mut buf).expect("recv");
            peer.send_to(&buf[..n], from).expect("send");
        });

        let reply = transport.send_recv(&[0x06, 0x00, 0xFF, 0x07]).expect("reply");
        assert_eq!(reply, vec![0x06, 0x00, 0xFF, 0x07]);
        handle.join().expect("peer thread");
    }

    #[test]
    fn silent_peer_times_out_after_all_attempts() {
        let peer = UdpSocket::bind("127.0.0.1:0").expect("bind peer");
        let target = peer.local_addr().expect("peer addr");
        let transport =
            UdpTransport::connect(target, Duration::from_millis(20), 2).expect("connect");

        let err = transport.send_recv(&[0x00]).unwrap_err();
        assert!(matches!(err, Error::Timeout));
    }

    #[test]
    fn recv_reads_a_second_answer() {
        let peer = UdpSocket::bind("127.0.0.1:0").expect("bind peer");
        let target = peer.local_addr().expect("peer addr");
        let transport =
            UdpTransport::connect(target, Duration::from_millis(500), 1).expect("connect");

        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; 64];
            let (_, from) = peer.recv_from(&mut buf).expect("recv");
            peer.send_to(&[0x01], from).expect("send first");
            peer.send_to(&[0x02], from).expect("send second");
        });

        assert_eq!(transport.send_recv(&[0x00]).expect("first"), vec![0x01]);
        assert_eq!(transport.recv().expect("second"), vec![0x02]);
        handle.join().expect("peer thread");

        let err = transport.recv().unwrap_err();
        assert!(matches!(err, Error::Timeout));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let target: SocketAddr = "127.0.0.1:623".parse().expect("addr");
        let err = UdpTransport::connect(target, Duration::ZERO, 1).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
