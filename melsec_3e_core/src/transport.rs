//! TCP 送受信ラッパ
//!
//! ブロッキングソケット 1 本を所有する薄いトランスポート層です。受信は
//! 長さフィールドが読めるまで読み進め、フレーム全長を計算してから残りを
//! 読み切ります。タイムアウトは OS ソケットタイムアウトのみで、発生時は
//! `MelsecError::Timeout` を返します (セッションは汚染扱い、呼び出し側で
//! close して再接続すること)。

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::MelsecError;
use crate::frame::expected_frame_len;
use crate::mc_define::CommType;
use crate::plc_series::PLCSeries;

const RECV_CHUNK: usize = 4096;
const MAX_FRAME_LEN: usize = 65535;

fn hex_dump(b: &[u8]) -> String {
    b.iter()
        .map(|x| format!("{x:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn map_io(e: std::io::Error) -> MelsecError {
    match e.kind() {
        ErrorKind::WouldBlock | ErrorKind::TimedOut => MelsecError::Timeout,
        _ => MelsecError::Io(e),
    }
}

/// Blocking TCP transport for one PLC connection.
pub struct TcpTransport {
    stream: TcpStream,
    peer: SocketAddr,
}

impl TcpTransport {
    /// Resolve `host:port` and connect with `timeout` applied to connect,
    /// read and write.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, MelsecError> {
        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|e| MelsecError::Transport(format!("bad address {host}:{port}: {e}")))?;

        let mut last_err: Option<std::io::Error> = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(timeout))?;
                    stream.set_write_timeout(Some(timeout))?;
                    log::debug!("[MC TCP] connected to {addr}");
                    return Ok(Self { stream, peer: addr });
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(MelsecError::Transport(format!(
            "failed to connect to {host}:{port}: {err}",
            err = last_err.map_or_else(|| "no address resolved".to_string(), |e| e.to_string())
        )))
    }

    #[must_use]
    pub const fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Update the socket read/write timeout on the live connection.
    pub fn set_timeout(&self, timeout: Duration) -> Result<(), MelsecError> {
        self.stream.set_read_timeout(Some(timeout))?;
        self.stream.set_write_timeout(Some(timeout))?;
        Ok(())
    }

    /// Write one request frame.
    pub fn send_all(&mut self, payload: &[u8]) -> Result<(), MelsecError> {
        log::debug!("[MC TCP send] {}", hex_dump(payload));
        self.stream.write_all(payload).map_err(map_io)
    }

    /// Read exactly one response frame.
    ///
    /// Reads until the length field of the reply header is complete, computes
    /// the expected total size, then reads the remainder. A timeout mid-frame
    /// surfaces as `Timeout`; a remote close mid-frame as `Transport`.
    pub fn recv_frame(
        &mut self,
        comm: CommType,
        series: PLCSeries,
    ) -> Result<Vec<u8>, MelsecError> {
        let mut buf: Vec<u8> = Vec::new();
        let mut tmp = [0u8; RECV_CHUNK];

        loop {
            if let Some(total) = expected_frame_len(comm, series, &buf)? {
                if total > MAX_FRAME_LEN {
                    return Err(MelsecError::Transport(format!(
                        "reply frame length {total} exceeds limit"
                    )));
                }
                if buf.len() >= total {
                    buf.truncate(total);
                    log::debug!("[MC TCP recv] {}", hex_dump(&buf));
                    return Ok(buf);
                }
            }
            match self.stream.read(&mut tmp) {
                Ok(0) => {
                    return Err(MelsecError::Transport(format!(
                        "connection closed mid-frame after {n} bytes",
                        n = buf.len()
                    )))
                }
                Ok(n) => buf.extend_from_slice(&tmp[..n]),
                Err(e) => return Err(map_io(e)),
            }
        }
    }

    /// Shut the connection down. Best effort, idempotent.
    pub fn close(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("peer", &self.peer)
            .field("local", &self.stream.local_addr().ok())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn recv_assembles_fragmented_frame() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("local addr").port();

        let server = thread::spawn(move || {
            let (mut sock, _) = listener.accept().expect("accept");
            // classic binary reply split across two writes
            sock.write_all(&[0xD0, 0x00, 0x00, 0xFF, 0xFF]).unwrap();
            thread::sleep(Duration::from_millis(20));
            sock.write_all(&[0x03, 0x00, 0x04, 0x00, 0x00, 0x00, 0x2A, 0x00])
                .unwrap();
        });

        let mut tp =
            TcpTransport::connect("127.0.0.1", port, Duration::from_secs(2)).expect("connect");
        let frame = tp
            .recv_frame(CommType::Binary, PLCSeries::Q)
            .expect("recv frame");
        assert_eq!(frame.len(), 13);
        assert_eq!(&frame[9..], &[0x00, 0x00, 0x2A, 0x00]);
        server.join().expect("server thread");
    }

    #[test]
    fn recv_timeout_maps_to_timeout_error() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        // accept but never reply
        let server = thread::spawn(move || {
            let (_sock, _) = listener.accept().expect("accept");
            thread::sleep(Duration::from_millis(500));
        });

        let mut tp =
            TcpTransport::connect("127.0.0.1", port, Duration::from_millis(100)).expect("connect");
        assert!(matches!(
            tp.recv_frame(CommType::Binary, PLCSeries::Q),
            Err(MelsecError::Timeout)
        ));
        server.join().expect("server thread");
    }

    #[test]
    fn recv_eof_mid_frame_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        let server = thread::spawn(move || {
            let (mut sock, _) = listener.accept().expect("accept");
            // header promises 4 data bytes but the connection drops early
            sock.write_all(&[0xD0, 0x00, 0x00, 0xFF, 0xFF, 0x03, 0x00, 0x06, 0x00, 0x00])
                .unwrap();
        });

        let mut tp =
            TcpTransport::connect("127.0.0.1", port, Duration::from_secs(2)).expect("connect");
        assert!(matches!(
            tp.recv_frame(CommType::Binary, PLCSeries::Q),
            Err(MelsecError::Transport(_))
        ));
        server.join().expect("server thread");
    }
}
