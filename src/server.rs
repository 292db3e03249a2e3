//! TCP front end.
//!
//! One instrument, one listener, one client at a time. Real GPIB boxes
//! behind LAN adapters behave the same way, and control software written
//! against them never opens parallel sessions. Further connection
//! attempts queue in the accept backlog until the active client hangs
//! up.
//!
//! Incoming bytes are framed on `\r` or `\n`; blank lines and lines that
//! are not valid UTF-8 are dropped without an answer, as is any command
//! the instrument answers with the empty string.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::format;
use crate::instruments::Instrument;

const READ_BUFFER_SIZE: usize = 4096;

/// Serves a single instrument over TCP.
pub struct Server {
    listener: TcpListener,
    instrument: Box<dyn Instrument>,
    eol: &'static str,
}

impl Server {
    /// Bind the listener. Port 0 picks an ephemeral port; see
    /// [`Server::local_addr`].
    pub async fn bind(
        addr: &str,
        instrument: Box<dyn Instrument>,
        eol: &'static str,
    ) -> AppResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(
            "{} listening on {}",
            instrument.name(),
            listener.local_addr()?
        );
        Ok(Self {
            listener,
            instrument,
            eol,
        })
    }

    /// The address the listener actually bound.
    pub fn local_addr(&self) -> AppResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept clients forever, one session at a time.
    pub async fn run(mut self) -> AppResult<()> {
        loop {
            let (socket, addr) = self.listener.accept().await?;
            info!("Client connected: {}", addr);
            if let Err(e) = self.serve_session(socket, addr).await {
                warn!("Client {} error: {}", addr, e);
            }
            info!("Client {} disconnected", addr);
        }
    }

    async fn serve_session(&mut self, mut socket: TcpStream, addr: SocketAddr) -> AppResult<()> {
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        let mut pending: Vec<u8> = Vec::new();

        loop {
            let n = socket.read(&mut buf).await?;
            if n == 0 {
                return Ok(());
            }
            pending.extend_from_slice(&buf[..n]);

            while let Some(pos) = pending.iter().position(|b| *b == b'\r' || *b == b'\n') {
                let frame: Vec<u8> = pending.drain(..=pos).collect();
                let line = &frame[..frame.len() - 1];
                if line.is_empty() {
                    continue;
                }
                let Ok(text) = std::str::from_utf8(line) else {
                    warn!("Ignoring non-UTF-8 line from {}", addr);
                    continue;
                };

                debug!("RX '{}'", format::printable(text));
                let reply = self.instrument.respond(text);
                if reply.is_empty() {
                    debug!("not replying");
                    continue;
                }
                let framed = format!("{}{}", reply, self.eol);
                debug!("TX '{}'", format::printable(&framed));
                socket.write_all(framed.as_bytes()).await?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::instruments::InstrumentKind;
    use std::sync::Arc;

    async fn start(kind: InstrumentKind) -> SocketAddr {
        let instrument = kind.build(Arc::new(SystemClock), 0.0).unwrap();
        let server = Server::bind("127.0.0.1:0", instrument, kind.response_eol())
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = server.run().await;
        });
        addr
    }

    async fn read_reply(stream: &mut TcpStream) -> String {
        let mut buf = [0u8; 1024];
        let mut out = Vec::new();
        loop {
            let n = stream.read(&mut buf).await.unwrap();
            assert!(n > 0, "server closed the connection early");
            out.extend_from_slice(&buf[..n]);
            if out.ends_with(b"\r") {
                break;
            }
        }
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn test_command_and_reply_over_tcp() {
        let addr = start(InstrumentKind::RotaryDisc).await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        stream.write_all(b"*IDN?\r\n").await.unwrap();
        assert_eq!(
            read_reply(&mut stream).await,
            "innco GmbH,CO3000,sim,1.02.62\r"
        );

        stream.write_all(b"CP\r").await.unwrap();
        assert_eq!(read_reply(&mut stream).await, "0.0\r");
    }

    #[tokio::test]
    async fn test_blank_lines_and_empty_replies_stay_silent() {
        let addr = start(InstrumentKind::Vc).await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        // Two blank frames, a silent write command, then a query. The
        // query's report is the first thing to come back.
        stream
            .write_all(b"\r\n$01E 0030.0 0 0 0 0 0 0 0\r$01I\r")
            .await
            .unwrap();
        let reply = read_reply(&mut stream).await;
        assert!(reply.starts_with("0027.1 0019.8"), "got {reply}");
    }

    #[tokio::test]
    async fn test_non_utf8_lines_are_dropped() {
        let addr = start(InstrumentKind::Empower).await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        stream.write_all(b"\xff\xfe\rIN?\r").await.unwrap();
        assert_eq!(read_reply(&mut stream).await, "BBS3G6QHM\r");
    }

    #[tokio::test]
    async fn test_split_frames_reassemble() {
        let addr = start(InstrumentKind::Empower).await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        stream.write_all(b"I").await.unwrap();
        stream.flush().await.unwrap();
        stream.write_all(b"N?\r").await.unwrap();
        assert_eq!(read_reply(&mut stream).await, "BBS3G6QHM\r");
    }

    #[tokio::test]
    async fn test_clients_are_served_sequentially() {
        let addr = start(InstrumentKind::Empower).await;

        {
            let mut first = TcpStream::connect(addr).await.unwrap();
            first.write_all(b"G47.7\rG?\r").await.unwrap();
            assert_eq!(read_reply(&mut first).await, "47\r");
        }

        // The next client reaches the same instrument with its state
        // intact once the first session is gone.
        let mut second = TcpStream::connect(addr).await.unwrap();
        second.write_all(b"G?\r").await.unwrap();
        assert_eq!(read_reply(&mut second).await, "47\r");
    }
}
