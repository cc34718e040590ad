// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! The sideband packet socket.

use crate::Error;
use crate::pool::Buf;
use crate::pool::Pools;
use crate::pool::SizeClass;
use nix::sys::socket::AddressFamily;
use nix::sys::socket::SockFlag;
use nix::sys::socket::SockType;
use nix::sys::socket::socket;
use slog::Logger;
use slog::debug;
use slog::info;
use slog::o;
use std::io;
use std::net::Shutdown;
use std::os::fd::OwnedFd;
use std::os::linux::net::SocketAddrExt;
use std::os::unix::net::SocketAddr;
use std::os::unix::net::UnixDatagram;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

/// A snapshot of the channel counters.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ChannelStats {
    pub rx_msgs: u64,
    pub tx_msgs: u64,
}

/// A connected `SOCK_SEQPACKET` socket to the driver.
///
/// One thread may block in [`Channel::receive`] while any number of
/// others call [`Channel::send`].
pub struct Channel {
    log: Logger,
    // The socket is sequenced-packet; `UnixDatagram` is only used for its
    // send(2)/recv(2)/shutdown(2) wrappers.
    sock: UnixDatagram,
    pools: Arc<Pools>,
    tx_lock: Mutex<()>,
    closed: AtomicBool,
    rx_msgs: AtomicU64,
    tx_msgs: AtomicU64,
}

impl Channel {
    /// The abstract socket name the driver listens on.
    pub fn sockname(driver: &str) -> String {
        format!("{driver}.xeth")
    }

    /// Connect to the sideband of `driver`.
    pub fn connect(
        log: &Logger,
        driver: &str,
        pools: Arc<Pools>,
    ) -> Result<Self, Error> {
        let name = Self::sockname(driver);
        let fd = socket(
            AddressFamily::Unix,
            SockType::SeqPacket,
            SockFlag::SOCK_CLOEXEC,
            None,
        )
        .map_err(|e| Error::ChannelError(e.into()))?;

        let sock = UnixDatagram::from(fd);
        let addr = SocketAddr::from_abstract_name(name.as_bytes())
            .map_err(Error::ChannelError)?;

        match sock.connect_addr(&addr) {
            Ok(()) => {}
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused
                ) =>
            {
                return Err(Error::ChannelUnavailable(format!("@{name}")));
            }
            Err(e) => return Err(Error::ChannelError(e)),
        }

        let log =
            log.new(o!("component" => "channel", "sock" => format!("@{name}")));
        info!(log, "connected");
        Ok(Self::new(log, sock, pools))
    }

    /// Adopt an already connected packet socket.
    pub fn from_fd(log: &Logger, fd: OwnedFd, pools: Arc<Pools>) -> Self {
        let log = log.new(o!("component" => "channel"));
        Self::new(log, UnixDatagram::from(fd), pools)
    }

    fn new(log: Logger, sock: UnixDatagram, pools: Arc<Pools>) -> Self {
        Self {
            log,
            sock,
            pools,
            tx_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
            rx_msgs: AtomicU64::new(0),
            tx_msgs: AtomicU64::new(0),
        }
    }

    pub fn pools(&self) -> &Arc<Pools> {
        &self.pools
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Send `msg` as one datagram.
    pub fn send(&self, msg: &[u8]) -> Result<(), Error> {
        if self.is_closed() {
            return Err(Error::ChannelClosed);
        }

        let _guard =
            self.tx_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let sent = loop {
            match self.sock.send(msg) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.io_error(e)),
            }
        };

        if sent != msg.len() {
            return Err(Error::ShortWrite { sent, len: msg.len() });
        }

        self.tx_msgs.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Block for the next datagram.
    ///
    /// The returned buffer is a page-class buffer truncated to the
    /// datagram length; the caller must give it back to the pools.
    pub fn receive(&self) -> Result<Buf, Error> {
        if self.is_closed() {
            return Err(Error::ChannelClosed);
        }

        let mut buf = self.pools.acquire_class(SizeClass::Page);
        let res = loop {
            match self.sock.recv(&mut buf) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                res => break res,
            }
        };

        match res {
            Ok(0) => {
                self.pools.release(buf)?;
                if self.is_closed() {
                    Err(Error::ChannelClosed)
                } else {
                    debug!(self.log, "peer closed");
                    Err(Error::PeerClosed)
                }
            }

            Ok(n) => {
                buf.truncate(n);
                self.rx_msgs.fetch_add(1, Ordering::Relaxed);
                Ok(buf)
            }

            Err(e) => {
                self.pools.release(buf)?;
                Err(self.io_error(e))
            }
        }
    }

    /// Shut down both directions, waking any blocked receive.
    pub fn shutdown(&self) -> Result<(), Error> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        info!(self.log, "shutdown");
        match self.sock.shutdown(Shutdown::Both) {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => {
                Err(Error::ChannelError(e))
            }
            _ => Ok(()),
        }
    }

    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            rx_msgs: self.rx_msgs.load(Ordering::Relaxed),
            tx_msgs: self.tx_msgs.load(Ordering::Relaxed),
        }
    }

    fn io_error(&self, e: io::Error) -> Error {
        if self.is_closed() {
            return Error::ChannelClosed;
        }

        match e.kind() {
            io::ErrorKind::ConnectionReset | io::ErrorKind::BrokenPipe => {
                Error::PeerClosed
            }
            _ => Error::ChannelError(e),
        }
    }
}
