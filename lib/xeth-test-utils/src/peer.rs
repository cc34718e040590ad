// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! An in-process stand-in for the driver end of the sideband.

use crate::host::ScriptedHost;
use nix::sys::socket::AddressFamily;
use nix::sys::socket::SockFlag;
use nix::sys::socket::SockType;
use nix::sys::socket::socketpair;
use slog::Discard;
use slog::Logger;
use slog::o;
use std::os::unix::net::UnixDatagram;
use std::sync::Arc;
use std::time::Duration;
use xeth::Channel;
use xeth::Pools;
use xeth::XethHdl;
use xeth_api::MsgStat;
use xeth_api::view_as;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

pub fn test_logger() -> Logger {
    Logger::root(Discard, o!())
}

/// The driver's end of a sideband socket pair.
pub struct KernelPeer {
    sock: UnixDatagram,
}

impl KernelPeer {
    pub fn send(&self, msg: &[u8]) {
        let n = self.sock.send(msg).expect("peer send");
        assert_eq!(n, msg.len());
    }

    /// Receive the next command the session sent.
    pub fn recv(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 16 * 1024];
        let n = self.sock.recv(&mut buf).expect("peer recv");
        buf.truncate(n);
        buf
    }

    pub fn recv_stat(&self) -> MsgStat {
        let buf = self.recv();
        assert_eq!(buf.len(), size_of::<MsgStat>());
        *view_as::<MsgStat>(&buf).expect("stat command")
    }

    /// Close the driver's end.
    pub fn close(self) {}
}

/// A session wired to an in-process peer, with no host interfaces and
/// no driver statistics.
pub fn peer_pair() -> (XethHdl, KernelPeer) {
    peer_pair_with(Arc::new(ScriptedHost::default()), Vec::new())
}

pub fn peer_pair_with(
    host: Arc<ScriptedHost>,
    ethtool_stats: Vec<String>,
) -> (XethHdl, KernelPeer) {
    let (ours, theirs) = socketpair(
        AddressFamily::Unix,
        SockType::SeqPacket,
        None,
        SockFlag::SOCK_CLOEXEC,
    )
    .expect("socketpair");

    let log = test_logger();
    let pools = Arc::new(Pools::with_page_size(4096));
    let channel = Channel::from_fd(&log, ours, pools);
    let hdl = XethHdl::with_channel(&log, channel, host, ethtool_stats);

    let sock = UnixDatagram::from(theirs);
    sock.set_read_timeout(Some(RECV_TIMEOUT)).expect("read timeout");
    (hdl, KernelPeer { sock })
}
