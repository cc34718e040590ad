// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Userspace side of the xeth sideband.
//!
//! [`XethHdl`] is a session with one driver: it owns the channel, the
//! buffer pools and the interface cache, and provides the administrative
//! commands.

use core::mem::size_of;
use slog::Logger;
use slog::debug;
use slog::o;
use std::sync::Arc;
use thiserror::Error;
use xeth_api::CarrierState;
use xeth_api::Ifindex;
use xeth_api::MsgCarrier;
use xeth_api::MsgHeader;
use xeth_api::MsgKind;
use xeth_api::MsgSpeed;
use xeth_api::MsgStat;
use xeth_api::Record;
use xeth_api::WireError;
use xeth_api::resolve_stat;
use xeth_api::view_as_mut;

pub mod channel;
pub mod dispatch;
pub mod host;
pub mod ifcache;
pub mod pool;

pub use channel::Channel;
pub use dispatch::Dispatched;
pub use dispatch::Dispatcher;
pub use host::HostInterface;
pub use host::HostInterfaces;
pub use host::SysInterfaces;
pub use ifcache::CacheUpdate;
pub use ifcache::IfCache;
pub use ifcache::InterfaceEntry;
pub use pool::Buf;
pub use pool::PoolError;
pub use pool::Pools;
pub use pool::SizeClass;

/// Errors from talking to the xeth driver.
#[derive(Debug, Error)]
pub enum Error {
    #[error("sideband {0} is not available; is the driver loaded?")]
    ChannelUnavailable(String),

    #[error("sideband channel error: {0}")]
    ChannelError(std::io::Error),

    #[error("driver closed the sideband")]
    PeerClosed,

    #[error("sideband channel is shut down")]
    ChannelClosed,

    #[error("bad message: {0}")]
    Wire(#[from] WireError),

    #[error("buffer pool: {0}")]
    Pool(#[from] PoolError),

    #[error("STAT {0:?} unknown")]
    UnknownStat(String),

    #[error("short write: sent {sent} of {len} bytes")]
    ShortWrite { sent: usize, len: usize },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Does this error mean the session is over?
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::PeerClosed | Self::ChannelClosed)
    }
}

/// A session with one xeth driver.
pub struct XethHdl {
    log: Logger,
    channel: Channel,
    dispatcher: Dispatcher,
    ethtool_stats: Vec<String>,
}

impl XethHdl {
    /// Connect to `driver`, resolving cache misses against this host.
    ///
    /// `ethtool_stats` is the driver's ordered statistic list; a name's
    /// position is its index.
    pub fn open(
        log: &Logger,
        driver: &str,
        ethtool_stats: Vec<String>,
    ) -> Result<Self, Error> {
        if driver.is_empty() || driver.contains(['\0', '/']) {
            return Err(Error::Config(format!("bad driver name {driver:?}")));
        }

        let pools = Arc::new(Pools::new());
        let channel = Channel::connect(log, driver, pools)?;
        Ok(Self::with_channel(
            log,
            channel,
            Arc::new(SysInterfaces),
            ethtool_stats,
        ))
    }

    /// Build a session over an existing channel.
    pub fn with_channel(
        log: &Logger,
        channel: Channel,
        host: Arc<dyn HostInterfaces>,
        ethtool_stats: Vec<String>,
    ) -> Self {
        let log = log.new(o!("component" => "xeth"));
        let cache = Arc::new(IfCache::new(&log, host));
        let dispatcher =
            Dispatcher::new(&log, cache, Arc::clone(channel.pools()));
        Self { log, channel, dispatcher, ethtool_stats }
    }

    pub fn cache(&self) -> &IfCache {
        self.dispatcher.cache()
    }

    pub fn pools(&self) -> &Arc<Pools> {
        self.channel.pools()
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Receive and dispatch one message.
    pub fn receive(&self) -> Result<Dispatched, Error> {
        let buf = self.channel.receive()?;
        self.dispatcher.handle(buf)
    }

    /// Give a received message's buffer back to the pools.
    pub fn release(&self, msg: Dispatched) -> Result<(), Error> {
        Ok(self.pools().release(msg.into_buf())?)
    }

    /// Hand every message to `f` until the driver sends a `Break`.
    ///
    /// Returns `true` on the break and `false` if the channel closed
    /// first. Malformed messages are skipped. An error from `f` ends the
    /// loop.
    pub fn until_break<F>(&self, mut f: F) -> Result<bool, Error>
    where
        F: FnMut(&Dispatched) -> Result<(), Error>,
    {
        loop {
            let msg = match self.receive() {
                Ok(msg) => msg,
                Err(Error::Wire(_)) => continue,
                Err(e) if e.is_terminal() => return Ok(false),
                Err(e) => return Err(e),
            };

            let done = msg.kind() == Some(MsgKind::Break);
            let res = if done { Ok(()) } else { f(&msg) };
            self.release(msg)?;
            res?;

            if done {
                return Ok(true);
            }
        }
    }

    /// Set a link or driver statistic.
    pub fn set_stat(
        &self,
        ifindex: Ifindex,
        stat: &str,
        count: u64,
    ) -> Result<(), Error> {
        let (kind, statindex) = resolve_stat(stat, &self.ethtool_stats)
            .ok_or_else(|| Error::UnknownStat(stat.to_string()))?;

        debug!(self.log, "set stat";
            "ifindex" => %ifindex,
            "kind" => %kind,
            "statindex" => statindex,
            "count" => count,
        );
        self.send_cmd(|msg: &mut MsgStat| {
            *msg = MsgStat::new(kind, ifindex.as_u64(), statindex, count)
        })
    }

    pub fn set_speed(&self, ifindex: Ifindex, mbps: u32) -> Result<(), Error> {
        self.send_cmd(|msg: &mut MsgSpeed| *msg = MsgSpeed::new(ifindex, mbps))
    }

    pub fn set_carrier(
        &self,
        ifindex: Ifindex,
        state: CarrierState,
    ) -> Result<(), Error> {
        self.send_cmd(|msg: &mut MsgCarrier| {
            *msg = MsgCarrier::new(ifindex, state)
        })
    }

    /// Ask the driver to send an `Ifinfo` for every interface it knows,
    /// followed by a `Break`.
    pub fn dump_ifinfo(&self) -> Result<(), Error> {
        self.send_cmd(|msg: &mut MsgHeader| {
            *msg = MsgHeader::new(MsgKind::DumpIfinfo)
        })
    }

    /// Ask the driver to send its FIB entries, followed by a `Break`.
    pub fn dump_fibinfo(&self) -> Result<(), Error> {
        self.send_cmd(|msg: &mut MsgHeader| {
            *msg = MsgHeader::new(MsgKind::DumpFibinfo)
        })
    }

    /// Prime the interface cache from a full driver dump.
    pub fn cache_ifinfo(&self) -> Result<bool, Error> {
        self.dump_ifinfo()?;
        self.until_break(|_| Ok(()))
    }

    /// Send a raw exception frame for the driver to inject.
    pub fn tx_frame(&self, frame: &[u8]) -> Result<(), Error> {
        let pools = self.pools();
        let mut buf = pools.acquire(frame.len())?;
        buf.copy_from_slice(frame);
        let res = self.channel.send(&buf);
        pools.release(buf)?;
        res
    }

    pub fn shutdown(&self) -> Result<(), Error> {
        self.channel.shutdown()
    }

    /// Build a command of type `T` in a command buffer and send it.
    fn send_cmd<T: Record>(
        &self,
        build: impl FnOnce(&mut T),
    ) -> Result<(), Error> {
        let pools = self.pools();
        let mut buf = pools.acquire_class(SizeClass::Command);
        let res = view_as_mut::<T>(&mut buf)
            .map(build)
            .map_err(Error::from)
            .and_then(|()| {
                buf.truncate(size_of::<T>());
                self.channel.send(&buf)
            });
        pools.release(buf)?;
        res
    }
}
