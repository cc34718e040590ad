// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Routing of received buffers.

use crate::Error;
use crate::ifcache::CacheUpdate;
use crate::ifcache::IfCache;
use crate::pool::Buf;
use crate::pool::Pools;
use slog::Logger;
use slog::debug;
use slog::o;
use slog::warn;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use xeth_api::MsgKind;
use xeth_api::MsgView;
use xeth_api::WireError;

/// A received message that survived decoding.
///
/// Owns its buffer; hand it back with [`Dispatched::into_buf`] and
/// [`Pools::release`] once done.
#[derive(Debug)]
pub struct Dispatched {
    buf: Buf,
    update: Option<CacheUpdate>,
}

impl Dispatched {
    /// A typed view of the message.
    ///
    /// Only a kind this library does not know fails here, with
    /// [`WireError::UnknownKind`].
    pub fn view(&self) -> Result<MsgView<'_>, WireError> {
        MsgView::parse(&self.buf)
    }

    /// The message kind, or `None` for raw frames and unknown kinds.
    pub fn kind(&self) -> Option<MsgKind> {
        self.view().ok().and_then(|v| v.kind())
    }

    /// What an `Ifinfo` message did to the cache.
    pub fn update(&self) -> Option<&CacheUpdate> {
        self.update.as_ref()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_buf(self) -> Buf {
        self.buf
    }
}

/// Feeds lifecycle messages to the cache and everything else through.
pub struct Dispatcher {
    log: Logger,
    cache: Arc<IfCache>,
    pools: Arc<Pools>,
    invalid: AtomicU64,
}

impl Dispatcher {
    pub fn new(log: &Logger, cache: Arc<IfCache>, pools: Arc<Pools>) -> Self {
        Self {
            log: log.new(o!("component" => "dispatch")),
            cache,
            pools,
            invalid: AtomicU64::new(0),
        }
    }

    pub fn cache(&self) -> &Arc<IfCache> {
        &self.cache
    }

    /// Number of buffers dropped as malformed.
    pub fn invalid_count(&self) -> u64 {
        self.invalid.load(Ordering::Relaxed)
    }

    /// Decode `buf`, applying any cache update before returning.
    ///
    /// A malformed buffer is released here and reported as
    /// [`Error::Wire`].
    pub fn handle(&self, buf: Buf) -> Result<Dispatched, Error> {
        let outcome = match MsgView::parse(&buf) {
            Ok(MsgView::Ifinfo(msg)) => Ok(Some(self.cache.apply(msg))),

            Ok(view) => {
                match view.kind() {
                    Some(kind) => debug!(self.log, "rx"; "kind" => %kind),
                    None => debug!(self.log, "rx frame"; "len" => buf.len()),
                }
                Ok(None)
            }

            Err(WireError::UnknownKind(kind)) => {
                debug!(self.log, "rx unknown kind"; "kind" => kind);
                Ok(None)
            }

            Err(e) => Err(e),
        };

        match outcome {
            Ok(update) => Ok(Dispatched { buf, update }),
            Err(e) => {
                self.invalid.fetch_add(1, Ordering::Relaxed);
                warn!(self.log, "dropping malformed message"; "err" => %e);
                self.pools.release(buf)?;
                Err(Error::Wire(e))
            }
        }
    }
}
