// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Common routines for integration tests.

// This type of pedantry is more trouble than it's worth here.
#![allow(dead_code)]

pub mod host;
pub mod msgs;
pub mod peer;

pub use host::ScriptedHost;
pub use msgs::IfinfoBuilder;
pub use peer::KernelPeer;
pub use peer::peer_pair;
pub use peer::peer_pair_with;
pub use peer::test_logger;

// Let's make our lives easier and pub use a bunch of stuff.
pub use xeth::CacheUpdate;
pub use xeth::Error;
pub use xeth::InterfaceEntry;
pub use xeth::XethHdl;
pub use xeth_api::IfFlags;
pub use xeth_api::Ifindex;
pub use xeth_api::IfinfoReason;
pub use xeth_api::MacAddr;
pub use xeth_api::MsgKind;
pub use xeth_api::MsgView;
pub use xeth_api::Netns;

/// Shorthand for a known-good ifindex.
pub fn idx(i: i32) -> Ifindex {
    Ifindex::new(i).expect("positive ifindex")
}
