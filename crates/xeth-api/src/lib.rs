// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Wire types for the xeth sideband channel.
//!
//! The xeth driver and its userspace controller exchange fixed-layout
//! records over a packet socket. Both ends run on the same machine, so
//! every multi-byte field is in host byte order; nothing here performs a
//! network-order conversion. The layouts are a contract with the kernel
//! peer and must not be reordered.

#![deny(unreachable_patterns)]
#![deny(unused_must_use)]

use core::fmt;
use core::fmt::Display;
use serde::Deserialize;
use serde::Serialize;

pub mod ifinfo;
pub mod mac;
pub mod msg;
pub mod stat;

pub use ifinfo::*;
pub use mac::*;
pub use msg::*;
pub use stat::*;

/// Largest frame the driver will pass over the sideband.
pub const SIZEOF_JUMBO_FRAME: usize = 9728;

/// Size of the kernel's `ifname` field, including the NUL.
pub const IFNAMSIZ: usize = 16;

/// Length of an Ethernet hardware address.
pub const ETH_ALEN: usize = 6;

/// Requested link state for a `Carrier` command.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum CarrierState {
    Off = 0,
    On = 1,
}

impl CarrierState {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl core::str::FromStr for CarrierState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "on" => Ok(CarrierState::On),
            "off" => Ok(CarrierState::Off),
            _ => Err(format!("invalid carrier state: {}", s)),
        }
    }
}

impl Display for CarrierState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            CarrierState::On => "on",
            CarrierState::Off => "off",
        };

        write!(f, "{}", s)
    }
}
