// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

use super::ETH_ALEN;
use core::fmt;
use core::fmt::Debug;
use core::fmt::Display;
use core::str::FromStr;
use serde::Deserialize;
use serde::Serialize;

/// The hardware address of a xeth device or neighbor.
#[derive(
    Clone, Copy, Default, Deserialize, Eq, Hash, PartialEq, Serialize,
)]
pub struct MacAddr([u8; ETH_ALEN]);

impl MacAddr {
    pub const ZERO: Self = Self([0; ETH_ALEN]);

    pub const fn from_const(bytes: [u8; ETH_ALEN]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> [u8; ETH_ALEN] {
        self.0
    }

    /// A deleted interface carries the all-zero address.
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl From<[u8; ETH_ALEN]> for MacAddr {
    fn from(bytes: [u8; ETH_ALEN]) -> Self {
        Self(bytes)
    }
}

impl FromStr for MacAddr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; ETH_ALEN];
        let mut octets = s.split(':');
        for b in bytes.iter_mut() {
            let octet = octets
                .next()
                .ok_or_else(|| format!("MAC {s:?} too short"))?;
            *b = u8::from_str_radix(octet, 16)
                .map_err(|_| format!("MAC {s:?}: bad octet {octet:?}"))?;
        }

        if octets.next().is_some() {
            return Err(format!("MAC {s:?} too long"));
        }
        Ok(Self(bytes))
    }
}

impl Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "MacAddr({self})")
    }
}
