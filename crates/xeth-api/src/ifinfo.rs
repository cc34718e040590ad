// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Interface identity types carried by `Ifinfo` messages.

use bitflags::bitflags;
use core::fmt;
use core::fmt::Display;
use core::num::NonZeroI32;
use serde::Deserialize;
use serde::Serialize;
use std::borrow::Cow;

/// A kernel interface index. Always positive; the wire value zero (and
/// anything negative) means "unknown" and is modeled as `None`.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[serde(try_from = "i32", into = "i32")]
pub struct Ifindex(NonZeroI32);

impl Ifindex {
    pub fn new(val: i32) -> Option<Self> {
        if val > 0 { NonZeroI32::new(val).map(Self) } else { None }
    }

    pub fn get(self) -> i32 {
        self.0.get()
    }

    /// The unsigned form used by the 64-bit stat records.
    pub fn as_u64(self) -> u64 {
        self.0.get().unsigned_abs().into()
    }
}

impl TryFrom<i32> for Ifindex {
    type Error = String;

    fn try_from(val: i32) -> Result<Self, Self::Error> {
        Self::new(val).ok_or_else(|| format!("invalid ifindex: {val}"))
    }
}

impl From<Ifindex> for i32 {
    fn from(idx: Ifindex) -> Self {
        idx.get()
    }
}

impl core::str::FromStr for Ifindex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let val: i32 =
            s.parse().map_err(|_| format!("invalid ifindex: {s}"))?;
        Self::try_from(val)
    }
}

impl Display for Ifindex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A network namespace, identified by its inode number. The driver
/// reports the host's own namespace as 1.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub struct Netns(u64);

impl Netns {
    pub const DEFAULT: Self = Self(1);

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn is_default(self) -> bool {
        self == Self::DEFAULT
    }
}

impl Default for Netns {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<u64> for Netns {
    fn from(val: u64) -> Self {
        Self(val)
    }
}

impl Display for Netns {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_default() {
            write!(f, "default")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

bitflags! {
/// The `IFF_*` interface flags as reported by the kernel.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize,
)]
pub struct IfFlags: u32 {
    const UP = 1 << 0;
    const BROADCAST = 1 << 1;
    const DEBUG = 1 << 2;
    const LOOPBACK = 1 << 3;
    const POINTOPOINT = 1 << 4;
    const NOTRAILERS = 1 << 5;
    const RUNNING = 1 << 6;
    const NOARP = 1 << 7;
    const PROMISC = 1 << 8;
    const ALLMULTI = 1 << 9;
    const MASTER = 1 << 10;
    const SLAVE = 1 << 11;
    const MULTICAST = 1 << 12;
    const PORTSEL = 1 << 13;
    const AUTOMEDIA = 1 << 14;
    const DYNAMIC = 1 << 15;
    const LOWER_UP = 1 << 16;
    const DORMANT = 1 << 17;
    const ECHO = 1 << 18;
}
}

impl Display for IfFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "0");
        }

        let mut first = true;
        for (name, _) in self.iter_names() {
            if !first {
                write!(f, "|")?;
            }
            write!(f, "{}", name.to_ascii_lowercase())?;
            first = false;
        }

        let unknown = self.bits() & !Self::all().bits();
        if unknown != 0 {
            if !first {
                write!(f, "|")?;
            }
            write!(f, "{unknown:#x}")?;
        }

        Ok(())
    }
}

/// The kind of device behind an interface.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum DevType {
    XethPort,
    XethBridgePort,
    #[default]
    LinuxUnknown,
    LinuxBridge,
    LinuxVlan,
    LinuxVlanBridgePort,
    Other(u8),
}

impl From<u8> for DevType {
    fn from(val: u8) -> Self {
        match val {
            0 => Self::XethPort,
            1 => Self::XethBridgePort,
            128 => Self::LinuxUnknown,
            129 => Self::LinuxBridge,
            130 => Self::LinuxVlan,
            131 => Self::LinuxVlanBridgePort,
            _ => Self::Other(val),
        }
    }
}

impl From<DevType> for u8 {
    fn from(dt: DevType) -> Self {
        match dt {
            DevType::XethPort => 0,
            DevType::XethBridgePort => 1,
            DevType::LinuxUnknown => 128,
            DevType::LinuxBridge => 129,
            DevType::LinuxVlan => 130,
            DevType::LinuxVlanBridgePort => 131,
            DevType::Other(val) => val,
        }
    }
}

impl Display for DevType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::XethPort => write!(f, "port"),
            Self::XethBridgePort => write!(f, "bridge-port"),
            Self::LinuxUnknown => write!(f, "unknown"),
            Self::LinuxBridge => write!(f, "bridge"),
            Self::LinuxVlan => write!(f, "vlan"),
            Self::LinuxVlanBridgePort => write!(f, "vlan-bridge-port"),
            Self::Other(val) => write!(f, "devtype({val})"),
        }
    }
}

/// Why the driver sent an `Ifinfo` message.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum IfinfoReason {
    New,
    Del,
    Up,
    Down,
    Dump,
    Reg,
    Unreg,
    VlanAdd,
    VlanDel,
    VlanDump,
    Other(u8),
}

impl From<u8> for IfinfoReason {
    fn from(val: u8) -> Self {
        match val {
            0 => Self::New,
            1 => Self::Del,
            2 => Self::Up,
            3 => Self::Down,
            4 => Self::Dump,
            5 => Self::Reg,
            6 => Self::Unreg,
            7 => Self::VlanAdd,
            8 => Self::VlanDel,
            9 => Self::VlanDump,
            _ => Self::Other(val),
        }
    }
}

impl From<IfinfoReason> for u8 {
    fn from(r: IfinfoReason) -> Self {
        match r {
            IfinfoReason::New => 0,
            IfinfoReason::Del => 1,
            IfinfoReason::Up => 2,
            IfinfoReason::Down => 3,
            IfinfoReason::Dump => 4,
            IfinfoReason::Reg => 5,
            IfinfoReason::Unreg => 6,
            IfinfoReason::VlanAdd => 7,
            IfinfoReason::VlanDel => 8,
            IfinfoReason::VlanDump => 9,
            IfinfoReason::Other(val) => val,
        }
    }
}

impl Display for IfinfoReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::Del => "del",
            Self::Up => "up",
            Self::Down => "down",
            Self::Dump => "dump",
            Self::Reg => "reg",
            Self::Unreg => "unreg",
            Self::VlanAdd => "vlan-add",
            Self::VlanDel => "vlan-del",
            Self::VlanDump => "vlan-dump",
            Self::Other(val) => return write!(f, "reason({val})"),
        };

        write!(f, "{}", s)
    }
}

/// Decode a fixed, NUL-padded interface name field.
pub fn ifname_str(raw: &[u8]) -> Cow<'_, str> {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end])
}
