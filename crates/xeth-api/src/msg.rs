// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Sideband message layouts.
//!
//! Every message starts with a [`MsgHeader`] whose last byte is the
//! [`MsgKind`] discriminator. The remaining payload is a fixed record per
//! kind; [`MsgFibentry`] is additionally followed by `nhs` [`NextHop`]
//! records.
//!
//! The records are built from the `native_endian` integer types so that
//! they have an alignment of one. A view can be taken at any offset of
//! any buffer, and the only thing that can go wrong is length.

use super::ETH_ALEN;
use super::IFNAMSIZ;
use super::ifinfo::DevType;
use super::ifinfo::IfFlags;
use super::ifinfo::Ifindex;
use super::ifinfo::IfinfoReason;
use super::ifinfo::Netns;
use super::ifinfo::ifname_str;
use super::mac::MacAddr;
use super::CarrierState;
use core::fmt;
use core::fmt::Display;
use core::mem::size_of;
use std::borrow::Cow;
use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::net::Ipv6Addr;
use thiserror::Error;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;
use zerocopy::byteorder::native_endian::I16;
use zerocopy::byteorder::native_endian::I32;
use zerocopy::byteorder::native_endian::U16;
use zerocopy::byteorder::native_endian::U32;
use zerocopy::byteorder::native_endian::U64;

/// Address family values carried by [`MsgNeighUpdate`].
pub const AF_INET: u8 = 2;
pub const AF_INET6: u8 = 10;

/// Errors from viewing a buffer as a sideband record.
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
pub enum WireError {
    #[error("malformed {what}: need {need} bytes, have {have}")]
    Malformed { what: &'static str, need: usize, have: usize },

    #[error("unknown message kind {0}")]
    UnknownKind(u8),
}

/// The message kind discriminator.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(u8)]
pub enum MsgKind {
    Break = 0,
    LinkStat = 1,
    EthtoolStat = 2,
    EthtoolFlags = 3,
    EthtoolSettings = 4,
    DumpIfinfo = 5,
    Carrier = 6,
    Speed = 7,
    Ifinfo = 8,
    Ifa = 9,
    DumpFibinfo = 10,
    Fibentry = 11,
    NeighUpdate = 12,
}

impl TryFrom<u8> for MsgKind {
    type Error = WireError;

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        match val {
            0 => Ok(Self::Break),
            1 => Ok(Self::LinkStat),
            2 => Ok(Self::EthtoolStat),
            3 => Ok(Self::EthtoolFlags),
            4 => Ok(Self::EthtoolSettings),
            5 => Ok(Self::DumpIfinfo),
            6 => Ok(Self::Carrier),
            7 => Ok(Self::Speed),
            8 => Ok(Self::Ifinfo),
            9 => Ok(Self::Ifa),
            10 => Ok(Self::DumpFibinfo),
            11 => Ok(Self::Fibentry),
            12 => Ok(Self::NeighUpdate),
            _ => Err(WireError::UnknownKind(val)),
        }
    }
}

impl MsgKind {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// The minimum number of bytes a message of this kind occupies.
    pub fn min_len(self) -> usize {
        match self {
            Self::Break | Self::DumpIfinfo | Self::DumpFibinfo => {
                size_of::<MsgHeader>()
            }
            Self::LinkStat | Self::EthtoolStat => size_of::<MsgStat>(),
            Self::EthtoolFlags => size_of::<MsgEthtoolFlags>(),
            Self::EthtoolSettings => size_of::<MsgEthtoolSettings>(),
            Self::Carrier => size_of::<MsgCarrier>(),
            Self::Speed => size_of::<MsgSpeed>(),
            Self::Ifinfo => size_of::<MsgIfinfo>(),
            Self::Ifa => size_of::<MsgIfa>(),
            Self::Fibentry => size_of::<MsgFibentry>(),
            Self::NeighUpdate => size_of::<MsgNeighUpdate>(),
        }
    }
}

impl Display for MsgKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::Break => "break",
            Self::LinkStat => "link-stat",
            Self::EthtoolStat => "ethtool-stat",
            Self::EthtoolFlags => "ethtool-flags",
            Self::EthtoolSettings => "ethtool-settings",
            Self::DumpIfinfo => "dump-ifinfo",
            Self::Carrier => "carrier",
            Self::Speed => "speed",
            Self::Ifinfo => "ifinfo",
            Self::Ifa => "ifa",
            Self::DumpFibinfo => "dump-fibinfo",
            Self::Fibentry => "fibentry",
            Self::NeighUpdate => "neigh-update",
        };

        write!(f, "{}", s)
    }
}

/// A fixed-layout sideband record.
pub trait Record:
    FromBytes + IntoBytes + KnownLayout + Immutable + Unaligned + Sized
{
    /// Short name used in diagnostics.
    const NAME: &'static str;
}

macro_rules! record {
    ($ty:ty, $name:literal, $size:literal) => {
        impl Record for $ty {
            const NAME: &'static str = $name;
        }

        const _: () = assert!(size_of::<$ty>() == $size);
    };
}

/// The header common to every sideband message.
///
/// The three leading reserved fields are always zero in a message; a
/// buffer where they are not is a raw exception frame.
#[derive(
    Clone, Copy, Debug, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned,
)]
#[repr(C)]
pub struct MsgHeader {
    pub z64: U64,
    pub z32: U32,
    pub z16: U16,
    pub z8: u8,
    pub kind: u8,
}

impl MsgHeader {
    pub fn new(kind: MsgKind) -> Self {
        Self {
            z64: U64::new(0),
            z32: U32::new(0),
            z16: U16::new(0),
            z8: 0,
            kind: kind.as_u8(),
        }
    }

    /// Is this the header of a sideband message rather than a frame?
    pub fn is_msg(&self) -> bool {
        self.z64.get() == 0 && self.z32.get() == 0 && self.z16.get() == 0
    }
}

/// A statistic report or set-stat command.
///
/// Used by both `LinkStat` and `EthtoolStat`; the kind picks which
/// statistic table `statindex` refers to.
#[derive(
    Clone, Copy, Debug, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned,
)]
#[repr(C)]
pub struct MsgStat {
    pub header: MsgHeader,
    pub ifindex: U64,
    pub statindex: U64,
    pub count: U64,
}

impl MsgStat {
    pub fn new(
        kind: MsgKind,
        ifindex: u64,
        statindex: u64,
        count: u64,
    ) -> Self {
        Self {
            header: MsgHeader::new(kind),
            ifindex: U64::new(ifindex),
            statindex: U64::new(statindex),
            count: U64::new(count),
        }
    }
}

#[derive(
    Clone, Copy, Debug, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned,
)]
#[repr(C)]
pub struct MsgEthtoolFlags {
    pub header: MsgHeader,
    pub ifindex: I32,
    pub flags: U32,
}

#[derive(
    Clone, Copy, Debug, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned,
)]
#[repr(C)]
pub struct MsgEthtoolSettings {
    pub header: MsgHeader,
    pub ifindex: I32,
    pub speed: U32,
    pub duplex: u8,
    pub port: u8,
    pub phy_address: u8,
    pub autoneg: u8,
    pub mdio_support: u8,
    pub eth_tp_mdix: u8,
    pub eth_tp_mdix_ctrl: u8,
    pub link_mode_masks_nwords: i8,
    pub link_modes_supported: U64,
    pub link_modes_advertising: U64,
    pub link_modes_lp_advertising: U64,
}

#[derive(
    Clone, Copy, Debug, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned,
)]
#[repr(C)]
pub struct MsgCarrier {
    pub header: MsgHeader,
    pub ifindex: I32,
    pub flag: u8,
    pub pad: [u8; 3],
}

impl MsgCarrier {
    pub fn new(ifindex: Ifindex, state: CarrierState) -> Self {
        Self {
            header: MsgHeader::new(MsgKind::Carrier),
            ifindex: I32::new(ifindex.get()),
            flag: state.as_u8(),
            pad: [0; 3],
        }
    }
}

#[derive(
    Clone, Copy, Debug, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned,
)]
#[repr(C)]
pub struct MsgSpeed {
    pub header: MsgHeader,
    pub ifindex: I32,
    pub mbps: U32,
}

impl MsgSpeed {
    pub fn new(ifindex: Ifindex, mbps: u32) -> Self {
        Self {
            header: MsgHeader::new(MsgKind::Speed),
            ifindex: I32::new(ifindex.get()),
            mbps: U32::new(mbps),
        }
    }
}

/// An interface lifecycle notification.
#[derive(
    Clone, Copy, Debug, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned,
)]
#[repr(C)]
pub struct MsgIfinfo {
    pub header: MsgHeader,
    pub ifname: [u8; IFNAMSIZ],
    pub net: U64,
    pub ifindex: I32,
    pub iflinkindex: I32,
    pub flags: U32,
    pub id: U16,
    pub addr: [u8; ETH_ALEN],
    pub portindex: I16,
    pub subportindex: i8,
    pub devtype: u8,
    pub portid: I16,
    pub reason: u8,
    pub pad: [u8; 5],
}

impl MsgIfinfo {
    /// The interface name, up to the first NUL.
    pub fn ifname(&self) -> Cow<'_, str> {
        ifname_str(&self.ifname)
    }

    /// Copy `name` into the fixed name field, truncating so that a NUL
    /// always remains.
    pub fn set_ifname(&mut self, name: &str) {
        self.ifname = [0; IFNAMSIZ];
        let n = name.len().min(IFNAMSIZ - 1);
        self.ifname[..n].copy_from_slice(&name.as_bytes()[..n]);
    }

    pub fn ifindex(&self) -> Option<Ifindex> {
        Ifindex::new(self.ifindex.get())
    }

    pub fn link_index(&self) -> Option<Ifindex> {
        Ifindex::new(self.iflinkindex.get())
    }

    pub fn flags(&self) -> IfFlags {
        IfFlags::from_bits_retain(self.flags.get())
    }

    pub fn hardware_address(&self) -> MacAddr {
        MacAddr::from(self.addr)
    }

    pub fn netns(&self) -> Netns {
        Netns::from(self.net.get())
    }

    pub fn port_index(&self) -> Option<u16> {
        u16::try_from(self.portindex.get()).ok()
    }

    pub fn subport_index(&self) -> Option<u8> {
        u8::try_from(self.subportindex).ok()
    }

    pub fn device_type(&self) -> DevType {
        DevType::from(self.devtype)
    }

    pub fn reason(&self) -> IfinfoReason {
        IfinfoReason::from(self.reason)
    }
}

/// An IPv4 interface address event.
#[derive(
    Clone, Copy, Debug, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned,
)]
#[repr(C)]
pub struct MsgIfa {
    pub header: MsgHeader,
    pub ifindex: I32,
    pub event: U32,
    pub address: [u8; 4],
    pub mask: [u8; 4],
}

impl MsgIfa {
    pub fn address(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.address)
    }

    pub fn prefix_len(&self) -> u8 {
        mask_prefix_len(self.mask)
    }
}

#[derive(
    Clone, Copy, Debug, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned,
)]
#[repr(C)]
pub struct NextHop {
    pub ifindex: I32,
    pub weight: I32,
    pub flags: U32,
    pub gw: [u8; 4],
    pub scope: u8,
    pub pad: [u8; 7],
}

impl NextHop {
    pub fn gateway(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.gw)
    }
}

/// An IPv4 FIB entry event, followed on the wire by `nhs` [`NextHop`]s.
#[derive(
    Clone, Copy, Debug, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned,
)]
#[repr(C)]
pub struct MsgFibentry {
    pub header: MsgHeader,
    pub net: U64,
    pub address: [u8; 4],
    pub mask: [u8; 4],
    pub event: u8,
    pub nhs: u8,
    pub tos: u8,
    pub route_type: u8,
    pub table: U32,
}

impl MsgFibentry {
    pub fn address(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.address)
    }

    pub fn prefix_len(&self) -> u8 {
        mask_prefix_len(self.mask)
    }

    pub fn netns(&self) -> Netns {
        Netns::from(self.net.get())
    }
}

#[derive(
    Clone, Copy, Debug, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned,
)]
#[repr(C)]
pub struct MsgNeighUpdate {
    pub header: MsgHeader,
    pub net: U64,
    pub ifindex: I32,
    pub family: u8,
    pub len: u8,
    pub reserved: U16,
    pub dst: [u8; 16],
    pub lladdr: [u8; ETH_ALEN],
    pub pad: [u8; 2],
}

impl MsgNeighUpdate {
    /// The neighbor's protocol address, if the family is one we know.
    pub fn dst(&self) -> Option<IpAddr> {
        match self.family {
            AF_INET => {
                let mut v4 = [0u8; 4];
                v4.copy_from_slice(&self.dst[..4]);
                Some(IpAddr::V4(Ipv4Addr::from(v4)))
            }
            AF_INET6 => Some(IpAddr::V6(Ipv6Addr::from(self.dst))),
            _ => None,
        }
    }

    pub fn lladdr(&self) -> MacAddr {
        MacAddr::from(self.lladdr)
    }
}

record!(MsgHeader, "header", 16);
record!(MsgStat, "stat", 40);
record!(MsgEthtoolFlags, "ethtool-flags", 24);
record!(MsgEthtoolSettings, "ethtool-settings", 56);
record!(MsgCarrier, "carrier", 24);
record!(MsgSpeed, "speed", 24);
record!(MsgIfinfo, "ifinfo", 72);
record!(MsgIfa, "ifa", 32);
record!(NextHop, "next-hop", 24);
record!(MsgFibentry, "fibentry", 40);
record!(MsgNeighUpdate, "neigh-update", 56);

/// Size of the largest outbound command, header included.
pub const SIZEOF_CMD: usize = size_of::<MsgStat>();

fn mask_prefix_len(mask: [u8; 4]) -> u8 {
    // A contiguous netmask has no more than 32 ones.
    u32::from_be_bytes(mask).count_ones() as u8
}

/// Return the kind discriminator of `buf`, reading only the header.
pub fn kind_of(buf: &[u8]) -> Result<MsgKind, WireError> {
    MsgKind::try_from(view_as::<MsgHeader>(buf)?.kind)
}

/// View the front of `buf` as a `T` without copying.
pub fn view_as<T: Record>(buf: &[u8]) -> Result<&T, WireError> {
    match T::ref_from_prefix(buf) {
        Ok((rec, _)) => Ok(rec),
        Err(_) => Err(malformed::<T>(buf.len())),
    }
}

/// Mutably view the front of `buf` as a `T`, for building commands in
/// place.
pub fn view_as_mut<T: Record>(buf: &mut [u8]) -> Result<&mut T, WireError> {
    let have = buf.len();
    match T::mut_from_prefix(buf) {
        Ok((rec, _)) => Ok(rec),
        Err(_) => Err(malformed::<T>(have)),
    }
}

fn malformed<T: Record>(have: usize) -> WireError {
    WireError::Malformed { what: T::NAME, need: size_of::<T>(), have }
}

/// A typed, borrowed view of one received buffer.
#[derive(Debug)]
pub enum MsgView<'a> {
    Break,
    LinkStat(&'a MsgStat),
    EthtoolStat(&'a MsgStat),
    EthtoolFlags(&'a MsgEthtoolFlags),
    EthtoolSettings(&'a MsgEthtoolSettings),
    DumpIfinfo,
    Carrier(&'a MsgCarrier),
    Speed(&'a MsgSpeed),
    Ifinfo(&'a MsgIfinfo),
    Ifa(&'a MsgIfa),
    DumpFibinfo,
    Fibentry(&'a MsgFibentry, &'a [NextHop]),
    NeighUpdate(&'a MsgNeighUpdate),

    /// The buffer is not a sideband message but a raw exception frame.
    Frame(&'a [u8]),
}

impl<'a> MsgView<'a> {
    /// Parse `buf` into a view.
    ///
    /// Beyond the header's reserved fields this checks lengths only; the
    /// values are whatever the peer sent.
    pub fn parse(buf: &'a [u8]) -> Result<Self, WireError> {
        let hdr = view_as::<MsgHeader>(buf)?;
        if !hdr.is_msg() {
            return Ok(Self::Frame(buf));
        }

        let view = match MsgKind::try_from(hdr.kind)? {
            MsgKind::Break => Self::Break,
            MsgKind::LinkStat => Self::LinkStat(view_as(buf)?),
            MsgKind::EthtoolStat => Self::EthtoolStat(view_as(buf)?),
            MsgKind::EthtoolFlags => Self::EthtoolFlags(view_as(buf)?),
            MsgKind::EthtoolSettings => Self::EthtoolSettings(view_as(buf)?),
            MsgKind::DumpIfinfo => Self::DumpIfinfo,
            MsgKind::Carrier => Self::Carrier(view_as(buf)?),
            MsgKind::Speed => Self::Speed(view_as(buf)?),
            MsgKind::Ifinfo => Self::Ifinfo(view_as(buf)?),
            MsgKind::Ifa => Self::Ifa(view_as(buf)?),
            MsgKind::DumpFibinfo => Self::DumpFibinfo,
            MsgKind::Fibentry => {
                let fe = view_as::<MsgFibentry>(buf)?;
                let n = usize::from(fe.nhs);
                let rest = &buf[size_of::<MsgFibentry>()..];
                let nhs = match <[NextHop]>::ref_from_prefix_with_elems(rest, n)
                {
                    Ok((nhs, _)) => nhs,
                    Err(_) => {
                        return Err(WireError::Malformed {
                            what: MsgFibentry::NAME,
                            need: size_of::<MsgFibentry>()
                                + n * size_of::<NextHop>(),
                            have: buf.len(),
                        });
                    }
                };
                Self::Fibentry(fe, nhs)
            }
            MsgKind::NeighUpdate => Self::NeighUpdate(view_as(buf)?),
        };

        Ok(view)
    }

    /// The kind of message viewed, or `None` for a raw frame.
    pub fn kind(&self) -> Option<MsgKind> {
        let kind = match self {
            Self::Break => MsgKind::Break,
            Self::LinkStat(_) => MsgKind::LinkStat,
            Self::EthtoolStat(_) => MsgKind::EthtoolStat,
            Self::EthtoolFlags(_) => MsgKind::EthtoolFlags,
            Self::EthtoolSettings(_) => MsgKind::EthtoolSettings,
            Self::DumpIfinfo => MsgKind::DumpIfinfo,
            Self::Carrier(_) => MsgKind::Carrier,
            Self::Speed(_) => MsgKind::Speed,
            Self::Ifinfo(_) => MsgKind::Ifinfo,
            Self::Ifa(_) => MsgKind::Ifa,
            Self::DumpFibinfo => MsgKind::DumpFibinfo,
            Self::Fibentry(..) => MsgKind::Fibentry,
            Self::NeighUpdate(_) => MsgKind::NeighUpdate,
            Self::Frame(_) => return None,
        };

        Some(kind)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use zerocopy::FromZeros;

    fn hdr_bytes(kind: u8) -> Vec<u8> {
        let mut v = vec![0u8; 16];
        v[15] = kind;
        v
    }

    #[test]
    fn header_layout() {
        let hdr = MsgHeader::new(MsgKind::Ifinfo);
        assert_eq!(hdr.as_bytes(), &hdr_bytes(8)[..]);
        assert!(hdr.is_msg());
    }

    #[test]
    fn stat_layout_fixture() {
        let msg = MsgStat::new(MsgKind::EthtoolStat, 3, 7, 0x0102);
        let mut expected = hdr_bytes(2);
        expected.extend_from_slice(&3u64.to_ne_bytes());
        expected.extend_from_slice(&7u64.to_ne_bytes());
        expected.extend_from_slice(&0x0102u64.to_ne_bytes());
        assert_eq!(msg.as_bytes(), &expected[..]);
        assert_eq!(SIZEOF_CMD, 40);
    }

    #[test]
    fn ifinfo_offsets() {
        let mut msg = MsgIfinfo::new_zeroed();
        msg.set_ifname("xeth1-2");
        msg.net = U64::new(1);
        msg.ifindex = I32::new(0x11);
        msg.iflinkindex = I32::new(0x22);
        msg.flags = U32::new(0x1043);
        msg.id = U16::new(0x33);
        msg.addr = [1, 2, 3, 4, 5, 6];
        msg.portindex = I16::new(-1);
        msg.subportindex = 2;
        msg.devtype = 129;
        msg.reason = 6;

        let b = msg.as_bytes();
        assert_eq!(&b[16..23], b"xeth1-2");
        assert_eq!(b[23], 0);
        assert_eq!(&b[32..40], &1u64.to_ne_bytes());
        assert_eq!(&b[40..44], &0x11i32.to_ne_bytes());
        assert_eq!(&b[44..48], &0x22i32.to_ne_bytes());
        assert_eq!(&b[48..52], &0x1043u32.to_ne_bytes());
        assert_eq!(&b[52..54], &0x33u16.to_ne_bytes());
        assert_eq!(&b[54..60], &[1, 2, 3, 4, 5, 6]);
        assert_eq!(&b[60..62], &(-1i16).to_ne_bytes());
        assert_eq!(b[62], 2);
        assert_eq!(b[63], 129);
        assert_eq!(b[66], 6);

        assert_eq!(msg.ifname(), "xeth1-2");
        assert_eq!(msg.port_index(), None);
        assert_eq!(msg.subport_index(), Some(2));
        assert_eq!(msg.reason(), IfinfoReason::Unreg);
        assert_eq!(msg.device_type(), DevType::LinuxBridge);
    }

    #[test]
    fn ifname_truncates_with_nul() {
        let mut msg = MsgIfinfo::new_zeroed();
        msg.set_ifname("a-very-long-interface-name");
        assert_eq!(msg.ifname.len(), IFNAMSIZ);
        assert_eq!(msg.ifname[IFNAMSIZ - 1], 0);
        assert_eq!(msg.ifname(), "a-very-long-int");
    }

    #[test]
    fn kind_of_short_buffer() {
        let buf = [0u8; 15];
        assert_eq!(
            kind_of(&buf),
            Err(WireError::Malformed { what: "header", need: 16, have: 15 })
        );
        assert_eq!(kind_of(&hdr_bytes(11)), Ok(MsgKind::Fibentry));
        assert_eq!(kind_of(&hdr_bytes(200)), Err(WireError::UnknownKind(200)));
    }

    #[test]
    fn view_as_checks_length() {
        let mut buf = hdr_bytes(8);
        buf.resize(71, 0);
        assert!(matches!(
            view_as::<MsgIfinfo>(&buf),
            Err(WireError::Malformed { need: 72, have: 71, .. })
        ));
        buf.push(0);
        assert!(view_as::<MsgIfinfo>(&buf).is_ok());
    }

    #[test]
    fn view_at_odd_offset() {
        let msg = MsgStat::new(MsgKind::LinkStat, 9, 1, 2);
        let mut buf = vec![0xffu8];
        buf.extend_from_slice(msg.as_bytes());
        let v = view_as::<MsgStat>(&buf[1..]).unwrap();
        assert_eq!(v.ifindex.get(), 9);
    }

    #[test]
    fn parse_frame() {
        let buf = [0xaau8; 64];
        assert!(matches!(
            MsgView::parse(&buf),
            Ok(MsgView::Frame(f)) if f.len() == 64
        ));
    }

    #[test]
    fn parse_fibentry_with_next_hops() {
        let mut fe = MsgFibentry::new_zeroed();
        fe.header = MsgHeader::new(MsgKind::Fibentry);
        fe.address = [10, 1, 0, 0];
        fe.mask = [255, 255, 0, 0];
        fe.nhs = 2;

        let mut nh = NextHop::new_zeroed();
        nh.ifindex = I32::new(4);
        nh.gw = [10, 1, 0, 1];

        let mut buf = fe.as_bytes().to_vec();
        buf.extend_from_slice(nh.as_bytes());

        // One next hop short.
        assert!(matches!(
            MsgView::parse(&buf),
            Err(WireError::Malformed { need: 88, have: 64, .. })
        ));

        buf.extend_from_slice(nh.as_bytes());
        let Ok(MsgView::Fibentry(fe, nhs)) = MsgView::parse(&buf) else {
            panic!("expected fibentry");
        };
        assert_eq!(fe.address(), Ipv4Addr::new(10, 1, 0, 0));
        assert_eq!(fe.prefix_len(), 16);
        assert_eq!(nhs.len(), 2);
        assert_eq!(nhs[1].gateway(), Ipv4Addr::new(10, 1, 0, 1));
        assert_eq!(nhs[1].ifindex.get(), 4);
    }

    #[test]
    fn neigh_dst_by_family() {
        let mut n = MsgNeighUpdate::new_zeroed();
        n.family = AF_INET;
        n.dst[..4].copy_from_slice(&[192, 168, 1, 9]);
        assert_eq!(n.dst(), Some("192.168.1.9".parse().unwrap()));
        n.family = 99;
        assert_eq!(n.dst(), None);
    }
}
