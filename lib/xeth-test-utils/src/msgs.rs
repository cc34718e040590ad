// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Builders for messages the driver would send.

use xeth_api::DevType;
use xeth_api::IfFlags;
use xeth_api::IfinfoReason;
use xeth_api::MacAddr;
use xeth_api::MsgFibentry;
use xeth_api::MsgHeader;
use xeth_api::MsgIfinfo;
use xeth_api::MsgKind;
use xeth_api::MsgStat;
use xeth_api::NextHop;
use zerocopy::FromZeros;
use zerocopy::IntoBytes;
use zerocopy::byteorder::native_endian::I16;
use zerocopy::byteorder::native_endian::I32;
use zerocopy::byteorder::native_endian::U32;
use zerocopy::byteorder::native_endian::U64;

/// Build an `Ifinfo` message. Port and subport default to "none" and the
/// namespace to the default one.
pub struct IfinfoBuilder {
    msg: MsgIfinfo,
}

impl IfinfoBuilder {
    pub fn new(reason: IfinfoReason, ifindex: i32, name: &str) -> Self {
        let mut msg = MsgIfinfo::new_zeroed();
        msg.header = MsgHeader::new(MsgKind::Ifinfo);
        msg.set_ifname(name);
        msg.ifindex = I32::new(ifindex);
        msg.net = U64::new(1);
        msg.portindex = I16::new(-1);
        msg.subportindex = -1;
        msg.devtype = DevType::LinuxUnknown.into();
        msg.reason = reason.into();
        Self { msg }
    }

    pub fn flags(mut self, flags: IfFlags) -> Self {
        self.msg.flags = U32::new(flags.bits());
        self
    }

    pub fn netns(mut self, net: u64) -> Self {
        self.msg.net = U64::new(net);
        self
    }

    pub fn addr(mut self, mac: MacAddr) -> Self {
        self.msg.addr = mac.bytes();
        self
    }

    pub fn devtype(mut self, dt: DevType) -> Self {
        self.msg.devtype = dt.into();
        self
    }

    pub fn port(mut self, port: i16, subport: i8) -> Self {
        self.msg.portindex = I16::new(port);
        self.msg.subportindex = subport;
        self
    }

    pub fn link(mut self, iflinkindex: i32) -> Self {
        self.msg.iflinkindex = I32::new(iflinkindex);
        self
    }

    pub fn build(self) -> MsgIfinfo {
        self.msg
    }

    pub fn bytes(self) -> Vec<u8> {
        self.msg.as_bytes().to_vec()
    }
}

pub fn ifinfo(reason: IfinfoReason, ifindex: i32, name: &str) -> Vec<u8> {
    IfinfoBuilder::new(reason, ifindex, name).bytes()
}

pub fn header(kind: MsgKind) -> Vec<u8> {
    MsgHeader::new(kind).as_bytes().to_vec()
}

pub fn brk() -> Vec<u8> {
    header(MsgKind::Break)
}

pub fn link_stat(ifindex: u64, statindex: u64, count: u64) -> Vec<u8> {
    MsgStat::new(MsgKind::LinkStat, ifindex, statindex, count)
        .as_bytes()
        .to_vec()
}

/// A `Fibentry` for `addr/prefix` with one next hop per `(ifindex, gw)`.
pub fn fibentry(addr: [u8; 4], prefix: u8, nhs: &[(i32, [u8; 4])]) -> Vec<u8> {
    let mut fe = MsgFibentry::new_zeroed();
    fe.header = MsgHeader::new(MsgKind::Fibentry);
    fe.address = addr;
    fe.mask = u32::MAX
        .checked_shl(32 - u32::from(prefix))
        .unwrap_or(0)
        .to_be_bytes();
    fe.nhs = nhs.len() as u8;

    let mut out = fe.as_bytes().to_vec();
    for (ifindex, gw) in nhs {
        let mut nh = NextHop::new_zeroed();
        nh.ifindex = I32::new(*ifindex);
        nh.weight = I32::new(1);
        nh.gw = *gw;
        out.extend_from_slice(nh.as_bytes());
    }
    out
}

/// A raw exception frame: anything whose reserved header bytes are not
/// all zero.
pub fn frame(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i as u8) | 0x80).collect()
}
