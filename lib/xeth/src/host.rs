// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! The host's own interface table, consulted when the cache misses.

use ipnetwork::IpNetwork;
use nix::ifaddrs::getifaddrs;
use nix::net::if_::if_nameindex;
use nix::net::if_::if_nametoindex;
use nix::sys::socket::SockaddrStorage;
use std::fs;
use std::net::IpAddr;
use std::net::SocketAddrV4;
use std::net::SocketAddrV6;
use xeth_api::IfFlags;
use xeth_api::Ifindex;
use xeth_api::MacAddr;

/// What the host reports about one interface.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HostInterface {
    pub index: Ifindex,
    pub name: String,
    pub mtu: u32,
    pub flags: IfFlags,
    pub hardware_address: MacAddr,
    pub ip_networks: Vec<IpNetwork>,
}

/// A read-only source of host interfaces.
pub trait HostInterfaces: Send + Sync {
    fn by_index(&self, index: Ifindex) -> Option<HostInterface>;
    fn by_name(&self, name: &str) -> Option<HostInterface>;
}

/// The interfaces visible in this process's network namespace.
#[derive(Clone, Copy, Debug, Default)]
pub struct SysInterfaces;

impl HostInterfaces for SysInterfaces {
    fn by_index(&self, index: Ifindex) -> Option<HostInterface> {
        let want = u32::try_from(index.get()).ok()?;
        let name = if_nameindex()
            .ok()?
            .iter()
            .find(|i| i.index() == want)
            .map(|i| i.name().to_string_lossy().into_owned())?;
        describe(index, name)
    }

    fn by_name(&self, name: &str) -> Option<HostInterface> {
        let index = if_nametoindex(name).ok()?;
        let index = Ifindex::new(i32::try_from(index).ok()?)?;
        describe(index, name.to_string())
    }
}

fn describe(index: Ifindex, name: String) -> Option<HostInterface> {
    let mut ifc = HostInterface {
        index,
        mtu: read_mtu(&name).unwrap_or(1500),
        name,
        flags: IfFlags::empty(),
        hardware_address: MacAddr::ZERO,
        ip_networks: Vec::new(),
    };

    for ifa in getifaddrs().ok()? {
        if ifa.interface_name != ifc.name {
            continue;
        }

        ifc.flags = IfFlags::from_bits_retain(ifa.flags.bits() as u32);

        let Some(addr) = ifa.address.as_ref() else {
            continue;
        };

        if let Some(ll) = addr.as_link_addr() {
            if let Some(mac) = ll.addr() {
                ifc.hardware_address = MacAddr::from(mac);
            }
        } else if let Some(ip) = sockaddr_ip(addr) {
            let net = match ifa.netmask.as_ref().and_then(sockaddr_ip) {
                Some(mask) => IpNetwork::with_netmask(ip, mask).ok(),
                None => IpNetwork::new(ip, max_prefix(ip)).ok(),
            };
            ifc.ip_networks.extend(net);
        }
    }

    Some(ifc)
}

fn sockaddr_ip(sa: &SockaddrStorage) -> Option<IpAddr> {
    if let Some(v4) = sa.as_sockaddr_in() {
        return Some(IpAddr::V4(*SocketAddrV4::from(*v4).ip()));
    }

    sa.as_sockaddr_in6().map(|v6| IpAddr::V6(*SocketAddrV6::from(*v6).ip()))
}

fn max_prefix(ip: IpAddr) -> u8 {
    match ip {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

fn read_mtu(name: &str) -> Option<u32> {
    fs::read_to_string(format!("/sys/class/net/{name}/mtu"))
        .ok()?
        .trim()
        .parse()
        .ok()
}
