// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

use ipnetwork::IpNetwork;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use xeth::HostInterface;
use xeth::HostInterfaces;
use xeth_api::IfFlags;
use xeth_api::Ifindex;
use xeth_api::MacAddr;

/// A host interface table with fixed contents that counts how often it
/// is asked.
#[derive(Default)]
pub struct ScriptedHost {
    ifaces: Vec<HostInterface>,
    queries: AtomicUsize,
}

impl ScriptedHost {
    pub fn with(mut self, iface: HostInterface) -> Self {
        self.ifaces.push(iface);
        self
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }
}

impl HostInterfaces for ScriptedHost {
    fn by_index(&self, index: Ifindex) -> Option<HostInterface> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        self.ifaces.iter().find(|i| i.index == index).cloned()
    }

    fn by_name(&self, name: &str) -> Option<HostInterface> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        self.ifaces.iter().find(|i| i.name == name).cloned()
    }
}

/// A plausible host interface.
pub fn host_iface(index: i32, name: &str, net: &str) -> HostInterface {
    HostInterface {
        index: Ifindex::new(index).expect("positive ifindex"),
        name: name.to_string(),
        mtu: 9000,
        flags: IfFlags::UP | IfFlags::BROADCAST | IfFlags::RUNNING,
        hardware_address: MacAddr::from_const([0x02, 0, 0, 0, 0, index as u8]),
        ip_networks: vec![net.parse::<IpNetwork>().expect("valid network")],
    }
}
