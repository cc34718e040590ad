// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! The interface cache.
//!
//! Interfaces are keyed on both their index and their name. The driver's
//! `Ifinfo` messages drive the entries through their lifecycle; lookups
//! that miss fall back to the host's interface table and then to a
//! placeholder, and whatever they produce is cached.

use crate::host::HostInterface;
use crate::host::HostInterfaces;
use ipnetwork::IpNetwork;
use serde::Serialize;
use slog::Logger;
use slog::debug;
use slog::o;
use slog::warn;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use xeth_api::DevType;
use xeth_api::IfFlags;
use xeth_api::Ifindex;
use xeth_api::IfinfoReason;
use xeth_api::MacAddr;
use xeth_api::MsgIfinfo;
use xeth_api::Netns;

/// Name given to an entry nobody has named yet.
pub const UNKNOWN_NAME: &str = "unknown";

pub const DEFAULT_MTU: u32 = 1500;

/// The cached state of one network device.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct InterfaceEntry {
    pub name: String,
    pub index: Option<Ifindex>,
    pub link_index: Option<Ifindex>,
    pub mtu: u32,
    pub flags: IfFlags,
    pub hardware_address: MacAddr,
    pub netns: Netns,
    pub id: u16,
    pub port_index: Option<u16>,
    pub subport_index: Option<u8>,
    #[serde(serialize_with = "ser_devtype")]
    pub device_type: DevType,
    pub ip_networks: Vec<IpNetwork>,
}

fn ser_devtype<S: serde::Serializer>(
    dt: &DevType,
    s: S,
) -> Result<S::Ok, S::Error> {
    s.collect_str(dt)
}

impl Default for InterfaceEntry {
    fn default() -> Self {
        Self {
            name: UNKNOWN_NAME.to_string(),
            index: None,
            link_index: None,
            mtu: DEFAULT_MTU,
            flags: IfFlags::empty(),
            hardware_address: MacAddr::ZERO,
            netns: Netns::DEFAULT,
            id: 0,
            port_index: None,
            subport_index: None,
            device_type: DevType::LinuxUnknown,
            ip_networks: Vec::new(),
        }
    }
}

/// One input to [`clone_entry`].
#[derive(Clone, Copy, Debug)]
pub enum CloneSource<'a> {
    Ifinfo(&'a MsgIfinfo),
    Host(&'a HostInterface),
    Index(Ifindex),
    Name(&'a str),
    HwAddr(MacAddr),
    Flags(IfFlags),
    Netns(Netns),
}

/// Build an entry from the defaults and then each source in turn. A later
/// source overwrites whatever fields an earlier one set.
pub fn clone_entry(sources: &[CloneSource<'_>]) -> InterfaceEntry {
    let mut entry = InterfaceEntry::default();

    for src in sources {
        match *src {
            CloneSource::Ifinfo(msg) => {
                entry.index = msg.ifindex();
                entry.name = msg.ifname().into_owned();
                entry.hardware_address = msg.hardware_address();
                entry.flags = msg.flags();
                entry.netns = msg.netns();
                entry.link_index = msg.link_index();
                entry.id = msg.id.get();
                entry.port_index = msg.port_index();
                entry.subport_index = msg.subport_index();
                entry.device_type = msg.device_type();
            }

            CloneSource::Host(h) => {
                entry.index = Some(h.index);
                entry.mtu = h.mtu;
                entry.name = h.name.clone();
                entry.hardware_address = h.hardware_address;
                entry.flags = h.flags;
                entry.ip_networks = h.ip_networks.clone();
            }

            CloneSource::Index(index) => entry.index = Some(index),
            CloneSource::Name(name) => entry.name = name.to_string(),
            CloneSource::HwAddr(mac) => entry.hardware_address = mac,
            CloneSource::Flags(flags) => entry.flags = flags,
            CloneSource::Netns(netns) => entry.netns = netns,
        }
    }

    entry
}

/// What applying one `Ifinfo` message did to the cache.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CacheUpdate {
    /// The message carried no usable ifindex.
    Rejected,
    Created(InterfaceEntry),
    /// A `new` for a live index replaced the old entry.
    Replaced(InterfaceEntry),
    Updated(InterfaceEntry),
    /// The entry as it was removed, hardware address cleared.
    Deleted(InterfaceEntry),
    Unchanged,
}

/// The directories. Named entries live in the name directory and the
/// index directory points at their names. Index-only placeholders all
/// share [`UNKNOWN_NAME`], so they are kept apart, keyed on index.
#[derive(Default)]
struct IfMap {
    index: BTreeMap<Ifindex, String>,
    names: BTreeMap<String, InterfaceEntry>,
    placeholders: BTreeMap<Ifindex, InterfaceEntry>,
}

fn placeholder_index(entry: &InterfaceEntry) -> Option<Ifindex> {
    entry.index.filter(|_| entry.name == UNKNOWN_NAME)
}

impl IfMap {
    fn get_by_index(&self, index: Ifindex) -> Option<&InterfaceEntry> {
        match self.index.get(&index) {
            Some(name) => self.names.get(name),
            None => self.placeholders.get(&index),
        }
    }

    fn get_by_index_mut(
        &mut self,
        index: Ifindex,
    ) -> Option<&mut InterfaceEntry> {
        match self.index.get(&index) {
            Some(name) => self.names.get_mut(name),
            None => self.placeholders.get_mut(&index),
        }
    }

    /// Insert `entry`, displacing whatever conflicts with its index or
    /// name.
    fn insert(&mut self, entry: InterfaceEntry) {
        if let Some(index) = entry.index {
            self.remove_index(index);
        }

        if let Some(index) = placeholder_index(&entry) {
            self.placeholders.insert(index, entry);
            return;
        }

        let other = self.names.remove(&entry.name);
        if let Some(other_index) = other.and_then(|o| o.index) {
            self.index.remove(&other_index);
        }

        if let Some(index) = entry.index {
            self.index.insert(index, entry.name.clone());
        }
        self.names.insert(entry.name.clone(), entry);
    }

    fn remove_index(&mut self, index: Ifindex) -> Option<InterfaceEntry> {
        match self.index.remove(&index) {
            Some(name) => self.names.remove(&name),
            None => self.placeholders.remove(&index),
        }
    }

    fn len(&self) -> usize {
        self.names.len() + self.placeholders.len()
    }
}

/// The interface cache.
pub struct IfCache {
    log: Logger,
    host: Arc<dyn HostInterfaces>,
    map: Mutex<IfMap>,
}

impl IfCache {
    pub fn new(log: &Logger, host: Arc<dyn HostInterfaces>) -> Self {
        Self {
            log: log.new(o!("component" => "ifcache")),
            host,
            map: Mutex::new(IfMap::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, IfMap> {
        self.map.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up an interface by index, creating it on a miss.
    pub fn indexed(&self, index: Ifindex) -> InterfaceEntry {
        if let Some(entry) = self.get_by_index(index) {
            return entry;
        }

        let entry = match self.host.by_index(index) {
            Some(h) => {
                clone_entry(&[CloneSource::Host(&h), CloneSource::Index(index)])
            }
            None => clone_entry(&[CloneSource::Index(index)]),
        };

        let mut map = self.lock();
        if let Some(raced) = map.get_by_index(index) {
            return raced.clone();
        }
        debug!(self.log, "cached on lookup";
            "ifindex" => %index,
            "name" => &entry.name,
        );
        map.insert(entry.clone());
        entry
    }

    /// Look up an interface by name, creating it on a miss.
    pub fn named(&self, name: &str) -> InterfaceEntry {
        if let Some(entry) = self.get_by_name(name) {
            return entry;
        }

        let entry = match self.host.by_name(name) {
            Some(h) => {
                clone_entry(&[CloneSource::Host(&h), CloneSource::Name(name)])
            }
            None => clone_entry(&[CloneSource::Name(name)]),
        };

        let mut map = self.lock();
        if let Some(raced) = map.names.get(name) {
            return raced.clone();
        }
        debug!(self.log, "cached on lookup"; "name" => name);
        map.insert(entry.clone());
        entry
    }

    pub fn get_by_index(&self, index: Ifindex) -> Option<InterfaceEntry> {
        self.lock().get_by_index(index).cloned()
    }

    pub fn get_by_name(&self, name: &str) -> Option<InterfaceEntry> {
        self.lock().names.get(name).cloned()
    }

    /// Every cached entry, in name order.
    pub fn entries(&self) -> Vec<InterfaceEntry> {
        let map = self.lock();
        let mut entries: Vec<_> = map
            .names
            .values()
            .chain(map.placeholders.values())
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run one `Ifinfo` message through the lifecycle state machine.
    pub fn apply(&self, msg: &MsgIfinfo) -> CacheUpdate {
        let reason = msg.reason();
        let Some(index) = msg.ifindex() else {
            warn!(
                self.log,
                "ifinfo with invalid ifindex";
                "ifindex" => msg.ifindex.get(),
                "reason" => %reason,
            );
            return CacheUpdate::Rejected;
        };

        let mut map = self.lock();
        let live = map.get_by_index(index).is_some();

        let update = match (reason, live) {
            (IfinfoReason::New, false) => {
                let entry = clone_entry(&[CloneSource::Ifinfo(msg)]);
                map.insert(entry.clone());
                CacheUpdate::Created(entry)
            }

            (IfinfoReason::New, true) => {
                let entry = clone_entry(&[CloneSource::Ifinfo(msg)]);
                map.insert(entry.clone());
                CacheUpdate::Replaced(entry)
            }

            (IfinfoReason::Del, true) => match map.remove_index(index) {
                Some(mut entry) => {
                    entry.hardware_address = MacAddr::ZERO;
                    CacheUpdate::Deleted(entry)
                }
                None => CacheUpdate::Unchanged,
            },

            (IfinfoReason::Up | IfinfoReason::Down, true) => {
                match map.get_by_index_mut(index) {
                    Some(entry) => {
                        entry.flags = msg.flags();
                        CacheUpdate::Updated(entry.clone())
                    }
                    None => CacheUpdate::Unchanged,
                }
            }

            (IfinfoReason::Reg, true) => match map.get_by_index_mut(index) {
                Some(entry) => {
                    entry.netns = msg.netns();
                    CacheUpdate::Updated(entry.clone())
                }
                None => CacheUpdate::Unchanged,
            },

            (IfinfoReason::Unreg, true) => match map.get_by_index_mut(index) {
                Some(entry) => {
                    entry.netns = Netns::DEFAULT;
                    CacheUpdate::Updated(entry.clone())
                }
                None => CacheUpdate::Unchanged,
            },

            (
                IfinfoReason::Up
                | IfinfoReason::Down
                | IfinfoReason::Dump
                | IfinfoReason::Reg,
                false,
            ) => {
                let entry = clone_entry(&[CloneSource::Ifinfo(msg)]);
                map.insert(entry.clone());
                CacheUpdate::Created(entry)
            }

            // Already known; a dump carries nothing we act on.
            (IfinfoReason::Dump, true) => CacheUpdate::Unchanged,

            (IfinfoReason::Del | IfinfoReason::Unreg, false) => {
                CacheUpdate::Unchanged
            }

            (
                IfinfoReason::VlanAdd
                | IfinfoReason::VlanDel
                | IfinfoReason::VlanDump
                | IfinfoReason::Other(_),
                _,
            ) => CacheUpdate::Unchanged,
        };
        drop(map);

        if update != CacheUpdate::Unchanged {
            debug!(
                self.log,
                "ifinfo applied";
                "ifindex" => %index,
                "reason" => %reason,
                "update" => ?update,
            );
        }

        update
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use slog::Discard;
    use zerocopy::FromZeros;
    use zerocopy::byteorder::native_endian::I32;
    use zerocopy::byteorder::native_endian::U32;
    use zerocopy::byteorder::native_endian::U64;

    struct NoHost;

    impl HostInterfaces for NoHost {
        fn by_index(&self, _: Ifindex) -> Option<HostInterface> {
            None
        }

        fn by_name(&self, _: &str) -> Option<HostInterface> {
            None
        }
    }

    fn cache() -> IfCache {
        IfCache::new(&Logger::root(Discard, o!()), Arc::new(NoHost))
    }

    fn idx(i: i32) -> Ifindex {
        Ifindex::new(i).unwrap()
    }

    fn ifinfo(reason: IfinfoReason, index: i32, name: &str) -> MsgIfinfo {
        let mut msg = MsgIfinfo::new_zeroed();
        msg.header = xeth_api::MsgHeader::new(xeth_api::MsgKind::Ifinfo);
        msg.set_ifname(name);
        msg.ifindex = I32::new(index);
        msg.net = U64::new(1);
        msg.addr = [2, 0, 0, 0, 0, index as u8];
        msg.reason = reason.into();
        msg
    }

    #[test]
    fn clone_defaults() {
        let e = clone_entry(&[]);
        assert_eq!(e.name, "unknown");
        assert_eq!(e.mtu, 1500);
        assert_eq!(e.netns, Netns::DEFAULT);
        assert_eq!(e.device_type, DevType::LinuxUnknown);
        assert_eq!(e.port_index, None);
        assert_eq!(e.subport_index, None);
        assert!(e.hardware_address.is_zero());
    }

    #[test]
    fn clone_later_sources_win() {
        let msg = ifinfo(IfinfoReason::New, 4, "eth4");
        let e = clone_entry(&[
            CloneSource::Name("first"),
            CloneSource::Ifinfo(&msg),
            CloneSource::Netns(Netns::from(77)),
        ]);
        assert_eq!(e.name, "eth4");
        assert_eq!(e.index, Some(idx(4)));
        assert_eq!(e.netns, Netns::from(77));
    }

    #[test]
    fn state_machine_absent() {
        let c = cache();
        assert_eq!(
            c.apply(&ifinfo(IfinfoReason::Del, 1, "a")),
            CacheUpdate::Unchanged
        );
        assert_eq!(
            c.apply(&ifinfo(IfinfoReason::Unreg, 1, "a")),
            CacheUpdate::Unchanged
        );
        assert_eq!(
            c.apply(&ifinfo(IfinfoReason::VlanAdd, 1, "a")),
            CacheUpdate::Unchanged
        );
        assert!(c.is_empty());

        for (i, r) in [
            IfinfoReason::New,
            IfinfoReason::Up,
            IfinfoReason::Down,
            IfinfoReason::Dump,
            IfinfoReason::Reg,
        ]
        .into_iter()
        .enumerate()
        {
            let i = i as i32 + 10;
            let name = format!("eth{i}");
            let mut msg = ifinfo(r, i, &name);
            msg.net = U64::new(4026532100 + i as u64);
            assert!(matches!(c.apply(&msg), CacheUpdate::Created(_)));
            let e = c.get_by_index(idx(i)).unwrap();
            assert_eq!(e.name, name);
            assert_eq!(e.netns.get(), 4026532100 + i as u64);
        }
        assert_eq!(c.len(), 5);
    }

    #[test]
    fn state_machine_live() {
        let c = cache();
        c.apply(&ifinfo(IfinfoReason::New, 5, "eth5"));

        let mut up = ifinfo(IfinfoReason::Up, 5, "eth5");
        up.flags = U32::new((IfFlags::UP | IfFlags::RUNNING).bits());
        let CacheUpdate::Updated(e) = c.apply(&up) else {
            panic!("expected update");
        };
        assert_eq!(e.flags, IfFlags::UP | IfFlags::RUNNING);

        let mut reg = ifinfo(IfinfoReason::Reg, 5, "eth5");
        reg.net = U64::new(4026532000);
        let CacheUpdate::Updated(e) = c.apply(&reg) else {
            panic!("expected update");
        };
        assert_eq!(e.netns.get(), 4026532000);
        assert_eq!(e.flags, IfFlags::UP | IfFlags::RUNNING);

        // A dump of a known entry leaves it alone.
        let mut dump = ifinfo(IfinfoReason::Dump, 5, "eth5");
        dump.net = U64::new(9);
        assert_eq!(c.apply(&dump), CacheUpdate::Unchanged);
        assert_eq!(c.indexed(idx(5)).netns.get(), 4026532000);

        let CacheUpdate::Updated(e) =
            c.apply(&ifinfo(IfinfoReason::Unreg, 5, "eth5"))
        else {
            panic!("expected update");
        };
        assert_eq!(e.netns, Netns::DEFAULT);
        assert_eq!(e.index, Some(idx(5)));
        assert_eq!(e.name, "eth5");

        let CacheUpdate::Deleted(e) =
            c.apply(&ifinfo(IfinfoReason::Del, 5, "eth5"))
        else {
            panic!("expected delete");
        };
        assert!(e.hardware_address.is_zero());
        assert!(c.get_by_index(idx(5)).is_none());
        assert!(c.get_by_name("eth5").is_none());
    }

    #[test]
    fn up_is_idempotent() {
        let c = cache();
        c.apply(&ifinfo(IfinfoReason::New, 2, "eth2"));
        let mut up = ifinfo(IfinfoReason::Up, 2, "eth2");
        up.flags = U32::new(IfFlags::UP.bits());
        let a = c.apply(&up);
        let b = c.apply(&up);
        assert_eq!(a, b);
    }

    #[test]
    fn new_on_live_replaces() {
        let c = cache();
        c.apply(&ifinfo(IfinfoReason::New, 3, "old3"));
        let update = c.apply(&ifinfo(IfinfoReason::New, 3, "new3"));
        assert!(matches!(
            update,
            CacheUpdate::Replaced(ref e) if e.name == "new3"
        ));
        assert!(c.get_by_name("old3").is_none());
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn name_conflict_evicts_other_index() {
        let c = cache();
        c.apply(&ifinfo(IfinfoReason::New, 3, "eth"));
        c.apply(&ifinfo(IfinfoReason::New, 4, "eth"));
        assert!(c.get_by_index(idx(3)).is_none());
        assert_eq!(c.get_by_name("eth").unwrap().index, Some(idx(4)));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn invalid_ifindex_rejected() {
        let c = cache();
        assert_eq!(
            c.apply(&ifinfo(IfinfoReason::New, 0, "zero")),
            CacheUpdate::Rejected
        );
        assert_eq!(
            c.apply(&ifinfo(IfinfoReason::New, -2, "neg")),
            CacheUpdate::Rejected
        );
        assert!(c.is_empty());
    }

    #[test]
    fn lookup_placeholders() {
        let c = cache();
        let e = c.indexed(idx(9));
        assert_eq!(e.index, Some(idx(9)));
        assert_eq!(e.name, "unknown");
        assert_eq!(c.get_by_index(idx(9)), Some(e));

        let e = c.named("ghost0");
        assert_eq!(e.index, None);
        assert_eq!(c.get_by_name("ghost0"), Some(e));
    }

    #[test]
    fn placeholders_stay_cached() {
        let c = cache();
        assert_eq!(c.indexed(idx(9)).name, "unknown");
        assert_eq!(c.indexed(idx(10)).name, "unknown");
        assert_eq!(c.get_by_index(idx(9)).unwrap().index, Some(idx(9)));
        assert_eq!(c.get_by_index(idx(10)).unwrap().index, Some(idx(10)));
        assert_eq!(c.len(), 2);

        // A placeholder tracks the lifecycle like any entry.
        let mut up = ifinfo(IfinfoReason::Up, 9, "unknown");
        up.flags = U32::new(IfFlags::UP.bits());
        assert!(matches!(c.apply(&up), CacheUpdate::Updated(_)));
        assert_eq!(c.indexed(idx(9)).flags, IfFlags::UP);

        // Naming the index replaces its placeholder.
        c.apply(&ifinfo(IfinfoReason::New, 10, "eth10"));
        assert_eq!(c.indexed(idx(10)).name, "eth10");
        assert_eq!(c.len(), 2);

        assert!(matches!(
            c.apply(&ifinfo(IfinfoReason::Del, 9, "unknown")),
            CacheUpdate::Deleted(_)
        ));
        assert!(c.get_by_index(idx(9)).is_none());
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn new_claims_name_placeholder() {
        let c = cache();
        c.named("eth7");
        c.apply(&ifinfo(IfinfoReason::New, 7, "eth7"));
        assert_eq!(c.named("eth7").index, Some(idx(7)));
        assert_eq!(c.len(), 1);
    }
}
