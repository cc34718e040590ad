// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Functions for printing sideband messages and cache contents.

use std::io::Write;
use tabwriter::TabWriter;
use xeth::IfCache;
use xeth::InterfaceEntry;
use xeth_api::Ifindex;
use xeth_api::LINK_STATS;
use xeth_api::MsgView;

const NETDEV_UP: u32 = 1;
const NETDEV_DOWN: u32 = 2;

/// Print a horizontal rule.
pub fn write_hr(t: &mut impl Write) -> std::io::Result<()> {
    writeln!(t, "{:-<70}", "-")
}

fn opt<T: ToString>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| String::from("-"))
}

/// Print the header for the [`print_entries()`] output.
fn print_entries_header(t: &mut impl Write) -> std::io::Result<()> {
    writeln!(
        t,
        "INDEX\tNAME\tLINK\tMTU\tMAC ADDRESS\tNETNS\tPORT\tTYPE\tFLAGS"
    )
}

/// Print the interface cache.
pub fn print_entries(entries: &[InterfaceEntry]) -> std::io::Result<()> {
    print_entries_into(&mut std::io::stdout(), entries)
}

/// Print the interface cache into a given writer.
pub fn print_entries_into(
    writer: &mut impl Write,
    entries: &[InterfaceEntry],
) -> std::io::Result<()> {
    let mut t = TabWriter::new(writer);
    print_entries_header(&mut t)?;
    write_hr(&mut t)?;
    for e in entries {
        let port = match (e.port_index, e.subport_index) {
            (Some(p), Some(s)) => format!("{p}/{s}"),
            (Some(p), None) => p.to_string(),
            _ => String::from("-"),
        };
        writeln!(
            t,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            opt(e.index),
            e.name,
            opt(e.link_index),
            e.mtu,
            e.hardware_address,
            e.netns,
            port,
            e.device_type,
            e.flags,
        )?;
    }
    t.flush()
}

fn ifname(cache: &IfCache, ifindex: i64) -> String {
    i32::try_from(ifindex)
        .ok()
        .and_then(Ifindex::new)
        .map(|i| cache.indexed(i).name)
        .unwrap_or_else(|| format!("#{ifindex}"))
}

fn stat_name(names: &[impl AsRef<str>], statindex: u64) -> String {
    usize::try_from(statindex)
        .ok()
        .and_then(|i| names.get(i))
        .map(|s| s.as_ref().to_string())
        .unwrap_or_else(|| format!("#{statindex}"))
}

/// One line describing a received message.
///
/// Interface names come from the cache; driver statistic names from
/// `ethtool_stats`.
pub fn format_msg(
    view: &MsgView<'_>,
    cache: &IfCache,
    ethtool_stats: &[String],
) -> String {
    match view {
        MsgView::Break => String::from("break"),

        MsgView::LinkStat(s) => format!(
            "link-stat {} {} {}",
            ifname(cache, s.ifindex.get() as i64),
            stat_name(&LINK_STATS, s.statindex.get()),
            s.count.get(),
        ),

        MsgView::EthtoolStat(s) => format!(
            "ethtool-stat {} {} {}",
            ifname(cache, s.ifindex.get() as i64),
            stat_name(ethtool_stats, s.statindex.get()),
            s.count.get(),
        ),

        MsgView::EthtoolFlags(f) => format!(
            "ethtool-flags {} {:#x}",
            ifname(cache, f.ifindex.get().into()),
            f.flags.get(),
        ),

        MsgView::EthtoolSettings(s) => format!(
            "ethtool-settings {} speed {} duplex {} port {} autoneg {}",
            ifname(cache, s.ifindex.get().into()),
            s.speed.get(),
            s.duplex,
            s.port,
            s.autoneg,
        ),

        MsgView::DumpIfinfo => String::from("dump-ifinfo"),
        MsgView::DumpFibinfo => String::from("dump-fibinfo"),

        MsgView::Carrier(c) => format!(
            "carrier {} {}",
            ifname(cache, c.ifindex.get().into()),
            if c.flag != 0 { "on" } else { "off" },
        ),

        MsgView::Speed(s) => format!(
            "speed {} {}",
            ifname(cache, s.ifindex.get().into()),
            s.mbps.get(),
        ),

        MsgView::Ifinfo(i) => format!(
            "ifinfo {} {} {} {} netns {} {} {}",
            i.ifname(),
            i.ifindex.get(),
            i.reason(),
            i.hardware_address(),
            i.netns(),
            i.device_type(),
            i.flags(),
        ),

        MsgView::Ifa(a) => {
            let event = match a.event.get() {
                NETDEV_UP => String::from("up"),
                NETDEV_DOWN => String::from("down"),
                n => format!("event({n})"),
            };
            format!(
                "ifa {} {} {}/{}",
                ifname(cache, a.ifindex.get().into()),
                event,
                a.address(),
                a.prefix_len(),
            )
        }

        MsgView::Fibentry(fe, nhs) => {
            let mut s = format!(
                "fibentry {}/{} table {} netns {}",
                fe.address(),
                fe.prefix_len(),
                fe.table.get(),
                fe.netns(),
            );
            for nh in nhs.iter() {
                s.push_str(&format!(
                    " via {} dev {} weight {}",
                    nh.gateway(),
                    ifname(cache, nh.ifindex.get().into()),
                    nh.weight.get(),
                ));
            }
            s
        }

        MsgView::NeighUpdate(n) => format!(
            "neigh-update {} {} lladdr {}",
            ifname(cache, n.ifindex.get().into()),
            opt(n.dst()),
            n.lladdr(),
        ),

        MsgView::Frame(f) => format!("frame {} bytes", f.len()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use slog::Discard;
    use slog::Logger;
    use slog::o;
    use std::sync::Arc;
    use xeth::SysInterfaces;
    use xeth_api::MsgKind;
    use xeth_api::MsgStat;
    use xeth_api::MsgView;
    use zerocopy::IntoBytes;

    fn cache() -> IfCache {
        IfCache::new(&Logger::root(Discard, o!()), Arc::new(SysInterfaces))
    }

    #[test]
    fn stat_lines() {
        let c = cache();
        let stats = vec![String::from("port_rx_ok")];

        let msg = MsgStat::new(MsgKind::LinkStat, 0, 23, 5);
        let view = MsgView::parse(msg.as_bytes()).unwrap();
        assert_eq!(
            format_msg(&view, &c, &stats),
            "link-stat #0 rx-nohandler 5"
        );

        let msg = MsgStat::new(MsgKind::EthtoolStat, 0, 0, 9);
        let view = MsgView::parse(msg.as_bytes()).unwrap();
        assert_eq!(
            format_msg(&view, &c, &stats),
            "ethtool-stat #0 port_rx_ok 9"
        );

        let msg = MsgStat::new(MsgKind::EthtoolStat, 0, 4, 9);
        let view = MsgView::parse(msg.as_bytes()).unwrap();
        assert_eq!(format_msg(&view, &c, &stats), "ethtool-stat #0 #4 9");
    }

    #[test]
    fn entries_table() {
        let entries = vec![InterfaceEntry {
            name: String::from("xeth1"),
            index: Ifindex::new(3),
            port_index: Some(1),
            ..Default::default()
        }];
        let mut out = Vec::new();
        print_entries_into(&mut out, &entries).unwrap();
        let out = String::from_utf8(out).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("INDEX"));
        assert!(lines[2].starts_with("3"));
        assert!(lines[2].contains("xeth1"));
        assert!(lines[2].contains("00:00:00:00:00:00"));
        assert!(lines[2].contains("default"));
    }
}
