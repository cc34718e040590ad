// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Statistic name resolution for the set-stat command.

use super::msg::MsgKind;

/// The built-in link statistics, in `rtnl_link_stats64` order. A name's
/// position is its wire `statindex`.
pub const LINK_STATS: [&str; 24] = [
    "rx-packets",
    "tx-packets",
    "rx-bytes",
    "tx-bytes",
    "rx-errors",
    "tx-errors",
    "rx-dropped",
    "tx-dropped",
    "multicast",
    "collisions",
    "rx-length-errors",
    "rx-over-errors",
    "rx-crc-errors",
    "rx-frame-errors",
    "rx-fifo-errors",
    "rx-missed-errors",
    "tx-aborted-errors",
    "tx-carrier-errors",
    "tx-fifo-errors",
    "tx-heartbeat-errors",
    "tx-window-errors",
    "rx-compressed",
    "tx-compressed",
    "rx-nohandler",
];

/// Map `_` and `.` to `-`, so `rx_packets` and `rx.packets` name the
/// same statistic as `rx-packets`.
pub fn normalize_stat_name(name: &str) -> String {
    name.replace(['_', '.'], "-")
}

/// Resolve `name` to the message kind and statistic index to send.
///
/// The built-in link statistics take precedence over the driver's
/// `ethtool` list. Both `name` and the list entries are normalized before
/// comparison.
pub fn resolve_stat<S: AsRef<str>>(
    name: &str,
    ethtool_stats: &[S],
) -> Option<(MsgKind, u64)> {
    let name = normalize_stat_name(name);

    if let Some(i) = LINK_STATS.iter().position(|s| *s == name) {
        return Some((MsgKind::LinkStat, i as u64));
    }

    ethtool_stats
        .iter()
        .position(|s| normalize_stat_name(s.as_ref()) == name)
        .map(|i| (MsgKind::EthtoolStat, i as u64))
}
