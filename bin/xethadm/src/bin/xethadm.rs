// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

use std::io;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::bail;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use slog::debug;

use xeth_api::CarrierState;
use xethadm::Config;
use xethadm::XethAdm;
use xethadm::init_logger;
use xethadm::print::format_msg;
use xethadm::print::print_entries;

/// Administer the xeth sideband of a network driver
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// The driver whose sideband to use.
    #[arg(long, global = true)]
    driver: Option<String>,

    /// TOML config file naming the driver and its ethtool statistics.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Set the carrier state of a device.
    Carrier {
        /// An interface name or its ifindex.
        device: String,

        state: CarrierState,
    },

    /// Set the link speed of a device, in Mb/s.
    SetSpeed { device: String, mbps: u32 },

    /// Set an 'ip link' or ethtool statistic of a device.
    SetStat { device: String, stat: String, count: u64 },

    /// Print every record of a driver database.
    Dump { db: Db },

    /// List the driver's interfaces.
    List {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Send an exception frame read from FILE, or from stdin if FILE is `-`.
    Tx { file: PathBuf },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Db {
    Ifinfo,
    Fib,
}

fn show_until_break(adm: &XethAdm) -> anyhow::Result<()> {
    let done = adm.until_break(|msg| {
        match msg.view() {
            Ok(view) => println!(
                "{}",
                format_msg(&view, adm.cache(), adm.ethtool_stats())
            ),
            Err(e) => println!("{e}"),
        }
        Ok(())
    })?;

    if !done {
        bail!("sideband closed before the dump finished");
    }
    Ok(())
}

fn read_frame(file: &Path) -> anyhow::Result<Vec<u8>> {
    if file == Path::new("-") {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf).context("reading stdin")?;
        return Ok(buf);
    }

    std::fs::read(file).with_context(|| format!("reading {}", file.display()))
}

fn run(adm: &mut XethAdm, cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::Carrier { device, state } => {
            let ifindex = adm.device(&device)?;
            adm.set_carrier(ifindex, state)?;
        }

        Command::SetSpeed { device, mbps } => {
            let ifindex = adm.device(&device)?;
            adm.set_speed(ifindex, mbps)?;
        }

        Command::SetStat { device, stat, count } => {
            let ifindex = adm.device(&device)?;
            adm.set_stat(ifindex, &stat, count)?;
        }

        Command::Dump { db } => {
            adm.dump_ifinfo()?;
            show_until_break(adm)?;
            if let Db::Fib = db {
                adm.dump_fibinfo()?;
                show_until_break(adm)?;
            }
        }

        Command::List { json } => {
            if !adm.cache_ifinfo()? {
                bail!("sideband closed before the dump finished");
            }
            let entries = adm.cache().entries();
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                print_entries(&entries)?;
            }
        }

        Command::Tx { file } => {
            let frame = read_frame(&file)?;
            adm.tx_frame(&frame)?;
        }
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let log = init_logger();
    let cfg = Config::load(cli.config.as_deref())?;
    debug!(log, "config";
        "driver" => ?cfg.driver,
        "ethtool_stats" => cfg.ethtool_stats.len(),
    );

    let mut adm = XethAdm::open(&log, cli.driver.as_deref(), &cfg)?;
    let res = run(&mut adm, cli.cmd);
    let closed = adm.shutdown();
    res?;
    Ok(closed?)
}
