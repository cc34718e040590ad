// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! xeth driver administration library

use anyhow::Context;
use serde::Deserialize;
use slog::Drain;
use slog::Logger;
use slog::o;
use std::ops::Deref;
use std::path::Path;
use xeth::XethHdl;
use xeth_api::Ifindex;

pub mod print;

/// Driver used when neither the command line nor the config names one.
pub const DEFAULT_DRIVER: &str = "platina-mk1";

/// Where to look for a config file when none is given.
pub const DEFAULT_CONFIG: &str = "/etc/xeth/xethadm.toml";

/// Environment variable holding the log filter, e.g. `debug` or
/// `xeth::ifcache=trace`.
pub const LOG_ENV: &str = "XETHADM_LOG";

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub driver: Option<String>,

    /// The driver's ethtool statistic names, in driver order.
    #[serde(default)]
    pub ethtool_stats: Vec<String>,
}

impl Config {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load `path`, or the default config if it exists, or nothing.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p,
            None if Path::new(DEFAULT_CONFIG).exists() => {
                Path::new(DEFAULT_CONFIG)
            }
            None => return Ok(Self::default()),
        };

        let s = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&s).with_context(|| format!("parsing {}", path.display()))
    }
}

/// Build the root logger: terminal output on stderr, filtered by
/// [`LOG_ENV`], info by default.
pub fn init_logger() -> Logger {
    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let mut builder = slog_envlogger::LogBuilder::new(drain);
    if let Ok(s) = std::env::var(LOG_ENV) {
        builder = builder.parse(&s);
    } else {
        builder = builder.filter(None, slog::FilterLevel::Info);
    }
    let drain = slog_async::Async::new(builder.build()).build().fuse();
    Logger::root(drain, o!())
}

/// The handle used to send administration commands to the driver.
pub struct XethAdm {
    hdl: XethHdl,
    ethtool_stats: Vec<String>,
    primed: bool,
}

impl Deref for XethAdm {
    type Target = XethHdl;

    fn deref(&self) -> &Self::Target {
        &self.hdl
    }
}

impl XethAdm {
    pub fn open(
        log: &Logger,
        driver: Option<&str>,
        cfg: &Config,
    ) -> anyhow::Result<Self> {
        let driver =
            driver.or(cfg.driver.as_deref()).unwrap_or(DEFAULT_DRIVER);
        let hdl = XethHdl::open(log, driver, cfg.ethtool_stats.clone())?;
        Ok(Self {
            hdl,
            ethtool_stats: cfg.ethtool_stats.clone(),
            primed: false,
        })
    }

    pub fn ethtool_stats(&self) -> &[String] {
        &self.ethtool_stats
    }

    /// Resolve a DEVICE argument: either an ifindex or an interface name.
    ///
    /// Names are looked up after a full ifinfo dump, done at most once.
    pub fn device(&mut self, dev: &str) -> anyhow::Result<Ifindex> {
        if let Ok(index) = dev.parse::<Ifindex>() {
            return Ok(index);
        }

        if !self.primed {
            self.hdl.cache_ifinfo()?;
            self.primed = true;
        }

        self.hdl
            .cache()
            .named(dev)
            .index
            .with_context(|| format!("DEVICE {dev:?} unknown"))
    }
}
