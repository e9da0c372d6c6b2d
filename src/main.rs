use anyhow::{Context, Result};
use clap::Parser;
use log::debug;
use pnet::util::MacAddr;

use crate::args::{Args, Config};
use crate::decode::hexdump;

fn init_logging(level: log::LevelFilter) {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Warn)
        .filter_module(module_path!(), level)
        .parse_default_env()
        .init();
}

fn dry_run(config: &Config) -> Result<()> {
    let src_mac = config.probe.src_mac.unwrap_or_else(MacAddr::zero);
    let (wire, summary) = send::craft(config, src_mac).context("failed to build the probe")?;
    if config.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{summary}");
        print!("{}", hexdump(&wire));
    }
    Ok(())
}

pub fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level());
    let config = Config::from(args);
    debug!("{:?}", config);

    if config.dry_run {
        return dry_run(&config);
    }

    let report = send::run(&config)
        .with_context(|| format!("failed to send probe on {}", config.iface))?;
    if config.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.frame);
        println!("Sent {} packets.", report.sent);
    }
    Ok(())
}

mod args;
mod common;
mod craft;
mod decode;
mod error;
mod iface;
mod send;
