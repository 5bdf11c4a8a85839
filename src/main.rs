use std::fs::File;

use anyhow::{Result, anyhow};
use clap::Parser;
use log::LevelFilter;
use syslog::{BasicLogger, Facility, Formatter3164};

use ovend::{application::Application, cli::Cli, settings::SettingsManager};

fn init_log() -> Result<()> {
    syslog::unix(Formatter3164 {
        facility: Facility::LOG_DAEMON,
        hostname: None,
        process: "ovend".into(),
        pid: 0,
    })
    .map_err(|e| anyhow!("{e}"))
    .and_then(|logger| {
        log::set_boxed_logger(Box::new(BasicLogger::new(logger)))
            .map(|_| log::set_max_level(LevelFilter::Info))
            .map_err(|e| anyhow!("{e}"))
    })
}

fn into_daemon() -> Result<()> {
    File::create("/var/tmp/ovend.log")
        .and_then(|out| Ok((out.try_clone()?, out)))
        .map_err(|e| anyhow!("{e}"))
        .and_then(|(stderr, stdout)| {
            daemonize::Daemonize::new()
                .stdout(stdout)
                .stderr(stderr)
                .start()
                .map_err(|e| anyhow!("{e}"))
        })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_log()?;
    if cli.daemonize {
        into_daemon()?;
    }

    let settings = SettingsManager::load(cli.settings)?;

    Application::builder()
        .with_settings(settings)
        .build()?
        .run()
        .await
}
