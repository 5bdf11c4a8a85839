use clap::Parser;
use std::path::PathBuf;

/// ovend - oven controller daemon for single-board computers
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings document path (default: $XDG_CONFIG_HOME/ovend/settings.yml)
    #[arg(short = 's', long = "settings")]
    pub settings: Option<PathBuf>,

    /// Detach from the terminal and run as a daemon
    #[arg(short = 'd', long = "daemonize", default_value = "false")]
    pub daemonize: bool,
}
