//! Command-line arguments (§6 CLI), parsed with `clap`'s derive API —
//! the same builder family the teacher's `main.rs` used, updated to the
//! derive style current `clap` favors.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "kplexrs", about = "Any-to-any multiplexer for NMEA-0183 sentence streams")]
pub struct Cli {
    /// Run detached from the controlling terminal.
    #[arg(short = 'b')]
    pub background: bool,

    /// Syslog facility to log to.
    #[arg(short = 'l', value_name = "FACILITY")]
    pub logto: Option<String>,

    /// Central queue size (minimum 2).
    #[arg(short = 'q', value_name = "SIZE")]
    pub qsize: Option<usize>,

    /// Configuration file path. `-f-` disables config-file loading.
    #[arg(short = 'f', value_name = "PATH")]
    pub config_path: Option<String>,

    /// Inline endpoint specs: `type:key=value,key=value,...`
    pub inline: Vec<String>,
}
