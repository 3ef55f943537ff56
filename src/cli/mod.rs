// src/cli/mod.rs — CLI definition (clap derive)

pub mod run;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "romci",
    about = "Build an Android ROM, report progress to Telegram, upload the result",
    version
)]
pub struct Cli {
    /// Sync sources with `repo sync` before building
    #[arg(short, long)]
    pub sync: bool,

    /// Delete the out/ directory before building
    #[arg(short, long)]
    pub clean: bool,

    /// Clean the device output directory (accepted, currently has no effect)
    #[arg(long = "c-d", visible_alias = "clean-device")]
    pub clean_device: bool,

    /// Config file path
    #[arg(long)]
    pub config: Option<String>,
}
