//! Shell completions generation.

use std::io;

use anyhow::Result;
use clap::CommandFactory;
use clap_complete::generate;

use super::{Cli, CompletionsArgs};

/// Run the completions command, writing the script to stdout.
pub fn run(args: CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    generate(args.shell, &mut cmd, "gale", &mut io::stdout());
    Ok(())
}
