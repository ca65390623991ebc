//! coursepack CLI: convert OpenCourseWare course dumps into edX OLX.
//!
//! Each input (a course directory or `.zip` dump) becomes an xbundle
//! document, a course directory, or a `.tar.gz` course archive depending on
//! the output path.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
