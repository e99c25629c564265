use std::io::Write;

use certstore::{
    cli::{self, GencrlArgs},
    telemetry,
};
use clap::Parser;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let args = GencrlArgs::parse();
    let crl = cli::run(&args)?;

    // Nothing reaches stdout unless the CRL was fully produced
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&crl)?;
    stdout.flush()?;
    Ok(())
}
