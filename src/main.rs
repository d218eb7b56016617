#![allow(clippy::doc_markdown)]
#![doc = include_str!("../README.md")]

mod api;
mod cli;
mod config;
mod dump;
mod prelude;
mod record;
mod tables;
mod tsv;
mod vendor;

use clap::{Parser, crate_version};

use crate::{cli::Args, config::Config, prelude::*};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result {
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .without_time()
        .compact()
        .init();
    info!(version = crate_version!(), "starting…");

    let config = Config::read_from(&args.config)?;
    let reports = dump::run(&config, args.date, args.sources()).await?;
    println!("{}", tables::build_run_table(&reports));
    info!("done!");
    Ok(())
}
