#![forbid(unsafe_code)]

mod cli;
mod commands;
mod db_url;
mod study;

use std::sync::Arc;

use clap::Parser;
use services::{AppServices, Clock, MemoryNotifier};

use crate::cli::Cli;
use crate::db_url::{normalize_sqlite_url, prepare_sqlite_file};

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Storage only ever sees an absolute URL whose file already exists.
    let db_url = normalize_sqlite_url(&cli.db)?;
    prepare_sqlite_file(&db_url)?;

    let notices = MemoryNotifier::new();
    let app = AppServices::new_sqlite(
        &db_url,
        Clock::system(),
        cli.user,
        Arc::new(notices.clone()),
    )
    .await?;
    if app.created_profile() {
        log::info!("using new learner profile {}", app.user());
    }

    let mut out = std::io::stdout();
    commands::dispatch(&app, &notices, cli.command, &mut out).await
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
