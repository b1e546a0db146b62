use crate::error::ExportError;
use crate::exporter::Exporter;
use crate::http_client::{Session, VendorClient};

mod config;
mod csv;
mod error;
mod exporter;
mod http_client;
mod records;

// One request at a time, one write at the end: nothing here needs more
// than a current-thread runtime.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        // Diagnostics go to stderr; stdout is reserved for the CSV.
        eprintln!("error: {e}");

        if e.is_auth_failure() {
            eprintln!();
            eprintln!("The vendor rejected the session, which usually means the cookie");
            eprintln!("has expired. To get a fresh one:");
            eprintln!();
            eprintln!("   1. Switch your browser's User-Agent to a mobile one");
            eprintln!("      (a user-agent switcher extension set to iOS / Chrome)");
            eprintln!("   2. Log in at www.1mg.com and open the /health-record page");
            eprintln!("   3. Copy the Cookie header from any authenticated request");
            eprintln!("      in the network inspector");
            eprintln!("   4. Re-run with --cookie '<value>'");
        }

        std::process::exit(e.exit_code());
    }
}

async fn run() -> Result<(), ExportError> {
    // Load configuration first (for log level); prompts for missing
    // session details happen before logging is up
    let config = config::Config::load()?;
    config.validate()?;

    // Initialize logging with the configured level. Everything is written
    // to stderr so a piped stdout receives only the CSV.
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!(
        reports = config.report_ids.len(),
        records_path = %config.records_path,
        "starting export"
    );

    let session = Session {
        cookie: config.cookie.clone(),
        member_id: config.member_id.clone(),
    };

    let client = VendorClient::new(
        config.base_url.clone(),
        session,
        &config.user_agent,
        config.http_connect_timeout,
        config.http_request_timeout,
    )?;

    let exporter = Exporter::new(client, config.records_path.clone(), config.fields.clone());

    let document = exporter.export(&config.report_ids).await?;

    exporter::write_output(config.out.as_deref(), &document)?;

    match &config.out {
        Some(path) => tracing::info!(path = %path.display(), "CSV written"),
        None => tracing::info!("CSV written to stdout"),
    }

    Ok(())
}
