use std::path::PathBuf;
use std::process::ExitCode;

use adproxy::config::Configuration;
use adproxy::directory::{Credentials, SearchRequest};
use clap::Parser;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Account used to bind, without domain.
    login: String,
    #[arg(long, short, env = "ADPROXY_PASSWORD", hide_env_values = true)]
    password: String,
    /// Look up another entry by common name, such as a manager.
    #[arg(long, short)]
    name: Option<String>,
    /// Configuration file, `config.yaml` by default.
    #[arg(long, short)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    adproxy::telemetry::setup_logging();
    let args = Args::parse();

    let config = Configuration::default()
        .path(args.config.unwrap_or_default())
        .read();
    let extractor = match adproxy::initialize(&config) {
        Ok(extractor) => extractor,
        Err(err) => {
            tracing::error!(error = %err, "invalid configuration");
            return ExitCode::FAILURE;
        },
    };

    let request = match args.name {
        Some(name) => SearchRequest::named(name),
        None => SearchRequest::own_entry(),
    };
    let credentials = Credentials::new(args.login, args.password);

    let Some((code, profile)) = extractor.fetch(&credentials, &request).await
    else {
        eprintln!("login and password must not be empty");
        return ExitCode::from(64);
    };

    println!("code: {} ({code})", code.value());
    match serde_json::to_string_pretty(&profile) {
        Ok(json) => println!("{json}"),
        Err(err) => tracing::error!(error = %err, "cannot serialize profile"),
    }

    ExitCode::from(code.value())
}
