use anyhow::{Context, Result};
use clap::Parser;

use conjur_authn_client::auth;
use conjur_authn_client::config::{self, CliArgs, Config, Settings};

fn main() -> Result<()> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    let args = CliArgs::parse();
    init_logging(&args.log_level, args.json_logs);

    // File values first, environment overrides
    let mut settings = match &args.settings_file {
        Some(path) => config::load_settings_file(&config::expand_tilde(path))?,
        None => Settings::new(),
    };
    settings.merge(Settings::from_env());
    tracing::debug!("Loaded {} settings", settings.len());

    let config = match Config::from_settings(&settings, auth::read_file) {
        Ok(config) => config,
        Err(e) => {
            for err in e.into_errors() {
                tracing::error!("❌ {}", err);
            }
            anyhow::bail!("Settings are not valid for authentication");
        }
    };

    tracing::info!("✅ Settings valid for {} authentication", config.authn_type);
    tracing::info!("Authenticator URL: {}", config.url);
    tracing::info!("Token file: {}", config.token_file_path.display());
    if let Some(ref jwt_path) = config.jwt_token_path {
        tracing::info!("JWT token path: {}", jwt_path.display());
    }
    tracing::info!(
        "Token timeout: {}, client cert retry limit: {}",
        humantime::format_duration(config.token_timeout),
        config.client_cert_retry_count_limit
    );

    let summary = serde_json::json!({
        "authenticator": config.authn_type.to_string(),
        "account": config.account,
        "login": config.username.as_ref().map(|u| u.full().to_string()),
        "ssl_certificate_bytes": config.ssl_certificate.len(),
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).context("Failed to render summary")?
    );

    Ok(())
}

fn init_logging(log_level: &str, json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level.to_lowercase()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
