//! Tollgate API server binary.
//!
//! Reads configuration from flags or the environment (a `.env` file is
//! honoured), wires the in-memory user store into the API and serves until
//! Ctrl-C.

use std::sync::Arc;

use axum::http::StatusCode;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tollgate_api::config::{ApiConfig, ErrorPolicy};
use tollgate_core::clock::SystemClock;
use tollgate_core::config::{AuthConfig, ConfigError};
use tollgate_core::password::DEFAULT_BCRYPT_COST;
use tollgate_core::repository::InMemoryUserRepository;
use tracing::{info, warn};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "tollgate_api_server", about = "Tollgate API server")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:8080")]
    bind_addr: String,

    /// HMAC secret used to sign access and refresh tokens.
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,

    /// Id of the single registered OAuth2 client.
    #[arg(long, env = "OAUTH2_CLIENT_ID")]
    client_id: String,

    /// Secret of the single registered OAuth2 client.
    #[arg(long, env = "OAUTH2_CLIENT_SECRET", hide_env_values = true)]
    client_secret: String,

    /// Emails that receive the admin role on registration (comma separated).
    #[arg(long, env = "ADMIN_EMAILS", value_delimiter = ',')]
    admin_emails: Vec<String>,

    /// bcrypt cost factor for password hashes.
    #[arg(long, env = "BCRYPT_COST", default_value_t = DEFAULT_BCRYPT_COST)]
    bcrypt_cost: u32,

    /// HTTP status for internal failures.
    #[arg(long, env = "UNCLASSIFIED_ERROR_STATUS", default_value_t = 500)]
    unclassified_error_status: u16,

    /// Include internal error detail in responses. Debug only.
    #[arg(long, env = "EXPOSE_INTERNAL_ERRORS", default_value_t = false)]
    expose_internal_errors: bool,
}

impl Args {
    fn into_config(self) -> Result<ApiConfig, ConfigError> {
        let fallback_status = StatusCode::from_u16(self.unclassified_error_status)
            .ok()
            .filter(|s| s.is_client_error() || s.is_server_error())
            .ok_or_else(|| ConfigError::Invalid {
                name: "UNCLASSIFIED_ERROR_STATUS",
                reason: format!("{} is not an error status", self.unclassified_error_status),
            })?;

        let admin_emails = self
            .admin_emails
            .iter()
            .map(|e| e.trim())
            .filter(|e| !e.is_empty())
            .map(str::to_owned)
            .collect::<Vec<_>>();

        let auth = AuthConfig::new(self.jwt_secret, self.client_id, self.client_secret)
            .with_admin_emails(admin_emails)
            .with_bcrypt_cost(self.bcrypt_cost);
        auth.validate()?;

        Ok(ApiConfig {
            bind_addr: self.bind_addr,
            auth,
            errors: ErrorPolicy {
                fallback_status,
                expose_internal: self.expose_internal_errors,
            },
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,tollgate_api=debug,tollgate_core=debug")
            }),
        )
        .init();

    let config = Args::parse().into_config()?;
    if config.errors.expose_internal {
        warn!("internal error details are exposed to clients");
    }
    info!(
        bind_addr = %config.bind_addr,
        fallback_status = config.errors.fallback_status.as_u16(),
        "starting tollgate_api_server"
    );

    let shutdown = CancellationToken::new();
    let state = tollgate_api::AppState::build(
        config.clone(),
        Arc::new(InMemoryUserRepository::new()),
        Arc::new(SystemClock),
        shutdown.clone(),
    )?;
    let app = tollgate_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for ctrl-c: {e}");
                return;
            }
            info!("ctrl-c received, shutting down");
            shutdown.cancel();
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec![
            "tollgate_api_server",
            "--jwt-secret",
            "secret",
            "--client-id",
            "client",
            "--client-secret",
            "client-secret",
        ];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_produce_valid_config() {
        let config = args(&[]).into_config().unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.errors.fallback_status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!config.errors.expose_internal);
        assert_eq!(config.auth.bcrypt_cost, DEFAULT_BCRYPT_COST);
    }

    #[test]
    fn admin_emails_are_comma_separated() {
        let config = args(&["--admin-emails", "a@x.com, b@x.com"])
            .into_config()
            .unwrap();
        assert_eq!(config.auth.admin_emails, vec!["a@x.com", "b@x.com"]);
    }

    #[test]
    fn teapot_fallback_is_configurable() {
        let config = args(&["--unclassified-error-status", "418"])
            .into_config()
            .unwrap();
        assert_eq!(config.errors.fallback_status, StatusCode::IM_A_TEAPOT);
    }

    #[test]
    fn non_error_fallback_is_rejected() {
        let err = args(&["--unclassified-error-status", "200"])
            .into_config()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn empty_secret_is_rejected() {
        let argv = [
            "tollgate_api_server",
            "--jwt-secret",
            "",
            "--client-id",
            "client",
            "--client-secret",
            "client-secret",
        ];
        let err = Args::try_parse_from(argv)
            .unwrap()
            .into_config()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));
    }
}
