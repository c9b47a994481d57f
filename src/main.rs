//! Server binary: loads configuration, initializes logging, and runs the
//! FTP and SMTP listeners concurrently.

use std::sync::Arc;

use parlor::auth::{CredentialCheck, StaticCredentials};
use parlor::config::Config;
use parlor::protocols::ftp::FtpMachine;
use parlor::protocols::smtp::SmtpMachine;
use parlor::server::{Limits, Server};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        ftp = %config.ftp_listen,
        smtp = %config.smtp_listen,
        max_connections = config.max_connections,
        max_buffer_bytes = config.max_buffer_bytes,
        idle_timeout_secs = config.idle_timeout_secs,
        "Starting parlor server"
    );

    let credentials: Arc<dyn CredentialCheck> = Arc::new(StaticCredentials::new(
        config
            .users
            .iter()
            .map(|u| (u.name.clone(), u.password.clone())),
        config.allow_anonymous,
    ));
    let limits = Limits::from(&config);

    let ftp = Server::bind(&config.ftp_listen, limits, config.max_connections, {
        let credentials = Arc::clone(&credentials);
        let banner = config.ftp_banner.clone();
        move || FtpMachine::new(Arc::clone(&credentials), banner.clone())
    })
    .await?;

    let smtp = Server::bind(&config.smtp_listen, limits, config.max_connections, {
        let banner = config.smtp_banner.clone();
        move || SmtpMachine::new(banner.clone())
    })
    .await?;

    tokio::try_join!(ftp.run(), smtp.run())?;
    Ok(())
}
