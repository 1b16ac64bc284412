//! Rolegate command line
//!
//! Runs the HTTP server, issues tokens, and evaluates permission checks offline.

use anyhow::Context;
use clap::{Parser, Subcommand};
use rolegate_authz::{
    Decision, DirectIdentitySource, PermissionEvaluator, PermissionTable, StaticRoleStore,
    TracingAuditSink,
};
use rolegate_core::{init_logging, ConfigSource, GateConfig, GateError, LoggingConfig};
use rolegate_web::{auth::hash_password, AppState, RolegateServer, WebConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

/// Rolegate - role-based permission gate
#[derive(Parser)]
#[command(name = "rolegate")]
#[command(about = "Role-based permission checks over HTTP and the command line")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "rolegate.toml")]
    config: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Start {
        /// Server host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Server port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Enable development mode
        #[arg(long)]
        dev: bool,
    },

    /// Print a signed access token for a configured user
    Token {
        #[arg(short, long)]
        user: String,
    },

    /// Evaluate one permission for a user without a token
    Check {
        #[arg(short, long)]
        user: String,

        #[arg(short, long)]
        permission: String,
    },

    /// Print an Argon2 hash for a `password_hash` config entry
    HashPassword { password: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let gate = match GateConfig::load_or_default(&cli.config) {
        Ok(gate) => gate,
        Err(e) => {
            // Logging settings live in the file we failed to load
            init_logging(&logging_config(LoggingConfig::default(), &cli)).ok();
            e.log();
            return Err(anyhow::Error::new(e)
                .context(format!("Failed to load {}", cli.config.display())));
        }
    };

    init_logging(&logging_config(gate.logging.clone(), &cli)).map_err(|e| anyhow::anyhow!(e))?;
    info!("Using {}", ConfigSource::locate(&cli.config));

    match cli.command {
        Commands::Start { host, port, dev } => {
            let mut config = WebConfig::from_env(gate);
            if let Some(host) = host {
                config.gate.server.host = host;
            }
            if let Some(port) = port {
                config.gate.server.port = port;
            }
            config.gate.server.dev_mode |= dev;

            println!("Starting Rolegate server");
            println!("Server: http://{}", config.address());
            println!("Development mode: {}", config.gate.server.dev_mode);

            RolegateServer::new(config)
                .context("Failed to build server")?
                .start()
                .await
                .context("Server failed")?;

            println!("Server shut down gracefully");
            Ok(ExitCode::SUCCESS)
        }

        Commands::Token { user } => {
            let config = WebConfig::from_env(gate);
            if config.jwt_secret.is_none() {
                anyhow::bail!("A token secret is required: set ROLEGATE_JWT_SECRET");
            }

            let state = AppState::new(config)?;
            let token = state.user_service.issue_token(&user)?;
            info!("Issued token for {}", user);

            println!("{}", token.access_token);
            Ok(ExitCode::SUCCESS)
        }

        Commands::Check { user, permission } => {
            let table = gate
                .validate()
                .and_then(|()| PermissionTable::from_config(&gate.roles))
                .inspect_err(GateError::log)?;
            let evaluator = PermissionEvaluator::new(
                table,
                Arc::new(DirectIdentitySource),
                Arc::new(StaticRoleStore::from(&gate)),
                Arc::new(TracingAuditSink),
            );

            match evaluator.authorize(Some(&user), &permission) {
                Decision::Allow(grant) => {
                    println!("ALLOW ({} as {})", grant.username, grant.role);
                    Ok(ExitCode::SUCCESS)
                }
                Decision::Deny(reason) => {
                    println!("DENY ({})", reason);
                    Ok(ExitCode::FAILURE)
                }
            }
        }

        Commands::HashPassword { password } => {
            println!("{}", hash_password(&password)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn logging_config(logging: LoggingConfig, cli: &Cli) -> LoggingConfig {
    match &cli.log_level {
        Some(level) => logging.with_level(level),
        None => logging,
    }
}
