// # cf-ddns
//
// Thin front-end over `cf-ddns-core`:
// 1. Parse the command line and `CF_DDNS_*` environment variables
// 2. Prompt for the API token when none was given
// 3. Build the Cloudflare provider and the HTTP address source
// 4. Run the reconciliation job until SIGINT/SIGTERM or a fatal error
//
// ## Example
//
// ```bash
// export CF_DDNS_TOKEN=your_token
// cf-ddns --delay "10 minutes" example.com AAAA:home.example.com
// ```
//
// Exit codes follow sysexits: 64 for bad usage or a rejected token, 65 for
// domains that cannot be resolved, 70 for update failures before the first
// pass completed. Stopping on a signal exits with 0.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::env;
use std::process::ExitCode;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use cf_ddns_core::error::{EX_SOFTWARE, EX_USAGE};
use cf_ddns_core::{Credential, ReconciliationJob, log_events};
use cf_ddns_ip_http::HttpIpSource;
use cf_ddns_provider_cloudflare::CloudflareProvider;

use crate::cli::{Cli, DOMAINS_ENV_VAR};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version land here too, on stdout
            let code = if e.use_stderr() { EX_USAGE } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ExitCode::from(EX_SOFTWARE);
    }

    let credential = match read_credential(cli.token.as_deref()) {
        Ok(credential) => credential,
        Err(e) => {
            error!("{:#}", e);
            return exit_with(EX_USAGE);
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return exit_with(EX_SOFTWARE);
        }
    };

    let code = rt.block_on(run(cli, credential));
    exit_with(code)
}

fn exit_with(code: u8) -> ExitCode {
    info!("Exiting with code {}.", code);
    ExitCode::from(code)
}

/// Token from the command line or environment, otherwise from a no-echo prompt
fn read_credential(given: Option<&str>) -> Result<Credential> {
    match given {
        Some(token) => Ok(Credential::new(token)),
        None => {
            let token = rpassword::prompt_password("Enter your Cloudflare Token: ")
                .context("Failed to read the Cloudflare token")?;
            Ok(Credential::new(token))
        }
    }
}

/// Build the services and run the job; returns the process exit code
async fn run(cli: Cli, credential: Credential) -> u8 {
    let provider = match CloudflareProvider::new(&credential, &cli.provider_config()) {
        Ok(provider) => provider,
        Err(e) => {
            error!("Failed to set up the Cloudflare client: {}", e);
            return e.exit_code();
        }
    };

    let ip_source = match HttpIpSource::new(&cli.ip_source_config()) {
        Ok(source) => source,
        Err(e) => {
            error!("Failed to set up the address lookup client: {}", e);
            return e.exit_code();
        }
    };

    let env_domains = env::var(DOMAINS_ENV_VAR).ok();
    let raw = cli.raw_config(credential, env_domains.as_deref());

    // Installed before the job starts so a signal during the first pass is
    // held until that pass has finished
    let shutdown = shutdown_signal();

    let (mut job, events) = ReconciliationJob::new(Box::new(provider), Box::new(ip_source), raw);
    tokio::spawn(log_events(events));

    match job.launch_until(shutdown).await {
        Ok(()) => {
            info!("Shutting down");
            0
        }
        Err(e) => e.exit_code(),
    }
}

/// Install SIGTERM/SIGINT handlers now; the returned future resolves once
/// either signal has arrived
///
/// Must be called from within the runtime.
#[cfg(unix)]
fn shutdown_signal() -> impl Future<Output = ()> + Send {
    let signals = install_signal_handlers();

    async move {
        let (mut sigterm, mut sigint) = match signals {
            Ok(handlers) => handlers,
            Err(e) => {
                warn!("{:#}, falling back to Ctrl-C", e);
                wait_for_ctrl_c().await;
                return;
            }
        };

        let received = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        info!("Received shutdown signal: {}", received);
    }
}

#[cfg(unix)]
fn install_signal_handlers() -> Result<(tokio::signal::unix::Signal, tokio::signal::unix::Signal)> {
    let sigterm = signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;
    Ok((sigterm, sigint))
}

#[cfg(not(unix))]
fn shutdown_signal() -> impl Future<Output = ()> + Send {
    wait_for_ctrl_c()
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal: SIGINT"),
        Err(e) => {
            // Without a handler the job runs until killed
            warn!("Failed to wait for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
