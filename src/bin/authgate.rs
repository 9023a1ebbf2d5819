use anyhow::{anyhow, bail, Result};
use authgate::app::AppState;
use authgate::client::{ApiRequest, FormPart};
use authgate::observability::export::render_metrics;
use authgate::utils::config_loader;
use authgate::utils::logging;
use authgate::utils::logging::LogLevel;
use authgate::version::gate::{GatePolicy, UpdateCheck};
use authgate::version::semver::{is_version_critically_outdated, is_version_newer};
use clap::{Parser, Subcommand};
use http::Method;
use serde_json::json;
use std::io::Write;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "authgate.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL" , value_enum)]
    log_level: Option<LogLevel>,
    /// print prometheus metrics to stderr when the command finishes
    #[arg(long)]
    metrics: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Authenticated request against the configured backend
    Fetch {
        /// path relative to api.base_url, or an absolute url
        path: String,
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,
        /// JSON request body
        #[arg(short, long, conflicts_with = "form")]
        data: Option<String>,
        /// multipart field, name=value
        #[arg(short, long)]
        form: Vec<String>,
        /// extra header, name:value
        #[arg(short = 'H', long)]
        header: Vec<String>,
    },
    /// Run the update gate against the remote version source
    CheckUpdate {
        /// installed version, overrides version_check.current_version
        #[arg(long)]
        current: Option<String>,
        #[arg(long, value_enum)]
        policy: Option<GatePolicy>,
    },
    /// Compare two versions without any I/O
    Compare { latest: String, current: String },
    /// Drop the cached token and the persisted mirror
    SignOut,
    /// Show the persisted session mirror
    Session,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Parse args
    // -------------------------------

    let args = Args::parse();

    // pure comparison needs no config
    if let Command::Compare { latest, current } = &args.command {
        print_comparison(latest, current);
        return Ok(());
    }

    // -------------------------------
    // 2. Load YAML config
    // -------------------------------

    let mut service_config = config_loader::run(&args.config).await?;
    logging::run(&service_config, args.log_level.to_owned());

    if let (Command::CheckUpdate { policy: Some(policy), .. }, Some(version_check)) =
        (&args.command, service_config.version_check.as_mut())
    {
        version_check.policy = *policy;
    }

    // -------------------------------
    // 3. Build app state around one token cache
    // -------------------------------

    let state = AppState::new(&service_config)?;

    // -------------------------------
    // 4. Run command
    // -------------------------------

    let outcome = run_command(&args.command, &state, &service_config).await;
    let print_metrics = args.metrics && service_config.settings.metrics.is_enabled;

    let code = finish(outcome, print_metrics, &mut std::io::stderr()).await?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

/// Metrics go out before the exit code is acted on, blocking checks included.
async fn finish(outcome: Result<i32>, print_metrics: bool, out: &mut impl Write) -> Result<i32> {
    if print_metrics {
        writeln!(out, "{}", render_metrics().await?)?;
    }
    outcome
}

/// Exit code of a blocking update check
const UPDATE_REQUIRED_EXIT_CODE: i32 = 3;

/// Returns the process exit code
async fn run_command(command: &Command, state: &AppState, service_config: &authgate::ServiceConfig) -> Result<i32> {
    match command {
        Command::Fetch { path, method, data, form, header } => {
            let method = Method::from_bytes(method.to_uppercase().as_bytes())
                .map_err(|e| anyhow!("invalid method '{}': {}", method, e))?;
            let mut request = ApiRequest::new(method, path.clone());
            for h in header {
                let (name, value) = h
                    .split_once(':')
                    .ok_or_else(|| anyhow!("header '{}' must look like name:value", h))?;
                request = request.try_header(name.trim(), value.trim())?;
            }
            if let Some(data) = data {
                request = request.json(serde_json::from_str(data)?);
            } else if !form.is_empty() {
                let parts = form
                    .iter()
                    .map(|f| {
                        f.split_once('=')
                            .map(|(name, value)| FormPart::text(name, value))
                            .ok_or_else(|| anyhow!("form field '{}' must look like name=value", f))
                    })
                    .collect::<Result<Vec<_>>>()?;
                request = request.multipart(parts);
            }

            let body = state.client.execute(&request).await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Command::CheckUpdate { current, .. } => {
            let cfg = service_config
                .version_check
                .as_ref()
                .ok_or_else(|| anyhow!("version_check is not configured"))?;
            let current = current
                .clone()
                .or_else(|| cfg.current_version.clone())
                .ok_or_else(|| anyhow!("installed version unknown: pass --current or set version_check.current_version"))?;

            let gate = match &state.update_gate {
                Some(gate) => gate,
                None => bail!("version_check is not configured"),
            };
            let result = gate.check(&current).await;

            println!("{}", update_check_json(&result));
            if result.blocks_usage() {
                info!("update required, blocking");
                return Ok(UPDATE_REQUIRED_EXIT_CODE);
            }
        }
        Command::SignOut => {
            state.session.sign_out().await?;
            println!("{}", json!({ "signed_out": true }));
        }
        Command::Session => {
            let persisted = match &state.mirror {
                Some(mirror) => mirror.load().await?,
                None => None,
            };
            println!(
                "{}",
                json!({
                    "mirror": state.mirror.as_ref().map(|m| m.path().display().to_string()),
                    "persisted": persisted.is_some(),
                    "fetched_at": persisted.map(|t| t.fetched_at.to_rfc3339()),
                })
            );
        }
        Command::Compare { latest, current } => print_comparison(latest, current),
    }
    Ok(0)
}

fn print_comparison(latest: &str, current: &str) {
    println!(
        "{}",
        json!({
            "latest": latest,
            "current": current,
            "newer": is_version_newer(latest, current),
            "critically_outdated": is_version_critically_outdated(latest, current),
        })
    );
}

fn update_check_json(result: &UpdateCheck) -> serde_json::Value {
    match result {
        UpdateCheck::Required { current, latest, store_url } => json!({
            "state": result.state().as_str(),
            "current": current.to_string(),
            "latest": latest.to_string(),
            "store_url": store_url,
        }),
        UpdateCheck::NotRequired { current, latest } => json!({
            "state": result.state().as_str(),
            "current": current.to_string(),
            "latest": latest.to_string(),
        }),
        UpdateCheck::Error(e) => json!({
            "state": result.state().as_str(),
            "error": e.to_string(),
        }),
    }
}
