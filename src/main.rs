mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use clap::error::ErrorKind;
use tracing::{Level, debug};

use kubeprobe_cache::{DEFAULT_CACHE_DIR, FileCache};
use kubeprobe_check::Dispatcher;
use kubeprobe_k8s::KubeClient;
use kubeprobe_types::{Action, CacheKey, ProbeError, Resource};

use crate::config::ProbeConfig;

/// Kubeprobe - Zabbix probe for Kubernetes deployment status
#[derive(Parser, Debug)]
#[command(name = "kubeprobe")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config name, read from <CONFIG_DIR>/<CONFIG_NAME>.toml
    #[arg(value_name = "CONFIG_NAME")]
    config_name: String,

    /// discover or get
    #[arg(value_name = "ACTION")]
    action: String,

    /// deployments or services
    #[arg(value_name = "RESOURCE")]
    resource: String,

    /// Resource to inspect (ignored by discover)
    #[arg(value_name = "RESOURCE_NAME")]
    resource_name: String,

    /// Status field to print, e.g. ready_replicas (ignored by discover)
    #[arg(value_name = "KEY")]
    key: String,

    /// Trailing arguments are accepted and ignored
    #[arg(hide = true)]
    extra: Vec<String>,

    /// Directory holding the config files
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    /// Directory holding cached API responses
    #[arg(long, default_value = DEFAULT_CACHE_DIR)]
    cache_dir: PathBuf,

    /// Ignore a fresh cache entry and query the API server
    #[arg(long)]
    refresh: bool,

    /// Increase log verbosity on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// A validated probe request
#[derive(Debug)]
struct Request {
    config_name: String,
    action: Action,
    resource: Resource,
    resource_name: String,
    key: String,
}

impl Request {
    fn from_args(args: &Args) -> Result<Self, ProbeError> {
        Ok(Self {
            config_name: args.config_name.clone(),
            action: args.action.parse()?,
            resource: args.resource.parse()?,
            resource_name: args.resource_name.clone(),
            key: args.key.clone(),
        })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(parse_failure_code(&e));
        }
    };

    // Logs go to stderr; stdout carries only the probe value
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(log_level(args.verbose).into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&args).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Help and version requests succeed; any other parse failure is a usage error
fn parse_failure_code(err: &clap::Error) -> u8 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    }
}

async fn run(args: &Args) -> Result<String> {
    let request = Request::from_args(args)?;

    // Reject unwired pairs before touching config, cache, or network
    let dispatcher = Dispatcher::new();
    dispatcher.handler_for(request.action, request.resource)?;

    let config = ProbeConfig::load(&args.config_dir, &request.config_name)?;
    let cluster = config.cluster();
    let cache = FileCache::new(&args.cache_dir, config.cache_ttl());
    let key = CacheKey::new(&request.config_name, request.resource);

    debug!(
        server = %cluster.server_url(),
        cache = %cache.path_for(&key).display(),
        ttl_secs = cache.ttl().as_secs(),
        "probe configured"
    );

    let resource = request.resource;
    let cluster = &cluster;
    let fetch = move || async move {
        let client = KubeClient::new(cluster)?;
        client.fetch(resource).await
    };

    let data = if args.refresh {
        cache.refresh(&key, fetch).await?
    } else {
        cache.resolve(&key, fetch).await?
    };

    let output = dispatcher.dispatch(
        request.action,
        request.resource,
        &data,
        &request.resource_name,
        &request.key,
    )?;

    Ok(output)
}
