use clap::{Args, Parser};
use std::time::Duration;
use tracing::{error, info};

use sintra_cms::cms::CmsClient;
use sintra_cms::config::{Config, GeneratedConfig};
use sintra_cms::orchestrator::Orchestrator;
use sintra_cms::render::SectionRenderer;
use sintra_cms::store::ContentStore;
use sintra_cms::{CommandArgs, Result};

#[derive(Debug, Parser)]
#[command(
    name = "sintra-cms",
    about = "Loads and renders the Sintra Clássicos CMS content",
    author = "Sintra Clássicos <sintraclassicos14@gmail.com>"
)]
enum Opt {
    /// Run one full load and render cycle.
    Render(SharedArgs),

    /// Render, then poll the CMS for changes and re-render on save.
    Watch {
        #[command(flatten)]
        args: SharedArgs,

        #[arg(long, help = "Polling interval in seconds, overrides the config file.")]
        interval_secs: Option<u64>,
    },

    /// Generate the runtime config.js from the environment.
    GenerateConfig {
        #[arg(long, default_value = ".env", help = "Path to the local .env file.")]
        env_path: String,

        #[arg(long, default_value = "config.js", help = "Where to write the generated file.")]
        out: String,
    },
}

#[derive(Debug, Args)]
struct SharedArgs {
    #[arg(long, env = "SC_BASE_URL", help = "Base URL of the published site content.")]
    base_url: Option<String>,

    #[arg(long, env = "SC_OUT_DIR", help = "Directory for the rendered fragments.")]
    out: Option<String>,

    #[arg(
        short,
        long,
        env = "SC_CONFIG_PATH",
        help = "The path to the YAML config file."
    )]
    config_path: Option<String>,

    #[arg(long, help = "Bypass the content cache and fetch everything fresh.")]
    force: bool,
}

impl From<&SharedArgs> for CommandArgs {
    fn from(args: &SharedArgs) -> Self {
        CommandArgs {
            base_url: args.base_url.clone(),
            out_dir: args.out.clone(),
            config_path: args.config_path.clone(),
            force: args.force,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sintra_cms=info".into()),
        )
        .init();

    if let Err(error) = run(Opt::parse()).await {
        error!(%error);
        std::process::exit(1);
    }
}

async fn run(opt: Opt) -> Result<()> {
    match opt {
        Opt::Render(args) => {
            let (client, store, config) = build_context(&args)?;
            let renderer = SectionRenderer::new(&config.out_dir);
            let mut orchestrator = Orchestrator::new(&client, &store, renderer);
            orchestrator.initialize(args.force).await;
            info!(out_dir = config.out_dir, "render cycle complete");
        }
        Opt::Watch { args, interval_secs } => {
            let (client, store, config) = build_context(&args)?;
            let renderer = SectionRenderer::new(&config.out_dir);
            let mut orchestrator = Orchestrator::new(&client, &store, renderer);
            orchestrator.initialize(args.force).await;

            // Change polling is an administrative-context feature.
            if !config.admin_context {
                info!("adminContext is disabled in config, skipping change polling");
                return Ok(());
            }

            let interval = interval_secs.unwrap_or(config.poll_interval_secs);
            info!(interval_secs = interval, "watching for content changes");
            orchestrator.watch(Duration::from_secs(interval)).await;
        }
        Opt::GenerateConfig { env_path, out } => {
            GeneratedConfig::resolve(&env_path)?.write(&out)?;
        }
    }

    Ok(())
}

fn build_context(args: &SharedArgs) -> Result<(CmsClient, ContentStore, Config)> {
    let config = Config::resolve(&CommandArgs::from(args))?;
    let client = CmsClient::new(&config.base_url)?;
    let store = ContentStore::for_host(client.host(), config.force_cache);
    Ok((client, store, config))
}
