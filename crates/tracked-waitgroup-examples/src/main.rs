use facet::Facet;
use figue as args;
use std::time::Duration;
use tracked_waitgroup::{Options, RedumpPolicy, TrackedWaitGroup};

mod scenarios;

type AnyResult<T> = Result<T, String>;

#[derive(Facet, Debug)]
struct Cli {
    #[facet(flatten)]
    builtins: args::FigueBuiltins,
    /// Bound passed to `wait`, in milliseconds.
    #[facet(args::named, default)]
    timeout_ms: Option<u64>,
    /// Re-dump period while stuck, in milliseconds. Overrides the environment.
    #[facet(args::named, default)]
    redump_ms: Option<u64>,
    #[facet(args::subcommand)]
    command: CommandKind,
}

#[derive(Facet, Debug)]
#[repr(u8)]
enum CommandKind {
    Balanced,
    ForgottenDone,
    SlowStragglers,
}

pub(crate) struct Config {
    pub(crate) timeout: Duration,
    pub(crate) options: Options,
}

impl Config {
    pub(crate) fn wait_group(&self) -> TrackedWaitGroup {
        TrackedWaitGroup::with_options(self.options.clone())
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

async fn run() -> AnyResult<()> {
    let cli = parse_cli()?;
    let cfg = config_from_cli(&cli)?;
    dispatch_command(&cfg, cli.command).await
}

fn parse_cli() -> AnyResult<Cli> {
    let figue_config = args::builder::<Cli>()
        .map_err(|e| format!("failed to build CLI schema: {e}"))?
        .cli(|cli| cli.strict())
        .help(|h| {
            h.program_name("tracked-waitgroup-examples")
                .description("Run stalled wait group scenarios as subcommands")
                .version(option_env!("CARGO_PKG_VERSION").unwrap_or("dev"))
        })
        .build();

    args::Driver::new(figue_config)
        .run()
        .into_result()
        .map(|v| v.value)
        .map_err(|e| e.to_string())
}

fn config_from_cli(cli: &Cli) -> AnyResult<Config> {
    let mut options = Options::from_env().map_err(|e| e.to_string())?;
    if let Some(ms) = cli.redump_ms {
        if ms == 0 {
            return Err("--redump-ms must be positive".to_owned());
        }
        options.redump = RedumpPolicy::Every(Duration::from_millis(ms));
    }

    Ok(Config {
        timeout: Duration::from_millis(cli.timeout_ms.unwrap_or(500)),
        options,
    })
}

async fn dispatch_command(cfg: &Config, command: CommandKind) -> AnyResult<()> {
    match command {
        CommandKind::Balanced => scenarios::balanced::run(cfg).await,
        CommandKind::ForgottenDone => scenarios::forgotten_done::run(cfg).await,
        CommandKind::SlowStragglers => scenarios::slow_stragglers::run(cfg).await,
    }
}
