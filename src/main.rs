//! HackAssist - Terminal Assistant for Hackers and Developers
//!
//! Interactive loop that suggests shell commands, runs them with consent,
//! and offers fixes when they fail.

use clap::Parser;
use hackassist::config::AssistantConfig;
use hackassist::context::SessionContext;
use hackassist::llm::create_llm_client;
use hackassist::operator::TerminalOperator;
use hackassist::runner::ShellRunner;
use hackassist::session::SessionLoop;
use hackassist::{ui, HackAssistError};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser)]
#[command(name = "hackassist")]
#[command(version)]
#[command(about = "AI terminal assistant that suggests, runs and repairs shell commands", long_about = None)]
struct Cli {
    /// Directory commands run in (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    workdir: PathBuf,

    /// Settings file (defaults to .hackassist/settings.json, then the user config dir)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Model name, overriding the settings file
    #[arg(short, long, value_name = "MODEL")]
    model: Option<String>,

    /// Model backend: gemini or offline
    #[arg(long, value_name = "PROVIDER")]
    provider: Option<String>,

    /// Skip the startup banner
    #[arg(long)]
    no_banner: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "hackassist=debug,info"
    } else {
        "hackassist=warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        let code = e.exit_code();
        if e.is_fatal() {
            ui::error(&format!("Startup failed: {}", e));
        } else if !matches!(e, HackAssistError::Interrupted) {
            ui::error(&e.to_string());
        }
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> hackassist::Result<()> {
    let ctx = SessionContext::detect(&cli.workdir)?;

    let mut config = AssistantConfig::load(cli.config.as_deref(), ctx.working_directory())?;
    if let Some(provider) = cli.provider {
        config.llm.provider = provider;
    }
    if let Some(model) = cli.model {
        config.llm.model = model;
    }
    if cli.no_banner {
        config.session.show_banner = false;
    }
    config.validate()?;
    debug!("Effective settings: {:?}", config);

    let llm = create_llm_client(&config.llm)?;

    if config.session.show_banner {
        ui::banner(&ctx, llm.model_name());
    } else {
        ui::session_facts(&ctx, llm.model_name());
    }

    let operator = TerminalOperator::new()?;
    let mut session = SessionLoop::new(
        ctx,
        llm,
        Box::new(ShellRunner::new(&config.shell)),
        Box::new(operator),
        &config,
    );
    session.run().await?;
    Ok(())
}
