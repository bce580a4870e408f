//! Droidbench CLI - run device-automation benchmark suites.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use droidbench_agent::{BehaviorFlags, LlmConfig, LlmProvider};
use droidbench_device::{AdbController, OverlayToggle};
use droidbench_env::{EnvClient, Environment};
use droidbench_runner::{
    Collaborators, DeviceAgentLauncher, DiscordChannel, ExceptionChannel, JsonResultSink,
    NoopChannel, Suite, SuiteConfig,
};

mod boot;

/// Droidbench - Android device-automation benchmark runner
#[derive(Parser)]
#[command(name = "droidbench")]
#[command(about = "Run device-automation benchmark suites", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the tasks the environment knows about
    #[command(name = "list-tasks")]
    ListTasks {
        /// Environment URL
        #[arg(long, default_value = "http://localhost:5000")]
        env_url: String,
    },

    /// Boot an environment and verify it is usable
    Check {
        #[command(flatten)]
        target: Target,
    },

    /// Hide the device overlay once
    #[command(name = "disable-overlay")]
    DisableOverlay {
        /// Device serial to use
        #[arg(long, default_value = "emulator-5554")]
        env_serial: String,

        /// Path to the adb executable
        #[arg(long, default_value = "adb")]
        adb_path: String,
    },

    /// Run the benchmark suite
    Run {
        #[command(flatten)]
        target: Target,

        #[command(flatten)]
        suite: SuiteArgs,

        #[command(flatten)]
        llm: LlmArgs,
    },
}

/// Environment and device selection.
#[derive(Args)]
struct Target {
    /// Environment URL
    #[arg(long, default_value = "http://localhost:5000")]
    env_url: String,

    /// Device serial to use
    #[arg(long, default_value = "emulator-5554")]
    env_serial: String,

    /// Path to the adb executable
    #[arg(long, default_value = "adb")]
    adb_path: String,

    /// Portal APK to (re-)install during boot
    #[arg(long)]
    portal_apk: Option<PathBuf>,
}

/// Suite selection and budgets.
#[derive(Args)]
struct SuiteArgs {
    /// Task family to run
    #[arg(long, default_value = "android_world")]
    task_family: String,

    /// Seed for the suite's task parameterization
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Number of parameter combinations per task
    #[arg(short = 'n', long, default_value_t = 1)]
    n_task_combinations: u32,

    /// Minimum task index to run
    #[arg(long, default_value_t = 0)]
    min_task_idx: usize,

    /// Maximum task index to run (exclusive; defaults to the end of the list)
    #[arg(long)]
    max_task_idx: Option<usize>,

    /// Explicit tasks to run (repeatable); overrides the index range
    #[arg(short = 't', long = "task")]
    tasks: Vec<String>,

    /// Multiplier from complexity to the step budget
    #[arg(long, default_value_t = 15)]
    max_steps_multiplier: u32,

    /// Multiplier from complexity to the timeout budget, in seconds
    #[arg(long, default_value_t = 300)]
    timeout_multiplier: u32,

    /// Directory for result and trajectory files
    #[arg(long, default_value = "eval_results")]
    output_dir: PathBuf,

    /// Seconds between overlay keepalive commands
    #[arg(long, default_value_t = 5)]
    keepalive_interval: u64,

    /// Discord webhook for exception notifications
    /// (falls back to DISCORD_WEBHOOK_URL)
    #[arg(long)]
    discord_webhook: Option<String>,
}

/// Agent LLM configuration.
#[derive(Args)]
struct LlmArgs {
    /// LLM provider (openai, anthropic, gemini)
    #[arg(long, default_value = "gemini")]
    llm_provider: String,

    /// Model name to use
    #[arg(long, default_value = "gemini-2.5-pro")]
    llm_model: String,

    /// Sampling temperature
    #[arg(long, default_value_t = 0.5)]
    temperature: f64,

    /// Ask the model to reason before acting
    #[arg(long)]
    reasoning: bool,

    /// Reflect on failed actions
    #[arg(long)]
    reflection: bool,

    /// Emit per-step trace output
    #[arg(long)]
    tracing: bool,

    /// Verbose agent debugging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::ListTasks { env_url } => list_tasks(&env_url).await?,
        Commands::Check { target } => check(&target).await,
        Commands::DisableOverlay {
            env_serial,
            adb_path,
        } => disable_overlay(&adb_path, &env_serial).await,
        Commands::Run { target, suite, llm } => run(target, suite, llm).await?,
    }

    Ok(())
}

async fn list_tasks(env_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let env = EnvClient::new(env_url);
    let tasks = env.list_tasks(None, None).await?;

    println!("Tasks ({}):", tasks.len());
    for (i, task) in tasks.iter().enumerate() {
        println!("{i}: {task}");
    }

    Ok(())
}

async fn check(target: &Target) {
    let env = EnvClient::new(&target.env_url);
    let adb = AdbController::new(&target.adb_path, &target.env_serial);

    match boot::boot_environment(&env, &adb, target.portal_apk.as_deref()).await {
        Ok(()) => info!("environment is healthy"),
        Err(e) => {
            error!(error = %e, "error booting environment");
            std::process::exit(1);
        }
    }
}

async fn disable_overlay(adb_path: &str, serial: &str) {
    let adb = AdbController::new(adb_path, serial);

    match adb.disable_overlay().await {
        Ok(()) => info!(serial = %serial, "overlay disabled"),
        Err(e) => {
            error!(error = %e, "error disabling overlay");
            std::process::exit(1);
        }
    }
}

async fn run(
    target: Target,
    suite: SuiteArgs,
    llm: LlmArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let env = EnvClient::new(&target.env_url);
    let adb = AdbController::new(&target.adb_path, &target.env_serial);

    if let Err(e) = boot::boot_environment(&env, &adb, target.portal_apk.as_deref()).await {
        error!(error = %e, "error booting environment");
        std::process::exit(1);
    }

    let provider: LlmProvider = llm.llm_provider.parse()?;
    let llm_config = LlmConfig::new(provider, &llm.llm_model).with_temperature(llm.temperature);
    let flags = BehaviorFlags {
        reasoning: llm.reasoning,
        reflection: llm.reflection,
        tracing: llm.tracing,
        debug: llm.debug,
    };
    info!(provider = %provider, model = %llm.llm_model, "agent LLM configured");

    let webhook = suite
        .discord_webhook
        .clone()
        .or_else(|| std::env::var("DISCORD_WEBHOOK_URL").ok());
    let channel: Arc<dyn ExceptionChannel> = match webhook {
        Some(url) => Arc::new(DiscordChannel::new(url)),
        None => Arc::new(NoopChannel),
    };

    let launcher = DeviceAgentLauncher::new(adb.clone(), llm_config, flags);
    let adb = Arc::new(adb);
    let collaborators = Collaborators {
        env: Arc::new(env),
        capability: adb.clone(),
        overlay: adb,
        launcher: Arc::new(launcher),
        channel,
        sink: Arc::new(JsonResultSink::new(&suite.output_dir)),
    };

    let config = SuiteConfig {
        task_family: suite.task_family,
        seed: suite.seed,
        n_task_combinations: suite.n_task_combinations,
        min_task_idx: suite.min_task_idx,
        max_task_idx: suite.max_task_idx,
        tasks: suite.tasks,
        max_steps_multiplier: suite.max_steps_multiplier,
        timeout_multiplier: suite.timeout_multiplier,
        device_serial: target.env_serial,
        keepalive_interval: Duration::from_secs(suite.keepalive_interval),
    };

    let summary = Suite::new(collaborators, config).run().await?;
    info!(
        attempted = summary.attempted,
        completed = summary.completed,
        aborted = summary.aborted,
        succeeded = summary.succeeded,
        "benchmark run finished"
    );

    Ok(())
}
