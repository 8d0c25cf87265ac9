//! kstream_builder CLI
//!
//! Clone, configure, patch and build CentOS Stream / RHEL kernels.
//!
//! # Usage
//!
//! ```bash
//! export KERNEL_SRC_DIR=$HOME/kernel-builds/src
//! export KERNEL_BUILD_DIR=$HOME/kernel-builds/build
//!
//! # Fresh Y-stream tree, configured and built as RPMs for the host
//! kstream_builder --clone --configure --rpm
//!
//! # Cross build the RHEL Z-stream real-time kernel for aarch64
//! kstream_builder -a aarch64 -s z -R rhel --rt -C -B
//!
//! # Apply a local series on top and rebuild
//! kstream_builder -p ~/patches/net-fixes -B
//!
//! # Show what would run
//! kstream_builder -a s390x --print-config
//! ```

use clap::Parser;
use kstream_builder::config::{self, loader, RunRequest};
use kstream_builder::log_collector::{level_from_name, session_file_name};
use kstream_builder::{AppError, ConfigError, LogCollector, Orchestrator, SystemRunner};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kstream_builder")]
#[command(author, version, about = "CentOS Stream / RHEL kernel build wrapper", long_about = None)]
struct Cli {
    /// Target architecture (x86_64, aarch64, ppc64le, s390x)
    #[arg(short, long)]
    arch: Option<String>,

    /// Kernel stream (y, z)
    #[arg(short, long)]
    stream: Option<String>,

    /// Source repository (centos, rhel)
    #[arg(short = 'R', long)]
    repo: Option<String>,

    /// Clone from a personal GitLab fork under NAMESPACE
    #[arg(short, long, value_name = "NAMESPACE")]
    fork: Option<String>,

    /// Apply *.patch / *.mbox files from DIR with git am
    #[arg(short, long, value_name = "DIR")]
    patches: Option<PathBuf>,

    /// Clone the kernel tree into KERNEL_SRC_DIR
    #[arg(short, long)]
    clone: bool,

    /// Configure from the distribution config
    #[arg(short = 'C', long)]
    configure: bool,

    /// Add and fetch backport remotes (linus, stable, ark)
    #[arg(short, long)]
    backport: bool,

    /// Build the kernel
    #[arg(short = 'B', long)]
    build: bool,

    /// Package binary RPMs (implies --build)
    #[arg(short, long)]
    rpm: bool,

    /// Run menuconfig after configuring (implies --configure)
    #[arg(short, long)]
    menuconfig: bool,

    /// Real-time kernel variant
    #[arg(short = 't', long = "rt")]
    realtime: bool,

    /// Debug kernel variant
    #[arg(short, long)]
    debug: bool,

    /// Generate the tag index
    #[arg(short = 'T', long)]
    tags: bool,

    /// Parallel make jobs (default: number of CPUs)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Print the resolved build plan as JSON and exit
    #[arg(long)]
    print_config: bool,
}

impl From<Cli> for RunRequest {
    fn from(cli: Cli) -> Self {
        RunRequest {
            arch: cli.arch,
            stream: cli.stream,
            repo: cli.repo,
            fork: cli.fork,
            patches: cli.patches,
            jobs: cli.jobs,
            clone: cli.clone,
            configure: cli.configure,
            backport: cli.backport,
            build: cli.build,
            rpm: cli.rpm,
            menuconfig: cli.menuconfig,
            realtime: cli.realtime,
            debug: cli.debug,
            tags: cli.tags,
            print_config: cli.print_config,
        }
    }
}

#[tokio::main]
async fn main() {
    let request = RunRequest::from(Cli::parse());
    let code = match run(request).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

async fn run(request: RunRequest) -> Result<i32, AppError> {
    let env = |key: &str| std::env::var(key).ok();

    let settings = loader::load_global_settings()?;
    let plan = match config::resolve_or_print(&request, &settings, env, &mut std::io::stdout())? {
        Some(plan) => plan,
        // --print-config
        None => return Ok(0),
    };

    // =========================================================================
    // LOGGING INITIALIZATION
    // =========================================================================
    let level = level_from_name(env(config::ENV_LOG_LEVEL).as_deref());
    let collector = LogCollector::new(&plan.log_dir, &session_file_name(), level)
        .map_err(ConfigError::ValidationFailed)?;
    if let Err(e) = collector.install() {
        eprintln!("WARNING: {}", e);
    }
    log::info!(
        "kstream_builder {} logging to {}",
        kstream_builder::VERSION,
        collector.log_path().display()
    );

    let report = Orchestrator::new(&plan, SystemRunner)
        .with_log_path(collector.log_path())
        .run()
        .await;
    report.log();

    // Report must reach disk before exit
    if let Err(e) = collector.wait_for_empty() {
        eprintln!("WARNING: log flush failed: {}", e);
    }
    Ok(report.exit_code())
}
