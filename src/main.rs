use anyhow::{bail, Context, Result};
use change_pack_agent::{
    agents::ChangePackOrchestrator,
    config::{AppConfig, DEFAULT_CONFIG_TEMPLATE},
    git::{DiffMode, GitClient},
    llm::OpenAICompatProvider,
    redaction::Redactor,
    trace::TraceWriter,
    types::{ChangePackResult, ReviewOutcome, UserContext},
    Error,
};
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "change-pack")]
#[command(about = "Generate CAB-ready change packs from a git diff using reviewed LLM agents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a change pack for the current diff
    Generate {
        /// Path to the git repository
        #[arg(long, default_value = ".")]
        repo: PathBuf,

        /// Which diff to describe
        #[arg(long, value_enum, default_value_t = DiffMode::Auto)]
        diff: DiffMode,

        /// Change title
        #[arg(long)]
        title: Option<String>,

        /// Short human summary
        #[arg(long)]
        summary: Option<String>,

        /// YAML file with extra change context
        #[arg(long)]
        context_file: Option<PathBuf>,

        /// Base output directory (a timestamped run directory is created inside)
        #[arg(long)]
        outdir: Option<PathBuf>,

        /// Do not redact secrets or internal IPs in prompts and traces
        #[arg(long = "no-redact", action = ArgAction::SetFalse)]
        redact: bool,
    },

    /// Initialize configuration file
    Init {
        /// Configuration file path
        #[arg(short = 'f', long, default_value = "change-pack.yml")]
        config_file: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(&cli.log_level)?;

    match cli.command {
        Commands::Generate {
            repo,
            diff,
            title,
            summary,
            context_file,
            outdir,
            redact,
        } => {
            let mut config = load_config(cli.config.as_deref()).await?;
            if let Some(outdir) = outdir {
                config.output.out_dir = outdir;
            }
            if !redact {
                config.output.redact = false;
            }

            let request = GenerateRequest {
                repo,
                diff,
                title,
                summary,
                context_file,
            };
            let result = generate(config, request).await?;
            print_result(&result);
        }

        Commands::Init { config_file, force } => {
            init_config(&config_file, force).await?;
        }
    }

    Ok(())
}

/// Initialize tracing with the specified log level
fn init_tracing(log_level: &str) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(log_level))
        .context("Failed to create env filter")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_level(true),
        )
        .with(env_filter)
        .init();

    Ok(())
}

/// Load configuration from file (if it exists) and the environment
async fn load_config(config_path: Option<&Path>) -> Result<AppConfig> {
    let path = match config_path {
        Some(path) if path.exists() => {
            info!("Loading configuration from: {:?}", path);
            Some(path)
        }
        Some(path) => {
            warn!("Configuration file not found: {:?}. Using defaults.", path);
            None
        }
        None => None,
    };

    Ok(AppConfig::load(path).await?)
}

struct GenerateRequest {
    repo: PathBuf,
    diff: DiffMode,
    title: Option<String>,
    summary: Option<String>,
    context_file: Option<PathBuf>,
}

async fn generate(config: AppConfig, request: GenerateRequest) -> Result<ChangePackResult> {
    // Credentials and numeric bounds are checked before anything touches git or disk.
    config.validate()?;

    if !request.repo.is_dir() {
        return Err(Error::Configuration(format!(
            "Repository path does not exist: {}",
            request.repo.display()
        ))
        .into());
    }
    let git = GitClient::new(&request.repo);
    if !git.is_git_repo().await {
        return Err(Error::Configuration(format!(
            "Not a git repository: {}",
            request.repo.display()
        ))
        .into());
    }

    let redactor = Redactor::new(config.output.redact)?;

    let changed_files = git
        .changed_files(request.diff)
        .await
        .context("Failed to list changed files")?;
    let diff_text = git
        .diff_text(request.diff)
        .await
        .context("Failed to read diff")?;
    let diff_text = redactor.redact(&diff_text);

    if changed_files.is_empty() {
        warn!("No changed files detected for diff mode {}", request.diff);
    }

    let user_ctx = UserContext::from_optional_yaml(
        request.context_file.as_deref(),
        request.title,
        request.summary,
    )
    .await?;

    // The run directory is created only once every input has been read.
    let run_dir = ChangePackOrchestrator::make_run_dir(&config.output.out_dir).await?;
    let trace = TraceWriter::in_run_dir(&run_dir, redactor);
    info!(run_dir = %run_dir.display(), diff_mode = %request.diff, "Generating change pack");

    let provider = OpenAICompatProvider::new(config.llm_config())?;
    let orchestrator =
        ChangePackOrchestrator::new(Arc::new(provider), trace, config.pipeline.clone().into());

    let result = orchestrator
        .run(&request.repo, &changed_files, &diff_text, &user_ctx, &run_dir)
        .await
        .with_context(|| format!("Change pack generation failed (trace: {})", run_dir.display()))?;

    Ok(result)
}

fn print_result(result: &ChangePackResult) {
    println!("Change pack written to {}", result.run_dir.display());
    for file in &result.files_written {
        println!("  - {}", file.display());
    }
    println!("Risk level: {}", result.risk_level);

    match &result.review_outcome {
        ReviewOutcome::Passed => {
            println!("Reviewer: PASS (revision passes: {})", result.revision_passes);
        }
        ReviewOutcome::Incomplete { unresolved_issues } => {
            warn!(
                unresolved = unresolved_issues.len(),
                "Revision budget exhausted; documents may need manual review"
            );
            println!(
                "Reviewer: NEEDS_FIX after {} revision pass(es), {} unresolved issue(s)",
                result.revision_passes,
                unresolved_issues.len()
            );
        }
    }
}

/// Initialize configuration file
async fn init_config(config_file: &Path, force: bool) -> Result<()> {
    info!("Initializing configuration file: {:?}", config_file);

    if config_file.exists() && !force {
        bail!(
            "Configuration file already exists: {}. Pass --force to overwrite.",
            config_file.display()
        );
    }

    tokio::fs::write(config_file, DEFAULT_CONFIG_TEMPLATE)
        .await
        .with_context(|| format!("Failed to write configuration file: {:?}", config_file))?;

    println!("Configuration file created: {}", config_file.display());
    println!("Set LLM_BASE_URL, LLM_API_KEY and LLM_MODEL in the environment or a .env file.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> AppConfig {
        let mut config = AppConfig::default();
        config.llm.base_url = "http://localhost:1".to_string();
        config.llm.api_key = "k".to_string();
        config.llm.model = "m".to_string();
        config
    }

    #[test]
    fn test_generate_defaults() {
        let cli = Cli::parse_from(["change-pack", "generate"]);
        match cli.command {
            Commands::Generate {
                repo, diff, redact, outdir, ..
            } => {
                assert_eq!(repo, PathBuf::from("."));
                assert_eq!(diff, DiffMode::Auto);
                assert!(redact);
                assert!(outdir.is_none());
            }
            _ => panic!("expected generate"),
        }
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_generate_flags() {
        let cli = Cli::parse_from([
            "change-pack",
            "generate",
            "--repo",
            "/srv/app",
            "--diff",
            "staged",
            "--title",
            "Rotate keys",
            "--no-redact",
            "--outdir",
            "out",
        ]);
        match cli.command {
            Commands::Generate {
                repo,
                diff,
                title,
                redact,
                outdir,
                ..
            } => {
                assert_eq!(repo, PathBuf::from("/srv/app"));
                assert_eq!(diff, DiffMode::Staged);
                assert_eq!(title.as_deref(), Some("Rotate keys"));
                assert!(!redact);
                assert_eq!(outdir, Some(PathBuf::from("out")));
            }
            _ => panic!("expected generate"),
        }
    }

    #[tokio::test]
    async fn test_init_refuses_to_overwrite_without_force() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("change-pack.yml");
        std::fs::write(&path, "llm: {}\n").unwrap();

        assert!(init_config(&path, false).await.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "llm: {}\n");

        init_config(&path, true).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG_TEMPLATE);
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_before_git() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let request = GenerateRequest {
            repo: temp_dir.path().join("does-not-exist"),
            diff: DiffMode::Auto,
            title: None,
            summary: None,
            context_file: None,
        };

        let err = generate(AppConfig::default(), request).await.unwrap_err();
        assert!(err.to_string().contains("LLM_BASE_URL"));
    }

    #[tokio::test]
    async fn test_git_failure_leaves_no_run_dir() {
        if std::process::Command::new("git").arg("--version").output().is_err() {
            return;
        }
        let temp_dir = tempfile::TempDir::new().unwrap();
        let repo = temp_dir.path().join("repo");
        std::fs::create_dir_all(&repo).unwrap();
        let status = std::process::Command::new("git")
            .args(["init", "-q"])
            .current_dir(&repo)
            .status()
            .unwrap();
        assert!(status.success());

        let mut config = configured();
        config.output.out_dir = temp_dir.path().join("packs");
        let request = GenerateRequest {
            repo,
            diff: DiffMode::Head,
            title: None,
            summary: None,
            context_file: None,
        };

        // HEAD does not exist before the first commit.
        assert!(generate(config, request).await.is_err());
        assert!(!temp_dir.path().join("packs").exists());
    }

    #[tokio::test]
    async fn test_missing_repo_is_configuration_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let mut config = configured();
        config.output.out_dir = temp_dir.path().join("packs");
        let request = GenerateRequest {
            repo: temp_dir.path().join("does-not-exist"),
            diff: DiffMode::Auto,
            title: None,
            summary: None,
            context_file: None,
        };

        let err = generate(config, request).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::Configuration(_))
        ));
        assert!(!temp_dir.path().join("packs").exists());
    }
}
