//! CLI definitions for auditq.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// auditq CLI.
#[derive(Parser)]
#[command(name = "auditq")]
#[command(about = "Resumable, backpressure-aware URL audit queue")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (default: ./auditq.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level filter, overrides RUST_LOG (e.g. "debug", "auditq_workqueue=trace")
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Probe a batch of URLs
    Run(RunArgs),

    /// Resume a checkpointed run
    Resume {
        /// State ID printed by the interrupted run
        state_id: String,

        /// Process completed URLs again instead of keeping their results
        #[arg(long)]
        reprocess: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Manage saved run states
    State {
        #[command(subcommand)]
        action: StateAction,
    },
}

#[derive(Args)]
pub(crate) struct RunArgs {
    /// URLs to probe
    pub urls: Vec<String>,

    /// Sitemap or sitemap index URL (repeatable)
    #[arg(long)]
    pub sitemap: Vec<String>,

    /// Sitemap stored on disk
    #[arg(long)]
    pub sitemap_file: Option<PathBuf>,

    /// File with one URL per line
    #[arg(long)]
    pub urls_file: Option<PathBuf>,

    /// Maximum concurrent requests
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Maximum attempts per URL
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Maximum URLs to process (0 = unlimited)
    #[arg(long)]
    pub max_urls: Option<usize>,

    /// Checkpoint progress so the run can be resumed
    #[arg(long)]
    pub persist: bool,

    /// State ID for checkpoints (generated when omitted)
    #[arg(long)]
    pub state_id: Option<String>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args)]
pub(crate) struct OutputArgs {
    /// Write the JSON report to this path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand)]
pub(crate) enum StateAction {
    /// List saved states
    List,

    /// Show details of a saved state
    Show {
        /// State ID
        state_id: String,
    },

    /// Delete a saved state
    Delete {
        /// State ID
        state_id: String,
    },

    /// Delete states not updated recently
    Cleanup {
        /// Maximum age in hours
        #[arg(long, default_value_t = 168)]
        max_age_hours: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "auditq",
            "run",
            "https://a.test/",
            "https://b.test/",
            "--sitemap",
            "https://a.test/sitemap.xml",
            "--concurrency",
            "8",
            "--persist",
            "-o",
            "report.json",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.urls.len(), 2);
        assert_eq!(args.sitemap, vec!["https://a.test/sitemap.xml"]);
        assert_eq!(args.concurrency, Some(8));
        assert!(args.persist);
        assert_eq!(args.output.output, Some(PathBuf::from("report.json")));
    }

    #[test]
    fn test_parse_global_flags() {
        let cli = Cli::try_parse_from([
            "auditq",
            "state",
            "cleanup",
            "--config",
            "custom.toml",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(
            cli.command,
            Commands::State {
                action: StateAction::Cleanup { max_age_hours: 168 }
            }
        ));
    }

    #[test]
    fn test_parse_resume() {
        let cli = Cli::try_parse_from(["auditq", "resume", "queue_1_abc", "--reprocess"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Resume { ref state_id, reprocess: true, .. } if state_id == "queue_1_abc"
        ));
    }
}
