use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "flowgraph")]
#[command(about = "Run and inspect flowgraph workflows", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Service configuration file (TOML)
    #[arg(short, long, global = true, env = "FLOWGRAPH_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Execute a workflow and print the result as JSON
    Run {
        workflow: Workflow,

        /// Source code to review
        #[arg(long, conflicts_with = "file")]
        code: Option<String>,

        /// Read the source code to review from a file
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Initial state as a JSON object
        #[arg(short, long)]
        state: Option<String>,

        /// Print the full run trace instead of the final state
        #[arg(long)]
        trace: bool,

        #[command(flatten)]
        review: ReviewArgs,
    },

    /// Print a workflow's structure
    Describe {
        workflow: Workflow,

        #[arg(short = 'F', long, value_enum, default_value_t = DescribeFormat::Ascii)]
        format: DescribeFormat,

        #[command(flatten)]
        review: ReviewArgs,
    },

    /// List the registered analysis tools
    Tools,
}

#[derive(Debug, Clone, Args)]
pub struct ReviewArgs {
    /// Scores below this trigger a revision pass
    #[arg(long, env = "FLOWGRAPH_QUALITY_THRESHOLD")]
    pub threshold: Option<f64>,

    /// Upper bound on revision passes
    #[arg(long, env = "FLOWGRAPH_MAX_REVISIONS")]
    pub max_revisions: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Workflow {
    /// Single review pass
    Review,
    /// Review with bounded revision passes
    ReviewLoop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DescribeFormat {
    Json,
    Dot,
    Mermaid,
    Ascii,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "flowgraph",
            "run",
            "review-loop",
            "--code",
            "def f(): pass",
            "--threshold",
            "80",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                workflow,
                code,
                review,
                trace,
                ..
            } => {
                assert_eq!(workflow, Workflow::ReviewLoop);
                assert_eq!(code.as_deref(), Some("def f(): pass"));
                assert_eq!(review.threshold, Some(80.0));
                assert!(!trace);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_code_conflicts_with_file() {
        let result = Cli::try_parse_from([
            "flowgraph", "run", "review", "--code", "x", "--file", "a.py",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_describe_default_format() {
        let cli = Cli::try_parse_from(["flowgraph", "describe", "review"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Describe {
                format: DescribeFormat::Ascii,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_workflow_rejected() {
        assert!(Cli::try_parse_from(["flowgraph", "run", "deploy"]).is_err());
    }
}
