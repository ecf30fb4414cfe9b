use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;

/// Upload PDFs to a document service and follow their processing.
#[derive(Parser)]
#[command(name = "intake", version, about)]
pub struct Cli {
    /// RON configuration file.
    #[arg(long, global = true, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Service root, e.g. http://localhost:8000/api
    #[arg(long, global = true, env = "INTAKE_BASE_URL")]
    pub base_url: Option<String>,

    /// Key sent as X-API-Key.
    #[arg(long, global = true, env = "INTAKE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upload a PDF and wait until it is processed.
    Upload(UploadArgs),
    /// Show the processing status of an uploaded document.
    Status { document_id: String },
    /// Delete an uploaded document.
    Delete { document_id: String },
    /// Ask a question about a processed document; its status is checked first.
    Ask {
        document_id: String,
        question: String,
    },
    /// Print the service health snapshot.
    Health,
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    pub path: PathBuf,

    /// Question to ask once processing completes.
    #[arg(long, value_name = "QUESTION")]
    pub ask: Option<String>,

    /// Remove the document from the service when done.
    #[arg(long)]
    pub delete_after: bool,

    /// Print the final state as JSON.
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn upload_flags_parse() {
        let cli = Cli::try_parse_from([
            "intake",
            "upload",
            "report.pdf",
            "--ask",
            "What is the total?",
            "--delete-after",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        let Command::Upload(args) = cli.command else {
            panic!("expected upload");
        };
        assert_eq!(args.path, PathBuf::from("report.pdf"));
        assert_eq!(args.ask.as_deref(), Some("What is the total?"));
        assert!(args.delete_after);
        assert!(args.json);
    }

    #[test]
    fn global_options_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "intake",
            "status",
            "abc",
            "--base-url",
            "http://docs.internal/api",
            "--config",
            "other.ron",
        ])
        .unwrap();
        assert_eq!(cli.base_url.as_deref(), Some("http://docs.internal/api"));
        assert_eq!(cli.config, PathBuf::from("other.ron"));
        assert!(matches!(cli.command, Command::Status { ref document_id } if document_id == "abc"));
    }

    #[test]
    fn ask_requires_a_question() {
        assert!(Cli::try_parse_from(["intake", "ask", "abc"]).is_err());
    }
}
