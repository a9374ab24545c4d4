use anyhow::Result;
use clap::{Parser, Subcommand};
use docs_rag::commands::{init_documents, query_documents, reset_cache, show_status};
use docs_rag::config::{run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "docs-rag")]
#[command(about = "Semantic retrieval over a repository's markdown documentation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the documentation source and embedding API
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Build or load the embeddings index
    Init,
    /// Find the documents most relevant to a question
    Query {
        /// Question or search text
        text: String,
        /// Print the matches as a context block for a chat model
        #[arg(long)]
        context: bool,
    },
    /// Show the state of the embeddings snapshot
    Status,
    /// Delete the embeddings snapshot
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Init => {
            init_documents().await?;
        }
        Commands::Query { text, context } => {
            query_documents(&text, context).await?;
        }
        Commands::Status => {
            show_status()?;
        }
        Commands::Reset => {
            reset_cache()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["docs-rag", "init"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::Init));
        }
    }

    #[test]
    fn query_command_with_text() {
        let cli = Cli::try_parse_from(["docs-rag", "query", "how do I use modules?"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Query { text, context } = parsed.command {
                assert_eq!(text, "how do I use modules?");
                assert!(!context);
            }
        }
    }

    #[test]
    fn query_command_with_context_flag() {
        let cli = Cli::try_parse_from(["docs-rag", "query", "loops", "--context"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Query { text, context } = parsed.command {
                assert_eq!(text, "loops");
                assert!(context);
            }
        }
    }

    #[test]
    fn query_requires_text() {
        let cli = Cli::try_parse_from(["docs-rag", "query"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["docs-rag", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn status_and_reset_commands() {
        let status = Cli::try_parse_from(["docs-rag", "status"]);
        assert!(status.is_ok_and(|parsed| matches!(parsed.command, Commands::Status)));

        let reset = Cli::try_parse_from(["docs-rag", "reset"]);
        assert!(reset.is_ok_and(|parsed| matches!(parsed.command, Commands::Reset)));
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["docs-rag", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["docs-rag", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
