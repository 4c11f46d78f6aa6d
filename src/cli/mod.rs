//! CLI module for ACIP
//!
//! Provides command-line interface parsing for the `acip` binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;
pub mod repl;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ACIP - conversational intake and research orchestrator
///
/// Interviews you about what you want to achieve, then runs a multi-agent
/// web research pipeline and prints a strategy report.
#[derive(Parser, Debug)]
#[command(
    name = "acip",
    author = "Consensus Lab <dev@consensus-lab.kr>",
    version,
    about = "ACIP - conversational intake and intent-gated research",
    long_about = "Interviews you to extract your intent (topic, purpose, goal, constraints),\n\
                  then dispatches it to a multi-agent research pipeline: web search,\n\
                  cross-model analysis and synthesis into a structured report.\n\n\
                  Run without arguments to start an interactive chat.",
    after_help = "EXAMPLES:\n    \
                  acip init                         # Scaffold acip.toml and .env.example\n    \
                  acip key set GEMINI_API_KEY ...   # Store a provider credential\n    \
                  acip                              # Start chatting\n    \
                  acip research \"반려견 산책 앱\"      # One-shot research\n    \
                  acip --config my.toml             # Use a custom config file"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "acip.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive chat session (default)
    Chat,

    /// Run research immediately, bypassing the intake interview
    Research {
        /// Mission text; defaults to what the intent record already holds
        text: Option<String>,
    },

    /// Inspect or clear the persisted intent record
    #[command(subcommand)]
    Intent(IntentCommands),

    /// Manage stored provider credentials
    #[command(subcommand)]
    Key(KeyCommands),

    /// Describe an image and keep the description as research context
    DescribeImage {
        /// Image file (png, jpeg, webp, gif)
        path: PathBuf,
    },

    /// Show configuration information
    Config {
        /// Validate the configuration file
        #[arg(long)]
        validate: bool,
    },

    /// Initialize a new ACIP project with configuration files
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files without prompting
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum IntentCommands {
    /// Print the current intent record
    Show,
    /// Delete the intent record and start intake over
    Reset {
        /// Also forget the stored user name
        #[arg(long)]
        forget_name: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum KeyCommands {
    /// Store a credential (e.g. GEMINI_API_KEY, OPENAI_API_KEY, TAVILY_API_KEY)
    Set { name: String, value: String },
    /// Remove a stored credential
    Remove { name: String },
    /// List credentials and whether they resolve
    List,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Guess an image MIME type from the file extension; non-image types are rejected
pub fn mime_from_path(path: &std::path::Path) -> Option<String> {
    mime_guess::from_path(path)
        .iter()
        .find(|mime| mime.type_() == mime_guess::mime::IMAGE)
        .map(|mime| mime.essence_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_to_chat() {
        let cli = Cli::try_parse_from(["acip"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, PathBuf::from("acip.toml"));
    }

    #[test]
    fn test_parse_research_and_key() {
        let cli = Cli::try_parse_from(["acip", "research", "노트북 추천"]).unwrap();
        match cli.command {
            Some(Commands::Research { text }) => assert_eq!(text.as_deref(), Some("노트북 추천")),
            other => panic!("unexpected {:?}", other),
        }

        let cli = Cli::try_parse_from(["acip", "--no-color", "key", "set", "TAVILY_API_KEY", "tvly-x"])
            .unwrap();
        assert!(cli.no_color);
        assert!(matches!(cli.command, Some(Commands::Key(KeyCommands::Set { .. }))));
    }

    #[test]
    fn test_parse_intent_reset() {
        let cli = Cli::try_parse_from(["acip", "intent", "reset", "--forget-name"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Intent(IntentCommands::Reset { forget_name: true }))
        ));
    }

    #[rstest]
    #[case("a/photo.JPG", Some("image/jpeg"))]
    #[case("x.png", Some("image/png"))]
    #[case("scan.heic", Some("image/heic"))]
    #[case("scan.heif", Some("image/heif"))]
    #[case("notes.txt", None)]
    #[case("clip.mp4", None)]
    #[case("noext", None)]
    fn test_mime_from_path(#[case] path: &str, #[case] expected: Option<&str>) {
        assert_eq!(mime_from_path(std::path::Path::new(path)).as_deref(), expected);
    }
}
