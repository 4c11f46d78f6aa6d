//! Colored output helpers for CLI
//!
//! Provides consistent, colored terminal output for the ACIP CLI, including the
//! chat transcript and the research report card layout.

use crate::dispatch::ConversationState;
use crate::intent::{IntentField, IntentModel};
use crate::research::{Report, ResearchProgress};
use owo_colors::OwoColorize;
use std::io::{self, Write};

/// Output style configuration
#[derive(Debug, Clone, Copy)]
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// Print the ACIP banner
    pub fn banner(&self) {
        if self.colored {
            println!(
                "\n   {} {}",
                "Consensus Lab".bright_cyan().bold(),
                "· ACIP".cyan()
            );
            println!(
                "   {} {}\n",
                "Conversational intake & research".bright_white().bold(),
                format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
            );
        } else {
            println!(
                "\n   Consensus Lab · ACIP\n   Conversational intake & research v{}\n",
                env!("CARGO_PKG_VERSION")
            );
        }
    }

    /// Print a success message with a checkmark
    pub fn success(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "✓".green().bold(), message.green());
        } else {
            println!("  [OK] {}", message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("  [WARN] {}", message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print a file creation message
    pub fn created(&self, file_type: &str, path: &str) {
        if self.colored {
            println!(
                "  {} {} {}",
                "✓".green().bold(),
                file_type.dimmed(),
                path.bright_white()
            );
        } else {
            println!("  [CREATED] {} {}", file_type, path);
        }
    }

    /// Print a file skipped message
    pub fn skipped(&self, path: &str, reason: &str) {
        if self.colored {
            println!(
                "  {} {} {}",
                "○".yellow(),
                path.dimmed(),
                format!("({})", reason).yellow()
            );
        } else {
            println!("  [SKIPPED] {} ({})", path, reason);
        }
    }

    /// Print a directory creation message
    pub fn created_dir(&self, path: &str) {
        if self.colored {
            println!(
                "  {} {} {}",
                "✓".green().bold(),
                "directory".dimmed(),
                path.bright_white()
            );
        } else {
            println!("  [CREATED] directory {}", path);
        }
    }

    /// Print a header for a section
    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    /// Print a subheader
    pub fn subheader(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.cyan().bold());
        } else {
            println!("\n  --- {} ---", title);
        }
    }

    /// Print a key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            println!("    {}: {}", key, value);
        }
    }

    /// Print a list item
    pub fn list_item(&self, item: &str) {
        if self.colored {
            println!("    {} {}", "•".blue(), item);
        } else {
            println!("    - {}", item);
        }
    }

    /// Print a hint/tip message
    pub fn hint(&self, message: &str) {
        if self.colored {
            println!("\n  {} {}", "💡".dimmed(), message.dimmed().italic());
        } else {
            println!("\n  [TIP] {}", message);
        }
    }

    /// Print a command suggestion
    pub fn command(&self, cmd: &str) {
        if self.colored {
            println!("     {}", format!("$ {}", cmd).bright_cyan());
        } else {
            println!("     $ {}", cmd);
        }
    }

    /// Print completion message with next steps
    pub fn complete(&self, message: &str) {
        if self.colored {
            println!("\n  {} {}", "🚀".green(), message.bright_green().bold());
        } else {
            println!("\n  [DONE] {}", message);
        }
    }

    /// Input prompt for the chat loop
    pub fn prompt(&self, addressing: &str) {
        if self.colored {
            print!("\n{} ", format!("{} ›", addressing).bright_white().bold());
        } else {
            print!("\n{} > ", addressing);
        }
        io::stdout().flush().ok();
    }

    /// Assistant message with the current state badge
    pub fn assistant(&self, state: ConversationState, text: &str) {
        if self.colored {
            println!(
                "\n{} {}",
                "Consensus Lab".bright_cyan().bold(),
                format!("[{}]", state).dimmed()
            );
        } else {
            println!("\n[Consensus Lab] [{}]", state);
        }
        for line in text.lines() {
            println!("  {}", line);
        }
    }

    /// Research stage update
    pub fn progress(&self, event: &ResearchProgress) {
        let message = event.message();
        if self.colored {
            println!("  {}", message.dimmed());
        } else {
            println!("  {}", message);
        }
    }

    /// Render a report in card layout
    pub fn report(&self, report: &Report) {
        self.header("최종 전략 합의 보고서");

        self.subheader("[Verified Truth]");
        print_block(&report.verified_truth);

        self.subheader("[Critical Conflicts]");
        print_block(&report.conflicts);

        for plan in report.plans() {
            if self.colored {
                println!("\n  {}", plan.title.bright_white().bold());
            } else {
                println!("\n  [{}]", plan.title);
            }
            print_block(&plan.content);
        }

        if self.colored {
            println!(
                "\n  {} {}",
                "🚀 Next Action:".bright_green().bold(),
                report.next_action
            );
        } else {
            println!("\n  🚀 Next Action: {}", report.next_action);
        }

        if !report.evidence.is_empty() {
            self.subheader("[참고한 실제 웹 링크]");
            for link in &report.evidence {
                if self.colored {
                    println!("    {} {} {}", "•".blue(), link.title, link.url.dimmed());
                } else {
                    println!("    - {} ({})", link.title, link.url);
                }
            }
        }
    }

    /// Print the intent record field by field
    pub fn intent(&self, model: &IntentModel) {
        self.header("Intent Model");
        self.kv("version", &model.version);
        let fields = [IntentField::UserName]
            .into_iter()
            .chain(IntentField::DIRECTIVE_FIELDS);
        for field in fields {
            self.kv(field.as_str(), model.get(field).unwrap_or("-"));
        }
        if let Some(updated) = model.updated_at {
            self.kv("updated_at", &updated.to_rfc3339());
        }
    }

    /// Print newline
    pub fn newline(&self) {
        println!();
    }
}

fn print_block(text: &str) {
    for line in text.lines() {
        println!("    {}", line);
    }
}
