//! CLI theme and styling.

use colored::Colorize;

/// CLI theme configuration.
pub(crate) struct Theme;

impl Theme {
    /// Format a header.
    pub(crate) fn header(text: &str) -> String {
        format!("{}", text.bold().cyan())
    }

    /// Format a success message.
    pub(crate) fn success(text: &str) -> String {
        format!("{} {}", "✓".green(), text)
    }

    /// Format an error message.
    pub(crate) fn error(text: &str) -> String {
        format!("{} {}", "✗".red(), text.red())
    }

    /// Format a warning message.
    pub(crate) fn warning(text: &str) -> String {
        format!("{} {}", "!".yellow(), text.yellow())
    }

    /// Format an info message.
    pub(crate) fn info(text: &str) -> String {
        format!("{} {}", "i".blue(), text)
    }

    /// Format a dimmed message.
    pub(crate) fn dimmed(text: &str) -> String {
        format!("{}", text.dimmed())
    }

    /// Format an indented, aligned field line.
    pub(crate) fn field(label: &str, value: &str) -> String {
        format!("  {:<12}{value}", format!("{label}:"))
    }

    /// Format a certificate expiry with its remaining lifetime.
    pub(crate) fn expiry(expires_at: Option<chrono::DateTime<chrono::Utc>>) -> String {
        let Some(at) = expires_at else {
            return "out of range".red().to_string();
        };
        let remaining = at.signed_duration_since(chrono::Utc::now());
        let stamp = at.format("%Y-%m-%d %H:%M UTC").to_string();
        if remaining.num_seconds() <= 0 {
            format!("{} {}", stamp, "(expired)".red())
        } else {
            format!(
                "{} {}",
                stamp,
                format!("({} days left)", remaining.num_days()).dimmed()
            )
        }
    }
}
