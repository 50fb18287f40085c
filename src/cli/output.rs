//! Styled terminal output. Everything the shell prints to stdout goes through
//! [`print`], so script mode can switch colors off in one place.

use std::fmt;
use std::sync::RwLock;

use colored::Colorize;
use once_cell::sync::Lazy;

const RULE_WIDTH: usize = 40;
const FIELD_WIDTH: usize = 14;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Success,
    Warning,
    Error,
    Section,
    Separator,
}

impl MessageKind {
    fn marker(self) -> &'static str {
        match self {
            MessageKind::Info => "",
            MessageKind::Success => "[ok] ",
            MessageKind::Warning => "[warn] ",
            MessageKind::Error => "[error] ",
            MessageKind::Section | MessageKind::Separator => "",
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct OutputPreferences {
    /// No colors, for piped output.
    pub plain_mode: bool,
    /// Drops separators and blank spacing.
    pub quiet_mode: bool,
}

static PREFERENCES: Lazy<RwLock<OutputPreferences>> =
    Lazy::new(|| RwLock::new(OutputPreferences::default()));

pub fn set_preferences(prefs: OutputPreferences) {
    if let Ok(mut guard) = PREFERENCES.write() {
        *guard = prefs;
    }
}

fn preferences() -> OutputPreferences {
    PREFERENCES.read().map(|guard| *guard).unwrap_or_default()
}

fn render(kind: MessageKind, message: &str, prefs: &OutputPreferences) -> Option<String> {
    let text = match kind {
        MessageKind::Separator if prefs.quiet_mode => return None,
        MessageKind::Separator => "-".repeat(RULE_WIDTH),
        MessageKind::Section => {
            let title = message.trim();
            let spacing = if prefs.quiet_mode { "" } else { "\n" };
            format!("{spacing}{title}\n{}", "=".repeat(title.chars().count()))
        }
        _ => format!("{}{}", kind.marker(), message),
    };
    if prefs.plain_mode {
        return Some(text);
    }
    let styled = match kind {
        MessageKind::Success => text.green().to_string(),
        MessageKind::Warning => text.yellow().to_string(),
        MessageKind::Error => text.red().bold().to_string(),
        MessageKind::Section => text.cyan().bold().to_string(),
        MessageKind::Separator => text.dimmed().to_string(),
        MessageKind::Info => text,
    };
    Some(styled)
}

pub fn print(kind: MessageKind, message: impl fmt::Display) {
    if let Some(line) = render(kind, &message.to_string(), &preferences()) {
        println!("{}", line);
    }
}

pub fn info(message: impl fmt::Display) {
    print(MessageKind::Info, message);
}

pub fn success(message: impl fmt::Display) {
    print(MessageKind::Success, message);
}

pub fn warning(message: impl fmt::Display) {
    print(MessageKind::Warning, message);
}

pub fn error(message: impl fmt::Display) {
    print(MessageKind::Error, message);
}

pub fn section(title: impl fmt::Display) {
    print(MessageKind::Section, title);
}

pub fn separator() {
    print(MessageKind::Separator, "");
}

/// An indented `label  value` line with the labels aligned.
pub fn field(label: &str, value: impl fmt::Display) {
    info(format_field(label, value));
}

fn format_field(label: &str, value: impl fmt::Display) -> String {
    format!("  {:<width$} {}", format!("{}:", label), value, width = FIELD_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: OutputPreferences = OutputPreferences {
        plain_mode: true,
        quiet_mode: false,
    };

    #[test]
    fn plain_messages_carry_markers() {
        assert_eq!(
            render(MessageKind::Warning, "low stock", &PLAIN).as_deref(),
            Some("[warn] low stock")
        );
        assert_eq!(
            render(MessageKind::Info, "3 quotes", &PLAIN).as_deref(),
            Some("3 quotes")
        );
    }

    #[test]
    fn sections_are_underlined() {
        assert_eq!(
            render(MessageKind::Section, " Quotes ", &PLAIN).as_deref(),
            Some("\nQuotes\n======")
        );
    }

    #[test]
    fn quiet_mode_drops_separators() {
        let quiet = OutputPreferences {
            plain_mode: true,
            quiet_mode: true,
        };
        assert!(render(MessageKind::Separator, "", &quiet).is_none());
        assert!(render(MessageKind::Error, "boom", &quiet).is_some());
    }

    #[test]
    fn fields_align_values() {
        assert_eq!(format_field("Weight", "100 g"), "  Weight:        100 g");
    }
}
