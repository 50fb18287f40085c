use std::fmt;

use dialoguer::{theme::ColorfulTheme, Confirm};

use crate::cli::core::CommandError;
use crate::cli::output;

pub fn print_info(message: impl fmt::Display) {
    output::info(message);
}

pub fn print_warning(message: impl fmt::Display) {
    output::warning(message);
}

pub fn print_error(message: impl fmt::Display) {
    output::error(message);
}

pub fn print_success(message: impl fmt::Display) {
    output::success(message);
}

pub fn print_field(label: &str, value: impl fmt::Display) {
    output::field(label, value);
}

/// Prints one indented line per row, or `empty` when there are none.
pub fn print_rows<I, T>(rows: I, empty: &str)
where
    I: IntoIterator<Item = T>,
    T: fmt::Display,
{
    let mut printed = false;
    for row in rows {
        output::info(format!("  {}", row));
        printed = true;
    }
    if !printed {
        output::info(empty);
    }
}

/// Yes/no prompt. Escape counts as "no".
pub fn confirm(theme: &ColorfulTheme, prompt: &str, default: bool) -> Result<bool, CommandError> {
    let answer = Confirm::with_theme(theme)
        .with_prompt(prompt)
        .default(default)
        .interact_opt()?;
    Ok(answer.unwrap_or(false))
}
