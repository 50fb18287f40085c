use std::{
    borrow::Cow,
    collections::BTreeMap,
    io::{self, BufRead},
};

use rustyline::{
    completion::{Completer, Pair},
    error::ReadlineError,
    highlight::Highlighter,
    hint::Hinter,
    history::DefaultHistory,
    validate::{ValidationContext, ValidationResult, Validator},
    Cmd, Context as ReadlineContext, Editor, Helper, KeyEvent,
};

use crate::cli::commands::CommandRegistry;
use crate::cli::core::{CliMode, CommandError, LoopControl, ShellContext};
use crate::cli::output::{self, OutputPreferences};
use crate::core::errors::CliError;

pub(crate) const SCRIPT_ENV: &str = "PRINT_QUOTE_CLI_SCRIPT";

/// What the line source produced for one turn of the loop.
enum Turn {
    Line(String),
    Skip,
    Stop,
}

/// Starts the shell. Setting `PRINT_QUOTE_CLI_SCRIPT` reads commands from stdin
/// without prompts or colors.
pub fn run_cli() -> Result<(), CliError> {
    let mode = if std::env::var_os(SCRIPT_ENV).is_some() {
        output::set_preferences(OutputPreferences {
            plain_mode: true,
            quiet_mode: false,
        });
        CliMode::Script
    } else {
        CliMode::Interactive
    };

    let mut context = ShellContext::new(mode)?;
    tracing::info!(?mode, data_dir = %context.storage.base_dir().display(), "shell started");
    match mode {
        CliMode::Interactive => run_interactive(&mut context),
        CliMode::Script => run_script(&mut context),
    }
}

fn run_interactive(context: &mut ShellContext) -> Result<(), CliError> {
    let mut editor = Editor::<CommandHelper, DefaultHistory>::new()?;
    editor.set_helper(Some(CommandHelper::from_registry(&context.registry)));
    editor.bind_sequence(KeyEvent::from('?'), Cmd::Complete);

    let history = context.history_path();
    if editor.load_history(&history).is_err() {
        tracing::debug!(path = %history.display(), "no shell history yet");
    }
    output::info("Type `help` for commands, `exit` to quit.");

    let result = drive(context, |context| {
        match editor.readline(&context.prompt()) {
            Ok(line) => {
                let line = line.trim().to_string();
                if line.is_empty() {
                    return Ok(Turn::Skip);
                }
                editor.add_history_entry(line.as_str()).ok();
                Ok(Turn::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(if context.confirm_exit()? {
                Turn::Stop
            } else {
                Turn::Skip
            }),
            Err(ReadlineError::Eof) => {
                output::info("Goodbye.");
                Ok(Turn::Stop)
            }
            Err(err) => Err(err.into()),
        }
    });

    if let Err(err) = editor.save_history(&history) {
        tracing::warn!(path = %history.display(), error = %err, "could not save shell history");
    }
    result
}

fn run_script(context: &mut ShellContext) -> Result<(), CliError> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    drive(context, |_| {
        let Some(line) = lines.next() else {
            return Ok(Turn::Stop);
        };
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            Ok(Turn::Skip)
        } else {
            Ok(Turn::Line(trimmed.to_string()))
        }
    })
}

/// Pulls lines from `next` and runs them until a command exits or the source dries up.
fn drive<F>(context: &mut ShellContext, mut next: F) -> Result<(), CliError>
where
    F: FnMut(&ShellContext) -> Result<Turn, CliError>,
{
    while context.running {
        let line = match next(context)? {
            Turn::Line(line) => line,
            Turn::Skip => continue,
            Turn::Stop => break,
        };
        match handle_line(context, &line) {
            Ok(LoopControl::Continue) => {}
            Ok(LoopControl::Exit) => break,
            Err(err) => context.report_error(err)?,
        }
    }
    context.finish_session();
    Ok(())
}

pub(crate) fn handle_line(context: &mut ShellContext, line: &str) -> Result<LoopControl, CommandError> {
    let tokens = match shell_words::split(line) {
        Ok(tokens) => tokens,
        Err(err) => {
            output::warning(format!("Could not read that line: {}", err));
            return Ok(LoopControl::Continue);
        }
    };
    let Some((raw, rest)) = tokens.split_first() else {
        return Ok(LoopControl::Continue);
    };
    let args: Vec<&str> = rest.iter().map(String::as_str).collect();
    context.last_command = Some(line.trim().to_string());

    let control = context.dispatch(&raw.to_lowercase(), raw, &args)?;
    if control == LoopControl::Exit {
        context.running = false;
    }
    Ok(control)
}

/// Completes command names in first position and their actions in second.
struct CommandHelper {
    actions: BTreeMap<&'static str, &'static [&'static str]>,
}

impl CommandHelper {
    fn from_registry(registry: &CommandRegistry) -> Self {
        Self {
            actions: registry
                .iter()
                .map(|definition| (definition.name, definition.actions))
                .collect(),
        }
    }

    fn candidates(&self, words: &[&str], needle: &str) -> Vec<Pair> {
        let matching = |name: &&str| name.starts_with(needle);
        let names: Vec<&str> = match words {
            [] => self.actions.keys().copied().filter(matching).collect(),
            [command] => self
                .actions
                .get(command.to_ascii_lowercase().as_str())
                .map(|actions| actions.iter().copied().filter(matching).collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        names
            .into_iter()
            .map(|name| Pair {
                display: name.to_string(),
                replacement: name.to_string(),
            })
            .collect()
    }
}

impl Helper for CommandHelper {}

impl Completer for CommandHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &ReadlineContext<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let prefix = &line[..pos];
        let start = prefix
            .rfind(char::is_whitespace)
            .map(|idx| idx + 1)
            .unwrap_or(0);
        let finished: Vec<&str> = prefix[..start].split_whitespace().collect();
        let needle = prefix[start..].to_ascii_lowercase();
        Ok((start, self.candidates(&finished, &needle)))
    }
}

impl Hinter for CommandHelper {
    type Hint = String;
}

impl Highlighter for CommandHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        Cow::Borrowed(line)
    }
}

impl Validator for CommandHelper {
    fn validate(&self, _ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        Ok(ValidationResult::Valid(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::all_definitions;

    fn helper() -> CommandHelper {
        CommandHelper::from_registry(&CommandRegistry::new(all_definitions()))
    }

    fn replacements(pairs: Vec<Pair>) -> Vec<String> {
        pairs.into_iter().map(|pair| pair.replacement).collect()
    }

    #[test]
    fn first_word_completes_commands() {
        let names = replacements(helper().candidates(&[], "pr"));
        assert_eq!(names, vec!["prefs", "printer", "project"]);
    }

    #[test]
    fn second_word_completes_actions() {
        let names = replacements(helper().candidates(&["Material"], "s"));
        assert_eq!(names, vec!["show", "stock", "status", "supplier", "search", "stats"]);
        assert!(helper().candidates(&["calc", "100"], "").is_empty());
    }
}
