use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use dialoguer::theme::ColorfulTheme;
use strsim::levenshtein;
use thiserror::Error;

use crate::analytics::{Analytics, UsageEvent};
use crate::auth::AuthStore;
use crate::cli::commands::{self, CommandDefinition, CommandRegistry};
use crate::cli::io;
use crate::config::{preferences::PreferencesManager, SettingsManager};
use crate::core::{
    calculator::{CostBreakdown, CostInputs},
    errors::{CliError, QuoteError},
    managers::Managers,
    utils::PathResolver,
};
use crate::storage::json_backend::JsonStorage;

const HISTORY_FILE: &str = "shell_history.txt";
const SUGGESTION_DISTANCE: usize = 3;

pub type CommandResult = Result<(), CommandError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

/// Last successful calculation, kept so `quote save` can persist it.
#[derive(Debug, Clone)]
pub(crate) struct LastCalculation {
    pub inputs: CostInputs,
    pub breakdown: CostBreakdown,
}

/// Everything a command handler can touch.
pub struct ShellContext {
    pub mode: CliMode,
    pub registry: CommandRegistry,
    pub theme: ColorfulTheme,
    pub storage: JsonStorage,
    pub settings: SettingsManager,
    pub preferences: PreferencesManager,
    pub analytics: Analytics,
    pub auth: AuthStore,
    pub managers: Managers,
    pub(crate) last_calculation: Option<LastCalculation>,
    pub last_command: Option<String>,
    pub running: bool,
    started_at: Instant,
}

impl ShellContext {
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        Self::with_base_dir(mode, &PathResolver::base_dir())
    }

    /// Opens every store under `base`.
    pub fn with_base_dir(mode: CliMode, base: &Path) -> Result<Self, CliError> {
        let storage = JsonStorage::new(Some(base.to_path_buf()), None)?;
        let settings = SettingsManager::open(base)?;
        let preferences = PreferencesManager::open(base)?;
        let mut analytics = Analytics::open(base);
        analytics.track(UsageEvent::AppStart);
        let auth = AuthStore::open(base);
        let managers = Managers::open(Arc::new(storage.clone()));
        tracing::debug!(base = %base.display(), ?mode, "shell context ready");

        Ok(Self {
            mode,
            registry: CommandRegistry::new(commands::all_definitions()),
            theme: ColorfulTheme::default(),
            storage,
            settings,
            preferences,
            analytics,
            auth,
            managers,
            last_calculation: None,
            last_command: None,
            running: true,
            started_at: Instant::now(),
        })
    }

    pub fn prompt(&self) -> String {
        match self.auth.current_user() {
            Some(user) => format!("print-quote ({})> ", user),
            None => "print-quote> ".to_string(),
        }
    }

    pub fn command(&self, name: &str) -> Option<&CommandDefinition> {
        self.registry.get(name)
    }

    pub fn can_prompt(&self) -> bool {
        self.mode == CliMode::Interactive
    }

    pub fn currency_symbol(&self) -> &str {
        &self.settings.settings().currency_symbol
    }

    /// Money as the user prefers to read it.
    pub fn money(&self, value: f64) -> String {
        self.preferences
            .preferences()
            .format_money(value, self.settings.settings())
    }

    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        let Some(definition) = self.registry.get(command) else {
            self.suggest_command(raw);
            return Ok(LoopControl::Continue);
        };
        if let Some(action) = args.first() {
            check_action(definition, action)?;
        }
        let handler = definition.handler;
        match handler(self, args) {
            Ok(()) => {
                self.analytics.track_feature(command);
                Ok(LoopControl::Continue)
            }
            Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
            Err(err) => Err(err),
        }
    }

    pub fn suggest_command(&self, input: &str) {
        io::print_warning(format!(
            "Unknown command `{}`. Type `help` to see available commands.",
            input
        ));
        if let Some(name) = closest(input, self.registry.names()) {
            io::print_info(format!("Did you mean `{}`?", name));
        }
    }

    /// Shell history lives next to the data documents.
    pub(crate) fn history_path(&self) -> PathBuf {
        self.storage.base_dir().join(HISTORY_FILE)
    }

    pub(crate) fn confirm_exit(&self) -> Result<bool, CliError> {
        if !self.can_prompt() {
            return Ok(true);
        }
        io::confirm(&self.theme, "Exit the shell?", true).map_err(CliError::from)
    }

    /// Asks before destructive changes; script mode always proceeds.
    pub fn confirm(&self, prompt: &str) -> Result<bool, CommandError> {
        if !self.can_prompt() {
            return Ok(true);
        }
        io::confirm(&self.theme, prompt, false)
    }

    pub(crate) fn report_error(&self, err: CommandError) -> Result<(), CliError> {
        match err {
            CommandError::InvalidArguments(message) => {
                io::print_error(message);
                io::print_info("Use `help <command>` for usage details.");
            }
            other => io::print_error(other.to_string()),
        }
        Ok(())
    }

    /// Re-reads every document after the data directory changed underneath us.
    pub fn reload_all(&mut self) {
        self.settings.reload();
        self.preferences.reload();
        self.analytics.reload();
        self.managers.reload();
    }

    pub(crate) fn finish_session(&mut self) {
        let seconds = self.started_at.elapsed().as_secs();
        self.analytics.track_time_spent(seconds);
    }

    #[cfg(test)]
    pub(crate) fn process_line(&mut self, line: &str) -> Result<LoopControl, CommandError> {
        crate::cli::shell::handle_line(self, line)
    }

    #[cfg(test)]
    pub(crate) fn process_script(&mut self, lines: &[&str]) -> Vec<CommandError> {
        let mut errors = Vec::new();
        for line in lines {
            match self.process_line(line) {
                Ok(LoopControl::Exit) => break,
                Ok(LoopControl::Continue) => {}
                Err(err) => errors.push(err),
            }
        }
        errors
    }
}

/// Rejects an action the command does not know, naming the nearest one.
fn check_action(definition: &CommandDefinition, raw: &str) -> CommandResult {
    if definition.actions.is_empty() {
        return Ok(());
    }
    let action = raw.to_lowercase();
    if definition.actions.contains(&action.as_str()) {
        return Ok(());
    }
    let hint = closest(&action, definition.actions.iter().copied())
        .map(|name| format!(" Did you mean `{}`?", name))
        .unwrap_or_default();
    Err(CommandError::InvalidArguments(format!(
        "unknown {} action `{}`.{}",
        definition.name, raw, hint
    )))
}

fn closest<'a>(input: &str, candidates: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let needle = input.to_lowercase();
    candidates
        .map(|name| (name, levenshtein(&needle, name)))
        .filter(|(_, distance)| *distance <= SUGGESTION_DISTANCE)
        .min_by_key(|(_, distance)| *distance)
        .map(|(name, _)| name)
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Core(#[from] QuoteError),
    #[error(transparent)]
    Dialoguer(#[from] dialoguer::Error),
    #[error("exit requested")]
    ExitRequested,
}

impl From<CliError> for CommandError {
    fn from(err: CliError) -> Self {
        match err {
            CliError::Core(inner) => CommandError::Core(inner),
            CliError::Input(message) | CliError::Command(message) => {
                CommandError::InvalidArguments(message)
            }
        }
    }
}

impl From<CommandError> for CliError {
    fn from(err: CommandError) -> Self {
        CliError::Command(err.to_string())
    }
}
