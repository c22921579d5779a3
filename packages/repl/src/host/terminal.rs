//! Terminal host on Reedline: line editing in vi or emacs mode, command
//! and name completion, highlighting and persistent history.

use std::borrow::Cow;
use std::io::{self, Write};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use mgmt_core::Registry;

use nu_ansi_term::{Color, Style};
use reedline::{
    default_emacs_keybindings, default_vi_insert_keybindings, default_vi_normal_keybindings,
    ColumnarMenu, DefaultHinter, EditMode, Emacs, KeyCode, KeyModifiers, MenuBuilder,
    Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus, Reedline,
    ReedlineEvent, ReedlineMenu, Signal as ReedlineSignal, Vi,
};

use crate::completer::ReplCompleter;
use crate::highlighter::ReplHighlighter;
use crate::io::{InputLine, IoError, IoHost, Output, OutputStyle, PromptConfig, Signal};

/// Environment variable forcing the edit mode (`vi` or `emacs`).
pub const EDIT_MODE_ENV: &str = "MGMT_EDIT_MODE";

/// How the line editor picks its key bindings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EditModeChoice {
    /// Consult the environment and `.inputrc`.
    #[default]
    Detect,
    Vi,
    Emacs,
}

impl FromStr for EditModeChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vi" | "vim" => Ok(EditModeChoice::Vi),
            "emacs" => Ok(EditModeChoice::Emacs),
            "" | "auto" | "detect" => Ok(EditModeChoice::Detect),
            other => Err(format!("unknown edit mode '{}'", other)),
        }
    }
}

/// Terminal host using Reedline for interactive I/O.
pub struct TerminalHost {
    line_editor: Reedline,
    /// Line read by the last `wait_for_input()`, until taken.
    pending_input: Option<InputLine>,
    /// Ctrl+C or Ctrl+D seen by the last `wait_for_input()`.
    pending_signal: Option<Signal>,
    /// Rendered on the next read.
    current_prompt: PromptConfig,
}

impl TerminalHost {
    /// Create a terminal host completing names from `registry`.
    pub fn new(registry: Arc<Registry>, edit_mode: EditModeChoice) -> io::Result<Self> {
        // Completion sees live registrations through the shared registry
        let completer = Box::new(ReplCompleter::new().with_registry(registry));
        let highlighter = Box::new(ReplHighlighter::new());
        let hinter = Box::new(
            DefaultHinter::default().with_style(Style::new().fg(Color::LightGray).dimmed()),
        );

        // Create completion menu
        let completion_menu = Box::new(
            ColumnarMenu::default()
                .with_name("completion_menu")
                .with_text_style(Style::new().fg(Color::Cyan))
                .with_selected_text_style(Style::new().fg(Color::Black).on(Color::Cyan).bold()),
        );

        let edit_mode: Box<dyn EditMode> = if should_use_vi_mode(edit_mode) {
            let mut insert_keybindings = default_vi_insert_keybindings();
            let normal_keybindings = default_vi_normal_keybindings();

            // Tab opens the menu, then cycles through it
            insert_keybindings.add_binding(
                KeyModifiers::NONE,
                KeyCode::Tab,
                ReedlineEvent::UntilFound(vec![
                    ReedlineEvent::Menu("completion_menu".to_string()),
                    ReedlineEvent::MenuNext,
                ]),
            );

            Box::new(Vi::new(insert_keybindings, normal_keybindings))
        } else {
            let mut keybindings = default_emacs_keybindings();
            keybindings.add_binding(
                KeyModifiers::NONE,
                KeyCode::Tab,
                ReedlineEvent::UntilFound(vec![
                    ReedlineEvent::Menu("completion_menu".to_string()),
                    ReedlineEvent::MenuNext,
                ]),
            );

            Box::new(Emacs::new(keybindings))
        };

        // Build the line editor
        let mut line_editor = Reedline::create()
            .with_completer(completer)
            .with_highlighter(highlighter)
            .with_hinter(hinter)
            .with_menu(ReedlineMenu::EngineCompleter(completion_menu))
            .with_edit_mode(edit_mode);

        // History is best effort: a read-only data dir just disables it
        if let Some(history_path) = get_history_path() {
            if let Some(parent) = history_path.parent() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    tracing::debug!(path = %parent.display(), error = %e, "cannot create history directory");
                }
            }
            match reedline::FileBackedHistory::with_file(1000, history_path) {
                Ok(history) => line_editor = line_editor.with_history(Box::new(history)),
                Err(e) => tracing::debug!(error = %e, "history disabled"),
            }
        }

        Ok(Self {
            line_editor,
            pending_input: None,
            pending_signal: None,
            current_prompt: PromptConfig::default(),
        })
    }
}

impl IoHost for TerminalHost {
    fn wait_for_input(&mut self) -> Result<(), IoError> {
        // Blocks until a line is entered or a signal key is pressed
        let prompt = TerminalPrompt::from_config(&self.current_prompt);

        match self.line_editor.read_line(&prompt)? {
            ReedlineSignal::Success(line) => {
                self.pending_input = Some(InputLine { line });
            }
            ReedlineSignal::CtrlC => {
                self.pending_signal = Some(Signal::Interrupt);
            }
            ReedlineSignal::CtrlD => {
                self.pending_signal = Some(Signal::Eof);
            }
        }

        Ok(())
    }

    fn read_input(&mut self) -> Result<Option<InputLine>, IoError> {
        Ok(self.pending_input.take())
    }

    fn read_signal(&mut self) -> Result<Option<Signal>, IoError> {
        Ok(self.pending_signal.take())
    }

    fn write_output(&mut self, output: Output) -> Result<(), IoError> {
        let styled = match output.style {
            OutputStyle::Normal => output.text,
            OutputStyle::Error => {
                format!("{} {}", Color::Red.bold().paint("Error:"), output.text)
            }
            OutputStyle::Info => Color::Cyan.paint(&output.text).to_string(),
            OutputStyle::Banner => Color::Cyan.paint(&output.text).to_string(),
        };
        println!("{}", styled);
        Ok(())
    }

    fn write_prompt(&mut self, config: PromptConfig) -> Result<(), IoError> {
        self.current_prompt = config;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), IoError> {
        Ok(io::stdout().flush()?)
    }
}

/// Prompt implementation for the terminal.
struct TerminalPrompt {
    object_count: usize,
    current_name: Option<String>,
}

impl TerminalPrompt {
    fn from_config(config: &PromptConfig) -> Self {
        Self {
            object_count: config.object_count,
            current_name: config.current_name.clone(),
        }
    }
}

impl Prompt for TerminalPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        let count = if self.object_count == 0 {
            Color::Yellow.paint("no objects").to_string()
        } else {
            Color::Blue
                .bold()
                .paint(format!("{} object(s)", self.object_count))
                .to_string()
        };
        match &self.current_name {
            Some(name) => Cow::Owned(format!("{} {}", count, Color::Yellow.paint(name))),
            None => Cow::Owned(count),
        }
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, edit_mode: PromptEditMode) -> Cow<'_, str> {
        match edit_mode {
            PromptEditMode::Default | PromptEditMode::Emacs => {
                Cow::Owned(format!("{} ", Color::Green.bold().paint(">")))
            }
            PromptEditMode::Vi(vi_mode) => {
                let indicator = match vi_mode {
                    reedline::PromptViMode::Normal => Color::Blue.bold().paint("[N]>"),
                    reedline::PromptViMode::Insert => Color::Green.bold().paint("[I]>"),
                };
                Cow::Owned(format!("{} ", indicator))
            }
            PromptEditMode::Custom(s) => Cow::Owned(format!("({})> ", s)),
        }
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed(": ")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!(
            "({}reverse-search: {}) ",
            prefix, history_search.term
        ))
    }
}

fn get_history_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join("mgmt").join("history.txt"))
}

/// Whether to use vi key bindings.
///
/// An explicit choice wins, then `MGMT_EDIT_MODE`, then `EDITOR`/`VISUAL`,
/// then `.inputrc`.
fn should_use_vi_mode(choice: EditModeChoice) -> bool {
    match choice {
        EditModeChoice::Vi => return true,
        EditModeChoice::Emacs => return false,
        EditModeChoice::Detect => {}
    }

    if let Ok(mode) = std::env::var(EDIT_MODE_ENV) {
        match mode.parse::<EditModeChoice>() {
            Ok(EditModeChoice::Vi) => return true,
            Ok(EditModeChoice::Emacs) => return false,
            Ok(EditModeChoice::Detect) => {}
            Err(e) => tracing::warn!(error = %e, "ignoring {}", EDIT_MODE_ENV),
        }
    }

    // Editor preference from EDITOR, then VISUAL
    for var in ["EDITOR", "VISUAL"] {
        if let Ok(editor) = std::env::var(var) {
            if editor_prefers_vi(&editor) {
                return true;
            }
        }
    }

    check_inputrc_vi_mode()
}

/// Whether an `EDITOR`-style command names vi or a vim variant. Arguments
/// and leading directories are ignored.
fn editor_prefers_vi(editor: &str) -> bool {
    let program = editor
        .split_whitespace()
        .next()
        .unwrap_or("")
        .rsplit('/')
        .next()
        .unwrap_or("")
        .to_lowercase();
    program == "vi" || program.contains("vim")
}

/// Check .inputrc for vi mode setting.
fn check_inputrc_vi_mode() -> bool {
    let inputrc_paths = [
        std::env::var("INPUTRC").ok().map(PathBuf::from),
        dirs::home_dir().map(|p| p.join(".inputrc")),
        Some(PathBuf::from("/etc/inputrc")),
    ];

    inputrc_paths
        .into_iter()
        .flatten()
        .filter_map(|path| std::fs::read_to_string(path).ok())
        .any(|content| inputrc_sets_vi(&content))
}

/// Whether any line reads `set editing-mode vi`.
fn inputrc_sets_vi(content: &str) -> bool {
    content.lines().any(|line| {
        let words: Vec<&str> = line.split_whitespace().collect();
        matches!(words.as_slice(), ["set", "editing-mode", "vi", ..])
    })
}
