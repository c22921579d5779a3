//! Values exchanged between the console core and its host.

use serde::{Deserialize, Serialize};

/// One line typed at the prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputLine {
    pub line: String,
}

/// Out-of-band key presses the host reports instead of a line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "lowercase")]
pub enum Signal {
    /// Ctrl+C
    Interrupt,
    /// Ctrl+D, or no more scripted input.
    Eof,
}

/// Text for the host to print, with a rendering hint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    pub text: String,
    #[serde(default)]
    pub style: OutputStyle,
}

impl Output {
    pub fn styled(style: OutputStyle, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    /// Command results. May already carry ANSI colour.
    pub fn normal(text: impl Into<String>) -> Self {
        Self::styled(OutputStyle::Normal, text)
    }

    /// A failed command: error kind, message and cause chain.
    pub fn error(text: impl Into<String>) -> Self {
        Self::styled(OutputStyle::Error, text)
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::styled(OutputStyle::Info, text)
    }

    pub fn banner(text: impl Into<String>) -> Self {
        Self::styled(OutputStyle::Banner, text)
    }

    pub fn is_error(&self) -> bool {
        self.style == OutputStyle::Error
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    #[default]
    Normal,
    Error,
    Info,
    Banner,
}

/// What the host shows in the prompt before the next line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Number of registered objects.
    pub object_count: usize,
    /// Rendered name of the object selected with `cd`.
    #[serde(default)]
    pub current_name: Option<String>,
}

/// Why the console loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// `exit`, `quit` or `q`.
    UserExit,
    /// End of input.
    Eof,
}
