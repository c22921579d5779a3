use std::sync::Arc;

use mgmt_core::{NamePattern, Registry};
use reedline::{Completer, Span, Suggestion};

use crate::commands::COMMANDS;

/// Completes command names, and registered names after `cd`, `info` and `ls`.
pub struct ReplCompleter {
    commands: Vec<String>,
    registry: Option<Arc<Registry>>,
}

impl ReplCompleter {
    pub fn new() -> Self {
        Self {
            commands: COMMANDS
                .iter()
                .filter(|c| c.len() > 1)
                .map(|c| c.to_string())
                .collect(),
            registry: None,
        }
    }

    /// Also complete object names from `registry`.
    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    fn complete_names(&self, prefix: &str, start: usize, pos: usize) -> Vec<Suggestion> {
        let Some(registry) = &self.registry else {
            return Vec::new();
        };
        registry
            .names(&NamePattern::any())
            .into_iter()
            .filter_map(|name| {
                let rendered = name.to_string();
                let matches = rendered.starts_with(prefix) || name.leaf().starts_with(prefix);
                matches.then(|| Suggestion {
                    value: rendered,
                    description: Some(name.leaf().to_string()),
                    style: None,
                    extra: None,
                    span: Span::new(start, pos),
                    append_whitespace: true,
                    match_indices: None,
                })
            })
            .collect()
    }
}

impl Default for ReplCompleter {
    fn default() -> Self {
        Self::new()
    }
}

impl Completer for ReplCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        let line_to_pos = &line[..pos];
        let words: Vec<&str> = line_to_pos.split_whitespace().collect();
        let typing_word = !line_to_pos.is_empty() && !line_to_pos.ends_with(' ');

        if words.is_empty() || (words.len() == 1 && typing_word) {
            let prefix = words.first().copied().unwrap_or("");
            let start = pos - prefix.len();

            return self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(prefix))
                .map(|cmd| Suggestion {
                    value: cmd.clone(),
                    description: Some(command_description(cmd).to_string()),
                    style: None,
                    extra: None,
                    span: Span::new(start, pos),
                    append_whitespace: true,
                    match_indices: None,
                })
                .collect();
        }

        let takes_name = matches!(
            words[0].to_lowercase().as_str(),
            "cd" | "info" | "ls"
        );
        let arg_index = if typing_word { words.len() - 1 } else { words.len() };
        if takes_name && arg_index == 1 {
            let prefix = if typing_word { words[words.len() - 1] } else { "" };
            return self.complete_names(prefix, pos - prefix.len(), pos);
        }

        Vec::new()
    }
}

fn command_description(cmd: &str) -> &'static str {
    match cmd {
        "help" => "Show help",
        "exit" | "quit" => "Exit the console",
        "ls" => "List registered names",
        "cd" => "Select an object",
        "pwd" => "Print the selected name",
        "info" => "Show attributes and operations",
        "get" => "Read attributes",
        "set" => "Write an attribute",
        "invoke" | "call" => "Invoke an operation",
        _ => "",
    }
}
