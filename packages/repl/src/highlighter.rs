use nu_ansi_term::{Color, Style};
use reedline::{Highlighter, StyledText};

use crate::commands::COMMANDS;

/// Syntax highlighter for the console
pub struct ReplHighlighter {
    commands: Vec<&'static str>,
}

impl ReplHighlighter {
    pub fn new() -> Self {
        Self {
            commands: COMMANDS.to_vec(),
        }
    }
}

impl Default for ReplHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

/// Split `rest` after its first argument, keeping leading whitespace with
/// the argument. Parenthesized signatures count as part of the argument.
fn split_first_arg(rest: &str) -> (&str, &str) {
    let start = rest.len() - rest.trim_start().len();
    let mut depth = 0usize;
    for (i, c) in rest[start..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if c.is_whitespace() && depth == 0 => return rest.split_at(start + i),
            _ => {}
        }
    }
    (rest, "")
}

impl Highlighter for ReplHighlighter {
    fn highlight(&self, line: &str, _cursor: usize) -> StyledText {
        let mut styled = StyledText::new();

        if line.is_empty() {
            return styled;
        }

        let (command, rest) = match line.find(char::is_whitespace) {
            Some(pos) => (&line[..pos], &line[pos..]),
            None => (line, ""),
        };

        let cmd_lower = command.to_lowercase();
        let cmd_style = if self.commands.contains(&cmd_lower.as_str()) {
            Style::new().bold().fg(Color::Cyan)
        } else {
            Style::new().fg(Color::Red)
        };
        styled.push((cmd_style, command.to_string()));

        if rest.is_empty() {
            return styled;
        }

        match cmd_lower.as_str() {
            // Member name, then typed values
            "set" | "w" | "invoke" | "call" => {
                let (member, values) = split_first_arg(rest);
                styled.push((Style::new().fg(Color::Yellow), member.to_string()));
                if !values.is_empty() {
                    styled.push((Style::new().fg(Color::Green), values.to_string()));
                }
            }
            "get" | "r" | "cd" | "info" | "ls" => {
                styled.push((Style::new().fg(Color::Yellow), rest.to_string()));
            }
            _ => {
                styled.push((Style::new(), rest.to_string()));
            }
        }

        styled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_creates_highlighter_with_commands() {
        let highlighter = ReplHighlighter::new();
        for command in ["help", "exit", "q", "ls", "cd", "info", "get", "r", "set", "w", "invoke", "call"] {
            assert!(highlighter.commands.contains(&command), "{}", command);
        }
    }

    #[test]
    fn default_creates_same_as_new() {
        let default: ReplHighlighter = Default::default();
        let new = ReplHighlighter::new();
        assert_eq!(default.commands, new.commands);
    }

    #[test]
    fn highlight_empty_returns_empty() {
        let highlighter = ReplHighlighter::new();
        let styled = highlighter.highlight("", 0);
        assert!(styled.buffer.is_empty());
    }

    #[test]
    fn highlight_recognized_command_only() {
        let highlighter = ReplHighlighter::new();
        let styled = highlighter.highlight("help", 0);
        assert_eq!(styled.buffer.len(), 1);
        assert_eq!(styled.buffer[0].1, "help");
        assert_eq!(styled.buffer[0].0.foreground, Some(Color::Cyan));
        assert!(styled.buffer[0].0.is_bold);
    }

    #[test]
    fn highlight_unknown_command() {
        let highlighter = ReplHighlighter::new();
        let styled = highlighter.highlight("read /path", 0);
        assert_eq!(styled.buffer[0].1, "read");
        assert_eq!(styled.buffer[0].0.foreground, Some(Color::Red));
        assert_eq!(styled.buffer[1].0.foreground, None);
    }

    #[test]
    fn highlight_get_attributes() {
        let highlighter = ReplHighlighter::new();
        let styled = highlighter.highlight("get size hits", 0);
        assert_eq!(styled.buffer.len(), 2);
        assert_eq!(styled.buffer[1].1, " size hits");
        assert_eq!(styled.buffer[1].0.foreground, Some(Color::Yellow));
    }

    #[test]
    fn highlight_set_splits_attribute_and_value() {
        let highlighter = ReplHighlighter::new();
        let styled = highlighter.highlight("set label \"two words\"", 0);
        assert_eq!(styled.buffer.len(), 3);
        assert_eq!(styled.buffer[1].1, " label");
        assert_eq!(styled.buffer[1].0.foreground, Some(Color::Yellow));
        assert_eq!(styled.buffer[2].1, " \"two words\"");
        assert_eq!(styled.buffer[2].0.foreground, Some(Color::Green));
    }

    #[test]
    fn highlight_set_attribute_only() {
        let highlighter = ReplHighlighter::new();
        let styled = highlighter.highlight("w size", 0);
        assert_eq!(styled.buffer.len(), 2);
        assert_eq!(styled.buffer[1].1, " size");
    }

    #[test]
    fn highlight_invoke_keeps_signature_together() {
        let highlighter = ReplHighlighter::new();
        let styled = highlighter.highlight("invoke resize(int, boolean) 8 true", 0);
        assert_eq!(styled.buffer.len(), 3);
        assert_eq!(styled.buffer[1].1, " resize(int, boolean)");
        assert_eq!(styled.buffer[2].1, " 8 true");
        assert_eq!(styled.buffer[2].0.foreground, Some(Color::Green));
    }

    #[test]
    fn highlight_cd_name() {
        let highlighter = ReplHighlighter::new();
        let styled = highlighter.highlight("cd demo:name=scheduler", 0);
        assert_eq!(styled.buffer[0].0.foreground, Some(Color::Cyan));
        assert_eq!(styled.buffer[1].0.foreground, Some(Color::Yellow));
    }

    #[test]
    fn highlight_help_with_args() {
        let highlighter = ReplHighlighter::new();
        let styled = highlighter.highlight("help topic", 0);
        assert_eq!(styled.buffer.len(), 2);
        assert_eq!(styled.buffer[1].1, " topic");
        assert_eq!(styled.buffer[1].0.foreground, None);
    }

    #[test]
    fn highlight_case_insensitive() {
        let highlighter = ReplHighlighter::new();
        let styled = highlighter.highlight("InVoKe clear", 0);
        assert_eq!(styled.buffer[0].1, "InVoKe");
        assert_eq!(styled.buffer[0].0.foreground, Some(Color::Cyan));
    }

    #[test]
    fn split_first_arg_keeps_leading_space() {
        assert_eq!(split_first_arg("  put x"), ("  put", " x"));
        assert_eq!(split_first_arg(" op( a , b )"), (" op( a , b )", ""));
    }
}
