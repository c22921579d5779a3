//! Console command parsing and execution.
//!
//! Commands:
//! - `ls [pattern]` - List registered names
//! - `cd <name>` / `cd ..` - Select an object, or clear the selection
//! - `pwd` - Print the selected name
//! - `info [--json] [name]` - Show attributes and operations
//! - `get <attr>...` - Read one or more attributes
//! - `set <attr> <value>` - Write an attribute from text
//! - `invoke <op>[(types)] [args...]` - Invoke an operation
//! - `help` - Show help
//! - `exit` - Exit the console
//!
//! Arguments may be double-quoted to include spaces. A parenthesized
//! signature stays one argument even when it contains spaces.

use nu_ansi_term::{Color, Style};
use serde_json::Value as JsonValue;

use mgmt_core::{format_chain, BeanInfo, NamePattern, Value};

use crate::context::{ConsoleContext, ContextError};

/// Result of executing a command
pub enum CommandResult {
    /// Command succeeded, optionally with output to display
    Ok(Option<String>),
    /// Command failed with a rendered error
    Error(String),
    /// User requested to exit
    Exit,
    /// Show help
    Help,
}

impl CommandResult {
    fn ok_display(display: impl Into<String>) -> Self {
        CommandResult::Ok(Some(display.into()))
    }

    fn ok_none() -> Self {
        CommandResult::Ok(None)
    }
}

impl From<ContextError> for CommandResult {
    fn from(err: ContextError) -> Self {
        CommandResult::Error(format_error(&err))
    }
}

impl From<mgmt_core::Error> for CommandResult {
    fn from(err: mgmt_core::Error) -> Self {
        CommandResult::Error(format_mgmt_error(&err))
    }
}

/// Render a management error as `Kind: message` plus its causes.
pub fn format_mgmt_error(err: &mgmt_core::Error) -> String {
    format!("{}: {}", err.kind(), format_chain(err))
}

fn format_error(err: &ContextError) -> String {
    match err {
        ContextError::Mgmt(inner) => format_mgmt_error(inner),
        other => other.to_string(),
    }
}

/// Names of every command, aliases included.
pub const COMMANDS: &[&str] = &[
    "ls", "cd", "pwd", "info", "get", "r", "set", "w", "invoke", "call", "help", "?", "exit",
    "quit", "q",
];

/// Parse and execute a command
pub fn execute(input: &str, ctx: &mut ConsoleContext) -> CommandResult {
    let input = input.trim();

    if input.is_empty() {
        return CommandResult::ok_none();
    }

    let args = match split_args(input) {
        Ok(args) => args,
        Err(message) => return CommandResult::Error(message),
    };
    let Some((command, args)) = args.split_first() else {
        return CommandResult::ok_none();
    };

    match command.to_lowercase().as_str() {
        "help" | "?" => CommandResult::Help,
        "exit" | "quit" | "q" => CommandResult::Exit,
        "ls" => cmd_ls(args, ctx),
        "cd" => cmd_cd(args, ctx),
        "pwd" => cmd_pwd(ctx),
        "info" => cmd_info(args, ctx),
        "get" | "r" => cmd_get(args, ctx),
        "set" | "w" => cmd_set(args, ctx),
        "invoke" | "call" => cmd_invoke(args, ctx),
        _ => CommandResult::Error(format!(
            "Unknown command: '{}'. Type 'help' for available commands.",
            command
        )),
    }
}

/// Split a command line into arguments.
///
/// Double quotes group words and support `\"` and `\\` escapes. Whitespace
/// inside parentheses does not split, so `resize(int, boolean)` stays whole.
pub fn split_args(input: &str) -> Result<Vec<String>, String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut in_quotes = false;
    let mut depth = 0usize;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => in_quotes = false,
                '\\' => match chars.next() {
                    Some(escaped) => current.push(escaped),
                    None => return Err("Unterminated escape at end of input".to_string()),
                },
                _ => current.push(c),
            }
            continue;
        }

        match c {
            '"' => {
                in_quotes = true;
                in_token = true;
            }
            '(' => {
                depth += 1;
                current.push(c);
                in_token = true;
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
                in_token = true;
            }
            c if c.is_whitespace() && depth == 0 => {
                if in_token {
                    args.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c if c.is_whitespace() => current.push(c),
            _ => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if in_quotes {
        return Err("Unterminated quote".to_string());
    }
    if in_token {
        args.push(current);
    }
    Ok(args)
}

/// Format help text
pub fn format_help() -> String {
    let cmd_style = Style::new().bold().fg(Color::Cyan);
    let arg_style = Style::new().fg(Color::Yellow);
    let desc_style = Style::new().fg(Color::White);

    let mut help = String::new();
    help.push_str(&format!(
        "{}\n\n",
        Style::new().bold().paint("Management Console Commands")
    ));

    let commands = [
        ("ls", "[pattern]", "List registered names (glob: * and ?)"),
        ("cd", "<name>|..", "Select an object by name, leaf or glob"),
        ("pwd", "", "Print the selected name"),
        ("info", "[--json] [name]", "Show attributes and operations"),
        ("", "", ""),
        ("get", "<attr>...", "Read attributes (alias: r)"),
        ("set", "<attr> <value>", "Write an attribute (alias: w)"),
        (
            "invoke",
            "<op>[(types)] [args...]",
            "Invoke an operation (alias: call)",
        ),
        ("", "", ""),
        ("help", "", "Show this help message"),
        ("exit", "", "Exit the console (alias: quit, q)"),
    ];

    for (cmd, args, desc) in commands {
        if cmd.is_empty() {
            help.push('\n');
        } else {
            help.push_str(&format!(
                "  {} {} {}\n",
                cmd_style.paint(format!("{:<8}", cmd)),
                arg_style.paint(format!("{:<26}", args)),
                desc_style.paint(desc)
            ));
        }
    }

    help.push_str(&format!("\n{}\n", Style::new().bold().paint("Examples")));
    for (label, example) in [
        ("Select a cache:", "cd sessions"),
        ("Read two attributes:", "get size hits"),
        ("Write from text:", "set enabled false"),
        ("Pick an overload:", "invoke resize(int, boolean) 16 true"),
        ("Quote spaces:", "invoke put \"two words\""),
    ] {
        help.push_str(&format!("  {:<22} {}\n", label, arg_style.paint(example)));
    }

    help.push_str(&format!(
        "\n{}",
        Style::new()
            .italic()
            .paint("Values are typed text: true/false, numbers, comma-separated arrays.")
    ));

    help
}

fn cmd_ls(args: &[String], ctx: &mut ConsoleContext) -> CommandResult {
    let pattern = match args {
        [] => NamePattern::any(),
        [pattern] => NamePattern::new(pattern.as_str()),
        _ => return CommandResult::Error("Usage: ls [pattern]".to_string()),
    };

    let names = match ctx.client().names(&pattern) {
        Ok(names) => names,
        Err(e) => return e.into(),
    };

    if names.is_empty() {
        return CommandResult::ok_display(format!(
            "{}",
            Color::Yellow.paint("No registered names match.")
        ));
    }

    let current = ctx.current();
    let lines: Vec<String> = names
        .iter()
        .map(|name| {
            if Some(name) == current {
                format!("{} {}", Color::Green.bold().paint("*"), Color::Cyan.bold().paint(name.to_string()))
            } else {
                format!("  {}", Color::Cyan.paint(name.to_string()))
            }
        })
        .collect();
    CommandResult::ok_display(lines.join("\n"))
}

fn cmd_cd(args: &[String], ctx: &mut ConsoleContext) -> CommandResult {
    match args {
        [] => {
            ctx.clear_selection();
            CommandResult::ok_none()
        }
        [target] if target == ".." || target == "/" => {
            ctx.clear_selection();
            CommandResult::ok_none()
        }
        [target] => match ctx.select(target) {
            Ok(_) => CommandResult::ok_none(),
            Err(e) => e.into(),
        },
        _ => CommandResult::Error("Usage: cd <name>|..".to_string()),
    }
}

fn cmd_pwd(ctx: &mut ConsoleContext) -> CommandResult {
    match ctx.current() {
        Some(name) => CommandResult::ok_display(name.to_string()),
        None => CommandResult::ok_display(format!("{}", Color::Yellow.paint("(no selection)"))),
    }
}

fn cmd_info(args: &[String], ctx: &mut ConsoleContext) -> CommandResult {
    let (json, rest): (bool, Vec<&String>) = {
        let json = args.iter().any(|a| a == "--json");
        (json, args.iter().filter(|a| *a != "--json").collect())
    };
    let explicit = match rest.as_slice() {
        [] => None,
        [name] => Some(name.as_str()),
        _ => return CommandResult::Error("Usage: info [--json] [name]".to_string()),
    };

    let name = match ctx.target(explicit) {
        Ok(name) => name,
        Err(e) => return e.into(),
    };
    let info = match ctx.client().info(&name) {
        Ok(info) => info,
        Err(e) => return e.into(),
    };

    if json {
        match serde_json::to_value(&*info) {
            Ok(value) => CommandResult::ok_display(format_json(&value)),
            Err(e) => CommandResult::Error(format!("Serialization error: {}", e)),
        }
    } else {
        CommandResult::ok_display(format_info(&info))
    }
}

fn format_info(info: &BeanInfo) -> String {
    let heading = Style::new().bold();
    let mut out = String::new();

    out.push_str(&format!(
        "{} {}\n",
        Color::Cyan.bold().paint(info.name.to_string()),
        Color::DarkGray.paint(format!("({})", info.type_name))
    ));

    out.push_str(&format!("\n{}\n", heading.paint("Attributes")));
    if info.attributes.is_empty() {
        out.push_str(&format!("  {}\n", Color::DarkGray.paint("none")));
    }
    for attribute in &info.attributes {
        let access = match (attribute.readable, attribute.writable) {
            (true, true) => "rw",
            (true, false) => "r-",
            (false, true) => "-w",
            (false, false) => "--",
        };
        out.push_str(&format!(
            "  {} {:<16} {} {}\n",
            Color::Magenta.paint(access),
            attribute.name,
            Color::Yellow.paint(format!("{:<12}", attribute.type_tag.to_string())),
            Color::DarkGray.paint(&attribute.description)
        ));
    }

    out.push_str(&format!("\n{}\n", heading.paint("Operations")));
    if info.operations.is_empty() {
        out.push_str(&format!("  {}\n", Color::DarkGray.paint("none")));
    }
    for operation in &info.operations {
        let params: Vec<String> = operation
            .signature
            .types()
            .iter()
            .enumerate()
            .map(|(i, tag)| match operation.parameter_names.get(i) {
                Some(param) => format!("{} {}", tag, param),
                None => tag.to_string(),
            })
            .collect();
        out.push_str(&format!(
            "  {} {}({}) {}\n",
            Color::Yellow.paint(format!("{:<8}", operation.return_type.to_string())),
            operation.name,
            params.join(", "),
            Color::DarkGray.paint(&operation.description)
        ));
    }

    out.trim_end().to_string()
}

fn cmd_get(args: &[String], ctx: &mut ConsoleContext) -> CommandResult {
    if args.is_empty() {
        return CommandResult::Error("Usage: get <attr>...".to_string());
    }
    let name = match ctx.target(None) {
        Ok(name) => name,
        Err(e) => return e.into(),
    };

    if let [attribute] = args {
        return match ctx.client().get(&name, attribute) {
            Ok(value) => CommandResult::ok_display(format_value(&value)),
            Err(e) => e.into(),
        };
    }

    let results = match ctx.client().get_many(&name, args) {
        Ok(results) => results,
        Err(e) => return e.into(),
    };
    let lines: Vec<String> = results
        .iter()
        .map(|(attribute, result)| match result {
            Ok(value) => format!("{} = {}", attribute, format_value(value)),
            Err(e) => format!(
                "{} ! {}",
                attribute,
                Color::Red.paint(format_mgmt_error(e))
            ),
        })
        .collect();
    CommandResult::ok_display(lines.join("\n"))
}

fn cmd_set(args: &[String], ctx: &mut ConsoleContext) -> CommandResult {
    let [attribute, value] = args else {
        return CommandResult::Error("Usage: set <attr> <value>".to_string());
    };
    let name = match ctx.target(None) {
        Ok(name) => name,
        Err(e) => return e.into(),
    };

    match ctx.client().set(&name, attribute, value) {
        Ok(()) => CommandResult::ok_display(format!("{}", Color::Green.paint("ok"))),
        Err(e) => e.into(),
    }
}

fn cmd_invoke(args: &[String], ctx: &mut ConsoleContext) -> CommandResult {
    let Some((operation, rest)) = args.split_first() else {
        return CommandResult::Error("Usage: invoke <op>[(types)] [args...]".to_string());
    };
    let name = match ctx.target(None) {
        Ok(name) => name,
        Err(e) => return e.into(),
    };

    let call_args: Vec<&str> = rest.iter().map(String::as_str).collect();
    match ctx.client().invoke(&name, operation, &call_args) {
        Ok(Value::Null) => CommandResult::ok_display(format!("{}", Color::Green.paint("ok"))),
        Ok(value) => CommandResult::ok_display(format_value(&value)),
        Err(e) => e.into(),
    }
}

/// Render a value colored by its type.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => format!("{}", Color::Yellow.paint("null")),
        Value::Bool(_) => format!("{}", Color::Yellow.paint(value.render())),
        Value::Char(_) | Value::String(_) => format!("{}", Color::Green.paint(value.render())),
        Value::Byte(_)
        | Value::Short(_)
        | Value::Int(_)
        | Value::Long(_)
        | Value::Float(_)
        | Value::Double(_) => format!("{}", Color::Cyan.paint(value.render())),
        Value::Array { items, .. } => {
            let items: Vec<String> = items.iter().map(format_value).collect();
            format!(
                "{}{}{}",
                Color::White.bold().paint("["),
                items.join(", "),
                Color::White.bold().paint("]")
            )
        }
        Value::Object(_) => format!("{}", Color::Magenta.paint(value.render())),
    }
}

/// Format JSON with syntax highlighting
fn format_json(value: &JsonValue) -> String {
    let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());

    let mut result = String::new();
    let mut in_string = false;
    let mut escape_next = false;

    for c in pretty.chars() {
        if escape_next {
            result.push(c);
            escape_next = false;
            continue;
        }

        if c == '\\' && in_string {
            result.push(c);
            escape_next = true;
            continue;
        }

        if c == '"' {
            in_string = !in_string;
            result.push_str(&format!("{}", Color::Green.paint("\"")));
            continue;
        }

        if in_string {
            result.push_str(&format!("{}", Color::Green.paint(c.to_string())));
        } else {
            match c {
                '{' | '}' | '[' | ']' => {
                    result.push_str(&format!("{}", Color::White.bold().paint(c.to_string())))
                }
                ':' | ',' => result.push_str(&format!("{}", Color::White.paint(c.to_string()))),
                _ if c.is_ascii_digit() || c == '.' || c == '-' => {
                    result.push_str(&format!("{}", Color::Cyan.paint(c.to_string())))
                }
                _ => result.push(c),
            }
        }
    }

    result
}

/// Strip ANSI escape codes from a string
pub fn strip_ansi_codes(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\x1b' {
            while let Some(&next) = chars.peek() {
                chars.next();
                if next == 'm' {
                    break;
                }
            }
        } else {
            result.push(c);
        }
    }

    result
}
