//! Platform-independent console core.
//!
//! The loop talks only to an `IoHost`, so the terminal and the in-memory
//! test host drive the same code.

use std::sync::Arc;

use mgmt_core::Registry;

use crate::commands::{self, CommandResult};
use crate::context::ConsoleContext;
use crate::io::{ExitReason, IoError, IoHost, Output, PromptConfig, Signal};

/// The platform-independent console core.
pub struct ReplCore {
    ctx: ConsoleContext,
}

impl ReplCore {
    /// Create a console over `registry`.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            ctx: ConsoleContext::new(registry),
        }
    }

    /// Run the loop, reading and writing through the provided host.
    ///
    /// Returns the reason for exiting (user exit, EOF, or error).
    pub fn run(&mut self, io: &mut impl IoHost) -> Result<ExitReason, IoError> {
        self.write_banner(io)?;

        loop {
            // Prompt shows the object count and the `cd` selection
            self.update_prompt(io)?;

            // May block for terminal hosts
            io.wait_for_input()?;

            // Signals take priority over a pending line
            if let Some(signal) = io.read_signal()? {
                match signal {
                    Signal::Eof => {
                        io.write_output(Output::info("Goodbye!"))?;
                        io.flush()?;
                        return Ok(ExitReason::Eof);
                    }
                    Signal::Interrupt => {
                        io.write_output(Output::info("^C (use 'exit' to quit)"))?;
                        continue;
                    }
                }
            }

            let input = match io.read_input()? {
                Some(input) => input,
                None => continue,
            };

            // Command failures are reported and the loop carries on; the
            // selection is left as it was.
            match commands::execute(&input.line, &mut self.ctx) {
                CommandResult::Ok(None) => {}
                CommandResult::Ok(Some(output)) => {
                    io.write_output(Output::normal(output))?;
                }
                CommandResult::Error(msg) => {
                    io.write_output(Output::error(msg))?;
                }
                CommandResult::Help => {
                    io.write_output(Output::normal(commands::format_help()))?;
                }
                CommandResult::Exit => {
                    io.write_output(Output::info("Goodbye!"))?;
                    io.flush()?;
                    return Ok(ExitReason::UserExit);
                }
            }

            io.flush()?;
        }
    }

    /// The console state: registry, client and selection.
    pub fn context(&self) -> &ConsoleContext {
        &self.ctx
    }

    /// Mutable console state, for preselecting objects in tests.
    pub fn context_mut(&mut self) -> &mut ConsoleContext {
        &mut self.ctx
    }

    fn write_banner(&self, io: &mut impl IoHost) -> Result<(), IoError> {
        io.write_output(Output::banner(BANNER))
    }

    fn update_prompt(&self, io: &mut impl IoHost) -> Result<(), IoError> {
        io.write_prompt(PromptConfig {
            object_count: self.ctx.object_count(),
            current_name: self.ctx.current().map(ToString::to_string),
        })
    }
}

const BANNER: &str = r#"
                        _
  _ __ ___   __ _ _ __ | |_
 | '_ ` _ \ / _` | '_ \| __|
 | | | | | | (_| | | | | |_
 |_| |_| |_|\__, |_| |_|\__|
            |___/

Type 'help' for available commands, 'exit' to quit.
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo;
    use crate::io::{OutputStyle, TestHost};

    fn core() -> ReplCore {
        let registry = Arc::new(Registry::default());
        demo::install(&registry).unwrap();
        ReplCore::new(registry)
    }

    #[test]
    fn test_exit_command() {
        let mut core = core();
        let mut host = TestHost::with_script(["exit"]);

        let result = core.run(&mut host);

        assert!(matches!(result, Ok(ExitReason::UserExit)));
        assert!(host.output_text().contains("Goodbye"));
        assert_eq!(host.output()[0].style, OutputStyle::Banner);
    }

    #[test]
    fn test_end_of_script_is_eof() {
        let mut core = core();
        let mut host = TestHost::with_script(["ls"]);

        let result = core.run(&mut host);

        assert!(matches!(result, Ok(ExitReason::Eof)));
        assert!(host.output_text().contains("demo:name=scheduler"));
    }

    #[test]
    fn test_interrupt_continues() {
        let mut core = core();
        let mut host = TestHost::with_script(["exit"]);
        host.queue_signal(Signal::Interrupt);

        let result = core.run(&mut host);

        assert!(matches!(result, Ok(ExitReason::UserExit)));
        assert!(host.output_text().contains("^C"));
    }

    #[test]
    fn test_prompt_tracks_selection() {
        let mut core = core();
        let mut host = TestHost::with_script(["cd scheduler", "cd ..", "exit"]);

        core.run(&mut host).unwrap();

        let names: Vec<Option<&str>> = host
            .prompts()
            .iter()
            .map(|p| p.current_name.as_deref())
            .collect();
        assert_eq!(names, vec![None, Some("demo:name=scheduler"), None]);
        assert!(host.prompts().iter().all(|p| p.object_count == 4));
    }

    #[test]
    fn test_errors_use_error_style() {
        let mut core = core();
        let mut host = TestHost::with_script(["cd scheduler", "invoke fail", "exit"]);

        core.run(&mut host).unwrap();

        let errors = host.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("DispatchError: invocation of fail() failed"));
        assert!(errors[0].ends_with("  caused by: worker 4 lost"));
    }

    #[test]
    fn test_selection_survives_failures() {
        let mut core = core();
        let mut host = TestHost::with_script(["cd sessions", "get nothing", "set size -1", "exit"]);

        core.run(&mut host).unwrap();

        assert_eq!(host.errors().len(), 2);
        assert_eq!(
            core.context().current().map(ToString::to_string).as_deref(),
            Some("demo:00=caches,name=sessions")
        );
    }
}
