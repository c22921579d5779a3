//! Host abstraction for the console.
//!
//! The console core talks to its environment only through `IoHost`, so the
//! terminal and in-memory test hosts share one loop.

pub mod test_host;
pub mod types;

pub use test_host::TestHost;
pub use types::*;

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("terminal I/O failed: {0}")]
    Terminal(#[from] std::io::Error),
}

/// What the console core needs from its environment.
pub trait IoHost {
    /// Block until a line or a signal is available.
    fn wait_for_input(&mut self) -> Result<(), IoError>;

    /// Take the pending line, if any.
    fn read_input(&mut self) -> Result<Option<InputLine>, IoError>;

    /// Take the pending signal, if any. Checked before `read_input`.
    fn read_signal(&mut self) -> Result<Option<Signal>, IoError>;

    fn write_output(&mut self, output: Output) -> Result<(), IoError>;

    /// Prompt state for the next `wait_for_input`.
    fn write_prompt(&mut self, config: PromptConfig) -> Result<(), IoError>;

    fn flush(&mut self) -> Result<(), IoError> {
        Ok(())
    }
}
