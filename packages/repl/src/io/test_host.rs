//! In-memory host for driving the console in tests.
//!
//! Input lines and signals are queued up front and consumed in order. Once
//! both queues are drained the host reports end of input, so a script
//! without a trailing `exit` still terminates.

use std::collections::VecDeque;

use super::{InputLine, IoError, IoHost, Output, OutputStyle, PromptConfig, Signal};

/// Test host with in-memory I/O buffers.
///
/// Output is kept for inspection after the core returns.
#[derive(Debug, Default)]
pub struct TestHost {
    /// Lines handed out by `read_input()`, front first.
    input_queue: VecDeque<String>,
    /// Signals handed out by `read_signal()` ahead of any input.
    signal_queue: VecDeque<Signal>,
    /// Everything written via `write_output()`.
    output_buffer: Vec<Output>,
    /// Every prompt configuration, one per loop iteration.
    prompts: Vec<PromptConfig>,
    /// Number of times `flush()` was called.
    flush_count: usize,
}

impl TestHost {
    /// Create an empty host. It reports EOF on the first read.
    pub fn new() -> Self {
        Self::default()
    }

    /// A host preloaded with `lines`.
    pub fn with_script<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut host = Self::new();
        host.queue_inputs(lines);
        host
    }

    /// Queue an input line to be returned by `read_input()`.
    pub fn queue_input(&mut self, line: impl Into<String>) {
        self.input_queue.push_back(line.into());
    }

    pub fn queue_inputs<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for line in lines {
            self.queue_input(line);
        }
    }

    /// Queue a signal; queued signals win over pending input.
    pub fn queue_signal(&mut self, signal: Signal) {
        self.signal_queue.push_back(signal);
    }

    pub fn output(&self) -> &[Output] {
        &self.output_buffer
    }

    /// All output text, one entry per line written.
    pub fn output_text(&self) -> String {
        self.output_buffer
            .iter()
            .map(|o| o.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Output text of one style, in write order.
    pub fn output_with_style(&self, style: OutputStyle) -> Vec<&str> {
        self.output_buffer
            .iter()
            .filter(|o| o.style == style)
            .map(|o| o.text.as_str())
            .collect()
    }

    /// Error output: kind, message and any cause chain lines.
    pub fn errors(&self) -> Vec<&str> {
        self.output_buffer
            .iter()
            .filter(|o| o.is_error())
            .map(|o| o.text.as_str())
            .collect()
    }

    /// Every prompt the core sent, oldest first.
    pub fn prompts(&self) -> &[PromptConfig] {
        &self.prompts
    }

    pub fn last_prompt(&self) -> Option<&PromptConfig> {
        self.prompts.last()
    }

    pub fn flush_count(&self) -> usize {
        self.flush_count
    }

    pub fn clear_output(&mut self) {
        self.output_buffer.clear();
    }

    pub fn has_pending_input(&self) -> bool {
        !self.input_queue.is_empty()
    }
}

impl IoHost for TestHost {
    fn wait_for_input(&mut self) -> Result<(), IoError> {
        // Nothing to wait for: the script is queued before the core runs.
        Ok(())
    }

    fn read_input(&mut self) -> Result<Option<InputLine>, IoError> {
        Ok(self.input_queue.pop_front().map(|line| InputLine { line }))
    }

    fn read_signal(&mut self) -> Result<Option<Signal>, IoError> {
        if let Some(signal) = self.signal_queue.pop_front() {
            return Ok(Some(signal));
        }
        // Script exhausted
        if self.input_queue.is_empty() {
            return Ok(Some(Signal::Eof));
        }
        Ok(None)
    }

    fn write_output(&mut self, output: Output) -> Result<(), IoError> {
        self.output_buffer.push(output);
        Ok(())
    }

    fn write_prompt(&mut self, config: PromptConfig) -> Result<(), IoError> {
        self.prompts.push(config);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), IoError> {
        self.flush_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_read_in_order() {
        let mut host = TestHost::with_script(["ls", "pwd"]);
        assert_eq!(host.read_input().unwrap().unwrap().line, "ls");
        assert_eq!(host.read_input().unwrap().unwrap().line, "pwd");
        assert!(host.read_input().unwrap().is_none());
    }

    #[test]
    fn drained_host_reports_eof() {
        let mut host = TestHost::with_script(["ls"]);
        assert!(host.read_signal().unwrap().is_none());
        host.read_input().unwrap();
        assert!(matches!(host.read_signal().unwrap(), Some(Signal::Eof)));
    }

    #[test]
    fn queued_signals_come_before_eof() {
        let mut host = TestHost::new();
        host.queue_signal(Signal::Interrupt);
        assert!(matches!(host.read_signal().unwrap(), Some(Signal::Interrupt)));
        assert!(matches!(host.read_signal().unwrap(), Some(Signal::Eof)));
    }

    #[test]
    fn output_is_filtered_by_style() {
        let mut host = TestHost::new();
        host.write_output(Output::normal("size = 4")).unwrap();
        host.write_output(Output::error("UnknownAttributeError: nope")).unwrap();
        host.write_output(Output::info("Goodbye!")).unwrap();

        assert_eq!(host.errors(), vec!["UnknownAttributeError: nope"]);
        assert_eq!(host.output_with_style(OutputStyle::Info), vec!["Goodbye!"]);
        assert_eq!(host.output_text(), "size = 4\nUnknownAttributeError: nope\nGoodbye!");

        host.clear_output();
        assert!(host.output().is_empty());
    }

    #[test]
    fn prompts_are_recorded() {
        let mut host = TestHost::new();
        host.write_prompt(PromptConfig::default()).unwrap();
        host.write_prompt(PromptConfig {
            object_count: 3,
            current_name: Some("demo:name=cache".to_string()),
        })
        .unwrap();
        host.flush().unwrap();

        assert_eq!(host.prompts().len(), 2);
        assert_eq!(host.last_prompt().unwrap().object_count, 3);
        assert_eq!(host.flush_count(), 1);
    }
}
