//! Interactive entry point: the console core on a terminal host.

use std::sync::Arc;

use mgmt_core::Registry;

use crate::core::ReplCore;
use crate::host::{EditModeChoice, TerminalHost};
use crate::io::{ExitReason, IoError};

/// Run the console on the terminal until the user exits.
pub fn run(registry: Arc<Registry>, edit_mode: EditModeChoice) -> Result<ExitReason, IoError> {
    let mut host = TerminalHost::new(Arc::clone(&registry), edit_mode)?;
    let mut core = ReplCore::new(registry);
    let reason = core.run(&mut host)?;
    tracing::debug!(?reason, "console exited");
    Ok(reason)
}
