//! Platform layer for navigation requests.
//!
//! The instruction field can ask its host to reopen the UI as a full tab
//! (HID access needs a full-screen context) or to reload the current view.
//! [`CommandPlatform`] forwards these as commands over a queue so the owner
//! of the UI loop decides how to carry them out, without the field holding
//! a reference back to it.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{
    error::{Error, Result},
    tracing::prelude::*,
};

/// Navigation capabilities of the host.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Open the extension UI in a full browser tab.
    async fn reopen_as_full_tab(&self) -> Result<()>;

    /// Reload the current view.
    async fn reload(&self) -> Result<()>;
}

/// Commands sent from the field to the UI loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformCommand {
    /// Reopen in a full-screen context
    ReopenFullScreen,
    /// Reload the current view
    Reload,
}

/// Platform that queues commands for the UI loop.
#[derive(Clone)]
pub struct CommandPlatform {
    cmd_tx: mpsc::Sender<PlatformCommand>,
}

impl CommandPlatform {
    pub fn new(cmd_tx: mpsc::Sender<PlatformCommand>) -> Self {
        Self { cmd_tx }
    }

    async fn send(&self, cmd: PlatformCommand) -> Result<()> {
        debug!(command = ?cmd, "Queueing platform command");
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| Error::Platform("UI loop is no longer running".to_string()))
    }
}

#[async_trait]
impl Platform for CommandPlatform {
    async fn reopen_as_full_tab(&self) -> Result<()> {
        self.send(PlatformCommand::ReopenFullScreen).await
    }

    async fn reload(&self) -> Result<()> {
        self.send(PlatformCommand::Reload).await
    }
}
