use crate::utils::wallet_manager::BatchEntry;
use anyhow::Result;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct TaskResult {
    pub success: bool,
    /// Deliberate no-op (e.g. balance below threshold). Never counts as success.
    pub skipped: bool,
    pub message: String,
    pub tx_hash: Option<String>,
}

impl TaskResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            skipped: false,
            message: message.into(),
            tx_hash: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            skipped: false,
            message: message.into(),
            tx_hash: None,
        }
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            success: false,
            skipped: true,
            message: message.into(),
            tx_hash: None,
        }
    }

    pub fn with_tx_hash(mut self, tx_hash: Option<String>) -> Self {
        self.tx_hash = tx_hash;
        self
    }
}

#[async_trait]
pub trait Task<Ctx>: Send + Sync {
    /// Returns the name of the task
    fn name(&self) -> &str;

    /// Executes the task
    async fn run(&self, ctx: Ctx) -> Result<TaskResult>;
}

/// Something a batch is made of. `id` is what reports and logs show, so it
/// must never expose secret material.
pub trait BatchItem: Send + Sync {
    fn id(&self) -> String;
}

/// One selected action, driven by the batch runner over every account.
#[async_trait]
pub trait AccountAction<T: BatchItem>: Send + Sync {
    fn name(&self) -> &str;

    /// `position` is 1-based, `total` is the batch length.
    async fn run(&self, entry: &BatchEntry<T>, position: usize, total: usize)
        -> Result<TaskResult>;
}
