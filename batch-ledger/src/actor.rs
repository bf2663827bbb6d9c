//! Actor-based concurrency for the ledger
//!
//! One Tokio task owns the [`LedgerState`] and applies mutating operations
//! one at a time, in mailbox order. Each operation runs to completion
//! before the next is taken, which is the whole atomicity model: no locks,
//! no interleaving inside an operation.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │               LedgerHandle (Clone)                   │
//! │         Sends messages to actor mailbox              │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              LedgerActor (Single Task)               │
//! │   validate → farm directory → ChangeSet → commit     │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//!            Storage::commit (one WriteBatch)
//! ```

use crate::state::LedgerState;
use crate::types::{BatchId, BatchUpdate, NewBatch, Principal};
use crate::{Error, Result};
use tokio::sync::{mpsc, oneshot};

/// Message sent to the ledger actor
#[derive(Debug)]
pub enum LedgerMessage {
    /// Create a batch
    CreateBatch {
        caller: Principal,
        request: NewBatch,
        response: oneshot::Sender<Result<BatchId>>,
    },

    /// Update a batch
    UpdateBatch {
        caller: Principal,
        batch_id: BatchId,
        update: BatchUpdate,
        response: oneshot::Sender<Result<()>>,
    },

    /// Deactivate a batch
    DeactivateBatch {
        caller: Principal,
        batch_id: BatchId,
        response: oneshot::Sender<Result<()>>,
    },

    /// Transfer batch ownership
    TransferOwnership {
        caller: Principal,
        batch_id: BatchId,
        new_owner: Principal,
        transfer_id: u64,
        response: oneshot::Sender<Result<()>>,
    },

    /// Pause or unpause batch creation
    SetPaused {
        caller: Principal,
        paused: bool,
        response: oneshot::Sender<Result<()>>,
    },

    /// Stop the actor once earlier messages are applied
    Shutdown { response: oneshot::Sender<()> },
}

/// Actor that processes ledger messages
#[derive(Debug)]
pub struct LedgerActor {
    /// Ledger state (sole writer)
    state: LedgerState,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(state: LedgerState, mailbox: mpsc::Receiver<LedgerMessage>) -> Self {
        Self { state, mailbox }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            if let Some(response) = self.handle_message(msg) {
                tracing::info!("Ledger actor shutting down");
                // Storage and mailbox are released before the caller is told
                // the actor stopped, so the data directory can be reopened
                let LedgerActor { state, mailbox } = self;
                drop(state);
                drop(mailbox);
                let _ = response.send(());
                return;
            }
        }

        tracing::info!("Ledger mailbox closed, actor stopped");
    }

    /// Handle a single message, returning the reply channel of a shutdown
    /// request.
    ///
    /// A dropped response channel means the caller went away; the operation
    /// has still been applied.
    fn handle_message(&mut self, msg: LedgerMessage) -> Option<oneshot::Sender<()>> {
        match msg {
            LedgerMessage::CreateBatch {
                caller,
                request,
                response,
            } => {
                let result = self.state.create_batch(&caller, request);
                let _ = response.send(result);
            }

            LedgerMessage::UpdateBatch {
                caller,
                batch_id,
                update,
                response,
            } => {
                let result = self.state.update_batch(&caller, batch_id, update);
                let _ = response.send(result);
            }

            LedgerMessage::DeactivateBatch {
                caller,
                batch_id,
                response,
            } => {
                let result = self.state.deactivate_batch(&caller, batch_id);
                let _ = response.send(result);
            }

            LedgerMessage::TransferOwnership {
                caller,
                batch_id,
                new_owner,
                transfer_id,
                response,
            } => {
                let result =
                    self.state
                        .transfer_batch_ownership(&caller, batch_id, new_owner, transfer_id);
                let _ = response.send(result);
            }

            LedgerMessage::SetPaused {
                caller,
                paused,
                response,
            } => {
                let result = if paused {
                    self.state.pause(&caller)
                } else {
                    self.state.unpause(&caller)
                };
                let _ = response.send(result);
            }

            LedgerMessage::Shutdown { response } => return Some(response),
        }

        None
    }
}

/// Handle for sending messages to the actor
#[derive(Clone, Debug)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T>>) -> LedgerMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(build(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Create a batch
    pub async fn create_batch(&self, caller: Principal, request: NewBatch) -> Result<BatchId> {
        self.request(|response| LedgerMessage::CreateBatch {
            caller,
            request,
            response,
        })
        .await
    }

    /// Update a batch
    pub async fn update_batch(
        &self,
        caller: Principal,
        batch_id: BatchId,
        update: BatchUpdate,
    ) -> Result<()> {
        self.request(|response| LedgerMessage::UpdateBatch {
            caller,
            batch_id,
            update,
            response,
        })
        .await
    }

    /// Deactivate a batch
    pub async fn deactivate_batch(&self, caller: Principal, batch_id: BatchId) -> Result<()> {
        self.request(|response| LedgerMessage::DeactivateBatch {
            caller,
            batch_id,
            response,
        })
        .await
    }

    /// Transfer batch ownership
    pub async fn transfer_batch_ownership(
        &self,
        caller: Principal,
        batch_id: BatchId,
        new_owner: Principal,
        transfer_id: u64,
    ) -> Result<()> {
        self.request(|response| LedgerMessage::TransferOwnership {
            caller,
            batch_id,
            new_owner,
            transfer_id,
            response,
        })
        .await
    }

    /// Pause or unpause batch creation
    pub async fn set_paused(&self, caller: Principal, paused: bool) -> Result<()> {
        self.request(|response| LedgerMessage::SetPaused {
            caller,
            paused,
            response,
        })
        .await
    }

    /// Shutdown actor, waiting for queued operations to finish
    pub async fn shutdown(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LedgerMessage::Shutdown { response: tx })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(state: LedgerState, mailbox_capacity: usize) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity); // Bounded channel for backpressure
    let actor = LedgerActor::new(state, rx);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx)
}
