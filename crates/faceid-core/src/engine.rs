//! Dedicated inference thread.
//!
//! ONNX sessions need `&mut` access and block for the duration of a run, so
//! the extractor lives on its own OS thread and async callers talk to it
//! through a bounded channel.

use crate::extractor::{ExtractError, Extractor};
use crate::types::Detection;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("engine thread failed to start: {0}")]
    Spawn(std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Messages sent from async callers to the engine thread.
enum EngineRequest {
    Extract {
        image: Vec<u8>,
        reply: oneshot::Sender<Result<Vec<Detection>, ExtractError>>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Run the extractor over encoded image bytes.
    pub async fn extract(&self, image: Vec<u8>) -> Result<Vec<Detection>, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Extract {
                image,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        Ok(reply_rx.await.map_err(|_| EngineError::ChannelClosed)??)
    }
}

/// Move an already-loaded extractor onto a new engine thread.
///
/// The thread exits once every [`EngineHandle`] has been dropped.
pub fn spawn_engine(mut extractor: Box<dyn Extractor>) -> Result<EngineHandle, EngineError> {
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(4);

    std::thread::Builder::new()
        .name("faceid-engine".into())
        .spawn(move || {
            tracing::debug!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Extract { image, reply } => {
                        let result = extractor.extract(&image);
                        if let Ok(faces) = &result {
                            tracing::debug!(faces = faces.len(), bytes = image.len(), "extraction finished");
                        }
                        let _ = reply.send(result);
                    }
                }
            }
            tracing::debug!("engine thread exiting");
        })
        .map_err(EngineError::Spawn)?;

    Ok(EngineHandle { tx })
}
