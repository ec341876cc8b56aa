use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Instant;

use anyhow::{Result, anyhow};

use super::EmbeddingProvider;
use crate::graph::PendingConcept;

pub struct EmbedResponse {
    pub pending: PendingConcept,
    pub result: Result<Vec<f32>>,
}

/// Owns the provider on a background thread so the frame loop never waits on it.
pub struct EmbedWorker {
    request_tx: Sender<PendingConcept>,
    response_rx: Receiver<EmbedResponse>,
}

impl EmbedWorker {
    pub fn spawn(mut provider: Box<dyn EmbeddingProvider>) -> Self {
        let (request_tx, request_rx) = mpsc::channel::<PendingConcept>();
        let (response_tx, response_rx) = mpsc::channel();

        thread::spawn(move || serve(provider.as_mut(), request_rx, response_tx));

        Self {
            request_tx,
            response_rx,
        }
    }

    pub fn request(&self, pending: PendingConcept) -> Result<()> {
        self.request_tx
            .send(pending)
            .map_err(|_| anyhow!("embedding worker is not running"))
    }

    /// Drains every response that has arrived since the last call.
    pub fn poll(&self) -> Result<Vec<EmbedResponse>> {
        let mut responses = Vec::new();
        loop {
            match self.response_rx.try_recv() {
                Ok(response) => responses.push(response),
                Err(TryRecvError::Empty) => return Ok(responses),
                Err(TryRecvError::Disconnected) if responses.is_empty() => {
                    return Err(anyhow!("embedding worker disconnected"));
                }
                Err(TryRecvError::Disconnected) => return Ok(responses),
            }
        }
    }

    #[cfg(test)]
    fn wait(&self, timeout: std::time::Duration) -> Option<EmbedResponse> {
        self.response_rx.recv_timeout(timeout).ok()
    }
}

/// Worker loop: warms the provider up lazily, answers requests in order, and stops once either
/// side of the channel pair is gone.
fn serve(
    provider: &mut dyn EmbeddingProvider,
    requests: Receiver<PendingConcept>,
    responses: Sender<EmbedResponse>,
) {
    let mut warmed = false;
    for pending in requests {
        if !warmed {
            let started = Instant::now();
            log::info!("warming up embedder {}", provider.name());
            if let Err(error) = provider.warm_up() {
                let response = EmbedResponse {
                    pending,
                    result: Err(error.context("embedder warm-up failed")),
                };
                if responses.send(response).is_err() {
                    break;
                }
                continue;
            }
            warmed = true;
            log::info!(
                "embedder {} ready after {:.2?}",
                provider.name(),
                started.elapsed()
            );
        }

        let result = provider.embed(&pending.text);
        if responses.send(EmbedResponse { pending, result }).is_err() {
            break;
        }
    }
    log::debug!("embed worker stopped");
}
