//! Fetch phase: bounded-parallel extraction of the top search results under a
//! wall-clock budget.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::ssrf::redact_url_credentials;
use super::{ContentExtractor, FetchedDocument};
use crate::config::Tuning;
use crate::search::SearchResult;

#[derive(Debug, Clone)]
pub struct FanOut {
    /// Leading search results considered.
    pub width: usize,
    /// Extractions allowed in flight at once.
    pub workers: usize,
    /// Deadline for the whole phase, measured from the call to [`fetch_all`].
    pub budget: Duration,
}

impl From<&Tuning> for FanOut {
    fn from(tuning: &Tuning) -> Self {
        Self {
            width: tuning.fan_out_width,
            workers: tuning.fetch_workers,
            budget: tuning.overall_fetch_budget,
        }
    }
}

/// Extracts the first `fan_out.width` results and returns the documents that
/// finished before the budget ran out, first-finished first.
///
/// Failed or empty extractions are dropped without affecting their siblings.
/// Tasks still running at the deadline are abandoned: they keep their own
/// per-call timeout, and whatever they produce afterwards is discarded. Tasks
/// that had not started by then never start.
pub async fn fetch_all<E: ContentExtractor>(
    extractor: Arc<E>,
    results: &[SearchResult],
    fan_out: &FanOut,
) -> Vec<FetchedDocument> {
    let deadline = Instant::now() + fan_out.budget;
    let candidates: Vec<String> = results
        .iter()
        .take(fan_out.width)
        .map(|r| r.link.clone())
        .collect();
    if candidates.is_empty() {
        return Vec::new();
    }

    let total = candidates.len();
    let permits = Arc::new(Semaphore::new(fan_out.workers.max(1)));
    // Capacity covers every task, so sends never wait on the collector.
    let (tx, mut rx) = mpsc::channel(total);

    for url in candidates {
        let extractor = Arc::clone(&extractor);
        let permits = Arc::clone(&permits);
        let tx = tx.clone();
        tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            let outcome = extractor.extract(&url).await;
            // Fails only once the collector has given up on this batch.
            let _ = tx.send((url, outcome)).await;
        });
    }
    drop(tx);

    let mut documents = Vec::with_capacity(total);
    let mut settled = 0;
    loop {
        match tokio::time::timeout_at(deadline, rx.recv()).await {
            Ok(Some((url, outcome))) => {
                settled += 1;
                let url = redact_url_credentials(&url);
                match outcome {
                    Ok(Some(doc)) => {
                        debug!(url = %url, kind = %doc.kind, "document fetched");
                        documents.push(doc);
                    }
                    Ok(None) => debug!(url = %url, "no usable content"),
                    Err(e) => warn!(url = %url, error = %e, "fetch failed, skipping"),
                }
            }
            Ok(None) => break,
            Err(_) => {
                warn!(
                    pending = total - settled,
                    budget_secs = fan_out.budget.as_secs_f64(),
                    "fetch budget exhausted, continuing with completed documents"
                );
                break;
            }
        }
    }
    // Late completions hit a closed channel and are dropped; tasks still
    // waiting for a permit give up without fetching.
    rx.close();
    permits.close();

    info!(
        attempted = total,
        fetched = documents.len(),
        "fetch phase complete"
    );
    documents
}
