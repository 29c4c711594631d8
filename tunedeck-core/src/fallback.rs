//! Concurrent fallback matching across alternate providers.
//!
//! Every provider gets its own task with its own timeout. Slow, failing or
//! empty providers are dropped silently; the caller only sees the matches
//! that arrived in time.

use crate::error::Result;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A provider that produced a match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderMatch<H, M> {
    pub backend_id: String,
    pub backend: H,
    pub track: M,
}

/// Run `matcher` against every provider concurrently and collect the hits.
///
/// Results arrive in completion order. A provider that exceeds `timeout`,
/// returns an error, or returns `None` contributes nothing. Cancelling
/// `cancel` stops collection early and keeps whatever already arrived.
///
/// No task outlives this call: anything still running when it returns has
/// been aborted and awaited.
pub async fn collect_provider_matches<H, M, F, Fut>(
    providers: Vec<(String, H)>,
    matcher: F,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Vec<ProviderMatch<H, M>>
where
    H: Clone + Send + 'static,
    M: Send + 'static,
    F: Fn(H) -> Fut,
    Fut: Future<Output = Result<Option<M>>> + Send + 'static,
{
    if providers.is_empty() || cancel.is_cancelled() {
        return Vec::new();
    }

    let mut tasks = JoinSet::new();
    let mut pending = Vec::with_capacity(providers.len());

    for (index, (provider_id, provider)) in providers.into_iter().enumerate() {
        let lookup = matcher(provider.clone());
        tasks.spawn(async move { (index, tokio::time::timeout(timeout, lookup).await) });
        pending.push(Some((provider_id, provider)));
    }

    debug!("Matching against {} fallback providers", pending.len());

    let mut matches = Vec::new();
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("Fallback matching cancelled with {} tasks outstanding", tasks.len());
                break;
            }
            joined = tasks.join_next() => {
                let Some(joined) = joined else { break };
                let (index, outcome) = match joined {
                    Ok(result) => result,
                    Err(e) => {
                        warn!("Fallback matcher task failed: {e}");
                        continue;
                    }
                };
                let Some((provider_id, provider)) = pending.get_mut(index).and_then(Option::take)
                else {
                    continue;
                };

                match outcome {
                    Ok(Ok(Some(track))) => {
                        debug!("Provider {provider_id} matched");
                        matches.push(ProviderMatch {
                            backend_id: provider_id,
                            backend: provider,
                            track,
                        });
                    }
                    Ok(Ok(None)) => debug!("Provider {provider_id} had no match"),
                    Ok(Err(e)) => debug!("Provider {provider_id} failed: {e}"),
                    Err(_) => debug!("Provider {provider_id} timed out after {timeout:?}"),
                }
            }
        }
    }

    tasks.shutdown().await;
    matches
}
