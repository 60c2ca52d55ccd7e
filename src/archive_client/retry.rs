use std::time::Duration;

use reqwest::Url;

use super::{FetchError, PageFetcher, PageSource};

const RATE_LIMITED: u16 = 429;

/// Retry schedule for HTTP 429 responses. The wait before retry `i` (0-based)
/// is `base_delay + i * step`, so each wait is longer than the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_secs(10),
            step: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, retry_index: u32) -> Duration {
        self.base_delay + self.step * retry_index
    }

    /// Sum of the waits spent when the first `retries` attempts were rate limited.
    pub fn total_delay(&self, retries: u32) -> Duration {
        (0..retries).map(|i| self.delay_for(i)).sum()
    }
}

/// [`PageFetcher`] that retries rate-limited requests on a [`RetryPolicy`]
/// and fails fast on every other non-success outcome.
pub struct RetryingFetcher<S> {
    source: S,
    policy: RetryPolicy,
}

impl<S: PageSource> RetryingFetcher<S> {
    pub fn new(source: S, policy: RetryPolicy) -> Self {
        RetryingFetcher { source, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait::async_trait]
impl<S: PageSource> PageFetcher for RetryingFetcher<S> {
    #[tracing::instrument(level = "debug", skip(self, url), fields(url = %url))]
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let mut retries = 0;
        loop {
            let resp = self.source.get(url).await?;
            if resp.is_success() {
                return Ok(resp.body);
            }
            if resp.status != RATE_LIMITED {
                return Err(FetchError::Status {
                    status: resp.status,
                });
            }
            if retries >= self.policy.max_retries {
                return Err(FetchError::RateLimited {
                    attempts: retries + 1,
                });
            }
            let wait = self.policy.delay_for(retries);
            retries += 1;
            tracing::warn!(
                %url,
                retry = retries,
                max_retries = self.policy.max_retries,
                wait_ms = wait.as_millis() as u64,
                "rate limited, backing off"
            );
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use super::*;
    use crate::archive_client::PageResponse;

    /// Scripted [`PageSource`]: each URL answers from its own queue; an
    /// exhausted queue keeps answering with its last entry.
    #[derive(Default)]
    pub struct ScriptedSource {
        scripts: Mutex<HashMap<String, VecDeque<Result<PageResponse, FetchError>>>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl ScriptedSource {
        pub fn respond(&self, url: &str, outcomes: Vec<Result<PageResponse, FetchError>>) {
            self.scripts
                .lock()
                .unwrap()
                .insert(url.to_string(), outcomes.into());
        }

        pub fn calls_to(&self, url: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
        }
    }

    pub fn ok(body: &str) -> Result<PageResponse, FetchError> {
        Ok(PageResponse {
            status: 200,
            body: body.to_string(),
        })
    }

    pub fn status(code: u16) -> Result<PageResponse, FetchError> {
        Ok(PageResponse {
            status: code,
            body: String::new(),
        })
    }

    #[async_trait::async_trait]
    impl PageSource for ScriptedSource {
        async fn get(&self, url: &Url) -> Result<PageResponse, FetchError> {
            self.calls.lock().unwrap().push(url.to_string());
            let mut scripts = self.scripts.lock().unwrap();
            let queue = scripts
                .get_mut(url.as_str())
                .ok_or_else(|| FetchError::Network(format!("no script for {url}")))?;
            if queue.len() > 1 {
                queue.pop_front().unwrap_or_else(|| status(500))
            } else {
                queue.front().cloned().unwrap_or_else(|| status(500))
            }
        }
    }
}
