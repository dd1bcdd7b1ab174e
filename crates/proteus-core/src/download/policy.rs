use std::time::Duration;

/// HTTP status meaning the asset is ready and the body is the asset.
pub const STATUS_READY: u16 = 200;
/// HTTP status meaning the asset is still being processed upstream.
pub const STATUS_PROCESSING: u16 = 202;

/// Transition taken after one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDecision {
    /// 200: hand the open body to the caller.
    Stream,
    /// 202 with budget left: wait, then poll again.
    RetryAfter(Duration),
    /// 202 with the budget spent.
    Exhausted,
    /// Any other status. Terminal, never retried.
    Fail,
}

/// Fixed-interval re-polling while the service answers 202.
///
/// There is no backoff: the service re-checks at a constant pace and the
/// only bound is the attempt counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadPolicy {
    /// Re-polls allowed after the first request.
    pub max_retries: u32,
    /// Pause between a 202 and the next poll.
    pub retry_delay: Duration,
}

impl Default for DownloadPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
        }
    }
}

impl DownloadPolicy {
    /// Negative `max_retries` is treated as zero retries.
    pub fn new(max_retries: i64, retry_delay_secs: u64) -> Self {
        Self {
            max_retries: u32::try_from(max_retries.max(0)).unwrap_or(u32::MAX),
            retry_delay: Duration::from_secs(retry_delay_secs),
        }
    }

    /// Upper bound on requests issued by one download.
    pub fn max_requests(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Decide what to do with a poll's status.
    ///
    /// `processing_seen` is the number of 202 responses so far, including
    /// this one when `status` is 202.
    pub fn decide(&self, processing_seen: u32, status: u16) -> PollDecision {
        match status {
            STATUS_READY => PollDecision::Stream,
            STATUS_PROCESSING if processing_seen > self.max_retries => PollDecision::Exhausted,
            STATUS_PROCESSING => PollDecision::RetryAfter(self.retry_delay),
            _ => PollDecision::Fail,
        }
    }
}
