//! YouTube live chat connector: broadcast discovery and quota-aware polling.
//!
//! Discovery costs a `search.list` (skipped with a fixed live id) plus a
//! `videos.list`; each poll costs a `liveChatMessages.list`. Every call is
//! reserved against the shared [`QuotaGovernor`] first. When the budget is
//! gone the connector sleeps until the quota day rolls over.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use youtube_client::api::{CHAT_MESSAGES_COST, SEARCH_COST, VIDEOS_COST};
use youtube_client::quota::{adaptive_poll_interval, tier_interval};
use youtube_client::{LiveChatMessageListResponse, QuotaGovernor, YouTubeApiClient, YouTubeError};

use super::{Backoff, ConnectorContext, EventEmitter, StatusReporter};
use crate::background::sleep_or_cancel;
use crate::event::Platform;
use crate::normalize::UpstreamPayload;

/// Slack added to the quota reset wait so the next check lands in the new day.
const RESET_MARGIN: Duration = Duration::from_secs(5);

/// Wall clock used for quota accounting and receive timestamps.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// The three Data API calls the connector makes.
pub trait LiveChatApi: Send + Sync + 'static {
    fn search_live_video(
        &self,
        channel_id: &str,
    ) -> impl Future<Output = Result<Option<String>, YouTubeError>> + Send;

    fn live_chat_id(
        &self,
        video_id: &str,
    ) -> impl Future<Output = Result<Option<String>, YouTubeError>> + Send;

    fn chat_page(
        &self,
        live_chat_id: &str,
        page_token: Option<&str>,
    ) -> impl Future<Output = Result<LiveChatMessageListResponse, YouTubeError>> + Send;
}

impl LiveChatApi for YouTubeApiClient {
    async fn search_live_video(&self, channel_id: &str) -> Result<Option<String>, YouTubeError> {
        self.find_live_video(channel_id).await
    }

    async fn live_chat_id(&self, video_id: &str) -> Result<Option<String>, YouTubeError> {
        self.active_live_chat_id(video_id).await
    }

    async fn chat_page(
        &self,
        live_chat_id: &str,
        page_token: Option<&str>,
    ) -> Result<LiveChatMessageListResponse, YouTubeError> {
        self.list_chat_messages(live_chat_id, page_token).await
    }
}

#[derive(Debug, Clone)]
pub struct YouTubeSettings {
    pub channel_id: String,
    /// Fixed live video id; skips the search step.
    pub live_id: Option<String>,
    pub offline_check: Duration,
    pub skip_backlog: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Discover,
    Poll(PollState),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PollState {
    video_id: String,
    chat_id: String,
    page_token: Option<String>,
    first_page: bool,
}

enum Flow {
    Next(Phase, Duration),
    Stop,
}

/// Supervisor loop. Returns on cancellation or a terminal error.
pub async fn run<A: LiveChatApi>(
    ctx: ConnectorContext,
    api: Result<A, YouTubeError>,
    settings: YouTubeSettings,
    quota: QuotaGovernor,
    backoff: Backoff,
    cancel: CancellationToken,
) {
    run_with_clock(ctx, api, settings, quota, backoff, cancel, Arc::new(Utc::now)).await;
}

pub(crate) async fn run_with_clock<A: LiveChatApi>(
    ctx: ConnectorContext,
    api: Result<A, YouTubeError>,
    settings: YouTubeSettings,
    quota: QuotaGovernor,
    backoff: Backoff,
    cancel: CancellationToken,
    clock: Clock,
) {
    let mut reporter = StatusReporter::new(Platform::Youtube, ctx.clone());

    let api = match api {
        Ok(api) => api,
        Err(YouTubeError::MissingApiKey) => {
            reporter.error("YOUTUBE_API_KEY is not set");
            return;
        }
        Err(e) => {
            reporter.error(e.to_string());
            return;
        }
    };
    if settings.channel_id.trim().is_empty() && settings.live_id.is_none() {
        reporter.error("YOUTUBE_CHANNEL_ID is not set");
        return;
    }

    let mut poller = Poller {
        emitter: EventEmitter::new(Platform::Youtube, ctx.broadcaster.clone()),
        api,
        settings,
        quota,
        reporter,
        backoff,
        cancel: cancel.clone(),
        clock,
    };

    let mut phase = Phase::Discover;
    loop {
        match poller.step(phase).await {
            Flow::Stop => return,
            Flow::Next(next, wait) => {
                phase = next;
                if sleep_or_cancel(&cancel, wait).await {
                    return;
                }
            }
        }
    }
}

struct Poller<A> {
    api: A,
    settings: YouTubeSettings,
    quota: QuotaGovernor,
    emitter: EventEmitter,
    reporter: StatusReporter,
    backoff: Backoff,
    cancel: CancellationToken,
    clock: Clock,
}

impl<A: LiveChatApi> Poller<A> {
    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    async fn step(&mut self, phase: Phase) -> Flow {
        match phase {
            Phase::Discover => self.discover().await,
            Phase::Poll(state) => self.poll(state).await,
        }
    }

    async fn discover(&mut self) -> Flow {
        self.reporter.connecting(self.backoff.attempt());

        let video_id = match self.settings.live_id.clone() {
            Some(id) => id,
            None => {
                if let Some(wait) = self.reserve(SEARCH_COST) {
                    return Flow::Next(Phase::Discover, wait);
                }
                let channel_id = self.settings.channel_id.clone();
                let Some(result) = self.cancellable(self.api.search_live_video(&channel_id)).await else {
                    return Flow::Stop;
                };
                match result {
                    Ok(Some(video_id)) => video_id,
                    Ok(None) => return self.offline("no live broadcast"),
                    Err(e) => return self.on_error(e, Phase::Discover),
                }
            }
        };

        if let Some(wait) = self.reserve(VIDEOS_COST) {
            return Flow::Next(Phase::Discover, wait);
        }
        let Some(result) = self.cancellable(self.api.live_chat_id(&video_id)).await else {
            return Flow::Stop;
        };
        match result {
            Ok(Some(chat_id)) => {
                tracing::info!(video_id = %video_id, "Found YouTube live chat");
                Flow::Next(
                    Phase::Poll(PollState {
                        video_id,
                        chat_id,
                        page_token: None,
                        first_page: true,
                    }),
                    Duration::ZERO,
                )
            }
            Ok(None) => self.offline("broadcast has no active chat"),
            Err(e) => self.on_error(e, Phase::Discover),
        }
    }

    async fn poll(&mut self, mut state: PollState) -> Flow {
        if let Some(wait) = self.reserve(CHAT_MESSAGES_COST) {
            return Flow::Next(Phase::Poll(state), wait);
        }
        let result = {
            let fut = self.api.chat_page(&state.chat_id, state.page_token.as_deref());
            self.cancellable(fut).await
        };
        let page = match result {
            None => return Flow::Stop,
            Some(Ok(page)) => page,
            Some(Err(e)) => return self.on_error(e, Phase::Poll(state)),
        };

        // Reasserted on every page; the reporter only notifies on change.
        self.backoff.reset();
        self.reporter.connected(format!("video {}", state.video_id));

        let received_at = self.now();
        let skip = state.first_page && self.settings.skip_backlog;
        let mut chat_ended = false;
        let mut skipped = 0usize;
        for message in page.items {
            if message.is_chat_ended() {
                chat_ended = true;
                continue;
            }
            if skip {
                if let Some(id) = message.id.as_deref() {
                    self.emitter.mark_seen(id);
                }
                skipped += 1;
                continue;
            }
            self.emitter.emit(UpstreamPayload::YouTube {
                message,
                received_at,
            });
        }
        if skipped > 0 {
            tracing::info!(skipped, "Skipped YouTube chat backlog");
        }

        state.first_page = false;
        if page.next_page_token.is_some() {
            state.page_token = page.next_page_token;
        }

        if chat_ended || page.offline_at.is_some() {
            tracing::info!(video_id = %state.video_id, "YouTube broadcast ended");
            return self.offline("broadcast ended");
        }

        let used = self.quota.used_fraction(self.now());
        let suggested = page.polling_interval_millis.map(Duration::from_millis);
        let interval = adaptive_poll_interval(used, suggested);
        tracing::debug!(used, interval_secs = interval.as_secs(), "Next YouTube poll");
        Flow::Next(Phase::Poll(state), interval)
    }

    /// Reserve quota. Returns how long to wait when the budget is spent.
    fn reserve(&mut self, cost: u32) -> Option<Duration> {
        let now = self.now();
        if self.quota.try_acquire(cost, now) {
            return None;
        }
        let wait = self.quota.until_reset(now) + RESET_MARGIN;
        tracing::warn!(
            cost,
            resume_in_secs = wait.as_secs(),
            "YouTube quota exhausted, polling suspended"
        );
        self.reporter
            .disconnected(format!("daily quota exhausted, resuming in {} min", wait.as_secs() / 60));
        Some(wait)
    }

    fn offline(&mut self, reason: &str) -> Flow {
        let interval = self
            .settings
            .offline_check
            .max(tier_interval(self.quota.used_fraction(self.now())));
        tracing::info!(reason, check_in_secs = interval.as_secs(), "YouTube channel offline");
        self.reporter.disconnected(reason);
        Flow::Next(Phase::Discover, interval)
    }

    fn on_error(&mut self, error: YouTubeError, phase: Phase) -> Flow {
        if error.is_config_error() {
            self.reporter.error(error.to_string());
            return Flow::Stop;
        }
        if error.is_quota_exceeded() {
            tracing::warn!(error = %error, "YouTube reported quota exceeded");
            self.quota.exhaust(self.now());
            return Flow::Next(phase, Duration::ZERO);
        }
        if error.is_chat_gone() {
            tracing::info!(reason = error.reason().unwrap_or_default(), "YouTube live chat is gone");
            return self.offline("live chat ended");
        }

        let delay = self.backoff.next_delay();
        tracing::warn!(
            error = %error,
            attempt = self.backoff.attempt(),
            retry_in_ms = delay.as_millis() as u64,
            "YouTube request failed, retrying"
        );
        self.reporter
            .backoff(self.backoff.attempt(), delay, error.to_string());
        Flow::Next(phase, delay)
    }

    async fn cancellable<T>(&self, fut: impl Future<Output = T>) -> Option<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            out = fut => Some(out),
        }
    }
}
