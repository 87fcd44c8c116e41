use futures_util::StreamExt;
use reqwest::StatusCode;
use std::time::{Duration, Instant};
use tokio::sync::watch;

use super::link::{
    sanitize_expression, Deduplicator, LinkMachine, LinkState, DEFAULT_DEDUP_WINDOW_MS,
    DEFAULT_MAX_ATTEMPTS,
};
use super::sse::{SseFrame, SseParser};
use crate::error::VoiceError;
use crate::hub::DEFAULT_HEARTBEAT_SECS;
use crate::protocol::{Action, ResultEvent, StatusEvent, VoiceEvent, SSE_MESSAGE_EVENT};

pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 1_000;
/// Three missed heartbeats and the stream counts as dropped.
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 3 * DEFAULT_HEARTBEAT_SECS * 1_000;

/// The calculator the consumer drives. Expressions arrive already
/// deduplicated and sanitized.
pub trait CalculatorHost: Send {
    fn apply_expression(&mut self, expression: &str);
    fn calculate(&mut self);
    fn clear(&mut self);
    fn backspace(&mut self);
    /// The server stopped listening after a voice stop command.
    fn voice_stopped(&mut self);

    fn link_state_changed(&mut self, _state: LinkState, _detail: &str) {}
    fn status(&mut self, _status: &StatusEvent) {}
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub server_url: String,
    pub reconnect_delay: Duration,
    pub max_attempts: u32,
    pub dedup_window: Duration,
    /// Longest silence tolerated on a connected stream.
    pub idle_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".to_string(),
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            dedup_window: Duration::from_millis(DEFAULT_DEDUP_WINDOW_MS),
            idle_timeout: Duration::from_millis(DEFAULT_IDLE_TIMEOUT_MS),
        }
    }
}

/// Cancels a running [`StreamConsumer::run`].
#[derive(Clone)]
pub struct StopHandle {
    sender: watch::Sender<bool>,
}

impl StopHandle {
    pub fn stop(&self) {
        let _ = self.sender.send(true);
    }
}

/// How one stream connection ended.
enum StreamEnd {
    Cancelled,
    VoiceStopped,
    Dropped(VoiceError),
}

/// Subscribes to the voice event stream and forwards results to a host.
pub struct StreamConsumer {
    settings: ClientSettings,
    http: reqwest::Client,
    cancel: watch::Receiver<bool>,
    cancel_reset: watch::Sender<bool>,
    dedup: Deduplicator,
}

impl StreamConsumer {
    pub fn new(settings: ClientSettings) -> (Self, StopHandle) {
        let (sender, cancel) = watch::channel(false);
        let dedup = Deduplicator::new(settings.dedup_window);
        let consumer = Self {
            settings,
            http: reqwest::Client::new(),
            cancel,
            cancel_reset: sender.clone(),
            dedup,
        };
        (consumer, StopHandle { sender })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.settings.server_url.trim_end_matches('/'))
    }

    /// Connect and consume until stopped. Returns `Idle` after a stop (local
    /// or spoken), or `ReconnectExhausted` once the attempt cap is hit, in
    /// which case the server session is stopped as well. Calling `run` again
    /// starts over with a fresh attempt counter; a stop issued before that
    /// call does not carry over.
    pub async fn run<H: CalculatorHost>(&mut self, host: &mut H) -> Result<LinkState, VoiceError> {
        self.cancel_reset.send_replace(false);
        let _ = self.cancel.borrow_and_update();
        let mut machine = LinkMachine::new(self.settings.max_attempts);
        machine.start();
        self.dedup.reset();
        host.link_state_changed(LinkState::Connecting, "connecting to voice service");

        loop {
            if *self.cancel.borrow() {
                return Ok(self.finish_idle(&mut machine, host));
            }

            let end = match self.connect().await {
                Ok(response) => match self.start_session().await {
                    Ok(()) => {
                        machine.ack();
                        host.link_state_changed(LinkState::Listening, "listening");
                        tracing::info!("voice stream connected");
                        self.consume(response, host).await
                    }
                    Err(err @ VoiceError::ResourceUnavailable(_)) => {
                        host.link_state_changed(LinkState::Error, &err.to_string());
                        return Err(err);
                    }
                    Err(err) => StreamEnd::Dropped(err),
                },
                Err(err) => StreamEnd::Dropped(err),
            };

            match end {
                StreamEnd::Cancelled => return Ok(self.finish_idle(&mut machine, host)),
                StreamEnd::VoiceStopped => {
                    host.voice_stopped();
                    return Ok(self.finish_idle(&mut machine, host));
                }
                StreamEnd::Dropped(err) => {
                    let state = machine.fail();
                    tracing::warn!(attempts = machine.attempts(), "voice stream lost: {err}");
                    if state == LinkState::Error {
                        let attempts = machine.attempts();
                        host.link_state_changed(
                            LinkState::Error,
                            &format!("gave up after {attempts} attempts"),
                        );
                        self.stop_session().await;
                        return Err(VoiceError::ReconnectExhausted { attempts });
                    }
                    host.link_state_changed(LinkState::Connecting, &err.to_string());
                }
            }

            if self.wait_reconnect_delay().await {
                return Ok(self.finish_idle(&mut machine, host));
            }
        }
    }

    fn finish_idle<H: CalculatorHost>(&self, machine: &mut LinkMachine, host: &mut H) -> LinkState {
        let state = machine.stop();
        host.link_state_changed(state, "stopped");
        state
    }

    async fn connect(&self) -> Result<reqwest::Response, VoiceError> {
        let response = self
            .http
            .get(self.url("/voice/stream"))
            .header("accept", "text/event-stream")
            .send()
            .await
            .map_err(|err| VoiceError::StreamDisconnect(err.to_string()))?;
        if !response.status().is_success() {
            return Err(VoiceError::StreamDisconnect(format!(
                "stream returned HTTP {}",
                response.status()
            )));
        }
        Ok(response)
    }

    async fn start_session(&self) -> Result<(), VoiceError> {
        let response = self
            .http
            .post(self.url("/voice/start"))
            .send()
            .await
            .map_err(|err| VoiceError::StreamDisconnect(err.to_string()))?;
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::SERVICE_UNAVAILABLE => {
                let body: serde_json::Value = response.json().await.unwrap_or_default();
                let message = body["message"]
                    .as_str()
                    .unwrap_or("speech resource unavailable")
                    .to_string();
                Err(VoiceError::ResourceUnavailable(message))
            }
            status => Err(VoiceError::StreamDisconnect(format!(
                "start returned HTTP {status}"
            ))),
        }
    }

    async fn stop_session(&self) {
        if let Err(err) = self.http.post(self.url("/voice/stop")).send().await {
            tracing::debug!("voice stop request failed: {err}");
        }
    }

    /// Sleep out the reconnect delay. Returns true when cancelled meanwhile.
    async fn wait_reconnect_delay(&mut self) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(self.settings.reconnect_delay) => *self.cancel.borrow(),
            changed = self.cancel.changed() => changed.is_err() || *self.cancel.borrow(),
        }
    }

    async fn consume<H: CalculatorHost>(
        &mut self,
        response: reqwest::Response,
        host: &mut H,
    ) -> StreamEnd {
        let mut body = Box::pin(response.bytes_stream());
        let mut parser = SseParser::new();
        loop {
            let chunk = tokio::select! {
                chunk = tokio::time::timeout(self.settings.idle_timeout, body.next()) => match chunk {
                    Ok(chunk) => chunk,
                    Err(_) => {
                        return StreamEnd::Dropped(VoiceError::StreamDisconnect(format!(
                            "no data for {}ms",
                            self.settings.idle_timeout.as_millis()
                        )))
                    }
                },
                changed = self.cancel.changed() => {
                    if changed.is_err() || *self.cancel.borrow() {
                        return StreamEnd::Cancelled;
                    }
                    continue;
                }
            };
            let bytes = match chunk {
                Some(Ok(bytes)) => bytes,
                Some(Err(err)) => {
                    return StreamEnd::Dropped(VoiceError::StreamDisconnect(err.to_string()))
                }
                None => {
                    return StreamEnd::Dropped(VoiceError::StreamDisconnect(
                        "server closed the stream".to_string(),
                    ))
                }
            };
            for frame in parser.feed(&bytes) {
                if self.handle_frame(&frame, host, Instant::now()) {
                    return StreamEnd::VoiceStopped;
                }
            }
        }
    }

    /// Apply one frame to the host. Returns true when it was a stop command.
    fn handle_frame<H: CalculatorHost>(
        &mut self,
        frame: &SseFrame,
        host: &mut H,
        now: Instant,
    ) -> bool {
        if frame.event != SSE_MESSAGE_EVENT {
            return false;
        }
        match VoiceEvent::from_json(&frame.data) {
            Ok(VoiceEvent::Status(status)) => {
                host.status(&status);
                false
            }
            Ok(VoiceEvent::Result(result)) => self.apply_result(&result, host, now),
            Err(err) => {
                tracing::warn!("ignoring voice event: {err}");
                false
            }
        }
    }

    pub(super) fn apply_result<H: CalculatorHost>(
        &mut self,
        result: &ResultEvent,
        host: &mut H,
        now: Instant,
    ) -> bool {
        match result.action {
            Action::AppendExpression => {
                self.deliver_expression(result.expression.as_deref(), host, now);
            }
            Action::Calculate => {
                self.deliver_expression(result.expression.as_deref(), host, now);
                host.calculate();
                self.dedup.reset();
            }
            Action::Clear => {
                self.dedup.reset();
                host.clear();
            }
            Action::Backspace => host.backspace(),
            Action::Stop => return true,
        }
        false
    }

    fn deliver_expression<H: CalculatorHost>(
        &mut self,
        expression: Option<&str>,
        host: &mut H,
        now: Instant,
    ) {
        let Some(expression) = expression else {
            return;
        };
        if !self.dedup.accept(expression, now) {
            tracing::debug!("dropping duplicate expression");
            return;
        }
        let sanitized = sanitize_expression(expression);
        if !sanitized.is_empty() {
            host.apply_expression(&sanitized);
        }
    }
}
