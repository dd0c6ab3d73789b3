//! Atmosphere streaming engine.
//!
//! Every `ReadAtmosphere` stream gets its own session task. The task waits for
//! the client's first feature mask, then samples the shared sensor once per
//! tick and pushes masked readings into a bounded channel that backs the
//! response stream. Sessions are tracked so shutdown can cancel them and wait
//! for them to finish.

use super::session::{MaskUpdate, SessionState};
use super::{AtmosphereSensor, ConnectionLost, FeatureMask, Reading, SensorFault};
use crate::config::AtmosphereConfig;
use crate::error::{HomeError, Result};
use futures_util::{Stream, StreamExt};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior, interval};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

/// Stream of readings handed to one client.
pub type ReadingStream = ReceiverStream<Result<Reading>>;

/// Shortest read interval a session will run with.
pub const MIN_READ_INTERVAL: Duration = Duration::from_millis(1);

/// Tunables shared by all sessions.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Time between two readings of one session.
    pub read_interval: Duration,
    /// Readings buffered ahead of a slow client.
    pub session_buffer: usize,
    /// Unconfigured sessions are rejected after this long. Zero disables it.
    pub configure_timeout: Duration,
    /// Extra attempts for a failed read before the session fails.
    pub sensor_retries: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            read_interval: Duration::from_secs(1),
            session_buffer: 4,
            configure_timeout: Duration::from_secs(30),
            sensor_retries: 0,
        }
    }
}

impl From<&AtmosphereConfig> for EngineSettings {
    fn from(config: &AtmosphereConfig) -> Self {
        Self {
            read_interval: config.read_interval(),
            session_buffer: config.session_buffer,
            configure_timeout: config.configure_timeout(),
            sensor_retries: config.sensor_retries,
        }
    }
}

pub struct AtmosphereEngine {
    sensor: Arc<dyn AtmosphereSensor>,
    settings: EngineSettings,
    sessions: TaskTracker,
    shutdown: CancellationToken,
}

impl AtmosphereEngine {
    pub fn new(sensor: Arc<dyn AtmosphereSensor>, mut settings: EngineSettings) -> Self {
        if settings.read_interval < MIN_READ_INTERVAL {
            warn!(
                "[Atmosphere] Read interval {:?} too short, using {:?}",
                settings.read_interval, MIN_READ_INTERVAL
            );
            settings.read_interval = MIN_READ_INTERVAL;
        }
        Self {
            sensor,
            settings,
            sessions: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Start a session fed by `masks` and return its reading stream.
    ///
    /// The session ends when `masks` ends or yields [`ConnectionLost`], when
    /// the returned stream is dropped, on a sensor fault, or on
    /// [`shutdown`](Self::shutdown). Errors are delivered as the final item of
    /// the stream. A lost connection ends it without one.
    pub fn open_session<S>(&self, masks: S) -> ReadingStream
    where
        S: Stream<Item = std::result::Result<FeatureMask, ConnectionLost>> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(self.settings.session_buffer.max(1));
        let session = Session {
            id: Uuid::new_v4(),
            sensor: self.sensor.clone(),
            settings: self.settings.clone(),
            cancel: self.shutdown.child_token(),
            tx,
        };
        self.sessions.spawn(session.run(masks));
        ReceiverStream::new(rx)
    }

    /// Number of session tasks still alive.
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Cancel every session and wait until all of them have exited.
    pub async fn shutdown(&self) {
        info!(
            "[Atmosphere] Shutting down {} session(s)",
            self.sessions.len()
        );
        self.shutdown.cancel();
        self.sessions.close();
        self.sessions.wait().await;
    }
}

struct Session {
    id: Uuid,
    sensor: Arc<dyn AtmosphereSensor>,
    settings: EngineSettings,
    cancel: CancellationToken,
    tx: mpsc::Sender<Result<Reading>>,
}

impl Session {
    async fn run<S>(self, masks: S)
    where
        S: Stream<Item = std::result::Result<FeatureMask, ConnectionLost>> + Send + 'static,
    {
        tokio::pin!(masks);
        let mut state = SessionState::default();
        let mut ticker: Option<Interval> = None;
        let has_deadline = !self.settings.configure_timeout.is_zero();
        let deadline = tokio::time::sleep(self.settings.configure_timeout);
        tokio::pin!(deadline);

        debug!("[Atmosphere] Session {} opened", self.id);

        let outcome: Result<()> = loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!("[Atmosphere] Session {} cancelled by shutdown", self.id);
                    break Ok(());
                }
                _ = self.tx.closed() => {
                    debug!("[Atmosphere] Session {} client disconnected", self.id);
                    break Ok(());
                }
                _ = &mut deadline, if has_deadline && state == SessionState::Unconfigured => {
                    break Err(HomeError::Unconfigured);
                }
                inbound = masks.next() => match inbound {
                    Some(Ok(mask)) => match state.configure(mask) {
                        MaskUpdate::Started => {
                            info!("[Atmosphere] Session {} streaming {}", self.id, mask);
                            ticker = Some(new_ticker(self.settings.read_interval));
                        }
                        MaskUpdate::Replaced => {
                            info!("[Atmosphere] Session {} switched to {}", self.id, mask);
                        }
                        MaskUpdate::Unchanged | MaskUpdate::Ignored => {
                            debug!("[Atmosphere] Session {} kept {}", self.id, mask);
                        }
                    },
                    Some(Err(lost)) => {
                        debug!("[Atmosphere] Session {} {}", self.id, lost);
                        break Ok(());
                    }
                    None => break state.inbound_closed(),
                },
                _ = next_tick(&mut ticker) => {
                    let Some(mask) = state.active_mask() else {
                        continue;
                    };
                    // A hung sensor must not hold up shutdown or a departed client
                    let sampled = tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => {
                            debug!("[Atmosphere] Session {} cancelled during read", self.id);
                            break Ok(());
                        }
                        _ = self.tx.closed() => {
                            debug!("[Atmosphere] Session {} client left during read", self.id);
                            break Ok(());
                        }
                        sampled = self.sample(mask) => sampled,
                    };
                    match sampled {
                        Ok(reading) => {
                            if !self.deliver(Ok(reading)).await {
                                debug!("[Atmosphere] Session {} stopped while sending", self.id);
                                break Ok(());
                            }
                        }
                        Err(fault) => break Err(HomeError::Sensor(fault)),
                    }
                }
            }
        };

        state.close();
        if let Err(e) = outcome {
            warn!("[Atmosphere] Session {} closed with error: {}", self.id, e);
            // The client may already be gone; nothing else to report to
            self.deliver(Err(e)).await;
        } else {
            debug!("[Atmosphere] Session {} closed", self.id);
        }
    }

    /// Push one item to the client. False once the client is gone or the
    /// engine is shutting down.
    async fn deliver(&self, item: Result<Reading>) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.tx.send(item) => sent.is_ok(),
        }
    }

    /// Read the sensor for `mask`, retrying up to the configured count.
    async fn sample(&self, mask: FeatureMask) -> std::result::Result<Reading, SensorFault> {
        if mask.is_empty() {
            return Ok(Reading::empty());
        }
        let mut attempt = 0;
        loop {
            let sensor = self.sensor.clone();
            let result = tokio::task::spawn_blocking(move || sensor.read(mask))
                .await
                .unwrap_or_else(|e| Err(SensorFault::new(format!("sensor read task failed: {e}"))));

            match result {
                // Never report a field the client did not ask for
                Ok(reading) => return Ok(mask.apply(reading)),
                Err(fault) if attempt < self.settings.sensor_retries => {
                    attempt += 1;
                    warn!(
                        "[Atmosphere] Session {} read failed ({}), retry {}/{}",
                        self.id, fault, attempt, self.settings.sensor_retries
                    );
                }
                Err(fault) => return Err(fault),
            }
        }
    }
}

fn new_ticker(period: Duration) -> Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Next tick of an active session; never completes before configuration.
async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
