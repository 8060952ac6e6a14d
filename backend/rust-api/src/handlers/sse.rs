use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Extension,
};
use chrono::Utc;
use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::{
    error::ApiError,
    metrics::COUNTDOWN_STREAMS_ACTIVE,
    middlewares::auth::SessionClaims,
    models::{
        competition::{CompetitionWindow, Phase},
        timer::{CompetitionEnded, CountdownEvent, CountdownTick, PhaseChanged},
        user::SessionEvent,
    },
    services::{time_window::classify_window, AppState},
};

/// SSE countdown for the competition window
/// GET /api/v1/competition/stream
pub async fn competition_stream(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let window = state.clock.window().await?;
    let tick = Duration::from_millis(state.config.countdown.tick_interval_ms);
    let lifetime = Duration::from_secs(state.config.countdown.max_stream_seconds);

    tracing::info!(
        user_id = %claims.sub,
        tick_ms = state.config.countdown.tick_interval_ms,
        max_seconds = state.config.countdown.max_stream_seconds,
        "Countdown stream opened"
    );

    let events = countdown_events(
        window,
        claims.sub,
        tick,
        lifetime,
        state.identity.on_session_change(),
    )
    .map(|event| {
        Ok::<_, Infallible>(
            Event::default()
                .event(event.event_name())
                .data(event.to_sse_data()),
        )
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// Keeps the active-stream gauge in step with live streams, however they end.
struct StreamGuard;

impl StreamGuard {
    fn new() -> Self {
        COUNTDOWN_STREAMS_ACTIVE.inc();
        StreamGuard
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        COUNTDOWN_STREAMS_ACTIVE.dec();
    }
}

struct Countdown {
    window: CompetitionWindow,
    user_id: String,
    interval: Interval,
    deadline: Instant,
    sessions: broadcast::Receiver<SessionEvent>,
    watching_sessions: bool,
    last_phase: Option<Phase>,
    pending: VecDeque<CountdownEvent>,
    finished: bool,
    _guard: StreamGuard,
}

impl Countdown {
    fn on_tick(&mut self) {
        let now = Utc::now();
        let state = classify_window(now, &self.window);

        if let Some(previous) = self.last_phase.filter(|phase| *phase != state.phase) {
            tracing::debug!(
                user_id = %self.user_id,
                from = previous.as_str(),
                to = state.phase.as_str(),
                "Countdown crossed a phase boundary"
            );
            self.pending
                .push_back(CountdownEvent::PhaseChanged(PhaseChanged {
                    from: previous,
                    to: state.phase,
                    timestamp: now,
                }));
        }
        self.last_phase = Some(state.phase);

        self.pending
            .push_back(CountdownEvent::CountdownTick(CountdownTick {
                phase: state.phase,
                remaining: state.remaining,
                timestamp: now,
            }));

        if state.phase == Phase::Ended {
            self.pending
                .push_back(CountdownEvent::CompetitionEnded(CompetitionEnded {
                    timestamp: now,
                    message: "The hunt has ended".to_string(),
                }));
            self.finished = true;
        }
    }

    fn on_session_event(&mut self, event: Result<SessionEvent, RecvError>) {
        match event {
            Ok(SessionEvent::SignedOut { user_id }) if user_id == self.user_id => {
                tracing::info!(user_id = %self.user_id, "Viewer signed out, closing countdown");
                self.finished = true;
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Countdown lagged behind session events");
            }
            Err(RecvError::Closed) => self.watching_sessions = false,
        }
    }
}

/// Upper bound on a stream's lifetime and tick period, whatever is configured.
const MAX_STREAM_LIFETIME: Duration = Duration::from_secs(7 * 24 * 60 * 60);

fn stream_deadline(opened_at: Instant, lifetime: Duration) -> Instant {
    opened_at + lifetime.min(MAX_STREAM_LIFETIME)
}

/// Countdown events recomputed from the wall clock on every tick, so a late
/// or skipped tick never drifts. Ends when the competition ends, the viewer
/// signs out, or `lifetime` elapses.
pub fn countdown_events(
    window: CompetitionWindow,
    user_id: String,
    tick: Duration,
    lifetime: Duration,
    sessions: broadcast::Receiver<SessionEvent>,
) -> impl Stream<Item = CountdownEvent> {
    let mut interval = tokio::time::interval(tick.min(MAX_STREAM_LIFETIME));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let countdown = Countdown {
        window,
        user_id,
        interval,
        deadline: stream_deadline(Instant::now(), lifetime),
        sessions,
        watching_sessions: true,
        last_phase: None,
        pending: VecDeque::new(),
        finished: false,
        _guard: StreamGuard::new(),
    };

    stream::unfold(countdown, |mut countdown| async move {
        loop {
            if let Some(event) = countdown.pending.pop_front() {
                return Some((event, countdown));
            }
            if countdown.finished {
                return None;
            }

            tokio::select! {
                _ = countdown.interval.tick() => countdown.on_tick(),
                _ = tokio::time::sleep_until(countdown.deadline) => {
                    tracing::debug!(user_id = %countdown.user_id, "Countdown reached its maximum lifetime");
                    return None;
                }
                event = countdown.sessions.recv(), if countdown.watching_sessions => {
                    countdown.on_session_event(event)
                }
            }
        }
    })
}
