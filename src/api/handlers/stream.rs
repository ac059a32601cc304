//! Long-lived server-push (SSE) notification streams.
//!
//! One endpoint per party. Each connection drains its subscriber queue
//! and serializes events as `data:` frames. Rider frames are re-priced
//! against the applied coupon at delivery time. A client disconnect
//! drops the stream without draining; undelivered events wait for the
//! next connect.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderName, HeaderValue};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use tokio::time::MissedTickBehavior;

use crate::app_state::AppState;
use crate::domain::event::{SentKind, SentSignal};
use crate::domain::{Unit, User};

fn with_push_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        HeaderName::from_static("x-accel-buffering"),
        HeaderValue::from_static("no"),
    );
    response
}

/// `GET /api/app/notification` — Rider status stream.
///
/// Each queued event is re-priced inside a read-only store transaction,
/// pushed as one SSE frame, and acknowledged to the status-ack syncer
/// after the frame is handed to the connection.
pub async fn rider_notifications(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Response {
    let dispatch = Arc::clone(&state.dispatch);
    let keep_alive_ms = state.config.app_notify_ms;
    let user_id = user.id;

    let stream = async_stream::stream! {
        let handle = dispatch.rider_stream(user_id).await;
        loop {
            let Some(frame) = handle.recv().await else {
                break;
            };
            let frame = match dispatch.price_rider_frame(user_id, frame).await {
                Ok(frame) => frame,
                Err(err) => {
                    tracing::error!(error = %err, "failed to price rider frame");
                    break;
                }
            };
            let signal = SentSignal {
                status_id: frame.status_id,
                trip_id: frame.ride_id,
                unit_id: frame.chair.as_ref().map(|chair| chair.id),
                status: frame.status,
                kind: SentKind::RiderStream,
            };
            match Event::default().json_data(&frame) {
                Ok(event) => {
                    yield Ok::<Event, Infallible>(event);
                    dispatch.ack_delivery(signal).await;
                }
                Err(err) => {
                    tracing::error!(error = %err, "failed to serialize rider frame");
                    break;
                }
            }
        }
    };

    let sse = Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(Duration::from_millis(keep_alive_ms)));
    with_push_headers(sse.into_response())
}

/// `GET /api/chair/notification` — Unit status stream.
///
/// New events acknowledge on first delivery; between events the last
/// delivered frame is replayed as an idempotent heartbeat with no
/// acknowledgment side-effects.
pub async fn unit_notifications(
    State(state): State<AppState>,
    Extension(unit): Extension<Unit>,
) -> Response {
    let dispatch = Arc::clone(&state.dispatch);
    let retry_after_ms = state.config.chair_retry_after_ms;
    let unit_id = unit.id;

    let stream = async_stream::stream! {
        let handle = dispatch.unit_stream(unit_id).await;
        let mut replay = tokio::time::interval(Duration::from_millis(retry_after_ms));
        replay.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                received = handle.recv() => {
                    let Some(frame) = received else {
                        break;
                    };
                    let signal = SentSignal {
                        status_id: frame.status_id,
                        trip_id: frame.ride_id,
                        unit_id: Some(unit_id),
                        status: frame.status,
                        kind: SentKind::UnitStream,
                    };
                    match Event::default().json_data(&frame) {
                        Ok(event) => {
                            yield Ok::<Event, Infallible>(event);
                            dispatch.ack_delivery(signal).await;
                        }
                        Err(err) => {
                            tracing::error!(error = %err, "failed to serialize unit frame");
                            break;
                        }
                    }
                }
                _ = replay.tick() => {
                    if let Some(last) = handle.last_sent() {
                        if let Ok(event) = Event::default().json_data(&last) {
                            yield Ok::<Event, Infallible>(event);
                        }
                    }
                }
            }
        }
    };

    with_push_headers(Sse::new(stream).into_response())
}
