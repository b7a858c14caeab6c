//! Push-channel listener: one WebSocket per job, no reconnects.

use client_logging::{client_debug, client_info, client_warn};
use futures_util::StreamExt;
use serde::Deserialize;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::api::channel_url;
use crate::{ChannelSignal, EngineEvent, ProgressSink, SessionKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenEnd {
    /// Server closed the channel.
    Closed,
    /// Connect failed or the socket errored.
    Failed,
    /// We closed the channel because `cancel` fired.
    Cancelled,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ChannelFrame {
    Status { message: String },
}

/// Decodes one text frame. Anything that is not a status frame is malformed.
pub fn parse_frame(text: &str) -> ChannelSignal {
    match serde_json::from_str::<ChannelFrame>(text) {
        Ok(ChannelFrame::Status { message }) => ChannelSignal::Status(message),
        Err(err) => {
            client_debug!("Malformed channel frame ({}): {}", err, text);
            ChannelSignal::Malformed(text.to_string())
        }
    }
}

pub async fn listen(
    session: SessionKey,
    endpoint: &str,
    job_id: &str,
    cancel: &CancellationToken,
    sink: &dyn ProgressSink,
) -> ListenEnd {
    let emit = |signal: ChannelSignal| sink.emit(EngineEvent::Channel { session, signal });

    let url = match channel_url(endpoint, job_id) {
        Ok(url) => url,
        Err(err) => {
            client_warn!("Session {} cannot open push channel: {}", session, err);
            emit(ChannelSignal::Error(err.to_string()));
            return ListenEnd::Failed;
        }
    };

    let connected = tokio::select! {
        biased;
        _ = cancel.cancelled() => return ListenEnd::Cancelled,
        connected = tokio_tungstenite::connect_async(url.as_str()) => connected,
    };
    let mut socket = match connected {
        Ok((socket, _response)) => socket,
        Err(err) => {
            client_warn!("Session {} push channel connect to {} failed: {}", session, url, err);
            emit(ChannelSignal::Error(err.to_string()));
            return ListenEnd::Failed;
        }
    };
    client_info!("Session {} push channel open at {}", session, url);
    emit(ChannelSignal::Opened);

    loop {
        let frame = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                if let Err(err) = socket.close(None).await {
                    client_debug!("Session {} close handshake failed: {}", session, err);
                }
                client_debug!("Session {} push channel closed locally", session);
                return ListenEnd::Cancelled;
            }
            frame = socket.next() => frame,
        };

        match frame {
            None | Some(Ok(Message::Close(_))) => {
                client_info!("Session {} push channel closed by server", session);
                emit(ChannelSignal::Closed);
                return ListenEnd::Closed;
            }
            Some(Err(err)) => {
                client_warn!("Session {} push channel error: {}", session, err);
                emit(ChannelSignal::Error(err.to_string()));
                return ListenEnd::Failed;
            }
            Some(Ok(Message::Text(text))) => emit(parse_frame(&text)),
            Some(Ok(Message::Binary(data))) => {
                emit(ChannelSignal::Malformed(String::from_utf8_lossy(&data).into_owned()));
            }
            Some(Ok(_)) => {}
        }
    }
}
