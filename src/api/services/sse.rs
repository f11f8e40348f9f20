//! Server-Sent Events 输出
//!
//! 订阅事件总线并按过滤条件推送；慢消费者丢失的事件只报告数量，不重放。

use std::time::Duration;

use actix_web::HttpResponse;
use actix_web::http::header::{CACHE_CONTROL, CONTENT_ENCODING};
use bytes::Bytes;
use futures_util::stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::api::constants::SSE_KEEPALIVE_SECS;
use crate::system::event::Event;

/// 一个 SSE 帧：`event: <name>\ndata: <json>\n\n`
pub fn format_event(event: &Event) -> Option<Bytes> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Bytes::from(format!(
            "event: {}\ndata: {}\n\n",
            event.name(),
            json
        ))),
        Err(e) => {
            warn!("Failed to serialize {} event: {}", event.name(), e);
            None
        }
    }
}

/// 把广播接收端转换为 SSE 响应
pub fn event_stream<F>(rx: broadcast::Receiver<Event>, filter: F) -> HttpResponse
where
    F: Fn(&Event) -> bool + 'static,
{
    let keepalive = Duration::from_secs(SSE_KEEPALIVE_SECS);

    let body = stream::unfold((rx, filter), move |(mut rx, filter)| async move {
        loop {
            let frame = match tokio::time::timeout(keepalive, rx.recv()).await {
                Ok(Ok(event)) => {
                    if !filter(&event) {
                        continue;
                    }
                    match format_event(&event) {
                        Some(frame) => frame,
                        None => continue,
                    }
                }
                Ok(Err(RecvError::Lagged(skipped))) => {
                    debug!("SSE subscriber lagged, {} events dropped", skipped);
                    Bytes::from(format!(": lagged {}\n\n", skipped))
                }
                Ok(Err(RecvError::Closed)) => return None,
                Err(_) => Bytes::from_static(b": keepalive\n\n"),
            };
            return Some((Ok::<_, actix_web::Error>(frame), (rx, filter)));
        }
    });

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header((CACHE_CONTROL, "no-cache"))
        // 阻止 Compress 中间件缓冲事件
        .insert_header((CONTENT_ENCODING, "identity"))
        .insert_header(("X-Accel-Buffering", "no"))
        .streaming(body)
}
