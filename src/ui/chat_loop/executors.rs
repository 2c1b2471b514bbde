//! Background tasks started by the event loop. Each reports back with a
//! single [`AppEvent`] on the loop's channel.

use tokio::sync::mpsc;
use tracing::debug;

use crate::api::models::fetch_models;
use crate::core::chat_stream::ChatStreamService;
use crate::core::session::StreamRequest;

use super::event_loop::AppEvent;

pub fn spawn_model_loader(
    client: reqwest::Client,
    base_url: String,
    startup: bool,
    events: mpsc::UnboundedSender<AppEvent>,
) {
    tokio::spawn(async move {
        let result = fetch_models(&client, &base_url).await;
        debug!(ok = result.is_ok(), startup, "Model list request finished");
        let _ = events.send(AppEvent::ModelsLoaded { result, startup });
    });
}

pub fn spawn_stream_open(
    service: ChatStreamService,
    request: StreamRequest,
    events: mpsc::UnboundedSender<AppEvent>,
) {
    tokio::spawn(async move {
        let StreamRequest {
            generation,
            request,
            cancel_token,
        } = request;
        let result = service.open(request, cancel_token).await;
        let _ = events.send(AppEvent::StreamOpened { generation, result });
    });
}
