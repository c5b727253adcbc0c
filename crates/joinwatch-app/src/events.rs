use std::sync::Arc;

use joinwatch_io::Automation;
use joinwatch_types::WatchEvent;
use kanal::AsyncReceiver;
use tokio_util::sync::CancellationToken;

/// Drains watch events and hands triggers to the automation sink.
///
/// Actions run one at a time in arrival order. A failed action is logged and
/// never stops the loop.
pub async fn event_loop(
    rx: AsyncReceiver<WatchEvent>,
    automation: Arc<dyn Automation>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    tracing::info!("[EVENT_LOOP] dispatching triggers to '{}'", automation.name());

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = rx.recv() => match event {
                Ok(event) => event,
                Err(_) => {
                    tracing::debug!("[EVENT_LOOP] channel closed");
                    break;
                }
            },
        };

        handle_event(automation.as_ref(), event).await;
    }

    tracing::info!("[EVENT_LOOP] stopping");
    Ok(())
}

pub async fn handle_event(automation: &dyn Automation, event: WatchEvent) {
    match event {
        WatchEvent::Triggered {
            region_id,
            anchor,
            text,
            phrase,
        } => {
            tracing::debug!("[EVENT_LOOP] {region_id} matched '{phrase}'");
            if let Err(e) = automation.perform_action(&region_id, anchor, &text).await {
                tracing::error!("[ACTION] {} failed for {region_id}: {e:#}", automation.name());
            }
        }
        WatchEvent::LayoutRebuilt { regions } => {
            tracing::info!("[EVENT_LOOP] layout rebuilt with {regions} regions");
        }
    }
}
