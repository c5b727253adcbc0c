use std::sync::Arc;

use joinwatch_io::Automation;
use joinwatch_types::WatchEvent;
use kanal::{AsyncReceiver, AsyncSender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::events::event_loop;
use crate::maintenance::maintenance_loop;
use crate::scheduler::CaptureScheduler;
use crate::state::AppState;

/// Centralized channel management
pub struct ChannelSet {
    /// Scheduler to automation handoff
    pub watch: (AsyncSender<WatchEvent>, AsyncReceiver<WatchEvent>),
}

impl ChannelSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            watch: kanal::bounded_async(capacity.max(1)),
        }
    }
}

/// Application controller for task spawning and lifecycle
pub struct AppController {
    channels: ChannelSet,
    state: Arc<AppState>,
    scheduler: Arc<CaptureScheduler>,
    cancel_token: CancellationToken,
}

impl AppController {
    pub fn new(state: Arc<AppState>) -> Self {
        let channels = ChannelSet::new(state.config.automation.channel_capacity);
        let scheduler = Arc::new(CaptureScheduler::new(state.clone(), channels.watch.0.clone()));

        Self {
            channels,
            state,
            scheduler,
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn scheduler(&self) -> &Arc<CaptureScheduler> {
        &self.scheduler
    }

    pub fn sender(&self) -> AsyncSender<WatchEvent> {
        self.channels.watch.0.clone()
    }

    pub fn receiver(&self) -> AsyncReceiver<WatchEvent> {
        self.channels.watch.1.clone()
    }

    pub fn spawn_tasks(&self, automation: Arc<dyn Automation>) -> JoinSet<anyhow::Result<()>> {
        let mut tasks = JoinSet::new();

        // Scan cycles
        tasks.spawn(
            self.scheduler
                .clone()
                .run(self.cancel_token.child_token()),
        );

        // Trigger handoff
        tasks.spawn(event_loop(
            self.channels.watch.1.clone(),
            automation,
            self.cancel_token.child_token(),
        ));

        // Cache sweep, throttle cleanup, telemetry
        tasks.spawn(maintenance_loop(
            self.state.clone(),
            self.cancel_token.child_token(),
        ));

        tasks
    }

    pub fn shutdown(&self) {
        self.cancel_token.cancel();
        self.state.pool.close();
    }
}
