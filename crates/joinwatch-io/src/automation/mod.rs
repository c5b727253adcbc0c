use joinwatch_types::{Point, RegionId};

mod command;
mod webhook;

pub use command::CommandAutomation;
pub use webhook::WebhookAutomation;

/// Receives one handoff per confirmed trigger
#[async_trait::async_trait]
pub trait Automation: Send + Sync {
    fn name(&self) -> &str;

    async fn perform_action(&self, region: &RegionId, anchor: Point, text: &str)
    -> anyhow::Result<()>;
}

/// Only logs detections
pub struct LogAutomation;

#[async_trait::async_trait]
impl Automation for LogAutomation {
    fn name(&self) -> &str {
        "log"
    }

    async fn perform_action(
        &self,
        region: &RegionId,
        anchor: Point,
        text: &str,
    ) -> anyhow::Result<()> {
        tracing::info!(
            "[ACTION] {region} detected '{text}' at ({}, {})",
            anchor.x,
            anchor.y
        );
        Ok(())
    }
}

/// Fills `{region}`, `{x}`, `{y}` and `{text}` placeholders
pub(crate) fn render_template(template: &str, region: &RegionId, anchor: Point, text: &str) -> String {
    template
        .replace("{region}", region.as_str())
        .replace("{x}", &anchor.x.to_string())
        .replace("{y}", &anchor.y.to_string())
        .replace("{text}", text)
}
