use std::time::Duration;

use anyhow::{Context, bail};
use joinwatch_types::{Point, RegionId};
use tokio::process::Command;

use super::{Automation, render_template};

/// Spawns a configured program per trigger
pub struct CommandAutomation {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandAutomation {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl Automation for CommandAutomation {
    fn name(&self) -> &str {
        "command"
    }

    async fn perform_action(
        &self,
        region: &RegionId,
        anchor: Point,
        text: &str,
    ) -> anyhow::Result<()> {
        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| render_template(arg, region, anchor, text))
            .collect();

        let mut child = Command::new(&self.program)
            .args(&args)
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn '{}'", self.program))?;

        let status = tokio::time::timeout(self.timeout, child.wait())
            .await
            .with_context(|| format!("'{}' did not finish within {:?}", self.program, self.timeout))?
            .with_context(|| format!("Failed to wait for '{}'", self.program))?;

        if !status.success() {
            bail!("'{}' exited with {status}", self.program);
        }

        tracing::debug!("[ACTION] '{}' done for {region}", self.program);
        Ok(())
    }
}
