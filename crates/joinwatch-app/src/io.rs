//! Builds the concrete adapters named by the config

use std::sync::Arc;
use std::time::Duration;

use joinwatch_config::automation::{AutomationConfig, AutomationSink};
use joinwatch_config::capture::{self, CaptureConfig};
use joinwatch_config::ocr::OcrConfig;
use joinwatch_io::{
    Automation, CaptureSource, CommandAutomation, FileCapture, LogAutomation, WebhookAutomation,
};
use joinwatch_ocr::{CommandEngine, OcrEngine};

pub fn build_capture(config: &CaptureConfig) -> anyhow::Result<Arc<dyn CaptureSource>> {
    match config.source {
        capture::CaptureSource::Files => {
            tracing::info!("Capturing from {} image file(s)", config.files.len());
            Ok(Arc::new(FileCapture::new(config.files.iter())))
        }
        #[cfg(feature = "screen")]
        capture::CaptureSource::Screen => Ok(Arc::new(joinwatch_io::ScreenCapture::new())),
        #[cfg(not(feature = "screen"))]
        capture::CaptureSource::Screen => {
            anyhow::bail!("screen capture needs the `screen` feature, or set capture.source to \"files\"")
        }
    }
}

/// One engine per OCR worker. Each recognizer process is killed once the
/// OCR timeout has passed.
pub fn build_engines(config: &OcrConfig) -> anyhow::Result<Vec<Arc<dyn OcrEngine>>> {
    let Some(program) = config.command.as_deref() else {
        anyhow::bail!("no OCR engine configured, set ocr.command");
    };
    let deadline = Duration::from_millis(config.timeout_ms);

    tracing::info!("Starting {} OCR worker(s) running '{program}'", config.workers);
    Ok((0..config.workers)
        .map(|_| {
            let engine = CommandEngine::new(program, config.args.clone()).with_deadline(deadline);
            Arc::new(engine) as Arc<dyn OcrEngine>
        })
        .collect())
}

pub fn build_automation(config: &AutomationConfig) -> anyhow::Result<Arc<dyn Automation>> {
    let timeout = Duration::from_millis(config.timeout_ms);

    let automation: Arc<dyn Automation> = match config.sink {
        AutomationSink::Log => Arc::new(LogAutomation),
        AutomationSink::Command => {
            let Some(program) = config.command.as_deref() else {
                anyhow::bail!("automation.command is required by the command sink");
            };
            Arc::new(CommandAutomation::new(program, config.args.clone(), timeout))
        }
        AutomationSink::Webhook => {
            let Some(url) = config.url.clone() else {
                anyhow::bail!("automation.url is required by the webhook sink");
            };
            Arc::new(WebhookAutomation::new(url, timeout)?)
        }
    };

    Ok(automation)
}
