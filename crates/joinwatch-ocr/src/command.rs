use std::io::{ErrorKind, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use joinwatch_types::OcrCandidate;
use serde::Deserialize;

use crate::engine::OcrEngine;
use crate::error::AdapterError;

const DEFAULT_DEADLINE: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Recognizer output: either a bare list or `{"candidates": [...]}`
#[derive(Deserialize)]
#[serde(untagged)]
enum CommandOutput {
    List(Vec<OcrCandidate>),
    Wrapped { candidates: Vec<OcrCandidate> },
}

/// Runs an external recognizer per call: PNG on stdin, JSON candidates on stdout.
///
/// A recognizer still running at the deadline is killed and reaped, so the
/// engine lease holding it is released.
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
    name: String,
    deadline: Duration,
}

impl CommandEngine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        let program = program.into();
        Self {
            name: format!("command:{program}"),
            program,
            args,
            deadline: DEFAULT_DEADLINE,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }
}

impl OcrEngine for CommandEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn recognize(&self, image: &RgbaImage) -> Result<Vec<OcrCandidate>, AdapterError> {
        let png = encode_png(image)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Pipes are fed and drained on their own threads so a recognizer that
        // stops reading or writing cannot block the deadline check.
        let stdin = child.stdin.take();
        let writer = thread::spawn(move || match stdin {
            Some(mut stdin) => stdin.write_all(&png),
            None => Ok(()),
        });
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match wait_until(&mut child, Instant::now() + self.deadline) {
            Ok(Some(status)) => status,
            Ok(None) => {
                reap(&mut child);
                tracing::warn!("[OCR] {} killed after {:?}", self.name, self.deadline);
                return Err(AdapterError::Deadline(self.deadline));
            }
            Err(e) => {
                reap(&mut child);
                return Err(e.into());
            }
        };

        match writer.join() {
            Ok(Err(e)) if e.kind() != ErrorKind::BrokenPipe => return Err(e.into()),
            Ok(_) => {}
            Err(_) => return Err(AdapterError::Engine("stdin writer panicked".to_string())),
        }
        let stdout = collect(stdout);
        let stderr = collect(stderr);

        if !status.success() {
            return Err(AdapterError::Process {
                status: status.to_string(),
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }

        parse_output(&stdout)
    }
}

/// `None` once the deadline passes with the child still running
fn wait_until(child: &mut Child, deadline: Instant) -> std::io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        tracing::debug!("[OCR] kill failed: {e}");
    }
    if let Err(e) = child.wait() {
        tracing::debug!("[OCR] wait failed: {e}");
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe
            && let Err(e) = pipe.read_to_end(&mut buffer)
        {
            tracing::debug!("[OCR] recognizer pipe read failed: {e}");
        }
        buffer
    })
}

fn collect(handle: JoinHandle<Vec<u8>>) -> Vec<u8> {
    handle.join().unwrap_or_default()
}

fn parse_output(stdout: &[u8]) -> Result<Vec<OcrCandidate>, AdapterError> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Ok(vec![]);
    }

    let candidates = match serde_json::from_slice(stdout)? {
        CommandOutput::List(candidates) => candidates,
        CommandOutput::Wrapped { candidates } => candidates,
    };

    Ok(candidates
        .into_iter()
        .map(|mut c| {
            c.confidence = c.confidence.clamp(0.0, 1.0);
            c
        })
        .collect())
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, AdapterError> {
    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(buffer)
}
