use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use joinwatch_types::OcrCandidate;
use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::engine::OcrEngine;
use crate::error::{AdapterError, PoolError};

type Idle = Arc<Mutex<Vec<Arc<dyn OcrEngine>>>>;

/// Fixed set of engine handles; one permit per idle handle
pub struct EnginePool {
    idle: Idle,
    permits: Arc<Semaphore>,
    size: usize,
}

impl EnginePool {
    pub fn new(engines: Vec<Arc<dyn OcrEngine>>) -> Result<Self, PoolError> {
        if engines.is_empty() {
            return Err(PoolError::Empty);
        }

        let size = engines.len();
        Ok(Self {
            idle: Arc::new(Mutex::new(engines)),
            permits: Arc::new(Semaphore::new(size)),
            size,
        })
    }

    /// Waits at most `wait` for a free engine
    pub async fn lease(&self, wait: Duration) -> Result<EngineLease, PoolError> {
        let permit = match tokio::time::timeout(wait, self.permits.clone().acquire_owned()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(PoolError::Closed),
            Err(_) => return Err(PoolError::Saturated(wait)),
        };

        let engine = self.idle.lock().pop().ok_or(PoolError::Empty)?;

        Ok(EngineLease {
            engine,
            idle: self.idle.clone(),
            _permit: permit,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Pending and future leases fail with `PoolError::Closed`
    pub fn close(&self) {
        self.permits.close();
    }
}

/// Exclusive use of one engine; the engine returns to the pool on drop
pub struct EngineLease {
    engine: Arc<dyn OcrEngine>,
    idle: Idle,
    _permit: OwnedSemaphorePermit,
}

impl EngineLease {
    pub fn name(&self) -> &str {
        self.engine.name()
    }

    pub fn recognize(&self, image: &RgbaImage) -> Result<Vec<OcrCandidate>, AdapterError> {
        self.engine.recognize(image)
    }
}

impl Drop for EngineLease {
    fn drop(&mut self) {
        // Engine goes back before the permit is released
        self.idle.lock().push(self.engine.clone());
    }
}
