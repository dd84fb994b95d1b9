use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{Level, Span};

use crate::error::AppError;

/// Installs the process-wide fmt subscriber. Calling it again is a no-op.
pub fn init_logging(level: Level) -> Result<(), AppError> {
    match tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init()
    {
        Ok(()) => Ok(()),
        // A subscriber is already installed, either by us or by a test harness.
        Err(e) if tracing::dispatcher::has_been_set() => {
            tracing::debug!("Logging already initialized: {}", e);
            Ok(())
        }
        Err(e) => Err(AppError::Logging(e.to_string())),
    }
}

/// A named logger for one component.
///
/// Events emitted with `parent: logger.span()` or futures instrumented with
/// the span carry the component name.
#[derive(Debug)]
pub struct ComponentLogger {
    name: String,
    span: Span,
}

impl ComponentLogger {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            span: tracing::info_span!("component", name = %name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

/// Hands out one [`ComponentLogger`] per name, creating it on first use.
#[derive(Debug, Clone, Default)]
pub struct LoggerFactory {
    loggers: Arc<Mutex<HashMap<String, Arc<ComponentLogger>>>>,
}

impl LoggerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logger(&self, name: &str) -> Arc<ComponentLogger> {
        let mut loggers = self
            .loggers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            loggers
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(ComponentLogger::new(name))),
        )
    }

    pub fn len(&self) -> usize {
        self.loggers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
