//! Shared test utilities for tspack-bundler tests
//!
//! Provides a stub bundling engine and a stub version registry so session
//! and watch behaviour can be tested without Rolldown or the network.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tspack_bundler::{
    BundlingEngine, CompileInput, EngineError, ExternalLookupError, Externals, RenderRequest,
    RenderedChunk, VersionRegistry,
};

/// Create a project directory with `src/index.ts`.
pub fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "src/index.ts", "export const answer: number = 42;\n");
    dir
}

pub fn write_file(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

/// Maps chunk lines 1 and 2 to the first two lines of `src/index.ts`.
pub const STUB_MAP: &str = r#"{"version":3,"names":[],"sources":["../src/index.ts"],"sourcesContent":["export const answer: number = 42;\n"],"mappings":"AAAA;AACA"}"#;

#[derive(Default)]
struct EngineState {
    compiles: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    last_externals: Mutex<Option<Externals>>,
}

/// Engine returning a canned chunk.
#[derive(Clone)]
pub struct StubEngine {
    chunk: RenderedChunk,
    fail_with: Option<String>,
    delay: Duration,
    state: Arc<EngineState>,
}

impl StubEngine {
    pub fn new(code: &str) -> Self {
        Self {
            chunk: RenderedChunk {
                code: code.to_string(),
                imports: Vec::new(),
                map: Some(STUB_MAP.into()),
            },
            fail_with: None,
            delay: Duration::ZERO,
            state: Arc::default(),
        }
    }

    pub fn with_imports(mut self, imports: &[&str]) -> Self {
        self.chunk.imports = imports.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn without_map(mut self) -> Self {
        self.chunk.map = None;
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.fail_with = Some(message.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn compiles(&self) -> usize {
        self.state.compiles.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn last_externals(&self) -> Option<Externals> {
        self.state.last_externals.lock().clone()
    }
}

#[async_trait]
impl BundlingEngine for StubEngine {
    type Graph = ();

    async fn compile(&self, input: CompileInput) -> Result<(), EngineError> {
        self.state.compiles.fetch_add(1, Ordering::SeqCst);
        let now = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_in_flight.fetch_max(now, Ordering::SeqCst);
        *self.state.last_externals.lock() = Some(input.externals);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if let Some(message) = &self.fail_with {
            self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
            return Err(EngineError::Compile {
                message: message.clone(),
                cause: Some(format!("stub: {message}")),
            });
        }
        Ok(())
    }

    async fn render(&self, _graph: (), _request: RenderRequest) -> Result<RenderedChunk, EngineError> {
        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(self.chunk.clone())
    }
}

/// Registry with fixed answers that records every lookup.
#[derive(Clone, Default)]
pub struct StubRegistry {
    versions: HashMap<String, String>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl StubRegistry {
    pub fn with(mut self, package: &str, version: &str) -> Self {
        self.versions.insert(package.to_string(), version.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl VersionRegistry for StubRegistry {
    async fn resolve_version(&self, package: &str) -> Result<String, ExternalLookupError> {
        self.calls.lock().push(package.to_string());
        self.versions
            .get(package)
            .cloned()
            .ok_or_else(|| ExternalLookupError::NotFound(package.to_string()))
    }
}
