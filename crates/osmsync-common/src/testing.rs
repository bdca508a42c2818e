//! Test doubles for the external tool seam

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::process::{ToolInvocation, ToolOutput, ToolRunner};

type Handler = Arc<dyn Fn(&ToolInvocation) -> ToolOutput + Send + Sync>;

/// Records every invocation and answers from per-program handlers.
///
/// Programs without a handler succeed with empty output.
#[derive(Clone, Default)]
pub struct ScriptedRunner {
    handlers: Arc<Mutex<HashMap<String, Handler>>>,
    calls: Arc<Mutex<Vec<ToolInvocation>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call to `program` with `handler`
    pub fn on<F>(&self, program: &str, handler: F) -> &Self
    where
        F: Fn(&ToolInvocation) -> ToolOutput + Send + Sync + 'static,
    {
        self.handlers
            .lock()
            .unwrap()
            .insert(program.to_string(), Arc::new(handler));
        self
    }

    /// Make every call to `program` exit with `code`
    pub fn fail(&self, program: &str, code: i32) -> &Self {
        self.on(program, move |_| {
            ToolOutput::failed(code, "scripted failure")
        })
    }

    pub fn calls(&self) -> Vec<ToolInvocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, program: &str) -> Vec<ToolInvocation> {
        self.calls()
            .into_iter()
            .filter(|c| c.program() == program)
            .collect()
    }
}

#[async_trait]
impl ToolRunner for ScriptedRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput> {
        self.calls.lock().unwrap().push(invocation.clone());
        let handler = self.handlers.lock().unwrap().get(invocation.program()).cloned();
        Ok(match handler {
            Some(handler) => handler(invocation),
            None => ToolOutput::ok(""),
        })
    }
}
