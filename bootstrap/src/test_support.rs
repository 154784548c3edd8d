//! Test-only helpers: scripted command runners and checkout scaffolding.

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;

use crate::core::types::{CommandSpec, StageId};
use crate::io::runner::{CommandRunner, RunOutcome, RunRequest};

/// A recorded invocation: which stage asked for which command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub stage: StageId,
    pub line: String,
}

/// Scripted runner that records every command and never spawns anything.
///
/// `fail_matching` makes the first command whose rendered line contains the
/// substring report a non-zero exit; everything else passes.
pub struct FakeRunner {
    fail_matching: Option<String>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeRunner {
    pub fn all_pass() -> Self {
        Self {
            fail_matching: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_matching(substring: impl Into<String>) -> Self {
        Self {
            fail_matching: Some(substring.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    /// Rendered command lines, in execution order.
    pub fn lines(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.line).collect()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, spec: &CommandSpec, request: &RunRequest) -> Result<RunOutcome> {
        let line = spec.render();
        self.calls.lock().expect("calls lock").push(RecordedCall {
            stage: request.stage,
            line: line.clone(),
        });
        let failed = self
            .fail_matching
            .as_deref()
            .is_some_and(|needle| line.contains(needle));
        Ok(RunOutcome {
            success: !failed,
            exit_code: Some(if failed { 1 } else { 0 }),
            timed_out: false,
        })
    }
}

const SERVER_MANIFEST: &str = "\
fastapi==0.110.0
uvicorn[standard]>=0.27
websockets
";

const CLIENT_MANIFEST: &str = r#"{
  "name": "client",
  "version": "0.1.0",
  "scripts": {
    "build": "vite build",
    "dev": "vite"
  },
  "dependencies": {
    "react": "^18.2.0"
  }
}
"#;

/// Lay out a minimal valid checkout under `root`: server manifest and source
/// stub, client manifest. No artifact set.
pub fn scaffold_checkout(root: &Path) -> Result<()> {
    fs::create_dir_all(root.join("server"))?;
    fs::write(root.join("server/requirements.txt"), SERVER_MANIFEST)?;
    fs::write(root.join("server/server.py"), "# entry point\n")?;
    fs::create_dir_all(root.join("client/src"))?;
    fs::write(root.join("client/package.json"), CLIENT_MANIFEST)?;
    fs::write(root.join("client/src/main.tsx"), "// client entry\n")?;
    Ok(())
}

/// Create a non-empty artifact set, as the client build stage would.
pub fn write_artifacts(root: &Path) -> Result<()> {
    let dist = root.join("client/dist");
    fs::create_dir_all(dist.join("assets"))?;
    fs::write(dist.join("index.html"), "<!doctype html>\n")?;
    fs::write(dist.join("assets/app.js"), "console.log('ok');\n")?;
    Ok(())
}
