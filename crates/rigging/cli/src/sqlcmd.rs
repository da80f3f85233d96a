//! Script runner backed by `sqlcmd`
//!
//! The script is always handed over with `-i <file>`; standard input is closed.

use async_trait::async_trait;
use rigging_orchestrator::{Result, ScriptInvocation, ScriptRunner};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

pub struct SqlcmdRunner {
    program: String,
}

impl SqlcmdRunner {
    pub fn new() -> Self {
        Self {
            program: "sqlcmd".to_string(),
        }
    }
}

impl Default for SqlcmdRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Arguments for one invocation
pub fn sqlcmd_args(invocation: &ScriptInvocation) -> Vec<String> {
    vec![
        "-S".to_string(),
        invocation.server.clone(),
        "-d".to_string(),
        invocation.database.clone(),
        "--authentication-method".to_string(),
        invocation.auth.as_tool_value().to_string(),
        "-b".to_string(),
        "-i".to_string(),
        invocation.script_path.to_string_lossy().into_owned(),
    ]
}

#[async_trait]
impl ScriptRunner for SqlcmdRunner {
    async fn run(&self, invocation: &ScriptInvocation) -> Result<i32> {
        debug!(server = %invocation.server, database = %invocation.database, "Invoking sqlcmd");
        let output = Command::new(&self.program)
            .args(sqlcmd_args(invocation))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        let code = output.status.code().unwrap_or(-1);
        if code != 0 {
            warn!(
                exit_code = code,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                stdout = %String::from_utf8_lossy(&output.stdout).trim(),
                "sqlcmd reported errors"
            );
        }
        Ok(code)
    }

    fn name(&self) -> &str {
        "sqlcmd"
    }
}
