// SPDX-License-Identifier: MIT

//! Build argv for each `dw_wlm_cli --function <F>` invocation and
//! run it through a [`CommandRunner`], parsing `show_*` output via the
//! JSON adapter.

use crate::json::{self, Config, Instance, Pool, Session};
use crate::runner::{CommandOutput, CommandRunner};
use bb_core::BbError;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Thin wrapper that knows the external CLI's flag shapes but nothing
/// about job state — callers supply the timeout per call (the
/// per-function timeout table lives in `bb_core::config::Timeouts`).
pub struct DwWlmClient<R> {
    cli_path: PathBuf,
    runner: R,
}

impl<R: CommandRunner> DwWlmClient<R> {
    pub fn new(cli_path: PathBuf, runner: R) -> Self {
        Self { cli_path, runner }
    }

    async fn invoke(&self, function: &str, mut args: Vec<String>, timeout: Duration) -> CommandOutput {
        let mut argv = vec!["--function".to_string(), function.to_string()];
        argv.append(&mut args);
        self.runner.run(&self.cli_path, &argv, timeout).await
    }

    pub async fn job_process(&self, script: &Path, timeout: Duration) -> CommandOutput {
        self.invoke("job_process", vec!["--job".to_string(), path_str(script)], timeout).await
    }

    pub async fn paths(&self, script: &Path, token: &str, pathfile: &Path, timeout: Duration) -> CommandOutput {
        self.invoke(
            "paths",
            vec![
                "--job".to_string(),
                path_str(script),
                "--token".to_string(),
                token.to_string(),
                "--pathfile".to_string(),
                path_str(pathfile),
            ],
            timeout,
        )
        .await
    }

    pub async fn setup(
        &self,
        token: &str,
        uid: u32,
        capacity: &str,
        script: &Path,
        node_list: Option<&NodeList>,
        timeout: Duration,
    ) -> CommandOutput {
        let mut args = vec![
            "--token".to_string(),
            token.to_string(),
            "--caller".to_string(),
            "SLURM".to_string(),
            "--user".to_string(),
            uid.to_string(),
            "--capacity".to_string(),
            capacity.to_string(),
            "--job".to_string(),
            path_str(script),
        ];
        push_node_list(&mut args, node_list);
        self.invoke("setup", args, timeout).await
    }

    pub async fn data_in(&self, token: &str, script: &Path, timeout: Duration) -> CommandOutput {
        self.invoke(
            "data_in",
            vec!["--token".to_string(), token.to_string(), "--job".to_string(), path_str(script)],
            timeout,
        )
        .await
    }

    pub async fn pre_run(&self, token: &str, script: &Path, node_list: Option<&NodeList>, timeout: Duration) -> CommandOutput {
        let mut args = vec!["--token".to_string(), token.to_string(), "--job".to_string(), path_str(script)];
        push_node_list(&mut args, node_list);
        self.invoke("pre_run", args, timeout).await
    }

    pub async fn data_out(&self, token: &str, script: &Path, timeout: Duration) -> CommandOutput {
        self.invoke(
            "data_out",
            vec!["--token".to_string(), token.to_string(), "--job".to_string(), path_str(script)],
            timeout,
        )
        .await
    }

    pub async fn post_run(&self, token: &str, script: &Path, timeout: Duration) -> CommandOutput {
        self.invoke(
            "post_run",
            vec!["--token".to_string(), token.to_string(), "--job".to_string(), path_str(script)],
            timeout,
        )
        .await
    }

    pub async fn teardown(&self, token: &str, script: &Path, hurry: bool, timeout: Duration) -> CommandOutput {
        let mut args = vec!["--token".to_string(), token.to_string(), "--job".to_string(), path_str(script)];
        if hurry {
            args.push("--hurry".to_string());
        }
        self.invoke("teardown", args, timeout).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create_persistent(
        &self,
        name: &str,
        uid: u32,
        pool_size: &str,
        access: Option<&str>,
        buffer_type: Option<&str>,
        timeout: Duration,
    ) -> CommandOutput {
        let mut args = vec![
            "-c".to_string(),
            "CLI".to_string(),
            "-t".to_string(),
            name.to_string(),
            "-u".to_string(),
            uid.to_string(),
            "-C".to_string(),
            pool_size.to_string(),
        ];
        if let Some(a) = access {
            args.push("-a".to_string());
            args.push(a.to_string());
        }
        if let Some(t) = buffer_type {
            args.push("-T".to_string());
            args.push(t.to_string());
        }
        self.invoke("create_persistent", args, timeout).await
    }

    pub async fn show_pools(&self, timeout: Duration) -> Result<Vec<Pool>, BbError> {
        let out = self.invoke("show_pools", vec![], timeout).await;
        json::parse_pools(&out.stdout)
    }

    pub async fn show_instances(&self, timeout: Duration) -> Result<Vec<Instance>, BbError> {
        let out = self.invoke("show_instances", vec![], timeout).await;
        json::parse_instances(&out.stdout)
    }

    pub async fn show_sessions(&self, timeout: Duration) -> Result<Vec<Session>, BbError> {
        let out = self.invoke("show_sessions", vec![], timeout).await;
        json::parse_sessions(&out.stdout)
    }

    pub async fn show_configurations(&self, timeout: Duration) -> Result<Vec<Config>, BbError> {
        let out = self.invoke("show_configurations", vec![], timeout).await;
        json::parse_configurations(&out.stdout)
    }
}

/// Either `--nidlistfile` or `--nodehostnamefile`, depending on build
/// flavor.
pub enum NodeList {
    NidListFile(PathBuf),
    NodeHostnameFile(PathBuf),
}

fn push_node_list(args: &mut Vec<String>, node_list: Option<&NodeList>) {
    match node_list {
        Some(NodeList::NidListFile(p)) => {
            args.push("--nidlistfile".to_string());
            args.push(path_str(p));
        }
        Some(NodeList::NodeHostnameFile(p)) => {
            args.push("--nodehostnamefile".to_string());
            args.push(path_str(p));
        }
        None => {}
    }
}

fn path_str(p: &Path) -> String {
    p.display().to_string()
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
