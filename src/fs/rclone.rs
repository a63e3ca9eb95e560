use std::collections::BTreeMap;
use std::pin::Pin;
use std::process::Stdio;
use std::task::{Context, Poll};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::process::{Child, ChildStdout, Command};

use crate::fs::error::{Error, ErrorKind};
use crate::fs::{Backend, ByteStream, Item};

/// Proxies a set of rclone remotes. Every operation is a one-shot `rclone`
/// invocation; reads expose the subprocess stdout as the byte stream.
pub struct RcloneBackend;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RcloneEntry {
    name: String,
    #[serde(default)]
    size: i64,
    #[serde(default)]
    mod_time: Option<String>,
    #[serde(default)]
    is_dir: bool,
}

impl RcloneBackend {
    pub fn new() -> RcloneBackend {
        RcloneBackend
    }

    async fn list_remotes(&self) -> Result<Item, Error> {
        let output = Command::new("rclone")
            .arg("listremotes")
            .output()
            .await
            .map_err(|err| Error::new(ErrorKind::Internal)
                .message(format!("failed to run rclone: {err}")))?;

        if !output.status.success() {
            return Err(Error::new(ErrorKind::Internal)
                .message("rclone listremotes failed"));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut children = BTreeMap::new();

        for line in stdout.lines() {
            // each line is a remote name with a trailing colon
            let Some(name) = line.strip_suffix(':') else {
                continue;
            };

            if name.is_empty() {
                continue;
            }

            children.insert(format!("{name}/"), Item::default());
        }

        Ok(Item {
            children: Some(children),
            ..Default::default()
        })
    }

    async fn rclone_ls(&self, req_path: &str) -> Result<Vec<RcloneEntry>, Error> {
        let output = Command::new("rclone")
            .arg("lsjson")
            .arg(rclone_path(req_path)?)
            .output()
            .await
            .map_err(|err| Error::new(ErrorKind::Internal)
                .message(format!("failed to run rclone: {err}")))?;

        if !output.status.success() {
            return Err(Error::new(ErrorKind::NotFound).message("Not found"));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|err| Error::new(ErrorKind::Internal).message(err.to_string()))
    }
}

#[async_trait]
impl Backend for RcloneBackend {
    async fn list(&self, req_path: &str, _depth: u32) -> Result<Item, Error> {
        if req_path == "/" {
            return self.list_remotes().await;
        }

        let entries = self.rclone_ls(req_path).await?;
        let mut children = BTreeMap::new();

        for entry in entries {
            let child = Item {
                size: entry.size.max(0) as u64,
                mod_time: entry.mod_time,
                ..Default::default()
            };

            if entry.is_dir {
                children.insert(format!("{}/", entry.name), child);
            } else {
                children.insert(entry.name, child);
            }
        }

        Ok(Item {
            children: Some(children),
            ..Default::default()
        })
    }

    async fn read(&self, req_path: &str, offset: u64, length: u64)
        -> Result<(Item, ByteStream), Error>
    {
        let entries = self.rclone_ls(req_path).await?;

        let Some(entry) = entries.first() else {
            return Err(Error::new(ErrorKind::NotFound).message("Not found"));
        };

        let item = Item {
            size: entry.size.max(0) as u64,
            mod_time: entry.mod_time.clone(),
            ..Default::default()
        };

        let mut cmd = Command::new("rclone");
        cmd.arg("cat");

        if offset != 0 {
            cmd.arg("--offset").arg(offset.to_string());
        }

        if length != 0 {
            cmd.arg("--count").arg(length.to_string());
        }

        let mut child = cmd
            .arg(rclone_path(req_path)?)
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| Error::new(ErrorKind::Internal)
                .message(format!("failed to run rclone: {err}")))?;

        let Some(stdout) = child.stdout.take() else {
            return Err(Error::new(ErrorKind::Internal)
                .message("rclone stdout was not captured"));
        };

        Ok((item, Box::new(ChildStream {
            _child: child,
            stdout,
        })))
    }
}

/// Keeps the subprocess alive for as long as its stdout is being consumed.
/// Dropping the stream kills the child.
struct ChildStream {
    _child: Child,
    stdout: ChildStdout,
}

impl AsyncRead for ChildStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stdout).poll_read(cx, buf)
    }
}

/// `/remote/sub/path` becomes `remote:sub/path`.
fn rclone_path(req_path: &str) -> Result<String, Error> {
    let trimmed = req_path.strip_prefix('/').unwrap_or(req_path);

    let Some((remote, sub)) = trimmed.split_once('/') else {
        if trimmed.is_empty() {
            return Err(Error::new(ErrorKind::InvalidPath).message("Invalid path"));
        }

        return Ok(format!("{trimmed}:"));
    };

    if remote.is_empty() {
        return Err(Error::new(ErrorKind::InvalidPath).message("Invalid path"));
    }

    Ok(format!("{remote}:{sub}"))
}
