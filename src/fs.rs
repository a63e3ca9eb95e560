use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

pub mod error;
pub mod local;
pub mod multi;
pub mod rclone;

use self::error::Error;

/// A node in the unified namespace. Child names carry a trailing `/` when
/// the child is a directory; a file item never has `children`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub size: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mod_time: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_executable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<BTreeMap<String, Item>>,
}

fn is_zero(given: &u64) -> bool {
    *given == 0
}

fn is_false(given: &bool) -> bool {
    !*given
}

pub type ByteStream = Box<dyn AsyncRead + Send + Unpin>;

/// Largest list depth a backend will expand. A requested depth of 0 means
/// "unlimited" and is clamped to this.
pub const MAX_LIST_DEPTH: u32 = 10;

#[async_trait]
pub trait Backend: Send + Sync {
    /// `depth == 1` populates immediate children only; `depth == 0` expands
    /// to [`MAX_LIST_DEPTH`].
    async fn list(&self, req_path: &str, depth: u32) -> Result<Item, Error>;

    /// Streams `length` bytes starting at `offset`, or through the end of
    /// the object when `length == 0`. The caller owns the stream; dropping
    /// it releases the file or subprocess behind it.
    async fn read(&self, req_path: &str, offset: u64, length: u64)
        -> Result<(Item, ByteStream), Error>;

    fn writer(&self) -> Option<&dyn WriteBackend> {
        None
    }

    fn images(&self) -> Option<&dyn ImageBackend> {
        None
    }
}

#[async_trait]
pub trait WriteBackend: Send + Sync {
    async fn make_dir(&self, req_path: &str, recursive: bool) -> Result<(), Error>;

    /// Copies `data` into the object at `offset`. Errors when the number of
    /// copied bytes differs from `length`.
    async fn write(
        &self,
        req_path: &str,
        data: ByteStream,
        offset: u64,
        length: u64,
        overwrite: bool,
        truncate: bool,
    ) -> Result<(), Error>;

    async fn set_attributes(
        &self,
        req_path: &str,
        mod_time: Option<DateTime<Utc>>,
        is_executable: Option<bool>,
    ) -> Result<(), Error>;

    async fn delete(&self, req_path: &str, recursive: bool) -> Result<(), Error>;
}

#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// Returns a resized rendition of the image at `req_path` whose larger
    /// dimension equals `size`, along with its byte length.
    async fn get_image(&self, req_path: &str, size: u32) -> Result<(ByteStream, u64), Error>;
}
