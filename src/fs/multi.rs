use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::fs::error::{Error, ErrorKind};
use crate::fs::{Backend, ByteStream, ImageBackend, Item, WriteBackend};
use crate::time::format_mod_time;

/// Multiplexes named backends under one namespace. The first path segment
/// selects the backend, the rest is handed down unchanged.
pub struct MultiBackend {
    backends: Mutex<HashMap<String, Arc<dyn Backend>>>,
}

impl MultiBackend {
    pub fn new() -> MultiBackend {
        MultiBackend {
            backends: Mutex::new(HashMap::new()),
        }
    }

    pub fn add_backend<N>(&self, name: N, backend: Arc<dyn Backend>)
    where
        N: Into<String>
    {
        let mut backends = self.backends.lock().unwrap();

        backends.insert(name.into(), backend);
    }

    pub fn remove_backend(&self, name: &str) {
        let mut backends = self.backends.lock().unwrap();

        backends.remove(name);
    }

    /// Snapshot of the registry so callers never hold the lock across io.
    fn snapshot(&self) -> HashMap<String, Arc<dyn Backend>> {
        self.backends.lock().unwrap().clone()
    }

    fn select(&self, req_path: &str) -> Result<(Arc<dyn Backend>, String), Error> {
        let (name, sub_path) = parse_path(req_path)?;

        let backends = self.backends.lock().unwrap();

        match backends.get(&name) {
            Some(backend) => Ok((Arc::clone(backend), sub_path)),
            None => Err(Error::new(ErrorKind::NotFound).message("Not found"))
        }
    }
}

pub fn parse_path(req_path: &str) -> Result<(String, String), Error> {
    let mut parts = req_path.split('/');

    match parts.next() {
        Some("") => {}
        _ => return Err(Error::new(ErrorKind::NotFound).message("Not found"))
    }

    let Some(name) = parts.next() else {
        return Err(Error::new(ErrorKind::NotFound).message("Not found"));
    };

    let rest: Vec<&str> = parts.collect();

    if name.is_empty() || rest.is_empty() {
        return Err(Error::new(ErrorKind::NotFound).message("Not found"));
    }

    Ok((name.to_owned(), format!("/{}", rest.join("/"))))
}

#[async_trait]
impl Backend for MultiBackend {
    async fn list(&self, req_path: &str, depth: u32) -> Result<Item, Error> {
        if req_path == "/" {
            let now = format_mod_time(std::time::SystemTime::now());
            let mut children = BTreeMap::new();

            if depth == 1 {
                for name in self.snapshot().into_keys() {
                    children.insert(format!("{name}/"), Item {
                        size: 4096,
                        mod_time: Some(now.clone()),
                        ..Default::default()
                    });
                }
            } else {
                let child_depth = if depth > 1 {
                    depth - 1
                } else {
                    depth
                };

                for (name, backend) in self.snapshot() {
                    let child = backend.list("/", child_depth).await?;

                    children.insert(format!("{name}/"), child);
                }
            }

            return Ok(Item {
                size: 4096,
                mod_time: Some(now),
                children: Some(children),
                ..Default::default()
            });
        }

        let (backend, sub_path) = self.select(req_path)?;

        backend.list(&sub_path, depth).await
    }

    async fn read(&self, req_path: &str, offset: u64, length: u64)
        -> Result<(Item, ByteStream), Error>
    {
        let (backend, sub_path) = self.select(req_path)?;

        backend.read(&sub_path, offset, length).await
    }

    fn writer(&self) -> Option<&dyn WriteBackend> {
        Some(self)
    }

    fn images(&self) -> Option<&dyn ImageBackend> {
        Some(self)
    }
}

#[async_trait]
impl WriteBackend for MultiBackend {
    async fn make_dir(&self, req_path: &str, recursive: bool) -> Result<(), Error> {
        let (backend, sub_path) = self.select(req_path)?;

        writer_of(&*backend)?.make_dir(&sub_path, recursive).await
    }

    async fn write(
        &self,
        req_path: &str,
        data: ByteStream,
        offset: u64,
        length: u64,
        overwrite: bool,
        truncate: bool,
    ) -> Result<(), Error> {
        let (backend, sub_path) = self.select(req_path)?;

        writer_of(&*backend)?
            .write(&sub_path, data, offset, length, overwrite, truncate)
            .await
    }

    async fn set_attributes(
        &self,
        req_path: &str,
        mod_time: Option<DateTime<Utc>>,
        is_executable: Option<bool>,
    ) -> Result<(), Error> {
        let (backend, sub_path) = self.select(req_path)?;

        writer_of(&*backend)?
            .set_attributes(&sub_path, mod_time, is_executable)
            .await
    }

    async fn delete(&self, req_path: &str, recursive: bool) -> Result<(), Error> {
        let (backend, sub_path) = self.select(req_path)?;

        writer_of(&*backend)?.delete(&sub_path, recursive).await
    }
}

#[async_trait]
impl ImageBackend for MultiBackend {
    async fn get_image(&self, req_path: &str, size: u32) -> Result<(ByteStream, u64), Error> {
        let (backend, sub_path) = self.select(req_path)?;

        let Some(images) = backend.images() else {
            return Err(Error::new(ErrorKind::Unsupported)
                .message("Backend does not support images"));
        };

        images.get_image(&sub_path, size).await
    }
}

fn writer_of(backend: &dyn Backend) -> Result<&dyn WriteBackend, Error> {
    backend.writer().ok_or_else(|| {
        Error::new(ErrorKind::Unsupported).message("Backend does not support writing")
    })
}

#[cfg(test)]
mod test {
    use super::*;

    use http::StatusCode;
    use tempfile::TempDir;

    use crate::fs::local::LocalBackend;

    fn local(tmp: &TempDir, name: &str) -> Arc<LocalBackend> {
        Arc::new(
            LocalBackend::new(
                tmp.path().join(name),
                tmp.path().join("cache").join(name),
            )
            .unwrap()
        )
    }

    #[test]
    fn parse_path_splits_root_and_sub() {
        assert_eq!(
            parse_path("/files/a/b.txt").unwrap(),
            (String::from("files"), String::from("/a/b.txt"))
        );
        assert_eq!(
            parse_path("/files/").unwrap(),
            (String::from("files"), String::from("/"))
        );

        assert!(parse_path("/files").is_err(), "single segment accepted");
        assert!(parse_path("/").is_err(), "bare root accepted");
        assert!(parse_path("files/a").is_err(), "relative path accepted");
    }

    #[tokio::test]
    async fn root_list_depth_one_synthesizes_children() {
        let tmp = TempDir::new().unwrap();
        let multi = MultiBackend::new();

        multi.add_backend("dir_a", local(&tmp, "dir_a"));
        multi.add_backend("dir_b", local(&tmp, "dir_b"));

        let item = multi.list("/", 1).await.unwrap();
        let children = item.children.unwrap();

        assert_eq!(
            children.keys().collect::<Vec<_>>(),
            vec!["dir_a/", "dir_b/"]
        );
        assert_eq!(children["dir_a/"].size, 4096);
        assert!(children["dir_a/"].children.is_none());
    }

    #[tokio::test]
    async fn root_list_deeper_embeds_backend_listings() {
        let tmp = TempDir::new().unwrap();
        let multi = MultiBackend::new();

        multi.add_backend("dir_a", local(&tmp, "dir_a"));
        std::fs::write(tmp.path().join("dir_a/f.txt"), b"x").unwrap();

        let item = multi.list("/", 2).await.unwrap();
        let root_children = item.children.unwrap();
        let embedded = root_children["dir_a/"].children.as_ref().unwrap();

        assert!(embedded.contains_key("f.txt"));
    }

    #[tokio::test]
    async fn unknown_root_is_not_found() {
        let multi = MultiBackend::new();

        let err = multi.list("/nope/f.txt", 1).await.unwrap_err();

        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn removed_backend_stops_routing() {
        let tmp = TempDir::new().unwrap();
        let multi = MultiBackend::new();

        multi.add_backend("dir_a", local(&tmp, "dir_a"));
        multi.remove_backend("dir_a");

        let err = match multi.read("/dir_a/f.txt", 0, 0).await {
            Ok(_) => panic!("expected error"),
            Err(err) => err,
        };

        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn write_family_requires_capability() {
        let tmp = TempDir::new().unwrap();
        let multi = MultiBackend::new();

        multi.add_backend("remote", Arc::new(crate::fs::rclone::RcloneBackend::new()));
        multi.add_backend("dir_a", local(&tmp, "dir_a"));

        let err = multi.make_dir("/remote/sub/", false).await.unwrap_err();

        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.into_message(), "Backend does not support writing");

        multi.make_dir("/dir_a/sub/", false).await.unwrap();

        assert!(tmp.path().join("dir_a/sub").is_dir());
    }
}
