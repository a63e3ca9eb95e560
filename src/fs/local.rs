use std::collections::BTreeMap;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use image::imageops::FilterType;
use image::ImageFormat;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::error::{self, Context};
use crate::fs::error::{Error, ErrorKind};
use crate::fs::{Backend, ByteStream, ImageBackend, Item, WriteBackend, MAX_LIST_DEPTH};
use crate::path::resolve_root;
use crate::time::format_mod_time;

const PIPE_CAPACITY: usize = 64 * 1024;

/// Serves a directory tree on the local filesystem. Thumbnails are cached
/// under a parallel tree rooted at `cache_dir`.
pub struct LocalBackend {
    root_dir: PathBuf,
    cache_dir: PathBuf,
}

impl LocalBackend {
    pub fn new(root_dir: PathBuf, cache_dir: PathBuf) -> error::Result<LocalBackend> {
        ensure_dir(&root_dir)?;
        ensure_dir(&cache_dir)?;

        Ok(LocalBackend {
            root_dir,
            cache_dir,
        })
    }

    fn resolve(&self, req_path: &str) -> PathBuf {
        resolve_root(&self.root_dir, req_path)
    }

    fn list_dir(&self, req_path: String, depth: u32) -> BoxFuture<'_, Result<Item, Error>> {
        Box::pin(async move {
            let full = self.resolve(&req_path);

            let meta = tokio::fs::metadata(&full).await?;
            let mut item = item_from_metadata(&meta);
            let mut children = BTreeMap::new();

            let mut entries = tokio::fs::read_dir(&full).await?;

            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().into_owned();

                // stat instead of the entry type so symlinks are followed
                let entry_meta = tokio::fs::metadata(entry.path()).await?;

                if entry_meta.is_dir() {
                    if depth > 1 {
                        let child_path = join_req_path(&req_path, &name);
                        let child = self.list_dir(child_path, depth - 1).await?;

                        children.insert(format!("{name}/"), child);
                    } else {
                        children.insert(format!("{name}/"), item_from_metadata(&entry_meta));
                    }
                } else {
                    children.insert(name, item_from_metadata(&entry_meta));
                }
            }

            if !children.is_empty() {
                item.children = Some(children);
            }

            Ok(item)
        })
    }
}

#[async_trait]
impl Backend for LocalBackend {
    async fn list(&self, req_path: &str, depth: u32) -> Result<Item, Error> {
        if depth > MAX_LIST_DEPTH {
            return Err(Error::new(ErrorKind::InvalidRequest).message(format!(
                "depth is greater than allowed value ({MAX_LIST_DEPTH})"
            )));
        }

        let depth = if depth == 0 {
            MAX_LIST_DEPTH
        } else {
            depth
        };

        self.list_dir(req_path.to_owned(), depth).await
    }

    async fn read(&self, req_path: &str, offset: u64, length: u64)
        -> Result<(Item, ByteStream), Error>
    {
        let full = self.resolve(req_path);

        let mut file = tokio::fs::OpenOptions::new()
            .read(true)
            .open(&full)
            .await
            .map_err(|_| Error::new(ErrorKind::NotFound).message("Not found"))?;

        let meta = file.metadata()
            .await
            .map_err(|_| Error::new(ErrorKind::Internal).message("Error reading file metadata"))?;

        if meta.is_dir() {
            return Err(Error::new(ErrorKind::NotFound).message("Not found"));
        }

        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|_| Error::new(ErrorKind::Internal).message("Error seeking file"))?;

        let copy_length = if length == 0 {
            meta.len().saturating_sub(offset)
        } else {
            length
        };

        let (mut writer, reader) = tokio::io::duplex(PIPE_CAPACITY);

        // the producer owns the file. every exit path drops it and shuts the
        // pipe down so the consumer observes eof or the disconnect
        tokio::spawn(async move {
            let mut limited = file.take(copy_length);

            match tokio::io::copy(&mut limited, &mut writer).await {
                Ok(copied) if copied != copy_length => {
                    tracing::warn!("short file read: copied {copied} of {copy_length}");
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!("file read stream closed early: {err}");
                }
            }

            let _ = writer.shutdown().await;
        });

        Ok((item_from_metadata(&meta), Box::new(reader)))
    }

    fn writer(&self) -> Option<&dyn WriteBackend> {
        Some(self)
    }

    fn images(&self) -> Option<&dyn ImageBackend> {
        Some(self)
    }
}

#[async_trait]
impl WriteBackend for LocalBackend {
    async fn make_dir(&self, req_path: &str, recursive: bool) -> Result<(), Error> {
        let full = self.resolve(req_path);

        if recursive {
            tokio::fs::create_dir_all(&full).await?;

            return Ok(());
        }

        match tokio::fs::metadata(&full).await {
            Ok(_) => Err(Error::new(ErrorKind::Conflict).message("Directory exists")),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tokio::fs::create_dir(&full).await?;

                Ok(())
            }
            Err(err) => Err(Error::from(err))
        }
    }

    async fn write(
        &self,
        req_path: &str,
        mut data: ByteStream,
        offset: u64,
        length: u64,
        overwrite: bool,
        truncate: bool,
    ) -> Result<(), Error> {
        let full = self.resolve(req_path);

        let mut opts = tokio::fs::OpenOptions::new();
        opts.write(true);

        if overwrite {
            opts.create(true);
        } else {
            opts.create_new(true);
        }

        if truncate {
            opts.truncate(true);
        }

        let mut file = opts.open(&full).await?;

        if offset > 0 {
            file.seek(SeekFrom::Start(offset)).await?;
        }

        let copied = tokio::io::copy(&mut data, &mut file).await?;

        file.flush().await?;

        if copied != length {
            return Err(Error::new(ErrorKind::Internal).message(format!(
                "copied {copied} bytes of a declared {length}"
            )));
        }

        Ok(())
    }

    async fn set_attributes(
        &self,
        req_path: &str,
        mod_time: Option<DateTime<Utc>>,
        is_executable: Option<bool>,
    ) -> Result<(), Error> {
        let full = self.resolve(req_path);

        tokio::task::spawn_blocking(move || -> Result<(), Error> {
            if let Some(mod_time) = mod_time {
                let file = std::fs::OpenOptions::new()
                    .write(true)
                    .open(&full)?;

                file.set_modified(mod_time.into())?;
            }

            #[cfg(unix)]
            if let Some(executable) = is_executable {
                use std::os::unix::fs::PermissionsExt;

                let mode = if executable {
                    0o755
                } else {
                    0o644
                };

                std::fs::set_permissions(&full, std::fs::Permissions::from_mode(mode))?;
            }

            #[cfg(not(unix))]
            let _ = is_executable;

            Ok(())
        })
        .await
        .map_err(|err| Error::new(ErrorKind::Internal).message(err.to_string()))?
    }

    async fn delete(&self, req_path: &str, recursive: bool) -> Result<(), Error> {
        let full = self.resolve(req_path);

        let meta = tokio::fs::metadata(&full).await?;

        if meta.is_dir() {
            if recursive {
                tokio::fs::remove_dir_all(&full).await?;
            } else {
                tokio::fs::remove_dir(&full).await?;
            }
        } else {
            tokio::fs::remove_file(&full).await?;
        }

        Ok(())
    }
}

#[async_trait]
impl ImageBackend for LocalBackend {
    async fn get_image(&self, req_path: &str, size: u32) -> Result<(ByteStream, u64), Error> {
        let (parent, filename) = match req_path.rsplit_once('/') {
            Some((parent, filename)) if !filename.is_empty() => (parent, filename),
            _ => return Err(Error::new(ErrorKind::InvalidPath).message("Invalid path")),
        };

        let img_dir = resolve_root(&self.cache_dir, parent)
            .join("gemdrive")
            .join("images")
            .join(size.to_string());
        let cache_path = img_dir.join(filename);

        if tokio::fs::metadata(&cache_path).await.is_err() {
            let format = image_format(req_path)?;

            tokio::fs::create_dir_all(&img_dir).await?;

            let source = self.resolve(req_path);
            let tmp = img_dir.join(format!(".{filename}.{:08x}", rand::random::<u32>()));
            let target = cache_path.clone();

            // decode and resize are cpu bound. written to a private temp name
            // then renamed so concurrent misses stay last-writer-wins and a
            // reader never observes a partial file
            tokio::task::spawn_blocking(move || -> Result<(), Error> {
                let file = std::fs::File::open(&source)?;

                let decoded = image::load(std::io::BufReader::new(file), format)
                    .map_err(|err| Error::new(ErrorKind::Internal).message(err.to_string()))?;

                let resized = decoded.resize(size, size, FilterType::Lanczos3);

                if let Err(err) = resized.save_with_format(&tmp, format) {
                    let _ = std::fs::remove_file(&tmp);

                    return Err(Error::new(ErrorKind::Internal).message(err.to_string()));
                }

                std::fs::rename(&tmp, &target)?;

                Ok(())
            })
            .await
            .map_err(|err| Error::new(ErrorKind::Internal).message(err.to_string()))??;
        }

        let file = tokio::fs::File::open(&cache_path).await?;
        let len = file.metadata().await?.len();

        Ok((Box::new(file), len))
    }
}

fn ensure_dir(path: &Path) -> error::Result<()> {
    match crate::path::metadata(path).context(format!(
        "failed to retrieve metadata for \"{}\"", path.display()
    ))? {
        Some(meta) if meta.is_dir() => Ok(()),
        Some(_) => Err(error::Error::new().message(format!(
            "\"{}\" is not a directory", path.display()
        ))),
        None => std::fs::create_dir_all(path).context(format!(
            "failed to create directory \"{}\"", path.display()
        ))
    }
}

fn item_from_metadata(meta: &std::fs::Metadata) -> Item {
    Item {
        size: meta.len(),
        mod_time: meta.modified().ok().map(format_mod_time),
        is_executable: is_executable(meta),
        children: None,
    }
}

#[cfg(unix)]
fn is_executable(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;

    meta.is_file() && meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &std::fs::Metadata) -> bool {
    false
}

fn join_req_path(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{parent}{name}")
    } else {
        format!("{parent}/{name}")
    }
}

fn image_format(req_path: &str) -> Result<ImageFormat, Error> {
    let ext = Path::new(req_path)
        .extension()
        .map(|ext| ext.to_ascii_lowercase());

    match ext.as_deref().and_then(|ext| ext.to_str()) {
        Some("jpg") | Some("jpeg") => Ok(ImageFormat::Jpeg),
        Some("png") => Ok(ImageFormat::Png),
        _ => Err(Error::new(ErrorKind::InvalidImageType).message("Invalid image file type"))
    }
}
