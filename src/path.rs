use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

pub fn metadata<P>(path: P) -> Result<Option<Metadata>, std::io::Error>
where
    P: AsRef<Path>
{
    match path.as_ref().metadata() {
        Ok(m) => Ok(Some(m)),
        Err(err) => match err.kind() {
            ErrorKind::NotFound => Ok(None),
            _ => Err(err)
        }
    }
}

pub fn normalize<P>(path: P) -> PathBuf
where
    P: AsRef<Path>
{
    let mut rtn = PathBuf::new();

    for comp in path.as_ref().components() {
        match comp {
            Component::Prefix(prefix) => {
                rtn.push(prefix.as_os_str());
            }
            Component::RootDir => {
                rtn.push(comp.as_os_str());
            }
            Component::ParentDir => {
                rtn.pop();
            }
            Component::Normal(c) => {
                rtn.push(c);
            }
            Component::CurDir => {}
        }
    }

    rtn
}

/// Maps a request path onto a directory root. `..` segments cannot climb
/// above the root.
pub fn resolve_root<P>(root: P, req_path: &str) -> PathBuf
where
    P: AsRef<Path>
{
    let clean = normalize(Path::new("/").join(req_path));

    root.as_ref().join(clean.strip_prefix("/").unwrap_or(&clean))
}
