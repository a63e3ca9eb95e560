use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::config::{self, Override};
use crate::error::{self, Context};
use crate::fs::local::LocalBackend;
use crate::fs::multi::MultiBackend;
use crate::fs::rclone::RcloneBackend;
use crate::sec::authz::KeyAuth;
use crate::sec::store::KeyStore;

/// Everything a request handler needs: the composed backend, the key store
/// and authorizer, and the per-host/per-path request maps.
pub struct Shared {
    backend: MultiBackend,
    store: Arc<KeyStore>,
    auth: KeyAuth,
    domain_map: HashMap<String, String>,
    overrides: HashMap<String, Override>,
}

pub type ArcShared = Arc<Shared>;

impl Shared {
    pub fn from_config(config: &config::Config) -> error::Result<Shared> {
        let settings = &config.settings;
        let cache_dir = settings.cache_dir();

        std::fs::create_dir_all(&settings.data).context(format!(
            "failed to create data directory \"{}\"", settings.data.display()
        ))?;

        let backend = MultiBackend::new();

        for dir in &settings.dirs {
            let name = root_name(dir)?;
            let local = LocalBackend::new(dir.clone(), cache_dir.join(&name))?;

            tracing::info!("serving \"{}\" as /{name}", dir.display());

            backend.add_backend(name, Arc::new(local));
        }

        if let Some(name) = &settings.rclone {
            tracing::info!("serving rclone remotes as /{name}");

            backend.add_backend(name.clone(), Arc::new(RcloneBackend::new()));
        }

        let store = Arc::new(KeyStore::load(&settings.data)?);

        let master = store.get_master_key().context("no master key in key store")?;

        tracing::info!("master key: {master}");

        Ok(Shared {
            auth: KeyAuth::new(store.clone()),
            backend,
            store,
            domain_map: settings.domain_map.clone(),
            overrides: settings.overrides.clone(),
        })
    }

    pub fn backend(&self) -> &MultiBackend {
        &self.backend
    }

    pub fn store(&self) -> &KeyStore {
        &self.store
    }

    pub fn auth(&self) -> &KeyAuth {
        &self.auth
    }

    pub fn domain_map(&self) -> &HashMap<String, String> {
        &self.domain_map
    }

    pub fn overrides(&self) -> &HashMap<String, Override> {
        &self.overrides
    }
}

fn root_name(dir: &Path) -> error::Result<String> {
    let name = dir.file_name().context(format!(
        "cannot derive a root name from \"{}\"", dir.display()
    ))?;

    Ok(name.to_string_lossy().into_owned())
}
