use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{self, Context};
use crate::sec::key::{generate_key, KeyData, Permission};

const STORE_FILE: &str = "gemdrive_db.json";

/// Persistent key -> KeyData mapping, rewritten on every mutation. All
/// access is serialized by one mutex; the critical sections never block on
/// anything but the rewrite itself.
pub struct KeyStore {
    store_path: PathBuf,
    keys: Mutex<HashMap<String, KeyData>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Shape {
    #[serde(default)]
    keys: HashMap<String, KeyData>,
}

impl KeyStore {
    /// Loads the store from `data_dir`, bootstrapping a master key with full
    /// privileges when the loaded state has none.
    pub fn load(data_dir: &Path) -> error::Result<KeyStore> {
        let store_path = data_dir.join(STORE_FILE);

        let mut shape = match crate::path::metadata(&store_path).context(format!(
            "failed to retrieve metadata for \"{}\"", store_path.display()
        ))? {
            Some(_) => {
                let file = std::fs::OpenOptions::new()
                    .read(true)
                    .open(&store_path)
                    .context(format!(
                        "failed to open key store \"{}\"", store_path.display()
                    ))?;

                serde_json::from_reader::<_, Shape>(std::io::BufReader::new(file))
                    .context(format!(
                        "failed to parse key store \"{}\"", store_path.display()
                    ))?
            }
            None => Shape::default()
        };

        let has_master = shape.keys.values().any(|data| data.parent.is_empty());

        if !has_master {
            let mut privileges = std::collections::BTreeMap::new();
            privileges.insert(String::from("/"), Permission::Write);

            shape.keys.insert(generate_key(), KeyData {
                parent: String::new(),
                privileges,
            });
        }

        let store = KeyStore {
            store_path,
            keys: Mutex::new(shape.keys),
        };

        if !has_master {
            let keys = store.keys.lock().unwrap();

            store.persist(&keys)?;
        }

        Ok(store)
    }

    pub fn add_key_data(&self, key: &str, data: KeyData) -> error::Result<()> {
        let mut keys = self.keys.lock().unwrap();

        if keys.contains_key(key) {
            return Err(error::Error::new().message("Key exists"));
        }

        keys.insert(key.to_owned(), data);

        self.persist(&keys)
    }

    pub fn set_key_data(&self, key: &str, data: KeyData) -> error::Result<()> {
        let mut keys = self.keys.lock().unwrap();

        keys.insert(key.to_owned(), data);

        self.persist(&keys)
    }

    pub fn delete_key_data(&self, key: &str) -> error::Result<()> {
        let mut keys = self.keys.lock().unwrap();

        if keys.remove(key).is_none() {
            return Err(error::Error::new().message("No such key"));
        }

        self.persist(&keys)
    }

    pub fn get_key_data(&self, key: &str) -> Option<KeyData> {
        let keys = self.keys.lock().unwrap();

        keys.get(key).cloned()
    }

    /// The unique key with an empty parent.
    pub fn get_master_key(&self) -> Option<String> {
        let keys = self.keys.lock().unwrap();

        keys.iter()
            .find(|(_, data)| data.parent.is_empty())
            .map(|(key, _)| key.clone())
    }

    fn persist(&self, keys: &HashMap<String, KeyData>) -> error::Result<()> {
        let json = serde_json::to_string_pretty(&SerializeShape { keys })
            .context("failed to serialize key store")?;

        std::fs::write(&self.store_path, json).context(format!(
            "failed to save key store \"{}\"", self.store_path.display()
        ))
    }
}

#[derive(Serialize)]
struct SerializeShape<'a> {
    keys: &'a HashMap<String, KeyData>,
}
