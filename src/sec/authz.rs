use std::sync::Arc;

use crate::sec::store::KeyStore;

/// The token presented when a request carries none. Anonymous access only
/// works when an operator has stored a key under this literal string.
pub const PUBLIC_TOKEN: &str = "public";

/// Decides reads and writes by intersecting the request path with the
/// privilege prefixes of the presented key. Unknown keys deny.
#[derive(Clone)]
pub struct KeyAuth {
    store: Arc<KeyStore>,
}

impl KeyAuth {
    pub fn new(store: Arc<KeyStore>) -> KeyAuth {
        KeyAuth {
            store,
        }
    }

    pub fn can_read(&self, key: &str, req_path: &str) -> bool {
        match self.store.get_key_data(key) {
            Some(data) => data.can_read(req_path),
            None => false
        }
    }

    pub fn can_write(&self, key: &str, req_path: &str) -> bool {
        match self.store.get_key_data(key) {
            Some(data) => data.can_write(req_path),
            None => false
        }
    }
}
