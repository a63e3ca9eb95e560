use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Permission levels ordered by strength. `Own` is a legacy level still
/// accepted on the wire and equivalent to `Write`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Read,
    Write,
    Own,
}

impl Permission {
    pub fn can_read(&self) -> bool {
        true
    }

    pub fn can_write(&self) -> bool {
        matches!(self, Permission::Write | Permission::Own)
    }
}

/// The capability record behind a key: the key that issued it and the path
/// prefixes it may touch. The master key is the one record with an empty
/// parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyData {
    #[serde(default)]
    pub parent: String,

    #[serde(default)]
    pub privileges: BTreeMap<String, Permission>,
}

impl KeyData {
    pub fn can_read(&self, req_path: &str) -> bool {
        self.privileges.iter().any(|(prefix, perm)| {
            req_path.starts_with(prefix.as_str()) && perm.can_read()
        })
    }

    pub fn can_write(&self, req_path: &str) -> bool {
        self.privileges.iter().any(|(prefix, perm)| {
            req_path.starts_with(prefix.as_str()) && perm.can_write()
        })
    }

    /// True when every privilege here is covered by some privilege of
    /// `other`: a prefix of the path at an equal or stronger level. Key
    /// issuance requires the candidate to be a subset of the issuer.
    pub fn is_subset_of(&self, other: &KeyData) -> bool {
        self.privileges.iter().all(|(prefix, perm)| {
            other.privileges.iter().any(|(other_prefix, other_perm)| {
                if !prefix.starts_with(other_prefix.as_str()) {
                    return false;
                }

                if perm.can_write() {
                    other_perm.can_write()
                } else {
                    other_perm.can_read()
                }
            })
        })
    }
}

const KEY_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const KEY_LENGTH: usize = 32;

pub fn generate_key() -> String {
    let mut rng = rand::thread_rng();

    (0..KEY_LENGTH)
        .map(|_| KEY_CHARS[rng.gen_range(0..KEY_CHARS.len())] as char)
        .collect()
}
