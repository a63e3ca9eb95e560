use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::config::Override;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub port: Option<u16>,
    pub dirs: Option<Vec<PathBuf>>,
    pub data_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub rclone_dir: Option<String>,
    pub domain_map: Option<HashMap<String, String>>,
    pub overrides: Option<HashMap<String, Override>>,
}
