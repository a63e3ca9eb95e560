use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;

use crate::error::{self, Context};
use crate::path::normalize;

mod shape;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// a config file to load. json or yaml
    #[arg(long)]
    config: Vec<PathBuf>,

    /// port for the http listener
    #[arg(long)]
    port: Option<u16>,

    /// a directory root to serve. repeatable
    #[arg(long = "dir")]
    dirs: Vec<PathBuf>,

    /// directory holding persistent state
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// directory holding cached thumbnails. defaults to data_dir/cache
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// mount the rclone proxy backend under the given root name
    #[arg(long)]
    rclone: Option<String>,
}

pub fn get_config() -> error::Result<Config> {
    Config::from_args(CliArgs::parse())
}

#[derive(Debug)]
pub struct Config {
    pub settings: Settings,
}

impl Config {
    pub fn from_args(args: CliArgs) -> error::Result<Self> {
        let cwd = std::env::current_dir()
            .context("failed to retrieve cwd for Settings")?;
        let mut settings = Settings::default_in(&cwd);

        for config_path in args.config {
            let full = if config_path.is_absolute() {
                config_path
            } else {
                normalize(cwd.join(config_path))
            };

            tracing::debug!("loading config file \"{}\"", full.display());

            let loaded = Self::load_file(&full)?;

            settings.merge(&full, loaded)?;
        }

        if let Some(port) = args.port {
            settings.port = port;
        }

        for dir in args.dirs {
            settings.dirs.push(abs(&cwd, dir));
        }

        if let Some(data) = args.data_dir {
            settings.data = abs(&cwd, data);
        }

        if let Some(cache) = args.cache_dir {
            settings.cache = Some(abs(&cwd, cache));
        }

        if let Some(rclone) = args.rclone {
            settings.rclone = Some(rclone);
        }

        tracing::debug!("{settings:#?}");

        Ok(Config {
            settings
        })
    }

    fn load_file(path: &PathBuf) -> error::Result<shape::Settings> {
        let ext = path.extension().context(format!(
            "failed to retrieve the file extension for config file: \"{}\"", path.display()
        ))?;

        let ext = ext.to_ascii_lowercase();
        let file = std::fs::OpenOptions::new()
            .read(true)
            .open(path)
            .context(format!("failed to open config file: \"{}\"", path.display()))?;
        let reader = std::io::BufReader::new(file);

        if ext.eq("yaml") || ext.eq("yml") {
            serde_yaml::from_reader(reader).context(format!(
                "failed to parse yaml config file: \"{}\"", path.display()
            ))
        } else if ext.eq("json") {
            serde_json::from_reader(reader).context(format!(
                "failed to parse json config file: \"{}\"", path.display()
            ))
        } else {
            Err(error::Error::new().message(format!(
                "unknown type of config file: \"{}\"", path.display()
            )))
        }
    }
}

#[derive(Debug)]
pub struct Settings {
    pub port: u16,
    pub dirs: Vec<PathBuf>,
    pub data: PathBuf,
    pub cache: Option<PathBuf>,
    pub rclone: Option<String>,
    pub domain_map: HashMap<String, String>,
    pub overrides: HashMap<String, Override>,
}

impl Settings {
    pub fn default_in(cwd: &Path) -> Self {
        Settings {
            port: 3838,
            dirs: Vec::new(),
            data: cwd.join("data"),
            cache: None,
            rclone: None,
            domain_map: HashMap::new(),
            overrides: HashMap::new(),
        }
    }

    /// The thumbnail cache directory, `data/cache` unless configured.
    pub fn cache_dir(&self) -> PathBuf {
        match &self.cache {
            Some(cache) => cache.clone(),
            None => self.data.join("cache")
        }
    }

    fn merge(&mut self, src: &Path, settings: shape::Settings) -> error::Result<()> {
        let parent = src.parent().context(format!(
            "failed to retrieve parent path from config file \"{}\"", src.display()
        ))?;

        if let Some(port) = settings.port {
            self.port = port;
        }

        if let Some(dirs) = settings.dirs {
            for dir in dirs {
                self.dirs.push(abs(parent, dir));
            }
        }

        if let Some(data) = settings.data_dir {
            self.data = abs(parent, data);
        }

        if let Some(cache) = settings.cache_dir {
            self.cache = Some(abs(parent, cache));
        }

        if let Some(rclone) = settings.rclone_dir {
            self.rclone = Some(rclone);
        }

        if let Some(domain_map) = settings.domain_map {
            for (host, prefix) in domain_map {
                if !prefix.starts_with('/') {
                    return Err(error::Error::new().message(format!(
                        "domainMap entry for \"{host}\" must begin with '/' in: \"{}\"",
                        src.display()
                    )));
                }

                self.domain_map.insert(host, prefix);
            }
        }

        if let Some(overrides) = settings.overrides {
            self.overrides.extend(overrides);
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Override {
    pub content_type: Option<String>,
}

fn abs(base: &Path, given: PathBuf) -> PathBuf {
    if given.is_absolute() {
        given
    } else {
        normalize(base.join(given))
    }
}
