//! Configuration management
//!
//! Settings come from three layers, later ones winning: built-in defaults,
//! an optional TOML file (`--config`), then command-line flags.

use crate::catalog::{ExtensionFilter, SUPPORTED_EXTENSIONS};
use crate::device::DeviceClass;
use crate::types::CamrollError;
use crate::verify::VerifyMode;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{ArgAction, Parser};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Copy a phone's camera roll to a dated folder, verify it, optionally delete the originals
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "camroll", version, about)]
pub struct Cli {
    /// Destination directory; a YYYY-MM-DD folder is created inside it
    #[arg(long, value_name = "DIR")]
    pub dest: Option<PathBuf>,

    /// Device type (pixel is accepted for android)
    #[arg(long, value_enum)]
    pub device: Option<DeviceClass>,

    /// Where the device's storage is mounted on this machine
    #[arg(long, value_name = "DIR")]
    pub mount: Option<PathBuf>,

    /// Camera-roll directory relative to the device root (defaults per device type)
    #[arg(long, value_name = "PATH")]
    pub media_root: Option<Utf8PathBuf>,

    /// TOML file with default settings
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Start copying without asking, and continue when space looks short
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Delete verified originals from the device without asking
    #[arg(long, conflicts_with = "no_delete")]
    pub delete: bool,

    /// Never delete from the device
    #[arg(long)]
    pub no_delete: bool,

    /// Also compare blake3 checksums (reads every file from the device twice)
    #[arg(long)]
    pub checksum: bool,

    /// Hide per-file transfer speed
    #[arg(long)]
    pub no_throughput: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,

    /// More log output (-v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Settings accepted from a TOML file; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub destination: Option<PathBuf>,
    pub device: Option<DeviceClass>,
    pub mount: Option<PathBuf>,
    pub media_root: Option<Utf8PathBuf>,
    pub extensions: Option<Vec<String>>,
    pub checksum: Option<bool>,
    pub show_throughput: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, CamrollError> {
        let content = fs::read_to_string(path).map_err(|e| {
            CamrollError::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            CamrollError::Config(format!("Invalid config file {}: {}", path.display(), e))
        })
    }
}

/// How the user wants a yes/no question settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Decision {
    /// Ask interactively
    #[default]
    Ask,
    Yes,
    No,
}

impl Decision {
    /// Resolve to a boolean, asking with `prompt` only when undecided
    pub fn resolve(self, prompt: impl FnOnce() -> bool) -> bool {
        match self {
            Decision::Yes => true,
            Decision::No => false,
            Decision::Ask => prompt(),
        }
    }
}

/// Global configuration for a backup run
#[derive(Debug, Clone)]
pub struct Config {
    /// User destination; the dated run folder goes inside
    pub destination: PathBuf,

    /// Device class to look for
    pub device: DeviceClass,

    /// Host mount point of the device storage
    pub mount: Option<PathBuf>,

    /// Camera-roll directory override
    pub media_root: Option<Utf8PathBuf>,

    /// Extensions to catalogue
    pub extensions: Vec<String>,

    /// Size-only or size + checksum
    pub verify_mode: VerifyMode,

    /// Report MB/s per copied file
    pub show_throughput: bool,

    /// Start copying without asking
    pub confirm_start: Decision,

    /// Carry on when the destination looks too small
    pub proceed_on_low_space: Decision,

    /// Delete verified originals
    pub confirm_deletion: Decision,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            destination: PathBuf::new(),
            device: DeviceClass::IPhone,
            mount: None,
            media_root: None,
            extensions: SUPPORTED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            verify_mode: VerifyMode::Size,
            show_throughput: true,
            confirm_start: Decision::Ask,
            proceed_on_low_space: Decision::Ask,
            confirm_deletion: Decision::Ask,
        }
    }
}

impl Config {
    /// Camera-roll directory on the device
    pub fn media_root(&self) -> &Utf8Path {
        self.media_root
            .as_deref()
            .unwrap_or_else(|| self.device.media_root())
    }

    pub fn extension_filter(&self) -> Result<ExtensionFilter, CamrollError> {
        ExtensionFilter::new(&self.extensions)
    }

    /// Layer a file config and CLI flags over the defaults
    ///
    /// Destination and device may still be unset here; the interactive shell
    /// fills them in before validation.
    pub fn from_layers(file: FileConfig, cli: &Cli) -> Self {
        let mut config = Config::default();

        if let Some(dest) = cli.dest.clone().or(file.destination) {
            config.destination = dest;
        }
        if let Some(device) = cli.device.or(file.device) {
            config.device = device;
        }
        config.mount = cli.mount.clone().or(file.mount);
        config.media_root = cli.media_root.clone().or(file.media_root);
        if let Some(extensions) = file.extensions {
            config.extensions = extensions;
        }
        if cli.checksum || file.checksum.unwrap_or(false) {
            config.verify_mode = VerifyMode::Checksum;
        }
        config.show_throughput = !cli.no_throughput && file.show_throughput.unwrap_or(true);

        if cli.yes {
            config.confirm_start = Decision::Yes;
            config.proceed_on_low_space = Decision::Yes;
        }
        config.confirm_deletion = if cli.delete {
            Decision::Yes
        } else if cli.no_delete {
            Decision::No
        } else {
            Decision::Ask
        };

        config
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), CamrollError> {
        if self.destination.as_os_str().is_empty() {
            return Err(CamrollError::Config(
                "Destination directory is required".to_string(),
            ));
        }

        if self.extensions.is_empty() {
            return Err(CamrollError::Config(
                "At least one media extension is required".to_string(),
            ));
        }
        self.extension_filter()?;

        if let Some(mount) = &self.mount {
            if !mount.is_dir() {
                return Err(CamrollError::Config(format!(
                    "Mount point does not exist: {:?}",
                    mount
                )));
            }

            // Copying into the device itself would delete what was just copied.
            let resolved = (mount.canonicalize(), absolute_lenient(&self.destination));
            if let (Ok(mount), Ok(dest)) = resolved {
                if dest.starts_with(&mount) {
                    return Err(CamrollError::Config(
                        "Destination cannot be inside the device mount".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Canonicalize the longest existing ancestor and re-append the rest
fn absolute_lenient(path: &Path) -> std::io::Result<PathBuf> {
    let mut existing = path.to_path_buf();
    let mut rest = Vec::new();
    while !existing.exists() {
        match (existing.file_name(), existing.parent()) {
            (Some(name), Some(parent)) => {
                rest.push(name.to_owned());
                existing = parent.to_path_buf();
            }
            _ => break,
        }
    }
    if existing.as_os_str().is_empty() {
        existing = std::env::current_dir()?;
    }
    let mut resolved = existing.canonicalize()?;
    for name in rest.into_iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}

impl TryFrom<Cli> for Config {
    type Error = CamrollError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Ok(Config::from_layers(file, &cli))
    }
}
