//! Subcommands and the options they share.

pub mod config;
pub mod entry;
pub mod export;
pub mod ingest;
pub mod parse;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use console::style;
use tracing::debug;

use clinica_core::{BillingSheet, ClinicaConfig, ReferenceSnapshot};

use crate::backend::BackendClient;

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("clinica")
        .join("config.json")
}

/// Load the config from `-c`, else the default location, else defaults.
///
/// The result is validated so a bad pattern or URL fails before any file is read.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<ClinicaConfig> {
    let config = match config_path {
        Some(path) => ClinicaConfig::from_file(Path::new(path))
            .with_context(|| format!("failed to load config from {}", path))?,
        None => {
            let path = default_config_path();
            if path.exists() {
                ClinicaConfig::from_file(&path)
                    .with_context(|| format!("failed to load config from {}", path.display()))?
            } else {
                ClinicaConfig::default()
            }
        }
    };

    config.validate()?;
    Ok(config)
}

/// Location of the billing sheet.
#[derive(Args, Debug, Clone)]
pub struct SheetArgs {
    /// Billing sheet file (JSON)
    #[arg(long, env = "CLINICA_SHEET", global = true)]
    sheet: Option<PathBuf>,
}

impl SheetArgs {
    pub fn path(&self) -> PathBuf {
        self.sheet.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("clinica")
                .join("sheet.json")
        })
    }

    pub fn load(&self) -> anyhow::Result<BillingSheet> {
        let path = self.path();
        BillingSheet::load(&path)
            .with_context(|| format!("failed to read sheet {}", path.display()))
    }

    pub fn save(&self, sheet: &BillingSheet) -> anyhow::Result<()> {
        let path = self.path();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        sheet
            .save(&path)
            .with_context(|| format!("failed to write sheet {}", path.display()))?;
        debug!("Saved sheet to {}", path.display());
        Ok(())
    }
}

/// Where reference data comes from.
#[derive(Args, Debug, Clone)]
pub struct ReferenceArgs {
    /// JSON file with doctors, studies, obrasSociales and tarifas (takes precedence over the backend)
    #[arg(long)]
    references: Option<PathBuf>,

    /// Base URL of the clinic backend
    #[arg(long, env = "CLINICA_BACKEND_URL")]
    backend_url: Option<String>,
}

impl ReferenceArgs {
    /// Fetch a fresh snapshot, or `None` when no source is configured.
    pub async fn load(&self, config: &ClinicaConfig) -> anyhow::Result<Option<ReferenceSnapshot>> {
        if let Some(path) = &self.references {
            let snapshot = ReferenceSnapshot::from_file(path)
                .with_context(|| format!("failed to read references from {}", path.display()))?;
            return Ok(Some(snapshot.active_only()));
        }

        let mut backend = config.backend.clone();
        if let Some(url) = &self.backend_url {
            backend.base_url = Some(url.clone());
        }
        if backend.base_url.is_none() {
            return Ok(None);
        }

        let client = BackendClient::new(&backend)?;
        Ok(Some(client.snapshot().await?.active_only()))
    }
}

/// Refresh the sheet's reference data when a source was given.
pub async fn refresh_references(
    sheet: &mut BillingSheet,
    references: &ReferenceArgs,
    config: &ClinicaConfig,
) -> anyhow::Result<()> {
    match references.load(config).await? {
        Some(snapshot) => sheet.refresh_references(snapshot),
        None => debug!("No reference source given, keeping the sheet's reference data"),
    }
    Ok(())
}

pub fn print_warning(message: impl std::fmt::Display) {
    eprintln!("{} {}", style("!").yellow(), message);
}
