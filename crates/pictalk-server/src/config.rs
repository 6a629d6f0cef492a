use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub blob_dir: PathBuf,
    pub bucket: String,
    pub sweep_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let sweep_secs: u64 = match get("PICTALK_SWEEP_INTERVAL_SECS") {
            Some(raw) => raw.parse().with_context(|| {
                format!("PICTALK_SWEEP_INTERVAL_SECS is not a number: {:?}", raw)
            })?,
            None => 3600,
        };
        if sweep_secs == 0 {
            bail!("PICTALK_SWEEP_INTERVAL_SECS must be greater than zero");
        }

        Ok(Self {
            db_path: get("PICTALK_DB_PATH").unwrap_or_else(|| "pictalk.db".into()).into(),
            blob_dir: get("PICTALK_BLOB_DIR").unwrap_or_else(|| "./tmp".into()).into(),
            bucket: get("PICTALK_BUCKET").unwrap_or_else(|| "pictalk".into()),
            sweep_interval: Duration::from_secs(sweep_secs),
        })
    }
}
