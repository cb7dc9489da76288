use anyhow::Context;
use keytype_core::config::AppConfig;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "keytype";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<user config dir>/keytype/config.json`.
    pub fn default_path() -> anyhow::Result<PathBuf> {
        let base = dirs::config_dir().context("no user config directory on this system")?;
        Ok(base.join(APP_DIR).join(CONFIG_FILE))
    }

    pub fn open_default() -> anyhow::Result<Self> {
        Ok(Self::at_path(Self::default_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Defaults when the file does not exist yet; out-of-range values are normalized.
    pub fn load(&self) -> anyhow::Result<AppConfig> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no config at {}; using defaults", self.path.display());
                return Ok(AppConfig::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("read config: {}", self.path.display()));
            }
        };
        let cfg: AppConfig = serde_json::from_slice(&bytes).context("decode config JSON")?;
        Ok(cfg.normalized())
    }

    pub fn save(&self, cfg: &AppConfig) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(cfg).context("encode config JSON")?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create config directory: {}", parent.display()))?;
        }

        // Atomic-ish write: write temp then replace.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("write temp: {}", tmp.display()))?;
        replace_file(&tmp, &self.path)
            .with_context(|| format!("replace file: {}", self.path.display()))?;
        Ok(())
    }
}

// rename() will not overwrite on every platform, so the old file is moved
// aside first and put back if the final rename fails.
fn replace_file(tmp: &Path, dst: &Path) -> anyhow::Result<()> {
    let backup = dst.with_extension("bak");

    if dst.exists() {
        let _ = fs::remove_file(&backup);
        fs::rename(dst, &backup)
            .with_context(|| format!("failed rename {} -> {}", dst.display(), backup.display()))?;
    }

    if let Err(e) = fs::rename(tmp, dst) {
        if backup.exists() {
            let _ = fs::rename(&backup, dst);
        }
        let _ = fs::remove_file(tmp);
        return Err(anyhow::Error::new(e).context(format!(
            "failed rename {} -> {}",
            tmp.display(),
            dst.display()
        )));
    }

    let _ = fs::remove_file(&backup);
    Ok(())
}
