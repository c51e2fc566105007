use crate::config::UploadsConfig;
use crate::error::{AppError, AppResult};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const RECEIPTS: &str = "receipts";
const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "pdf"];

/// Stores uploaded payment receipts on local disk.
#[derive(Clone)]
pub struct ReceiptStorage {
    dir: PathBuf,
    public_prefix: String,
    max_bytes: usize,
}

impl ReceiptStorage {
    pub fn new(config: &UploadsConfig) -> Self {
        Self {
            dir: Path::new(&config.dir).join(RECEIPTS),
            public_prefix: config.public_prefix.trim_end_matches('/').to_string(),
            max_bytes: config.max_receipt_bytes,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Writes `bytes` under a fresh name and returns its public path.
    pub async fn store(&self, bytes: &[u8], suggested_name: &str) -> AppResult<String> {
        if bytes.is_empty() {
            return Err(AppError::ValidationError("Receipt file is empty".to_string()));
        }
        if bytes.len() > self.max_bytes {
            return Err(AppError::ValidationError(format!(
                "Receipt file exceeds {} bytes",
                self.max_bytes
            )));
        }

        let ext = extension_of(suggested_name)?;
        let file_name = format!("{}.{ext}", Uuid::new_v4().simple());

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&file_name), bytes).await?;

        Ok(format!("{}/{RECEIPTS}/{file_name}", self.public_prefix))
    }

    /// Deletes a receipt previously returned by [`ReceiptStorage::store`].
    /// Paths this storage did not hand out are ignored.
    pub async fn remove(&self, public_path: &str) {
        let Some(file_name) = public_path
            .strip_prefix(&self.public_prefix)
            .and_then(|rest| rest.strip_prefix(&format!("/{RECEIPTS}/")))
            .filter(|name| !name.is_empty() && !name.contains(['/', '\\']) && *name != "..")
        else {
            log::warn!("Refusing to remove receipt outside storage: {public_path}");
            return;
        };

        if let Err(e) = tokio::fs::remove_file(self.dir.join(file_name)).await {
            log::warn!("Failed to remove receipt {public_path}: {e}");
        }
    }
}

fn extension_of(name: &str) -> AppResult<String> {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(AppError::ValidationError(format!(
            "Unsupported receipt file type: {name}"
        )))
    }
}
