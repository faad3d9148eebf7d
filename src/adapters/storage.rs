use crate::domain::ports::{SessionSnapshot, SessionStore};
use crate::utils::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// 以 JSON 檔保存 session（cookie 與使用者資料）
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<SessionSnapshot> {
        if !self.path.exists() {
            tracing::debug!("No session file at {}", self.path.display());
            return Ok(SessionSnapshot::default());
        }

        let data = fs::read(&self.path)?;
        if data.is_empty() {
            return Ok(SessionSnapshot::default());
        }
        let snapshot = serde_json::from_slice(&data)?;
        Ok(snapshot)
    }

    async fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let data = serde_json::to_vec_pretty(snapshot)?;
        fs::write(&self.path, data)?;

        // session cookie 只給目前使用者讀取
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!("Session saved to {}", self.path.display());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            tracing::debug!("Session file {} removed", self.path.display());
        }
        Ok(())
    }
}

/// 只存在記憶體中的 session，供嵌入使用與測試
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    snapshot: Mutex<SessionSnapshot>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: SessionSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<SessionSnapshot> {
        Ok(self.snapshot())
    }

    async fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        if let Ok(mut guard) = self.snapshot.lock() {
            *guard = snapshot.clone();
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        if let Ok(mut guard) = self.snapshot.lock() {
            *guard = SessionSnapshot::default();
        }
        Ok(())
    }
}
