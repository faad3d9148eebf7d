use crate::domain::ports::Navigator;
use std::sync::Mutex;

/// 記憶體中的瀏覽紀錄；`replace` 會取代目前項目而不是新增
#[derive(Debug)]
pub struct MemoryNavigator {
    history: Mutex<Vec<String>>,
}

impl MemoryNavigator {
    pub fn new(initial_path: &str) -> Self {
        Self {
            history: Mutex::new(vec![initial_path.to_string()]),
        }
    }

    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for MemoryNavigator {
    fn current_path(&self) -> String {
        self.history
            .lock()
            .ok()
            .and_then(|guard| guard.last().cloned())
            .unwrap_or_else(|| "/".to_string())
    }

    fn navigate(&self, path: &str, replace: bool) {
        tracing::debug!("Navigating to {} (replace: {})", path, replace);
        if let Ok(mut guard) = self.history.lock() {
            if replace {
                guard.pop();
            }
            guard.push(path.to_string());
        }
    }
}
