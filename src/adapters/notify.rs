use crate::domain::ports::Notifier;
use std::sync::Mutex;
use tracing::Level;

/// 將 toast 寫入日誌並輸出到終端
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier {
    quiet: bool,
}

impl TracingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// 只寫日誌，不輸出到終端
    pub fn quiet() -> Self {
        Self { quiet: true }
    }
}

impl TracingNotifier {
    /// 輸出到終端時日誌降為 debug，避免 stderr 上出現兩次
    fn log_level(&self, success: bool) -> Level {
        match (self.quiet, success) {
            (false, _) => Level::DEBUG,
            (true, true) => Level::INFO,
            (true, false) => Level::WARN,
        }
    }
}

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        if self.log_level(true) == Level::DEBUG {
            tracing::debug!("✅ {}", message);
        } else {
            tracing::info!("✅ {}", message);
        }
        if !self.quiet {
            eprintln!("✅ {}", message);
        }
    }

    fn error(&self, message: &str) {
        if self.log_level(false) == Level::DEBUG {
            tracing::debug!("❌ {}", message);
        } else {
            tracing::warn!("❌ {}", message);
        }
        if !self.quiet {
            eprintln!("❌ {}", message);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toast {
    Success(String),
    Error(String),
}

/// 記錄所有 toast，供測試或 UI 之後讀取
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    toasts: Mutex<Vec<Toast>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn errors(&self) -> Vec<String> {
        self.toasts()
            .into_iter()
            .filter_map(|toast| match toast {
                Toast::Error(message) => Some(message),
                Toast::Success(_) => None,
            })
            .collect()
    }

    pub fn successes(&self) -> Vec<String> {
        self.toasts()
            .into_iter()
            .filter_map(|toast| match toast {
                Toast::Success(message) => Some(message),
                Toast::Error(_) => None,
            })
            .collect()
    }

    fn push(&self, toast: Toast) {
        if let Ok(mut guard) = self.toasts.lock() {
            guard.push(toast);
        }
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        self.push(Toast::Success(message.to_string()));
    }

    fn error(&self, message: &str) {
        self.push(Toast::Error(message.to_string()));
    }
}
