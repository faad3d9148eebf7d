//! 查詢快取
//!
//! 以 [`QueryKey`] 為索引保存最後一次成功的查詢結果。在 `stale_time`
//! 內重複查詢直接回傳快取；同一個 key 同時只會有一個請求在進行，
//! 其他呼叫者等待並共用結果。mutation 成功後以 key 前綴讓快取失效。

use crate::domain::ports::Notifier;
use crate::utils::error::Result;
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new(root: &str) -> Self {
        Self(vec![root.to_string()])
    }

    pub fn from_parts(parts: &[&str]) -> Self {
        Self(parts.iter().map(|part| part.to_string()).collect())
    }

    pub fn push(mut self, part: impl Into<String>) -> Self {
        self.0.push(part.into());
        self
    }

    /// 以 JSON 形式把查詢參數加入 key，參數不同就是不同的快取項目
    pub fn with_params<P: Serialize + ?Sized>(self, params: &P) -> Self {
        let encoded = serde_json::to_string(params).unwrap_or_else(|e| {
            tracing::warn!("Could not encode query params: {}", e);
            String::new()
        });
        self.push(encoded)
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub stale_time: Duration,
    /// 失敗後額外重試的次數，只對連線錯誤與 5xx 生效
    pub retry: u32,
    pub retry_delay: Duration,
    pub enabled: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            stale_time: Duration::ZERO,
            retry: 1,
            retry_delay: Duration::from_secs(1),
            enabled: true,
        }
    }
}

impl QueryOptions {
    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    updated_at: Instant,
    invalidated: bool,
}

impl Entry {
    fn is_fresh(&self, stale_time: Duration) -> bool {
        !self.invalidated && self.updated_at.elapsed() < stale_time
    }
}

pub struct QueryClient {
    notifier: Arc<dyn Notifier>,
    defaults: QueryOptions,
    entries: Mutex<HashMap<QueryKey, Entry>>,
    in_flight: Mutex<HashMap<QueryKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl QueryClient {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self::with_defaults(notifier, QueryOptions::default())
    }

    pub fn with_defaults(notifier: Arc<dyn Notifier>, defaults: QueryOptions) -> Self {
        Self {
            notifier,
            defaults,
            entries: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// 預設選項，查詢再依需要調整 stale time
    pub fn options(&self) -> QueryOptions {
        self.defaults
    }

    pub fn notifier(&self) -> Arc<dyn Notifier> {
        self.notifier.clone()
    }

    /// 停用的查詢回傳 `None` 且不發出請求
    pub async fn query<T, F, Fut>(
        &self,
        key: QueryKey,
        options: QueryOptions,
        fetch: F,
    ) -> Result<Option<T>>
    where
        T: Clone + Send + Sync + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if !options.enabled {
            tracing::debug!("Query {} is disabled", key);
            return Ok(None);
        }
        self.fetch_query(key, options, fetch).await.map(Some)
    }

    pub async fn fetch_query<T, F, Fut>(
        &self,
        key: QueryKey,
        options: QueryOptions,
        fetch: F,
    ) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let requested_at = Instant::now();
        if let Some(value) = self.fresh_value::<T>(&key, |entry| entry.is_fresh(options.stale_time))
        {
            tracing::debug!("Query {} served from cache", key);
            return Ok(value);
        }

        let gate = self.gate(&key);
        let result = {
            let _guard = gate.lock().await;
            self.fetch_locked(&key, options, requested_at, fetch).await
        };
        self.release_gate(&key, gate);
        result
    }

    async fn fetch_locked<T, F, Fut>(
        &self,
        key: &QueryKey,
        options: QueryOptions,
        requested_at: Instant,
        mut fetch: F,
    ) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        // 等待期間其他呼叫者可能已經取得結果
        if let Some(value) = self.fresh_value::<T>(key, |entry| {
            !entry.invalidated
                && (entry.updated_at >= requested_at || entry.is_fresh(options.stale_time))
        }) {
            tracing::debug!("Query {} shared an in-flight result", key);
            return Ok(value);
        }

        let mut attempt = 0;
        let value = loop {
            match fetch().await {
                Ok(value) => break value,
                Err(e) if attempt < options.retry && e.is_retryable() => {
                    let delay = options
                        .retry_delay
                        .saturating_mul(2u32.saturating_pow(attempt))
                        .min(MAX_RETRY_DELAY);
                    attempt += 1;
                    tracing::warn!(
                        "🔄 Query {} failed ({}), retry {}/{} in {:?}",
                        key,
                        e,
                        attempt,
                        options.retry,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        };

        self.set_query_data(key.clone(), value.clone());
        Ok(value)
    }

    pub fn get_query_data<T: Clone + 'static>(&self, key: &QueryKey) -> Option<T> {
        self.fresh_value(key, |_| true)
    }

    pub fn set_query_data<T: Send + Sync + 'static>(&self, key: QueryKey, value: T) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                key,
                Entry {
                    value: Arc::new(value),
                    updated_at: Instant::now(),
                    invalidated: false,
                },
            );
        }
    }

    /// 讓所有以 `prefix` 開頭的查詢失效，下次查詢會重新請求；回傳受影響的數量
    pub fn invalidate_queries(&self, prefix: &QueryKey) -> usize {
        let Ok(mut entries) = self.entries.lock() else {
            return 0;
        };
        let mut count = 0;
        for (key, entry) in entries.iter_mut() {
            if key.starts_with(prefix) {
                entry.invalidated = true;
                count += 1;
            }
        }
        tracing::debug!("Invalidated {} queries under {}", count, prefix);
        count
    }

    pub fn is_invalidated(&self, key: &QueryKey) -> Option<bool> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(key).map(|entry| entry.invalidated))
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
        if let Ok(mut gates) = self.in_flight.lock() {
            gates.retain(|_, gate| Arc::strong_count(gate) > 1);
        }
    }

    /// 執行 mutation：成功時讓相關查詢失效並顯示成功訊息，失敗時顯示錯誤訊息
    ///
    /// API client 已經顯示過的錯誤不會重複顯示。
    pub async fn mutate<T, Fut>(
        &self,
        mutation: Fut,
        invalidates: &[QueryKey],
        success_message: &str,
        error_fallback: &str,
    ) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        match mutation.await {
            Ok(value) => {
                for key in invalidates {
                    self.invalidate_queries(key);
                }
                self.notifier.success(success_message);
                Ok(value)
            }
            Err(e) => {
                if !e.is_reported() {
                    self.notifier.error(&e.message_or(error_fallback));
                }
                Err(e)
            }
        }
    }

    fn fresh_value<T: Clone + 'static>(
        &self,
        key: &QueryKey,
        usable: impl Fn(&Entry) -> bool,
    ) -> Option<T> {
        let entries = self.entries.lock().ok()?;
        let entry = entries.get(key).filter(|entry| usable(entry))?;
        entry.value.downcast_ref::<T>().cloned()
    }

    fn gate(&self, key: &QueryKey) -> Arc<tokio::sync::Mutex<()>> {
        match self.in_flight.lock() {
            Ok(mut gates) => gates.entry(key.clone()).or_default().clone(),
            Err(_) => Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// 沒有其他呼叫者在等待時移除該 key 的 gate
    fn release_gate(&self, key: &QueryKey, gate: Arc<tokio::sync::Mutex<()>>) {
        let Ok(mut gates) = self.in_flight.lock() else {
            return;
        };
        // map 與 `gate` 各持有一份
        if gates
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, &gate) && Arc::strong_count(&gate) == 2)
        {
            gates.remove(key);
        }
    }

    #[cfg(test)]
    fn pending_gates(&self) -> usize {
        self.in_flight.lock().map(|gates| gates.len()).unwrap_or_default()
    }
}
