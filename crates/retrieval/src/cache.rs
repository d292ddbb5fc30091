//! Bounded memo of query → value.
//!
//! Keys are normalized (trimmed, lowercased, inner whitespace collapsed).
//! When full, the oldest inserted key is evicted.

use std::collections::{HashMap, VecDeque};

use tokio::sync::Mutex;

pub struct QueryCache<V> {
    capacity: usize,
    inner: Mutex<Entries<V>>,
}

struct Entries<V> {
    values: HashMap<String, V>,
    order: VecDeque<String>,
}

impl<V: Clone> QueryCache<V> {
    /// A capacity of 0 disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Entries {
                values: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    pub async fn get(&self, query: &str) -> Option<V> {
        let entries = self.inner.lock().await;
        entries.values.get(&normalize(query)).cloned()
    }

    pub async fn insert(&self, query: &str, value: V) {
        if self.capacity == 0 {
            return;
        }
        let key = normalize(query);
        let mut entries = self.inner.lock().await;
        if entries.values.insert(key.clone(), value).is_some() {
            return;
        }
        entries.order.push_back(key);
        while entries.order.len() > self.capacity {
            if let Some(oldest) = entries.order.pop_front() {
                entries.values.remove(&oldest);
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.values.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn normalize(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
