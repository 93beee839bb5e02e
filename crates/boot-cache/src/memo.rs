use crate::util::now_millis;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug)]
pub struct MemoPolicy {
    /// How long a computed value may be served, measured from when it was computed.
    pub ttl_millis: u64,
    /// Entry cap; the oldest entries are dropped first once exceeded.
    pub max_entries: usize,
}

impl Default for MemoPolicy {
    fn default() -> Self {
        Self {
            ttl_millis: 10 * 1000,
            max_entries: 1024,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct MemoKey {
    operation: &'static str,
    args: String,
}

#[derive(Debug)]
struct MemoEntry<V> {
    value: V,
    computed_at_millis: u64,
}

/// Small result cache keyed by operation name plus a rendering of its arguments.
///
/// Values are computed outside the lock, so two callers racing on a cold key may both
/// compute; the later insert wins.
#[derive(Debug)]
pub struct MemoCache<V> {
    policy: MemoPolicy,
    entries: Mutex<HashMap<MemoKey, MemoEntry<V>>>,
}

impl<V: Clone> MemoCache<V> {
    pub fn new(policy: MemoPolicy) -> Self {
        Self {
            policy,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, operation: &'static str, args: &str) -> Option<V> {
        self.get_at(operation, args, now_millis())
    }

    fn get_at(&self, operation: &'static str, args: &str, now: u64) -> Option<V> {
        let key = MemoKey {
            operation,
            args: args.to_string(),
        };
        let mut entries = self.entries.lock();
        let entry = entries.get(&key)?;
        if now.saturating_sub(entry.computed_at_millis) > self.policy.ttl_millis {
            entries.remove(&key);
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn insert(&self, operation: &'static str, args: impl Into<String>, value: V) {
        self.insert_at(operation, args.into(), value, now_millis());
    }

    fn insert_at(&self, operation: &'static str, args: String, value: V, now: u64) {
        let mut entries = self.entries.lock();
        entries.insert(
            MemoKey { operation, args },
            MemoEntry {
                value,
                computed_at_millis: now,
            },
        );

        if entries.len() > self.policy.max_entries {
            let ttl = self.policy.ttl_millis;
            entries.retain(|_, entry| now.saturating_sub(entry.computed_at_millis) <= ttl);
        }
        while entries.len() > self.policy.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.computed_at_millis)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    entries.remove(&key);
                }
                None => break,
            }
        }
    }

    pub fn get_or_insert_with(
        &self,
        operation: &'static str,
        args: &str,
        compute: impl FnOnce() -> V,
    ) -> V {
        if let Some(value) = self.get(operation, args) {
            return value;
        }
        let value = compute();
        self.insert(operation, args, value.clone());
        value
    }

    /// Like [`Self::get_or_insert_with`], but errors are returned and not cached.
    pub fn get_or_try_insert_with<E>(
        &self,
        operation: &'static str,
        args: &str,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(value) = self.get(operation, args) {
            return Ok(value);
        }
        let value = compute()?;
        self.insert(operation, args, value.clone());
        Ok(value)
    }

    pub fn invalidate(&self, operation: &'static str, args: &str) {
        self.entries.lock().remove(&MemoKey {
            operation,
            args: args.to_string(),
        });
    }

    pub fn invalidate_operation(&self, operation: &'static str) {
        self.entries
            .lock()
            .retain(|key, _| key.operation != operation);
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
