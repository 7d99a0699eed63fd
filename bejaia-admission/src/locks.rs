use chrono::NaiveDate;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Table of async mutexes keyed by string, used for (item, date) slots and
/// for submitter identities
#[derive(Default)]
pub struct KeyedLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }

    /// Drops entries nobody holds or waits on
    pub fn prune(&self) {
        self.locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

pub fn slot_key(item_id: &str, date: NaiveDate) -> String {
    format!("{}:{}", item_id, date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn kayak() -> String {
        slot_key("kayak", NaiveDate::from_ymd_opt(2030, 1, 1).unwrap())
    }

    fn plongee() -> String {
        slot_key("plongee", NaiveDate::from_ymd_opt(2030, 1, 1).unwrap())
    }

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::new());
        let guard = locks.lock(&kayak()).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(&kayak()).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        // other keys are independent
        let _other = locks.lock(&plongee()).await;

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_prune_keeps_held_entries() {
        let locks = KeyedLocks::new();
        let held = locks.lock(&kayak()).await;
        {
            let _released = locks.lock(&plongee()).await;
        }
        assert_eq!(locks.len(), 2);

        locks.prune();
        assert_eq!(locks.len(), 1);

        drop(held);
        locks.prune();
        assert!(locks.is_empty());
    }

    #[test]
    fn test_slot_key_layout() {
        assert_eq!(kayak(), "kayak:2030-01-01");
    }
}
