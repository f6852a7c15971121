//! Expected ledger state and in-flight transactions.

use std::collections::{BTreeMap, BTreeSet};

use sdk::TransactionId;

use crate::error::Mismatch;

/// The harness's prediction of the ledger's key/value state.
///
/// Updates are applied when an operation is submitted, before it commits.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShadowState {
    values: BTreeMap<String, i64>,
}

impl ShadowState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: i64) {
        self.values.insert(key.to_string(), value);
    }

    /// Adds `delta` to `key`, treating an absent key as zero.
    pub fn add(&mut self, key: &str, delta: i64) {
        *self.values.entry(key.to_string()).or_default() += delta;
    }

    pub fn get(&self, key: &str) -> Option<i64> {
        self.values.get(key).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Every key whose value in `actual` differs from the prediction.
    /// Keys the ledger holds but the shadow does not are ignored.
    pub fn diff(&self, actual: &BTreeMap<String, i64>) -> Vec<Mismatch> {
        self.values
            .iter()
            .filter_map(|(key, &expected)| {
                let actual = actual.get(key).copied();
                (actual != Some(expected)).then(|| Mismatch {
                    key: key.clone(),
                    expected,
                    actual,
                })
            })
            .collect()
    }
}

/// Submitted transactions not yet confirmed committed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingTransactions {
    ids: BTreeSet<TransactionId>,
}

impl PendingTransactions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: TransactionId) {
        self.ids.insert(id);
    }

    pub fn confirm(&mut self, id: &TransactionId) -> bool {
        self.ids.remove(id)
    }

    pub fn ids(&self) -> Vec<TransactionId> {
        self.ids.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u8) -> TransactionId {
        TransactionId::from_hex(&format!("{n:032x}")).unwrap()
    }

    #[test]
    fn shadow_tracks_set_and_deltas() {
        let mut shadow = ShadowState::new();
        shadow.set("1", 10);
        shadow.add("1", 2);
        shadow.add("1", -1);
        shadow.add("2", 5);

        assert_eq!(shadow.get("1"), Some(11));
        assert_eq!(shadow.get("2"), Some(5));
        assert_eq!(shadow.keys().collect::<Vec<_>>(), vec!["1", "2"]);
    }

    #[test]
    fn diff_reports_wrong_and_missing_keys() {
        let mut shadow = ShadowState::new();
        shadow.set("1", 10);
        shadow.set("2", 20);
        shadow.set("3", 30);
        let actual = BTreeMap::from([
            ("1".to_string(), 10),
            ("2".to_string(), 21),
            ("extra".to_string(), 1),
        ]);

        let mismatches = shadow.diff(&actual);

        assert_eq!(
            mismatches,
            vec![
                Mismatch {
                    key: "2".into(),
                    expected: 20,
                    actual: Some(21)
                },
                Mismatch {
                    key: "3".into(),
                    expected: 30,
                    actual: None
                },
            ]
        );
        assert_eq!(mismatches[1].to_string(), "key \"3\": expected 30, key missing");
    }

    #[test]
    fn pending_confirms_once() {
        let mut pending = PendingTransactions::new();
        pending.insert(id(1));
        pending.insert(id(2));
        pending.insert(id(1));
        assert_eq!(pending.len(), 2);

        assert!(pending.confirm(&id(1)));
        assert!(!pending.confirm(&id(1)));
        assert_eq!(pending.ids(), vec![id(2)]);
    }
}
