//! Caller-side memoization. The engine recomputes on every call; a renderer
//! that re-asks for the same layout on every frame keeps a [`LayoutMemo`].

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;
use serde_json::Value;

use super::error::LayoutError;
use super::{PackedLayout, compute_layout};
use crate::config::LayoutConfig;
use crate::ir::CircleRecord;

/// 64-bit FxHash of the records and configuration. The algorithm is fixed,
/// so equal input hashes equally across runs and builds. Record order
/// matters, since it decides sibling order for equal weights.
pub fn fingerprint(records: &[CircleRecord], config: &LayoutConfig) -> u64 {
    let mut hasher = FxHasher::default();
    records.len().hash(&mut hasher);
    for record in records {
        record.id.hash(&mut hasher);
        record.parent_id.hash(&mut hasher);
        record.name.hash(&mut hasher);
        record.member_count.hash(&mut hasher);
        record.role_count.hash(&mut hasher);
        record.roles.len().hash(&mut hasher);
        for role in &record.roles {
            role.id.hash(&mut hasher);
            role.name.hash(&mut hasher);
            role.status.hash(&mut hasher);
        }
    }
    match serde_json::to_value(config) {
        Ok(value) => hash_value(&value, &mut hasher),
        Err(_) => 0u8.hash(&mut hasher),
    }
    hasher.finish()
}

fn hash_value<H: Hasher>(value: &Value, hasher: &mut H) {
    match value {
        Value::Null => 0u8.hash(hasher),
        Value::Bool(flag) => flag.hash(hasher),
        Value::Number(number) => number.as_f64().map(f64::to_bits).hash(hasher),
        Value::String(text) => text.hash(hasher),
        Value::Array(items) => {
            items.len().hash(hasher);
            for item in items {
                hash_value(item, hasher);
            }
        }
        Value::Object(fields) => {
            fields.len().hash(hasher);
            for (key, field) in fields {
                key.hash(hasher);
                hash_value(field, hasher);
            }
        }
    }
}

/// Holds the most recent layout and the fingerprint it was computed from.
#[derive(Debug, Default)]
pub struct LayoutMemo {
    entry: Option<(u64, PackedLayout)>,
}

impl LayoutMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute(
        &mut self,
        records: &[CircleRecord],
        config: &LayoutConfig,
    ) -> Result<&PackedLayout, LayoutError> {
        let key = fingerprint(records, config);
        if !matches!(&self.entry, Some((cached, _)) if *cached == key) {
            self.entry = None;
        }
        let (_, layout) = match self.entry.take() {
            Some(entry) => self.entry.insert(entry),
            None => self.entry.insert((key, compute_layout(records, config)?)),
        };
        Ok(layout)
    }

    pub fn is_cached(&self, records: &[CircleRecord], config: &LayoutConfig) -> bool {
        let key = fingerprint(records, config);
        matches!(&self.entry, Some((cached, _)) if *cached == key)
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }
}
