//! In-memory collection
//!
//! Test/tooling implementation of the persistence port. Documents are
//! held as bson `Document`s in a concurrent map, and the supported
//! filter subset (equality, `$in`, `$ne`, `$exists`) and patch subset
//! (`$set`, `$inc`, `$unset`) are evaluated directly, so engine code
//! runs unchanged against either backend.

use std::marker::PhantomData;

use async_trait::async_trait;
use bson::{Bson, Document};
use dashmap::DashMap;

use crate::db::store::{Collection, DocSchema};
use crate::types::{CardwayError, Result};

/// In-memory implementation of [`Collection`]
pub struct MemoryCollection<T: DocSchema> {
    docs: DashMap<String, Document>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DocSchema> MemoryCollection<T> {
    pub fn new() -> Self {
        Self {
            docs: DashMap::new(),
            _marker: PhantomData,
        }
    }

    /// Ids of matching documents, sorted for deterministic iteration
    fn matching_ids(&self, filter: &Document) -> Vec<String> {
        let mut ids: Vec<String> = self
            .docs
            .iter()
            .filter(|entry| matches_filter(entry.value(), filter))
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }

    fn decode(&self, doc: Document) -> Result<T> {
        bson::from_document(doc)
            .map_err(|e| CardwayError::Database(format!("Decode failed: {}", e)))
    }
}

impl<T: DocSchema> Default for MemoryCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: DocSchema> Collection<T> for MemoryCollection<T> {
    async fn find_by_id(&self, id: &str) -> Result<Option<T>> {
        match self.docs.get(id) {
            Some(doc) => Ok(Some(self.decode(doc.value().clone())?)),
            None => Ok(None),
        }
    }

    async fn find_one(&self, filter: Document) -> Result<Option<T>> {
        match self.matching_ids(&filter).first() {
            Some(id) => self.find_by_id(id).await,
            None => Ok(None),
        }
    }

    async fn find_many(&self, filter: Document) -> Result<Vec<T>> {
        let mut out = Vec::new();
        for id in self.matching_ids(&filter) {
            if let Some(doc) = self.docs.get(&id) {
                out.push(self.decode(doc.value().clone())?);
            }
        }
        Ok(out)
    }

    async fn insert_one(&self, mut item: T) -> Result<String> {
        let metadata = item.mut_metadata();
        metadata.created_at = Some(bson::DateTime::now());
        metadata.updated_at = Some(bson::DateTime::now());

        let id = item.id().to_string();
        if self.docs.contains_key(&id) {
            return Err(CardwayError::Database(format!("duplicate id {id}")));
        }

        let doc = bson::to_document(&item)
            .map_err(|e| CardwayError::Database(format!("Encode failed: {}", e)))?;
        self.docs.insert(id.clone(), doc);
        Ok(id)
    }

    async fn update_one(&self, filter: Document, update: Document) -> Result<u64> {
        match self.matching_ids(&filter).first() {
            Some(id) => {
                if let Some(mut entry) = self.docs.get_mut(id) {
                    apply_update(entry.value_mut(), &update)?;
                }
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn update_many(&self, filter: Document, update: Document) -> Result<u64> {
        let ids = self.matching_ids(&filter);
        for id in &ids {
            if let Some(mut entry) = self.docs.get_mut(id) {
                apply_update(entry.value_mut(), &update)?;
            }
        }
        Ok(ids.len() as u64)
    }

    async fn delete_one(&self, filter: Document) -> Result<u64> {
        match self.matching_ids(&filter).first() {
            Some(id) => {
                self.docs.remove(id);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_many(&self, filter: Document) -> Result<u64> {
        let ids = self.matching_ids(&filter);
        for id in &ids {
            self.docs.remove(id);
        }
        Ok(ids.len() as u64)
    }
}

/// Field lookup; a missing field reads as `Null`, matching how the
/// engine's equality and `$ne` filters treat absent optional fields.
fn field_value(doc: &Document, key: &str) -> Bson {
    doc.get(key).cloned().unwrap_or(Bson::Null)
}

/// Evaluate the supported filter subset against a document
fn matches_filter(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, condition)| match condition {
        Bson::Document(ops) if is_operator_doc(ops) => {
            ops.iter().all(|(op, operand)| {
                let value = field_value(doc, key);
                match op.as_str() {
                    "$in" => match operand {
                        Bson::Array(candidates) => candidates.contains(&value),
                        _ => false,
                    },
                    "$ne" => value != *operand,
                    "$exists" => {
                        let exists = doc.contains_key(key);
                        matches!(operand, Bson::Boolean(want) if *want == exists)
                    }
                    _ => false,
                }
            })
        }
        expected => field_value(doc, key) == *expected,
    })
}

fn is_operator_doc(doc: &Document) -> bool {
    doc.keys().any(|k| k.starts_with('$'))
}

/// Apply the supported patch subset to a document in place
fn apply_update(doc: &mut Document, update: &Document) -> Result<()> {
    for (op, operand) in update.iter() {
        let fields = match operand {
            Bson::Document(fields) => fields,
            _ => {
                return Err(CardwayError::Database(format!(
                    "unsupported update operand for {op}"
                )))
            }
        };

        match op.as_str() {
            "$set" => {
                for (k, v) in fields.iter() {
                    doc.insert(k.clone(), v.clone());
                }
            }
            "$inc" => {
                for (k, v) in fields.iter() {
                    let current = field_value(doc, k);
                    doc.insert(k.clone(), numeric_add(&current, v)?);
                }
            }
            "$unset" => {
                for (k, _) in fields.iter() {
                    doc.remove(k);
                }
            }
            other => {
                return Err(CardwayError::Database(format!(
                    "unsupported update operator {other}"
                )))
            }
        }
    }
    Ok(())
}

/// Add two bson numbers, widening ints and falling back to doubles
fn numeric_add(current: &Bson, delta: &Bson) -> Result<Bson> {
    fn as_i64(b: &Bson) -> Option<i64> {
        match b {
            Bson::Int32(v) => Some(*v as i64),
            Bson::Int64(v) => Some(*v),
            Bson::Null => Some(0),
            _ => None,
        }
    }
    fn as_f64(b: &Bson) -> Option<f64> {
        match b {
            Bson::Double(v) => Some(*v),
            Bson::Int32(v) => Some(*v as f64),
            Bson::Int64(v) => Some(*v as f64),
            Bson::Null => Some(0.0),
            _ => None,
        }
    }

    if let (Some(a), Some(b)) = (as_i64(current), as_i64(delta)) {
        return Ok(Bson::Int64(a + b));
    }
    match (as_f64(current), as_f64(delta)) {
        (Some(a), Some(b)) => Ok(Bson::Double(a + b)),
        _ => Err(CardwayError::Database(
            "cannot $inc a non-numeric field".to_string(),
        )),
    }
}
