// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use mongodb::bson::{self, Bson, Document, oid::ObjectId};
use snafu::ResultExt;
use tokio::sync::RwLock;

use super::{DocumentBackend, Page};
use crate::{
    error::{DecodeDocumentSnafu, EncodeDocumentSnafu, Result},
    model::Record,
};

/// Documents held in process memory, one insertion-ordered list per
/// collection. Records round-trip through BSON exactly as they would in
/// MongoDB, so field names and `$set` behaviour match.
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<&'static str, Vec<Document>>>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.as_document()?.get(part)?;
    }
    Some(current)
}

fn matches(doc: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(path, expected)| lookup(doc, path) == Some(expected))
}

fn has_id(doc: &Document, id: ObjectId) -> bool { doc.get_object_id("_id").ok() == Some(id) }

fn decode<R: Record>(doc: Document) -> Result<R> {
    bson::from_document(doc).context(DecodeDocumentSnafu)
}

#[async_trait]
impl DocumentBackend for MemoryStore {
    async fn insert<R: Record>(&self, record: &R) -> Result<()> {
        let doc = bson::to_document(record).context(EncodeDocumentSnafu)?;
        self.collections
            .write()
            .await
            .entry(R::COLLECTION)
            .or_default()
            .push(doc);
        Ok(())
    }

    async fn find_one<R: Record>(&self, id: ObjectId) -> Result<Option<R>> {
        let collections = self.collections.read().await;
        collections
            .get(R::COLLECTION)
            .and_then(|docs| docs.iter().find(|doc| has_id(doc, id)))
            .cloned()
            .map(decode)
            .transpose()
    }

    async fn update<R: Record>(&self, id: ObjectId, changes: Document) -> Result<Option<R>> {
        let mut collections = self.collections.write().await;
        let Some(doc) = collections
            .get_mut(R::COLLECTION)
            .and_then(|docs| docs.iter_mut().find(|doc| has_id(doc, id)))
        else {
            return Ok(None);
        };
        for (field, value) in changes {
            doc.insert(field, value);
        }
        decode(doc.clone()).map(Some)
    }

    async fn delete<R: Record>(&self, id: ObjectId) -> Result<bool> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(R::COLLECTION) else {
            return Ok(false);
        };
        match docs.iter().position(|doc| has_id(doc, id)) {
            Some(index) => {
                docs.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_many<R: Record>(&self, filter: Document, page: Page) -> Result<Vec<R>> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(R::COLLECTION) else {
            return Ok(Vec::new());
        };
        let skip = usize::try_from(page.skip()).unwrap_or(usize::MAX);
        let take = page
            .take()
            .map_or(usize::MAX, |n| usize::try_from(n).unwrap_or(usize::MAX));
        docs.iter()
            .filter(|doc| matches(doc, &filter))
            .skip(skip)
            .take(take)
            .cloned()
            .map(decode)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::doc;

    use super::*;

    #[test]
    fn test_dotted_lookup() {
        let doc = doc! { "location": { "city": "Tashkent", "country": "UZ" }, "price": 15.0 };
        assert!(matches(&doc, &doc! { "location.city": "Tashkent" }));
        assert!(matches(&doc, &doc! { "price": 15.0, "location.country": "UZ" }));
        assert!(!matches(&doc, &doc! { "location.city": "Bukhara" }));
        assert!(!matches(&doc, &doc! { "price.amount": 15.0 }));
        assert!(matches(&doc, &Document::new()));
    }
}
