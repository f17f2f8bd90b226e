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

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    Client, Collection, Database,
    bson::{Document, doc, oid::ObjectId},
    options::ReturnDocument,
};
use snafu::ResultExt;
use tracing::info;

use super::{DocumentBackend, Page};
use crate::{
    error::{MongoSnafu, Result},
    model::Record,
};

/// MongoDB-backed store. The driver's client pools connections internally,
/// so one instance is shared by every request.
#[derive(Clone, Debug)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub async fn connect(url: &str, db_name: &str) -> Result<Self> {
        let client = Client::with_uri_str(url).await.context(MongoSnafu)?;
        let db = client.database(db_name);
        db.run_command(doc! { "ping": 1 }).await.context(MongoSnafu)?;
        info!(database = db_name, "connected to mongodb");
        Ok(Self { db })
    }

    fn collection<R: Record>(&self) -> Collection<R> { self.db.collection(R::COLLECTION) }
}

#[async_trait]
impl DocumentBackend for MongoStore {
    async fn insert<R: Record>(&self, record: &R) -> Result<()> {
        self.collection::<R>()
            .insert_one(record)
            .await
            .context(MongoSnafu)?;
        Ok(())
    }

    async fn find_one<R: Record>(&self, id: ObjectId) -> Result<Option<R>> {
        self.collection::<R>()
            .find_one(doc! { "_id": id })
            .await
            .context(MongoSnafu)
    }

    async fn update<R: Record>(&self, id: ObjectId, changes: Document) -> Result<Option<R>> {
        self.collection::<R>()
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": changes })
            .return_document(ReturnDocument::After)
            .await
            .context(MongoSnafu)
    }

    async fn delete<R: Record>(&self, id: ObjectId) -> Result<bool> {
        let result = self
            .collection::<R>()
            .delete_one(doc! { "_id": id })
            .await
            .context(MongoSnafu)?;
        Ok(result.deleted_count > 0)
    }

    async fn find_many<R: Record>(&self, filter: Document, page: Page) -> Result<Vec<R>> {
        let collection = self.collection::<R>();
        let mut find = collection
            .find(filter)
            .sort(doc! { "_id": 1 })
            .skip(page.skip());
        if let Some(limit) = page.take() {
            find = find.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        let cursor = find.await.context(MongoSnafu)?;
        cursor.try_collect().await.context(MongoSnafu)
    }
}
