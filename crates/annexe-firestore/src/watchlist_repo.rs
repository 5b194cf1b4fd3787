//! Watchlist repository.

use std::collections::HashMap;

use annexe_models::{AuctionId, UserId, WatchlistEntry};
use tracing::warn;

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{
    require_field, CollectionSelector, Document, Filter, StructuredQuery, ToFirestoreValue, Value,
};

const COLLECTION: &str = "watchlists";

/// Repository over the `watchlists` collection.
#[derive(Clone)]
pub struct WatchlistRepository {
    client: FirestoreClient,
}

impl WatchlistRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    pub async fn create(&self, entry: &WatchlistEntry) -> FirestoreResult<()> {
        self.client
            .create_document(COLLECTION, &entry.id, entry_to_fields(entry))
            .await?;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> FirestoreResult<Option<WatchlistEntry>> {
        match self.client.get_document(COLLECTION, id).await? {
            Some(doc) => Ok(Some(document_to_entry(&doc)?)),
            None => Ok(None),
        }
    }

    /// Existing entry for a (user, auction) pair, if any. Backs the
    /// duplicate-subscription check.
    pub async fn find_pair(
        &self,
        user_id: &UserId,
        auction_id: &AuctionId,
    ) -> FirestoreResult<Option<WatchlistEntry>> {
        let query = self.base_query(
            Filter::and(vec![
                Filter::field(
                    "userId",
                    "EQUAL",
                    Value::StringValue(user_id.as_str().to_string()),
                ),
                Filter::field(
                    "auctionId",
                    "EQUAL",
                    Value::StringValue(auction_id.as_str().to_string()),
                ),
            ]),
            Some(1),
        );

        let docs = self.client.run_query(query).await?;
        match docs.first() {
            Some(doc) => Ok(Some(document_to_entry(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn list_for_user(&self, user_id: &UserId) -> FirestoreResult<Vec<WatchlistEntry>> {
        let query = self.base_query(
            Filter::field(
                "userId",
                "EQUAL",
                Value::StringValue(user_id.as_str().to_string()),
            ),
            None,
        );
        self.run_entries(query).await
    }

    /// Every watcher of one auction, for lifecycle notification fan-out.
    pub async fn list_for_auction(
        &self,
        auction_id: &AuctionId,
    ) -> FirestoreResult<Vec<WatchlistEntry>> {
        let query = self.base_query(
            Filter::field(
                "auctionId",
                "EQUAL",
                Value::StringValue(auction_id.as_str().to_string()),
            ),
            None,
        );
        self.run_entries(query).await
    }

    pub async fn delete(&self, id: &str) -> FirestoreResult<()> {
        self.client.delete_document(COLLECTION, id).await
    }

    fn base_query(&self, filter: Filter, limit: Option<i32>) -> StructuredQuery {
        StructuredQuery {
            from: vec![CollectionSelector {
                collection_id: COLLECTION.to_string(),
                all_descendants: None,
            }],
            r#where: Some(filter),
            order_by: None,
            limit,
        }
    }

    async fn run_entries(&self, query: StructuredQuery) -> FirestoreResult<Vec<WatchlistEntry>> {
        let docs = self.client.run_query(query).await?;
        let mut entries = Vec::new();
        for doc in &docs {
            match document_to_entry(doc) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(doc = ?doc.name, "Skipping unparseable watchlist entry: {}", e),
            }
        }
        Ok(entries)
    }
}

fn entry_to_fields(entry: &WatchlistEntry) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("userId".into(), entry.user_id.as_str().to_firestore_value());
    fields.insert(
        "auctionId".into(),
        entry.auction_id.as_str().to_firestore_value(),
    );
    fields.insert("createdAt".into(), entry.created_at.to_firestore_value());
    fields
}

fn document_to_entry(doc: &Document) -> FirestoreResult<WatchlistEntry> {
    let id = doc
        .doc_id()
        .ok_or_else(|| FirestoreError::invalid_document("watchlist document has no name"))?;
    let fields = doc
        .fields
        .as_ref()
        .ok_or_else(|| FirestoreError::invalid_document("watchlist document has no fields"))?;
    Ok(WatchlistEntry {
        id: id.to_string(),
        user_id: UserId::from_string(require_field::<String>(fields, "userId")?),
        auction_id: AuctionId::from_string(require_field::<String>(fields, "auctionId")?),
        created_at: require_field(fields, "createdAt")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_fields_round_trip() {
        let entry = WatchlistEntry::new(UserId::from("u1"), AuctionId::from("a1"));
        let doc = Document {
            name: Some(format!(
                "projects/p/databases/d/documents/watchlists/{}",
                entry.id
            )),
            fields: Some(entry_to_fields(&entry)),
            create_time: None,
            update_time: None,
        };
        let parsed = document_to_entry(&doc).unwrap();
        assert_eq!(parsed.id, entry.id);
        assert_eq!(parsed.user_id, entry.user_id);
        assert_eq!(parsed.auction_id, entry.auction_id);
    }
}
