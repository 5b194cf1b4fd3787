//! Auction repository.
//!
//! Bid application and status transitions go through masked writes
//! preconditioned on the document's updateTime, so two racing writers
//! cannot both land on the same snapshot.

use std::collections::HashMap;

use annexe_models::{Auction, AuctionId, AuctionStatus, Bid, UserId};
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{
    array_field, map_fields, optional_field, require_field, CollectionSelector, Document, Filter,
    FromFirestoreValue, MapValue, StructuredQuery, ToFirestoreValue, Value,
};

const COLLECTION: &str = "auctions";
const LIST_PAGE_SIZE: u32 = 300;

/// An auction together with its store version token.
#[derive(Debug, Clone)]
pub struct VersionedAuction {
    pub auction: Auction,
    /// Firestore updateTime; pass back to conditional writes.
    pub version: String,
}

/// Repository over the `auctions` collection.
#[derive(Clone)]
pub struct AuctionRepository {
    client: FirestoreClient,
}

impl AuctionRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// Persist a freshly created auction.
    pub async fn create(&self, auction: &Auction) -> FirestoreResult<()> {
        let fields = auction_to_fields(auction);
        self.client
            .create_document(COLLECTION, auction.id.as_str(), fields)
            .await?;
        Ok(())
    }

    /// Fetch one auction.
    pub async fn get(&self, id: &AuctionId) -> FirestoreResult<Option<Auction>> {
        Ok(self.get_versioned(id).await?.map(|v| v.auction))
    }

    /// Fetch one auction with its version token.
    pub async fn get_versioned(&self, id: &AuctionId) -> FirestoreResult<Option<VersionedAuction>> {
        match self.client.get_document(COLLECTION, id.as_str()).await? {
            Some(doc) => Ok(Some(versioned_from_document(doc)?)),
            None => Ok(None),
        }
    }

    /// Fetch every auction, paging through the collection.
    pub async fn list_all(&self) -> FirestoreResult<Vec<Auction>> {
        let mut auctions = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_documents(COLLECTION, Some(LIST_PAGE_SIZE), page_token.as_deref())
                .await?;

            for doc in page.documents.into_iter().flatten() {
                match document_to_auction(&doc) {
                    Ok(auction) => auctions.push(auction),
                    Err(e) => warn!(doc = ?doc.name, "Skipping unparseable auction: {}", e),
                }
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(auctions)
    }

    /// Rewrite the creator-editable fields, guarded by the version token.
    pub async fn update_details(
        &self,
        auction: &Auction,
        version: &str,
    ) -> FirestoreResult<Auction> {
        let mut fields = HashMap::new();
        fields.insert(
            "productName".into(),
            auction.product_name.to_firestore_value(),
        );
        fields.insert(
            "description".into(),
            auction.description.to_firestore_value(),
        );
        fields.insert(
            "startingPrice".into(),
            auction.starting_price.to_firestore_value(),
        );
        fields.insert("startDate".into(), auction.start_date.to_firestore_value());
        fields.insert("endDate".into(), auction.end_date.to_firestore_value());
        fields.insert("mainImage".into(), auction.main_image.to_firestore_value());
        fields.insert("images".into(), auction.images.to_firestore_value());
        fields.insert("updatedAt".into(), Utc::now().to_firestore_value());

        let mask = fields.keys().cloned().collect();
        let doc = self
            .client
            .update_document_with_precondition(
                COLLECTION,
                auction.id.as_str(),
                fields,
                Some(mask),
                Some(version),
            )
            .await?;
        document_to_auction(&doc)
    }

    /// Append an accepted bid and mirror it into `winningBid`, conditioned
    /// on the snapshot version the validation ran against.
    pub async fn apply_bid(
        &self,
        id: &AuctionId,
        bids: &[Bid],
        winning_bid: &Bid,
        version: &str,
    ) -> FirestoreResult<Auction> {
        let mut fields = HashMap::new();
        fields.insert(
            "bids".into(),
            Value::ArrayValue(crate::types::ArrayValue {
                values: Some(bids.iter().map(bid_to_value).collect()),
            }),
        );
        fields.insert("winningBid".into(), bid_to_value(winning_bid));
        fields.insert("updatedAt".into(), Utc::now().to_firestore_value());

        let mask = vec![
            "bids".to_string(),
            "winningBid".to_string(),
            "updatedAt".to_string(),
        ];
        let doc = self
            .client
            .update_document_with_precondition(
                COLLECTION,
                id.as_str(),
                fields,
                Some(mask),
                Some(version),
            )
            .await?;
        document_to_auction(&doc)
    }

    /// Move an auction to a new status, conditioned on the version token.
    ///
    /// A lost precondition means another sweep already moved it; callers
    /// treat that as already-done.
    pub async fn transition_status(
        &self,
        id: &AuctionId,
        status: AuctionStatus,
        version: &str,
    ) -> FirestoreResult<Auction> {
        let mut fields = HashMap::new();
        fields.insert("status".into(), status.as_str().to_firestore_value());
        fields.insert("updatedAt".into(), Utc::now().to_firestore_value());

        let mask = vec!["status".to_string(), "updatedAt".to_string()];
        let doc = self
            .client
            .update_document_with_precondition(
                COLLECTION,
                id.as_str(),
                fields,
                Some(mask),
                Some(version),
            )
            .await?;
        document_to_auction(&doc)
    }

    /// Remove an auction document.
    pub async fn delete(&self, id: &AuctionId) -> FirestoreResult<()> {
        self.client.delete_document(COLLECTION, id.as_str()).await
    }

    /// NOT_STARTED auctions whose start boundary has passed.
    pub async fn list_due_to_start(
        &self,
        now: DateTime<Utc>,
    ) -> FirestoreResult<Vec<VersionedAuction>> {
        self.query_status_boundary(AuctionStatus::NotStarted, "startDate", now)
            .await
    }

    /// ONGOING auctions whose end boundary has passed.
    pub async fn list_due_to_end(
        &self,
        now: DateTime<Utc>,
    ) -> FirestoreResult<Vec<VersionedAuction>> {
        self.query_status_boundary(AuctionStatus::Ongoing, "endDate", now)
            .await
    }

    async fn query_status_boundary(
        &self,
        status: AuctionStatus,
        date_field: &str,
        now: DateTime<Utc>,
    ) -> FirestoreResult<Vec<VersionedAuction>> {
        let query = StructuredQuery {
            from: vec![CollectionSelector {
                collection_id: COLLECTION.to_string(),
                all_descendants: None,
            }],
            r#where: Some(Filter::and(vec![
                Filter::field(
                    "status",
                    "EQUAL",
                    Value::StringValue(status.as_str().to_string()),
                ),
                Filter::field(
                    date_field,
                    "LESS_THAN_OR_EQUAL",
                    now.to_firestore_value(),
                ),
            ])),
            order_by: None,
            limit: None,
        };

        let docs = self.client.run_query(query).await?;
        let mut due = Vec::new();
        for doc in docs {
            match versioned_from_document(doc) {
                Ok(v) => due.push(v),
                Err(e) => warn!("Skipping unparseable auction in sweep: {}", e),
            }
        }
        Ok(due)
    }
}

// ============================================================================
// Conversions
// ============================================================================

fn auction_to_fields(auction: &Auction) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert(
        "productName".into(),
        auction.product_name.to_firestore_value(),
    );
    fields.insert(
        "description".into(),
        auction.description.to_firestore_value(),
    );
    fields.insert(
        "creatorId".into(),
        auction.creator_id.as_str().to_firestore_value(),
    );
    fields.insert(
        "startingPrice".into(),
        auction.starting_price.to_firestore_value(),
    );
    fields.insert("startDate".into(), auction.start_date.to_firestore_value());
    fields.insert("endDate".into(), auction.end_date.to_firestore_value());
    fields.insert("mainImage".into(), auction.main_image.to_firestore_value());
    fields.insert("images".into(), auction.images.to_firestore_value());
    fields.insert(
        "status".into(),
        auction.status.as_str().to_firestore_value(),
    );
    fields.insert(
        "bids".into(),
        Value::ArrayValue(crate::types::ArrayValue {
            values: Some(auction.bids.iter().map(bid_to_value).collect()),
        }),
    );
    if let Some(winning) = &auction.winning_bid {
        fields.insert("winningBid".into(), bid_to_value(winning));
    }
    fields.insert("createdAt".into(), auction.created_at.to_firestore_value());
    fields.insert("updatedAt".into(), auction.updated_at.to_firestore_value());
    fields
}

fn bid_to_value(bid: &Bid) -> Value {
    let mut fields = HashMap::new();
    fields.insert(
        "bidOwner".to_string(),
        bid.bid_owner.as_str().to_firestore_value(),
    );
    fields.insert("amount".to_string(), bid.amount.to_firestore_value());
    fields.insert("createdAt".to_string(), bid.created_at.to_firestore_value());
    Value::MapValue(MapValue {
        fields: Some(fields),
    })
}

fn value_to_bid(value: &Value) -> FirestoreResult<Bid> {
    let fields = map_fields(value)
        .ok_or_else(|| FirestoreError::invalid_document("bid is not a map value"))?;
    Ok(Bid {
        bid_owner: UserId::from_string(require_field::<String>(fields, "bidOwner")?),
        amount: require_field(fields, "amount")?,
        created_at: require_field(fields, "createdAt")?,
    })
}

fn versioned_from_document(doc: Document) -> FirestoreResult<VersionedAuction> {
    let version = doc
        .update_time
        .clone()
        .ok_or_else(|| FirestoreError::invalid_document("auction document has no updateTime"))?;
    let auction = document_to_auction(&doc)?;
    Ok(VersionedAuction { auction, version })
}

fn document_to_auction(doc: &Document) -> FirestoreResult<Auction> {
    let id = doc
        .doc_id()
        .ok_or_else(|| FirestoreError::invalid_document("auction document has no name"))?;
    let fields = doc
        .fields
        .as_ref()
        .ok_or_else(|| FirestoreError::invalid_document("auction document has no fields"))?;

    let status: String = require_field(fields, "status")?;
    let status: AuctionStatus = status
        .parse()
        .map_err(FirestoreError::invalid_document)?;

    let mut bids = Vec::new();
    for value in array_field(fields, "bids") {
        bids.push(value_to_bid(value)?);
    }

    let winning_bid = match fields.get("winningBid") {
        Some(Value::NullValue(())) | None => None,
        Some(value) => Some(value_to_bid(value)?),
    };

    Ok(Auction {
        id: AuctionId::from_string(id),
        product_name: require_field(fields, "productName")?,
        description: require_field(fields, "description")?,
        creator_id: UserId::from_string(require_field::<String>(fields, "creatorId")?),
        starting_price: require_field(fields, "startingPrice")?,
        start_date: require_field(fields, "startDate")?,
        end_date: require_field(fields, "endDate")?,
        main_image: optional_field(fields, "mainImage"),
        images: array_field(fields, "images")
            .into_iter()
            .filter_map(String::from_firestore_value)
            .collect(),
        status,
        bids,
        winning_bid,
        created_at: require_field(fields, "createdAt")?,
        updated_at: require_field(fields, "updatedAt")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_auction() -> Auction {
        let now = Utc::now();
        let mut auction = Auction::new(
            UserId::from("creator-1"),
            "Walnut desk",
            "Mid-century writing desk",
            250.0,
            now + Duration::hours(2),
            now + Duration::hours(26),
        );
        auction.images = vec!["img-1".into(), "img-2".into()];
        auction
    }

    #[test]
    fn fields_round_trip() {
        let mut auction = sample_auction();
        auction.apply_bid(Bid::new(UserId::from("u1"), 300.0));

        let doc = Document {
            name: Some(format!("projects/p/databases/d/documents/auctions/{}", auction.id)),
            fields: Some(auction_to_fields(&auction)),
            create_time: None,
            update_time: Some("2026-01-01T00:00:00Z".to_string()),
        };

        let parsed = document_to_auction(&doc).unwrap();
        assert_eq!(parsed.id, auction.id);
        assert_eq!(parsed.product_name, auction.product_name);
        assert_eq!(parsed.status, auction.status);
        assert_eq!(parsed.bids.len(), 1);
        assert_eq!(parsed.winning_bid.unwrap().amount, 300.0);
        assert_eq!(parsed.images, auction.images);
    }

    #[test]
    fn missing_winning_bid_is_none() {
        let auction = sample_auction();
        let doc = Document {
            name: Some("projects/p/databases/d/documents/auctions/a1".to_string()),
            fields: Some(auction_to_fields(&auction)),
            create_time: None,
            update_time: Some("2026-01-01T00:00:00Z".to_string()),
        };
        let parsed = document_to_auction(&doc).unwrap();
        assert!(parsed.winning_bid.is_none());
        assert!(parsed.bids.is_empty());
    }

    #[test]
    fn versioned_requires_update_time() {
        let auction = sample_auction();
        let doc = Document {
            name: Some("projects/p/databases/d/documents/auctions/a1".to_string()),
            fields: Some(auction_to_fields(&auction)),
            create_time: None,
            update_time: None,
        };
        assert!(versioned_from_document(doc).is_err());
    }
}
