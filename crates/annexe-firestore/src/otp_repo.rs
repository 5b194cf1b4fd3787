//! OTP repository.
//!
//! One document per email address, keyed by the address itself, so
//! reissuing an OTP naturally replaces the previous one.

use std::collections::HashMap;

use annexe_models::OtpRecord;

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{require_field, Document, ToFirestoreValue, Value};

const COLLECTION: &str = "otps";

/// Repository over the `otps` collection.
#[derive(Clone)]
pub struct OtpRepository {
    client: FirestoreClient,
}

impl OtpRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// Store an OTP record, replacing any live one for the same email.
    pub async fn upsert(&self, record: &OtpRecord) -> FirestoreResult<()> {
        let fields = otp_to_fields(record);
        let mask = fields.keys().cloned().collect();
        self.client
            .update_document(COLLECTION, &record.email, fields, Some(mask))
            .await?;
        Ok(())
    }

    pub async fn get(&self, email: &str) -> FirestoreResult<Option<OtpRecord>> {
        match self.client.get_document(COLLECTION, email).await? {
            Some(doc) => Ok(Some(document_to_otp(&doc)?)),
            None => Ok(None),
        }
    }

    /// Remove the record after successful confirmation. Idempotent.
    pub async fn delete(&self, email: &str) -> FirestoreResult<()> {
        self.client.delete_document(COLLECTION, email).await
    }
}

fn otp_to_fields(record: &OtpRecord) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("email".into(), record.email.to_firestore_value());
    fields.insert("otpHash".into(), record.otp_hash.to_firestore_value());
    fields.insert("expiresAt".into(), record.expires_at.to_firestore_value());
    fields.insert("createdAt".into(), record.created_at.to_firestore_value());
    fields
}

fn document_to_otp(doc: &Document) -> FirestoreResult<OtpRecord> {
    let fields = doc
        .fields
        .as_ref()
        .ok_or_else(|| FirestoreError::invalid_document("otp document has no fields"))?;
    Ok(OtpRecord {
        email: require_field(fields, "email")?,
        otp_hash: require_field(fields, "otpHash")?,
        expires_at: require_field(fields, "expiresAt")?,
        created_at: require_field(fields, "createdAt")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn otp_fields_round_trip() {
        let record = OtpRecord::new(
            "ada@example.com",
            "$2b$10$hash".to_string(),
            Utc::now() + Duration::hours(24),
        );
        let doc = Document {
            name: Some("projects/p/databases/d/documents/otps/ada@example.com".to_string()),
            fields: Some(otp_to_fields(&record)),
            create_time: None,
            update_time: None,
        };
        let parsed = document_to_otp(&doc).unwrap();
        assert_eq!(parsed.email, record.email);
        assert_eq!(parsed.otp_hash, record.otp_hash);
    }
}
