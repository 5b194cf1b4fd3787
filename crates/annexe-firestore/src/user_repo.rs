//! User repository.

use std::collections::HashMap;

use annexe_models::{BankDetails, User, UserId};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{
    array_field, map_fields, optional_field, require_field, CollectionSelector, Document, Filter,
    MapValue, StructuredQuery, ToFirestoreValue, Value,
};

const COLLECTION: &str = "users";

/// Repository over the `users` collection.
#[derive(Clone)]
pub struct UserRepository {
    client: FirestoreClient,
}

impl UserRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    pub async fn create(&self, user: &User) -> FirestoreResult<()> {
        self.client
            .create_document(COLLECTION, user.id.as_str(), user_to_fields(user))
            .await?;
        Ok(())
    }

    pub async fn get(&self, id: &UserId) -> FirestoreResult<Option<User>> {
        match self.client.get_document(COLLECTION, id.as_str()).await? {
            Some(doc) => Ok(Some(document_to_user(&doc)?)),
            None => Ok(None),
        }
    }

    /// Look up a user by email address.
    pub async fn find_by_email(&self, email: &str) -> FirestoreResult<Option<User>> {
        let query = StructuredQuery {
            from: vec![CollectionSelector {
                collection_id: COLLECTION.to_string(),
                all_descendants: None,
            }],
            r#where: Some(Filter::field(
                "email",
                "EQUAL",
                Value::StringValue(email.to_string()),
            )),
            order_by: None,
            limit: Some(1),
        };

        let docs = self.client.run_query(query).await?;
        match docs.first() {
            Some(doc) => Ok(Some(document_to_user(doc)?)),
            None => Ok(None),
        }
    }

    /// Rewrite the full user record.
    pub async fn save(&self, user: &User) -> FirestoreResult<()> {
        let fields = user_to_fields(user);
        let mask = fields.keys().cloned().collect();
        self.client
            .update_document(COLLECTION, user.id.as_str(), fields, Some(mask))
            .await?;
        Ok(())
    }
}

fn user_to_fields(user: &User) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("name".into(), user.name.to_firestore_value());
    fields.insert("email".into(), user.email.to_firestore_value());
    fields.insert(
        "passwordHash".into(),
        user.password_hash.to_firestore_value(),
    );
    fields.insert("phone".into(), user.phone.to_firestore_value());
    fields.insert("address".into(), user.address.to_firestore_value());
    fields.insert("isVerified".into(), user.is_verified.to_firestore_value());
    fields.insert("isActive".into(), user.is_active.to_firestore_value());
    fields.insert("isAdmin".into(), user.is_admin.to_firestore_value());
    fields.insert(
        "isRegistrationComplete".into(),
        user.is_registration_complete.to_firestore_value(),
    );
    fields.insert(
        "bankDetails".into(),
        Value::ArrayValue(crate::types::ArrayValue {
            values: Some(user.bank_details.iter().map(bank_to_value).collect()),
        }),
    );
    fields.insert(
        "recipientCode".into(),
        user.recipient_code.to_firestore_value(),
    );
    fields.insert("createdAt".into(), user.created_at.to_firestore_value());
    fields.insert("updatedAt".into(), user.updated_at.to_firestore_value());
    fields
}

fn bank_to_value(bank: &BankDetails) -> Value {
    let mut fields = HashMap::new();
    fields.insert("bankName".to_string(), bank.bank_name.to_firestore_value());
    fields.insert("bankCode".to_string(), bank.bank_code.to_firestore_value());
    fields.insert(
        "accountNumber".to_string(),
        bank.account_number.to_firestore_value(),
    );
    fields.insert(
        "accountName".to_string(),
        bank.account_name.to_firestore_value(),
    );
    Value::MapValue(MapValue {
        fields: Some(fields),
    })
}

fn value_to_bank(value: &Value) -> FirestoreResult<BankDetails> {
    let fields = map_fields(value)
        .ok_or_else(|| FirestoreError::invalid_document("bank details is not a map value"))?;
    Ok(BankDetails {
        bank_name: require_field(fields, "bankName")?,
        bank_code: require_field(fields, "bankCode")?,
        account_number: require_field(fields, "accountNumber")?,
        account_name: require_field(fields, "accountName")?,
    })
}

fn document_to_user(doc: &Document) -> FirestoreResult<User> {
    let id = doc
        .doc_id()
        .ok_or_else(|| FirestoreError::invalid_document("user document has no name"))?;
    let fields = doc
        .fields
        .as_ref()
        .ok_or_else(|| FirestoreError::invalid_document("user document has no fields"))?;

    let mut bank_details = Vec::new();
    for value in array_field(fields, "bankDetails") {
        bank_details.push(value_to_bank(value)?);
    }

    Ok(User {
        id: UserId::from_string(id),
        name: require_field(fields, "name")?,
        email: require_field(fields, "email")?,
        password_hash: require_field(fields, "passwordHash")?,
        phone: optional_field(fields, "phone"),
        address: optional_field(fields, "address"),
        is_verified: optional_field(fields, "isVerified").unwrap_or(false),
        is_active: optional_field(fields, "isActive").unwrap_or(false),
        is_admin: optional_field(fields, "isAdmin").unwrap_or(false),
        is_registration_complete: optional_field(fields, "isRegistrationComplete")
            .unwrap_or(false),
        bank_details,
        recipient_code: optional_field(fields, "recipientCode"),
        created_at: require_field(fields, "createdAt")?,
        updated_at: require_field(fields, "updatedAt")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_fields_round_trip() {
        let mut user = User::new("Ada", "ada@example.com", "$2b$10$hash".to_string());
        user.bank_details.push(BankDetails {
            bank_name: "First Bank".into(),
            bank_code: "011".into(),
            account_number: "0123456789".into(),
            account_name: "Ada L".into(),
        });
        user.is_verified = true;

        let doc = Document {
            name: Some(format!("projects/p/databases/d/documents/users/{}", user.id)),
            fields: Some(user_to_fields(&user)),
            create_time: None,
            update_time: None,
        };

        let parsed = document_to_user(&doc).unwrap();
        assert_eq!(parsed.email, user.email);
        assert_eq!(parsed.password_hash, user.password_hash);
        assert!(parsed.is_verified);
        assert!(!parsed.is_active);
        assert_eq!(parsed.bank_details.len(), 1);
        assert_eq!(parsed.bank_details[0].bank_code, "011");
    }

    #[test]
    fn absent_flags_default_false() {
        let user = User::new("Ada", "ada@example.com", "h".to_string());
        let mut fields = user_to_fields(&user);
        fields.remove("isAdmin");
        fields.remove("isRegistrationComplete");

        let doc = Document {
            name: Some("projects/p/databases/d/documents/users/u1".to_string()),
            fields: Some(fields),
            create_time: None,
            update_time: None,
        };
        let parsed = document_to_user(&doc).unwrap();
        assert!(!parsed.is_admin);
        assert!(!parsed.is_registration_complete);
    }
}
