// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User directory with typed operations.
//!
//! Backed by Firestore in production. Without a GCP project the directory
//! runs against an in-process map, which is what local development and the
//! test suite use.
//!
//! Phone numbers are claimed through a separate `phone_numbers` collection
//! whose document ID is the number itself. Firestore refuses to create a
//! document that already exists, so two concurrent signups with the same
//! number cannot both succeed.

use crate::db::collections;
use crate::error::AppError;
use crate::models::User;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Document stored under `phone_numbers/{phone}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PhoneClaim {
    user_id: String,
}

/// User directory client.
#[derive(Clone)]
pub struct FirestoreDb {
    backend: Backend,
}

#[derive(Clone)]
enum Backend {
    Firestore(firestore::FirestoreDb),
    Memory(Arc<MemoryDirectory>),
}

#[derive(Default)]
struct MemoryDirectory {
    inner: Mutex<MemoryTables>,
}

#[derive(Default)]
struct MemoryTables {
    users: HashMap<String, User>,
    phone_numbers: HashMap<String, String>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create an in-process directory. State lives as long as the last clone.
    pub fn new_in_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(MemoryDirectory::default())),
        }
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Create a new user, failing with `Conflict` if the phone number or
    /// email is already registered.
    ///
    /// The phone claim and the user document are separate writes; a
    /// failure between them leaves an orphaned claim.
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        match &self.backend {
            Backend::Memory(dir) => {
                let mut tables = dir.inner.lock().await;
                if tables.phone_numbers.contains_key(&user.phone_number) {
                    return Err(phone_conflict());
                }
                if tables.users.values().any(|u| u.email == user.email) {
                    return Err(email_conflict());
                }
                tables
                    .phone_numbers
                    .insert(user.phone_number.clone(), user.id.clone());
                tables.users.insert(user.id.clone(), user.clone());
                Ok(())
            }
            Backend::Firestore(client) => {
                if self.find_user_by_email(&user.email).await?.is_some() {
                    return Err(email_conflict());
                }

                let claim = PhoneClaim {
                    user_id: user.id.clone(),
                };
                let inserted: Result<PhoneClaim, _> = client
                    .fluent()
                    .insert()
                    .into(collections::PHONE_NUMBERS)
                    .document_id(&user.phone_number)
                    .object(&claim)
                    .execute()
                    .await;

                match inserted {
                    Ok(_) => {}
                    Err(firestore::errors::FirestoreError::DataConflictError(_)) => {
                        return Err(phone_conflict())
                    }
                    Err(e) => return Err(AppError::Database(e.to_string())),
                }

                self.upsert_user(user).await
            }
        }
    }

    /// Get a user by ID.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        match &self.backend {
            Backend::Memory(dir) => Ok(dir.inner.lock().await.users.get(user_id).cloned()),
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .by_id_in(collections::USERS)
                .obj()
                .one(user_id)
                .await
                .map_err(|e| AppError::Database(e.to_string())),
        }
    }

    /// Look up a user by phone number.
    pub async fn find_user_by_phone(&self, phone_number: &str) -> Result<Option<User>, AppError> {
        let user_id = match &self.backend {
            Backend::Memory(dir) => {
                let tables = dir.inner.lock().await;
                return Ok(tables
                    .phone_numbers
                    .get(phone_number)
                    .and_then(|id| tables.users.get(id))
                    .cloned());
            }
            Backend::Firestore(client) => {
                let claim: Option<PhoneClaim> = client
                    .fluent()
                    .select()
                    .by_id_in(collections::PHONE_NUMBERS)
                    .obj()
                    .one(phone_number)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                match claim {
                    Some(c) => c.user_id,
                    None => return Ok(None),
                }
            }
        };

        self.get_user(&user_id).await
    }

    /// Look up a user by email.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        match &self.backend {
            Backend::Memory(dir) => Ok(dir
                .inner
                .lock()
                .await
                .users
                .values()
                .find(|u| u.email == email)
                .cloned()),
            Backend::Firestore(client) => {
                let users: Vec<User> = client
                    .fluent()
                    .select()
                    .from(collections::USERS)
                    .filter(|q| q.for_all([q.field("email").eq(email)]))
                    .limit(1)
                    .obj()
                    .query()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(users.into_iter().next())
            }
        }
    }

    /// Create or replace a user document.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        match &self.backend {
            Backend::Memory(dir) => {
                dir.inner
                    .lock()
                    .await
                    .users
                    .insert(user.id.clone(), user.clone());
                Ok(())
            }
            Backend::Firestore(client) => {
                let _: User = client
                    .fluent()
                    .update()
                    .in_col(collections::USERS)
                    .document_id(&user.id)
                    .object(user)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(())
            }
        }
    }
}

fn phone_conflict() -> AppError {
    AppError::Conflict("Phone number is already registered".to_string())
}

fn email_conflict() -> AppError {
    AppError::Conflict("Email is already registered".to_string())
}
