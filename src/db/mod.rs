//! Database layer (Firestore, with an in-memory backend for local runs).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Phone number claims (document ID = phone number, enforces uniqueness)
    pub const PHONE_NUMBERS: &str = "phone_numbers";
}
