//! Generic record collections and the database snapshot they live in.
//!
//! The store owns everything the services must not maintain themselves:
//! id assignment, audit stamping, and index lookups. Batch flows mutate a
//! [`Database`] as one logical unit so a capable backend can persist the
//! whole mutation atomically.

pub mod json_backend;

use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{
    Audit, Payment, PaymentCategory, PaymentInstance, SavingsGoal, SavingsTransaction,
};
use crate::errors::StoreError;

pub use json_backend::JsonStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Contract every persisted record satisfies. The store assigns ids and
/// maintains the audit fields; records only expose them.
pub trait Record: Clone + Serialize + DeserializeOwned {
    const COLLECTION: &'static str;

    fn id(&self) -> Option<u64>;
    fn set_id(&mut self, id: u64);
    fn audit_mut(&mut self) -> &mut Audit;
}

macro_rules! impl_record {
    ($type:ty, $collection:literal) => {
        impl Record for $type {
            const COLLECTION: &'static str = $collection;

            fn id(&self) -> Option<u64> {
                self.id
            }

            fn set_id(&mut self, id: u64) {
                self.id = Some(id);
            }

            fn audit_mut(&mut self) -> &mut Audit {
                &mut self.audit
            }
        }
    };
}

impl_record!(Payment, "payments");
impl_record!(PaymentInstance, "paymentInstances");
impl_record!(PaymentCategory, "paymentCategories");
impl_record!(SavingsGoal, "savingsGoals");
impl_record!(SavingsTransaction, "savingsTransactions");

/// An in-memory collection of records with auto-incremented ids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Collection<T> {
    next_id: u64,
    records: Vec<T>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            records: Vec::new(),
        }
    }
}

impl<T: Record> Collection<T> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get_all(&self) -> Vec<T> {
        self.records.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.records.iter()
    }

    pub fn get_by_id(&self, id: u64) -> StoreResult<T> {
        self.records
            .iter()
            .find(|record| record.id() == Some(id))
            .cloned()
            .ok_or(StoreError::Missing {
                collection: T::COLLECTION,
                id,
            })
    }

    /// Returns every record whose serialized `field` equals `value`,
    /// mirroring an index lookup on the wire representation.
    pub fn get_by_index(&self, field: &str, value: &Value) -> StoreResult<Vec<T>> {
        let mut matches = Vec::new();
        for record in &self.records {
            let serialized = serde_json::to_value(record)?;
            match serialized.get(field) {
                Some(found) if found == value => matches.push(record.clone()),
                Some(_) => {}
                None => {
                    return Err(StoreError::UnknownField(format!(
                        "{}.{}",
                        T::COLLECTION,
                        field
                    )))
                }
            }
        }
        Ok(matches)
    }

    /// Persists a new record: assigns the next id and stamps creation audit
    /// fields. Returns the stored record, id included.
    pub fn add(&mut self, mut record: T, today: NaiveDate) -> StoreResult<T> {
        let id = self.next_id;
        self.next_id += 1;
        record.set_id(id);
        record.audit_mut().stamp_created(today);
        self.records.push(record.clone());
        Ok(record)
    }

    /// Applies a partial update to the stored record and refreshes its
    /// update timestamp. The id is immutable.
    pub fn update(
        &mut self,
        id: u64,
        today: NaiveDate,
        apply: impl FnOnce(&mut T),
    ) -> StoreResult<T> {
        let record = self
            .records
            .iter_mut()
            .find(|record| record.id() == Some(id))
            .ok_or(StoreError::Missing {
                collection: T::COLLECTION,
                id,
            })?;
        apply(record);
        record.set_id(id);
        record.audit_mut().stamp_updated(today);
        Ok(record.clone())
    }

    pub fn delete(&mut self, id: u64) -> StoreResult<()> {
        let before = self.records.len();
        self.records.retain(|record| record.id() != Some(id));
        if self.records.len() == before {
            return Err(StoreError::Missing {
                collection: T::COLLECTION,
                id,
            });
        }
        Ok(())
    }
}

/// The whole persisted dataset: one collection per record type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Database {
    pub payments: Collection<Payment>,
    pub payment_instances: Collection<PaymentInstance>,
    pub payment_categories: Collection<PaymentCategory>,
    pub savings_goals: Collection<SavingsGoal>,
    pub savings_transactions: Collection<SavingsTransaction>,
}

impl Database {
    /// All instances belonging to one plan, ordered by installment number.
    pub fn instances_of(&self, payment_id: u64) -> Vec<PaymentInstance> {
        let mut instances: Vec<_> = self
            .payment_instances
            .iter()
            .filter(|inst| inst.payment_id == payment_id)
            .cloned()
            .collect();
        instances.sort_by_key(|inst| inst.installment_number);
        instances
    }

    /// Plans owned by one user.
    pub fn payments_of(&self, user_id: u64) -> Vec<Payment> {
        self.payments
            .iter()
            .filter(|payment| payment.user_id == user_id)
            .cloned()
            .collect()
    }
}
