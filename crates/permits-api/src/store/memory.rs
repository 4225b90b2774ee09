//! In-memory [`PermitStore`].
//!
//! All tables sit behind one `parking_lot::RwLock`. The lock is never held
//! across an `.await`, and every multi-row write happens under a single
//! write guard, so readers never observe half of a submission.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use permits_core::{ApplicationId, ApplicationNumber, PermitTypeId, Timestamp, UserId};
use permits_state::{
    Application, ApplicationStatus, Document, PermitType, PermitTypeSpec, StatusHistoryEvent,
};

use super::{NewApplication, PermitStore, StoreError, TransitionWrite};
use crate::model::{ApplicationFilter, Payment, User};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    permit_types: HashMap<PermitTypeId, PermitType>,
    applications: HashMap<ApplicationId, Application>,
    numbers: HashMap<ApplicationNumber, ApplicationId>,
    documents: HashMap<ApplicationId, Vec<Document>>,
    history: HashMap<ApplicationId, Vec<StatusHistoryEvent>>,
    /// Keyed by transaction id.
    payments: HashMap<String, Payment>,
}

impl Tables {
    fn upsert_permit_type(&mut self, spec: PermitTypeSpec, now: Timestamp) -> PermitType {
        if let Some(existing) = self.permit_types.values_mut().find(|p| p.name == spec.name) {
            existing.apply_spec(spec, now);
            return existing.clone();
        }
        let permit = PermitType::from_spec(spec, now);
        self.permit_types.insert(permit.id, permit.clone());
        permit
    }

    fn record_payment(&mut self, payment: &Payment) -> Result<(), StoreError> {
        if self.payments.contains_key(&payment.transaction_id) {
            return Err(StoreError::Duplicate("transaction_id".into()));
        }
        self.payments
            .insert(payment.transaction_id.clone(), payment.clone());
        Ok(())
    }
}

/// Store holding every table in process memory.
#[derive(Debug)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// An empty store with only the system user.
    pub fn new() -> Self {
        let mut tables = Tables::default();
        let system = User::system(Timestamp::now());
        tables.users.insert(system.id, system);
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// A store seeded with the given catalog.
    pub fn with_catalog(specs: impl IntoIterator<Item = PermitTypeSpec>) -> Self {
        let store = Self::new();
        {
            let now = Timestamp::now();
            let mut tables = store.tables.write();
            for spec in specs {
                tables.upsert_permit_type(spec, now);
            }
        }
        store
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PermitStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn list_permit_types(&self, active_only: bool) -> Result<Vec<PermitType>, StoreError> {
        let tables = self.tables.read();
        let mut permits: Vec<PermitType> = tables
            .permit_types
            .values()
            .filter(|p| !active_only || p.is_active)
            .cloned()
            .collect();
        permits.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(permits)
    }

    async fn get_permit_type(&self, id: PermitTypeId) -> Result<Option<PermitType>, StoreError> {
        Ok(self.tables.read().permit_types.get(&id).cloned())
    }

    async fn upsert_permit_type(
        &self,
        spec: PermitTypeSpec,
        now: Timestamp,
    ) -> Result<PermitType, StoreError> {
        Ok(self.tables.write().upsert_permit_type(spec, now))
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        if tables.users.contains_key(&user.id) {
            return Err(StoreError::Duplicate("users_pkey".into()));
        }
        if tables
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::Duplicate("users_email_key".into()));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().users.get(&id).cloned())
    }

    async fn user_names(&self, ids: &[UserId]) -> Result<HashMap<UserId, String>, StoreError> {
        let tables = self.tables.read();
        Ok(ids
            .iter()
            .filter_map(|id| tables.users.get(id).map(|u| (*id, u.display_name())))
            .collect())
    }

    async fn insert_application(&self, new: NewApplication) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let NewApplication {
            application,
            documents,
            event,
        } = new;
        if tables.numbers.contains_key(&application.application_number) {
            return Err(StoreError::Duplicate("applications_application_number_key".into()));
        }
        tables
            .numbers
            .insert(application.application_number.clone(), application.id);
        tables.documents.insert(application.id, documents);
        tables.history.insert(application.id, vec![event]);
        tables.applications.insert(application.id, application);
        Ok(())
    }

    async fn get_application(
        &self,
        number: &ApplicationNumber,
    ) -> Result<Option<Application>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .numbers
            .get(number)
            .and_then(|id| tables.applications.get(id))
            .cloned())
    }

    async fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, StoreError> {
        let tables = self.tables.read();
        let mut apps: Vec<Application> = tables
            .applications
            .values()
            .filter(|a| {
                filter.matches(
                    a.user_id,
                    a.status,
                    a.permit_type_id,
                    a.application_number.as_str(),
                    &a.business.business_name,
                )
            })
            .cloned()
            .collect();
        apps.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.application_number.cmp(&a.application_number))
        });
        Ok(apps)
    }

    async fn list_documents(&self, id: ApplicationId) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .tables
            .read()
            .documents
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_history(
        &self,
        id: ApplicationId,
    ) -> Result<Vec<StatusHistoryEvent>, StoreError> {
        Ok(self.tables.read().history.get(&id).cloned().unwrap_or_default())
    }

    async fn apply_transition(&self, write: TransitionWrite) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let id = write.application.id;
        let stored_version = tables
            .applications
            .get(&id)
            .map(|a| a.version)
            .ok_or_else(|| StoreError::NotFound(format!("application {id}")))?;
        if stored_version != write.expected_version {
            return Err(StoreError::VersionConflict);
        }
        if let Some(payment) = &write.payment {
            tables.record_payment(payment)?;
        }
        tables
            .documents
            .entry(id)
            .or_default()
            .extend(write.documents);
        tables.history.entry(id).or_default().push(write.event);
        tables.applications.insert(id, write.application);
        Ok(())
    }

    async fn count_transitions_since(
        &self,
        status: ApplicationStatus,
        since: Timestamp,
    ) -> Result<i64, StoreError> {
        let tables = self.tables.read();
        let count = tables
            .history
            .values()
            .flatten()
            .filter(|e| e.status == status && e.created_at >= since)
            .count();
        Ok(count as i64)
    }

    async fn find_payment(&self, transaction_id: &str) -> Result<Option<Payment>, StoreError> {
        Ok(self.tables.read().payments.get(transaction_id).cloned())
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<(), StoreError> {
        self.tables.write().record_payment(payment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use permits_core::{BusinessDetails, BusinessDetailsInput, Role};
    use permits_state::{default_catalog, Actor};

    fn business(name: &str) -> BusinessDetails {
        BusinessDetails::parse(BusinessDetailsInput {
            business_name: name.into(),
            business_type: "Retail".into(),
            phone_number: "+254712345678".into(),
            national_id: "12345678".into(),
            business_address: "Main Street".into(),
        })
        .unwrap()
    }

    async fn seeded() -> (MemoryStore, PermitType) {
        let store = MemoryStore::with_catalog(default_catalog());
        let permit = store
            .list_permit_types(true)
            .await
            .unwrap()
            .into_iter()
            .find(|p| p.name == "Business License")
            .unwrap();
        (store, permit)
    }

    async fn insert(store: &MemoryStore, permit: &PermitType, name: &str) -> Application {
        let (application, event) =
            Application::submitted(UserId::new(), permit, business(name), Timestamp::now())
                .unwrap();
        store
            .insert_application(NewApplication {
                application: application.clone(),
                documents: vec![],
                event,
            })
            .await
            .unwrap();
        application
    }

    #[tokio::test]
    async fn system_user_is_seeded() {
        let store = MemoryStore::new();
        let names = store.user_names(&[UserId::system()]).await.unwrap();
        assert_eq!(names[&UserId::system()], "County System");
    }

    #[tokio::test]
    async fn reseeding_keeps_identity() {
        let (store, permit) = seeded().await;
        let mut spec = default_catalog().remove(0);
        spec.description = "Updated".into();
        let updated = store.upsert_permit_type(spec, Timestamp::now()).await.unwrap();
        assert_eq!(updated.id, permit.id);
        assert_eq!(store.list_permit_types(false).await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn duplicate_number_writes_nothing() {
        let (store, permit) = seeded().await;
        let first = insert(&store, &permit, "First").await;
        let (mut second, event) =
            Application::submitted(UserId::new(), &permit, business("Second"), Timestamp::now())
                .unwrap();
        second.application_number = first.application_number.clone();
        let err = store
            .insert_application(NewApplication {
                application: second.clone(),
                documents: vec![],
                event,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        assert!(store.list_history(second.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict() {
        let (store, permit) = seeded().await;
        let stored = insert(&store, &permit, "Shop").await;
        let officer = Actor::new(UserId::new(), Role::Officer);

        let mut first = stored.clone();
        let event = first
            .transition(officer, ApplicationStatus::UnderReview, None, Timestamp::now())
            .unwrap();
        store
            .apply_transition(TransitionWrite {
                application: first,
                expected_version: stored.version,
                documents: vec![],
                event,
                payment: None,
            })
            .await
            .unwrap();

        let mut second = stored.clone();
        let event = second
            .transition(
                officer,
                ApplicationStatus::PaymentPending,
                None,
                Timestamp::now(),
            )
            .unwrap();
        let err = store
            .apply_transition(TransitionWrite {
                application: second,
                expected_version: stored.version,
                documents: vec![],
                event,
                payment: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::VersionConflict);
        assert_eq!(store.list_history(stored.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn list_filters_and_orders_newest_first() {
        let (store, permit) = seeded().await;
        insert(&store, &permit, "Alpha Traders").await;
        let later = insert(&store, &permit, "Beta Bakery").await;

        let all = store
            .list_applications(&ApplicationFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].created_at >= all[1].created_at);

        let found = store
            .list_applications(&ApplicationFilter {
                search: Some("bakery".into()),
                ..ApplicationFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, later.id);
    }

    #[tokio::test]
    async fn duplicate_email_rejected() {
        let store = MemoryStore::new();
        let mut user = User::system(Timestamp::now());
        user.id = UserId::new();
        user.role = Role::Citizen;
        user.email = "SYSTEM@county.local".into();
        let err = store.insert_user(&user).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }
}
