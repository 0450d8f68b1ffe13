use crate::models::{PatientQuery, QueryStatus, ScanReport, Visit};
use async_trait::async_trait;
use auth_identity::{EntityKind, IdentifierLookup, StoreError};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

type StoreResult<T> = std::result::Result<T, StoreError>;

/// Persistence for visits, scan reports and queries
///
/// Inserts must reject a duplicate business id with
/// [`StoreError::UniqueViolation`]. Listings are newest first.
#[async_trait]
pub trait RecordRepository: IdentifierLookup + Send + Sync {
    async fn insert_visit(&self, visit: &Visit) -> StoreResult<()>;
    async fn find_visit(&self, visit_id: &str) -> StoreResult<Option<Visit>>;
    async fn visits_for_patient(&self, patient: Uuid) -> StoreResult<Vec<Visit>>;
    async fn visits_by_doctor(&self, doctor: Uuid) -> StoreResult<Vec<Visit>>;

    async fn insert_report(&self, report: &ScanReport) -> StoreResult<()>;
    async fn reports_for_patient(&self, patient: Uuid) -> StoreResult<Vec<ScanReport>>;

    async fn insert_query(&self, query: &PatientQuery) -> StoreResult<()>;
    async fn find_query(&self, query_id: &str) -> StoreResult<Option<PatientQuery>>;
    async fn queries_for_patient(&self, patient: Uuid) -> StoreResult<Vec<PatientQuery>>;
    async fn queries_for_doctor(&self, doctor: Uuid) -> StoreResult<Vec<PatientQuery>>;

    /// Record a response if the query is still open. `None` if it was not.
    async fn answer_query(
        &self,
        query_id: &str,
        response: &str,
        answered_at: DateTime<Utc>,
    ) -> StoreResult<Option<PatientQuery>>;
}

// Keyed by business id; the map key doubles as the unique index
#[derive(Debug, Default)]
pub struct InMemoryRecordRepository {
    visits: RwLock<HashMap<String, Visit>>,
    reports: RwLock<HashMap<String, ScanReport>>,
    queries: RwLock<HashMap<String, PatientQuery>>,
}

impl InMemoryRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn insert_unique<T: Clone>(
    map: &mut HashMap<String, T>,
    key: &str,
    value: &T,
    field: &str,
) -> StoreResult<()> {
    if map.contains_key(key) {
        return Err(StoreError::UniqueViolation {
            field: field.to_string(),
        });
    }
    map.insert(key.to_string(), value.clone());
    Ok(())
}

fn newest_first<T, K: Ord>(mut items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
    items
}

#[async_trait]
impl IdentifierLookup for InMemoryRecordRepository {
    async fn identifier_exists(&self, kind: EntityKind, candidate: &str) -> StoreResult<bool> {
        Ok(match kind {
            EntityKind::Visit => self.visits.read().await.contains_key(candidate),
            EntityKind::Report => self.reports.read().await.contains_key(candidate),
            EntityKind::Query => self.queries.read().await.contains_key(candidate),
            EntityKind::Patient | EntityKind::Doctor => false,
        })
    }
}

#[async_trait]
impl RecordRepository for InMemoryRecordRepository {
    async fn insert_visit(&self, visit: &Visit) -> StoreResult<()> {
        let mut visits = self.visits.write().await;
        insert_unique(&mut visits, &visit.visit_id, visit, "visit_id")
    }

    async fn find_visit(&self, visit_id: &str) -> StoreResult<Option<Visit>> {
        Ok(self.visits.read().await.get(visit_id).cloned())
    }

    async fn visits_for_patient(&self, patient: Uuid) -> StoreResult<Vec<Visit>> {
        let visits = self.visits.read().await;
        let mine = visits.values().filter(|v| v.patient == patient).cloned().collect();
        Ok(newest_first(mine, |v: &Visit| v.visit_date))
    }

    async fn visits_by_doctor(&self, doctor: Uuid) -> StoreResult<Vec<Visit>> {
        let visits = self.visits.read().await;
        let mine = visits.values().filter(|v| v.doctor == doctor).cloned().collect();
        Ok(newest_first(mine, |v: &Visit| v.visit_date))
    }

    async fn insert_report(&self, report: &ScanReport) -> StoreResult<()> {
        let mut reports = self.reports.write().await;
        insert_unique(&mut reports, &report.report_id, report, "report_id")
    }

    async fn reports_for_patient(&self, patient: Uuid) -> StoreResult<Vec<ScanReport>> {
        let reports = self.reports.read().await;
        let mine = reports.values().filter(|r| r.patient == patient).cloned().collect();
        Ok(newest_first(mine, |r: &ScanReport| r.created_at))
    }

    async fn insert_query(&self, query: &PatientQuery) -> StoreResult<()> {
        let mut queries = self.queries.write().await;
        insert_unique(&mut queries, &query.query_id, query, "query_id")
    }

    async fn find_query(&self, query_id: &str) -> StoreResult<Option<PatientQuery>> {
        Ok(self.queries.read().await.get(query_id).cloned())
    }

    async fn queries_for_patient(&self, patient: Uuid) -> StoreResult<Vec<PatientQuery>> {
        let queries = self.queries.read().await;
        let mine = queries.values().filter(|q| q.patient == patient).cloned().collect();
        Ok(newest_first(mine, |q: &PatientQuery| q.created_at))
    }

    async fn queries_for_doctor(&self, doctor: Uuid) -> StoreResult<Vec<PatientQuery>> {
        let queries = self.queries.read().await;
        let mine = queries.values().filter(|q| q.doctor == doctor).cloned().collect();
        Ok(newest_first(mine, |q: &PatientQuery| q.created_at))
    }

    async fn answer_query(
        &self,
        query_id: &str,
        response: &str,
        answered_at: DateTime<Utc>,
    ) -> StoreResult<Option<PatientQuery>> {
        let mut queries = self.queries.write().await;
        match queries.get_mut(query_id) {
            Some(query) if query.status == QueryStatus::Open => {
                query.status = QueryStatus::Answered;
                query.response = Some(response.to_string());
                query.answered_at = Some(answered_at);
                Ok(Some(query.clone()))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(query_id: &str) -> PatientQuery {
        PatientQuery {
            id: Uuid::new_v4(),
            query_id: query_id.into(),
            patient: Uuid::new_v4(),
            doctor: Uuid::new_v4(),
            subject: "Dosage".into(),
            message: "Twice a day?".into(),
            status: QueryStatus::Open,
            response: None,
            created_at: Utc::now(),
            answered_at: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_query_id_is_rejected() {
        let repo = InMemoryRecordRepository::new();
        repo.insert_query(&query("QUERY-1-001")).await.unwrap();

        let err = repo.insert_query(&query("QUERY-1-001")).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::UniqueViolation {
                field: "query_id".into()
            }
        );
        assert!(repo
            .identifier_exists(EntityKind::Query, "QUERY-1-001")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_answer_only_once() {
        let repo = InMemoryRecordRepository::new();
        repo.insert_query(&query("QUERY-1-001")).await.unwrap();

        let first = repo.answer_query("QUERY-1-001", "Yes", Utc::now()).await.unwrap();
        let second = repo.answer_query("QUERY-1-001", "No", Utc::now()).await.unwrap();

        assert_eq!(first.and_then(|q| q.response).as_deref(), Some("Yes"));
        assert!(second.is_none());
    }
}
