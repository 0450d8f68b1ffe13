use crate::models::{FileKind, PatientQuery, Prescription, QueryStatus, ScanReport, Visit};
use crate::repository::RecordRepository;
use async_trait::async_trait;
use auth_identity::{EntityKind, IdentifierLookup, StoreError};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

type StoreResult<T> = std::result::Result<T, StoreError>;

const VISIT_COLUMNS: &str = "id, visit_id, patient, doctor, visit_date, reason, diagnosis, \
     symptoms, prescriptions, notes, follow_up_date, created_at";

const REPORT_COLUMNS: &str = "id, report_id, patient, doctor, visit, title, scan_type, \
     file_path, file_kind, findings, created_at";

const QUERY_COLUMNS: &str = "id, query_id, patient, doctor, subject, message, status, \
     response, created_at, answered_at";

#[derive(Debug, FromRow)]
struct VisitRow {
    id: Uuid,
    visit_id: String,
    patient: Uuid,
    doctor: Uuid,
    visit_date: DateTime<Utc>,
    reason: String,
    diagnosis: String,
    symptoms: Vec<String>,
    prescriptions: Json<Vec<Prescription>>,
    notes: Option<String>,
    follow_up_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<VisitRow> for Visit {
    fn from(row: VisitRow) -> Self {
        Visit {
            id: row.id,
            visit_id: row.visit_id,
            patient: row.patient,
            doctor: row.doctor,
            visit_date: row.visit_date,
            reason: row.reason,
            diagnosis: row.diagnosis,
            symptoms: row.symptoms,
            prescriptions: row.prescriptions.0,
            notes: row.notes,
            follow_up_date: row.follow_up_date,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ReportRow {
    id: Uuid,
    report_id: String,
    patient: Uuid,
    doctor: Uuid,
    visit: Option<Uuid>,
    title: String,
    scan_type: String,
    file_path: String,
    file_kind: String,
    findings: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReportRow> for ScanReport {
    type Error = StoreError;

    fn try_from(row: ReportRow) -> StoreResult<Self> {
        Ok(ScanReport {
            id: row.id,
            report_id: row.report_id,
            patient: row.patient,
            doctor: row.doctor,
            visit: row.visit,
            title: row.title,
            scan_type: row.scan_type,
            file_path: row.file_path,
            file_kind: row.file_kind.parse::<FileKind>().map_err(StoreError::Backend)?,
            findings: row.findings,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct QueryRow {
    id: Uuid,
    query_id: String,
    patient: Uuid,
    doctor: Uuid,
    subject: String,
    message: String,
    status: String,
    response: Option<String>,
    created_at: DateTime<Utc>,
    answered_at: Option<DateTime<Utc>>,
}

impl TryFrom<QueryRow> for PatientQuery {
    type Error = StoreError;

    fn try_from(row: QueryRow) -> StoreResult<Self> {
        Ok(PatientQuery {
            id: row.id,
            query_id: row.query_id,
            patient: row.patient,
            doctor: row.doctor,
            subject: row.subject,
            message: row.message,
            status: row.status.parse::<QueryStatus>().map_err(StoreError::Backend)?,
            response: row.response,
            created_at: row.created_at,
            answered_at: row.answered_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PgRecordRepository {
    pool: PgPool,
}

impl PgRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn visits_where(&self, filter: &str, owner: Uuid) -> StoreResult<Vec<Visit>> {
        let sql = format!(
            "SELECT {VISIT_COLUMNS} FROM visits WHERE {filter} = $1 ORDER BY visit_date DESC"
        );
        let rows = sqlx::query_as::<_, VisitRow>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Visit::from).collect())
    }

    async fn queries_where(&self, filter: &str, owner: Uuid) -> StoreResult<Vec<PatientQuery>> {
        let sql = format!(
            "SELECT {QUERY_COLUMNS} FROM queries WHERE {filter} = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, QueryRow>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(PatientQuery::try_from).collect()
    }
}

#[async_trait]
impl IdentifierLookup for PgRecordRepository {
    async fn identifier_exists(&self, kind: EntityKind, candidate: &str) -> StoreResult<bool> {
        let sql = match kind {
            EntityKind::Visit => "SELECT EXISTS(SELECT 1 FROM visits WHERE visit_id = $1)",
            EntityKind::Report => "SELECT EXISTS(SELECT 1 FROM reports WHERE report_id = $1)",
            EntityKind::Query => "SELECT EXISTS(SELECT 1 FROM queries WHERE query_id = $1)",
            EntityKind::Patient | EntityKind::Doctor => return Ok(false),
        };
        let exists = sqlx::query_scalar::<_, bool>(sql)
            .bind(candidate)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

#[async_trait]
impl RecordRepository for PgRecordRepository {
    async fn insert_visit(&self, visit: &Visit) -> StoreResult<()> {
        let sql = format!(
            "INSERT INTO visits ({VISIT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
        );
        sqlx::query(&sql)
            .bind(visit.id)
            .bind(&visit.visit_id)
            .bind(visit.patient)
            .bind(visit.doctor)
            .bind(visit.visit_date)
            .bind(&visit.reason)
            .bind(&visit.diagnosis)
            .bind(&visit.symptoms)
            .bind(Json(&visit.prescriptions))
            .bind(&visit.notes)
            .bind(visit.follow_up_date)
            .bind(visit.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_visit(&self, visit_id: &str) -> StoreResult<Option<Visit>> {
        let sql = format!("SELECT {VISIT_COLUMNS} FROM visits WHERE visit_id = $1");
        let row = sqlx::query_as::<_, VisitRow>(&sql)
            .bind(visit_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Visit::from))
    }

    async fn visits_for_patient(&self, patient: Uuid) -> StoreResult<Vec<Visit>> {
        self.visits_where("patient", patient).await
    }

    async fn visits_by_doctor(&self, doctor: Uuid) -> StoreResult<Vec<Visit>> {
        self.visits_where("doctor", doctor).await
    }

    async fn insert_report(&self, report: &ScanReport) -> StoreResult<()> {
        let sql = format!(
            "INSERT INTO reports ({REPORT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        );
        sqlx::query(&sql)
            .bind(report.id)
            .bind(&report.report_id)
            .bind(report.patient)
            .bind(report.doctor)
            .bind(report.visit)
            .bind(&report.title)
            .bind(&report.scan_type)
            .bind(&report.file_path)
            .bind(report.file_kind.as_str())
            .bind(&report.findings)
            .bind(report.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn reports_for_patient(&self, patient: Uuid) -> StoreResult<Vec<ScanReport>> {
        let sql = format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE patient = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, ReportRow>(&sql)
            .bind(patient)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(ScanReport::try_from).collect()
    }

    async fn insert_query(&self, query: &PatientQuery) -> StoreResult<()> {
        let sql = format!(
            "INSERT INTO queries ({QUERY_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        );
        sqlx::query(&sql)
            .bind(query.id)
            .bind(&query.query_id)
            .bind(query.patient)
            .bind(query.doctor)
            .bind(&query.subject)
            .bind(&query.message)
            .bind(query.status.as_str())
            .bind(&query.response)
            .bind(query.created_at)
            .bind(query.answered_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_query(&self, query_id: &str) -> StoreResult<Option<PatientQuery>> {
        let sql = format!("SELECT {QUERY_COLUMNS} FROM queries WHERE query_id = $1");
        let row = sqlx::query_as::<_, QueryRow>(&sql)
            .bind(query_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(PatientQuery::try_from).transpose()
    }

    async fn queries_for_patient(&self, patient: Uuid) -> StoreResult<Vec<PatientQuery>> {
        self.queries_where("patient", patient).await
    }

    async fn queries_for_doctor(&self, doctor: Uuid) -> StoreResult<Vec<PatientQuery>> {
        self.queries_where("doctor", doctor).await
    }

    async fn answer_query(
        &self,
        query_id: &str,
        response: &str,
        answered_at: DateTime<Utc>,
    ) -> StoreResult<Option<PatientQuery>> {
        // only an open query takes a reply
        let sql = format!(
            "UPDATE queries SET status = 'answered', response = $2, answered_at = $3 \
             WHERE query_id = $1 AND status = 'open' RETURNING {QUERY_COLUMNS}"
        );
        let row = sqlx::query_as::<_, QueryRow>(&sql)
            .bind(query_id)
            .bind(response)
            .bind(answered_at)
            .fetch_optional(&self.pool)
            .await?;
        row.map(PatientQuery::try_from).transpose()
    }
}
