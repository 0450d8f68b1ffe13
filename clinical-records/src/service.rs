use crate::{error::*, models::*, repository::RecordRepository};
use auth_identity::{EntityKind, IdentifierAllocator, PrincipalRepository, Role, StoreError};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Clinical record workflows
///
/// Patients and doctors are referenced by their durable ids. Business ids in
/// request payloads (`patientId`, `doctorId`, `visitId`) are resolved here.
/// Records the caller may not see are reported as [`RecordError::NotFound`].
pub struct RecordService {
    records: Arc<dyn RecordRepository>,
    principals: Arc<dyn PrincipalRepository>,
    allocator: IdentifierAllocator,
}

impl RecordService {
    pub fn new(records: Arc<dyn RecordRepository>, principals: Arc<dyn PrincipalRepository>) -> Self {
        Self {
            records,
            principals,
            allocator: IdentifierAllocator::system(),
        }
    }

    pub fn with_allocator(mut self, allocator: IdentifierAllocator) -> Self {
        self.allocator = allocator;
        self
    }

    // ------------------------------------------------------------------
    // Visits
    // ------------------------------------------------------------------

    pub async fn create_visit(&self, doctor: Uuid, input: NewVisit) -> Result<Visit> {
        input.validate()?;

        let patient = self.resolve_patient(&input.patient_id).await?;
        let visit_id = self.allocator.allocate(EntityKind::Visit, self.records.as_ref()).await?;
        let now = self.allocator.clock().now();

        let visit = Visit {
            id: Uuid::new_v4(),
            visit_id,
            patient,
            doctor,
            visit_date: input.visit_date.unwrap_or(now),
            reason: input.reason,
            diagnosis: input.diagnosis,
            symptoms: input.symptoms,
            prescriptions: input.prescriptions,
            notes: input.notes,
            follow_up_date: input.follow_up_date,
            created_at: now,
        };

        self.records
            .insert_visit(&visit)
            .await
            .map_err(|e| collision(EntityKind::Visit, &visit.visit_id, e))?;

        tracing::info!(visit_id = %visit.visit_id, doctor = %doctor, "Visit recorded");
        Ok(visit)
    }

    pub async fn list_visits_for_patient(&self, patient: Uuid) -> Result<Vec<Visit>> {
        Ok(self.records.visits_for_patient(patient).await?)
    }

    pub async fn list_visits_by_doctor(&self, doctor: Uuid) -> Result<Vec<Visit>> {
        Ok(self.records.visits_by_doctor(doctor).await?)
    }

    /// Visible to the visit's patient and to the doctor who recorded it
    pub async fn get_visit(&self, role: Role, principal: Uuid, visit_id: &str) -> Result<Visit> {
        let visit = self
            .records
            .find_visit(visit_id)
            .await?
            .ok_or(RecordError::NotFound("Visit"))?;

        let owner = match role {
            Role::Patient => visit.patient,
            Role::Doctor => visit.doctor,
        };
        if owner != principal {
            return Err(RecordError::NotFound("Visit"));
        }
        Ok(visit)
    }

    // ------------------------------------------------------------------
    // Scan reports
    // ------------------------------------------------------------------

    pub async fn create_report(&self, doctor: Uuid, input: NewReport) -> Result<ScanReport> {
        input.validate()?;

        let file_kind = FileKind::from_media_type(&input.media_type).ok_or_else(|| {
            RecordError::Validation("Only image and PDF files are accepted".to_string())
        })?;
        let patient = self.resolve_patient(&input.patient_id).await?;

        let visit = match input.visit_id.as_deref() {
            Some(visit_id) => {
                let visit = self
                    .records
                    .find_visit(visit_id)
                    .await?
                    .filter(|v| v.patient == patient)
                    .ok_or(RecordError::NotFound("Visit"))?;
                Some(visit.id)
            }
            None => None,
        };

        let report_id = self.allocator.allocate(EntityKind::Report, self.records.as_ref()).await?;

        let report = ScanReport {
            id: Uuid::new_v4(),
            report_id,
            patient,
            doctor,
            visit,
            title: input.title,
            scan_type: input.scan_type,
            file_path: input.file_path,
            file_kind,
            findings: input.findings,
            created_at: self.allocator.clock().now(),
        };

        self.records
            .insert_report(&report)
            .await
            .map_err(|e| collision(EntityKind::Report, &report.report_id, e))?;

        tracing::info!(report_id = %report.report_id, file_kind = %file_kind, "Scan report recorded");
        Ok(report)
    }

    pub async fn list_reports_for_patient(&self, patient: Uuid) -> Result<Vec<ScanReport>> {
        Ok(self.records.reports_for_patient(patient).await?)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub async fn create_query(&self, patient: Uuid, input: NewQuery) -> Result<PatientQuery> {
        input.validate()?;

        let doctor = self
            .principals
            .find_doctor_by_business_id(input.doctor_id.trim())
            .await?
            .ok_or(RecordError::NotFound("Doctor"))?;

        let query_id = self.allocator.allocate(EntityKind::Query, self.records.as_ref()).await?;

        let query = PatientQuery {
            id: Uuid::new_v4(),
            query_id,
            patient,
            doctor: doctor.id,
            subject: input.subject,
            message: input.message,
            status: QueryStatus::Open,
            response: None,
            created_at: self.allocator.clock().now(),
            answered_at: None,
        };

        self.records
            .insert_query(&query)
            .await
            .map_err(|e| collision(EntityKind::Query, &query.query_id, e))?;

        tracing::info!(query_id = %query.query_id, doctor_id = %doctor.doctor_id, "Query sent");
        Ok(query)
    }

    pub async fn list_queries_for_patient(&self, patient: Uuid) -> Result<Vec<PatientQuery>> {
        Ok(self.records.queries_for_patient(patient).await?)
    }

    pub async fn list_queries_for_doctor(&self, doctor: Uuid) -> Result<Vec<PatientQuery>> {
        Ok(self.records.queries_for_doctor(doctor).await?)
    }

    /// Only the addressed doctor may answer, and only once
    pub async fn answer_query(&self, doctor: Uuid, query_id: &str, reply: QueryReply) -> Result<PatientQuery> {
        reply.validate()?;

        let query = self
            .records
            .find_query(query_id)
            .await?
            .filter(|q| q.doctor == doctor)
            .ok_or(RecordError::NotFound("Query"))?;

        if query.status == QueryStatus::Answered {
            return Err(RecordError::Validation("Query has already been answered".to_string()));
        }

        let now = self.allocator.clock().now();
        let answered = self
            .records
            .answer_query(&query.query_id, &reply.response, now)
            .await?
            .ok_or_else(|| RecordError::Validation("Query has already been answered".to_string()))?;

        tracing::info!(query_id = %answered.query_id, "Query answered");
        Ok(answered)
    }

    async fn resolve_patient(&self, patient_id: &str) -> Result<Uuid> {
        self.principals
            .find_patient_by_business_id(patient_id.trim())
            .await?
            .map(|p| p.id)
            .ok_or(RecordError::NotFound("Patient"))
    }
}

fn collision(kind: EntityKind, identifier: &str, err: StoreError) -> RecordError {
    match err {
        StoreError::UniqueViolation { .. } => {
            tracing::warn!(kind = %kind, identifier = %identifier, "Identifier lost a uniqueness race");
            RecordError::IdentifierCollision {
                kind,
                identifier: identifier.to_string(),
            }
        }
        other => RecordError::Store(other),
    }
}
