//! PostgreSQL principal store
//!
//! Queries are checked at runtime so the crate builds without a live database.
//! The schema lives in the server's `migrations/` directory; every business id
//! and natural key there carries a `UNIQUE` constraint named
//! `<table>_<column>_key`, which is how violations are mapped back to a field.

use crate::error::StoreError;
use crate::ids::{EntityKind, IdentifierLookup};
use crate::models::{Doctor, PasswordHash, Patient};
use crate::repository::PrincipalRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use uuid::Uuid;

type StoreResult<T> = std::result::Result<T, StoreError>;

const PATIENT_COLUMNS: &str = "id, patient_id, name, mobile_number, age, blood_group, height, \
     weight, gender, address, password_hash, created_at, updated_at";

const DOCTOR_COLUMNS: &str = "id, doctor_id, name, email, phone_number, medical_license_number, \
     specialization, qualification, experience_years, hospital, password_hash, created_at, updated_at";

#[derive(Debug, FromRow)]
struct PatientRow {
    id: Uuid,
    patient_id: String,
    name: String,
    mobile_number: String,
    age: i32,
    blood_group: String,
    height: f64,
    weight: f64,
    gender: Option<String>,
    address: Option<String>,
    password_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PatientRow> for Patient {
    fn from(row: PatientRow) -> Self {
        Patient {
            id: row.id,
            patient_id: row.patient_id,
            name: row.name,
            mobile_number: row.mobile_number,
            age: row.age,
            blood_group: row.blood_group,
            height: row.height,
            weight: row.weight,
            gender: row.gender,
            address: row.address,
            password_hash: PasswordHash::from_digest(row.password_hash),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct DoctorRow {
    id: Uuid,
    doctor_id: String,
    name: String,
    email: String,
    phone_number: String,
    medical_license_number: String,
    specialization: String,
    qualification: Option<String>,
    experience_years: Option<i32>,
    hospital: Option<String>,
    password_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DoctorRow> for Doctor {
    fn from(row: DoctorRow) -> Self {
        Doctor {
            id: row.id,
            doctor_id: row.doctor_id,
            name: row.name,
            email: row.email,
            phone_number: row.phone_number,
            medical_license_number: row.medical_license_number,
            specialization: row.specialization,
            qualification: row.qualification,
            experience_years: row.experience_years,
            hospital: row.hospital,
            password_hash: PasswordHash::from_digest(row.password_hash),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgPrincipalRepository {
    pool: PgPool,
}

impl PgPrincipalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_patient(&self, filter: &str, value: &str) -> StoreResult<Option<Patient>> {
        let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE {filter}");
        let row = sqlx::query_as::<_, PatientRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Patient::from))
    }

    async fn fetch_doctor(&self, filter: &str, value: &str) -> StoreResult<Option<Doctor>> {
        let sql = format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE {filter}");
        let row = sqlx::query_as::<_, DoctorRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Doctor::from))
    }
}

#[async_trait]
impl IdentifierLookup for PgPrincipalRepository {
    async fn identifier_exists(&self, kind: EntityKind, candidate: &str) -> StoreResult<bool> {
        let sql = match kind {
            EntityKind::Patient => "SELECT EXISTS(SELECT 1 FROM patients WHERE patient_id = $1)",
            EntityKind::Doctor => "SELECT EXISTS(SELECT 1 FROM doctors WHERE doctor_id = $1)",
            _ => return Ok(false),
        };
        let exists = sqlx::query_scalar::<_, bool>(sql)
            .bind(candidate)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

#[async_trait]
impl PrincipalRepository for PgPrincipalRepository {
    async fn insert_patient(&self, patient: &Patient) -> StoreResult<()> {
        let sql = format!(
            "INSERT INTO patients ({PATIENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
        );
        sqlx::query(&sql)
            .bind(patient.id)
            .bind(&patient.patient_id)
            .bind(&patient.name)
            .bind(&patient.mobile_number)
            .bind(patient.age)
            .bind(&patient.blood_group)
            .bind(patient.height)
            .bind(patient.weight)
            .bind(&patient.gender)
            .bind(&patient.address)
            .bind(patient.password_hash.as_str())
            .bind(patient.created_at)
            .bind(patient.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_doctor(&self, doctor: &Doctor) -> StoreResult<()> {
        let sql = format!(
            "INSERT INTO doctors ({DOCTOR_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
        );
        sqlx::query(&sql)
            .bind(doctor.id)
            .bind(&doctor.doctor_id)
            .bind(&doctor.name)
            .bind(&doctor.email)
            .bind(&doctor.phone_number)
            .bind(&doctor.medical_license_number)
            .bind(&doctor.specialization)
            .bind(&doctor.qualification)
            .bind(doctor.experience_years)
            .bind(&doctor.hospital)
            .bind(doctor.password_hash.as_str())
            .bind(doctor.created_at)
            .bind(doctor.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_patient_by_id(&self, id: Uuid) -> StoreResult<Option<Patient>> {
        let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = $1");
        let row = sqlx::query_as::<_, PatientRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Patient::from))
    }

    async fn find_doctor_by_id(&self, id: Uuid) -> StoreResult<Option<Doctor>> {
        let sql = format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE id = $1");
        let row = sqlx::query_as::<_, DoctorRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Doctor::from))
    }

    async fn find_patient_by_business_id(&self, patient_id: &str) -> StoreResult<Option<Patient>> {
        self.fetch_patient("patient_id = $1", patient_id).await
    }

    async fn find_doctor_by_business_id(&self, doctor_id: &str) -> StoreResult<Option<Doctor>> {
        self.fetch_doctor("doctor_id = $1", doctor_id).await
    }

    async fn find_patient_by_login(&self, identifier: &str) -> StoreResult<Option<Patient>> {
        self.fetch_patient("patient_id = $1 OR mobile_number = $1", identifier)
            .await
    }

    async fn find_doctor_by_login(&self, identifier: &str) -> StoreResult<Option<Doctor>> {
        self.fetch_doctor("email = $1 OR phone_number = $1", identifier)
            .await
    }

    async fn patient_natural_key_taken(
        &self,
        mobile_number: &str,
    ) -> StoreResult<Option<&'static str>> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM patients WHERE mobile_number = $1)",
        )
        .bind(mobile_number)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken.then_some("mobile_number"))
    }

    async fn doctor_natural_key_taken(
        &self,
        email: &str,
        phone_number: &str,
        medical_license_number: &str,
    ) -> StoreResult<Option<&'static str>> {
        let hit = sqlx::query_as::<_, (bool, bool, bool)>(
            "SELECT email = $1, phone_number = $2, medical_license_number = $3 \
             FROM doctors \
             WHERE email = $1 OR phone_number = $2 OR medical_license_number = $3 \
             LIMIT 1",
        )
        .bind(email)
        .bind(phone_number)
        .bind(medical_license_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(hit.and_then(|(email, phone, license)| {
            if email {
                Some("email")
            } else if phone {
                Some("phone_number")
            } else if license {
                Some("medical_license_number")
            } else {
                None
            }
        }))
    }

    async fn update_patient(&self, patient: &Patient) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE patients SET name = $2, age = $3, blood_group = $4, height = $5, weight = $6, \
             gender = $7, address = $8, password_hash = $9, updated_at = $10 WHERE id = $1",
        )
        .bind(patient.id)
        .bind(&patient.name)
        .bind(patient.age)
        .bind(&patient.blood_group)
        .bind(patient.height)
        .bind(patient.weight)
        .bind(&patient.gender)
        .bind(&patient.address)
        .bind(patient.password_hash.as_str())
        .bind(patient.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Backend(format!(
                "patient {} does not exist",
                patient.id
            )));
        }
        Ok(())
    }

    async fn update_doctor(&self, doctor: &Doctor) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE doctors SET name = $2, specialization = $3, qualification = $4, \
             experience_years = $5, hospital = $6, password_hash = $7, updated_at = $8 WHERE id = $1",
        )
        .bind(doctor.id)
        .bind(&doctor.name)
        .bind(&doctor.specialization)
        .bind(&doctor.qualification)
        .bind(doctor.experience_years)
        .bind(&doctor.hospital)
        .bind(doctor.password_hash.as_str())
        .bind(doctor.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Backend(format!(
                "doctor {} does not exist",
                doctor.id
            )));
        }
        Ok(())
    }
}
