use crate::error::StoreError;
use crate::ids::{EntityKind, IdentifierLookup};
use crate::models::{Doctor, Patient};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

type StoreResult<T> = std::result::Result<T, StoreError>;

/// Persistence for patients and doctors
///
/// Implementations must enforce uniqueness of every business id and natural
/// key at write time and report a clash as [`StoreError::UniqueViolation`].
/// That check is the authoritative guard against duplicate identifiers; the
/// lookups used before insert are only a pre-check.
#[async_trait]
pub trait PrincipalRepository: IdentifierLookup + Send + Sync {
    async fn insert_patient(&self, patient: &Patient) -> StoreResult<()>;
    async fn insert_doctor(&self, doctor: &Doctor) -> StoreResult<()>;

    async fn find_patient_by_id(&self, id: Uuid) -> StoreResult<Option<Patient>>;
    async fn find_doctor_by_id(&self, id: Uuid) -> StoreResult<Option<Doctor>>;

    async fn find_patient_by_business_id(&self, patient_id: &str) -> StoreResult<Option<Patient>>;
    async fn find_doctor_by_business_id(&self, doctor_id: &str) -> StoreResult<Option<Doctor>>;

    /// Match on patient id or mobile number
    async fn find_patient_by_login(&self, identifier: &str) -> StoreResult<Option<Patient>>;
    /// Match on email or phone number
    async fn find_doctor_by_login(&self, identifier: &str) -> StoreResult<Option<Doctor>>;

    /// Name of the first natural-key column already holding this value
    async fn patient_natural_key_taken(&self, mobile_number: &str)
        -> StoreResult<Option<&'static str>>;
    async fn doctor_natural_key_taken(
        &self,
        email: &str,
        phone_number: &str,
        medical_license_number: &str,
    ) -> StoreResult<Option<&'static str>>;

    async fn update_patient(&self, patient: &Patient) -> StoreResult<()>;
    async fn update_doctor(&self, doctor: &Doctor) -> StoreResult<()>;
}

fn unique_violation(field: &str) -> StoreError {
    StoreError::UniqueViolation {
        field: field.to_string(),
    }
}

// In-memory implementation for development and tests
#[derive(Debug, Default)]
pub struct InMemoryPrincipalRepository {
    patients: RwLock<HashMap<Uuid, Patient>>,
    doctors: RwLock<HashMap<Uuid, Doctor>>,
}

impl InMemoryPrincipalRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn patient_clash(existing: &Patient, candidate: &Patient) -> Option<&'static str> {
    if existing.patient_id == candidate.patient_id {
        Some("patient_id")
    } else if existing.mobile_number == candidate.mobile_number {
        Some("mobile_number")
    } else {
        None
    }
}

fn doctor_clash(existing: &Doctor, candidate: &Doctor) -> Option<&'static str> {
    if existing.doctor_id == candidate.doctor_id {
        Some("doctor_id")
    } else if existing.email == candidate.email {
        Some("email")
    } else if existing.phone_number == candidate.phone_number {
        Some("phone_number")
    } else if existing.medical_license_number == candidate.medical_license_number {
        Some("medical_license_number")
    } else {
        None
    }
}

#[async_trait]
impl IdentifierLookup for InMemoryPrincipalRepository {
    async fn identifier_exists(&self, kind: EntityKind, candidate: &str) -> StoreResult<bool> {
        match kind {
            EntityKind::Patient => Ok(self
                .patients
                .read()
                .await
                .values()
                .any(|p| p.patient_id == candidate)),
            EntityKind::Doctor => Ok(self
                .doctors
                .read()
                .await
                .values()
                .any(|d| d.doctor_id == candidate)),
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl PrincipalRepository for InMemoryPrincipalRepository {
    async fn insert_patient(&self, patient: &Patient) -> StoreResult<()> {
        let mut patients = self.patients.write().await;
        if let Some(field) = patients.values().find_map(|p| patient_clash(p, patient)) {
            return Err(unique_violation(field));
        }
        patients.insert(patient.id, patient.clone());
        Ok(())
    }

    async fn insert_doctor(&self, doctor: &Doctor) -> StoreResult<()> {
        let mut doctors = self.doctors.write().await;
        if let Some(field) = doctors.values().find_map(|d| doctor_clash(d, doctor)) {
            return Err(unique_violation(field));
        }
        doctors.insert(doctor.id, doctor.clone());
        Ok(())
    }

    async fn find_patient_by_id(&self, id: Uuid) -> StoreResult<Option<Patient>> {
        Ok(self.patients.read().await.get(&id).cloned())
    }

    async fn find_doctor_by_id(&self, id: Uuid) -> StoreResult<Option<Doctor>> {
        Ok(self.doctors.read().await.get(&id).cloned())
    }

    async fn find_patient_by_business_id(&self, patient_id: &str) -> StoreResult<Option<Patient>> {
        Ok(self
            .patients
            .read()
            .await
            .values()
            .find(|p| p.patient_id == patient_id)
            .cloned())
    }

    async fn find_doctor_by_business_id(&self, doctor_id: &str) -> StoreResult<Option<Doctor>> {
        Ok(self
            .doctors
            .read()
            .await
            .values()
            .find(|d| d.doctor_id == doctor_id)
            .cloned())
    }

    async fn find_patient_by_login(&self, identifier: &str) -> StoreResult<Option<Patient>> {
        Ok(self
            .patients
            .read()
            .await
            .values()
            .find(|p| p.patient_id == identifier || p.mobile_number == identifier)
            .cloned())
    }

    async fn find_doctor_by_login(&self, identifier: &str) -> StoreResult<Option<Doctor>> {
        Ok(self
            .doctors
            .read()
            .await
            .values()
            .find(|d| d.email == identifier || d.phone_number == identifier)
            .cloned())
    }

    async fn patient_natural_key_taken(
        &self,
        mobile_number: &str,
    ) -> StoreResult<Option<&'static str>> {
        let taken = self
            .patients
            .read()
            .await
            .values()
            .any(|p| p.mobile_number == mobile_number);
        Ok(taken.then_some("mobile_number"))
    }

    async fn doctor_natural_key_taken(
        &self,
        email: &str,
        phone_number: &str,
        medical_license_number: &str,
    ) -> StoreResult<Option<&'static str>> {
        let doctors = self.doctors.read().await;
        Ok(doctors.values().find_map(|d| {
            if d.email == email {
                Some("email")
            } else if d.phone_number == phone_number {
                Some("phone_number")
            } else if d.medical_license_number == medical_license_number {
                Some("medical_license_number")
            } else {
                None
            }
        }))
    }

    async fn update_patient(&self, patient: &Patient) -> StoreResult<()> {
        match self.patients.write().await.get_mut(&patient.id) {
            Some(slot) => {
                *slot = patient.clone();
                Ok(())
            }
            None => Err(StoreError::Backend(format!(
                "patient {} does not exist",
                patient.id
            ))),
        }
    }

    async fn update_doctor(&self, doctor: &Doctor) -> StoreResult<()> {
        match self.doctors.write().await.get_mut(&doctor.id) {
            Some(slot) => {
                *slot = doctor.clone();
                Ok(())
            }
            None => Err(StoreError::Backend(format!(
                "doctor {} does not exist",
                doctor.id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PasswordHash;
    use chrono::Utc;

    fn patient(patient_id: &str, mobile: &str) -> Patient {
        Patient {
            id: Uuid::new_v4(),
            patient_id: patient_id.into(),
            name: "Asha".into(),
            mobile_number: mobile.into(),
            age: 30,
            blood_group: "O+".into(),
            height: 160.0,
            weight: 55.0,
            gender: None,
            address: None,
            password_hash: PasswordHash::from_digest("digest"),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_business_id() {
        let repo = InMemoryPrincipalRepository::new();
        repo.insert_patient(&patient("OPID-20240105-0001", "9999999999"))
            .await
            .unwrap();

        let err = repo
            .insert_patient(&patient("OPID-20240105-0001", "8888888888"))
            .await
            .unwrap_err();
        assert_eq!(err, unique_violation("patient_id"));
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_mobile() {
        let repo = InMemoryPrincipalRepository::new();
        repo.insert_patient(&patient("OPID-20240105-0001", "9999999999"))
            .await
            .unwrap();

        let err = repo
            .insert_patient(&patient("OPID-20240105-0002", "9999999999"))
            .await
            .unwrap_err();
        assert_eq!(err, unique_violation("mobile_number"));
    }

    #[tokio::test]
    async fn test_login_lookup_matches_id_or_mobile() {
        let repo = InMemoryPrincipalRepository::new();
        let asha = patient("OPID-20240105-0001", "9999999999");
        repo.insert_patient(&asha).await.unwrap();

        let by_mobile = repo.find_patient_by_login("9999999999").await.unwrap();
        let by_id = repo.find_patient_by_login("OPID-20240105-0001").await.unwrap();
        assert_eq!(by_mobile.map(|p| p.id), Some(asha.id));
        assert_eq!(by_id.map(|p| p.id), Some(asha.id));
        assert!(repo.find_patient_by_login("0000000000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_identifier_lookup_is_scoped_by_kind() {
        let repo = InMemoryPrincipalRepository::new();
        repo.insert_patient(&patient("OPID-20240105-0001", "9999999999"))
            .await
            .unwrap();

        assert!(repo
            .identifier_exists(EntityKind::Patient, "OPID-20240105-0001")
            .await
            .unwrap());
        assert!(!repo
            .identifier_exists(EntityKind::Doctor, "OPID-20240105-0001")
            .await
            .unwrap());
    }
}
