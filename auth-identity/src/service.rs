use crate::{config::*, error::*, ids::*, models::*, password::PasswordHasher, repository::*};
use logger_redacted::redacted_warn;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// bcrypt only hashes the first 72 bytes of its input
const MAX_PASSWORD_BYTES: usize = 72;

pub struct IdentityService {
    repo: Arc<dyn PrincipalRepository>,
    allocator: IdentifierAllocator,
    hasher: PasswordHasher,
    config: IdentityConfig,
}

impl IdentityService {
    pub fn new(repo: Arc<dyn PrincipalRepository>, config: IdentityConfig) -> Self {
        let allocator = IdentifierAllocator::system().with_max_attempts(config.max_id_attempts);
        Self {
            repo,
            allocator,
            hasher: PasswordHasher::new(config.bcrypt_cost),
            config,
        }
    }

    /// Swap in an allocator with pinned time and randomness
    pub fn with_allocator(mut self, allocator: IdentifierAllocator) -> Self {
        self.allocator = allocator.with_max_attempts(self.config.max_id_attempts);
        self
    }

    pub fn config(&self) -> &IdentityConfig {
        &self.config
    }

    pub async fn register_patient(&self, input: NewPatient) -> Result<Patient> {
        input.validate()?;
        self.check_password(&input.password)?;

        if let Some(field) = self.repo.patient_natural_key_taken(&input.mobile_number).await? {
            return Err(duplicate(Role::Patient, field));
        }

        let patient_id = self
            .allocator
            .allocate(EntityKind::Patient, self.repo.as_ref())
            .await?;
        let password_hash = self.hasher.hash(&input.password).await?;
        let now = self.allocator.clock().now();

        let patient = Patient {
            id: Uuid::new_v4(),
            patient_id,
            name: input.name.trim().to_string(),
            mobile_number: input.mobile_number,
            age: input.age,
            blood_group: input.blood_group,
            height: input.height,
            weight: input.weight,
            gender: input.gender,
            address: input.address,
            password_hash,
            created_at: now,
            updated_at: now,
        };

        match self.repo.insert_patient(&patient).await {
            Ok(()) => {
                tracing::info!(patient_id = %patient.patient_id, "Patient registered");
                Ok(patient)
            }
            Err(StoreError::UniqueViolation { field }) => {
                tracing::warn!(field = %field, "Patient insert lost a uniqueness race");
                Err(duplicate(Role::Patient, &field))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn register_doctor(&self, input: NewDoctor) -> Result<Doctor> {
        input.validate()?;
        self.check_password(&input.password)?;

        let email = input.email.trim().to_lowercase();
        if let Some(field) = self
            .repo
            .doctor_natural_key_taken(&email, &input.phone_number, &input.medical_license_number)
            .await?
        {
            return Err(duplicate(Role::Doctor, field));
        }

        let doctor_id = self
            .allocator
            .allocate(EntityKind::Doctor, self.repo.as_ref())
            .await?;
        let password_hash = self.hasher.hash(&input.password).await?;
        let now = self.allocator.clock().now();

        let doctor = Doctor {
            id: Uuid::new_v4(),
            doctor_id,
            name: input.name.trim().to_string(),
            email,
            phone_number: input.phone_number,
            medical_license_number: input.medical_license_number,
            specialization: input.specialization,
            qualification: input.qualification,
            experience_years: input.experience_years,
            hospital: input.hospital,
            password_hash,
            created_at: now,
            updated_at: now,
        };

        match self.repo.insert_doctor(&doctor).await {
            Ok(()) => {
                tracing::info!(doctor_id = %doctor.doctor_id, "Doctor registered");
                Ok(doctor)
            }
            Err(StoreError::UniqueViolation { field }) => {
                tracing::warn!(field = %field, "Doctor insert lost a uniqueness race");
                Err(duplicate(Role::Doctor, &field))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Unknown identifier and wrong password both return `InvalidCredentials`
    pub async fn authenticate(&self, role: Role, identifier: &str, password: &str) -> Result<Principal> {
        let identifier = identifier.trim();
        let principal = match role {
            Role::Patient => self
                .repo
                .find_patient_by_login(identifier)
                .await?
                .map(Principal::Patient),
            Role::Doctor => self
                .repo
                .find_doctor_by_login(&identifier.to_lowercase())
                .await?
                .map(Principal::Doctor),
        };

        let Some(principal) = principal else {
            redacted_warn!(identifier = identifier, role = %role, "Login rejected");
            return Err(IdentityError::InvalidCredentials);
        };

        if !self.hasher.verify(password, principal.password_hash()).await? {
            redacted_warn!(identifier = identifier, role = %role, "Login rejected");
            return Err(IdentityError::InvalidCredentials);
        }

        tracing::info!(business_id = %principal.business_id(), role = %role, "Login succeeded");
        Ok(principal)
    }

    pub async fn find_principal(&self, role: Role, id: Uuid) -> Result<Option<Principal>> {
        let principal = match role {
            Role::Patient => self.repo.find_patient_by_id(id).await?.map(Principal::Patient),
            Role::Doctor => self.repo.find_doctor_by_id(id).await?.map(Principal::Doctor),
        };
        Ok(principal)
    }

    pub async fn find_patient_by_business_id(&self, patient_id: &str) -> Result<Option<Patient>> {
        Ok(self.repo.find_patient_by_business_id(patient_id).await?)
    }

    pub async fn find_doctor_by_business_id(&self, doctor_id: &str) -> Result<Option<Doctor>> {
        Ok(self.repo.find_doctor_by_business_id(doctor_id).await?)
    }

    /// The stored password hash is carried over untouched
    pub async fn update_patient_profile(&self, id: Uuid, update: PatientUpdate) -> Result<Patient> {
        update.validate()?;

        let mut patient = self
            .repo
            .find_patient_by_id(id)
            .await?
            .ok_or(IdentityError::PrincipalNotFound)?;

        update.apply(&mut patient);
        patient.updated_at = self.allocator.clock().now();
        self.repo.update_patient(&patient).await?;

        tracing::info!(patient_id = %patient.patient_id, "Patient profile updated");
        Ok(patient)
    }

    pub async fn update_doctor_profile(&self, id: Uuid, update: DoctorUpdate) -> Result<Doctor> {
        update.validate()?;

        let mut doctor = self
            .repo
            .find_doctor_by_id(id)
            .await?
            .ok_or(IdentityError::PrincipalNotFound)?;

        update.apply(&mut doctor);
        doctor.updated_at = self.allocator.clock().now();
        self.repo.update_doctor(&doctor).await?;

        tracing::info!(doctor_id = %doctor.doctor_id, "Doctor profile updated");
        Ok(doctor)
    }

    /// The only path that re-hashes a password
    pub async fn change_password(
        &self,
        role: Role,
        id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<()> {
        self.check_password(new_password)?;

        let principal = self
            .find_principal(role, id)
            .await?
            .ok_or(IdentityError::PrincipalNotFound)?;

        if !self.hasher.verify(current_password, principal.password_hash()).await? {
            return Err(IdentityError::InvalidCredentials);
        }

        let password_hash = self.hasher.hash(new_password).await?;
        let now = self.allocator.clock().now();

        match principal {
            Principal::Patient(mut patient) => {
                patient.password_hash = password_hash;
                patient.updated_at = now;
                self.repo.update_patient(&patient).await?;
            }
            Principal::Doctor(mut doctor) => {
                doctor.password_hash = password_hash;
                doctor.updated_at = now;
                self.repo.update_doctor(&doctor).await?;
            }
        }

        tracing::info!(role = %role, principal_id = %id, "Password changed");
        Ok(())
    }

    fn check_password(&self, password: &str) -> Result<()> {
        let min = self.config.password_min_length;
        if password.chars().count() < min {
            return Err(IdentityError::Validation(format!(
                "Password must be at least {min} characters"
            )));
        }
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(IdentityError::Validation(format!(
                "Password must be at most {MAX_PASSWORD_BYTES} bytes"
            )));
        }
        Ok(())
    }
}

fn duplicate(role: Role, field: &str) -> IdentityError {
    let label = match field {
        "patient_id" => "patient ID",
        "doctor_id" => "doctor ID",
        "mobile_number" => "mobile number",
        "phone_number" => "phone number",
        "medical_license_number" => "medical license number",
        other => other,
    };
    IdentityError::DuplicatePrincipal(format!("A {role} with this {label} already exists"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> IdentityService {
        let config = IdentityConfig {
            bcrypt_cost: 4,
            ..Default::default()
        };
        IdentityService::new(Arc::new(InMemoryPrincipalRepository::new()), config)
    }

    fn doctor_input() -> NewDoctor {
        NewDoctor {
            name: "Dr. Rao".into(),
            email: "Rao@Clinic.org".into(),
            phone_number: "8888888888".into(),
            password: "scalpel".into(),
            medical_license_number: "LIC-778899".into(),
            specialization: "Radiology".into(),
            qualification: None,
            experience_years: Some(12),
            hospital: None,
        }
    }

    #[tokio::test]
    async fn test_short_password_is_rejected() {
        let mut input = doctor_input();
        input.password = "abc".into();

        let err = service().register_doctor(input).await.unwrap_err();
        assert!(matches!(err, IdentityError::Validation(msg) if msg.contains("at least 6")));
    }

    #[tokio::test]
    async fn test_password_beyond_bcrypt_limit_is_rejected() {
        let service = service();
        let mut input = doctor_input();
        input.password = "a".repeat(73);
        let err = service.register_doctor(input).await.unwrap_err();
        assert!(matches!(err, IdentityError::Validation(msg) if msg.contains("at most 72")));

        // Multi-byte characters count by their encoded length
        let mut input = doctor_input();
        input.password = "\u{00e9}".repeat(37);
        assert!(service.register_doctor(input).await.is_err());

        let mut input = doctor_input();
        input.password = "a".repeat(72);
        let doctor = service.register_doctor(input).await.unwrap();

        let err = service
            .change_password(Role::Doctor, doctor.id, &"a".repeat(72), &"b".repeat(80))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Validation(_)));
    }

    #[tokio::test]
    async fn test_blank_name_is_rejected() {
        let mut input = doctor_input();
        input.name = "   ".into();
        let err = service().register_doctor(input).await.unwrap_err();
        assert!(matches!(err, IdentityError::Validation(msg) if msg == "Name is required"));
    }

    #[tokio::test]
    async fn test_doctor_email_is_case_insensitive() {
        let service = service();
        let doctor = service.register_doctor(doctor_input()).await.unwrap();
        assert_eq!(doctor.email, "rao@clinic.org");
        assert!(EntityKind::Doctor.matches(&doctor.doctor_id));

        let principal = service
            .authenticate(Role::Doctor, "RAO@clinic.org", "scalpel")
            .await
            .unwrap();
        assert_eq!(principal.id(), doctor.id);
    }

    #[tokio::test]
    async fn test_duplicate_license_names_the_field() {
        let service = service();
        service.register_doctor(doctor_input()).await.unwrap();

        let mut second = doctor_input();
        second.email = "other@clinic.org".into();
        second.phone_number = "7777777777".into();

        let err = service.register_doctor(second).await.unwrap_err();
        assert!(matches!(
            err,
            IdentityError::DuplicatePrincipal(msg) if msg.contains("medical license number")
        ));
    }

    #[tokio::test]
    async fn test_change_password_requires_current() {
        let service = service();
        let doctor = service.register_doctor(doctor_input()).await.unwrap();

        let err = service
            .change_password(Role::Doctor, doctor.id, "wrong", "new-secret")
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::InvalidCredentials));

        service
            .change_password(Role::Doctor, doctor.id, "scalpel", "new-secret")
            .await
            .unwrap();
        assert!(service
            .authenticate(Role::Doctor, "8888888888", "new-secret")
            .await
            .is_ok());
        assert!(service
            .authenticate(Role::Doctor, "8888888888", "scalpel")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_missing_principal_on_update() {
        let err = service()
            .update_patient_profile(Uuid::new_v4(), PatientUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::PrincipalNotFound));
    }
}
