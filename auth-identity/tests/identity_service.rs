use async_trait::async_trait;
use auth_identity::*;
use chrono::{TimeZone, Utc};
use regex::Regex;
use std::sync::Arc;
use tokio::sync::Barrier;
use uuid::Uuid;

fn test_config() -> IdentityConfig {
    IdentityConfig {
        bcrypt_cost: 4,
        ..Default::default()
    }
}

fn pinned_allocator(suffixes: Vec<u32>) -> IdentifierAllocator {
    let clock = FixedClock(Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap());
    IdentifierAllocator::new(Arc::new(clock), Arc::new(SequenceRandom::new(suffixes)))
}

fn asha() -> NewPatient {
    NewPatient {
        name: "Asha".into(),
        mobile_number: "9999999999".into(),
        password: "secret1".into(),
        age: 30,
        blood_group: "O+".into(),
        height: 160.0,
        weight: 55.0,
        gender: None,
        address: None,
    }
}

fn seeded_patient(patient_id: &str, mobile: &str) -> Patient {
    Patient {
        id: Uuid::new_v4(),
        patient_id: patient_id.into(),
        name: "Seed".into(),
        mobile_number: mobile.into(),
        age: 40,
        blood_group: "A+".into(),
        height: 170.0,
        weight: 70.0,
        gender: None,
        address: None,
        password_hash: PasswordHash::from_digest("seeded"),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_register_then_authenticate() {
    let service = IdentityService::new(Arc::new(InMemoryPrincipalRepository::new()), test_config());

    let patient = service.register_patient(asha()).await.unwrap();
    let format = Regex::new(r"^OPID-\d{8}-\d{4}$").unwrap();
    assert!(format.is_match(&patient.patient_id));

    let principal = service
        .authenticate(Role::Patient, "9999999999", "secret1")
        .await
        .unwrap();
    assert_eq!(principal.role(), Role::Patient);
    assert_eq!(principal.business_id(), patient.patient_id);

    let by_business_id = service
        .authenticate(Role::Patient, &patient.patient_id, "secret1")
        .await
        .unwrap();
    assert_eq!(by_business_id.id(), patient.id);

    let profile = serde_json::to_value(principal.profile()).unwrap();
    assert!(profile.get("password").is_none());
    assert!(profile.get("passwordHash").is_none());
}

#[tokio::test]
async fn test_wrong_password_and_unknown_identifier_look_identical() {
    let service = IdentityService::new(Arc::new(InMemoryPrincipalRepository::new()), test_config());
    service.register_patient(asha()).await.unwrap();

    let wrong_password = service
        .authenticate(Role::Patient, "9999999999", "wrong")
        .await
        .unwrap_err();
    let unknown = service
        .authenticate(Role::Patient, "1234567890", "secret1")
        .await
        .unwrap_err();

    assert!(matches!(wrong_password, IdentityError::InvalidCredentials));
    assert!(matches!(unknown, IdentityError::InvalidCredentials));
    assert_eq!(wrong_password.to_string(), unknown.to_string());
}

#[tokio::test]
async fn test_patient_cannot_log_in_as_doctor() {
    let service = IdentityService::new(Arc::new(InMemoryPrincipalRepository::new()), test_config());
    service.register_patient(asha()).await.unwrap();

    let err = service
        .authenticate(Role::Doctor, "9999999999", "secret1")
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::InvalidCredentials));
}

#[tokio::test]
async fn test_duplicate_mobile_is_rejected() {
    let service = IdentityService::new(Arc::new(InMemoryPrincipalRepository::new()), test_config());
    service.register_patient(asha()).await.unwrap();

    let err = service.register_patient(asha()).await.unwrap_err();
    assert!(matches!(err, IdentityError::DuplicatePrincipal(msg) if msg.contains("mobile number")));
}

#[tokio::test]
async fn test_profile_update_keeps_password_hash() {
    let repo = Arc::new(InMemoryPrincipalRepository::new());
    let service = IdentityService::new(repo.clone(), test_config());
    let patient = service.register_patient(asha()).await.unwrap();

    let before = repo.find_patient_by_id(patient.id).await.unwrap().unwrap();

    let updated = service
        .update_patient_profile(
            patient.id,
            PatientUpdate {
                name: Some("Asha K".into()),
                weight: Some(54.5),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let after = repo.find_patient_by_id(patient.id).await.unwrap().unwrap();
    assert_eq!(updated.name, "Asha K");
    assert_eq!(after.weight, 54.5);
    assert_eq!(before.password_hash, after.password_hash);

    assert!(service
        .authenticate(Role::Patient, "9999999999", "secret1")
        .await
        .is_ok());
}

#[tokio::test]
async fn test_allocation_skips_seeded_identifiers() {
    let repo = Arc::new(InMemoryPrincipalRepository::new());
    for (n, mobile) in [(1, "1111111111"), (2, "2222222222"), (3, "3333333333")] {
        repo.insert_patient(&seeded_patient(&format!("OPID-20240105-000{n}"), mobile))
            .await
            .unwrap();
    }

    let service = IdentityService::new(repo, test_config())
        .with_allocator(pinned_allocator(vec![1, 2, 3, 4]));

    let patient = service.register_patient(asha()).await.unwrap();
    assert_eq!(patient.patient_id, "OPID-20240105-0004");
}

#[tokio::test]
async fn test_allocation_cap_surfaces_exhaustion() {
    let repo = Arc::new(InMemoryPrincipalRepository::new());
    repo.insert_patient(&seeded_patient("OPID-20240105-0007", "1111111111"))
        .await
        .unwrap();

    let config = IdentityConfig {
        max_id_attempts: Some(5),
        ..test_config()
    };
    let service = IdentityService::new(repo, config).with_allocator(pinned_allocator(vec![7]));

    let err = service.register_patient(asha()).await.unwrap_err();
    assert!(matches!(
        err,
        IdentityError::IdentifierExhausted { kind: EntityKind::Patient, attempts: 5 }
    ));
}

/// Holds every identifier lookup until two callers have passed it
struct RendezvousRepository {
    inner: InMemoryPrincipalRepository,
    barrier: Barrier,
}

#[async_trait]
impl IdentifierLookup for RendezvousRepository {
    async fn identifier_exists(&self, kind: EntityKind, candidate: &str) -> Result<bool, StoreError> {
        let exists = self.inner.identifier_exists(kind, candidate).await?;
        self.barrier.wait().await;
        Ok(exists)
    }
}

#[async_trait]
impl PrincipalRepository for RendezvousRepository {
    async fn insert_patient(&self, patient: &Patient) -> Result<(), StoreError> {
        self.inner.insert_patient(patient).await
    }
    async fn insert_doctor(&self, doctor: &Doctor) -> Result<(), StoreError> {
        self.inner.insert_doctor(doctor).await
    }
    async fn find_patient_by_id(&self, id: Uuid) -> Result<Option<Patient>, StoreError> {
        self.inner.find_patient_by_id(id).await
    }
    async fn find_doctor_by_id(&self, id: Uuid) -> Result<Option<Doctor>, StoreError> {
        self.inner.find_doctor_by_id(id).await
    }
    async fn find_patient_by_business_id(&self, id: &str) -> Result<Option<Patient>, StoreError> {
        self.inner.find_patient_by_business_id(id).await
    }
    async fn find_doctor_by_business_id(&self, id: &str) -> Result<Option<Doctor>, StoreError> {
        self.inner.find_doctor_by_business_id(id).await
    }
    async fn find_patient_by_login(&self, identifier: &str) -> Result<Option<Patient>, StoreError> {
        self.inner.find_patient_by_login(identifier).await
    }
    async fn find_doctor_by_login(&self, identifier: &str) -> Result<Option<Doctor>, StoreError> {
        self.inner.find_doctor_by_login(identifier).await
    }
    async fn patient_natural_key_taken(&self, mobile: &str) -> Result<Option<&'static str>, StoreError> {
        self.inner.patient_natural_key_taken(mobile).await
    }
    async fn doctor_natural_key_taken(
        &self,
        email: &str,
        phone: &str,
        license: &str,
    ) -> Result<Option<&'static str>, StoreError> {
        self.inner.doctor_natural_key_taken(email, phone, license).await
    }
    async fn update_patient(&self, patient: &Patient) -> Result<(), StoreError> {
        self.inner.update_patient(patient).await
    }
    async fn update_doctor(&self, doctor: &Doctor) -> Result<(), StoreError> {
        self.inner.update_doctor(doctor).await
    }
}

#[tokio::test]
async fn test_concurrent_colliding_registrations() {
    let repo = Arc::new(RendezvousRepository {
        inner: InMemoryPrincipalRepository::new(),
        barrier: Barrier::new(2),
    });
    let service = IdentityService::new(repo.clone(), test_config())
        .with_allocator(pinned_allocator(vec![42]));

    let mut second = asha();
    second.name = "Ravi".into();
    second.mobile_number = "8888888888".into();

    let (first, second) = tokio::join!(service.register_patient(asha()), service.register_patient(second));

    let outcomes = [first, second];
    let winners: Vec<&Patient> = outcomes.iter().filter_map(|r| r.as_ref().ok()).collect();
    let losers: Vec<&IdentityError> = outcomes.iter().filter_map(|r| r.as_ref().err()).collect();

    assert_eq!(winners.len(), 1);
    assert_eq!(winners[0].patient_id, "OPID-20240105-0042");
    assert_eq!(losers.len(), 1);
    assert!(matches!(losers[0], IdentityError::DuplicatePrincipal(msg) if msg.contains("patient ID")));

    let stored = repo
        .inner
        .find_patient_by_business_id("OPID-20240105-0042")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.id, winners[0].id);
}

#[tokio::test]
async fn test_token_round_trip_for_registered_patient() {
    let config = test_config();
    let service = IdentityService::new(Arc::new(InMemoryPrincipalRepository::new()), config.clone());
    let tokens = TokenService::from_config(&config);

    let patient = service.register_patient(asha()).await.unwrap();
    let issued = tokens.issue(patient.id, Role::Patient).unwrap();
    let verified = tokens.verify(&issued.token).unwrap();

    let principal = service
        .find_principal(verified.role, verified.subject_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(principal.business_id(), patient.patient_id);
}
