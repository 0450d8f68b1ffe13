use crate::ids::EntityKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Which collection a principal lives in. Never stored on the record itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
        }
    }

    pub fn entity_kind(self) -> EntityKind {
        match self {
            Role::Patient => EntityKind::Patient,
            Role::Doctor => EntityKind::Doctor,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            other => Err(format!("Unknown role '{other}'")),
        }
    }
}

/// Salted bcrypt digest. Deliberately has no serde support.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn from_digest(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Patient {
    pub id: Uuid,
    pub patient_id: String,
    pub name: String,
    pub mobile_number: String,
    pub age: i32,
    pub blood_group: String,
    pub height: f64,
    pub weight: f64,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub password_hash: PasswordHash,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Doctor {
    pub id: Uuid,
    pub doctor_id: String,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub medical_license_number: String,
    pub specialization: String,
    pub qualification: Option<String>,
    pub experience_years: Option<i32>,
    pub hospital: Option<String>,
    pub password_hash: PasswordHash,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An authenticated actor; the variant is the role
#[derive(Debug, Clone, PartialEq)]
pub enum Principal {
    Patient(Patient),
    Doctor(Doctor),
}

impl Principal {
    pub fn role(&self) -> Role {
        match self {
            Principal::Patient(_) => Role::Patient,
            Principal::Doctor(_) => Role::Doctor,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Principal::Patient(p) => p.id,
            Principal::Doctor(d) => d.id,
        }
    }

    pub fn business_id(&self) -> &str {
        match self {
            Principal::Patient(p) => &p.patient_id,
            Principal::Doctor(d) => &d.doctor_id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Principal::Patient(p) => &p.name,
            Principal::Doctor(d) => &d.name,
        }
    }

    pub fn password_hash(&self) -> &PasswordHash {
        match self {
            Principal::Patient(p) => &p.password_hash,
            Principal::Doctor(d) => &d.password_hash,
        }
    }

    pub fn profile(&self) -> PrincipalProfile {
        match self {
            Principal::Patient(p) => PrincipalProfile::Patient(p.into()),
            Principal::Doctor(d) => PrincipalProfile::Doctor(d.into()),
        }
    }
}

// =============================================================================
// INPUTS
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    #[validate(custom(function = "validate_not_blank", message = "Name is required"))]
    pub name: String,
    #[validate(custom(function = "validate_mobile_number"))]
    pub mobile_number: String,
    pub password: String,
    #[validate(range(min = 0, max = 150, message = "Age must be between 0 and 150"))]
    pub age: i32,
    #[validate(custom(function = "validate_not_blank", message = "Blood group is required"))]
    pub blood_group: String,
    #[validate(range(min = 0.0, message = "Height must not be negative"))]
    pub height: f64,
    #[validate(range(min = 0.0, message = "Weight must not be negative"))]
    pub weight: f64,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewDoctor {
    #[validate(custom(function = "validate_not_blank", message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(custom(function = "validate_phone_number"))]
    pub phone_number: String,
    pub password: String,
    #[validate(custom(function = "validate_not_blank", message = "Medical license number is required"))]
    pub medical_license_number: String,
    #[validate(custom(function = "validate_not_blank", message = "Specialization is required"))]
    pub specialization: String,
    #[serde(default)]
    pub qualification: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0, message = "Experience must not be negative"))]
    pub experience_years: Option<i32>,
    #[serde(default)]
    pub hospital: Option<String>,
}

/// Profile edits. Login keys and the password are not editable here.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PatientUpdate {
    #[validate(custom(function = "validate_not_blank", message = "Name must not be empty"))]
    pub name: Option<String>,
    #[validate(range(min = 0, max = 150, message = "Age must be between 0 and 150"))]
    pub age: Option<i32>,
    #[validate(custom(function = "validate_not_blank", message = "Blood group must not be empty"))]
    pub blood_group: Option<String>,
    #[validate(range(min = 0.0, message = "Height must not be negative"))]
    pub height: Option<f64>,
    #[validate(range(min = 0.0, message = "Weight must not be negative"))]
    pub weight: Option<f64>,
    pub gender: Option<String>,
    pub address: Option<String>,
}

impl PatientUpdate {
    pub fn apply(self, patient: &mut Patient) {
        if let Some(name) = self.name {
            patient.name = name.trim().to_string();
        }
        if let Some(age) = self.age {
            patient.age = age;
        }
        if let Some(blood_group) = self.blood_group {
            patient.blood_group = blood_group;
        }
        if let Some(height) = self.height {
            patient.height = height;
        }
        if let Some(weight) = self.weight {
            patient.weight = weight;
        }
        if self.gender.is_some() {
            patient.gender = self.gender;
        }
        if self.address.is_some() {
            patient.address = self.address;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DoctorUpdate {
    #[validate(custom(function = "validate_not_blank", message = "Name must not be empty"))]
    pub name: Option<String>,
    #[validate(custom(function = "validate_not_blank", message = "Specialization must not be empty"))]
    pub specialization: Option<String>,
    pub qualification: Option<String>,
    #[validate(range(min = 0, message = "Experience must not be negative"))]
    pub experience_years: Option<i32>,
    pub hospital: Option<String>,
}

impl DoctorUpdate {
    pub fn apply(self, doctor: &mut Doctor) {
        if let Some(name) = self.name {
            doctor.name = name.trim().to_string();
        }
        if let Some(specialization) = self.specialization {
            doctor.specialization = specialization;
        }
        if self.qualification.is_some() {
            doctor.qualification = self.qualification;
        }
        if self.experience_years.is_some() {
            doctor.experience_years = self.experience_years;
        }
        if self.hospital.is_some() {
            doctor.hospital = self.hospital;
        }
    }
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn ten_digits(value: &str) -> bool {
    value.len() == 10 && value.bytes().all(|b| b.is_ascii_digit())
}

fn validate_mobile_number(value: &str) -> Result<(), ValidationError> {
    if ten_digits(value) {
        return Ok(());
    }
    let mut err = ValidationError::new("mobile_number");
    err.message = Some(Cow::Borrowed("Mobile number must be 10 digits"));
    Err(err)
}

fn validate_phone_number(value: &str) -> Result<(), ValidationError> {
    if ten_digits(value) {
        return Ok(());
    }
    let mut err = ValidationError::new("phone_number");
    err.message = Some(Cow::Borrowed("Phone number must be 10 digits"));
    Err(err)
}

// =============================================================================
// PUBLIC PROJECTIONS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfile {
    pub id: Uuid,
    pub patient_id: String,
    pub name: String,
    pub mobile_number: String,
    pub age: i32,
    pub blood_group: String,
    pub height: f64,
    pub weight: f64,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Patient> for PatientProfile {
    fn from(p: &Patient) -> Self {
        Self {
            id: p.id,
            patient_id: p.patient_id.clone(),
            name: p.name.clone(),
            mobile_number: p.mobile_number.clone(),
            age: p.age,
            blood_group: p.blood_group.clone(),
            height: p.height,
            weight: p.weight,
            gender: p.gender.clone(),
            address: p.address.clone(),
            role: Role::Patient,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DoctorProfile {
    pub id: Uuid,
    pub doctor_id: String,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub medical_license_number: String,
    pub specialization: String,
    pub qualification: Option<String>,
    pub experience_years: Option<i32>,
    pub hospital: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Doctor> for DoctorProfile {
    fn from(d: &Doctor) -> Self {
        Self {
            id: d.id,
            doctor_id: d.doctor_id.clone(),
            name: d.name.clone(),
            email: d.email.clone(),
            phone_number: d.phone_number.clone(),
            medical_license_number: d.medical_license_number.clone(),
            specialization: d.specialization.clone(),
            qualification: d.qualification.clone(),
            experience_years: d.experience_years,
            hospital: d.hospital.clone(),
            role: Role::Doctor,
            created_at: d.created_at,
            updated_at: d.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PrincipalProfile {
    Patient(PatientProfile),
    Doctor(DoctorProfile),
}
