use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

// ============================================================================
// VISITS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    #[validate(length(min = 1, message = "Medicine name is required"))]
    pub medicine: String,
    #[validate(length(min = 1, message = "Dosage is required"))]
    pub dosage: String,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
}

/// A consultation recorded by a doctor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    pub id: Uuid,
    /// `VISIT-<epoch millis>-NNN`, printed on the visit slip
    pub visit_id: String,
    pub patient: Uuid,
    pub doctor: Uuid,
    pub visit_date: DateTime<Utc>,
    pub reason: String,
    pub diagnosis: String,
    pub symptoms: Vec<String>,
    pub prescriptions: Vec<Prescription>,
    pub notes: Option<String>,
    pub follow_up_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewVisit {
    /// Business id of the patient, e.g. `OPID-20240105-0042`
    #[validate(length(min = 1, message = "Patient ID is required"))]
    pub patient_id: String,
    /// Defaults to the time of recording
    #[serde(default)]
    pub visit_date: Option<DateTime<Utc>>,
    #[validate(length(min = 1, message = "Reason for visit is required"))]
    pub reason: String,
    #[validate(length(min = 1, message = "Diagnosis is required"))]
    pub diagnosis: String,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    #[validate(nested)]
    pub prescriptions: Vec<Prescription>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub follow_up_date: Option<DateTime<Utc>>,
}

// ============================================================================
// SCAN REPORTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Pdf,
}

impl FileKind {
    /// Classify an upload by its declared media type
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if essence == "application/pdf" {
            Some(FileKind::Pdf)
        } else if essence.starts_with("image/") && essence.len() > "image/".len() {
            Some(FileKind::Image)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::Image => "image",
            FileKind::Pdf => "pdf",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(FileKind::Image),
            "pdf" => Ok(FileKind::Pdf),
            other => Err(format!("Unknown file kind '{other}'")),
        }
    }
}

/// Metadata for an uploaded scan. File bytes live in external storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub id: Uuid,
    pub report_id: String,
    pub patient: Uuid,
    pub doctor: Uuid,
    pub visit: Option<Uuid>,
    pub title: String,
    pub scan_type: String,
    pub file_path: String,
    pub file_kind: FileKind,
    pub findings: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewReport {
    #[validate(length(min = 1, message = "Patient ID is required"))]
    pub patient_id: String,
    /// Business id of the visit this scan belongs to
    #[serde(default)]
    pub visit_id: Option<String>,
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Scan type is required"))]
    pub scan_type: String,
    #[validate(length(min = 1, message = "File path is required"))]
    pub file_path: String,
    #[validate(length(min = 1, message = "Media type is required"))]
    pub media_type: String,
    #[serde(default)]
    pub findings: Option<String>,
}

// ============================================================================
// PATIENT QUERIES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    Open,
    Answered,
}

impl QueryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryStatus::Open => "open",
            QueryStatus::Answered => "answered",
        }
    }
}

impl FromStr for QueryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(QueryStatus::Open),
            "answered" => Ok(QueryStatus::Answered),
            other => Err(format!("Unknown query status '{other}'")),
        }
    }
}

/// A question sent by a patient to one doctor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientQuery {
    pub id: Uuid,
    pub query_id: String,
    pub patient: Uuid,
    pub doctor: Uuid,
    pub subject: String,
    pub message: String,
    pub status: QueryStatus,
    pub response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub answered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewQuery {
    #[validate(length(min = 1, message = "Doctor ID is required"))]
    pub doctor_id: String,
    #[validate(length(min = 1, max = 200, message = "Subject must be between 1 and 200 characters"))]
    pub subject: String,
    #[validate(length(min = 1, message = "Message is required"))]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QueryReply {
    #[validate(length(min = 1, message = "Response is required"))]
    pub response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_kind_from_media_type() {
        assert_eq!(FileKind::from_media_type("application/pdf"), Some(FileKind::Pdf));
        assert_eq!(FileKind::from_media_type("image/png"), Some(FileKind::Image));
        assert_eq!(FileKind::from_media_type("IMAGE/JPEG"), Some(FileKind::Image));
        assert_eq!(
            FileKind::from_media_type("application/pdf; charset=binary"),
            Some(FileKind::Pdf)
        );
        assert_eq!(FileKind::from_media_type("image/"), None);
        assert_eq!(FileKind::from_media_type("text/plain"), None);
        assert_eq!(FileKind::from_media_type(""), None);
    }

    #[test]
    fn test_new_visit_defaults() {
        let visit: NewVisit = serde_json::from_value(serde_json::json!({
            "patientId": "OPID-20240105-0042",
            "reason": "Fever",
            "diagnosis": "Viral infection"
        }))
        .unwrap();

        assert!(visit.symptoms.is_empty());
        assert!(visit.prescriptions.is_empty());
        assert!(visit.visit_date.is_none());
        assert!(visit.validate().is_ok());
    }

    #[test]
    fn test_nested_prescription_is_validated() {
        let visit: NewVisit = serde_json::from_value(serde_json::json!({
            "patientId": "OPID-20240105-0042",
            "reason": "Fever",
            "diagnosis": "Viral infection",
            "prescriptions": [{ "medicine": "", "dosage": "500mg" }]
        }))
        .unwrap();

        assert!(visit.validate().is_err());
    }

    #[test]
    fn test_query_serializes_status_lowercase() {
        let query = PatientQuery {
            id: Uuid::new_v4(),
            query_id: "QUERY-1704450600000-001".into(),
            patient: Uuid::new_v4(),
            doctor: Uuid::new_v4(),
            subject: "Dosage".into(),
            message: "Twice a day?".into(),
            status: QueryStatus::Open,
            response: None,
            created_at: Utc::now(),
            answered_at: None,
        };

        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["status"], "open");
        assert_eq!(json["queryId"], "QUERY-1704450600000-001");
    }
}
