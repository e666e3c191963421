#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs, unreachable_pub)]
#![allow(clippy::multiple_crate_versions)]
//! Shared record types for the clinic records API.
//!
//! These types are used by the console core and the CLI for request/response
//! encoding. Every record tolerates missing or `null` fields on decode so a
//! partially populated document never fails a whole collection load.

use std::borrow::Cow;
use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// Server-assigned record identifier. Immutable once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wrap a raw identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The four resource kinds exposed under `/api/{kind}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Patients and their medical history.
    Patients,
    /// Doctors and nurses.
    Staff,
    /// Medicine stock.
    Medicines,
    /// Treatments joining a patient, a staff member and a medicine.
    Treatments,
}

impl ResourceKind {
    /// Every kind, in menu order.
    pub const ALL: [Self; 4] = [Self::Patients, Self::Staff, Self::Medicines, Self::Treatments];

    /// Path segment under `/api`.
    #[must_use]
    pub const fn path_segment(self) -> &'static str {
        match self {
            Self::Patients => "patients",
            Self::Staff => "staff",
            Self::Medicines => "medicines",
            Self::Treatments => "treatments",
        }
    }

    /// Field name used by wrapper envelopes such as `{ "patients": [...] }`.
    #[must_use]
    pub const fn envelope_alias(self) -> &'static str {
        self.path_segment()
    }

    /// Singular label for notices ("patient", "staff member", ...).
    #[must_use]
    pub const fn singular(self) -> &'static str {
        match self {
            Self::Patients => "patient",
            Self::Staff => "staff member",
            Self::Medicines => "medicine",
            Self::Treatments => "treatment",
        }
    }

    /// Plural label for status lines.
    #[must_use]
    pub const fn plural(self) -> &'static str {
        match self {
            Self::Patients => "patients",
            Self::Staff => "staff members",
            Self::Medicines => "medicines",
            Self::Treatments => "treatments",
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "patients" | "patient" => Ok(Self::Patients),
            "staff" => Ok(Self::Staff),
            "medicines" | "medicine" => Ok(Self::Medicines),
            "treatments" | "treatment" => Ok(Self::Treatments),
            other => Err(format!("unknown resource kind '{other}'")),
        }
    }
}

/// Behaviour shared by every record kind so list/detail controllers stay generic.
pub trait Resource: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    /// Kind served by this record type.
    const KIND: ResourceKind;

    /// Identifier, absent before the first save.
    fn id(&self) -> Option<&RecordId>;

    /// Primary display name.
    fn display_name(&self) -> Cow<'_, str>;

    /// Stringified searchable fields, in the order they are matched.
    fn search_fields(&self) -> Vec<Cow<'_, str>>;

    /// One-line description used by "view selected".
    fn summary(&self) -> String;

    /// Name of the first required field that is blank, if any.
    fn missing_required_field(&self) -> Option<&'static str>;
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Patient record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// Server-assigned identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    /// Full name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Age in years, when known.
    #[serde(default)]
    pub age: Option<u32>,
    /// Free-text medical history.
    #[serde(default, deserialize_with = "null_as_default")]
    pub medical_history: String,
}

impl Resource for Patient {
    const KIND: ResourceKind = ResourceKind::Patients;

    fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    fn display_name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.name)
    }

    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Borrowed(self.name.as_str()),
            Cow::Owned(self.age.map(|age| age.to_string()).unwrap_or_default()),
            Cow::Borrowed(self.medical_history.as_str()),
        ]
    }

    fn summary(&self) -> String {
        let age = self.age.map(|age| age.to_string()).unwrap_or_default();
        format!("{} ({age}) - {}", self.name, self.medical_history)
    }

    fn missing_required_field(&self) -> Option<&'static str> {
        blank(&self.name).then_some("name")
    }
}

/// Staff role. Unknown roles are kept verbatim so updates round-trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StaffRole {
    /// `DOCTOR`.
    #[default]
    Doctor,
    /// `NURSE`.
    Nurse,
    /// Any other role string the server returned.
    Other(String),
}

impl StaffRole {
    /// Wire representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Doctor => "DOCTOR",
            Self::Nurse => "NURSE",
            Self::Other(value) => value,
        }
    }
}

impl From<String> for StaffRole {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "DOCTOR" => Self::Doctor,
            "NURSE" => Self::Nurse,
            _ => Self::Other(value),
        }
    }
}

impl From<StaffRole> for String {
    fn from(value: StaffRole) -> Self {
        value.as_str().to_string()
    }
}

impl Display for StaffRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Staff member record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staff {
    /// Server-assigned identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    /// Full name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Role within the clinic.
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: StaffRole,
    /// Optional specialization (cardiology, pediatrics, ...).
    #[serde(default)]
    pub specialization: Option<String>,
}

impl Resource for Staff {
    const KIND: ResourceKind = ResourceKind::Staff;

    fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    fn display_name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.name)
    }

    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Borrowed(self.name.as_str()),
            Cow::Borrowed(self.role.as_str()),
            Cow::Borrowed(self.specialization.as_deref().unwrap_or_default()),
        ]
    }

    fn summary(&self) -> String {
        match &self.specialization {
            Some(specialization) => format!("{} ({}) - {specialization}", self.name, self.role),
            None => format!("{} ({})", self.name, self.role),
        }
    }

    fn missing_required_field(&self) -> Option<&'static str> {
        blank(&self.name).then_some("name")
    }
}

/// Medicine stock record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    /// Server-assigned identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    /// Medicine name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Units in stock, when known.
    #[serde(default)]
    pub quantity: Option<u32>,
}

impl Resource for Medicine {
    const KIND: ResourceKind = ResourceKind::Medicines;

    fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    fn display_name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.name)
    }

    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Borrowed(self.name.as_str()),
            Cow::Owned(
                self.quantity
                    .map(|quantity| quantity.to_string())
                    .unwrap_or_default(),
            ),
        ]
    }

    fn summary(&self) -> String {
        let quantity = self
            .quantity
            .map(|quantity| quantity.to_string())
            .unwrap_or_default();
        format!("{} ({quantity})", self.name)
    }

    fn missing_required_field(&self) -> Option<&'static str> {
        blank(&self.name).then_some("name")
    }
}

/// Treatment record linking a patient, a staff member and a medicine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Treatment {
    /// Server-assigned identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    /// Treated patient.
    #[serde(default, deserialize_with = "null_as_default")]
    pub patient_id: String,
    /// Responsible staff member.
    #[serde(default, deserialize_with = "null_as_default")]
    pub staff_id: String,
    /// Prescribed medicine.
    #[serde(default, deserialize_with = "null_as_default")]
    pub medicine_id: String,
    /// Short description.
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Free-text notes.
    #[serde(default, deserialize_with = "null_as_default")]
    pub notes: String,
    /// ISO-8601 timestamp of the treatment.
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
    /// Optional start date (`YYYY-MM-DD`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    /// Optional end date (`YYYY-MM-DD`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl Resource for Treatment {
    const KIND: ResourceKind = ResourceKind::Treatments;

    fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    fn display_name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.description)
    }

    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Borrowed(self.description.as_str()),
            Cow::Borrowed(self.notes.as_str()),
            Cow::Borrowed(self.patient_id.as_str()),
            Cow::Borrowed(self.staff_id.as_str()),
            Cow::Borrowed(self.medicine_id.as_str()),
        ]
    }

    fn summary(&self) -> String {
        format!("{} [{}] - {}", self.description, self.date, self.notes)
    }

    fn missing_required_field(&self) -> Option<&'static str> {
        if blank(&self.patient_id) {
            Some("patientId")
        } else if blank(&self.description) {
            Some("description")
        } else {
            None
        }
    }
}

/// Error document returned by the API on failures.
///
/// Accepts both RFC 9457 problem documents (`title`/`detail`) and the default
/// Spring error body (`error`/`message`); every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemDetails {
    /// URI reference identifying the problem type.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Short, human-readable summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// HTTP status echoed by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Detailed diagnostic message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Spring-style reason phrase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Spring-style message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProblemDetails {
    /// Most specific non-empty message carried by the document.
    #[must_use]
    pub fn best_message(&self) -> Option<&str> {
        [&self.detail, &self.message, &self.title, &self.error]
            .into_iter()
            .filter_map(Option::as_deref)
            .map(str::trim)
            .find(|text| !text.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn patient_tolerates_nulls_and_missing_fields() {
        let patient: Patient =
            serde_json::from_value(json!({"id": "p1", "name": null, "age": 45})).unwrap();
        assert_eq!(patient.id, Some(RecordId::new("p1")));
        assert!(patient.name.is_empty());
        assert_eq!(patient.age, Some(45));
        assert!(patient.medical_history.is_empty());
    }

    #[test]
    fn patient_serializes_camel_case_without_id() {
        let patient = Patient {
            id: None,
            name: "Ana".into(),
            age: Some(28),
            medical_history: "Asthma".into(),
        };
        let value = serde_json::to_value(&patient).unwrap();
        assert_eq!(
            value,
            json!({"name": "Ana", "age": 28, "medicalHistory": "Asthma"})
        );
    }

    #[test]
    fn staff_role_round_trips_unknown_values() {
        let staff: Staff =
            serde_json::from_value(json!({"name": "Lee", "role": "PHARMACIST"})).unwrap();
        assert_eq!(staff.role, StaffRole::Other("PHARMACIST".into()));
        let value = serde_json::to_value(&staff).unwrap();
        assert_eq!(value["role"], "PHARMACIST");

        let doctor: Staff = serde_json::from_value(json!({"name": "Ruiz", "role": "doctor"})).unwrap();
        assert_eq!(doctor.role, StaffRole::Doctor);
    }

    #[test]
    fn search_fields_stringify_numbers() {
        let medicine = Medicine {
            id: Some("m1".into()),
            name: "Paracetamol".into(),
            quantity: Some(500),
        };
        let fields = medicine.search_fields();
        assert!(fields.iter().any(|field| field == "500"));
    }

    #[test]
    fn treatment_requires_patient_and_description() {
        let mut treatment = Treatment::default();
        assert_eq!(treatment.missing_required_field(), Some("patientId"));
        treatment.patient_id = "p1".into();
        assert_eq!(treatment.missing_required_field(), Some("description"));
        treatment.description = "Checkup".into();
        assert_eq!(treatment.missing_required_field(), None);
    }

    #[test]
    fn kind_parses_singular_and_plural() {
        assert_eq!("Patient".parse::<ResourceKind>(), Ok(ResourceKind::Patients));
        assert_eq!("staff".parse::<ResourceKind>(), Ok(ResourceKind::Staff));
        assert!("wards".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn problem_details_prefers_detail_then_spring_message() {
        let rfc: ProblemDetails = serde_json::from_value(
            json!({"title": "Bad Request", "detail": "name missing", "status": 400}),
        )
        .unwrap();
        assert_eq!(rfc.best_message(), Some("name missing"));

        let spring: ProblemDetails = serde_json::from_value(json!({
            "timestamp": "2024-01-01T00:00:00Z",
            "status": 404,
            "error": "Not Found",
            "message": "",
            "path": "/api/staff/x"
        }))
        .unwrap();
        assert_eq!(spring.best_message(), Some("Not Found"));
    }
}
