use super::ExamFindings;
use chrono::{DateTime, Utc};
use erm_types::NonEmptyText;
use erm_uuid::RecordId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisEntry {
    pub diagnosis: NonEmptyText,
    pub date: DateTime<Utc>,
    pub facility: NonEmptyText,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcedureEntry {
    pub procedure: NonEmptyText,
    pub date: DateTime<Utc>,
    pub facility: NonEmptyText,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MedicationEntry {
    pub name: NonEmptyText,
    pub dose: String,
    pub period: String,
}

/// Year, conclusion and recommendation of the latest exam. Missing values are stored as `-`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatestExamResult {
    pub year: i32,
    pub conclusion: String,
    pub recommendation: String,
}

impl From<&ExamFindings> for LatestExamResult {
    fn from(findings: &ExamFindings) -> Self {
        Self {
            year: findings.year,
            conclusion: findings
                .conclusion
                .map(|c| c.label().to_string())
                .unwrap_or_else(|| "-".into()),
            recommendation: findings
                .recommendation
                .as_ref()
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".into()),
        }
    }
}

/// An immutable transfer summary. Later changes to the patient's records never alter it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContinuityExport {
    pub id: RecordId,
    pub patient_id: RecordId,
    pub origin_facility: NonEmptyText,
    pub destination_facility: NonEmptyText,
    pub exported_at: DateTime<Utc>,
    pub summary: String,
    #[serde(default)]
    pub diagnoses: Vec<DiagnosisEntry>,
    #[serde(default)]
    pub procedures: Vec<ProcedureEntry>,
    #[serde(default)]
    pub medications: Vec<MedicationEntry>,
    pub allergies: Option<NonEmptyText>,
    pub latest_exam: Option<LatestExamResult>,
    pub transfer_note: Option<NonEmptyText>,
    pub user_id: RecordId,
    pub created_at: DateTime<Utc>,
}

/// Everything a caller supplies for an export.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferRequest {
    pub patient_id: RecordId,
    pub origin_facility: String,
    pub destination_facility: String,
    pub user_id: RecordId,
    #[serde(default)]
    pub transfer_note: Option<String>,
    #[serde(default)]
    pub allergies: Option<String>,
    #[serde(default)]
    pub medications: Vec<MedicationEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Conclusion, ExamCategory};

    #[test]
    fn latest_exam_uses_dash_for_missing_values() {
        let mut findings = ExamFindings::new(2023, ExamCategory::Periodik);
        let result = LatestExamResult::from(&findings);
        assert_eq!(result.conclusion, "-");
        assert_eq!(result.recommendation, "-");

        findings.conclusion = Some(Conclusion::PerluObservasi);
        let result = LatestExamResult::from(&findings);
        assert_eq!(result.year, 2023);
        assert_eq!(result.conclusion, "Perlu Observasi");
    }
}
