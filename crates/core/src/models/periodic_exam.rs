use chrono::{DateTime, Utc};
use erm_types::NonEmptyText;
use erm_uuid::RecordId;
use serde::{Deserialize, Serialize};

labelled_enum! {
    pub enum ExamCategory {
        Periodik => "Periodik",
        DinasLuar => "Dinas Luar",
        Lainnya => "Lainnya",
    }
}

labelled_enum! {
    pub enum HealthRating {
        Sehat => "Sehat",
        TidakSehat => "Tidak Sehat",
        SehatDenganCatatan => "Sehat dengan Catatan",
    }
}

labelled_enum! {
    pub enum Conclusion {
        Layak => "Layak",
        TidakLayak => "Tidak Layak",
        PerluObservasi => "Perlu Observasi",
    }
}

labelled_enum! {
    pub enum ExamStatus {
        Draft => "Draft",
        Selesai => "Selesai",
    }
}

/// Per-system ratings recorded on the exam form.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthRatings {
    #[serde(default)]
    pub general: Option<HealthRating>,
    #[serde(default)]
    pub eyes: Option<HealthRating>,
    #[serde(default)]
    pub teeth: Option<HealthRating>,
    #[serde(default)]
    pub ent: Option<HealthRating>,
    #[serde(default)]
    pub mental: Option<HealthRating>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OtherResult {
    pub kind: NonEmptyText,
    pub result: NonEmptyText,
}

/// Supporting results of a periodic exam: fixed slots plus free-form extras.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExamSupportingResults {
    #[serde(default)]
    pub blood_lab: Option<NonEmptyText>,
    #[serde(default)]
    pub urine_lab: Option<NonEmptyText>,
    #[serde(default)]
    pub x_ray: Option<NonEmptyText>,
    #[serde(default)]
    pub ecg: Option<NonEmptyText>,
    #[serde(default)]
    pub audiometry: Option<NonEmptyText>,
    #[serde(default)]
    pub drug_test: Option<NonEmptyText>,
    #[serde(default)]
    pub others: Vec<OtherResult>,
}

impl ExamSupportingResults {
    /// `(label, result)` pairs in form order, skipping empty slots.
    pub fn entries(&self) -> Vec<(&str, &str)> {
        let slots = [
            ("Lab Darah", &self.blood_lab),
            ("Lab Urine", &self.urine_lab),
            ("Rontgen", &self.x_ray),
            ("EKG", &self.ecg),
            ("Audiometri", &self.audiometry),
            ("Tes Narkoba", &self.drug_test),
        ];

        slots
            .into_iter()
            .filter_map(|(label, value)| value.as_ref().map(|v| (label, v.as_str())))
            .chain(
                self.others
                    .iter()
                    .map(|o| (o.kind.as_str(), o.result.as_str())),
            )
            .collect()
    }
}

/// Everything the examining doctor enters. The medical resume is derived from this alone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExamFindings {
    pub year: i32,
    pub category: ExamCategory,
    #[serde(default)]
    pub ratings: HealthRatings,
    #[serde(default)]
    pub supporting_results: ExamSupportingResults,
    #[serde(default)]
    pub conclusion: Option<Conclusion>,
    #[serde(default)]
    pub recommendation: Option<NonEmptyText>,
}

impl ExamFindings {
    pub fn new(year: i32, category: ExamCategory) -> Self {
        Self {
            year,
            category,
            ratings: HealthRatings::default(),
            supporting_results: ExamSupportingResults::default(),
            conclusion: None,
            recommendation: None,
        }
    }
}

/// A periodic fitness exam (Rikkes).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeriodicExam {
    pub id: RecordId,
    pub patient_id: RecordId,
    pub unit: NonEmptyText,
    #[serde(flatten)]
    pub findings: ExamFindings,
    /// Derived from `findings`; regenerated on every change.
    pub resume: String,
    pub doctor_id: Option<RecordId>,
    pub status: ExamStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for a new exam. The resume is always derived, never supplied.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewPeriodicExam {
    pub patient_id: RecordId,
    pub unit: String,
    pub findings: ExamFindings,
    #[serde(default)]
    pub doctor_id: Option<RecordId>,
    #[serde(default)]
    pub status: Option<ExamStatus>,
}

/// Partial update of an exam. `recommendation: Some("")` clears the recommendation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExamPatch {
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub category: Option<ExamCategory>,
    #[serde(default)]
    pub ratings: Option<HealthRatings>,
    #[serde(default)]
    pub supporting_results: Option<ExamSupportingResults>,
    #[serde(default)]
    pub conclusion: Option<Conclusion>,
    #[serde(default)]
    pub recommendation: Option<String>,
    #[serde(default)]
    pub doctor_id: Option<RecordId>,
    #[serde(default)]
    pub status: Option<ExamStatus>,
}

impl PeriodicExam {
    pub(crate) fn apply(&mut self, patch: ExamPatch, now: DateTime<Utc>) {
        let findings = &mut self.findings;
        if let Some(year) = patch.year {
            findings.year = year;
        }
        if let Some(category) = patch.category {
            findings.category = category;
        }
        if let Some(ratings) = patch.ratings {
            findings.ratings = ratings;
        }
        if let Some(results) = patch.supporting_results {
            findings.supporting_results = results;
        }
        if let Some(conclusion) = patch.conclusion {
            findings.conclusion = Some(conclusion);
        }
        if let Some(recommendation) = patch.recommendation {
            findings.recommendation = NonEmptyText::from_optional(Some(recommendation));
        }
        if let Some(doctor_id) = patch.doctor_id {
            self.doctor_id = Some(doctor_id);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.resume = crate::resume::generate(&self.findings);
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_word_labels_round_trip() {
        let json = serde_json::to_string(&ExamCategory::DinasLuar).unwrap();
        assert_eq!(json, "\"Dinas Luar\"");
        let rating: HealthRating = serde_json::from_str("\"Sehat dengan Catatan\"").unwrap();
        assert_eq!(rating, HealthRating::SehatDenganCatatan);
        assert!("Tidak Layak".parse::<Conclusion>().is_ok());
    }

    #[test]
    fn new_exam_rejects_caller_supplied_resume() {
        let raw = r#"{
            "patient_id": "550e8400e29b41d4a716446655440000",
            "unit": "Lanud Halim",
            "findings": {"year": 2024, "category": "Periodik"},
            "resume": "forged"
        }"#;
        assert!(serde_json::from_str::<NewPeriodicExam>(raw).is_err());
    }

    #[test]
    fn supporting_entries_follow_form_order() {
        let results = ExamSupportingResults {
            ecg: NonEmptyText::from_optional(Some("Normal")),
            blood_lab: NonEmptyText::from_optional(Some("Hb 14")),
            others: vec![OtherResult {
                kind: NonEmptyText::new("Spirometri").unwrap(),
                result: NonEmptyText::new("Baik").unwrap(),
            }],
            ..Default::default()
        };

        assert_eq!(
            results.entries(),
            vec![("Lab Darah", "Hb 14"), ("EKG", "Normal"), ("Spirometri", "Baik")]
        );
    }
}
