//! Medical resume for periodic exams.
//!
//! The resume is a pure function of the exam findings: no clock, no store, no randomness.
//! The same findings always produce byte-identical output.

use crate::models::ExamFindings;

/// Renders the resume for `findings`.
///
/// Layout, one item per line, absent items omitted:
///
/// ```text
/// RIKKES - <category> Tahun <year>
/// Kesehatan Umum: <rating>          (also Mata, Gigi, THT, Jiwa)
/// Hasil Penunjang:
///   - <kind>: <result>
/// Kesimpulan: <conclusion>
/// Rekomendasi: <recommendation>
/// ```
pub fn generate(findings: &ExamFindings) -> String {
    let mut lines = vec![format!(
        "RIKKES - {} Tahun {}",
        findings.category, findings.year
    )];

    let ratings = &findings.ratings;
    let labelled = [
        ("Umum", ratings.general),
        ("Mata", ratings.eyes),
        ("Gigi", ratings.teeth),
        ("THT", ratings.ent),
        ("Jiwa", ratings.mental),
    ];
    for (label, rating) in labelled {
        if let Some(rating) = rating {
            lines.push(format!("Kesehatan {label}: {rating}"));
        }
    }

    let supporting = findings.supporting_results.entries();
    if !supporting.is_empty() {
        lines.push("Hasil Penunjang:".to_string());
        lines.extend(
            supporting
                .into_iter()
                .map(|(kind, result)| format!("  - {kind}: {result}")),
        );
    }

    if let Some(conclusion) = findings.conclusion {
        lines.push(format!("Kesimpulan: {conclusion}"));
    }
    if let Some(recommendation) = &findings.recommendation {
        lines.push(format!("Rekomendasi: {recommendation}"));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Conclusion, ExamCategory, HealthRating, OtherResult};
    use erm_types::NonEmptyText;

    #[test]
    fn conclusion_and_recommendation_only() {
        let mut findings = ExamFindings::new(2024, ExamCategory::Periodik);
        findings.conclusion = Some(Conclusion::Layak);
        findings.recommendation = NonEmptyText::from_optional(Some("Lanjutkan dinas"));

        let resume = generate(&findings);
        let lines: Vec<&str> = resume.lines().collect();

        assert_eq!(lines[0], "RIKKES - Periodik Tahun 2024");
        assert_eq!(
            &lines[1..],
            &["Kesimpulan: Layak", "Rekomendasi: Lanjutkan dinas"]
        );
    }

    #[test]
    fn full_findings_render_in_form_order() {
        let mut findings = ExamFindings::new(2023, ExamCategory::DinasLuar);
        findings.ratings.general = Some(HealthRating::Sehat);
        findings.ratings.ent = Some(HealthRating::SehatDenganCatatan);
        findings.supporting_results.blood_lab = NonEmptyText::from_optional(Some("Normal"));
        findings.supporting_results.others.push(OtherResult {
            kind: NonEmptyText::new("Treadmill").unwrap(),
            result: NonEmptyText::new("Baik").unwrap(),
        });
        findings.conclusion = Some(Conclusion::PerluObservasi);

        assert_eq!(
            generate(&findings),
            "RIKKES - Dinas Luar Tahun 2023\n\
             Kesehatan Umum: Sehat\n\
             Kesehatan THT: Sehat dengan Catatan\n\
             Hasil Penunjang:\n  - Lab Darah: Normal\n  - Treadmill: Baik\n\
             Kesimpulan: Perlu Observasi"
        );
    }

    #[test]
    fn output_is_deterministic() {
        let mut findings = ExamFindings::new(2022, ExamCategory::Lainnya);
        findings.ratings.mental = Some(HealthRating::TidakSehat);
        assert_eq!(generate(&findings), generate(&findings.clone()));
    }
}
