//! Plain-text medical summary embedded in every continuity export.

use crate::models::PeriodicExam;
use crate::timeline::TimelineEvent;
use chrono::{DateTime, Utc};

pub(crate) const DATE_FORMAT: &str = "%d/%m/%Y";

/// Renders the summary. Pure: the export timestamp is passed in.
///
/// `timeline` must already be newest first; the first `visit_limit` events are listed.
pub fn render_summary(
    origin_facility: &str,
    exported_at: DateTime<Utc>,
    timeline: &[TimelineEvent],
    latest_exam: Option<&PeriodicExam>,
    visit_limit: usize,
) -> String {
    let mut lines = vec![
        "RINGKASAN MEDIS (CONTINUITY OF CARE SUMMARY)".to_string(),
        format!("Fasilitas Asal: {origin_facility}"),
        format!("Tanggal Ekspor: {}", exported_at.format(DATE_FORMAT)),
        String::new(),
    ];

    if let Some(exam) = latest_exam {
        let findings = &exam.findings;
        lines.push("RIKKES TERAKHIR:".into());
        lines.push(format!("  Tahun: {}", findings.year));
        lines.push(format!("  Jenis: {}", findings.category));
        lines.push(format!(
            "  Kesimpulan: {}",
            findings.conclusion.map_or("-", |c| c.label())
        ));
        lines.push(format!(
            "  Rekomendasi: {}",
            findings.recommendation.as_ref().map_or("-", |r| r.as_str())
        ));
        lines.push(String::new());
    }

    if !timeline.is_empty() {
        lines.push("RIWAYAT PERIKSA:".into());
        lines.push(format!("  Total Kunjungan: {}", timeline.len()));
        for (i, event) in timeline.iter().take(visit_limit).enumerate() {
            lines.push(format!(
                "  {}. {} - {} ({})",
                i + 1,
                event.date.format(DATE_FORMAT),
                event.encounter_type,
                event.facility
            ));
            if let Some(diagnosis) = &event.diagnosis {
                lines.push(format!("     Diagnosa: {diagnosis}"));
            }
            if let Some(treatment) = &event.treatment {
                lines.push(format!("     Tindakan: {treatment}"));
            }
        }
        if timeline.len() > visit_limit {
            lines.push(format!(
                "  ... dan {} kunjungan lainnya",
                timeline.len() - visit_limit
            ));
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EncounterType;
    use crate::test_support::at;
    use erm_types::NonEmptyText;
    use erm_uuid::RecordId;

    fn event(date: &str, diagnosis: Option<&str>) -> TimelineEvent {
        TimelineEvent {
            id: RecordId::new(),
            date: at(date),
            encounter_type: EncounterType::Umum,
            facility: NonEmptyText::new("Lanud Halim").unwrap(),
            description: "Umum".into(),
            diagnosis: NonEmptyText::from_optional(diagnosis),
            treatment: None,
        }
    }

    #[test]
    fn lists_five_visits_and_counts_the_rest() {
        let timeline: Vec<_> = (1..=7)
            .rev()
            .map(|day| event(&format!("2024-03-0{day}"), Some("ISPA")))
            .collect();

        let summary = render_summary("Lanud Halim", at("2024-06-01"), &timeline, None, 5);
        let lines: Vec<&str> = summary.lines().collect();

        assert_eq!(lines[0], "RINGKASAN MEDIS (CONTINUITY OF CARE SUMMARY)");
        assert_eq!(lines[1], "Fasilitas Asal: Lanud Halim");
        assert_eq!(lines[2], "Tanggal Ekspor: 01/06/2024");
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "RIWAYAT PERIKSA:");
        assert_eq!(lines[5], "  Total Kunjungan: 7");
        assert_eq!(lines[6], "  1. 07/03/2024 - Umum (Lanud Halim)");
        assert_eq!(lines[7], "     Diagnosa: ISPA");
        assert_eq!(lines.last().copied(), Some("  ... dan 2 kunjungan lainnya"));
    }

    #[test]
    fn empty_history_has_header_only() {
        let summary = render_summary("Lanud Halim", at("2024-06-01"), &[], None, 5);
        assert_eq!(summary.lines().count(), 4);
    }
}
