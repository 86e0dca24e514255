//! Printable transfer document for a continuity export.

use super::summary::DATE_FORMAT;
use crate::models::ContinuityExport;

const WIDTH: usize = 80;

fn section(lines: &mut Vec<String>, title: &str) {
    lines.push(title.to_string());
    lines.push("-".repeat(WIDTH));
}

/// Renders the full document. Pure: it reads nothing but `export`.
pub fn render_full_document(export: &ContinuityExport) -> String {
    let banner = "═".repeat(WIDTH);
    let mut lines = vec![
        banner.clone(),
        "                    CONTINUITY OF CARE SUMMARY".to_string(),
        "              (Ringkasan Medis untuk Pemindahan)".to_string(),
        banner.clone(),
        String::new(),
    ];

    section(&mut lines, "INFORMASI PASIEN");
    lines.push(format!("ID Personel: {}", export.patient_id));
    lines.push(format!("Fasilitas Asal: {}", export.origin_facility));
    lines.push(format!("Fasilitas Tujuan: {}", export.destination_facility));
    lines.push(format!(
        "Tanggal Ekspor: {}",
        export.exported_at.format("%d/%m/%Y %H.%M.%S")
    ));
    lines.push(String::new());

    section(&mut lines, "RINGKASAN MEDIS");
    lines.push(export.summary.clone());
    lines.push(String::new());

    if !export.diagnoses.is_empty() {
        section(&mut lines, "RIWAYAT DIAGNOSA");
        for (i, entry) in export.diagnoses.iter().enumerate() {
            lines.push(format!("{}. {}", i + 1, entry.diagnosis));
            lines.push(format!("   Tanggal: {}", entry.date.format(DATE_FORMAT)));
            lines.push(format!("   Fasilitas: {}", entry.facility));
        }
        lines.push(String::new());
    }

    if !export.procedures.is_empty() {
        section(&mut lines, "RIWAYAT TINDAKAN");
        for (i, entry) in export.procedures.iter().enumerate() {
            lines.push(format!("{}. {}", i + 1, entry.procedure));
            lines.push(format!("   Tanggal: {}", entry.date.format(DATE_FORMAT)));
            lines.push(format!("   Fasilitas: {}", entry.facility));
        }
        lines.push(String::new());
    }

    if !export.medications.is_empty() {
        section(&mut lines, "RIWAYAT OBAT");
        for (i, entry) in export.medications.iter().enumerate() {
            lines.push(format!("{}. {} - {}", i + 1, entry.name, entry.dose));
            lines.push(format!("   Periode: {}", entry.period));
        }
        lines.push(String::new());
    }

    if let Some(allergies) = &export.allergies {
        section(&mut lines, "ALERGI");
        lines.push(allergies.to_string());
        lines.push(String::new());
    }

    if let Some(exam) = &export.latest_exam {
        section(&mut lines, "HASIL RIKKES TERAKHIR");
        lines.push(format!("Tahun: {}", exam.year));
        lines.push(format!("Kesimpulan: {}", exam.conclusion));
        lines.push(format!("Rekomendasi: {}", exam.recommendation));
        lines.push(String::new());
    }

    if let Some(note) = &export.transfer_note {
        section(&mut lines, "CATATAN PEMINDAHAN");
        lines.push(note.to_string());
        lines.push(String::new());
    }

    lines.push(banner.clone());
    lines.push("Dokumen ini digenerate secara otomatis oleh sistem BINPROFKES".to_string());
    lines.push(banner);

    lines.join("\n")
}
