use anyhow::Context;
use chrono::{NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use erm_core::models::{
    DataCategory, EncounterType, JustificationCode, NewEncounter, NewPatient, NewUser, Rank, Role,
};
use erm_core::{CoreConfig, ErmCore, RecordId};

#[derive(Parser)]
#[command(name = "erm")]
#[command(about = "BINPROFKES E-RM access-control and audit CLI")]
struct Cli {
    /// Data directory of the file store (default: $ERM_DATA_DIR or `erm_data`)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Storage namespace (default: $ERM_NAMESPACE or `binprofkes`)
    #[arg(long, global = true)]
    namespace: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a patient
    AddPatient {
        #[arg(long)]
        nrp: String,
        #[arg(long)]
        name: String,
        /// Tamtama, Bintara or Perwira
        #[arg(long)]
        rank: Rank,
        /// Home unit
        #[arg(long)]
        unit: String,
        #[arg(long)]
        corps: Option<String>,
        #[arg(long)]
        position: Option<String>,
        /// Acting user id
        #[arg(long)]
        actor: RecordId,
    },
    /// Register a user (the first user may omit --actor)
    AddUser {
        #[arg(long)]
        name: String,
        /// SuperAdmin, AdminSatuan, Operator, Viewer or Puskesau
        #[arg(long)]
        role: Role,
        /// Assigned unit
        #[arg(long)]
        unit: Option<String>,
        #[arg(long)]
        actor: Option<RecordId>,
    },
    /// Move a patient to a new home unit
    Transfer {
        patient: RecordId,
        unit: String,
        #[arg(long)]
        actor: RecordId,
    },
    /// Record an encounter
    AddEncounter {
        #[arg(long)]
        patient: RecordId,
        /// Authoring facility
        #[arg(long)]
        unit: String,
        /// Umum, Rikkes, Dikbangum, Lanjutan or Rujukan
        #[arg(long = "type")]
        encounter_type: EncounterType,
        /// Visit date (YYYY-MM-DD); defaults to now
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        complaint: Option<String>,
        #[arg(long)]
        diagnosis: Option<String>,
        #[arg(long)]
        treatment: Option<String>,
        #[arg(long)]
        actor: RecordId,
    },
    /// Print a patient's timeline, newest first
    Timeline {
        patient: RecordId,
        /// User the timeline is disclosed to
        #[arg(long)]
        actor: RecordId,
        /// Read under this grant only
        #[arg(long)]
        grant: Option<RecordId>,
    },
    /// Request cross-facility access
    RequestAccess {
        #[arg(long)]
        user: RecordId,
        #[arg(long)]
        patient: RecordId,
        /// Rikkes, Dikbangum, Rujukan, Lanjutan or Lainnya
        #[arg(long)]
        code: JustificationCode,
        /// Required for Lainnya
        #[arg(long)]
        note: Option<String>,
        /// Comma-separated: timeline, hasil_penunjang, resume_medis
        #[arg(long, value_delimiter = ',', required = true)]
        categories: Vec<DataCategory>,
    },
    /// List recent access grants for a patient
    Grants {
        patient: RecordId,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Access statistics for a patient
    Stats { patient: RecordId },
    /// Build a continuity-of-care export
    Export {
        #[arg(long)]
        patient: RecordId,
        #[arg(long)]
        origin: String,
        #[arg(long)]
        destination: String,
        #[arg(long)]
        user: RecordId,
        #[arg(long)]
        note: Option<String>,
    },
    /// Print the transfer document of an export
    Render {
        export: RecordId,
        /// User the document is disclosed to
        #[arg(long)]
        actor: RecordId,
        #[arg(long)]
        grant: Option<RecordId>,
    },
    /// Print the audit log
    AuditLog {
        /// Only entries written by this user
        #[arg(long)]
        user: Option<RecordId>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("erm_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Use 'erm --help' for commands");
        return Ok(());
    };

    let data_dir = cli
        .data_dir
        .map(|p| p.to_string_lossy().into_owned())
        .or_else(|| std::env::var("ERM_DATA_DIR").ok());
    let namespace = cli.namespace.or_else(|| std::env::var("ERM_NAMESPACE").ok());
    let cfg = Arc::new(CoreConfig::from_env_values(data_dir, namespace)?);
    let core = ErmCore::open_file_store(cfg).context("opening the data directory")?;

    match command {
        Commands::AddPatient {
            nrp,
            name,
            rank,
            unit,
            corps,
            position,
            actor,
        } => {
            let patient = core.directory().create_patient(
                NewPatient {
                    nrp,
                    name,
                    rank,
                    corps,
                    unit,
                    position,
                },
                actor,
            )?;
            println!("Registered patient {} ({})", patient.id, patient.name);
        }
        Commands::AddUser {
            name,
            role,
            unit,
            actor,
        } => {
            let user = core
                .directory()
                .create_user(NewUser { name, role, unit }, actor)?;
            println!("Registered user {} ({}, {})", user.id, user.name, user.facility());
        }
        Commands::Transfer {
            patient,
            unit,
            actor,
        } => {
            let patient = core.directory().transfer_patient(patient, &unit, actor)?;
            println!("Patient {} now belongs to {}", patient.id, patient.unit);
        }
        Commands::AddEncounter {
            patient,
            unit,
            encounter_type,
            date,
            complaint,
            diagnosis,
            treatment,
            actor,
        } => {
            let mut new = NewEncounter::new(patient, unit, encounter_type);
            new.visit_date = date
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|d| Utc.from_utc_datetime(&d));
            new.complaint = complaint;
            new.diagnosis = diagnosis;
            new.treatment = treatment;
            let encounter = core.records().create_encounter(new, actor)?;
            println!("Recorded encounter {}", encounter.id);
        }
        Commands::Timeline {
            patient,
            actor,
            grant,
        } => {
            let events = core.disclosure().open(actor, patient, grant)?.timeline()?;
            if events.is_empty() {
                println!("No encounters found.");
            }
            for event in events {
                println!(
                    "{} {} ({}) {}",
                    event.date.format("%d/%m/%Y"),
                    event.encounter_type,
                    event.facility,
                    event.description
                );
                if let Some(diagnosis) = event.diagnosis {
                    println!("    Diagnosa: {diagnosis}");
                }
                if let Some(treatment) = event.treatment {
                    println!("    Tindakan: {treatment}");
                }
            }
        }
        Commands::RequestAccess {
            user,
            patient,
            code,
            note,
            categories,
        } => {
            let grant = core
                .access()
                .request_access(user, patient, code, note, categories)?;
            println!(
                "Granted {} from {} to {} ({})",
                grant.id, grant.origin_facility, grant.target_facility, grant.code
            );
        }
        Commands::Grants { patient, limit } => {
            let grants = core.access().recent_grants(patient, limit)?;
            println!("{}", serde_json::to_string_pretty(&grants)?);
        }
        Commands::Stats { patient } => {
            let stats = core.access().access_stats(patient)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Export {
            patient,
            origin,
            destination,
            user,
            note,
        } => {
            let export = core
                .exporter()
                .export_for_transfer(patient, &origin, &destination, user, note)?;
            println!("Created export {}", export.id);
        }
        Commands::Render {
            export,
            actor,
            grant,
        } => {
            let export = core.disclosure().export(actor, export, grant)?;
            println!("{}", core.exporter().render_full_document(&export));
        }
        Commands::AuditLog { user } => {
            let entries = match user {
                Some(user) => core.audit().logs_by_user(user)?,
                None => core.audit().logs()?,
            };
            for entry in entries {
                println!(
                    "{} {} {} {} {}",
                    entry.timestamp.to_rfc3339(),
                    entry.user_id,
                    entry.action,
                    entry.entity,
                    entry.entity_id.map(|id| id.to_string()).unwrap_or_default()
                );
            }
        }
    }

    Ok(())
}
