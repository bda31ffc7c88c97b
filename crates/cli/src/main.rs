use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use hms_core::maintenance::{self, BackfillOutcome};
use hms_core::{config, CoreContext, RecordId};

#[derive(Parser)]
#[command(name = "hms")]
#[command(about = "Hospital management service maintenance CLI")]
struct Cli {
    /// Record storage directory
    #[arg(long, global = true, env = "HMS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the demo patient, doctor, receptionist and admin logins
    CreateAdmin,
    /// Replace all data with a small sample hospital
    Seed {
        /// Wipe existing data first
        #[arg(long)]
        force: bool,
    },
    /// Link doctor-less prescriptions to the patient's latest appointment doctor
    BackfillPrescriptions,
    /// Show users, patients and doctors, and what each username resolves to
    CheckUsernames {
        /// Usernames to resolve (default: every account username)
        usernames: Vec<String>,
    },
    /// List prescriptions and flag missing or dangling references
    CheckPrescriptions,
    /// Re-verify unique names, usernames and emails across the store
    RepairIndex,
    /// Generate a login for a doctor or patient record
    GenerateCredentials {
        #[arg(value_enum)]
        kind: RecordKind,
        /// Record id
        id: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RecordKind {
    Doctor,
    Patient,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("hms=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::resolve(cli.data_dir, |key| std::env::var(key).ok())?;
    let ctx = CoreContext::open(Arc::new(cfg))?;

    match cli.command {
        Commands::CreateAdmin => {
            for account in maintenance::create_demo_accounts(&ctx)? {
                let state = if account.created { "created" } else { "exists" };
                println!("{:<8} {:<14} {}", state, account.role, account.email);
            }
        }
        Commands::Seed { force } => {
            let summary = maintenance::seed(&ctx, force, chrono::Utc::now())?;
            println!(
                "Seeded {} doctors, {} patients, {} appointments, {} prescriptions, {} users",
                summary.doctors,
                summary.patients,
                summary.appointments,
                summary.prescriptions,
                summary.users
            );
        }
        Commands::BackfillPrescriptions => {
            let report = maintenance::backfill_prescriptions(&ctx)?;
            if report.is_empty() {
                println!("No prescriptions without a doctor.");
            }
            for entry in report {
                let outcome = match entry.outcome {
                    BackfillOutcome::Linked { doctor } => format!("linked to {doctor}"),
                    BackfillOutcome::PatientMissing => "skipped: patient missing".into(),
                    BackfillOutcome::NoAppointments => "skipped: no appointments".into(),
                };
                println!("{} ({}): {}", entry.prescription_id, entry.patient_id, outcome);
            }
        }
        Commands::CheckUsernames { usernames } => {
            println!("Users:");
            for user in ctx.users().list(None)? {
                println!(
                    "  {:<14} username={} email={}",
                    user.role,
                    user.username.as_deref().unwrap_or("-"),
                    user.email.as_deref().unwrap_or("-")
                );
            }
            println!("Patients:");
            for patient in ctx.patients().list()? {
                println!("  {} -> {}", patient.full_name, patient.full_name.username_slug());
            }
            println!("Doctors:");
            for doctor in ctx.doctors().list()? {
                println!("  {} -> {}", doctor.full_name, doctor.full_name.username_slug());
            }
            println!("Resolution:");
            for m in maintenance::check_usernames(&ctx, &usernames)? {
                println!(
                    "  {}: patient={} doctor={}",
                    m.username,
                    m.patient.as_deref().unwrap_or("none"),
                    m.doctor.as_deref().unwrap_or("none")
                );
            }
        }
        Commands::CheckPrescriptions => {
            let checks = maintenance::check_prescriptions(&ctx)?;
            for c in &checks {
                let mut flags = Vec::new();
                if c.missing_doctor {
                    flags.push("NO DOCTOR");
                }
                if c.dangling {
                    flags.push("DANGLING");
                }
                println!(
                    "{} {} patient={} doctor={} by={} notes=\"{}\" {}",
                    c.date.format("%Y-%m-%d"),
                    c.prescription_id,
                    c.patient.as_deref().unwrap_or("?"),
                    c.doctor.as_deref().unwrap_or("-"),
                    c.uploaded_by.as_deref().unwrap_or("-"),
                    c.notes_preview,
                    flags.join(",")
                );
            }
            let flagged = checks.iter().filter(|c| c.missing_doctor || c.dangling).count();
            println!("{} prescriptions, {} flagged", checks.len(), flagged);
        }
        Commands::RepairIndex => {
            let duplicates = maintenance::verify_uniqueness(&ctx)?;
            if duplicates.is_empty() {
                println!("All unique keys verified.");
                return Ok(());
            }
            for dup in &duplicates {
                let ids: Vec<String> = dup.ids.iter().map(RecordId::to_string).collect();
                println!("{} \"{}\": {}", dup.collection, dup.key, ids.join(", "));
            }
            anyhow::bail!("{} duplicate keys found; resolve them by hand", duplicates.len());
        }
        Commands::GenerateCredentials { kind, id } => {
            let id = RecordId::parse(&id)?;
            let creds = match kind {
                RecordKind::Doctor => ctx.doctors().generate_credentials(id)?,
                RecordKind::Patient => ctx.patients().generate_credentials(id)?,
            };
            println!("username: {}", creds.username);
            println!("password: {}", creds.password);
        }
    }

    Ok(())
}
