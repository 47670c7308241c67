use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vax_core::config::dose_uniqueness_from_env_value;
use vax_core::constants::DEFAULT_DATA_DIR;
use vax_core::repositories::yaml::{YamlDirectory, YamlDoseRecordStore, YamlSchemeStore};
use vax_core::{
    CoreConfig, DoseRegistration, DoseScheduleEngine, NewScheme, SchemePatch,
};
use vax_types::{LotNumber, SchemeName};
use vax_uuid::{ClinicId, InventoryItemId, PatientId, SchemeId, UserId};

#[derive(Parser)]
#[command(name = "vax")]
#[command(about = "Clinic vaccination schedule CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage vaccine schemes
    #[command(subcommand)]
    Scheme(SchemeCommands),
    /// Record administered doses
    #[command(subcommand)]
    Dose(DoseCommands),
    /// Pending doses of a patient
    Pending {
        /// Clinic UUID
        clinic_id: ClinicId,
        /// Patient UUID
        patient_id: PatientId,
    },
    /// Vaccination history of a patient, newest first
    History {
        /// Clinic UUID
        clinic_id: ClinicId,
        /// Patient UUID
        patient_id: PatientId,
    },
    /// Overdue doses across a clinic
    Overdue {
        /// Clinic UUID
        clinic_id: ClinicId,
    },
}

#[derive(Subcommand)]
enum SchemeCommands {
    /// Define a new scheme
    Create {
        /// Scheme name
        name: String,
        /// Month offset of each dose from the first (comma-separated, e.g. 0,2,6)
        #[arg(value_delimiter = ',', allow_hyphen_values = true)]
        intervals: Vec<i32>,
        /// Number of doses; defaults to the number of offsets
        #[arg(long)]
        doses_total: Option<u32>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List schemes
    List {
        /// Only active schemes
        #[arg(long)]
        active: bool,
    },
    /// Show one scheme
    Show {
        /// Scheme UUID
        scheme_id: SchemeId,
    },
    /// Update scheme fields
    Update {
        /// Scheme UUID
        scheme_id: SchemeId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        doses_total: Option<u32>,
        /// Month offsets (comma-separated)
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        intervals: Option<Vec<i32>>,
        #[arg(long, conflicts_with = "clear_notes")]
        notes: Option<String>,
        #[arg(long)]
        clear_notes: bool,
        /// Set whether the scheme is active
        #[arg(long)]
        active: Option<bool>,
    },
}

#[derive(Subcommand)]
enum DoseCommands {
    /// Register an administered dose
    Register {
        /// Clinic UUID
        clinic_id: ClinicId,
        /// Patient UUID
        patient_id: PatientId,
        /// Scheme UUID
        scheme_id: SchemeId,
        /// Dose number, starting at 1
        dose_number: u32,
        /// UUID of the staff member who administered the dose
        #[arg(long)]
        administered_by: UserId,
        /// Vial lot number; blank means not recorded
        #[arg(long)]
        lot_number: Option<String>,
        #[arg(long)]
        inventory_item_id: Option<InventoryItemId>,
        #[arg(long)]
        notes: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(log_filter()?)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let engine = build_engine()?;

    match cli.command {
        Commands::Scheme(SchemeCommands::Create {
            name,
            intervals,
            doses_total,
            notes,
        }) => {
            let doses_total = match doses_total {
                Some(total) => total,
                None => u32::try_from(intervals.len()).context("too many intervals")?,
            };
            let scheme = engine.define_scheme(NewScheme {
                name: SchemeName::new(name)?,
                doses_total,
                dose_intervals_months: intervals,
                notes,
            })?;
            print_json(&scheme)?;
        }
        Commands::Scheme(SchemeCommands::List { active }) => {
            print_json(&engine.list_schemes(active)?)?;
        }
        Commands::Scheme(SchemeCommands::Show { scheme_id }) => {
            print_json(&engine.get_scheme(&scheme_id)?)?;
        }
        Commands::Scheme(SchemeCommands::Update {
            scheme_id,
            name,
            doses_total,
            intervals,
            notes,
            clear_notes,
            active,
        }) => {
            let patch = SchemePatch {
                name: name.map(SchemeName::new).transpose()?,
                doses_total,
                dose_intervals_months: intervals,
                notes: if clear_notes { Some(None) } else { notes.map(Some) },
                is_active: active,
            };
            if patch.is_empty() {
                anyhow::bail!("nothing to update");
            }
            print_json(&engine.revise_scheme(&scheme_id, &patch)?)?;
        }
        Commands::Dose(DoseCommands::Register {
            clinic_id,
            patient_id,
            scheme_id,
            dose_number,
            administered_by,
            lot_number,
            inventory_item_id,
            notes,
        }) => {
            let record = engine.register_dose(DoseRegistration {
                clinic_id,
                administered_by,
                patient_id,
                vaccine_scheme_id: scheme_id,
                dose_number,
                lot_number: LotNumber::optional(lot_number.as_deref())?,
                inventory_item_id,
                notes,
            })?;
            print_json(&record)?;
        }
        Commands::Pending {
            clinic_id,
            patient_id,
        } => {
            print_json(&engine.compute_pending_doses(&clinic_id, &patient_id)?)?;
        }
        Commands::History {
            clinic_id,
            patient_id,
        } => {
            print_json(&engine.patient_history(&clinic_id, &patient_id)?)?;
        }
        Commands::Overdue { clinic_id } => {
            print_json(&engine.list_overdue_doses(&clinic_id)?)?;
        }
    }

    Ok(())
}

/// `RUST_LOG` plus info-level defaults for the binary and the core library.
fn log_filter() -> anyhow::Result<EnvFilter> {
    Ok(EnvFilter::from_default_env()
        .add_directive("vax=info".parse()?)
        .add_directive("vax_core=info".parse()?))
}

fn build_engine() -> anyhow::Result<DoseScheduleEngine> {
    let data_dir = std::env::var("VAX_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.into());
    let uniqueness = dose_uniqueness_from_env_value(std::env::var("VAX_DOSE_UNIQUENESS").ok())?;
    let cfg = Arc::new(CoreConfig::new(PathBuf::from(data_dir), uniqueness)?);
    tracing::debug!("using data directory {}", cfg.data_dir().display());

    let directory = YamlDirectory::load(&cfg)?;
    Ok(DoseScheduleEngine::new(
        Arc::new(YamlSchemeStore::new(cfg.clone())),
        Arc::new(YamlDoseRecordStore::new(cfg)),
        Arc::new(directory),
    ))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
