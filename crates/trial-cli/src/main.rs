//! trial-cli: operación de trials desde la terminal.
//!
//! Usa Postgres cuando `DATABASE_URL` está definido (entorno o `.env`), o un
//! store en memoria con `--memory` (útil para probar el wizard).
//!
//! Exit codes: 0 ok, 4 rechazo de dominio (validación, conflicto, no
//! encontrado), 5 error de infraestructura.

mod wizard;

use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use trial_core::{InMemoryTrialStore, TrialDetail, TrialError, TrialFilter, TrialService, TrialStatus, TrialStore,
                 TrialWizard, WorkflowPolicy};
use trial_persistence::{build_dev_pool_from_env, PgTrialStore, PoolProvider};
use uuid::Uuid;

type Service = TrialService<Arc<dyn TrialStore>>;

#[derive(Debug, Parser)]
#[command(name = "trial-cli", version, about = "Manufacturing trial tracking")]
struct Cli {
    /// Usar un store en memoria (se pierde al salir).
    #[arg(long, global = true)]
    memory: bool,
    /// Exigir que los steps anteriores estén en OK antes de aceptar uno nuevo.
    #[arg(long, global = true, env = "TRIALFLOW_ENFORCE_STEP_ORDER")]
    enforce_step_order: bool,
    /// Validar los campos del catálogo en veredictos ok / not_ok.
    #[arg(long, global = true, env = "TRIALFLOW_VALIDATE_FIELDS")]
    validate_fields: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Crea un trial.
    Create { trial_no: String, part_name: String },
    /// Envía datos y veredicto de un departamento.
    Submit {
        /// Id (UUID) o número de trial.
        trial: String,
        /// Código de step (DPT1..DPT6).
        step: String,
        #[arg(long)]
        verdict: String,
        /// Payload JSON del formulario.
        #[arg(long, default_value = "{}")]
        data: String,
        #[arg(long)]
        remarks: Option<String>,
    },
    /// Muestra un trial con sus registros.
    Show {
        id: Option<Uuid>,
        #[arg(long)]
        number: Option<String>,
    },
    /// Lista trials (más recientes primero).
    List {
        #[arg(long)]
        status: Option<TrialStatus>,
        #[arg(long)]
        search: Option<String>,
    },
    /// Imprime el reporte del trial.
    Report {
        trial: String,
        #[arg(long, env = "TRIALFLOW_PUBLIC_URL", default_value = "http://localhost:5173")]
        public_url: String,
    },
    /// Recorre los seis departamentos de forma interactiva.
    Wizard { trial: String },
}

fn open_store(memory: bool) -> Result<Arc<dyn TrialStore>> {
    if memory {
        return Ok(Arc::new(InMemoryTrialStore::new()));
    }
    let pool = build_dev_pool_from_env().context("postgres store unavailable (use --memory to run without a database)")?;
    Ok(Arc::new(PgTrialStore::new(PoolProvider { pool })))
}

/// Acepta un UUID o, si no lo es, un número de trial.
fn resolve(svc: &Service, reference: &str) -> Result<TrialDetail, TrialError> {
    match Uuid::parse_str(reference.trim()) {
        Ok(id) => svc.trial(id),
        Err(_) => svc.trial_by_number(reference),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn execute(cli: Cli) -> Result<()> {
    let store = open_store(cli.memory)?;
    let policy = WorkflowPolicy { enforce_step_order: cli.enforce_step_order,
                                  validate_fields: cli.validate_fields };
    let svc: Service = TrialService::new(store, policy);
    match cli.command {
        Command::Create { trial_no, part_name } => {
            let trial = svc.create_trial(&trial_no, &part_name)?;
            println!("created {} ({})", trial.trial_no, trial.id);
        }
        Command::Submit { trial,
                          step,
                          verdict,
                          data,
                          remarks, } => {
            let detail = resolve(&svc, &trial)?;
            let payload: Value = serde_json::from_str(&data).map_err(|e| TrialError::Validation(format!("--data is not valid JSON: {e}")))?;
            let outcome = svc.submit_step(detail.trial.id, &step, payload, Some(&verdict), remarks)?;
            match outcome.halted_step() {
                Some(h) => println!("{} {} -> {} at {h}", detail.trial.trial_no, outcome.record.step_code, outcome.status()),
                None => println!("{} {} -> {}", detail.trial.trial_no, outcome.record.step_code, outcome.status()),
            }
        }
        Command::Show { id, number } => {
            let detail = match (id, number) {
                (Some(id), _) => svc.trial(id)?,
                (None, Some(number)) => svc.trial_by_number(&number)?,
                (None, None) => return Err(anyhow!(TrialError::Validation("pass a trial id or --number".into()))),
            };
            print_json(&detail)?;
        }
        Command::List { status, search } => {
            for s in svc.list_trials(&TrialFilter { status, search })? {
                println!("{:<16} {:<24} {:<12} {}/{} ok  {}",
                         s.trial.trial_no,
                         s.trial.part_name,
                         s.trial.status().as_str(),
                         s.completed_steps,
                         trial_core::constants::STEP_COUNT,
                         s.trial.id);
            }
        }
        Command::Report { trial, public_url } => {
            let detail = resolve(&svc, &trial)?;
            let report = trial_core::TrialReport::build(&detail);
            print!("{}", report.render_text());
            println!();
            println!("PDF: {}", report.pdf_file_name());
            println!("QR:  {}", report.share_url(&public_url));
        }
        Command::Wizard { trial } => {
            let detail = resolve(&svc, &trial)?;
            let mut wiz = TrialWizard::resume(detail);
            let stdin = io::stdin();
            let status = wizard::run(&mut wiz, &svc, stdin.lock(), io::stdout())?;
            println!("trial {} is {}", wiz.trial().trial.trial_no, status.label());
        }
    }
    Ok(())
}

fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<TrialError>() {
        Some(e) if e.is_client_error() => 4,
        _ => 5,
    }
}

fn main() -> ExitCode {
    // Cargar .env si existe para obtener DATABASE_URL
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string()))
                             .with_writer(io::stderr)
                             .init();
    let cli = Cli::parse();
    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}
