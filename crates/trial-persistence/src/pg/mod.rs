//! Implementación Postgres (Diesel) del contrato `TrialStore`.
//!
//! - Paridad con `InMemoryTrialStore`: mismas reglas (las decide la
//!   `WorkflowMachine` del core), mismos errores de dominio.
//! - `submit_step` corre en una transacción read-write que toma
//!   `SELECT … FOR UPDATE` sobre la fila del trial: las submissions de un mismo
//!   trial quedan serializadas y el upsert del registro y el recálculo del
//!   estado se confirman juntos o no se confirman.
//! - Errores transitorios (conflicto de serialización, pool) se reintentan con
//!   backoff corto (`with_retry`).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};
use diesel::upsert::excluded;
use log::{debug, error, warn};
use serde_json::Value;
use uuid::Uuid;

use trial_core::model::payload_from_value;
use trial_core::{NewTrial, StepRecord, StepSubmission, SubmissionOutcome, Trial, TrialDetail, TrialError, TrialState,
                 TrialStore, TrialSummary, Verdict, WorkflowMachine};

use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;
use crate::schema::{step_data, trials};

/// Pool r2d2 de conexiones Postgres. Al construirlo se corren las migraciones
/// pendientes.
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;

pub type PgPooledConnection = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

/// Proveedor abstracto de conexiones.
///
/// Contrato: devuelve una conexión válida o `PersistenceError::TransientIo`.
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError>;
}

/// `ConnectionProvider` respaldado por un `PgPool`.
pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

/// Fila de `trials`. El orden de campos sigue al de `schema::trials`.
#[derive(Queryable, Insertable, Debug)]
#[diesel(table_name = trials)]
pub struct TrialRow {
    pub id: Uuid,
    pub trial_no: String,
    pub part_name: String,
    pub status: String,
    pub halted_step_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrialRow {
    fn from_trial(trial: &Trial) -> Self {
        let status = trial.status().as_str().to_string();
        TrialRow { id: trial.id,
                   trial_no: trial.trial_no.clone(),
                   part_name: trial.part_name.clone(),
                   status,
                   halted_step_code: trial.halted_step().map(|s| s.as_str().to_string()),
                   created_at: trial.created_at,
                   updated_at: trial.updated_at }
    }

    /// Una fila con status y halt pointer inconsistentes se rechaza.
    fn into_trial(self) -> Result<Trial, PersistenceError> {
        let state = TrialState::from_columns(&self.status, self.halted_step_code.as_deref())
            .map_err(|e| PersistenceError::InvalidRow(format!("trial {}: {e}", self.id)))?;
        Ok(Trial { id: self.id,
                   trial_no: self.trial_no,
                   part_name: self.part_name,
                   state,
                   created_at: self.created_at,
                   updated_at: self.updated_at })
    }
}

/// Fila de `step_data`.
#[derive(Queryable, Insertable, Debug)]
#[diesel(table_name = step_data)]
pub struct StepRow {
    pub id: Uuid,
    pub trial_id: Uuid,
    pub step_code: String,
    pub data_json: Value,
    pub validation_status: String,
    pub remarks: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StepRow {
    fn from_record(record: &StepRecord) -> Self {
        StepRow { id: record.id,
                  trial_id: record.trial_id,
                  step_code: record.step_code.as_str().to_string(),
                  data_json: Value::Object(record.payload.clone()),
                  validation_status: record.verdict.as_str().to_string(),
                  remarks: record.remarks.clone(),
                  completed_at: record.completed_at,
                  created_at: record.created_at,
                  updated_at: record.updated_at }
    }

    fn into_record(self) -> Result<StepRecord, PersistenceError> {
        let invalid = |e: TrialError| PersistenceError::InvalidRow(format!("step_data {}: {e}", self.id));
        let step_code = self.step_code.parse().map_err(invalid)?;
        let verdict: Verdict = self.validation_status.parse().map_err(invalid)?;
        let payload = payload_from_value(self.data_json.clone()).map_err(invalid)?;
        Ok(StepRecord { id: self.id,
                        trial_id: self.trial_id,
                        step_code,
                        payload,
                        verdict,
                        remarks: self.remarks,
                        completed_at: self.completed_at,
                        created_at: self.created_at,
                        updated_at: self.updated_at })
    }
}

/// Determina si un error es transitorio (conviene reintentar con backoff).
fn is_retryable(e: &PersistenceError) -> bool {
    match e {
        PersistenceError::SerializationConflict | PersistenceError::TransientIo(_) => true,
        // Algunos mensajes llegan como Unknown; best-effort sin acoplar a SQLSTATE.
        PersistenceError::Unknown(msg) => {
            let m = msg.to_lowercase();
            m.contains("deadlock detected") || m.contains("could not serialize access") || m.contains("connection closed")
        }
        _ => false,
    }
}

/// Reintenta la unidad `f` ante errores transitorios: hasta 3 reintentos con
/// backoff lineal (15ms, 30ms, 45ms). Los rechazos de dominio nunca se
/// reintentan.
fn with_retry<F, T>(mut f: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Result<T, PersistenceError>
{
    let mut attempts = 0;
    loop {
        match f() {
            Err(e) if is_retryable(&e) && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!("retryable error (attempt {}): {:?} -> sleeping {}ms", attempts + 1, e, delay_ms);
                std::thread::sleep(std::time::Duration::from_millis(delay_ms));
                attempts += 1;
            }
            r => return r,
        }
    }
}

/// Store Postgres de trials.
pub struct PgTrialStore<P: ConnectionProvider> {
    pub provider: P,
}

impl<P: ConnectionProvider> PgTrialStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    fn load_detail(conn: &mut PgConnection, row: TrialRow) -> Result<TrialDetail, PersistenceError> {
        let trial = row.into_trial()?;
        let records = Self::load_records(conn, trial.id)?;
        Ok(TrialDetail::new(trial, records))
    }

    fn load_records(conn: &mut PgConnection, trial_id: Uuid) -> Result<Vec<StepRecord>, PersistenceError> {
        let rows: Vec<StepRow> = step_data::table.filter(step_data::trial_id.eq(trial_id))
                                                 .order(step_data::step_code.asc())
                                                 .load(conn)?;
        rows.into_iter().map(StepRow::into_record).collect()
    }

    /// Unidad atómica de `submit_step` (ver docs del módulo).
    fn submit_in_tx(conn: &mut PgConnection,
                    trial_id: Uuid,
                    submission: &StepSubmission,
                    machine: &WorkflowMachine)
                    -> Result<SubmissionOutcome, PersistenceError> {
        conn.build_transaction().read_write().run(|tx| {
            let row: TrialRow = trials::table.find(trial_id)
                                             .for_update()
                                             .first(tx)
                                             .optional()?
                                             .ok_or_else(|| TrialError::trial_not_found(trial_id))?;
            let mut trial = row.into_trial()?;
            let mut records = Self::load_records(tx, trial_id)?;
            machine.admit(&records, submission)?;

            let now = Utc::now();
            let existing = records.iter().find(|r| r.step_code == submission.step);
            let record = StepRecord::from_submission(trial_id, submission, existing, now);
            let stored: StepRow = diesel::insert_into(step_data::table)
                .values(StepRow::from_record(&record))
                .on_conflict((step_data::trial_id, step_data::step_code))
                .do_update()
                .set((step_data::data_json.eq(excluded(step_data::data_json)),
                      step_data::validation_status.eq(excluded(step_data::validation_status)),
                      step_data::remarks.eq(excluded(step_data::remarks)),
                      step_data::completed_at.eq(excluded(step_data::completed_at)),
                      step_data::updated_at.eq(excluded(step_data::updated_at))))
                .get_result(tx)?;
            let record = stored.into_record()?;

            records.retain(|r| r.step_code != record.step_code);
            records.push(record.clone());
            trial.state = machine.next_state(trial.state, submission.step, submission.verdict, &records);
            trial.updated_at = now;
            diesel::update(trials::table.find(trial_id))
                .set((trials::status.eq(trial.status().as_str()),
                      trials::halted_step_code.eq(trial.halted_step().map(|s| s.as_str())),
                      trials::updated_at.eq(now)))
                .execute(tx)?;
            Ok(SubmissionOutcome { trial, record })
        })
    }
}

impl<P: ConnectionProvider> TrialStore for PgTrialStore<P> {
    fn create_trial(&self, new: NewTrial) -> Result<Trial, TrialError> {
        let trial = Trial::create(new, Utc::now());
        let row = TrialRow::from_trial(&trial);
        let inserted = with_retry(|| {
            let mut conn = self.provider.connection()?;
            diesel::insert_into(trials::table).values(&row)
                                              .execute(&mut conn)
                                              .map_err(PersistenceError::from)
        });
        match inserted {
            Ok(_) => {
                debug!("create_trial:done id={} trial_no={}", trial.id, trial.trial_no);
                Ok(trial)
            }
            Err(PersistenceError::UniqueViolation(_)) => Err(TrialError::Conflict("Trial number already exists".into())),
            Err(e) => {
                error!("create_trial:error trial_no={} err={:?}", trial.trial_no, e);
                Err(e.into())
            }
        }
    }

    fn trial(&self, id: Uuid) -> Result<Option<TrialDetail>, TrialError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            let row: Option<TrialRow> = trials::table.find(id).first(&mut conn).optional()?;
            row.map(|r| Self::load_detail(&mut conn, r)).transpose()
        }).map_err(TrialError::from)
    }

    fn trial_by_number(&self, trial_no: &str) -> Result<Option<TrialDetail>, TrialError> {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            let row: Option<TrialRow> = trials::table.filter(trials::trial_no.eq(trial_no))
                                                     .first(&mut conn)
                                                     .optional()?;
            row.map(|r| Self::load_detail(&mut conn, r)).transpose()
        }).map_err(TrialError::from)
    }

    fn list_trials(&self) -> Result<Vec<TrialSummary>, TrialError> {
        let (rows, verdicts) = with_retry(|| {
                                   let mut conn = self.provider.connection()?;
                                   let rows: Vec<TrialRow> = trials::table.order((trials::updated_at.desc(), trials::trial_no.asc()))
                                                                          .load(&mut conn)?;
                                   let verdicts: Vec<(Uuid, String)> =
                                       step_data::table.select((step_data::trial_id, step_data::validation_status))
                                                       .load(&mut conn)?;
                                   Ok((rows, verdicts))
                               })?;
        let mut counts: HashMap<Uuid, (usize, usize)> = HashMap::new();
        for (trial_id, verdict) in verdicts {
            let entry = counts.entry(trial_id).or_default();
            entry.0 += 1;
            if verdict == Verdict::Ok.as_str() {
                entry.1 += 1;
            }
        }
        let summaries = rows.into_iter()
                            .map(|row| {
                                let trial = row.into_trial()?;
                                let (steps_count, completed_steps) = counts.get(&trial.id).copied().unwrap_or_default();
                                Ok(TrialSummary { trial,
                                                  steps_count,
                                                  completed_steps })
                            })
                            .collect::<Result<Vec<_>, PersistenceError>>()?;
        debug!("list_trials:done count={}", summaries.len());
        Ok(summaries)
    }

    fn submit_step(&self, trial_id: Uuid, submission: StepSubmission, machine: &WorkflowMachine) -> Result<SubmissionOutcome, TrialError> {
        debug!("submit_step:start trial={trial_id} step={} verdict={}", submission.step, submission.verdict);
        let outcome = with_retry(|| {
                          let mut conn = self.provider.connection()?;
                          Self::submit_in_tx(&mut conn, trial_id, &submission, machine)
                      });
        match outcome {
            Ok(o) => {
                debug!("submit_step:done trial={trial_id} state={}", o.trial.state);
                Ok(o)
            }
            Err(PersistenceError::Domain(e)) => Err(e),
            Err(e) => {
                error!("submit_step:error trial={trial_id} err={:?}", e);
                Err(e.into())
            }
        }
    }
}

/// Construye un pool r2d2 y corre las migraciones pendientes.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let validated_max = max_size.max(1);
    let validated_min = min_size.max(1);
    if validated_min > validated_max {
        warn!("min_size > max_size ({validated_min} > {validated_max}), ajustando min=max");
    }
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().min_idle(Some(validated_min.min(validated_max)))
                                    .max_size(validated_max)
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

/// Carga `.env`, lee `DbConfig` y construye un pool ya migrado.
pub fn build_dev_pool_from_env() -> Result<PgPool, PersistenceError> {
    let cfg = crate::config::DbConfig::from_env()?;
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}
