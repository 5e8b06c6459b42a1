//! [`SqliteStore`] — the SQLite implementation of [`CareStore`].

use std::{collections::BTreeSet, path::Path};

use chrono::Utc;
use rusqlite::{OptionalExtension as _, types::Value};
use uuid::Uuid;

use care_core::{
  actor::{NewUser, UserAccount},
  consultation::{Consultation, ConsultationFields, ConsultationScope, NewConsultation},
  daily_round::{DailyRound, DailyRoundFields},
  facility::{District, Facility, Patient, State},
  filter::ConsultationFilter,
  page::{Page, PageRequest},
  store::CareStore,
  visibility::Visibility,
};

use crate::{
  Error, Result,
  encode::{
    RawConsultation, RawDailyRound, RawUser, decode_uuid, encode_category, encode_dt,
    encode_list, encode_suggestion, encode_uuid,
  },
  predicate::{CONSULTATION_FROM, Clause},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A consultation store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Synchronous helpers (run inside `Connection::call`) ─────────────────────

fn select_consultations(
  conn: &rusqlite::Connection,
  clause: Clause,
  tail: &str,
) -> rusqlite::Result<Vec<RawConsultation>> {
  let sql = format!(
    "SELECT DISTINCT {cols} {CONSULTATION_FROM} {where_sql} {tail}",
    cols = RawConsultation::COLUMNS,
    where_sql = clause.where_sql(),
  );
  let mut stmt = conn.prepare(&sql)?;
  stmt
    .query_map(
      rusqlite::params_from_iter(clause.into_params()),
      RawConsultation::from_row,
    )?
    .collect()
}

fn select_daily_round(
  conn: &rusqlite::Connection,
  consultation_id: i64,
  id: i64,
) -> rusqlite::Result<Option<RawDailyRound>> {
  conn
    .query_row(
      &format!(
        "SELECT {} FROM daily_rounds WHERE consultation_id = ?1 AND id = ?2",
        RawDailyRound::COLUMNS
      ),
      rusqlite::params![consultation_id, id],
      RawDailyRound::from_row,
    )
    .optional()
}

fn select_user(
  conn: &rusqlite::Connection,
  column: &str,
  value: Value,
) -> rusqlite::Result<Option<RawUser>> {
  conn
    .query_row(
      &format!("SELECT {} FROM users WHERE {column} = ?1", RawUser::COLUMNS),
      rusqlite::params![value],
      RawUser::from_row,
    )
    .optional()
}

/// Owned, column-ready values for a consultation's mutable fields.
struct ConsultationColumns {
  symptoms:              String,
  other_symptoms:        Option<String>,
  symptoms_onset_date:   Option<String>,
  category:              Option<&'static str>,
  examination_details:   Option<String>,
  existing_medication:   Option<String>,
  prescribed_medication: Option<String>,
  suggestion:            &'static str,
  referred_to:           Option<i64>,
  admitted:              bool,
  admission_date:        Option<String>,
  discharge_date:        Option<String>,
  bed_number:            Option<String>,
}

impl ConsultationColumns {
  fn encode(f: ConsultationFields) -> Result<Self> {
    Ok(ConsultationColumns {
      symptoms:              encode_list(&f.symptoms)?,
      other_symptoms:        f.other_symptoms,
      symptoms_onset_date:   f.symptoms_onset_date.map(encode_dt),
      category:              f.category.map(encode_category),
      examination_details:   f.examination_details,
      existing_medication:   f.existing_medication,
      prescribed_medication: f.prescribed_medication,
      suggestion:            encode_suggestion(f.suggestion),
      referred_to:           f.referred_to,
      admitted:              f.admitted,
      admission_date:        f.admission_date.map(encode_dt),
      discharge_date:        f.discharge_date.map(encode_dt),
      bed_number:            f.bed_number,
    })
  }
}

/// Owned, column-ready values for a daily round's fields.
struct DailyRoundColumns {
  temperature:               Option<f64>,
  temperature_measured_at:   Option<String>,
  physical_examination_info: Option<String>,
  additional_symptoms:       String,
  other_symptoms:            Option<String>,
  patient_category:          Option<&'static str>,
  current_health:            i64,
  recommend_discharge:       bool,
  other_details:             Option<String>,
}

impl DailyRoundColumns {
  fn encode(f: DailyRoundFields) -> Result<Self> {
    Ok(DailyRoundColumns {
      temperature:               f.temperature,
      temperature_measured_at:   f.temperature_measured_at.map(encode_dt),
      physical_examination_info: f.physical_examination_info,
      additional_symptoms:       encode_list(&f.additional_symptoms)?,
      other_symptoms:            f.other_symptoms,
      patient_category:          f.patient_category.map(encode_category),
      current_health:            f.current_health,
      recommend_discharge:       f.recommend_discharge,
      other_details:             f.other_details,
    })
  }
}

// ─── CareStore impl ──────────────────────────────────────────────────────────

impl CareStore for SqliteStore {
  type Error = Error;

  // ── Directory ─────────────────────────────────────────────────────────────

  async fn add_state(&self, name: String) -> Result<State> {
    let stored = name.clone();
    let id = self
      .conn
      .call(move |conn| {
        conn.execute("INSERT INTO states (name) VALUES (?1)", rusqlite::params![stored])?;
        Ok(conn.last_insert_rowid())
      })
      .await?;
    Ok(State { id, name })
  }

  async fn add_district(&self, name: String, state_id: i64) -> Result<District> {
    let stored = name.clone();
    let id: Option<i64> = self
      .conn
      .call(move |conn| {
        let exists = conn
          .query_row("SELECT 1 FROM states WHERE id = ?1", [state_id], |_| Ok(()))
          .optional()?
          .is_some();
        if !exists {
          return Ok(None);
        }
        conn.execute(
          "INSERT INTO districts (name, state_id) VALUES (?1, ?2)",
          rusqlite::params![stored, state_id],
        )?;
        Ok(Some(conn.last_insert_rowid()))
      })
      .await?;

    let id = id.ok_or(Error::StateNotFound(state_id))?;
    Ok(District { id, name, state_id })
  }

  async fn add_facility(&self, name: String, district_id: i64) -> Result<Facility> {
    let stored = name.clone();
    let inserted: Option<(i64, i64)> = self
      .conn
      .call(move |conn| {
        let state_id: Option<i64> = conn
          .query_row(
            "SELECT state_id FROM districts WHERE id = ?1",
            [district_id],
            |r| r.get(0),
          )
          .optional()?;
        let Some(state_id) = state_id else {
          return Ok(None);
        };
        conn.execute(
          "INSERT INTO facilities (name, district_id, state_id) VALUES (?1, ?2, ?3)",
          rusqlite::params![stored, district_id, state_id],
        )?;
        Ok(Some((conn.last_insert_rowid(), state_id)))
      })
      .await?;

    let (id, state_id) = inserted.ok_or(Error::DistrictNotFound(district_id))?;
    Ok(Facility { id, name, district_id, state_id })
  }

  async fn get_facility(&self, id: i64) -> Result<Option<Facility>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT id, name, district_id, state_id FROM facilities WHERE id = ?1",
                [id],
                |row| {
                  Ok(Facility {
                    id:          row.get(0)?,
                    name:        row.get(1)?,
                    district_id: row.get(2)?,
                    state_id:    row.get(3)?,
                  })
                },
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn add_patient(&self, name: String, facility_id: i64) -> Result<Patient> {
    let external_id = Uuid::new_v4();
    let ext_str     = encode_uuid(external_id);
    let stored      = name.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO patients (external_id, name, facility_id) VALUES (?1, ?2, ?3)",
          rusqlite::params![ext_str, stored, facility_id],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Patient { id, external_id, name, facility_id })
  }

  async fn get_patient(&self, external_id: Uuid) -> Result<Option<Patient>> {
    let ext_str = encode_uuid(external_id);

    let raw: Option<(i64, String, String, i64)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id, external_id, name, facility_id FROM patients WHERE external_id = ?1",
              rusqlite::params![ext_str],
              |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .map(|(id, ext, name, facility_id)| {
        Ok(Patient { id, external_id: decode_uuid(&ext)?, name, facility_id })
      })
      .transpose()
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn add_user(&self, user: NewUser) -> Result<UserAccount> {
    let NewUser { username, password_hash, role, is_superuser, state_id, district_id } = user;
    let (u, h) = (username.clone(), password_hash.clone());

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (username, password_hash, user_type, is_superuser, state_id, district_id)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![u, h, role.value(), is_superuser, state_id, district_id],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    tracing::debug!(user_id = id, %username, ?role, "user created");
    Ok(UserAccount { id, username, password_hash, role, is_superuser, state_id, district_id })
  }

  async fn get_user(&self, id: i64) -> Result<Option<UserAccount>> {
    let raw = self
      .conn
      .call(move |conn| Ok(select_user(conn, "id", Value::Integer(id))?))
      .await?;
    raw.map(RawUser::into_account).transpose()
  }

  async fn find_user(&self, username: &str) -> Result<Option<UserAccount>> {
    let username = username.to_owned();
    let raw = self
      .conn
      .call(move |conn| Ok(select_user(conn, "username", Value::Text(username))?))
      .await?;
    raw.map(RawUser::into_account).transpose()
  }

  async fn add_facility_user(&self, facility_id: i64, user_id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO facility_users (facility_id, user_id) VALUES (?1, ?2)",
          rusqlite::params![facility_id, user_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn facility_ids_for_user(&self, user_id: i64) -> Result<BTreeSet<i64>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt =
            conn.prepare("SELECT facility_id FROM facility_users WHERE user_id = ?1")?;
          let ids = stmt
            .query_map([user_id], |r| r.get(0))?
            .collect::<rusqlite::Result<BTreeSet<i64>>>()?;
          Ok(ids)
        })
        .await?,
    )
  }

  // ── Consultations ─────────────────────────────────────────────────────────

  async fn create_consultation(&self, input: NewConsultation) -> Result<Consultation> {
    let external_id = encode_uuid(Uuid::new_v4());
    let now         = encode_dt(Utc::now());
    let NewConsultation { patient_id, facility_id, assigned_to, fields } = input;
    let cols        = ConsultationColumns::encode(fields)?;

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO consultations (
             external_id, patient_id, facility_id, assigned_to,
             symptoms, other_symptoms, symptoms_onset_date, category,
             examination_details, existing_medication, prescribed_medication,
             suggestion, referred_to, admitted, admission_date, discharge_date,
             bed_number, created_date, modified_date
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?18)",
          rusqlite::params![
            external_id,
            patient_id,
            facility_id,
            assigned_to,
            cols.symptoms,
            cols.other_symptoms,
            cols.symptoms_onset_date,
            cols.category,
            cols.examination_details,
            cols.existing_medication,
            cols.prescribed_medication,
            cols.suggestion,
            cols.referred_to,
            cols.admitted,
            cols.admission_date,
            cols.discharge_date,
            cols.bed_number,
            now,
          ],
        )?;
        let id = tx.last_insert_rowid();
        let raw = select_consultations(&tx, Clause::new().and("c.id = ?", Value::Integer(id)), "")?
          .pop()
          .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    let consultation = raw.into_consultation()?;
    tracing::debug!(external_id = %consultation.external_id, "consultation created");
    Ok(consultation)
  }

  async fn list_consultations(
    &self,
    visibility: &Visibility,
    filter: &ConsultationFilter,
    page: PageRequest,
  ) -> Result<Page<Consultation>> {
    let clause = Clause::new().visibility(visibility).filter(filter);
    let limit  = page.limit() as i64;
    let offset = page.offset() as i64;

    let (count, raws): (i64, Vec<RawConsultation>) = self
      .conn
      .call(move |conn| {
        let count_sql = format!(
          "SELECT COUNT(DISTINCT c.id) {CONSULTATION_FROM} {}",
          clause.where_sql()
        );
        let count = conn.query_row(
          &count_sql,
          rusqlite::params_from_iter(clause.clone().into_params()),
          |r| r.get(0),
        )?;
        let rows = select_consultations(
          conn,
          clause,
          &format!("ORDER BY c.id DESC LIMIT {limit} OFFSET {offset}"),
        )?;
        Ok((count, rows))
      })
      .await?;

    let results = raws
      .into_iter()
      .map(RawConsultation::into_consultation)
      .collect::<Result<Vec<_>>>()?;
    Ok(Page { count: count as usize, results })
  }

  async fn get_consultation(
    &self,
    visibility: &Visibility,
    external_id: Uuid,
  ) -> Result<Option<Consultation>> {
    let clause = Clause::new()
      .visibility(visibility)
      .and("c.external_id = ?", Value::Text(encode_uuid(external_id)));

    let mut raws = self
      .conn
      .call(move |conn| Ok(select_consultations(conn, clause, "")?))
      .await?;

    raws.pop().map(RawConsultation::into_consultation).transpose()
  }

  async fn consultation_scope(
    &self,
    external_id: Uuid,
  ) -> Result<Option<(i64, ConsultationScope)>> {
    let ext_str = encode_uuid(external_id);
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                &format!(
                  "SELECT c.id, pf.id, pf.district_id, pf.state_id, c.assigned_to
                   {CONSULTATION_FROM}
                   WHERE c.external_id = ?1"
                ),
                rusqlite::params![ext_str],
                |row| {
                  Ok((row.get(0)?, ConsultationScope {
                    patient_facility_id: row.get(1)?,
                    district_id:         row.get(2)?,
                    state_id:            row.get(3)?,
                    assigned_to:         row.get(4)?,
                  }))
                },
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn update_consultation(
    &self,
    id: i64,
    assigned_to: Option<i64>,
    fields: ConsultationFields,
  ) -> Result<Option<Consultation>> {
    let cols = ConsultationColumns::encode(fields)?;
    let now  = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE consultations SET
             assigned_to = ?2, symptoms = ?3, other_symptoms = ?4,
             symptoms_onset_date = ?5, category = ?6, examination_details = ?7,
             existing_medication = ?8, prescribed_medication = ?9, suggestion = ?10,
             referred_to = ?11, admitted = ?12, admission_date = ?13,
             discharge_date = ?14, bed_number = ?15, modified_date = ?16
           WHERE id = ?1",
          rusqlite::params![
            id,
            assigned_to,
            cols.symptoms,
            cols.other_symptoms,
            cols.symptoms_onset_date,
            cols.category,
            cols.examination_details,
            cols.existing_medication,
            cols.prescribed_medication,
            cols.suggestion,
            cols.referred_to,
            cols.admitted,
            cols.admission_date,
            cols.discharge_date,
            cols.bed_number,
            now,
          ],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        let mut rows =
          select_consultations(&tx, Clause::new().and("c.id = ?", Value::Integer(id)), "")?;
        tx.commit()?;
        Ok(rows.pop())
      })
      .await?;

    raw.map(RawConsultation::into_consultation).transpose()
  }

  // ── Daily rounds ──────────────────────────────────────────────────────────

  async fn create_daily_round(
    &self,
    consultation_id: i64,
    fields: DailyRoundFields,
  ) -> Result<DailyRound> {
    let cols = DailyRoundColumns::encode(fields)?;
    let now  = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO daily_rounds (
             consultation_id, temperature, temperature_measured_at,
             physical_examination_info, additional_symptoms, other_symptoms,
             patient_category, current_health, recommend_discharge, other_details,
             created_date, modified_date
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
          rusqlite::params![
            consultation_id,
            cols.temperature,
            cols.temperature_measured_at,
            cols.physical_examination_info,
            cols.additional_symptoms,
            cols.other_symptoms,
            cols.patient_category,
            cols.current_health,
            cols.recommend_discharge,
            cols.other_details,
            now,
          ],
        )?;
        let id = tx.last_insert_rowid();
        let raw = select_daily_round(&tx, consultation_id, id)?
          .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    let round = raw.into_daily_round()?;
    tracing::debug!(round_id = round.id, consultation_id, "daily round created");
    Ok(round)
  }

  async fn list_daily_rounds(
    &self,
    consultation_id: i64,
    page: PageRequest,
  ) -> Result<Page<DailyRound>> {
    let limit  = page.limit() as i64;
    let offset = page.offset() as i64;

    let (count, raws): (i64, Vec<RawDailyRound>) = self
      .conn
      .call(move |conn| {
        let count = conn.query_row(
          "SELECT COUNT(*) FROM daily_rounds WHERE consultation_id = ?1",
          [consultation_id],
          |r| r.get(0),
        )?;
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM daily_rounds WHERE consultation_id = ?1
           ORDER BY id DESC LIMIT ?2 OFFSET ?3",
          RawDailyRound::COLUMNS
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![consultation_id, limit, offset],
            RawDailyRound::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((count, rows))
      })
      .await?;

    let results = raws
      .into_iter()
      .map(RawDailyRound::into_daily_round)
      .collect::<Result<Vec<_>>>()?;
    Ok(Page { count: count as usize, results })
  }

  async fn get_daily_round(&self, consultation_id: i64, id: i64) -> Result<Option<DailyRound>> {
    let raw = self
      .conn
      .call(move |conn| Ok(select_daily_round(conn, consultation_id, id)?))
      .await?;
    raw.map(RawDailyRound::into_daily_round).transpose()
  }

  async fn update_daily_round(
    &self,
    consultation_id: i64,
    id: i64,
    fields: DailyRoundFields,
  ) -> Result<Option<DailyRound>> {
    let cols = DailyRoundColumns::encode(fields)?;
    let now  = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE daily_rounds SET
             temperature = ?3, temperature_measured_at = ?4,
             physical_examination_info = ?5, additional_symptoms = ?6,
             other_symptoms = ?7, patient_category = ?8, current_health = ?9,
             recommend_discharge = ?10, other_details = ?11, modified_date = ?12
           WHERE consultation_id = ?1 AND id = ?2",
          rusqlite::params![
            consultation_id,
            id,
            cols.temperature,
            cols.temperature_measured_at,
            cols.physical_examination_info,
            cols.additional_symptoms,
            cols.other_symptoms,
            cols.patient_category,
            cols.current_health,
            cols.recommend_discharge,
            cols.other_details,
            now,
          ],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        let raw = select_daily_round(&tx, consultation_id, id)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawDailyRound::into_daily_round).transpose()
  }
}
