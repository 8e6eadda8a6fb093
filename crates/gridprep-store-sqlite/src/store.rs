//! [`SqliteStore`] — the SQLite implementation of [`Warehouse`].

use std::path::Path;

use rusqlite::OptionalExtension as _;

use gridprep_core::{
  customer::{CustomerDraft, CustomerRecord, ReferenceData, ReferenceLocation},
  fixtures::{LossDraft, LossRecord, ReadingDraft, ReadingRecord},
  location::{LocationRecord, RankedLocation, StateRecord},
  store::{BatchReport, EnrichReport, SnapshotReport, Warehouse},
};

use crate::{
  Error, Result,
  encode::{RawCustomer, RawRankedLocation, encode_date},
  schema::SCHEMA,
};

/// Snapshot table name (the "dirty with status" artifact).
const SNAPSHOT: &str = "locations_ranked";
/// Clean view name (VALID rows only).
const CLEAN_VIEW: &str = "locations_clean";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Gridprep warehouse backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a warehouse at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory warehouse — useful for testing.
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

  /// Whether a table or view with this name exists.
  async fn artifact_exists(&self, name: &'static str) -> Result<bool> {
    let exists: bool = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM sqlite_master
               WHERE type IN ('table', 'view') AND name = ?1",
              rusqlite::params![name],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;
    Ok(exists)
  }

  /// Precondition shared by stages 4.2–4.4 and the duplicate listing.
  async fn require_snapshot(&self) -> Result<()> {
    if self.artifact_exists(SNAPSHOT).await? {
      Ok(())
    } else {
      Err(gridprep_core::Error::SnapshotMissing.into())
    }
  }

  // ── Bulk replacement (CSV loader and test seeding) ────────────────────────

  /// Replace the state lookup table wholesale.
  pub async fn replace_states(&self, rows: Vec<StateRecord>) -> Result<u64> {
    let count = rows.len() as u64;
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM states", [])?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO states (state_id, state_code) VALUES (?1, ?2)",
          )?;
          for r in &rows {
            stmt.execute(rusqlite::params![r.state_id, r.state_code])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(count)
  }

  /// Replace the location dimension wholesale. `row_seq` is store-assigned
  /// in insertion order.
  pub async fn replace_locations(
    &self,
    rows: Vec<LocationRecord>,
  ) -> Result<u64> {
    let count = rows.len() as u64;
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM locations", [])?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO locations (location_id, state_id, city)
             VALUES (?1, ?2, ?3)",
          )?;
          for r in &rows {
            stmt.execute(rusqlite::params![r.location_id, r.state_id, r.city])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(count)
  }

  /// Replace the customer fact table wholesale, keeping the feed's ids.
  pub async fn replace_customers(
    &self,
    rows: Vec<CustomerRecord>,
  ) -> Result<u64> {
    let count = rows.len() as u64;
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM customers", [])?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO customers
               (customer_id, customer_name, city, state_code, customer_kind, joined_on)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          )?;
          for r in &rows {
            stmt.execute(rusqlite::params![
              r.customer_id,
              r.customer_name,
              r.city,
              r.state_code,
              r.customer_kind,
              encode_date(r.joined_on),
            ])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(count)
  }

  /// Replace the reading fact table wholesale, keeping the feed's ids.
  pub async fn replace_readings(
    &self,
    rows: Vec<ReadingRecord>,
  ) -> Result<u64> {
    let count = rows.len() as u64;
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM energy_readings", [])?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO energy_readings
               (reading_id, customer_id, read_on, consumption_kwh, reading_kind)
             VALUES (?1, ?2, ?3, ?4, ?5)",
          )?;
          for r in &rows {
            stmt.execute(rusqlite::params![
              r.reading_id,
              r.customer_id,
              encode_date(r.read_on),
              r.consumption_kwh,
              r.reading_kind.as_str(),
            ])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(count)
  }

  /// Replace the loss fact table wholesale, keeping the feed's ids.
  pub async fn replace_losses(&self, rows: Vec<LossRecord>) -> Result<u64> {
    let count = rows.len() as u64;
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM energy_losses", [])?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO energy_losses
               (loss_id, recorded_on, state_code, technical_kwh, non_technical_kwh)
             VALUES (?1, ?2, ?3, ?4, ?5)",
          )?;
          for r in &rows {
            stmt.execute(rusqlite::params![
              r.loss_id,
              encode_date(r.recorded_on),
              r.state_code,
              r.technical_kwh,
              r.non_technical_kwh,
            ])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(count)
  }
}

// ─── Closure-side helpers ────────────────────────────────────────────────────

fn column_exists(
  conn:   &rusqlite::Connection,
  table:  &str,
  column: &str,
) -> rusqlite::Result<bool> {
  let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
  let mut rows = stmt.query([])?;
  while let Some(row) = rows.next()? {
    let name: String = row.get(1)?;
    if name == column {
      return Ok(true);
    }
  }
  Ok(false)
}

fn count(conn: &rusqlite::Connection, sql: &str) -> rusqlite::Result<u64> {
  conn.query_row(sql, [], |r| r.get::<_, i64>(0)).map(|n| n as u64)
}

/// Carry a domain error out of a `call` closure; unwrapped back into
/// [`Error::Core`] by the store's `From<tokio_rusqlite::Error>`.
fn domain(e: gridprep_core::Error) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e))
}

// ─── Warehouse impl ──────────────────────────────────────────────────────────

impl Warehouse for SqliteStore {
  type Error = Error;

  // ── Key back-fill ──────────────────────────────────────────────────────

  async fn ensure_location_keys(&self) -> Result<u64> {
    let updated = self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        if !column_exists(&tx, "locations", "location_key")? {
          tx.execute("ALTER TABLE locations ADD COLUMN location_key TEXT", [])?;
        }
        let updated = tx.execute(
          "UPDATE locations AS l
           SET location_key = l.city || '_' || s.state_code
           FROM states AS s
           WHERE l.state_id = s.state_id",
          [],
        )?;
        tx.commit()?;
        Ok(updated as u64)
      })
      .await?;

    tracing::info!(updated, "location_key back-fill complete");
    Ok(updated)
  }

  // ── 4.1 Ranking engine + status materializer ───────────────────────────

  async fn build_snapshot(&self) -> Result<SnapshotReport> {
    let report = self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;

        // ALTER TABLE RENAME reparses every view, and the clean view
        // references the snapshot by name. It has to be out of the way
        // during the swap and is put back if it was defined.
        let had_view = count(
          &tx,
          "SELECT COUNT(*) FROM sqlite_master
           WHERE type = 'view' AND name = 'locations_clean'",
        )? > 0;

        // Build into a staging table, then swap names inside the same
        // transaction so there is no window with the snapshot absent.
        // Grouping is case/whitespace-insensitive; the survivor is the
        // lowest location_id, tie-broken by insertion order.
        tx.execute_batch(
          "DROP TABLE IF EXISTS locations_ranked_new;
           CREATE TABLE locations_ranked_new AS
           WITH ranked AS (
             SELECT l.row_seq, l.location_id, l.state_id, l.city,
                    s.state_code,
                    l.city || '_' || s.state_code AS location_key,
                    ROW_NUMBER() OVER (
                      PARTITION BY TRIM(LOWER(l.city)), TRIM(LOWER(s.state_code))
                      ORDER BY l.location_id ASC, l.row_seq ASC
                    ) AS survival_rank
             FROM locations AS l
             JOIN states    AS s ON l.state_id = s.state_id
           )
           SELECT row_seq, location_id, state_id, city, state_code,
                  location_key,
                  CASE WHEN survival_rank = 1
                       THEN 'VALID'
                       ELSE 'DUPLICATE_ERROR'
                  END AS dq_status
           FROM ranked;
           DROP VIEW IF EXISTS locations_clean;
           DROP TABLE IF EXISTS locations_ranked;
           ALTER TABLE locations_ranked_new RENAME TO locations_ranked;",
        )?;

        if had_view {
          tx.execute_batch(
            "CREATE VIEW locations_clean AS
             SELECT * FROM locations_ranked WHERE dq_status = 'VALID';",
          )?;
        }

        let total = count(&tx, "SELECT COUNT(*) FROM locations_ranked")?;
        let valid = count(
          &tx,
          "SELECT COUNT(*) FROM locations_ranked WHERE dq_status = 'VALID'",
        )?;

        tx.commit()?;
        Ok(SnapshotReport { total, valid, duplicates: total - valid })
      })
      .await?;

    tracing::info!(
      total = report.total,
      valid = report.valid,
      duplicates = report.duplicates,
      "ranked snapshot rebuilt"
    );
    Ok(report)
  }

  // ── 4.2 Clean-view projector ───────────────────────────────────────────

  async fn ensure_clean_view(&self) -> Result<()> {
    self.require_snapshot().await?;

    self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        tx.execute_batch(
          "DROP VIEW IF EXISTS locations_clean;
           CREATE VIEW locations_clean AS
           SELECT * FROM locations_ranked WHERE dq_status = 'VALID';",
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::info!("clean view defined over ranked snapshot");
    Ok(())
  }

  // ── 4.3 Enrichment joiner ──────────────────────────────────────────────

  async fn enrich_customers(&self) -> Result<EnrichReport> {
    self.require_snapshot().await?;
    if !self.artifact_exists(CLEAN_VIEW).await? {
      return Err(
        gridprep_core::Error::TableMissing(CLEAN_VIEW.to_string()).into(),
      );
    }

    let report = self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;

        let input = count(&tx, "SELECT COUNT(*) FROM customers")?;

        // The fact-side key treats missing city/state as empty string so key
        // construction is total; the left join keeps unmatched rows.
        tx.execute("DROP TABLE IF EXISTS customers_enriched_new", [])?;
        tx.execute(
          "CREATE TABLE customers_enriched_new AS
           SELECT c.*,
                  COALESCE(c.city, '') || '_' || COALESCE(c.state_code, '')
                    AS location_key,
                  v.location_id AS location_id
           FROM customers AS c
           LEFT JOIN locations_clean AS v
             ON v.location_key =
                COALESCE(c.city, '') || '_' || COALESCE(c.state_code, '')",
          [],
        )?;

        let output =
          count(&tx, "SELECT COUNT(*) FROM customers_enriched_new")?;
        let matched = count(
          &tx,
          "SELECT COUNT(*) FROM customers_enriched_new
           WHERE location_id IS NOT NULL",
        )?;

        // Clean-view key uniqueness makes this unreachable; if it ever
        // fires, the transaction rolls back and nothing is replaced.
        if output != input {
          return Err(domain(gridprep_core::Error::Cardinality {
            input,
            output,
          }));
        }

        tx.execute("DROP TABLE IF EXISTS customers_enriched", [])?;
        tx.execute(
          "ALTER TABLE customers_enriched_new RENAME TO customers_enriched",
          [],
        )?;
        tx.commit()?;

        Ok(EnrichReport {
          input_rows:  input,
          output_rows: output,
          matched,
          unmatched: output - matched,
        })
      })
      .await?;

    tracing::info!(
      input = report.input_rows,
      matched = report.matched,
      unmatched = report.unmatched,
      "enriched fact artifact rebuilt"
    );
    Ok(report)
  }

  // ── 4.4 Status synchronizer ────────────────────────────────────────────

  async fn sync_status(&self) -> Result<u64> {
    self.require_snapshot().await?;

    let updated = self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        if !column_exists(&tx, "locations", "dq_status")? {
          tx.execute("ALTER TABLE locations ADD COLUMN dq_status TEXT", [])?;
        }
        let updated = tx.execute(
          "UPDATE locations AS l
           SET dq_status = r.dq_status
           FROM locations_ranked AS r
           WHERE r.row_seq = l.row_seq",
          [],
        )?;
        tx.commit()?;
        Ok(updated as u64)
      })
      .await?;

    tracing::info!(updated, "dq_status synchronized onto dimension table");
    Ok(updated)
  }

  // ── 4.5 Compactor (destructive) ────────────────────────────────────────

  async fn compact_duplicates(&self) -> Result<u64> {
    tracing::warn!("compacting duplicates — destructive, irreversible");

    let deleted = self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        // Same grouping rule as the ranking engine, but keyed to the stored
        // insertion-order sequence so exactly the right physical rows go.
        let deleted = tx.execute(
          "DELETE FROM locations
           WHERE row_seq IN (
             SELECT row_seq FROM (
               SELECT l.row_seq,
                      ROW_NUMBER() OVER (
                        PARTITION BY TRIM(LOWER(l.city)),
                                     TRIM(LOWER(s.state_code))
                        ORDER BY l.row_seq ASC
                      ) AS physical_rank
               FROM locations AS l
               JOIN states    AS s ON l.state_id = s.state_id
             )
             WHERE physical_rank > 1
           )",
          [],
        )?;
        tx.commit()?;
        Ok(deleted as u64)
      })
      .await?;

    tracing::warn!(deleted, "duplicate rows permanently removed");
    Ok(deleted)
  }

  // ── Duplicate listing ──────────────────────────────────────────────────

  async fn list_duplicates(&self) -> Result<Vec<RankedLocation>> {
    self.require_snapshot().await?;

    let raws: Vec<RawRankedLocation> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT row_seq, location_id, state_id, city, state_code,
                  location_key, dq_status
           FROM locations_ranked
           WHERE dq_status = 'DUPLICATE_ERROR'
           ORDER BY location_key, location_id",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawRankedLocation {
              row_seq:      row.get(0)?,
              location_id:  row.get(1)?,
              state_id:     row.get(2)?,
              city:         row.get(3)?,
              state_code:   row.get(4)?,
              location_key: row.get(5)?,
              dq_status:    row.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRankedLocation::into_ranked).collect()
  }

  // ── Reference data and generators ──────────────────────────────────────

  async fn load_reference(&self) -> Result<ReferenceData> {
    let (locations, customer_kinds) = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT l.location_id, l.state_id, l.city, s.state_code
           FROM locations AS l
           JOIN states    AS s ON l.state_id = s.state_id",
        )?;
        let locations = stmt
          .query_map([], |row| {
            Ok(ReferenceLocation {
              location_id: row.get(0)?,
              state_id:    row.get(1)?,
              city:        row.get(2)?,
              state_code:  row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
          "SELECT DISTINCT customer_kind FROM customers
           WHERE customer_kind IS NOT NULL",
        )?;
        let kinds = stmt
          .query_map([], |row| row.get::<_, String>(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((locations, kinds))
      })
      .await?;

    Ok(ReferenceData {
      locations,
      customer_kinds,
      join_window: ReferenceData::default_join_window(),
    })
  }

  async fn insert_customer(&self, draft: CustomerDraft) -> Result<CustomerRecord> {
    let persisted = draft.clone();
    let customer_id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO customers
             (customer_name, city, state_code, customer_kind, joined_on)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            draft.customer_name,
            draft.city,
            draft.state_code,
            draft.customer_kind,
            encode_date(draft.joined_on),
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(CustomerRecord {
      customer_id,
      customer_name: persisted.customer_name,
      city:          persisted.city,
      state_code:    persisted.state_code,
      customer_kind: persisted.customer_kind,
      joined_on:     persisted.joined_on,
    })
  }

  async fn latest_customer(&self) -> Result<Option<CustomerRecord>> {
    let raw: Option<RawCustomer> = self
      .conn
      .call(|conn| {
        Ok(
          conn
            .query_row(
              "SELECT customer_id, customer_name, city, state_code,
                      customer_kind, joined_on
               FROM customers
               ORDER BY customer_id DESC
               LIMIT 1",
              [],
              |row| {
                Ok(RawCustomer {
                  customer_id:   row.get(0)?,
                  customer_name: row.get(1)?,
                  city:          row.get(2)?,
                  state_code:    row.get(3)?,
                  customer_kind: row.get(4)?,
                  joined_on:     row.get(5)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCustomer::into_record).transpose()
  }

  async fn insert_readings(&self, batch: Vec<ReadingDraft>) -> Result<BatchReport> {
    let inserted = batch.len() as u64;
    let last_id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut last_id = None;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO energy_readings
               (customer_id, read_on, consumption_kwh, reading_kind)
             VALUES (?1, ?2, ?3, ?4)",
          )?;
          for r in &batch {
            stmt.execute(rusqlite::params![
              r.customer_id,
              encode_date(r.read_on),
              r.consumption_kwh,
              r.reading_kind.as_str(),
            ])?;
            last_id = Some(tx.last_insert_rowid());
          }
        }
        tx.commit()?;
        Ok(last_id)
      })
      .await?;

    tracing::info!(inserted, "reading batch inserted");
    Ok(BatchReport { inserted, last_id })
  }

  async fn insert_losses(&self, batch: Vec<LossDraft>) -> Result<BatchReport> {
    let inserted = batch.len() as u64;
    let last_id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut last_id = None;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO energy_losses
               (recorded_on, state_code, technical_kwh, non_technical_kwh)
             VALUES (?1, ?2, ?3, ?4)",
          )?;
          for l in &batch {
            stmt.execute(rusqlite::params![
              encode_date(l.recorded_on),
              l.state_code,
              l.technical_kwh,
              l.non_technical_kwh,
            ])?;
            last_id = Some(tx.last_insert_rowid());
          }
        }
        tx.commit()?;
        Ok(last_id)
      })
      .await?;

    tracing::info!(inserted, "loss batch inserted");
    Ok(BatchReport { inserted, last_id })
  }
}
