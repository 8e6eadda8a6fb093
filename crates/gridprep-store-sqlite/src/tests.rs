//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;

use gridprep_core::{
  customer::{CustomerDraft, CustomerRecord},
  fixtures::{LossPlan, ReadingPlan},
  location::{DqStatus, LocationRecord, StateRecord},
  store::Warehouse,
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn loc(location_id: &str, state_id: &str, city: &str) -> LocationRecord {
  LocationRecord {
    location_id: location_id.to_string(),
    state_id:    state_id.to_string(),
    city:        city.to_string(),
  }
}

fn customer(
  customer_id: i64,
  name:        &str,
  city:        &str,
  state_code:  &str,
) -> CustomerRecord {
  CustomerRecord {
    customer_id,
    customer_name: name.to_string(),
    city:          city.to_string(),
    state_code:    state_code.to_string(),
    customer_kind: "Commercial".to_string(),
    joined_on:     date(2025, 1, 10),
  }
}

/// The worked scenario: two Rio/RJ rows (ids 1 and 2) and one Bahia/BA row.
async fn seed_example(s: &SqliteStore) {
  s.replace_states(vec![
    StateRecord { state_id: "st-rj".into(), state_code: "RJ".into() },
    StateRecord { state_id: "st-ba".into(), state_code: "BA".into() },
  ])
  .await
  .unwrap();

  s.replace_locations(vec![
    loc("1", "st-rj", "Rio"),
    loc("2", "st-rj", "Rio"),
    loc("3", "st-ba", "Bahia"),
  ])
  .await
  .unwrap();
}

/// Fetch `(location_id, dq_status)` pairs from the snapshot, ordered by id.
async fn snapshot_flags(s: &SqliteStore) -> Vec<(String, String)> {
  s.conn
    .call(|conn| {
      let mut stmt = conn.prepare(
        "SELECT location_id, dq_status FROM locations_ranked
         ORDER BY location_id",
      )?;
      let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
      Ok(rows)
    })
    .await
    .unwrap()
}

async fn count(s: &SqliteStore, sql: &'static str) -> i64 {
  s.conn
    .call(move |conn| Ok(conn.query_row(sql, [], |r| r.get(0))?))
    .await
    .unwrap()
}

// ─── 4.1 Snapshot ────────────────────────────────────────────────────────────

#[tokio::test]
async fn snapshot_flags_survivor_and_duplicate() {
  let s = store().await;
  seed_example(&s).await;

  let report = s.build_snapshot().await.unwrap();
  assert_eq!(report.total, 3);
  assert_eq!(report.valid, 2);
  assert_eq!(report.duplicates, 1);

  let flags = snapshot_flags(&s).await;
  assert_eq!(flags, vec![
    ("1".to_string(), "VALID".to_string()),
    ("2".to_string(), "DUPLICATE_ERROR".to_string()),
    ("3".to_string(), "VALID".to_string()),
  ]);
}

#[tokio::test]
async fn snapshot_is_idempotent_on_stable_input() {
  let s = store().await;
  seed_example(&s).await;

  let first_report = s.build_snapshot().await.unwrap();
  let first = snapshot_flags(&s).await;

  let second_report = s.build_snapshot().await.unwrap();
  let second = snapshot_flags(&s).await;

  assert_eq!(first_report, second_report);
  assert_eq!(first, second);
}

#[tokio::test]
async fn snapshot_groups_case_and_whitespace_insensitively() {
  let s = store().await;
  s.replace_states(vec![StateRecord {
    state_id:   "st-rj".into(),
    state_code: "RJ".into(),
  }])
  .await
  .unwrap();
  s.replace_locations(vec![
    loc("10", "st-rj", "Rio"),
    loc("11", "st-rj", "  rio "),
    loc("12", "st-rj", "RIO"),
  ])
  .await
  .unwrap();

  let report = s.build_snapshot().await.unwrap();
  assert_eq!(report.valid, 1);
  assert_eq!(report.duplicates, 2);

  // Lowest location_id wins.
  let flags = snapshot_flags(&s).await;
  assert_eq!(flags[0], ("10".to_string(), "VALID".to_string()));
}

#[tokio::test]
async fn snapshot_has_exactly_one_survivor_per_group() {
  let s = store().await;
  seed_example(&s).await;
  s.build_snapshot().await.unwrap();

  let max_survivors = count(
    &s,
    "SELECT MAX(n) FROM (
       SELECT COUNT(*) AS n FROM locations_ranked
       WHERE dq_status = 'VALID'
       GROUP BY TRIM(LOWER(city)), TRIM(LOWER(state_code))
     )",
  )
  .await;
  assert_eq!(max_survivors, 1);
}

#[tokio::test]
async fn snapshot_does_not_mutate_dimension_table() {
  let s = store().await;
  seed_example(&s).await;
  s.build_snapshot().await.unwrap();

  assert_eq!(count(&s, "SELECT COUNT(*) FROM locations").await, 3);
}

// ─── 4.2 Clean view ──────────────────────────────────────────────────────────

#[tokio::test]
async fn clean_view_requires_snapshot() {
  let s = store().await;
  let err = s.ensure_clean_view().await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(gridprep_core::Error::SnapshotMissing)
  ));
}

#[tokio::test]
async fn clean_view_contains_only_valid_rows() {
  let s = store().await;
  seed_example(&s).await;
  s.build_snapshot().await.unwrap();
  s.ensure_clean_view().await.unwrap();

  assert_eq!(count(&s, "SELECT COUNT(*) FROM locations_clean").await, 2);
  assert_eq!(
    count(
      &s,
      "SELECT COUNT(*) FROM locations_clean
       WHERE dq_status != 'VALID'"
    )
    .await,
    0
  );
}

#[tokio::test]
async fn clean_view_tracks_snapshot_rebuilds() {
  let s = store().await;
  seed_example(&s).await;
  s.build_snapshot().await.unwrap();
  s.ensure_clean_view().await.unwrap();

  // Remove the duplicate source row and rebuild; the view follows with no
  // separate synchronization step.
  s.replace_locations(vec![loc("1", "st-rj", "Rio"), loc("3", "st-ba", "Bahia")])
    .await
    .unwrap();
  s.build_snapshot().await.unwrap();

  assert_eq!(count(&s, "SELECT COUNT(*) FROM locations_clean").await, 2);
}

#[tokio::test]
async fn full_pipeline_can_be_rerun_with_live_view() {
  let s = store().await;
  seed_example(&s).await;
  s.replace_customers(vec![customer(100, "Alice", "Rio", "RJ")])
    .await
    .unwrap();

  s.build_snapshot().await.unwrap();
  s.ensure_clean_view().await.unwrap();
  s.enrich_customers().await.unwrap();

  // Second pass over the same data: the snapshot swap happens while the
  // clean view is defined and must leave it intact.
  let report = s.build_snapshot().await.unwrap();
  assert_eq!(report.valid, 2);
  s.ensure_clean_view().await.unwrap();
  let enrich = s.enrich_customers().await.unwrap();
  assert_eq!(enrich.matched, 1);

  assert_eq!(count(&s, "SELECT COUNT(*) FROM locations_clean").await, 2);
}

// ─── 4.3 Enrichment ──────────────────────────────────────────────────────────

#[tokio::test]
async fn enrich_requires_snapshot() {
  let s = store().await;
  let err = s.enrich_customers().await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(gridprep_core::Error::SnapshotMissing)
  ));
}

#[tokio::test]
async fn enrich_preserves_cardinality_and_resolves_survivor() {
  let s = store().await;
  seed_example(&s).await;
  s.replace_customers(vec![
    customer(100, "Alice", "Rio", "RJ"),
    customer(101, "Bob", "Bahia", "BA"),
    customer(102, "Carol", "Niterói", "RJ"), // no matching location
  ])
  .await
  .unwrap();

  s.build_snapshot().await.unwrap();
  s.ensure_clean_view().await.unwrap();
  let report = s.enrich_customers().await.unwrap();

  assert_eq!(report.input_rows, 3);
  assert_eq!(report.output_rows, 3);
  assert_eq!(report.matched, 2);
  assert_eq!(report.unmatched, 1);

  // The Rio customer resolves to the survivor (id 1), never the duplicate.
  let resolved: String = s
    .conn
    .call(|conn| {
      Ok(conn.query_row(
        "SELECT location_id FROM customers_enriched WHERE customer_id = 100",
        [],
        |r| r.get(0),
      )?)
    })
    .await
    .unwrap();
  assert_eq!(resolved, "1");

  // Unmatched rows are kept with a NULL location_id.
  assert_eq!(
    count(
      &s,
      "SELECT COUNT(*) FROM customers_enriched
       WHERE customer_id = 102 AND location_id IS NULL"
    )
    .await,
    1
  );
}

#[tokio::test]
async fn enrich_key_is_total_over_missing_city_and_state() {
  let s = store().await;
  seed_example(&s).await;
  s.conn
    .call(|conn| {
      conn.execute(
        "INSERT INTO customers (customer_id, customer_name, joined_on)
         VALUES (200, 'No Address', '2025-01-01')",
        [],
      )?;
      Ok(())
    })
    .await
    .unwrap();

  s.build_snapshot().await.unwrap();
  s.ensure_clean_view().await.unwrap();
  let report = s.enrich_customers().await.unwrap();

  assert_eq!(report.input_rows, 1);
  assert_eq!(report.output_rows, 1);

  let key: String = s
    .conn
    .call(|conn| {
      Ok(conn.query_row(
        "SELECT location_key FROM customers_enriched WHERE customer_id = 200",
        [],
        |r| r.get(0),
      )?)
    })
    .await
    .unwrap();
  assert_eq!(key, "_");
}

#[tokio::test]
async fn enrich_does_not_mutate_inputs() {
  let s = store().await;
  seed_example(&s).await;
  s.replace_customers(vec![customer(100, "Alice", "Rio", "RJ")])
    .await
    .unwrap();

  s.build_snapshot().await.unwrap();
  s.ensure_clean_view().await.unwrap();
  s.enrich_customers().await.unwrap();

  assert_eq!(count(&s, "SELECT COUNT(*) FROM customers").await, 1);
  assert_eq!(count(&s, "SELECT COUNT(*) FROM locations").await, 3);
}

#[tokio::test]
async fn enrich_replaces_prior_artifact_wholesale() {
  let s = store().await;
  seed_example(&s).await;
  s.replace_customers(vec![customer(100, "Alice", "Rio", "RJ")])
    .await
    .unwrap();
  s.build_snapshot().await.unwrap();
  s.ensure_clean_view().await.unwrap();
  s.enrich_customers().await.unwrap();

  s.replace_customers(vec![
    customer(100, "Alice", "Rio", "RJ"),
    customer(101, "Bob", "Bahia", "BA"),
  ])
  .await
  .unwrap();
  let report = s.enrich_customers().await.unwrap();

  assert_eq!(report.output_rows, 2);
  assert_eq!(count(&s, "SELECT COUNT(*) FROM customers_enriched").await, 2);
}

// ─── 4.4 Status synchronizer ─────────────────────────────────────────────────

#[tokio::test]
async fn sync_requires_snapshot() {
  let s = store().await;
  let err = s.sync_status().await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(gridprep_core::Error::SnapshotMissing)
  ));
}

#[tokio::test]
async fn sync_copies_flags_onto_dimension_table() {
  let s = store().await;
  seed_example(&s).await;
  s.build_snapshot().await.unwrap();

  let updated = s.sync_status().await.unwrap();
  assert_eq!(updated, 3);

  let mismatches = count(
    &s,
    "SELECT COUNT(*) FROM locations AS l
     JOIN locations_ranked AS r ON r.row_seq = l.row_seq
     WHERE l.dq_status IS NOT r.dq_status",
  )
  .await;
  assert_eq!(mismatches, 0);
}

#[tokio::test]
async fn sync_is_idempotent() {
  let s = store().await;
  seed_example(&s).await;
  s.build_snapshot().await.unwrap();

  let first = s.sync_status().await.unwrap();
  let second = s.sync_status().await.unwrap();
  assert_eq!(first, second);

  assert_eq!(
    count(
      &s,
      "SELECT COUNT(*) FROM locations WHERE dq_status = 'DUPLICATE_ERROR'"
    )
    .await,
    1
  );
}

// ─── 4.5 Compactor ───────────────────────────────────────────────────────────

#[tokio::test]
async fn compact_keeps_only_lowest_identity_per_group() {
  let s = store().await;
  seed_example(&s).await;

  let deleted = s.compact_duplicates().await.unwrap();
  assert_eq!(deleted, 1);

  let remaining: Vec<(String, String)> = s
    .conn
    .call(|conn| {
      let mut stmt = conn.prepare(
        "SELECT location_id, city FROM locations ORDER BY row_seq",
      )?;
      let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
      Ok(rows)
    })
    .await
    .unwrap();

  assert_eq!(remaining, vec![
    ("1".to_string(), "Rio".to_string()),
    ("3".to_string(), "Bahia".to_string()),
  ]);
}

#[tokio::test]
async fn compact_leaves_at_most_one_row_per_group() {
  let s = store().await;
  s.replace_states(vec![StateRecord {
    state_id:   "st-rj".into(),
    state_code: "RJ".into(),
  }])
  .await
  .unwrap();
  s.replace_locations(vec![
    loc("5", "st-rj", "Rio"),
    loc("5", "st-rj", "Rio"), // exact physical duplicate, same logical id
    loc("6", "st-rj", "rio"),
  ])
  .await
  .unwrap();

  let deleted = s.compact_duplicates().await.unwrap();
  assert_eq!(deleted, 2);

  // The survivor is the physically first row.
  let survivor: i64 = s
    .conn
    .call(|conn| {
      Ok(conn.query_row("SELECT MIN(row_seq) FROM locations", [], |r| r.get(0))?)
    })
    .await
    .unwrap();
  assert_eq!(survivor, 1);
}

#[tokio::test]
async fn compact_is_a_noop_once_clean() {
  let s = store().await;
  seed_example(&s).await;

  assert_eq!(s.compact_duplicates().await.unwrap(), 1);
  assert_eq!(s.compact_duplicates().await.unwrap(), 0);
  assert_eq!(count(&s, "SELECT COUNT(*) FROM locations").await, 2);
}

// ─── Key back-fill ───────────────────────────────────────────────────────────

#[tokio::test]
async fn ensure_location_keys_fills_and_is_idempotent() {
  let s = store().await;
  seed_example(&s).await;

  let first = s.ensure_location_keys().await.unwrap();
  assert_eq!(first, 3);

  let second = s.ensure_location_keys().await.unwrap();
  assert_eq!(second, 3);

  let key: String = s
    .conn
    .call(|conn| {
      Ok(conn.query_row(
        "SELECT location_key FROM locations WHERE location_id = '3'",
        [],
        |r| r.get(0),
      )?)
    })
    .await
    .unwrap();
  assert_eq!(key, "Bahia_BA");
}

// ─── Duplicate listing ───────────────────────────────────────────────────────

#[tokio::test]
async fn list_duplicates_requires_snapshot() {
  let s = store().await;
  let err = s.list_duplicates().await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(gridprep_core::Error::SnapshotMissing)
  ));
}

#[tokio::test]
async fn list_duplicates_returns_flagged_rows_in_order() {
  let s = store().await;
  seed_example(&s).await;
  s.build_snapshot().await.unwrap();

  let dups = s.list_duplicates().await.unwrap();
  assert_eq!(dups.len(), 1);
  assert_eq!(dups[0].location_id, "2");
  assert_eq!(dups[0].location_key, "Rio_RJ");
  assert_eq!(dups[0].dq_status, DqStatus::DuplicateError);
}

// ─── Reference data and generators ───────────────────────────────────────────

#[tokio::test]
async fn load_reference_joins_locations_to_states() {
  let s = store().await;
  seed_example(&s).await;
  s.replace_customers(vec![customer(1, "Alice", "Rio", "RJ")])
    .await
    .unwrap();

  let reference = s.load_reference().await.unwrap();
  assert_eq!(reference.locations.len(), 3);
  assert!(
    reference
      .locations
      .iter()
      .any(|l| l.city == "Rio" && l.state_code == "RJ")
  );
  assert_eq!(reference.customer_kinds, vec!["Commercial".to_string()]);
}

#[tokio::test]
async fn insert_customer_assigns_store_native_sequential_ids() {
  let s = store().await;

  let draft = CustomerDraft {
    customer_name: "Alice Silva".to_string(),
    city:          "Rio".to_string(),
    state_code:    "RJ".to_string(),
    customer_kind: "Commercial".to_string(),
    joined_on:     date(2025, 1, 15),
  };

  let first = s.insert_customer(draft.clone()).await.unwrap();
  let second = s.insert_customer(draft).await.unwrap();
  assert_eq!(second.customer_id, first.customer_id + 1);

  let latest = s.latest_customer().await.unwrap().unwrap();
  assert_eq!(latest, second);
}

#[tokio::test]
async fn latest_customer_is_none_on_empty_table() {
  let s = store().await;
  assert!(s.latest_customer().await.unwrap().is_none());
}

#[tokio::test]
async fn reading_batches_insert_atomically_with_assigned_ids() {
  let s = store().await;

  let mut rng = rand::thread_rng();
  let batch = ReadingPlan::normal_feb_oct().generate(&mut rng);
  let report = s.insert_readings(batch).await.unwrap();

  assert_eq!(report.inserted, 450);
  assert_eq!(report.last_id, Some(450));
  assert_eq!(count(&s, "SELECT COUNT(*) FROM energy_readings").await, 450);

  // A second batch continues the id sequence.
  let mut rng = rand::thread_rng();
  let batch = ReadingPlan::estimated_nov_dec().generate(&mut rng);
  let report = s.insert_readings(batch).await.unwrap();
  assert_eq!(report.inserted, 100);
  assert_eq!(report.last_id, Some(550));
}

#[tokio::test]
async fn loss_batches_insert_atomically() {
  let s = store().await;

  let mut rng = rand::thread_rng();
  let report = s
    .insert_losses(LossPlan::jan_jul().generate(&mut rng))
    .await
    .unwrap();

  assert_eq!(report.inserted, 21);
  assert_eq!(report.last_id, Some(21));
}

#[tokio::test]
async fn empty_batch_reports_no_last_id() {
  let s = store().await;
  let report = s.insert_readings(Vec::new()).await.unwrap();
  assert_eq!(report.inserted, 0);
  assert_eq!(report.last_id, None);
}

// ─── Loader ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn load_dir_replaces_tables_and_skips_missing_files() {
  let dir = std::env::temp_dir().join(format!(
    "gridprep-loader-{}",
    std::process::id()
  ));
  std::fs::create_dir_all(&dir).unwrap();

  std::fs::write(
    dir.join("states.csv"),
    "State Id,State Code\nst-rj,RJ\nst-ba,BA\n",
  )
  .unwrap();
  std::fs::write(
    dir.join("locations.csv"),
    "location_id,state_id,city\n1,st-rj,Rio\n2,st-rj,Rio\n3,st-ba,Bahia\n",
  )
  .unwrap();
  std::fs::write(
    dir.join("customers.csv"),
    "customer_id,customer_name,city,state_code,customer_kind,joined_on\n\
     100,Alice,Rio,RJ,Commercial,2025-01-10\n",
  )
  .unwrap();

  let s = store().await;
  let reports = crate::load_dir(&s, &dir).await.unwrap();

  // readings and losses feeds are absent and skipped.
  assert_eq!(reports.len(), 3);
  assert_eq!(reports[0].rows, 2);
  assert_eq!(reports[1].rows, 3);
  assert_eq!(reports[2].rows, 1);

  assert_eq!(count(&s, "SELECT COUNT(*) FROM locations").await, 3);

  // Loading again replaces rather than appends.
  let reports = crate::load_dir(&s, &dir).await.unwrap();
  assert_eq!(reports[1].rows, 3);
  assert_eq!(count(&s, "SELECT COUNT(*) FROM locations").await, 3);

  std::fs::remove_dir_all(&dir).ok();
}
