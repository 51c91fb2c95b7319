//! Diesel/Postgres-backed [`FingerprintStore`], grounded in the teacher's
//! `db/connector.rs`: pooled connections, chunked batch inserts inside a
//! transaction, and a temp-table join for hash lookup.

use super::FingerprintStore;
use crate::error::{EchoidError, Result};
use crate::models::{FingerprintTuple, NewRecordingMeta, PutOutcome, RecordingMetadata, StoreStats};
use crate::schema::{fingerprints, recordings};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::upsert::on_constraint;
use std::collections::HashMap;
use std::time::SystemTime;

type PgPool = Pool<ConnectionManager<PgConnection>>;

/// Fingerprint rows are inserted in chunks this large to keep a single
/// statement's parameter count well under Postgres's limit.
const INSERT_BATCH_SIZE: usize = 5_000;

/// Hash lookups are chunked the same way before being staged into the
/// temporary join table.
const LOOKUP_BATCH_SIZE: usize = 5_000;

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = crate::schema::recordings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct RecordingRow {
    id: i64,
    title: String,
    artist: String,
    album: Option<String>,
    duration_s: Option<f64>,
    content_digest: String,
    config_epoch: i64,
    created_at: Option<SystemTime>,
}

impl From<RecordingRow> for RecordingMetadata {
    fn from(row: RecordingRow) -> Self {
        RecordingMetadata {
            id: row.id,
            title: row.title,
            artist: row.artist,
            album: row.album,
            duration_s: row.duration_s,
            content_digest: row.content_digest,
            created_at: row.created_at,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::recordings)]
struct NewRecordingRow {
    title: String,
    artist: String,
    album: Option<String>,
    duration_s: Option<f64>,
    content_digest: String,
    config_epoch: i64,
    created_at: Option<SystemTime>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::fingerprints)]
struct NewFingerprintRow {
    hash: i64,
    anchor_time: i32,
    recording_id: i64,
}

#[derive(QueryableByName)]
struct HashMatchRow {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    hash: i64,
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    recording_id: i64,
    #[diesel(sql_type = diesel::sql_types::Integer)]
    anchor_time: i32,
}

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn connect(database_url: &str) -> Result<Self> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = Pool::builder()
            .build(manager)
            .map_err(|e| EchoidError::StoreUnavailable(e.to_string()))?;
        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<ConnectionManager<PgConnection>>> {
        Ok(self.pool.get()?)
    }
}

impl FingerprintStore for PostgresStore {
    fn put_recording(
        &self,
        meta: NewRecordingMeta,
        tuples: &[FingerprintTuple],
        config_epoch: u64,
    ) -> Result<PutOutcome> {
        let mut conn = self.conn()?;

        conn.transaction(|conn| {
            if let Some(existing) = recordings::table
                .filter(recordings::content_digest.eq(&meta.content_digest))
                .select(recordings::id)
                .first::<i64>(conn)
                .optional()?
            {
                return Ok(PutOutcome::Duplicate(existing));
            }

            let new_row = NewRecordingRow {
                title: meta.title,
                artist: meta.artist,
                album: meta.album,
                duration_s: meta.duration_s,
                content_digest: meta.content_digest,
                config_epoch: config_epoch as i64,
                created_at: Some(SystemTime::now()),
            };

            let recording_id: i64 = diesel::insert_into(recordings::table)
                .values(&new_row)
                .returning(recordings::id)
                .get_result(conn)?;

            let rows: Vec<NewFingerprintRow> = tuples
                .iter()
                .map(|t| NewFingerprintRow {
                    hash: t.hash as i64,
                    anchor_time: t.anchor_time as i32,
                    recording_id,
                })
                .collect();

            for batch in rows.chunks(INSERT_BATCH_SIZE) {
                diesel::insert_into(fingerprints::table)
                    .values(batch)
                    .on_conflict(on_constraint("fingerprints_pkey"))
                    .do_nothing()
                    .execute(conn)?;
            }

            Ok(PutOutcome::Created(recording_id))
        })
    }

    fn delete_recording(&self, id: i64) -> Result<()> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(recordings::table.filter(recordings::id.eq(id))).execute(&mut conn)?;
        if deleted == 0 {
            return Err(EchoidError::NotFound(id));
        }
        Ok(())
    }

    fn lookup(&self, hashes: &[u64]) -> Result<HashMap<u64, Vec<(i64, u32)>>> {
        let mut map: HashMap<u64, Vec<(i64, u32)>> = HashMap::new();
        if hashes.is_empty() {
            return Ok(map);
        }

        let mut conn = self.conn()?;
        let signed: Vec<i64> = hashes.iter().map(|&h| h as i64).collect();

        let rows: Vec<HashMatchRow> = conn.transaction(|conn| {
            diesel::sql_query(
                "CREATE TEMPORARY TABLE temp_lookup_hashes (hash BIGINT NOT NULL PRIMARY KEY) ON COMMIT DROP",
            )
            .execute(conn)?;

            diesel::table! {
                temp_lookup_hashes (hash) {
                    hash -> BigInt,
                }
            }

            #[derive(Insertable)]
            #[diesel(table_name = temp_lookup_hashes)]
            struct NewLookupHash {
                hash: i64,
            }

            for batch in signed.chunks(LOOKUP_BATCH_SIZE) {
                let new_hashes: Vec<NewLookupHash> =
                    batch.iter().map(|&hash| NewLookupHash { hash }).collect();
                diesel::insert_into(temp_lookup_hashes::table)
                    .values(&new_hashes)
                    .on_conflict_do_nothing()
                    .execute(conn)?;
            }

            diesel::sql_query(
                "SELECT f.hash, f.recording_id, f.anchor_time \
                 FROM fingerprints AS f \
                 INNER JOIN temp_lookup_hashes AS t ON f.hash = t.hash",
            )
            .load(conn)
        })?;

        for row in rows {
            map.entry(row.hash as u64)
                .or_default()
                .push((row.recording_id, row.anchor_time as u32));
        }
        Ok(map)
    }

    fn get_recording(&self, id: i64) -> Result<RecordingMetadata> {
        let mut conn = self.conn()?;
        recordings::table
            .filter(recordings::id.eq(id))
            .select(RecordingRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(RecordingMetadata::from)
            .ok_or(EchoidError::NotFound(id))
    }

    fn list_recordings(&self) -> Result<Vec<RecordingMetadata>> {
        let mut conn = self.conn()?;
        let rows = recordings::table
            .select(RecordingRow::as_select())
            .order(recordings::id.asc())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(RecordingMetadata::from).collect())
    }

    fn stats(&self) -> Result<StoreStats> {
        let mut conn = self.conn()?;
        let recording_count: i64 = recordings::table.count().get_result(&mut conn)?;
        let tuple_count: i64 = fingerprints::table.count().get_result(&mut conn)?;
        Ok(StoreStats {
            recording_count: recording_count as u64,
            tuple_count: tuple_count as u64,
        })
    }

    fn config_epoch(&self) -> Result<Option<u64>> {
        let mut conn = self.conn()?;
        let epoch: Option<i64> = recordings::table
            .order(recordings::id.asc())
            .select(recordings::config_epoch)
            .first(&mut conn)
            .optional()?;
        Ok(epoch.map(|e| e as u64))
    }
}
