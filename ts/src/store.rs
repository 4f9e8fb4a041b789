//! SQLite-backed store
//!
//! One connection, owned by a single writer. Every multi-statement change runs
//! inside a transaction so readers never observe a half-applied transition.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::records::{
    GenerationFailure, GenerationState, GenerationStatus, Itinerary, NewItinerary, NewTrip, Profile, ProfileSeed,
    SharedTrip, TravelPreferences, TravelStyle, Trip, TripListing, TripStatus, Visibility,
};
use crate::{DB_FILE_NAME, SCHEMA_VERSION, now_ms};

const TRIP_COLUMNS: &str = "id, user_id, destination, title, start_date, end_date, traveler_count, budget_total, \
     currency, status, visibility, share_token, generation_status, generation_error, generation_updated_at, \
     created_at, updated_at";

const PROFILE_COLUMNS: &str =
    "id, display_name, avatar_url, travel_style, preferences, onboarded, created_at, updated_at";

const ITINERARY_COLUMNS: &str = "id, trip_id, version, generated_at, ai_model, prompt_hash, days_json, is_active";

/// Persistent store for trips, profiles and itinerary versions
#[derive(Debug)]
pub struct Store {
    db_path: PathBuf,
    conn: Connection,
}

impl Store {
    /// Open (or create) the store under `dir`, applying the schema if needed
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        debug!(dir = %dir.display(), "Store::open: called");
        std::fs::create_dir_all(dir)?;
        let db_path = dir.join(DB_FILE_NAME);
        let conn = Connection::open(&db_path)?;
        let store = Self { db_path, conn };
        store.migrate()?;
        info!(db_path = %store.db_path.display(), "Store opened");
        Ok(store)
    }

    /// Path of the SQLite database file
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn migrate(&self) -> Result<(), StoreError> {
        debug!("Store::migrate: called");
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA foreign_keys=ON;

            CREATE TABLE IF NOT EXISTS meta (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS trips (
              id TEXT PRIMARY KEY,
              user_id TEXT NOT NULL,
              destination TEXT NOT NULL,
              title TEXT,
              start_date TEXT NOT NULL,
              end_date TEXT NOT NULL,
              traveler_count INTEGER NOT NULL CHECK (traveler_count >= 1),
              budget_total REAL,
              currency TEXT NOT NULL,
              status TEXT NOT NULL,
              visibility TEXT NOT NULL,
              share_token TEXT NOT NULL UNIQUE,
              generation_status TEXT NOT NULL DEFAULT 'none',
              generation_error TEXT,
              generation_updated_at INTEGER NOT NULL DEFAULT 0,
              created_at INTEGER NOT NULL,
              updated_at INTEGER NOT NULL,
              CHECK (end_date >= start_date)
            );

            CREATE TABLE IF NOT EXISTS profiles (
              id TEXT PRIMARY KEY,
              display_name TEXT,
              avatar_url TEXT,
              travel_style TEXT NOT NULL DEFAULT '{}',
              preferences TEXT NOT NULL DEFAULT '{}',
              onboarded INTEGER NOT NULL DEFAULT 0,
              created_at INTEGER NOT NULL,
              updated_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS itineraries (
              id TEXT PRIMARY KEY,
              trip_id TEXT NOT NULL REFERENCES trips(id),
              version INTEGER NOT NULL,
              generated_at INTEGER NOT NULL,
              ai_model TEXT,
              prompt_hash TEXT,
              days_json TEXT NOT NULL,
              is_active INTEGER NOT NULL DEFAULT 0,
              UNIQUE (trip_id, version)
            );

            CREATE INDEX IF NOT EXISTS idx_trips_user_created ON trips(user_id, created_at);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_itineraries_one_active
              ON itineraries(trip_id) WHERE is_active = 1;
            "#,
        )?;
        self.conn.execute(
            "INSERT OR IGNORE INTO meta(key, value) VALUES (?1, ?2)",
            params!["schema_version", SCHEMA_VERSION],
        )?;
        Ok(())
    }

    // === Trips ===

    /// Insert a new trip in `draft` status with a fresh share token
    pub fn create_trip(&mut self, new: NewTrip) -> Result<Trip, StoreError> {
        debug!(user_id = %new.user_id, destination = %new.destination, "Store::create_trip: called");
        let now = now_ms();
        let trip = Trip {
            id: uuid::Uuid::now_v7().to_string(),
            user_id: new.user_id,
            destination: new.destination,
            title: new.title,
            start_date: new.start_date,
            end_date: new.end_date,
            traveler_count: new.traveler_count,
            budget_total: new.budget_total,
            currency: new.currency,
            status: TripStatus::Draft,
            visibility: new.visibility,
            share_token: uuid::Uuid::new_v4().to_string(),
            generation: GenerationState::default(),
            created_at: now,
            updated_at: now,
        };

        self.conn.execute(
            &format!(
                "INSERT INTO trips({TRIP_COLUMNS}) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17)"
            ),
            params![
                trip.id,
                trip.user_id,
                trip.destination,
                trip.title,
                trip.start_date.to_string(),
                trip.end_date.to_string(),
                trip.traveler_count,
                trip.budget_total,
                trip.currency,
                trip.status.as_str(),
                trip.visibility.as_str(),
                trip.share_token,
                trip.generation.status.as_str(),
                trip.generation.error.map(|e| e.as_str()),
                trip.generation.updated_at,
                trip.created_at,
                trip.updated_at,
            ],
        )?;
        debug!(trip_id = %trip.id, "Store::create_trip: inserted");
        Ok(trip)
    }

    /// Fetch a trip by id regardless of owner
    pub fn trip(&self, id: &str) -> Result<Option<Trip>, StoreError> {
        debug!(%id, "Store::trip: called");
        let trip = self
            .conn
            .query_row(
                &format!("SELECT {TRIP_COLUMNS} FROM trips WHERE id = ?1"),
                params![id],
                trip_from_row,
            )
            .optional()?;
        Ok(trip)
    }

    /// Fetch a trip only if it belongs to `user_id`
    pub fn trip_for_owner(&self, id: &str, user_id: &str) -> Result<Option<Trip>, StoreError> {
        debug!(%id, %user_id, "Store::trip_for_owner: called");
        let trip = self
            .conn
            .query_row(
                &format!("SELECT {TRIP_COLUMNS} FROM trips WHERE id = ?1 AND user_id = ?2"),
                params![id, user_id],
                trip_from_row,
            )
            .optional()?;
        Ok(trip)
    }

    /// List a user's trips, newest first, flagging which have an active itinerary
    pub fn list_trips(&self, user_id: &str, include_archived: bool) -> Result<Vec<TripListing>, StoreError> {
        debug!(%user_id, include_archived, "Store::list_trips: called");
        let archived_clause = if include_archived {
            ""
        } else {
            "AND status != 'archived'"
        };
        let sql = format!(
            "SELECT {TRIP_COLUMNS}, \
               EXISTS(SELECT 1 FROM itineraries i WHERE i.trip_id = trips.id AND i.is_active = 1) \
             FROM trips WHERE user_id = ?1 {archived_clause} \
             ORDER BY created_at DESC, rowid DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(TripListing {
                trip: trip_from_row(row)?,
                has_active_itinerary: row.get(17)?,
            })
        })?;
        let listings = rows.collect::<Result<Vec<_>, _>>()?;
        debug!(count = listings.len(), "Store::list_trips: loaded");
        Ok(listings)
    }

    /// Change status and/or visibility of an owned trip; `None` if not found or not owned
    pub fn update_trip_settings(
        &mut self,
        id: &str,
        user_id: &str,
        status: Option<TripStatus>,
        visibility: Option<Visibility>,
    ) -> Result<Option<Trip>, StoreError> {
        debug!(%id, %user_id, ?status, ?visibility, "Store::update_trip_settings: called");
        let tx = self.conn.transaction()?;
        let changed = tx.execute(
            r#"
            UPDATE trips
            SET status = COALESCE(?3, status),
                visibility = COALESCE(?4, visibility),
                updated_at = ?5
            WHERE id = ?1 AND user_id = ?2
            "#,
            params![
                id,
                user_id,
                status.map(|s| s.as_str()),
                visibility.map(|v| v.as_str()),
                now_ms()
            ],
        )?;
        if changed == 0 {
            debug!(%id, "Store::update_trip_settings: no owned trip matched");
            return Ok(None);
        }
        let trip = tx.query_row(
            &format!("SELECT {TRIP_COLUMNS} FROM trips WHERE id = ?1"),
            params![id],
            trip_from_row,
        )?;
        tx.commit()?;
        Ok(Some(trip))
    }

    /// Record a generation state transition on a trip
    pub fn set_generation_state(
        &mut self,
        trip_id: &str,
        status: GenerationStatus,
        error: Option<GenerationFailure>,
    ) -> Result<GenerationState, StoreError> {
        debug!(%trip_id, ?status, ?error, "Store::set_generation_state: called");
        let now = now_ms();
        let changed = self.conn.execute(
            r#"
            UPDATE trips
            SET generation_status = ?2, generation_error = ?3, generation_updated_at = ?4
            WHERE id = ?1
            "#,
            params![trip_id, status.as_str(), error.map(|e| e.as_str()), now],
        )?;
        if changed == 0 {
            return Err(StoreError::UnknownId(trip_id.to_string()));
        }
        Ok(GenerationState {
            status,
            error,
            updated_at: now,
        })
    }

    // === Profiles ===

    /// Create the profile row if missing. An existing row is returned untouched.
    pub fn ensure_profile(&mut self, seed: ProfileSeed) -> Result<Profile, StoreError> {
        debug!(user_id = %seed.id, "Store::ensure_profile: called");
        let now = now_ms();
        let inserted = self.conn.execute(
            r#"
            INSERT INTO profiles(id, display_name, avatar_url, travel_style, preferences, onboarded, created_at, updated_at)
            VALUES (?1, ?2, ?3, '{}', '{}', 0, ?4, ?4)
            ON CONFLICT(id) DO NOTHING
            "#,
            params![seed.id, seed.display_name, seed.avatar_url, now],
        )?;
        debug!(user_id = %seed.id, inserted, "Store::ensure_profile: upserted");
        self.profile(&seed.id)?.ok_or(StoreError::UnknownId(seed.id))
    }

    pub fn profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        debug!(%user_id, "Store::profile: called");
        let profile = self
            .conn
            .query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1"),
                params![user_id],
                profile_from_row,
            )
            .optional()?;
        Ok(profile)
    }

    /// Set onboarding answers and flip `onboarded`. Update only, never inserts.
    pub fn complete_onboarding(
        &mut self,
        user_id: &str,
        travel_style: &TravelStyle,
        preferences: &TravelPreferences,
    ) -> Result<Option<Profile>, StoreError> {
        debug!(%user_id, "Store::complete_onboarding: called");
        let changed = self.conn.execute(
            r#"
            UPDATE profiles
            SET travel_style = ?2, preferences = ?3, onboarded = 1, updated_at = ?4
            WHERE id = ?1
            "#,
            params![
                user_id,
                serde_json::to_string(travel_style)?,
                serde_json::to_string(preferences)?,
                now_ms()
            ],
        )?;
        if changed == 0 {
            debug!(%user_id, "Store::complete_onboarding: no profile row");
            return Ok(None);
        }
        self.profile(user_id)
    }

    // === Itineraries ===

    /// Deactivate every version of the trip and insert `new` as the active one, atomically.
    ///
    /// The version number is `max(version) + 1`. Before committing, the active
    /// count is re-read and must be exactly one; otherwise the transaction is
    /// rolled back and the previous active version stays in place.
    pub fn replace_active_itinerary(&mut self, new: NewItinerary) -> Result<Itinerary, StoreError> {
        debug!(trip_id = %new.trip_id, days = new.days.len(), "Store::replace_active_itinerary: called");
        let tx = self.conn.transaction()?;

        let trip_exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM trips WHERE id = ?1)",
            params![new.trip_id],
            |row| row.get(0),
        )?;
        if !trip_exists {
            return Err(StoreError::UnknownId(new.trip_id));
        }

        let version: u32 = tx.query_row(
            "SELECT COALESCE(MAX(version), 0) + 1 FROM itineraries WHERE trip_id = ?1",
            params![new.trip_id],
            |row| row.get(0),
        )?;

        let deactivated = tx.execute(
            "UPDATE itineraries SET is_active = 0 WHERE trip_id = ?1 AND is_active = 1",
            params![new.trip_id],
        )?;
        debug!(trip_id = %new.trip_id, deactivated, version, "Store::replace_active_itinerary: deactivated");

        let itinerary = Itinerary {
            id: uuid::Uuid::now_v7().to_string(),
            trip_id: new.trip_id,
            version,
            generated_at: now_ms(),
            ai_model: new.ai_model,
            prompt_hash: new.prompt_hash,
            days: new.days,
            is_active: true,
        };
        tx.execute(
            &format!("INSERT INTO itineraries({ITINERARY_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)"),
            params![
                itinerary.id,
                itinerary.trip_id,
                itinerary.version,
                itinerary.generated_at,
                itinerary.ai_model,
                itinerary.prompt_hash,
                serde_json::to_string(&itinerary.days)?,
            ],
        )?;

        let active = count_active_tx(&tx, &itinerary.trip_id)?;
        if active != 1 {
            return Err(StoreError::ActiveInvariant {
                trip_id: itinerary.trip_id,
                active,
            });
        }

        tx.commit()?;
        info!(trip_id = %itinerary.trip_id, version = itinerary.version, "Activated itinerary version");
        Ok(itinerary)
    }

    pub fn active_itinerary(&self, trip_id: &str) -> Result<Option<Itinerary>, StoreError> {
        debug!(%trip_id, "Store::active_itinerary: called");
        let itinerary = self
            .conn
            .query_row(
                &format!("SELECT {ITINERARY_COLUMNS} FROM itineraries WHERE trip_id = ?1 AND is_active = 1"),
                params![trip_id],
                itinerary_from_row,
            )
            .optional()?;
        Ok(itinerary)
    }

    /// Every version of a trip's itinerary, newest first
    pub fn list_itineraries(&self, trip_id: &str) -> Result<Vec<Itinerary>, StoreError> {
        debug!(%trip_id, "Store::list_itineraries: called");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ITINERARY_COLUMNS} FROM itineraries WHERE trip_id = ?1 ORDER BY version DESC"
        ))?;
        let rows = stmt.query_map(params![trip_id], itinerary_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // === Sharing ===

    /// Resolve a share token to its public projection.
    ///
    /// Only non-private, non-archived trips are shareable. Any other trip
    /// yields `None`, exactly like an unknown token.
    pub fn shared_trip(&self, share_token: &str) -> Result<Option<SharedTrip>, StoreError> {
        debug!("Store::shared_trip: called");
        let trip = self
            .conn
            .query_row(
                &format!(
                    "SELECT {TRIP_COLUMNS} FROM trips \
                     WHERE share_token = ?1 AND visibility != 'private' AND status != 'archived'"
                ),
                params![share_token],
                trip_from_row,
            )
            .optional()?;

        let Some(trip) = trip else {
            debug!("Store::shared_trip: no shareable trip");
            return Ok(None);
        };

        let itinerary = self.active_itinerary(&trip.id)?;
        Ok(Some(SharedTrip {
            trip_id: trip.id,
            destination: trip.destination,
            title: trip.title,
            start_date: trip.start_date,
            end_date: trip.end_date,
            traveler_count: trip.traveler_count,
            budget_total: trip.budget_total,
            currency: trip.currency,
            itinerary,
        }))
    }
}

fn count_active_tx(tx: &Transaction<'_>, trip_id: &str) -> Result<i64, StoreError> {
    let active = tx.query_row(
        "SELECT COUNT(*) FROM itineraries WHERE trip_id = ?1 AND is_active = 1",
        params![trip_id],
        |row| row.get(0),
    )?;
    Ok(active)
}

fn conversion_error(idx: usize, err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn parsed_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|e| conversion_error(idx, e))
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn trip_from_row(row: &Row<'_>) -> rusqlite::Result<Trip> {
    let generation_error = match row.get::<_, Option<String>>(13)? {
        Some(raw) => Some(raw.parse::<GenerationFailure>().map_err(|e| conversion_error(13, e))?),
        None => None,
    };
    Ok(Trip {
        id: row.get(0)?,
        user_id: row.get(1)?,
        destination: row.get(2)?,
        title: row.get(3)?,
        start_date: parsed_column(row, 4)?,
        end_date: parsed_column(row, 5)?,
        traveler_count: row.get(6)?,
        budget_total: row.get(7)?,
        currency: row.get(8)?,
        status: parsed_column(row, 9)?,
        visibility: parsed_column(row, 10)?,
        share_token: row.get(11)?,
        generation: GenerationState {
            status: parsed_column(row, 12)?,
            error: generation_error,
            updated_at: row.get(14)?,
        },
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: row.get(0)?,
        display_name: row.get(1)?,
        avatar_url: row.get(2)?,
        travel_style: json_column(row, 3)?,
        preferences: json_column(row, 4)?,
        onboarded: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn itinerary_from_row(row: &Row<'_>) -> rusqlite::Result<Itinerary> {
    Ok(Itinerary {
        id: row.get(0)?,
        trip_id: row.get(1)?,
        version: row.get(2)?,
        generated_at: row.get(3)?,
        ai_model: row.get(4)?,
        prompt_hash: row.get(5)?,
        days: json_column(row, 6)?,
        is_active: row.get(7)?,
    })
}
