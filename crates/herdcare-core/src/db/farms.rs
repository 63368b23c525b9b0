//! Profile, farm and reward-balance database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{decode_ts, encode_ts, Database, DbError, DbResult};
use crate::models::{Farm, Profile, Role};

const PROFILE_COLUMNS: &str = "id, full_name, email, role, phone, reward_points, is_vet_verified, vet_license_id, created_at";

impl Database {
    // =========================================================================
    // Profiles
    // =========================================================================

    pub fn insert_profile(&self, profile: &Profile) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO profiles (
                id, full_name, email, role, phone, reward_points,
                is_vet_verified, vet_license_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                profile.id,
                profile.full_name,
                profile.email,
                profile.role.as_str(),
                profile.phone,
                profile.reward_points,
                profile.is_vet_verified,
                profile.vet_license_id,
                encode_ts(&profile.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_profile(&self, id: &str) -> DbResult<Option<Profile>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM profiles WHERE id = ?", PROFILE_COLUMNS),
                [id],
                ProfileRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// All profiles, newest first.
    pub fn list_profiles(&self) -> DbResult<Vec<Profile>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM profiles ORDER BY created_at DESC",
            PROFILE_COLUMNS
        ))?;
        let rows = stmt.query_map([], ProfileRow::from_row)?;

        let mut profiles = Vec::new();
        for row in rows {
            profiles.push(row?.try_into()?);
        }
        Ok(profiles)
    }

    /// Profile counts per role.
    pub fn count_profiles_by_role(&self) -> DbResult<Vec<(Role, u32)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT role, COUNT(*) FROM profiles GROUP BY role ORDER BY role")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?)))?;

        let mut counts = Vec::new();
        for row in rows {
            let (role, count) = row?;
            let role = Role::parse(&role)
                .ok_or_else(|| DbError::Constraint(format!("Unknown role: {}", role)))?;
            counts.push((role, count));
        }
        Ok(counts)
    }

    /// Mark a veterinarian's license as verified (or revoke it).
    pub fn set_vet_verified(&self, profile_id: &str, verified: bool) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE profiles SET is_vet_verified = ?2 WHERE id = ?1 AND role = 'veterinarian'",
            params![profile_id, verified],
        )?;
        Ok(rows_affected > 0)
    }

    /// Add `points` to a user's reward balance and return the new balance.
    pub fn increment_reward_points(&self, user_id: &str, points: u32) -> DbResult<i64> {
        self.conn
            .query_row(
                "UPDATE profiles SET reward_points = reward_points + ?2 WHERE id = ?1 RETURNING reward_points",
                params![user_id, points],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| DbError::NotFound(format!("profile {}", user_id)))
    }

    // =========================================================================
    // Farms
    // =========================================================================

    pub fn insert_farm(&self, farm: &Farm) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO farms (id, owner_id, farm_name, address, registration_number, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                farm.id,
                farm.owner_id,
                farm.farm_name,
                farm.address,
                farm.registration_number,
                encode_ts(&farm.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_farm(&self, id: &str) -> DbResult<Option<Farm>> {
        self.conn
            .query_row(
                r#"
                SELECT id, owner_id, farm_name, address, registration_number, created_at
                FROM farms WHERE id = ?
                "#,
                [id],
                FarmRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Farms owned by a farmer.
    pub fn list_farms_for_owner(&self, owner_id: &str) -> DbResult<Vec<Farm>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, owner_id, farm_name, address, registration_number, created_at
            FROM farms WHERE owner_id = ?
            ORDER BY farm_name
            "#,
        )?;
        let rows = stmt.query_map([owner_id], FarmRow::from_row)?;

        let mut farms = Vec::new();
        for row in rows {
            farms.push(row?.try_into()?);
        }
        Ok(farms)
    }
}

/// Intermediate row struct for database mapping.
struct ProfileRow {
    id: String,
    full_name: String,
    email: String,
    role: String,
    phone: Option<String>,
    reward_points: i64,
    is_vet_verified: bool,
    vet_license_id: Option<String>,
    created_at: String,
}

impl ProfileRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            full_name: row.get(1)?,
            email: row.get(2)?,
            role: row.get(3)?,
            phone: row.get(4)?,
            reward_points: row.get(5)?,
            is_vet_verified: row.get(6)?,
            vet_license_id: row.get(7)?,
            created_at: row.get(8)?,
        })
    }
}

impl TryFrom<ProfileRow> for Profile {
    type Error = DbError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let role = Role::parse(&row.role)
            .ok_or_else(|| DbError::Constraint(format!("Unknown role: {}", row.role)))?;
        Ok(Profile {
            id: row.id,
            full_name: row.full_name,
            email: row.email,
            role,
            phone: row.phone,
            reward_points: row.reward_points,
            is_vet_verified: row.is_vet_verified,
            vet_license_id: row.vet_license_id,
            created_at: decode_ts(&row.created_at)?,
        })
    }
}

struct FarmRow {
    id: String,
    owner_id: String,
    farm_name: String,
    address: String,
    registration_number: Option<String>,
    created_at: String,
}

impl FarmRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            farm_name: row.get(2)?,
            address: row.get(3)?,
            registration_number: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

impl TryFrom<FarmRow> for Farm {
    type Error = DbError;

    fn try_from(row: FarmRow) -> Result<Self, Self::Error> {
        Ok(Farm {
            id: row.id,
            owner_id: row.owner_id,
            farm_name: row.farm_name,
            address: row.address,
            registration_number: row.registration_number,
            created_at: decode_ts(&row.created_at)?,
        })
    }
}
