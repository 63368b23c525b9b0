//! Animal database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{
    decode_date, decode_opt_ts, decode_ts, encode_date, encode_opt_ts, encode_ts, Database,
    DbError, DbResult,
};
use crate::models::{Animal, AnimalStatus};

const ANIMAL_COLUMNS: &str = "a.id, a.farm_id, a.tag_id, a.species, a.breed, a.name, a.gender, a.birth_date, a.status, a.withdrawal_until_milk, a.withdrawal_until_meat, a.created_at, a.updated_at";

impl Database {
    /// Insert a new animal. Fails on a duplicate tag within the farm.
    pub fn insert_animal(&self, animal: &Animal) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO animals (
                id, farm_id, tag_id, species, breed, name, gender, birth_date,
                status, withdrawal_until_milk, withdrawal_until_meat, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                animal.id,
                animal.farm_id,
                animal.tag_id,
                animal.species,
                animal.breed,
                animal.name,
                animal.gender,
                animal.birth_date.as_ref().map(encode_date),
                animal.status.as_str(),
                encode_opt_ts(&animal.withdrawal_until_milk),
                encode_opt_ts(&animal.withdrawal_until_meat),
                encode_ts(&animal.created_at),
                encode_ts(&animal.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_animal(&self, id: &str) -> DbResult<Option<Animal>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM animals a WHERE a.id = ?", ANIMAL_COLUMNS),
                [id],
                AnimalRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Animals on a farm ordered by tag.
    pub fn list_animals_for_farm(&self, farm_id: &str) -> DbResult<Vec<Animal>> {
        self.query_animals(
            &format!(
                "SELECT {} FROM animals a WHERE a.farm_id = ? ORDER BY a.tag_id",
                ANIMAL_COLUMNS
            ),
            [farm_id],
        )
    }

    /// Animals across every farm owned by `owner_id`.
    pub fn list_animals_for_owner(&self, owner_id: &str) -> DbResult<Vec<Animal>> {
        self.query_animals(
            &format!(
                r#"
                SELECT {} FROM animals a
                JOIN farms f ON f.id = a.farm_id
                WHERE f.owner_id = ?
                ORDER BY f.farm_name, a.tag_id
                "#,
                ANIMAL_COLUMNS
            ),
            [owner_id],
        )
    }

    pub fn list_all_animals(&self) -> DbResult<Vec<Animal>> {
        self.query_animals(
            &format!(
                "SELECT {} FROM animals a ORDER BY a.farm_id, a.tag_id",
                ANIMAL_COLUMNS
            ),
            [],
        )
    }

    /// Animals with the given persisted status.
    pub fn list_animals_by_status(&self, status: AnimalStatus) -> DbResult<Vec<Animal>> {
        self.query_animals(
            &format!(
                "SELECT {} FROM animals a WHERE a.status = ? ORDER BY a.farm_id, a.tag_id",
                ANIMAL_COLUMNS
            ),
            [status.as_str()],
        )
    }

    /// Overwrite an animal's withdrawal windows and status.
    pub fn update_withdrawal(&self, animal: &Animal) -> DbResult<()> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE animals
            SET status = ?2, withdrawal_until_milk = ?3, withdrawal_until_meat = ?4, updated_at = ?5
            WHERE id = ?1
            "#,
            params![
                animal.id,
                animal.status.as_str(),
                encode_opt_ts(&animal.withdrawal_until_milk),
                encode_opt_ts(&animal.withdrawal_until_meat),
                encode_ts(&animal.updated_at),
            ],
        )?;

        if rows_affected == 0 {
            return Err(DbError::NotFound(animal.id.clone()));
        }
        Ok(())
    }

    fn query_animals<P: rusqlite::Params>(&self, sql: &str, params: P) -> DbResult<Vec<Animal>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, AnimalRow::from_row)?;

        let mut animals = Vec::new();
        for row in rows {
            animals.push(row?.try_into()?);
        }
        Ok(animals)
    }
}

/// Intermediate row struct for database mapping.
struct AnimalRow {
    id: String,
    farm_id: String,
    tag_id: String,
    species: String,
    breed: Option<String>,
    name: Option<String>,
    gender: Option<String>,
    birth_date: Option<String>,
    status: String,
    withdrawal_until_milk: Option<String>,
    withdrawal_until_meat: Option<String>,
    created_at: String,
    updated_at: String,
}

impl AnimalRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            farm_id: row.get(1)?,
            tag_id: row.get(2)?,
            species: row.get(3)?,
            breed: row.get(4)?,
            name: row.get(5)?,
            gender: row.get(6)?,
            birth_date: row.get(7)?,
            status: row.get(8)?,
            withdrawal_until_milk: row.get(9)?,
            withdrawal_until_meat: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }
}

impl TryFrom<AnimalRow> for Animal {
    type Error = DbError;

    fn try_from(row: AnimalRow) -> Result<Self, Self::Error> {
        let status = AnimalStatus::parse(&row.status)
            .ok_or_else(|| DbError::Constraint(format!("Unknown animal status: {}", row.status)))?;

        Ok(Animal {
            id: row.id,
            farm_id: row.farm_id,
            tag_id: row.tag_id,
            species: row.species,
            breed: row.breed,
            name: row.name,
            gender: row.gender,
            birth_date: row.birth_date.as_deref().map(decode_date).transpose()?,
            status,
            withdrawal_until_milk: decode_opt_ts(row.withdrawal_until_milk)?,
            withdrawal_until_meat: decode_opt_ts(row.withdrawal_until_meat)?,
            created_at: decode_ts(&row.created_at)?,
            updated_at: decode_ts(&row.updated_at)?,
        })
    }
}
