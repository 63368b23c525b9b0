//! Animal and medication registration.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::Database;
use crate::error::{CoreError, CoreResult};
use crate::models::{Animal, CallerContext, Farm, Medication, Role};

/// Form input for registering an animal.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewAnimal {
    pub farm_id: String,
    pub tag_id: String,
    pub species: String,
    pub breed: Option<String>,
    pub name: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
}

/// Register an animal on a farm owned by the caller (or any farm, for admins).
pub fn register_animal(
    db: &Database,
    ctx: &CallerContext,
    input: NewAnimal,
    now: DateTime<Utc>,
) -> CoreResult<Animal> {
    let tag_id = input.tag_id.trim();
    let species = input.species.trim();
    if tag_id.is_empty() || species.is_empty() {
        return Err(CoreError::Validation("tag and species are required".into()));
    }

    let farm = db
        .get_farm(&input.farm_id)?
        .ok_or_else(|| CoreError::not_found("farm", input.farm_id.as_str()))?;
    if farm.owner_id != ctx.user_id && !ctx.is_admin() {
        return Err(CoreError::Forbidden(format!(
            "{} may not register animals on farm {}",
            ctx.role.as_str(),
            farm.id
        )));
    }

    if let Some(birth_date) = input.birth_date {
        if birth_date > now.date_naive() {
            return Err(CoreError::Validation(format!(
                "birth date {} is in the future",
                birth_date
            )));
        }
    }

    let mut animal = Animal::new(farm.id, tag_id.to_string(), species.to_string());
    animal.breed = trimmed(input.breed);
    animal.name = trimmed(input.name);
    animal.gender = trimmed(input.gender);
    animal.birth_date = input.birth_date;
    animal.created_at = now;
    animal.updated_at = now;

    if db
        .list_animals_for_farm(&animal.farm_id)?
        .iter()
        .any(|a| a.tag_id == animal.tag_id)
    {
        return Err(CoreError::Validation(format!(
            "tag {} is already registered on this farm",
            animal.tag_id
        )));
    }

    db.insert_animal(&animal)?;
    info!(animal_id = %animal.id, farm_id = %animal.farm_id, "Animal registered");
    Ok(animal)
}

/// Add or update a medication in the registry. Admins and veterinarians only.
pub fn register_medication(
    db: &Database,
    ctx: &CallerContext,
    medication: Medication,
) -> CoreResult<Medication> {
    ctx.require_any(&[Role::Admin, Role::Veterinarian], "edit the medication registry")?;

    if medication.name.trim().is_empty() || medication.active_ingredient.trim().is_empty() {
        return Err(CoreError::Validation(
            "medication name and active ingredient are required".into(),
        ));
    }
    medication
        .validate_withdrawal()
        .map_err(CoreError::Validation)?;

    db.upsert_medication(&medication)?;
    info!(medication_id = %medication.id, name = %medication.name, "Medication registered");
    Ok(medication)
}

/// The farm, if the caller may view it: its owner, veterinarians and admins.
///
/// Only veterinarians and admins can tell a missing farm from someone
/// else's; everyone else gets `Forbidden` for both.
pub fn visible_farm(db: &Database, ctx: &CallerContext, farm_id: &str) -> CoreResult<Farm> {
    let forbidden = || {
        CoreError::Forbidden(format!("{} may not view farm {}", ctx.role.as_str(), farm_id))
    };
    if !matches!(ctx.role, Role::Admin | Role::Veterinarian | Role::Farmer) {
        return Err(forbidden());
    }

    match db.get_farm(farm_id)? {
        Some(farm) if sees_every_farm(ctx) || farm.owner_id == ctx.user_id => Ok(farm),
        None if sees_every_farm(ctx) => Err(CoreError::not_found("farm", farm_id)),
        _ => Err(forbidden()),
    }
}

/// An animal, under the same rules as its farm.
///
/// `Ok(None)` only for veterinarians and admins; a farmer asking for a
/// missing animal gets `Forbidden`.
pub fn get_animal(
    db: &Database,
    ctx: &CallerContext,
    animal_id: &str,
) -> CoreResult<Option<Animal>> {
    if sees_every_farm(ctx) {
        return Ok(db.get_animal(animal_id)?);
    }

    let forbidden = || {
        CoreError::Forbidden(format!(
            "{} may not view animal {}",
            ctx.role.as_str(),
            animal_id
        ))
    };
    let Some(animal) = db.get_animal(animal_id)? else {
        return Err(forbidden());
    };
    match visible_farm(db, ctx, &animal.farm_id) {
        Ok(_) => Ok(Some(animal)),
        Err(CoreError::Forbidden(_)) => Err(forbidden()),
        Err(other) => Err(other),
    }
}

/// Like [`get_animal`], with a missing animal reported as `NotFound`.
pub fn visible_animal(
    db: &Database,
    ctx: &CallerContext,
    animal_id: &str,
) -> CoreResult<Animal> {
    get_animal(db, ctx, animal_id)?.ok_or_else(|| CoreError::not_found("animal", animal_id))
}

/// Animals on a farm the caller may view, by tag.
pub fn list_farm_animals(
    db: &Database,
    ctx: &CallerContext,
    farm_id: &str,
) -> CoreResult<Vec<Animal>> {
    let farm = visible_farm(db, ctx, farm_id)?;
    Ok(db.list_animals_for_farm(&farm.id)?)
}

fn sees_every_farm(ctx: &CallerContext) -> bool {
    matches!(ctx.role, Role::Admin | Role::Veterinarian)
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
