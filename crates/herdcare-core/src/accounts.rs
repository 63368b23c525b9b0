//! User directory: profile lookup and veterinarian verification.

use tracing::info;

use crate::db::Database;
use crate::error::{CoreError, CoreResult};
use crate::models::{CallerContext, Profile, Role};

/// A profile, visible to its owner and to admins.
pub fn get_profile(
    db: &Database,
    ctx: &CallerContext,
    user_id: &str,
) -> CoreResult<Option<Profile>> {
    if ctx.user_id != user_id && !ctx.is_admin() {
        return Err(CoreError::Forbidden(format!(
            "{} may not view another user's profile",
            ctx.role.as_str()
        )));
    }
    Ok(db.get_profile(user_id)?)
}

/// Every profile, newest first. Admins only.
pub fn list_users(db: &Database, ctx: &CallerContext) -> CoreResult<Vec<Profile>> {
    ctx.require_any(&[Role::Admin], "list users")?;
    Ok(db.list_profiles()?)
}

/// Grant or revoke a veterinarian's verified badge. Admins only.
pub fn verify_veterinarian(
    db: &Database,
    ctx: &CallerContext,
    user_id: &str,
    verified: bool,
) -> CoreResult<Profile> {
    ctx.require_any(&[Role::Admin], "verify veterinarians")?;

    let mut profile = db
        .get_profile(user_id)?
        .ok_or_else(|| CoreError::not_found("profile", user_id))?;
    if profile.role != Role::Veterinarian || !db.set_vet_verified(user_id, verified)? {
        return Err(CoreError::Validation(format!(
            "{} is a {}, not a veterinarian",
            user_id,
            profile.role.as_str()
        )));
    }

    info!(user_id, verified, admin_id = %ctx.user_id, "Veterinarian verification changed");
    profile.is_vet_verified = verified;
    Ok(profile)
}
