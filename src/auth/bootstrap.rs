use anyhow::{bail, Context};
use sqlx::SqlitePool;
use tracing::info;

use super::{
    password::PasswordService,
    repo_types::{NewUser, User},
};
use crate::{
    config::AdminBootstrap,
    validation::{is_valid_email, normalize_email, validate_password},
};

/// Makes sure the service has an administrator.
///
/// Does nothing when any admin already exists. Otherwise the configured
/// account is promoted if it is registered, or created as an admin.
pub async fn ensure_admin(
    db: &SqlitePool,
    passwords: &PasswordService,
    admin: &AdminBootstrap,
) -> anyhow::Result<()> {
    if User::any_admin(db).await.context("check for existing admin")? {
        info!("admin account already present");
        return Ok(());
    }

    let email = normalize_email(&admin.email);
    if !is_valid_email(&email) {
        bail!("ADMIN_EMAIL is not a valid email address");
    }

    if let Some(user) = User::find_by_email(db, &email).await? {
        User::promote(db, user.id).await.context("promote admin")?;
        info!(user_id = user.id, email = %email, "existing user promoted to admin");
        return Ok(());
    }

    validate_password(&admin.password).context("ADMIN_PASSWORD rejected")?;
    let hash = passwords.hash(&admin.password)?;
    let user = User::create(
        db,
        &NewUser {
            email: &email,
            password_hash: &hash,
            first_name: "Admin",
            last_name: "",
            is_admin: true,
        },
    )
    .await
    .context("create admin")?;
    info!(user_id = user.id, email = %email, "admin account created");
    Ok(())
}
