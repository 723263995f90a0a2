//! Unit and account provisioning.
//!
//! The API trusts the identity header and never creates accounts, so this is
//! the only way to bootstrap them.

use sqlx::PgPool;

use bika_api::db::{IdentityRepository, RepositoryError};
use bika_api::models::NewAccount;
use bika_core::{Role, UnitId, UserId, UserType};

use super::CliError;

/// Arguments for `user create`.
#[derive(Debug)]
pub struct UserRequest<'a> {
    pub username: &'a str,
    pub email: Option<&'a str>,
    pub role: &'a str,
    pub user_type: &'a str,
    pub unit: Option<&'a str>,
    pub superuser: bool,
}

/// Create a unit.
///
/// # Errors
///
/// Returns `CliError::Exists` if the name or code is taken.
pub async fn create_unit(pool: &PgPool, name: &str, code: Option<&str>) -> Result<UnitId, CliError> {
    let id = match IdentityRepository::new(pool).insert_unit(name, code).await {
        Ok(id) => id,
        Err(RepositoryError::Conflict(_)) => return Err(CliError::Exists(name.to_owned())),
        Err(e) => return Err(e.into()),
    };
    tracing::info!("Unit created! ID: {}, Name: {}", id, name);
    Ok(id)
}

/// Build the account to insert, validating role, type and email.
fn new_account(request: &UserRequest<'_>, unit_id: Option<UnitId>) -> Result<NewAccount, CliError> {
    let role: Role = request.role.parse().map_err(|_| CliError::InvalidArgument {
        field: "role",
        value: request.role.to_owned(),
    })?;
    let user_type: UserType =
        request
            .user_type
            .parse()
            .map_err(|_| CliError::InvalidArgument {
                field: "user type",
                value: request.user_type.to_owned(),
            })?;
    if let Some(email) = request.email.filter(|e| !e.contains('@')) {
        return Err(CliError::InvalidArgument {
            field: "email",
            value: email.to_owned(),
        });
    }

    let mut account = NewAccount::new(request.username.trim())
        .role(role)
        .user_type(user_type);
    account.email = request.email.map(str::to_owned);
    account.unit_id = unit_id;
    if request.superuser {
        account = account.superuser();
    }
    Ok(account)
}

/// Create an account, optionally attached to a unit by name.
///
/// # Errors
///
/// Returns `CliError::InvalidArgument` for a bad role, type or email,
/// `CliError::UnknownUnit` for a missing unit and `CliError::Exists` for a
/// taken username.
pub async fn create_user(pool: &PgPool, request: &UserRequest<'_>) -> Result<UserId, CliError> {
    let repo = IdentityRepository::new(pool);

    let unit_id = match request.unit {
        Some(name) => Some(
            repo.unit_by_name(name)
                .await?
                .ok_or_else(|| CliError::UnknownUnit(name.to_owned()))?,
        ),
        None => None,
    };
    let account = new_account(request, unit_id)?;

    tracing::info!("Creating account: {} ({})", account.username, account.user_type);
    let id = match repo.insert_account(&account).await {
        Ok(id) => id,
        Err(RepositoryError::Conflict(_)) => {
            return Err(CliError::Exists(account.username));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(
        "Account created! ID: {}, Username: {}, Role: {}",
        id,
        account.username,
        account.role
    );
    Ok(id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request<'a>(role: &'a str, user_type: &'a str, email: Option<&'a str>) -> UserRequest<'a> {
        UserRequest {
            username: " kamana ",
            email,
            role,
            user_type,
            unit: None,
            superuser: false,
        }
    }

    #[test]
    fn test_new_account_parses_flags() {
        let account = new_account(
            &request("commander", "vendor", Some("k@example.rw")),
            Some(UnitId::new(3)),
        )
        .unwrap();
        assert_eq!(account.username, "kamana");
        assert_eq!(account.role, Role::Commander);
        assert_eq!(account.user_type, UserType::Vendor);
        assert_eq!(account.unit_id, Some(UnitId::new(3)));
        assert!(account.is_active);
        assert!(!account.is_superuser);
    }

    #[test]
    fn test_new_account_rejects_bad_values() {
        assert!(matches!(
            new_account(&request("owner", "customer", None), None),
            Err(CliError::InvalidArgument { field: "role", .. })
        ));
        assert!(matches!(
            new_account(&request("staff", "guest", None), None),
            Err(CliError::InvalidArgument { field: "user type", .. })
        ));
        assert!(matches!(
            new_account(&request("staff", "customer", Some("nope")), None),
            Err(CliError::InvalidArgument { field: "email", .. })
        ));
    }
}
