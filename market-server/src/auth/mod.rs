//! Authentication and authorization
//!
//! Identity is established upstream; this module decodes the bearer token
//! into a [`CurrentUser`] and the handlers enforce ownership and role rules.

pub mod extractor;
pub mod jwt;

pub use jwt::{Claims, JwtConfig, JwtError, JwtService};

use shared::error::{AppError, AppResult};
use shared::models::Role;

/// Authenticated principal attached to each request
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub name: String,
    pub role: Role,
}

impl CurrentUser {
    /// Require the admin role
    pub fn require_admin(&self) -> AppResult<()> {
        if self.role.is_admin() {
            Ok(())
        } else {
            Err(AppError::forbidden("Admin role required"))
        }
    }

    /// Require a specific role (admins always pass)
    pub fn require_role(&self, role: Role) -> AppResult<()> {
        if self.role == role || self.role.is_admin() {
            Ok(())
        } else {
            Err(AppError::forbidden(format!("{} role required", role)))
        }
    }
}

impl TryFrom<Claims> for CurrentUser {
    type Error = AppError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let role = claims
            .role
            .parse::<Role>()
            .map_err(|e| AppError::forbidden(e.to_string()))?;
        Ok(Self {
            id: claims.sub,
            name: claims.name,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: &str) -> Claims {
        Claims {
            sub: "user-1".to_string(),
            name: "Sam".to_string(),
            role: role.to_string(),
            exp: 2_000_000_000,
            iat: 1_700_000_000,
            iss: "market-server".to_string(),
            aud: "market-clients".to_string(),
        }
    }

    #[test]
    fn test_current_user_from_claims() {
        let user = CurrentUser::try_from(claims("driver")).unwrap();
        assert_eq!(user.role, Role::Driver);
        assert_eq!(user.id, "user-1");
    }

    #[test]
    fn test_unknown_role_is_forbidden() {
        let err = CurrentUser::try_from(claims("superuser")).unwrap_err();
        assert_eq!(err.code, shared::error::ErrorCode::PermissionDenied);
    }

    #[test]
    fn test_role_guards() {
        let buyer = CurrentUser::try_from(claims("buyer")).unwrap();
        assert!(buyer.require_role(Role::Buyer).is_ok());
        assert!(buyer.require_role(Role::Driver).is_err());
        assert!(buyer.require_admin().is_err());

        let admin = CurrentUser::try_from(claims("admin")).unwrap();
        assert!(admin.require_admin().is_ok());
        // Admins pass any role requirement
        assert!(admin.require_role(Role::Driver).is_ok());
    }
}
