//! Mapping rules between domain values and wire shapes.
//!
//! Structural pairs (request bodies to commands, principal to its
//! projection) go through [`Mapper::map_strict`]. Pairs that need more than a
//! field copy have an explicit rule here.

use chrono::Duration;
use tollgate_core::mapper::{Mapper, MappingError};
use tollgate_core::models::user::User;

use crate::models::{CreateUserResponse, TokenResponse};

/// `token_type` of every issued token.
pub const BEARER: &str = "Bearer";

/// Build the mapper used by the API. `access_ttl` is reported as `expires_in`.
pub fn api_mapper(access_ttl: Duration) -> Mapper {
    let expires_in = access_ttl.num_seconds();

    Mapper::builder()
        .rule(|user: &User, out: &mut CreateUserResponse| {
            out.id = user.id();
            out.name = user.name.clone();
            out.email = user.email.clone();
            out.created_at = user.created_at();
            Ok(())
        })
        .rule(move |user: &User, out: &mut TokenResponse| {
            out.access_token = user.access_token.clone().ok_or_else(|| {
                MappingError::rule::<User, TokenResponse>("user carries no access token")
            })?;
            out.token_type = BEARER.to_string();
            out.expires_in = expires_in;
            out.refresh_token = user.refresh_token.clone();
            out.scope = (!user.scopes.is_empty()).then(|| user.scopes.join(" "));
            Ok(())
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::models::PrincipalResponse;

    fn ana() -> User {
        User::new_local("Ana", "ana@x.com", "hash", Utc::now())
    }

    #[test]
    fn user_projection_has_no_secrets() {
        let mapper = api_mapper(Duration::minutes(15));
        let user = ana();
        let out: CreateUserResponse = mapper.map_into(&user).unwrap();
        assert_eq!(out.id, user.id());
        assert_eq!(out.email, "ana@x.com");

        let json = serde_json::to_value(&out).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn token_response_reports_ttl_and_scope() {
        let mapper = api_mapper(Duration::minutes(15));
        let mut user = ana();
        user.access_token = Some("access".into());
        user.refresh_token = Some("refresh".into());
        user.add_scope("read");
        user.add_scope("write");

        let out: TokenResponse = mapper.map_into(&user).unwrap();
        assert_eq!(out.token_type, "Bearer");
        assert_eq!(out.expires_in, 900);
        assert_eq!(out.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(out.scope.as_deref(), Some("read write"));
    }

    #[test]
    fn token_response_requires_access_token() {
        let mapper = api_mapper(Duration::minutes(15));
        let err = mapper.map_into::<_, TokenResponse>(&ana()).unwrap_err();
        assert!(matches!(err, MappingError::Rule { .. }));
    }

    #[test]
    fn principal_maps_structurally() {
        let mapper = api_mapper(Duration::minutes(15));
        let principal = ana().principal();
        let mut out = PrincipalResponse::default();
        mapper.map_strict(&principal, &mut out).unwrap();
        assert_eq!(out.id, principal.id);
        assert_eq!(out.roles, vec!["user"]);
    }
}
