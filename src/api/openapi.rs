use super::handlers::auth::authorize::{
    ANY_ROLE, STORE_READ, STORE_SIGNUP, USER_READ, require_roles,
};
use super::handlers::auth::gate::require_auth;
use super::handlers::auth::principal::Role;
use super::handlers::{admins, federated, health, me, stores, users};
use axum::middleware::{from_fn, from_fn_with_state};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::openapi::{Components, Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Reuse the same router wiring and only return the generated OpenAPI document.
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Routes behind the bearer gate and a role policy.
///
/// `require_auth` is the outer layer, so the principal is attached before the
/// policy looks for it.
fn guarded(policy: &'static [Role], router: OpenApiRouter) -> OpenApiRouter {
    router
        .route_layer(from_fn_with_state(policy, require_roles))
        .route_layer(from_fn(require_auth))
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Add new endpoints here via `.routes(routes!(...))` so they are both served
/// and included in the generated `OpenAPI` document.
pub(crate) fn api_router() -> OpenApiRouter {
    OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(admins::signin))
        .routes(routes!(admins::signup))
        .routes(routes!(federated::admin_start))
        .routes(routes!(federated::admin_callback))
        .routes(routes!(users::signin))
        .routes(routes!(users::signup))
        .routes(routes!(federated::user_start))
        .routes(routes!(federated::user_callback))
        .routes(routes!(stores::signin))
        .routes(routes!(stores::verify))
        .routes(routes!(federated::store_start))
        .routes(routes!(federated::store_callback))
        .merge(guarded(ANY_ROLE, OpenApiRouter::new().routes(routes!(me::get_me))))
        .merge(guarded(
            STORE_SIGNUP,
            OpenApiRouter::new().routes(routes!(stores::signup)),
        ))
        .merge(guarded(
            STORE_READ,
            OpenApiRouter::new().routes(routes!(stores::find)),
        ))
        .merge(guarded(
            USER_READ,
            OpenApiRouter::new().routes(routes!(users::find)),
        ))
}

fn tag(name: &str, description: &str) -> Tag {
    let mut tag = Tag::new(name);
    tag.description = Some(description.to_string());
    tag
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    let mut doc = OpenApiBuilder::new().info(info).build();
    doc.tags = Some(vec![
        tag("admins", "Admin sign-in and sign-up"),
        tag("stores", "Store sign-in with a mailed passcode"),
        tag("users", "User sign-in and sign-up"),
        tag("me", "The authenticated principal"),
        tag("health", "Service health"),
    ]);
    doc.components
        .get_or_insert_with(Components::default)
        .add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );

    doc
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    fn non_empty(value: &str) -> Option<&str> {
        let value = value.trim();
        (!value.is_empty()).then_some(value)
    }
    match author.split_once('<') {
        Some((name, email)) => (non_empty(name), non_empty(email.trim_end_matches('>'))),
        None => (non_empty(author), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let spec = openapi();
        assert_eq!(spec.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(
            spec.info.description.as_deref(),
            Some(env!("CARGO_PKG_DESCRIPTION"))
        );

        let contact = spec.info.contact;
        assert!(contact.is_some());
        if let Some(contact) = contact {
            assert_eq!(contact.name.as_deref(), Some("Team Portico"));
            assert_eq!(contact.email.as_deref(), Some("team@portico.dev"));
        }

        let license = spec.info.license;
        assert!(license.is_some());
        if let Some(license) = license {
            assert_eq!(license.name, "BSD-3-Clause");
            assert_eq!(license.identifier.as_deref(), Some("BSD-3-Clause"));
        }
    }

    #[test]
    fn parse_author_variants() {
        assert_eq!(
            parse_author("Ada <ada@x.com>"),
            (Some("Ada"), Some("ada@x.com"))
        );
        assert_eq!(parse_author("Ada"), (Some("Ada"), None));
        assert_eq!(parse_author("<ada@x.com>"), (None, Some("ada@x.com")));
    }

    #[test]
    fn openapi_tags_and_paths() {
        let spec = openapi();
        let tags = spec.tags.clone().unwrap_or_default();
        for name in ["admins", "stores", "users", "me", "health"] {
            assert!(tags.iter().any(|tag| tag.name == name), "missing tag {name}");
        }
        for path in [
            "/health",
            "/api/v1/admins/signin",
            "/api/v1/admins/signup",
            "/api/v1/admins/auth/google/callback",
            "/api/v1/users/signin",
            "/api/v1/users/find/{id}",
            "/api/v1/stores/signin",
            "/api/v1/stores/verify",
            "/api/v1/stores/signup",
            "/api/v1/stores/find/{id}",
            "/api/v1/me",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing path {path}");
        }
    }

    #[test]
    fn bearer_scheme_is_declared() {
        let spec = openapi();
        let schemes = spec
            .components
            .map(|components| components.security_schemes)
            .unwrap_or_default();
        assert!(schemes.contains_key("bearer"));
    }
}
