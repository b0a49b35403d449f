//! Session extractors. Tokens are issued by the external auth provider; this side only
//! verifies them and resolves the caller's role.

use serde::{Deserialize, Serialize};

//////////////////////////////////////////////////
// Data structs
//////////////////////////////////////////////////

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub exp: usize,
}

//////////////////////////////////////////////////
// ─────────────  JwtAuth extractor  ─────────────
//////////////////////////////////////////////////

pub mod extractor {
    use super::Claims;
    use actix_web::{
        dev::Payload,
        error::{ErrorForbidden, ErrorInternalServerError, ErrorUnauthorized},
        web, FromRequest, HttpRequest, Result as ActixResult,
    };
    use futures_util::future::{ready, LocalBoxFuture, Ready};
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
    use secrecy::ExposeSecret;
    use uuid::Uuid;

    use crate::db::StoreError;
    use crate::rental::CurrentUser;
    use crate::state::AppState;

    /// Extracts and validates a Bearer-JWT, exposing the user UUID. No datastore access.
    #[derive(Debug, Clone)]
    pub struct JwtAuth {
        pub user_id: Uuid,
    }

    impl FromRequest for JwtAuth {
        type Error = actix_web::Error;
        type Future = Ready<ActixResult<Self, Self::Error>>;

        fn from_request(req: &HttpRequest, _pl: &mut Payload) -> Self::Future {
            let res = (|| {
                // Expect:  Authorization: Bearer <JWT>
                let hdr = req
                    .headers()
                    .get("Authorization")
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| ErrorUnauthorized("missing Authorization header"))?;

                let token = hdr
                    .strip_prefix("Bearer ")
                    .ok_or_else(|| ErrorUnauthorized("malformed Authorization header"))?;

                let secret = req
                    .app_data::<web::Data<AppState>>()
                    .and_then(|state| state.jwt_secret.as_ref())
                    .ok_or_else(|| ErrorInternalServerError("JWT_SECRET missing"))?;

                let mut validation = Validation::new(Algorithm::HS256);
                validation.validate_aud = false;
                let data = decode::<Claims>(
                    token,
                    &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
                    &validation,
                )
                .map_err(|_| ErrorUnauthorized("invalid / expired token"))?;

                let user_id =
                    Uuid::parse_str(&data.claims.sub).map_err(|_| ErrorUnauthorized("bad sub"))?;

                Ok(JwtAuth { user_id })
            })();

            ready(res)
        }
    }

    /// Verified caller with the role currently stored for them.
    impl FromRequest for CurrentUser {
        type Error = actix_web::Error;
        type Future = LocalBoxFuture<'static, ActixResult<Self, Self::Error>>;

        fn from_request(req: &HttpRequest, pl: &mut Payload) -> Self::Future {
            let auth = JwtAuth::from_request(req, pl).into_inner();
            let state = req.app_data::<web::Data<AppState>>().cloned();

            Box::pin(async move {
                let JwtAuth { user_id } = auth?;
                let state = state.ok_or_else(|| ErrorInternalServerError("state missing"))?;

                match state.store.user_by_id(user_id).await {
                    Ok(user) => Ok(CurrentUser {
                        id: user.id,
                        role: user.role,
                    }),
                    Err(StoreError::NotFound { .. }) => Err(ErrorForbidden("user is not registered")),
                    Err(e) => {
                        log::error!("role lookup failed for {user_id}: {e}");
                        Err(ErrorInternalServerError("role lookup failed"))
                    }
                }
            })
        }
    }

    /// A [`CurrentUser`] whose role is ADMIN.
    #[derive(Debug, Clone, Copy)]
    pub struct AdminUser(pub CurrentUser);

    impl FromRequest for AdminUser {
        type Error = actix_web::Error;
        type Future = LocalBoxFuture<'static, ActixResult<Self, Self::Error>>;

        fn from_request(req: &HttpRequest, pl: &mut Payload) -> Self::Future {
            let user = CurrentUser::from_request(req, pl);
            Box::pin(async move {
                let user = user.await?;
                if !user.is_admin() {
                    return Err(ErrorForbidden("admin role required"));
                }
                Ok(AdminUser(user))
            })
        }
    }
}
pub use extractor::{AdminUser, JwtAuth}; // <-- makes path crate::http::auth::JwtAuth work
