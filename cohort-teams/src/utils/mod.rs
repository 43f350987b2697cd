use crate::models::{Claims, ServiceError};
use actix_web::{HttpMessage, HttpRequest};

pub mod retry;
pub mod student_directory;
pub mod team_lock;
pub mod team_storage;

pub use retry::RetryPolicy;
pub use student_directory::{DirectoryEntry, StaticDirectory, StudentDirectory};
pub use team_lock::{TeamLeaseGuard, TeamLockRegistry};
pub use team_storage::{DocumentStore, TeamStore};

// Caller id placed in the request by the authentication middleware
pub fn get_user_id_from_request(req: &HttpRequest) -> Result<String, ServiceError> {
    req.extensions()
        .get::<Claims>()
        .map(|claims| claims.sub.clone())
        .ok_or(ServiceError::Unauthorized)
}

// JWT utility functions. Tokens are issued by the portal's auth service;
// this service only verifies them.
pub mod jwt {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    // Validate and decode a JWT token
    pub fn decode_token(token: &str, secret: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_ref()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| ServiceError::Unauthorized)
    }

    // Extract JWT from Authorization header
    pub fn extract_token_from_header(auth_header: &str) -> Result<String, ServiceError> {
        if !auth_header.starts_with("Bearer ") {
            return Err(ServiceError::Unauthorized);
        }

        Ok(auth_header.trim_start_matches("Bearer ").to_string())
    }
}

// Middleware for JWT authentication
pub mod auth_middleware {
    use super::*;
    use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
    use actix_web::http::header;
    use actix_web::Error;
    use futures::future::{ok, Ready};
    use log::debug;
    use std::future::Future;
    use std::pin::Pin;
    use std::rc::Rc;

    pub struct Authentication {
        secret: Rc<str>,
    }

    impl Authentication {
        pub fn new(secret: &str) -> Self {
            Self {
                secret: Rc::from(secret),
            }
        }
    }

    impl<S, B> Transform<S, ServiceRequest> for Authentication
    where
        S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
        S::Future: 'static,
        B: 'static,
    {
        type Response = ServiceResponse<B>;
        type Error = Error;
        type Transform = AuthenticationMiddleware<S>;
        type InitError = ();
        type Future = Ready<Result<Self::Transform, Self::InitError>>;

        fn new_transform(&self, service: S) -> Self::Future {
            ok(AuthenticationMiddleware {
                service,
                secret: self.secret.clone(),
            })
        }
    }

    pub struct AuthenticationMiddleware<S> {
        service: S,
        secret: Rc<str>,
    }

    impl<S> AuthenticationMiddleware<S> {
        fn claims_for(&self, req: &ServiceRequest) -> Result<Claims, ServiceError> {
            let auth_header = req
                .headers()
                .get(header::AUTHORIZATION)
                .ok_or(ServiceError::Unauthorized)?;
            let auth_str = auth_header.to_str().map_err(|_| ServiceError::Unauthorized)?;
            let token = jwt::extract_token_from_header(auth_str)?;
            jwt::decode_token(&token, &self.secret)
        }
    }

    impl<S, B> Service<ServiceRequest> for AuthenticationMiddleware<S>
    where
        S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
        S::Future: 'static,
        B: 'static,
    {
        type Response = ServiceResponse<B>;
        type Error = Error;
        type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

        forward_ready!(service);

        fn call(&self, req: ServiceRequest) -> Self::Future {
            match self.claims_for(&req) {
                Ok(claims) => {
                    // Add the claims to the request extensions
                    req.extensions_mut().insert(claims);
                    let fut = self.service.call(req);
                    Box::pin(async move { fut.await })
                }
                Err(err) => {
                    debug!("Rejected request to {}: {}", req.path(), err);
                    let err: Error = err.into();
                    Box::pin(async move { Err(err) })
                }
            }
        }
    }
}
