//! Admin token middleware for Actix Web.
//!
//! Admin routes (payout settlement and the payout summary) are wrapped in this middleware. Callers must present the
//! configured `TIFFIN_ADMIN_TOKEN` in the `X-Admin-Token` header. If no token is configured, every admin request is
//! refused.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use tiffin_common::Secret;

use crate::errors::{AuthError, ServerError};

pub const ADMIN_TOKEN_HEADER: &str = "X-Admin-Token";

pub struct AdminTokenMiddlewareFactory {
    token: Secret<String>,
}

impl AdminTokenMiddlewareFactory {
    pub fn new(token: Secret<String>) -> Self {
        AdminTokenMiddlewareFactory { token }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminTokenMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AdminTokenMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminTokenMiddlewareService { token: self.token.clone(), service: Rc::new(service) }))
    }
}

pub struct AdminTokenMiddlewareService<S> {
    token: Secret<String>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AdminTokenMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let result = check_token(&self.token, req.headers().get(ADMIN_TOKEN_HEADER).and_then(|v| v.to_str().ok()));
        Box::pin(async move {
            match result {
                Ok(()) => {
                    trace!("🔐️ Admin token check for {} ✅️", req.path());
                    service.call(req).await
                },
                Err(e) => {
                    warn!("🔐️ Admin request to {} denied. {e}", req.path());
                    Err(ServerError::AuthenticationError(e).into())
                },
            }
        })
    }
}

fn check_token(expected: &Secret<String>, presented: Option<&str>) -> Result<(), AuthError> {
    let presented = presented.filter(|s| !s.is_empty()).ok_or(AuthError::MissingAdminToken)?;
    if !expected.is_empty() && expected.matches(presented) {
        Ok(())
    } else {
        Err(AuthError::InvalidAdminToken)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn token_checks() {
        let token = Secret::new("s3cr3t".to_string());
        assert!(check_token(&token, Some("s3cr3t")).is_ok());
        assert!(matches!(check_token(&token, None), Err(AuthError::MissingAdminToken)));
        assert!(matches!(check_token(&token, Some("")), Err(AuthError::MissingAdminToken)));
        assert!(matches!(check_token(&token, Some("s3cr3")), Err(AuthError::InvalidAdminToken)));
        let unset = Secret::default();
        assert!(matches!(check_token(&unset, Some("anything")), Err(AuthError::InvalidAdminToken)));
    }
}
