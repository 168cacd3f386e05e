//! Session middleware.
//!
//! Every route behind this middleware needs an `Authorization: Bearer <token>` header carrying a valid session token
//! (see [`crate::auth`]). The verified claims are stored in the request extensions, where the [`AclMiddlewareFactory`]
//! and the route handlers pick them up.
//!
//! [`AclMiddlewareFactory`]: super::AclMiddlewareFactory

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error,
    HttpMessage,
};
use futures::future::LocalBoxFuture;
use log::{debug, trace};

use crate::{
    auth::TokenIssuer,
    errors::{AuthError, ServerError},
};

pub struct SessionMiddlewareFactory {
    issuer: TokenIssuer,
}

impl SessionMiddlewareFactory {
    pub fn new(issuer: TokenIssuer) -> Self {
        SessionMiddlewareFactory { issuer }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = SessionMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionMiddlewareService { issuer: self.issuer.clone(), service: Rc::new(service) }))
    }
}

pub struct SessionMiddlewareService<S> {
    issuer: TokenIssuer,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SessionMiddlewareService<S>
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
        let token = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|v| v.to_string());
        let verified = token.ok_or(AuthError::MissingToken).and_then(|t| self.issuer.verify(&t));
        Box::pin(async move {
            match verified {
                Ok(claims) => {
                    trace!("🔐️ Session verified for {} ({})", claims.user_id, claims.role);
                    req.extensions_mut().insert(claims);
                    service.call(req).await
                },
                Err(e) => {
                    debug!("🔐️ Refusing {} {}. {e}", req.method(), req.path());
                    Err(ServerError::AuthenticationError(e).into())
                },
            }
        })
    }
}
