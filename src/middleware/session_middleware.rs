/// Session Middleware
///
/// Applies the renewal policy to every request in the wrapped scope. The
/// resolved `UserIdentity` is placed in request extensions for handlers
/// (`web::ReqData<UserIdentity>`). If the access token had to be renewed,
/// the new pair is set as cookies on whatever response the handler returns.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::{Authenticated, SessionManager};

pub struct SessionMiddleware {
    sessions: web::Data<SessionManager>,
}

impl SessionMiddleware {
    pub fn new(sessions: web::Data<SessionManager>) -> Self {
        Self { sessions }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(SessionMiddlewareService {
            service: Rc::new(service),
            sessions: self.sessions.clone(),
        }))
    }
}

pub struct SessionMiddlewareService<S> {
    service: Rc<S>,
    sessions: web::Data<SessionManager>,
}

impl<S, B> Service<ServiceRequest> for SessionMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match self.sessions.authenticate(req.request()) {
            Ok(Authenticated { identity, renewed }) => {
                tracing::debug!(
                    uid = identity.uid,
                    username = %identity.username,
                    renewed = renewed.is_some(),
                    "Session accepted"
                );
                req.extensions_mut().insert(identity);

                let service = self.service.clone();
                let sessions = self.sessions.clone();
                Box::pin(async move {
                    let mut res = service.call(req).await?;
                    if let Some(pair) = renewed {
                        sessions.transport().write_to(res.response_mut(), &pair)?;
                    }
                    Ok(res)
                })
            }
            Err(e) => {
                tracing::warn!(path = %req.path(), "Rejected request without a usable session");
                Box::pin(async move { Err(Error::from(e)) })
            }
        }
    }
}
