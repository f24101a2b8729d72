use axum::{extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use staybook_core::domain::account::{AccountRole, Actor};
use staybook_core::errors::ApplicationError;
use staybook_db::RequestContext;
use uuid::Uuid;

use super::{ApiError, ACTOR_ID_HEADER, ACTOR_ROLE_HEADER, CORRELATION_HEADER};

/// Identity and correlation id of the request, read from headers.
///
/// No actor headers means an anonymous caller. Sending only one of the two
/// is a bad request.
#[derive(Clone, Debug)]
pub struct Caller {
    pub context: RequestContext,
}

impl Caller {
    pub fn correlation_id(&self) -> &str {
        &self.context.correlation_id
    }

    pub fn fail(&self, error: ApplicationError) -> ApiError {
        ApiError::from_application(error, self.correlation_id())
    }

    /// Role gate applied before any workflow runs.
    pub fn require_role(&self, allowed: &[AccountRole]) -> Result<&Actor, ApiError> {
        let actor = self.context.require_actor().map_err(|error| self.fail(error))?;
        if allowed.contains(&actor.role) {
            return Ok(actor);
        }
        let allowed = allowed.iter().map(|role| role.as_str()).collect::<Vec<_>>().join("|");
        Err(self.fail(ApplicationError::Forbidden(format!(
            "role {} is not permitted here (requires {allowed})",
            actor.role.as_str()
        ))))
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let correlation_id = correlation_id(&parts.headers);
        let actor_id = header_value(&parts.headers, ACTOR_ID_HEADER);
        let actor_role = header_value(&parts.headers, ACTOR_ROLE_HEADER);

        let context = match (actor_id, actor_role) {
            (None, None) => RequestContext::anonymous(correlation_id),
            (Some(id), Some(role)) => {
                let role = role
                    .parse::<AccountRole>()
                    .map_err(|error| ApiError::from_application(error.into(), &correlation_id))?;
                RequestContext::for_actor(Actor::new(id, role), correlation_id)
            }
            _ => {
                return Err(ApiError::bad_request(
                    format!("{ACTOR_ID_HEADER} and {ACTOR_ROLE_HEADER} must be sent together"),
                    &correlation_id,
                ))
            }
        };

        Ok(Self { context })
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

fn correlation_id(headers: &HeaderMap) -> String {
    header_value(headers, CORRELATION_HEADER)
        .unwrap_or_else(|| format!("req-{}", Uuid::new_v4().simple()))
}
