//! The `{token}` segment of the progress route.

use axum::extract::rejection::PathRejection;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use derive_more::Deref;

use crate::handler::Error;

/// A percent-decoded upload token taken from the request path.
#[derive(Debug, Clone, PartialEq, Eq, Deref)]
pub struct TokenPath(pub String);

impl<S> FromRequestParts<S> for TokenPath
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<String>::from_request_parts(parts, state).await {
            Ok(Path(token)) => Ok(Self(token)),
            Err(PathRejection::FailedToDeserializePathParams(err)) => {
                Err(Error::bad_request("The token is not a valid path segment")
                    .with_resource("token")
                    .with_detail(err.body_text()))
            }
            Err(rejection) => Err(Error::internal().with_detail(rejection.body_text())),
        }
    }
}
