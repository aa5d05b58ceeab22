use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::state::session::ClientIdentity;

/// Header carrying the participant id the browser persisted for itself.
pub const PARTICIPANT_HEADER: &str = "x-participant-id";

impl<S> FromRequestParts<S> for ClientIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let participant_id = parts
            .headers
            .get(PARTICIPANT_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        Ok(ClientIdentity::new(participant_id))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(request: Request<()>) -> ClientIdentity {
        let (mut parts, _) = request.into_parts();
        ClientIdentity::from_request_parts(&mut parts, &())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn header_sets_the_participant() {
        let request = Request::builder()
            .header(PARTICIPANT_HEADER, "p-42")
            .body(())
            .unwrap();
        assert_eq!(extract(request).await, ClientIdentity::participant("p-42"));
    }

    #[tokio::test]
    async fn missing_or_blank_header_is_anonymous() {
        let request = Request::builder().body(()).unwrap();
        assert_eq!(extract(request).await, ClientIdentity::anonymous());

        let request = Request::builder()
            .header(PARTICIPANT_HEADER, "  ")
            .body(())
            .unwrap();
        assert_eq!(extract(request).await, ClientIdentity::anonymous());
    }
}
