//! Utilities for generating HTTP responses on authentication failures

use http::{header, HeaderValue, Response};
use warden::{Auth, AuthDecision, Capabilities, Challenge};

/// Build the refusal response for a decision
///
/// The response has the decision's status, an empty body, and a
/// `www-authenticate` header naming the realm:
///
/// ```http
/// HTTP/1.1 401 Unauthorized
/// www-authenticate: Bearer realm="{realm}", error="invalid_token"
/// ```
///
/// When a token lacks capabilities, the required capabilities are listed
/// in the `scope` parameter.
pub fn refusal<Body: Default>(decision: &AuthDecision, auth: &Auth) -> Response<Body> {
    let mut resp = Response::new(Body::default());
    *resp.status_mut() = decision.status();

    if let Some(challenge) = decision.challenge() {
        let required = match challenge {
            Challenge::InsufficientScope => auth.required_capabilities(),
            _ => None,
        };
        resp.headers_mut().insert(
            header::WWW_AUTHENTICATE,
            www_authenticate(challenge, auth.realm(), required),
        );
    }

    resp
}

/// Build a `www-authenticate` header value
///
/// The realm and capability names are escaped so that they are always
/// header-friendly.
pub fn www_authenticate(
    challenge: Challenge,
    realm: &str,
    required: Option<&Capabilities>,
) -> HeaderValue {
    let realm = realm.escape_default();

    let value = match challenge {
        Challenge::Basic => format!(r#"Basic realm="{realm}", charset="UTF-8""#),
        Challenge::Bearer => format!(r#"Bearer realm="{realm}""#),
        Challenge::InvalidRequest => {
            format!(r#"Bearer realm="{realm}", error="invalid_request""#)
        }
        Challenge::InvalidToken => format!(r#"Bearer realm="{realm}", error="invalid_token""#),
        Challenge::InsufficientScope => match required.filter(|r| !r.is_empty()) {
            Some(required) => {
                let scope = required
                    .iter()
                    .map(|c| c.as_str().escape_default().to_string())
                    .collect::<Vec<_>>()
                    .join(" ");
                format!(r#"Bearer realm="{realm}", error="insufficient_scope", scope="{scope}""#)
            }
            None => format!(r#"Bearer realm="{realm}", error="insufficient_scope""#),
        },
    };

    HeaderValue::try_from(value).unwrap_or_else(|_| fallback(challenge))
}

fn fallback(challenge: Challenge) -> HeaderValue {
    match challenge {
        Challenge::Basic => HeaderValue::from_static("Basic"),
        Challenge::Bearer => HeaderValue::from_static("Bearer"),
        Challenge::InvalidRequest => HeaderValue::from_static(r#"Bearer error="invalid_request""#),
        Challenge::InvalidToken => HeaderValue::from_static(r#"Bearer error="invalid_token""#),
        Challenge::InsufficientScope => {
            HeaderValue::from_static(r#"Bearer error="insufficient_scope""#)
        }
    }
}
