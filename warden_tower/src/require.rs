use std::{fmt, marker::PhantomData};

use http::{Request, Response};
use tower_http::validate_request::{ValidateRequest, ValidateRequestHeaderLayer};
use warden::Auth;

use crate::util::refusal;

/// Request validator that authenticates every request with an [`Auth`]
///
/// Admitted requests carry the authenticated [`Principal`][warden::Principal]
/// in their extensions. Refused requests are answered directly with an empty
/// body, the status code of the decision, and a `www-authenticate`
/// challenge.
pub struct RequireAuth<ResBody> {
    auth: Auth,
    _ty: PhantomData<fn() -> ResBody>,
}

impl<ResBody> RequireAuth<ResBody> {
    /// Wraps an authenticator
    #[inline]
    pub fn new(auth: Auth) -> Self {
        Self {
            auth,
            _ty: PhantomData,
        }
    }

    /// The authenticator in use
    #[inline]
    pub fn auth(&self) -> &Auth {
        &self.auth
    }
}

impl<ResBody> Clone for RequireAuth<ResBody> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            auth: self.auth.clone(),
            _ty: PhantomData,
        }
    }
}

impl<ResBody> fmt::Debug for RequireAuth<ResBody> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RequireAuth")
            .field("auth", &self.auth)
            .finish()
    }
}

impl<ReqBody, ResBody> ValidateRequest<ReqBody> for RequireAuth<ResBody>
where
    ResBody: Default,
{
    type ResponseBody = ResBody;

    fn validate(
        &mut self,
        request: &mut Request<ReqBody>,
    ) -> Result<(), Response<Self::ResponseBody>> {
        let decision = self.auth.authenticate(request.headers());

        if !decision.is_allowed() {
            tracing::trace!(status = %decision.status(), "refusing request");
            return Err(refusal(&decision, &self.auth));
        }

        if let Some(principal) = decision.into_principal() {
            tracing::trace!(principal = principal.name(), "admitting request");
            let _ = request.extensions_mut().insert(principal);
        }

        Ok(())
    }
}

/// Layer that authenticates requests before they reach the inner service
///
/// ```
/// use axum::{routing::get, Router};
/// use warden::{Auth, Config};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let auth = Auth::new(Config::basic([("alice", "secret")]))?;
///
/// let app: Router = Router::new()
///     .route("/api/ok", get(|| async {}))
///     .layer(warden_tower::layer::<axum::body::Body>(auth));
/// # Ok(())
/// # }
/// ```
pub fn layer<ResBody>(auth: Auth) -> ValidateRequestHeaderLayer<RequireAuth<ResBody>>
where
    ResBody: Default,
{
    ValidateRequestHeaderLayer::custom(RequireAuth::new(auth))
}

#[cfg(test)]
mod tests {
    use aliri_base64::Base64;
    use aliri_clock::{Clock, System};
    use axum::{
        body::Body,
        extract::Extension,
        http::{header, StatusCode},
        routing::get,
        Router,
    };
    use color_eyre::Result;
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;
    use warden::{
        jwks::{KeyProvider, KeyProviderConfig},
        AuthScheme, BasicValidator, CapabilityPolicy, Config, Principal,
        TokenValidator,
    };
    use warden_jose::test_util::KeyPair;

    use super::*;

    async fn whoami(principal: Option<Extension<Principal>>) -> String {
        match principal {
            Some(Extension(p)) => format!("{}:{}", p.scheme(), p.name()),
            None => "anonymous".to_owned(),
        }
    }

    fn app(auth: Auth) -> Router {
        Router::new()
            .route("/api/ok", get(whoami))
            .layer(layer::<Body>(auth))
    }

    fn request(authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/api/ok");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn basic(user: &str, pass: &str) -> String {
        format!("Basic {}", Base64::from_raw(format!("{user}:{pass}")))
    }

    async fn body_text(resp: Response<Body>) -> Result<String> {
        let bytes = resp.into_body().collect().await?.to_bytes();
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    fn challenge(resp: &Response<Body>) -> Option<&str> {
        resp.headers()
            .get(header::WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
    }

    fn jwt_app(pair: &KeyPair, required: &[&str]) -> Router {
        let tokens = TokenValidator::new(KeyProvider::from_jwks(pair.jwks("k1")));
        let policy = CapabilityPolicy::any_of(required.iter().copied().collect());
        app(Auth::jwt(tokens, policy).with_realm("api"))
    }

    #[tokio::test]
    async fn disabled_forwards_without_principal() -> Result<()> {
        let resp = app(Auth::disabled()).oneshot(request(None)).await?;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await?, "anonymous");
        Ok(())
    }

    #[tokio::test]
    async fn basic_success_forwards_principal() -> Result<()> {
        let auth = Auth::new(Config::basic([("alice", "secret")]))?;
        let resp = app(auth)
            .oneshot(request(Some(&basic("alice", "secret"))))
            .await?;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await?, "Basic:alice");
        Ok(())
    }

    #[tokio::test]
    async fn basic_failures_are_challenged() -> Result<()> {
        let auth = Auth::basic(BasicValidator::new([("alice", "secret")])).with_realm("ops");

        for authorization in [None, Some(basic("alice", "nope")), Some("Bearer x".into())] {
            let resp = app(auth.clone())
                .oneshot(request(authorization.as_deref()))
                .await?;

            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(
                challenge(&resp),
                Some(r#"Basic realm="ops", charset="UTF-8""#)
            );
            assert_eq!(body_text(resp).await?, "");
        }
        Ok(())
    }

    #[tokio::test]
    async fn jwt_with_capability_reaches_handler() -> Result<()> {
        let pair = KeyPair::ed25519();
        let token = pair.sign_token(
            Some("k1"),
            &json!({
                "sub": "svc-a",
                "exp": System.now().0 + 300,
                "capabilities": ["read", "write"],
            }),
        );

        let resp = jwt_app(&pair, &["read"])
            .oneshot(request(Some(&format!("Bearer {}", token.as_str()))))
            .await?;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await?, "Bearer:svc-a");
        Ok(())
    }

    #[tokio::test]
    async fn jwt_without_capability_is_forbidden() -> Result<()> {
        let pair = KeyPair::ed25519();
        let token = pair.sign_token(Some("k1"), &json!({ "capabilities": ["write"] }));

        let resp = jwt_app(&pair, &["read"])
            .oneshot(request(Some(&format!("Bearer {}", token.as_str()))))
            .await?;

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            challenge(&resp),
            Some(r#"Bearer realm="api", error="insufficient_scope", scope="read""#)
        );
        assert_eq!(body_text(resp).await?, "");
        Ok(())
    }

    #[tokio::test]
    async fn garbage_token_is_bad_request() -> Result<()> {
        let pair = KeyPair::ed25519();
        let resp = jwt_app(&pair, &["read"])
            .oneshot(request(Some("Bearer garbage")))
            .await?;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            challenge(&resp),
            Some(r#"Bearer realm="api", error="invalid_request""#)
        );
        Ok(())
    }

    #[tokio::test]
    async fn expired_token_is_unauthorized() -> Result<()> {
        let pair = KeyPair::ed25519();
        let token = pair.sign_token(
            Some("k1"),
            &json!({ "exp": System.now().0 - 60, "capabilities": ["read"] }),
        );

        let resp = jwt_app(&pair, &["read"])
            .oneshot(request(Some(&format!("Bearer {}", token.as_str()))))
            .await?;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            challenge(&resp),
            Some(r#"Bearer realm="api", error="invalid_token""#)
        );
        let text = body_text(resp).await?;
        assert!(!text.contains(token.as_str()));
        Ok(())
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() -> Result<()> {
        let pair = KeyPair::ed25519();
        let resp = jwt_app(&pair, &[]).oneshot(request(None)).await?;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(challenge(&resp), Some(r#"Bearer realm="api""#));
        Ok(())
    }

    #[tokio::test]
    async fn jwt_before_first_fetch_is_unauthorized() -> Result<()> {
        let keys = KeyProvider::new(KeyProviderConfig::new(
            "https://auth.example.com/.well-known/jwks.json",
        ))?;
        let auth = Auth::jwt(TokenValidator::new(keys), CapabilityPolicy::allow_any());

        let pair = KeyPair::ed25519();
        let token = pair.sign_token(Some("k1"), &json!({ "sub": "svc-a" }));
        let resp = app(auth.with_realm("api"))
            .oneshot(request(Some(&format!("Bearer {}", token.as_str()))))
            .await?;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            challenge(&resp),
            Some(r#"Bearer realm="api", error="invalid_token""#)
        );
        assert_eq!(body_text(resp).await?, "");
        Ok(())
    }

    #[test]
    fn validator_inserts_principal() {
        let mut validator = RequireAuth::<()>::new(Auth::basic(BasicValidator::new([(
            "alice", "secret",
        )])));

        let mut req = Request::new(());
        req.headers_mut().insert(
            header::AUTHORIZATION,
            basic("alice", "secret").parse().unwrap(),
        );

        assert!(validator.validate(&mut req).is_ok());
        let principal = req.extensions().get::<Principal>().unwrap();
        assert_eq!(principal.name(), "alice");
        assert_eq!(principal.scheme(), AuthScheme::Basic);
    }
}
