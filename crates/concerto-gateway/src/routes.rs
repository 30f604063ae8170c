//! Route dispatcher.
//!
//! All traffic goes through one fallback handler that walks an ordered rule
//! table. A rule matches on path alone; a matched path with the wrong method
//! gets a 405 naming the rule's methods, and an unmatched path gets a 404.

use crate::auth::{AuthGate, Challenge};
use crate::bridge::ProtocolBridge;
use crate::config::{ConfigError, GatewayConfig, ValidatorKind};
use crate::error::GatewayError;
use crate::hardening;
use crate::observability::request_id_layer;
use crate::resolver::RepositoryResolver;
use axum::{
    extract::{Query, Request, State},
    http::{Method, Uri},
    response::{IntoResponse, Response},
    Router,
};
use concerto_auth::{CredentialValidator, EqualityValidator, StaticValidator};
use concerto_git::Service;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state for the dispatcher. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    /// Gateway configuration.
    pub config: Arc<GatewayConfig>,
    /// Authentication gate.
    pub auth: Arc<AuthGate>,
    /// Repository resolver.
    pub resolver: Arc<RepositoryResolver>,
    /// Subprocess bridge.
    pub bridge: Arc<ProtocolBridge>,
}

impl AppState {
    /// Builds the state, choosing the validator named in the configuration.
    pub fn from_config(config: GatewayConfig) -> Result<Self, ConfigError> {
        let validator: Arc<dyn CredentialValidator> = match config.auth.validator {
            ValidatorKind::Equality => {
                tracing::warn!("equality validator active: password must equal username");
                Arc::new(EqualityValidator)
            }
            ValidatorKind::Static => Arc::new(StaticValidator::new(config.auth.users.clone())),
        };
        Self::with_validator(config, validator)
    }

    /// Builds the state around an explicit validator.
    pub fn with_validator(
        config: GatewayConfig,
        validator: Arc<dyn CredentialValidator>,
    ) -> Result<Self, ConfigError> {
        let challenge = Challenge::new(
            &config.realm,
            &config.auth.login_hint,
            config.auth.docs_url.as_deref(),
        )
        .map_err(|_| ConfigError::Invalid("realm is not a valid header value".to_string()))?;

        let resolver = RepositoryResolver::new(config.main_path.clone(), &config.repository);
        let bridge = match &config.git.program {
            Some(program) => ProtocolBridge::with_git_program(program, config.git.options.clone()),
            None => ProtocolBridge::new(),
        };

        Ok(Self {
            auth: Arc::new(AuthGate::new(validator, challenge)),
            resolver: Arc::new(resolver),
            bridge: Arc::new(bridge),
            config: Arc::new(config),
        })
    }
}

/// The Git endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `GET /<app>.git/info/refs?service=...`
    InfoRefs,
    /// `POST /<app>.git/git-<service>-pack`
    ServiceRpc,
}

/// One entry of the routing table.
#[derive(Debug)]
pub struct RouteRule {
    /// Endpoint served by this rule.
    pub endpoint: Endpoint,
    /// Path pattern; capture group 1 is the application name.
    pub pattern: Regex,
    /// Methods the endpoint accepts.
    pub methods: &'static [Method],
    /// `Allow` header for every other method.
    pub allow: &'static str,
}

/// Routing table, tried in order.
pub static ROUTES: Lazy<Vec<RouteRule>> = Lazy::new(|| {
    vec![
        RouteRule {
            endpoint: Endpoint::InfoRefs,
            pattern: Regex::new(r"^/([a-z0-9-]+)\.git/info/refs$").expect("valid regex"),
            methods: &[Method::GET, Method::HEAD],
            allow: "HEAD, GET",
        },
        RouteRule {
            endpoint: Endpoint::ServiceRpc,
            pattern: Regex::new(r"^/([a-z0-9-]+)\.git/git-(?:upload|receive)-pack$")
                .expect("valid regex"),
            methods: &[Method::POST],
            allow: "POST",
        },
    ]
});

/// A path matched against the routing table.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The matching rule.
    pub rule: &'static RouteRule,
    /// Application name captured from the path.
    pub app: String,
}

/// Finds the rule for a path and extracts the application name.
pub fn match_route(path: &str) -> Option<RouteMatch> {
    ROUTES.iter().find_map(|rule| {
        rule.pattern
            .captures(path)
            .and_then(|caps| caps.get(1))
            .map(|app| RouteMatch {
                rule,
                app: app.as_str().to_string(),
            })
    })
}

/// Creates the gateway router.
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .fallback(dispatch)
        .layer(TraceLayer::new_for_http())
        .layer(request_id_layer())
        .with_state(state);
    hardening::harden(router)
}

async fn dispatch(State(state): State<AppState>, request: Request) -> Response {
    match route(&state, request).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn route(state: &AppState, mut request: Request) -> Result<Response, GatewayError> {
    let Some(RouteMatch { rule, app }) = match_route(request.uri().path()) else {
        return Err(GatewayError::InvalidPath {
            domain: state.config.domain.clone(),
        });
    };

    if !rule.methods.contains(request.method()) {
        return Err(GatewayError::MethodNotAllowed { allow: rule.allow });
    }

    // Smart-HTTP checks come first: a dumb client gets 403 with or without
    // credentials.
    let service = match rule.endpoint {
        Endpoint::InfoRefs => Some(advertised_service(request.uri())?),
        Endpoint::ServiceRpc => None,
    };

    let identity = state.auth.authenticate(&mut request).await?;
    let repo = state.resolver.resolve(&app)?;
    let descriptor =
        concerto_git::negotiate(request.uri().path(), service.map(Service::name))?;

    state
        .bridge
        .bridge(request, descriptor, &repo, &identity)
        .await
}

/// Validates the `service` parameter of an `info/refs` request.
///
/// The query is decoded once, here. An absent or empty parameter means a
/// dumb-HTTP client; anything else that is not exactly one supported service
/// name, repeated parameters included, is unsupported.
fn advertised_service(uri: &Uri) -> Result<Service, GatewayError> {
    let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(uri).map_err(|_| {
        GatewayError::UnsupportedService(uri.query().unwrap_or_default().to_string())
    })?;

    let mut values = pairs
        .into_iter()
        .filter(|(key, _)| key == "service")
        .map(|(_, value)| value);

    match (values.next(), values.next()) {
        (None, _) => Err(GatewayError::MissingService),
        (Some(value), None) if value.is_empty() => Err(GatewayError::MissingService),
        (Some(value), None) => {
            Service::from_name(&value).ok_or(GatewayError::UnsupportedService(value))
        }
        (Some(first), Some(second)) => Err(GatewayError::UnsupportedService(
            std::iter::once(first)
                .chain(std::iter::once(second))
                .chain(values)
                .collect::<Vec<_>>()
                .join(","),
        )),
    }
}
