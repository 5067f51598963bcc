// Model router
//
// Resolves logical model roles to provider handles. Resolutions are cached per
// role for the lifetime of the router; settings changes need a new router.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::config::constants::DEFAULT_MAX_TOKENS;
use crate::config::{LlmSettings, ModelRole, ProviderKind};
use crate::errors::RouterError;
use crate::providers::{
    default_factory, FallbackChain, GenerationOptions, LlmProvider, ProviderFactory,
    ResolvedBinding,
};

pub type ModelHandle = Arc<dyn LlmProvider>;

/// Role → provider resolution with main/spare failover.
///
/// - `main` is wrapped as `[main, spare]` when both resolve, replaced by
///   `spare` when only spare resolves, and fails with
///   [`RouterError::NoModelAvailable`] when neither does.
/// - `thinking` is wrapped as `[thinking, spare]` when spare resolves.
/// - `validation` and `spare` are used as configured.
pub struct ModelRouter {
    settings: LlmSettings,
    factory: ProviderFactory,
    cache: Mutex<HashMap<ModelRole, ModelHandle>>,
}

impl ModelRouter {
    pub fn new(settings: LlmSettings) -> Self {
        Self::with_factory(settings, default_factory())
    }

    /// Router with a custom provider constructor (test doubles, instrumentation)
    pub fn with_factory(settings: LlmSettings, factory: ProviderFactory) -> Self {
        Self {
            settings,
            factory,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a role to a model handle, composing fallbacks as described on
    /// the type. Successful resolutions are memoized; failures are not.
    pub fn resolve(&self, role: ModelRole) -> Result<ModelHandle, RouterError> {
        if let Some(handle) = self.cached(role) {
            return Ok(handle);
        }

        let handle = match role {
            ModelRole::Main => self.compose_main()?,
            ModelRole::Thinking => {
                let thinking = self.build(ModelRole::Thinking)?;
                match self.resolve(ModelRole::Spare) {
                    Ok(spare) => chain(thinking, spare),
                    Err(_) => thinking,
                }
            }
            ModelRole::Validation | ModelRole::Spare => self.build(role)?,
        };

        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        Ok(cache.entry(role).or_insert(handle).clone())
    }

    /// Resolve an optional role; failure is logged and yields `None`.
    pub fn resolve_optional(&self, role: ModelRole) -> Option<ModelHandle> {
        match self.resolve(role) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(role = %role, error = %e, "Model role unavailable");
                None
            }
        }
    }

    /// Generation handle: thinking when available, main otherwise.
    pub fn thinking_or_main(&self) -> Result<ModelHandle, RouterError> {
        match self.resolve_optional(ModelRole::Thinking) {
            Some(handle) => Ok(handle),
            None => self.resolve(ModelRole::Main),
        }
    }

    /// Validation handle: validation when available, main otherwise.
    pub fn validation_or_main(&self) -> Result<ModelHandle, RouterError> {
        match self.resolve_optional(ModelRole::Validation) {
            Some(handle) => Ok(handle),
            None => self.resolve(ModelRole::Main),
        }
    }

    /// Resolve every role and report `provider/model` or the error, in role order.
    pub fn check_all(&self) -> Vec<(ModelRole, Result<String, RouterError>)> {
        ModelRole::ALL
            .iter()
            .map(|&role| {
                let result = self
                    .resolve(role)
                    .map(|h| format!("{} ({})", h.name(), h.model()));
                (role, result)
            })
            .collect()
    }

    fn cached(&self, role: ModelRole) -> Option<ModelHandle> {
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.get(&role).cloned()
    }

    fn compose_main(&self) -> Result<ModelHandle, RouterError> {
        let main = self.build(ModelRole::Main);
        let spare = self.resolve(ModelRole::Spare);

        match (main, spare) {
            (Ok(main), Ok(spare)) => Ok(chain(main, spare)),
            (Ok(main), Err(e)) => {
                warn!(error = %e, "Spare model unavailable; main model has no fallback");
                Ok(main)
            }
            (Err(e), Ok(spare)) => {
                warn!(error = %e, "Main model unavailable; using spare model as main");
                Ok(spare)
            }
            (Err(main), Err(spare)) => Err(RouterError::NoModelAvailable {
                main: Box::new(main),
                spare: Box::new(spare),
            }),
        }
    }

    /// Construct the provider configured for exactly one role.
    fn build(&self, role: ModelRole) -> Result<ModelHandle, RouterError> {
        let binding = self.binding_for(role)?;
        let handle = (self.factory)(&binding).map_err(|source| RouterError::Construction {
            role,
            provider: binding.kind,
            source,
        })?;
        info!(role = %role, provider = %binding.kind, model = %binding.model, "Resolved model role");
        Ok(handle)
    }

    /// Checks run in order: complete binding, known provider, credential present.
    fn binding_for(&self, role: ModelRole) -> Result<ResolvedBinding, RouterError> {
        let (provider_var, model_var) = role.env_vars();
        let (provider, model) =
            self.settings
                .binding(role)
                .complete()
                .ok_or(RouterError::Configuration {
                    role,
                    provider_var,
                    model_var,
                })?;

        let kind = ProviderKind::parse(provider).ok_or_else(|| RouterError::UnsupportedProvider {
            role,
            provider: provider.to_string(),
        })?;

        let api_key = self
            .settings
            .api_key(kind)
            .ok_or(RouterError::MissingCredential {
                role,
                provider: kind,
                key_var: kind.api_key_var(),
            })?;

        Ok(ResolvedBinding {
            role,
            kind,
            model: model.to_string(),
            api_key: api_key.to_string(),
            base_url: self.settings.base_url(kind).map(str::to_string),
            options: GenerationOptions {
                max_tokens: self.settings.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
                temperature: self.settings.temperature,
            },
        })
    }
}

fn chain(primary: ModelHandle, fallback: ModelHandle) -> ModelHandle {
    Arc::new(FallbackChain::new(vec![primary, fallback]))
}
