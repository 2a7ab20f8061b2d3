//! Backend availability, discovered once per run.
//!
//! [`Capabilities::discover`] reads keys, model names and the offline switch
//! into an immutable value. Selection and construction go through it; nothing
//! else checks the environment for backends.

use std::fmt;
use std::str::FromStr;

use tracing::{info, warn};

use tabcatalog_shared::{
    AppConfig, ClassifierRule, CredentialStore, GeminiConfig, MistralConfig, OllamaConfig,
    Result, TabCatalogError,
};

use crate::offline::OfflineClassifier;
use crate::providers::{GeminiProvider, MistralProvider, OllamaProvider, TextGenerator};

/// Categorization backends, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Gemini,
    Mistral,
    Ollama,
    Offline,
    Fallback,
}

impl BackendKind {
    pub const PRIORITY: [BackendKind; 5] = [
        Self::Gemini,
        Self::Mistral,
        Self::Ollama,
        Self::Offline,
        Self::Fallback,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Mistral => "mistral",
            Self::Ollama => "ollama",
            Self::Offline => "offline",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = TabCatalogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "mistral" => Ok(Self::Mistral),
            "ollama" => Ok(Self::Ollama),
            "offline" => Ok(Self::Offline),
            "fallback" => Ok(Self::Fallback),
            other => Err(TabCatalogError::validation(format!(
                "unknown backend {other:?} (expected gemini, mistral, ollama, offline or fallback)"
            ))),
        }
    }
}

/// Per-run overrides from the command line.
#[derive(Debug, Clone, Default)]
pub struct CapabilityOverrides {
    pub gemini_key: Option<String>,
    pub mistral_key: Option<String>,
    pub ollama_model: Option<String>,
}

/// What this run can use. Holds API keys, so it is not `Debug`.
#[derive(Clone)]
pub struct Capabilities {
    gemini_key: Option<String>,
    mistral_key: Option<String>,
    ollama_model: Option<String>,
    offline: bool,
    gemini: GeminiConfig,
    mistral: MistralConfig,
    ollama: OllamaConfig,
    rules: Vec<ClassifierRule>,
}

impl Capabilities {
    pub fn discover(
        config: &AppConfig,
        credentials: &CredentialStore,
        overrides: &CapabilityOverrides,
    ) -> Self {
        let ollama_model = overrides
            .ollama_model
            .as_deref()
            .or(config.ollama.model.as_deref())
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        let caps = Self {
            gemini_key: credentials.gemini_key(config, overrides.gemini_key.as_deref()),
            mistral_key: credentials.mistral_key(config, overrides.mistral_key.as_deref()),
            ollama_model,
            offline: config.classifier.offline,
            gemini: config.gemini.clone(),
            mistral: config.mistral.clone(),
            ollama: config.ollama.clone(),
            rules: config.classifier.rules.clone(),
        };

        info!(
            gemini = caps.is_available(BackendKind::Gemini),
            mistral = caps.is_available(BackendKind::Mistral),
            ollama = caps.is_available(BackendKind::Ollama),
            offline = caps.offline,
            "backend capabilities discovered"
        );
        caps
    }

    pub fn is_available(&self, kind: BackendKind) -> bool {
        match kind {
            BackendKind::Gemini => self.gemini_key.is_some(),
            BackendKind::Mistral => self.mistral_key.is_some(),
            BackendKind::Ollama => self.ollama_model.is_some(),
            BackendKind::Offline => self.offline,
            BackendKind::Fallback => true,
        }
    }

    /// Available backends in priority order. Always ends with `Fallback`.
    pub fn available(&self) -> Vec<BackendKind> {
        BackendKind::PRIORITY
            .into_iter()
            .filter(|k| self.is_available(*k))
            .collect()
    }

    /// The preferred backend if available, else the first available by priority.
    pub fn select(&self, preference: Option<BackendKind>) -> BackendKind {
        if let Some(preferred) = preference {
            if self.is_available(preferred) {
                return preferred;
            }
            warn!(backend = %preferred, "preferred backend unavailable, using priority order");
        }
        self.available()
            .into_iter()
            .next()
            .unwrap_or(BackendKind::Fallback)
    }

    /// Select and construct a backend. A backend that cannot be constructed
    /// is skipped in favour of the next available one.
    pub fn backend(&self, preference: Option<BackendKind>) -> Backend {
        let first = self.select(preference);
        let rest = self.available().into_iter().filter(|k| *k != first);

        for kind in std::iter::once(first).chain(rest) {
            match self.build(kind) {
                Ok(backend) => {
                    info!(backend = %kind, "categorization backend selected");
                    return backend;
                }
                Err(e) => warn!(backend = %kind, error = %e, "backend could not be built"),
            }
        }
        Backend::Fallback
    }

    fn build(&self, kind: BackendKind) -> Result<Backend> {
        let missing = || TabCatalogError::config(format!("{kind} backend is not configured"));
        match kind {
            BackendKind::Gemini => {
                let key = self.gemini_key.as_deref().ok_or_else(missing)?;
                Ok(Backend::Gemini(GeminiProvider::new(&self.gemini, key)?))
            }
            BackendKind::Mistral => {
                let key = self.mistral_key.as_deref().ok_or_else(missing)?;
                Ok(Backend::Mistral(MistralProvider::new(&self.mistral, key)?))
            }
            BackendKind::Ollama => {
                let model = self.ollama_model.as_deref().ok_or_else(missing)?;
                Ok(Backend::Ollama(OllamaProvider::new(&self.ollama, model)?))
            }
            BackendKind::Offline => Ok(Backend::Offline(OfflineClassifier::new(
                self.rules.clone(),
            ))),
            BackendKind::Fallback => Ok(Backend::Fallback),
        }
    }
}

/// The runtime backend for one categorization run.
pub enum Backend {
    Gemini(GeminiProvider),
    Mistral(MistralProvider),
    Ollama(OllamaProvider),
    Offline(OfflineClassifier),
    Fallback,
}

impl Backend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Gemini(_) => BackendKind::Gemini,
            Self::Mistral(_) => BackendKind::Mistral,
            Self::Ollama(_) => BackendKind::Ollama,
            Self::Offline(_) => BackendKind::Offline,
            Self::Fallback => BackendKind::Fallback,
        }
    }

    /// The text generator behind this backend, if it has one.
    pub fn generator(&self) -> Option<&dyn TextGenerator> {
        match self {
            Self::Gemini(p) => Some(p),
            Self::Mistral(p) => Some(p),
            Self::Ollama(p) => Some(p),
            Self::Offline(_) | Self::Fallback => None,
        }
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Backend").field(&self.kind()).finish()
    }
}
