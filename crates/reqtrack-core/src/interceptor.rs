//! Named interceptor registry
//!
//! Interceptor crates register a factory under a fixed name at link time;
//! the host then builds instances from configuration by that name alone.
//!
//! # Registering
//!
//! ```rust,ignore
//! fn build(config: serde_json::Value) -> Result<Box<dyn MiddlewareLayer>, InterceptorError> {
//!     let config: MyConfig = serde_json::from_value(config)
//!         .map_err(|e| InterceptorError::invalid_config("mine", e))?;
//!     Ok(Box::new(MyLayer::new(config)))
//! }
//!
//! reqtrack_core::register_interceptor!("mine", build);
//! ```
//!
//! # Building
//!
//! Each call to [`build`] runs the factory again, so every configuration
//! load gets a fresh instance.

use crate::middleware::MiddlewareLayer;

/// Factory that turns a configuration section into a middleware instance.
pub type InterceptorFactory =
    fn(serde_json::Value) -> Result<Box<dyn MiddlewareLayer>, InterceptorError>;

/// Error type for interceptor lookup and construction.
#[derive(Debug, thiserror::Error)]
pub enum InterceptorError {
    /// No interceptor is registered under this name.
    #[error("no interceptor registered as `{0}`")]
    NotFound(String),

    /// The configuration section could not be turned into an instance.
    #[error("invalid configuration for interceptor `{name}`: {message}")]
    InvalidConfig {
        /// Interceptor name
        name: String,
        /// What was wrong with the configuration
        message: String,
    },
}

impl InterceptorError {
    /// Build an [`InterceptorError::InvalidConfig`] from any displayable error.
    pub fn invalid_config(name: &str, err: impl std::fmt::Display) -> Self {
        Self::InvalidConfig {
            name: name.to_string(),
            message: err.to_string(),
        }
    }
}

/// A named interceptor factory, collected with [`inventory`].
pub struct InterceptorRegistration {
    name: &'static str,
    factory: InterceptorFactory,
}

impl InterceptorRegistration {
    /// Create a registration entry.
    pub const fn new(name: &'static str, factory: InterceptorFactory) -> Self {
        Self { name, factory }
    }

    /// The name the host looks this interceptor up by.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Run the factory.
    pub fn create(
        &self,
        config: serde_json::Value,
    ) -> Result<Box<dyn MiddlewareLayer>, InterceptorError> {
        (self.factory)(config)
    }
}

inventory::collect!(InterceptorRegistration);

/// Register an interceptor factory under a fixed name.
#[macro_export]
macro_rules! register_interceptor {
    ($name:expr, $factory:expr) => {
        $crate::inventory::submit! {
            $crate::interceptor::InterceptorRegistration::new($name, $factory)
        }
    };
}

/// Find the registration for `name`.
///
/// If two crates register the same name, which one wins is unspecified.
pub fn lookup(name: &str) -> Option<&'static InterceptorRegistration> {
    inventory::iter::<InterceptorRegistration>
        .into_iter()
        .find(|registration| registration.name == name)
}

/// Names of every registered interceptor, sorted.
pub fn registered_names() -> Vec<&'static str> {
    let mut names: Vec<_> = inventory::iter::<InterceptorRegistration>
        .into_iter()
        .map(|registration| registration.name)
        .collect();
    names.sort_unstable();
    names.dedup();
    names
}

/// Build a fresh instance of the interceptor registered as `name`.
pub fn build(
    name: &str,
    config: serde_json::Value,
) -> Result<Box<dyn MiddlewareLayer>, InterceptorError> {
    let registration = lookup(name).ok_or_else(|| InterceptorError::NotFound(name.to_string()))?;
    tracing::debug!(interceptor = name, "Building interceptor");
    registration.create(config)
}
