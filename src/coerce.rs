//! Coercion registry.
//!
//! `COERCE <value> _name_` looks `_name_` up here while parsing. The entry
//! found is an *installer*: it receives the parser (so it can read extra
//! argument tokens), the const-eligibility of the inner expression and the
//! inner expression itself, and returns the wrapped expression.
//!
//! The registry is process-wide and guarded by a mutex. Built-in coercions
//! are installed on first use; embedders register their own before
//! parsing. Compiled expressions hold their coercions directly and never
//! consult the registry again.
//!
//! ```
//! use express_lang::{Value, coerce::{self, Coercion, CoerceError}};
//!
//! struct Shout;
//!
//! impl Coercion for Shout {
//!     fn name(&self) -> &str {
//!         "_shout_"
//!     }
//!
//!     fn coerce(&self, value: Value) -> Result<Value, CoerceError> {
//!         match value {
//!             Value::String(s) => Ok(Value::String(format!("{}!", s.to_uppercase()))),
//!             other => Err(format!("cannot shout a {}", other.type_name()).into()),
//!         }
//!     }
//! }
//!
//! coerce::register_value_coercion(Shout).unwrap();
//! let expression = express_lang::parse(br#"COERCE "hi" _shout_"#).unwrap();
//! assert_eq!(expression.calculate(b"{}").unwrap(), Value::String("HI!".into()));
//! ```

mod builtins;

use std::{
    collections::HashMap,
    sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError},
};

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::{
    ast::Expression,
    parser::{ParseError, Parser},
    value::Value,
};

pub use builtins::{CaseCoercion, DateTimeCoercion, NumberCoercion, StringCoercion, Substring};

/// Failure reported by a coercion at evaluation time.
pub type CoerceError = Box<dyn std::error::Error + Send + Sync>;

/// A value transformation applied to the result of a coerced expression.
pub trait Coercion: Send + Sync {
    /// Name shown in errors and debug output, e.g. `_datetime_`.
    fn name(&self) -> &str;

    fn coerce(&self, value: Value) -> Result<Value, CoerceError>;
}

/// Installs a coercion at a `COERCE` site.
///
/// Arguments are the parser positioned just after the coercion name, whether
/// the inner expression is const-eligible, and the inner expression. Returns
/// the updated const-eligibility and the wrapped expression.
pub type Installer = dyn for<'a> Fn(&mut Parser<'a>, bool, Expression) -> Result<(bool, Expression), ParseError>
    + Send
    + Sync;

/// Errors that can occur when registering a coercion.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid coercion name `{0}`, expected letters or digits between underscores")]
    InvalidName(String),
}

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^_[A-Za-z0-9]+_$").expect("coercion name pattern is valid"));

static REGISTRY: LazyLock<Mutex<HashMap<String, Arc<Installer>>>> =
    LazyLock::new(|| Mutex::new(builtins::installers()));

fn registry() -> MutexGuard<'static, HashMap<String, Arc<Installer>>> {
    REGISTRY.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Boxes a closure or function as an [`Installer`].
pub fn installer<F>(f: F) -> Arc<Installer>
where
    F: for<'a> Fn(&mut Parser<'a>, bool, Expression) -> Result<(bool, Expression), ParseError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// Registers (or replaces) the installer for `name`.
///
/// `name` must include its underscores, e.g. `_star_`.
pub fn register_coercion<F>(name: &str, installer: F) -> Result<(), RegistryError>
where
    F: for<'a> Fn(&mut Parser<'a>, bool, Expression) -> Result<(bool, Expression), ParseError>
        + Send
        + Sync
        + 'static,
{
    register_installer(name, Arc::new(installer))
}

/// Registers a coercion that takes no arguments and keeps the
/// const-eligibility of the expression it wraps.
pub fn register_value_coercion<C>(coercion: C) -> Result<(), RegistryError>
where
    C: Coercion + 'static,
{
    let coercion: Arc<dyn Coercion> = Arc::new(coercion);
    let name = coercion.name().to_string();
    register_installer(&name, wrap_with(coercion))
}

pub fn register_installer(name: &str, installer: Arc<Installer>) -> Result<(), RegistryError> {
    if !NAME_RE.is_match(name) {
        return Err(RegistryError::InvalidName(name.to_string()));
    }

    let replaced = registry().insert(name.to_string(), installer).is_some();
    debug!(name, replaced, "registered coercion");
    Ok(())
}

/// Installer shared by every argument-less coercion.
fn wrap_with(coercion: Arc<dyn Coercion>) -> Arc<Installer> {
    installer(move |_parser, const_eligible, inner| {
        Ok((
            const_eligible,
            Expression::coerce(inner, Arc::clone(&coercion), const_eligible),
        ))
    })
}

/// Finds the installer registered under `name`.
///
/// The registry lock is released before returning, so installers are free
/// to parse nested `COERCE` sites.
pub fn lookup_coercion(name: &str) -> Option<Arc<Installer>> {
    let found = registry().get(name).cloned();
    if found.is_none() {
        debug!(name, "unknown coercion");
    }
    found
}

/// Names currently registered, sorted.
pub fn registered_coercions() -> Vec<String> {
    let mut names: Vec<String> = registry().keys().cloned().collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_registered() {
        let names = registered_coercions();
        for name in ["_datetime_", "_lowercase_", "_uppercase_", "_title_", "_string_", "_number_", "_substr_"] {
            assert!(names.iter().any(|n| n == name), "missing {}", name);
        }
    }

    #[test]
    fn test_name_pattern() {
        assert!(NAME_RE.is_match("_datetime_"));
        assert!(NAME_RE.is_match("_v2_"));
        assert!(!NAME_RE.is_match("_date_time_"));
        assert!(!NAME_RE.is_match("datetime"));
    }

    #[test]
    fn test_rejects_names_without_underscores() {
        let result = register_coercion("star", |_, c, e| Ok((c, e)));
        assert!(matches!(result, Err(RegistryError::InvalidName(_))));
        assert!(lookup_coercion("star").is_none());
    }
}
