//! Environment-driven tunables.
//!
//! Knobs that are not worth a public API parameter are exposed as static
//! parameters initialized from environment variables on first access.

use once_cell::sync::OnceCell;
use std::str::FromStr;

/// A global parameter read once from an environment variable, falling back to
/// a built-in default when the variable is unset or unparsable.
pub struct EnvParam<T: 'static> {
    value: OnceCell<T>,
    env: &'static str,
    default: &'static str,
}

impl<T> EnvParam<T> {
    pub const fn new(env: &'static str, default: &'static str) -> EnvParam<T> {
        EnvParam {
            value: OnceCell::new(),
            env,
            default,
        }
    }
}

impl<T: FromStr + Copy> EnvParam<T> {
    /// Returns the value of the parameter, reading the environment variable
    /// on the first call.
    pub fn get(&self) -> T {
        *self.value.get_or_init(|| match std::env::var(self.env) {
            Ok(raw) => match T::from_str(&raw) {
                Ok(value) => value,
                Err(_) => {
                    eprintln!(
                        "[{}] could not parse value {:?}, using default {:?}",
                        self.env, raw, self.default
                    );
                    self.parse_default()
                }
            },
            Err(_) => self.parse_default(),
        })
    }

    fn parse_default(&self) -> T {
        match T::from_str(self.default) {
            Ok(v) => v,
            Err(_) => panic!("[{}] invalid default value {:?}", self.env, self.default),
        }
    }
}

/// Memory cap, in megabytes, for the novelty heuristic's tuple table.
pub static NOVELTY_MAX_MB: EnvParam<usize> = EnvParam::new("POLARIS_NOVELTY_MAX_MB", "600");

/// When set, search engines report bounds, restarts and downgrades on stderr.
pub static TRACE_SEARCH: EnvParam<bool> = EnvParam::new("POLARIS_TRACE_SEARCH", "false");

#[cfg(test)]
mod tests {
    use super::*;

    static UNSET: EnvParam<u32> = EnvParam::new("POLARIS_TEST_SURELY_UNSET", "42");

    #[test]
    fn default_when_unset() {
        assert_eq!(UNSET.get(), 42);
    }
}
