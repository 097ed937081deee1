/// Default maximum of variable coercion errors reported for a single request.
pub const DEFAULT_MAX_VARIABLE_ERRORS: usize = 50;

/// Configuration of the execution engine, shared by every request executed against a schema.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Variable coercion stops once this many errors have been collected.
    pub max_variable_errors: usize,
    /// Debug mode: underlying error causes are added to the `extensions` of the errors sent to clients.
    pub expose_error_causes: bool,
    /// Executes the root fields of mutations one after the other.
    pub serial_mutations: bool,
    /// Converts a panicking resolver into a field error instead of unwinding through the executor.
    pub catch_resolver_panics: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_variable_errors: DEFAULT_MAX_VARIABLE_ERRORS,
            expose_error_causes: false,
            serial_mutations: true,
            catch_resolver_panics: true,
        }
    }
}

impl Config {
    #[must_use]
    pub fn with_max_variable_errors(mut self, max: usize) -> Self {
        self.max_variable_errors = max;
        self
    }

    #[must_use]
    pub fn with_exposed_error_causes(mut self) -> Self {
        self.expose_error_causes = true;
        self
    }
}
