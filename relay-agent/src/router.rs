//! Category → printer routing for split bills

use std::collections::HashMap;

/// Static category routes
///
/// Routes are not checked against the registry; a route to a printer that
/// no longer exists falls back to the default when the candidate list is built.
#[derive(Debug, Clone, Default)]
pub struct CategoryRouter {
    routes: HashMap<String, String>,
}

impl CategoryRouter {
    pub fn new(routes: HashMap<String, String>) -> Self {
        Self { routes }
    }

    /// Preferred printer for `category`, `None` means "use the default"
    pub fn resolve(&self, category: &str) -> Option<&str> {
        self.routes.get(category).map(String::as_str)
    }
}
