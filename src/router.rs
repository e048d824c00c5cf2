//! Radix-tree request router.
//!
//! One [`matchit`] tree per HTTP method. A lookup either finds an endpoint,
//! or tells the dispatcher whether the path exists under another method
//! (405) or not at all (404).

use std::collections::HashMap;

use http::Method;
use matchit::Router as MatchitRouter;

use crate::error::Error;
use crate::handler::Endpoint;

pub(crate) enum Lookup {
    Found(Endpoint, Vec<(String, String)>),
    /// The path is registered, but not for this method. Sorted by name.
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

#[derive(Default)]
pub(crate) struct Router {
    routes: HashMap<Method, MatchitRouter<Endpoint>>,
}

impl Router {
    /// Registers `endpoint` for a normalized path pattern.
    ///
    /// Fails when the pattern is malformed or overlaps an existing route for
    /// the same method.
    pub(crate) fn insert(
        &mut self,
        method: Method,
        path: &str,
        endpoint: Endpoint,
    ) -> Result<(), Error> {
        self.routes
            .entry(method.clone())
            .or_default()
            .insert(path, endpoint)
            .map_err(|e| Error::Route { method, path: path.to_owned(), reason: e.to_string() })
    }

    pub(crate) fn lookup(&self, method: &Method, path: &str) -> Lookup {
        if let Some(matched) = self.routes.get(method).and_then(|tree| tree.at(path).ok()) {
            let params = matched.params.iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect();
            return Lookup::Found(matched.value.clone(), params);
        }

        let mut allowed: Vec<Method> = self.routes.iter()
            .filter(|(m, tree)| *m != method && tree.at(path).is_ok())
            .map(|(m, _)| m.clone())
            .collect();

        if allowed.is_empty() {
            Lookup::NotFound
        } else {
            allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            Lookup::MethodNotAllowed(allowed)
        }
    }
}
