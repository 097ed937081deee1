use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, OnceLock, PoisonError},
};

use async_graphql_value::Name;

use crate::{
    resolver::{FieldResolver, Resolution, ResolverContext},
    Schema,
};

/// Intercepts the resolution of a field.
///
/// Implementations call [`Next::run`] to continue the chain, or return a resolution of their own to
/// short-circuit it.
pub trait FieldMiddleware: Send + Sync + 'static {
    fn resolve<'r>(&self, next: Next, ctx: ResolverContext<'r>) -> Resolution<'r>;
}

struct FnMiddleware<F>(F);

impl<F> FieldMiddleware for FnMiddleware<F>
where
    F: for<'r> Fn(Next, ResolverContext<'r>) -> Resolution<'r> + Send + Sync + 'static,
{
    fn resolve<'r>(&self, next: Next, ctx: ResolverContext<'r>) -> Resolution<'r> {
        (self.0)(next, ctx)
    }
}

#[derive(Clone)]
pub struct Interceptor(Arc<dyn FieldMiddleware>);

impl Interceptor {
    pub fn new(middleware: impl FieldMiddleware) -> Self {
        Interceptor(Arc::new(middleware))
    }

    pub fn from_fn<F>(f: F) -> Self
    where
        F: for<'r> Fn(Next, ResolverContext<'r>) -> Resolution<'r> + Send + Sync + 'static,
    {
        Interceptor(Arc::new(FnMiddleware(f)))
    }
}

/// Remainder of an interceptor chain, ending with the wrapped resolver.
#[derive(Clone)]
pub struct Next {
    chain: Arc<[Interceptor]>,
    index: usize,
    resolver: FieldResolver,
}

impl Next {
    pub fn run<'r>(self, ctx: ResolverContext<'r>) -> Resolution<'r> {
        match self.chain.get(self.index).cloned() {
            Some(interceptor) => {
                let next = Next {
                    index: self.index + 1,
                    ..self
                };
                interceptor.0.resolve(next, ctx)
            }
            None => self.resolver.call(ctx),
        }
    }
}

/// Wraps field resolvers with interceptor chains.
///
/// Chains are looked up by `"Type.field"` first, then by `"Type"`, and finally fall back to the global
/// list. Fields listed as excluded always keep their own resolver. The first interceptor of a chain
/// is the outermost one.
pub struct MiddlewareManager {
    global: Arc<[Interceptor]>,
    by_key: HashMap<String, Arc<[Interceptor]>>,
    excluded: HashSet<String>,
    keys_checked: OnceLock<()>,
}

impl MiddlewareManager {
    pub fn builder() -> MiddlewareManagerBuilder {
        MiddlewareManagerBuilder::default()
    }

    pub(crate) fn chain_for(&self, type_name: &str, field_name: &str) -> Option<&Arc<[Interceptor]>> {
        let field_key = format!("{type_name}.{field_name}");
        if self.excluded.contains(&field_key) {
            return None;
        }
        self.by_key
            .get(&field_key)
            .or_else(|| self.by_key.get(type_name))
            .or(Some(&self.global))
            .filter(|chain| !chain.is_empty())
    }

    /// The resolver to invoke for a field: `resolver` wrapped with the chain of the field, if any.
    pub fn wrap(&self, type_name: &str, field_name: &str, resolver: &FieldResolver) -> FieldResolver {
        match self.chain_for(type_name, field_name) {
            Some(chain) => compose(chain, resolver),
            None => resolver.clone(),
        }
    }

    pub(crate) fn warn_unknown_keys(&self, schema: &Schema) {
        self.keys_checked.get_or_init(|| {
            let keys = self.by_key.keys().chain(self.excluded.iter());
            for key in keys {
                let type_name = key.split_once('.').map_or(key.as_str(), |(type_name, _)| type_name);
                if schema.get_type(type_name).is_none() {
                    tracing::warn!("Middleware registered for '{key}' which does not refer to a known type");
                }
            }
        });
    }
}

fn compose(chain: &Arc<[Interceptor]>, resolver: &FieldResolver) -> FieldResolver {
    let next = Next {
        chain: chain.clone(),
        index: 0,
        resolver: resolver.clone(),
    };
    FieldResolver::new(move |ctx| next.clone().run(ctx))
}

/// Chains of a [`MiddlewareManager`] composed during one execution, once per field and base
/// resolver.
///
/// Dropped with the execution, so resolvers given with a request do not outlive it.
pub(crate) struct ComposedChains {
    manager: Arc<MiddlewareManager>,
    composed: Mutex<HashMap<(Name, Name, usize), (FieldResolver, FieldResolver)>>,
}

impl ComposedChains {
    pub(crate) fn new(manager: Arc<MiddlewareManager>) -> Self {
        ComposedChains {
            manager,
            composed: Mutex::default(),
        }
    }

    pub(crate) fn wrap(&self, type_name: &Name, field_name: &Name, resolver: &FieldResolver) -> FieldResolver {
        let Some(chain) = self.manager.chain_for(type_name, field_name) else {
            return resolver.clone();
        };

        let key = (type_name.clone(), field_name.clone(), resolver.id());
        let mut composed = self.composed.lock().unwrap_or_else(PoisonError::into_inner);
        // The base resolver is kept alongside so its address is never reused while cached.
        let (_, wrapped) = composed
            .entry(key)
            .or_insert_with(|| (resolver.clone(), compose(chain, resolver)));
        wrapped.clone()
    }
}

impl From<Vec<Interceptor>> for MiddlewareManager {
    fn from(interceptors: Vec<Interceptor>) -> Self {
        MiddlewareManager::builder().global(interceptors).build()
    }
}

#[derive(Default)]
pub struct MiddlewareManagerBuilder {
    global: Vec<Interceptor>,
    by_key: HashMap<String, Vec<Interceptor>>,
    excluded: HashSet<String>,
}

impl MiddlewareManagerBuilder {
    /// Interceptors applied to every field without a more specific entry.
    #[must_use]
    pub fn global(mut self, interceptors: impl IntoIterator<Item = Interceptor>) -> Self {
        self.global.extend(interceptors);
        self
    }

    /// Interceptors for a `"Type"` or a `"Type.field"` key.
    #[must_use]
    pub fn for_key(mut self, key: impl Into<String>, interceptors: impl IntoIterator<Item = Interceptor>) -> Self {
        self.by_key.entry(key.into()).or_default().extend(interceptors);
        self
    }

    /// Leave a `"Type.field"` unwrapped.
    #[must_use]
    pub fn exclude(mut self, key: impl Into<String>) -> Self {
        self.excluded.insert(key.into());
        self
    }

    pub fn build(self) -> MiddlewareManager {
        MiddlewareManager {
            global: self.global.into(),
            by_key: self
                .by_key
                .into_iter()
                .map(|(key, chain)| (key, chain.into()))
                .collect(),
            excluded: self.excluded,
            keys_checked: OnceLock::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passthrough() -> Interceptor {
        Interceptor::from_fn(|next, ctx| next.run(ctx))
    }

    fn manager() -> MiddlewareManager {
        MiddlewareManager::builder()
            .global([passthrough()])
            .for_key("User", [passthrough(), passthrough()])
            .for_key("User.name", [passthrough(), passthrough(), passthrough()])
            .exclude("User.id")
            .build()
    }

    #[test]
    fn key_lookup_order() {
        let manager = manager();
        let chain_len = |ty: &str, field: &str| manager.chain_for(ty, field).map(|chain| chain.len());

        assert_eq!(chain_len("User", "name"), Some(3));
        assert_eq!(chain_len("User", "email"), Some(2));
        assert_eq!(chain_len("Post", "title"), Some(1));
        assert_eq!(chain_len("User", "id"), None);
    }

    #[test]
    fn empty_manager_keeps_resolvers() {
        let manager = MiddlewareManager::from(Vec::new());
        let resolver = FieldResolver::default_resolver();
        let wrapped = manager.wrap("Query", "a", &resolver);
        assert_eq!(wrapped.id(), resolver.id());
    }

    #[test]
    fn composition_is_memoized_per_execution() {
        let chains = ComposedChains::new(Arc::new(manager()));
        let (user, name) = (Name::new("User"), Name::new("name"));
        let resolver = FieldResolver::default_resolver();

        let first = chains.wrap(&user, &name, &resolver);
        let second = chains.wrap(&user, &name, &resolver);
        assert_ne!(first.id(), resolver.id());
        assert_eq!(first.id(), second.id());

        let other = FieldResolver::new(|_| Resolution::null());
        assert_ne!(chains.wrap(&user, &name, &other).id(), first.id());
        assert_eq!(chains.wrap(&user, &Name::new("id"), &resolver).id(), resolver.id());

        let fresh = ComposedChains::new(chains.manager.clone());
        assert_ne!(fresh.wrap(&user, &name, &resolver).id(), first.id());
    }

    #[test]
    fn composed_resolvers_are_released_with_the_execution() {
        let manager = Arc::new(manager());
        let marker = Arc::new(());
        let resolver = {
            let marker = marker.clone();
            FieldResolver::new(move |_| {
                let _ = &marker;
                Resolution::null()
            })
        };

        let chains = ComposedChains::new(manager.clone());
        chains.wrap(&Name::new("User"), &Name::new("name"), &resolver);
        drop((chains, resolver));

        assert_eq!(Arc::strong_count(&marker), 1);
        assert_eq!(Arc::strong_count(&manager), 1);
    }
}
