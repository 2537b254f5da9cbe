//! Hooks that observe or rewrite queries before they are executed.
//!
//! A [`Plugin`] registers at most one [`QueryHook`] per query form. When a job executes a
//! query, the hooks registered for its form are chained in registration order: the first plugin
//! is the outermost one. Each hook receives the query and a [`Next`] continuation. It may rewrite
//! the query before calling [`Next::run`], transform the response afterwards, or answer on its
//! own without calling the continuation at all.

use crate::{BackendResponse, JobError};
use async_trait::async_trait;
use sparql_proxy_query::spargebra::Query;
use sparql_proxy_query::QueryKind;
use std::fmt;
use std::sync::Arc;

/// The query a hook operates on.
#[derive(Clone, Debug)]
pub struct QueryContext {
    /// The directive lines that precede the query body.
    pub preamble: String,
    pub query: Query,
}

#[async_trait]
pub trait QueryHook: Send + Sync {
    async fn call(
        &self,
        context: QueryContext,
        next: Next<'_>,
    ) -> Result<BackendResponse, JobError>;
}

/// Executes a query once all hooks have been passed.
#[async_trait]
pub(crate) trait Terminal: Send + Sync {
    async fn execute(&self, context: QueryContext) -> Result<BackendResponse, JobError>;
}

/// The remainder of a hook chain.
pub struct Next<'a> {
    hooks: &'a [Arc<dyn QueryHook>],
    terminal: &'a dyn Terminal,
}

impl Next<'_> {
    /// Passes `context` to the next hook, or executes it if no hook is left.
    pub async fn run(self, context: QueryContext) -> Result<BackendResponse, JobError> {
        match self.hooks.split_first() {
            Some((hook, rest)) => {
                let next = Next {
                    hooks: rest,
                    terminal: self.terminal,
                };
                hook.call(context, next).await
            }
            None => self.terminal.execute(context).await,
        }
    }
}

/// A named set of hooks, one slot per query form.
#[derive(Clone, Default)]
pub struct Plugin {
    name: String,
    select: Option<Arc<dyn QueryHook>>,
    construct: Option<Arc<dyn QueryHook>>,
    ask: Option<Arc<dyn QueryHook>>,
    describe: Option<Arc<dyn QueryHook>>,
}

impl Plugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn on_select(mut self, hook: impl QueryHook + 'static) -> Self {
        self.select = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn on_construct(mut self, hook: impl QueryHook + 'static) -> Self {
        self.construct = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn on_ask(mut self, hook: impl QueryHook + 'static) -> Self {
        self.ask = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn on_describe(mut self, hook: impl QueryHook + 'static) -> Self {
        self.describe = Some(Arc::new(hook));
        self
    }

    fn hook(&self, kind: QueryKind) -> Option<&Arc<dyn QueryHook>> {
        match kind {
            QueryKind::Select => self.select.as_ref(),
            QueryKind::Construct => self.construct.as_ref(),
            QueryKind::Ask => self.ask.as_ref(),
            QueryKind::Describe => self.describe.as_ref(),
        }
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("select", &self.select.is_some())
            .field("construct", &self.construct.is_some())
            .field("ask", &self.ask.is_some())
            .field("describe", &self.describe.is_some())
            .finish()
    }
}

/// The ordered list of registered plugins.
#[derive(Clone, Debug, Default)]
pub struct PluginChain {
    plugins: Arc<[Plugin]>,
}

impl PluginChain {
    pub fn new(plugins: Vec<Plugin>) -> Self {
        Self {
            plugins: plugins.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub(crate) async fn run(
        &self,
        context: QueryContext,
        terminal: &dyn Terminal,
    ) -> Result<BackendResponse, JobError> {
        let kind = QueryKind::of(&context.query);
        let hooks = self
            .plugins
            .iter()
            .filter_map(|plugin| plugin.hook(kind).cloned())
            .collect::<Vec<_>>();
        Next {
            hooks: &hooks,
            terminal,
        }
        .run(context)
        .await
    }
}
