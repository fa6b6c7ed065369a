//! Provider dispatch table
//!
//! Maps each (provider, kind, verb) triple to a concrete handler at
//! command-execution time. Unsupported combinations are a distinguishable
//! error, never a silent no-op. Every handler performs, in order: optional
//! name lookup, the provider call, optional poll-to-completion, result
//! assembly.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use crate::clients::ClientFactory;
use crate::config::Config;
use crate::error::{CoreError, Result};
use crate::handlers;
use crate::op::{OpOutput, OpParams, Provider, ResourceKind, Verb};
use crate::poll::{CancelToken, PollSettings, ProgressCallback};

/// Everything a handler needs for one operation.
pub struct OpContext {
    pub config: Config,
    pub params: OpParams,
    pub poll: PollSettings,
    /// Whether to block on long-running operations. Dependency-ordering
    /// waits (node group before cluster) ignore this; convenience waits
    /// honor it.
    pub wait: bool,
    pub cancel: CancelToken,
    pub progress: Option<ProgressCallback>,
}

impl OpContext {
    pub fn new(config: Config, params: OpParams) -> Self {
        Self {
            config,
            params,
            poll: PollSettings::default(),
            wait: true,
            cancel: CancelToken::none(),
            progress: None,
        }
    }

    pub fn with_poll(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn factory(&self) -> ClientFactory<'_> {
        ClientFactory::new(&self.config)
    }
}

/// Boxed future returned by handlers.
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<OpOutput>> + Send + 'a>>;

/// A handler is a pure mapping from context to result.
pub type Handler = for<'a> fn(&'a OpContext) -> HandlerFuture<'a>;

/// Lookup table from (provider, kind, verb) to handler.
pub struct DispatchTable {
    handlers: HashMap<(Provider, ResourceKind, Verb), Handler>,
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchTable {
    /// An empty table; see [`DispatchTable::builtin`] for the real one.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, provider: Provider, kind: ResourceKind, verb: Verb, handler: Handler) {
        self.handlers.insert((provider, kind, verb), handler);
    }

    pub fn resolve(&self, provider: Provider, kind: ResourceKind, verb: Verb) -> Result<Handler> {
        self.handlers
            .get(&(provider, kind, verb))
            .copied()
            .ok_or(CoreError::Unsupported {
                provider,
                kind,
                verb,
            })
    }

    /// Resolve and invoke in one step.
    pub async fn execute(
        &self,
        provider: Provider,
        kind: ResourceKind,
        verb: Verb,
        ctx: &OpContext,
    ) -> Result<OpOutput> {
        let handler = self.resolve(provider, kind, verb)?;
        handler(ctx).await
    }

    /// All registered triples, for help output and coverage tests.
    pub fn supported(&self) -> impl Iterator<Item = (Provider, ResourceKind, Verb)> + '_ {
        self.handlers.keys().copied()
    }

    /// The full table for the three shipping providers.
    pub fn builtin() -> Self {
        use Provider::*;
        use ResourceKind::*;
        use Verb::*;

        let mut table = Self::new();

        // DigitalOcean
        table.register(Do, Vm, Create, handlers::digitalocean::create_vm);
        table.register(Do, Vm, Status, handlers::digitalocean::status_vm);
        table.register(Do, Vm, Delete, handlers::digitalocean::delete_vm);
        table.register(Do, Cluster, Create, handlers::digitalocean::create_cluster);
        table.register(Do, Cluster, Status, handlers::digitalocean::status_cluster);
        table.register(Do, Cluster, Delete, handlers::digitalocean::delete_cluster);
        table.register(Do, Bucket, Create, handlers::digitalocean::create_bucket);
        table.register(Do, Bucket, Status, handlers::digitalocean::status_bucket);
        table.register(Do, Bucket, Delete, handlers::digitalocean::delete_bucket);
        table.register(Do, Database, Create, handlers::digitalocean::create_database);
        table.register(Do, Database, Status, handlers::digitalocean::status_database);
        table.register(Do, Database, Delete, handlers::digitalocean::delete_database);

        // AWS
        table.register(Aws, Vm, Create, handlers::aws::create_vm);
        table.register(Aws, Vm, Status, handlers::aws::status_vm);
        table.register(Aws, Vm, Delete, handlers::aws::delete_vm);
        table.register(Aws, Cluster, Create, handlers::aws::create_cluster);
        table.register(Aws, Cluster, Status, handlers::aws::status_cluster);
        table.register(Aws, Cluster, Delete, handlers::aws::delete_cluster);
        table.register(Aws, Bucket, Create, handlers::aws::create_bucket);
        table.register(Aws, Bucket, Status, handlers::aws::status_bucket);
        table.register(Aws, Bucket, Delete, handlers::aws::delete_bucket);
        table.register(Aws, Database, Create, handlers::aws::create_database);
        table.register(Aws, Database, Status, handlers::aws::status_database);
        table.register(Aws, Database, Delete, handlers::aws::delete_database);

        // GCP
        table.register(Gcp, Vm, Create, handlers::gcp::create_vm);
        table.register(Gcp, Vm, Status, handlers::gcp::status_vm);
        table.register(Gcp, Vm, Delete, handlers::gcp::delete_vm);
        table.register(Gcp, Cluster, Create, handlers::gcp::create_cluster);
        table.register(Gcp, Cluster, Status, handlers::gcp::status_cluster);
        table.register(Gcp, Cluster, Delete, handlers::gcp::delete_cluster);
        table.register(Gcp, Bucket, Create, handlers::gcp::create_bucket);
        table.register(Gcp, Bucket, Status, handlers::gcp::status_bucket);
        table.register(Gcp, Bucket, Delete, handlers::gcp::delete_bucket);
        table.register(Gcp, Database, Create, handlers::gcp::create_database);
        table.register(Gcp, Database, Status, handlers::gcp::status_database);
        table.register(Gcp, Database, Delete, handlers::gcp::delete_database);

        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROVIDERS: [Provider; 3] = [Provider::Do, Provider::Aws, Provider::Gcp];
    const KINDS: [ResourceKind; 4] = [
        ResourceKind::Vm,
        ResourceKind::Cluster,
        ResourceKind::Bucket,
        ResourceKind::Database,
    ];
    const VERBS: [Verb; 3] = [Verb::Create, Verb::Status, Verb::Delete];

    #[test]
    fn builtin_covers_the_full_matrix() {
        let table = DispatchTable::builtin();
        for provider in PROVIDERS {
            for kind in KINDS {
                for verb in VERBS {
                    assert!(
                        table.resolve(provider, kind, verb).is_ok(),
                        "missing handler for {provider} {kind} {verb}"
                    );
                }
            }
        }
        assert_eq!(table.supported().count(), 36);
    }

    #[test]
    fn unregistered_triple_is_unsupported_not_a_crash() {
        // A table that never registered a GCP database status handler.
        let mut table = DispatchTable::new();
        table.register(
            Provider::Gcp,
            ResourceKind::Database,
            Verb::Create,
            handlers::gcp::create_database,
        );

        let err = table
            .resolve(Provider::Gcp, ResourceKind::Database, Verb::Status)
            .unwrap_err();
        assert!(err.is_unsupported());
        assert!(err.to_string().contains("not supported"));
    }

    #[tokio::test]
    async fn execute_surfaces_unsupported() {
        let table = DispatchTable::new();
        let ctx = OpContext::new(Config::default(), OpParams::new());
        let err = table
            .execute(Provider::Aws, ResourceKind::Bucket, Verb::Status, &ctx)
            .await
            .unwrap_err();
        assert!(err.is_unsupported());
    }
}
