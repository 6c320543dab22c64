//! The bound join operator
//!
//! A bound join evaluates a BGP once per upstream solution, but instead of
//! issuing one remote request per solution it batches them: up to
//! [`BIND_JOIN_BUFFER_SIZE`] inputs are collected into a bucket, the target
//! BGP is instantiated and rewritten once per input, and the whole bucket is
//! dispatched as a single union-of-BGPs query. The rewriting appends `_k`
//! (the input's position in the bucket) to every variable name, so the
//! remote's answers identify the input they belong to; the operator strips
//! the suffix back off and merges each answer with its originating input.
//!
//! Outputs are unordered: answers interleave freely across buckets and
//! within a bucket. Completion is signalled once, after the source has ended
//! and every dispatched bucket has drained. The first error - upstream or
//! remote - terminates the output.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use fedgraph_core::{Bgp, Bindings, Term, TriplePattern, Variable};

use crate::error::FederateError;
use crate::graph::{BindingsStream, Graph, QueryOptions};

/// Number of input bindings batched into one union dispatch
///
/// This value is part of the wire contract with cooperating remotes: the
/// rewriting suffixes a remote may observe are exactly `_0` through
/// `_(BIND_JOIN_BUFFER_SIZE - 1)`.
pub const BIND_JOIN_BUFFER_SIZE: usize = 15;

/// Bound join tuning knobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundJoinConfig {
    /// Bucket capacity: how many inputs are batched per union dispatch.
    ///
    /// This single value also bounds the rewriting keys recognized while
    /// demultiplexing, so batching and key recovery cannot drift apart.
    /// Changing it changes the variable suffixes the remote observes.
    pub bucket_size: usize,
    /// Maximum number of dispatched buckets in flight at once.
    ///
    /// The operator stops consuming its source while at the cap, bounding
    /// memory and outstanding remote requests under a slow endpoint.
    pub max_in_flight: usize,
}

impl Default for BoundJoinConfig {
    fn default() -> Self {
        Self {
            bucket_size: BIND_JOIN_BUFFER_SIZE,
            max_in_flight: 4,
        }
    }
}

/// Streaming bound join of upstream solutions with a BGP over a graph
///
/// Built with a graph, the BGP to join against, and pass-through options;
/// [`BoundJoin::apply`] consumes the upstream bindings stream and returns
/// the joined output stream. Must be applied from within a Tokio runtime.
pub struct BoundJoin {
    graph: Arc<dyn Graph>,
    bgp: Arc<Bgp>,
    options: QueryOptions,
    config: BoundJoinConfig,
}

impl fmt::Debug for BoundJoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundJoin")
            .field("bgp", &self.bgp)
            .field("options", &self.options)
            .field("config", &self.config)
            .finish()
    }
}

impl BoundJoin {
    /// Creates a bound join with the default configuration
    pub fn new(graph: Arc<dyn Graph>, bgp: Bgp, options: QueryOptions) -> Self {
        Self {
            graph,
            bgp: Arc::new(bgp),
            options,
            config: BoundJoinConfig::default(),
        }
    }

    /// Replaces the configuration
    pub fn with_config(mut self, config: BoundJoinConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs the operator over `source`, returning the output stream
    ///
    /// Dropping the returned stream cancels the operator: the source and
    /// every in-flight dispatch are released, and nothing further is
    /// delivered.
    pub fn apply(self, source: BindingsStream) -> BindingsStream {
        let capacity = self.config.bucket_size.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        tokio::spawn(drive(
            self.graph,
            self.bgp,
            self.options,
            self.config,
            source,
            tx,
        ));
        Box::pin(ReceiverStream::new(rx))
    }
}

type BatchFuture = Pin<Box<dyn Future<Output = Result<(), FederateError>> + Send>>;

/// Driver loop: buffers the source into buckets, keeps up to
/// `max_in_flight` buckets running, and owns the terminal transitions.
///
/// The loop is the operator's state machine. `draining` distinguishes
/// "source still open" from "source done, buckets landing"; completion is
/// the return that closes the output channel, and it is reached exactly
/// once, when draining with nothing in flight. Any error ends the loop
/// after forwarding a single terminal `Err`.
async fn drive(
    graph: Arc<dyn Graph>,
    bgp: Arc<Bgp>,
    options: QueryOptions,
    config: BoundJoinConfig,
    mut source: BindingsStream,
    tx: mpsc::Sender<Result<Bindings, FederateError>>,
) {
    let bucket_size = config.bucket_size.max(1);
    let max_in_flight = config.max_in_flight.max(1);
    let mut bucket: Vec<Bindings> = Vec::with_capacity(bucket_size);
    let mut in_flight: FuturesUnordered<BatchFuture> = FuturesUnordered::new();
    let mut draining = false;

    loop {
        if draining && in_flight.is_empty() {
            debug!("bound join complete");
            return;
        }

        tokio::select! {
            _ = tx.closed() => {
                debug!("bound join cancelled by downstream");
                return;
            }
            Some(finished) = in_flight.next(), if !in_flight.is_empty() => {
                match finished {
                    Ok(()) => {}
                    Err(FederateError::Cancelled) => return,
                    Err(err) => {
                        warn!("bound join batch failed: {}", err);
                        let _ = tx.send(Err(err)).await;
                        return;
                    }
                }
            }
            next = source.next(), if !draining && in_flight.len() < max_in_flight => {
                match next {
                    Some(Ok(binding)) => {
                        bucket.push(binding);
                        if bucket.len() >= bucket_size {
                            let batch =
                                std::mem::replace(&mut bucket, Vec::with_capacity(bucket_size));
                            in_flight.push(Box::pin(run_batch(
                                Arc::clone(&graph),
                                Arc::clone(&bgp),
                                options.clone(),
                                batch,
                                bucket_size,
                                tx.clone(),
                            )));
                        }
                    }
                    Some(Err(err)) => {
                        warn!("bound join source failed: {}", err);
                        let _ = tx.send(Err(err)).await;
                        return;
                    }
                    None => {
                        draining = true;
                        if !bucket.is_empty() {
                            let batch = std::mem::take(&mut bucket);
                            in_flight.push(Box::pin(run_batch(
                                Arc::clone(&graph),
                                Arc::clone(&bgp),
                                options.clone(),
                                batch,
                                bucket_size,
                                tx.clone(),
                            )));
                        }
                    }
                }
            }
            else => return,
        }
    }
}

/// Evaluates one bucket and forwards its outputs
///
/// A bucket holding a single empty binding is the first join of a pipeline:
/// nothing can be substituted, so the BGP is evaluated directly and the
/// answers are forwarded untouched. Every other bucket goes through the
/// rewriting path. The bucket itself doubles as the rewriting table - the
/// key assigned to an input is its position - and is released when the
/// batch future resolves.
async fn run_batch(
    graph: Arc<dyn Graph>,
    bgp: Arc<Bgp>,
    options: QueryOptions,
    bucket: Vec<Bindings>,
    key_bound: usize,
    tx: mpsc::Sender<Result<Bindings, FederateError>>,
) -> Result<(), FederateError> {
    let fast_path = bucket.len() == 1 && bucket[0].is_empty();
    let mut results = if fast_path {
        debug!("evaluating singleton empty bucket directly");
        graph.eval_bgp(&bgp, &options)
    } else {
        let rewritten: Vec<Bgp> = bucket
            .iter()
            .enumerate()
            .map(|(key, input)| rewrite_bgp(&bgp, input, key))
            .collect();
        debug!("dispatching union of {} bound patterns", rewritten.len());
        graph.eval_union(&rewritten, &options)
    };

    while let Some(item) = results.next().await {
        let solution = item?;
        let output = if fast_path {
            solution
        } else {
            merge_solution(solution, &bucket, key_bound)
        };
        if tx.send(Ok(output)).await.is_err() {
            // Downstream is gone; stop draining the remote.
            return Err(FederateError::Cancelled);
        }
    }
    Ok(())
}

/// Instantiates `bgp` under `input` and tags every remaining variable with
/// the bucket key
fn rewrite_bgp(bgp: &[TriplePattern], input: &Bindings, key: usize) -> Bgp {
    bgp.iter()
        .map(|pattern| rewrite_pattern(&input.bound(pattern), key))
        .collect()
}

fn rewrite_pattern(pattern: &TriplePattern, key: usize) -> TriplePattern {
    TriplePattern::new(
        rewrite_term(&pattern.subject, key),
        rewrite_term(&pattern.predicate, key),
        rewrite_term(&pattern.object, key),
    )
}

fn rewrite_term(term: &Term, key: usize) -> Term {
    match term {
        Term::Variable(variable) => Term::Variable(Variable::new_unchecked(format!(
            "{}_{}",
            variable.as_str(),
            key
        ))),
        other => other.clone(),
    }
}

/// Recovers the bucket key of a union answer and re-merges it with its
/// originating input
///
/// Answers without a recognizable key (the ground-BGP case, or a remote
/// that strips variables) are forwarded unchanged.
fn merge_solution(solution: Bindings, bucket: &[Bindings], key_bound: usize) -> Bindings {
    match find_key(&solution, key_bound) {
        Some(key) => {
            let reverted = revert_binding(&solution, key);
            match bucket.get(key) {
                Some(input) => reverted.union(input),
                None => reverted,
            }
        }
        None => solution,
    }
}

/// Scans a solution for a rewriting suffix and returns its key
///
/// The first variable carrying a `_k` suffix with `k` below `bound` wins.
/// A solution mixing keys cannot arise from a well-formed union answer, so
/// no attempt is made to detect one. Variables that ended with such a
/// suffix before rewriting are misidentified here - inputs are expected not
/// to use `_<digit>`-suffixed names.
fn find_key(solution: &Bindings, bound: usize) -> Option<usize> {
    for variable in solution.variables() {
        for key in 0..bound {
            if variable.ends_with(&format!("_{}", key)) {
                return Some(key);
            }
        }
    }
    None
}

/// Strips the `_key` rewriting suffix from every variable of a solution
///
/// The truncation point is the *first* occurrence of the suffix token in
/// the name, so a user variable legitimately containing `_<key>` mid-name
/// loses its tail. Known limitation, kept for compatibility with the wire
/// convention.
fn revert_binding(solution: &Bindings, key: usize) -> Bindings {
    let suffix = format!("_{}", key);
    let mut reverted = solution.empty();
    for (variable, term) in solution.iter() {
        if variable.ends_with(&suffix) {
            if let Some(cut) = variable.find(&suffix) {
                reverted.set(&variable[..cut], term.clone());
                continue;
            }
        }
        reverted.set(variable, term.clone());
    }
    reverted
}
