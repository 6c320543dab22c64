//! End-to-end scenarios for the bound join operator

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::{stream, StreamExt};
use tokio::sync::oneshot;
use tokio::time::{sleep, Duration};

use fedgraph_core::{Bgp, Bindings, NamedNode, Term, Triple, TriplePattern, Variable};
use fedgraph_federate::{
    BindingsStream, BoundJoin, BoundJoinConfig, FederateError, Graph, MemoryGraph, QueryOptions,
    BIND_JOIN_BUFFER_SIZE,
};

const KNOWS: &str = "http://example.org/knows";

fn nn(iri: &str) -> Term {
    Term::NamedNode(NamedNode::new_unchecked(iri))
}

fn var(name: &str) -> Term {
    Term::Variable(Variable::new_unchecked(name))
}

fn triple(s: &str, p: &str, o: &str) -> Triple {
    Triple::new(nn(s), nn(p), nn(o))
}

fn binding(pairs: &[(&str, &str)]) -> Bindings {
    pairs
        .iter()
        .map(|(name, iri)| ((*name).to_string(), nn(iri)))
        .collect()
}

fn knows_pattern() -> Bgp {
    vec![TriplePattern::new(var("s"), nn(KNOWS), var("o"))]
}

fn source_of(bindings: Vec<Bindings>) -> BindingsStream {
    Box::pin(stream::iter(bindings.into_iter().map(Ok)))
}

async fn drain(mut output: BindingsStream) -> Vec<Result<Bindings, FederateError>> {
    let mut items = Vec::new();
    while let Some(item) = output.next().await {
        items.push(item);
    }
    items
}

fn iri(bindings: &Bindings, name: &str) -> String {
    match bindings.get(name) {
        Some(Term::NamedNode(node)) => node.as_str().to_string(),
        other => panic!("expected an IRI bound to ?{}, got {:?}", name, other),
    }
}

/// A graph that records every dispatch it receives
struct CountingGraph {
    inner: MemoryGraph,
    bgp_calls: AtomicUsize,
    unions: Mutex<Vec<Vec<Bgp>>>,
}

impl CountingGraph {
    fn new(inner: MemoryGraph) -> Self {
        Self {
            inner,
            bgp_calls: AtomicUsize::new(0),
            unions: Mutex::new(Vec::new()),
        }
    }

    fn union_sizes(&self) -> Vec<usize> {
        self.unions.lock().unwrap().iter().map(Vec::len).collect()
    }
}

#[async_trait]
impl Graph for CountingGraph {
    fn eval_bgp(&self, bgp: &[TriplePattern], options: &QueryOptions) -> BindingsStream {
        self.bgp_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.eval_bgp(bgp, options)
    }

    fn eval_union(&self, bgps: &[Bgp], options: &QueryOptions) -> BindingsStream {
        self.unions.lock().unwrap().push(bgps.to_vec());
        self.inner.eval_union(bgps, options)
    }

    async fn insert(&self, triple: &Triple) -> Result<(), FederateError> {
        self.inner.insert(triple).await
    }

    async fn delete(&self, triple: &Triple) -> Result<(), FederateError> {
        self.inner.delete(triple).await
    }
}

/// A graph whose union dispatches return scripted results
struct ScriptedGraph {
    calls: AtomicUsize,
    script: Mutex<Vec<Vec<Result<Bindings, FederateError>>>>,
}

impl ScriptedGraph {
    fn new(script: Vec<Vec<Result<Bindings, FederateError>>>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            script: Mutex::new(script),
        }
    }
}

#[async_trait]
impl Graph for ScriptedGraph {
    fn eval_bgp(&self, _bgp: &[TriplePattern], _options: &QueryOptions) -> BindingsStream {
        Box::pin(stream::empty())
    }

    fn eval_union(&self, _bgps: &[Bgp], _options: &QueryOptions) -> BindingsStream {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        let results = if script.is_empty() {
            Vec::new()
        } else {
            script.remove(0)
        };
        Box::pin(stream::iter(results))
    }

    async fn insert(&self, _triple: &Triple) -> Result<(), FederateError> {
        Err(FederateError::Write("scripted graph is read-only".into()))
    }

    async fn delete(&self, _triple: &Triple) -> Result<(), FederateError> {
        Err(FederateError::Write("scripted graph is read-only".into()))
    }
}

/// A graph whose union streams stay open until released by the test
struct GatedGraph {
    dispatched: AtomicUsize,
    releases: Mutex<Vec<oneshot::Sender<()>>>,
}

impl GatedGraph {
    fn new() -> Self {
        Self {
            dispatched: AtomicUsize::new(0),
            releases: Mutex::new(Vec::new()),
        }
    }

    /// Number of dispatches whose streams have not been released yet
    fn outstanding(&self) -> usize {
        self.releases.lock().unwrap().len()
    }

    /// Lets the oldest gated dispatch run to completion
    fn release_one(&self) {
        let sender = self.releases.lock().unwrap().remove(0);
        let _ = sender.send(());
    }
}

#[async_trait]
impl Graph for GatedGraph {
    fn eval_bgp(&self, _bgp: &[TriplePattern], _options: &QueryOptions) -> BindingsStream {
        Box::pin(stream::empty())
    }

    fn eval_union(&self, _bgps: &[Bgp], _options: &QueryOptions) -> BindingsStream {
        self.dispatched.fetch_add(1, Ordering::SeqCst);
        let (release_tx, release_rx) = oneshot::channel();
        self.releases.lock().unwrap().push(release_tx);
        Box::pin(
            stream::once(async move {
                let _ = release_rx.await;
            })
            .flat_map(|_| stream::iter(Vec::<Result<Bindings, FederateError>>::new())),
        )
    }

    async fn insert(&self, _triple: &Triple) -> Result<(), FederateError> {
        Err(FederateError::Write("gated graph is read-only".into()))
    }

    async fn delete(&self, _triple: &Triple) -> Result<(), FederateError> {
        Err(FederateError::Write("gated graph is read-only".into()))
    }
}

async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        sleep(Duration::from_millis(5)).await;
    }
}

fn alice_and_bob_graph() -> CountingGraph {
    CountingGraph::new(MemoryGraph::with_triples([
        triple("http://example.org/Alice", KNOWS, "http://example.org/Carol"),
        triple("http://example.org/Bob", KNOWS, "http://example.org/Dan"),
    ]))
}

#[tokio::test]
async fn empty_binding_seed_evaluates_bgp_directly() {
    let graph = Arc::new(alice_and_bob_graph());
    let join = BoundJoin::new(graph.clone(), knows_pattern(), QueryOptions::new());

    let items = drain(join.apply(source_of(vec![Bindings::new()]))).await;
    let outputs: Vec<Bindings> = items.into_iter().collect::<Result<_, _>>().unwrap();

    assert_eq!(outputs.len(), 2);
    assert_eq!(graph.bgp_calls.load(Ordering::SeqCst), 1);
    assert!(graph.union_sizes().is_empty(), "fast path must not dispatch a union");

    let pairs: HashSet<(String, String)> = outputs
        .iter()
        .map(|b| (iri(b, "s"), iri(b, "o")))
        .collect();
    assert!(pairs.contains(&(
        "http://example.org/Alice".to_string(),
        "http://example.org/Carol".to_string()
    )));
    assert!(pairs.contains(&(
        "http://example.org/Bob".to_string(),
        "http://example.org/Dan".to_string()
    )));
}

#[tokio::test]
async fn two_input_bucket_is_rewritten_and_demultiplexed() {
    let graph = Arc::new(alice_and_bob_graph());
    let join = BoundJoin::new(graph.clone(), knows_pattern(), QueryOptions::new());

    let source = source_of(vec![
        binding(&[("s", "http://example.org/Alice")]),
        binding(&[("s", "http://example.org/Bob")]),
    ]);
    let items = drain(join.apply(source)).await;
    let outputs: Vec<Bindings> = items.into_iter().collect::<Result<_, _>>().unwrap();

    // One union of two member BGPs, with the inputs substituted and the
    // remaining variables tagged per bucket position.
    assert_eq!(graph.bgp_calls.load(Ordering::SeqCst), 0);
    let unions = graph.unions.lock().unwrap();
    assert_eq!(unions.len(), 1);
    let members = &unions[0];
    assert_eq!(members.len(), 2);
    assert_eq!(members[0][0].subject, nn("http://example.org/Alice"));
    assert_eq!(members[0][0].object, var("o_0"));
    assert_eq!(members[1][0].subject, nn("http://example.org/Bob"));
    assert_eq!(members[1][0].object, var("o_1"));
    drop(unions);

    let pairs: HashSet<(String, String)> = outputs
        .iter()
        .map(|b| (iri(b, "s"), iri(b, "o")))
        .collect();
    assert_eq!(pairs.len(), 2);
    assert!(pairs.contains(&(
        "http://example.org/Alice".to_string(),
        "http://example.org/Carol".to_string()
    )));
    assert!(pairs.contains(&(
        "http://example.org/Bob".to_string(),
        "http://example.org/Dan".to_string()
    )));
}

#[tokio::test]
async fn thirty_inputs_dispatch_two_full_buckets() {
    let triples: Vec<Triple> = (0..30)
        .map(|i| {
            triple(
                &format!("http://example.org/p{}", i),
                KNOWS,
                &format!("http://example.org/q{}", i),
            )
        })
        .collect();
    let graph = Arc::new(CountingGraph::new(MemoryGraph::with_triples(triples)));
    let join = BoundJoin::new(graph.clone(), knows_pattern(), QueryOptions::new());

    let inputs: Vec<Bindings> = (0..30)
        .map(|i| binding(&[("s", &format!("http://example.org/p{}", i))]))
        .collect();
    let items = drain(join.apply(source_of(inputs))).await;
    let outputs: Vec<Bindings> = items.into_iter().collect::<Result<_, _>>().unwrap();

    assert_eq!(graph.union_sizes(), vec![15, 15]);
    assert_eq!(outputs.len(), 30);
    let pairs: HashSet<(String, String)> = outputs
        .iter()
        .map(|b| (iri(b, "s"), iri(b, "o")))
        .collect();
    for i in 0..30 {
        assert!(pairs.contains(&(
            format!("http://example.org/p{}", i),
            format!("http://example.org/q{}", i)
        )));
    }
}

#[tokio::test]
async fn residual_bucket_is_flushed_on_completion() {
    let graph = Arc::new(alice_and_bob_graph());
    let join = BoundJoin::new(graph.clone(), knows_pattern(), QueryOptions::new());

    let inputs: Vec<Bindings> = (0..BIND_JOIN_BUFFER_SIZE + 1)
        .map(|_| binding(&[("s", "http://example.org/Alice")]))
        .collect();
    let items = drain(join.apply(source_of(inputs))).await;

    assert_eq!(graph.union_sizes(), vec![15, 1]);
    assert_eq!(items.len(), 16);
    assert!(items.iter().all(Result::is_ok));
}

#[tokio::test]
async fn exact_bucket_size_dispatches_once() {
    let graph = Arc::new(alice_and_bob_graph());
    let join = BoundJoin::new(graph.clone(), knows_pattern(), QueryOptions::new());

    let inputs: Vec<Bindings> = (0..BIND_JOIN_BUFFER_SIZE)
        .map(|_| binding(&[("s", "http://example.org/Bob")]))
        .collect();
    let items = drain(join.apply(source_of(inputs))).await;

    assert_eq!(graph.union_sizes(), vec![15]);
    assert_eq!(items.len(), 15);
}

#[tokio::test]
async fn single_nonempty_binding_takes_rewriting_path() {
    let graph = Arc::new(alice_and_bob_graph());
    let join = BoundJoin::new(graph.clone(), knows_pattern(), QueryOptions::new());

    let source = source_of(vec![binding(&[("s", "http://example.org/Alice")])]);
    let items = drain(join.apply(source)).await;
    let outputs: Vec<Bindings> = items.into_iter().collect::<Result<_, _>>().unwrap();

    // The fast path is reserved for the single *empty* binding.
    assert_eq!(graph.bgp_calls.load(Ordering::SeqCst), 0);
    assert_eq!(graph.union_sizes(), vec![1]);
    assert_eq!(outputs.len(), 1);
    assert_eq!(iri(&outputs[0], "s"), "http://example.org/Alice");
    assert_eq!(iri(&outputs[0], "o"), "http://example.org/Carol");
}

#[tokio::test]
async fn empty_source_completes_without_dispatch() {
    let graph = Arc::new(alice_and_bob_graph());
    let join = BoundJoin::new(graph.clone(), knows_pattern(), QueryOptions::new());

    let items = drain(join.apply(source_of(Vec::new()))).await;

    assert!(items.is_empty());
    assert_eq!(graph.bgp_calls.load(Ordering::SeqCst), 0);
    assert!(graph.union_sizes().is_empty());
}

#[tokio::test]
async fn ground_bgp_forwards_remote_solutions_unchanged() {
    let graph = Arc::new(alice_and_bob_graph());
    let bgp = vec![TriplePattern::new(
        nn("http://example.org/Alice"),
        nn(KNOWS),
        nn("http://example.org/Carol"),
    )];
    let join = BoundJoin::new(graph.clone(), bgp, QueryOptions::new());

    let source = source_of(vec![
        binding(&[("x", "http://example.org/p1")]),
        binding(&[("x", "http://example.org/p2")]),
    ]);
    let items = drain(join.apply(source)).await;
    let outputs: Vec<Bindings> = items.into_iter().collect::<Result<_, _>>().unwrap();

    // No variables to rewrite, so the union answers carry no key and are
    // forwarded as-is: one empty solution per matching member.
    assert_eq!(graph.union_sizes(), vec![2]);
    assert_eq!(outputs, vec![Bindings::new(), Bindings::new()]);
}

#[tokio::test]
async fn remote_error_ends_output_after_first_batch() {
    let first_batch: Vec<Result<Bindings, FederateError>> = (0..15)
        .map(|i| Ok(binding(&[("r", &format!("http://example.org/r{}", i))])))
        .collect();
    let second_batch = vec![Err(FederateError::Remote("endpoint failed".into()))];
    let graph = Arc::new(ScriptedGraph::new(vec![first_batch, second_batch]));

    let join = BoundJoin::new(graph.clone(), knows_pattern(), QueryOptions::new())
        .with_config(BoundJoinConfig {
            max_in_flight: 1,
            ..BoundJoinConfig::default()
        });

    let inputs: Vec<Bindings> = (0..30)
        .map(|i| binding(&[("s", &format!("http://example.org/p{}", i))]))
        .collect();
    let items = drain(join.apply(source_of(inputs))).await;

    assert_eq!(graph.calls.load(Ordering::SeqCst), 2);
    assert_eq!(items.len(), 16, "15 first-batch outputs plus one terminal error");
    assert!(items[..15].iter().all(Result::is_ok));
    assert_eq!(
        items[15],
        Err(FederateError::Remote("endpoint failed".into()))
    );
}

#[tokio::test]
async fn in_flight_cap_bounds_dispatches_and_pauses_the_source() {
    let graph = Arc::new(GatedGraph::new());
    let join = BoundJoin::new(graph.clone(), knows_pattern(), QueryOptions::new())
        .with_config(BoundJoinConfig {
            max_in_flight: 2,
            ..BoundJoinConfig::default()
        });

    // An endless source that counts every binding handed to the operator.
    let pulled = Arc::new(AtomicUsize::new(0));
    let source: BindingsStream = {
        let pulled = pulled.clone();
        Box::pin(stream::unfold(pulled, |pulled| async move {
            pulled.fetch_add(1, Ordering::SeqCst);
            let next = binding(&[("s", "http://example.org/Alice")]);
            Some((Ok(next), pulled))
        }))
    };

    let output = join.apply(source);

    // Two buckets fill and dispatch; a third cannot while both are gated,
    // and the source is not consumed past the two dispatched buckets.
    wait_until(|| graph.dispatched.load(Ordering::SeqCst) == 2).await;
    sleep(Duration::from_millis(50)).await;
    assert_eq!(graph.dispatched.load(Ordering::SeqCst), 2);
    assert_eq!(graph.outstanding(), 2);
    assert_eq!(
        pulled.load(Ordering::SeqCst),
        2 * BIND_JOIN_BUFFER_SIZE,
        "source consumption must pause once the cap is reached"
    );

    // Completing one batch frees a slot: exactly one more bucket is pulled
    // and dispatched, and the operator is back at the cap.
    graph.release_one();
    wait_until(|| graph.dispatched.load(Ordering::SeqCst) == 3).await;
    sleep(Duration::from_millis(50)).await;
    assert_eq!(graph.dispatched.load(Ordering::SeqCst), 3);
    assert_eq!(graph.outstanding(), 2);
    assert_eq!(pulled.load(Ordering::SeqCst), 3 * BIND_JOIN_BUFFER_SIZE);

    drop(output);
}

#[tokio::test]
async fn dropping_output_releases_the_source() {
    struct Released(Arc<AtomicBool>);
    impl Drop for Released {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    let released = Arc::new(AtomicBool::new(false));
    let guard = Released(released.clone());
    let source: BindingsStream = Box::pin(stream::unfold(guard, |guard| async move {
        let next = binding(&[("s", "http://example.org/Alice")]);
        Some((Ok(next), guard))
    }));

    let graph = Arc::new(alice_and_bob_graph());
    let join = BoundJoin::new(graph, knows_pattern(), QueryOptions::new());
    let mut output = join.apply(source);

    assert!(output.next().await.expect("first output").is_ok());
    assert!(output.next().await.expect("second output").is_ok());
    drop(output);

    for _ in 0..100 {
        if released.load(Ordering::SeqCst) {
            break;
        }
        sleep(Duration::from_millis(5)).await;
    }
    assert!(
        released.load(Ordering::SeqCst),
        "source must be dropped after the output is unsubscribed"
    );
}
