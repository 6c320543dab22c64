//! Terminal sinks for UPDATE plans
//!
//! An update plan produces a lazy stream of triples; a [`Consumer`] is the
//! pipeline tail that drains it into a graph. `execute` is the one-shot
//! completion handle: it resolves after the stream has ended and every
//! write has finished, and rejects on the first source error or failed
//! write, pulling nothing further.
//!
//! Writes are serialized - one outstanding write per sink - which is also
//! the back-pressure discipline: the source is only polled again once the
//! previous triple has been applied.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::debug;

use crate::error::FederateError;
use crate::graph::{Graph, TripleStream};

/// A terminal sink with a one-shot completion handle
#[async_trait]
pub trait Consumer: Send {
    /// Drives the sink to completion
    async fn execute(self: Box<Self>) -> Result<(), FederateError>;
}

/// Inserts every triple of a stream into a graph
pub struct InsertConsumer {
    graph: Arc<dyn Graph>,
    source: TripleStream,
}

impl InsertConsumer {
    pub fn new(graph: Arc<dyn Graph>, source: TripleStream) -> Self {
        Self { graph, source }
    }
}

#[async_trait]
impl Consumer for InsertConsumer {
    async fn execute(mut self: Box<Self>) -> Result<(), FederateError> {
        let mut written = 0usize;
        while let Some(item) = self.source.next().await {
            let triple = item?;
            self.graph.insert(&triple).await?;
            written += 1;
        }
        debug!("insert consumer applied {} triples", written);
        Ok(())
    }
}

/// Deletes every triple of a stream from a graph
pub struct DeleteConsumer {
    graph: Arc<dyn Graph>,
    source: TripleStream,
}

impl DeleteConsumer {
    pub fn new(graph: Arc<dyn Graph>, source: TripleStream) -> Self {
        Self { graph, source }
    }
}

#[async_trait]
impl Consumer for DeleteConsumer {
    async fn execute(mut self: Box<Self>) -> Result<(), FederateError> {
        let mut removed = 0usize;
        while let Some(item) = self.source.next().await {
            let triple = item?;
            self.graph.delete(&triple).await?;
            removed += 1;
        }
        debug!("delete consumer applied {} triples", removed);
        Ok(())
    }
}

/// A sink for plans that failed preparation
///
/// The planner hands this out in place of a runnable sink so that callers
/// observe preparation failures through the same `execute` handle as
/// runtime failures.
pub struct ErrorConsumer {
    reason: String,
}

impl ErrorConsumer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Consumer for ErrorConsumer {
    async fn execute(self: Box<Self>) -> Result<(), FederateError> {
        Err(FederateError::Preparation(self.reason))
    }
}
