//! Deferred raster graph
//!
//! A [`Deferred<T>`] describes how to produce a value without producing it.
//! Nodes are combined with [`Deferred::map`], [`Deferred::zip`] and friends
//! into a DAG; nothing is computed until a node is handed to an
//! [`Evaluator`], which runs each node at most once and shares results
//! between every consumer.

use ndarray::Array2;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use terraveg_core::raster::GridSpec;
use terraveg_core::Region;
use tracing::debug;

use crate::error::{PipelineError, Result};

static NEXT_NODE: AtomicU64 = AtomicU64::new(0);

/// Unique identity of a graph node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        NodeId(NEXT_NODE.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type Thunk<T> = Arc<dyn Fn(&mut Evaluator) -> Result<T> + Send + Sync>;

/// A lazily computed value
pub struct Deferred<T> {
    id: NodeId,
    label: &'static str,
    thunk: Thunk<T>,
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            label: self.label,
            thunk: Arc::clone(&self.thunk),
        }
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish()
    }
}

impl<T: Send + Sync + 'static> Deferred<T> {
    /// Node computed by `f`, which may evaluate other nodes through the
    /// evaluator it receives.
    pub fn source<F>(label: &'static str, f: F) -> Self
    where
        F: Fn(&mut Evaluator) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            id: NodeId::next(),
            label,
            thunk: Arc::new(f),
        }
    }

    /// Node that always yields `value`
    pub fn constant(label: &'static str, value: T) -> Self
    where
        T: Clone,
    {
        Self::source(label, move |_| Ok(value.clone()))
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Node applying `f` to this node's value
    pub fn map<U, F>(&self, label: &'static str, f: F) -> Deferred<U>
    where
        U: Send + Sync + 'static,
        F: Fn(&T) -> Result<U> + Send + Sync + 'static,
    {
        let input = self.clone();
        Deferred::source(label, move |ev| {
            let value = input.evaluate(ev)?;
            f(&value)
        })
    }

    /// Node combining this node with another
    pub fn zip<U, V, F>(&self, other: &Deferred<U>, label: &'static str, f: F) -> Deferred<V>
    where
        U: Send + Sync + 'static,
        V: Send + Sync + 'static,
        F: Fn(&T, &U) -> Result<V> + Send + Sync + 'static,
    {
        let (a, b) = (self.clone(), other.clone());
        Deferred::source(label, move |ev| {
            let left = a.evaluate(ev)?;
            let right = b.evaluate(ev)?;
            f(&left, &right)
        })
    }

    /// Node combining this node with two others
    pub fn zip3<U, V, W, F>(
        &self,
        second: &Deferred<U>,
        third: &Deferred<V>,
        label: &'static str,
        f: F,
    ) -> Deferred<W>
    where
        U: Send + Sync + 'static,
        V: Send + Sync + 'static,
        W: Send + Sync + 'static,
        F: Fn(&T, &U, &V) -> Result<W> + Send + Sync + 'static,
    {
        let (a, b, c) = (self.clone(), second.clone(), third.clone());
        Deferred::source(label, move |ev| {
            let (x, y, z) = (a.evaluate(ev)?, b.evaluate(ev)?, c.evaluate(ev)?);
            f(&x, &y, &z)
        })
    }

    /// Compute this node (and whatever it depends on), reusing anything the
    /// evaluator has already computed.
    pub fn evaluate(&self, ev: &mut Evaluator) -> Result<Arc<T>> {
        if let Some(cached) = ev.memo.get(&self.id) {
            return Arc::clone(cached)
                .downcast::<T>()
                .map_err(|_| PipelineError::NodeType { label: self.label });
        }

        let start = Instant::now();
        let value = Arc::new((self.thunk)(ev)?);
        debug!("{} {} evaluated in {:.2?}", self.label, self.id, start.elapsed());

        ev.trace.push(self.label);
        ev.memo
            .insert(self.id, Arc::clone(&value) as Arc<dyn Any + Send + Sync>);
        Ok(value)
    }
}

/// Evaluation context: the region being rendered plus memoized node
/// outputs and region masks.
pub struct Evaluator {
    region: Region,
    memo: HashMap<NodeId, Arc<dyn Any + Send + Sync>>,
    masks: Vec<(GridSpec, Arc<Array2<bool>>)>,
    trace: Vec<&'static str>,
}

impl Evaluator {
    pub fn new(region: Region) -> Self {
        Self {
            region,
            memo: HashMap::new(),
            masks: Vec::new(),
            trace: Vec::new(),
        }
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Inclusion mask of the region on `grid`, computed once per grid
    pub fn mask_for(&mut self, grid: &GridSpec) -> Arc<Array2<bool>> {
        if let Some((_, mask)) = self.masks.iter().find(|(g, _)| g == grid) {
            return Arc::clone(mask);
        }
        let mask = Arc::new(self.region.mask(grid));
        self.masks.push((*grid, Arc::clone(&mask)));
        mask
    }

    /// Labels of the nodes computed so far, in completion order
    pub fn trace(&self) -> &[&'static str] {
        &self.trace
    }

    /// Number of memoized nodes
    pub fn cached(&self) -> usize {
        self.memo.len()
    }
}
