//! A data source that flattens a hierarchy into grid rows.
//!
//! [`TreeDataSource`] keeps the visible rows of a tree as a flat list. Each
//! row records its node, its depth and its [`NodeState`]. Expanding a closed
//! node fetches its children from the [`TreeProvider`] and splices them in
//! right after the parent; collapsing an open node removes its whole subtree.
//!
//! All structural operations go through a [`SerialQueue`], so splices apply
//! in request order and never interleave even when a child fetch suspends.
//! [`flush_queue`](TreeDataSource::flush_queue) waits for quiescence; it is
//! also the first step of `make_available`.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use horizon_grid_core::logging::targets;
use horizon_grid_core::{SerialQueue, Signal};
use parking_lot::RwLock;
use tokio::sync::oneshot;

use crate::data::RowModel;
use crate::data_source::DataSource;
use crate::error::{Error, Result};
use crate::position::Position;
use crate::range::Range;

/// Expansion state of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    /// A leaf.
    None,
    /// A branch whose children are hidden.
    Closed,
    /// A branch whose children are spliced in below it.
    Open,
}

/// Supplies the hierarchy to a [`TreeDataSource`].
pub trait TreeProvider: Send + Sync + 'static {
    /// The node type; each node is the row model of its row.
    type Node: RowModel;

    /// Fetches the children of `parent`, or the roots for `None`.
    fn children(
        &self,
        parent: Option<&Arc<Self::Node>>,
    ) -> impl Future<Output = Result<Vec<Arc<Self::Node>>>> + Send;

    /// Whether `node` can be expanded.
    fn has_children(&self, node: &Self::Node) -> bool;
}

/// A structural change of the flattened rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeChange {
    /// First affected row.
    pub row: usize,
    /// Rows inserted at `row`.
    pub inserted: usize,
    /// Rows removed at `row`.
    pub removed: usize,
}

struct FlatRow<N> {
    node: Arc<N>,
    depth: usize,
    state: NodeState,
}

enum TreeOp<N> {
    Reload(oneshot::Sender<Result<usize>>),
    Expand(Arc<N>, oneshot::Sender<Result<usize>>),
    Collapse(Arc<N>, oneshot::Sender<Result<usize>>),
}

/// A tree flattened into rows.
pub struct TreeDataSource<P: TreeProvider> {
    provider: Arc<P>,
    rows: RwLock<Vec<FlatRow<P::Node>>>,
    queue: SerialQueue<TreeOp<P::Node>>,
    column_count: usize,
    size_changed: Signal<Position>,
    /// Emitted after rows were spliced in or out.
    pub structure_changed: Signal<TreeChange>,
}

impl<P: TreeProvider> TreeDataSource<P> {
    /// Creates an empty source. Call [`reload`](Self::reload) to fetch the
    /// roots.
    pub fn new(provider: Arc<P>, column_count: usize) -> Self {
        Self {
            provider,
            rows: RwLock::new(Vec::new()),
            queue: SerialQueue::new(),
            column_count,
            size_changed: Signal::new(),
            structure_changed: Signal::new(),
        }
    }

    /// Number of flattened rows.
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Returns `true` if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// The node shown at `row`.
    pub fn node_at(&self, row: usize) -> Option<Arc<P::Node>> {
        self.rows.read().get(row).map(|r| r.node.clone())
    }

    /// Depth of the node at `row`; roots are at depth 0.
    pub fn depth_at(&self, row: usize) -> Option<usize> {
        self.rows.read().get(row).map(|r| r.depth)
    }

    /// State of `node`, or `None` if it is not a current row.
    pub fn node_state(&self, node: &Arc<P::Node>) -> Option<NodeState> {
        let rows = self.rows.read();
        find_row(&rows, node).map(|index| rows[index].state)
    }

    /// Replaces all rows with the provider's roots, all collapsed.
    pub async fn reload(&self) -> Result<usize> {
        self.submit(TreeOp::Reload).await
    }

    /// Expands a closed node; resolves to the number of rows inserted.
    pub async fn expand_node(&self, node: &Arc<P::Node>) -> Result<usize> {
        let node = node.clone();
        self.submit(|reply| TreeOp::Expand(node, reply)).await
    }

    /// Collapses an open node; resolves to the number of rows removed.
    pub async fn collapse_node(&self, node: &Arc<P::Node>) -> Result<usize> {
        let node = node.clone();
        self.submit(|reply| TreeOp::Collapse(node, reply)).await
    }

    /// Applies every queued operation; once this returns, every operation
    /// requested before the call has been applied.
    pub async fn flush_queue(&self) {
        let this = self;
        self.queue.drain(move |op| this.apply(op)).await;
    }

    async fn submit<F>(&self, make: F) -> Result<usize>
    where
        F: FnOnce(oneshot::Sender<Result<usize>>) -> TreeOp<P::Node>,
    {
        let (reply, response) = oneshot::channel();
        self.queue.push(make(reply));
        self.flush_queue().await;
        response
            .await
            .map_err(|_| Error::data_source("tree operation was dropped"))?
    }

    async fn apply(&self, op: TreeOp<P::Node>) {
        match op {
            TreeOp::Reload(reply) => {
                let _ = reply.send(self.apply_reload().await);
            }
            TreeOp::Expand(node, reply) => {
                let _ = reply.send(self.apply_expand(&node).await);
            }
            TreeOp::Collapse(node, reply) => {
                let _ = reply.send(self.apply_collapse(&node));
            }
        }
    }

    async fn apply_reload(&self) -> Result<usize> {
        let roots = self.provider.children(None).await?;
        let fresh: Vec<_> = roots.into_iter().map(|node| self.flat_row(node, 0)).collect();
        let inserted = fresh.len();
        let removed = std::mem::replace(&mut *self.rows.write(), fresh).len();
        tracing::debug!(target: targets::TREE, inserted, removed, "tree reloaded");
        self.notify(TreeChange {
            row: 0,
            inserted,
            removed,
        });
        Ok(inserted)
    }

    async fn apply_expand(&self, node: &Arc<P::Node>) -> Result<usize> {
        let depth = {
            let rows = self.rows.read();
            let index = find_row(&rows, node).ok_or(Error::UnknownNode)?;
            expect_state(rows[index].state, NodeState::Closed)?;
            rows[index].depth
        };

        let children = self.provider.children(Some(node)).await?;

        let mut rows = self.rows.write();
        // Only queued operations touch the rows; the parent has not moved.
        let index = find_row(&rows, node).ok_or(Error::UnknownNode)?;
        let inserted = children.len();
        let spliced: Vec<_> = children
            .into_iter()
            .map(|child| self.flat_row(child, depth + 1))
            .collect();
        rows.splice(index + 1..index + 1, spliced);
        rows[index].state = NodeState::Open;
        drop(rows);

        tracing::debug!(target: targets::TREE, row = index, inserted, "node expanded");
        self.notify(TreeChange {
            row: index + 1,
            inserted,
            removed: 0,
        });
        Ok(inserted)
    }

    fn apply_collapse(&self, node: &Arc<P::Node>) -> Result<usize> {
        let mut rows = self.rows.write();
        let index = find_row(&rows, node).ok_or(Error::UnknownNode)?;
        expect_state(rows[index].state, NodeState::Open)?;

        let depth = rows[index].depth;
        let end = rows[index + 1..]
            .iter()
            .position(|row| row.depth <= depth)
            .map_or(rows.len(), |offset| index + 1 + offset);
        rows.drain(index + 1..end);
        rows[index].state = NodeState::Closed;
        drop(rows);

        let removed = end - index - 1;
        tracing::debug!(target: targets::TREE, row = index, removed, "node collapsed");
        self.notify(TreeChange {
            row: index + 1,
            inserted: 0,
            removed,
        });
        Ok(removed)
    }

    fn flat_row(&self, node: Arc<P::Node>, depth: usize) -> FlatRow<P::Node> {
        let state = if self.provider.has_children(&node) {
            NodeState::Closed
        } else {
            NodeState::None
        };
        FlatRow { node, depth, state }
    }

    fn notify(&self, change: TreeChange) {
        self.structure_changed.emit(change);
        if change.inserted != change.removed {
            self.size_changed.emit(self.size());
        }
    }
}

fn find_row<N>(rows: &[FlatRow<N>], node: &Arc<N>) -> Option<usize> {
    rows.iter().position(|row| Arc::ptr_eq(&row.node, node))
}

fn expect_state(found: NodeState, expected: NodeState) -> Result<()> {
    if found == expected {
        Ok(())
    } else {
        Err(Error::InvalidNodeState { expected, found })
    }
}

impl<P: TreeProvider> DataSource for TreeDataSource<P> {
    type Model = P::Node;

    fn is_available(&self, range: &Range) -> bool {
        self.queue.is_idle() && range.end().row < self.len() as i64
    }

    async fn make_available(&self, range: Range) -> Result<()> {
        self.flush_queue().await;
        tracing::trace!(target: targets::TREE, %range, "range available");
        Ok(())
    }

    fn model_for_position(&self, pos: Position) -> Option<Arc<P::Node>> {
        self.node_at(usize::try_from(pos.row).ok()?)
    }

    fn position_of_model(&self, model: &Arc<P::Node>) -> Option<Position> {
        find_row(&self.rows.read(), model).map(|row| Position::new(row as i64, 0))
    }

    fn size(&self) -> Position {
        Position::new(self.len() as i64, self.column_count as i64)
    }

    fn size_changed(&self) -> &Signal<Position> {
        &self.size_changed
    }
}

impl<P: TreeProvider> fmt::Debug for TreeDataSource<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeDataSource")
            .field("rows", &self.len())
            .field("pending", &self.queue.pending())
            .finish()
    }
}
