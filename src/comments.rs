//! Comment threading.
//!
//! Comments arrive as a flat list with parent references. The tree is an
//! arena: nodes live in one `Vec`, and both the root list and each node's
//! replies are index lists into it.
//!
//! Ordering: roots newest first, replies oldest first.

use serde::Serialize;
use std::cmp::Reverse;
use std::collections::HashMap;
use tracing::debug;

use crate::model::{Comment, VisibilityFilter};

/// Keep only the comments visible under `filter`.
#[must_use]
pub fn filter_comments(comments: &[Comment], filter: VisibilityFilter) -> Vec<Comment> {
    comments
        .iter()
        .filter(|c| filter.allows(c.visibility))
        .cloned()
        .collect()
}

/// One comment and the arena indices of its replies.
#[derive(Debug, Clone)]
pub struct CommentNode {
    pub comment: Comment,
    pub replies: Vec<usize>,
}

/// A forest of comment threads.
#[derive(Debug, Clone, Default)]
pub struct CommentTree {
    nodes: Vec<CommentNode>,
    roots: Vec<usize>,
}

/// Nested form of a thread, for serialization.
#[derive(Debug, Clone, Serialize)]
pub struct ThreadedComment {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<ThreadedComment>,
}

impl CommentTree {
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node at arena `index`, or `None` past the end.
    #[must_use]
    pub fn node(&self, index: usize) -> Option<&CommentNode> {
        self.nodes.get(index)
    }

    /// Root comments, newest first.
    pub fn roots(&self) -> impl Iterator<Item = &Comment> {
        self.roots.iter().map(|&i| &self.nodes[i].comment)
    }

    /// Direct replies to the comment with `id`, oldest first.
    ///
    /// Empty if the comment is unknown.
    #[must_use]
    pub fn replies(&self, id: i64) -> Vec<&Comment> {
        self.nodes
            .iter()
            .find(|n| n.comment.id == id)
            .map(|n| n.replies.iter().map(|&i| &self.nodes[i].comment).collect())
            .unwrap_or_default()
    }

    /// Depth-first traversal in render order, yielding `(depth, comment)`.
    pub fn walk(&self) -> impl Iterator<Item = (usize, &Comment)> {
        let mut stack: Vec<(usize, usize)> = self.roots.iter().rev().map(|&i| (0, i)).collect();

        std::iter::from_fn(move || {
            let (depth, index) = stack.pop()?;
            let node = &self.nodes[index];
            stack.extend(node.replies.iter().rev().map(|&child| (depth + 1, child)));
            Some((depth, &node.comment))
        })
    }

    /// Convert to nested owned threads.
    #[must_use]
    pub fn to_threads(&self) -> Vec<ThreadedComment> {
        self.roots.iter().map(|&i| self.thread(i)).collect()
    }

    fn thread(&self, index: usize) -> ThreadedComment {
        let node = &self.nodes[index];
        ThreadedComment {
            comment: node.comment.clone(),
            replies: node.replies.iter().map(|&child| self.thread(child)).collect(),
        }
    }
}

/// Build reply threads from a flat comment list.
///
/// A comment whose parent is missing, zero, itself, or unknown becomes a
/// root. So does the first member (in input order) of any parent cycle, so
/// every input comment appears exactly once.
#[must_use]
pub fn build_comment_tree(comments: Vec<Comment>) -> CommentTree {
    let mut by_id: HashMap<i64, usize> = HashMap::with_capacity(comments.len());
    for (index, comment) in comments.iter().enumerate() {
        by_id.entry(comment.id).or_insert(index);
    }

    let mut parent_of: Vec<Option<usize>> = comments
        .iter()
        .enumerate()
        .map(|(index, comment)| {
            comment
                .parent()
                .and_then(|id| by_id.get(&id).copied())
                .filter(|&parent| parent != index)
        })
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); comments.len()];
    for (index, parent) in parent_of.iter().enumerate() {
        if let Some(parent) = parent {
            children[*parent].push(index);
        }
    }

    // Anything not reachable from a root sits on a parent cycle.
    let mut reached = vec![false; comments.len()];
    let mut promoted = 0usize;
    for index in 0..comments.len() {
        if parent_of[index].is_none() {
            mark_reached(index, &children, &mut reached);
        }
    }
    for index in 0..comments.len() {
        if !reached[index] {
            if let Some(parent) = parent_of[index].take() {
                children[parent].retain(|&c| c != index);
            }
            promoted += 1;
            mark_reached(index, &children, &mut reached);
        }
    }

    let sort_key = |i: &usize| (comments[*i].created_at, comments[*i].id);

    let mut roots: Vec<usize> = (0..comments.len()).filter(|&i| parent_of[i].is_none()).collect();
    roots.sort_by_key(|i| Reverse(sort_key(i)));
    for replies in &mut children {
        replies.sort_by_key(sort_key);
    }

    debug!(
        comments = comments.len(),
        roots = roots.len(),
        promoted,
        "Built comment tree"
    );

    let nodes = comments
        .into_iter()
        .zip(children)
        .map(|(comment, replies)| CommentNode { comment, replies })
        .collect();

    CommentTree { nodes, roots }
}

fn mark_reached(start: usize, children: &[Vec<usize>], reached: &mut [bool]) {
    let mut stack = vec![start];
    while let Some(index) = stack.pop() {
        if reached[index] {
            continue;
        }
        reached[index] = true;
        stack.extend(children[index].iter().copied());
    }
}
