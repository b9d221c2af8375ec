//! Rewrite patterns contributed by operation kinds.
//!
//! An operation kind may populate a [RewritePatternSet] with its
//! canonicalization patterns. There is no rewrite driver here:
//! [RewritePatternSet::apply_once] tries each pattern a single time,
//! which is enough for a client to build its own fixpoint loop.

use crate::{context::Context, operation::Operation, result::Result};

/// A rewrite that applies to a single [Operation], in place.
pub trait RewritePattern {
    /// Name of this pattern, for debugging.
    fn name(&self) -> &str;

    /// Try to rewrite `op`. Returns `Ok(true)` if it did, `Ok(false)` if `op`
    /// does not match and is untouched.
    fn match_and_rewrite(&self, ctx: &Context, op: &mut Operation) -> Result<bool>;
}

/// An ordered collection of [RewritePattern]s.
#[derive(Default)]
pub struct RewritePatternSet {
    /// The set of patterns to match against.
    patterns: Vec<Box<dyn RewritePattern>>,
}

impl RewritePatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pattern: Box<dyn RewritePattern>) {
        self.patterns.push(pattern);
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn RewritePattern> {
        self.patterns.iter().map(|p| &**p)
    }

    /// Try the patterns in insertion order and stop at the first one that
    /// rewrites `op`. Returns the name of that pattern.
    pub fn apply_once(&self, ctx: &Context, op: &mut Operation) -> Result<Option<&str>> {
        for pattern in &self.patterns {
            if pattern.match_and_rewrite(ctx, op)? {
                log::trace!("Pattern {} rewrote an operation", pattern.name());
                return Ok(Some(pattern.name()));
            }
        }
        Ok(None)
    }
}
