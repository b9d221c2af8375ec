//! Operation kinds.
//!
//! Every [Operation] names its kind by a [KindId]. What the kind means,
//! how it is verified, parsed and printed, and what it folds to is
//! described by an [AbstractOperation] registered in the [Context].
//! Every hook is an independently replaceable closure, so kinds can be
//! described entirely at runtime.

use std::{fmt, rc::Rc};

use thiserror::Error;

use crate::{
    arg_err_noloc,
    attribute::AttrObj,
    capability::{Capability, CapabilitySet},
    context::{Context, KindId},
    dialect::QualifiedName,
    operation::{Operation, OperationState, Value},
    parsable::{ParseResult, StateStream},
    printable,
    result::Result,
    rewrite::RewritePatternSet,
};

/// Checks an [Operation] of this kind.
pub type OpVerifierFn = Box<dyn Fn(&Context, &Operation) -> Result<()>>;

/// Parses what follows the operation name in the custom form.
/// Reference counted so that it can be called while the [Context] is borrowed mutably.
pub type OpParserFn =
    Rc<dyn for<'a> Fn(&mut StateStream<'a>, OperationState) -> ParseResult<'a, Operation>>;

/// Prints an [Operation] of this kind, starting at its name.
/// The result list (`%r0, %r1 = `) is already printed.
pub type OpPrinterFn =
    Box<dyn Fn(&Context, &printable::State, &Operation, &mut fmt::Formatter<'_>) -> fmt::Result>;

/// Given the operation and constant operands (`None` where not constant),
/// computes replacements for its results. `None` declines to fold.
pub type FoldHookFn =
    Box<dyn Fn(&Context, &Operation, &[Option<AttrObj>]) -> Option<Vec<FoldResult>>>;

/// Adds the canonicalization patterns of this kind to a set.
pub type CanonicalizationPatternsFn = Box<dyn Fn(&mut RewritePatternSet, &Context)>;

/// Does this kind have the trait identified by a [Capability]?
pub type HasTraitFn = Box<dyn Fn(Capability) -> bool>;

/// Replacement for a result computed by a fold hook.
#[derive(Clone)]
pub enum FoldResult {
    /// The result is this constant.
    Attr(AttrObj),
    /// The result is this existing value.
    Value(Value),
}

#[derive(Debug, Error)]
#[error("operation {0} is already registered")]
pub struct DuplicateOpNameErr(pub QualifiedName);

/// Everything the framework knows about an operation kind.
pub struct AbstractOperation {
    pub kind: KindId,
    pub name: QualifiedName,
    pub(crate) verifier: OpVerifierFn,
    pub(crate) parser: OpParserFn,
    pub(crate) printer: OpPrinterFn,
    pub(crate) fold: FoldHookFn,
    pub(crate) canonicalization_patterns: CanonicalizationPatternsFn,
    pub(crate) has_trait: HasTraitFn,
    pub capabilities: CapabilitySet,
}

impl AbstractOperation {
    pub fn verify(&self, ctx: &Context, op: &Operation) -> Result<()> {
        (self.verifier)(ctx, op)
    }

    pub fn print(
        &self,
        ctx: &Context,
        state: &printable::State,
        op: &Operation,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        (self.printer)(ctx, state, op, f)
    }

    pub fn fold(
        &self,
        ctx: &Context,
        op: &Operation,
        operands: &[Option<AttrObj>],
    ) -> Option<Vec<FoldResult>> {
        (self.fold)(ctx, op, operands)
    }

    pub fn populate_canonicalization_patterns(
        &self,
        patterns: &mut RewritePatternSet,
        ctx: &Context,
    ) {
        (self.canonicalization_patterns)(patterns, ctx)
    }

    pub fn has_trait(&self, capability: Capability) -> bool {
        (self.has_trait)(capability)
    }

    /// Add this kind to the operation table of `ctx`.
    /// A name that is already taken is rejected and nothing is registered.
    /// Panics if the kind itself is already registered.
    pub(crate) fn insert(self, ctx: &mut Context) -> Result<KindId> {
        let qualified = self.name.to_string();
        if ctx.op_names.contains_key(&qualified) {
            return arg_err_noloc!(DuplicateOpNameErr(self.name));
        }
        assert!(
            !ctx.is_kind_registered(self.kind),
            "{} is already registered",
            self.kind
        );
        let kind = self.kind;
        log::debug!("Registered operation {qualified} as {kind}");
        ctx.op_names.insert(qualified, kind);
        ctx.abstract_ops.insert(kind, self);
        Ok(kind)
    }
}
