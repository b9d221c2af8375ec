//! Operation kinds defined at runtime.

use std::{fmt, rc::Rc};

use thiserror::Error;

use crate::{
    attribute::AttrObj,
    capability::{Capability, CapabilitySet, IS_DYNAMIC_OP},
    context::{Context, KindId},
    dialect::{DialectName, QualifiedName},
    input_err,
    op::{
        AbstractOperation, CanonicalizationPatternsFn, FoldHookFn, FoldResult, HasTraitFn,
        OpParserFn, OpPrinterFn, OpVerifierFn,
    },
    operation::{print_generic, Operation, OperationState},
    parsable::{IntoParseResult, ParseResult, StateStream},
    printable,
    result::Result,
    rewrite::RewritePatternSet,
};

use super::ExtensibleDialect;

#[derive(Debug, Error)]
#[error(
    "dynamic operation {0} has no custom parser: \
    dynamic operations without a custom parser cannot be parsed"
)]
pub struct DynamicOpParserMissingErr(pub String);

/// Runtime description of an operation kind. Every hook can be replaced
/// after construction, until the definition is added to its dialect.
pub struct DynamicOpDefinition {
    kind: KindId,
    name: QualifiedName,
    verifier: OpVerifierFn,
    parser: OpParserFn,
    printer: OpPrinterFn,
    fold: Option<FoldHookFn>,
    canonicalization_patterns: Option<CanonicalizationPatternsFn>,
    has_trait: Option<HasTraitFn>,
}

impl DynamicOpDefinition {
    /// An operation kind that has only the generic syntax.
    /// Panics if `name` contains a `.`.
    pub fn new<V>(ctx: &mut Context, dialect: &ExtensibleDialect, name: &str, verifier: V) -> Self
    where
        V: Fn(&Context, &Operation) -> Result<()> + 'static,
    {
        Self::with_syntax(
            ctx,
            dialect,
            name,
            verifier,
            Rc::new(parse_missing),
            print_generic,
        )
    }

    /// An operation kind with a custom syntax. `parser` takes over after
    /// the operation name, `printer` prints from the operation name on.
    /// Panics if `name` contains a `.`.
    pub fn with_syntax<V, P>(
        ctx: &mut Context,
        dialect: &ExtensibleDialect,
        name: &str,
        verifier: V,
        parser: OpParserFn,
        printer: P,
    ) -> Self
    where
        V: Fn(&Context, &Operation) -> Result<()> + 'static,
        P: Fn(&Context, &printable::State, &Operation, &mut fmt::Formatter<'_>) -> fmt::Result
            + 'static,
    {
        assert!(
            !name.contains('.'),
            "dynamic operation name {name} must not contain a '.'"
        );
        DynamicOpDefinition {
            kind: ctx.allocate_kind_id(),
            name: QualifiedName::new(dialect.name(), name),
            verifier: Box::new(verifier),
            parser,
            printer: Box::new(printer),
            fold: None,
            canonicalization_patterns: None,
            has_trait: None,
        }
    }

    /// Qualified name, `dialect.name`.
    pub fn name(&self) -> &QualifiedName {
        &self.name
    }

    pub fn dialect(&self) -> &DialectName {
        &self.name.dialect
    }

    pub fn kind_id(&self) -> KindId {
        self.kind
    }

    pub fn set_verifier<V>(&mut self, verifier: V)
    where
        V: Fn(&Context, &Operation) -> Result<()> + 'static,
    {
        self.verifier = Box::new(verifier);
    }

    pub fn set_parser(&mut self, parser: OpParserFn) {
        self.parser = parser;
    }

    pub fn set_printer<P>(&mut self, printer: P)
    where
        P: Fn(&Context, &printable::State, &Operation, &mut fmt::Formatter<'_>) -> fmt::Result
            + 'static,
    {
        self.printer = Box::new(printer);
    }

    pub fn set_fold_hook<F>(&mut self, fold: F)
    where
        F: Fn(&Context, &Operation, &[Option<AttrObj>]) -> Option<Vec<FoldResult>> + 'static,
    {
        self.fold = Some(Box::new(fold));
    }

    pub fn set_canonicalization_patterns<F>(&mut self, populate: F)
    where
        F: Fn(&mut RewritePatternSet, &Context) + 'static,
    {
        self.canonicalization_patterns = Some(Box::new(populate));
    }

    pub fn set_has_trait<F>(&mut self, has_trait: F)
    where
        F: Fn(Capability) -> bool + 'static,
    {
        self.has_trait = Some(Box::new(has_trait));
    }

    /// Fill in the hooks left unset and describe the kind to the operation table.
    pub(crate) fn into_abstract_operation(self) -> AbstractOperation {
        AbstractOperation {
            kind: self.kind,
            name: self.name,
            verifier: self.verifier,
            parser: self.parser,
            printer: self.printer,
            fold: self.fold.unwrap_or_else(|| -> FoldHookFn { Box::new(no_fold) }),
            canonicalization_patterns: self
                .canonicalization_patterns
                .unwrap_or_else(|| -> CanonicalizationPatternsFn {
                    Box::new(no_canonicalization_patterns)
                }),
            has_trait: self
                .has_trait
                .unwrap_or_else(|| -> HasTraitFn { Box::new(no_traits) }),
            capabilities: CapabilitySet::from_iter([IS_DYNAMIC_OP]),
        }
    }
}

fn parse_missing<'a>(
    _state_stream: &mut StateStream<'a>,
    op_state: OperationState,
) -> ParseResult<'a, Operation> {
    let res: Result<Operation> = input_err!(
        op_state.loc,
        DynamicOpParserMissingErr(op_state.name.to_string())
    );
    res.into_parse_result()
}

fn no_fold(_: &Context, _: &Operation, _: &[Option<AttrObj>]) -> Option<Vec<FoldResult>> {
    None
}

fn no_canonicalization_patterns(_: &mut RewritePatternSet, _: &Context) {}

fn no_traits(_: Capability) -> bool {
    false
}
