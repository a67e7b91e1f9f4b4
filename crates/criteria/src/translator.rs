//! The visitor protocol implemented by back-ends.
//!
//! Traversal is driven by the translator. [`Translator::translate`] visits the
//! root node; from there the translator decides when to descend into joins
//! (via [`JoinAttachment::accept`](crate::JoinAttachment::accept)) and filter
//! trees (via [`FilterGroup::accept`]). Node and join visits write into the
//! caller-supplied context; filter visits return a condition fragment.

use crate::criteria::Criteria;
use crate::error::{CriteriaError, Error};
use crate::filter::Filter;
use crate::group::FilterGroup;
use crate::relation::JoinParameters;

/// A back-end that turns a criteria tree into its own query form.
pub trait Translator {
    /// Mutable state the translation writes into (e.g. a query under
    /// construction).
    type Context;

    /// The fragment a filter or group translates to.
    type Condition;

    /// Back-end error; crate errors raised during traversal convert into it.
    type Error: From<Error>;

    /// Translates a root criteria into `context`.
    fn translate(&mut self, root: &Criteria, context: &mut Self::Context) -> Result<(), Self::Error>
    where
        Self: Sized,
    {
        if root.kind().is_join() {
            return Err(Error::from(CriteriaError::NotARoot { kind: root.kind() }).into());
        }
        root.accept(self, context)
    }

    fn visit_root(&mut self, criteria: &Criteria, context: &mut Self::Context) -> Result<(), Self::Error>;

    fn visit_inner_join(
        &mut self,
        criteria: &Criteria,
        parameters: &JoinParameters,
        context: &mut Self::Context,
    ) -> Result<(), Self::Error>;

    fn visit_left_join(
        &mut self,
        criteria: &Criteria,
        parameters: &JoinParameters,
        context: &mut Self::Context,
    ) -> Result<(), Self::Error>;

    fn visit_outer_join(
        &mut self,
        criteria: &Criteria,
        parameters: &JoinParameters,
        context: &mut Self::Context,
    ) -> Result<(), Self::Error>;

    /// Translates one condition on a field of the node aliased `alias`.
    fn visit_filter(
        &mut self,
        filter: &Filter,
        alias: &str,
        context: &mut Self::Context,
    ) -> Result<Self::Condition, Self::Error>;

    fn visit_and_group(
        &mut self,
        group: &FilterGroup,
        alias: &str,
        context: &mut Self::Context,
    ) -> Result<Self::Condition, Self::Error>;

    fn visit_or_group(
        &mut self,
        group: &FilterGroup,
        alias: &str,
        context: &mut Self::Context,
    ) -> Result<Self::Condition, Self::Error>;
}
