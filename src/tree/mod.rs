//! Symbol Tree
//!
//! Builds the documentation model from translation units: one node per
//! documented symbol, parented by scope, grouped by category or owning
//! struct, with comments attached. External descriptions are merged in
//! before references are resolved.
//!
//! @module tree

pub mod affinity;
pub mod builder;
pub mod merge;
pub mod naming;
pub mod node;
pub mod registry;
pub mod resolve;
pub mod symbols;

pub use affinity::{NameHintAffinity, StructAffinity};
pub use builder::TreeBuilder;
pub use merge::{DocumentMerger, MergeStats};
pub use node::{Base, ClassInfo, CursorRef, FunctionInfo, Node, NodeDetails, NodeId, NodeKind};
pub use resolve::{ReferenceResolver, ResolveStats};
pub use symbols::{Tree, TreeStats};

use crate::ast::AstProvider;
use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::sources::SourceSet;

/// Parse every documented file, build the tree, merge the configured
/// description files and resolve references
pub fn build<P: AstProvider + ?Sized>(
    config: &Config,
    sources: SourceSet,
    provider: &mut P,
) -> Result<Tree> {
    let mut builder = TreeBuilder::new(config, sources);
    builder.process(provider)?;

    let mut tree = builder.finish();
    if !config.merge.files.is_empty() {
        DocumentMerger::new(&mut tree)
            .with_filter(config.merge.filter.clone())
            .merge(&config.merge.files)?;
    }
    ReferenceResolver::new(&mut tree).resolve_all();

    Ok(tree)
}
