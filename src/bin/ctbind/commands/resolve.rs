//! `ctbind resolve` command

use anyhow::Result;

use crate::cli::ResolveArgs;
use ctbind::bindings::{resolve_return_type, resolve_type};
use ctbind::core::TypeDescriptor;

pub fn execute(args: ResolveArgs) -> Result<()> {
    let desc = args
        .tags
        .into_iter()
        .fold(TypeDescriptor::parse(&args.spelling), TypeDescriptor::with_tag);

    tracing::debug!(
        "base `{}`, pointer level {}, tags {:?}",
        desc.base_type,
        desc.pointer_level,
        desc.tags
    );

    let rendered = if args.returns {
        resolve_return_type(&desc)?.map_or_else(|| "None".to_string(), |ty| ty.to_string())
    } else {
        resolve_type(&desc)?.to_string()
    };
    println!("{}", rendered);

    Ok(())
}
