//! Print-defaults command

use crate::{DefaultsKind, PrintDefaultsArgs};
use anyhow::Result;
use retouch_render::{Adjustments, RenderConfig};

pub fn run(args: PrintDefaultsArgs, config: &RenderConfig) -> Result<()> {
    let text = match args.kind {
        DefaultsKind::Adjustments => Adjustments::default().to_ron_string()?,
        DefaultsKind::Config => config.to_ron_string()?,
    };
    println!("{text}");
    Ok(())
}
