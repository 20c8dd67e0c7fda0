//! Analyze command

use crate::{AnalyzeArgs, VariantArg};
use anyhow::Result;
use retouch_render::{AutoVariant, Pipeline, RenderConfig};

impl From<VariantArg> for AutoVariant {
    fn from(v: VariantArg) -> Self {
        match v {
            VariantArg::None => AutoVariant::None,
            VariantArg::Balanced => AutoVariant::Balanced,
            VariantArg::Warm => AutoVariant::Warm,
            VariantArg::Cool => AutoVariant::Cool,
            VariantArg::Vivid => AutoVariant::Vivid,
        }
    }
}

pub fn run(args: AnalyzeArgs, config: RenderConfig) -> Result<()> {
    let source = super::load_image(&args.input)?;
    let base = Pipeline::new(config).analyze(&source);

    match args.variant {
        None => {
            println!("exposure: {:+.3}", base.exposure);
            println!("contrast: {:.3}", base.contrast);
        }
        Some(variant) => {
            let current = super::load_adjustments(args.adjustments.as_deref())?;
            let adjusted = AutoVariant::from(variant).apply(&current, &base);
            println!("{}", adjusted.to_ron_string()?);
        }
    }
    Ok(())
}
