//! Render command

use crate::RenderArgs;
use anyhow::{bail, Result};
use retouch_core::CancelToken;
use retouch_render::{Pipeline, RenderConfig, RenderRequest};
use std::io::Write;
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, info};

pub fn run(args: RenderArgs, config: RenderConfig) -> Result<()> {
    let started = Instant::now();
    let source = super::load_image(&args.input)?;
    let adjustments = super::load_adjustments(args.adjustments.as_deref())?;
    let mask = args.mask.as_deref().map(super::load_mask).transpose()?;
    info!(
        input = %args.input.display(),
        width = source.width(),
        height = source.height(),
        "loaded source"
    );

    let request = RenderRequest {
        preview: args.preview,
        ignore_crop: args.no_crop,
    };
    let pipeline = Pipeline::new(config);
    let total = pipeline.config().stage_weights.total().max(f32::EPSILON);

    // the remaining share of the bar belongs to encoding and writing
    let last_shown = Mutex::new(-1i32);
    let quiet = args.quiet;
    let progress = |done: f32| {
        if quiet {
            return;
        }
        let pct = (done / total * 80.0).round() as i32;
        if let Ok(mut last) = last_shown.lock() {
            if pct > *last {
                *last = pct;
                eprint!("\rrendering {pct:3}%");
                let _ = std::io::stderr().flush();
            }
        }
    };

    let Ok(image) = pipeline.render(
        &source,
        &adjustments,
        mask.as_ref(),
        &request,
        &CancelToken::new(),
        &progress,
    ) else {
        bail!("render cancelled");
    };

    super::save_image(&args.output, &image, args.quality)?;
    if !quiet {
        eprintln!("\rrendering 100%");
    }
    debug!(
        output = %args.output.display(),
        width = image.width(),
        height = image.height(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "saved"
    );
    Ok(())
}
