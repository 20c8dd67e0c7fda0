//! # retouch-render
//!
//! Turns a source image and an edit state into a rendered image.
//!
//! - [`Adjustments`] - the complete, immutable edit state (RON-serializable)
//! - [`Pipeline`] - staged render with progress, cancellation and preview sizing
//! - [`History`] - linear undo/redo of edit states
//! - [`AutoVariant`] - one-tap auto-enhance flavours over the analyzed base
//! - [`RenderSession`] - latest-request-wins background worker with cached
//!   segmentation and analysis
//! - [`RenderConfig`] - pipeline tunables, loadable from RON
//!
//! ## Quick Start
//!
//! ```rust
//! use retouch_core::{CancelToken, Raster};
//! use retouch_render::{Adjustments, History, Pipeline, RenderRequest};
//!
//! let src = Raster::filled(40, 30, [90, 110, 130, 255]);
//! let mut history = History::default();
//! history.commit(Adjustments { vibrance: 0.4, sharpen: 0.3, ..Default::default() });
//!
//! let pipeline = Pipeline::default();
//! let out = pipeline
//!     .render(&src, history.current(), None, &RenderRequest::full(), &CancelToken::new(), &|_| {})
//!     .unwrap();
//! assert_eq!(out.dimensions(), (40, 30));
//! assert!(history.can_undo());
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod adjustments;
pub mod auto_enhance;
pub mod config;
pub mod error;
pub mod history;
pub mod pipeline;
pub mod segmentation;
pub mod session;

pub use adjustments::Adjustments;
pub use auto_enhance::AutoVariant;
pub use config::{RenderConfig, StageWeights};
pub use error::{RenderError, RenderResult};
pub use history::History;
pub use pipeline::{Pipeline, RenderRequest};
pub use segmentation::SegmentationProvider;
pub use session::{Generation, RenderSession, SessionEvent, SessionMsg};
