//! Multi-Agent Research Pipeline
//!
//! Turns a mission profile and the intent record into a structured [`Report`]:
//!
//! 1. **Search** - live web results, or a "no live data" placeholder
//! 2. **Analysis** - primary and (optional) secondary LLM, run concurrently
//! 3. **Synthesis** - mode-specific merge into the report JSON
//!
//! # Usage
//!
//! ```ignore
//! use acip::research::ResearchPipeline;
//!
//! let pipeline = ResearchPipeline::new(primary, timeouts)
//!     .with_secondary(secondary)
//!     .with_search(search);
//!
//! let report = pipeline.run(&intent, Some(profile), None, &cancel).await?;
//! println!("{}", report.verified_truth);
//! ```

pub mod pipeline;
/// Prompt templates and fixed placeholder texts.
pub mod prompts;
pub mod report;

pub use pipeline::ResearchPipeline;
pub use report::{Evidence, Plan, Report, ResearchProgress};
