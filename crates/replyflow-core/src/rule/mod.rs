//! Rule domain module.
//!
//! # Module Structure
//!
//! - `model`: validated rule (`Rule`) and its config form (`RuleConfig`)
//! - `matcher`: keyword/glob matching with emoji normalization
//! - `delay`: seedable delay calculation (`DelayCalculator`)
//! - `template`: fail-soft reply rendering
//! - `engine`: priority-ordered resolution (`RuleEngine`, `MatchResult`)

mod delay;
mod engine;
pub mod matcher;
mod model;
pub mod template;

pub use delay::DelayCalculator;
pub use engine::{MatchResult, RuleEngine, RuleSet};
pub use matcher::{Pattern, matches};
pub use model::{Rule, RuleConfig};
pub use template::{ReplyVariables, TemplateContext, render};
