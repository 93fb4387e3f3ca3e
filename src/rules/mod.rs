//! Rule definitions and rule activation in quality profiles.

pub mod activation;
pub mod finder;

pub use activation::{ActiveRuleWriter, RuleActivator};
pub use finder::{RuleCatalog, RuleDefinition, RuleFinder, RuleLoader};
