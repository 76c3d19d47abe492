mod accessibility;
mod rules;

pub use accessibility::AccessibilityRule;
pub use rules::{ValidationContext, ValidationRule};
