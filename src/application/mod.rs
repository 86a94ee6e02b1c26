pub mod interfaces;
pub mod use_cases;
