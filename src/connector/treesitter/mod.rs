pub mod wrapper;

pub use wrapper::{QueryPurpose, TreeSitterWrapper};
