pub mod document;
pub mod generic;
pub mod plaintext;
pub mod python_plugin;
pub mod rust_plugin;

pub use document::DocumentPlugin;
pub use generic::GenericPlugin;
pub use plaintext::PlaintextPlugin;
pub use python_plugin::PythonPlugin;
pub use rust_plugin::RustPlugin;
