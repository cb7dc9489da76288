pub mod config;
pub mod filter;
pub mod keys;
pub mod layout;
pub mod speed;
pub mod text;
pub mod types;

// Keep the public surface small and intentional.
pub use config::*;
pub use filter::*;
pub use keys::*;
pub use layout::*;
pub use speed::*;
pub use text::*;
pub use types::*;
