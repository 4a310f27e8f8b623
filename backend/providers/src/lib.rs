pub mod grok;
pub mod mock;

pub use grok::GrokProvider;
pub use mock::MockProvider;
