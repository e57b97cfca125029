pub mod matcher_llm;

pub use matcher_llm::GeminiMatcherAdapter;
