//! Message analysis pipeline: normalize → score / classify / extract →
//! merge → persist → notify.

pub mod analyzer;
pub mod classifier;
pub mod extractor;
pub mod normalizer;
pub mod scorer;
pub mod types;

pub use analyzer::Analyzer;
pub use classifier::{Classifier, LexicalClassifier};
pub use extractor::{ActionExtractor, PatternExtractor};
pub use normalizer::normalize;
pub use types::{
    ActionCategory, ActionItem, ActionPriority, ActionStatus, AnalysisResult, CanonicalMessage,
    Classification, PriorityVerdict, Sentiment, SourcePlatform,
};
