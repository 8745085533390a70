pub mod candidate;
pub mod candidate_extractor;
pub mod candidate_selector;
pub mod enclosing_circle;
pub mod hsv;
pub mod quantizer;
pub mod segmenter;
pub mod steering;
