//! Buy/sell classification of bucketed volume.

mod flow;

pub use flow::{ClassifiedBar, FlowClassifier};
