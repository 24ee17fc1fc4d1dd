pub mod analyze;
pub mod diag;
pub mod history;
pub mod news;
pub mod youtube;

use clap::ValueEnum;
use sentix_protocol::Sentiment;

pub use analyze::{AnalyzeArgs, AnalyzeRowArgs, PredictArgs};
pub use diag::{PrefsCmd, SchemaArgs};
pub use history::HistoryCmd;
pub use news::NewsCmd;
pub use youtube::YoutubeArgs;

#[derive(ValueEnum, Clone, Copy)]
pub enum LabelArg {
    Positive,
    Neutral,
    Negative,
}

impl From<LabelArg> for Sentiment {
    fn from(l: LabelArg) -> Self {
        match l {
            LabelArg::Positive => Sentiment::Positive,
            LabelArg::Neutral => Sentiment::Neutral,
            LabelArg::Negative => Sentiment::Negative,
        }
    }
}
