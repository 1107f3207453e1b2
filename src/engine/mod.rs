pub mod evaluator;
pub mod poller;

pub use evaluator::{evaluate, evaluate_html, Action, CheckRule, Condition, Evaluation, MatchResult};
pub use poller::Poller;
