pub mod dispatcher;
pub mod engine;
pub mod sweeper;
pub mod topic;

pub use dispatcher::Dispatcher;
pub use engine::{Broker, SharedTopic, TopicStats};
pub use topic::TopicQueue;
