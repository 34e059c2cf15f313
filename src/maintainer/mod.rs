//! The single-writer maintainer and the channels that feed it: one thread
//! owns the recency list and aggregated size outright, fed by bounded queues
//! instead of a lock shared with every reader.

mod actor;
mod messages;

pub(crate) use actor::Maintainer;
pub(crate) use messages::ControlMsg;
