pub mod delivery;
pub mod dispatcher;

pub use dispatcher::Notifier;
