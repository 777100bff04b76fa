use crate::instance::InstanceId;

/// Misuse of a component instance.
///
/// Binding problems (malformed declarations, missing store fields, read-only
/// assignments) are never reported here: they are absorbed and logged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("instance {instance} has no method `{name}`")]
    UnknownMethod { instance: InstanceId, name: String },
    #[error("instance {0} has been destroyed")]
    Destroyed(InstanceId),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
