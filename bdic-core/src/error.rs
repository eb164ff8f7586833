//! Error taxonomy shared across the driver core.

use core::convert::Infallible;
use core::fmt;

/// Failure reported by a driver-core operation.
///
/// `E` is the bus layer's transaction error; operations that never touch the
/// bus use the [`Infallible`] default.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DriverError<E = Infallible> {
    /// Argument out of range or not a member of the relevant mask.
    Invalid,
    /// A required precondition (rail powered, subsystem initialized) does not
    /// hold.
    NotReady,
    /// The underlying bus transaction timed out or signaled a fault.
    Bus(E),
    /// A deferred-work node could not be queued.
    QueueFull,
}

impl<E> From<E> for DriverError<E> {
    fn from(error: E) -> Self {
        DriverError::Bus(error)
    }
}

impl<E: fmt::Debug> fmt::Display for DriverError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
