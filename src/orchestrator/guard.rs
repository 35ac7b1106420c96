//! Scoped ownership of an open camera session.

use crate::provider::ConnectionProvider;
use crate::telemetry::{timed, Telemetry};
use std::ops::{Deref, DerefMut};

/// Disconnects the wrapped provider when dropped.
///
/// Created before `connect` so that every exit path, including early
/// returns and `?`, releases the session exactly once.
pub struct ConnectionGuard<'a, P: ConnectionProvider> {
    provider: &'a mut P,
    telemetry: &'a dyn Telemetry,
}

impl<'a, P: ConnectionProvider> ConnectionGuard<'a, P> {
    pub fn new(provider: &'a mut P, telemetry: &'a dyn Telemetry) -> Self {
        Self {
            provider,
            telemetry,
        }
    }
}

impl<P: ConnectionProvider> Deref for ConnectionGuard<'_, P> {
    type Target = P;

    fn deref(&self) -> &P {
        self.provider
    }
}

impl<P: ConnectionProvider> DerefMut for ConnectionGuard<'_, P> {
    fn deref_mut(&mut self) -> &mut P {
        self.provider
    }
}

impl<P: ConnectionProvider> Drop for ConnectionGuard<'_, P> {
    fn drop(&mut self) {
        let provider = &mut *self.provider;
        timed(self.telemetry, "disconnect", || provider.disconnect());
    }
}
