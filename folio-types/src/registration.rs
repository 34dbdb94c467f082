use std::fmt;

/// Handle returned when an observer or resolver is registered.
///
/// Call [`Registration::unregister`] to remove the registration. Dropping the
/// handle leaves the registration in place.
pub struct Registration {
    remove: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Registration {
    /// Wraps the closure that undoes a registration.
    pub fn new(remove: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            remove: Some(Box::new(remove)),
        }
    }

    /// A handle with nothing to undo.
    pub fn noop() -> Self {
        Self { remove: None }
    }

    /// Removes the registration.
    pub fn unregister(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("active", &self.remove.is_some())
            .finish()
    }
}
