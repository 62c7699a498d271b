//! # Commands
//!
//! A command is an immutable value whose runtime type is its only routing key.
//! There is no topic or name field: every registered subscriber sees every
//! command and decides by type whether it cares.
//!
//! ```rust
//! use command_bus::Command;
//!
//! #[derive(Debug)]
//! struct CharacterMove {
//!     x: i32,
//!     y: i32,
//! }
//!
//! impl Command for CharacterMove {}
//!
//! let command: &dyn Command = &CharacterMove { x: 1, y: 2 };
//! assert!(command.is::<CharacterMove>());
//! assert_eq!(command.downcast_ref::<CharacterMove>().map(|m| m.x + m.y), Some(3));
//! ```

use std::any::{Any, TypeId};

/// Upcast helper so `dyn Command` can be inspected as `dyn Any`.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Marker capability for values that can be published on a bus.
pub trait Command: AsAny + Send + Sync {
    /// Name used in logs and error messages.
    fn command_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl<'a> dyn Command + 'a {
    pub fn is<T: Command>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Command>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Runtime type of the concrete command.
    pub fn command_type(&self) -> TypeId {
        Any::type_id(self.as_any())
    }
}
