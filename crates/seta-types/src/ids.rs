//! Identifier types.
//!
//! [`ShooterId`] and [`RaceId`] are opaque client-chosen strings that also
//! name directories in the shot store. They can only be constructed through
//! validation, so a value of either type is always path-safe.
//!
//! [`ConnectionId`] identifies one live feed connection and is generated
//! server-side as a UUID v7.

use core::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Maximum identifier length in bytes.
pub const MAX_ID_LEN: usize = 128;

/// Check that `value` can safely be used as a single path component.
fn validate_component(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Missing(field));
    }
    if value.len() > MAX_ID_LEN {
        return Err(ValidationError::TooLong {
            field,
            max: MAX_ID_LEN,
        });
    }
    if value.contains(['/', '\\']) {
        return Err(ValidationError::Separator { field });
    }
    if value.contains("..") || value.starts_with('.') {
        return Err(ValidationError::Traversal { field });
    }
    if value.chars().any(char::is_control) {
        return Err(ValidationError::ControlCharacter { field });
    }
    Ok(())
}

/// Generates a validated string identifier newtype.
macro_rules! define_path_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validate and wrap an identifier.
            pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
                let value = value.into();
                validate_component($field, &value)?;
                Ok(Self(value))
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_path_id! {
    /// Identifier of a shooter. Doubles as the shooter's directory name.
    ShooterId, "user_id"
}

define_path_id! {
    /// Identifier of a race within one shooter. Doubles as a directory name.
    RaceId, "race_id"
}

/// Identifies one shot partition: every shot of one shooter in one race.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartitionKey {
    /// The shooter owning the partition.
    pub shooter: ShooterId,
    /// The race within that shooter.
    pub race: RaceId,
}

/// Live feed subscription key. Same shape as a storage partition.
pub type Topic = PartitionKey;

impl PartitionKey {
    /// Build a key from already validated identifiers.
    pub const fn new(shooter: ShooterId, race: RaceId) -> Self {
        Self { shooter, race }
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.shooter, self.race)
    }
}

/// Identifier of one live feed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
