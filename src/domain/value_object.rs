//! Value Objects for domain models.
//!
//! Value Objects are immutable objects that represent values in the domain.
//! They are compared by their value, not by identity.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::ValueObjectError;

/// Connection identifier value object.
///
/// Represents the transport-level identity of one live WebSocket
/// connection. Generated server-side (see `ConnectionIdFactory`), never
/// supplied by the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Create a new ConnectionId.
    ///
    /// # Returns
    ///
    /// A Result containing the ConnectionId or an error if validation fails
    pub fn new(id: String) -> Result<Self, ValueObjectError> {
        if id.is_empty() {
            return Err(ValueObjectError::ConnectionIdEmpty);
        }
        let len = id.len();
        if len > 100 {
            return Err(ValueObjectError::ConnectionIdTooLong {
                max: 100,
                actual: len,
            });
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room identifier value object.
///
/// Room ids are caller-supplied string keys; the first join to an
/// unseen id creates the room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(String);

impl RoomId {
    /// Create a new RoomId.
    ///
    /// # Returns
    ///
    /// A Result containing the RoomId or an error if validation fails
    pub fn new(id: String) -> Result<Self, ValueObjectError> {
        if id.is_empty() {
            return Err(ValueObjectError::RoomIdEmpty);
        }
        let len = id.len();
        if len > 100 {
            return Err(ValueObjectError::RoomIdTooLong {
                max: 100,
                actual: len,
            });
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display name value object.
///
/// Human-readable participant label carried in join requests and
/// presence rosters. Purely informational; uniqueness is not enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayName(String);

impl DisplayName {
    /// Fallback name used when a join request carries none.
    pub const ANONYMOUS: &'static str = "anonymous";

    /// Create a new DisplayName.
    pub fn new(name: String) -> Result<Self, ValueObjectError> {
        if name.is_empty() {
            return Err(ValueObjectError::DisplayNameEmpty);
        }
        let len = name.len();
        if len > 100 {
            return Err(ValueObjectError::DisplayNameTooLong {
                max: 100,
                actual: len,
            });
        }
        Ok(Self(name))
    }

    /// Create the fallback name for joiners that did not supply one.
    pub fn anonymous() -> Self {
        Self(Self::ANONYMOUS.to_string())
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Timestamp value object.
///
/// Represents a Unix timestamp in milliseconds (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Create a new Timestamp from Unix milliseconds.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the inner i64 value.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_success() {
        // given:
        let id = "c0ffee".to_string();

        // when:
        let result = ConnectionId::new(id);

        // then:
        assert!(result.is_ok());
        assert_eq!(result.unwrap().as_str(), "c0ffee");
    }

    #[test]
    fn test_connection_id_new_empty_fails() {
        // when:
        let result = ConnectionId::new("".to_string());

        // then:
        assert_eq!(result.unwrap_err(), ValueObjectError::ConnectionIdEmpty);
    }

    #[test]
    fn test_connection_id_new_too_long_fails() {
        // given:
        let id = "a".repeat(101);

        // when:
        let result = ConnectionId::new(id);

        // then:
        assert_eq!(
            result.unwrap_err(),
            ValueObjectError::ConnectionIdTooLong {
                max: 100,
                actual: 101
            }
        );
    }

    #[test]
    fn test_connection_id_equality() {
        // given:
        let id1 = ConnectionId::new("x".to_string()).unwrap();
        let id2 = ConnectionId::new("x".to_string()).unwrap();
        let id3 = ConnectionId::new("y".to_string()).unwrap();

        // then:
        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn test_room_id_new_success() {
        // when:
        let result = RoomId::new("r1".to_string());

        // then:
        assert!(result.is_ok());
        assert_eq!(result.unwrap().as_str(), "r1");
    }

    #[test]
    fn test_room_id_new_empty_fails() {
        // when:
        let result = RoomId::new("".to_string());

        // then:
        assert_eq!(result.unwrap_err(), ValueObjectError::RoomIdEmpty);
    }

    #[test]
    fn test_room_id_new_too_long_fails() {
        // given:
        let id = "r".repeat(101);

        // when:
        let result = RoomId::new(id);

        // then:
        assert_eq!(
            result.unwrap_err(),
            ValueObjectError::RoomIdTooLong {
                max: 100,
                actual: 101
            }
        );
    }

    #[test]
    fn test_display_name_new_success() {
        // when:
        let result = DisplayName::new("Magnus".to_string());

        // then:
        assert!(result.is_ok());
        assert_eq!(result.unwrap().as_str(), "Magnus");
    }

    #[test]
    fn test_display_name_new_empty_fails() {
        // when:
        let result = DisplayName::new("".to_string());

        // then:
        assert_eq!(result.unwrap_err(), ValueObjectError::DisplayNameEmpty);
    }

    #[test]
    fn test_display_name_anonymous() {
        // when:
        let name = DisplayName::anonymous();

        // then:
        assert_eq!(name.as_str(), "anonymous");
    }

    #[test]
    fn test_timestamp_ordering() {
        // given:
        let ts1 = Timestamp::new(1000);
        let ts2 = Timestamp::new(2000);

        // then:
        assert!(ts1 < ts2);
        assert_eq!(ts2.value(), 2000);
    }
}
