//! Server-pushed events.
//!
//! An EVENT body starts with a `[string]` event type that selects one of
//! three layouts: schema changes, node status changes, and topology
//! changes. Change-type strings (`CREATED`, `UP`, `NEW_NODE`, ...) are
//! carried verbatim and not validated, so unknown values round-trip; the
//! event type and the schema-change target, which select wire layouts, are
//! validated strictly.

use std::net::SocketAddr;

use crate::{
    errors::{CodecError, Result},
    messages::{Message, MessageCodec},
    opcodes::Opcode,
    primitives,
    version::ProtocolVersion,
};

/// Event type for schema modifications.
pub const EVENT_TYPE_SCHEMA_CHANGE: &str = "SCHEMA_CHANGE";
/// Event type for node status transitions.
pub const EVENT_TYPE_STATUS_CHANGE: &str = "STATUS_CHANGE";
/// Event type for cluster membership changes.
pub const EVENT_TYPE_TOPOLOGY_CHANGE: &str = "TOPOLOGY_CHANGE";

/// Schema-change target: a whole keyspace; no further fields follow.
pub const SCHEMA_CHANGE_TARGET_KEYSPACE: &str = "KEYSPACE";
/// Schema-change target: a table; the object name follows.
pub const SCHEMA_CHANGE_TARGET_TABLE: &str = "TABLE";
/// Schema-change target: a user type; the object name follows.
pub const SCHEMA_CHANGE_TARGET_TYPE: &str = "TYPE";
/// Schema-change target: a function; object name and argument types follow
/// (protocol v4+).
pub const SCHEMA_CHANGE_TARGET_FUNCTION: &str = "FUNCTION";
/// Schema-change target: an aggregate; object name and argument types
/// follow (protocol v4+).
pub const SCHEMA_CHANGE_TARGET_AGGREGATE: &str = "AGGREGATE";

/// Schema-change type for created objects.
pub const SCHEMA_CHANGE_CREATED: &str = "CREATED";
/// Schema-change type for updated objects.
pub const SCHEMA_CHANGE_UPDATED: &str = "UPDATED";
/// Schema-change type for dropped objects.
pub const SCHEMA_CHANGE_DROPPED: &str = "DROPPED";

/// Status-change type for a node coming up.
pub const STATUS_CHANGE_UP: &str = "UP";
/// Status-change type for a node going down.
pub const STATUS_CHANGE_DOWN: &str = "DOWN";

/// Topology-change type for a node joining the cluster.
pub const TOPOLOGY_CHANGE_NEW_NODE: &str = "NEW_NODE";
/// Topology-change type for a node leaving the cluster.
pub const TOPOLOGY_CHANGE_REMOVED_NODE: &str = "REMOVED_NODE";

/// A server-pushed event (response).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A schema object was created, updated or dropped
    SchemaChange(SchemaChangeEvent),
    /// A node changed status
    StatusChange(StatusChangeEvent),
    /// The cluster topology changed
    TopologyChange(TopologyChangeEvent),
}

impl Event {
    /// The `[string]` event type opening this event's body.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::SchemaChange(_) => EVENT_TYPE_SCHEMA_CHANGE,
            Self::StatusChange(_) => EVENT_TYPE_STATUS_CHANGE,
            Self::TopologyChange(_) => EVENT_TYPE_TOPOLOGY_CHANGE,
        }
    }
}

/// A schema modification event.
///
/// `object` is meaningful for every target except
/// [`SCHEMA_CHANGE_TARGET_KEYSPACE`], and `arguments` only for function and
/// aggregate targets; the encoder ignores them otherwise, so they are left
/// empty for the targets that do not carry them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaChangeEvent {
    /// CREATED, UPDATED or DROPPED (not validated)
    pub change_type: String,
    /// What kind of schema object changed; selects the remaining layout
    pub target: String,
    /// Keyspace containing the changed object
    pub keyspace: String,
    /// Name of the changed object, empty for keyspace targets
    pub object: String,
    /// Argument types, for function and aggregate targets only
    pub arguments: Vec<String>,
}

/// A node status transition event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChangeEvent {
    /// UP or DOWN (not validated)
    pub change_type: String,
    /// Address of the node that changed status
    pub address: SocketAddr,
}

/// A cluster membership change event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyChangeEvent {
    /// NEW_NODE or REMOVED_NODE (not validated)
    pub change_type: String,
    /// Address of the node that joined or left
    pub address: SocketAddr,
}

/// Codec for EVENT bodies.
pub struct EventCodec;

impl EventCodec {
    fn function_target_supported(version: ProtocolVersion) -> Result<()> {
        if version < ProtocolVersion::V4 {
            return Err(CodecError::VersionFeatureMismatch {
                feature: "FUNCTION and AGGREGATE schema change events",
                version,
            });
        }
        Ok(())
    }
}

impl MessageCodec for EventCodec {
    fn opcode(&self) -> Opcode {
        Opcode::Event
    }

    fn encode(&self, message: &Message, dst: &mut Vec<u8>, version: ProtocolVersion) -> Result<()> {
        let event = match message {
            Message::Event(event) => event,
            other => {
                return Err(CodecError::TypeMismatch {
                    expected: self.opcode(),
                    actual: other.kind(),
                });
            },
        };
        primitives::write_string(event.event_type(), dst)?;
        match event {
            Event::SchemaChange(change) => {
                primitives::write_string(&change.change_type, dst)?;
                primitives::write_string(&change.target, dst)?;
                primitives::write_string(&change.keyspace, dst)?;
                match change.target.as_str() {
                    SCHEMA_CHANGE_TARGET_KEYSPACE => {},
                    SCHEMA_CHANGE_TARGET_TABLE | SCHEMA_CHANGE_TARGET_TYPE => {
                        primitives::write_string(&change.object, dst)?;
                    },
                    SCHEMA_CHANGE_TARGET_FUNCTION | SCHEMA_CHANGE_TARGET_AGGREGATE => {
                        Self::function_target_supported(version)?;
                        primitives::write_string(&change.object, dst)?;
                        primitives::write_string_list(&change.arguments, dst)?;
                    },
                    other => {
                        return Err(CodecError::UnknownVariant {
                            kind: "schema change target",
                            value: other.to_owned(),
                        });
                    },
                }
            },
            Event::StatusChange(change) => {
                primitives::write_string(&change.change_type, dst)?;
                primitives::write_inet(&change.address, dst)?;
            },
            Event::TopologyChange(change) => {
                primitives::write_string(&change.change_type, dst)?;
                primitives::write_inet(&change.address, dst)?;
            },
        }
        Ok(())
    }

    fn encoded_length(&self, message: &Message, version: ProtocolVersion) -> Result<usize> {
        let event = match message {
            Message::Event(event) => event,
            other => {
                return Err(CodecError::TypeMismatch {
                    expected: self.opcode(),
                    actual: other.kind(),
                });
            },
        };
        let mut length = primitives::length_of_string(event.event_type());
        match event {
            Event::SchemaChange(change) => {
                length += primitives::length_of_string(&change.change_type);
                length += primitives::length_of_string(&change.target);
                length += primitives::length_of_string(&change.keyspace);
                match change.target.as_str() {
                    SCHEMA_CHANGE_TARGET_KEYSPACE => {},
                    SCHEMA_CHANGE_TARGET_TABLE | SCHEMA_CHANGE_TARGET_TYPE => {
                        length += primitives::length_of_string(&change.object);
                    },
                    SCHEMA_CHANGE_TARGET_FUNCTION | SCHEMA_CHANGE_TARGET_AGGREGATE => {
                        Self::function_target_supported(version)?;
                        length += primitives::length_of_string(&change.object);
                        length += primitives::length_of_string_list(&change.arguments);
                    },
                    other => {
                        return Err(CodecError::UnknownVariant {
                            kind: "schema change target",
                            value: other.to_owned(),
                        });
                    },
                }
            },
            Event::StatusChange(change) => {
                length += primitives::length_of_string(&change.change_type);
                length += primitives::length_of_inet(&change.address);
            },
            Event::TopologyChange(change) => {
                length += primitives::length_of_string(&change.change_type);
                length += primitives::length_of_inet(&change.address);
            },
        }
        Ok(length)
    }

    fn decode(&self, src: &mut &[u8], version: ProtocolVersion) -> Result<Message> {
        let event_type = primitives::read_string(src)?;
        let event = match event_type.as_str() {
            EVENT_TYPE_SCHEMA_CHANGE => {
                let change_type = primitives::read_string(src)?;
                let target = primitives::read_string(src)?;
                let keyspace = primitives::read_string(src)?;
                let mut object = String::new();
                let mut arguments = Vec::new();
                match target.as_str() {
                    SCHEMA_CHANGE_TARGET_KEYSPACE => {},
                    SCHEMA_CHANGE_TARGET_TABLE | SCHEMA_CHANGE_TARGET_TYPE => {
                        object = primitives::read_string(src)?;
                    },
                    SCHEMA_CHANGE_TARGET_FUNCTION | SCHEMA_CHANGE_TARGET_AGGREGATE => {
                        Self::function_target_supported(version)?;
                        object = primitives::read_string(src)?;
                        arguments = primitives::read_string_list(src)?;
                    },
                    other => {
                        return Err(CodecError::UnknownVariant {
                            kind: "schema change target",
                            value: other.to_owned(),
                        });
                    },
                }
                Event::SchemaChange(SchemaChangeEvent {
                    change_type,
                    target,
                    keyspace,
                    object,
                    arguments,
                })
            },
            EVENT_TYPE_STATUS_CHANGE => {
                let change_type = primitives::read_string(src)?;
                let address = primitives::read_inet(src)?;
                Event::StatusChange(StatusChangeEvent { change_type, address })
            },
            EVENT_TYPE_TOPOLOGY_CHANGE => {
                let change_type = primitives::read_string(src)?;
                let address = primitives::read_inet(src)?;
                Event::TopologyChange(TopologyChangeEvent { change_type, address })
            },
            other => {
                return Err(CodecError::UnknownVariant {
                    kind: "event type",
                    value: other.to_owned(),
                });
            },
        };
        Ok(Message::Event(event))
    }
}
