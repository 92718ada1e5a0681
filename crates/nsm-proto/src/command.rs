//! NSM command table.

use std::fmt;

use crate::record::RecordKind;

/// A protocol command, identified on the wire by its label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    /// Placeholder for an unset command.
    Unknown,
    /// Acknowledgement.
    Ok,
    /// Failure report.
    Error,
    /// Log line forwarded by a node.
    Log,
    /// Read a node variable.
    VarGet,
    /// Write a node variable.
    VarSet,
    /// Request the variable list of a node.
    VarListGet,
    /// Variable list reply.
    VarListSet,
    /// Reply to a variable read.
    VarReply,
    /// Status record update; carries a status record.
    StatusSet,
    /// Request a status record.
    StatusGet,
    /// Configuration object update; carries a configuration record.
    ConfigSet,
    /// Request a configuration object.
    ConfigGet,
    /// Configuration list reply.
    ConfigListSet,
    /// Request the configuration names of a table.
    ConfigListGet,
    /// Request the recent log list.
    LogList,
    /// Any other label. Keeps the label and reports id `0`.
    Custom(String),
}

impl Command {
    /// Numeric id of the command.
    #[must_use]
    pub const fn id(&self) -> i32 {
        match self {
            Self::Unknown | Self::Custom(_) => 0,
            Self::Ok => 1,
            Self::Error => 2,
            Self::Log => 5,
            Self::VarGet => 11,
            Self::VarSet => 12,
            Self::VarListGet => 13,
            Self::VarListSet => 14,
            Self::VarReply => 15,
            Self::StatusSet => 401,
            Self::StatusGet => 402,
            Self::ConfigSet => 403,
            Self::ConfigGet => 404,
            Self::ConfigListSet => 405,
            Self::ConfigListGet => 406,
            Self::LogList => 407,
        }
    }

    /// Wire label of the command.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Ok => "OK",
            Self::Error => "ERROR",
            Self::Log => "LOG",
            Self::VarGet => "VGET",
            Self::VarSet => "VSET",
            Self::VarListGet => "VLISTGET",
            Self::VarListSet => "VLISTSET",
            Self::VarReply => "VREPLY",
            Self::StatusSet => "NSMSET",
            Self::StatusGet => "NSMGET",
            Self::ConfigSet => "DBSET",
            Self::ConfigGet => "DBGET",
            Self::ConfigListSet => "DBLISTSET",
            Self::ConfigListGet => "DBLISTGET",
            Self::LogList => "LOGLIST",
            Self::Custom(label) => label,
        }
    }

    /// Resolves a wire label. Unrecognised labels become [`Command::Custom`].
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label {
            "UNKNOWN" => Self::Unknown,
            "OK" => Self::Ok,
            "ERROR" => Self::Error,
            "LOG" => Self::Log,
            "VGET" => Self::VarGet,
            "VSET" => Self::VarSet,
            "VLISTGET" => Self::VarListGet,
            "VLISTSET" => Self::VarListSet,
            "VREPLY" => Self::VarReply,
            "NSMSET" => Self::StatusSet,
            "NSMGET" => Self::StatusGet,
            "DBSET" => Self::ConfigSet,
            "DBGET" => Self::ConfigGet,
            "DBLISTSET" => Self::ConfigListSet,
            "DBLISTGET" => Self::ConfigListGet,
            "LOGLIST" => Self::LogList,
            other => Self::Custom(other.to_owned()),
        }
    }

    /// Kind of the record that follows this command on the wire, if any.
    #[must_use]
    pub const fn record_kind(&self) -> Option<RecordKind> {
        match self {
            Self::StatusSet => Some(RecordKind::Status),
            Self::ConfigSet => Some(RecordKind::Configuration),
            _ => None,
        }
    }

    /// Whether the command is one of the reserved `OK`, `ERROR` or `LOG`
    /// notifications.
    #[must_use]
    pub const fn is_reserved(&self) -> bool {
        matches!(self, Self::Ok | Self::Error | Self::Log)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

impl From<&str> for Command {
    fn from(label: &str) -> Self {
        Self::from_label(label)
    }
}
