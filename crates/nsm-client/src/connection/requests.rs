//! GET-style request builders.
//!
//! Every request names the target node in the message and the object of
//! interest in the payload. Replies arrive asynchronously through the
//! dispatcher; status and configuration replies land in the cache.

use nsm_proto::{Command, Message, RecordKind};

use super::{Connection, ConnectionBuilder};
use crate::dispatch::HandlerBuilder;
use crate::error::{ClientError, HandlerError};

impl Connection {
    /// Requests the status record `name` published by `node`.
    ///
    /// # Errors
    ///
    /// See [`Connection::send`].
    pub fn request_status(&self, node: &str, name: &str) -> Result<(), ClientError> {
        self.request(Command::StatusGet, node, name)
    }

    /// Requests the configuration object `name` from `node`.
    ///
    /// # Errors
    ///
    /// See [`Connection::send`].
    pub fn request_config(&self, node: &str, name: &str) -> Result<(), ClientError> {
        self.request(Command::ConfigGet, node, name)
    }

    /// Requests the configuration names stored in `table`.
    ///
    /// # Errors
    ///
    /// See [`Connection::send`].
    pub fn request_config_list(&self, node: &str, table: &str) -> Result<(), ClientError> {
        self.request(Command::ConfigListGet, node, table)
    }

    /// Requests the value of variable `name` on `node`.
    ///
    /// # Errors
    ///
    /// See [`Connection::send`].
    pub fn request_var(&self, node: &str, name: &str) -> Result<(), ClientError> {
        self.request(Command::VarGet, node, name)
    }

    /// Requests the variable list of `node`.
    ///
    /// # Errors
    ///
    /// See [`Connection::send`].
    pub fn request_var_list(&self, node: &str) -> Result<(), ClientError> {
        self.request(Command::VarListGet, node, "")
    }

    /// Requests the recent log lines of `node`.
    ///
    /// # Errors
    ///
    /// See [`Connection::send`].
    pub fn request_log_list(&self, node: &str) -> Result<(), ClientError> {
        self.request(Command::LogList, node, "")
    }

    /// Requests a record of `kind`.
    ///
    /// # Errors
    ///
    /// See [`Connection::send`].
    pub fn request_record(
        &self,
        kind: RecordKind,
        node: &str,
        name: &str,
    ) -> Result<(), ClientError> {
        match kind {
            RecordKind::Status => self.request_status(node, name),
            RecordKind::Configuration => self.request_config(node, name),
        }
    }

    fn request(&self, command: Command, node: &str, payload: &str) -> Result<(), ClientError> {
        self.send(&Message::new(command, node).with_payload(payload))
    }
}

impl ConnectionBuilder {
    /// Requests `record` of `kind` from `target` after every handshake,
    /// seeding the push subscription again after each reconnect.
    #[must_use]
    pub fn subscribe(
        self,
        kind: RecordKind,
        target: impl Into<String>,
        record: impl Into<String>,
    ) -> Self {
        let node = target.into();
        let name = record.into();
        self.handler(
            HandlerBuilder::new()
                .on_connected(move |connection| {
                    connection
                        .request_record(kind, &node, &name)
                        .map_err(HandlerError::from)
                })
                .build(),
        )
    }
}
