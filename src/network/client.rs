//! Blocking client
//!
//! Sends one command at a time and waits for its response.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;

use crate::error::{Result, SyncError};
use crate::protocol::{read_response, write_command, Command, Response, Status};
use crate::reconciler::SyncReport;
use crate::store::{Record, RecordPatch};

/// Client connection to a msgsync server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a server address (host:port)
    pub fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| SyncError::Network(format!("cannot connect to {}: {}", addr, e)))?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Send a command and read its response
    pub fn request(&mut self, command: &Command) -> Result<Response> {
        write_command(&mut self.writer, command)?;
        read_response(&mut self.reader)
    }

    /// Create a record; returns `Created` or `Conflict`
    pub fn create(&mut self, record: Record) -> Result<Status> {
        self.status_of(&Command::Create { record })
    }

    /// Update a record; returns `NoContent` or `NotFound`
    pub fn update(&mut self, id: &str, patch: RecordPatch) -> Result<Status> {
        self.status_of(&Command::Update {
            id: id.to_string(),
            patch,
        })
    }

    /// Delete a record; returns `NoContent` or `NotFound`
    pub fn delete(&mut self, id: &str) -> Result<Status> {
        self.status_of(&Command::Delete { id: id.to_string() })
    }

    /// Fetch the current record
    pub fn get(&mut self, id: &str) -> Result<Option<Record>> {
        let response = self.request(&Command::Get { id: id.to_string() })?;
        match response.status {
            Status::Ok => {
                let payload = response.payload.unwrap_or_default();
                Ok(Some(bincode::deserialize(&payload)?))
            }
            Status::NotFound => Ok(None),
            _ => Err(server_error(&response)),
        }
    }

    /// Trigger one reconciliation pass
    pub fn sync(&mut self) -> Result<SyncReport> {
        let response = self.request(&Command::Sync)?;
        match response.status {
            Status::Ok => {
                let payload = response.payload.unwrap_or_default();
                Ok(bincode::deserialize(&payload)?)
            }
            _ => Err(server_error(&response)),
        }
    }

    pub fn ping(&mut self) -> Result<()> {
        let response = self.request(&Command::Ping)?;
        if response.status != Status::Ok {
            return Err(server_error(&response));
        }
        Ok(())
    }

    /// Send a mutation and return its status
    ///
    /// Validation outcomes come back as statuses; server failures are errors.
    fn status_of(&mut self, command: &Command) -> Result<Status> {
        let response = self.request(command)?;
        match response.status {
            Status::Error => Err(server_error(&response)),
            status => Ok(status),
        }
    }
}

fn server_error(response: &Response) -> SyncError {
    SyncError::Network(format!(
        "server returned {} ({})",
        response.status.http_code(),
        response.payload_text().unwrap_or_default()
    ))
}
