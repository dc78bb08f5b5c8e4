//! In-memory remote shell for testing collectors without SSH.
//!
//! `MockShell` answers commands from a table of canned outputs and records
//! every session event, so tests can check how the collector drives the
//! transport.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::collector::traits::{RemoteSession, RemoteShell, Target, TransportError};

/// A transport interaction recorded by [`MockShell`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    /// A session was opened to the given host.
    Open(String),
    /// A command was executed.
    Exec(String),
    /// The session was closed.
    Close,
}

#[derive(Debug, Clone)]
enum Reply {
    Stdout(String),
    Fail(String),
}

#[derive(Debug, Clone)]
enum ConnectFailure {
    Timeout,
    Refused(String),
}

/// Remote shell that serves canned command output.
#[derive(Debug, Clone, Default)]
pub struct MockShell {
    replies: HashMap<String, Reply>,
    connect_failure: Option<ConnectFailure>,
    events: Rc<RefCell<Vec<MockEvent>>>,
}

impl MockShell {
    /// Creates a shell that knows no commands.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the standard output returned for `command`.
    pub fn add_command(&mut self, command: impl Into<String>, stdout: impl Into<String>) {
        self.replies
            .insert(command.into(), Reply::Stdout(stdout.into()));
    }

    /// Registers `command` as failing with the given stderr.
    pub fn add_failing_command(&mut self, command: impl Into<String>, stderr: impl Into<String>) {
        self.replies.insert(command.into(), Reply::Fail(stderr.into()));
    }

    /// Makes every `open` fail with a connection timeout.
    pub fn fail_with_timeout(&mut self) {
        self.connect_failure = Some(ConnectFailure::Timeout);
    }

    /// Makes every `open` fail with a connection error.
    pub fn fail_with_refused(&mut self, message: impl Into<String>) {
        self.connect_failure = Some(ConnectFailure::Refused(message.into()));
    }

    /// Events recorded so far, in order.
    pub fn events(&self) -> Vec<MockEvent> {
        self.events.borrow().clone()
    }
}

impl RemoteShell for MockShell {
    type Session = MockSession;

    fn open(&self, target: &Target) -> Result<MockSession, TransportError> {
        match &self.connect_failure {
            Some(ConnectFailure::Timeout) => {
                return Err(TransportError::Timeout {
                    host: target.host.clone(),
                });
            }
            Some(ConnectFailure::Refused(message)) => {
                return Err(TransportError::Connect {
                    host: target.host.clone(),
                    message: message.clone(),
                });
            }
            None => {}
        }

        self.events
            .borrow_mut()
            .push(MockEvent::Open(target.host.clone()));
        Ok(MockSession {
            replies: self.replies.clone(),
            events: Rc::clone(&self.events),
        })
    }
}

/// Session handed out by [`MockShell`].
#[derive(Debug)]
pub struct MockSession {
    replies: HashMap<String, Reply>,
    events: Rc<RefCell<Vec<MockEvent>>>,
}

impl RemoteSession for MockSession {
    fn exec(&mut self, command: &str) -> Result<String, TransportError> {
        self.events
            .borrow_mut()
            .push(MockEvent::Exec(command.to_string()));
        match self.replies.get(command) {
            Some(Reply::Stdout(stdout)) => Ok(stdout.clone()),
            Some(Reply::Fail(stderr)) => Err(TransportError::Command {
                command: command.to_string(),
                status: "exit status: 1".to_string(),
                stderr: stderr.clone(),
            }),
            None => Err(TransportError::Command {
                command: command.to_string(),
                status: "exit status: 127".to_string(),
                stderr: "command not found".to_string(),
            }),
        }
    }

    fn close(self) -> Result<(), TransportError> {
        self.events.borrow_mut().push(MockEvent::Close);
        Ok(())
    }
}
