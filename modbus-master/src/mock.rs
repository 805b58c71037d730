use std::collections::VecDeque;
use std::io::{Error, ErrorKind};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::transport::{FrameType, Transport};

/// Create a scripted transport and the handle used by a test to script it
///
/// Actions are consumed in order. A `recv` that finds no read action at the front of the script
/// behaves like a silent slave and times out.
pub(crate) fn mock(frame_type: FrameType) -> (MockTransport, Handle) {
    let shared = Arc::new(Mutex::new(Shared::default()));
    let transport = MockTransport {
        frame_type,
        shared: shared.clone(),
    };
    (transport, Handle { shared })
}

#[derive(Default)]
struct Shared {
    actions: VecDeque<Action>,
    events: Vec<Event>,
}

pub(crate) struct MockTransport {
    frame_type: FrameType,
    shared: Arc<Mutex<Shared>>,
}

pub(crate) struct Handle {
    shared: Arc<Mutex<Shared>>,
}

#[derive(Debug)]
enum Action {
    Connect(Option<ErrorKind>),
    Write(Vec<u8>),
    WriteError(ErrorKind),
    Read(Vec<u8>),
    ReadError(ErrorKind),
    Flush(usize),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    Connect,
    ConnectErr(ErrorKind),
    Close,
    Write(usize),
    WriteErr(ErrorKind),
    Read(usize),
    ReadErr(ErrorKind),
    ReadTimeout,
    Flush(usize),
}

impl Handle {
    fn push(&mut self, action: Action) {
        self.shared.lock().unwrap().actions.push_back(action);
    }

    pub(crate) fn connect_error(&mut self, kind: ErrorKind) {
        self.push(Action::Connect(Some(kind)))
    }

    pub(crate) fn write(&mut self, data: &[u8]) {
        self.push(Action::Write(data.to_vec()))
    }

    pub(crate) fn write_error(&mut self, kind: ErrorKind) {
        self.push(Action::WriteError(kind))
    }

    pub(crate) fn read(&mut self, data: &[u8]) {
        self.push(Action::Read(data.to_vec()))
    }

    pub(crate) fn read_error(&mut self, kind: ErrorKind) {
        self.push(Action::ReadError(kind))
    }

    pub(crate) fn flush(&mut self, count: usize) {
        self.push(Action::Flush(count))
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.shared.lock().unwrap().events.clone()
    }

    pub(crate) fn count(&self, event: Event) -> usize {
        self.events().iter().filter(|x| **x == event).count()
    }

    pub(crate) fn remaining_actions(&self) -> usize {
        self.shared.lock().unwrap().actions.len()
    }
}

impl Transport for MockTransport {
    fn frame_type(&self) -> FrameType {
        self.frame_type
    }

    fn connect(&mut self) -> std::io::Result<()> {
        let mut shared = self.shared.lock().unwrap();
        let scripted = match shared.actions.front() {
            Some(Action::Connect(err)) => Some(*err),
            _ => None,
        };
        if scripted.is_some() {
            shared.actions.pop_front();
        }
        match scripted.flatten() {
            Some(kind) => {
                shared.events.push(Event::ConnectErr(kind));
                Err(Error::from(kind))
            }
            None => {
                shared.events.push(Event::Connect);
                Ok(())
            }
        }
    }

    fn close(&mut self) {
        self.shared.lock().unwrap().events.push(Event::Close);
    }

    fn send(&mut self, data: &[u8]) -> std::io::Result<()> {
        let mut shared = self.shared.lock().unwrap();
        match shared.actions.pop_front() {
            Some(Action::Write(expected)) => {
                assert_eq!(data, expected.as_slice(), "unexpected bytes written");
                shared.events.push(Event::Write(data.len()));
                Ok(())
            }
            Some(Action::WriteError(kind)) => {
                shared.events.push(Event::WriteErr(kind));
                Err(Error::from(kind))
            }
            other => panic!("unexpected write of {data:02X?}, next action: {other:?}"),
        }
    }

    fn recv(&mut self, buffer: &mut [u8], _window: Duration) -> std::io::Result<usize> {
        let mut shared = self.shared.lock().unwrap();
        match shared.actions.front() {
            Some(Action::Read(_)) | Some(Action::ReadError(_)) => {}
            _ => {
                shared.events.push(Event::ReadTimeout);
                return Err(Error::from(ErrorKind::TimedOut));
            }
        }
        match shared.actions.pop_front() {
            Some(Action::Read(data)) => {
                let count = data.len().min(buffer.len());
                buffer[..count].copy_from_slice(&data[..count]);
                if count < data.len() {
                    shared
                        .actions
                        .push_front(Action::Read(data[count..].to_vec()));
                }
                shared.events.push(Event::Read(count));
                Ok(count)
            }
            Some(Action::ReadError(kind)) => {
                shared.events.push(Event::ReadErr(kind));
                Err(Error::from(kind))
            }
            _ => unreachable!(),
        }
    }

    fn flush(&mut self) -> std::io::Result<usize> {
        let mut shared = self.shared.lock().unwrap();
        let scripted = match shared.actions.front() {
            Some(Action::Flush(count)) => Some(*count),
            _ => None,
        };
        if scripted.is_some() {
            shared.actions.pop_front();
        }
        let count = scripted.unwrap_or(0);
        shared.events.push(Event::Flush(count));
        Ok(count)
    }
}
