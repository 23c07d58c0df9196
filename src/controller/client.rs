//! Per-client state: controller objects and the event outbox

use super::ObjectId;
use crate::protocol::{Event, Message};

#[derive(Debug)]
pub(crate) struct Client {
    pub pid: u32,
    /// Controller objects of this client, in bind order
    pub controllers: Vec<ObjectId>,
    outbox: Vec<Message>,
    /// `None` once the server range is used up
    next_server_object: Option<u32>,
}

impl Client {
    pub fn new(pid: u32) -> Self {
        Self {
            pid,
            controllers: Vec::new(),
            outbox: Vec::new(),
            next_server_object: Some(ObjectId::SERVER_BASE),
        }
    }

    /// Allocates an object id for an object the controller creates.
    ///
    /// Ids are never handed out twice; `None` once the range is exhausted.
    pub fn allocate_object(&mut self) -> Option<ObjectId> {
        let id = self.next_server_object?;
        self.next_server_object = id.checked_add(1);
        Some(ObjectId(id))
    }

    /// Controller object errors are reported on
    pub fn root(&self) -> Option<ObjectId> {
        self.controllers.first().copied()
    }

    pub fn push(&mut self, object: ObjectId, event: Event) {
        self.outbox.push(Message::new(object, event));
    }

    /// Queues `event` on every controller object of the client
    pub fn broadcast(&mut self, event: &Event) {
        for &object in &self.controllers {
            self.outbox.push(Message::new(object, event.clone()));
        }
    }

    pub fn take_events(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.outbox)
    }
}
