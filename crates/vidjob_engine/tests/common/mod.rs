#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use vidjob_engine::{EngineEvent, ProgressSink};

#[derive(Default, Clone)]
pub struct TestSink {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl TestSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn init_logging() {
    client_logging::initialize_for_tests();
}
