//! Display monitor stand-in

use std::sync::{Arc, Mutex};

use imgate_core::{DisplayMonitor, GatewayError, GatewayResult};

use crate::lock;

#[derive(Debug, Default)]
struct DisplayState {
    subscriptions: usize,
    fail: bool,
}

#[derive(Debug, Default)]
pub struct MockDisplayMonitor {
    state: Arc<Mutex<DisplayState>>,
}

impl MockDisplayMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe(&self) -> DisplayProbe {
        DisplayProbe {
            state: Arc::clone(&self.state),
        }
    }
}

impl DisplayMonitor for MockDisplayMonitor {
    fn subscribe(&mut self) -> GatewayResult<()> {
        let mut state = lock(&self.state);
        if state.fail {
            return Err(GatewayError::channel_error("display feed unavailable"));
        }
        state.subscriptions += 1;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DisplayProbe {
    state: Arc<Mutex<DisplayState>>,
}

impl DisplayProbe {
    pub fn subscriptions(&self) -> usize {
        lock(&self.state).subscriptions
    }

    pub fn fail_subscribe(&self, fail: bool) {
        lock(&self.state).fail = fail;
    }
}
