//! Scripted providers for resolver and batch tests.

use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;

use super::{GeocodeProvider, ProviderError};
use crate::models::Coordinate;

/// Records `"<provider>:<address>"` for every attempt, across providers.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

#[derive(Clone, Copy)]
pub enum Reply {
    Match(Coordinate),
    NoMatch,
    Error,
}

pub struct MockProvider {
    name: &'static str,
    reply: Reply,
    log: CallLog,
}

impl MockProvider {
    pub fn boxed(name: &'static str, reply: Reply, log: &CallLog) -> Box<dyn GeocodeProvider> {
        Box::new(Self {
            name,
            reply,
            log: log.clone(),
        })
    }
}

impl GeocodeProvider for MockProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn attempt<'a>(
        &'a self,
        address: &'a str,
    ) -> BoxFuture<'a, Result<Option<Coordinate>, ProviderError>> {
        self.log
            .0
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.name, address));
        let reply = self.reply;
        Box::pin(async move {
            match reply {
                Reply::Match(c) => Ok(Some(c)),
                Reply::NoMatch => Ok(None),
                Reply::Error => Err(ProviderError::InvalidResponse("scripted".to_string())),
            }
        })
    }
}
