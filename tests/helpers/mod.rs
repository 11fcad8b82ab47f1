#![allow(dead_code)]

use async_trait::async_trait;
use copydesk::agent::content::Content;
use copydesk::agent::runner::{AgentEvent, ModelRunner};
use copydesk::agent::sessions::SessionKey;
use copydesk::agent::{AgentError, AgentProfile};
use copydesk::store::{Params, RecordRef, Row, StoreClient, StoreError};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// One recorded call against the scripted store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Select(String),
    Create { table: String, row: Row },
    Replace { reference: String, row: Row },
    Query { text: String, params: Params },
}

/// A store double: records every call and replays canned replies in order.
#[derive(Default)]
pub struct ScriptedStore {
    calls: Mutex<Vec<StoreCall>>,
    select_replies: Mutex<VecDeque<Option<Value>>>,
    create_replies: Mutex<VecDeque<Value>>,
    replace_replies: Mutex<VecDeque<Option<Value>>>,
    query_replies: Mutex<VecDeque<Vec<Value>>>,
}

impl ScriptedStore {
    pub fn new() -> Arc<ScriptedStore> {
        Arc::new(ScriptedStore::default())
    }

    pub fn push_select_reply(&self, row: Option<Value>) {
        self.select_replies.lock().unwrap().push_back(row);
    }

    pub fn push_create_reply(&self, row: Value) {
        self.create_replies.lock().unwrap().push_back(row);
    }

    pub fn push_replace_reply(&self, row: Option<Value>) {
        self.replace_replies.lock().unwrap().push_back(row);
    }

    pub fn push_query_reply(&self, rows: Vec<Value>) {
        self.query_replies.lock().unwrap().push_back(rows);
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl StoreClient for ScriptedStore {
    async fn select(&self, reference: &RecordRef) -> Result<Option<Value>, StoreError> {
        self.calls
            .lock()
            .unwrap()
            .push(StoreCall::Select(reference.to_string()));
        Ok(self.select_replies.lock().unwrap().pop_front().flatten())
    }

    async fn create(&self, table: &str, row: Row) -> Result<Value, StoreError> {
        self.calls.lock().unwrap().push(StoreCall::Create {
            table: table.to_string(),
            row,
        });
        Ok(self
            .create_replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("unscripted create call"))
    }

    async fn replace(&self, reference: &RecordRef, row: Row) -> Result<Option<Value>, StoreError> {
        self.calls.lock().unwrap().push(StoreCall::Replace {
            reference: reference.to_string(),
            row,
        });
        Ok(self.replace_replies.lock().unwrap().pop_front().flatten())
    }

    async fn query(&self, statement: &str, params: Params) -> Result<Vec<Value>, StoreError> {
        self.calls.lock().unwrap().push(StoreCall::Query {
            text: statement.to_string(),
            params,
        });
        Ok(self
            .query_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }
}

/// A model runner double: replays scripted replies and records which models
/// were asked. A `None` reply simulates a turn that produced no final text.
#[derive(Default)]
pub struct ScriptedRunner {
    replies: Mutex<VecDeque<Option<String>>>,
    pub models: Mutex<Vec<String>>,
    pub sessions_created: Mutex<Vec<SessionKey>>,
}

impl ScriptedRunner {
    pub fn new(replies: Vec<Option<&str>>) -> ScriptedRunner {
        ScriptedRunner {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(str::to_string))
                    .collect(),
            ),
            models: Mutex::new(Vec::new()),
            sessions_created: Mutex::new(Vec::new()),
        }
    }

    pub fn models_used(&self) -> Vec<String> {
        self.models.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelRunner for ScriptedRunner {
    async fn create_session(&self, key: &SessionKey) -> Result<(), AgentError> {
        self.sessions_created.lock().unwrap().push(key.clone());
        Ok(())
    }

    async fn run(
        &self,
        model: &str,
        _profile: &AgentProfile,
        _key: &SessionKey,
        _content: Content,
    ) -> Result<mpsc::Receiver<AgentEvent>, AgentError> {
        self.models.lock().unwrap().push(model.to_string());
        let reply = self.replies.lock().unwrap().pop_front().flatten();
        let (tx, rx) = mpsc::channel(1);
        if let Some(text) = reply {
            tx.send(AgentEvent {
                text: Some(text),
                is_final: true,
            })
            .await
            .ok();
        }
        Ok(rx)
    }
}

pub fn test_profile() -> AgentProfile {
    AgentProfile {
        name: "copywriter".to_string(),
        model: "principal-model".to_string(),
        description: "test profile".to_string(),
        instruction: String::new(),
    }
}

pub fn test_key() -> SessionKey {
    SessionKey::new("copydesk", "tester", "session-1")
}
