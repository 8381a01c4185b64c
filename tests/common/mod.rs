//! Shared fixtures: a scripted generation client and sheet builders.

use std::cell::RefCell;
use std::collections::VecDeque;

use org_enrich::client::{ClientError, GenerationClient, GenerationOptions, GenerationReply};
use org_enrich::dataset::Dataset;

/// One canned reply for a `generate_content` call.
pub enum Reply {
    Ok(String),
    Fail,
}

/// Scripted client: pops one reply per generate call, counts everything.
///
/// Token counts are the content's byte length, which keeps estimates
/// deterministic without a tokenizer.
pub struct MockClient {
    replies: RefCell<VecDeque<Reply>>,
    calls: RefCell<usize>,
}

impl MockClient {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            calls: RefCell::new(0),
        }
    }

    pub fn generate_calls(&self) -> usize {
        *self.calls.borrow()
    }
}

impl GenerationClient for MockClient {
    fn count_tokens(&self, _model: &str, content: &str) -> Result<u64, ClientError> {
        Ok(content.len() as u64)
    }

    fn generate_content(
        &self,
        _model: &str,
        _content: &str,
        _options: &GenerationOptions,
    ) -> Result<GenerationReply, ClientError> {
        *self.calls.borrow_mut() += 1;
        match self.replies.borrow_mut().pop_front() {
            Some(Reply::Ok(text)) => Ok(GenerationReply {
                text,
                citations: Vec::new(),
            }),
            Some(Reply::Fail) | None => Err(ClientError::Transport("scripted outage".to_string())),
        }
    }
}

/// Build a sheet with a Name/URL header and the given data rows.
pub fn url_sheet(rows: &[(&str, &str)]) -> Dataset {
    let mut all = vec![vec!["Name".to_string(), "URL".to_string()]];
    for (name, url) in rows {
        all.push(vec![name.to_string(), url.to_string()]);
    }
    Dataset::from_rows(all)
}
