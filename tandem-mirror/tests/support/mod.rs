#![allow(dead_code)]

use anyhow::{anyhow, Result};
use std::collections::VecDeque;
use std::sync::Mutex;
use tandem_mirror::browser::{Capture, ControlledSession, FrameCapture, PageCapture};
use tandem_mirror::input::{KeyStroke, RangeSelection};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Click(String),
    Key(KeyStroke),
    Text(String),
    Native(String, usize, usize),
    Range(RangeSelection),
}

/// In-memory session that replays queued captures and records every command.
#[derive(Default)]
pub struct ScriptedSession {
    pub captures: Mutex<VecDeque<Capture>>,
    pub last: Mutex<Option<Capture>>,
    pub urls: Mutex<VecDeque<String>>,
    pub calls: Mutex<Vec<Call>>,
    /// Selectors `click` can find.
    pub clickable: Vec<String>,
    pub keys_fail: bool,
    pub text_fails: bool,
    pub ranges_resolve: bool,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self {
            ranges_resolve: true,
            ..Self::default()
        }
    }

    pub fn with_captures(self, captures: impl IntoIterator<Item = Capture>) -> Self {
        self.captures.lock().unwrap().extend(captures);
        self
    }

    pub fn with_urls<'a>(self, urls: impl IntoIterator<Item = &'a str>) -> Self {
        self.urls
            .lock()
            .unwrap()
            .extend(urls.into_iter().map(str::to_string));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl ControlledSession for ScriptedSession {
    /// Queued captures in order, then the last one forever.
    async fn capture(&self) -> Capture {
        let next = self.captures.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match next {
            Some(capture) => {
                *last = Some(capture.clone());
                capture
            }
            None => last.clone().unwrap_or(Capture::Unavailable),
        }
    }

    async fn current_url(&self) -> Result<String> {
        let mut urls = self.urls.lock().unwrap();
        if urls.len() > 1 {
            return Ok(urls.pop_front().unwrap());
        }
        urls.front().cloned().ok_or_else(|| anyhow!("no url"))
    }

    async fn click(&self, css_path: &str) -> Result<()> {
        if !self.clickable.iter().any(|s| s == css_path) {
            return Err(anyhow!("no element matches `{css_path}`"));
        }
        self.record(Call::Click(css_path.to_string()));
        Ok(())
    }

    async fn press_key(&self, stroke: &KeyStroke) -> Result<()> {
        if self.keys_fail {
            return Err(anyhow!("key dispatch rejected"));
        }
        self.record(Call::Key(*stroke));
        Ok(())
    }

    async fn send_text(&self, text: &str) -> Result<()> {
        if self.text_fails {
            return Err(anyhow!("no focused element"));
        }
        self.record(Call::Text(text.to_string()));
        Ok(())
    }

    async fn set_native_selection(&self, css_path: &str, start: usize, end: usize) -> Result<()> {
        self.record(Call::Native(css_path.to_string(), start, end));
        Ok(())
    }

    async fn select_range(&self, range: &RangeSelection) -> Result<bool> {
        if self.ranges_resolve {
            self.record(Call::Range(range.clone()));
        }
        Ok(self.ranges_resolve)
    }
}

pub fn page(main: &str, frames: &[(&str, &str)]) -> PageCapture {
    PageCapture {
        main_markup: main.to_string(),
        frames: frames
            .iter()
            .map(|(selector, markup)| FrameCapture {
                selector: selector.to_string(),
                markup: markup.to_string(),
            })
            .collect(),
    }
}

pub fn ready(main: &str, frames: &[(&str, &str)]) -> Capture {
    Capture::Ready(page(main, frames))
}
