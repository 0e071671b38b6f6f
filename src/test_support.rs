//! Test doubles shared by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::utils::http::{HttpRequest, HttpResponse, Transport};

type Responder = Box<dyn Fn(&HttpRequest) -> (u16, String) + Send + Sync>;

/// Transport answering from a fixed script and recording every request.
///
/// Unknown URLs fail at the transport level unless a fallback is set.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: HashMap<String, (u16, String)>,
    fallback: Option<Responder>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, url: &str, status: u16, body: &str) -> Self {
        self.routes
            .insert(url.to_string(), (status, body.to_string()));
        self
    }

    pub fn fallback(
        mut self,
        responder: impl Fn(&HttpRequest) -> (u16, String) + Send + Sync + 'static,
    ) -> Self {
        self.fallback = Some(Box::new(responder));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }

    /// Parsed JSON bodies of every request sent to `url`.
    pub fn json_bodies(&self, url: &str) -> Vec<serde_json::Value> {
        self.requests()
            .into_iter()
            .filter(|r| r.url == url)
            .filter_map(|r| r.body)
            .map(|b| serde_json::from_str(&b).unwrap())
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn call(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());

        let (status, body) = match self.routes.get(&request.url) {
            Some(route) => route.clone(),
            None => match &self.fallback {
                Some(responder) => responder(&request),
                None => {
                    return Err(AppError::transport(format!(
                        "connection refused: {}",
                        request.url
                    )));
                }
            },
        };

        Ok(HttpResponse {
            status,
            body: if body.is_empty() { None } else { Some(body) },
        })
    }
}

/// Listing page holding one text message per id.
pub fn channel_page(channel: &str, ids: impl IntoIterator<Item = u64>) -> String {
    let messages: String = ids
        .into_iter()
        .map(|id| {
            format!(
                r#"<div class="tgme_widget_message" data-post="{channel}/{id}">
                     <div class="tgme_widget_message_text js-message_text">message {id}</div>
                   </div>"#
            )
        })
        .collect();

    format!(
        r#"<html><body>
           <header><div class="tgme_header_title"><span>{channel} channel</span></div></header>
           <main><section>{messages}</section></main>
           </body></html>"#
    )
}

/// Thread API page with a single group of posted threads.
pub fn thread_page(ids: impl IntoIterator<Item = u64>) -> String {
    let threads: Vec<serde_json::Value> = ids
        .into_iter()
        .map(|id| {
            serde_json::json!({
                "tid": id,
                "subject": format!("thread {id}"),
                "fname": "Section",
                "url": format!("https://forum.example.com/read?tid={id}"),
                "ios_app_scheme_url": format!("forum://read?tid={id}"),
                "postdate": 1_700_000_000u64 + id,
                "postdateStr": "2023-11-14 22:13",
                "lastpostStr": "2023-11-15 08:00",
            })
        })
        .collect();

    serde_json::json!({ "data": [{ "threads": threads }] }).to_string()
}
