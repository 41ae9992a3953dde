//! In-memory transports for tests
//!
//! Built for this crate's tests and, with the `testing` feature, for hosts
//! that want to drive the client without a server.

use crate::error::{Result, TableauError};
use crate::project::{OwnerRef, Project};
use crate::transport::Transport;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

fn record(log: &Mutex<Vec<RecordedRequest>>, method: &Method, path: &str, body: &Option<Vec<u8>>) {
    log.lock().unwrap().push(RecordedRequest {
        method: method.clone(),
        path: path.to_string(),
        body: body
            .as_ref()
            .map(|b| serde_json::from_slice(b).expect("request body is JSON")),
    });
}

fn status(method: &Method, path: &str, code: u16, body: &str) -> TableauError {
    TableauError::Status {
        method: method.to_string(),
        path: path.to_string(),
        status: code,
        body: body.to_string(),
    }
}

/// Answers fixed bodies per path
#[derive(Default)]
pub struct ScriptedTransport {
    responses: HashMap<String, std::result::Result<String, (u16, String)>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_json(mut self, path: &str, body: Value) -> Self {
        self.responses.insert(path.to_string(), Ok(body.to_string()));
        self
    }

    pub fn with_status(mut self, path: &str, code: u16, body: &str) -> Self {
        self.responses
            .insert(path.to_string(), Err((code, body.to_string())));
        self
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.path.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, method: Method, path: &str, body: Option<Vec<u8>>) -> Result<Vec<u8>> {
        record(&self.requests, &method, path, &body);
        match self.responses.get(path) {
            Some(Ok(body)) => Ok(body.clone().into_bytes()),
            Some(Err((code, body))) => Err(status(&method, path, *code, body)),
            None => Err(status(&method, path, 404, "no scripted response")),
        }
    }
}

struct StoredProject {
    project: Project,
    /// Listing page-1 fetches left before the project shows up
    hidden_for: u32,
}

struct FakeState {
    projects: Vec<StoredProject>,
    next_id: u32,
}

/// Stateful stand-in for the projects endpoints of one site
pub struct FakeTableau {
    page_size: usize,
    listing_lag: u32,
    default_owner: String,
    state: Mutex<FakeState>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl FakeTableau {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            listing_lag: 0,
            default_owner: "site-admin".to_string(),
            state: Mutex::new(FakeState {
                projects: Vec::new(),
                next_id: 1,
            }),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Created projects stay out of listings for `scans` full listings
    pub fn with_listing_lag(mut self, scans: u32) -> Self {
        self.listing_lag = scans;
        self
    }

    pub fn seed(self, project: Project) -> Self {
        self.state.lock().unwrap().projects.push(StoredProject {
            project,
            hidden_for: 0,
        });
        self
    }

    pub fn seed_many(self, count: usize) -> Self {
        (1..=count).fold(self, |fake, n| {
            fake.seed(Project {
                id: format!("seed-{}", n),
                name: format!("Project {}", n),
                owner: OwnerRef {
                    id: "site-admin".to_string(),
                },
                ..Project::default()
            })
        })
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method)
            .count()
    }

    pub fn project(&self, id: &str) -> Option<Project> {
        self.state
            .lock()
            .unwrap()
            .projects
            .iter()
            .find(|p| p.project.id == id)
            .map(|p| p.project.clone())
    }

    fn list(&self, page_number: usize) -> Value {
        let mut state = self.state.lock().unwrap();
        if page_number == 1 {
            for stored in state.projects.iter_mut() {
                stored.hidden_for = stored.hidden_for.saturating_sub(1);
            }
        }

        let visible: Vec<&Project> = state
            .projects
            .iter()
            .filter(|p| p.hidden_for == 0)
            .map(|p| &p.project)
            .collect();
        let page: Vec<&Project> = visible
            .iter()
            .skip((page_number - 1) * self.page_size)
            .take(self.page_size)
            .copied()
            .collect();

        json!({
            "pagination": {
                "pageNumber": page_number.to_string(),
                "pageSize": self.page_size.to_string(),
                "totalAvailable": visible.len().to_string()
            },
            "projects": { "project": page }
        })
    }

    fn create(&self, body: &Value) -> Value {
        let mut project: Project =
            serde_json::from_value(body["project"].clone()).expect("project payload");
        let mut state = self.state.lock().unwrap();

        project.id = format!("proj-{}", state.next_id);
        state.next_id += 1;
        if project.owner.id.is_empty() {
            project.owner.id = self.default_owner.clone();
        }

        state.projects.push(StoredProject {
            project: project.clone(),
            // decremented before each listing, so first visible on listing lag + 1
            hidden_for: self.listing_lag + u32::from(self.listing_lag > 0),
        });
        json!({ "project": project })
    }

    fn update(&self, id: &str, body: &Value) -> Option<Value> {
        let sent: Project =
            serde_json::from_value(body["project"].clone()).expect("project payload");
        let mut state = self.state.lock().unwrap();
        let stored = state.projects.iter_mut().find(|p| p.project.id == id)?;

        let project = &mut stored.project;
        project.name = sent.name;
        project.parent_project_id = sent.parent_project_id;
        project.description = sent.description;
        project.content_permissions = sent.content_permissions;
        if !sent.owner.id.is_empty() {
            project.owner = sent.owner;
        }
        Some(json!({ "project": project }))
    }

    fn delete(&self, id: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        let before = state.projects.len();
        state.projects.retain(|p| p.project.id != id);
        state.projects.len() != before
    }
}

#[async_trait]
impl Transport for FakeTableau {
    async fn execute(&self, method: Method, path: &str, body: Option<Vec<u8>>) -> Result<Vec<u8>> {
        record(&self.requests, &method, path, &body);
        let body: Option<Value> = body.map(|b| serde_json::from_slice(&b).expect("JSON body"));

        let (route, query) = path.split_once('?').unwrap_or((path, ""));
        let id = route.strip_prefix("/projects/");

        let response = match (&method, id) {
            (m, None) if *m == Method::GET && route == "/projects" => {
                let page = query
                    .strip_prefix("pageNumber=")
                    .map(|n| n.parse().expect("page number"))
                    .unwrap_or(1);
                self.list(page)
            }
            (m, None) if *m == Method::POST && route == "/projects" => {
                self.create(body.as_ref().expect("create body"))
            }
            (m, Some(id)) if *m == Method::PUT => self
                .update(id, body.as_ref().expect("update body"))
                .ok_or_else(|| status(&method, path, 404, "resource not found"))?,
            (m, Some(id)) if *m == Method::DELETE => {
                if !self.delete(id) {
                    return Err(status(&method, path, 404, "resource not found"));
                }
                return Ok(Vec::new());
            }
            _ => return Err(status(&method, path, 405, "method not allowed")),
        };

        Ok(response.to_string().into_bytes())
    }
}
