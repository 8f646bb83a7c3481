//! HermessApp birthday list client.
//!
//! Logs into the clinic web application with a cookie-holding HTTP client,
//! loads the birthday page and parses the patient table.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use strum::Display;
use tracing::{debug, info, warn};

use crate::models::record::RawRecord;
use crate::models::task::FailureKind;

/// Classification of an extraction failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ExtractionErrorKind {
    AuthFailure,
    Timeout,
    LayoutMismatch,
    NetworkError,
    Unknown,
}

impl From<ExtractionErrorKind> for FailureKind {
    fn from(kind: ExtractionErrorKind) -> Self {
        match kind {
            ExtractionErrorKind::AuthFailure => FailureKind::AuthFailure,
            ExtractionErrorKind::Timeout => FailureKind::Timeout,
            ExtractionErrorKind::LayoutMismatch => FailureKind::LayoutMismatch,
            ExtractionErrorKind::NetworkError => FailureKind::NetworkError,
            ExtractionErrorKind::Unknown => FailureKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ExtractionError {
    pub kind: ExtractionErrorKind,
    pub message: String,
}

impl ExtractionError {
    pub fn new(kind: ExtractionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    fn layout(message: impl Into<String>) -> Self {
        Self::new(ExtractionErrorKind::LayoutMismatch, message)
    }
}

impl From<reqwest::Error> for ExtractionError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ExtractionErrorKind::Timeout
        } else if err.is_connect() || err.is_request() || err.is_status() || err.is_body() {
            ExtractionErrorKind::NetworkError
        } else {
            ExtractionErrorKind::Unknown
        };
        Self::new(kind, err.to_string())
    }
}

/// Source of raw birthday rows.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self) -> Result<Vec<RawRecord>, ExtractionError>;
}

/// Connection settings for [`HermessClient`].
#[derive(Debug, Clone)]
pub struct HermessSettings {
    pub email: String,
    pub password: String,
    pub login_url: String,
    pub birthdays_url: String,
    pub http_timeout: Duration,
}

/// Client for the HermessApp patient birthday page.
pub struct HermessClient {
    settings: HermessSettings,
    login_url: Url,
    birthdays_url: Url,
}

impl HermessClient {
    pub fn new(settings: HermessSettings) -> Result<Self, ExtractionError> {
        let login_url = Url::parse(&settings.login_url).map_err(|e| {
            ExtractionError::new(ExtractionErrorKind::Unknown, format!("invalid login url: {e}"))
        })?;
        let birthdays_url = Url::parse(&settings.birthdays_url).map_err(|e| {
            ExtractionError::new(
                ExtractionErrorKind::Unknown,
                format!("invalid birthdays url: {e}"),
            )
        })?;

        Ok(Self {
            settings,
            login_url,
            birthdays_url,
        })
    }

    /// Fresh client per extraction so sessions never leak between tasks.
    fn http_client(&self) -> Result<reqwest::Client, ExtractionError> {
        Ok(reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0 Safari/537.36",
            )
            .timeout(self.settings.http_timeout)
            .build()?)
    }

    async fn login(&self, http: &reqwest::Client) -> Result<(), ExtractionError> {
        info!(url = %self.login_url, "Logging into HermessApp");

        let page = http.get(self.login_url.clone()).send().await?;
        if !page.status().is_success() {
            return Err(ExtractionError::new(
                ExtractionErrorKind::NetworkError,
                format!("login page returned HTTP {}", page.status()),
            ));
        }
        let page_url = page.url().clone();
        let html = page.text().await?;
        let form = parse_login_form(&html, &page_url)?;

        let mut fields = form.hidden_fields;
        fields.push((form.email_field, self.settings.email.clone()));
        fields.push((form.password_field, self.settings.password.clone()));

        let response = http.post(form.action).form(&fields).send().await?;
        let status = response.status();
        if matches!(
            status,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::UNPROCESSABLE_ENTITY
        ) || status.as_u16() == 419
        {
            return Err(ExtractionError::new(
                ExtractionErrorKind::AuthFailure,
                format!("login rejected with HTTP {status}"),
            ));
        }
        if !status.is_success() {
            return Err(ExtractionError::new(
                ExtractionErrorKind::NetworkError,
                format!("login returned HTTP {status}"),
            ));
        }

        let landed_on = response.url().clone();
        let body = response.text().await?;
        if landed_on.path() == self.login_url.path() && has_login_form(&body) {
            return Err(ExtractionError::new(
                ExtractionErrorKind::AuthFailure,
                "credentials rejected, still on login page",
            ));
        }

        info!("Logged into HermessApp");
        Ok(())
    }

    async fn fetch_birthdays_page(&self, http: &reqwest::Client) -> Result<String, ExtractionError> {
        debug!(url = %self.birthdays_url, "Loading birthday page");
        let response = http.get(self.birthdays_url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(ExtractionError::new(
                ExtractionErrorKind::NetworkError,
                format!("birthday page returned HTTP {}", response.status()),
            ));
        }

        // An expired or refused session redirects back to the login form.
        let landed_on = response.url().clone();
        let html = response.text().await?;
        if landed_on.path() == self.login_url.path() || has_login_form(&html) {
            return Err(ExtractionError::new(
                ExtractionErrorKind::AuthFailure,
                "session not accepted by birthday page",
            ));
        }
        Ok(html)
    }
}

#[async_trait]
impl Extractor for HermessClient {
    async fn extract(&self) -> Result<Vec<RawRecord>, ExtractionError> {
        let http = self.http_client()?;
        self.login(&http).await?;
        let html = self.fetch_birthdays_page(&http).await?;
        let records = parse_birthday_table(&html)?;
        info!(records = records.len(), "Birthday rows extracted");
        Ok(records)
    }
}

/// Login form fields discovered on the login page.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginForm {
    pub action: Url,
    pub email_field: String,
    pub password_field: String,
    pub hidden_fields: Vec<(String, String)>,
}

fn selector(css: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(css).map_err(|e| {
        ExtractionError::new(ExtractionErrorKind::Unknown, format!("bad selector {css}: {e:?}"))
    })
}

fn has_login_form(html: &str) -> bool {
    let document = Html::parse_document(html);
    Selector::parse("input[type='password']")
        .map(|sel| document.select(&sel).next().is_some())
        .unwrap_or(false)
}

/// Locate the login form and its hidden inputs (CSRF token and friends).
pub fn parse_login_form(html: &str, page_url: &Url) -> Result<LoginForm, ExtractionError> {
    let document = Html::parse_document(html);
    let form_sel = selector("form")?;
    let input_sel = selector("input")?;

    let form = document
        .select(&form_sel)
        .find(|form| {
            form.value()
                .attr("action")
                .is_some_and(|action| action.contains("login"))
                || form
                    .select(&input_sel)
                    .any(|i| i.value().attr("type") == Some("password"))
        })
        .ok_or_else(|| ExtractionError::layout("login form not found"))?;

    let action = match form.value().attr("action") {
        Some(action) if !action.trim().is_empty() => page_url.join(action.trim()).map_err(|e| {
            ExtractionError::layout(format!("unusable login form action '{action}': {e}"))
        })?,
        _ => page_url.clone(),
    };

    let mut email_field = None;
    let mut password_field = None;
    let mut hidden_fields = Vec::new();

    for input in form.select(&input_sel) {
        let Some(name) = input.value().attr("name") else {
            continue;
        };
        match input.value().attr("type").unwrap_or("text") {
            "hidden" => hidden_fields.push((
                name.to_string(),
                input.value().attr("value").unwrap_or_default().to_string(),
            )),
            "password" => password_field = Some(name.to_string()),
            "email" | "text" if email_field.is_none() => email_field = Some(name.to_string()),
            _ => {}
        }
    }

    Ok(LoginForm {
        action,
        email_field: email_field.ok_or_else(|| ExtractionError::layout("email input missing"))?,
        password_field: password_field
            .ok_or_else(|| ExtractionError::layout("password input missing"))?,
        hidden_fields,
    })
}

const CONTAINER_SELECTORS: &[&str] = &[
    "table",
    ".table",
    "[class*='table']",
    "div[role='table']",
    "[class*='list']",
    "div[class*='overflow']",
    "div[class*='container']",
];

const BIRTHDAY_KEYWORDS: &[&str] = &["cumpleaños", "cumpleañeros", "fecha", "edad", "nombre"];

fn looks_like_birthday_container(element: &ElementRef<'_>) -> bool {
    let text = element.text().collect::<String>().to_lowercase();
    BIRTHDAY_KEYWORDS.iter().any(|kw| text.contains(kw))
}

/// Parse the birthday list out of the birthday page.
///
/// Fails with `layout_mismatch` when no container resembling the list is
/// present. A list with no parsable rows yields an empty vector.
pub fn parse_birthday_table(html: &str) -> Result<Vec<RawRecord>, ExtractionError> {
    let document = Html::parse_document(html);

    let mut container = None;
    for css in CONTAINER_SELECTORS {
        let sel = selector(css)?;
        if let Some(found) = document
            .select(&sel)
            .find(|el| looks_like_birthday_container(el))
        {
            debug!(selector = *css, "Birthday container found");
            container = Some(found);
            break;
        }
    }
    let container =
        container.ok_or_else(|| ExtractionError::layout("birthday table not found on page"))?;

    let row_sel = selector("tr, [role='row'], div[class*='row']")?;
    let mut rows: Vec<ElementRef<'_>> = container.select(&row_sel).collect();
    if rows.is_empty() {
        let fallback = selector("div[class*='item'], div[class*='entry'], div[class*='data']")?;
        rows = container.select(&fallback).collect();
    }
    debug!(rows = rows.len(), "Candidate rows found");

    let cell_sel = selector("td, [role='cell'], div[class*='cell'], span")?;
    let div_sel = selector("div")?;
    let mut records = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        let mut cells = cell_texts(row.select(&cell_sel));
        if cells.len() < 3 {
            // Plain div rows: only leaf divs, so nested text is read once.
            cells = cell_texts(row.select(&div_sel).filter(is_leaf_div));
        }
        if cells.len() < 3 {
            continue;
        }
        match parse_birthday_row(&cells) {
            Some(record) => records.push(record),
            None => warn!(row = i + 1, "Row skipped, no name or birthday"),
        }
    }

    Ok(records)
}

fn cell_texts<'a>(cells: impl Iterator<Item = ElementRef<'a>>) -> Vec<String> {
    cells
        .map(|c| c.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn is_leaf_div(element: &ElementRef<'_>) -> bool {
    !element
        .children()
        .filter_map(ElementRef::wrap)
        .any(|child| child.value().name() == "div")
}

/// Classify the cells of one row. Returns `None` unless both a name and a
/// `DD/MM` birthday are present.
pub fn parse_birthday_row(cells: &[String]) -> Option<RawRecord> {
    let mut record = RawRecord::default();

    for text in cells.iter().map(|c| c.trim()).filter(|t| !t.is_empty()) {
        let len = text.chars().count();
        let all_digits = text.chars().all(|c| c.is_ascii_digit());

        if record.name.is_empty() && len > 5 && !text.chars().any(|c| c.is_ascii_digit()) {
            record.name = text.to_string();
        } else if record.birthday.is_empty() && text.contains('/') && len <= 5 {
            record.birthday = text.to_string();
        } else if record.phone.is_empty() && all_digits && len == 10 {
            record.phone = text.to_string();
        } else if record.age.is_empty() && all_digits && (1..=3).contains(&len) {
            record.age = text.to_string();
        }
    }

    (!record.name.is_empty() && !record.birthday.is_empty()).then_some(record)
}
