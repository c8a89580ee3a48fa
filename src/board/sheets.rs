//! Google Sheets board.
//!
//! Talks to the Sheets REST API v4 directly with `reqwest`.
//!
//! API docs: https://developers.google.com/sheets/api/reference/rest
//! Base URL: https://sheets.googleapis.com/v4/
//! Auth: `Authorization: Bearer {token}`. Obtaining the token (OAuth
//! consent, refresh) happens outside the daemon.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{CellRange, Orientation, SharedBoard};
use crate::types::{QuinielaError, Result, SheetInfo};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4";
const BOARD_NAME: &str = "sheets";

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SpreadsheetResponse {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

/// Response of `sheets/{id}:copyTo`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CopyResponse {
    sheet_id: i64,
}

/// Response of `values/{range}`. `values` is absent for an empty range.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Google Sheets implementation of `SharedBoard`.
pub struct SheetsBoard {
    http: Client,
    base_url: String,
    spreadsheet_id: String,
    token: SecretString,
}

impl SheetsBoard {
    pub fn new(spreadsheet_id: &str, token: SecretString, base_url: Option<&str>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("quiniela/0.1.0")
            .build()
            .map_err(|e| QuinielaError::transient(BOARD_NAME, e))?;

        Ok(Self {
            http,
            base_url: base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            token,
        })
    }

    // -- Internal helpers ------------------------------------------------

    fn spreadsheet_url(&self) -> String {
        format!("{}/spreadsheets/{}", self.base_url, self.spreadsheet_id)
    }

    fn values_url(&self, sheet_title: &str, range: CellRange) -> String {
        format!(
            "{}/values/{}",
            self.spreadsheet_url(),
            urlencoding::encode(&a1_notation(sheet_title, range))
        )
    }

    /// Send an authorised request and decode its JSON body.
    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> Result<T> {
        let resp = req
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(|e| QuinielaError::transient(BOARD_NAME, format!("{what}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(status, what, &body));
        }

        resp.json()
            .await
            .map_err(|e| QuinielaError::transient(BOARD_NAME, format!("{what}: bad response: {e}")))
    }

    async fn batch_update(&self, request: Value, what: &str) -> Result<()> {
        let url = format!("{}:batchUpdate", self.spreadsheet_url());
        let body = json!({ "requests": [request] });
        let _: Value = self.send(self.http.post(&url).json(&body), what).await?;
        Ok(())
    }
}

/// `'Sheet title'!A1:B2`, quoting the title as Sheets expects.
fn a1_notation(sheet_title: &str, range: CellRange) -> String {
    format!("'{}'!{}", sheet_title.replace('\'', "''"), range)
}

/// Missing sheets and unparseable ranges come back as 400/404 and need
/// an operator; everything else may succeed on the next poll.
fn status_error(status: StatusCode, what: &str, body: &str) -> QuinielaError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => {
            QuinielaError::DataShape(format!("{what}: Sheets API {status}: {body}"))
        }
        _ => {
            warn!(%status, what, "Sheets API error");
            QuinielaError::transient(BOARD_NAME, format!("{what}: {status}: {body}"))
        }
    }
}

/// Formatted cells usually arrive as strings; numbers and booleans are
/// rendered as text.
fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn to_matrix(range: ValueRange) -> Vec<Vec<String>> {
    range
        .values
        .iter()
        .map(|line| line.iter().map(cell_text).collect())
        .collect()
}

#[async_trait]
impl SharedBoard for SheetsBoard {
    async fn list_sheets(&self) -> Result<Vec<SheetInfo>> {
        let url = format!(
            "{}?fields={}",
            self.spreadsheet_url(),
            urlencoding::encode("sheets.properties(sheetId,title)")
        );
        let resp: SpreadsheetResponse = self.send(self.http.get(&url), "list sheets").await?;
        Ok(resp
            .sheets
            .into_iter()
            .map(|s| SheetInfo {
                sheet_id: s.properties.sheet_id,
                title: s.properties.title,
            })
            .collect())
    }

    async fn create_sheet(&self, template_id: i64) -> Result<i64> {
        let url = format!("{}/sheets/{template_id}:copyTo", self.spreadsheet_url());
        let body = json!({ "destinationSpreadsheetId": self.spreadsheet_id });
        let resp: CopyResponse = self
            .send(self.http.post(&url).json(&body), "copy template")
            .await?;
        debug!(template_id, sheet_id = resp.sheet_id, "Template copied");
        Ok(resp.sheet_id)
    }

    async fn rename_sheet(&self, sheet_id: i64, title: &str) -> Result<()> {
        let request = json!({
            "updateSheetProperties": {
                "properties": { "sheetId": sheet_id, "title": title },
                "fields": "title",
            }
        });
        self.batch_update(request, "rename sheet").await
    }

    async fn delete_sheet(&self, sheet_id: i64) -> Result<()> {
        let request = json!({ "deleteSheet": { "sheetId": sheet_id } });
        self.batch_update(request, "delete sheet").await
    }

    async fn read_range(
        &self,
        sheet_title: &str,
        range: CellRange,
        orientation: Orientation,
    ) -> Result<Vec<Vec<String>>> {
        let dimension = match orientation {
            Orientation::Rows => "ROWS",
            Orientation::Columns => "COLUMNS",
        };
        let url = format!(
            "{}?majorDimension={dimension}",
            self.values_url(sheet_title, range)
        );
        let resp: ValueRange = self.send(self.http.get(&url), "read range").await?;
        Ok(to_matrix(resp))
    }

    async fn write_range(
        &self,
        sheet_title: &str,
        range: CellRange,
        values: Vec<Vec<String>>,
    ) -> Result<()> {
        let url = format!(
            "{}?valueInputOption=USER_ENTERED",
            self.values_url(sheet_title, range)
        );
        let body = json!({
            "range": a1_notation(sheet_title, range),
            "majorDimension": "ROWS",
            "values": values,
        });
        let _: Value = self
            .send(self.http.put(&url).json(&body), "write range")
            .await?;
        debug!(sheet = sheet_title, %range, "Range written");
        Ok(())
    }

    fn name(&self) -> &str {
        BOARD_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::layout;

    fn board() -> SheetsBoard {
        SheetsBoard::new("abc123", SecretString::new("token".into()), None).unwrap()
    }

    #[test]
    fn test_a1_notation_quotes_title() {
        assert_eq!(a1_notation("Jornada 3", layout::MATCHES), "'Jornada 3'!A1:B15");
        assert_eq!(a1_notation("Rock'n'roll", layout::DOUBLES), "'Rock''n''roll'!R1:R14");
    }

    #[test]
    fn test_urls() {
        let b = board();
        assert_eq!(
            b.spreadsheet_url(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123"
        );
        assert_eq!(
            b.values_url("Jornada 3", layout::RESULTS),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/%27Jornada%203%27%21E1%3AE15"
        );
    }

    #[test]
    fn test_custom_base_url() {
        let b = SheetsBoard::new("id", SecretString::new("t".into()), Some("http://localhost:9000/v4/"))
            .unwrap();
        assert_eq!(b.spreadsheet_url(), "http://localhost:9000/v4/spreadsheets/id");
    }

    #[test]
    fn test_parse_sheet_list() {
        let json = r#"{"sheets":[
            {"properties":{"sheetId":0,"title":"Plantilla"}},
            {"properties":{"sheetId":559840847,"title":"Jornada 21"}}
        ]}"#;
        let resp: SpreadsheetResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.sheets.len(), 2);
        assert_eq!(resp.sheets[1].properties.sheet_id, 559840847);
        assert_eq!(resp.sheets[1].properties.title, "Jornada 21");
    }

    #[test]
    fn test_parse_values_mixed_types() {
        let json = r#"{"range":"'J'!O1:Q2","majorDimension":"ROWS","values":[["3", 2, null],["1"]]}"#;
        let resp: ValueRange = serde_json::from_str(json).unwrap();
        let m = to_matrix(resp);
        assert_eq!(m, vec![vec!["3", "2", ""], vec!["1"]]);
    }

    #[test]
    fn test_parse_empty_values() {
        let resp: ValueRange = serde_json::from_str(r#"{"range":"'J'!R1:R14"}"#).unwrap();
        assert!(to_matrix(resp).is_empty());
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, "read range", "Unable to parse range"),
            QuinielaError::DataShape(_)
        ));
        assert!(status_error(StatusCode::SERVICE_UNAVAILABLE, "read range", "").is_transient());
        assert!(status_error(StatusCode::TOO_MANY_REQUESTS, "read range", "").is_transient());
    }
}
