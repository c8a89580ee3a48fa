//! AS quiniela results page.
//!
//! Fetches `{base_url}/{season}/jornada_{id}` and reads the round from the
//! page's two tables:
//!
//! - `table.tabla-quiniela`: a header row, then one row per regular
//!   fixture with the team names in the second and third cells and the
//!   published sign in `td.quini span.signo-def`.
//! - `table.pleno-15`: a header row, then the home and the away team of
//!   the extra fixture, each with its goal band in `span.signo-def`.
//!
//! A fixture without a `signo-def` mark is still pending.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::ResultsSource;
use crate::types::{
    ExtraScore, Fixture, GoalBand, MatchResult, Outcome, QuinielaError, Result, REGULAR_FIXTURES,
    TOTAL_FIXTURES,
};

pub const DEFAULT_BASE_URL: &str = "http://resultados.as.com/quiniela";
const SOURCE_NAME: &str = "results-as";

// ---------------------------------------------------------------------------
// Page structure
// ---------------------------------------------------------------------------

struct PageSelectors {
    regular_rows: Selector,
    pleno_rows: Selector,
    cells: Selector,
    team: Selector,
    pleno_team: Selector,
    sign: Selector,
}

impl PageSelectors {
    fn new() -> Result<Self> {
        Ok(Self {
            regular_rows: selector("table.tabla-quiniela tr")?,
            pleno_rows: selector("table.pleno-15 tr")?,
            cells: selector("td")?,
            team: selector("a span")?,
            pleno_team: selector("td.enfrentamientos a span")?,
            sign: selector("td.quini span.signo-def")?,
        })
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| QuinielaError::DataShape(format!("selector {css:?}: {e:?}")))
}

/// Trimmed text of the first match of `sel` under `el`, if not blank.
fn first_text(el: ElementRef<'_>, sel: &Selector) -> Option<String> {
    el.select(sel)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

fn malformed(what: impl std::fmt::Display) -> QuinielaError {
    QuinielaError::transient(SOURCE_NAME, format!("unexpected page layout: {what}"))
}

/// Read the 15 fixtures of a round page.
fn parse_page(sel: &PageSelectors, body: &str) -> Result<Vec<Fixture>> {
    let doc = Html::parse_document(body);

    let rows: Vec<ElementRef<'_>> = doc.select(&sel.regular_rows).collect();
    if rows.len() < REGULAR_FIXTURES + 1 {
        return Err(malformed(format!(
            "{} rows in the quiniela table, expected {}",
            rows.len(),
            REGULAR_FIXTURES + 1
        )));
    }

    let mut fixtures = Vec::with_capacity(TOTAL_FIXTURES);
    for (i, row) in rows.iter().skip(1).take(REGULAR_FIXTURES).enumerate() {
        let cells: Vec<ElementRef<'_>> = row.select(&sel.cells).collect();
        let team = |c: usize| cells.get(c).and_then(|cell| first_text(*cell, &sel.team));
        let (Some(home), Some(away)) = (team(1), team(2)) else {
            return Err(malformed(format!("fixture {} has no team names", i + 1)));
        };
        let result = match first_text(*row, &sel.sign) {
            None => MatchResult::Pending,
            Some(text) => MatchResult::Sign(
                text.parse::<Outcome>()
                    .map_err(|e| malformed(format!("fixture {}: {e}", i + 1)))?,
            ),
        };
        fixtures.push(Fixture { home, away, result });
    }

    fixtures.push(parse_pleno(sel, &doc)?);
    Ok(fixtures)
}

/// The extra fixture: one row per team after the header.
fn parse_pleno(sel: &PageSelectors, doc: &Html) -> Result<Fixture> {
    let rows: Vec<ElementRef<'_>> = doc.select(&sel.pleno_rows).collect();
    let (Some(home_row), Some(away_row)) = (rows.get(1), rows.get(2)) else {
        return Err(malformed("pleno al 15 table missing"));
    };
    let (Some(home), Some(away)) = (
        first_text(*home_row, &sel.pleno_team),
        first_text(*away_row, &sel.pleno_team),
    ) else {
        return Err(malformed("pleno al 15 has no team names"));
    };

    let result = match (first_text(*home_row, &sel.sign), first_text(*away_row, &sel.sign)) {
        (None, None) => MatchResult::Pending,
        (Some(h), Some(a)) => {
            let band = |t: &str| {
                t.parse::<GoalBand>()
                    .map_err(|e| malformed(format!("pleno al 15: {e}")))
            };
            MatchResult::Score(ExtraScore {
                home: band(&h)?,
                away: band(&a)?,
            })
        }
        _ => return Err(malformed("pleno al 15 published for one team only")),
    };

    Ok(Fixture { home, away, result })
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct HttpResultsSource {
    http: Client,
    base_url: String,
    season: String,
    selectors: PageSelectors,
}

impl HttpResultsSource {
    /// `season` is the upstream season key, e.g. `2016_2017`.
    pub fn new(base_url: &str, season: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .user_agent("quiniela/0.1.0")
            .build()
            .map_err(|e| QuinielaError::transient(SOURCE_NAME, e))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            season: season.to_string(),
            selectors: PageSelectors::new()?,
        })
    }

    fn round_url(&self, id: u32) -> String {
        format!("{}/{}/jornada_{id}", self.base_url, self.season)
    }
}

#[async_trait]
impl ResultsSource for HttpResultsSource {
    async fn fetch_round(&self, id: u32) -> Result<Vec<Fixture>> {
        let url = self.round_url(id);
        debug!(url = %url, "Fetching round");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| QuinielaError::transient(SOURCE_NAME, e))?;

        match resp.status() {
            StatusCode::NOT_FOUND => return Err(QuinielaError::NotAvailable(id)),
            s if !s.is_success() => {
                return Err(QuinielaError::transient(SOURCE_NAME, format!("{s} from {url}")));
            }
            _ => {}
        }

        let body = resp
            .text()
            .await
            .map_err(|e| QuinielaError::transient(SOURCE_NAME, e))?;
        let fixtures = parse_page(&self.selectors, &body)?;

        debug!(
            round = id,
            published = fixtures.iter().filter(|f| !f.result.is_pending()).count(),
            "Round fetched"
        );
        Ok(fixtures)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = include_str!("../../tests/fixtures/as_jornada_22.html");

    fn parse(body: &str) -> Result<Vec<Fixture>> {
        parse_page(&PageSelectors::new().unwrap(), body)
    }

    #[test]
    fn test_round_url() {
        let src = HttpResultsSource::new("http://resultados.as.com/quiniela/", "2016_2017").unwrap();
        assert_eq!(
            src.round_url(22),
            "http://resultados.as.com/quiniela/2016_2017/jornada_22"
        );
    }

    #[test]
    fn test_parse_published_round() {
        let fixtures = parse(PAGE).unwrap();
        assert_eq!(fixtures.len(), TOTAL_FIXTURES);

        assert_eq!(fixtures[0].home, "Alavés");
        assert_eq!(fixtures[0].away, "Deportivo");
        assert_eq!(fixtures[0].result, MatchResult::Sign(Outcome::Home));
        assert_eq!(fixtures[2].result, MatchResult::Sign(Outcome::Draw));
        assert_eq!(fixtures[9].home, "Real Sociedad");
        assert_eq!(fixtures[9].result, MatchResult::Sign(Outcome::Away));
        assert_eq!(fixtures[13].away, "Valladolid");

        assert_eq!(fixtures[14].home, "Girona");
        assert_eq!(fixtures[14].away, "Rayo Vallecano");
        assert_eq!(
            fixtures[14].result,
            MatchResult::Score(ExtraScore { home: GoalBand::More, away: GoalBand::One })
        );
        assert_eq!(fixtures[14].result.symbol(), "M-1");
    }

    #[test]
    fn test_parse_pending_round() {
        let pending = PAGE.replace(" signo-def", "");
        let fixtures = parse(&pending).unwrap();
        assert!(fixtures.iter().all(|f| f.result.is_pending()));
        assert_eq!(fixtures[4].home, "Osasuna");
        assert_eq!(fixtures[14].away, "Rayo Vallecano");
    }

    #[test]
    fn test_missing_table_is_transient() {
        let err = parse("<html><body><p>Jornada no disponible</p></body></html>").unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_bad_sign_is_transient() {
        let page = PAGE.replacen(r#"signo-def">X<"#, r#"signo-def">?<"#, 1);
        let err = parse(&page).unwrap_err();
        assert!(err.is_transient());
        assert!(err.to_string().contains("fixture 3"));
    }

    #[test]
    fn test_pleno_half_published() {
        // Away band of the extra fixture unmarked.
        let page = PAGE.replacen(
            r#"class="signo signo-def">1</span><span class="signo">2</span><span class="signo">M"#,
            r#"class="signo">1</span><span class="signo">2</span><span class="signo">M"#,
            1,
        );
        assert_ne!(page, PAGE);
        let err = parse(&page).unwrap_err();
        assert!(err.is_transient());
    }
}
