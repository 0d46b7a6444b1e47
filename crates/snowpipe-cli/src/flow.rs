//! Units of work and the router that receives them.
//!
//! A [`FlowUnit`] is whatever triggered an ingest (or whatever a history query
//! produced): a set of string attributes plus an optional body. Processors
//! never decide where a unit ends up; they hand it to an [`OutcomeRouter`]
//! together with a [`Relationship`].

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::sync::LazyLock;
use uuid::Uuid;

/// HTTP status of an accepted submit, attached to the routed unit.
pub const RESPONSE_CODE_ATTRIBUTE: &str = "responseCode";

static ATTRIBUTE_EXPRESSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^}]+)\}").expect("attribute expression pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    Success,
    Failure,
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relationship::Success => write!(f, "success"),
            Relationship::Failure => write!(f, "failure"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowUnit {
    pub id: Uuid,
    pub attributes: BTreeMap<String, String>,
    pub content: Vec<u8>,
}

impl FlowUnit {
    pub fn new(attributes: BTreeMap<String, String>, content: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            attributes,
            content,
        }
    }

    /// A bodiless unit carrying only attributes, e.g. a staged file reference.
    pub fn from_attributes<I, K, V>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(
            attributes
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            Vec::new(),
        )
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn put_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }
}

/// Receives every unit a processor is done with.
pub trait OutcomeRouter {
    /// Route an existing unit.
    fn transfer(&mut self, unit: FlowUnit, relationship: Relationship) -> anyhow::Result<()>;

    /// Create a new unit and route it in one step.
    fn create_and_transfer(
        &mut self,
        attributes: BTreeMap<String, String>,
        content: Vec<u8>,
        relationship: Relationship,
    ) -> anyhow::Result<()> {
        self.transfer(FlowUnit::new(attributes, content), relationship)
    }
}

/// Substitute every `${name}` in `template` with the unit attribute of that
/// name. Unknown attributes become the empty string.
pub fn resolve_attribute_expression(
    template: &str,
    attributes: &BTreeMap<String, String>,
) -> String {
    ATTRIBUTE_EXPRESSION
        .replace_all(template, |caps: &regex::Captures<'_>| {
            attributes
                .get(caps[1].trim())
                .cloned()
                .unwrap_or_default()
        })
        .into_owned()
}

#[derive(Serialize)]
struct RoutingReport<'a> {
    relationship: Relationship,
    id: Uuid,
    attributes: &'a BTreeMap<String, String>,
    size: usize,
}

/// Writes unit bodies verbatim to one writer and a JSON line per routed unit
/// to another.
pub struct JsonLinesRouter<B: Write, R: Write> {
    bodies: B,
    reports: R,
    successes: usize,
    failures: usize,
}

impl<B: Write, R: Write> JsonLinesRouter<B, R> {
    pub fn new(bodies: B, reports: R) -> Self {
        Self {
            bodies,
            reports,
            successes: 0,
            failures: 0,
        }
    }

    pub fn successes(&self) -> usize {
        self.successes
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn into_inner(self) -> (B, R) {
        (self.bodies, self.reports)
    }
}

impl<B: Write, R: Write> OutcomeRouter for JsonLinesRouter<B, R> {
    fn transfer(&mut self, unit: FlowUnit, relationship: Relationship) -> anyhow::Result<()> {
        if relationship == Relationship::Success && !unit.content.is_empty() {
            self.bodies.write_all(&unit.content)?;
            self.bodies.flush()?;
        }

        let report = RoutingReport {
            relationship,
            id: unit.id,
            attributes: &unit.attributes,
            size: unit.content.len(),
        };
        serde_json::to_writer(&mut self.reports, &report)?;
        self.reports.write_all(b"\n")?;
        self.reports.flush()?;

        match relationship {
            Relationship::Success => self.successes += 1,
            Relationship::Failure => self.failures += 1,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_resolve_plain_and_expression() {
        let attributes = attrs(&[("filename", "orders_2024.csv"), ("dir", "staged")]);
        assert_eq!(
            resolve_attribute_expression("${dir}/${filename}", &attributes),
            "staged/orders_2024.csv"
        );
        assert_eq!(
            resolve_attribute_expression("db.schema.orders_pipe", &attributes),
            "db.schema.orders_pipe"
        );
    }

    #[test]
    fn test_resolve_unknown_attribute_is_empty() {
        let attributes = attrs(&[("filename", "a.csv")]);
        assert_eq!(resolve_attribute_expression("${missing}", &attributes), "");
        assert_eq!(
            resolve_attribute_expression("pre-${missing}-post", &attributes),
            "pre--post"
        );
    }

    #[test]
    fn test_resolve_leaves_unterminated_expression() {
        let attributes = attrs(&[("filename", "a.csv")]);
        assert_eq!(
            resolve_attribute_expression("${filename", &attributes),
            "${filename"
        );
    }

    #[test]
    fn test_json_lines_router_writes_bodies_and_reports() {
        let mut router = JsonLinesRouter::new(Vec::new(), Vec::new());

        router
            .create_and_transfer(
                BTreeMap::new(),
                b"{\"path\":\"a.csv\"}\n".to_vec(),
                Relationship::Success,
            )
            .unwrap();
        router
            .transfer(
                FlowUnit::from_attributes([("filename", "b.csv")]),
                Relationship::Failure,
            )
            .unwrap();

        assert_eq!(router.successes(), 1);
        assert_eq!(router.failures(), 1);

        let (bodies, reports) = router.into_inner();
        assert_eq!(bodies, b"{\"path\":\"a.csv\"}\n");

        let lines: Vec<serde_json::Value> = String::from_utf8(reports)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["relationship"], "success");
        assert_eq!(lines[0]["size"], 17);
        assert_eq!(lines[1]["relationship"], "failure");
        assert_eq!(lines[1]["attributes"]["filename"], "b.csv");
    }

    #[test]
    fn test_failure_body_is_not_written() {
        let mut router = JsonLinesRouter::new(Vec::new(), Vec::new());
        router
            .transfer(
                FlowUnit::new(BTreeMap::new(), b"payload".to_vec()),
                Relationship::Failure,
            )
            .unwrap();

        let (bodies, _) = router.into_inner();
        assert!(bodies.is_empty());
    }
}
