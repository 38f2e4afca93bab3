use crate::models::{MalformedPolicy, Record, ResultSet};
use anyhow::Result;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Field labels of one organization object, in the order they appear.
pub const ORG_LABELS: [&str; 11] = [
    "program",
    "url",
    "opType",
    "deliveryMethod",
    "duration",
    "states",
    "nationwide",
    "online",
    "cohorts",
    "jobFamily",
    "locationDetailsAvailable",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrgParseError {
    #[error("no organization field labels found")]
    MissingStart,

    #[error("no closing brace after the first organization")]
    MissingEnd,

    #[error("organization #{index} has labels {found:?}, expected all 11 field labels in order")]
    Labels { index: usize, found: Vec<String> },
}

/// One sponsoring organization, values already stripped of literal syntax.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Organization {
    pub program: String,
    pub url: String,
    pub op_type: String,
    pub delivery_method: String,
    pub duration: String,
    pub states: String,
    pub nationwide: String,
    pub online: String,
    pub cohorts: String,
    pub job_family: String,
    pub location_details_available: String,
}

impl Organization {
    fn from_values(values: [String; 11]) -> Self {
        let [program, url, op_type, delivery_method, duration, states, nationwide, online, cohorts, job_family, location_details_available] =
            values;

        Self {
            program,
            url,
            op_type,
            delivery_method,
            duration,
            states,
            nationwide,
            online,
            cohorts,
            job_family,
            location_details_available,
        }
    }

    /// Organizations have no location row, so most columns stay empty and
    /// the site URL fills both contact columns.
    pub fn into_record(self) -> Record {
        Record {
            partner_program: self.program,
            duration: self.duration,
            poc_email: self.url.clone(),
            cost: self.url,
            op_by_state: self.states,
            delivery_method: self.delivery_method,
            target_mocs: self.op_type,
            job_family: self.job_family,
            ..Record::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrgStats {
    pub added: usize,
    pub skipped: usize,
}

pub struct OrgListParser {
    policy: MalformedPolicy,
}

impl OrgListParser {
    pub fn new(policy: MalformedPolicy) -> Self {
        Self { policy }
    }

    /// Parse the organization dump and append one record per organization.
    pub fn append_to(&self, blob: &str, results: &mut ResultSet) -> Result<OrgStats> {
        let mut stats = OrgStats::default();

        for (index, block) in split_objects(blob)?.into_iter().enumerate() {
            match parse_object(index + 1, block) {
                Ok(org) => {
                    debug!(
                        program = %org.program,
                        nationwide = %org.nationwide,
                        online = %org.online,
                        cohorts = %org.cohorts,
                        location_details = %org.location_details_available,
                        "organization parsed"
                    );
                    results.push_organization(org.into_record());
                    stats.added += 1;
                }
                Err(e) => match self.policy {
                    MalformedPolicy::Abort => return Err(e.into()),
                    MalformedPolicy::Skip => {
                        warn!("skipping organization: {}", e);
                        stats.skipped += 1;
                    }
                },
            }
        }

        info!(added = stats.added, skipped = stats.skipped, "organizations parsed");
        Ok(stats)
    }
}

/// Cut the dump down to the text between the first label and the last
/// closing brace, then split it into one block per top-level `{...}`.
/// Braces inside quoted values never open or close an object.
pub fn split_objects(blob: &str) -> Result<Vec<&str>, OrgParseError> {
    let start = find_labels(blob)
        .first()
        .map(|label| label.start)
        .ok_or(OrgParseError::MissingStart)?;
    let end = blob
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or(OrgParseError::MissingEnd)?;

    // The body opens inside the first object, just past its `{`.
    let body = &blob[start..end];
    let mut blocks = Vec::new();
    let mut block_start = Some(0);
    let mut depth = 0usize;

    for (i, b) in unquoted_bytes(body) {
        match (b, block_start) {
            (b'{', Some(_)) => depth += 1,
            (b'{', None) => block_start = Some(i + 1),
            (b'}', Some(_)) if depth > 0 => depth -= 1,
            (b'}', Some(from)) => {
                blocks.push(body[from..i].trim());
                block_start = None;
            }
            _ => {}
        }
    }
    if let Some(from) = block_start {
        blocks.push(body[from..].trim());
    }

    Ok(blocks)
}

/// Pull the eleven values out of one object block.
pub fn parse_object(index: usize, block: &str) -> Result<Organization, OrgParseError> {
    let labels = find_labels(block);
    let in_order = labels.len() == ORG_LABELS.len()
        && labels
            .iter()
            .zip(ORG_LABELS)
            .all(|(found, expected)| found.name == expected);

    if !in_order {
        return Err(OrgParseError::Labels {
            index,
            found: labels.iter().map(|l| l.name.to_string()).collect(),
        });
    }

    let values: [String; 11] = std::array::from_fn(|i| {
        let from = labels[i].value_start;
        let to = labels.get(i + 1).map(|next| next.start).unwrap_or(block.len());
        clean_value(&block[from..to])
    });

    Ok(Organization::from_values(values))
}

struct LabelAt<'a> {
    name: &'a str,
    start: usize,
    value_start: usize,
}

/// Positions and bytes of `text` that sit outside quoted strings.
fn unquoted_bytes(text: &str) -> impl Iterator<Item = (usize, u8)> + '_ {
    let mut quote: Option<u8> = None;
    let mut escaped = false;

    text.bytes().enumerate().filter_map(move |(i, b)| {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
            return None;
        }
        if b == b'"' || b == b'\'' {
            quote = Some(b);
            return None;
        }
        Some((i, b))
    })
}

/// Locate `label:` keys outside of quoted strings, so a value such as
/// `"Offered online: yes"` never reads as a key.
fn find_labels(text: &str) -> Vec<LabelAt<'_>> {
    let bytes = text.as_bytes();

    unquoted_bytes(text)
        .filter(|&(i, b)| is_ident_start(b) && (i == 0 || !is_ident(bytes[i - 1])))
        .filter_map(|(i, _)| {
            let end = i + bytes[i..].iter().take_while(|&&c| is_ident(c)).count();
            let after = end
                + bytes[end..]
                    .iter()
                    .take_while(|c| c.is_ascii_whitespace())
                    .count();
            let name = &text[i..end];
            (bytes.get(after) == Some(&b':') && ORG_LABELS.contains(&name)).then_some(LabelAt {
                name,
                start: i,
                value_start: after + 1,
            })
        })
        .collect()
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Drop whitespace, the trailing comma and the surrounding quotes.
fn clean_value(raw: &str) -> String {
    let value = raw.trim();
    let value = value.strip_suffix(',').unwrap_or(value).trim_end();
    let unquoted = ['"', '\'']
        .into_iter()
        .find_map(|q| value.strip_prefix(q).and_then(|v| v.strip_suffix(q)))
        .unwrap_or(value);
    unquoted.replace("\\\"", "\"").replace("\\'", "'")
}
